//! Memory-mapped container source for zero-copy reads.
//!
//! Provides [`MmapSource`] for read-only memory-mapped container files
//! via `memmap2`. Containers are committed as whole images, so there is
//! no writable mapping; commits go through [`crate::FileSink`].

use memmap2::Mmap;
use std::fs;
use std::io;
use std::path::Path;

use crate::BpRead;

/// Memory-mapped source for zero-copy access to large containers.
///
/// `as_bytes()` returns a slice into the mapping; nothing is copied.
pub struct MmapSource {
    _file: fs::File,
    mmap: Mmap,
}

impl MmapSource {
    /// Open a file and memory-map it for reading.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the underlying file is not modified
    /// by another process while the mapping is active.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        // SAFETY: We are creating a read-only mapping. The caller is
        // responsible for ensuring the file is not concurrently modified.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Zero-copy access to the entire container contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Read a slice at the given offset without copying.
    ///
    /// Returns `None` if `offset + len` exceeds the container size.
    pub fn read_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.mmap.get(offset..offset + len)
    }

    /// Returns the length of the mapped container in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the mapped container is empty.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Advise the OS to prefetch the given range (madvise WILLNEED).
    ///
    /// A hint only; failures are ignored.
    #[cfg(unix)]
    pub fn advise_willneed(&self, offset: usize, len: usize) {
        let actual_len = len.min(self.mmap.len().saturating_sub(offset));
        if actual_len == 0 {
            return;
        }
        let _ = self
            .mmap
            .advise_range(memmap2::Advice::WillNeed, offset, actual_len);
    }

    /// No-op on non-Unix platforms.
    #[cfg(not(unix))]
    pub fn advise_willneed(&self, _offset: usize, _len: usize) {}
}

impl BpRead for MmapSource {
    fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn mmap_source_open_and_read() {
        let dir = std::env::temp_dir();
        let path = dir.join("purebp_mmap_test_read.bp");
        {
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(&[1, 2, 3, 4, 5]).unwrap();
        }
        let source = MmapSource::open(&path).unwrap();
        assert_eq!(source.as_bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(source.len(), 5);
        assert!(!source.is_empty());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn mmap_source_read_at() {
        let dir = std::env::temp_dir();
        let path = dir.join("purebp_mmap_test_read_at.bp");
        {
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(&[10, 20, 30, 40, 50]).unwrap();
        }
        let source = MmapSource::open(&path).unwrap();
        assert_eq!(source.read_at(1, 3), Some(&[20, 30, 40][..]));
        assert_eq!(source.read_at(4, 2), None); // out of bounds
        fs::remove_file(&path).ok();
    }

    #[test]
    fn mmap_source_nonexistent() {
        let result = MmapSource::open("/tmp/purebp_mmap_nonexistent_12345.bp");
        assert!(result.is_err());
    }

    #[test]
    fn mmap_source_bp_read_trait() {
        let dir = std::env::temp_dir();
        let path = dir.join("purebp_mmap_test_trait.bp");
        fs::write(&path, [0x89, 0x42, 0x50, 0x4C]).unwrap();
        let source = MmapSource::open(&path).unwrap();
        let bytes: &[u8] = BpRead::as_bytes(&source);
        assert_eq!(bytes, &[0x89, 0x42, 0x50, 0x4C]);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn mmap_source_advise_in_and_out_of_range() {
        let dir = std::env::temp_dir();
        let path = dir.join("purebp_mmap_test_advise.bp");
        fs::write(&path, [1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let source = MmapSource::open(&path).unwrap();
        source.advise_willneed(0, 8);
        source.advise_willneed(6, 100);
        source.advise_willneed(100, 4);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn mmap_source_parses_container() {
        use purebp_format::reader::Container;
        use purebp_format::writer::ContainerWriter;

        let dir = std::env::temp_dir();
        let path = dir.join("purebp_mmap_test_container.bp");
        fs::write(&path, ContainerWriter::new().finish().unwrap()).unwrap();

        let source = MmapSource::open(&path).unwrap();
        assert!(Container::parse(source.as_bytes()).is_ok());
        fs::remove_file(&path).ok();
    }
}
