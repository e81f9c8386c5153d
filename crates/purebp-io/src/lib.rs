//! I/O transports for BPL container access.
//!
//! Provides traits and adapters for reading and writing whole container
//! images from files, memory buffers, and optionally memory-mapped files.

use std::io::{self, Read, Seek, SeekFrom, Write};

pub use purebp_format;

/// Read-only access to a container image.
///
/// Implementors expose the entire container as a byte slice, which is
/// the interface that `purebp-format` parsing expects.
pub trait BpRead {
    /// Returns the entire container content as a byte slice.
    fn as_bytes(&self) -> &[u8];

    /// Returns the length of the data in bytes.
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the data is empty.
    fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Read-write access to a container image.
///
/// A container is always committed as one atomic image; there is no
/// partial in-place update.
pub trait BpWrite: BpRead {
    /// Replace the stored image with `data`.
    fn commit(&mut self, data: &[u8]) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryBuffer: owned in-memory container image
// ---------------------------------------------------------------------------

/// In-memory transport backed by an owned `Vec<u8>`.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    data: Vec<u8>,
}

impl MemoryBuffer {
    /// Create a buffer from an owned byte vector.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a buffer by copying from a byte slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Consume the buffer and return the underlying bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl BpRead for MemoryBuffer {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BpWrite for MemoryBuffer {
    fn commit(&mut self, data: &[u8]) -> io::Result<()> {
        self.data = data.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BorrowedSource: zero-copy view over &[u8]
// ---------------------------------------------------------------------------

/// Zero-copy source over a borrowed byte slice.
#[derive(Debug, Clone, Copy)]
pub struct BorrowedSource<'a> {
    data: &'a [u8],
}

impl<'a> BorrowedSource<'a> {
    /// Create a source from a borrowed byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl BpRead for BorrowedSource<'_> {
    fn as_bytes(&self) -> &[u8] {
        self.data
    }
}

// ---------------------------------------------------------------------------
// FileSource: slurps a container file into memory
// ---------------------------------------------------------------------------

/// File-backed source that loads the entire container into memory.
#[derive(Debug)]
pub struct FileSource {
    data: Vec<u8>,
}

impl FileSource {
    /// Open a file and read its entire contents into memory.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> io::Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let len = file.seek(SeekFrom::End(0))? as usize;
        file.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; len];
        file.read_exact(&mut data)?;
        Ok(Self { data })
    }

    /// Create a source from an already-opened file.
    pub fn from_file(mut file: std::fs::File) -> io::Result<Self> {
        let len = file.seek(SeekFrom::End(0))? as usize;
        file.seek(SeekFrom::Start(0))?;
        let mut data = vec![0u8; len];
        file.read_exact(&mut data)?;
        Ok(Self { data })
    }

    /// Consume the source and return the underlying bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl BpRead for FileSource {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

// ---------------------------------------------------------------------------
// FileSink: commits container images to a file on disk
// ---------------------------------------------------------------------------

/// File-backed sink that writes committed images to disk.
///
/// The last committed image stays readable in memory, so a sink can
/// serve as the source for a follow-up parse without reopening.
#[derive(Debug)]
pub struct FileSink {
    path: std::path::PathBuf,
    data: Vec<u8>,
}

impl FileSink {
    /// Create a new sink that will write to the given path.
    ///
    /// Nothing touches the filesystem until the first commit.
    pub fn create<P: AsRef<std::path::Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        Ok(Self {
            path,
            data: Vec::new(),
        })
    }

    /// Flush the current image to disk.
    pub fn flush_to_disk(&self) -> io::Result<()> {
        let mut file = std::fs::File::create(&self.path)?;
        file.write_all(&self.data)?;
        file.flush()
    }

    /// Returns the target path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl BpRead for FileSink {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BpWrite for FileSink {
    fn commit(&mut self, data: &[u8]) -> io::Result<()> {
        self.data = data.to_vec();
        self.flush_to_disk()
    }
}

// ---------------------------------------------------------------------------
// Optional modules
// ---------------------------------------------------------------------------

#[cfg(feature = "mmap")]
pub mod mmap;

#[cfg(feature = "mmap")]
pub use mmap::MmapSource;
