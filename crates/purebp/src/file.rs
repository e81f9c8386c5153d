//! High-level single-file API.
//!
//! [`File`] bundles a private context, one group, and one engine
//! behind the kind of open/put/get/close surface a script wants.
//! Slash-separated variable names form a virtual directory tree that
//! the listing helpers can walk.

use std::path::Path;

use purebp_format::values::AttrElement;

use crate::attribute::Attribute;
use crate::context::Context;
use crate::deferred::DeferredGet;
use crate::engine::{Engine, Mode};
use crate::error::Error;
use crate::io::Io;

/// Separator between path segments in variable and attribute names.
pub const PATH_SEPARATOR: &str = "/";

mod sealed {
    pub trait Sealed {}
}

/// Data accepted by [`File::put`]: a primitive scalar or a slice of
/// primitives. Scalars define zero-dimensional variables on first use,
/// slices define 1-D local arrays.
pub trait PutData: sealed::Sealed {
    #[doc(hidden)]
    fn put_to(self, io: &Io, engine: &Engine, name: &str) -> Result<(), Error>;
}

macro_rules! impl_put_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl PutData for $ty {
                fn put_to(self, io: &Io, engine: &Engine, name: &str) -> Result<(), Error> {
                    let variable = match io.inquire_variable(name) {
                        Some(v) => v,
                        None => io
                            .define_scalar_variable::<$ty>(name)
                            .ok_or(Error::Closed)?,
                    };
                    engine.put(&variable, core::slice::from_ref(&self))
                }
            }

            impl<'a> sealed::Sealed for &'a [$ty] {}

            impl<'a> PutData for &'a [$ty] {
                fn put_to(self, io: &Io, engine: &Engine, name: &str) -> Result<(), Error> {
                    let variable = match io.inquire_variable(name) {
                        Some(v) => v,
                        None => io
                            .define_array_variable::<$ty>(name, self)
                            .ok_or(Error::Closed)?,
                    };
                    engine.put(&variable, self)
                }
            }
        )*
    };
}

impl_put_data!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// A container opened as a whole, with its context, group, and engine
/// managed together.
pub struct File {
    context: Context,
    io: Io,
    engine: Engine,
}

impl File {
    /// Open `path` in `mode`. Append mode is rejected.
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<File, Error> {
        if mode == Mode::Append {
            return Err(Error::AppendUnsupported);
        }
        let context = Context::new();
        let io = context.fresh_io("file");
        let engine = io.open_engine(&path.as_ref().to_string_lossy(), mode)?;
        Ok(File {
            context,
            io,
            engine,
        })
    }

    /// Schedule a deferred put, defining the variable on first use.
    pub fn put<V: PutData>(&self, name: &str, value: V) -> Result<(), Error> {
        value.put_to(&self.io, &self.engine, name)
    }

    /// Schedule a deferred get. Absent when the variable does not exist
    /// or the file is not open for reading.
    pub fn get(&self, name: &str) -> Option<DeferredGet> {
        let variable = self.io.inquire_variable(name)?;
        self.engine.get(&variable).ok()
    }

    /// Execute every scheduled put.
    pub fn perform_puts(&self) -> Result<(), Error> {
        self.engine.perform_puts()
    }

    /// Execute every scheduled get, filling the futures.
    pub fn perform_gets(&self) -> Result<(), Error> {
        self.engine.perform_gets()
    }

    /// Flush and close the file. Writers publish their container here.
    pub fn close(self) -> Result<(), Error> {
        self.engine.close()
    }

    /// The group backing this file.
    pub fn io(&self) -> &Io {
        &self.io
    }

    /// The engine backing this file.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The private context backing this file.
    pub fn context(&self) -> &Context {
        &self.context
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Define a single-value attribute.
    pub fn define_attribute<T: AttrElement>(&self, name: &str, value: T) -> Option<Attribute> {
        self.io.define_attribute(name, value)
    }

    /// Define an array attribute.
    pub fn define_attribute_array<T: AttrElement>(
        &self,
        name: &str,
        values: &[T],
    ) -> Option<Attribute> {
        self.io.define_attribute_array(name, values)
    }

    /// Define a single-value attribute attached to a variable, joined
    /// with the standard separator.
    pub fn define_variable_attribute<T: AttrElement>(
        &self,
        name: &str,
        value: T,
        variable_name: &str,
    ) -> Option<Attribute> {
        self.io
            .define_variable_attribute(name, value, variable_name, PATH_SEPARATOR)
    }

    /// Define an array attribute attached to a variable.
    pub fn define_variable_attribute_array<T: AttrElement>(
        &self,
        name: &str,
        values: &[T],
        variable_name: &str,
    ) -> Option<Attribute> {
        self.io
            .define_variable_attribute_array(name, values, variable_name, PATH_SEPARATOR)
    }

    /// Look up an attribute by full name.
    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        self.io.inquire_attribute(name)
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Names of every variable, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        self.io
            .inquire_all_variables()
            .iter()
            .map(|v| v.name().to_string())
            .collect()
    }

    /// Names of every attribute, sorted.
    pub fn attribute_names(&self) -> Vec<String> {
        self.io
            .inquire_all_attributes()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Full names of the variables sitting directly inside `group`.
    /// The empty string names the root.
    pub fn group_variable_names(&self, group: &str) -> Vec<String> {
        let group = normalize_group(group);
        self.variable_names()
            .into_iter()
            .filter(|name| parent_group(name) == group)
            .collect()
    }

    /// Full names of the attributes sitting directly inside `group`.
    pub fn group_attribute_names(&self, group: &str) -> Vec<String> {
        let group = normalize_group(group);
        self.attribute_names()
            .into_iter()
            .filter(|name| parent_group(name) == group)
            .collect()
    }

    /// Immediate child groups of `group`, sorted and deduplicated.
    pub fn subgroup_names(&self, group: &str) -> Vec<String> {
        let group = normalize_group(group);
        let prefix = if group.is_empty() {
            String::new()
        } else {
            format!("{group}{PATH_SEPARATOR}")
        };
        let mut subs: Vec<String> = Vec::new();
        for name in self
            .variable_names()
            .into_iter()
            .chain(self.attribute_names())
        {
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(idx) = rest.find(PATH_SEPARATOR) {
                subs.push(rest[..idx].to_string());
            }
        }
        subs.sort();
        subs.dedup();
        subs
    }
}

impl Drop for File {
    fn drop(&mut self) {
        // best-effort flush when the user forgot an explicit close
        let _ = self.engine.close();
    }
}

fn normalize_group(group: &str) -> &str {
    group.trim_end_matches(PATH_SEPARATOR)
}

fn parent_group(name: &str) -> &str {
    match name.rfind(PATH_SEPARATOR) {
        Some(idx) => &name[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("purebp_file_{tag}_{}.bp", std::process::id()))
    }

    #[test]
    fn scalar_and_array_round_trip() {
        let path = temp_path("round_trip");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("step", 7u64).unwrap();
        file.put("temps", &[280.5f64, 281.0, 281.5][..]).unwrap();
        file.close().unwrap();

        let file = File::open(&path, Mode::Read).unwrap();
        let step = file.get("step").unwrap();
        let temps = file.get("temps").unwrap();
        assert!(!step.is_ready());
        file.perform_gets().unwrap();
        assert!(step.is_ready());
        assert_eq!(step.fetch().as_u64(), Some(&[7u64][..]));
        assert_eq!(temps.fetch().as_f64(), Some(&[280.5, 281.0, 281.5][..]));
        file.close().unwrap();

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn append_rejected() {
        let path = temp_path("append");
        assert!(matches!(
            File::open(&path, Mode::Append),
            Err(Error::AppendUnsupported)
        ));
    }

    #[test]
    fn get_unknown_absent() {
        let path = temp_path("get_unknown");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("present", 1i32).unwrap();
        file.close().unwrap();

        let file = File::open(&path, Mode::Read).unwrap();
        assert!(file.get("missing").is_none());
        assert!(file.get("present").is_some());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn put_reuses_existing_definition() {
        let path = temp_path("reuse");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("v", 1.0f64).unwrap();
        file.put("v", 2.0f64).unwrap();
        assert_eq!(file.variable_names(), ["v"]);
        // the last put before the flush wins
        file.close().unwrap();

        let file = File::open(&path, Mode::Read).unwrap();
        let v = file.get("v").unwrap();
        file.perform_gets().unwrap();
        assert_eq!(v.fetch().as_f64(), Some(&[2.0][..]));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn type_conflict_on_reused_name() {
        let path = temp_path("conflict");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("v", 1.0f64).unwrap();
        assert!(matches!(
            file.put("v", 1i32),
            Err(Error::TypeMismatch { .. })
        ));
        drop(file);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn attributes_through_the_file() {
        let path = temp_path("attrs");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("t", 0.5f64).unwrap();
        file.define_attribute("title", "demo").unwrap();
        file.define_variable_attribute("units", "s", "t").unwrap();
        assert_eq!(file.attribute_names(), ["t/units", "title"]);
        file.close().unwrap();

        let file = File::open(&path, Mode::Read).unwrap();
        let units = file.attribute("t/units").unwrap();
        assert_eq!(
            units.data().unwrap().as_strings(),
            Some(&["s".to_string()][..])
        );

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn tree_listings() {
        let path = temp_path("tree");

        let file = File::open(&path, Mode::Write).unwrap();
        file.put("g1/a", 1.0f64).unwrap();
        file.put("g1/b", 2.0f64).unwrap();
        file.put("g1/inner/c", 3.0f64).unwrap();
        file.put("g2/d", 4.0f64).unwrap();
        file.put("top", 5.0f64).unwrap();
        file.define_attribute("g1/note", "n").unwrap();

        assert_eq!(file.group_variable_names(""), ["top"]);
        assert_eq!(file.group_variable_names("g1"), ["g1/a", "g1/b"]);
        assert_eq!(file.group_variable_names("g1/"), ["g1/a", "g1/b"]);
        assert_eq!(file.group_variable_names("g1/inner"), ["g1/inner/c"]);
        assert_eq!(file.group_attribute_names("g1"), ["g1/note"]);
        assert_eq!(file.subgroup_names(""), ["g1", "g2"]);
        assert_eq!(file.subgroup_names("g1"), ["inner"]);
        assert!(file.subgroup_names("g2").is_empty());
        drop(file);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn drop_flushes_pending_puts() {
        let path = temp_path("drop_flush");

        {
            let file = File::open(&path, Mode::Write).unwrap();
            file.put("v", 9i16).unwrap();
        }

        let file = File::open(&path, Mode::Read).unwrap();
        let v = file.get("v").unwrap();
        file.perform_gets().unwrap();
        assert_eq!(v.fetch().as_i16(), Some(&[9i16][..]));

        std::fs::remove_file(&path).ok();
    }
}
