//! High-level API for writing and reading BPL scientific data containers.
//!
//! This crate provides the handle layer on top of `purebp-format`:
//! contexts own groups, groups own variable and attribute definitions,
//! and engines move data between the definitions and container images.
//! All transfers are deferred and run in two phases, put/get first and
//! a perform call later.
//!
//! # Writing
//!
//! ```no_run
//! use purebp::{File, Mode};
//!
//! let file = File::open("fields.bp", Mode::Write).unwrap();
//! file.put("step", 42u64).unwrap();
//! file.put("temperature", &[280.5f64, 281.0, 281.3][..]).unwrap();
//! file.close().unwrap();
//! ```
//!
//! # Reading
//!
//! ```no_run
//! use purebp::{File, Mode};
//!
//! let file = File::open("fields.bp", Mode::Read).unwrap();
//! let temperature = file.get("temperature").unwrap();
//! file.perform_gets().unwrap();
//! println!("{:?}", temperature.fetch().as_f64().unwrap());
//! ```
//!
//! # The full data model
//!
//! ```no_run
//! use purebp::{Context, Mode};
//!
//! let context = Context::new();
//! let io = context.declare_io("fields").unwrap();
//! let u = io
//!     .define_variable::<f64>("u", Some(&[2, 3]), Some(&[0, 0]), Some(&[2, 3]), true)
//!     .unwrap();
//! let engine = io.open("run.bp", Mode::Write).unwrap();
//! engine.put(&u, &[0.0, 0.1, 0.2, 1.0, 1.1, 1.2]).unwrap();
//! engine.close().unwrap();
//! ```

pub mod attribute;
pub mod context;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod file;
pub mod io;
pub mod stats;
pub mod variable;

pub use attribute::Attribute;
pub use context::Context;
pub use deferred::DeferredGet;
pub use engine::{Engine, Mode};
pub use error::Error;
pub use file::{File, PutData, PATH_SEPARATOR};
pub use io::{Io, DEFAULT_ENGINE_TYPE};
pub use stats::EngineStats;
pub use variable::Variable;

// Re-export the wire-level vocabulary from purebp-format
pub use purebp_format::dtype::{Dtype, Primitive};
pub use purebp_format::error::FormatError;
pub use purebp_format::record::ShapeId;
pub use purebp_format::values::{AttrElement, Values};
