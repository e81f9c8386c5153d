//! Error types for the binding-level API.

use std::fmt;

use purebp_format::dtype::Dtype;
use purebp_format::error::FormatError;

use crate::engine::Mode;

/// Errors that can occur when transferring or flushing data.
///
/// Metadata lookups never produce an `Error`; a name that cannot be
/// resolved simply comes back absent. Errors are reserved for transfer
/// operations, where the container or transport can genuinely fail.
#[derive(Debug)]
pub enum Error {
    /// I/O error from the transport.
    Io(std::io::Error),
    /// Low-level container format error.
    Format(FormatError),
    /// The engine (or its owning group) is already closed.
    Closed,
    /// Append mode is not supported.
    AppendUnsupported,
    /// The group's engine type names no known engine.
    UnknownEngineType(String),
    /// An engine with this name is already open on the group.
    EngineExists(String),
    /// The operation does not apply to an engine in this mode.
    ModeMismatch {
        /// Operation that was attempted.
        op: &'static str,
        /// The engine's open mode.
        mode: Mode,
    },
    /// Transfer element type differs from the variable's defined type.
    TypeMismatch {
        /// Variable name.
        name: String,
        /// The variable's defined type.
        expected: Dtype,
        /// The element type supplied to the transfer.
        actual: Dtype,
    },
    /// Transfer length differs from the variable's selection.
    SelectionMismatch {
        /// Variable name.
        name: String,
        /// Elements the selection calls for.
        expected: u64,
        /// Elements supplied.
        actual: u64,
    },
    /// The named variable is not known to this engine.
    UnknownVariable(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Format(e) => write!(f, "container format error: {e}"),
            Error::Closed => write!(f, "engine is closed"),
            Error::AppendUnsupported => write!(f, "append mode is not supported"),
            Error::UnknownEngineType(t) => write!(f, "unknown engine type: {t}"),
            Error::EngineExists(name) => {
                write!(f, "an engine named '{name}' is already open")
            }
            Error::ModeMismatch { op, mode } => {
                write!(f, "cannot {op} on an engine opened in {mode:?} mode")
            }
            Error::TypeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(f, "variable '{name}' holds {expected}, not {actual}")
            }
            Error::SelectionMismatch {
                name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "variable '{name}' selects {expected} elements, got {actual}"
                )
            }
            Error::UnknownVariable(name) => {
                write!(f, "unknown variable: {name}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Error::Format(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
