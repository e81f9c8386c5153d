//! Non-owning handle to an attribute.

use std::cell::RefCell;
use std::rc::Weak;

use purebp_format::dtype::Dtype;
use purebp_format::values::Values;

use crate::io::{AttrDef, IoState};

/// Handle to an attribute defined inside a group.
///
/// Like [`Variable`](crate::Variable), the handle resolves against the
/// owning group on every call and comes back absent once the group is
/// gone.
#[derive(Debug, Clone)]
pub struct Attribute {
    io: Weak<RefCell<IoState>>,
    name: String,
}

impl Attribute {
    pub(crate) fn new(io: Weak<RefCell<IoState>>, name: String) -> Attribute {
        Attribute { io, name }
    }

    /// The attribute's full name, including any variable prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup<R>(&self, f: impl FnOnce(&AttrDef) -> R) -> Option<R> {
        let state = self.io.upgrade()?;
        let state = state.borrow();
        state.attributes.get(&self.name).map(f)
    }

    /// Element type of the stored data.
    pub fn dtype(&self) -> Option<Dtype> {
        self.lookup(|d| d.data.dtype())
    }

    /// Whether the attribute was defined from a single value rather
    /// than an array.
    pub fn is_value(&self) -> Option<bool> {
        self.lookup(|d| d.is_value)
    }

    /// Number of stored elements.
    pub fn len(&self) -> Option<usize> {
        self.lookup(|d| d.data.len())
    }

    /// Whether the attribute holds no elements.
    pub fn is_empty(&self) -> Option<bool> {
        self.lookup(|d| d.data.is_empty())
    }

    /// The stored data.
    pub fn data(&self) -> Option<Values> {
        self.lookup(|d| d.data.clone())
    }
}
