//! Non-owning handle to a variable definition.

use std::cell::RefCell;
use std::rc::Weak;

use purebp_format::dtype::Dtype;
use purebp_format::record::ShapeId;

use crate::io::{IoState, VariableDef};

/// Handle to a variable defined inside a group.
///
/// The handle does not own the definition. Every accessor resolves
/// against the owning group at call time and comes back absent once
/// the group is gone.
#[derive(Debug, Clone)]
pub struct Variable {
    io: Weak<RefCell<IoState>>,
    name: String,
}

impl Variable {
    pub(crate) fn new(io: Weak<RefCell<IoState>>, name: String) -> Variable {
        Variable { io, name }
    }

    /// The variable's full name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup<R>(&self, f: impl FnOnce(&VariableDef) -> R) -> Option<R> {
        let state = self.io.upgrade()?;
        let state = state.borrow();
        state.variables.get(&self.name).map(f)
    }

    /// Element type.
    pub fn dtype(&self) -> Option<Dtype> {
        self.lookup(|d| d.dtype)
    }

    /// Shape category.
    pub fn shape_id(&self) -> Option<ShapeId> {
        self.lookup(|d| d.shape_id)
    }

    /// Number of dimensions. Scalars report zero.
    pub fn ndims(&self) -> Option<usize> {
        self.lookup(|d| d.ndims)
    }

    /// Whether the dimensions were declared immutable.
    pub fn constant_dims(&self) -> Option<bool> {
        self.lookup(|d| d.constant_dims)
    }

    /// Global extent. Absent when no shape was given.
    pub fn shape(&self) -> Option<Vec<u64>> {
        self.lookup(|d| d.shape.clone())?
    }

    /// Offset of the selection inside the global extent.
    pub fn start(&self) -> Option<Vec<u64>> {
        self.lookup(|d| d.start.clone())?
    }

    /// Extent of the selection.
    pub fn count(&self) -> Option<Vec<u64>> {
        self.lookup(|d| d.count.clone())?
    }

    /// Number of elements the current selection covers. Scalars count
    /// as one element.
    pub fn selection_size(&self) -> Option<u64> {
        self.lookup(|d| match &d.count {
            Some(count) => count.iter().product(),
            None => 1,
        })
    }

    /// Min/max recorded at the last flush, if statistics were kept.
    pub fn minmax(&self) -> Option<(f64, f64)> {
        self.lookup(|d| d.minmax)?
    }
}
