//! Future-like results for scheduled gets.

use std::cell::RefCell;
use std::rc::Rc;

use purebp_format::dtype::Dtype;
use purebp_format::values::Values;

/// Result of a scheduled get.
///
/// The slot stays empty until the owning engine flushes its gets; after
/// that [`fetch`](DeferredGet::fetch) yields the decoded elements. The
/// handle outlives the engine: once filled it keeps its data even after
/// the engine closes.
#[derive(Debug, Clone)]
pub struct DeferredGet {
    name: String,
    dtype: Dtype,
    slot: Rc<RefCell<Option<Values>>>,
}

impl DeferredGet {
    pub(crate) fn new(name: String, dtype: Dtype, slot: Rc<RefCell<Option<Values>>>) -> Self {
        DeferredGet { name, dtype, slot }
    }

    /// Name of the variable this get was scheduled for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type the payload will decode to.
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Whether the engine has filled this result yet.
    pub fn is_ready(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Take a copy of the decoded elements.
    ///
    /// # Panics
    ///
    /// Panics if called before the engine has flushed its gets. Check
    /// [`is_ready`](DeferredGet::is_ready) first when in doubt.
    pub fn fetch(&self) -> Values {
        match self.slot.borrow().as_ref() {
            Some(values) => values.clone(),
            None => panic!(
                "deferred get for '{}' fetched before the engine flushed",
                self.name
            ),
        }
    }
}
