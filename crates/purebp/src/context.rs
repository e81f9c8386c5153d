//! Top-level context owning groups and the in-memory container store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::io::{Io, IoState};

/// Containers written by memory engines, shared by every group of one
/// context and keyed by the engine's open name.
pub(crate) type SharedStore = Rc<RefCell<HashMap<String, Vec<u8>>>>;

pub(crate) struct ContextState {
    ios: HashMap<String, Rc<RefCell<IoState>>>,
    store: SharedStore,
}

impl ContextState {
    fn insert_io(&mut self, name: &str) -> Io {
        let state = Rc::new(RefCell::new(IoState::new(
            name.to_string(),
            Rc::clone(&self.store),
        )));
        let handle = Io::from_state(&state);
        self.ios.insert(name.to_string(), state);
        handle
    }
}

/// Root object of the library.
///
/// A context owns its groups: dropping it invalidates every [`Io`],
/// [`Variable`](crate::Variable), [`Attribute`](crate::Attribute), and
/// [`Engine`](crate::Engine) handle derived from it, and their
/// accessors come back absent from then on.
pub struct Context {
    state: Rc<RefCell<ContextState>>,
}

impl Context {
    pub fn new() -> Context {
        Context {
            state: Rc::new(RefCell::new(ContextState {
                ios: HashMap::new(),
                store: Rc::new(RefCell::new(HashMap::new())),
            })),
        }
    }

    /// Declare a new named group. Absent if the name is already taken.
    pub fn declare_io(&self, name: &str) -> Option<Io> {
        let mut state = self.state.borrow_mut();
        if state.ios.contains_key(name) {
            return None;
        }
        Some(state.insert_io(name))
    }

    /// Fetch a previously declared group.
    pub fn at_io(&self, name: &str) -> Option<Io> {
        let state = self.state.borrow();
        state.ios.get(name).map(Io::from_state)
    }

    /// Declare a group on a context known to be fresh, replacing any
    /// same-named group. Used by the file-level API.
    pub(crate) fn fresh_io(&self, name: &str) -> Io {
        self.state.borrow_mut().insert_io(name)
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}
