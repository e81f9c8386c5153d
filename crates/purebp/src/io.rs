//! Groups: named collections of variables, attributes, and engines.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use purebp_format::dtype::{Dtype, Primitive};
use purebp_format::record::{AttributeRecord, ShapeId, VariableRecord};
use purebp_format::values::{AttrElement, Values};

use crate::attribute::Attribute;
use crate::context::SharedStore;
use crate::engine::{self, Engine, EngineState, Mode};
use crate::error::Error;
use crate::variable::Variable;

/// Default engine type for freshly declared groups.
pub const DEFAULT_ENGINE_TYPE: &str = "bpfile";

/// Backing state of one group, owned by its [`Context`](crate::Context).
pub(crate) struct IoState {
    pub(crate) name: String,
    pub(crate) engine_type: String,
    pub(crate) parameters: HashMap<String, String>,
    pub(crate) variables: BTreeMap<String, VariableDef>,
    pub(crate) attributes: BTreeMap<String, AttrDef>,
    pub(crate) engines: BTreeMap<String, Rc<RefCell<EngineState>>>,
    pub(crate) store: SharedStore,
}

impl IoState {
    pub(crate) fn new(name: String, store: SharedStore) -> IoState {
        IoState {
            name,
            engine_type: DEFAULT_ENGINE_TYPE.to_string(),
            parameters: HashMap::new(),
            variables: BTreeMap::new(),
            attributes: BTreeMap::new(),
            engines: BTreeMap::new(),
            store,
        }
    }
}

/// Definition of one variable inside a group.
#[derive(Debug, Clone)]
pub(crate) struct VariableDef {
    pub(crate) dtype: Dtype,
    pub(crate) shape_id: ShapeId,
    pub(crate) ndims: usize,
    pub(crate) constant_dims: bool,
    pub(crate) shape: Option<Vec<u64>>,
    pub(crate) start: Option<Vec<u64>>,
    pub(crate) count: Option<Vec<u64>>,
    pub(crate) minmax: Option<(f64, f64)>,
}

/// Definition of one attribute inside a group.
#[derive(Debug, Clone)]
pub(crate) struct AttrDef {
    pub(crate) is_value: bool,
    pub(crate) data: Values,
}

/// Rebuild a variable definition from a container record.
///
/// Scalars come back as one-element global arrays: the container keeps
/// no zero-dimensional payload extent, so a reload sees shape `[1]`.
pub(crate) fn def_from_record(record: &VariableRecord) -> VariableDef {
    if record.shape_id == ShapeId::LocalValue {
        VariableDef {
            dtype: record.dtype,
            shape_id: ShapeId::GlobalArray,
            ndims: 1,
            constant_dims: record.constant_dims,
            shape: Some(vec![1]),
            start: Some(vec![0]),
            count: Some(vec![1]),
            minmax: record.minmax,
        }
    } else {
        VariableDef {
            dtype: record.dtype,
            shape_id: record.shape_id,
            ndims: record.ndims(),
            constant_dims: record.constant_dims,
            shape: record.shape.clone(),
            start: record.start.clone(),
            count: record.count.clone(),
            minmax: record.minmax,
        }
    }
}

pub(crate) fn attr_def_from_record(record: &AttributeRecord) -> AttrDef {
    AttrDef {
        is_value: record.is_value,
        data: record.data.clone(),
    }
}

/// Copy `src` into `out` when a buffer is supplied; always report the
/// full length. This is the fill half of the measure-then-fill string
/// protocol.
pub(crate) fn fill_bytes(src: &[u8], out: Option<&mut [u8]>) -> usize {
    if let Some(out) = out {
        let n = src.len().min(out.len());
        out[..n].copy_from_slice(&src[..n]);
    }
    src.len()
}

/// Drive a measure-then-fill callee: first call sizes the string, the
/// second fills a buffer of exactly that size. Absent when the callee
/// reports inconsistent lengths or non-UTF-8 content.
pub(crate) fn measured_string<F: FnMut(Option<&mut [u8]>) -> usize>(mut fill: F) -> Option<String> {
    let needed = fill(None);
    let mut buf = vec![0u8; needed];
    if fill(Some(&mut buf)) != needed {
        return None;
    }
    String::from_utf8(buf).ok()
}

/// Handle to a group.
///
/// Groups are owned by their [`Context`](crate::Context); the handle
/// holds a weak reference, so every operation on a dead group comes
/// back absent instead of crashing.
#[derive(Debug, Clone)]
pub struct Io {
    state: Weak<RefCell<IoState>>,
}

impl Io {
    pub(crate) fn from_state(state: &Rc<RefCell<IoState>>) -> Io {
        Io {
            state: Rc::downgrade(state),
        }
    }

    /// The group's name.
    pub fn name(&self) -> Option<String> {
        let state = self.state.upgrade()?;
        let name = state.borrow().name.clone();
        Some(name)
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Define a variable of element type `T`.
    ///
    /// An empty dimension slice means the same as `None`: that facet is
    /// unset. The shape category follows from what is given: nothing is
    /// a scalar, a count alone is a local array, a shape makes a global
    /// array. A start without a shape is meaningless and comes back
    /// absent, as does a duplicate name or a dead group.
    ///
    /// # Panics
    ///
    /// Panics if the supplied dimension vectors disagree on length.
    pub fn define_variable<T: Primitive>(
        &self,
        name: &str,
        shape: Option<&[u64]>,
        start: Option<&[u64]>,
        count: Option<&[u64]>,
        constant_dims: bool,
    ) -> Option<Variable> {
        let state = self.state.upgrade()?;

        let norm = |dims: Option<&[u64]>| dims.filter(|d| !d.is_empty()).map(<[u64]>::to_vec);
        let shape = norm(shape);
        let start = norm(start);
        let count = norm(count);

        let ndims = [&shape, &start, &count]
            .into_iter()
            .flatten()
            .map(Vec::len)
            .max()
            .unwrap_or(0);
        for (label, dims) in [("shape", &shape), ("start", &start), ("count", &count)] {
            if let Some(d) = dims {
                assert!(
                    d.len() == ndims,
                    "variable '{name}': {label} has {} entries, expected {ndims}",
                    d.len()
                );
            }
        }

        if start.is_some() && shape.is_none() {
            return None;
        }

        let mut state = state.borrow_mut();
        if state.variables.contains_key(name) {
            return None;
        }

        let shape_id = if ndims == 0 {
            ShapeId::LocalValue
        } else if shape.is_some() {
            ShapeId::GlobalArray
        } else {
            ShapeId::LocalArray
        };
        state.variables.insert(
            name.to_string(),
            VariableDef {
                dtype: T::DTYPE,
                shape_id,
                ndims,
                constant_dims,
                shape,
                start,
                count,
                minmax: None,
            },
        );
        Some(Variable::new(Weak::clone(&self.state), name.to_string()))
    }

    /// Define a zero-dimensional variable whose type is `T`.
    pub fn define_scalar_variable<T: Primitive>(&self, name: &str) -> Option<Variable> {
        self.define_variable::<T>(name, None, None, None, false)
    }

    /// Define a 1-D local array sized and typed after `data`.
    pub fn define_array_variable<T: Primitive>(&self, name: &str, data: &[T]) -> Option<Variable> {
        self.define_variable::<T>(name, None, None, Some(&[data.len() as u64]), false)
    }

    /// Look up a variable by name.
    pub fn inquire_variable(&self, name: &str) -> Option<Variable> {
        let state = self.state.upgrade()?;
        let exists = state.borrow().variables.contains_key(name);
        exists.then(|| Variable::new(Weak::clone(&self.state), name.to_string()))
    }

    /// Handles to every defined variable, in name order.
    pub fn inquire_all_variables(&self) -> Vec<Variable> {
        let Some(state) = self.state.upgrade() else {
            return Vec::new();
        };
        let names: Vec<String> = state.borrow().variables.keys().cloned().collect();
        names
            .into_iter()
            .map(|n| Variable::new(Weak::clone(&self.state), n))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Define a single-value attribute.
    pub fn define_attribute<T: AttrElement>(&self, name: &str, value: T) -> Option<Attribute> {
        self.insert_attribute(name.to_string(), T::gather(std::slice::from_ref(&value)), true)
    }

    /// Define an array attribute.
    pub fn define_attribute_array<T: AttrElement>(
        &self,
        name: &str,
        values: &[T],
    ) -> Option<Attribute> {
        self.insert_attribute(name.to_string(), T::gather(values), false)
    }

    /// Define a single-value attribute attached to a variable.
    ///
    /// The stored name is `variable_name`, `separator`, `name` joined
    /// together. Absent when the variable does not exist.
    pub fn define_variable_attribute<T: AttrElement>(
        &self,
        name: &str,
        value: T,
        variable_name: &str,
        separator: &str,
    ) -> Option<Attribute> {
        let full = self.variable_attribute_name(name, variable_name, separator)?;
        self.insert_attribute(full, T::gather(std::slice::from_ref(&value)), true)
    }

    /// Define an array attribute attached to a variable.
    pub fn define_variable_attribute_array<T: AttrElement>(
        &self,
        name: &str,
        values: &[T],
        variable_name: &str,
        separator: &str,
    ) -> Option<Attribute> {
        let full = self.variable_attribute_name(name, variable_name, separator)?;
        self.insert_attribute(full, T::gather(values), false)
    }

    /// Look up an attribute by full name.
    pub fn inquire_attribute(&self, name: &str) -> Option<Attribute> {
        let state = self.state.upgrade()?;
        let exists = state.borrow().attributes.contains_key(name);
        exists.then(|| Attribute::new(Weak::clone(&self.state), name.to_string()))
    }

    /// Look up an attribute attached to a variable.
    pub fn inquire_variable_attribute(
        &self,
        name: &str,
        variable_name: &str,
        separator: &str,
    ) -> Option<Attribute> {
        self.inquire_attribute(&format!("{variable_name}{separator}{name}"))
    }

    /// Handles to every defined attribute, in name order.
    pub fn inquire_all_attributes(&self) -> Vec<Attribute> {
        let Some(state) = self.state.upgrade() else {
            return Vec::new();
        };
        let names: Vec<String> = state.borrow().attributes.keys().cloned().collect();
        names
            .into_iter()
            .map(|n| Attribute::new(Weak::clone(&self.state), n))
            .collect()
    }

    fn variable_attribute_name(
        &self,
        name: &str,
        variable_name: &str,
        separator: &str,
    ) -> Option<String> {
        let state = self.state.upgrade()?;
        if !state.borrow().variables.contains_key(variable_name) {
            return None;
        }
        Some(format!("{variable_name}{separator}{name}"))
    }

    fn insert_attribute(&self, name: String, data: Values, is_value: bool) -> Option<Attribute> {
        let state = self.state.upgrade()?;
        let mut state = state.borrow_mut();
        if state.attributes.contains_key(&name) {
            return None;
        }
        state.attributes.insert(name.clone(), AttrDef { is_value, data });
        Some(Attribute::new(Weak::clone(&self.state), name))
    }

    // -----------------------------------------------------------------------
    // Engines
    // -----------------------------------------------------------------------

    /// Select the engine type used by future opens ("bpfile" or "memory").
    ///
    /// Matching is case-insensitive. Ignored on a dead group.
    pub fn set_engine(&self, engine_type: &str) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().engine_type = engine_type.to_ascii_lowercase();
        }
    }

    /// The configured engine type, recovered through measure-then-fill.
    pub fn engine_type(&self) -> Option<String> {
        let state = self.state.upgrade()?;
        let state = state.borrow();
        measured_string(|out| fill_bytes(state.engine_type.as_bytes(), out))
    }

    /// Set one engine parameter, replacing any previous value.
    pub fn set_parameter(&self, key: &str, value: &str) {
        if let Some(state) = self.state.upgrade() {
            state
                .borrow_mut()
                .parameters
                .insert(key.to_string(), value.to_string());
        }
    }

    /// Read back one engine parameter.
    pub fn parameter(&self, key: &str) -> Option<String> {
        let state = self.state.upgrade()?;
        let value = state.borrow().parameters.get(key).cloned();
        value
    }

    /// Open an engine on this group.
    ///
    /// `name` doubles as the container location: a file path for the
    /// file engine, a store key for the memory engine. Absent whenever
    /// the open cannot complete, including append mode, a duplicate
    /// engine name, and an unreadable or missing container.
    pub fn open(&self, name: &str, mode: Mode) -> Option<Engine> {
        self.open_engine(name, mode).ok()
    }

    /// Fetch an engine previously opened on this group and not yet
    /// closed.
    pub fn engine(&self, name: &str) -> Option<Engine> {
        let state = self.state.upgrade()?;
        let engine = state.borrow().engines.get(name).map(Engine::from_state);
        engine
    }

    pub(crate) fn open_engine(&self, name: &str, mode: Mode) -> Result<Engine, Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        engine::open(&state, Weak::clone(&self.state), name, mode)
    }
}
