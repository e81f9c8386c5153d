//! Engines: the transfer layer between group metadata and containers.
//!
//! An engine is opened on a group in [`Mode::Write`] or [`Mode::Read`].
//! Writers stage deferred puts and publish a complete container image
//! on close; readers parse a container up front and serve deferred gets
//! from it. Every engine lives in its group's registry until it is
//! closed, at which point it is removed and its handles go dead.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::rc::{Rc, Weak};

use purebp_format::dtype::Primitive;
use purebp_format::reader::Container;
use purebp_format::record::{AttributeRecord, VariableRecord};
use purebp_format::values::{self, decode_values, Values};
use purebp_format::writer::ContainerWriter;
use purebp_io::{BpRead, BpWrite, FileSink, MemoryBuffer};

use crate::context::SharedStore;
use crate::deferred::DeferredGet;
use crate::error::Error;
use crate::io::{
    attr_def_from_record, def_from_record, fill_bytes, measured_string, IoState, VariableDef,
};
use crate::stats::EngineStats;
use crate::variable::Variable;

/// Open mode of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Create a fresh container for writing.
    Write,
    /// Open an existing container for reading.
    Read,
    /// Extend an existing container. Rejected at open.
    Append,
}

struct PendingPut {
    name: String,
    bytes: Vec<u8>,
}

struct PendingGet {
    name: String,
    slot: Rc<RefCell<Option<Values>>>,
}

/// Backing state of one engine, owned by its group's registry.
pub(crate) struct EngineState {
    name: String,
    mode: Mode,
    engine_type: String,
    closed: bool,
    io: Weak<RefCell<IoState>>,
    sink: Option<Box<dyn BpWrite>>,
    source: Option<Box<dyn BpRead>>,
    container: Option<Container>,
    pending_puts: Vec<PendingPut>,
    pending_gets: Vec<PendingGet>,
    staged: BTreeMap<String, Vec<u8>>,
    stats: EngineStats,
}

/// A write engine backed by the context's in-memory store.
struct MemorySink {
    store: SharedStore,
    key: String,
    data: Vec<u8>,
}

impl BpRead for MemorySink {
    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl BpWrite for MemorySink {
    fn commit(&mut self, data: &[u8]) -> io::Result<()> {
        self.data = data.to_vec();
        self.store.borrow_mut().insert(self.key.clone(), self.data.clone());
        Ok(())
    }
}

enum EngineKind {
    File,
    Memory,
}

#[cfg(feature = "mmap")]
fn open_file_source(path: &str) -> Result<Box<dyn BpRead>, Error> {
    let source = purebp_io::MmapSource::open(path)?;
    source.advise_willneed(0, source.len());
    Ok(Box::new(source))
}

#[cfg(not(feature = "mmap"))]
fn open_file_source(path: &str) -> Result<Box<dyn BpRead>, Error> {
    Ok(Box::new(purebp_io::FileSource::open(path)?))
}

/// Open an engine on `io_rc` and register it under `name`.
pub(crate) fn open(
    io_rc: &Rc<RefCell<IoState>>,
    io_weak: Weak<RefCell<IoState>>,
    name: &str,
    mode: Mode,
) -> Result<Engine, Error> {
    if mode == Mode::Append {
        return Err(Error::AppendUnsupported);
    }
    if io_rc.borrow().engines.contains_key(name) {
        return Err(Error::EngineExists(name.to_string()));
    }
    let engine_type = io_rc.borrow().engine_type.clone();
    let kind = match engine_type.as_str() {
        "bpfile" | "file" => EngineKind::File,
        "memory" => EngineKind::Memory,
        other => return Err(Error::UnknownEngineType(other.to_string())),
    };

    let mut sink: Option<Box<dyn BpWrite>> = None;
    let mut source: Option<Box<dyn BpRead>> = None;
    let mut container: Option<Container> = None;
    match mode {
        Mode::Write => {
            sink = Some(match kind {
                EngineKind::File => Box::new(FileSink::create(name)?),
                EngineKind::Memory => Box::new(MemorySink {
                    store: Rc::clone(&io_rc.borrow().store),
                    key: name.to_string(),
                    data: Vec::new(),
                }),
            });
        }
        Mode::Read => {
            let src: Box<dyn BpRead> = match kind {
                EngineKind::File => open_file_source(name)?,
                EngineKind::Memory => {
                    let bytes = io_rc.borrow().store.borrow().get(name).cloned();
                    let bytes = bytes.ok_or_else(|| {
                        Error::Io(io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("no in-memory container named '{name}'"),
                        ))
                    })?;
                    Box::new(MemoryBuffer::new(bytes))
                }
            };
            let parsed = Container::parse(src.as_bytes())?;
            let mut io_state = io_rc.borrow_mut();
            for record in &parsed.variables {
                io_state
                    .variables
                    .insert(record.name.clone(), def_from_record(record));
            }
            for record in &parsed.attributes {
                io_state
                    .attributes
                    .insert(record.name.clone(), attr_def_from_record(record));
            }
            source = Some(src);
            container = Some(parsed);
        }
        Mode::Append => unreachable!("rejected above"),
    }

    let state = Rc::new(RefCell::new(EngineState {
        name: name.to_string(),
        mode,
        engine_type,
        closed: false,
        io: io_weak,
        sink,
        source,
        container,
        pending_puts: Vec::new(),
        pending_gets: Vec::new(),
        staged: BTreeMap::new(),
        stats: EngineStats::new(),
    }));
    let handle = Engine::from_state(&state);
    io_rc.borrow_mut().engines.insert(name.to_string(), state);
    Ok(handle)
}

/// Handle to an open engine.
///
/// The engine itself lives in its group's registry; the handle holds a
/// weak reference, so accessors come back absent once the engine is
/// closed or the group is gone.
#[derive(Debug, Clone)]
pub struct Engine {
    state: Weak<RefCell<EngineState>>,
}

impl Engine {
    pub(crate) fn from_state(state: &Rc<RefCell<EngineState>>) -> Engine {
        Engine {
            state: Rc::downgrade(state),
        }
    }

    /// The name the engine was opened under.
    pub fn name(&self) -> Option<String> {
        let state = self.state.upgrade()?;
        let name = state.borrow().name.clone();
        Some(name)
    }

    /// The mode the engine was opened in.
    pub fn mode(&self) -> Option<Mode> {
        let state = self.state.upgrade()?;
        let mode = state.borrow().mode;
        Some(mode)
    }

    /// The engine type, recovered through measure-then-fill.
    pub fn engine_type(&self) -> Option<String> {
        let state = self.state.upgrade()?;
        let state = state.borrow();
        measured_string(|out| fill_bytes(state.engine_type.as_bytes(), out))
    }

    /// Snapshot of the engine's transfer counters.
    pub fn stats(&self) -> Option<EngineStats> {
        let state = self.state.upgrade()?;
        let stats = state.borrow().stats;
        Some(stats)
    }

    /// Schedule a deferred put of `data` into `variable`.
    ///
    /// The data is copied now and written out at the next
    /// [`perform_puts`](Engine::perform_puts) or at close. A later put
    /// to the same variable before the flush replaces the earlier one.
    pub fn put<T: Primitive>(&self, variable: &Variable, data: &[T]) -> Result<(), Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        let mut guard = state.borrow_mut();
        let st = &mut *guard;
        if st.closed {
            return Err(Error::Closed);
        }
        if st.mode != Mode::Write {
            return Err(Error::ModeMismatch {
                op: "put",
                mode: st.mode,
            });
        }
        let io_rc = st.io.upgrade().ok_or(Error::Closed)?;
        let mut io_state = io_rc.borrow_mut();
        let name = variable.name();
        let def = io_state
            .variables
            .get_mut(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        if def.dtype != T::DTYPE {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: def.dtype,
                actual: T::DTYPE,
            });
        }
        reconcile_selection(name, def, data.len() as u64)?;

        let mut bytes = Vec::with_capacity(data.len() * T::DTYPE.size());
        for &value in data {
            value.write_le(&mut bytes);
        }
        st.pending_puts.push(PendingPut {
            name: name.to_string(),
            bytes,
        });
        st.stats.puts_scheduled += 1;
        Ok(())
    }

    /// Schedule a deferred get of `variable`.
    ///
    /// The returned future is unready until the next
    /// [`perform_gets`](Engine::perform_gets).
    pub fn get(&self, variable: &Variable) -> Result<DeferredGet, Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        let mut guard = state.borrow_mut();
        let st = &mut *guard;
        if st.closed {
            return Err(Error::Closed);
        }
        if st.mode != Mode::Read {
            return Err(Error::ModeMismatch {
                op: "get",
                mode: st.mode,
            });
        }
        let container = st.container.as_ref().ok_or(Error::Closed)?;
        let name = variable.name();
        let record = container
            .variable(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        let slot = Rc::new(RefCell::new(None));
        let deferred = DeferredGet::new(name.to_string(), record.dtype, Rc::clone(&slot));
        st.pending_gets.push(PendingGet {
            name: name.to_string(),
            slot,
        });
        st.stats.gets_scheduled += 1;
        Ok(deferred)
    }

    /// Execute every scheduled put, staging the payloads for the next
    /// container image.
    pub fn perform_puts(&self) -> Result<(), Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        let mut guard = state.borrow_mut();
        let st = &mut *guard;
        if st.closed {
            return Err(Error::Closed);
        }
        if st.mode != Mode::Write {
            return Err(Error::ModeMismatch {
                op: "perform puts",
                mode: st.mode,
            });
        }
        drain_puts(st);
        Ok(())
    }

    /// Execute every scheduled get, filling the futures handed out by
    /// [`get`](Engine::get).
    pub fn perform_gets(&self) -> Result<(), Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        let mut guard = state.borrow_mut();
        let st = &mut *guard;
        if st.closed {
            return Err(Error::Closed);
        }
        if st.mode != Mode::Read {
            return Err(Error::ModeMismatch {
                op: "perform gets",
                mode: st.mode,
            });
        }
        let pending = std::mem::take(&mut st.pending_gets);
        let source = st.source.as_ref().ok_or(Error::Closed)?;
        let container = st.container.as_ref().ok_or(Error::Closed)?;
        let image = source.as_bytes();
        for get in pending {
            let record = container
                .variable(&get.name)
                .ok_or_else(|| Error::UnknownVariable(get.name.clone()))?;
            let raw = container.payload(image, record)?;
            let decoded = decode_values(record.dtype, raw)?;
            st.stats.bytes_read += raw.len() as u64;
            st.stats.gets_executed += 1;
            *get.slot.borrow_mut() = Some(decoded);
        }
        Ok(())
    }

    /// Close the engine and remove it from the group's registry.
    ///
    /// A write engine first executes any still-deferred puts, then
    /// builds and commits the container image. A read engine drops its
    /// source; unfilled futures stay unready forever. Closing twice
    /// fails.
    pub fn close(&self) -> Result<(), Error> {
        let state = self.state.upgrade().ok_or(Error::Closed)?;
        let (io_weak, name) = {
            let mut guard = state.borrow_mut();
            let st = &mut *guard;
            if st.closed {
                return Err(Error::Closed);
            }
            if st.mode == Mode::Write {
                drain_puts(st);
                let image = build_image(st)?;
                let sink = st.sink.as_mut().ok_or(Error::Closed)?;
                sink.commit(&image)?;
                st.stats.bytes_written += image.len() as u64;
            }
            st.closed = true;
            st.sink = None;
            st.source = None;
            st.container = None;
            st.pending_gets.clear();
            st.staged.clear();
            (st.io.clone(), st.name.clone())
        };
        // registry removal drops the state; do it outside the borrow
        if let Some(io_rc) = io_weak.upgrade() {
            io_rc.borrow_mut().engines.remove(&name);
        }
        Ok(())
    }
}

fn drain_puts(st: &mut EngineState) {
    for put in st.pending_puts.drain(..) {
        st.staged.insert(put.name, put.bytes);
        st.stats.puts_executed += 1;
    }
}

/// Check `supplied` elements against the variable's selection,
/// adjusting the selection where the data model allows it.
fn reconcile_selection(name: &str, def: &mut VariableDef, supplied: u64) -> Result<(), Error> {
    let selected = match &def.count {
        Some(count) => Some(count.iter().product::<u64>()),
        None if def.ndims == 0 => Some(1),
        None => None,
    };
    if selected == Some(supplied) {
        return Ok(());
    }
    // a global array with no selection adopts its whole extent
    if def.count.is_none() {
        if let Some(shape) = &def.shape {
            if shape.iter().product::<u64>() == supplied {
                def.count = Some(shape.clone());
                if def.start.is_none() {
                    def.start = Some(vec![0; def.ndims]);
                }
                return Ok(());
            }
        }
    }
    // unconstrained 1-D local arrays grow or shrink to fit
    if def.ndims == 1 && def.shape.is_none() && !def.constant_dims {
        def.count = Some(vec![supplied]);
        return Ok(());
    }
    let expected = selected
        .or_else(|| def.shape.as_ref().map(|s| s.iter().product()))
        .unwrap_or(0);
    Err(Error::SelectionMismatch {
        name: name.to_string(),
        expected,
        actual: supplied,
    })
}

/// Build the container image for a closing write engine from the
/// group's definitions and the staged payloads.
fn build_image(st: &mut EngineState) -> Result<Vec<u8>, Error> {
    let io_rc = st.io.upgrade().ok_or(Error::Closed)?;
    let mut io_guard = io_rc.borrow_mut();
    let io_state = &mut *io_guard;

    let stats_on = io_state.parameters.get("StatsLevel").map(String::as_str) != Some("0");
    let mut writer = ContainerWriter::new();
    writer.set_compute_stats(stats_on);

    for (name, def) in io_state.variables.iter_mut() {
        let payload = st.staged.get(name).cloned().unwrap_or_default();
        if stats_on {
            def.minmax = values::minmax(def.dtype, &payload);
        }
        writer.add_variable(
            VariableRecord {
                name: name.clone(),
                dtype: def.dtype,
                shape_id: def.shape_id,
                constant_dims: def.constant_dims,
                shape: def.shape.clone(),
                start: def.start.clone(),
                count: def.count.clone(),
                minmax: None,
                data_offset: 0,
                data_len: 0,
            },
            payload,
        );
    }
    for (name, def) in io_state.attributes.iter() {
        writer.add_attribute(AttributeRecord {
            name: name.clone(),
            is_value: def.is_value,
            data: def.data.clone(),
        });
    }
    Ok(writer.finish()?)
}
