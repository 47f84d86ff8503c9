//! In-process runtime that records every session call and fails on demand.

use ormgate_core::{
    CacheMode, Configuration, ConnectParams, DatabaseKind, Entity, EntityMapping, MappingSet,
    OrmRuntime, Record, RuntimeError, RuntimeResult, Session, SessionFactory, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Switches read by the fake on every call; flip them at any time.
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub open: bool,
    pub begin: bool,
    pub commit: bool,
    pub rollback: bool,
    pub close: bool,
    pub schema: bool,
    /// 1-based index of the write that fails inside a session.
    pub write_at: Option<usize>,
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<String>>,
    faults: Mutex<Faults>,
}

/// Handle kept by the test to inspect the journal and inject faults.
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime(&self) -> RecordingRuntime {
        RecordingRuntime {
            recorder: self.clone(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.shared.events.lock().expect("events lock").clone()
    }

    pub fn clear(&self) {
        self.shared.events.lock().expect("events lock").clear();
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    pub fn set_faults(&self, faults: Faults) {
        *self.shared.faults.lock().expect("faults lock") = faults;
    }

    fn faults(&self) -> Faults {
        self.shared.faults.lock().expect("faults lock").clone()
    }

    fn push(&self, event: impl Into<String>) {
        self.shared.events.lock().expect("events lock").push(event.into());
    }
}

fn injected(stage: &str) -> RuntimeError {
    RuntimeError::Driver(format!("injected {stage} failure").into())
}

pub struct RecordingRuntime {
    recorder: Recorder,
}

impl RecordingRuntime {
    /// Factory outside any facade, for driving `UnitOfWork` directly.
    pub fn open_factory(&self) -> RuntimeResult<Box<dyn SessionFactory>> {
        let config =
            self.build_configuration(&ConnectParams::sqlite("recorded.db"), &MappingSet::new())?;
        self.build_session_factory(&config)
    }
}

impl OrmRuntime for RecordingRuntime {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports(&self, _kind: DatabaseKind) -> bool {
        true
    }

    fn build_session_factory(
        &self,
        _config: &Configuration,
    ) -> RuntimeResult<Box<dyn SessionFactory>> {
        self.recorder.push("factory_open");
        Ok(Box::new(RecordingFactory {
            recorder: self.recorder.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    fn update_schema(&self, _config: &Configuration) -> RuntimeResult<()> {
        self.recorder.push("schema_update");
        if self.recorder.faults().schema {
            return Err(injected("schema"));
        }
        Ok(())
    }

    fn export_schema(&self, _config: &Configuration) -> RuntimeResult<()> {
        self.recorder.push("schema_export");
        Ok(())
    }
}

struct RecordingFactory {
    recorder: Recorder,
    closed: AtomicBool,
}

impl SessionFactory for RecordingFactory {
    fn open_session(&self) -> RuntimeResult<Box<dyn Session>> {
        if self.is_closed() {
            return Err(RuntimeError::FactoryClosed);
        }
        if self.recorder.faults().open {
            self.recorder.push("open!");
            return Err(injected("open"));
        }
        self.recorder.push("open");
        Ok(Box::new(RecordingSession {
            recorder: self.recorder.clone(),
            open: true,
            cache_mode: CacheMode::Normal,
            in_transaction: false,
            writes: 0,
        }))
    }

    fn close(&self) -> RuntimeResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.recorder.push("factory_close");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct RecordingSession {
    recorder: Recorder,
    open: bool,
    cache_mode: CacheMode,
    in_transaction: bool,
    writes: usize,
}

impl RecordingSession {
    fn write(&mut self, verb: &str, entity: &dyn Entity) -> RuntimeResult<()> {
        self.writes += 1;
        let event = format!("{verb}:{}", entity.id());
        if self.recorder.faults().write_at == Some(self.writes) {
            self.recorder.push(format!("{event}!"));
            return Err(injected(verb));
        }
        self.recorder.push(event);
        Ok(())
    }
}

impl Session for RecordingSession {
    fn is_open(&self) -> bool {
        self.open
    }

    fn is_connected(&self) -> bool {
        self.recorder.push("ping");
        true
    }

    fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    fn set_cache_mode(&mut self, mode: CacheMode) -> RuntimeResult<()> {
        self.recorder.push(format!("cache:{mode:?}"));
        self.cache_mode = mode;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn begin_transaction(&mut self) -> RuntimeResult<()> {
        if self.recorder.faults().begin {
            self.recorder.push("begin!");
            return Err(injected("begin"));
        }
        self.recorder.push("begin");
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> RuntimeResult<()> {
        if self.recorder.faults().commit {
            self.recorder.push("commit!");
            return Err(injected("commit"));
        }
        self.recorder.push("commit");
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> RuntimeResult<()> {
        self.in_transaction = false;
        if self.recorder.faults().rollback {
            self.recorder.push("rollback!");
            return Err(injected("rollback"));
        }
        self.recorder.push("rollback");
        Ok(())
    }

    fn list(&mut self, mapping: &EntityMapping) -> RuntimeResult<Vec<Record>> {
        self.recorder.push(format!("list:{}", mapping.table));
        Ok(Vec::new())
    }

    fn get(&mut self, mapping: &EntityMapping, id: &Value) -> RuntimeResult<Option<Record>> {
        self.recorder.push(format!("get:{}:{id}", mapping.table));
        Ok(None)
    }

    fn save_or_update(&mut self, entity: &dyn Entity) -> RuntimeResult<()> {
        self.write("save", entity)
    }

    fn delete(&mut self, entity: &dyn Entity) -> RuntimeResult<()> {
        self.write("delete", entity)
    }

    fn close(&mut self) -> RuntimeResult<()> {
        self.open = false;
        if self.recorder.faults().close {
            self.recorder.push("close!");
            return Err(injected("close"));
        }
        self.recorder.push("close");
        Ok(())
    }
}
