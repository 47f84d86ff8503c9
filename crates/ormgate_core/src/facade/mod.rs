//! Procedural facade over an ORM runtime.
//!
//! # Responsibility
//! - Own the connection slot (configuration + session factory) of one
//!   database and expose connect/disconnect, schema and CRUD operations.
//! - Keep sessions and transactions out of caller code.
//!
//! # Invariants
//! - Every operation works on a snapshot of the connection slot; connect
//!   and disconnect swap the slot atomically and never free a factory that
//!   an in-flight operation still holds.
//! - Every session opened here is closed exactly once.
//! - Boundary methods never propagate errors: they log and return
//!   `false` / empty / `None`. `try_*` methods return the classified error.
//!
//! # Known limitation
//! - On the boundary surface "not found", "query failed" and "not
//!   connected" look the same. Use `try_select_by_id`/`try_select_all` to
//!   tell them apart.

mod manager;
mod query;
mod session_scope;
mod unit_of_work;

pub use session_scope::SessionScope;
pub use unit_of_work::{UnitOfWork, UnitOp, UnitState};

use crate::config::Configuration;
use crate::error::{OrmError, OrmResult};
use crate::mapping::MappingSet;
use crate::runtime::{OrmRuntime, SessionFactory, SqliteRuntime};
use arc_swap::ArcSwapOption;
use log::error;
use std::sync::Arc;

/// Configuration and factory published by a successful connect.
pub(crate) struct ConnectedState {
    configuration: Configuration,
    factory: Box<dyn SessionFactory>,
}

/// Explicitly constructed service object replacing process-wide statics.
///
/// Independent instances share nothing, so each test or tenant can hold
/// its own.
pub struct OrmFacade {
    runtime: Arc<dyn OrmRuntime>,
    mappings: MappingSet,
    slot: ArcSwapOption<ConnectedState>,
}

impl OrmFacade {
    /// Creates a disconnected facade over `runtime`.
    pub fn new(runtime: impl OrmRuntime + 'static, mappings: MappingSet) -> Self {
        Self::with_runtime(Arc::new(runtime), mappings)
    }

    pub fn with_runtime(runtime: Arc<dyn OrmRuntime>, mappings: MappingSet) -> Self {
        Self {
            runtime,
            mappings,
            slot: ArcSwapOption::from(None),
        }
    }

    /// Creates a disconnected facade over the bundled SQLite runtime.
    pub fn sqlite(mappings: MappingSet) -> Self {
        Self::new(SqliteRuntime::new(), mappings)
    }

    pub fn mappings(&self) -> &MappingSet {
        &self.mappings
    }

    /// Configuration of the current connection, if any.
    pub fn configuration(&self) -> Option<Configuration> {
        self.slot
            .load()
            .as_ref()
            .map(|state| state.configuration.clone())
    }

    /// Whether a session factory is currently held. Does no I/O; use
    /// `is_connected` for a liveness check.
    pub fn has_factory(&self) -> bool {
        self.slot.load().is_some()
    }

    fn snapshot(&self) -> OrmResult<Arc<ConnectedState>> {
        self.slot.load_full().ok_or(OrmError::NotConnected)
    }
}

impl Drop for OrmFacade {
    fn drop(&mut self) {
        if let Some(state) = self.slot.swap(None) {
            if let Err(err) = state.factory.close() {
                error!(
                    "event=disconnect module=facade status=error trigger=drop error_code=connectivity_failed error={}",
                    err
                );
            }
        }
    }
}

/// Logs `result`'s error under `event` and collapses it to `fallback`.
fn boundary<T>(event: &'static str, result: OrmResult<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            error!(
                "event={} module=facade status=error error_code={} error={}",
                event,
                err.code(),
                err
            );
            fallback
        }
    }
}
