//! Capability interface of the ORM runtime wrapped by the facade.
//!
//! # Responsibility
//! - Define the narrow contract the facade consumes: configuration and
//!   session-factory construction, sessions with owned transactions, and
//!   schema update/export.
//! - Ship a bundled SQLite implementation (`sqlite`).
//!
//! # Invariants
//! - A `SessionFactory` is shareable across threads; a `Session` is not and
//!   is exclusively owned by the operation that opened it.
//! - A session owns at most one active transaction at a time.

pub mod sqlite;

use crate::config::{build_descriptor, ConnectParams, Configuration, DatabaseKind};
use crate::mapping::{Entity, EntityMapping, MappingError, MappingSet, Record, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use sqlite::SqliteRuntime;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Second-level cache interaction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Normal,
    /// Read from the cache, never write to it; used for read-only work.
    Get,
    Put,
    Refresh,
    Ignore,
}

/// Entry point of an ORM runtime.
pub trait OrmRuntime: Send + Sync {
    /// Short runtime name used in log events.
    fn name(&self) -> &'static str;

    fn supports(&self, kind: DatabaseKind) -> bool;

    /// Builds an immutable configuration from parameters and mappings.
    fn build_configuration(
        &self,
        params: &ConnectParams,
        mappings: &MappingSet,
    ) -> RuntimeResult<Configuration> {
        if !self.supports(params.kind) {
            return Err(RuntimeError::UnsupportedKind(params.kind));
        }
        Ok(Configuration::new(
            params.kind,
            build_descriptor(params),
            mappings.clone(),
        )
        .with_isolation(params.isolation))
    }

    /// Builds the expensive, shareable session factory.
    fn build_session_factory(&self, config: &Configuration)
        -> RuntimeResult<Box<dyn SessionFactory>>;

    /// Applies additive schema changes; never drops data.
    fn update_schema(&self, config: &Configuration) -> RuntimeResult<()>;

    /// Drops and recreates every mapped table. Erases all data.
    fn export_schema(&self, config: &Configuration) -> RuntimeResult<()>;
}

/// Thread-shareable producer of sessions.
///
/// Dropping the factory disposes of it.
pub trait SessionFactory: Send + Sync {
    fn open_session(&self) -> RuntimeResult<Box<dyn Session>>;

    /// Releases factory resources; later `open_session` calls fail.
    fn close(&self) -> RuntimeResult<()>;

    fn is_closed(&self) -> bool;
}

/// Short-lived unit-of-work handle.
pub trait Session {
    fn is_open(&self) -> bool;

    /// Performs a cheap round trip to the database.
    fn is_connected(&self) -> bool;

    fn cache_mode(&self) -> CacheMode;

    fn set_cache_mode(&mut self, mode: CacheMode) -> RuntimeResult<()>;

    fn in_transaction(&self) -> bool;

    fn begin_transaction(&mut self) -> RuntimeResult<()>;

    fn commit(&mut self) -> RuntimeResult<()>;

    fn rollback(&mut self) -> RuntimeResult<()>;

    /// All rows of the mapped table, ordered by primary key.
    fn list(&mut self, mapping: &EntityMapping) -> RuntimeResult<Vec<Record>>;

    fn get(&mut self, mapping: &EntityMapping, id: &Value) -> RuntimeResult<Option<Record>>;

    /// Insert-or-update keyed on the primary key.
    fn save_or_update(&mut self, entity: &dyn Entity) -> RuntimeResult<()>;

    fn delete(&mut self, entity: &dyn Entity) -> RuntimeResult<()>;

    /// Closes the session, rolling back any transaction still active.
    fn close(&mut self) -> RuntimeResult<()>;
}

/// Errors reported by a runtime implementation.
#[derive(Debug)]
pub enum RuntimeError {
    UnsupportedKind(DatabaseKind),
    FactoryClosed,
    SessionClosed,
    TransactionActive,
    NoTransaction,
    StaleState { table: &'static str, id: String },
    Mapping(MappingError),
    Driver(Box<dyn Error + Send + Sync>),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedKind(kind) => {
                write!(f, "database kind `{kind}` is not supported by this runtime")
            }
            Self::FactoryClosed => write!(f, "session factory is closed"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::TransactionActive => write!(f, "a transaction is already active"),
            Self::NoTransaction => write!(f, "no active transaction"),
            Self::StaleState { table, id } => {
                write!(f, "row `{table}` with id {id} does not exist")
            }
            Self::Mapping(err) => write!(f, "{err}"),
            Self::Driver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Mapping(err) => Some(err),
            Self::Driver(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<MappingError> for RuntimeError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

impl From<rusqlite::Error> for RuntimeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Driver(Box::new(value))
    }
}
