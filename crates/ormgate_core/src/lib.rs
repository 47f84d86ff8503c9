//! Procedural facade over an ORM runtime.
//!
//! Callers connect once, then select, save and delete entities without
//! ever handling sessions or transactions. The facade decides when a
//! session opens, when a transaction wraps the work, and guarantees
//! commit-or-rollback and closure on every path.

pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod mapping;
pub mod runtime;

pub use config::{
    parse_database_kind, ConfigError, ConnectParams, Configuration, ConnectionDescriptor,
    DatabaseKind, IsolationLevel,
};
pub use error::{OrmError, OrmResult};
pub use facade::{OrmFacade, SessionScope, UnitOfWork, UnitOp, UnitState};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use mapping::{
    ColumnDef, ColumnType, Entity, EntityMapping, EntityType, MappingError, MappingSet, Record,
    Value,
};
pub use runtime::{
    CacheMode, OrmRuntime, RuntimeError, RuntimeResult, Session, SessionFactory, SqliteRuntime,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
