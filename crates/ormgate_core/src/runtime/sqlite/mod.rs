//! Bundled SQLite runtime over `rusqlite`.
//!
//! # Responsibility
//! - Open per-session SQLite connections for file and in-memory databases.
//! - Run schema update/export for the registered mappings.
//!
//! # Invariants
//! - Every connection has `foreign_keys=ON` and a busy timeout.
//! - An in-memory database lives exactly as long as its factory's anchor
//!   connection; closing the factory discards it.
//! - Sessions and schema work on one in-memory database run one at a time.

mod gate;
mod schema;
mod session;

pub use session::SqliteSession;

use self::gate::{memory_gate, GatePass, SessionGate};
use super::{OrmRuntime, RuntimeError, RuntimeResult, Session, SessionFactory};
use crate::config::{Configuration, ConnectionDescriptor, DatabaseKind, IsolationLevel};
use crate::mapping::MappingSet;
use log::{error, info};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime supporting `DatabaseKind::Sqlite` only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRuntime;

impl SqliteRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl OrmRuntime for SqliteRuntime {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports(&self, kind: DatabaseKind) -> bool {
        kind == DatabaseKind::Sqlite
    }

    fn build_session_factory(
        &self,
        config: &Configuration,
    ) -> RuntimeResult<Box<dyn SessionFactory>> {
        let factory = SqliteSessionFactory::open(config)?;
        Ok(Box::new(factory))
    }

    fn update_schema(&self, config: &Configuration) -> RuntimeResult<()> {
        let target = SqliteTarget::from_config(config)?;
        let _pass = target.exclusive()?;
        let mut conn = open_connection(&target, config.isolation())?;
        schema::update_schema(&mut conn, config.mappings())
    }

    fn export_schema(&self, config: &Configuration) -> RuntimeResult<()> {
        let target = SqliteTarget::from_config(config)?;
        let _pass = target.exclusive()?;
        let mut conn = open_connection(&target, config.isolation())?;
        schema::export_schema(&mut conn, config.mappings())
    }
}

/// Resolved location of the database behind one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SqliteTarget {
    File(PathBuf),
    /// Shared-cache URI unique to one configuration.
    Memory(String),
}

impl SqliteTarget {
    fn from_config(config: &Configuration) -> RuntimeResult<Self> {
        match config.descriptor() {
            ConnectionDescriptor::File { path } => Ok(Self::File(path.clone())),
            ConnectionDescriptor::Memory => Ok(Self::Memory(format!(
                "file:ormgate-{}?mode=memory&cache=shared",
                config.instance_id().simple()
            ))),
            ConnectionDescriptor::Network { .. } => {
                Err(RuntimeError::UnsupportedKind(config.kind()))
            }
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory(_) => "memory",
        }
    }

    /// File databases rely on the busy timeout instead.
    fn gate(&self) -> Option<Arc<SessionGate>> {
        match self {
            Self::File(_) => None,
            Self::Memory(uri) => Some(memory_gate(uri)),
        }
    }

    fn exclusive(&self) -> RuntimeResult<Option<GatePass>> {
        self.gate()
            .map(|gate| gate.acquire(BUSY_TIMEOUT))
            .transpose()
    }
}

fn open_connection(target: &SqliteTarget, isolation: IsolationLevel) -> RuntimeResult<Connection> {
    let conn = match target {
        SqliteTarget::File(path) => Connection::open(path)?,
        // Default open flags include SQLITE_OPEN_URI.
        SqliteTarget::Memory(uri) => Connection::open(uri)?,
    };
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if isolation == IsolationLevel::ReadUncommitted {
        conn.execute_batch("PRAGMA read_uncommitted = 1;")?;
    }
    Ok(conn)
}

/// Session factory bound to one SQLite database.
pub struct SqliteSessionFactory {
    target: SqliteTarget,
    mappings: MappingSet,
    isolation: IsolationLevel,
    closed: AtomicBool,
    anchor: Mutex<Option<Connection>>,
    gate: Option<Arc<SessionGate>>,
}

impl SqliteSessionFactory {
    /// Opens the factory and verifies the database is reachable.
    ///
    /// The first connection is kept as the anchor for in-memory databases
    /// and closed right away for files.
    pub fn open(config: &Configuration) -> RuntimeResult<Self> {
        let started_at = Instant::now();
        let target = SqliteTarget::from_config(config)?;
        let first = match open_connection(&target, config.isolation()) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=factory_open module=runtime status=error mode={} duration_ms={} error={}",
                    target.mode(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        let anchor = match target {
            SqliteTarget::Memory(_) => Some(first),
            SqliteTarget::File(_) => {
                close_connection(first)?;
                None
            }
        };

        info!(
            "event=factory_open module=runtime status=ok mode={} duration_ms={}",
            target.mode(),
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            gate: target.gate(),
            target,
            mappings: config.mappings().clone(),
            isolation: config.isolation(),
            closed: AtomicBool::new(false),
            anchor: Mutex::new(anchor),
        })
    }
}

impl SessionFactory for SqliteSessionFactory {
    fn open_session(&self) -> RuntimeResult<Box<dyn Session>> {
        if self.is_closed() {
            return Err(RuntimeError::FactoryClosed);
        }
        let pass = self
            .gate
            .as_ref()
            .map(|gate| gate.acquire(BUSY_TIMEOUT))
            .transpose()?;
        let conn = open_connection(&self.target, self.isolation)?;
        Ok(Box::new(SqliteSession::new(
            conn,
            self.mappings.clone(),
            pass,
        )))
    }

    fn close(&self) -> RuntimeResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let anchor = self
            .anchor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(conn) = anchor {
            close_connection(conn)?;
        }
        info!(
            "event=factory_close module=runtime status=ok mode={}",
            self.target.mode()
        );
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn close_connection(conn: Connection) -> RuntimeResult<()> {
    conn.close().map_err(|(_, err)| RuntimeError::from(err))
}
