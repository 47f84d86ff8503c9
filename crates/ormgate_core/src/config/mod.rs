//! Connection parameters, database kinds and immutable configuration.
//!
//! # Responsibility
//! - Describe which database the facade should connect to.
//! - Turn caller-supplied parameters into a connection descriptor through a
//!   per-kind strategy table (see `descriptor`).
//! - Hold the immutable `Configuration` built once per connect.
//!
//! # Invariants
//! - Parameters are validated before any runtime is touched.
//! - Passwords never reach log output; use `ConnectionDescriptor::redacted`.

mod configuration;
mod descriptor;

pub use configuration::{Configuration, IsolationLevel};
pub use descriptor::{build_descriptor, descriptor_strategy, ConnectionDescriptor, DescriptorFn};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Database products the facade knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    MySql,
    PostgreSql,
    Sqlite,
    SqlServer2008,
    Oracle10,
}

/// Stable string id for MySQL.
pub const DATABASE_KIND_MYSQL: &str = "mysql";
/// Stable string id for PostgreSQL.
pub const DATABASE_KIND_POSTGRESQL: &str = "postgresql";
/// Stable string id for SQLite.
pub const DATABASE_KIND_SQLITE: &str = "sqlite";
/// Stable string id for SQL Server 2008.
pub const DATABASE_KIND_SQLSERVER2008: &str = "sqlserver2008";
/// Stable string id for Oracle 10.
pub const DATABASE_KIND_ORACLE10: &str = "oracle10";

impl DatabaseKind {
    /// All kinds, in declaration order.
    pub const ALL: [DatabaseKind; 5] = [
        DatabaseKind::MySql,
        DatabaseKind::PostgreSql,
        DatabaseKind::Sqlite,
        DatabaseKind::SqlServer2008,
        DatabaseKind::Oracle10,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MySql => DATABASE_KIND_MYSQL,
            Self::PostgreSql => DATABASE_KIND_POSTGRESQL,
            Self::Sqlite => DATABASE_KIND_SQLITE,
            Self::SqlServer2008 => DATABASE_KIND_SQLSERVER2008,
            Self::Oracle10 => DATABASE_KIND_ORACLE10,
        }
    }

    /// File-based kinds use `database` as a path instead of a network address.
    pub fn is_file_based(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl Display for DatabaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a database kind from its stable string id.
pub fn parse_database_kind(value: &str) -> Result<DatabaseKind, ConfigError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(ConfigError::EmptyField("kind"));
    }

    match normalized.to_ascii_lowercase().as_str() {
        DATABASE_KIND_MYSQL => Ok(DatabaseKind::MySql),
        DATABASE_KIND_POSTGRESQL => Ok(DatabaseKind::PostgreSql),
        DATABASE_KIND_SQLITE => Ok(DatabaseKind::Sqlite),
        DATABASE_KIND_SQLSERVER2008 => Ok(DatabaseKind::SqlServer2008),
        DATABASE_KIND_ORACLE10 => Ok(DatabaseKind::Oracle10),
        _ => Err(ConfigError::UnknownKind(normalized.to_string())),
    }
}

/// Caller-supplied connection parameters.
///
/// Network kinds read `server`/`port`; file-based kinds only read
/// `database`, which is the file path (or `:memory:`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    pub kind: DatabaseKind,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub isolation: IsolationLevel,
}

impl ConnectParams {
    /// Full parameter set, mirroring the positional connect call.
    pub fn new(
        kind: DatabaseKind,
        server: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            server: server.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            isolation: IsolationLevel::default(),
        }
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Parameters for a SQLite file (or `:memory:`).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(DatabaseKind::Sqlite, "", 0, path, "", "")
    }

    /// Loads parameters from a JSON document on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let params: Self = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Rejects parameter sets that cannot describe a connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::EmptyField("database"));
        }
        if !self.kind.is_file_based() && self.server.trim().is_empty() {
            return Err(ConfigError::EmptyField("server"));
        }
        Ok(())
    }
}

/// Errors raised while validating or loading connection parameters.
#[derive(Debug)]
pub enum ConfigError {
    EmptyField(&'static str),
    UnknownKind(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "connection parameter `{field}` must not be empty"),
            Self::UnknownKind(value) => write!(
                f,
                "unknown database kind `{value}`; expected mysql|postgresql|sqlite|sqlserver2008|oracle10"
            ),
            Self::Io(err) => write!(f, "failed to read connection parameters: {err}"),
            Self::Json(err) => write!(f, "invalid connection parameters: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::EmptyField(_) | Self::UnknownKind(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
