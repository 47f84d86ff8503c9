//! Facade-level error taxonomy.
//!
//! # Responsibility
//! - Classify failures by the stage that produced them so callers of the
//!   `try_*` surface can branch on the cause.
//! - Provide stable `error_code` strings for log events.

use crate::config::ConfigError;
use crate::mapping::MappingError;
use crate::runtime::RuntimeError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OrmResult<T> = Result<T, OrmError>;

/// Failure of one facade operation.
#[derive(Debug)]
pub enum OrmError {
    /// No session factory is held; connect first.
    NotConnected,
    /// Connection parameters were rejected before reaching the runtime.
    Configuration(ConfigError),
    /// Configuration or session factory could not be built.
    Connectivity(RuntimeError),
    SessionOpen(RuntimeError),
    Query(RuntimeError),
    /// Failure while beginning, applying, or committing a unit of work.
    Transaction(RuntimeError),
    Schema(RuntimeError),
    Mapping(MappingError),
    /// An entity's own validation refused the write.
    Validation(MappingError),
}

impl OrmError {
    /// Stable identifier used as `error_code` in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Configuration(_) => "configuration_invalid",
            Self::Connectivity(_) => "connectivity_failed",
            Self::SessionOpen(_) => "session_open_failed",
            Self::Query(_) => "query_failed",
            Self::Transaction(_) => "transaction_failed",
            Self::Schema(_) => "schema_failed",
            Self::Mapping(_) => "mapping_failed",
            Self::Validation(_) => "validation_failed",
        }
    }

    /// Wraps a runtime error, surfacing mapping problems as `Mapping`.
    pub(crate) fn from_runtime(wrap: fn(RuntimeError) -> Self, err: RuntimeError) -> Self {
        match err {
            RuntimeError::Mapping(mapping) => Self::Mapping(mapping),
            other => wrap(other),
        }
    }
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Configuration(err) => write!(f, "invalid configuration: {err}"),
            Self::Connectivity(err) => write!(f, "cannot connect: {err}"),
            Self::SessionOpen(err) => write!(f, "cannot open session: {err}"),
            Self::Query(err) => write!(f, "query failed: {err}"),
            Self::Transaction(err) => write!(f, "transaction failed: {err}"),
            Self::Schema(err) => write!(f, "schema operation failed: {err}"),
            Self::Mapping(err) => write!(f, "mapping error: {err}"),
            Self::Validation(err) => write!(f, "validation failed: {err}"),
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotConnected => None,
            Self::Configuration(err) => Some(err),
            Self::Connectivity(err)
            | Self::SessionOpen(err)
            | Self::Query(err)
            | Self::Transaction(err)
            | Self::Schema(err) => Some(err),
            Self::Mapping(err) | Self::Validation(err) => Some(err),
        }
    }
}

impl From<ConfigError> for OrmError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}

impl From<MappingError> for OrmError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}
