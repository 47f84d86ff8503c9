//! Entity mapping source handed to the ORM runtime.
//!
//! # Responsibility
//! - Describe how entity types map to tables and columns.
//! - Convert entities to runtime-neutral records and back.
//!
//! # Invariants
//! - Entities stay opaque to the facade: it only routes records between
//!   callers and sessions.
//! - Table and column names are plain SQL identifiers; anything else is
//!   rejected when the mapping is registered.

mod value;

pub use value::{ColumnDef, ColumnType, EntityMapping, Record, Value};

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Write-side view of a persisted object.
///
/// Object-safe so heterogeneous batches can be passed as `&[&dyn Entity]`.
pub trait Entity {
    /// Table mapping this object is persisted through.
    fn mapping(&self) -> &'static EntityMapping;

    /// Column values in mapping order; the first value is the primary key.
    fn to_record(&self) -> Record;

    /// Primary key value.
    fn id(&self) -> Value {
        self.to_record().get(0).cloned().unwrap_or(Value::Null)
    }

    /// Business validation run before any write reaches the session.
    fn validate(&self) -> Result<(), MappingError> {
        Ok(())
    }
}

impl<E: Entity + ?Sized> Entity for &E {
    fn mapping(&self) -> &'static EntityMapping {
        (**self).mapping()
    }

    fn to_record(&self) -> Record {
        (**self).to_record()
    }

    fn id(&self) -> Value {
        (**self).id()
    }

    fn validate(&self) -> Result<(), MappingError> {
        (**self).validate()
    }
}

/// Read-side view: how to materialize an entity type from a record.
pub trait EntityType: Entity + Sized {
    fn entity_mapping() -> &'static EntityMapping;

    fn from_record(record: Record) -> Result<Self, MappingError>;
}

/// Registered entity mappings, unique by table name.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    mappings: Vec<&'static EntityMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of an entity type.
    pub fn with<E: EntityType>(mut self) -> Result<Self, MappingError> {
        self.add(E::entity_mapping())?;
        Ok(self)
    }

    /// Registers one mapping after checking its shape.
    pub fn add(&mut self, mapping: &'static EntityMapping) -> Result<(), MappingError> {
        validate_mapping(mapping)?;
        if self.contains(mapping.table) {
            return Err(MappingError::DuplicateTable(mapping.table));
        }
        self.mappings.push(mapping);
        Ok(())
    }

    pub fn contains(&self, table: &str) -> bool {
        self.find(table).is_some()
    }

    pub fn find(&self, table: &str) -> Option<&'static EntityMapping> {
        self.mappings
            .iter()
            .copied()
            .find(|mapping| mapping.table == table)
    }

    /// Returns the registered mapping or `UnmappedEntity`.
    pub fn require(&self, mapping: &EntityMapping) -> Result<&'static EntityMapping, MappingError> {
        self.find(mapping.table)
            .ok_or(MappingError::UnmappedEntity(mapping.table))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static EntityMapping> + '_ {
        self.mappings.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

fn validate_mapping(mapping: &EntityMapping) -> Result<(), MappingError> {
    if !IDENTIFIER_RE.is_match(mapping.table) {
        return Err(MappingError::InvalidIdentifier(mapping.table.to_string()));
    }
    if mapping.columns.is_empty() {
        return Err(MappingError::EmptyMapping(mapping.table));
    }
    for (index, column) in mapping.columns.iter().enumerate() {
        if !IDENTIFIER_RE.is_match(column.name) {
            return Err(MappingError::InvalidIdentifier(column.name.to_string()));
        }
        if mapping.columns[..index]
            .iter()
            .any(|previous| previous.name.eq_ignore_ascii_case(column.name))
        {
            return Err(MappingError::DuplicateColumn {
                table: mapping.table,
                column: column.name,
            });
        }
    }
    Ok(())
}

/// Errors raised while registering mappings or converting records.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingError {
    InvalidIdentifier(String),
    EmptyMapping(&'static str),
    DuplicateTable(&'static str),
    DuplicateColumn {
        table: &'static str,
        column: &'static str,
    },
    UnmappedEntity(&'static str),
    ArityMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    NullValue {
        table: &'static str,
        column: &'static str,
    },
    TypeMismatch {
        table: &'static str,
        column: &'static str,
        expected: ColumnType,
    },
    MissingColumn {
        index: usize,
    },
    UnexpectedValue {
        index: usize,
        expected: &'static str,
        found: String,
    },
    Invalid {
        table: &'static str,
        message: String,
    },
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::EmptyMapping(table) => write!(f, "mapping for `{table}` declares no columns"),
            Self::DuplicateTable(table) => write!(f, "table `{table}` is mapped twice"),
            Self::DuplicateColumn { table, column } => {
                write!(f, "column `{column}` is declared twice in `{table}`")
            }
            Self::UnmappedEntity(table) => write!(f, "no mapping registered for `{table}`"),
            Self::ArityMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "record for `{table}` has {actual} values, mapping declares {expected}"
            ),
            Self::NullValue { table, column } => {
                write!(f, "`{table}.{column}` does not accept NULL")
            }
            Self::TypeMismatch {
                table,
                column,
                expected,
            } => write!(f, "`{table}.{column}` expects {}", expected.as_sql()),
            Self::MissingColumn { index } => write!(f, "record has no column at index {index}"),
            Self::UnexpectedValue {
                index,
                expected,
                found,
            } => write!(f, "column {index}: expected {expected}, found {found}"),
            Self::Invalid { table, message } => write!(f, "invalid `{table}` entity: {message}"),
        }
    }
}

impl Error for MappingError {}
