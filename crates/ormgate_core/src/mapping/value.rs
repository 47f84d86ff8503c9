//! Runtime-neutral column values, records and table mappings.

use super::MappingError;
use std::fmt::{Display, Formatter};

/// One column value as exchanged with a runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn fits(&self, column_type: ColumnType) -> bool {
        match (self, column_type) {
            (Self::Null, _) => true,
            (Self::Integer(_), ColumnType::Integer | ColumnType::Real) => true,
            (Self::Real(_), ColumnType::Real) => true,
            (Self::Text(_), ColumnType::Text) => true,
            (Self::Blob(_), ColumnType::Blob) => true,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
            Self::Blob(value) => write!(f, "<{} bytes>", value.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Storage class of a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// Column declaration inside an `EntityMapping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Table mapping for one entity type.
///
/// # Invariants
/// - `columns[0]` is the primary key column and is never nullable.
/// - Records exchanged for this mapping follow `columns` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityMapping {
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
}

impl EntityMapping {
    pub const fn new(table: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self { table, columns }
    }

    /// Primary key column, if the mapping declares any column at all.
    pub fn id_column(&self) -> Option<&ColumnDef> {
        self.columns.first()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }

    /// Checks arity, nullability and storage class of `record`.
    pub fn check_record(&self, record: &Record) -> Result<(), MappingError> {
        if record.len() != self.columns.len() {
            return Err(MappingError::ArityMismatch {
                table: self.table,
                expected: self.columns.len(),
                actual: record.len(),
            });
        }

        for (index, (column, value)) in self.columns.iter().zip(record.values()).enumerate() {
            let nullable = column.nullable && index > 0;
            if value.is_null() && !nullable {
                return Err(MappingError::NullValue {
                    table: self.table,
                    column: column.name,
                });
            }
            if !value.fits(column.column_type) {
                return Err(MappingError::TypeMismatch {
                    table: self.table,
                    column: column.name,
                    expected: column.column_type,
                });
            }
        }

        Ok(())
    }
}

/// Ordered column values of one row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    fn at(&self, index: usize) -> Result<&Value, MappingError> {
        self.values
            .get(index)
            .ok_or(MappingError::MissingColumn { index })
    }

    pub fn integer(&self, index: usize) -> Result<i64, MappingError> {
        match self.at(index)? {
            Value::Integer(value) => Ok(*value),
            other => Err(unexpected(index, "integer", other)),
        }
    }

    pub fn opt_integer(&self, index: usize) -> Result<Option<i64>, MappingError> {
        match self.at(index)? {
            Value::Null => Ok(None),
            _ => self.integer(index).map(Some),
        }
    }

    pub fn real(&self, index: usize) -> Result<f64, MappingError> {
        match self.at(index)? {
            Value::Real(value) => Ok(*value),
            Value::Integer(value) => Ok(*value as f64),
            other => Err(unexpected(index, "real", other)),
        }
    }

    pub fn opt_real(&self, index: usize) -> Result<Option<f64>, MappingError> {
        match self.at(index)? {
            Value::Null => Ok(None),
            _ => self.real(index).map(Some),
        }
    }

    pub fn text(&self, index: usize) -> Result<String, MappingError> {
        match self.at(index)? {
            Value::Text(value) => Ok(value.clone()),
            other => Err(unexpected(index, "text", other)),
        }
    }

    pub fn opt_text(&self, index: usize) -> Result<Option<String>, MappingError> {
        match self.at(index)? {
            Value::Null => Ok(None),
            _ => self.text(index).map(Some),
        }
    }

    pub fn blob(&self, index: usize) -> Result<Vec<u8>, MappingError> {
        match self.at(index)? {
            Value::Blob(value) => Ok(value.clone()),
            other => Err(unexpected(index, "blob", other)),
        }
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn unexpected(index: usize, expected: &'static str, found: &Value) -> MappingError {
    MappingError::UnexpectedValue {
        index,
        expected,
        found: found.to_string(),
    }
}
