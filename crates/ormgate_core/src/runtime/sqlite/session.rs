//! SQLite-backed session with an owned transaction.

use super::gate::GatePass;
use crate::mapping::{Entity, EntityMapping, MappingError, MappingSet, Record, Value};
use crate::runtime::{CacheMode, RuntimeError, RuntimeResult, Session};
use log::warn;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};

/// One connection, at most one transaction.
pub struct SqliteSession {
    conn: Option<Connection>,
    mappings: MappingSet,
    cache_mode: CacheMode,
    in_transaction: bool,
    // Declared after `conn` so the connection drops first.
    pass: Option<GatePass>,
}

impl SqliteSession {
    pub(super) fn new(conn: Connection, mappings: MappingSet, pass: Option<GatePass>) -> Self {
        Self {
            conn: Some(conn),
            mappings,
            cache_mode: CacheMode::Normal,
            in_transaction: false,
            pass,
        }
    }

    fn conn(&self) -> RuntimeResult<&Connection> {
        self.conn.as_ref().ok_or(RuntimeError::SessionClosed)
    }

    fn registered(&self, mapping: &EntityMapping) -> RuntimeResult<&'static EntityMapping> {
        Ok(self.mappings.require(mapping)?)
    }
}

impl Session for SqliteSession {
    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|conn| {
            conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
    }

    fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    fn set_cache_mode(&mut self, mode: CacheMode) -> RuntimeResult<()> {
        let query_only = i32::from(mode == CacheMode::Get);
        self.conn()?
            .execute_batch(&format!("PRAGMA query_only = {query_only};"))?;
        self.cache_mode = mode;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn begin_transaction(&mut self) -> RuntimeResult<()> {
        if self.in_transaction {
            return Err(RuntimeError::TransactionActive);
        }
        self.conn()?.execute_batch("BEGIN IMMEDIATE;")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> RuntimeResult<()> {
        if !self.in_transaction {
            return Err(RuntimeError::NoTransaction);
        }
        self.conn()?.execute_batch("COMMIT;")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> RuntimeResult<()> {
        if !self.in_transaction {
            return Err(RuntimeError::NoTransaction);
        }
        // The transaction is over either way; a failed ROLLBACK leaves
        // SQLite to discard it when the connection closes.
        self.in_transaction = false;
        self.conn()?.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    fn list(&mut self, mapping: &EntityMapping) -> RuntimeResult<Vec<Record>> {
        let mapping = self.registered(mapping)?;
        let id_column = id_column(mapping)?;
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY \"{}\";",
            column_list(mapping),
            mapping.table,
            id_column
        );

        let mut stmt = self.conn()?.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record(row, mapping)?);
        }
        Ok(records)
    }

    fn get(&mut self, mapping: &EntityMapping, id: &Value) -> RuntimeResult<Option<Record>> {
        let mapping = self.registered(mapping)?;
        let id_column = id_column(mapping)?;
        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE \"{}\" = ?1;",
            column_list(mapping),
            mapping.table,
            id_column
        );

        let mut stmt = self.conn()?.prepare(&sql)?;
        let mut rows = stmt.query([to_sql(id)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record(row, mapping)?)),
            None => Ok(None),
        }
    }

    fn save_or_update(&mut self, entity: &dyn Entity) -> RuntimeResult<()> {
        let mapping = self.registered(entity.mapping())?;
        let id_column = id_column(mapping)?;
        let record = entity.to_record();
        mapping.check_record(&record)?;

        let placeholders = (1..=mapping.columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = mapping
            .columns
            .iter()
            .skip(1)
            .map(|column| format!("\"{0}\" = excluded.\"{0}\"", column.name))
            .collect::<Vec<_>>();
        let conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({placeholders}) ON CONFLICT(\"{id_column}\") {conflict};",
            mapping.table,
            column_list(mapping)
        );

        self.conn()?
            .execute(&sql, params_from_iter(record.values().iter().map(to_sql)))?;
        Ok(())
    }

    fn delete(&mut self, entity: &dyn Entity) -> RuntimeResult<()> {
        let mapping = self.registered(entity.mapping())?;
        let id_column = id_column(mapping)?;
        let id = entity.id();
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{id_column}\" = ?1;",
            mapping.table
        );

        let changed = self.conn()?.execute(&sql, [to_sql(&id)])?;
        if changed == 0 {
            return Err(RuntimeError::StaleState {
                table: mapping.table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn close(&mut self) -> RuntimeResult<()> {
        let conn = self.conn.take().ok_or(RuntimeError::SessionClosed)?;
        if self.in_transaction {
            self.in_transaction = false;
            if let Err(err) = conn.execute_batch("ROLLBACK;") {
                warn!("event=session_close module=runtime status=warn rollback_error={err}");
            }
        }
        let closed = conn.close().map_err(|(_, err)| RuntimeError::from(err));
        self.pass = None;
        closed
    }
}

fn id_column(mapping: &EntityMapping) -> RuntimeResult<&'static str> {
    mapping
        .columns
        .first()
        .map(|column| column.name)
        .ok_or(RuntimeError::Mapping(MappingError::EmptyMapping(
            mapping.table,
        )))
}

fn column_list(mapping: &EntityMapping) -> String {
    mapping
        .column_names()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_record(row: &Row<'_>, mapping: &EntityMapping) -> RuntimeResult<Record> {
    let mut values = Vec::with_capacity(mapping.columns.len());
    for index in 0..mapping.columns.len() {
        values.push(from_sql(row.get::<_, SqlValue>(index)?));
    }
    Ok(Record::new(values))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(*value),
        Value::Real(value) => SqlValue::Real(*value),
        Value::Text(value) => SqlValue::Text(value.clone()),
        Value::Blob(value) => SqlValue::Blob(value.clone()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(value),
        SqlValue::Real(value) => Value::Real(value),
        SqlValue::Text(value) => Value::Text(value),
        SqlValue::Blob(value) => Value::Blob(value),
    }
}
