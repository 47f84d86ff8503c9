//! Schema update and export for mapped tables.
//!
//! # Invariants
//! - Update only creates tables and adds columns; it never drops or alters
//!   existing data.
//! - Both operations run inside a single transaction.
//! - Every emitted DDL statement is logged at debug level.

use crate::mapping::{ColumnDef, ColumnType, EntityMapping, MappingSet};
use crate::runtime::RuntimeResult;
use log::{debug, info};
use rusqlite::Connection;
use std::collections::HashSet;
use std::time::Instant;

/// Creates missing tables and adds missing columns.
pub(super) fn update_schema(conn: &mut Connection, mappings: &MappingSet) -> RuntimeResult<()> {
    let started_at = Instant::now();
    let tx = conn.transaction()?;
    let statements = plan_update(&tx, mappings)?;
    execute_script(&tx, &statements)?;
    tx.commit()?;

    info!(
        "event=schema_update module=runtime status=ok tables={} statements={} duration_ms={}",
        mappings.len(),
        statements.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Drops and recreates every mapped table.
pub(super) fn export_schema(conn: &mut Connection, mappings: &MappingSet) -> RuntimeResult<()> {
    let started_at = Instant::now();
    let statements = plan_export(mappings);
    let tx = conn.transaction()?;
    execute_script(&tx, &statements)?;
    tx.commit()?;

    info!(
        "event=schema_export module=runtime status=ok tables={} statements={} duration_ms={}",
        mappings.len(),
        statements.len(),
        started_at.elapsed().as_millis()
    );
    Ok(())
}

fn plan_update(conn: &Connection, mappings: &MappingSet) -> RuntimeResult<Vec<String>> {
    let mut statements = Vec::new();
    for mapping in mappings.iter() {
        let existing = existing_columns(conn, mapping.table)?;
        if existing.is_empty() {
            statements.push(create_table_sql(mapping));
            continue;
        }

        for column in mapping.columns {
            if !existing.contains(&column.name.to_ascii_lowercase()) {
                statements.push(add_column_sql(mapping.table, column));
            }
        }
    }
    Ok(statements)
}

fn plan_export(mappings: &MappingSet) -> Vec<String> {
    let drops = mappings
        .iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|mapping| format!("DROP TABLE IF EXISTS \"{}\";", mapping.table));
    let creates = mappings.iter().map(create_table_sql);
    drops.chain(creates).collect()
}

fn execute_script(conn: &Connection, statements: &[String]) -> RuntimeResult<()> {
    for statement in statements {
        debug!("event=schema_ddl module=runtime sql={statement}");
        conn.execute_batch(statement)?;
    }
    Ok(())
}

fn create_table_sql(mapping: &EntityMapping) -> String {
    let columns = mapping
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| column_sql(column, index == 0))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE \"{}\" ({columns});", mapping.table)
}

fn column_sql(column: &ColumnDef, primary_key: bool) -> String {
    let mut sql = format!("\"{}\" {}", column.name, column.column_type.as_sql());
    if primary_key {
        sql.push_str(" NOT NULL PRIMARY KEY");
    } else if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    sql
}

/// Existing rows take the type's zero value for a new NOT NULL column,
/// since SQLite cannot add one without a default.
fn add_column_sql(table: &str, column: &ColumnDef) -> String {
    let mut sql = format!(
        "ALTER TABLE \"{table}\" ADD COLUMN \"{}\" {}",
        column.name,
        column.column_type.as_sql()
    );
    if !column.nullable {
        sql.push_str(" NOT NULL DEFAULT ");
        sql.push_str(zero_literal(column.column_type));
    }
    sql.push(';');
    sql
}

fn zero_literal(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "0",
        ColumnType::Real => "0.0",
        ColumnType::Text => "''",
        ColumnType::Blob => "X''",
    }
}

/// Lower-cased column names of `table`; empty when the table is absent.
fn existing_columns(conn: &Connection, table: &str) -> RuntimeResult<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names
        .into_iter()
        .map(|name| name.to_ascii_lowercase())
        .collect())
}
