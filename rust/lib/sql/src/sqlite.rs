use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::SQLError;
use crate::traits::{Row, SQLExec, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // WAL for better concurrent read performance; foreign keys are
        // enforced so dangling post/user references cannot be inserted.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

fn query_conn(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::new();
            for (i, name) in column_names.iter().enumerate() {
                let val = row_value_at(row, i);
                columns.push((name.clone(), val));
            }
            Ok(Row { columns })
        })
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
    }
    Ok(result)
}

fn exec_conn(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(|e| SQLError::Execution(e.to_string()))?;

    Ok(affected as u64)
}

fn insert_conn(conn: &Connection, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
    exec_conn(conn, sql, params)?;
    Ok(conn.last_insert_rowid())
}

/// Statement surface handed to transaction closures.
struct ConnExec<'a> {
    conn: &'a Connection,
}

impl SQLExec for ConnExec<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        query_conn(self.conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        exec_conn(self.conn, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
        insert_conn(self.conn, sql, params)
    }
}

impl SQLExec for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;
        query_conn(&conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        exec_conn(&conn, sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        insert_conn(&conn, sql, params)
    }
}

impl SQLStore for SqliteStore {
    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn SQLExec) -> Result<(), SQLError>,
    ) -> Result<(), SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        // IMMEDIATE takes the write lock up front, so check-then-insert
        // sequences inside the closure are serialized across writers.
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        let exec = ConnExec { conn: &conn };
        match f(&exec) {
            Ok(()) => conn
                .execute_batch("COMMIT")
                .map_err(|e| SQLError::Transaction(e.to_string())),
            Err(e) => {
                // Preserve the closure's error; a failed rollback leaves
                // the connection poisoned anyway.
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    // Try integer first, then real, then text, then blob, then null.
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Value::Integer(i);
    }
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Value::Real(f);
    }
    if let Ok(s) = row.get::<_, String>(idx) {
        return Value::Text(s);
    }
    if let Ok(b) = row.get::<_, Vec<u8>>(idx) {
        return Value::Blob(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
                &[],
            )
            .unwrap();
        store
    }

    #[test]
    fn insert_returns_monotonic_rowids() {
        let store = store_with_table();
        let a = store
            .insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("a".into())])
            .unwrap();
        let b = store
            .insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("b".into())])
            .unwrap();
        assert!(b > a);
    }

    #[test]
    fn query_reads_back_columns() {
        let store = store_with_table();
        store
            .insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("a".into())])
            .unwrap();
        let rows = store.query("SELECT id, name FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("id"), Some(1));
        assert_eq!(rows[0].get_str("name"), Some("a"));
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = store_with_table();
        let result = store.transaction(&mut |tx| {
            tx.insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("x".into())])?;
            Err(SQLError::Execution("abort".into()))
        });
        assert!(result.is_err());

        let rows = store.query("SELECT id FROM t", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn transaction_commits_on_ok() {
        let store = store_with_table();
        store
            .transaction(&mut |tx| {
                tx.insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("x".into())])?;
                tx.insert("INSERT INTO t (name) VALUES (?1)", &[Value::Text("y".into())])?;
                Ok(())
            })
            .unwrap();

        let rows = store.query("SELECT id FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
