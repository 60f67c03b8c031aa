//! Relational adapter
//!
//! SQLite backend with connection pooling. Durability comes from WAL mode
//! with synchronous commits relaxed to NORMAL; at most the last in-flight
//! transaction is lost on a crash, and source data is re-derivable upstream.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use serde_json::{json, Value};

use super::error::{Result, StoreError};
use super::query::{render_select, FindQuery};
use super::record::{Record, RecordMap};
use super::schema::SchemaDescriptor;

type DbPool = Pool<SqliteConnectionManager>;
type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Result of a single relational insert. A duplicate primary key is an
/// outcome, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertStatus {
    Inserted,
    DuplicateKey,
}

pub struct RelationalAdapter {
    pool: DbPool,
    db_path: PathBuf,
    table: String,
    descriptor: &'static SchemaDescriptor,
    insert_sql: String,
    /// Serializes all writes. Reads go straight to the pool.
    write_lock: Mutex<()>,
}

impl RelationalAdapter {
    /// Open the database file and ensure the mode's table exists.
    pub fn open(db_path: &Path, table: &str, descriptor: &'static SchemaDescriptor) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let adapter = Self {
            pool,
            db_path: db_path.to_path_buf(),
            table: table.to_string(),
            descriptor,
            insert_sql: descriptor.insert_sql(table),
            write_lock: Mutex::new(()),
        };
        adapter.ensure_schema()?;
        Ok(adapter)
    }

    /// In-memory database for tests. One pooled connection so every call
    /// sees the same store.
    pub fn in_memory(table: &str, descriptor: &'static SchemaDescriptor) -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder().max_size(1).build(manager)?;

        let adapter = Self {
            pool,
            db_path: PathBuf::from(":memory:"),
            table: table.to_string(),
            descriptor,
            insert_sql: descriptor.insert_sql(table),
            write_lock: Mutex::new(()),
        };
        adapter.ensure_schema()?;
        Ok(adapter)
    }

    pub fn descriptor(&self) -> &'static SchemaDescriptor {
        self.descriptor
    }

    fn get_conn(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Idempotently create the mode's table.
    pub fn ensure_schema(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let conn = self.get_conn()?;
        conn.execute(&self.descriptor.create_table_sql(&self.table), [])?;
        Ok(())
    }

    /// Insert one record. Duplicate primary keys are reported, not raised;
    /// other constraint failures (such as NOT NULL) stay errors.
    pub fn insert_one(&self, record: &Record) -> Result<InsertStatus> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let conn = self.get_conn()?;

        match conn.execute(&self.insert_sql, rusqlite::params_from_iter(record.values())) {
            Ok(_) => Ok(InsertStatus::Inserted),
            Err(rusqlite::Error::SqliteFailure(e, _)) if is_duplicate_key(&e) => {
                Ok(InsertStatus::DuplicateKey)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a batch as one transaction. Any failure, including a duplicate
    /// key, rolls back the entire batch.
    pub fn insert_many(&self, records: &[Record]) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut conn = self.get_conn()?;

        let tx = conn
            .transaction()
            .map_err(|e| StoreError::BatchFailure(e.to_string()))?;
        {
            let mut stmt = tx
                .prepare(&self.insert_sql)
                .map_err(|e| StoreError::BatchFailure(e.to_string()))?;
            for record in records {
                stmt.execute(rusqlite::params_from_iter(record.values()))
                    .map_err(|e| StoreError::BatchFailure(e.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|e| StoreError::BatchFailure(e.to_string()))?;

        Ok(records.len())
    }

    /// Execute a translated query. Column names come from the statement's
    /// result metadata, so arbitrary projections are supported.
    pub fn find(&self, query: &FindQuery) -> Result<Vec<RecordMap>> {
        let sql = render_select(&self.table, query)?;
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let rows = stmt
            .query_map([], |row| {
                let mut map = RecordMap::new();
                for (i, name) in column_names.iter().enumerate() {
                    let val = row.get_ref(i).unwrap_or(ValueRef::Null);
                    map.insert(name.clone(), value_ref_to_json(val));
                }
                Ok(map)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Close the pool and delete the backing file. Missing files are
    /// swallowed; the sidecar WAL and shm files go with it.
    pub fn destroy(self) -> Result<()> {
        let db_path = self.db_path;
        drop(self.pool);

        if db_path.to_str() == Some(":memory:") {
            return Ok(());
        }

        match fs::remove_file(&db_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = db_path.clone().into_os_string();
            sidecar.push(suffix);
            fs::remove_file(sidecar).ok();
        }
        Ok(())
    }
}

/// Only primary-key and unique-index collisions count as duplicates; the
/// extended result code distinguishes them from other constraint failures.
fn is_duplicate_key(e: &rusqlite::ffi::Error) -> bool {
    e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
}

fn init_connection(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    // WAL PRAGMA returns the resulting mode, so it needs query_row
    let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA synchronous=NORMAL")?;
    conn.busy_timeout(Duration::from_secs(30))?;
    Ok(())
}

fn value_ref_to_json(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => json!(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => json!(format!("BLOB({} bytes)", b.len())),
    }
}
