//! SQLite-backed document store.
//!
//! One `documents` table holds every collection; bodies are JSON text.
//! The connection sits behind a mutex, so concurrent transactions
//! serialize — a transaction sees every earlier commit and none of the
//! later ones. Rollback is automatic when a transaction is dropped
//! without committing.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{Document, DocumentId, DocumentStore, StoreError, StoreTransaction};

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_documents.sql")),
        (2, include_str!("../../resources/migrations/002_owner_index.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Durable document store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }
}

/// Insert one stamped document row. Shared by transactional and batch
/// inserts; `conn` may be a transaction handle.
fn insert_document(
    conn: &Connection,
    collection: &str,
    body: &Document,
) -> Result<DocumentId, StoreError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut stored = body.clone();
    stored.insert("id".into(), serde_json::Value::String(id.clone()));
    stored.insert("createdAt".into(), serde_json::Value::String(now.clone()));

    conn.execute(
        "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![collection, id, serde_json::to_string(&stored)?, now],
    )?;
    Ok(id)
}

fn get_document(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Transaction handle over the locked connection.
pub struct SqliteTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl StoreTransaction for SqliteTransaction<'_> {
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        get_document(&self.tx, collection, id)
    }

    fn insert(&mut self, collection: &str, body: &Document) -> Result<DocumentId, StoreError> {
        insert_document(&self.tx, collection, body)
    }

    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        let mut body = get_document(&self.tx, collection, id)?.ok_or_else(|| {
            StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;

        for (key, value) in patch {
            body.insert(key.clone(), value.clone());
        }

        self.tx.execute(
            "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
            params![serde_json::to_string(&body)?, collection, id],
        )?;
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn run_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
    {
        let mut conn = self.lock().map_err(E::from)?;
        let tx = conn
            .transaction()
            .map_err(|e| E::from(StoreError::from(e)))?;

        let mut handle = SqliteTransaction { tx };
        let value = work(&mut handle)?;

        handle
            .tx
            .commit()
            .map_err(|e| E::from(StoreError::from(e)))?;
        Ok(value)
    }

    fn insert_many(
        &self,
        collection: &str,
        bodies: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(bodies.len());
        for body in &bodies {
            ids.push(insert_document(&tx, collection, body)?);
        }

        tx.commit()?;
        Ok(ids)
    }

    fn find_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM documents
             WHERE collection = ?1 AND json_extract(body, '$.ownerId') = ?2
             ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map(params![collection, owner_id], |row| {
            row.get::<_, String>(0)
        })?;

        collect_bodies(rows)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT body FROM documents WHERE collection = ?1 ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

        collect_bodies(rows)
    }
}

fn collect_bodies(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<String>>,
) -> Result<Vec<Document>, StoreError> {
    let mut docs = Vec::new();
    for row in rows {
        docs.push(serde_json::from_str(&row?)?);
    }
    Ok(docs)
}
