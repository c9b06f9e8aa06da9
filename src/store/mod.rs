//! Document store — the persistence boundary.
//!
//! Documents are schemaless JSON objects addressed by (collection, id).
//! Ids and `createdAt` timestamps are assigned by the store at insert
//! time, never by callers. Two backends implement the same contract:
//! SQLite ([`sqlite::SqliteStore`]) for durable storage and an in-memory
//! store ([`memory::MemoryStore`]) for hermetic tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Collection names used by the application.
pub mod collections {
    pub const CLIENTS: &str = "clients";
    pub const APPOINTMENTS: &str = "appointments";
    pub const SERVICES: &str = "services";
    pub const PRODUCTS: &str = "products";
    pub const INVOICES: &str = "invoices";
    pub const QUOTES: &str = "quotes";
    pub const EXPENSES: &str = "expenses";
    pub const PAYMENTS: &str = "payments";
}

/// Store-assigned document identifier.
pub type DocumentId = String;

/// A schemaless document body: a JSON object map.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Concurrent write conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid document body: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
}

/// Serialize a typed record into a document body.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Deserialize a document body into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(serde_json::Value::Object(
        doc.clone(),
    ))?)
}

/// Operations valid inside a single store transaction.
///
/// A transaction either commits as a whole or leaves no trace; partial
/// writes are never visible to other readers.
pub trait StoreTransaction {
    /// Read one document. `None` when absent.
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Insert a new document. The store assigns a unique id and stamps
    /// `id` and `createdAt` into the body; the assigned id is returned.
    fn insert(&mut self, collection: &str, body: &Document) -> Result<DocumentId, StoreError>;

    /// Shallow-merge `patch` into an existing document's fields.
    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError>;
}

/// A transactional key-document store.
///
/// `run_transaction` is the only way to obtain a [`StoreTransaction`]
/// handle; the closure's writes land atomically when it returns `Ok`,
/// and are discarded entirely when it returns `Err` or the commit fails.
/// The remaining methods are the non-transactional surface used by the
/// batch-import and query components.
pub trait DocumentStore {
    fn run_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>;

    /// Insert a batch of documents as one atomic write. Ids and
    /// `createdAt` are stamped per document; ids are returned in input
    /// order. A failing backend inserts nothing.
    fn insert_many(
        &self,
        collection: &str,
        bodies: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError>;

    /// All documents in `collection` whose `ownerId` field equals `owner_id`.
    fn find_by_owner(&self, collection: &str, owner_id: &str)
        -> Result<Vec<Document>, StoreError>;

    /// All documents in `collection`.
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Probe {
        name: String,
        count: u32,
    }

    #[test]
    fn typed_document_roundtrip() {
        let probe = Probe {
            name: "test".into(),
            count: 3,
        };
        let doc = to_document(&probe).unwrap();
        assert_eq!(doc.get("name").unwrap(), "test");

        let back: Probe = from_document(&doc).unwrap();
        assert_eq!(back.count, 3);
    }

    #[test]
    fn non_object_body_rejected() {
        let result = to_document(&vec![1, 2, 3]);
        assert!(matches!(result, Err(StoreError::NotAnObject)));
    }
}
