//! In-memory document store (for testing).
//!
//! Implements the same contract as the SQLite backend with optimistic
//! concurrency: a transaction records the version of every document it
//! reads and validates those versions at commit time. A conflicting
//! concurrent commit fails the transaction with zero side effects, which
//! is exactly what callers must be prepared to retry.
//!
//! Tests can force the next commit to fail via [`MemoryStore::fail_next_commit`]
//! to exercise mid-flight failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{Document, DocumentId, DocumentStore, StoreError, StoreTransaction};

struct VersionedDoc {
    body: Document,
    version: u64,
}

type DocKey = (String, String);

/// Hermetic in-memory store with optimistic conflict detection.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocKey, VersionedDoc>>,
    fail_next: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit (or batch insert) fail with
    /// [`StoreError::Unavailable`], discarding all staged writes.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<DocKey, VersionedDoc>>, StoreError> {
        self.docs
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn take_failure(&self) -> bool {
        self.fail_next.swap(false, Ordering::SeqCst)
    }
}

enum StagedWrite {
    Insert {
        collection: String,
        id: DocumentId,
        body: Document,
    },
    Update {
        collection: String,
        id: String,
        patch: Document,
    },
}

/// Buffers reads and writes; nothing touches the shared map until commit.
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    // (collection, id) -> version observed at read time; 0 means absent.
    reads: HashMap<DocKey, u64>,
    staged: Vec<StagedWrite>,
}

fn stamp(body: &Document, id: &str) -> Document {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut stored = body.clone();
    stored.insert("id".into(), serde_json::Value::String(id.to_string()));
    stored.insert("createdAt".into(), serde_json::Value::String(now));
    stored
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn get(&mut self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.store.lock()?;
        let key = (collection.to_string(), id.to_string());

        let (body, version) = match docs.get(&key) {
            Some(doc) => (Some(doc.body.clone()), doc.version),
            None => (None, 0),
        };
        self.reads.insert(key, version);
        Ok(body)
    }

    fn insert(&mut self, collection: &str, body: &Document) -> Result<DocumentId, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.staged.push(StagedWrite::Insert {
            collection: collection.to_string(),
            id: id.clone(),
            body: body.clone(),
        });
        Ok(id)
    }

    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        self.staged.push(StagedWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch: patch.clone(),
        });
        Ok(())
    }
}

impl MemoryTransaction<'_> {
    fn commit(self) -> Result<(), StoreError> {
        let mut docs = self.store.lock()?;

        if self.store.take_failure() {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        // Optimistic check: every document read must still be at the
        // version this transaction observed.
        for ((collection, id), observed) in &self.reads {
            let current = docs
                .get(&(collection.clone(), id.clone()))
                .map(|d| d.version)
                .unwrap_or(0);
            if current != *observed {
                return Err(StoreError::Conflict {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }

        // Every update target must exist before anything is applied, so a
        // bad write never leaves a partially committed batch behind.
        let mut pending: Vec<DocKey> = Vec::new();
        for write in &self.staged {
            match write {
                StagedWrite::Insert { collection, id, .. } => {
                    pending.push((collection.clone(), id.clone()));
                }
                StagedWrite::Update { collection, id, .. } => {
                    let key = (collection.clone(), id.clone());
                    if !docs.contains_key(&key) && !pending.contains(&key) {
                        return Err(StoreError::NotFound {
                            collection: collection.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }
        }

        for write in self.staged {
            match write {
                StagedWrite::Insert {
                    collection,
                    id,
                    body,
                } => {
                    let stored = stamp(&body, &id);
                    docs.insert(
                        (collection, id),
                        VersionedDoc {
                            body: stored,
                            version: 1,
                        },
                    );
                }
                StagedWrite::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let doc = docs
                        .get_mut(&(collection.clone(), id.clone()))
                        .ok_or(StoreError::NotFound { collection, id })?;
                    for (key, value) in patch {
                        doc.body.insert(key, value);
                    }
                    doc.version += 1;
                }
            }
        }

        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn run_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
    {
        let mut tx = MemoryTransaction {
            store: self,
            reads: HashMap::new(),
            staged: Vec::new(),
        };

        let value = work(&mut tx)?;
        tx.commit().map_err(E::from)?;
        Ok(value)
    }

    fn insert_many(
        &self,
        collection: &str,
        bodies: Vec<Document>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let mut docs = self.lock()?;

        if self.take_failure() {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let mut ids = Vec::with_capacity(bodies.len());
        for body in &bodies {
            let id = Uuid::new_v4().to_string();
            let stored = stamp(body, &id);
            docs.insert(
                (collection.to_string(), id.clone()),
                VersionedDoc {
                    body: stored,
                    version: 1,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    fn find_by_owner(
        &self,
        collection: &str,
        owner_id: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.lock()?;
        let mut found: Vec<Document> = docs
            .iter()
            .filter(|(key, doc)| {
                key.0 == collection
                    && doc.body.get("ownerId").and_then(|v| v.as_str()) == Some(owner_id)
            })
            .map(|(_, doc)| doc.body.clone())
            .collect();
        sort_by_creation(&mut found);
        Ok(found)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let docs = self.lock()?;
        let mut found: Vec<Document> = docs
            .iter()
            .filter(|(key, _)| key.0 == collection)
            .map(|(_, doc)| doc.body.clone())
            .collect();
        sort_by_creation(&mut found);
        Ok(found)
    }
}

fn sort_by_creation(docs: &mut [Document]) {
    docs.sort_by(|a, b| {
        let key = |d: &Document| {
            (
                d.get("createdAt")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                d.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            )
        };
        key(a).cmp(&key(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Barrier;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn insert_get_update_roundtrip() {
        let store = MemoryStore::new();

        let id = store
            .run_transaction(|tx| tx.insert("clients", &doc(json!({ "name": "Durand" }))))
            .unwrap();

        store
            .run_transaction(|tx| tx.update("clients", &id, &doc(json!({ "phone": "0601020304" }))))
            .unwrap();

        let stored = store
            .run_transaction(|tx| tx.get("clients", &id))
            .unwrap()
            .unwrap();
        assert_eq!(stored.get("name").unwrap(), "Durand");
        assert_eq!(stored.get("phone").unwrap(), "0601020304");
        assert!(stored.get("createdAt").is_some());
    }

    #[test]
    fn failed_work_leaves_no_trace() {
        let store = MemoryStore::new();

        let result: Result<(), StoreError> = store.run_transaction(|tx| {
            tx.insert("appointments", &doc(json!({ "serviceName": "Tonte" })))?;
            Err(StoreError::Unavailable("forced failure".into()))
        });
        assert!(result.is_err());
        assert!(store.list("appointments").unwrap().is_empty());
    }

    #[test]
    fn injected_commit_failure_discards_staged_writes() {
        let store = MemoryStore::new();
        store.fail_next_commit();

        let result: Result<DocumentId, StoreError> = store
            .run_transaction(|tx| tx.insert("clients", &doc(json!({ "name": "Durand" }))));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.list("clients").unwrap().is_empty());

        // Flag is consumed; the retry goes through.
        store
            .run_transaction(|tx| tx.insert("clients", &doc(json!({ "name": "Durand" }))))
            .unwrap();
        assert_eq!(store.list("clients").unwrap().len(), 1);
    }

    #[test]
    fn insert_many_failure_inserts_nothing() {
        let store = MemoryStore::new();
        store.fail_next_commit();

        let result = store.insert_many(
            "products",
            vec![doc(json!({ "name": "A" })), doc(json!({ "name": "B" }))],
        );
        assert!(result.is_err());
        assert!(store.list("products").unwrap().is_empty());
    }

    #[test]
    fn concurrent_read_write_conflict_detected() {
        let store = MemoryStore::new();
        let id = store
            .run_transaction(|tx| tx.insert("clients", &doc(json!({ "totalSpent": 0.0 }))))
            .unwrap();

        // Both transactions read the client before either commits; the
        // second commit must fail the optimistic check.
        let both_read = Barrier::new(2);
        let results: Vec<Result<(), StoreError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        store.run_transaction(|tx| {
                            let _ = tx.get("clients", &id)?;
                            both_read.wait();
                            tx.update("clients", &id, &doc(json!({ "totalSpent": 10.0 })))
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
    }

    #[test]
    fn update_of_missing_document_fails_commit() {
        let store = MemoryStore::new();
        let result: Result<(), StoreError> = store
            .run_transaction(|tx| tx.update("clients", "ghost", &doc(json!({ "name": "x" }))));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn owner_filter_matches_sqlite_semantics() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "invoices",
                vec![
                    doc(json!({ "amount": 10.0, "ownerId": "owner-1" })),
                    doc(json!({ "amount": 20.0, "ownerId": "owner-2" })),
                ],
            )
            .unwrap();

        let owned = store.find_by_owner("invoices", "owner-1").unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].get("amount").unwrap(), &json!(10.0));
    }
}
