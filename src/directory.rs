//! Client directory — per-owner queries and batched imports.
//!
//! Client records are created here (or by external tooling) and only
//! ever mutated afterwards by the booking flow, which owns the ledger
//! fields. Imports stamp every record with the owning account before it
//! reaches the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Client;
use crate::store::{
    collections, from_document, to_document, DocumentId, DocumentStore, StoreError,
};

/// Fields supplied when importing new clients. Ids, `createdAt` and the
/// ledger fields are filled in later by the store and the booking flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Owner ID is required")]
    MissingOwner,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// All clients belonging to `owner_id`.
///
/// An empty owner id yields an empty list rather than an error — there
/// is nothing to query for, but it usually signals a caller bug, so it
/// is logged.
pub fn clients_for_owner<S: DocumentStore>(
    store: &S,
    owner_id: &str,
) -> Result<Vec<Client>, StoreError> {
    if owner_id.trim().is_empty() {
        tracing::warn!("clients_for_owner called without an owner id");
        return Ok(Vec::new());
    }

    store
        .find_by_owner(collections::CLIENTS, owner_id)?
        .iter()
        .map(|doc| from_document(doc))
        .collect()
}

/// Insert a batch of clients for one owner as a single atomic write.
pub fn add_clients_batch<S: DocumentStore>(
    store: &S,
    owner_id: &str,
    clients: &[NewClient],
) -> Result<Vec<DocumentId>, ImportError> {
    if owner_id.trim().is_empty() {
        return Err(ImportError::MissingOwner);
    }

    let mut bodies = Vec::with_capacity(clients.len());
    for client in clients {
        let mut body = to_document(client)?;
        body.insert(
            "ownerId".into(),
            serde_json::Value::String(owner_id.to_string()),
        );
        bodies.push(body);
    }

    let ids = store.insert_many(collections::CLIENTS, bodies)?;
    tracing::info!(count = ids.len(), owner_id = %owner_id, "imported clients");
    Ok(ids)
}
