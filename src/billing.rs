//! Billing views — per-owner appointment and invoice queries.
//!
//! Read-only: appointments are written by the booking flow, invoices by
//! external tooling. A document that fails to decode is an error, never
//! silently dropped — a corrupt billing record should be loud.

use crate::models::{Appointment, Invoice};
use crate::store::{collections, from_document, DocumentStore, StoreError};

/// All appointments booked under `owner_id`.
pub fn appointments_for_owner<S: DocumentStore>(
    store: &S,
    owner_id: &str,
) -> Result<Vec<Appointment>, StoreError> {
    if owner_id.trim().is_empty() {
        tracing::warn!("appointments_for_owner called without an owner id");
        return Ok(Vec::new());
    }

    store
        .find_by_owner(collections::APPOINTMENTS, owner_id)?
        .iter()
        .map(|doc| from_document(doc))
        .collect()
}

/// All invoices issued under `owner_id`.
pub fn invoices_for_owner<S: DocumentStore>(
    store: &S,
    owner_id: &str,
) -> Result<Vec<Invoice>, StoreError> {
    if owner_id.trim().is_empty() {
        tracing::warn!("invoices_for_owner called without an owner id");
        return Ok(Vec::new());
    }

    store
        .find_by_owner(collections::INVOICES, owner_id)?
        .iter()
        .map(|doc| from_document(doc))
        .collect()
}
