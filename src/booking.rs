//! Appointment booking — the one consistency-sensitive flow.
//!
//! Booking atomically writes a new appointment document and patches the
//! booked client's ledger fields (`totalSpent`, `lastService`) in the
//! same store transaction, so neither effect is ever visible without the
//! other. The coordinator is stateless and never retries: a
//! [`BookingError::StoreUnavailable`] means zero writes landed and the
//! caller may safely submit the same request again.
//!
//! There is no deduplication token. Submitting the same logical request
//! twice books two appointments and applies the price to the ledger
//! twice; `double_submission_books_twice` pins that behavior.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Client;
use crate::store::{
    collections, from_document, to_document, DocumentId, DocumentStore, StoreError,
};

/// A fully-formed booking request, validated before any store access.
///
/// `owner_id` is the account performing the booking and is always passed
/// explicitly. `service_name` and `service_price` are snapshots of the
/// catalog entry at booking time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub client_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    pub service_price: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_done: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_reminder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_color_class_name: Option<String>,
}

#[derive(Error, Debug)]
pub enum BookingError {
    /// Caller error; not retryable without fixing the request.
    #[error("Invalid booking request: {0}")]
    InvalidRequest(&'static str),

    /// The referenced client does not exist.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// The client belongs to a different account.
    #[error("Client {client_id} does not belong to owner {owner_id}")]
    PermissionDenied {
        client_id: String,
        owner_id: String,
    },

    /// Transient store failure. No writes landed; safe to retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e)
    }
}

/// The client fields the booking flow is allowed to touch.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerPatch {
    total_spent: f64,
    last_service: String,
}

/// Book an appointment and update the client's ledger, atomically.
///
/// Returns the store-assigned id of the new appointment document. On any
/// failure no partial state is visible: either both the appointment and
/// the ledger update land, or neither does.
pub fn book_appointment<S: DocumentStore>(
    store: &S,
    request: &BookingRequest,
) -> Result<DocumentId, BookingError> {
    if request.client_id.trim().is_empty() {
        return Err(BookingError::InvalidRequest("clientId is required"));
    }
    if request.owner_id.trim().is_empty() {
        return Err(BookingError::InvalidRequest("ownerId is required"));
    }
    if !request.service_price.is_finite() || request.service_price < 0.0 {
        return Err(BookingError::InvalidRequest(
            "servicePrice must be a non-negative number",
        ));
    }

    let appointment_id = store.run_transaction(|tx| {
        let doc = tx
            .get(collections::CLIENTS, &request.client_id)?
            .ok_or_else(|| BookingError::ClientNotFound(request.client_id.clone()))?;
        let client: Client = from_document(&doc)?;

        if client.owner_id != request.owner_id {
            return Err(BookingError::PermissionDenied {
                client_id: request.client_id.clone(),
                owner_id: request.owner_id.clone(),
            });
        }

        let new_total = client.total_spent.unwrap_or(0.0) + request.service_price;
        let last_service = format!(
            "{} - {}",
            request.service_name,
            request.date.format("%Y-%m-%d")
        );

        let appointment_id = tx.insert(collections::APPOINTMENTS, &to_document(request)?)?;
        tx.update(
            collections::CLIENTS,
            &request.client_id,
            &to_document(&LedgerPatch {
                total_spent: new_total,
                last_service,
            })?,
        )?;

        Ok(appointment_id)
    })?;

    tracing::info!(
        appointment_id = %appointment_id,
        client_id = %request.client_id,
        "appointment booked"
    );
    Ok(appointment_id)
}
