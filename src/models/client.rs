use serde::{Deserialize, Serialize};

/// A billable customer, scoped to the owning account.
///
/// `total_spent` and `last_service` form the client's running ledger,
/// maintained exclusively by the booking flow. An absent `total_spent`
/// means the client has never been booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<f64>,
}
