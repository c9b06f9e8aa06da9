use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{ExpenseStatus, InvoiceStatus, PaymentMethod, PaymentStatus, QuoteStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub client_name: String,
    pub date_emission: NaiveDate,
    pub date_echeance: NaiveDate,
    pub amount: f64,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub client_name: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    pub status: ExpenseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub invoice_id: String,
    #[serde(default)]
    pub client_name: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}
