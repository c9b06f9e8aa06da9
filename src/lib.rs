//! Métier — storage and services backend for a small-business management
//! application: client records, appointment booking, catalog imports and
//! billing queries.
//!
//! The consistency-sensitive core is [`booking::book_appointment`], which
//! atomically records a new appointment and updates the booked client's
//! running ledger (`totalSpent` / `lastService`) in one store transaction.
//! Everything else reads or batch-writes documents without cross-document
//! invariants.

pub mod booking;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod models;
pub mod store;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding applications.
///
/// Honors `RUST_LOG` when set, otherwise falls back to
/// [`config::default_log_filter`]. Call at most once.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
