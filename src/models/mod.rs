//! Typed domain records as they live in the document store.
//!
//! Wire form is camelCase JSON, matching the stored document bodies
//! (`ownerId`, `totalSpent`, `createdAt`, ...). Ids and creation
//! timestamps are store-assigned, so they default when absent.

pub mod appointment;
pub mod billing;
pub mod catalog;
pub mod client;
pub mod enums;

pub use appointment::*;
pub use billing::*;
pub use catalog::*;
pub use client::*;
pub use enums::*;
