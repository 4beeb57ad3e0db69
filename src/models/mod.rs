//! # Data Models
//!
//! This module contains all the data models used throughout the Reefdesk API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod booking;
pub mod customer;
pub mod organization;
pub mod product;
pub mod status;
pub mod transaction;
pub mod trip;

pub use booking::Entity as Booking;
pub use customer::Entity as Customer;
pub use organization::Entity as Organization;
pub use product::Entity as Product;
pub use transaction::Entity as Transaction;
pub use trip::Entity as Trip;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "reefdesk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
