//! # Data Models
//!
//! This module contains all the data models used throughout the Fleetbook API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod bike;
pub mod booking;
pub mod organization;
pub mod payment;

pub use bike::Entity as Bike;
pub use booking::Entity as Booking;
pub use organization::Entity as Organization;
pub use payment::Entity as Payment;

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
            service: "fleetbook".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
