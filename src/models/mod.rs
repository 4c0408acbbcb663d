//! # Data Models
//!
//! SeaORM entities for the marketplace schema plus the small shared enums
//! that travel both in rows and on the wire.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod favorite;
pub mod image;
pub mod message;
pub mod property;
pub mod property_feature;
pub mod user;

pub use favorite::Entity as Favorite;
pub use image::Entity as Image;
pub use message::Entity as Message;
pub use property::{Entity as Property, PropertyStatus, PropertyType};
pub use property_feature::Entity as PropertyFeature;
pub use user::{Entity as User, Role};

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
            service: "estate-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
