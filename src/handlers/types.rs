//! # Common API Types
//!
//! JSON views shared across handlers and the pagination envelope used by the
//! listing endpoints.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{PropertyStatus, PropertyType, Role, image, user};
use crate::repositories::message::{MessageDetails, PropertySummary};
use crate::repositories::property::PropertyDetails;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 50;
/// Highest page for which `(page - 1) * limit` still fits in an SQL offset.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// Page/limit query parameters for list endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Items per page, 1..=50 (default 10)
    pub limit: Option<u64>,
}

impl PageQuery {
    /// Applies defaults and range checks, returning `(page, limit)`.
    pub fn resolve(&self) -> Result<(u64, u64), ApiError> {
        resolve_page(self.page, self.limit)
    }
}

pub fn resolve_page(page: Option<u64>, limit: Option<u64>) -> Result<(u64, u64), ApiError> {
    let page = page.unwrap_or(DEFAULT_PAGE);
    if !(1..=MAX_PAGE).contains(&page) {
        return Err(crate::error::validation_error(
            "Invalid pagination",
            serde_json::json!({ "page": format!("must be between 1 and {MAX_PAGE}") }),
        ));
    }

    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(crate::error::validation_error(
            "Invalid pagination",
            serde_json::json!({ "limit": format!("must be between 1 and {MAX_LIMIT}") }),
        ));
    }

    Ok((page, limit))
}

/// Pagination metadata returned with listing pages
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        Self {
            total,
            page,
            limit,
            pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// A page of properties
#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyListResponse {
    pub properties: Vec<PropertyView>,
    pub pagination: Pagination,
}

/// Response carrying only a human-readable confirmation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of a user; never includes the password hash
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Listing owner as embedded in a property
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OwnerView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl From<&user::Model> for OwnerView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
        }
    }
}

/// Message participant
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<&user::Model> for ContactView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: Uuid,
    pub url: String,
    pub property_id: Uuid,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<&image::Model> for ImageView {
    fn from(image: &image::Model) -> Self {
        Self {
            id: image.id,
            url: image.url.clone(),
            property_id: image.property_id,
            created_at: image.created_at,
        }
    }
}

/// Full property view with features, images and owner
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub year_built: Option<i32>,
    pub property_type: PropertyType,
    pub status: PropertyStatus,
    #[serde(rename = "tour3D")]
    pub tour_3d: Option<String>,
    pub owner_id: Uuid,
    pub features: Vec<String>,
    pub images: Vec<ImageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerView>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

impl From<&PropertyDetails> for PropertyView {
    fn from(details: &PropertyDetails) -> Self {
        let p = &details.property;
        Self {
            id: p.id,
            title: p.title.clone(),
            description: p.description.clone(),
            price: p.price,
            address: p.address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            zip_code: p.zip_code.clone(),
            country: p.country.clone(),
            latitude: p.latitude,
            longitude: p.longitude,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            area: p.area,
            year_built: p.year_built,
            property_type: p.property_type,
            status: p.status,
            tour_3d: p.tour_3d.clone(),
            owner_id: p.owner_id,
            features: details.features.clone(),
            images: details.images.iter().map(ImageView::from).collect(),
            owner: details.owner.as_ref().map(OwnerView::from),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Property summary embedded in a message
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessagePropertyView {
    pub id: Uuid,
    pub title: String,
    pub address: String,
    pub city: String,
    pub state: String,
    /// At most one (cover) image
    pub images: Vec<ImageView>,
}

impl From<&PropertySummary> for MessagePropertyView {
    fn from(summary: &PropertySummary) -> Self {
        let p = &summary.property;
        Self {
            id: p.id,
            title: p.title.clone(),
            address: p.address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            images: summary.cover_image.iter().map(ImageView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub content: String,
    pub property_id: Uuid,
    pub sender_id: Uuid,
    pub agent_id: Uuid,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<MessagePropertyView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<ContactView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<ContactView>,
}

impl From<&MessageDetails> for MessageView {
    fn from(details: &MessageDetails) -> Self {
        let m = &details.message;
        Self {
            id: m.id,
            content: m.content.clone(),
            property_id: m.property_id,
            sender_id: m.sender_id,
            agent_id: m.agent_id,
            created_at: m.created_at,
            property: details.property.as_ref().map(MessagePropertyView::from),
            sender: details.sender.as_ref().map(ContactView::from),
            agent: details.agent.as_ref().map(ContactView::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_round_up() {
        assert_eq!(Pagination::new(0, 1, 10).pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).pages, 1);
        assert_eq!(Pagination::new(11, 2, 10).pages, 2);
    }

    #[test]
    fn page_query_defaults_and_bounds() {
        assert_eq!(PageQuery::default().resolve().unwrap(), (1, 10));
        assert_eq!(resolve_page(Some(3), Some(50)).unwrap(), (3, 50));
        assert!(resolve_page(Some(0), None).is_err());
        assert!(resolve_page(None, Some(0)).is_err());
        assert!(resolve_page(None, Some(51)).is_err());
    }

    #[test]
    fn page_is_capped_so_offsets_cannot_overflow() {
        assert_eq!(resolve_page(Some(MAX_PAGE), Some(MAX_LIMIT)).unwrap().0, MAX_PAGE);
        assert!((MAX_PAGE - 1).checked_mul(MAX_LIMIT).is_some_and(|o| o <= i64::MAX as u64));
        assert!(resolve_page(Some(MAX_PAGE + 1), None).is_err());
        assert!(resolve_page(Some(u64::MAX), Some(1)).is_err());
    }
}
