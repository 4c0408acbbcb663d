//! Property entity model
//!
//! A listing published by an agent-tier user. Images and features live in
//! their own tables and are removed together with the property.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of real estate being listed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    #[sea_orm(string_value = "HOUSE")]
    House,
    #[sea_orm(string_value = "APARTMENT")]
    Apartment,
    #[sea_orm(string_value = "CONDO")]
    Condo,
    #[sea_orm(string_value = "TOWNHOUSE")]
    Townhouse,
    #[sea_orm(string_value = "LAND")]
    Land,
    #[sea_orm(string_value = "COMMERCIAL")]
    Commercial,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "HOUSE",
            PropertyType::Apartment => "APARTMENT",
            PropertyType::Condo => "CONDO",
            PropertyType::Townhouse => "TOWNHOUSE",
            PropertyType::Land => "LAND",
            PropertyType::Commercial => "COMMERCIAL",
            PropertyType::Other => "OTHER",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "HOUSE" => Ok(PropertyType::House),
            "APARTMENT" => Ok(PropertyType::Apartment),
            "CONDO" => Ok(PropertyType::Condo),
            "TOWNHOUSE" => Ok(PropertyType::Townhouse),
            "LAND" => Ok(PropertyType::Land),
            "COMMERCIAL" => Ok(PropertyType::Commercial),
            "OTHER" => Ok(PropertyType::Other),
            other => Err(format!("unknown property type '{other}'")),
        }
    }
}

/// Market status of a listing
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyStatus {
    #[default]
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SOLD")]
    Sold,
    #[sea_orm(string_value = "RENTED")]
    Rented,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Active => "ACTIVE",
            PropertyStatus::Pending => "PENDING",
            PropertyStatus::Sold => "SOLD",
            PropertyStatus::Rented => "RENTED",
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACTIVE" => Ok(PropertyStatus::Active),
            "PENDING" => Ok(PropertyStatus::Pending),
            "SOLD" => Ok(PropertyStatus::Sold),
            "RENTED" => Ok(PropertyStatus::Rented),
            other => Err(format!("unknown property status '{other}'")),
        }
    }
}

/// Property entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub price: f64,

    pub address: String,

    pub city: String,

    pub state: String,

    #[sea_orm(column_type = "Text")]
    pub zip_code: String,

    pub country: String,

    /// Lowercased `city`, matched by location search
    #[sea_orm(column_type = "Text")]
    pub city_folded: String,

    #[sea_orm(column_type = "Text")]
    pub state_folded: String,

    #[sea_orm(column_type = "Text")]
    pub country_folded: String,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    pub bedrooms: i32,

    pub bathrooms: i32,

    /// Floor or lot area in square meters
    pub area: f64,

    pub year_built: Option<i32>,

    pub property_type: PropertyType,

    pub status: PropertyStatus,

    /// Optional link to an embeddable 3D tour
    pub tour_3d: Option<String>,

    /// Owning agent or admin
    pub owner_id: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    #[sea_orm(has_many = "super::image::Entity")]
    Image,
    #[sea_orm(has_many = "super::property_feature::Entity")]
    PropertyFeature,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl Related<super::property_feature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PropertyFeature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
