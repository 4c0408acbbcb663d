//! # Properties API Handlers
//!
//! Public browsing and search, plus multipart create/update/delete for
//! agent-tier users.

use std::collections::HashMap;
use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{
    MessageResponse, PageQuery, Pagination, PropertyListResponse, PropertyView, resolve_page,
};
use crate::handlers::validation::FieldErrors;
use crate::models::{PropertyStatus, PropertyType, Role};
use crate::repositories::PropertyRepository;
use crate::repositories::property::{
    PropertyFilter, PropertyInput, SortDirection, SortField, dedup_features,
};
use crate::server::AppState;
use crate::storage::{self, ImageFormat, validate_image};

/// Maximum number of image parts accepted per request.
pub const MAX_IMAGES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Price,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Search filters; every field is optional
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchRequest {
    /// Case-insensitive substring match
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<i32>,
    pub max_bedrooms: Option<i32>,
    pub min_bathrooms: Option<i32>,
    pub max_bathrooms: Option<i32>,
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    pub property_type: Option<PropertyType>,
    pub status: Option<PropertyStatus>,
    /// Properties must have every listed feature
    #[serde(default)]
    pub features: Vec<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl SearchRequest {
    fn into_filter(self) -> Result<(PropertyFilter, u64, u64), ApiError> {
        let mut errors = FieldErrors::new();
        for (field, value) in [
            ("minPrice", self.min_price),
            ("maxPrice", self.max_price),
            ("minArea", self.min_area),
            ("maxArea", self.max_area),
        ] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                errors.add(field, "must be greater than or equal to 0");
            }
        }
        for (field, value) in [
            ("minBedrooms", self.min_bedrooms),
            ("maxBedrooms", self.max_bedrooms),
            ("minBathrooms", self.min_bathrooms),
            ("maxBathrooms", self.max_bathrooms),
        ] {
            if value.is_some_and(|v| v < 0) {
                errors.add(field, "must be greater than or equal to 0");
            }
        }
        errors.into_result()?;

        let (page, limit) = resolve_page(self.page, self.limit)?;

        let filter = PropertyFilter {
            city: self.city,
            state: self.state,
            country: self.country,
            min_price: self.min_price,
            max_price: self.max_price,
            min_bedrooms: self.min_bedrooms,
            max_bedrooms: self.max_bedrooms,
            min_bathrooms: self.min_bathrooms,
            max_bathrooms: self.max_bathrooms,
            min_area: self.min_area,
            max_area: self.max_area,
            property_type: self.property_type,
            status: self.status,
            features: self.features,
            sort_by: match self.sort_by {
                SortBy::Price => SortField::Price,
                SortBy::CreatedAt => SortField::CreatedAt,
            },
            sort_order: match self.sort_order {
                SortOrder::Asc => SortDirection::Asc,
                SortOrder::Desc => SortDirection::Desc,
            },
        };

        Ok((filter, page, limit))
    }
}

/// Multipart form accepted by create and update (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
#[schema(rename_all = "camelCase")]
pub struct PropertyForm {
    title: String,
    description: String,
    price: f64,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    bedrooms: i32,
    bathrooms: i32,
    area: f64,
    year_built: Option<i32>,
    property_type: PropertyType,
    status: Option<PropertyStatus>,
    /// Repeated parts, `features[]` parts, or one JSON array
    features: Vec<String>,
    #[schema(rename = "tour3D")]
    tour_3d: Option<String>,
    /// Up to 10 image files (jpeg, png, gif, webp)
    #[schema(value_type = Vec<String>, format = Binary)]
    images: Vec<Vec<u8>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyResponse {
    pub message: String,
    pub property: PropertyView,
}

/// Raw multipart content before validation.
#[derive(Debug, Default)]
struct RawPropertyForm {
    fields: HashMap<String, String>,
    features: Vec<String>,
    images: Vec<(ImageFormat, Bytes)>,
}

async fn read_property_form(
    mut multipart: Multipart,
    max_image_bytes: usize,
) -> Result<RawPropertyForm, ApiError> {
    let mut form = RawPropertyForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "images[]" => {
                let content_type = field.content_type().map(str::to_string);
                let has_file_name = field.file_name().is_some_and(|f| !f.is_empty());
                let bytes = field.bytes().await?;
                // Browsers submit an empty part when no file was chosen.
                if bytes.is_empty() && !has_file_name {
                    continue;
                }
                if form.images.len() >= MAX_IMAGES_PER_REQUEST {
                    return Err(validation_error(
                        "Too many images",
                        json!({ "images": format!("at most {MAX_IMAGES_PER_REQUEST} images per request") }),
                    ));
                }
                let format = validate_image(content_type.as_deref(), bytes.len(), max_image_bytes)?;
                form.images.push((format, bytes));
            }
            "features" | "features[]" => {
                let text = field.text().await?;
                form.features.extend(parse_features(&text)?);
            }
            _ => {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }
    }

    Ok(form)
}

fn parse_features(raw: &str) -> Result<Vec<String>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed).map_err(|_| {
            validation_error(
                "Validation failed",
                json!({ "features": "must be a JSON array of strings" }),
            )
        })
    } else if trimmed.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(vec![trimmed.to_string()])
    }
}

impl RawPropertyForm {
    fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required_text(&self, errors: &mut FieldErrors, key: &str) -> String {
        match self.text(key) {
            Some(value) => value.to_string(),
            None => {
                errors.add(key, "is required");
                String::new()
            }
        }
    }

    fn parsed<T: FromStr>(&self, errors: &mut FieldErrors, key: &str, expected: &str) -> Option<T> {
        let raw = self.text(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.add(key, format!("must be {expected}"));
                None
            }
        }
    }

    fn required_parsed<T: FromStr>(
        &self,
        errors: &mut FieldErrors,
        key: &str,
        expected: &str,
    ) -> Option<T> {
        if self.text(key).is_none() {
            errors.add(key, "is required");
            return None;
        }
        self.parsed(errors, key, expected)
    }

    /// Validates all fields, reporting every problem at once.
    fn validate(&self) -> Result<PropertyInput, ApiError> {
        let mut errors = FieldErrors::new();

        let title = self.required_text(&mut errors, "title");
        if !errors.has("title") {
            errors.length("title", &title, 5, Some(100));
        }
        let description = self.required_text(&mut errors, "description");
        if !errors.has("description") {
            errors.length("description", &description, 20, None);
        }

        let price = self.required_parsed::<f64>(&mut errors, "price", "a number");
        if price.is_some_and(|p| !p.is_finite() || p <= 0.0) {
            errors.add("price", "must be greater than 0");
        }

        let address = self.required_text(&mut errors, "address");
        let city = self.required_text(&mut errors, "city");
        let state = self.required_text(&mut errors, "state");
        let zip_code = self.required_text(&mut errors, "zipCode");
        let country = self.required_text(&mut errors, "country");

        let latitude = self.parsed::<f64>(&mut errors, "latitude", "a number");
        if latitude.is_some_and(|v| !v.is_finite()) {
            errors.add("latitude", "must be a finite number");
        }
        let longitude = self.parsed::<f64>(&mut errors, "longitude", "a number");
        if longitude.is_some_and(|v| !v.is_finite()) {
            errors.add("longitude", "must be a finite number");
        }

        let bedrooms = self.required_parsed::<i32>(&mut errors, "bedrooms", "an integer");
        if bedrooms.is_some_and(|b| b < 0) {
            errors.add("bedrooms", "must be greater than or equal to 0");
        }
        let bathrooms = self.required_parsed::<i32>(&mut errors, "bathrooms", "an integer");
        if bathrooms.is_some_and(|b| b < 0) {
            errors.add("bathrooms", "must be greater than or equal to 0");
        }

        let area = self.required_parsed::<f64>(&mut errors, "area", "a number");
        if area.is_some_and(|a| !a.is_finite() || a <= 0.0) {
            errors.add("area", "must be greater than 0");
        }

        let year_built = self.parsed::<i32>(&mut errors, "yearBuilt", "an integer");

        let property_type = self.required_parsed::<PropertyType>(
            &mut errors,
            "propertyType",
            "one of HOUSE, APARTMENT, CONDO, TOWNHOUSE, LAND, COMMERCIAL, OTHER",
        );
        let status = self
            .parsed::<PropertyStatus>(
                &mut errors,
                "status",
                "one of ACTIVE, PENDING, SOLD, RENTED",
            )
            .unwrap_or_default();

        let tour_3d = self.text("tour3D").map(str::to_string);

        errors.into_result()?;
        let (Some(price), Some(bedrooms), Some(bathrooms), Some(area), Some(property_type)) =
            (price, bedrooms, bathrooms, area, property_type)
        else {
            return Err(validation_error("Validation failed", json!({})));
        };

        Ok(PropertyInput {
            title,
            description: description.trim().to_string(),
            price,
            address,
            city,
            state,
            zip_code,
            country,
            latitude,
            longitude,
            bedrooms,
            bathrooms,
            area,
            year_built,
            property_type,
            status,
            features: dedup_features(&self.features),
            tour_3d,
        })
    }
}

/// Writes validated images to the store, rolling back on failure.
async fn store_images(
    state: &AppState,
    images: Vec<(ImageFormat, Bytes)>,
) -> Result<Vec<String>, ApiError> {
    let mut urls = Vec::with_capacity(images.len());
    for (format, bytes) in images {
        match state.images.store(format, bytes).await {
            Ok(url) => urls.push(url),
            Err(err) => {
                storage::remove_all(state.images.as_ref(), &urls).await;
                return Err(err.into());
            }
        }
    }
    Ok(urls)
}

/// List properties, newest first
#[utoipa::path(
    get,
    path = "/api/properties",
    params(PageQuery),
    responses(
        (status = 200, description = "A page of properties", body = PropertyListResponse),
        (status = 400, description = "Invalid pagination", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn list_properties(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PropertyListResponse>, ApiError> {
    let Query(query) = query?;
    let (page, limit) = query.resolve()?;

    let result = PropertyRepository::new(&state.db)
        .search(&PropertyFilter::default(), page, limit)
        .await?;

    Ok(Json(PropertyListResponse {
        properties: result.properties.iter().map(PropertyView::from).collect(),
        pagination: Pagination::new(result.total, page, limit),
    }))
}

/// Get a property by id
#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "The property", body = PropertyView),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn get_property(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PropertyView>, ApiError> {
    let Path(id) = id?;

    let details = PropertyRepository::new(&state.db)
        .find_details(id)
        .await?
        .ok_or_else(|| not_found("Property"))?;

    Ok(Json(PropertyView::from(&details)))
}

/// Search properties by filters
#[utoipa::path(
    post,
    path = "/api/properties/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching properties", body = PropertyListResponse),
        (status = 400, description = "Invalid filters", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn search_properties(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<PropertyListResponse>, ApiError> {
    let Json(request) = payload?;
    let (filter, page, limit) = request.into_filter()?;

    let result = PropertyRepository::new(&state.db)
        .search(&filter, page, limit)
        .await?;

    Ok(Json(PropertyListResponse {
        properties: result.properties.iter().map(PropertyView::from).collect(),
        pagination: Pagination::new(result.total, page, limit),
    }))
}

/// Publish a new property
#[utoipa::path(
    post,
    path = "/api/properties",
    security(("bearer_auth" = [])),
    request_body(content = PropertyForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Property created", body = PropertyResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Only agents and admins may publish", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn create_property(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PropertyResponse>), ApiError> {
    current.ensure_role(&[Role::Agent, Role::Admin])?;

    let form = read_property_form(multipart?, state.config.max_image_bytes).await?;
    let input = form.validate()?;
    let urls = store_images(&state, form.images).await?;

    let created = match PropertyRepository::new(&state.db)
        .create(current.id(), input, &urls)
        .await
    {
        Ok(created) => created,
        Err(err) => {
            storage::remove_all(state.images.as_ref(), &urls).await;
            return Err(err.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(PropertyResponse {
            message: "Property created successfully".to_string(),
            property: PropertyView::from(&created),
        }),
    ))
}

/// Replace a property's fields and append images
#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    request_body(content = PropertyForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Property updated", body = PropertyResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn update_property(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PropertyResponse>, ApiError> {
    let Path(id) = id?;
    let repo = PropertyRepository::new(&state.db);

    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found("Property"))?;
    current.ensure_owner_or_admin(existing.owner_id)?;

    let form = read_property_form(multipart?, state.config.max_image_bytes).await?;
    let input = form.validate()?;
    let urls = store_images(&state, form.images).await?;

    let updated = match repo.update(id, input, &urls).await {
        Ok(updated) => updated,
        Err(err) => {
            storage::remove_all(state.images.as_ref(), &urls).await;
            return Err(err.into());
        }
    };

    Ok(Json(PropertyResponse {
        message: "Property updated successfully".to_string(),
        property: PropertyView::from(&updated),
    }))
}

/// Delete a property and its images
#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Not the owner", body = ApiError),
        (status = 404, description = "Property not found", body = ApiError)
    ),
    tag = "properties"
)]
pub async fn delete_property(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    let repo = PropertyRepository::new(&state.db);

    let existing = repo.find_by_id(id).await?.ok_or_else(|| not_found("Property"))?;
    current.ensure_owner_or_admin(existing.owner_id)?;

    let urls = repo.image_urls(id).await?;
    storage::remove_all(state.images.as_ref(), &urls).await;
    repo.delete(id).await?;

    tracing::info!(property_id = %id, user_id = %current.id(), "Property removed by user");
    Ok(Json(MessageResponse::new("Property deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> RawPropertyForm {
        RawPropertyForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    fn complete_form() -> RawPropertyForm {
        form(&[
            ("title", "Sunny family home"),
            ("description", "Three bedrooms close to parks and schools."),
            ("price", "350000"),
            ("address", "12 Elm Street"),
            ("city", "Springfield"),
            ("state", "IL"),
            ("zipCode", "62701"),
            ("country", "USA"),
            ("bedrooms", "3"),
            ("bathrooms", "2"),
            ("area", "180.5"),
            ("propertyType", "HOUSE"),
        ])
    }

    #[test]
    fn complete_form_validates_with_defaults() {
        let input = complete_form().validate().unwrap();
        assert_eq!(input.status, PropertyStatus::Active);
        assert_eq!(input.property_type, PropertyType::House);
        assert_eq!(input.latitude, None);
        assert!(input.features.is_empty());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut raw = complete_form();
        raw.fields.remove("city");
        raw.fields.insert("price".to_string(), "-5".to_string());

        let err = raw.validate().unwrap_err();
        let details = err.details.unwrap();
        assert_eq!(details["city"], "is required");
        assert_eq!(details["price"], "must be greater than 0");
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let mut raw = complete_form();
        raw.fields.insert("latitude".to_string(), "NaN".to_string());
        raw.fields.insert("longitude".to_string(), "inf".to_string());

        let details = raw.validate().unwrap_err().details.unwrap();
        assert_eq!(details["latitude"], "must be a finite number");
        assert_eq!(details["longitude"], "must be a finite number");

        let mut raw = complete_form();
        raw.fields.insert("latitude".to_string(), "-12.05".to_string());
        assert_eq!(raw.validate().unwrap().latitude, Some(-12.05));
    }

    #[test]
    fn unknown_property_type_is_rejected() {
        let mut raw = complete_form();
        raw.fields
            .insert("propertyType".to_string(), "CASTLE".to_string());
        assert!(raw.validate().is_err());
    }

    #[test]
    fn features_accept_json_or_plain_parts() {
        assert_eq!(
            parse_features(r#"["Pool","Garage"]"#).unwrap(),
            vec!["Pool", "Garage"]
        );
        assert_eq!(parse_features(" Pool ").unwrap(), vec!["Pool"]);
        assert!(parse_features("").unwrap().is_empty());
        assert!(parse_features("[1,2]").is_err());
    }

    #[test]
    fn search_rejects_negative_bounds_and_bad_limits() {
        let negative = SearchRequest {
            min_price: Some(-1.0),
            ..Default::default()
        };
        assert!(negative.into_filter().is_err());

        let too_many = SearchRequest {
            limit: Some(51),
            ..Default::default()
        };
        assert!(too_many.into_filter().is_err());

        let (filter, page, limit) = SearchRequest::default().into_filter().unwrap();
        assert_eq!((page, limit), (1, 10));
        assert_eq!(filter.sort_by, SortField::CreatedAt);
        assert_eq!(filter.sort_order, SortDirection::Desc);
    }
}
