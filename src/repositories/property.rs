//! # Property Repository
//!
//! Listing persistence: filtered and paginated queries, hydration of images,
//! features and owner, and transactional create/update/delete.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::property::{self, ActiveModel as PropertyActiveModel, Model as PropertyModel};
use crate::models::{
    Image, Property, PropertyFeature, PropertyStatus, PropertyType, image, property_feature, user,
};
use crate::repositories::UserRepository;

/// Scalar listing fields plus its feature list, as submitted by an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInput {
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
    pub features: Vec<String>,
    pub tour_3d: Option<String>,
}

/// A property together with its images, features and (optionally) owner.
#[derive(Debug, Clone)]
pub struct PropertyDetails {
    pub property: PropertyModel,
    pub features: Vec<String>,
    pub images: Vec<image::Model>,
    pub owner: Option<user::Model>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    Price,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Search criteria. Every bound is inclusive; unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
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
    /// The property must carry every one of these features.
    pub features: Vec<String>,
    pub sort_by: SortField,
    pub sort_order: SortDirection,
}

/// One page of listings and the total number of matches.
#[derive(Debug, Clone)]
pub struct PropertyPage {
    pub properties: Vec<PropertyDetails>,
    pub total: u64,
}

/// Repository for Property database operations
pub struct PropertyRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PropertyRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PropertyModel>, RepositoryError> {
        Property::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Loads one property with images, features and owner.
    pub async fn find_details(&self, id: Uuid) -> Result<Option<PropertyDetails>, RepositoryError> {
        match self.find_by_id(id).await? {
            Some(model) => Ok(self.hydrate(vec![model], true).await?.pop()),
            None => Ok(None),
        }
    }

    /// Filtered, sorted page of listings. `page` is 1-based.
    pub async fn search(
        &self,
        filter: &PropertyFilter,
        page: u64,
        limit: u64,
    ) -> Result<PropertyPage, RepositoryError> {
        let query = apply_sort(
            Property::find().filter(build_condition(filter)),
            filter.sort_by,
            filter.sort_order,
        );

        let paginator = query.paginate(self.db, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let models = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(PropertyPage {
            properties: self.hydrate(models, true).await?,
            total,
        })
    }

    /// Listings owned by any of `owner_ids`, newest first, with images and features.
    pub async fn list_by_owners(
        &self,
        owner_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<PropertyDetails>>, RepositoryError> {
        if owner_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let models = Property::find()
            .filter(property::Column::OwnerId.is_in(owner_ids))
            .order_by_desc(property::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut grouped: HashMap<Uuid, Vec<PropertyDetails>> = HashMap::new();
        for details in self.hydrate(models, false).await? {
            grouped
                .entry(details.property.owner_id)
                .or_default()
                .push(details);
        }
        Ok(grouped)
    }

    /// Loads the listed properties, keeping the order of `ids` and skipping missing ones.
    pub async fn find_many_ordered(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<PropertyDetails>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<Uuid, PropertyModel> = Property::find()
            .filter(property::Column::Id.is_in(ids.to_vec()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .into_iter()
            .map(|model| (model.id, model))
            .collect();

        let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        self.hydrate(ordered, true).await
    }

    /// Creates a listing with its features and already-stored image URLs.
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: PropertyInput,
        image_urls: &[String],
    ) -> Result<PropertyDetails, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let features = dedup_features(&input.features);

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let active = PropertyActiveModel {
            id: Set(id),
            owner_id: Set(owner_id),
            created_at: Set(now.into()),
            ..scalar_fields(input, now)
        };
        active
            .insert(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        insert_features(&txn, id, &features).await?;
        insert_images(&txn, id, image_urls).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(property_id = %id, owner_id = %owner_id, images = image_urls.len(), "Property created");

        self.find_details(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Property"))
    }

    /// Replaces scalar fields and features; appends `new_image_urls`.
    pub async fn update(
        &self,
        id: Uuid,
        input: PropertyInput,
        new_image_urls: &[String],
    ) -> Result<PropertyDetails, RepositoryError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Property"))?;
        let features = dedup_features(&input.features);
        let now = Utc::now();

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let mut active = existing.into_active_model();
        let fields = scalar_fields(input, now);
        active.title = fields.title;
        active.description = fields.description;
        active.price = fields.price;
        active.address = fields.address;
        active.city = fields.city;
        active.state = fields.state;
        active.zip_code = fields.zip_code;
        active.country = fields.country;
        active.city_folded = fields.city_folded;
        active.state_folded = fields.state_folded;
        active.country_folded = fields.country_folded;
        active.latitude = fields.latitude;
        active.longitude = fields.longitude;
        active.bedrooms = fields.bedrooms;
        active.bathrooms = fields.bathrooms;
        active.area = fields.area;
        active.year_built = fields.year_built;
        active.property_type = fields.property_type;
        active.status = fields.status;
        active.tour_3d = fields.tour_3d;
        active.updated_at = fields.updated_at;
        active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        PropertyFeature::delete_many()
            .filter(property_feature::Column::PropertyId.eq(id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        insert_features(&txn, id, &features).await?;
        insert_images(&txn, id, new_image_urls).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(property_id = %id, added_images = new_image_urls.len(), "Property updated");

        self.find_details(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Property"))
    }

    pub async fn image_urls(&self, id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let images = Image::find()
            .filter(image::Column::PropertyId.eq(id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(images.into_iter().map(|image| image.url).collect())
    }

    pub async fn image_count(&self, id: Uuid) -> Result<u64, RepositoryError> {
        Image::find()
            .filter(image::Column::PropertyId.eq(id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes the property row; images, features, favorites and messages cascade.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = Property::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Property"));
        }

        tracing::info!(property_id = %id, "Property deleted");
        Ok(())
    }

    /// Attaches images, features and optionally owners to a batch of properties.
    pub async fn hydrate(
        &self,
        models: Vec<PropertyModel>,
        with_owner: bool,
    ) -> Result<Vec<PropertyDetails>, RepositoryError> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = models.iter().map(|model| model.id).collect();

        let mut images: HashMap<Uuid, Vec<image::Model>> = HashMap::new();
        for img in Image::find()
            .filter(image::Column::PropertyId.is_in(ids.clone()))
            .order_by_asc(image::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
        {
            images.entry(img.property_id).or_default().push(img);
        }

        let mut features: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in PropertyFeature::find()
            .filter(property_feature::Column::PropertyId.is_in(ids))
            .order_by_asc(property_feature::Column::Position)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?
        {
            features.entry(row.property_id).or_default().push(row.feature);
        }

        let mut owners: HashMap<Uuid, user::Model> = HashMap::new();
        if with_owner {
            let owner_ids: Vec<Uuid> = models
                .iter()
                .map(|model| model.owner_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for owner in UserRepository::new(self.db).find_many(owner_ids).await? {
                owners.insert(owner.id, owner);
            }
        }

        Ok(models
            .into_iter()
            .map(|property| PropertyDetails {
                features: features.remove(&property.id).unwrap_or_default(),
                images: images.remove(&property.id).unwrap_or_default(),
                owner: owners.get(&property.owner_id).cloned(),
                property,
            })
            .collect())
    }
}

fn scalar_fields(input: PropertyInput, now: chrono::DateTime<Utc>) -> PropertyActiveModel {
    PropertyActiveModel {
        title: Set(input.title),
        description: Set(input.description),
        price: Set(input.price),
        address: Set(input.address),
        city_folded: Set(fold_case(&input.city)),
        state_folded: Set(fold_case(&input.state)),
        country_folded: Set(fold_case(&input.country)),
        city: Set(input.city),
        state: Set(input.state),
        zip_code: Set(input.zip_code),
        country: Set(input.country),
        latitude: Set(input.latitude),
        longitude: Set(input.longitude),
        bedrooms: Set(input.bedrooms),
        bathrooms: Set(input.bathrooms),
        area: Set(input.area),
        year_built: Set(input.year_built),
        property_type: Set(input.property_type),
        status: Set(input.status),
        tour_3d: Set(input.tour_3d),
        updated_at: Set(now.into()),
        ..Default::default()
    }
}

async fn insert_features<C: ConnectionTrait>(
    conn: &C,
    property_id: Uuid,
    features: &[String],
) -> Result<(), RepositoryError> {
    if features.is_empty() {
        return Ok(());
    }

    let rows = (0..).zip(features).map(|(position, feature)| property_feature::ActiveModel {
        property_id: Set(property_id),
        feature: Set(feature.clone()),
        position: Set(position),
    });

    PropertyFeature::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(RepositoryError::database_error)?;
    Ok(())
}

async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    property_id: Uuid,
    urls: &[String],
) -> Result<(), RepositoryError> {
    if urls.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = urls.iter().map(|url| image::ActiveModel {
        id: Set(Uuid::new_v4()),
        url: Set(url.clone()),
        property_id: Set(property_id),
        created_at: Set(now.into()),
    });

    Image::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(RepositoryError::database_error)?;
    Ok(())
}

/// Trims, drops empties and removes duplicates while keeping first-seen order.
pub fn dedup_features(features: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    features
        .iter()
        .map(|feature| feature.trim())
        .filter(|feature| !feature.is_empty())
        .filter(|feature| seen.insert(feature.to_string()))
        .map(str::to_string)
        .collect()
}

/// Unicode lowercase used for both the stored `*_folded` columns and search input.
pub fn fold_case(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Substring match against a column holding `fold_case` output.
fn contains_folded(column: property::Column, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    let escaped = fold_case(needle)
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::col(column).like(LikeExpr::new(format!("%{escaped}%")).escape('\\'))
}

fn build_condition(filter: &PropertyFilter) -> Condition {
    let mut condition = Condition::all();

    for (column, value) in [
        (property::Column::CityFolded, &filter.city),
        (property::Column::StateFolded, &filter.state),
        (property::Column::CountryFolded, &filter.country),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            condition = condition.add(contains_folded(column, value));
        }
    }

    if let Some(min) = filter.min_price {
        condition = condition.add(property::Column::Price.gte(min));
    }
    if let Some(max) = filter.max_price {
        condition = condition.add(property::Column::Price.lte(max));
    }
    if let Some(min) = filter.min_bedrooms {
        condition = condition.add(property::Column::Bedrooms.gte(min));
    }
    if let Some(max) = filter.max_bedrooms {
        condition = condition.add(property::Column::Bedrooms.lte(max));
    }
    if let Some(min) = filter.min_bathrooms {
        condition = condition.add(property::Column::Bathrooms.gte(min));
    }
    if let Some(max) = filter.max_bathrooms {
        condition = condition.add(property::Column::Bathrooms.lte(max));
    }
    if let Some(min) = filter.min_area {
        condition = condition.add(property::Column::Area.gte(min));
    }
    if let Some(max) = filter.max_area {
        condition = condition.add(property::Column::Area.lte(max));
    }
    if let Some(property_type) = filter.property_type {
        condition = condition.add(property::Column::PropertyType.eq(property_type));
    }
    if let Some(status) = filter.status {
        condition = condition.add(property::Column::Status.eq(status));
    }

    let features = dedup_features(&filter.features);
    if !features.is_empty() {
        let required = features.len() as i64;
        let having_all = Query::select()
            .column(property_feature::Column::PropertyId)
            .from(PropertyFeature)
            .and_where(property_feature::Column::Feature.is_in(features))
            .group_by_col(property_feature::Column::PropertyId)
            .and_having(
                Expr::expr(Func::count(Expr::col(property_feature::Column::Feature))).eq(required),
            )
            .to_owned();
        condition = condition.add(property::Column::Id.in_subquery(having_all));
    }

    condition
}

fn apply_sort(
    query: Select<Property>,
    field: SortField,
    direction: SortDirection,
) -> Select<Property> {
    let column = match field {
        SortField::Price => property::Column::Price,
        SortField::CreatedAt => property::Column::CreatedAt,
    };

    let query = match direction {
        SortDirection::Asc => query.order_by_asc(column),
        SortDirection::Desc => query.order_by_desc(column),
    };
    query.order_by_asc(property::Column::Id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn features_are_trimmed_and_deduplicated() {
        let features = vec![
            " Pool ".to_string(),
            "Garage".to_string(),
            "Pool".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedup_features(&features), vec!["Pool", "Garage"]);
    }

    #[test]
    fn empty_filter_only_sorts() {
        let sql = apply_sort(
            Property::find().filter(build_condition(&PropertyFilter::default())),
            SortField::CreatedAt,
            SortDirection::Desc,
        )
        .build(DbBackend::Sqlite)
        .to_string();

        assert!(sql.contains(r#"ORDER BY "properties"."created_at" DESC"#));
    }

    #[test]
    fn feature_filter_requires_every_feature() {
        let filter = PropertyFilter {
            features: vec!["Pool".to_string(), "Garage".to_string(), "Pool".to_string()],
            ..Default::default()
        };
        let sql = Property::find()
            .filter(build_condition(&filter))
            .build(DbBackend::Sqlite)
            .to_string();

        assert!(sql.contains("GROUP BY"));
        assert!(sql.contains("HAVING COUNT"));
        assert!(sql.contains("= 2"));
    }

    #[test]
    fn city_filter_is_case_insensitive_substring() {
        let filter = PropertyFilter {
            city: Some("Spring".to_string()),
            ..Default::default()
        };
        let sql = Property::find()
            .filter(build_condition(&filter))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""city_folded" LIKE '%spring%'"#));
    }

    #[test]
    fn folding_lowercases_beyond_ascii() {
        assert_eq!(fold_case(" ÉVORA "), "évora");
        assert_eq!(fold_case("São Paulo"), "são paulo");
    }
}
