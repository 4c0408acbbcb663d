//! Migration to create the properties and property_features tables.
//!
//! Every property references its owner; the features list is normalized into
//! one row per (property, feature) so filters stay portable across backends.
//! The `*_folded` columns hold lowercased copies of the location fields for
//! case-insensitive search.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Properties::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Properties::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Properties::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Properties::Description).text().not_null())
                    .col(ColumnDef::new(Properties::Price).double().not_null())
                    .col(ColumnDef::new(Properties::Address).text().not_null())
                    .col(ColumnDef::new(Properties::City).text().not_null())
                    .col(ColumnDef::new(Properties::State).text().not_null())
                    .col(ColumnDef::new(Properties::ZipCode).text().not_null())
                    .col(ColumnDef::new(Properties::Country).text().not_null())
                    .col(ColumnDef::new(Properties::CityFolded).text().not_null())
                    .col(ColumnDef::new(Properties::StateFolded).text().not_null())
                    .col(ColumnDef::new(Properties::CountryFolded).text().not_null())
                    .col(ColumnDef::new(Properties::Latitude).double().null())
                    .col(ColumnDef::new(Properties::Longitude).double().null())
                    .col(ColumnDef::new(Properties::Bedrooms).integer().not_null())
                    .col(ColumnDef::new(Properties::Bathrooms).integer().not_null())
                    .col(ColumnDef::new(Properties::Area).double().not_null())
                    .col(ColumnDef::new(Properties::YearBuilt).integer().null())
                    .col(
                        ColumnDef::new(Properties::PropertyType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Properties::Status)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(ColumnDef::new(Properties::Tour3d).text().null())
                    .col(ColumnDef::new(Properties::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Properties::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Properties::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_properties_owner_id")
                            .from(Properties::Table, Properties::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_properties_owner_id")
                    .table(Properties::Table)
                    .col(Properties::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_properties_created_at")
                    .table(Properties::Table)
                    .col(Properties::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PropertyFeatures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PropertyFeatures::PropertyId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PropertyFeatures::Feature).text().not_null())
                    .col(
                        ColumnDef::new(PropertyFeatures::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(PropertyFeatures::PropertyId)
                            .col(PropertyFeatures::Feature),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_property_features_property_id")
                            .from(PropertyFeatures::Table, PropertyFeatures::PropertyId)
                            .to(Properties::Table, Properties::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PropertyFeatures::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_properties_created_at").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_properties_owner_id").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Properties::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Properties {
    Table,
    Id,
    Title,
    Description,
    Price,
    Address,
    City,
    State,
    ZipCode,
    Country,
    CityFolded,
    StateFolded,
    CountryFolded,
    Latitude,
    Longitude,
    Bedrooms,
    Bathrooms,
    Area,
    YearBuilt,
    PropertyType,
    Status,
    #[sea_orm(iden = "tour_3d")]
    Tour3d,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PropertyFeatures {
    Table,
    PropertyId,
    Feature,
    Position,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
