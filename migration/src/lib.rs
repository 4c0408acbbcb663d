//! Database migrations for the marketplace API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_users;
mod m2025_01_10_000002_create_properties;
mod m2025_01_10_000003_create_images;
mod m2025_01_10_000004_create_favorites;
mod m2025_01_10_000005_create_messages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_users::Migration),
            Box::new(m2025_01_10_000002_create_properties::Migration),
            Box::new(m2025_01_10_000003_create_images::Migration),
            Box::new(m2025_01_10_000004_create_favorites::Migration),
            Box::new(m2025_01_10_000005_create_messages::Migration),
        ]
    }
}
