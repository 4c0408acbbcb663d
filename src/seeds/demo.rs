//! Demo data seeding
//!
//! Creates an admin, an agent and a handful of listings so a fresh
//! database has something to browse.

use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::auth::hash_password;
use crate::models::{
    Favorite, Image, Message, Property, PropertyFeature, PropertyStatus, PropertyType, Role, User,
};
use crate::repositories::property::PropertyInput;
use crate::repositories::user::NewUser;
use crate::repositories::{PropertyRepository, UserRepository};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const AGENT_EMAIL: &str = "agent@example.com";

/// What a seeding run created.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub properties: usize,
}

/// Seeds demo accounts and listings unless the admin account already exists.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<SeedSummary> {
    let users = UserRepository::new(db);

    if users.find_by_email(ADMIN_EMAIL).await?.is_some() {
        log::info!("Demo data already present ({ADMIN_EMAIL} exists), skipping");
        return Ok(SeedSummary::default());
    }

    users
        .create(NewUser {
            name: "Administrator".to_string(),
            email: ADMIN_EMAIL.to_string(),
            password_hash: hash_password("admin123")
                .map_err(|e| anyhow::anyhow!("hashing admin password: {e}"))?,
            phone: None,
            role: Role::Admin,
        })
        .await
        .context("creating demo admin")?;

    let agent = users
        .create(NewUser {
            name: "Juan Agent".to_string(),
            email: AGENT_EMAIL.to_string(),
            password_hash: hash_password("agent123")
                .map_err(|e| anyhow::anyhow!("hashing agent password: {e}"))?,
            phone: Some("+51 999 888 777".to_string()),
            role: Role::Agent,
        })
        .await
        .context("creating demo agent")?;

    let properties = PropertyRepository::new(db);
    let listings = sample_listings();
    let count = listings.len();
    for listing in listings {
        let title = listing.title.clone();
        properties
            .create(agent.id, listing, &[])
            .await
            .with_context(|| format!("creating demo listing '{title}'"))?;
    }

    log::info!("Seeded 2 demo users and {count} listings");
    Ok(SeedSummary {
        users: 2,
        properties: count,
    })
}

/// Removes every row from every table, children first.
pub async fn reset_data(db: &DatabaseConnection) -> Result<()> {
    Message::delete_many().exec(db).await?;
    Favorite::delete_many().exec(db).await?;
    Image::delete_many().exec(db).await?;
    PropertyFeature::delete_many().exec(db).await?;
    Property::delete_many().exec(db).await?;
    User::delete_many().exec(db).await?;

    log::warn!("All marketplace data removed");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn listing(
    title: &str,
    description: &str,
    price: f64,
    address: &str,
    city: &str,
    zip_code: &str,
    coords: (f64, f64),
    rooms: (i32, i32),
    area: f64,
    year_built: i32,
    property_type: PropertyType,
    features: &[&str],
) -> PropertyInput {
    PropertyInput {
        title: title.to_string(),
        description: description.to_string(),
        price,
        address: address.to_string(),
        city: city.to_string(),
        state: "Lima".to_string(),
        zip_code: zip_code.to_string(),
        country: "Peru".to_string(),
        latitude: Some(coords.0),
        longitude: Some(coords.1),
        bedrooms: rooms.0,
        bathrooms: rooms.1,
        area,
        year_built: Some(year_built),
        property_type,
        status: PropertyStatus::Active,
        features: features.iter().map(|f| f.to_string()).collect(),
        tour_3d: None,
    }
}

fn sample_listings() -> Vec<PropertyInput> {
    vec![
        listing(
            "Luxury penthouse with terrace in Miraflores",
            "Spectacular penthouse with panoramic ocean views, a 50 m2 terrace and high-end finishes. Includes two parking spaces and storage.",
            1_450_000.0,
            "Malecon de la Reserva 123",
            "Lima",
            "15074",
            (-12.1219, -77.0474),
            (3, 2),
            150.0,
            2020,
            PropertyType::Apartment,
            &["Terrace", "Parking", "Elevator", "Air conditioning"],
        ),
        listing(
            "Beach house in Asia",
            "Luxurious house with a private pool, garden and sea views. Modern design built with first-class materials.",
            2_850_000.0,
            "Boulevard Asia km 97.5",
            "Asia",
            "15711",
            (-12.7947, -76.6053),
            (4, 3),
            300.0,
            2019,
            PropertyType::House,
            &["Pool", "Garden", "Parking", "Security", "Air conditioning"],
        ),
        listing(
            "Central apartment in San Isidro",
            "Fully remodeled apartment in the heart of the financial district. Ideal for executives or investors.",
            720_000.0,
            "Calle Las Begonias 150",
            "Lima",
            "15046",
            (-12.0933, -77.0244),
            (2, 1),
            75.0,
            1995,
            PropertyType::Apartment,
            &["Elevator", "Air conditioning", "Furnished"],
        ),
        listing(
            "Family house in La Molina",
            "Spacious house in an exclusive residential area. Perfect for families looking for quiet streets.",
            1_385_000.0,
            "Calle Los Eucaliptos 215",
            "Lima",
            "15026",
            (-12.0867, -76.9286),
            (4, 2),
            180.0,
            2015,
            PropertyType::House,
            &["Garden", "Parking", "Air conditioning"],
        ),
        listing(
            "Street-level retail space in San Isidro",
            "Street-level commercial space in the business district. An excellent investment opportunity.",
            895_000.0,
            "Av. Javier Prado Este 456",
            "Lima",
            "15046",
            (-12.0933, -77.0244),
            (0, 1),
            120.0,
            2000,
            PropertyType::Commercial,
            &["Air conditioning", "Security"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_listings_are_publishable() {
        for listing in sample_listings() {
            assert!((5..=100).contains(&listing.title.chars().count()), "{}", listing.title);
            assert!(listing.description.chars().count() >= 20);
            assert!(listing.price > 0.0 && listing.area > 0.0);
        }
    }
}
