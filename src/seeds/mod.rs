//! Database seeding functionality
//!
//! Demo accounts and listings for local development, run at startup when
//! `ESTATE_SEED_DEMO_DATA=true` or through the `seed` binary.

pub mod demo;

pub use demo::{SeedSummary, reset_data, seed_demo_data};
