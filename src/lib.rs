//! # Estate API Library
//!
//! Core functionality for the real-estate marketplace API: configuration,
//! persistence, authentication, handlers and server wiring.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod storage;
pub mod telemetry;
pub use migration;
