//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! marketplace entities.

pub mod favorite;
pub mod message;
pub mod property;
pub mod user;

pub use favorite::FavoriteRepository;
pub use message::MessageRepository;
pub use property::PropertyRepository;
pub use user::UserRepository;
