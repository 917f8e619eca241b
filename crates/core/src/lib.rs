//! `licensedesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the licensing
//! domain and its infrastructure adapters (no IO).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LicenseId, OwnerId};
pub use value_object::ValueObject;
