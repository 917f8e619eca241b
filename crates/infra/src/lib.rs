//! Infrastructure layer: persistence contract, lifecycle orchestration,
//! background listeners and configuration.

pub mod account_store;
pub mod config;
pub mod license_service;
pub mod workers;


pub use account_store::{AccountStore, AccountStoreError, InMemoryAccountStore};
pub use config::{ConfigError, LicenseConfig};
pub use license_service::{CreateLicense, LicenseService, LicenseServiceError};
pub use workers::snapshot_listener::{ListenerHandle, SnapshotListener};
