use std::sync::Arc;

use thiserror::Error;

use licensedesk_core::{ExpectedVersion, OwnerId};
use licensedesk_events::Subscription;
use licensedesk_licensing::{License, LicenseCollection};

/// Account store operation error.
///
/// These are **infrastructure errors** (reachability, rejected writes,
/// concurrency) as opposed to domain errors (validation, transitions).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountStoreError {
    /// The document changed since it was read.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The backing service could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write was refused (malformed document, foreign owner, etc.).
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl AccountStoreError {
    /// Whether re-reading and retrying the write may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AccountStoreError::Concurrency(_))
    }
}

/// Persistence contract for an owner's license collection.
///
/// ## Write Semantics
///
/// - `append_license()` is an atomic add-to-set keyed by license id. Delivering
///   the same append twice leaves one entry.
/// - `replace_licenses()` swaps the whole list, but only if the document is
///   still at `expected_version`. A stale writer gets `Concurrency` and must
///   re-read; it must never retry the same list blindly.
///
/// ## Read Semantics
///
/// - `load_licenses()` returns the list together with the version it was read
///   at. A missing document is an empty collection at version 0.
/// - `subscribe()` pushes the full list (newest first) immediately and after
///   every committed change. Dropping the subscription unsubscribes.
pub trait AccountStore: Send + Sync {
    /// Append `license` to its owner's collection unless its id is present.
    ///
    /// Returns whether the entry was added.
    fn append_license(&self, license: &License) -> Result<bool, AccountStoreError>;

    /// Read the owner's collection and its current version.
    fn load_licenses(&self, owner_id: &OwnerId) -> Result<LicenseCollection, AccountStoreError>;

    /// Replace the owner's whole list, guarded by `expected_version`.
    ///
    /// Returns the new document version.
    fn replace_licenses(
        &self,
        owner_id: &OwnerId,
        licenses: Vec<License>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, AccountStoreError>;

    /// Live view of the owner's list.
    fn subscribe(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Subscription<Vec<License>>, AccountStoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn append_license(&self, license: &License) -> Result<bool, AccountStoreError> {
        (**self).append_license(license)
    }

    fn load_licenses(&self, owner_id: &OwnerId) -> Result<LicenseCollection, AccountStoreError> {
        (**self).load_licenses(owner_id)
    }

    fn replace_licenses(
        &self,
        owner_id: &OwnerId,
        licenses: Vec<License>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, AccountStoreError> {
        (**self).replace_licenses(owner_id, licenses, expected_version)
    }

    fn subscribe(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Subscription<Vec<License>>, AccountStoreError> {
        (**self).subscribe(owner_id)
    }
}
