//! License lifecycle orchestration.
//!
//! `LicenseService` composes the pure licensing rules with an `AccountStore`:
//!
//! ```text
//! create:  issue (pure) → append-if-absent (atomic, keyed by id)
//! modify:  load (list + version) → transition (pure) → replace (version-checked)
//!            ↑                                            │ conflict
//!            └──────────── bounded retry ─────────────────┘
//! ```
//!
//! The service holds no license state of its own. Every modification starts
//! from a fresh read, so a failed commit never leaves stale state behind.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use licensedesk_core::{AggregateRoot, DomainError, ExpectedVersion, LicenseId, OwnerId};
use licensedesk_events::Subscription;
use licensedesk_licensing::{
    KeyVerdict, License, LicenseCollection, LicenseStatus, Transition, generate_key_at,
    is_valid_key_format,
};

use crate::account_store::{AccountStore, AccountStoreError};
use crate::config::LicenseConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LicenseServiceError {
    /// Status change on a revoked license, or an unsupported target status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// No license with this id exists under the owner.
    #[error("license {0} not found")]
    NotFound(LicenseId),

    /// Caller input was malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Store unreachable, write rejected, or conflict retries exhausted.
    #[error("persistence failure: {0}")]
    Persistence(#[from] AccountStoreError),
}

impl LicenseServiceError {
    fn from_domain(err: DomainError, license_id: Option<LicenseId>) -> Self {
        match err {
            DomainError::InvalidTransition(msg) => LicenseServiceError::InvalidTransition(msg),
            DomainError::NotFound => match license_id {
                Some(id) => LicenseServiceError::NotFound(id),
                None => LicenseServiceError::Validation("not found".to_string()),
            },
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => LicenseServiceError::Validation(msg),
            DomainError::Conflict(msg) => {
                LicenseServiceError::Persistence(AccountStoreError::Concurrency(msg))
            }
        }
    }
}

/// Explicit parameters for issuing a license.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CreateLicense {
    pub issued_at: DateTime<Utc>,
    pub duration_days: u32,
}

/// License lifecycle manager for one store.
///
/// Concurrent callers for the same owner are not serialized here. Conflicts
/// are detected by the store's version check and the read-modify-write is
/// retried up to `max_conflict_retries` times.
#[derive(Debug)]
pub struct LicenseService<S> {
    store: S,
    config: LicenseConfig,
}

impl<S> LicenseService<S> {
    pub fn new(store: S, config: LicenseConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> LicenseService<S>
where
    S: AccountStore,
{
    /// Issue a license now, for the configured default duration.
    pub fn create_license(&self, owner_id: &OwnerId) -> Result<License, LicenseServiceError> {
        self.create_license_with(
            owner_id,
            CreateLicense {
                issued_at: Utc::now(),
                duration_days: self.config.default_duration_days,
            },
        )
    }

    /// Issue a license at an explicit instant and duration.
    ///
    /// Nothing is kept if the append fails.
    pub fn create_license_with(
        &self,
        owner_id: &OwnerId,
        cmd: CreateLicense,
    ) -> Result<License, LicenseServiceError> {
        let license = License::issue(
            LicenseId::new(),
            generate_key_at(cmd.issued_at),
            owner_id.clone(),
            cmd.issued_at,
            cmd.duration_days,
        )
        .map_err(|e| LicenseServiceError::from_domain(e, None))?;

        let appended = self.store.append_license(&license).inspect_err(|err| {
            warn!(owner_id = %owner_id, error = %err, "license append failed");
        })?;

        if !appended {
            // Only reachable on redelivery of an append that already landed.
            debug!(
                owner_id = %owner_id,
                license_id = %license.id_typed(),
                "license already present"
            );
        }

        info!(
            owner_id = %owner_id,
            license_id = %license.id_typed(),
            expires_at = %license.expires_at(),
            "license created"
        );
        Ok(license)
    }

    /// Move a license between `active` and `inactive`.
    pub fn set_status(
        &self,
        owner_id: &OwnerId,
        license_id: LicenseId,
        new_status: LicenseStatus,
    ) -> Result<License, LicenseServiceError> {
        if new_status == LicenseStatus::Revoked {
            return Err(LicenseServiceError::InvalidTransition(
                "set_status only accepts active or inactive; use revoke".to_string(),
            ));
        }
        self.modify(owner_id, license_id, "set_status", |c| {
            c.set_status(license_id, new_status)
        })
    }

    /// Flip `active` ⇄ `inactive`.
    pub fn toggle_status(
        &self,
        owner_id: &OwnerId,
        license_id: LicenseId,
    ) -> Result<License, LicenseServiceError> {
        self.modify(owner_id, license_id, "toggle_status", |c| c.toggle_status(license_id))
    }

    /// Revoke a license. Revoking a revoked license succeeds without a write.
    pub fn revoke(
        &self,
        owner_id: &OwnerId,
        license_id: LicenseId,
    ) -> Result<License, LicenseServiceError> {
        self.modify(owner_id, license_id, "revoke", |c| c.revoke(license_id))
    }

    /// The owner's licenses, most recently created first.
    pub fn list_licenses(&self, owner_id: &OwnerId) -> Result<Vec<License>, LicenseServiceError> {
        let collection = self.store.load_licenses(owner_id)?;
        debug!(owner_id = %owner_id, count = collection.len(), "licenses listed");
        Ok(collection.newest_first())
    }

    /// Live view of the owner's licenses. Each message is the whole list.
    pub fn watch_licenses(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Subscription<Vec<License>>, LicenseServiceError> {
        Ok(self.store.subscribe(owner_id)?)
    }

    /// Classify a presented key against the owner's collection at `now`.
    pub fn verify_key(
        &self,
        owner_id: &OwnerId,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyVerdict, LicenseServiceError> {
        if !is_valid_key_format(key) {
            return Ok(KeyVerdict::Malformed);
        }
        let collection = self.store.load_licenses(owner_id)?;
        Ok(collection.verify_key(key, now))
    }

    fn modify<F>(
        &self,
        owner_id: &OwnerId,
        license_id: LicenseId,
        op: &'static str,
        mut transition: F,
    ) -> Result<License, LicenseServiceError>
    where
        F: FnMut(&mut LicenseCollection) -> Result<Transition, DomainError>,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut collection = self.store.load_licenses(owner_id)?;
            let expected = ExpectedVersion::Exact(collection.version());

            let Transition { license, changed } = transition(&mut collection)
                .map_err(|e| LicenseServiceError::from_domain(e, Some(license_id)))?;

            if !changed {
                debug!(owner_id = %owner_id, license_id = %license_id, op, "no change to write");
                return Ok(license);
            }

            match self
                .store
                .replace_licenses(owner_id, collection.into_licenses(), expected)
            {
                Ok(version) => {
                    info!(
                        owner_id = %owner_id,
                        license_id = %license_id,
                        status = %license.status(),
                        version,
                        op,
                        "license updated"
                    );
                    return Ok(license);
                }
                Err(err) if err.is_conflict() && attempt < max_attempts => {
                    warn!(
                        owner_id = %owner_id,
                        license_id = %license_id,
                        attempt,
                        op,
                        "concurrent modification detected; retrying"
                    );
                }
                Err(AccountStoreError::Concurrency(msg)) => {
                    warn!(
                        owner_id = %owner_id,
                        license_id = %license_id,
                        attempt,
                        op,
                        "conflict retries exhausted"
                    );
                    return Err(AccountStoreError::Concurrency(format!(
                        "gave up after {attempt} attempts: {msg}"
                    ))
                    .into());
                }
                Err(err) => {
                    warn!(
                        owner_id = %owner_id,
                        license_id = %license_id,
                        error = %err,
                        op,
                        "license update failed"
                    );
                    return Err(err.into());
                }
            }
        }
    }
}
