//! License records: stored status, derived state and the transition rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use licensedesk_core::{DomainError, DomainResult, Entity, LicenseId, OwnerId};

use crate::expiry::{compute_expiry, is_expired};
use crate::key::LicenseKey;

/// Stored status of a license.
///
/// `Revoked` is terminal. `Active` and `Inactive` can be swapped freely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Inactive,
    Revoked,
}

impl LicenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Inactive => "inactive",
            LicenseStatus::Revoked => "revoked",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LicenseStatus::Revoked)
    }
}

impl core::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LicenseStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LicenseStatus::Active),
            "inactive" => Ok(LicenseStatus::Inactive),
            "revoked" => Ok(LicenseStatus::Revoked),
            other => Err(DomainError::validation(format!("unknown license status: {other:?}"))),
        }
    }
}

/// Read-time view of a license. Never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseState {
    Active,
    Inactive,
    Revoked,
    Expired,
}

/// A license record as stored in the owner's license collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    id: LicenseId,
    key: LicenseKey,
    owner_id: OwnerId,
    status: LicenseStatus,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl License {
    /// Build a new active license.
    ///
    /// `duration_days` must be at least one so that `expires_at > created_at`.
    pub fn issue(
        id: LicenseId,
        key: LicenseKey,
        owner_id: OwnerId,
        issued_at: DateTime<Utc>,
        duration_days: u32,
    ) -> DomainResult<Self> {
        if duration_days == 0 {
            return Err(DomainError::validation("license duration must be at least one day"));
        }

        let expires_at = compute_expiry(issued_at, duration_days);
        if expires_at <= issued_at {
            return Err(DomainError::invariant("expiry must be after creation"));
        }

        Ok(Self {
            id,
            key,
            owner_id,
            status: LicenseStatus::Active,
            created_at: issued_at,
            expires_at,
        })
    }

    pub fn id_typed(&self) -> LicenseId {
        self.id
    }

    pub fn key(&self) -> &LicenseKey {
        &self.key
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn status(&self) -> LicenseStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }

    /// Active and not yet expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == LicenseStatus::Active && !self.is_expired(now)
    }

    pub fn state(&self, now: DateTime<Utc>) -> LicenseState {
        match self.status {
            LicenseStatus::Revoked => LicenseState::Revoked,
            _ if self.is_expired(now) => LicenseState::Expired,
            LicenseStatus::Active => LicenseState::Active,
            LicenseStatus::Inactive => LicenseState::Inactive,
        }
    }

    /// Move between `Active` and `Inactive`.
    ///
    /// Returns whether the status actually changed.
    pub fn set_status(&mut self, target: LicenseStatus) -> DomainResult<bool> {
        if target == LicenseStatus::Revoked {
            return Err(DomainError::invalid_transition(
                "revocation is not a status change; revoke the license instead",
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "license {} is revoked",
                self.id
            )));
        }

        let changed = self.status != target;
        self.status = target;
        Ok(changed)
    }

    /// The status a toggle would move to.
    pub fn toggled_status(&self) -> DomainResult<LicenseStatus> {
        match self.status {
            LicenseStatus::Active => Ok(LicenseStatus::Inactive),
            LicenseStatus::Inactive => Ok(LicenseStatus::Active),
            LicenseStatus::Revoked => Err(DomainError::invalid_transition(format!(
                "license {} is revoked",
                self.id
            ))),
        }
    }

    /// Revoke unconditionally. Returns whether the status actually changed.
    pub fn revoke(&mut self) -> bool {
        let changed = self.status != LicenseStatus::Revoked;
        self.status = LicenseStatus::Revoked;
        changed
    }
}

impl Entity for License {
    type Id = LicenseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
