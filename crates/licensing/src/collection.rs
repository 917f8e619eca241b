//! The owner's license collection: one versioned, list-valued document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use licensedesk_core::{AggregateRoot, DomainError, DomainResult, LicenseId, OwnerId};

use crate::key::is_valid_key_format;
use crate::license::{License, LicenseState, LicenseStatus};

/// Result of a transition on one entry of the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The entry after the transition.
    pub license: License,
    /// Whether anything changed (and therefore needs to be written).
    pub changed: bool,
}

/// Classification of a presented key against an owner's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "camelCase")]
pub enum KeyVerdict {
    /// Not shaped like a license key at all.
    Malformed,
    /// Well-formed, but the owner holds no license with this key.
    Unknown,
    /// Held by the owner; `state` is evaluated at the verification instant.
    #[serde(rename_all = "camelCase")]
    Known {
        license_id: LicenseId,
        state: LicenseState,
    },
}

impl KeyVerdict {
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            KeyVerdict::Known {
                state: LicenseState::Active,
                ..
            }
        )
    }
}

/// Aggregate root: all licenses belonging to one owner.
///
/// `version` is the persisted document version the entries were read at.
/// Transitions mutate the in-memory copy only; writing it back is the
/// caller's job and must be guarded by that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseCollection {
    owner_id: OwnerId,
    version: u64,
    licenses: Vec<License>,
}

impl LicenseCollection {
    /// A collection that has never been written.
    pub fn empty(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            version: 0,
            licenses: Vec::new(),
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    pub fn into_licenses(self) -> Vec<License> {
        self.licenses
    }

    /// Record that the entries now correspond to `version` in storage.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn get(&self, id: LicenseId) -> Option<&License> {
        self.licenses.iter().find(|l| l.id_typed() == id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&License> {
        self.licenses.iter().find(|l| l.key().as_str() == key)
    }

    /// Add-to-set keyed by id.
    ///
    /// Returns `false` (and leaves the collection untouched) if an entry with
    /// the same id is already present.
    pub fn insert(&mut self, license: License) -> DomainResult<bool> {
        if license.owner_id() != &self.owner_id {
            return Err(DomainError::invariant(format!(
                "license {} belongs to {}, not {}",
                license.id_typed(),
                license.owner_id(),
                self.owner_id
            )));
        }
        if self.get(license.id_typed()).is_some() {
            return Ok(false);
        }
        self.licenses.push(license);
        Ok(true)
    }

    pub fn set_status(&mut self, id: LicenseId, target: LicenseStatus) -> DomainResult<Transition> {
        let license = self.entry_mut(id)?;
        let changed = license.set_status(target)?;
        Ok(Transition {
            license: license.clone(),
            changed,
        })
    }

    pub fn toggle_status(&mut self, id: LicenseId) -> DomainResult<Transition> {
        let target = self.get(id).ok_or(DomainError::NotFound)?.toggled_status()?;
        self.set_status(id, target)
    }

    pub fn revoke(&mut self, id: LicenseId) -> DomainResult<Transition> {
        let license = self.entry_mut(id)?;
        let changed = license.revoke();
        Ok(Transition {
            license: license.clone(),
            changed,
        })
    }

    /// Entries ordered for display: most recently created first.
    pub fn newest_first(&self) -> Vec<License> {
        let mut out = self.licenses.clone();
        sort_newest_first(&mut out);
        out
    }

    pub fn verify_key(&self, key: &str, now: DateTime<Utc>) -> KeyVerdict {
        if !is_valid_key_format(key) {
            return KeyVerdict::Malformed;
        }
        match self.find_by_key(key) {
            Some(license) => KeyVerdict::Known {
                license_id: license.id_typed(),
                state: license.state(now),
            },
            None => KeyVerdict::Unknown,
        }
    }

    fn entry_mut(&mut self, id: LicenseId) -> DomainResult<&mut License> {
        self.licenses
            .iter_mut()
            .find(|l| l.id_typed() == id)
            .ok_or(DomainError::NotFound)
    }
}

impl AggregateRoot for LicenseCollection {
    type Id = OwnerId;

    fn id(&self) -> &Self::Id {
        &self.owner_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Sort by `created_at` descending; ties fall back to id descending so the
/// order is stable across reads.
pub fn sort_newest_first(licenses: &mut [License]) {
    licenses.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id_typed().as_uuid().cmp(a.id_typed().as_uuid()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::key::LicenseKey;

    fn test_owner() -> OwnerId {
        OwnerId::new("u1").unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn license_at(n: u32, at: DateTime<Utc>) -> License {
        let key = LicenseKey::parse(format!("LICENSE-abcDEF12-{n:04}")).unwrap();
        License::issue(LicenseId::new(), key, test_owner(), at, 30).unwrap()
    }

    fn seeded() -> (LicenseCollection, License, License) {
        let mut c = LicenseCollection::empty(test_owner());
        let older = license_at(1, t0());
        let newer = license_at(2, t0() + Duration::hours(1));
        c.insert(older.clone()).unwrap();
        c.insert(newer.clone()).unwrap();
        (c, older, newer)
    }

    #[test]
    fn insert_is_idempotent_by_id() {
        let (mut c, older, _) = seeded();
        assert!(!c.insert(older).unwrap());
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn insert_rejects_foreign_owner() {
        let mut c = LicenseCollection::empty(OwnerId::new("u2").unwrap());
        let err = c.insert(license_at(1, t0())).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(c.is_empty());
    }

    #[test]
    fn newest_first_orders_by_creation_desc() {
        let (c, older, newer) = seeded();
        let ids: Vec<_> = c.newest_first().iter().map(License::id_typed).collect();
        assert_eq!(ids, vec![newer.id_typed(), older.id_typed()]);
    }

    #[test]
    fn set_status_only_touches_target_entry() {
        let (mut c, older, newer) = seeded();
        let t = c.set_status(older.id_typed(), LicenseStatus::Inactive).unwrap();
        assert!(t.changed);
        assert_eq!(t.license.status(), LicenseStatus::Inactive);
        assert_eq!(c.get(newer.id_typed()).unwrap(), &newer);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (mut c, _, _) = seeded();
        let missing = LicenseId::new();
        assert_eq!(c.set_status(missing, LicenseStatus::Active), Err(DomainError::NotFound));
        assert_eq!(c.revoke(missing), Err(DomainError::NotFound));
        assert_eq!(c.toggle_status(missing), Err(DomainError::NotFound));
    }

    #[test]
    fn revoke_is_idempotent_and_terminal() {
        let (mut c, older, _) = seeded();
        assert!(c.revoke(older.id_typed()).unwrap().changed);
        let again = c.revoke(older.id_typed()).unwrap();
        assert!(!again.changed);
        assert_eq!(again.license.status(), LicenseStatus::Revoked);

        let err = c.set_status(older.id_typed(), LicenseStatus::Active).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert!(matches!(
            c.toggle_status(older.id_typed()),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn toggle_flips_active_and_inactive() {
        let (mut c, older, _) = seeded();
        let id = older.id_typed();
        assert_eq!(c.toggle_status(id).unwrap().license.status(), LicenseStatus::Inactive);
        assert_eq!(c.toggle_status(id).unwrap().license.status(), LicenseStatus::Active);
    }

    #[test]
    fn verify_key_classifies_presented_keys() {
        let (mut c, older, newer) = seeded();
        let now = t0() + Duration::days(1);

        assert_eq!(c.verify_key("garbage", now), KeyVerdict::Malformed);
        assert_eq!(c.verify_key("LICENSE-zzzzzzzz-0000", now), KeyVerdict::Unknown);

        let verdict = c.verify_key(newer.key().as_str(), now);
        assert!(verdict.is_usable());

        c.revoke(older.id_typed()).unwrap();
        assert_eq!(
            c.verify_key(older.key().as_str(), now),
            KeyVerdict::Known {
                license_id: older.id_typed(),
                state: LicenseState::Revoked,
            }
        );

        let after_expiry = newer.expires_at();
        assert_eq!(
            c.verify_key(newer.key().as_str(), after_expiry),
            KeyVerdict::Known {
                license_id: newer.id_typed(),
                state: LicenseState::Expired,
            }
        );
    }

    #[test]
    fn version_tracks_storage() {
        let (mut c, _, _) = seeded();
        assert_eq!(c.version(), 0);
        c.set_version(5);
        assert_eq!(c.version(), 5);
        assert_eq!(c.id(), &test_owner());
    }
}
