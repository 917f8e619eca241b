use std::collections::HashMap;
use std::sync::RwLock;

use licensedesk_core::{AggregateRoot, ExpectedVersion, OwnerId};
use licensedesk_events::{SnapshotFeed, Subscription};
use licensedesk_licensing::{License, LicenseCollection};

use super::r#trait::{AccountStore, AccountStoreError};

/// In-memory owner document store with live snapshots.
///
/// Intended for tests/dev. Snapshots are published while the write lock is
/// still held, so subscribers always see versions in commit order.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    documents: RwLock<HashMap<OwnerId, LicenseCollection>>,
    feed: SnapshotFeed<OwnerId, Vec<License>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current document version for `owner_id` (0 if never written).
    pub fn version_of(&self, owner_id: &OwnerId) -> Result<u64, AccountStoreError> {
        let docs = self.documents.read().map_err(|_| poisoned())?;
        Ok(docs.get(owner_id).map(|c| c.version()).unwrap_or(0))
    }

    fn publish(&self, collection: &LicenseCollection) {
        if let Err(err) = self.feed.publish(collection.owner_id(), collection.newest_first()) {
            tracing::warn!(
                owner_id = %collection.owner_id(),
                error = %err,
                "snapshot publish failed"
            );
        }
    }
}

fn poisoned() -> AccountStoreError {
    AccountStoreError::Unavailable("lock poisoned".to_string())
}

impl AccountStore for InMemoryAccountStore {
    fn append_license(&self, license: &License) -> Result<bool, AccountStoreError> {
        let owner_id = license.owner_id().clone();
        let mut docs = self.documents.write().map_err(|_| poisoned())?;

        let collection = docs
            .entry(owner_id.clone())
            .or_insert_with(|| LicenseCollection::empty(owner_id));

        let appended = collection
            .insert(license.clone())
            .map_err(|e| AccountStoreError::Rejected(e.to_string()))?;

        if appended {
            let next = collection.version() + 1;
            collection.set_version(next);
            self.publish(collection);
        }

        Ok(appended)
    }

    fn load_licenses(&self, owner_id: &OwnerId) -> Result<LicenseCollection, AccountStoreError> {
        let docs = self.documents.read().map_err(|_| poisoned())?;
        Ok(docs
            .get(owner_id)
            .cloned()
            .unwrap_or_else(|| LicenseCollection::empty(owner_id.clone())))
    }

    fn replace_licenses(
        &self,
        owner_id: &OwnerId,
        licenses: Vec<License>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, AccountStoreError> {
        // Validate the incoming list before touching stored state.
        let mut replacement = LicenseCollection::empty(owner_id.clone());
        for (idx, license) in licenses.into_iter().enumerate() {
            let id = license.id_typed();
            let added = replacement
                .insert(license)
                .map_err(|e| AccountStoreError::Rejected(format!("entry {idx}: {e}")))?;
            if !added {
                return Err(AccountStoreError::Rejected(format!(
                    "entry {idx}: duplicate license id {id}"
                )));
            }
        }

        let mut docs = self.documents.write().map_err(|_| poisoned())?;
        let current = docs.get(owner_id).map(|c| c.version()).unwrap_or(0);

        expected_version
            .check(current)
            .map_err(|e| AccountStoreError::Concurrency(e.to_string()))?;

        let next = current + 1;
        replacement.set_version(next);
        self.publish(&replacement);
        docs.insert(owner_id.clone(), replacement);

        Ok(next)
    }

    fn subscribe(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Subscription<Vec<License>>, AccountStoreError> {
        // Holding the read lock keeps writers out until the subscriber is
        // registered, so no commit can fall between the initial snapshot and
        // the first pushed one.
        let docs = self.documents.read().map_err(|_| poisoned())?;
        let initial = docs.get(owner_id).map(|c| c.newest_first()).unwrap_or_default();

        self.feed
            .subscribe(owner_id.clone(), Some(initial))
            .map_err(|e| AccountStoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use licensedesk_core::LicenseId;
    use licensedesk_licensing::{LicenseStatus, generate_key};

    fn owner(name: &str) -> OwnerId {
        OwnerId::new(name).unwrap()
    }

    fn license_for(owner_id: &OwnerId, offset_hours: i64) -> License {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(offset_hours);
        License::issue(LicenseId::new(), generate_key(), owner_id.clone(), at, 30).unwrap()
    }

    #[test]
    fn missing_document_loads_as_empty_version_zero() {
        let store = InMemoryAccountStore::new();
        let c = store.load_licenses(&owner("u1")).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.version(), 0);
    }

    #[test]
    fn append_is_duplicate_safe() {
        let store = InMemoryAccountStore::new();
        let u1 = owner("u1");
        let license = license_for(&u1, 0);

        assert!(store.append_license(&license).unwrap());
        assert!(!store.append_license(&license).unwrap());

        let c = store.load_licenses(&u1).unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c.version(), 1);
    }

    #[test]
    fn owners_are_isolated() {
        let store = InMemoryAccountStore::new();
        let (u1, u2) = (owner("u1"), owner("u2"));
        store.append_license(&license_for(&u1, 0)).unwrap();

        assert!(store.load_licenses(&u2).unwrap().is_empty());
        assert_eq!(store.version_of(&u2).unwrap(), 0);
    }

    #[test]
    fn replace_rejects_stale_version() {
        let store = InMemoryAccountStore::new();
        let u1 = owner("u1");
        let license = license_for(&u1, 0);
        store.append_license(&license).unwrap();

        let mut read = store.load_licenses(&u1).unwrap();
        read.set_status(license.id_typed(), LicenseStatus::Inactive).unwrap();

        // Someone else commits first.
        store.append_license(&license_for(&u1, 1)).unwrap();

        let err = store
            .replace_licenses(&u1, read.licenses().to_vec(), ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("expected: Exact(1), actual: 2"));
        assert_eq!(store.version_of(&u1).unwrap(), 2);

        let now = store.load_licenses(&u1).unwrap();
        assert_eq!(now.len(), 2);
        assert_eq!(now.get(license.id_typed()).unwrap().status(), LicenseStatus::Active);
    }

    #[test]
    fn replace_rejects_foreign_and_duplicate_entries() {
        let store = InMemoryAccountStore::new();
        let (u1, u2) = (owner("u1"), owner("u2"));
        let mine = license_for(&u1, 0);

        let err = store
            .replace_licenses(&u1, vec![license_for(&u2, 0)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, AccountStoreError::Rejected(_)));

        let err = store
            .replace_licenses(&u1, vec![mine.clone(), mine], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, AccountStoreError::Rejected(msg) if msg.contains("duplicate")));
        assert_eq!(store.version_of(&u1).unwrap(), 0);
    }

    #[test]
    fn subscribers_get_full_sorted_snapshots() {
        let store = InMemoryAccountStore::new();
        let u1 = owner("u1");
        let sub = store.subscribe(&u1).unwrap();
        assert!(sub.try_recv().unwrap().is_empty());

        let older = license_for(&u1, 0);
        let newer = license_for(&u1, 5);
        store.append_license(&older).unwrap();
        store.append_license(&newer).unwrap();

        assert_eq!(sub.try_recv().unwrap().len(), 1);
        let latest = sub.try_recv().unwrap();
        assert_eq!(latest, vec![newer, older]);
    }

    #[test]
    fn cancelled_subscription_is_forgotten() {
        let store = InMemoryAccountStore::new();
        let u1 = owner("u1");
        let sub = store.subscribe(&u1).unwrap();
        sub.cancel();

        store.append_license(&license_for(&u1, 0)).unwrap();
        assert_eq!(store.feed.subscriber_count(&u1), 0);
    }
}
