use std::sync::{Arc, Mutex};

use licensedesk_core::OwnerId;
use licensedesk_infra::{
    AccountStore, InMemoryAccountStore, LicenseConfig, LicenseService, ListenerHandle,
    SnapshotListener,
};
use licensedesk_licensing::License;

/// Identity of the signed-in account, as supplied by the session layer.
///
/// The license subsystem trusts this value; it performs no authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: OwnerId,
}

impl OwnerContext {
    pub fn new(owner_id: OwnerId) -> Self {
        Self { owner_id }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }
}

/// Process-wide handles, built once at startup and torn down at shutdown.
pub struct AppContext<S> {
    licenses: Arc<LicenseService<S>>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl AppContext<Arc<InMemoryAccountStore>> {
    /// In-memory wiring (dev/test) with configuration from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = LicenseConfig::from_env()?;
        tracing::info!(
            default_duration_days = config.default_duration_days,
            max_conflict_retries = config.max_conflict_retries,
            "license configuration loaded"
        );
        Ok(Self::new(Arc::new(InMemoryAccountStore::new()), config))
    }
}

impl<S> AppContext<S>
where
    S: AccountStore + 'static,
{
    pub fn new(store: S, config: LicenseConfig) -> Self {
        Self {
            licenses: Arc::new(LicenseService::new(store, config)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn licenses(&self) -> &LicenseService<S> {
        &self.licenses
    }

    /// Shared handle for callers that outlive a borrow of the context.
    pub fn licenses_handle(&self) -> Arc<LicenseService<S>> {
        self.licenses.clone()
    }

    /// Run `on_change` with the owner's full license list now and after every
    /// committed change, until [`AppContext::shutdown`].
    pub fn watch<F>(&self, session: &OwnerContext, mut on_change: F) -> anyhow::Result<()>
    where
        F: FnMut(Vec<License>) + Send + 'static,
    {
        let subscription = self.licenses.watch_licenses(session.owner_id())?;
        let handle = SnapshotListener::spawn("license-watch", subscription, move |snapshot| {
            on_change(snapshot);
            Ok::<(), core::convert::Infallible>(())
        })?;

        self.listeners
            .lock()
            .map_err(|_| anyhow::anyhow!("listener registry poisoned"))?
            .push(handle);
        Ok(())
    }

    /// Stop every listener. No callback runs after this returns.
    pub fn shutdown(self) {
        let listeners = match self.listeners.into_inner() {
            Ok(listeners) => listeners,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = listeners.len();
        for handle in listeners {
            handle.shutdown();
        }
        tracing::info!(listeners = count, "application context shut down");
    }
}
