use chrono::Utc;

use licensedesk_app::{AppContext, OwnerContext};
use licensedesk_core::OwnerId;

/// Walks one owner through the license lifecycle against the in-memory store
/// and prints the resulting collection as JSON.
fn main() -> anyhow::Result<()> {
    licensedesk_observability::init();

    let owner = std::env::args().nth(1).unwrap_or_else(|| {
        tracing::warn!("no owner id given; using demo-owner");
        "demo-owner".to_string()
    });
    let session = OwnerContext::new(OwnerId::new(owner)?);

    let ctx = AppContext::from_env()?;
    ctx.watch(&session, |snapshot| {
        tracing::info!(count = snapshot.len(), "license list changed");
    })?;

    let licenses = ctx.licenses();
    let owner_id = session.owner_id();

    let kept = licenses.create_license(owner_id)?;
    let revoked = licenses.create_license(owner_id)?;
    licenses.toggle_status(owner_id, kept.id_typed())?;
    licenses.toggle_status(owner_id, kept.id_typed())?;
    licenses.revoke(owner_id, revoked.id_typed())?;

    let verdict = licenses.verify_key(owner_id, kept.key().as_str(), Utc::now())?;
    tracing::info!(key = %kept.key(), usable = verdict.is_usable(), "key verified");

    println!("{}", serde_json::to_string_pretty(&licenses.list_licenses(owner_id)?)?);

    ctx.shutdown();
    Ok(())
}
