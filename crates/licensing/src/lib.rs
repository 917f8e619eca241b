//! Licensing domain module.
//!
//! Business rules for license keys and license records, implemented purely as
//! deterministic domain logic (no IO, no storage). Randomness and the clock
//! are only read by the convenience entry points; every rule has a variant
//! that takes them explicitly.

pub mod collection;
pub mod expiry;
pub mod key;
pub mod license;

pub use collection::{KeyVerdict, LicenseCollection, Transition, sort_newest_first};
pub use expiry::{DEFAULT_DURATION_DAYS, compute_expiry, is_expired};
pub use key::{LicenseKey, generate_key, generate_key_at, generate_key_with, is_valid_key_format};
pub use license::{License, LicenseState, LicenseStatus};
