//! License key generation and format validation.
//!
//! Keys have the fixed shape `LICENSE-XXXXXXXX-NNNN`:
//! - `X`: ASCII letter (either case) or digit, exactly 8
//! - `N`: ASCII decimal digit, exactly 4 (last four digits of the epoch-millis
//!   timestamp at generation time)

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use licensedesk_core::{DomainError, DomainResult, ValueObject};

const PREFIX: &str = "LICENSE-";
const TOKEN_LEN: usize = 8;
const SUFFIX_LEN: usize = 4;
const SUFFIX_MODULUS: i64 = 10_000;

/// A license key known to be well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Validate `s` and wrap it.
    pub fn parse(s: impl Into<String>) -> DomainResult<Self> {
        let s = s.into();
        if !is_valid_key_format(&s) {
            return Err(DomainError::validation(format!("malformed license key: {s:?}")));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 8-character random token.
    pub fn token(&self) -> &str {
        &self.0[PREFIX.len()..PREFIX.len() + TOKEN_LEN]
    }

    /// The 4-digit timestamp suffix.
    pub fn suffix(&self) -> &str {
        &self.0[self.0.len() - SUFFIX_LEN..]
    }
}

impl ValueObject for LicenseKey {}

impl core::fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for LicenseKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LicenseKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<LicenseKey> for String {
    fn from(value: LicenseKey) -> Self {
        value.0
    }
}

/// Generate a fresh key from the thread-local RNG and the system clock.
pub fn generate_key() -> LicenseKey {
    generate_key_at(Utc::now())
}

/// Generate a key for an explicit issue instant using the thread-local RNG.
pub fn generate_key_at(now: DateTime<Utc>) -> LicenseKey {
    generate_key_with(&mut rand::thread_rng(), now)
}

/// Generate a key from an explicit RNG and instant.
///
/// The token is drawn uniformly from `[A-Za-z0-9]`; the suffix is
/// `now` in epoch milliseconds modulo 10 000, zero-padded.
pub fn generate_key_with<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> LicenseKey {
    let token: String = (0..TOKEN_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    let suffix = now.timestamp_millis().rem_euclid(SUFFIX_MODULUS);

    LicenseKey(format!("{PREFIX}{token}-{suffix:0width$}", width = SUFFIX_LEN))
}

/// `true` iff `s` is exactly `LICENSE-[A-Za-z0-9]{8}-[0-9]{4}`.
pub fn is_valid_key_format(s: &str) -> bool {
    let Some(rest) = s.strip_prefix(PREFIX) else {
        return false;
    };
    let bytes = rest.as_bytes();

    bytes.len() == TOKEN_LEN + 1 + SUFFIX_LEN
        && bytes[..TOKEN_LEN].iter().all(u8::is_ascii_alphanumeric)
        && bytes[TOKEN_LEN] == b'-'
        && bytes[TOKEN_LEN + 1..].iter().all(u8::is_ascii_digit)
}
