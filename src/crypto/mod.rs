//! Secret material for the portal: generated trial passwords, registration
//! codes, and constant-time comparison of presented secrets.
//!
//! Registration code format: `<PREFIX>-<base36 unix millis>-<8 hex chars>`.
//! Codes are not stored anywhere; they exist only to be handed out.

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

/// Length of a generated trial password
pub const TRIAL_PASSWORD_LENGTH: usize = 12;

/// Number of random bytes in a registration code suffix
const CODE_SUFFIX_BYTES: usize = 4;

/// Compare two secrets without leaking where they first differ.
///
/// Length is not hidden; only equal-length inputs are compared byte by byte.
pub fn secret_eq(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    presented.len() == expected.len() && presented.ct_eq(expected).into()
}

/// Generate a random alphanumeric password for a trial account
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TRIAL_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Generate a fresh registration code for out-of-band distribution.
pub fn generate_registration_code(prefix: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: [u8; CODE_SUFFIX_BYTES] = rng.random();
    let millis = now.timestamp_millis().max(0) as u64;
    format!(
        "{}-{}-{}",
        prefix,
        to_base36(millis),
        hex::encode_upper(suffix)
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
