//! Phone number checks shared by config validation and SMS sending.

use once_cell::sync::Lazy;
use regex::Regex;

static E164: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{0,14}$").expect("invalid E.164 regex"));

/// Whether a phone number is in E.164 format: `+`, then 1-15 digits, the
/// first nonzero.
pub fn is_e164(number: &str) -> bool {
    E164.is_match(number)
}
