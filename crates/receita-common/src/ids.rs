//! Taxpayer identifier helpers
//!
//! The registry identifies every establishment by a 14-digit full id made of
//! an 8-digit base (shared by all establishments of one registrant), a 4-digit
//! order number and 2 check digits. Tax-regime exports carry the full id with
//! punctuation (`33.683.111/0002-80`), the other exports carry the parts in
//! separate columns.

use crate::error::{ReceitaError, Result};

/// Length of the registrant base id
pub const BASE_LEN: usize = 8;

/// Length of the full establishment id
pub const FULL_LEN: usize = 14;

/// Strip everything but ASCII digits
pub fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Extract the 8-digit base id from a (possibly punctuated) full or base id
///
/// # Arguments
/// * `value` - e.g. `"33.683.111/0002-80"`, `"33683111000280"` or `"33683111"`
///
/// # Returns
/// The first 8 digits, or an error when fewer than 8 digits are present
pub fn base_id(value: &str) -> Result<String> {
    let digits = digits(value);
    if digits.len() < BASE_LEN {
        return Err(ReceitaError::invalid_id(
            value,
            format!("expected at least {} digits", BASE_LEN),
        ));
    }
    Ok(digits[..BASE_LEN].to_string())
}

/// Join the three id columns of an establishment row into a full id
///
/// The result must be exactly 14 ASCII digits.
pub fn full_id(base: &str, order: &str, check: &str) -> Result<String> {
    let id = format!("{}{}{}", base, order, check);
    if id.len() != FULL_LEN || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReceitaError::invalid_id(
            id,
            format!("expected {} digits", FULL_LEN),
        ));
    }
    Ok(id)
}
