//! Phone number normalization and masking
//!
//! Every phone stored by the system (driver or passenger) is in the national
//! format: a leading `0` followed by the national significant number, digits
//! only. Normalizing on the way in makes the `drivers.phone` uniqueness check
//! meaningful regardless of how the number was typed.

use std::fmt;

use crate::config::PhoneConfig;

/// Characters kept visible by [`mask_phone`]
pub const MASK_VISIBLE_PREFIX: usize = 4;

/// Placeholder for each hidden character
pub const MASK_CHAR: char = '*';

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PhoneError {
    #[error("Phone number is empty")]
    Empty,

    #[error("Phone number contains invalid characters: '{0}'")]
    InvalidCharacters(String),

    #[error("Unsupported country code in '{0}'")]
    WrongCountryCode(String),

    #[error("Invalid phone length: expected {expected} digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Normalized national-format phone number
///
/// Fields are private to force validation through `parse()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize user input
    ///
    /// Accepted shapes (separators ` `, `-`, `.`, `(`, `)` are ignored):
    /// - `+<cc><number>` and `00<cc><number>`
    /// - `0<number>` (already national)
    /// - `<cc><number>` when the length matches a full international number
    /// - `<number>` without the trunk `0`
    pub fn parse(raw: &str, config: &PhoneConfig) -> Result<Self, PhoneError> {
        let compact: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        let cc = config.country_code.as_str();
        let significant_len = config.national_length.saturating_sub(1);

        let significant = if let Some(rest) = compact.strip_prefix('+') {
            rest.strip_prefix(cc)
                .ok_or_else(|| PhoneError::WrongCountryCode(raw.to_string()))?
        } else if let Some(rest) = compact.strip_prefix("00") {
            rest.strip_prefix(cc)
                .ok_or_else(|| PhoneError::WrongCountryCode(raw.to_string()))?
        } else if let Some(rest) = compact.strip_prefix('0') {
            rest
        } else if compact.len() == cc.len() + significant_len && compact.starts_with(cc) {
            &compact[cc.len()..]
        } else {
            compact.as_str()
        };

        if !significant.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacters(raw.to_string()));
        }

        if significant.len() != significant_len || significant.starts_with('0') {
            return Err(PhoneError::InvalidLength {
                expected: config.national_length,
                actual: significant.len() + 1,
            });
        }

        Ok(Self(format!("0{}", significant)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn masked(&self) -> String {
        mask_phone(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Redact everything after the visible prefix
///
/// Inputs no longer than the prefix are hidden completely so the output is
/// never the full number.
pub fn mask_phone(phone: &str) -> String {
    let len = phone.chars().count();
    if len <= MASK_VISIBLE_PREFIX {
        return std::iter::repeat_n(MASK_CHAR, len.max(1)).collect();
    }
    phone
        .chars()
        .enumerate()
        .map(|(i, c)| if i < MASK_VISIBLE_PREFIX { c } else { MASK_CHAR })
        .collect()
}
