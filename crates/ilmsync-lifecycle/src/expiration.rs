use std::{fmt, str::FromStr};

use ilmsync_common::{
    error::{IlmError, Result},
    time::{format_iso_date, parse_iso_date},
};

use crate::types::Expiration;

const DELETE_MARKER: &str = "DeleteMarker";

/// Parses a `<n>d` duration token, e.g. `30d`.
pub(crate) fn parse_days_token(value: &str) -> Option<u32> {
    let digits = value.strip_suffix('d')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub(crate) fn format_days_token(days: u32) -> String {
    format!("{days}d")
}

/// Maps the free-form expiration string onto its structured shape.
///
/// Shapes are tried in order: `DeleteMarker`, a `<n>d` duration, then a
/// `YYYY-MM-DD` date. Anything else yields `None`.
pub fn encode_expiration(value: &str) -> Option<Expiration> {
    if value == DELETE_MARKER {
        return Some(Expiration::DeleteMarker);
    }
    if let Some(days) = parse_days_token(value) {
        return Some(Expiration::Days(days));
    }
    parse_iso_date(value).map(Expiration::Date)
}

pub fn decode_expiration(expiration: Option<&Expiration>) -> String {
    expiration.map(ToString::to_string).unwrap_or_default()
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteMarker => f.write_str(DELETE_MARKER),
            Self::Days(days) => f.write_str(&format_days_token(*days)),
            Self::Date(date) => f.write_str(&format_iso_date(date)),
        }
    }
}

impl FromStr for Expiration {
    type Err = IlmError;

    fn from_str(value: &str) -> Result<Self> {
        encode_expiration(value).ok_or_else(|| IlmError::InvalidExpiration(value.to_string()))
    }
}
