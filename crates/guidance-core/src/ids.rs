//! Natural-key types for guidance.
//!
//! Students and mentors are deduplicated by phone number, credentials and
//! owners by email. Both keys are normalised on construction so equality and
//! storage lookups never depend on how a client formatted the value.
//!
//! # Macro-based key types
//!
//! The `natural_key_type!` macro generates the string newtype, its serde
//! representation and the usual conversion traits. Each type supplies its own
//! `normalize` function.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing natural keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// The value is empty after trimming.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Phone number contains something other than digits.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// Email address is missing the `@` separator.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

macro_rules! natural_key_type {
    ($name:ident, $normalize:path, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and normalise a raw value.
            ///
            /// # Errors
            ///
            /// Returns a `KeyError` if the value is not a valid key.
            pub fn parse(raw: &str) -> Result<Self, KeyError> {
                $normalize(raw).map(Self)
            }

            /// Return the normalised value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = KeyError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

natural_key_type!(
    Phone,
    normalize_phone,
    "A phone number, the natural key for students, history rows and mentors.\n\nSpaces, dashes and parentheses are stripped; an optional leading `+` is kept."
);
natural_key_type!(
    Email,
    normalize_email,
    "An email address, the natural key for mentor credentials and owners.\n\nStored trimmed and lower-cased, so lookups are case-insensitive."
);

fn normalize_phone(raw: &str) -> Result<String, KeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(KeyError::Empty("phone"));
    }

    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(KeyError::InvalidPhone(trimmed.to_string()));
    }

    Ok(format!("{plus}{digits}"))
}

fn normalize_email(raw: &str) -> Result<String, KeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(KeyError::Empty("email"));
    }

    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(trimmed.to_lowercase())
        }
        _ => Err(KeyError::InvalidEmail(trimmed.to_string())),
    }
}
