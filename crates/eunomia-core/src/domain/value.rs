//! Scalar values carried by port parameters.
//!
//! Parameters are persisted as strings. Transformations see them as [`Scalar`]
//! values produced by [`cast`], and the values they emit are turned back into
//! strings with [`Scalar::to_stored_string`] before they are written.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value after casting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Boolean flag
    Boolean(bool),
    /// Anything else, kept verbatim
    String(String),
}

/// Convert a stored string into the most specific scalar it represents.
///
/// Rules, in order:
/// 1. only ASCII digits (no sign) and fits in an `i64` → `Integer`
/// 2. parses as a float → `Float` (so `"-5"` becomes `Float(-5.0)`). Surrounding
///    whitespace is ignored and single `_` separators between digits are
///    accepted, so `" 12"` and `"1_000"` are floats too.
/// 3. `"true"` / `"false"` in any case → `Boolean`
/// 4. otherwise the string itself
pub fn cast(raw: &str) -> Scalar {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(value) = raw.parse::<i64>() {
            return Scalar::Integer(value);
        }
    }

    if let Some(value) = parse_float(raw) {
        return Scalar::Float(value);
    }

    if raw.eq_ignore_ascii_case("true") {
        Scalar::Boolean(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Scalar::Boolean(false)
    } else {
        Scalar::String(raw.to_string())
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if !trimmed.contains('_') {
        return trimmed.parse().ok();
    }

    // `_` is only a separator when it sits between two digits
    let bytes = trimmed.as_bytes();
    let separators_ok = bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    });
    if !separators_ok {
        return None;
    }
    trimmed.replace('_', "").parse().ok()
}

impl Scalar {
    /// String form written to the store.
    ///
    /// Floats always keep a fraction or exponent marker so they cast back to `Float`.
    pub fn to_stored_string(&self) -> String {
        match self {
            Scalar::Integer(v) => v.to_string(),
            Scalar::Float(v) => format!("{:?}", v),
            Scalar::Boolean(v) => v.to_string(),
            Scalar::String(v) => v.clone(),
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stored_string())
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Integer(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Integer(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}
