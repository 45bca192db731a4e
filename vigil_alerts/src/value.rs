// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// A dynamically typed attribute value.
///
/// Sources report [`AttributeValue::Null`] for attributes they do not have.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AttributeValue {
    /// Absent or unset.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// Text.
    Text(String),
}

impl AttributeValue {
    /// Returns `true` if this is [`AttributeValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Equality as used by attribute-equals alerts.
    ///
    /// Values only match when they hold the same variant and compare equal.
    /// `Null` never matches anything (including `Null`), and neither does NaN.
    /// There is no cross-type coercion: `Int(1)` does not match `Float(1.0)`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}
