//! Semantic equality for serialized declarations.
//!
//! Declarations are compared as canonical trees rather than as text, so key
//! order and whitespace never cause a redundant post. Array order and scalar
//! values are significant.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

/// Order-independent structural form of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalJson {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integral number (including floats with no fractional part).
    Integer(i128),
    /// Non-integral number.
    Float(f64),
    /// String scalar.
    String(String),
    /// Ordered array.
    Array(Vec<CanonicalJson>),
    /// Object with keys in sorted order.
    Object(BTreeMap<String, CanonicalJson>),
}

impl CanonicalJson {
    /// Parses a document into its canonical form.
    pub fn parse(document: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(document)?;
        Ok(Self::from_value(value))
    }

    /// Converts an already parsed value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => CanonicalJson::Null,
            Value::Bool(b) => CanonicalJson::Bool(b),
            Value::Number(n) => canonical_number(&n),
            Value::String(s) => CanonicalJson::String(s),
            Value::Array(items) => {
                CanonicalJson::Array(items.into_iter().map(Self::from_value).collect())
            }
            Value::Object(map) => CanonicalJson::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_value(v)))
                    .collect(),
            ),
        }
    }
}

// i64 range; wider floats keep their float form.
const MAX_EXACT_INTEGRAL: f64 = 9_223_372_036_854_775_807.0;

fn canonical_number(n: &Number) -> CanonicalJson {
    if let Some(i) = n.as_i64() {
        return CanonicalJson::Integer(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return CanonicalJson::Integer(i128::from(u));
    }
    // serde_json never produces NaN or infinity
    let f = n.as_f64().unwrap_or_default();
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGRAL {
        CanonicalJson::Integer(f as i128)
    } else {
        CanonicalJson::Float(f)
    }
}

/// Returns true if both declarations describe the same document.
///
/// Two empty strings are equal. A parse failure on either side makes the
/// comparison fail closed (`false`), so a needed post is never skipped.
pub fn declarations_equal(a: &str, b: &str) -> bool {
    if a.is_empty() && b.is_empty() {
        return true;
    }

    let (Ok(left), Ok(right)) = (CanonicalJson::parse(a), CanonicalJson::parse(b)) else {
        return false;
    };

    left == right
}
