// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data values and records.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use smallvec::SmallVec;

/// A field name inside a [`Datum`].
pub type FieldName = Arc<str>;

/// A single data value.
///
/// `Time` carries seconds since the Unix epoch. `Number(NaN)` is treated like `Null` by every
/// encoder.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// A missing value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A string.
    Text(Arc<str>),
    /// A timestamp in seconds.
    Time(f64),
}

impl Value {
    /// Returns `true` for `Null` and non-finite numbers.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) | Self::Time(n) => !n.is_finite(),
            Self::Bool(_) | Self::Text(_) => false,
        }
    }

    /// Returns the numeric payload of numbers and timestamps.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) | Self::Time(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a hashable key suitable for deduplication.
    pub fn key(&self) -> ValueKey {
        match self {
            Self::Null => ValueKey::Null,
            Self::Bool(b) => ValueKey::Bool(*b),
            Self::Number(n) => ValueKey::Number(float_bits(*n)),
            Self::Text(s) => ValueKey::Text(s.clone()),
            Self::Time(t) => ValueKey::Time(float_bits(*t)),
        }
    }
}

fn float_bits(v: f64) -> u64 {
    // -0.0 and 0.0 dedupe together; every NaN is the same missing value.
    if v == 0.0 {
        0.0_f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) | Self::Time(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Hashable identity of a [`Value`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    /// Missing value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number, by normalized bit pattern.
    Number(u64),
    /// String.
    Text(Arc<str>),
    /// Timestamp, by normalized bit pattern.
    Time(u64),
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(bits) | Self::Time(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A single record: an ordered list of `(field, value)` pairs.
///
/// Records are small, so lookups are linear scans over inline storage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Datum {
    fields: SmallVec<[(FieldName, Value); 6]>,
}

impl Datum {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Datum::set`].
    #[must_use]
    pub fn with(mut self, field: impl Into<FieldName>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets `field`, replacing any previous value.
    pub fn set(&mut self, field: impl Into<FieldName>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Returns the value of `field`, or `None` when the record has no such field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(f, _)| &**f == field)
            .map(|(_, v)| v)
    }

    /// Returns `true` when the record carries `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates over fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(f, v)| (&**f, v))
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<FieldName>, V: Into<Value>> FromIterator<(K, V)> for Datum {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.set(k, v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::ToString;

    use super::*;

    #[test]
    fn set_replaces_existing_field() {
        let mut d = Datum::new().with("x", "a").with("y", 1.0);
        d.set("y", 2.0);
        assert_eq!(d.len(), 2);
        assert_eq!(d.get("y"), Some(&Value::Number(2.0)));
        assert_eq!(d.get("z"), None);
    }

    #[test]
    fn signed_zero_and_nan_share_keys() {
        assert_eq!(Value::Number(0.0).key(), Value::Number(-0.0).key());
        assert_eq!(
            Value::Number(f64::NAN).key(),
            Value::Number(-f64::NAN).key()
        );
        assert_ne!(Value::Number(1.0).key(), Value::Time(1.0).key());
    }

    #[test]
    fn nulls_and_display() {
        assert!(Value::Null.is_null());
        assert!(Value::Number(f64::NAN).is_null());
        assert!(!Value::from("a").is_null());
        assert_eq!(Value::from(Option::<f64>::None), Value::Null);
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::from("Mon").to_string(), "Mon");
    }
}
