// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Encoding channels.
//!
//! A channel is a constant, a field looked up through that field's scale, or a callback over
//! raw field values.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use strata_core::{Datum, FieldName, Value};

/// A callback over the raw values of a channel's fields, in declaration order.
pub struct Callback<T>(pub Arc<dyn Fn(&[&Value]) -> T>);

impl<T> Callback<T> {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&[&Value]) -> T + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invokes the callback with the values of `fields` in `datum`. Absent fields read as
    /// `Null`.
    pub fn call(&self, fields: &[FieldName], datum: &Datum) -> T {
        static NULL: Value = Value::Null;
        let args: Vec<&Value> = fields
            .iter()
            .map(|f| datum.get(f).unwrap_or(&NULL))
            .collect();
        (self.0)(&args)
    }
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

impl<T> PartialEq for Callback<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A visual channel (`color`, `shape`, `size`).
#[derive(Clone, Debug, PartialEq)]
pub enum Channel<T> {
    /// The same value for every datum.
    Const(T),
    /// A field mapped through its scale. `values` overrides the theme's output range: indexed
    /// by category for categorical scales, interpolated between the first and last entry for
    /// continuous ones.
    Field {
        /// Source field.
        field: FieldName,
        /// Explicit outputs.
        values: Option<Vec<T>>,
    },
    /// A callback over raw field values.
    Callback {
        /// Fields passed to the callback.
        fields: Vec<FieldName>,
        /// The callback.
        f: Callback<T>,
    },
}

impl<T> Channel<T> {
    /// A field channel with theme outputs.
    pub fn field(field: impl Into<FieldName>) -> Self {
        Self::Field {
            field: field.into(),
            values: None,
        }
    }

    /// A field channel with explicit outputs.
    pub fn field_with(field: impl Into<FieldName>, values: impl IntoIterator<Item = T>) -> Self {
        Self::Field {
            field: field.into(),
            values: Some(values.into_iter().collect()),
        }
    }

    /// A callback channel.
    pub fn callback<I, F>(fields: I, f: impl Fn(&[&Value]) -> T + 'static) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldName>,
    {
        Self::Callback {
            fields: fields.into_iter().map(Into::into).collect(),
            f: Callback::new(f),
        }
    }

    /// The scaled field, if this is a field channel.
    pub fn scaled_field(&self) -> Option<&FieldName> {
        match self {
            Self::Field { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// The mandatory `position` channel: `"x*y"`, or `"y"` alone with a constant `x`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// The x field; `None` places every datum at the horizontal center.
    pub x: Option<FieldName>,
    /// The y field.
    pub y: FieldName,
}

impl Position {
    /// Parses `"x*y"` or `"y"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split('*').map(str::trim);
        let first = parts.next().filter(|s| !s.is_empty())?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(Self {
                x: None,
                y: first.into(),
            }),
            (Some(second), None) if !second.is_empty() => Some(Self {
                x: Some(first.into()),
                y: second.into(),
            }),
            _ => None,
        }
    }

    /// Both fields, x first.
    pub fn fields(&self) -> impl Iterator<Item = &FieldName> {
        self.x.iter().chain(core::iter::once(&self.y))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[test]
    fn position_forms() {
        let p = Position::parse("year*sales").unwrap();
        assert_eq!(p.x.as_deref(), Some("year"));
        assert_eq!(&*p.y, "sales");
        let p = Position::parse("sales").unwrap();
        assert!(p.x.is_none());
        assert!(Position::parse("").is_none());
        assert!(Position::parse("a*").is_none());
        assert!(Position::parse("a*b*c").is_none());
    }

    #[test]
    fn callback_reads_missing_as_null() {
        let ch: Channel<String> = Channel::callback(["a", "b"], |vals| {
            alloc::format!("{}|{}", vals[0], vals[1].is_null())
        });
        let Channel::Callback { fields, f } = &ch else {
            panic!("expected a callback channel");
        };
        let d = Datum::new().with("a", 3.0);
        assert_eq!(f.call(fields, &d), "3|true");
        assert!(ch.scaled_field().is_none());
    }
}
