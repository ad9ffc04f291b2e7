// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-field record filters.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use strata_core::{Datum, FieldName, Value};

/// Comparison operators for numeric predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==` (exact float equality)
    Eq,
    /// `!=` (exact float inequality)
    Ne,
}

impl CompareOp {
    fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

/// A user callback receiving the field value and the whole record.
#[derive(Clone)]
pub struct FilterFn(pub Arc<dyn Fn(&Value, &Datum) -> bool>);

impl fmt::Debug for FilterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FilterFn(..)")
    }
}

impl PartialEq for FilterFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A predicate over a single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Numeric comparison; non-numeric values never match.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Right-hand constant.
        value: f64,
    },
    /// Keeps values equal to one of the listed values.
    OneOf(Vec<Value>),
    /// Drops missing values.
    NotNull,
    /// Arbitrary callback.
    Custom(FilterFn),
}

/// A filter bound to a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field to read. Records without the field see `Value::Null`.
    pub field: FieldName,
    /// Predicate to apply.
    pub predicate: Predicate,
}

impl FieldFilter {
    /// Creates a filter.
    pub fn new(field: impl Into<FieldName>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }

    /// Numeric comparison filter.
    pub fn compare(field: impl Into<FieldName>, op: CompareOp, value: f64) -> Self {
        Self::new(field, Predicate::Compare { op, value })
    }

    /// Membership filter.
    pub fn one_of(field: impl Into<FieldName>, values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(field, Predicate::OneOf(values.into_iter().collect()))
    }

    /// Callback filter.
    pub fn custom(
        field: impl Into<FieldName>,
        f: impl Fn(&Value, &Datum) -> bool + 'static,
    ) -> Self {
        Self::new(field, Predicate::Custom(FilterFn(Arc::new(f))))
    }

    /// Returns `true` if `datum` passes this filter.
    pub fn eval(&self, datum: &Datum) -> bool {
        let value = datum.get(&self.field).unwrap_or(&Value::Null);
        match &self.predicate {
            Predicate::Compare { op, value: rhs } => {
                value.as_f64().is_some_and(|lhs| op.eval(lhs, *rhs))
            }
            Predicate::OneOf(values) => {
                let key = value.key();
                values.iter().any(|v| v.key() == key)
            }
            Predicate::NotNull => !value.is_null(),
            Predicate::Custom(f) => (f.0)(value, datum),
        }
    }
}

/// Keeps the records that pass every filter, in input order.
pub fn apply_filters(data: &[Datum], filters: &[FieldFilter]) -> Vec<Datum> {
    if filters.is_empty() {
        return data.to_vec();
    }
    let kept: Vec<Datum> = data
        .iter()
        .filter(|d| filters.iter().all(|f| f.eval(d)))
        .cloned()
        .collect();
    tracing::trace!(
        input = data.len(),
        kept = kept.len(),
        filters = filters.len(),
        "applied filters"
    );
    kept
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    fn data() -> Vec<Datum> {
        vec![
            Datum::new().with("kind", "a").with("v", 1.0),
            Datum::new().with("kind", "b").with("v", 5.0),
            Datum::new().with("kind", "c"),
        ]
    }

    #[test]
    fn compare_skips_missing_values() {
        let out = apply_filters(&data(), &[FieldFilter::compare("v", CompareOp::Ge, 1.0)]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn filters_combine_with_and() {
        let out = apply_filters(
            &data(),
            &[
                FieldFilter::one_of("kind", [Value::from("a"), Value::from("c")]),
                FieldFilter::new("v", Predicate::NotNull),
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("kind"), Some(&Value::from("a")));
    }

    #[test]
    fn custom_sees_the_whole_record() {
        let f = FieldFilter::custom("kind", |v, d| v.as_str() == Some("b") && d.contains("v"));
        let out = apply_filters(&data(), &[f]);
        assert_eq!(out.len(), 1);
    }
}
