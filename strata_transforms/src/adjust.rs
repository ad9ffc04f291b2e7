// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position adjusts.

extern crate alloc;

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;
use strata_core::{FieldName, ValueKey};

/// Which adjust to apply to a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjustKind {
    /// Accumulate values per x.
    Stack,
    /// Split a category band between groups.
    Dodge,
    /// Scatter points inside a category band.
    Jitter,
    /// Center each x's stack against the widest one.
    Symmetric,
}

impl AdjustKind {
    /// Parses an adjust name (`"stack"`, `"dodge"`, `"jitter"`, `"symmetric"`).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "stack" => Self::Stack,
            "dodge" => Self::Dodge,
            "jitter" => Self::Jitter,
            "symmetric" => Self::Symmetric,
            _ => return None,
        })
    }
}

/// Stack baseline offset mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StackOffset {
    /// Stack positive values upward and negative values downward from 0.
    #[default]
    Zero,
    /// Stack absolute values and shift each x so its stack is centered relative to the
    /// largest stack.
    Center,
    /// Stack absolute values and scale each x so its stack spans `[0, 1]`.
    Normalize,
}

/// A declared adjust.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustOption {
    /// Adjust kind.
    pub kind: AdjustKind,
    /// Stack groups in reverse declaration order.
    pub reverse_order: bool,
    /// Stack offset (ignored by non-stack adjusts).
    pub offset: StackOffset,
    /// Field that defines dodge groups; defaults to the geometry's grouping fields.
    pub dodge_by: Option<FieldName>,
    /// Fraction of each dodge slot left empty, in `[0, 1)`.
    pub margin_ratio: f64,
}

impl AdjustOption {
    /// Creates an adjust with default settings.
    pub fn new(kind: AdjustKind) -> Self {
        Self {
            kind,
            reverse_order: false,
            offset: if kind == AdjustKind::Symmetric {
                StackOffset::Center
            } else {
                StackOffset::Zero
            },
            dodge_by: None,
            margin_ratio: 0.0,
        }
    }

    /// Shorthand for `AdjustOption::new(AdjustKind::Stack)`.
    pub fn stack() -> Self {
        Self::new(AdjustKind::Stack)
    }

    /// Shorthand for `AdjustOption::new(AdjustKind::Dodge)`.
    pub fn dodge() -> Self {
        Self::new(AdjustKind::Dodge)
    }

    /// Stack groups in reverse order.
    pub fn with_reverse_order(mut self, reverse: bool) -> Self {
        self.reverse_order = reverse;
        self
    }

    /// Sets the stack offset. `Normalize` gives percent stacks.
    pub fn with_offset(mut self, offset: StackOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Dodges by `field` instead of the grouping fields.
    pub fn with_dodge_by(mut self, field: impl Into<FieldName>) -> Self {
        self.dodge_by = Some(field.into());
        self
    }

    /// Sets the dodge margin ratio.
    pub fn with_margin_ratio(mut self, ratio: f64) -> Self {
        self.margin_ratio = ratio.clamp(0.0, 0.95);
        self
    }
}

/// One row of input to [`stack`].
#[derive(Debug, Clone, PartialEq)]
pub struct StackInput {
    /// Key of the x position the row stacks on.
    pub x: ValueKey,
    /// Rank of the row's group in declaration order.
    pub group: usize,
    /// Value to accumulate; `None` rows are skipped.
    pub value: Option<f64>,
}

/// Computes `(start, end)` spans for every row, in input row order.
///
/// Rows at the same x are stacked by group rank (descending when `reverse`), then by input
/// order. Rows without a value yield `None` and do not move the baseline.
pub fn stack(rows: &[StackInput], offset: StackOffset, reverse: bool) -> Vec<Option<(f64, f64)>> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    if reverse {
        order.sort_by(|&a, &b| rows[b].group.cmp(&rows[a].group));
    } else {
        order.sort_by_key(|&i| rows[i].group);
    }

    let mut out = alloc::vec![None; rows.len()];
    // (positive baseline, negative baseline) per x.
    let mut acc: HashMap<&ValueKey, (f64, f64)> = HashMap::new();
    for &i in &order {
        let row = &rows[i];
        let Some(v) = row.value.filter(|v| v.is_finite()) else {
            continue;
        };
        let (pos, neg) = acc.entry(&row.x).or_insert((0.0, 0.0));
        let span = match offset {
            StackOffset::Zero if v < 0.0 => {
                let start = *neg;
                *neg += v;
                (start, *neg)
            }
            StackOffset::Zero => {
                let start = *pos;
                *pos += v;
                (start, *pos)
            }
            StackOffset::Center | StackOffset::Normalize => {
                let start = *pos;
                *pos += v.abs();
                (start, *pos)
            }
        };
        out[i] = Some(span);
    }

    match offset {
        StackOffset::Zero => {}
        StackOffset::Center => {
            let max_total = acc.values().map(|(pos, _)| *pos).fold(0.0_f64, f64::max);
            for (row, span) in rows.iter().zip(out.iter_mut()) {
                if let (Some((s, e)), Some((total, _))) = (span.as_mut(), acc.get(&row.x)) {
                    let shift = 0.5 * (max_total - total);
                    *s += shift;
                    *e += shift;
                }
            }
        }
        StackOffset::Normalize => {
            for (row, span) in rows.iter().zip(out.iter_mut()) {
                if let (Some((s, e)), Some((total, _))) = (span.as_mut(), acc.get(&row.x)) {
                    if *total > 0.0 {
                        *s /= total;
                        *e /= total;
                    }
                }
            }
        }
    }
    out
}

/// Splits a band of width `band` centered on `x` into `count` slots and returns the
/// `(center, width)` of slot `index`.
pub fn dodge(x: f64, band: f64, index: usize, count: usize, margin_ratio: f64) -> (f64, f64) {
    if count <= 1 {
        return (x, band * (1.0 - margin_ratio));
    }
    let slot = band / count as f64;
    let center = x - 0.5 * band + slot * (index as f64 + 0.5);
    (center, slot * (1.0 - margin_ratio))
}

/// Deterministically scatters `x` within `band` based on the row index and a seed.
pub fn jitter(x: f64, band: f64, row: usize, seed: u64) -> f64 {
    let u = unit_hash(seed ^ (row as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    x + (u - 0.5) * band
}

fn unit_hash(mut z: u64) -> f64 {
    // splitmix64 finalizer
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    (z >> 11) as f64 / (1_u64 << 53) as f64
}

/// Assigns each key its rank in first-seen order. Returns the ranks and the number of
/// distinct keys.
pub fn first_seen_ranks<K: Eq + Hash>(keys: impl IntoIterator<Item = K>) -> (Vec<usize>, usize) {
    let mut seen: HashMap<K, usize> = HashMap::new();
    let ranks = keys
        .into_iter()
        .map(|k| {
            let next = seen.len();
            *seen.entry(k).or_insert(next)
        })
        .collect();
    (ranks, seen.len())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use strata_core::Value;

    use super::*;

    fn row(x: &str, group: usize, value: f64) -> StackInput {
        StackInput {
            x: Value::from(x).key(),
            group,
            value: Some(value),
        }
    }

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn stack_two_series_in_declaration_order() {
        // Series B is listed first in the data but declared second.
        let rows = vec![row("a", 1, 20.0), row("a", 0, 10.0)];
        let spans = stack(&rows, StackOffset::Zero, false);
        assert!(close(spans[1].unwrap(), (0.0, 10.0)), "{spans:?}");
        assert!(close(spans[0].unwrap(), (10.0, 30.0)), "{spans:?}");
    }

    #[test]
    fn stack_reverse_and_negative() {
        let rows = vec![row("a", 0, 10.0), row("a", 1, 20.0), row("a", 2, -5.0)];
        let spans = stack(&rows, StackOffset::Zero, true);
        assert!(close(spans[1].unwrap(), (0.0, 20.0)), "{spans:?}");
        assert!(close(spans[0].unwrap(), (20.0, 30.0)), "{spans:?}");
        assert!(close(spans[2].unwrap(), (0.0, -5.0)), "{spans:?}");
    }

    #[test]
    fn missing_values_do_not_move_the_baseline() {
        let rows = vec![
            row("a", 0, 1.0),
            StackInput {
                x: Value::from("a").key(),
                group: 1,
                value: None,
            },
            row("a", 2, 2.0),
        ];
        let spans = stack(&rows, StackOffset::Zero, false);
        assert!(spans[1].is_none());
        assert!(close(spans[2].unwrap(), (1.0, 3.0)), "{spans:?}");
    }

    #[test]
    fn center_offset_centers_against_widest_stack() {
        let rows = vec![row("a", 0, 10.0), row("b", 0, 4.0)];
        let spans = stack(&rows, StackOffset::Center, false);
        assert!(close(spans[0].unwrap(), (0.0, 10.0)), "{spans:?}");
        assert!(close(spans[1].unwrap(), (3.0, 7.0)), "{spans:?}");
    }

    #[test]
    fn normalize_offset_spans_unit_interval() {
        let rows = vec![row("a", 0, 1.0), row("a", 1, 3.0)];
        let spans = stack(&rows, StackOffset::Normalize, false);
        assert!(close(spans[0].unwrap(), (0.0, 0.25)), "{spans:?}");
        assert!(close(spans[1].unwrap(), (0.25, 1.0)), "{spans:?}");
    }

    #[test]
    fn dodge_slots_cover_the_band() {
        let (c0, w0) = dodge(0.5, 0.2, 0, 2, 0.0);
        let (c1, w1) = dodge(0.5, 0.2, 1, 2, 0.0);
        assert!((c0 - 0.45).abs() < 1e-12);
        assert!((c1 - 0.55).abs() < 1e-12);
        assert!((w0 - 0.1).abs() < 1e-12 && (w1 - 0.1).abs() < 1e-12);
    }

    #[test]
    fn jitter_is_deterministic_and_bounded() {
        for r in 0..64 {
            let a = jitter(0.5, 0.2, r, 7);
            assert_eq!(a, jitter(0.5, 0.2, r, 7));
            assert!((0.4..=0.6).contains(&a), "row {r} jittered to {a}");
        }
    }

    #[test]
    fn ranks_follow_first_appearance() {
        let keys = [
            Value::from("b").key(),
            Value::from("a").key(),
            Value::from("b").key(),
        ];
        let (ranks, n) = first_seen_ranks(keys.iter());
        assert_eq!(ranks, vec![0, 1, 0]);
        assert_eq!(n, 2);
    }
}
