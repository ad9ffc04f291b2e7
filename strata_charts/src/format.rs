// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick label formatting.

extern crate alloc;

use alloc::string::String;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

/// Formats `v` with just enough decimals to distinguish ticks spaced by `step`.
pub fn format_tick_with_step(v: f64, step: f64) -> String {
    if !v.is_finite() {
        return alloc::format!("{v}");
    }
    let decimals = decimals_for_step(step);
    let out = alloc::format!("{v:.decimals$}");
    // Avoid "-0" / "-0.00" for values that round to zero.
    if out.starts_with('-') && out[1..].chars().all(|c| c == '0' || c == '.') {
        return String::from(&out[1..]);
    }
    out
}

fn decimals_for_step(step: f64) -> usize {
    let step = step.abs();
    if !step.is_finite() || step == 0.0 || step >= 1.0 {
        return 0;
    }
    let d = (-step.log10()).ceil().clamp(0.0, 12.0);
    // Steps like 0.25 need one more digit than their magnitude suggests.
    let scaled = step * 10_f64.powf(d);
    let extra = if (scaled - scaled.round()).abs() > 1e-9 {
        1.0
    } else {
        0.0
    };
    #[allow(clippy::cast_possible_truncation, reason = "clamped to [0, 13]")]
    {
        (d + extra) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_follow_step() {
        assert_eq!(format_tick_with_step(20.0, 10.0), "20");
        assert_eq!(format_tick_with_step(0.5, 0.5), "0.5");
        assert_eq!(format_tick_with_step(0.25, 0.25), "0.25");
        assert_eq!(format_tick_with_step(1.0, 0.2), "1.0");
        assert_eq!(format_tick_with_step(-0.0001, 0.1), "0.0");
    }
}
