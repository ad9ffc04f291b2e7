// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time parsing, tick generation and formatting.
//!
//! Time is modeled as seconds since the Unix epoch (UTC). Text is parsed with `chrono`.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

/// Parses a textual timestamp into seconds since the epoch.
///
/// Accepted forms: RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM`,
/// `YYYY-MM-DD`, `YYYY/MM/DD` and a bare four-digit year. Naive forms are read as UTC.
pub fn parse_time(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp() as f64);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.and_utc().timestamp() as f64);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp() as f64);
        }
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)?
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp() as f64);
    }
    None
}

/// Returns "nice-ish" tick values for a time domain expressed in seconds.
pub fn nice_time_ticks_seconds(mut min: f64, mut max: f64, count: usize) -> Vec<f64> {
    if count == 0 || !min.is_finite() || !max.is_finite() {
        return Vec::new();
    }
    if min == max {
        return alloc::vec![min];
    }
    if min > max {
        core::mem::swap(&mut min, &mut max);
    }

    let step = nice_time_step_seconds((max - min) / count.max(1) as f64);
    if step == 0.0 {
        return alloc::vec![min, max];
    }
    let start = (min / step).ceil() * step;
    fixed_step_ticks(start, max, step)
}

/// Returns `start, start + step, ...` up to and including `max`.
pub fn fixed_step_ticks(start: f64, max: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || !start.is_finite() || !max.is_finite() || start > max {
        return Vec::new();
    }
    let n_f = ((max - start) / step + 1e-9).floor();
    let n = if n_f.is_finite() && n_f >= 0.0 {
        let n_f = n_f.min(10_000.0);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "guarded by finite/non-negative checks and capped at 10k"
        )]
        {
            n_f as u64
        }
    } else {
        0
    };
    (0..=n).map(|i| start + step * i as f64).collect()
}

fn nice_time_step_seconds(step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }

    // Candidate steps in seconds, spanning seconds to years. Months and years are approximated
    // by 30 and 365 days.
    const STEPS: &[f64] = &[
        1.0,
        2.0,
        5.0,
        10.0,
        15.0,
        30.0,
        MINUTE,
        2.0 * MINUTE,
        5.0 * MINUTE,
        10.0 * MINUTE,
        15.0 * MINUTE,
        30.0 * MINUTE,
        HOUR,
        2.0 * HOUR,
        3.0 * HOUR,
        6.0 * HOUR,
        12.0 * HOUR,
        DAY,
        2.0 * DAY,
        7.0 * DAY,
        14.0 * DAY,
        30.0 * DAY,
        90.0 * DAY,
        180.0 * DAY,
        365.0 * DAY,
    ];

    for &s in STEPS {
        if s >= step {
            return s;
        }
    }
    let years = (step / (365.0 * DAY)).ceil();
    years.max(1.0) * 365.0 * DAY
}

/// Formats a timestamp (seconds) for a tick spaced by `step` seconds.
///
/// With `mask` set, it is used as a `strftime` pattern; an invalid mask falls back to the
/// step-based default.
pub fn format_timestamp(secs: f64, step: f64, mask: Option<&str>) -> String {
    let whole = secs.round();
    if !whole.is_finite() || whole.abs() > 1e15 {
        return alloc::format!("{secs}");
    }
    #[allow(clippy::cast_possible_truncation, reason = "bounded by the check above")]
    let whole = whole as i64;
    let Some(dt) = DateTime::from_timestamp(whole, 0) else {
        return alloc::format!("{secs}");
    };
    let default_mask = if step >= DAY {
        "%Y-%m-%d"
    } else if step >= MINUTE {
        "%m-%d %H:%M"
    } else {
        "%H:%M:%S"
    };
    let mut out = String::new();
    if let Some(mask) = mask {
        if write!(out, "{}", dt.format(mask)).is_ok() {
            return out;
        }
        out.clear();
    }
    if write!(out, "{}", dt.format(default_mask)).is_err() {
        return alloc::format!("{secs}");
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_time("1970-01-02"), Some(DAY));
        assert_eq!(parse_time("1970-01-01 00:01:00"), Some(60.0));
        assert_eq!(parse_time("1970-01-01T01:00:00"), Some(HOUR));
        assert_eq!(parse_time("1970-01-01T00:00:10Z"), Some(10.0));
        assert_eq!(parse_time("1971"), Some(365.0 * DAY));
        assert_eq!(parse_time("not a date"), None);
    }

    #[test]
    fn time_ticks_choose_minute_steps_for_minute_spans() {
        let ticks = nice_time_ticks_seconds(0.0, 300.0, 5);
        assert!(ticks.len() >= 2);
        let step = (ticks[1] - ticks[0]).abs();
        assert!(step >= 60.0);
    }

    #[test]
    fn day_spans_use_day_steps() {
        let ticks = nice_time_ticks_seconds(0.0, 10.0 * DAY, 5);
        assert!((ticks[1] - ticks[0] - 2.0 * DAY).abs() < 1e-9, "{ticks:?}");
    }

    #[test]
    fn fixed_steps_stop_at_max() {
        let ticks = fixed_step_ticks(0.0, 25.0, 10.0);
        assert_eq!(ticks, alloc::vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn formats_dates_and_masks() {
        assert_eq!(format_timestamp(DAY, DAY, None), "1970-01-02");
        assert_eq!(format_timestamp(90.0, 30.0, None), "00:01:30");
        assert_eq!(format_timestamp(DAY, DAY, Some("%d/%m")), "02/01");
    }
}
