// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scales: map field values into normalized `[0, 1]` space and produce ticks.
//!
//! A [`Scale`] is built in two steps. [`Scale::observe`] derives the *own* domain of a field
//! from the values one view sees, honoring declared `min` / `max` / `values`. The registry then
//! unifies own domains across sync groups and calls [`Scale::set_domain`] with the final, niced
//! domain. Mapping, inversion and ticks always use the final domain.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use strata_core::{FieldName, Value, ValueKey};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::error::ConfigError;
use crate::format::format_tick_with_step;
use crate::time;

/// Scale types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaleType {
    /// Continuous linear.
    Linear,
    /// Continuous logarithmic.
    Log,
    /// Continuous power.
    Pow,
    /// Continuous time (seconds since the epoch).
    Time,
    /// Ordered categories.
    Category,
    /// Categories ordered by time.
    TimeCategory,
    /// Pass-through.
    Identity,
    /// Continuous domain bucketed into equal-width steps.
    Quantize,
    /// Continuous domain bucketed into equal-population steps.
    Quantile,
}

impl ScaleType {
    /// Parses a declared type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "linear" => Self::Linear,
            "log" => Self::Log,
            "pow" => Self::Pow,
            "time" => Self::Time,
            "cat" | "category" => Self::Category,
            "timeCat" => Self::TimeCategory,
            "identity" => Self::Identity,
            "quantize" => Self::Quantize,
            "quantile" => Self::Quantile,
            _ => return None,
        })
    }

    /// Returns the canonical type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Log => "log",
            Self::Pow => "pow",
            Self::Time => "time",
            Self::Category => "cat",
            Self::TimeCategory => "timeCat",
            Self::Identity => "identity",
            Self::Quantize => "quantize",
            Self::Quantile => "quantile",
        }
    }

    /// Returns `true` for category and time-category scales.
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::Category | Self::TimeCategory)
    }

    /// Infers a type from observed values: numbers are linear, timestamps are time, anything
    /// else is categorical.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        for v in values {
            match v {
                Value::Null => continue,
                Value::Number(n) if !n.is_finite() => continue,
                Value::Number(_) => return Self::Linear,
                Value::Time(_) => return Self::Time,
                Value::Bool(_) | Value::Text(_) => return Self::Category,
            }
        }
        Self::Linear
    }
}

/// Scale synchronization setting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ScaleSync {
    /// Not synchronized.
    #[default]
    Off,
    /// Synchronized with every scale of the same field name.
    Field,
    /// Synchronized with every scale declaring the same key.
    Key(Arc<str>),
}

/// Custom tick text.
#[derive(Clone)]
pub struct TickFormatter(pub Arc<dyn Fn(&Value) -> String>);

impl fmt::Debug for TickFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TickFormatter(..)")
    }
}

impl PartialEq for TickFormatter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Declared scale options for one field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScaleOption {
    /// Declared type name; inferred from data when `None`.
    pub kind: Option<Arc<str>>,
    /// Synchronization.
    pub sync: ScaleSync,
    /// Force a tick at the domain maximum.
    pub show_last: bool,
    /// Round the domain to tick boundaries. Defaults to `true` for linear and pow scales.
    pub nice: Option<bool>,
    /// Domain minimum override.
    pub min: Option<f64>,
    /// Domain maximum override.
    pub max: Option<f64>,
    /// Explicit categorical values.
    pub values: Option<Vec<Value>>,
    /// Approximate number of ticks (default 5).
    pub tick_count: Option<usize>,
    /// Fixed tick step in domain units.
    pub tick_interval: Option<f64>,
    /// Output range inside `[0, 1]` (default `(0, 1)`).
    pub range: Option<(f64, f64)>,
    /// Log base (default 10).
    pub base: Option<f64>,
    /// Pow exponent (default 2).
    pub exponent: Option<f64>,
    /// Display name of the field.
    pub alias: Option<Arc<str>>,
    /// `strftime` mask for time ticks.
    pub mask: Option<Arc<str>>,
    /// Custom tick text.
    pub formatter: Option<TickFormatter>,
}

impl ScaleOption {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the type.
    pub fn with_type(mut self, kind: ScaleType) -> Self {
        self.kind = Some(kind.name().into());
        self
    }

    /// Declares the type by name (validated at resolve time).
    pub fn with_type_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.kind = Some(name.into());
        self
    }

    /// Synchronizes with all scales of the same field.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = if sync { ScaleSync::Field } else { ScaleSync::Off };
        self
    }

    /// Synchronizes with all scales declaring `key`.
    pub fn with_sync_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.sync = ScaleSync::Key(key.into());
        self
    }

    /// Forces a tick at the domain maximum.
    pub fn with_show_last(mut self, show_last: bool) -> Self {
        self.show_last = show_last;
        self
    }

    /// Enables or disables nice-domain behavior.
    pub fn with_nice(mut self, nice: bool) -> Self {
        self.nice = Some(nice);
        self
    }

    /// Overrides the domain minimum.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Overrides the domain maximum.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Declares categorical values explicitly.
    pub fn with_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values = Some(values.into_iter().collect());
        self
    }

    /// Sets the approximate tick count.
    pub fn with_tick_count(mut self, count: usize) -> Self {
        self.tick_count = Some(count);
        self
    }

    /// Sets a fixed tick step.
    pub fn with_tick_interval(mut self, step: f64) -> Self {
        self.tick_interval = Some(step);
        self
    }

    /// Sets the normalized output range.
    pub fn with_range(mut self, start: f64, end: f64) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Sets the display name.
    pub fn with_alias(mut self, alias: impl Into<Arc<str>>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the time mask.
    pub fn with_mask(mut self, mask: impl Into<Arc<str>>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    /// Sets a custom tick formatter.
    pub fn with_formatter(mut self, f: impl Fn(&Value) -> String + 'static) -> Self {
        self.formatter = Some(TickFormatter(Arc::new(f)));
        self
    }

    /// Resolves the declared type. Unknown names report an error and fall back to identity.
    pub fn resolve_type<'a>(
        &self,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> (ScaleType, Option<ConfigError>) {
        match &self.kind {
            None => (ScaleType::infer(values), None),
            Some(name) => match ScaleType::from_name(name) {
                Some(kind) => (kind, None),
                None => (
                    ScaleType::Identity,
                    Some(ConfigError::UnknownScaleType(name.clone())),
                ),
            },
        }
    }

    /// Layers `self` over `parent`: fields set here win.
    pub fn merged_over(&self, parent: &Self) -> Self {
        Self {
            kind: self.kind.clone().or_else(|| parent.kind.clone()),
            sync: if self.sync == ScaleSync::Off {
                parent.sync.clone()
            } else {
                self.sync.clone()
            },
            show_last: self.show_last || parent.show_last,
            nice: self.nice.or(parent.nice),
            min: self.min.or(parent.min),
            max: self.max.or(parent.max),
            values: self.values.clone().or_else(|| parent.values.clone()),
            tick_count: self.tick_count.or(parent.tick_count),
            tick_interval: self.tick_interval.or(parent.tick_interval),
            range: self.range.or(parent.range),
            base: self.base.or(parent.base),
            exponent: self.exponent.or(parent.exponent),
            alias: self.alias.clone().or_else(|| parent.alias.clone()),
            mask: self.mask.clone().or_else(|| parent.mask.clone()),
            formatter: self.formatter.clone().or_else(|| parent.formatter.clone()),
        }
    }
}

/// A scale domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Domain {
    /// `[min, max]` in domain units (seconds for time scales).
    Continuous {
        /// Minimum.
        min: f64,
        /// Maximum.
        max: f64,
    },
    /// Ordered distinct values.
    Categorical(Vec<Value>),
    /// Sorted observations (quantile scales).
    Sorted(Vec<f64>),
    /// No domain (identity scales).
    Identity,
}

impl Domain {
    /// An empty continuous domain that any observation replaces.
    pub const EMPTY: Self = Self::Continuous {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    /// Returns `(min, max)` for continuous and sorted domains.
    pub fn extent(&self) -> Option<(f64, f64)> {
        match self {
            Self::Continuous { min, max } if min <= max => Some((*min, *max)),
            Self::Sorted(v) => Some((*v.first()?, *v.last()?)),
            _ => None,
        }
    }

    /// Unifies two domains of the same type: min/max for continuous, first-seen union for
    /// categorical, merged observations for sorted.
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Continuous { min: a0, max: a1 }, Self::Continuous { min: b0, max: b1 }) => {
                Self::Continuous {
                    min: a0.min(*b0),
                    max: a1.max(*b1),
                }
            }
            (Self::Categorical(a), Self::Categorical(b)) => {
                let mut out = a.clone();
                let mut seen: hashbrown::HashSet<ValueKey> = a.iter().map(Value::key).collect();
                for v in b {
                    if seen.insert(v.key()) {
                        out.push(v.clone());
                    }
                }
                Self::Categorical(out)
            }
            (Self::Sorted(a), Self::Sorted(b)) => {
                let mut out: Vec<f64> = a.iter().chain(b).copied().collect();
                out.sort_by(f64::total_cmp);
                Self::Sorted(out)
            }
            (a, _) => a.clone(),
        }
    }
}

/// A tick: a domain value, its normalized position, and its text.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Domain value.
    pub value: Value,
    /// Position in normalized range space.
    pub position: f64,
    /// Label text.
    pub text: String,
}

/// A resolved scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Scale {
    field: FieldName,
    kind: ScaleType,
    option: ScaleOption,
    own: Domain,
    domain: Domain,
    index: HashMap<ValueKey, usize>,
    version: u64,
}

impl Scale {
    /// Builds a scale for `field` from the values one view observes.
    ///
    /// With `include_zero`, continuous domains are extended to contain `0` unless `min` is
    /// declared. The final domain equals the own domain (niced) until the registry syncs it.
    pub fn observe<'a>(
        field: impl Into<FieldName>,
        kind: ScaleType,
        option: ScaleOption,
        values: impl IntoIterator<Item = &'a Value>,
        include_zero: bool,
    ) -> Self {
        let own = observe_domain(kind, &option, values, include_zero);
        let mut scale = Self {
            field: field.into(),
            kind,
            option,
            own: own.clone(),
            domain: Domain::Identity,
            index: HashMap::new(),
            version: 1,
        };
        scale.domain = scale.finalize(own);
        scale.reindex();
        scale
    }

    /// Field name.
    pub fn field(&self) -> &FieldName {
        &self.field
    }

    /// Scale type.
    pub fn kind(&self) -> ScaleType {
        self.kind
    }

    /// Declared options.
    pub fn option(&self) -> &ScaleOption {
        &self.option
    }

    /// Domain derived from this scale's own observations.
    pub fn own_domain(&self) -> &Domain {
        &self.own
    }

    /// Final domain used for mapping.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Bumped whenever the final domain changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Display name: the alias if declared, else the field name.
    pub fn title(&self) -> &str {
        self.option.alias.as_deref().unwrap_or(&self.field)
    }

    /// Replaces the observations (own domain), keeping the final domain until the next
    /// [`Scale::set_domain`].
    pub(crate) fn reobserve(&mut self, kind: ScaleType, option: ScaleOption, own: Domain) {
        self.kind = kind;
        self.option = option;
        self.own = own;
    }

    /// Applies the nice policy and overrides to a (possibly unified) own domain.
    pub fn finalize(&self, domain: Domain) -> Domain {
        match (self.kind, domain) {
            (
                ScaleType::Linear | ScaleType::Pow | ScaleType::Quantize,
                Domain::Continuous { min, max },
            ) if min <= max => {
                if self.option.nice.unwrap_or(true) && self.option.tick_interval.is_none() {
                    let ticks = nice_ticks(min, max, self.tick_count());
                    let lo = if self.option.min.is_some() {
                        min
                    } else {
                        ticks.first().copied().unwrap_or(min).min(min)
                    };
                    let hi = if self.option.max.is_some() {
                        max
                    } else {
                        ticks.last().copied().unwrap_or(max).max(max)
                    };
                    Domain::Continuous { min: lo, max: hi }
                } else {
                    Domain::Continuous { min, max }
                }
            }
            (_, Domain::Continuous { min, max }) if min > max => Domain::Continuous {
                min: 0.0,
                max: 1.0,
            },
            (_, domain) => domain,
        }
    }

    /// Sets the final domain. Returns `true` (and bumps the version) if it changed.
    pub fn set_domain(&mut self, domain: Domain) -> bool {
        if domain == self.domain {
            return false;
        }
        self.domain = domain;
        self.reindex();
        self.version += 1;
        true
    }

    fn reindex(&mut self) {
        self.index.clear();
        if let Domain::Categorical(values) = &self.domain {
            for (i, v) in values.iter().enumerate() {
                self.index.entry(v.key()).or_insert(i);
            }
        }
    }

    /// Approximate tick count.
    pub fn tick_count(&self) -> usize {
        self.option.tick_count.unwrap_or(5).max(1)
    }

    fn range(&self) -> (f64, f64) {
        self.option.range.unwrap_or((0.0, 1.0))
    }

    fn numeric(&self, v: &Value) -> Option<f64> {
        match (self.kind, v) {
            (ScaleType::Time, Value::Text(s)) => time::parse_time(s),
            _ => v.as_f64(),
        }
    }

    /// Number of categories (0 for non-categorical scales).
    pub fn category_count(&self) -> usize {
        match &self.domain {
            Domain::Categorical(v) => v.len(),
            _ => 0,
        }
    }

    /// Index of a categorical value.
    pub fn category_index(&self, v: &Value) -> Option<usize> {
        self.index.get(&v.key()).copied()
    }

    /// Width of one category band in normalized space, for categorical scales.
    pub fn band_width(&self) -> Option<f64> {
        let n = self.category_count();
        if n == 0 {
            return None;
        }
        let (r0, r1) = self.range();
        Some((r1 - r0).abs() / n as f64)
    }

    /// Maps `v` into `[0, 1]` before applying the output range.
    fn unit(&self, v: &Value) -> Option<f64> {
        match self.kind {
            ScaleType::Category | ScaleType::TimeCategory => {
                let n = self.category_count();
                let i = self.category_index(v)?;
                Some((i as f64 + 0.5) / n as f64)
            }
            ScaleType::Identity => v.as_f64(),
            ScaleType::Linear | ScaleType::Time => {
                let x = self.numeric(v)?;
                let (d0, d1) = self.domain.extent()?;
                Some(lerp_unit(x, d0, d1))
            }
            ScaleType::Log => {
                let x = self.numeric(v).filter(|x| *x > 0.0)?;
                let (d0, d1) = self.domain.extent()?;
                if d0 <= 0.0 {
                    return None;
                }
                Some(lerp_unit(x.ln(), d0.ln(), d1.ln()))
            }
            ScaleType::Pow => {
                let e = self.exponent();
                let x = self.numeric(v)?;
                let (d0, d1) = self.domain.extent()?;
                Some(lerp_unit(signed_pow(x, e), signed_pow(d0, e), signed_pow(d1, e)))
            }
            ScaleType::Quantize => {
                let x = self.numeric(v)?;
                let (d0, d1) = self.domain.extent()?;
                let k = self.tick_count() as f64;
                let bucket = (lerp_unit(x, d0, d1) * k).floor().clamp(0.0, k - 1.0);
                Some((bucket + 0.5) / k)
            }
            ScaleType::Quantile => {
                let x = self.numeric(v)?;
                let Domain::Sorted(sorted) = &self.domain else {
                    return None;
                };
                if sorted.is_empty() {
                    return None;
                }
                let rank = sorted.partition_point(|s| *s < x) as f64 / sorted.len() as f64;
                let k = self.tick_count() as f64;
                let bucket = (rank * k).floor().clamp(0.0, k - 1.0);
                Some((bucket + 0.5) / k)
            }
        }
    }

    /// Maps a value into normalized range space. Returns `None` for missing or unmappable
    /// values.
    pub fn map(&self, v: &Value) -> Option<f64> {
        if v.is_null() {
            return None;
        }
        let t = self.unit(v)?;
        let (r0, r1) = self.range();
        Some(r0 + t * (r1 - r0))
    }

    /// Maps a raw number (domain units) into normalized range space.
    pub fn map_f64(&self, x: f64) -> Option<f64> {
        self.map(&Value::Number(x))
    }

    /// Inverts a normalized position back into a domain value.
    pub fn invert(&self, position: f64) -> Option<Value> {
        let (r0, r1) = self.range();
        let t = if r1 == r0 {
            0.0
        } else {
            (position - r0) / (r1 - r0)
        };
        match self.kind {
            ScaleType::Category | ScaleType::TimeCategory => {
                let Domain::Categorical(values) = &self.domain else {
                    return None;
                };
                if values.is_empty() {
                    return None;
                }
                let n = values.len() as f64;
                #[allow(clippy::cast_possible_truncation, reason = "clamped to [0, n - 1]")]
                let i = (t * n).floor().clamp(0.0, n - 1.0) as usize;
                values.get(i).cloned()
            }
            ScaleType::Identity => Some(Value::Number(position)),
            ScaleType::Linear | ScaleType::Quantize => {
                let (d0, d1) = self.domain.extent()?;
                Some(Value::Number(d0 + t * (d1 - d0)))
            }
            ScaleType::Time => {
                let (d0, d1) = self.domain.extent()?;
                Some(Value::Time(d0 + t * (d1 - d0)))
            }
            ScaleType::Log => {
                let (d0, d1) = self.domain.extent()?;
                if d0 <= 0.0 {
                    return None;
                }
                let l = d0.ln() + t * (d1.ln() - d0.ln());
                Some(Value::Number(core::f64::consts::E.powf(l)))
            }
            ScaleType::Pow => {
                let e = self.exponent();
                let (d0, d1) = self.domain.extent()?;
                let (p0, p1) = (signed_pow(d0, e), signed_pow(d1, e));
                Some(Value::Number(signed_pow(p0 + t * (p1 - p0), 1.0 / e)))
            }
            ScaleType::Quantile => {
                let Domain::Sorted(sorted) = &self.domain else {
                    return None;
                };
                let n = sorted.len();
                if n == 0 {
                    return None;
                }
                #[allow(clippy::cast_possible_truncation, reason = "clamped to [0, n - 1]")]
                let i = (t * n as f64).floor().clamp(0.0, (n - 1) as f64) as usize;
                sorted.get(i).map(|x| Value::Number(*x))
            }
        }
    }

    fn exponent(&self) -> f64 {
        self.option.exponent.filter(|e| *e != 0.0).unwrap_or(2.0)
    }

    fn base(&self) -> f64 {
        self.option.base.filter(|b| *b > 1.0).unwrap_or(10.0)
    }

    /// Produces ticks for the final domain.
    pub fn ticks(&self) -> Vec<Tick> {
        let (values, step) = self.tick_values();
        values
            .into_iter()
            .filter_map(|value| {
                let position = self.map(&value)?;
                let text = self.tick_text(&value, step);
                Some(Tick {
                    value,
                    position,
                    text,
                })
            })
            .collect()
    }

    /// Formats a value the way tick labels are formatted.
    pub fn tick_text(&self, value: &Value, step: f64) -> String {
        if let Some(f) = &self.option.formatter {
            return (f.0)(value);
        }
        match (self.kind, value) {
            (ScaleType::Time, _) => match self.numeric(value) {
                Some(secs) => time::format_timestamp(secs, step, self.option.mask.as_deref()),
                None => alloc::format!("{value}"),
            },
            (kind, _) if kind.is_categorical() => alloc::format!("{value}"),
            (_, Value::Number(n)) => format_tick_with_step(*n, step),
            _ => alloc::format!("{value}"),
        }
    }

    fn tick_values(&self) -> (Vec<Value>, f64) {
        let count = self.tick_count();
        match (&self.domain, self.kind) {
            (Domain::Categorical(values), _) => {
                let stride = match self.option.tick_count {
                    Some(c) if c > 0 && c < values.len() => values.len().div_ceil(c),
                    _ => 1,
                };
                let mut out: Vec<Value> = values.iter().step_by(stride).cloned().collect();
                if self.option.show_last {
                    if let Some(last) = values.last() {
                        if out.last().map(Value::key) != Some(last.key()) {
                            out.push(last.clone());
                        }
                    }
                }
                (out, 1.0)
            }
            (Domain::Sorted(sorted), _) => {
                if sorted.is_empty() {
                    return (Vec::new(), 0.0);
                }
                let n = sorted.len() - 1;
                let mut out: Vec<f64> = (0..=count)
                    .map(|i| sorted[(i * n) / count])
                    .collect();
                out.dedup();
                let step = tick_step(&out);
                (out.into_iter().map(Value::Number).collect(), step)
            }
            (Domain::Continuous { min, max }, kind) if min <= max => {
                let (min, max) = (*min, *max);
                let mut ticks = match (kind, self.option.tick_interval) {
                    (_, Some(step)) if step > 0.0 => {
                        time::fixed_step_ticks((min / step).ceil() * step, max, step)
                    }
                    (ScaleType::Time, _) => time::nice_time_ticks_seconds(min, max, count),
                    (ScaleType::Log, _) => log_ticks(min, max, self.base()),
                    _ => {
                        let slack = 1e-9 * (max - min).abs();
                        nice_ticks(min, max, count)
                            .into_iter()
                            .filter(|t| *t >= min - slack && *t <= max + slack)
                            .collect()
                    }
                };
                let step = self.option.tick_interval.unwrap_or_else(|| tick_step(&ticks));
                if self.option.show_last {
                    let eps = 1e-9 * (max - min).abs().max(1.0);
                    if ticks.last().is_none_or(|last| (max - last).abs() > eps) {
                        ticks.push(max);
                    }
                }
                let wrap = if kind == ScaleType::Time {
                    Value::Time
                } else {
                    Value::Number
                };
                (ticks.into_iter().map(wrap).collect(), step)
            }
            _ => (Vec::new(), 0.0),
        }
    }
}

fn lerp_unit(x: f64, d0: f64, d1: f64) -> f64 {
    let denom = d1 - d0;
    if denom == 0.0 {
        return 0.5;
    }
    (x - d0) / denom
}

fn signed_pow(x: f64, e: f64) -> f64 {
    if x < 0.0 { -(-x).powf(e) } else { x.powf(e) }
}

fn tick_step(ticks: &[f64]) -> f64 {
    match ticks {
        [a, b, ..] => (b - a).abs(),
        _ => 0.0,
    }
}

/// Derives a domain from observations, honoring declared overrides.
pub(crate) fn observe_domain<'a>(
    kind: ScaleType,
    option: &ScaleOption,
    values: impl IntoIterator<Item = &'a Value>,
    include_zero: bool,
) -> Domain {
    match kind {
        ScaleType::Identity => Domain::Identity,
        ScaleType::Category | ScaleType::TimeCategory => {
            if let Some(declared) = &option.values {
                return Domain::Categorical(declared.clone());
            }
            let mut seen = hashbrown::HashSet::new();
            let mut out: Vec<Value> = values
                .into_iter()
                .filter(|v| !v.is_null() && seen.insert(v.key()))
                .cloned()
                .collect();
            if kind == ScaleType::TimeCategory {
                out.sort_by(|a, b| {
                    let ta = time_of(a).unwrap_or(f64::INFINITY);
                    let tb = time_of(b).unwrap_or(f64::INFINITY);
                    ta.total_cmp(&tb)
                });
            }
            Domain::Categorical(out)
        }
        ScaleType::Quantile => {
            let mut out: Vec<f64> = values.into_iter().filter_map(Value::as_f64).collect();
            out.sort_by(f64::total_cmp);
            Domain::Sorted(out)
        }
        _ => {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for v in values {
                let x = if kind == ScaleType::Time {
                    time_of(v)
                } else {
                    v.as_f64()
                };
                if let Some(x) = x.filter(|x| kind != ScaleType::Log || *x > 0.0) {
                    min = min.min(x);
                    max = max.max(x);
                }
            }
            if include_zero && option.min.is_none() && kind != ScaleType::Log {
                min = min.min(0.0);
                max = max.max(0.0);
            }
            if let Some(m) = option.min {
                min = m;
            }
            if let Some(m) = option.max {
                max = m;
            }
            Domain::Continuous { min, max }
        }
    }
}

fn time_of(v: &Value) -> Option<f64> {
    match v {
        Value::Text(s) => time::parse_time(s),
        _ => v.as_f64(),
    }
}

/// Returns "nice-ish" tick values covering `[min, max]`.
pub(crate) fn nice_ticks(mut min: f64, mut max: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if min == max {
        return alloc::vec![min];
    }
    if min > max {
        core::mem::swap(&mut min, &mut max);
    }
    let span = max - min;
    let step0 = span / count.max(1) as f64;
    let step = nice_step(step0);
    if step == 0.0 {
        return alloc::vec![min, max];
    }

    let start = (min / step).floor() * step;
    let stop = (max / step).ceil() * step;

    let n_f = ((stop - start) / step).round();
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

fn nice_step(step: f64) -> f64 {
    if !step.is_finite() || step <= 0.0 {
        return 0.0;
    }
    let power = step.log10().floor();
    let base = 10_f64.powf(power);
    let error = step / base;
    let nice = if error >= 7.5 {
        10.0
    } else if error >= 3.5 {
        5.0
    } else if error >= 1.5 {
        2.0
    } else {
        1.0
    };
    nice * base
}

fn log_ticks(min: f64, max: f64, base: f64) -> Vec<f64> {
    if min.is_nan() || max.is_nan() || min <= 0.0 || max < min {
        return Vec::new();
    }
    let lb = base.ln();
    let e0 = (min.ln() / lb - 1e-9).ceil();
    let e1 = (max.ln() / lb + 1e-9).floor();
    if e1.is_nan() || e1 < e0 || e1 - e0 > 64.0 {
        return alloc::vec![min, max];
    }
    let mut out = Vec::new();
    let mut e = e0;
    while e <= e1 {
        out.push(base.powf(e));
        e += 1.0;
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    fn nums(xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|x| Value::Number(*x)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn linear_nice_domain() {
        let v = nums(&[3.0, 97.0]);
        let s = Scale::observe("y", ScaleType::Linear, ScaleOption::new(), &v, false);
        assert_eq!(s.domain(), &Domain::Continuous { min: 0.0, max: 100.0 });
        assert!(close(s.map_f64(50.0).unwrap(), 0.5));
        assert_eq!(s.map(&Value::Null), None);
    }

    #[test]
    fn overrides_and_include_zero() {
        let v = nums(&[10.0, 20.0]);
        let s = Scale::observe("y", ScaleType::Linear, ScaleOption::new(), &v, true);
        assert_eq!(s.domain().extent(), Some((0.0, 20.0)));
        let opt = ScaleOption::new().with_min(5.0).with_nice(false);
        let s = Scale::observe("y", ScaleType::Linear, opt, &v, true);
        assert_eq!(s.domain().extent(), Some((5.0, 20.0)));
    }

    #[test]
    fn categorical_band_centers_and_invert() {
        let v: Vec<Value> = ["a", "b", "a", "c"].into_iter().map(Value::from).collect();
        let s = Scale::observe("x", ScaleType::Category, ScaleOption::new(), &v, false);
        assert_eq!(s.category_count(), 3);
        assert!(close(s.map(&Value::from("a")).unwrap(), 1.0 / 6.0));
        assert!(close(s.map(&Value::from("c")).unwrap(), 5.0 / 6.0));
        assert!(close(s.band_width().unwrap(), 1.0 / 3.0));
        assert_eq!(s.invert(0.5), Some(Value::from("b")));
        assert_eq!(s.map(&Value::from("zzz")), None);
    }

    #[test]
    fn type_inference_and_unknown_names() {
        assert_eq!(ScaleType::infer(&nums(&[1.0])), ScaleType::Linear);
        assert_eq!(ScaleType::infer(&[Value::Null, Value::from("a")]), ScaleType::Category);
        assert_eq!(ScaleType::infer(&[Value::Time(0.0)]), ScaleType::Time);
        let (kind, err) = ScaleOption::new()
            .with_type_name("bogus")
            .resolve_type(core::iter::empty());
        assert_eq!(kind, ScaleType::Identity);
        assert!(matches!(err, Some(ConfigError::UnknownScaleType(_))));
    }

    #[test]
    fn show_last_adds_domain_max_on_time_scale() {
        // 0 .. 25 minutes with 10-minute ticks: 0, 10, 20 and then the max.
        let v = vec![Value::Time(0.0), Value::Time(1500.0)];
        let opt = ScaleOption::new().with_tick_interval(600.0);
        let without = Scale::observe("t", ScaleType::Time, opt.clone(), &v, false);
        assert_eq!(without.ticks().len(), 3);

        let s = Scale::observe("t", ScaleType::Time, opt.with_show_last(true), &v, false);
        let ticks = s.ticks();
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks.last().map(|t| t.value.clone()), Some(Value::Time(1500.0)));
        assert!(close(ticks[3].position, 1.0));
    }

    #[test]
    fn time_scale_parses_text() {
        let v = vec![Value::from("1970-01-01"), Value::from("1970-01-11")];
        let s = Scale::observe("t", ScaleType::Time, ScaleOption::new(), &v, false);
        assert_eq!(s.domain().extent(), Some((0.0, 864_000.0)));
        assert!(close(s.map(&Value::from("1970-01-06")).unwrap(), 0.5));
        assert_eq!(s.ticks()[0].text, "1970-01-01");
    }

    #[test]
    fn log_and_pow_mapping() {
        let v = nums(&[1.0, 1000.0]);
        let s = Scale::observe("v", ScaleType::Log, ScaleOption::new(), &v, false);
        assert!(close(s.map_f64(10.0).unwrap(), 1.0 / 3.0));
        assert_eq!(s.ticks().len(), 4);
        assert_eq!(s.map_f64(-1.0), None);

        let v = nums(&[0.0, 10.0]);
        let s = Scale::observe("v", ScaleType::Pow, ScaleOption::new(), &v, false);
        assert!(close(s.map_f64(5.0).unwrap(), 0.25));
        let back = s.invert(0.25).and_then(|v| v.as_f64()).unwrap();
        assert!(close(back, 5.0));
    }

    #[test]
    fn quantize_and_quantile_bucket() {
        let v = nums(&[0.0, 10.0]);
        let opt = ScaleOption::new().with_tick_count(2).with_nice(false);
        let s = Scale::observe("v", ScaleType::Quantize, opt.clone(), &v, false);
        assert!(close(s.map_f64(2.0).unwrap(), 0.25));
        assert!(close(s.map_f64(9.0).unwrap(), 0.75));

        let v = nums(&[1.0, 2.0, 3.0, 100.0]);
        let s = Scale::observe("v", ScaleType::Quantile, opt, &v, false);
        assert!(close(s.map_f64(1.5).unwrap(), 0.25));
        assert!(close(s.map_f64(50.0).unwrap(), 0.75));
    }

    #[test]
    fn categorical_tick_thinning_keeps_last_with_show_last() {
        let v: Vec<Value> = (0..10).map(|i| Value::from(alloc::format!("c{i}"))).collect();
        let opt = ScaleOption::new().with_tick_count(3).with_show_last(true);
        let s = Scale::observe("x", ScaleType::Category, opt, &v, false);
        let texts: Vec<String> = s.ticks().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["c0", "c4", "c8", "c9"]);
    }

    #[test]
    fn union_preserves_first_seen_order() {
        let a = Domain::Categorical(vec![Value::from("b"), Value::from("a")]);
        let b = Domain::Categorical(vec![Value::from("a"), Value::from("c")]);
        assert_eq!(
            a.union(&b),
            Domain::Categorical(vec![Value::from("b"), Value::from("a"), Value::from("c")])
        );
        let c = Domain::Continuous { min: 0.0, max: 5.0 }.union(&Domain::Continuous {
            min: -1.0,
            max: 3.0,
        });
        assert_eq!(c.extent(), Some((-1.0, 5.0)));
    }
}
