// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Lifecycle misuse is returned as [`StrataError`]. Configuration and data problems never abort
//! a render pass: they are recovered from, logged, and recorded as [`Diagnostic`]s on the frame.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use strata_core::{FieldName, ViewId};

/// Errors returned by chart lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StrataError {
    /// The chart was destroyed.
    #[error("the chart has been destroyed")]
    Destroyed,
    /// The view does not exist (never created, or already destroyed).
    #[error("{0} does not exist")]
    UnknownView(ViewId),
    /// The root view lives exactly as long as the chart.
    #[error("the root view can only be destroyed together with the chart")]
    RootView,
}

/// A recoverable configuration problem.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Unknown scale type name; the scale falls back to identity.
    #[error("unknown scale type `{0}`")]
    UnknownScaleType(Arc<str>),
    /// A coordinate action tuple could not be parsed; it is skipped.
    #[error("malformed coordinate action: {0}")]
    MalformedAction(Arc<str>),
    /// A coordinate action is not invertible; it is skipped.
    #[error("degenerate coordinate action: {0}")]
    DegenerateAction(Arc<str>),
    /// Unknown coordinate type; falls back to `rect`.
    #[error("unknown coordinate type `{0}`")]
    UnknownCoordinate(Arc<str>),
    /// A sync group mixes scale types; the member keeps its own domain.
    #[error("sync group `{key}` expects `{expected}` scales but `{field}` is `{found}`")]
    SyncTypeConflict {
        /// Sync key.
        key: Arc<str>,
        /// Offending field.
        field: FieldName,
        /// Type of the group's first member.
        expected: &'static str,
        /// Type of the offending member.
        found: &'static str,
    },
    /// Region outside `[0, 1]` or with `start > end`; falls back to the whole parent.
    #[error("invalid region ({x0}, {y0}) .. ({x1}, {y1})")]
    InvalidRegion {
        /// Start x.
        x0: f64,
        /// Start y.
        y0: f64,
        /// End x.
        x1: f64,
        /// End y.
        y1: f64,
    },
    /// Negative or non-finite padding; replaced with zero.
    #[error("invalid padding {0}")]
    InvalidPadding(f64),
    /// Unknown named theme; falls back to the default theme.
    #[error("unknown theme `{0}`")]
    UnknownTheme(Arc<str>),
    /// Geometry type without a dedicated encoder; encoded as points.
    #[error("unsupported geometry type `{0}`")]
    UnsupportedGeometry(Arc<str>),
    /// Geometry without a usable `position`; the geometry is skipped.
    #[error("geometry #{0} has no valid position")]
    MissingPosition(usize),
}

/// A recoverable data problem.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// No record carries the field.
    #[error("field `{0}` is missing from every record")]
    MissingField(FieldName),
    /// The geometry has no records.
    #[error("dataset is empty")]
    EmptyData,
}

/// Either kind of recoverable problem.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RecoverableError {
    /// Configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Data.
    #[error(transparent)]
    Data(#[from] DataError),
}

/// A recoverable problem attributed to a view.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// View the problem occurred in.
    pub view: ViewId,
    /// The problem.
    pub error: RecoverableError,
}

/// Collects diagnostics for one pass, logging each as it is recorded.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs a problem.
    pub fn push(&mut self, view: ViewId, error: impl Into<RecoverableError>) {
        let error = error.into();
        tracing::warn!(%view, %error, "recovered from chart error");
        self.items.push(Diagnostic { view, error });
    }

    /// Recorded diagnostics.
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the collector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
