// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stable identifiers.

extern crate alloc;

use alloc::format;
use alloc::sync::Arc;
use core::fmt;

/// Identifier of a view inside a chart's view arena.
///
/// Ids are never reused within one chart, so a stale id reliably fails lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

impl ViewId {
    /// The root view of every chart.
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Identifier of a component (axis, legend, tooltip, annotation) owned by a view.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Arc<str>);

impl ComponentId {
    /// Creates a component id scoped to `view`.
    pub fn new(view: ViewId, name: &str) -> Self {
        Self(format!("{view}/{name}").into())
    }

    /// Returns the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
