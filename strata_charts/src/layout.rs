// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component layout negotiation.
//!
//! Axes and legends need room around the content region, but how much depends on the region
//! itself (labels rotate when they overflow, legends wrap at the available width). The
//! negotiator alternates measure and shrink passes:
//!
//! - **Measure**: every side-placed component reports its size for the current trial region.
//! - **Shrink**: per-side footprints grow to the measured totals (never shrink), and the trial
//!   region is recomputed.
//!
//! It stops when a pass no longer grows any footprint, or at the iteration cap. Footprints are
//! monotonic, so the loop always terminates; non-convergence is recorded on the result. Finally
//! components are arranged outward from the region, in registration order per side.

extern crate alloc;

use alloc::vec;

use kurbo::{Rect, Size};
use strata_core::ViewId;

use crate::backend::ComponentBackend;
use crate::component::{Align, ComponentDescriptor, ComponentPadding, Side};

/// Concrete per-side amounts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    /// Top.
    pub top: f64,
    /// Right.
    pub right: f64,
    /// Bottom.
    pub bottom: f64,
    /// Left.
    pub left: f64,
}

impl Insets {
    /// All zero.
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    /// Creates insets in CSS order.
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same amount on every side.
    pub fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }

    /// Amount on `side`.
    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut f64 {
        match side {
            Side::Top => &mut self.top,
            Side::Right => &mut self.right,
            Side::Bottom => &mut self.bottom,
            Side::Left => &mut self.left,
        }
    }

    /// Pointwise maximum.
    pub fn max(&self, other: &Self) -> Self {
        Self::new(
            self.top.max(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
            self.left.max(other.left),
        )
    }

    /// Shrinks `rect`. A rect that would invert collapses to zero size, still inside `rect`.
    pub fn shrink(&self, rect: Rect) -> Rect {
        let x0 = (rect.x0 + self.left).min(rect.x1);
        let y0 = (rect.y0 + self.top).min(rect.y1);
        let x1 = (rect.x1 - self.right).max(x0);
        let y1 = (rect.y1 - self.bottom).max(y0);
        Rect::new(x0, y0, x1, y1)
    }
}

/// Per-side padding: a fixed amount, or `None` for auto (negotiated).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    /// Top.
    pub top: Option<f64>,
    /// Right.
    pub right: Option<f64>,
    /// Bottom.
    pub bottom: Option<f64>,
    /// Left.
    pub left: Option<f64>,
}

impl Padding {
    /// Auto on every side.
    pub const AUTO: Self = Self {
        top: None,
        right: None,
        bottom: None,
        left: None,
    };

    /// Fixed padding on every side.
    pub fn fixed(insets: Insets) -> Self {
        Self {
            top: Some(insets.top),
            right: Some(insets.right),
            bottom: Some(insets.bottom),
            left: Some(insets.left),
        }
    }

    /// The same fixed amount on every side.
    pub fn uniform(v: f64) -> Self {
        Self::fixed(Insets::uniform(v))
    }

    /// Padding on `side`.
    pub fn get(&self, side: Side) -> Option<f64> {
        match side {
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
        }
    }

    /// Returns `true` when no side is fixed.
    pub fn is_auto(&self) -> bool {
        Side::ALL.iter().all(|s| self.get(*s).is_none())
    }

    /// Effective insets: fixed sides override the negotiated footprints.
    pub fn resolve(&self, footprints: &Insets) -> Insets {
        let mut out = *footprints;
        for side in Side::ALL {
            if let Some(v) = self.get(side) {
                *out.get_mut(side) = v;
            }
        }
        out
    }
}

/// Outcome of one negotiation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NegotiationResult {
    /// Final content region.
    pub region: Rect,
    /// Negotiated per-side footprints.
    pub footprints: Insets,
    /// Measure passes run.
    pub iterations: usize,
    /// Whether the last pass left every footprint unchanged.
    pub converged: bool,
}

/// Negotiates component footprints for a view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Negotiator {
    /// Maximum measure passes.
    pub max_iterations: usize,
    /// Gap between a measured component and whatever is inside it.
    pub gap: f64,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            gap: 0.0,
        }
    }
}

impl Negotiator {
    /// Creates a negotiator with the given cap and gap.
    pub fn new(max_iterations: usize, gap: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            gap: gap.max(0.0),
        }
    }

    fn content_region(bounds: Rect, padding: &Padding, append: &Insets, fp: &Insets) -> Rect {
        let p = padding.resolve(fp);
        let total = Insets::new(
            p.top + append.top,
            p.right + append.right,
            p.bottom + append.bottom,
            p.left + append.left,
        );
        total.shrink(bounds)
    }

    /// Runs measure/shrink passes, then arranges `components` around the final region.
    ///
    /// Every call starts from zero footprints and clears the components' bounds first.
    pub fn negotiate(
        &self,
        view: ViewId,
        bounds: Rect,
        padding: &Padding,
        append: &Insets,
        components: &mut [ComponentDescriptor],
        backend: &dyn ComponentBackend,
    ) -> NegotiationResult {
        for c in components.iter_mut() {
            c.bbox = Rect::ZERO;
        }
        let n = components.len();
        let mut sizes = vec![Size::ZERO; n];
        let mut thickness = vec![0.0_f64; n];
        let mut gaps = vec![0.0_f64; n];

        let mut footprints = Insets::ZERO;
        let mut region = Self::content_region(bounds, padding, append, &footprints);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations.max(1) {
            iterations += 1;
            let mut measured = Insets::ZERO;
            for (i, c) in components.iter().enumerate() {
                let Some(side) = c.direction.side() else {
                    continue;
                };
                let (size, t, gap) = match c.padding {
                    ComponentPadding::Fixed(p) => {
                        let p = if p.is_finite() { p.max(0.0) } else { 0.0 };
                        let size = if side.is_horizontal() {
                            Size::new(region.width(), p)
                        } else {
                            Size::new(p, region.height())
                        };
                        (size, p, 0.0)
                    }
                    ComponentPadding::Auto => {
                        let s = backend.measure(c, region);
                        let t = if side.is_horizontal() { s.height } else { s.width };
                        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
                        let gap = if t > 0.0 { self.gap } else { 0.0 };
                        (s, t, gap)
                    }
                };
                sizes[i] = size;
                thickness[i] = t;
                gaps[i] = gap;
                *measured.get_mut(side) += t + gap;
            }
            let next = footprints.max(&measured);
            if next == footprints {
                converged = true;
                break;
            }
            footprints = next;
            region = Self::content_region(bounds, padding, append, &footprints);
        }

        arrange(region, components, &sizes, &thickness, &gaps);

        tracing::debug!(
            %view,
            iterations,
            converged,
            width = region.width(),
            height = region.height(),
            "negotiated layout"
        );
        NegotiationResult {
            region,
            footprints,
            iterations,
            converged,
        }
    }
}

fn aligned(start: f64, end: f64, length: f64, align: Align) -> (f64, f64) {
    let available = end - start;
    if length >= available {
        return (start, end);
    }
    match align {
        Align::Start => (start, start + length),
        Align::End => (end - length, end),
        Align::Center => {
            let s = start + 0.5 * (available - length);
            (s, s + length)
        }
    }
}

fn arrange(
    region: Rect,
    components: &mut [ComponentDescriptor],
    sizes: &[Size],
    thickness: &[f64],
    gaps: &[f64],
) {
    let mut cursor = Insets::ZERO;
    for (i, c) in components.iter_mut().enumerate() {
        let Some(side) = c.direction.side() else {
            c.bbox = region;
            continue;
        };
        let (t, gap, size) = (thickness[i], gaps[i], sizes[i]);
        let offset = cursor.get(side) + gap;
        let align = c.direction.align();
        c.bbox = match side {
            Side::Top => {
                let (x0, x1) = aligned(region.x0, region.x1, size.width, align);
                Rect::new(x0, region.y0 - offset - t, x1, region.y0 - offset)
            }
            Side::Bottom => {
                let (x0, x1) = aligned(region.x0, region.x1, size.width, align);
                Rect::new(x0, region.y1 + offset, x1, region.y1 + offset + t)
            }
            Side::Left => {
                let (y0, y1) = aligned(region.y0, region.y1, size.height, align);
                Rect::new(region.x0 - offset - t, y0, region.x0 - offset, y1)
            }
            Side::Right => {
                let (y0, y1) = aligned(region.y0, region.y1, size.height, align);
                Rect::new(region.x1 + offset, y0, region.x1 + offset + t, y1)
            }
        };
        *cursor.get_mut(side) += t + gap;
    }
}
