// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend seams.
//!
//! The engine never draws. Components are measured and mounted through a [`ComponentBackend`],
//! and each render pass is handed to a [`RenderBackend`] as a [`RenderFrame`].

extern crate alloc;

use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::{Rect, Size};
use peniko::Color;
use strata_core::{ElementDiff, ScheduleReport, ViewId};

use crate::component::{ComponentDescriptor, ComponentHandle, ComponentModel};
use crate::coordinate::Coordinate;
use crate::error::Diagnostic;
use crate::layout::NegotiationResult;
use crate::measure::{HeuristicTextMeasurer, TextMeasurer};
use crate::options::InteractionOption;

/// Measures and hosts components.
pub trait ComponentBackend {
    /// Size a component requests inside `available` (the trial content region).
    fn measure(&self, descriptor: &ComponentDescriptor, available: Rect) -> Size;

    /// Resolves a placed component's screen geometry against the final coordinate.
    fn arrange(&self, descriptor: &mut ComponentDescriptor, coordinate: &Coordinate) {
        resolve_component(descriptor, coordinate, &HeuristicTextMeasurer);
    }

    /// Creates the component's representation.
    fn mount(&mut self, descriptor: &ComponentDescriptor) -> ComponentHandle;

    /// Updates a mounted component.
    fn update(&mut self, handle: ComponentHandle, descriptor: &ComponentDescriptor);

    /// Removes a mounted component.
    fn unmount(&mut self, handle: ComponentHandle);
}

/// Measures a component with `measurer`.
pub fn measure_component(
    descriptor: &ComponentDescriptor,
    available: Rect,
    measurer: &dyn TextMeasurer,
) -> Size {
    match &descriptor.extra {
        ComponentModel::Axis(axis) => axis.measure(measurer, available),
        ComponentModel::Legend(legend) => legend.measure(measurer, available),
        ComponentModel::Tooltip(_)
        | ComponentModel::Crosshair(_)
        | ComponentModel::Annotation(_) => Size::ZERO,
    }
}

/// Resolves a component's screen geometry with `measurer`.
pub fn resolve_component(
    descriptor: &mut ComponentDescriptor,
    coordinate: &Coordinate,
    measurer: &dyn TextMeasurer,
) {
    let bbox = descriptor.bbox;
    match &mut descriptor.extra {
        ComponentModel::Axis(axis) => axis.resolve(coordinate, measurer, bbox),
        ComponentModel::Legend(legend) => legend.resolve(measurer, coordinate.region(), bbox),
        ComponentModel::Tooltip(_)
        | ComponentModel::Crosshair(_)
        | ComponentModel::Annotation(_) => {}
    }
}

/// A component backend that measures text heuristically and hands out handles.
#[derive(Debug, Default)]
pub struct HeuristicComponentBackend<M = HeuristicTextMeasurer> {
    measurer: M,
    next: u64,
    mounted: HashSet<ComponentHandle>,
}

impl HeuristicComponentBackend {
    /// Creates a backend with the heuristic text measurer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: TextMeasurer> HeuristicComponentBackend<M> {
    /// Creates a backend with a custom text measurer.
    pub fn with_measurer(measurer: M) -> Self {
        Self {
            measurer,
            next: 0,
            mounted: HashSet::new(),
        }
    }

    /// Number of mounted components.
    pub fn mounted(&self) -> usize {
        self.mounted.len()
    }
}

impl<M: TextMeasurer> ComponentBackend for HeuristicComponentBackend<M> {
    fn measure(&self, descriptor: &ComponentDescriptor, available: Rect) -> Size {
        measure_component(descriptor, available, &self.measurer)
    }

    fn arrange(&self, descriptor: &mut ComponentDescriptor, coordinate: &Coordinate) {
        resolve_component(descriptor, coordinate, &self.measurer);
    }

    fn mount(&mut self, descriptor: &ComponentDescriptor) -> ComponentHandle {
        let handle = ComponentHandle(self.next);
        self.next += 1;
        self.mounted.insert(handle);
        tracing::trace!(component = %descriptor.id, handle = handle.0, "mounted component");
        handle
    }

    fn update(&mut self, _handle: ComponentHandle, _descriptor: &ComponentDescriptor) {}

    fn unmount(&mut self, handle: ComponentHandle) {
        self.mounted.remove(&handle);
    }
}

/// Layout and components of one view in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewFrame {
    /// View id.
    pub id: ViewId,
    /// Parent view.
    pub parent: Option<ViewId>,
    /// Region assigned by the parent.
    pub bbox: Rect,
    /// Content region after component padding.
    pub content: Rect,
    /// Whether the view is drawn.
    pub visible: bool,
    /// Placed components.
    pub components: Vec<ComponentDescriptor>,
    /// Outcome of layout negotiation.
    pub negotiation: NegotiationResult,
    /// Number of elements encoded for the view.
    pub elements: usize,
    /// Whether layout and elements were reused from the previous pass.
    pub reused: bool,
}

/// Everything one render pass hands to the render backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    /// Pass counter, starting at 1.
    pub pass: u64,
    /// Canvas size.
    pub size: Size,
    /// Device pixel ratio.
    pub pixel_ratio: f64,
    /// Background fill.
    pub background: Color,
    /// Views in depth-first order.
    pub views: Vec<ViewFrame>,
    /// Classified elements.
    pub diffs: Vec<ElementDiff>,
    /// What the animation queue did.
    pub schedule: ScheduleReport,
    /// Problems recovered from during the pass.
    pub diagnostics: Vec<Diagnostic>,
    /// Declared interactions, passed through.
    pub interactions: Vec<InteractionOption>,
}

impl RenderFrame {
    /// Finds a view's frame.
    pub fn view(&self, id: ViewId) -> Option<&ViewFrame> {
        self.views.iter().find(|v| v.id == id)
    }
}

/// Receives finished frames.
pub trait RenderBackend {
    /// Presents a frame.
    fn present(&mut self, frame: &RenderFrame);
}

/// A render backend that discards frames.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderBackend;

impl RenderBackend for NullRenderBackend {
    fn present(&mut self, _frame: &RenderFrame) {}
}

#[cfg(test)]
mod tests {
    use strata_core::ComponentId;

    use super::*;
    use crate::component::{ComponentPadding, Direction};
    use crate::tooltip::TooltipCfg;

    #[test]
    fn handles_are_unique_and_tracked() {
        let mut backend = HeuristicComponentBackend::new();
        let d = ComponentDescriptor::new(
            ComponentId::new(ViewId::ROOT, "tooltip"),
            Direction::None,
            ComponentModel::Tooltip(TooltipCfg::default()),
        )
        .with_padding(ComponentPadding::Fixed(0.0));
        let a = backend.mount(&d);
        let b = backend.mount(&d);
        assert_ne!(a, b);
        assert_eq!(backend.mounted(), 2);
        backend.unmount(a);
        assert_eq!(backend.mounted(), 1);
        assert_eq!(backend.measure(&d, Rect::new(0.0, 0.0, 10.0, 10.0)), Size::ZERO);
    }
}
