// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component descriptors: what the layout negotiator places around a view's content region.

extern crate alloc;

use kurbo::Rect;
use strata_core::ComponentId;

use crate::annotation::AnnotationModel;
use crate::axis::AxisModel;
use crate::legend::LegendModel;
use crate::tooltip::{CrosshairModel, TooltipCfg};

/// Drawing layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Behind the geometries.
    Background,
    /// With the geometries.
    #[default]
    Middle,
    /// Above the geometries.
    Foreground,
}

/// A side of the content region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Above.
    Top,
    /// Right.
    Right,
    /// Below.
    Bottom,
    /// Left.
    Left,
}

impl Side {
    /// All sides, in footprint order.
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// Index into `[top, right, bottom, left]` arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Right => 1,
            Self::Bottom => 2,
            Self::Left => 3,
        }
    }

    /// Returns `true` for top and bottom.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// Alignment along a side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Align {
    /// Left or top end.
    Start,
    /// Centered.
    Center,
    /// Right or bottom end.
    End,
}

/// Where a component sits relative to the content region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Above, centered.
    Top,
    /// Above, left-aligned.
    TopLeft,
    /// Above, right-aligned.
    TopRight,
    /// Right, centered.
    Right,
    /// Right, top-aligned.
    RightTop,
    /// Right, bottom-aligned.
    RightBottom,
    /// Below, centered.
    #[default]
    Bottom,
    /// Below, left-aligned.
    BottomLeft,
    /// Below, right-aligned.
    BottomRight,
    /// Left, centered.
    Left,
    /// Left, top-aligned.
    LeftTop,
    /// Left, bottom-aligned.
    LeftBottom,
    /// Placed over the content region itself; takes no padding.
    None,
}

impl Direction {
    /// Parses `top`, `top-left`, `right-bottom`, ...
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "top" => Self::Top,
            "top-left" => Self::TopLeft,
            "top-right" => Self::TopRight,
            "right" => Self::Right,
            "right-top" => Self::RightTop,
            "right-bottom" => Self::RightBottom,
            "bottom" => Self::Bottom,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            "left" => Self::Left,
            "left-top" => Self::LeftTop,
            "left-bottom" => Self::LeftBottom,
            "none" => Self::None,
            _ => return None,
        })
    }

    /// The side this direction occupies.
    pub fn side(self) -> Option<Side> {
        match self {
            Self::Top | Self::TopLeft | Self::TopRight => Some(Side::Top),
            Self::Right | Self::RightTop | Self::RightBottom => Some(Side::Right),
            Self::Bottom | Self::BottomLeft | Self::BottomRight => Some(Side::Bottom),
            Self::Left | Self::LeftTop | Self::LeftBottom => Some(Side::Left),
            Self::None => None,
        }
    }

    /// Alignment along the side.
    pub fn align(self) -> Align {
        match self {
            Self::TopLeft | Self::BottomLeft | Self::RightTop | Self::LeftTop => Align::Start,
            Self::TopRight | Self::BottomRight | Self::RightBottom | Self::LeftBottom => Align::End,
            _ => Align::Center,
        }
    }

    /// Whether items flow horizontally on this side.
    pub fn is_horizontal(self) -> bool {
        self.side().is_none_or(Side::is_horizontal)
    }
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Top => Self::Top,
            Side::Right => Self::Right,
            Side::Bottom => Self::Bottom,
            Side::Left => Self::Left,
        }
    }
}

/// Component kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Axis.
    Axis,
    /// Legend.
    Legend,
    /// Tooltip.
    Tooltip,
    /// Crosshair.
    Crosshair,
    /// Annotation.
    Annotation,
}

/// How much room a component takes on its side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ComponentPadding {
    /// A fixed thickness.
    Fixed(f64),
    /// Measured through the component backend.
    #[default]
    Auto,
}

/// Type-specific component payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentModel {
    /// Axis.
    Axis(AxisModel),
    /// Legend.
    Legend(LegendModel),
    /// Tooltip settings.
    Tooltip(TooltipCfg),
    /// Crosshair.
    Crosshair(CrosshairModel),
    /// Annotation.
    Annotation(AnnotationModel),
}

impl ComponentModel {
    /// The kind of this payload.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Axis(_) => ComponentKind::Axis,
            Self::Legend(_) => ComponentKind::Legend,
            Self::Tooltip(_) => ComponentKind::Tooltip,
            Self::Crosshair(_) => ComponentKind::Crosshair,
            Self::Annotation(_) => ComponentKind::Annotation,
        }
    }
}

/// Backend-owned handle to a mounted component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentHandle(pub u64);

/// A component of one view.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentDescriptor {
    /// Identity across passes.
    pub id: ComponentId,
    /// Drawing layer.
    pub layer: Layer,
    /// Placement.
    pub direction: Direction,
    /// Kind.
    pub kind: ComponentKind,
    /// Payload.
    pub extra: ComponentModel,
    /// Footprint policy.
    pub padding: ComponentPadding,
    /// Arranged bounds, set by the negotiator.
    pub bbox: Rect,
    /// Mounted representation, if any.
    pub handle: Option<ComponentHandle>,
}

impl ComponentDescriptor {
    /// Creates an unplaced descriptor.
    pub fn new(id: ComponentId, direction: Direction, extra: ComponentModel) -> Self {
        let kind = extra.kind();
        let layer = match kind {
            ComponentKind::Tooltip | ComponentKind::Crosshair => Layer::Foreground,
            _ => Layer::Middle,
        };
        Self {
            id,
            layer,
            direction,
            kind,
            extra,
            padding: ComponentPadding::Auto,
            bbox: Rect::ZERO,
            handle: None,
        }
    }

    /// Sets the layer.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Sets the padding policy.
    pub fn with_padding(mut self, padding: ComponentPadding) -> Self {
        self.padding = padding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_map_to_sides_and_alignment() {
        assert_eq!(Direction::from_name("top-left"), Some(Direction::TopLeft));
        assert_eq!(Direction::TopLeft.side(), Some(Side::Top));
        assert_eq!(Direction::TopLeft.align(), Align::Start);
        assert_eq!(Direction::RightBottom.align(), Align::End);
        assert_eq!(Direction::None.side(), None);
        assert!(!Direction::Left.is_horizontal());
        assert_eq!(Direction::from(Side::Right), Direction::Right);
        assert_eq!(Direction::from_name("middle"), None);
    }
}
