// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed visual elements produced by one render pass.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect};
use peniko::Color;
use peniko::color::palette::css;
use smallvec::SmallVec;

use crate::animate::AnimateOption;
use crate::id::ViewId;
use crate::value::ValueKey;

/// The per-element part of an [`ElementKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyId {
    /// Value of the declared identity field.
    Field(ValueKey),
    /// Position of the source record inside the geometry's data.
    Index(usize),
    /// A group-level element (one line per series), keyed by the group label.
    Group(Arc<str>),
    /// A label attached to another element.
    Label(Arc<KeyId>),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(k) => write!(f, "{k}"),
            Self::Index(i) => write!(f, "#{i}"),
            Self::Group(g) => write!(f, "group:{g}"),
            Self::Label(inner) => write!(f, "label:{inner}"),
        }
    }
}

/// Identity of an element across render passes.
///
/// Keys are scoped by view and geometry, so two geometries mapping the same record never
/// collide. `dup` disambiguates repeated keys inside one pass by occurrence order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey {
    /// Owning view.
    pub view: ViewId,
    /// Geometry index within the view.
    pub geometry: u32,
    /// Per-element identity.
    pub id: KeyId,
    /// Occurrence counter for duplicated ids.
    pub dup: u32,
}

impl ElementKey {
    /// Creates a key with `dup = 0`.
    pub fn new(view: ViewId, geometry: u32, id: KeyId) -> Self {
        Self {
            view,
            geometry,
            id,
            dup: 0,
        }
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/g{}/{}", self.view, self.geometry, self.id)?;
        if self.dup > 0 {
            write!(f, "~{}", self.dup)?;
        }
        Ok(())
    }
}

/// What kind of geometry produced an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// A bar / column / sector.
    Interval,
    /// A line through a group's points, sorted by x.
    Line,
    /// A path through a group's points, in data order.
    Path,
    /// A single point symbol.
    Point,
    /// A filled area under a group's points.
    Area,
    /// A polygon or heatmap cell.
    Polygon,
    /// A data label.
    Label,
}

/// Resolved drawing payload in screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementShape {
    /// A point symbol.
    Point {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// A closed polygon.
    Polygon(SmallVec<[Point; 4]>),
    /// One or more open polylines.
    ///
    /// More than one segment appears when a path is broken at missing values.
    Path {
        /// Disjoint polylines.
        segments: Vec<Vec<Point>>,
        /// Whether each segment is closed back to its start.
        closed: bool,
    },
    /// A text run.
    Text {
        /// Anchor point (center of the text).
        anchor: Point,
        /// Text content.
        text: Arc<str>,
        /// Font size.
        font_size: f64,
    },
}

impl ElementShape {
    /// Returns the axis-aligned bounds of the shape.
    ///
    /// Text bounds only cover the anchor point.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Point { center, radius } => Rect::from_center_size(
                *center,
                (2.0 * radius.max(0.0), 2.0 * radius.max(0.0)),
            ),
            Self::Polygon(points) => bounds_of(points.iter().copied()),
            Self::Path { segments, .. } => bounds_of(segments.iter().flatten().copied()),
            Self::Text { anchor, .. } => Rect::from_points(*anchor, *anchor),
        }
    }

    /// Number of disjoint segments in a path (1 for other shapes).
    pub fn segment_count(&self) -> usize {
        match self {
            Self::Path { segments, .. } => segments.len(),
            _ => 1,
        }
    }
}

fn bounds_of(mut points: impl Iterator<Item = Point>) -> Rect {
    let Some(first) = points.next() else {
        return Rect::ZERO;
    };
    points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p))
}

/// Drawing style overrides carried by an element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementStyle {
    /// Overall opacity in `[0, 1]`.
    pub opacity: f64,
    /// Stroke width for lines and outlines.
    pub line_width: f64,
    /// Optional stroke paint; `None` uses the element color.
    pub stroke: Option<Color>,
    /// Whether closed shapes are filled.
    pub fill: bool,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            line_width: 1.0,
            stroke: None,
            fill: true,
        }
    }
}

/// A single keyed element produced by a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualElement {
    /// Identity across passes.
    pub key: ElementKey,
    /// Producing geometry kind.
    pub kind: ElementKind,
    /// Screen-space payload.
    pub shape: ElementShape,
    /// Resolved color channel.
    pub color: Color,
    /// Resolved shape channel (symbol or sub-shape name).
    pub shape_name: Arc<str>,
    /// Resolved size channel.
    pub size: f64,
    /// Style.
    pub style: ElementStyle,
    /// Named state styles (e.g. `"active"`), applied by interactions downstream.
    pub states: Arc<[(Arc<str>, ElementStyle)]>,
    /// Indices of the source records inside the geometry's data.
    pub rows: SmallVec<[usize; 1]>,
    /// Animation settings for this element's geometry.
    pub animate: AnimateOption,
}

impl VisualElement {
    /// Creates an element with default channels and style.
    pub fn new(key: ElementKey, kind: ElementKind, shape: ElementShape) -> Self {
        Self {
            key,
            kind,
            shape,
            color: css::BLACK,
            shape_name: Arc::from(""),
            size: 1.0,
            style: ElementStyle::default(),
            states: Arc::from([]),
            rows: SmallVec::new(),
            animate: AnimateOption::default(),
        }
    }

    /// Returns `true` when the drawable state matches `other`, ignoring identity and rows.
    pub fn visual_eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.shape == other.shape
            && self.color == other.color
            && self.shape_name == other.shape_name
            && self.size == other.size
            && self.style == other.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_bounds_span_all_segments() {
        let shape = ElementShape::Path {
            segments: alloc::vec![
                alloc::vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)],
                alloc::vec![Point::new(5.0, -1.0)],
            ],
            closed: false,
        };
        let b = shape.bounds();
        assert_eq!(b, Rect::new(0.0, -1.0, 5.0, 2.0));
        assert_eq!(shape.segment_count(), 2);
    }

    #[test]
    fn key_display_includes_dup() {
        let mut key = ElementKey::new(ViewId(2), 1, KeyId::Index(3));
        assert_eq!(alloc::format!("{key}"), "view#2/g1/#3");
        key.dup = 1;
        assert_eq!(alloc::format!("{key}"), "view#2/g1/#3~1");
    }
}
