// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Annotations: guides positioned in data space.
//!
//! Positions are given per dimension as a domain value, a percentage of the content region, or
//! one of `min` / `max` / `median` of the field. They are resolved after layout through the
//! view's scales and coordinate.

extern crate alloc;

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Point, Vec2};
use peniko::Color;
use strata_core::{ComponentId, Datum, FieldName, Value, ViewId};

use crate::component::{
    ComponentDescriptor, ComponentModel, ComponentPadding, Direction, Layer,
};
use crate::coordinate::{Coordinate, Dim};
use crate::error::{DataError, Diagnostics};
use crate::registry::ScaleRegistry;
use crate::scale::{Domain, Scale};
use crate::theme::Theme;

/// One coordinate of an annotation position.
#[derive(Clone, Debug, PartialEq)]
pub enum PosValue {
    /// A domain value, mapped through the field's scale.
    Value(Value),
    /// A fraction of the content region, from the left or the top.
    Percent(f64),
    /// The start of the field's domain.
    Min,
    /// The end of the field's domain.
    Max,
    /// The median of the field's values.
    Median,
}

impl From<f64> for PosValue {
    fn from(v: f64) -> Self {
        Self::Value(Value::Number(v))
    }
}

impl From<&str> for PosValue {
    fn from(v: &str) -> Self {
        match v {
            "min" => Self::Min,
            "max" => Self::Max,
            "median" => Self::Median,
            _ => match v.strip_suffix('%').and_then(|p| p.trim().parse::<f64>().ok()) {
                Some(p) => Self::Percent(p / 100.0),
                None => Self::Value(Value::from(v)),
            },
        }
    }
}

/// A position in data space.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationPosition {
    /// Along the x field.
    pub x: PosValue,
    /// Along the y field.
    pub y: PosValue,
}

impl AnnotationPosition {
    /// Creates a position.
    pub fn new(x: impl Into<PosValue>, y: impl Into<PosValue>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
}

/// Annotation kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationKind {
    /// A straight guide line.
    Line {
        /// Start.
        start: AnnotationPosition,
        /// End.
        end: AnnotationPosition,
    },
    /// Free text.
    Text {
        /// Anchor.
        position: AnnotationPosition,
    },
    /// A filled rectangle between two corners.
    Region {
        /// First corner.
        start: AnnotationPosition,
        /// Opposite corner.
        end: AnnotationPosition,
    },
    /// An arc at the start's radius between the start and end angles.
    Arc {
        /// Start.
        start: AnnotationPosition,
        /// End.
        end: AnnotationPosition,
    },
    /// An image stretched between two corners.
    Image {
        /// First corner.
        start: AnnotationPosition,
        /// Opposite corner.
        end: AnnotationPosition,
        /// Image source, opaque to the engine.
        src: Arc<str>,
    },
    /// A point with a leader line and text.
    DataMarker {
        /// Marked position.
        position: AnnotationPosition,
        /// Leader line length.
        line_length: f64,
    },
    /// A bracket over the records between two x positions.
    DataRegion {
        /// Start.
        start: AnnotationPosition,
        /// End.
        end: AnnotationPosition,
        /// Distance of the bracket above the records.
        line_length: f64,
    },
    /// A region that recolors the geometries it covers.
    RegionFilter {
        /// First corner.
        start: AnnotationPosition,
        /// Opposite corner.
        end: AnnotationPosition,
    },
}

impl AnnotationKind {
    /// Kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::Text { .. } => "text",
            Self::Region { .. } => "region",
            Self::Arc { .. } => "arc",
            Self::Image { .. } => "image",
            Self::DataMarker { .. } => "dataMarker",
            Self::DataRegion { .. } => "dataRegion",
            Self::RegionFilter { .. } => "regionFilter",
        }
    }
}

/// A declared annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationOption {
    /// Kind and positions.
    pub kind: AnnotationKind,
    /// Text attached to the annotation.
    pub text: Option<Arc<str>>,
    /// Paint; `None` uses the theme's axis color.
    pub color: Option<Color>,
    /// Draw above the geometries.
    pub top: bool,
    /// Horizontal text nudge.
    pub offset_x: f64,
    /// Vertical text nudge.
    pub offset_y: f64,
    /// Whether the annotation animates.
    pub animate: bool,
}

impl AnnotationOption {
    /// Creates an annotation of `kind`.
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            kind,
            text: None,
            color: None,
            top: true,
            offset_x: 0.0,
            offset_y: 0.0,
            animate: true,
        }
    }

    /// A guide line.
    pub fn line(start: AnnotationPosition, end: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::Line { start, end })
    }

    /// A text annotation.
    pub fn text(position: AnnotationPosition, content: impl Into<Arc<str>>) -> Self {
        Self::new(AnnotationKind::Text { position }).with_text(content)
    }

    /// A region.
    pub fn region(start: AnnotationPosition, end: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::Region { start, end })
    }

    /// An arc.
    pub fn arc(start: AnnotationPosition, end: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::Arc { start, end })
    }

    /// An image.
    pub fn image(
        start: AnnotationPosition,
        end: AnnotationPosition,
        src: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(AnnotationKind::Image {
            start,
            end,
            src: src.into(),
        })
    }

    /// A data marker.
    pub fn data_marker(position: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::DataMarker {
            position,
            line_length: 20.0,
        })
    }

    /// A data region.
    pub fn data_region(start: AnnotationPosition, end: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::DataRegion {
            start,
            end,
            line_length: 10.0,
        })
    }

    /// A region filter.
    pub fn region_filter(start: AnnotationPosition, end: AnnotationPosition) -> Self {
        Self::new(AnnotationKind::RegionFilter { start, end })
    }

    /// Sets the text.
    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the paint.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Draws below (`false`) or above (`true`) the geometries.
    pub fn with_top(mut self, top: bool) -> Self {
        self.top = top;
        self
    }

    /// Sets the text nudge.
    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }
}

/// A resolved annotation in screen space.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationModel {
    /// Kind name.
    pub kind: &'static str,
    /// Outline points: two for lines and images, a polygon for regions, a polyline for arcs
    /// and data regions, the point and leader end for data markers.
    pub points: Vec<Point>,
    /// Text anchor and content.
    pub text: Option<(Point, Arc<str>)>,
    /// Image source.
    pub src: Option<Arc<str>>,
    /// Paint.
    pub color: Color,
}

/// What an annotation is resolved against.
#[derive(Clone, Copy, Debug)]
pub struct AnnotationContext<'a> {
    /// Owning view.
    pub view: ViewId,
    /// Resolved scales.
    pub registry: &'a ScaleRegistry,
    /// Final coordinate.
    pub coordinate: &'a Coordinate,
    /// Field on the x dimension.
    pub x_field: Option<&'a FieldName>,
    /// Field on the y dimension.
    pub y_field: Option<&'a FieldName>,
    /// The view's filtered data.
    pub data: &'a [Datum],
}

const ARC_SAMPLES: usize = 24;

impl AnnotationContext<'_> {
    fn scale(&self, field: Option<&FieldName>) -> Option<&Scale> {
        self.registry.get(self.view, field?)
    }

    fn dim(&self, value: &PosValue, dim: Dim) -> Option<f64> {
        let field = match dim {
            Dim::X => self.x_field,
            Dim::Y => self.y_field,
        };
        if let PosValue::Percent(p) = value {
            return Some(match dim {
                Dim::X => *p,
                Dim::Y => 1.0 - *p,
            });
        }
        let scale = self.scale(field)?;
        match value {
            PosValue::Percent(_) => None,
            PosValue::Value(v) => scale.map(v),
            PosValue::Min | PosValue::Max => {
                let max = matches!(value, PosValue::Max);
                match scale.domain() {
                    Domain::Categorical(values) => {
                        let v = if max { values.last() } else { values.first() }?;
                        scale.map(v)
                    }
                    domain => {
                        let (lo, hi) = domain.extent()?;
                        scale.map_f64(if max { hi } else { lo })
                    }
                }
            }
            PosValue::Median => {
                let field = field?;
                if let Domain::Categorical(values) = scale.domain() {
                    let v = values.get(values.len().checked_sub(1)? / 2)?;
                    return scale.map(v);
                }
                let mut xs: Vec<f64> = self
                    .data
                    .iter()
                    .filter_map(|d| d.get(field)?.as_f64())
                    .filter(|x| x.is_finite())
                    .collect();
                if xs.is_empty() {
                    return None;
                }
                xs.sort_by(f64::total_cmp);
                let n = xs.len();
                let median = if n % 2 == 1 {
                    xs[n / 2]
                } else {
                    0.5 * (xs[n / 2 - 1] + xs[n / 2])
                };
                scale.map_f64(median)
            }
        }
    }

    /// Normalized position, or `None` when a dimension cannot be resolved.
    pub fn normalized(&self, pos: &AnnotationPosition) -> Option<Point> {
        Some(Point::new(
            self.dim(&pos.x, Dim::X)?,
            self.dim(&pos.y, Dim::Y)?,
        ))
    }

    fn screen(&self, pos: &AnnotationPosition) -> Option<Point> {
        Some(self.coordinate.convert(self.normalized(pos)?))
    }

    fn rect(&self, start: &AnnotationPosition, end: &AnnotationPosition) -> Option<Vec<Point>> {
        let s = self.normalized(start)?;
        let e = self.normalized(end)?;
        let corners = [(s.x, s.y), (s.x, e.y), (e.x, e.y), (e.x, s.y)];
        let n = if self.coordinate.is_polar() { ARC_SAMPLES } else { 1 };
        let mut out = Vec::with_capacity(4 * n);
        for i in 0..4 {
            let (ax, ay) = corners[i];
            let (bx, by) = corners[(i + 1) % 4];
            for k in 0..n {
                let t = k as f64 / n as f64;
                out.push(
                    self.coordinate
                        .convert(Point::new(ax + t * (bx - ax), ay + t * (by - ay))),
                );
            }
        }
        Some(out)
    }

    fn missing_field(&self) -> Option<FieldName> {
        [self.x_field, self.y_field]
            .into_iter()
            .flatten()
            .find(|f| self.registry.get(self.view, f).is_none())
            .cloned()
    }
}

fn resolve_model(
    option: &AnnotationOption,
    ctx: &AnnotationContext<'_>,
    color: Color,
) -> Option<AnnotationModel> {
    let nudge = Vec2::new(option.offset_x, option.offset_y);
    let text_at = |p: Point| option.text.clone().map(|t| (p + nudge, t));
    let mut model = AnnotationModel {
        kind: option.kind.name(),
        points: Vec::new(),
        text: None,
        src: None,
        color,
    };
    match &option.kind {
        AnnotationKind::Line { start, end } => {
            let (s, e) = (ctx.screen(start)?, ctx.screen(end)?);
            model.points = alloc::vec![s, e];
            model.text = text_at(e);
        }
        AnnotationKind::Text { position } => {
            let p = ctx.screen(position)?;
            model.points = alloc::vec![p];
            model.text = text_at(p);
        }
        AnnotationKind::Region { start, end } | AnnotationKind::RegionFilter { start, end } => {
            model.points = ctx.rect(start, end)?;
            let c = kurbo::Rect::from_points(ctx.screen(start)?, ctx.screen(end)?).center();
            model.text = text_at(c);
        }
        AnnotationKind::Arc { start, end } => {
            let (s, e) = (ctx.normalized(start)?, ctx.normalized(end)?);
            model.points = (0..=ARC_SAMPLES)
                .map(|i| {
                    let t = i as f64 / ARC_SAMPLES as f64;
                    ctx.coordinate.convert(Point::new(s.x + t * (e.x - s.x), s.y))
                })
                .collect();
        }
        AnnotationKind::Image { start, end, src } => {
            model.points = alloc::vec![ctx.screen(start)?, ctx.screen(end)?];
            model.src = Some(src.clone());
        }
        AnnotationKind::DataMarker {
            position,
            line_length,
        } => {
            let p = ctx.screen(position)?;
            let tip = p - Vec2::new(0.0, *line_length);
            model.points = alloc::vec![p, tip];
            model.text = text_at(tip);
        }
        AnnotationKind::DataRegion {
            start,
            end,
            line_length,
        } => {
            let (s, e) = (ctx.normalized(start)?, ctx.normalized(end)?);
            let (lo, hi) = if s.x <= e.x { (s.x, e.x) } else { (e.x, s.x) };
            let x_scale = ctx.scale(ctx.x_field)?;
            let y_scale = ctx.scale(ctx.y_field)?;
            let (xf, yf) = (ctx.x_field?, ctx.y_field?);
            let mut inside: Vec<Point> = ctx
                .data
                .iter()
                .filter_map(|d| {
                    let x = x_scale.map(d.get(xf)?)?;
                    let y = y_scale.map(d.get(yf)?)?;
                    (lo - 1e-9..=hi + 1e-9)
                        .contains(&x)
                        .then(|| ctx.coordinate.convert(Point::new(x, y)))
                })
                .collect();
            if inside.is_empty() {
                inside = alloc::vec![ctx.coordinate.convert(s), ctx.coordinate.convert(e)];
            }
            let top = inside.iter().map(|p| p.y).fold(f64::INFINITY, f64::min) - line_length;
            let left = inside.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
            let right = inside.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
            model.points = alloc::vec![
                Point::new(left, top + line_length),
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, top + line_length),
            ];
            model.text = text_at(Point::new(0.5 * (left + right), top));
        }
    }
    Some(model)
}

/// Resolves one annotation into a component.
///
/// Positions that cannot be mapped (missing scale, unknown category) skip the annotation; a
/// missing scale is recorded as a data error.
pub fn annotation_component(
    index: usize,
    option: &AnnotationOption,
    ctx: &AnnotationContext<'_>,
    theme: &Theme,
    diags: &mut Diagnostics,
) -> Option<ComponentDescriptor> {
    let color = option.color.unwrap_or(theme.axis_color);
    let Some(model) = resolve_model(option, ctx, color) else {
        match ctx.missing_field() {
            Some(field) => diags.push(ctx.view, DataError::MissingField(field)),
            None => tracing::trace!(view = %ctx.view, index, "annotation position out of domain"),
        }
        return None;
    };
    let layer = if option.top {
        Layer::Foreground
    } else {
        Layer::Background
    };
    let mut descriptor = ComponentDescriptor::new(
        ComponentId::new(ctx.view, &format!("annotation-{index}")),
        Direction::None,
        ComponentModel::Annotation(model),
    )
    .with_layer(layer)
    .with_padding(ComponentPadding::Fixed(0.0));
    descriptor.bbox = ctx.coordinate.region();
    Some(descriptor)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use kurbo::Rect;

    use super::*;
    use crate::scale::ScaleOption;

    struct Fixture {
        registry: ScaleRegistry,
        coordinate: Coordinate,
        data: Vec<Datum>,
        x: FieldName,
        y: FieldName,
    }

    fn fixture() -> Fixture {
        let data: Vec<Datum> = [("a", 1.0), ("b", 4.0), ("c", 10.0)]
            .into_iter()
            .map(|(x, y)| Datum::new().with("x", x).with("y", y))
            .collect();
        let mut registry = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let xs: Vec<Value> = data.iter().filter_map(|d| d.get("x").cloned()).collect();
        let ys: Vec<Value> = data.iter().filter_map(|d| d.get("y").cloned()).collect();
        let option = ScaleOption::default();
        registry.resolve(ViewId::ROOT, &"x".into(), xs.iter(), &option, false, &mut diags);
        registry.resolve(ViewId::ROOT, &"y".into(), ys.iter(), &option, true, &mut diags);
        Fixture {
            registry,
            coordinate: Coordinate::rect(Rect::new(0.0, 0.0, 300.0, 100.0)),
            data,
            x: "x".into(),
            y: "y".into(),
        }
    }

    fn ctx(f: &Fixture) -> AnnotationContext<'_> {
        AnnotationContext {
            view: ViewId::ROOT,
            registry: &f.registry,
            coordinate: &f.coordinate,
            x_field: Some(&f.x),
            y_field: Some(&f.y),
            data: &f.data,
        }
    }

    #[test]
    fn position_forms() {
        assert_eq!(PosValue::from("50%"), PosValue::Percent(0.5));
        assert_eq!(PosValue::from("median"), PosValue::Median);
        assert_eq!(PosValue::from("b"), PosValue::Value(Value::from("b")));
    }

    #[test]
    fn min_max_median_resolve_through_scales() {
        let f = fixture();
        let c = ctx(&f);
        // y domain niced to [0, 10].
        let p = c.normalized(&AnnotationPosition::new("min", "max")).unwrap();
        assert!((p.x - 1.0 / 6.0).abs() < 1e-9);
        assert!((p.y - 1.0).abs() < 1e-9);
        let m = c.normalized(&AnnotationPosition::new("median", "median")).unwrap();
        assert!((m.x - 0.5).abs() < 1e-9);
        assert!((m.y - 0.4).abs() < 1e-9);
        // Percent y counts from the top.
        let q = c.normalized(&AnnotationPosition::new("25%", "25%")).unwrap();
        assert!((q.y - 0.75).abs() < 1e-9);
    }

    #[test]
    fn line_resolves_to_screen_points() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let opt = AnnotationOption::line(
            AnnotationPosition::new("min", 5.0),
            AnnotationPosition::new("max", 5.0),
        )
        .with_text("target");
        let c = annotation_component(0, &opt, &ctx(&f), &Theme::light(), &mut diags).unwrap();
        let ComponentModel::Annotation(m) = &c.extra else {
            panic!("expected an annotation");
        };
        assert_eq!(m.points.len(), 2);
        assert!((m.points[0].y - 50.0).abs() < 1e-9);
        assert!((m.points[1].x - 250.0).abs() < 1e-9);
        assert_eq!(m.text.as_ref().map(|(_, t)| &**t), Some("target"));
        assert_eq!(c.layer, Layer::Foreground);
        assert!(diags.is_empty());
    }

    #[test]
    fn region_and_data_region() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let region = AnnotationOption::region(
            AnnotationPosition::new("0%", "0%"),
            AnnotationPosition::new("100%", "100%"),
        )
        .with_top(false);
        let c = annotation_component(1, &region, &ctx(&f), &Theme::light(), &mut diags).unwrap();
        let ComponentModel::Annotation(m) = &c.extra else {
            panic!("expected an annotation");
        };
        assert_eq!(m.points.len(), 4);
        assert_eq!(c.layer, Layer::Background);

        let dr = AnnotationOption::data_region(
            AnnotationPosition::new("a", "min"),
            AnnotationPosition::new("b", "min"),
        );
        let c = annotation_component(2, &dr, &ctx(&f), &Theme::light(), &mut diags).unwrap();
        let ComponentModel::Annotation(m) = &c.extra else {
            panic!("expected an annotation");
        };
        // Bracket spans records "a" (x = 50) and "b" (x = 150), 10px above the higher one.
        assert!((m.points[0].x - 50.0).abs() < 1e-9);
        assert!((m.points[2].x - 150.0).abs() < 1e-9);
        assert!((m.points[1].y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unresolvable_positions_are_skipped() {
        let f = fixture();
        let mut diags = Diagnostics::new();
        let opt = AnnotationOption::text(AnnotationPosition::new("zzz", 1.0), "?");
        assert!(annotation_component(0, &opt, &ctx(&f), &Theme::light(), &mut diags).is_none());
        assert!(diags.is_empty());

        let missing: FieldName = "nope".into();
        let c = AnnotationContext {
            y_field: Some(&missing),
            ..ctx(&f)
        };
        let opt = AnnotationOption::text(AnnotationPosition::new("a", 1.0), "?");
        assert!(annotation_component(0, &opt, &c, &Theme::light(), &mut diags).is_none());
        assert_eq!(diags.items().len(), 1);
    }
}
