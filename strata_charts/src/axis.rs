// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis components.
//!
//! Axes are derived from the view's position fields. Measurement follows the usual recipe:
//! tick length, label gap, the largest (rotated) label extent and an optional title line.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::f64::consts::FRAC_PI_4;

use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use strata_core::{AnimateOption, ComponentId, FieldName, Value, ViewId};

use crate::component::{
    ComponentDescriptor, ComponentModel, ComponentPadding, Direction, Layer, Side,
};
use crate::coordinate::{Coordinate, CoordinateKind, Dim};
#[cfg(not(feature = "std"))]
use crate::float::FloatExt;
use crate::measure::{TextMeasurer, TextStyle};
use crate::registry::ScaleRegistry;
use crate::scale::{Tick, TickFormatter};
use crate::theme::Theme;

/// Stroke settings for axis lines, ticks and grids. `stroke: None` uses the theme color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    /// Stroke paint.
    pub stroke: Option<Color>,
    /// Stroke width.
    pub line_width: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            stroke: None,
            line_width: 1.0,
        }
    }
}

impl LineStyle {
    /// Creates a style with an explicit paint.
    pub fn new(stroke: Color, line_width: f64) -> Self {
        Self {
            stroke: Some(stroke),
            line_width,
        }
    }
}

/// Tick label settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisLabelCfg {
    /// Gap between the tick and the label.
    pub offset: f64,
    /// Fixed rotation in radians; overrides auto-rotation.
    pub rotate: Option<f64>,
    /// Rotate labels by 45° when they do not fit their slots.
    pub auto_rotate: bool,
    /// Font size; `None` uses the theme.
    pub font_size: Option<f64>,
    /// Label text override; the scale's formatting is used otherwise.
    pub formatter: Option<TickFormatter>,
}

impl Default for AxisLabelCfg {
    fn default() -> Self {
        Self {
            offset: 4.0,
            rotate: None,
            auto_rotate: true,
            font_size: None,
            formatter: None,
        }
    }
}

impl AxisLabelCfg {
    /// Sets a fixed rotation in radians.
    pub fn with_rotate(mut self, angle: f64) -> Self {
        self.rotate = Some(angle);
        self
    }

    /// Sets the label formatter.
    pub fn with_formatter(mut self, f: impl Fn(&Value) -> String + 'static) -> Self {
        self.formatter = Some(TickFormatter(Arc::new(f)));
        self
    }
}

/// Axis title settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisTitleCfg {
    /// Title text; `None` uses the scale's alias or field name.
    pub text: Option<Arc<str>>,
    /// Gap between labels and the title.
    pub offset: f64,
    /// Font size; `None` uses the theme.
    pub font_size: Option<f64>,
}

/// Configuration of one axis. `None` members are hidden.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisCfg {
    /// Forced side.
    pub position: Option<Side>,
    /// Axis line.
    pub line: Option<LineStyle>,
    /// Tick lines.
    pub tick_line: Option<LineStyle>,
    /// Tick length.
    pub tick_length: f64,
    /// Tick labels.
    pub label: Option<AxisLabelCfg>,
    /// Title.
    pub title: Option<AxisTitleCfg>,
    /// Grid lines.
    pub grid: Option<LineStyle>,
    /// Whether the axis animates.
    pub animate: bool,
    /// Animation overrides.
    pub animate_option: Option<AnimateOption>,
    /// Which side of a vertical axis labels face: `1` outward, `-1` inward.
    pub vertical_factor: f64,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            position: None,
            line: Some(LineStyle::default()),
            tick_line: Some(LineStyle::default()),
            tick_length: 4.0,
            label: Some(AxisLabelCfg::default()),
            title: None,
            grid: Some(LineStyle::default()),
            animate: true,
            animate_option: None,
            vertical_factor: 1.0,
        }
    }
}

impl AxisCfg {
    /// Forces the axis onto `side`.
    pub fn with_position(mut self, side: Side) -> Self {
        self.position = Some(side);
        self
    }

    /// Shows a title (the scale alias unless `text` is given).
    pub fn with_title(mut self, title: AxisTitleCfg) -> Self {
        self.title = Some(title);
        self
    }

    /// Sets or hides the labels.
    pub fn with_label(mut self, label: Option<AxisLabelCfg>) -> Self {
        self.label = label;
        self
    }

    /// Sets or hides the grid.
    pub fn with_grid(mut self, grid: Option<LineStyle>) -> Self {
        self.grid = grid;
        self
    }

    /// Sets or hides the axis line.
    pub fn with_line(mut self, line: Option<LineStyle>) -> Self {
        self.line = line;
        self
    }

    /// Sets or hides tick lines.
    pub fn with_tick_line(mut self, tick: Option<LineStyle>) -> Self {
        self.tick_line = tick;
        self
    }
}

/// Per-field axis setting.
#[derive(Clone, Debug, PartialEq)]
pub enum AxisSetting {
    /// No axis for the field.
    Hidden,
    /// An axis with this configuration.
    Cfg(AxisCfg),
}

/// The `axes` option of a view.
#[derive(Clone, Debug, PartialEq)]
pub struct AxesOption {
    /// `false` hides every axis of the view.
    pub enabled: bool,
    /// Per-field settings; unlisted position fields get a default axis.
    pub fields: Vec<(FieldName, AxisSetting)>,
}

impl Default for AxesOption {
    fn default() -> Self {
        Self {
            enabled: true,
            fields: Vec::new(),
        }
    }
}

impl AxesOption {
    /// All axes hidden.
    pub fn hidden() -> Self {
        Self {
            enabled: false,
            fields: Vec::new(),
        }
    }

    /// Configures the axis of `field`.
    pub fn with_field(mut self, field: impl Into<FieldName>, setting: AxisSetting) -> Self {
        let field = field.into();
        self.fields.retain(|(f, _)| *f != field);
        self.fields.push((field, setting));
        self
    }

    fn setting(&self, field: &str) -> Option<&AxisSetting> {
        self.fields
            .iter()
            .find(|(f, _)| &**f == field)
            .map(|(_, s)| s)
    }
}

/// Screen-space axis drawing, resolved after layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AxisGeometry {
    /// Axis line polyline (a sampled circle for polar angle axes).
    pub line: Vec<Point>,
    /// Tick marks.
    pub ticks: Vec<(Point, Point)>,
    /// Label anchors and texts.
    pub labels: Vec<(Point, Arc<str>)>,
    /// Grid polylines.
    pub grid: Vec<Vec<Point>>,
    /// Title anchor and text.
    pub title: Option<(Point, Arc<str>)>,
}

/// An axis component.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisModel {
    /// Field the axis describes.
    pub field: FieldName,
    /// Normalized dimension the field is mapped on.
    pub dim: Dim,
    /// Side of the content region; `None` inside polar coordinates.
    pub side: Option<Side>,
    /// Ticks of the field's scale.
    pub ticks: Vec<Tick>,
    /// Title text, when shown.
    pub title: Option<Arc<str>>,
    /// Configuration.
    pub cfg: AxisCfg,
    /// Resolved label font size.
    pub label_font_size: f64,
    /// Resolved title font size.
    pub title_font_size: f64,
    /// Line and label color.
    pub color: Color,
    /// Grid color.
    pub grid_color: Color,
    /// Label rotation chosen at layout time.
    pub label_rotate: f64,
    /// Drawing, resolved after layout.
    pub geometry: AxisGeometry,
}

impl AxisModel {
    fn label_style(&self) -> TextStyle {
        TextStyle::new(self.label_font_size).with_fill(self.color)
    }

    /// Label rotation for the given space: the fixed rotation, else 45° if horizontal labels
    /// overflow their slots and auto-rotation is on, else 0.
    pub fn label_angle(&self, measurer: &dyn TextMeasurer, available: Rect) -> f64 {
        let Some(label) = &self.cfg.label else {
            return 0.0;
        };
        if let Some(r) = label.rotate {
            return r;
        }
        let horizontal = self.side.is_some_and(Side::is_horizontal);
        if !label.auto_rotate || !horizontal || self.ticks.is_empty() {
            return 0.0;
        }
        let slot = available.width().max(0.0) / self.ticks.len() as f64;
        let style = self.label_style();
        let widest = self
            .ticks
            .iter()
            .map(|t| measurer.measure(&t.text, &style).width)
            .fold(0.0_f64, f64::max);
        if widest > slot { FRAC_PI_4 } else { 0.0 }
    }

    /// Thickness of the axis perpendicular to its side.
    pub fn thickness(&self, measurer: &dyn TextMeasurer, available: Rect) -> f64 {
        let Some(side) = self.side else {
            return 0.0;
        };
        let mut out = if self.cfg.tick_line.is_some() {
            self.cfg.tick_length.abs()
        } else {
            0.0
        };
        if let Some(label) = &self.cfg.label {
            let theta = self.label_angle(measurer, available);
            let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
            let style = self.label_style();
            let mut extent = 0.0_f64;
            for tick in &self.ticks {
                let m = measurer.measure(&tick.text, &style);
                let e = if side.is_horizontal() {
                    sin * m.width + cos * m.height
                } else {
                    cos * m.width + sin * m.height
                };
                extent = extent.max(e);
            }
            out += label.offset.max(0.0) + extent;
        }
        if let (Some(title), Some(text)) = (&self.cfg.title, &self.title) {
            let m = measurer.measure(text, &TextStyle::new(self.title_font_size));
            out += title.offset.max(0.0) + m.height;
        }
        out
    }

    /// Size the axis requests inside `available`.
    pub fn measure(&self, measurer: &dyn TextMeasurer, available: Rect) -> Size {
        let t = self.thickness(measurer, available);
        match self.side {
            Some(side) if side.is_horizontal() => Size::new(available.width().max(0.0), t),
            Some(_) => Size::new(t, available.height().max(0.0)),
            None => Size::ZERO,
        }
    }

    fn normalized(&self, t: f64, across: f64) -> Point {
        match self.dim {
            Dim::X => Point::new(t, across),
            Dim::Y => Point::new(across, t),
        }
    }

    /// Resolves screen geometry against the final coordinate.
    pub fn resolve(&mut self, coord: &Coordinate, measurer: &dyn TextMeasurer, bbox: Rect) {
        self.label_rotate = self.label_angle(measurer, coord.region());
        let mut g = AxisGeometry::default();
        let tick_len = self.cfg.tick_line.map_or(0.0, |_| self.cfg.tick_length);
        let label_gap = tick_len + self.cfg.label.as_ref().map_or(0.0, |l| l.offset);

        match self.side {
            Some(side) => {
                let across = match side {
                    Side::Bottom | Side::Left => 0.0,
                    Side::Top | Side::Right => 1.0,
                };
                let out = match side {
                    Side::Bottom => Vec2::new(0.0, 1.0),
                    Side::Top => Vec2::new(0.0, -1.0),
                    Side::Left => Vec2::new(-1.0, 0.0),
                    Side::Right => Vec2::new(1.0, 0.0),
                };
                let label_dir = if !side.is_horizontal() && self.cfg.vertical_factor < 0.0 {
                    -out
                } else {
                    out
                };
                if self.cfg.line.is_some() {
                    g.line = alloc::vec![
                        coord.convert(self.normalized(0.0, across)),
                        coord.convert(self.normalized(1.0, across)),
                    ];
                }
                for tick in &self.ticks {
                    let p = coord.convert(self.normalized(tick.position, across));
                    if self.cfg.tick_line.is_some() {
                        g.ticks.push((p, p + out * tick_len));
                    }
                    if self.cfg.label.is_some() {
                        g.labels.push((p + label_dir * label_gap, Arc::from(tick.text.as_str())));
                    }
                    if self.cfg.grid.is_some() {
                        g.grid.push(alloc::vec![
                            coord.convert(self.normalized(tick.position, 0.0)),
                            coord.convert(self.normalized(tick.position, 1.0)),
                        ]);
                    }
                }
                if let Some(text) = &self.title {
                    let c = bbox.center();
                    let anchor = match side {
                        Side::Bottom => Point::new(c.x, bbox.y1),
                        Side::Top => Point::new(c.x, bbox.y0),
                        Side::Left => Point::new(bbox.x0, c.y),
                        Side::Right => Point::new(bbox.x1, c.y),
                    };
                    g.title = Some((anchor, text.clone()));
                }
            }
            None => self.resolve_polar(coord, label_gap, &mut g),
        }
        self.geometry = g;
    }

    fn resolve_polar(&self, coord: &Coordinate, label_gap: f64, g: &mut AxisGeometry) {
        const SAMPLES: usize = 48;
        let center = coord.center();
        let circle = |r: f64| -> Vec<Point> {
            (0..=SAMPLES)
                .map(|i| coord.convert(Point::new(i as f64 / SAMPLES as f64, r)))
                .collect()
        };
        match self.dim {
            // Angle axis: a circle at the outer radius, radial grid lines.
            Dim::X => {
                if self.cfg.line.is_some() {
                    g.line = circle(1.0);
                }
                for tick in &self.ticks {
                    let p = coord.convert(Point::new(tick.position, 1.0));
                    let dir = (p - center).normalize();
                    let dir = if dir.is_finite() { dir } else { Vec2::ZERO };
                    if self.cfg.label.is_some() {
                        g.labels.push((p + dir * label_gap, Arc::from(tick.text.as_str())));
                    }
                    if self.cfg.grid.is_some() {
                        g.grid.push(alloc::vec![
                            coord.convert(Point::new(tick.position, 0.0)),
                            p,
                        ]);
                    }
                }
            }
            // Radius axis: a spoke at the start angle, circular grid lines.
            Dim::Y => {
                if self.cfg.line.is_some() {
                    g.line = alloc::vec![
                        coord.convert(Point::new(0.0, 0.0)),
                        coord.convert(Point::new(0.0, 1.0)),
                    ];
                }
                for tick in &self.ticks {
                    let p = coord.convert(Point::new(0.0, tick.position));
                    if self.cfg.label.is_some() {
                        let anchor = p - Vec2::new(label_gap, 0.0);
                        g.labels.push((anchor, Arc::from(tick.text.as_str())));
                    }
                    if self.cfg.grid.is_some() {
                        g.grid.push(circle(tick.position));
                    }
                }
            }
        }
    }
}

/// A position field that may get an axis.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisField {
    /// Field name.
    pub field: FieldName,
    /// Dimension it is mapped on.
    pub dim: Dim,
    /// Second field on the same dimension (placed on the opposite side).
    pub secondary: bool,
}

fn default_side(dim: Dim, secondary: bool, transposed: bool) -> Side {
    match (dim, secondary, transposed) {
        (Dim::X, _, false) => Side::Bottom,
        (Dim::X, _, true) => Side::Left,
        (Dim::Y, false, false) => Side::Left,
        (Dim::Y, true, false) => Side::Right,
        (Dim::Y, false, true) => Side::Bottom,
        (Dim::Y, true, true) => Side::Top,
    }
}

/// Builds the axis components of a view.
///
/// Theta and helix coordinates carry no axes. Polar axes sit over the content region and
/// take no padding.
pub fn axis_components(
    view: ViewId,
    option: &AxesOption,
    fields: &[AxisField],
    registry: &ScaleRegistry,
    coordinate: &Coordinate,
    theme: &Theme,
) -> Vec<ComponentDescriptor> {
    if !option.enabled {
        return Vec::new();
    }
    if matches!(
        coordinate.kind(),
        CoordinateKind::Theta | CoordinateKind::Helix
    ) {
        return Vec::new();
    }
    let mut out = Vec::new();
    for f in fields {
        let cfg = match option.setting(&f.field) {
            Some(AxisSetting::Hidden) => continue,
            Some(AxisSetting::Cfg(cfg)) => cfg.clone(),
            None => AxisCfg::default(),
        };
        let Some(scale) = registry.get(view, &f.field) else {
            continue;
        };
        let side = if coordinate.is_polar() {
            None
        } else {
            let transposed = coordinate.is_transposed();
            Some(cfg.position.unwrap_or_else(|| default_side(f.dim, f.secondary, transposed)))
        };
        let title = cfg.title.as_ref().map(|t| {
            t.text
                .clone()
                .unwrap_or_else(|| Arc::from(scale.title()))
        });
        let mut ticks = scale.ticks();
        if let Some(fmt) = cfg.label.as_ref().and_then(|l| l.formatter.as_ref()) {
            for tick in &mut ticks {
                tick.text = (fmt.0)(&tick.value);
            }
        }
        let model = AxisModel {
            field: f.field.clone(),
            dim: f.dim,
            side,
            ticks,
            title,
            label_font_size: cfg
                .label
                .as_ref()
                .and_then(|l| l.font_size)
                .unwrap_or(theme.label_font_size),
            title_font_size: cfg
                .title
                .as_ref()
                .and_then(|t| t.font_size)
                .unwrap_or(theme.title_font_size),
            color: theme.axis_color,
            grid_color: theme.grid_color,
            label_rotate: 0.0,
            geometry: AxisGeometry::default(),
            cfg,
        };
        let id = ComponentId::new(view, &format!("axis-{}", f.field));
        let (direction, padding) = match side {
            Some(side) => (Direction::from(side), ComponentPadding::Auto),
            None => (Direction::None, ComponentPadding::Fixed(0.0)),
        };
        out.push(
            ComponentDescriptor::new(id, direction, ComponentModel::Axis(model))
                .with_layer(Layer::Background)
                .with_padding(padding),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use strata_core::Value;

    use super::*;
    use crate::coordinate::CoordinateOption;
    use crate::error::Diagnostics;
    use crate::measure::HeuristicTextMeasurer;
    use crate::scale::ScaleOption;

    fn registry() -> ScaleRegistry {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let xs: Vec<Value> = ["a", "b", "c"].into_iter().map(Value::from).collect();
        let ys = vec![Value::from(3.0), Value::from(12.0)];
        let option = ScaleOption::default();
        reg.resolve(ViewId::ROOT, &"x".into(), xs.iter(), &option, false, &mut diags);
        reg.resolve(ViewId::ROOT, &"y".into(), ys.iter(), &option, true, &mut diags);
        reg
    }

    fn fields() -> Vec<AxisField> {
        vec![
            AxisField {
                field: "x".into(),
                dim: Dim::X,
                secondary: false,
            },
            AxisField {
                field: "y".into(),
                dim: Dim::Y,
                secondary: false,
            },
        ]
    }

    fn components(option: &AxesOption, coord: &Coordinate) -> Vec<ComponentDescriptor> {
        axis_components(ViewId::ROOT, option, &fields(), &registry(), coord, &Theme::light())
    }

    fn axis(c: &ComponentDescriptor) -> &AxisModel {
        match &c.extra {
            ComponentModel::Axis(a) => a,
            _ => panic!("expected an axis"),
        }
    }

    #[test]
    fn rect_axes_sit_bottom_and_left() {
        let coord = Coordinate::rect(Rect::new(0.0, 0.0, 400.0, 300.0));
        let axes = components(&AxesOption::default(), &coord);
        assert_eq!(axes.len(), 2);
        assert_eq!(axes[0].direction, Direction::Bottom);
        assert_eq!(axes[1].direction, Direction::Left);
        assert_eq!(axis(&axes[0]).ticks.len(), 3);
    }

    #[test]
    fn transposed_axes_swap_sides() {
        let opt = CoordinateOption::default().transpose();
        let mut diags = Diagnostics::new();
        let region = Rect::new(0.0, 0.0, 400.0, 300.0);
        let coord = Coordinate::build(ViewId::ROOT, &opt, region, &mut diags);
        let axes = components(&AxesOption::default(), &coord);
        assert_eq!(axes[0].direction, Direction::Left);
        assert_eq!(axes[1].direction, Direction::Bottom);
    }

    #[test]
    fn hidden_axes_and_theta() {
        let coord = Coordinate::rect(Rect::new(0.0, 0.0, 400.0, 300.0));
        let opt = AxesOption::default().with_field("y", AxisSetting::Hidden);
        assert_eq!(components(&opt, &coord).len(), 1);
        assert!(components(&AxesOption::hidden(), &coord).is_empty());

        let mut diags = Diagnostics::new();
        let theta = Coordinate::build(
            ViewId::ROOT,
            &CoordinateOption::new(CoordinateKind::Theta),
            Rect::new(0.0, 0.0, 400.0, 300.0),
            &mut diags,
        );
        assert!(components(&AxesOption::default(), &theta).is_empty());
    }

    #[test]
    fn polar_axes_take_no_padding() {
        let mut diags = Diagnostics::new();
        let polar = Coordinate::build(
            ViewId::ROOT,
            &CoordinateOption::new(CoordinateKind::Polar),
            Rect::new(0.0, 0.0, 400.0, 300.0),
            &mut diags,
        );
        let axes = components(&AxesOption::default(), &polar);
        assert!(axes.iter().all(|a| a.direction == Direction::None));
        assert!(axes.iter().all(|a| a.padding == ComponentPadding::Fixed(0.0)));
    }

    #[test]
    fn long_labels_rotate_and_grow_the_axis() {
        let coord = Coordinate::rect(Rect::new(0.0, 0.0, 400.0, 300.0));
        let axes = components(&AxesOption::default(), &coord);
        let x = axis(&axes[0]);
        let m = HeuristicTextMeasurer;
        // Three one-letter labels fit easily in 400px.
        assert_eq!(x.label_angle(&m, coord.region()), 0.0);
        let flat = x.thickness(&m, coord.region());
        // 4 tick + 4 gap + 14.4 line height.
        assert!((flat - 22.4).abs() < 1e-9, "{flat}");

        // In 6px the labels overflow and rotate.
        let narrow = Rect::new(0.0, 0.0, 6.0, 300.0);
        assert!((x.label_angle(&m, narrow) - FRAC_PI_4).abs() < 1e-12);
        let rotated = x.thickness(&m, narrow);
        assert!(rotated > 8.0);
    }

    #[test]
    fn resolved_ticks_follow_the_coordinate() {
        let coord = Coordinate::rect(Rect::new(0.0, 0.0, 300.0, 300.0));
        let mut axes = components(&AxesOption::default(), &coord);
        let ComponentModel::Axis(x) = &mut axes[0].extra else {
            panic!("expected an axis");
        };
        x.resolve(&coord, &HeuristicTextMeasurer, Rect::new(0.0, 300.0, 300.0, 330.0));
        // Category "a" sits at the center of the first band, on the bottom edge.
        let (from, to) = x.geometry.ticks[0];
        assert!((from.x - 50.0).abs() < 1e-9);
        assert!((from.y - 300.0).abs() < 1e-9);
        assert!((to.y - 304.0).abs() < 1e-9);
        assert_eq!(&*x.geometry.labels[0].1, "a");
        assert_eq!(x.geometry.grid.len(), 3);
    }
}
