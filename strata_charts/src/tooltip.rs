// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tooltip and crosshair components, and the record lookup behind them.
//!
//! A screen point is inverted through the view's coordinate into normalized space, then through
//! the x scale into a domain value. Shared tooltips collect every record at that x across the
//! view's geometries; unshared ones pick the single nearest record.

extern crate alloc;

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::Point;
use peniko::Color;
use strata_core::{ComponentId, Datum, ElementKind, FieldName, Value, ViewId, VisualElement};

use crate::axis::LineStyle;
use crate::component::{
    ComponentDescriptor, ComponentModel, ComponentPadding, Direction, Layer, Side,
};
use crate::coordinate::Coordinate;
use crate::geometry::GeometryOption;
use crate::registry::ScaleRegistry;
use crate::scale::{Scale, ScaleType};
use crate::theme::Theme;

/// Which crosshair lines are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrosshairKind {
    /// A vertical line through the snapped x.
    #[default]
    X,
    /// A horizontal line through the snapped y.
    Y,
    /// Both.
    XY,
}

/// Crosshair settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CrosshairsCfg {
    /// Lines drawn.
    pub kind: CrosshairKind,
    /// Line style.
    pub line: LineStyle,
}

/// Tooltip configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct TooltipCfg {
    /// Follow the pointer.
    pub follow: bool,
    /// Show a title line.
    pub show_title: bool,
    /// Field whose value is the title; `None` uses the x value.
    pub title: Option<FieldName>,
    /// Fixed placement relative to the pointer.
    pub position: Option<Side>,
    /// Collect every record at the pointer's x; `None` shares.
    pub shared: Option<bool>,
    /// Draw crosshairs.
    pub show_crosshairs: bool,
    /// Crosshair settings.
    pub crosshairs: CrosshairsCfg,
    /// Mark the records on the plot.
    pub show_markers: bool,
    /// Distance from the pointer.
    pub offset: f64,
}

impl Default for TooltipCfg {
    fn default() -> Self {
        Self {
            follow: true,
            show_title: true,
            title: None,
            position: None,
            shared: None,
            show_crosshairs: false,
            crosshairs: CrosshairsCfg::default(),
            show_markers: true,
            offset: 20.0,
        }
    }
}

impl TooltipCfg {
    /// Sets sharing.
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Shows crosshairs of `kind`.
    pub fn with_crosshairs(mut self, kind: CrosshairKind) -> Self {
        self.show_crosshairs = true;
        self.crosshairs.kind = kind;
        self
    }

    /// Uses `field` for the title.
    pub fn with_title_field(mut self, field: impl Into<FieldName>) -> Self {
        self.title = Some(field.into());
        self
    }
}

/// A crosshair component.
#[derive(Clone, Debug, PartialEq)]
pub struct CrosshairModel {
    /// Settings.
    pub cfg: CrosshairsCfg,
    /// Resolved line color.
    pub color: Color,
}

/// One tooltip row.
#[derive(Clone, Debug, PartialEq)]
pub struct TooltipItem {
    /// View holding the record.
    pub view: ViewId,
    /// Geometry index within the view.
    pub geometry: u32,
    /// Record index within the geometry's data.
    pub row: usize,
    /// Title (shared by every item at one x).
    pub title: Arc<str>,
    /// Series name.
    pub name: Arc<str>,
    /// Formatted value.
    pub value: Arc<str>,
    /// Marker color.
    pub color: Color,
    /// Marker position in screen space.
    pub marker: Point,
    /// The record.
    pub datum: Datum,
}

/// One geometry's encoded state, as seen by a lookup.
#[derive(Clone, Copy, Debug)]
pub struct TooltipSource<'a> {
    /// Geometry index.
    pub index: u32,
    /// Declaration.
    pub option: &'a GeometryOption,
    /// Filtered data.
    pub data: &'a [Datum],
    /// Encoded elements of this geometry.
    pub elements: &'a [VisualElement],
}

/// Builds the tooltip (and crosshair) components of a view.
pub fn tooltip_components(
    view: ViewId,
    cfg: Option<&TooltipCfg>,
    theme: &Theme,
) -> Vec<ComponentDescriptor> {
    let Some(cfg) = cfg else {
        return Vec::new();
    };
    let mut out = alloc::vec![
        ComponentDescriptor::new(
            ComponentId::new(view, "tooltip"),
            Direction::None,
            ComponentModel::Tooltip(cfg.clone()),
        )
        .with_padding(ComponentPadding::Fixed(0.0)),
    ];
    if cfg.show_crosshairs {
        out.push(
            ComponentDescriptor::new(
                ComponentId::new(view, "crosshair"),
                Direction::None,
                ComponentModel::Crosshair(CrosshairModel {
                    cfg: cfg.crosshairs,
                    color: cfg.crosshairs.line.stroke.unwrap_or(theme.axis_color),
                }),
            )
            .with_layer(Layer::Foreground)
            .with_padding(ComponentPadding::Fixed(0.0)),
        );
    }
    out
}

struct Candidate {
    source: usize,
    row: usize,
    color: Color,
    marker: Point,
    x: f64,
}

fn value_text(scale: Option<&Scale>, v: &Value) -> Arc<str> {
    match scale {
        Some(s) if s.kind() == ScaleType::Time => Arc::from(s.tick_text(v, 1.0).as_str()),
        _ => Arc::from(format!("{v}").as_str()),
    }
}

fn is_series_element(el: &VisualElement) -> bool {
    matches!(el.kind, ElementKind::Line | ElementKind::Path | ElementKind::Area)
}

/// Finds the records under `point`.
///
/// Returns nothing when the point falls outside the coordinate's normalized square.
pub fn find_items(
    view: ViewId,
    cfg: &TooltipCfg,
    point: Point,
    coordinate: &Coordinate,
    registry: &ScaleRegistry,
    sources: &[TooltipSource<'_>],
) -> Vec<TooltipItem> {
    const EPS: f64 = 1e-9;
    let q = coordinate.invert(point);
    if !(-EPS..=1.0 + EPS).contains(&q.x) || !(-EPS..=1.0 + EPS).contains(&q.y) {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for (si, src) in sources.iter().enumerate() {
        if !src.option.tooltip || !src.option.visible {
            continue;
        }
        let Some(position) = &src.option.position else {
            continue;
        };
        let x_scale = position.x.as_ref().and_then(|f| registry.get(view, f));
        let y_scale = registry.get(view, &position.y);
        for el in src.elements.iter().filter(|e| e.kind != ElementKind::Label) {
            for &row in &el.rows {
                let Some(datum) = src.data.get(row) else {
                    continue;
                };
                let x = match (&position.x, x_scale) {
                    (None, _) => Some(0.5),
                    (Some(f), Some(s)) => datum.get(f).and_then(|v| s.map(v)),
                    (Some(_), None) => None,
                };
                let Some(x) = x else {
                    continue;
                };
                let marker = if el.rows.len() == 1 && !is_series_element(el) {
                    el.shape.bounds().center()
                } else {
                    let y = y_scale
                        .zip(datum.get(&position.y))
                        .and_then(|(s, v)| s.map(v))
                        .unwrap_or(0.0);
                    coordinate.convert(Point::new(x, y))
                };
                candidates.push(Candidate {
                    source: si,
                    row,
                    color: el.color,
                    marker,
                    x,
                });
            }
        }
    }
    if candidates.is_empty() {
        return Vec::new();
    }

    let picked: Vec<&Candidate> = if cfg.shared.unwrap_or(true) {
        let nearest = candidates
            .iter()
            .map(|c| c.x)
            .min_by(|a, b| (a - q.x).abs().total_cmp(&(b - q.x).abs()))
            .unwrap_or(q.x);
        candidates
            .iter()
            .filter(|c| (c.x - nearest).abs() < EPS)
            .collect()
    } else {
        candidates
            .iter()
            .min_by(|a, b| {
                (a.marker - point)
                    .hypot2()
                    .total_cmp(&(b.marker - point).hypot2())
            })
            .into_iter()
            .collect()
    };

    let mut out = Vec::with_capacity(picked.len());
    for c in picked {
        let src = &sources[c.source];
        let Some(position) = &src.option.position else {
            continue;
        };
        let Some(datum) = src.data.get(c.row) else {
            continue;
        };
        let title = match (&cfg.title, &position.x) {
            (Some(f), _) | (None, Some(f)) => datum
                .get(f)
                .map(|v| value_text(registry.get(view, f), v))
                .unwrap_or_else(|| Arc::from("")),
            (None, None) => Arc::from(""),
        };
        let y_scale = registry.get(view, &position.y);
        let series = src
            .option
            .color
            .as_ref()
            .and_then(crate::channel::Channel::scaled_field)
            .filter(|f| registry.get(view, f).is_some_and(|s| s.kind().is_categorical()))
            .and_then(|f| datum.get(f));
        let name = match series {
            Some(v) => Arc::from(format!("{v}").as_str()),
            None => Arc::from(y_scale.map_or(&*position.y, Scale::title)),
        };
        let value = datum
            .get(&position.y)
            .map(|v| value_text(y_scale, v))
            .unwrap_or_else(|| Arc::from(""));
        out.push(TooltipItem {
            view,
            geometry: src.index,
            row: c.row,
            title,
            name,
            value,
            color: c.color,
            marker: c.marker,
            datum: datum.clone(),
        });
    }
    tracing::trace!(%view, items = out.len(), "tooltip lookup");
    out
}

/// Snaps a pointer to the first tooltip item along the crosshair's dimensions.
pub fn crosshair_point(kind: CrosshairKind, point: Point, items: &[TooltipItem]) -> Option<Point> {
    let marker = items.first()?.marker;
    Some(match kind {
        CrosshairKind::X => Point::new(marker.x, point.y),
        CrosshairKind::Y => Point::new(point.x, marker.y),
        CrosshairKind::XY => marker,
    })
}
