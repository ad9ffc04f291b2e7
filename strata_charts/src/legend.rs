// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legend components.
//!
//! A legend is derived from the color (or shape) field of a view's geometries. Categorical
//! scales give one item per category; continuous color scales give a ramp with its extent.

extern crate alloc;

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};
use peniko::Color;
use strata_core::{AnimateOption, ComponentId, Datum, FieldName, Value, ViewId};
use strata_transforms::FieldFilter;

use crate::channel::Channel;
use crate::component::{ComponentDescriptor, ComponentModel, Direction};
#[cfg(not(feature = "std"))]
use crate::float::FloatExt;
use crate::geometry::{GeometryKind, GeometryOption};
use crate::measure::{TextMeasurer, TextStyle};
use crate::registry::ScaleRegistry;
use crate::scale::Scale;
use crate::theme::{Theme, lerp_color};

/// Item flow direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendLayout {
    /// Items in rows, wrapping at the maximum width.
    Horizontal,
    /// Items in a column.
    Vertical,
}

/// A legend entry.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendItem {
    /// Displayed name.
    pub name: Arc<str>,
    /// Category value.
    pub value: Value,
    /// Marker color.
    pub color: Color,
    /// Marker shape.
    pub marker: Arc<str>,
    /// Filtered out of the view.
    pub unchecked: bool,
}

impl LegendItem {
    /// Creates a checked item.
    pub fn new(name: impl Into<Arc<str>>, color: Color) -> Self {
        let name = name.into();
        Self {
            value: Value::Text(name.clone()),
            name,
            color,
            marker: Arc::from("circle"),
            unchecked: false,
        }
    }
}

/// Configuration of one legend.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendCfg {
    /// Placement.
    pub position: Direction,
    /// Item flow; `None` follows the position.
    pub layout: Option<LegendLayout>,
    /// Title; `None` hides it.
    pub title: Option<Arc<str>>,
    /// Gap between items; `None` uses the theme.
    pub item_spacing: Option<f64>,
    /// Fixed item width.
    pub item_width: Option<f64>,
    /// Fixed item height.
    pub item_height: Option<f64>,
    /// Maximum legend width.
    pub max_width: Option<f64>,
    /// Maximum legend height.
    pub max_height: Option<f64>,
    /// Reverse item order.
    pub reversed: bool,
    /// Use `items` instead of the scale's categories.
    pub custom: bool,
    /// Custom items.
    pub items: Vec<LegendItem>,
    /// Marker shape override.
    pub marker: Option<Arc<str>>,
    /// Page overflowing items instead of growing.
    pub flip_page: bool,
    /// Horizontal nudge applied after layout.
    pub offset_x: f64,
    /// Vertical nudge applied after layout.
    pub offset_y: f64,
    /// Whether the legend animates.
    pub animate: bool,
    /// Animation overrides.
    pub animate_option: Option<AnimateOption>,
}

impl Default for LegendCfg {
    fn default() -> Self {
        Self {
            position: Direction::Bottom,
            layout: None,
            title: None,
            item_spacing: None,
            item_width: None,
            item_height: None,
            max_width: None,
            max_height: None,
            reversed: false,
            custom: false,
            items: Vec::new(),
            marker: None,
            flip_page: true,
            offset_x: 0.0,
            offset_y: 0.0,
            animate: true,
            animate_option: None,
        }
    }
}

impl LegendCfg {
    /// Sets the position.
    pub fn with_position(mut self, position: Direction) -> Self {
        self.position = position;
        self
    }

    /// Sets the item flow.
    pub fn with_layout(mut self, layout: LegendLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<Arc<str>>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the maximum width.
    pub fn with_max_width(mut self, width: f64) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Sets the maximum height.
    pub fn with_max_height(mut self, height: f64) -> Self {
        self.max_height = Some(height);
        self
    }

    /// Reverses item order.
    pub fn with_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Replaces the items with custom ones.
    pub fn with_custom_items(mut self, items: impl IntoIterator<Item = LegendItem>) -> Self {
        self.custom = true;
        self.items = items.into_iter().collect();
        self
    }

    /// Sets the nudge offsets.
    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    fn resolved_layout(&self) -> LegendLayout {
        self.layout.unwrap_or(if self.position.is_horizontal() {
            LegendLayout::Horizontal
        } else {
            LegendLayout::Vertical
        })
    }
}

/// Per-field legend setting.
#[derive(Clone, Debug, PartialEq)]
pub enum LegendSetting {
    /// No legend for the field.
    Hidden,
    /// A legend with this configuration.
    Cfg(LegendCfg),
}

/// The `legends` option of a view.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendsOption {
    /// `false` hides every legend of the view.
    pub enabled: bool,
    /// Configuration applied to every legend without a per-field setting.
    pub cfg: LegendCfg,
    /// Per-field settings.
    pub fields: Vec<(FieldName, LegendSetting)>,
}

impl Default for LegendsOption {
    fn default() -> Self {
        Self {
            enabled: true,
            cfg: LegendCfg::default(),
            fields: Vec::new(),
        }
    }
}

impl LegendsOption {
    /// All legends hidden.
    pub fn hidden() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the shared configuration.
    pub fn with_cfg(mut self, cfg: LegendCfg) -> Self {
        self.cfg = cfg;
        self
    }

    /// Configures the legend of `field`.
    pub fn with_field(mut self, field: impl Into<FieldName>, setting: LegendSetting) -> Self {
        let field = field.into();
        self.fields.retain(|(f, _)| *f != field);
        self.fields.push((field, setting));
        self
    }

    fn setting(&self, field: &str) -> Option<&LegendSetting> {
        self.fields
            .iter()
            .find(|(f, _)| &**f == field)
            .map(|(_, s)| s)
    }
}

/// A continuous color ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousLegend {
    /// Domain minimum text.
    pub min: Arc<str>,
    /// Domain maximum text.
    pub max: Arc<str>,
    /// Ramp endpoint colors.
    pub colors: (Color, Color),
}

/// A legend component.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendModel {
    /// Field the legend describes.
    pub field: FieldName,
    /// Title, when shown.
    pub title: Option<Arc<str>>,
    /// Categorical items.
    pub items: Vec<LegendItem>,
    /// Continuous ramp, for continuous color scales.
    pub continuous: Option<ContinuousLegend>,
    /// Configuration.
    pub cfg: LegendCfg,
    /// Marker size.
    pub marker_size: f64,
    /// Item text size.
    pub font_size: f64,
    /// Text color.
    pub text_color: Color,
    /// Gap between horizontal items unless the config sets one.
    pub item_spacing: f64,
    /// Item bounds, resolved after layout.
    pub item_bounds: Vec<Rect>,
    /// Number of pages when items overflow with paging on.
    pub pages: usize,
}

const MARKER_GAP: f64 = 4.0;
const LINE_GAP: f64 = 4.0;
const RAIL_LENGTH: f64 = 160.0;
const RAIL_THICKNESS: f64 = 12.0;

struct Flow {
    items: Vec<Rect>,
    size: Size,
    pages: usize,
}

impl LegendModel {
    /// Layout direction.
    pub fn layout(&self) -> LegendLayout {
        self.cfg.resolved_layout()
    }

    fn text_style(&self) -> TextStyle {
        TextStyle::new(self.font_size).with_fill(self.text_color)
    }

    fn spacing(&self, theme_spacing: f64) -> f64 {
        self.cfg.item_spacing.unwrap_or(theme_spacing)
    }

    fn title_height(&self, measurer: &dyn TextMeasurer) -> (f64, f64) {
        match &self.title {
            Some(t) => {
                let m = measurer.measure(t, &self.text_style());
                (m.width, m.height + LINE_GAP)
            }
            None => (0.0, 0.0),
        }
    }

    /// Lays items out relative to the origin.
    fn flow(&self, measurer: &dyn TextMeasurer, available: Rect) -> Flow {
        let style = self.text_style();
        let (title_w, title_h) = self.title_height(measurer);
        let max_w = self.cfg.max_width.unwrap_or(available.width()).max(0.0);
        let max_h = self.cfg.max_height.unwrap_or(available.height()).max(0.0);

        if let Some(c) = &self.continuous {
            let tw = measurer
                .measure(&c.min, &style)
                .width
                .max(measurer.measure(&c.max, &style).width);
            let th = 1.2 * self.font_size;
            let size = match self.layout() {
                LegendLayout::Horizontal => Size::new(
                    RAIL_LENGTH.min(max_w).max(title_w),
                    title_h + RAIL_THICKNESS + LINE_GAP + th,
                ),
                LegendLayout::Vertical => Size::new(
                    (RAIL_THICKNESS + MARKER_GAP + tw).max(title_w),
                    title_h + RAIL_LENGTH.min(max_h),
                ),
            };
            return Flow {
                items: Vec::new(),
                size,
                pages: 1,
            };
        }

        let item_h = self
            .cfg
            .item_height
            .unwrap_or_else(|| self.marker_size.max(1.2 * self.font_size));
        let widths: Vec<f64> = self
            .items
            .iter()
            .map(|item| {
                self.cfg.item_width.unwrap_or_else(|| {
                    self.marker_size + MARKER_GAP + measurer.measure(&item.name, &style).width
                })
            })
            .collect();

        let mut rects = Vec::with_capacity(widths.len());
        let (mut width, mut height) = (0.0_f64, 0.0_f64);
        match self.layout() {
            LegendLayout::Horizontal => {
                let spacing = self.spacing(self.item_spacing);
                let (mut x, mut y) = (0.0, title_h);
                for w in &widths {
                    if x > 0.0 && x + w > max_w {
                        x = 0.0;
                        y += item_h + LINE_GAP;
                    }
                    rects.push(Rect::new(x, y, x + w, y + item_h));
                    width = width.max(x + w);
                    x += w + spacing;
                }
                if !rects.is_empty() {
                    height = y + item_h;
                }
            }
            LegendLayout::Vertical => {
                let spacing = self.spacing(LINE_GAP);
                let mut y = title_h;
                for w in &widths {
                    rects.push(Rect::new(0.0, y, *w, y + item_h));
                    width = width.max(*w);
                    height = y + item_h;
                    y += item_h + spacing;
                }
            }
        }
        width = width.max(title_w);
        height = height.max(title_h);

        let mut pages = 1;
        if self.cfg.flip_page && height > max_h && max_h > 0.0 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "positive page count"
            )]
            let n = (height / max_h).ceil() as usize;
            pages = n.max(1);
            height = max_h;
        }
        Flow {
            items: rects,
            size: Size::new(width, height),
            pages,
        }
    }

    /// Size the legend requests inside `available`.
    pub fn measure(&self, measurer: &dyn TextMeasurer, available: Rect) -> Size {
        self.flow(measurer, available).size
    }

    /// Resolves item bounds inside the arranged `bbox`.
    pub fn resolve(&mut self, measurer: &dyn TextMeasurer, available: Rect, bbox: Rect) {
        let flow = self.flow(measurer, available);
        let origin = Point::new(bbox.x0 + self.cfg.offset_x, bbox.y0 + self.cfg.offset_y);
        self.item_bounds = flow
            .items
            .into_iter()
            .map(|r| r + origin.to_vec2())
            .collect();
        self.pages = flow.pages;
    }
}

fn marker_for(kind: &GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Line | GeometryKind::Path => "line",
        GeometryKind::Interval
        | GeometryKind::Area
        | GeometryKind::Heatmap
        | GeometryKind::Polygon => "square",
        GeometryKind::Point | GeometryKind::Custom(_) => "circle",
    }
}

fn category_color(channel: Option<&Channel<Color>>, field: &str, i: usize, theme: &Theme) -> Color {
    match channel {
        Some(Channel::Field { field: f, values }) if &**f == field => match values.as_deref() {
            Some(vs) if !vs.is_empty() => vs[i % vs.len()],
            _ => theme.color_at(i),
        },
        Some(Channel::Const(c)) => *c,
        _ => theme.default_color,
    }
}

fn category_marker(
    channel: Option<&Channel<Arc<str>>>,
    field: &str,
    i: usize,
    fallback: &'static str,
    theme: &Theme,
) -> Arc<str> {
    match channel {
        Some(Channel::Field { field: f, values }) if &**f == field => match values.as_deref() {
            Some(vs) if !vs.is_empty() => vs[i % vs.len()].clone(),
            _ => theme.shape_at(i),
        },
        Some(Channel::Const(s)) => s.clone(),
        _ => Arc::from(fallback),
    }
}

fn categorical_items(
    scale: &Scale,
    geometry: &GeometryOption,
    cfg: &LegendCfg,
    filters: &[FieldFilter],
    theme: &Theme,
) -> Vec<LegendItem> {
    let crate::scale::Domain::Categorical(values) = scale.domain() else {
        return Vec::new();
    };
    let field = scale.field();
    let fallback = marker_for(&geometry.kind);
    let mut items: Vec<LegendItem> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let probe = Datum::new().with(field.clone(), v.clone());
            LegendItem {
                name: Arc::from(scale.tick_text(v, 0.0).as_str()),
                value: v.clone(),
                color: category_color(geometry.color.as_ref(), field, i, theme),
                marker: cfg.marker.clone().unwrap_or_else(|| {
                    category_marker(geometry.shape.as_ref(), field, i, fallback, theme)
                }),
                unchecked: filters
                    .iter()
                    .filter(|f| f.field == *field)
                    .any(|f| !f.eval(&probe)),
            }
        })
        .collect();
    if cfg.reversed {
        items.reverse();
    }
    items
}

/// Builds the legend components of a view.
///
/// One legend per distinct color or shape field, in geometry declaration order. `filters` mark
/// the categories they exclude as unchecked.
pub fn legend_components(
    view: ViewId,
    option: &LegendsOption,
    geometries: &[GeometryOption],
    filters: &[FieldFilter],
    registry: &ScaleRegistry,
    theme: &Theme,
) -> Vec<ComponentDescriptor> {
    if !option.enabled {
        return Vec::new();
    }
    let mut seen: Vec<FieldName> = Vec::new();
    let mut out = Vec::new();
    for geometry in geometries.iter().filter(|g| g.visible) {
        let fields = [
            geometry.color.as_ref().and_then(Channel::scaled_field),
            geometry.shape.as_ref().and_then(Channel::scaled_field),
        ];
        for field in fields.into_iter().flatten() {
            if seen.contains(field) {
                continue;
            }
            seen.push(field.clone());
            let cfg = match option.setting(field) {
                Some(LegendSetting::Hidden) => continue,
                Some(LegendSetting::Cfg(cfg)) => cfg.clone(),
                None => option.cfg.clone(),
            };
            let Some(scale) = registry.get(view, field) else {
                continue;
            };
            let (items, continuous) = if cfg.custom {
                (cfg.items.clone(), None)
            } else if scale.kind().is_categorical() {
                (categorical_items(scale, geometry, &cfg, filters, theme), None)
            } else if let Some((min, max)) = scale.domain().extent() {
                let colors = match &geometry.color {
                    Some(Channel::Field {
                        values: Some(vs), ..
                    }) if !vs.is_empty() => (vs[0], vs[vs.len() - 1]),
                    _ => (theme.ramp(0.0), theme.ramp(1.0)),
                };
                let ramp = ContinuousLegend {
                    min: Arc::from(scale.tick_text(&Value::Number(min), max - min).as_str()),
                    max: Arc::from(scale.tick_text(&Value::Number(max), max - min).as_str()),
                    colors,
                };
                (Vec::new(), Some(ramp))
            } else {
                continue;
            };
            let model = LegendModel {
                field: field.clone(),
                title: cfg.title.clone(),
                items,
                continuous,
                marker_size: theme.legend_marker_size,
                font_size: theme.label_font_size,
                text_color: theme.text_color,
                item_spacing: theme.legend_item_spacing,
                item_bounds: Vec::new(),
                pages: 1,
                cfg,
            };
            let id = ComponentId::new(view, &format!("legend-{field}"));
            out.push(ComponentDescriptor::new(
                id,
                model.cfg.position,
                ComponentModel::Legend(model),
            ));
        }
    }
    out
}

/// Color of a continuous legend at `t` in `[0, 1]`.
pub fn ramp_color(legend: &ContinuousLegend, t: f64) -> Color {
    lerp_color(legend.colors.0, legend.colors.1, t)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;
    use crate::error::Diagnostics;
    use crate::measure::HeuristicTextMeasurer;
    use crate::scale::ScaleOption;

    fn setup(categories: &[&str]) -> (ScaleRegistry, Vec<GeometryOption>) {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let vals: Vec<Value> = categories.iter().map(|c| Value::from(*c)).collect();
        let option = ScaleOption::default();
        reg.resolve(ViewId::ROOT, &"kind".into(), vals.iter(), &option, false, &mut diags);
        let geoms = vec![
            GeometryOption::interval()
                .with_position("x*y")
                .with_color_field("kind"),
        ];
        (reg, geoms)
    }

    fn legend(c: &ComponentDescriptor) -> &LegendModel {
        match &c.extra {
            ComponentModel::Legend(l) => l,
            _ => panic!("expected a legend"),
        }
    }

    #[test]
    fn categorical_items_follow_the_palette() {
        let (reg, geoms) = setup(&["a", "b", "c"]);
        let theme = Theme::light();
        let all = LegendsOption::default();
        let out = legend_components(ViewId::ROOT, &all, &geoms, &[], &reg, &theme);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].direction, Direction::Bottom);
        let l = legend(&out[0]);
        assert_eq!(l.items.len(), 3);
        assert_eq!(l.items[1].color, theme.color_at(1));
        assert_eq!(&*l.items[0].marker, "square");
    }

    #[test]
    fn filtered_categories_are_unchecked() {
        let (reg, geoms) = setup(&["a", "b"]);
        let filters = [FieldFilter::one_of("kind", [Value::from("a")])];
        let all = LegendsOption::default();
        let out = legend_components(ViewId::ROOT, &all, &geoms, &filters, &reg, &Theme::light());
        let l = legend(&out[0]);
        assert!(!l.items[0].unchecked);
        assert!(l.items[1].unchecked);
    }

    #[test]
    fn hidden_and_custom_legends() {
        let (reg, geoms) = setup(&["a", "b"]);
        let off = LegendsOption::default().with_field("kind", LegendSetting::Hidden);
        let theme = Theme::light();
        assert!(legend_components(ViewId::ROOT, &off, &geoms, &[], &reg, &theme).is_empty());

        let custom = LegendsOption::default().with_cfg(
            LegendCfg::default()
                .with_custom_items([LegendItem::new("only", peniko::color::palette::css::RED)]),
        );
        let out = legend_components(ViewId::ROOT, &custom, &geoms, &[], &reg, &Theme::light());
        assert_eq!(legend(&out[0]).items.len(), 1);
    }

    #[test]
    fn horizontal_items_wrap_at_max_width() {
        let (reg, geoms) = setup(&["aaaa", "bbbb", "cccc"]);
        let cfg = LegendCfg::default().with_max_width(100.0);
        let option = LegendsOption::default().with_cfg(cfg);
        let out = legend_components(ViewId::ROOT, &option, &geoms, &[], &reg, &Theme::light());
        let l = legend(&out[0]);
        let m = HeuristicTextMeasurer;
        // Items are 8 + 4 + 28.8 = 40.8 wide; two plus spacing exceed 100, so each wraps.
        let size = l.measure(&m, Rect::new(0.0, 0.0, 400.0, 300.0));
        assert!((size.width - 40.8).abs() < 1e-9, "{size:?}");
        let row = 14.4;
        assert!((size.height - (3.0 * row + 2.0 * LINE_GAP)).abs() < 1e-9, "{size:?}");
    }

    #[test]
    fn vertical_overflow_pages() {
        let names: Vec<std::string::String> = (0..20).map(|i| std::format!("item{i}")).collect();
        let refs: Vec<&str> = names.iter().map(std::string::String::as_str).collect();
        let (reg, geoms) = setup(&refs);
        let cfg = LegendCfg::default()
            .with_position(Direction::Right)
            .with_max_height(100.0);
        let option = LegendsOption::default().with_cfg(cfg);
        let out = legend_components(ViewId::ROOT, &option, &geoms, &[], &reg, &Theme::light());
        let mut l = legend(&out[0]).clone();
        let m = HeuristicTextMeasurer;
        let avail = Rect::new(0.0, 0.0, 400.0, 300.0);
        assert_eq!(l.layout(), LegendLayout::Vertical);
        let size = l.measure(&m, avail);
        assert!((size.height - 100.0).abs() < 1e-9);
        l.resolve(&m, avail, Rect::new(10.0, 20.0, 60.0, 120.0));
        assert!(l.pages > 1);
        assert!((l.item_bounds[0].y0 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn continuous_color_gets_a_ramp() {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let vals = [Value::from(1.0), Value::from(9.0)];
        let option = ScaleOption::default();
        reg.resolve(ViewId::ROOT, &"t".into(), vals.iter(), &option, false, &mut diags);
        let geoms = vec![GeometryOption::point().with_position("x*y").with_color_field("t")];
        let theme = Theme::light();
        let all = LegendsOption::default();
        let out = legend_components(ViewId::ROOT, &all, &geoms, &[], &reg, &theme);
        let l = legend(&out[0]);
        let ramp = l.continuous.as_ref().expect("continuous legend");
        assert_eq!(ramp.colors.0, theme.ramp(0.0));
        assert_eq!(ramp_color(ramp, 1.0), theme.ramp(1.0));
    }
}
