// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry declarations and the encoder that turns them into visual elements.
//!
//! Encoding runs in two phases so that scales can be synchronized in between:
//!
//! - [`prepare`] works in value space: grouping, sorting, stacking, and collecting the values
//!   each scale must observe.
//! - [`encode`] runs after layout: it maps values through the final scales and the
//!   coordinate, applies dodge and jitter in normalized space, and emits keyed elements.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;

use kurbo::{Point, Vec2};
use peniko::Color;
use smallvec::SmallVec;
use strata_core::{
    AnimateOption, Datum, ElementKey, ElementKind, ElementShape, ElementStyle, FieldName, KeyId,
    Value, ValueKey, ViewId, VisualElement,
};
use strata_transforms::{
    AdjustKind, AdjustOption, StackInput, StackOffset, dodge, first_seen_ranks, jitter, stack,
};

use crate::channel::{Channel, Position};
use crate::coordinate::Coordinate;
use crate::error::{ConfigError, DataError, Diagnostics};
use crate::registry::ScaleRegistry;
use crate::scale::Scale;
use crate::theme::Theme;

/// Geometry kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Bars, columns, pie slices.
    Interval,
    /// One path per group, sorted by x.
    Line,
    /// One path per group, in data order.
    Path,
    /// One symbol per datum.
    Point,
    /// One filled region per group.
    Area,
    /// One cell per datum.
    Polygon,
    /// One colored cell per datum.
    Heatmap,
    /// A kind without a dedicated encoder; encoded as points.
    Custom(Arc<str>),
}

impl GeometryKind {
    /// Parses a kind name. Unknown names become [`GeometryKind::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "interval" => Self::Interval,
            "line" => Self::Line,
            "path" => Self::Path,
            "point" => Self::Point,
            "area" => Self::Area,
            "polygon" => Self::Polygon,
            "heatmap" => Self::Heatmap,
            other => Self::Custom(other.into()),
        }
    }

    /// Kind name.
    pub fn name(&self) -> &str {
        match self {
            Self::Interval => "interval",
            Self::Line => "line",
            Self::Path => "path",
            Self::Point => "point",
            Self::Area => "area",
            Self::Polygon => "polygon",
            Self::Heatmap => "heatmap",
            Self::Custom(name) => name,
        }
    }

    /// Element kind produced by this geometry.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            Self::Interval => ElementKind::Interval,
            Self::Line => ElementKind::Line,
            Self::Path => ElementKind::Path,
            Self::Point | Self::Custom(_) => ElementKind::Point,
            Self::Area => ElementKind::Area,
            Self::Polygon | Self::Heatmap => ElementKind::Polygon,
        }
    }

    /// Whether the `y` scale of this geometry must contain zero.
    pub fn includes_zero(&self) -> bool {
        matches!(self, Self::Interval | Self::Area)
    }

    /// Shape name used when no shape channel is declared.
    pub fn default_shape(&self) -> &'static str {
        match self {
            Self::Interval | Self::Heatmap => "rect",
            Self::Line | Self::Path => "line",
            Self::Area => "area",
            Self::Polygon => "polygon",
            Self::Point | Self::Custom(_) => "circle",
        }
    }
}

/// Per-datum text labels.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelOption {
    /// Label text.
    pub content: Channel<Arc<str>>,
    /// Distance above the anchor, in pixels.
    pub offset: f64,
    /// Font size; defaults to the theme's label size.
    pub font_size: Option<f64>,
}

impl LabelOption {
    /// Labels showing the value of `field`.
    pub fn field(field: impl Into<FieldName>) -> Self {
        Self {
            content: Channel::field(field),
            offset: 8.0,
            font_size: None,
        }
    }

    /// Labels computed from raw field values.
    pub fn callback<I, F>(fields: I, f: impl Fn(&[&Value]) -> Arc<str> + 'static) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldName>,
    {
        Self {
            content: Channel::callback(fields, f),
            offset: 8.0,
            font_size: None,
        }
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the font size.
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    fn text(&self, datum: &Datum) -> Arc<str> {
        match &self.content {
            Channel::Const(text) => text.clone(),
            Channel::Field { field, .. } => match datum.get(field) {
                Some(v) => alloc::format!("{v}").into(),
                None => Arc::from(""),
            },
            Channel::Callback { fields, f } => f.call(fields, datum),
        }
    }
}

/// A declared geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryOption {
    /// Kind.
    pub kind: GeometryKind,
    /// Position channel; mandatory.
    pub position: Option<Position>,
    /// Color channel.
    pub color: Option<Channel<Color>>,
    /// Shape channel.
    pub shape: Option<Channel<Arc<str>>>,
    /// Size channel (point radius, line width).
    pub size: Option<Channel<f64>>,
    /// Adjusts, applied in order.
    pub adjust: Vec<AdjustOption>,
    /// Base style.
    pub style: Option<ElementStyle>,
    /// Named state styles.
    pub state: Vec<(Arc<str>, ElementStyle)>,
    /// Labels.
    pub label: Option<LabelOption>,
    /// Whether the geometry contributes tooltip items.
    pub tooltip: bool,
    /// Fields listed in tooltips; empty lists the position and color fields.
    pub tooltip_fields: Vec<FieldName>,
    /// Animations; `None` uses the theme's.
    pub animate: Option<AnimateOption>,
    /// Identity field for element keys; defaults to the datum index.
    pub key: Option<FieldName>,
    /// Sort data by x before encoding.
    pub sortable: bool,
    /// Whether anything is emitted.
    pub visible: bool,
    /// Keep one continuous path across missing values.
    pub connect_nulls: bool,
}

impl GeometryOption {
    /// Creates a geometry of `kind` with no channels.
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            position: None,
            color: None,
            shape: None,
            size: None,
            adjust: Vec::new(),
            style: None,
            state: Vec::new(),
            label: None,
            tooltip: true,
            tooltip_fields: Vec::new(),
            animate: None,
            key: None,
            sortable: false,
            visible: true,
            connect_nulls: false,
        }
    }

    /// An interval geometry.
    pub fn interval() -> Self {
        Self::new(GeometryKind::Interval)
    }

    /// A line geometry.
    pub fn line() -> Self {
        Self::new(GeometryKind::Line)
    }

    /// A path geometry.
    pub fn path() -> Self {
        Self::new(GeometryKind::Path)
    }

    /// A point geometry.
    pub fn point() -> Self {
        Self::new(GeometryKind::Point)
    }

    /// An area geometry.
    pub fn area() -> Self {
        Self::new(GeometryKind::Area)
    }

    /// A polygon geometry.
    pub fn polygon() -> Self {
        Self::new(GeometryKind::Polygon)
    }

    /// A heatmap geometry.
    pub fn heatmap() -> Self {
        Self::new(GeometryKind::Heatmap)
    }

    /// Sets `position` from `"x*y"` or `"y"`. An unparsable spec leaves no position.
    pub fn with_position(mut self, spec: &str) -> Self {
        self.position = Position::parse(spec);
        self
    }

    /// Sets the color channel.
    pub fn with_color(mut self, color: Channel<Color>) -> Self {
        self.color = Some(color);
        self
    }

    /// Colors by a field with theme outputs.
    pub fn with_color_field(self, field: impl Into<FieldName>) -> Self {
        self.with_color(Channel::field(field))
    }

    /// Sets the shape channel.
    pub fn with_shape(mut self, shape: Channel<Arc<str>>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Sets the size channel.
    pub fn with_size(mut self, size: Channel<f64>) -> Self {
        self.size = Some(size);
        self
    }

    /// Appends an adjust.
    pub fn with_adjust(mut self, adjust: AdjustOption) -> Self {
        self.adjust.push(adjust);
        self
    }

    /// Sets the base style.
    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Adds a named state style.
    pub fn with_state(mut self, name: impl Into<Arc<str>>, style: ElementStyle) -> Self {
        self.state.push((name.into(), style));
        self
    }

    /// Sets labels.
    pub fn with_label(mut self, label: LabelOption) -> Self {
        self.label = Some(label);
        self
    }

    /// Enables or disables tooltips.
    pub fn with_tooltip(mut self, tooltip: bool) -> Self {
        self.tooltip = tooltip;
        self
    }

    /// Lists tooltip fields.
    pub fn with_tooltip_fields<F: Into<FieldName>>(
        mut self,
        fields: impl IntoIterator<Item = F>,
    ) -> Self {
        self.tooltip_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets animations.
    pub fn with_animate(mut self, animate: AnimateOption) -> Self {
        self.animate = Some(animate);
        self
    }

    /// Sets the identity field.
    pub fn with_key(mut self, field: impl Into<FieldName>) -> Self {
        self.key = Some(field.into());
        self
    }

    /// Sorts data by x before encoding.
    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Shows or hides the geometry.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Keeps paths continuous across missing values.
    pub fn with_connect_nulls(mut self, connect: bool) -> Self {
        self.connect_nulls = connect;
        self
    }

    /// Fields that are mapped through scales, in declaration order, deduplicated.
    pub fn scaled_fields(&self) -> Vec<FieldName> {
        let mut out: Vec<FieldName> = Vec::new();
        let channels = [
            self.color.as_ref().and_then(Channel::scaled_field),
            self.shape.as_ref().and_then(Channel::scaled_field),
            self.size.as_ref().and_then(Channel::scaled_field),
        ];
        let position = self.position.iter().flat_map(Position::fields);
        for field in position.chain(channels.into_iter().flatten()) {
            if !out.contains(field) {
                out.push(field.clone());
            }
        }
        out
    }

    /// Fields listed in tooltips.
    pub fn tooltip_field_list(&self) -> Vec<FieldName> {
        if !self.tooltip_fields.is_empty() {
            return self.tooltip_fields.clone();
        }
        let mut out: Vec<FieldName> = self
            .position
            .iter()
            .flat_map(Position::fields)
            .cloned()
            .collect();
        if let Some(color) = self.color.as_ref().and_then(Channel::scaled_field) {
            if !out.contains(color) {
                out.push(color.clone());
            }
        }
        out
    }

    fn has_adjust(&self, kind: AdjustKind) -> Option<&AdjustOption> {
        self.adjust.iter().find(|a| a.kind == kind)
    }

    fn stack_adjust(&self) -> Option<&AdjustOption> {
        self.adjust
            .iter()
            .find(|a| matches!(a.kind, AdjustKind::Stack | AdjustKind::Symmetric))
    }
}

/// Values one scale must observe for a geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Field.
    pub field: FieldName,
    /// Observed values.
    pub values: Vec<Value>,
    /// Extend the domain to contain zero.
    pub include_zero: bool,
}

/// Value-space result of [`prepare`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedGeometry {
    /// Row indices in encoding order.
    pub order: Vec<usize>,
    /// Group rank per row (indexed by row).
    pub groups: Vec<usize>,
    /// Group labels, by rank.
    pub group_labels: Vec<Arc<str>>,
    /// Stacked `(start, end)` y spans per row.
    pub spans: Option<Vec<Option<(f64, f64)>>>,
    /// Number of distinct x values.
    pub distinct_x: usize,
    /// Number of distinct y values.
    pub distinct_y: usize,
    /// What the scales must observe.
    pub observations: Vec<Observation>,
    /// `false` when the geometry cannot be encoded.
    pub valid: bool,
}

fn column(data: &[Datum], field: &str) -> Vec<Value> {
    data.iter()
        .map(|d| d.get(field).cloned().unwrap_or_default())
        .collect()
}

fn is_categorical_column(data: &[Datum], field: &str) -> bool {
    data.iter()
        .filter_map(|d| d.get(field))
        .find(|v| !v.is_null())
        .is_some_and(|v| matches!(v, Value::Text(_) | Value::Bool(_)))
}

fn distinct(values: &[Value]) -> usize {
    let mut seen = hashbrown::HashSet::new();
    values
        .iter()
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(v.key()))
        .count()
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.key().cmp(&b.key()),
    }
}

fn group_label(fields: &[FieldName], datum: &Datum) -> Arc<str> {
    let label = fields
        .iter()
        .map(|f| datum.get(f).map(|v| alloc::format!("{v}")).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("|");
    if label.is_empty() {
        Arc::from("*")
    } else {
        label.into()
    }
}

/// Runs the value-space half of encoding.
pub fn prepare(
    view: ViewId,
    index: usize,
    option: &GeometryOption,
    data: &[Datum],
    diags: &mut Diagnostics,
) -> PreparedGeometry {
    let mut prepared = PreparedGeometry::default();
    let Some(position) = &option.position else {
        diags.push(view, ConfigError::MissingPosition(index));
        return prepared;
    };
    if let GeometryKind::Custom(name) = &option.kind {
        diags.push(view, ConfigError::UnsupportedGeometry(name.clone()));
    }

    let y_field = &position.y;
    let mut valid = true;
    if data.is_empty() {
        diags.push(view, DataError::EmptyData);
        valid = false;
    } else {
        for field in position.fields() {
            if !data.iter().any(|d| d.contains(field)) {
                diags.push(view, DataError::MissingField(field.clone()));
                valid = false;
            }
        }
    }

    // Grouping: explicit dodge field, else the categorical color/shape/size fields.
    let group_fields: Vec<FieldName> = match option
        .adjust
        .iter()
        .find_map(|a| a.dodge_by.clone())
    {
        Some(field) => alloc::vec![field],
        None => [
            option.color.as_ref().and_then(Channel::scaled_field),
            option.shape.as_ref().and_then(Channel::scaled_field),
            option.size.as_ref().and_then(Channel::scaled_field),
        ]
        .into_iter()
        .flatten()
        .filter(|f| is_categorical_column(data, f))
        .fold(Vec::new(), |mut acc, f| {
            if !acc.contains(f) {
                acc.push(f.clone());
            }
            acc
        }),
    };
    let keys: Vec<SmallVec<[ValueKey; 2]>> = data
        .iter()
        .map(|d| {
            group_fields
                .iter()
                .map(|f| d.get(f).map(Value::key).unwrap_or(ValueKey::Null))
                .collect()
        })
        .collect();
    let (groups, count) = first_seen_ranks(&keys);
    let mut labels: Vec<Arc<str>> = Vec::with_capacity(count);
    for (d, &group) in data.iter().zip(&groups) {
        if group == labels.len() {
            labels.push(group_label(&group_fields, d));
        }
    }
    prepared.groups = groups;
    prepared.group_labels = labels;

    let xs = position
        .x
        .as_ref()
        .map(|f| column(data, f))
        .unwrap_or_else(|| alloc::vec![Value::Null; data.len()]);
    let ys = column(data, y_field);
    prepared.distinct_x = distinct(&xs).max(1);
    prepared.distinct_y = distinct(&ys).max(1);

    prepared.order = (0..data.len()).collect();
    if option.sortable {
        prepared
            .order
            .sort_by(|&a, &b| compare_values(&xs[a], &xs[b]));
    }

    let mut y_observed = ys;
    if let Some(adjust) = option.stack_adjust() {
        let offset = if adjust.kind == AdjustKind::Symmetric {
            StackOffset::Center
        } else {
            adjust.offset
        };
        let rows: Vec<StackInput> = data
            .iter()
            .enumerate()
            .map(|(i, _)| StackInput {
                x: xs[i].key(),
                group: prepared.groups[i],
                value: y_observed[i].as_f64(),
            })
            .collect();
        let spans = stack(&rows, offset, adjust.reverse_order);
        y_observed = spans
            .iter()
            .flatten()
            .flat_map(|(s, e)| [Value::Number(*s), Value::Number(*e)])
            .collect();
        prepared.spans = Some(spans);
    }

    if let Some(x) = &position.x {
        prepared.observations.push(Observation {
            field: x.clone(),
            values: xs,
            include_zero: false,
        });
    }
    prepared.observations.push(Observation {
        field: y_field.clone(),
        values: y_observed,
        include_zero: option.kind.includes_zero(),
    });
    for field in option.scaled_fields() {
        if prepared.observations.iter().any(|o| o.field == field) {
            continue;
        }
        prepared.observations.push(Observation {
            values: column(data, &field),
            field,
            include_zero: false,
        });
    }
    prepared.valid = valid;
    prepared
}

/// Everything [`encode`] reads besides the geometry itself.
#[derive(Clone, Copy, Debug)]
pub struct EncodeContext<'a> {
    /// Owning view.
    pub view: ViewId,
    /// Geometry index within the view.
    pub index: u32,
    /// The geometry's (filtered) data.
    pub data: &'a [Datum],
    /// Resolved scales.
    pub registry: &'a ScaleRegistry,
    /// Final coordinate.
    pub coordinate: &'a Coordinate,
    /// Theme.
    pub theme: &'a Theme,
    /// Animations attached to every element.
    pub animate: AnimateOption,
}

impl EncodeContext<'_> {
    fn scale(&self, field: &str) -> Option<&Scale> {
        self.registry.get(self.view, field)
    }
}

/// Runs the layout half of encoding.
pub fn encode(
    ctx: &EncodeContext<'_>,
    option: &GeometryOption,
    prepared: &PreparedGeometry,
) -> Vec<VisualElement> {
    if !option.visible || !prepared.valid {
        return Vec::new();
    }
    let Some(position) = &option.position else {
        return Vec::new();
    };
    let enc = Encoder {
        ctx,
        option,
        prepared,
        position,
        x_scale: position.x.as_ref().and_then(|f| ctx.scale(f)),
        y_scale: ctx.scale(&position.y),
    };
    let mut out = match option.kind {
        GeometryKind::Interval => enc.intervals(),
        GeometryKind::Point | GeometryKind::Custom(_) => enc.points(),
        GeometryKind::Line | GeometryKind::Path | GeometryKind::Area => enc.paths(),
        GeometryKind::Polygon | GeometryKind::Heatmap => enc.cells(),
    };
    if option.label.is_some() {
        let labels = enc.labels();
        out.extend(labels);
    }
    tracing::trace!(
        view = %ctx.view,
        geometry = ctx.index,
        kind = option.kind.name(),
        elements = out.len(),
        "encoded geometry"
    );
    out
}

struct Encoder<'a> {
    ctx: &'a EncodeContext<'a>,
    option: &'a GeometryOption,
    prepared: &'a PreparedGeometry,
    position: &'a Position,
    x_scale: Option<&'a Scale>,
    y_scale: Option<&'a Scale>,
}

const ARC_SAMPLES: usize = 12;

impl Encoder<'_> {
    fn datum(&self, row: usize) -> Option<&Datum> {
        self.ctx.data.get(row)
    }

    fn x(&self, row: usize) -> Option<f64> {
        let x = match &self.position.x {
            None => Some(0.5),
            Some(field) => self.x_scale?.map(self.datum(row)?.get(field)?),
        }?;
        match self.option.has_adjust(AdjustKind::Jitter) {
            Some(_) => Some(jitter(
                x,
                self.band_x() * self.width_ratio(),
                row,
                u64::from(self.ctx.index),
            )),
            None => Some(x),
        }
    }

    fn baseline(&self) -> f64 {
        self.y_scale
            .and_then(|s| s.map_f64(0.0))
            .map_or(0.0, |b| b.clamp(0.0, 1.0))
    }

    /// `(start, end)` of the y extent in normalized space.
    fn y(&self, row: usize) -> Option<(f64, f64)> {
        let scale = self.y_scale?;
        if let Some(spans) = &self.prepared.spans {
            let (s, e) = (*spans.get(row)?)?;
            return Some((scale.map_f64(s)?, scale.map_f64(e)?));
        }
        let y = scale.map(self.datum(row)?.get(&self.position.y)?)?;
        Some((self.baseline(), y))
    }

    fn band_x(&self) -> f64 {
        self.x_scale
            .and_then(Scale::band_width)
            .unwrap_or(1.0 / self.prepared.distinct_x as f64)
    }

    fn band_y(&self) -> f64 {
        self.y_scale
            .and_then(Scale::band_width)
            .unwrap_or(1.0 / self.prepared.distinct_y as f64)
    }

    fn width_ratio(&self) -> f64 {
        if self.ctx.coordinate.is_polar() {
            1.0
        } else {
            self.ctx.theme.column_width_ratio
        }
    }

    fn key_id(&self, row: usize) -> KeyId {
        match (&self.option.key, self.datum(row)) {
            (Some(field), Some(d)) => {
                KeyId::Field(d.get(field).map(Value::key).unwrap_or(ValueKey::Null))
            }
            _ => KeyId::Index(row),
        }
    }

    fn element_key(&self, id: KeyId) -> ElementKey {
        ElementKey::new(self.ctx.view, self.ctx.index, id)
    }

    fn color(&self, row: usize) -> Color {
        let theme = self.ctx.theme;
        let Some(channel) = &self.option.color else {
            return theme.default_color;
        };
        let Some(datum) = self.datum(row) else {
            return theme.default_color;
        };
        match channel {
            Channel::Const(c) => *c,
            Channel::Callback { fields, f } => f.call(fields, datum),
            Channel::Field { field, values } => {
                let Some(scale) = self.ctx.scale(field) else {
                    return theme.default_color;
                };
                let Some(v) = datum.get(field) else {
                    return theme.default_color;
                };
                if scale.kind().is_categorical() {
                    let Some(i) = scale.category_index(v) else {
                        return theme.default_color;
                    };
                    match values.as_deref() {
                        Some(vs) if !vs.is_empty() => vs[i % vs.len()],
                        _ => theme.color_at(i),
                    }
                } else {
                    let Some(t) = scale.map(v) else {
                        return theme.default_color;
                    };
                    match values.as_deref() {
                        Some([a, .., b]) => crate::theme::lerp_color(*a, *b, t),
                        Some([a]) => *a,
                        _ => theme.ramp(t),
                    }
                }
            }
        }
    }

    fn shape(&self, row: usize) -> Arc<str> {
        let default = || Arc::from(self.option.kind.default_shape());
        let (Some(channel), Some(datum)) = (&self.option.shape, self.datum(row)) else {
            return default();
        };
        match channel {
            Channel::Const(s) => s.clone(),
            Channel::Callback { fields, f } => f.call(fields, datum),
            Channel::Field { field, values } => {
                let index = self
                    .ctx
                    .scale(field)
                    .zip(datum.get(field))
                    .and_then(|(s, v)| s.category_index(v));
                match (index, values.as_deref()) {
                    (Some(i), Some(vs)) if !vs.is_empty() => vs[i % vs.len()].clone(),
                    (Some(i), _) => self.ctx.theme.shape_at(i),
                    (None, _) => default(),
                }
            }
        }
    }

    fn size(&self, row: usize) -> f64 {
        let theme = self.ctx.theme;
        let default = match self.option.kind {
            GeometryKind::Line | GeometryKind::Path | GeometryKind::Area => theme.line_width,
            _ => theme.point_size,
        };
        let (Some(channel), Some(datum)) = (&self.option.size, self.datum(row)) else {
            return default;
        };
        match channel {
            Channel::Const(s) => *s,
            Channel::Callback { fields, f } => f.call(fields, datum),
            Channel::Field { field, values } => {
                let t = self
                    .ctx
                    .scale(field)
                    .zip(datum.get(field))
                    .and_then(|(s, v)| s.map(v));
                match (t, values.as_deref()) {
                    (Some(t), Some([a, .., b])) => a + t.clamp(0.0, 1.0) * (b - a),
                    (Some(_), Some([a])) => *a,
                    (Some(t), _) => theme.size_at(t),
                    (None, _) => default,
                }
            }
        }
    }

    fn element(
        &self,
        id: KeyId,
        shape: ElementShape,
        row: usize,
        rows: &[usize],
    ) -> VisualElement {
        let kind = self.option.kind.element_kind();
        let mut el = VisualElement::new(self.element_key(id), kind, shape);
        el.color = self.color(row);
        el.shape_name = self.shape(row);
        el.size = self.size(row);
        el.style = self.option.style.unwrap_or_default();
        if matches!(self.option.kind, GeometryKind::Line | GeometryKind::Path) {
            el.style.fill = false;
            el.style.line_width = el.size;
        }
        el.states = self.option.state.iter().cloned().collect();
        el.rows = rows.iter().copied().collect();
        el.animate = self.ctx.animate;
        el
    }

    /// Converts a normalized rectangle into a screen polygon. Under polar-family coordinates
    /// the edges are sampled so that arcs stay round.
    fn cell(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> SmallVec<[Point; 4]> {
        let coord = self.ctx.coordinate;
        let corners = [(x0, y0), (x0, y1), (x1, y1), (x1, y0)];
        if !coord.is_polar() {
            return corners
                .iter()
                .map(|&(x, y)| coord.convert(Point::new(x, y)))
                .collect();
        }
        let mut out = SmallVec::new();
        for i in 0..4 {
            let (ax, ay) = corners[i];
            let (bx, by) = corners[(i + 1) % 4];
            for s in 0..ARC_SAMPLES {
                let t = s as f64 / ARC_SAMPLES as f64;
                out.push(coord.convert(Point::new(ax + t * (bx - ax), ay + t * (by - ay))));
            }
        }
        out
    }

    fn intervals(&self) -> Vec<VisualElement> {
        let band = self.band_x() * self.width_ratio();
        let dodged = self.option.has_adjust(AdjustKind::Dodge);
        let mut out = Vec::with_capacity(self.prepared.order.len());
        for &row in &self.prepared.order {
            let (Some(x), Some((y0, y1))) = (self.x(row), self.y(row)) else {
                continue;
            };
            let (cx, w) = match dodged {
                Some(adjust) => dodge(
                    x,
                    band,
                    self.prepared.groups.get(row).copied().unwrap_or(0),
                    self.prepared.group_labels.len(),
                    adjust.margin_ratio,
                ),
                None => (x, band),
            };
            let polygon = self.cell(cx - 0.5 * w, cx + 0.5 * w, y0, y1);
            out.push(self.element(self.key_id(row), ElementShape::Polygon(polygon), row, &[row]));
        }
        out
    }

    fn points(&self) -> Vec<VisualElement> {
        let mut out = Vec::with_capacity(self.prepared.order.len());
        for &row in &self.prepared.order {
            let (Some(x), Some((_, y))) = (self.x(row), self.y(row)) else {
                continue;
            };
            let center = self.ctx.coordinate.convert(Point::new(x, y));
            let shape = ElementShape::Point {
                center,
                radius: self.size(row),
            };
            out.push(self.element(self.key_id(row), shape, row, &[row]));
        }
        out
    }

    fn cells(&self) -> Vec<VisualElement> {
        let (bx, by) = (self.band_x(), self.band_y());
        let mut out = Vec::with_capacity(self.prepared.order.len());
        for &row in &self.prepared.order {
            let (Some(x), Some((_, y))) = (self.x(row), self.y(row)) else {
                continue;
            };
            let polygon = self.cell(x - 0.5 * bx, x + 0.5 * bx, y - 0.5 * by, y + 0.5 * by);
            out.push(self.element(self.key_id(row), ElementShape::Polygon(polygon), row, &[row]));
        }
        out
    }

    fn paths(&self) -> Vec<VisualElement> {
        let coord = self.ctx.coordinate;
        let area = self.option.kind == GeometryKind::Area;
        let mut out = Vec::new();
        for (group, label) in self.prepared.group_labels.iter().enumerate() {
            let mut rows: Vec<usize> = self
                .prepared
                .order
                .iter()
                .copied()
                .filter(|&r| self.prepared.groups.get(r) == Some(&group))
                .collect();
            if rows.is_empty() {
                continue;
            }
            if self.option.kind != GeometryKind::Path {
                rows.sort_by(|&a, &b| {
                    let xa = self.x(a).unwrap_or(f64::INFINITY);
                    let xb = self.x(b).unwrap_or(f64::INFINITY);
                    xa.total_cmp(&xb)
                });
            }

            let mut segments: Vec<Vec<(f64, f64, f64)>> = Vec::new();
            let mut current = Vec::new();
            for &row in &rows {
                match (self.x(row), self.y(row)) {
                    (Some(x), Some((y0, y1))) => current.push((x, y0, y1)),
                    _ if !self.option.connect_nulls && !current.is_empty() => {
                        segments.push(core::mem::take(&mut current));
                    }
                    _ => {}
                }
            }
            if !current.is_empty() {
                segments.push(current);
            }
            if segments.is_empty() {
                continue;
            }

            let screen: Vec<Vec<Point>> = segments
                .iter()
                .map(|seg| {
                    let top = seg.iter().map(|&(x, _, y1)| coord.convert(Point::new(x, y1)));
                    if area {
                        let bottom = seg
                            .iter()
                            .rev()
                            .map(|&(x, y0, _)| coord.convert(Point::new(x, y0)));
                        top.chain(bottom).collect()
                    } else {
                        top.collect()
                    }
                })
                .collect();
            let shape = ElementShape::Path {
                segments: screen,
                closed: area,
            };
            out.push(self.element(KeyId::Group(label.clone()), shape, rows[0], &rows));
        }
        out
    }

    fn labels(&self) -> Vec<VisualElement> {
        let Some(label) = &self.option.label else {
            return Vec::new();
        };
        let theme = self.ctx.theme;
        let font_size = label.font_size.unwrap_or(theme.label_font_size);
        let mut out = Vec::new();
        for &row in &self.prepared.order {
            let (Some(x), Some((_, y)), Some(datum)) = (self.x(row), self.y(row), self.datum(row))
            else {
                continue;
            };
            let anchor =
                self.ctx.coordinate.convert(Point::new(x, y)) - Vec2::new(0.0, label.offset);
            let shape = ElementShape::Text {
                anchor,
                text: label.text(datum),
                font_size,
            };
            let id = KeyId::Label(Arc::new(self.key_id(row)));
            let mut el = VisualElement::new(self.element_key(id), ElementKind::Label, shape);
            el.color = theme.text_color;
            el.size = font_size;
            el.rows = SmallVec::from_slice(&[row]);
            el.animate = self.ctx.animate;
            out.push(el);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;
    use kurbo::Rect;

    use super::*;
    use crate::scale::ScaleOption;

    struct Fixture {
        registry: ScaleRegistry,
        coordinate: Coordinate,
        theme: Theme,
    }

    fn run(option: &GeometryOption, data: &[Datum]) -> (Vec<VisualElement>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let prepared = prepare(ViewId(1), 0, option, data, &mut diags);
        let mut fx = Fixture {
            registry: ScaleRegistry::new(),
            coordinate: Coordinate::rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
            theme: Theme::light(),
        };
        for obs in &prepared.observations {
            fx.registry.resolve(
                ViewId(1),
                &obs.field,
                &obs.values,
                &ScaleOption::new(),
                obs.include_zero,
                &mut diags,
            );
        }
        let ctx = EncodeContext {
            view: ViewId(1),
            index: 0,
            data,
            registry: &fx.registry,
            coordinate: &fx.coordinate,
            theme: &fx.theme,
            animate: AnimateOption::default(),
        };
        (encode(&ctx, option, &prepared), diags)
    }

    fn series() -> Vec<Datum> {
        vec![
            Datum::new().with("x", 1.0).with("y", 1.0),
            Datum::new().with("x", 2.0).with("y", Value::Null),
            Datum::new().with("x", 3.0).with("y", 3.0),
        ]
    }

    #[test]
    fn nulls_break_lines_unless_connected() {
        let line = GeometryOption::line().with_position("x*y");
        let (els, diags) = run(&line, &series());
        assert!(diags.is_empty());
        assert_eq!(els.len(), 1);
        assert_eq!(els[0].shape.segment_count(), 2);

        let (els, _) = run(&line.with_connect_nulls(true), &series());
        assert_eq!(els[0].shape.segment_count(), 1);
    }

    #[test]
    fn stacked_intervals_share_a_column() {
        let data = vec![
            Datum::new().with("x", "a").with("s", "one").with("y", 10.0),
            Datum::new().with("x", "a").with("s", "two").with("y", 20.0),
        ];
        let option = GeometryOption::interval()
            .with_position("x*y")
            .with_color_field("s")
            .with_adjust(AdjustOption::stack());
        let mut diags = Diagnostics::new();
        let prepared = prepare(ViewId(1), 0, &option, &data, &mut diags);
        assert_eq!(
            prepared.spans,
            Some(vec![Some((0.0, 10.0)), Some((10.0, 30.0))])
        );
        assert_eq!(prepared.group_labels.len(), 2);

        let (els, _) = run(&option, &data);
        assert_eq!(els.len(), 2);
        let (a, b) = (els[0].shape.bounds(), els[1].shape.bounds());
        // y is up: the second series sits on top of the first.
        assert!((a.y0 - b.y1).abs() < 1e-9);
        assert!((a.x0 - b.x0).abs() < 1e-9);
        assert_ne!(els[0].color, els[1].color);
    }

    #[test]
    fn groups_are_ranked_by_first_appearance() {
        let data = vec![
            Datum::new().with("x", "a").with("s", "two").with("y", 1.0),
            Datum::new().with("x", "b").with("s", "one").with("y", 2.0),
            Datum::new().with("x", "c").with("s", "two").with("y", 3.0),
        ];
        let mut diags = Diagnostics::new();
        let colored = GeometryOption::point()
            .with_position("x*y")
            .with_color_field("s");
        let prepared = prepare(ViewId(1), 0, &colored, &data, &mut diags);
        assert_eq!(prepared.groups, vec![0, 1, 0]);
        let labels: Vec<&str> = prepared.group_labels.iter().map(|l| &**l).collect();
        assert_eq!(labels, ["two", "one"]);

        let plain = GeometryOption::point().with_position("x*y");
        let prepared = prepare(ViewId(1), 0, &plain, &data, &mut diags);
        assert_eq!(prepared.groups, vec![0, 0, 0]);
        assert_eq!(prepared.group_labels.len(), 1);
        assert_eq!(&*prepared.group_labels[0], "*");
    }

    #[test]
    fn dodged_intervals_split_the_band() {
        let data = vec![
            Datum::new().with("x", "a").with("s", "one").with("y", 10.0),
            Datum::new().with("x", "a").with("s", "two").with("y", 20.0),
        ];
        let option = GeometryOption::interval()
            .with_position("x*y")
            .with_color_field("s")
            .with_adjust(AdjustOption::dodge());
        let (els, _) = run(&option, &data);
        let (a, b) = (els[0].shape.bounds(), els[1].shape.bounds());
        assert!(a.x1 <= b.x0 + 1e-9);
    }

    #[test]
    fn data_errors_yield_nothing() {
        let line = GeometryOption::line().with_position("x*missing");
        let (els, diags) = run(&line, &series());
        assert!(els.is_empty());
        assert_eq!(diags.items().len(), 1);

        let (els, diags) = run(&GeometryOption::point().with_position("x*y"), &[]);
        assert!(els.is_empty());
        assert!(!diags.is_empty());

        let (els, diags) = run(&GeometryOption::point(), &series());
        assert!(els.is_empty());
        assert!(matches!(
            diags.items()[0].error,
            crate::error::RecoverableError::Config(ConfigError::MissingPosition(0))
        ));
    }

    #[test]
    fn keys_follow_identity_field_and_labels_are_scoped() {
        let data = vec![
            Datum::new().with("id", "p").with("x", 1.0).with("y", 2.0),
            Datum::new().with("id", "q").with("x", 2.0).with("y", 4.0),
        ];
        let option = GeometryOption::point()
            .with_position("x*y")
            .with_key("id")
            .with_label(LabelOption::field("y"));
        let (els, _) = run(&option, &data);
        assert_eq!(els.len(), 4);
        assert_eq!(els[0].key.id, KeyId::Field(Value::from("p").key()));
        assert_eq!(els[2].kind, ElementKind::Label);
        let ElementShape::Text { text, .. } = &els[2].shape else {
            panic!("expected a text label");
        };
        assert_eq!(&**text, "2");
    }

    #[test]
    fn hidden_and_custom_geometries() {
        let hidden = GeometryOption::point().with_position("x*y").with_visible(false);
        assert!(run(&hidden, &series()).0.is_empty());

        let custom = GeometryOption::new(GeometryKind::from_name("schema")).with_position("x*y");
        let (els, diags) = run(&custom, &series());
        assert_eq!(els.len(), 2);
        assert!(els.iter().all(|e| e.kind == ElementKind::Point));
        assert_eq!(diags.items().len(), 1);
    }

    #[test]
    fn area_closes_against_baseline() {
        let data = vec![
            Datum::new().with("x", 0.0).with("y", 1.0),
            Datum::new().with("x", 1.0).with("y", 2.0),
        ];
        let (els, _) = run(&GeometryOption::area().with_position("x*y"), &data);
        let ElementShape::Path { segments, closed } = &els[0].shape else {
            panic!("expected a path");
        };
        assert!(*closed);
        assert_eq!(segments[0].len(), 4);
        // The bottom edge lies on y = 0, which is the bottom of the region.
        assert!((segments[0][2].y - 100.0).abs() < 1e-9);
    }
}
