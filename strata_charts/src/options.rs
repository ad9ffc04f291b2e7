// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarations.
//!
//! [`Options`] is the full declaration of one view: data, scales, coordinate, geometries and
//! components, plus nested [`ViewCfg`]s. [`ChartCfg`] adds the canvas-level settings of a chart.
//! Everything is plain data with `with_*` builders; nothing here touches the view tree.

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use strata_core::{AnimateOption, Datum, FieldName, Value};
use strata_transforms::FieldFilter;

use crate::annotation::AnnotationOption;
use crate::axis::AxesOption;
use crate::coordinate::CoordinateOption;
use crate::error::ConfigError;
use crate::geometry::{GeometryKind, GeometryOption};
use crate::layout::{Insets, Padding};
use crate::legend::LegendsOption;
use crate::scale::{ScaleOption, ScaleSync, ScaleType};
use crate::theme::Theme;
use crate::tooltip::TooltipCfg;
use crate::view::{Dirty, Region};

/// A declared interaction, passed through to the render frame.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionOption {
    /// Interaction name, e.g. `"tooltip"` or `"legend-filter"`.
    pub kind: Arc<str>,
    /// Opaque settings.
    pub cfg: Vec<(Arc<str>, Value)>,
}

impl InteractionOption {
    /// An interaction without settings.
    pub fn new(kind: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            cfg: Vec::new(),
        }
    }

    /// Adds a setting.
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.cfg.push((name.into(), value.into()));
        self
    }
}

/// A theme declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum ThemeSetting {
    /// A named built-in theme.
    Named(Arc<str>),
    /// A theme value.
    Custom(Box<Theme>),
}

/// The declaration of one view.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Records; `None` inherits the parent's filtered records.
    pub data: Option<Vec<Datum>>,
    /// Record filters, applied in order.
    pub filters: Vec<FieldFilter>,
    /// Axes.
    pub axes: AxesOption,
    /// Legends.
    pub legends: LegendsOption,
    /// Per-field scale options, layered over the parent's.
    pub scales: Vec<(FieldName, ScaleOption)>,
    /// Tooltip; `None` disables it.
    pub tooltip: Option<TooltipCfg>,
    /// Coordinate system.
    pub coordinate: CoordinateOption,
    /// Annotations, drawn in order.
    pub annotations: Vec<AnnotationOption>,
    /// Geometries, encoded in order.
    pub geometries: Vec<GeometryOption>,
    /// View-wide animation; `None` uses the theme's.
    pub animate: Option<AnimateOption>,
    /// Interactions.
    pub interactions: Vec<InteractionOption>,
    /// Declared child views, reconciled by position.
    pub views: Vec<ViewCfg>,
    /// Opaque extension settings.
    pub extensions: Vec<(Arc<str>, Value)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            data: None,
            filters: Vec::new(),
            axes: AxesOption::default(),
            legends: LegendsOption::default(),
            scales: Vec::new(),
            tooltip: Some(TooltipCfg::default()),
            coordinate: CoordinateOption::default(),
            annotations: Vec::new(),
            geometries: Vec::new(),
            animate: None,
            interactions: Vec::new(),
            views: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Options {
    /// Creates an empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the records.
    pub fn with_data(mut self, data: impl IntoIterator<Item = Datum>) -> Self {
        self.data = Some(data.into_iter().collect());
        self
    }

    /// Adds a filter.
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the axes.
    pub fn with_axes(mut self, axes: AxesOption) -> Self {
        self.axes = axes;
        self
    }

    /// Sets the legends.
    pub fn with_legends(mut self, legends: LegendsOption) -> Self {
        self.legends = legends;
        self
    }

    /// Declares a field's scale, replacing an earlier declaration for the same field.
    pub fn with_scale(mut self, field: impl Into<FieldName>, option: ScaleOption) -> Self {
        let field = field.into();
        self.scales.retain(|(f, _)| *f != field);
        self.scales.push((field, option));
        self
    }

    /// Sets or disables the tooltip.
    pub fn with_tooltip(mut self, tooltip: Option<TooltipCfg>) -> Self {
        self.tooltip = tooltip;
        self
    }

    /// Sets the coordinate system.
    pub fn with_coordinate(mut self, coordinate: CoordinateOption) -> Self {
        self.coordinate = coordinate;
        self
    }

    /// Adds an annotation.
    pub fn with_annotation(mut self, annotation: AnnotationOption) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds a geometry.
    pub fn with_geometry(mut self, geometry: GeometryOption) -> Self {
        self.geometries.push(geometry);
        self
    }

    /// Sets the view-wide animation.
    pub fn with_animate(mut self, animate: AnimateOption) -> Self {
        self.animate = Some(animate);
        self
    }

    /// Adds an interaction.
    pub fn with_interaction(mut self, interaction: InteractionOption) -> Self {
        self.interactions.push(interaction);
        self
    }

    /// Declares a child view.
    pub fn with_view(mut self, view: ViewCfg) -> Self {
        self.views.push(view);
        self
    }

    /// Adds an opaque extension setting.
    pub fn with_extension(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.extensions.push((name.into(), value.into()));
        self
    }

    /// Declared scale option for `field`.
    pub fn scale(&self, field: &str) -> Option<&ScaleOption> {
        self.scales
            .iter()
            .find(|(f, _)| &**f == field)
            .map(|(_, o)| o)
    }

    /// Channels that differ between `self` and `next`, at this view's own level.
    pub fn diff(&self, next: &Self) -> Dirty {
        let mut dirty = Dirty::NONE;
        let mut mark = |changed: bool, flag: Dirty| {
            if changed {
                dirty |= flag;
            }
        };
        mark(self.data != next.data, Dirty::DATA);
        mark(self.filters != next.filters, Dirty::FILTERS);
        mark(self.scales != next.scales, Dirty::SCALES);
        mark(self.coordinate != next.coordinate, Dirty::COORDINATE);
        mark(self.geometries != next.geometries, Dirty::GEOMETRIES);
        mark(
            self.axes != next.axes
                || self.legends != next.legends
                || self.tooltip != next.tooltip
                || self.annotations != next.annotations,
            Dirty::COMPONENTS,
        );
        mark(self.animate != next.animate, Dirty::ANIMATE);
        mark(self.views != next.views, Dirty::CHILDREN);
        dirty
    }

    /// Reports every configuration error of this declaration and its nested views without
    /// rendering.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut sync = Vec::new();
        self.validate_into(&mut errors, &mut sync);
        check_sync_types(&sync, &mut errors);
        errors
    }

    fn validate_into<'a>(
        &'a self,
        errors: &mut Vec<ConfigError>,
        sync: &mut Vec<(Arc<str>, &'a FieldName, ScaleType)>,
    ) {
        for (field, option) in &self.scales {
            let Some(name) = &option.kind else {
                continue;
            };
            let Some(kind) = ScaleType::from_name(name) else {
                errors.push(ConfigError::UnknownScaleType(name.clone()));
                continue;
            };
            match &option.sync {
                ScaleSync::Off => {}
                ScaleSync::Field => sync.push((field.clone(), field, kind)),
                ScaleSync::Key(key) => sync.push((key.clone(), field, kind)),
            }
        }
        if let Err(e) = self.coordinate.resolve_kind() {
            errors.push(e);
        }
        errors.extend(self.coordinate.parse_actions().1);
        for (i, geometry) in self.geometries.iter().enumerate() {
            if geometry.position.is_none() {
                errors.push(ConfigError::MissingPosition(i));
            }
            if let GeometryKind::Custom(name) = &geometry.kind {
                errors.push(ConfigError::UnsupportedGeometry(name.clone()));
            }
        }
        for view in &self.views {
            view.validate_layout(errors);
            view.options.validate_into(errors, sync);
        }
    }
}

fn check_sync_types(members: &[(Arc<str>, &FieldName, ScaleType)], errors: &mut Vec<ConfigError>) {
    for (i, (key, field, kind)) in members.iter().enumerate() {
        let first = members[..i].iter().find(|(k, _, _)| k == key);
        if let Some((_, _, expected)) = first {
            if expected != kind {
                errors.push(ConfigError::SyncTypeConflict {
                    key: key.clone(),
                    field: (*field).clone(),
                    expected: expected.name(),
                    found: kind.name(),
                });
            }
        }
    }
}

/// Declaration of a view inside its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewCfg {
    /// Placement inside the parent's content region; `None` covers all of it.
    pub region: Option<Region>,
    /// Padding around the content region.
    pub padding: Padding,
    /// Extra padding, always added.
    pub append_padding: Insets,
    /// Theme; `None` inherits the parent's.
    pub theme: Option<ThemeSetting>,
    /// Whether the view is drawn.
    pub visible: bool,
    /// The view's declaration.
    pub options: Options,
}

impl Default for ViewCfg {
    fn default() -> Self {
        Self {
            region: None,
            padding: Padding::AUTO,
            append_padding: Insets::ZERO,
            theme: None,
            visible: true,
            options: Options::default(),
        }
    }
}

impl ViewCfg {
    /// Creates a view covering its parent's content region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Sets the padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the append padding.
    pub fn with_append_padding(mut self, insets: Insets) -> Self {
        self.append_padding = insets;
        self
    }

    /// Uses a named theme.
    pub fn with_theme_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.theme = Some(ThemeSetting::Named(name.into()));
        self
    }

    /// Uses a theme value.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(ThemeSetting::Custom(Box::new(theme)));
        self
    }

    /// Shows or hides the view.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the declaration.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    fn validate_layout(&self, errors: &mut Vec<ConfigError>) {
        if let Some(region) = &self.region {
            if let Err(e) = region.validate() {
                errors.push(e);
            }
        }
        let sides = [
            self.padding.top,
            self.padding.right,
            self.padding.bottom,
            self.padding.left,
        ];
        let appended = [
            self.append_padding.top,
            self.append_padding.right,
            self.append_padding.bottom,
            self.append_padding.left,
        ];
        for v in sides.into_iter().flatten().chain(appended) {
            if !(v.is_finite() && v >= 0.0) {
                errors.push(ConfigError::InvalidPadding(v));
            }
        }
        if let Some(ThemeSetting::Named(name)) = &self.theme {
            if let Err(e) = Theme::by_name(name) {
                errors.push(e);
            }
        }
    }
}

/// Interactions a chart enables unless told otherwise.
pub const DEFAULT_INTERACTIONS: [&str; 5] = [
    "tooltip",
    "legend-filter",
    "legend-active",
    "continuous-filter",
    "ellipsis-text",
];

/// Construction settings of a chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartCfg {
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    /// Whether the host resizes the chart with its container.
    pub auto_fit: bool,
    /// Device pixel ratio, passed through to the render backend.
    pub pixel_ratio: f64,
    /// Root view padding.
    pub padding: Padding,
    /// Root view append padding.
    pub append_padding: Insets,
    /// Whether the chart is drawn.
    pub visible: bool,
    /// Whether clean views reuse their previous layout and elements.
    pub local_refresh: bool,
    /// Root declaration.
    pub options: Options,
    /// Interactions enabled on top of the declared ones.
    pub default_interactions: Vec<Arc<str>>,
    /// Root theme.
    pub theme: Option<ThemeSetting>,
    /// Measure passes allowed per negotiation.
    pub max_layout_iterations: usize,
}

impl Default for ChartCfg {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
            auto_fit: false,
            pixel_ratio: 1.0,
            padding: Padding::AUTO,
            append_padding: Insets::ZERO,
            visible: true,
            local_refresh: true,
            options: Options::default(),
            default_interactions: DEFAULT_INTERACTIONS.iter().map(|s| Arc::from(*s)).collect(),
            theme: None,
            max_layout_iterations: 4,
        }
    }
}

impl ChartCfg {
    /// Creates a chart configuration of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Sets the root padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Sets the root append padding.
    pub fn with_append_padding(mut self, insets: Insets) -> Self {
        self.append_padding = insets;
        self
    }

    /// Sets the root declaration.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Uses a named theme.
    pub fn with_theme_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.theme = Some(ThemeSetting::Named(name.into()));
        self
    }

    /// Uses a theme value.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(ThemeSetting::Custom(Box::new(theme)));
        self
    }

    /// Replaces the default interactions.
    pub fn with_default_interactions<S: Into<Arc<str>>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.default_interactions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Toggles cache reuse for clean views.
    pub fn with_local_refresh(mut self, local_refresh: bool) -> Self {
        self.local_refresh = local_refresh;
        self
    }

    /// Sets the pixel ratio.
    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Marks the chart as container-sized.
    pub fn with_auto_fit(mut self, auto_fit: bool) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    /// Shows or hides the chart.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets the negotiation iteration cap.
    pub fn with_max_layout_iterations(mut self, n: usize) -> Self {
        self.max_layout_iterations = n;
        self
    }

    /// The root view's declaration, as a [`ViewCfg`].
    pub fn root_view(&self) -> ViewCfg {
        ViewCfg {
            region: None,
            padding: self.padding,
            append_padding: self.append_padding,
            theme: self.theme.clone(),
            visible: self.visible,
            options: self.options.clone(),
        }
    }
}
