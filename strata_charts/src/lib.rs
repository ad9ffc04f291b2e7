// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composition and layout engine for Strata.
//!
//! A [`Chart`] owns a tree of [`View`]s, each declared by [`Options`]:
//! - **Scales** are resolved per `(view, field)` in a shared [`ScaleRegistry`], and unified
//!   across views that share a sync key.
//! - **Coordinates** map normalized positions to screen space through a composable stack of
//!   [`CoordAction`]s.
//! - **Components** (axes, legends, tooltip, annotations) are measured through a
//!   [`ComponentBackend`], and a [`Negotiator`] shrinks the content region until their
//!   footprints are stable.
//! - **Geometries** are encoded into keyed `VisualElement`s that `strata_core` diffs across
//!   passes.
//!
//! Drawing, text shaping and animation playback are left to the host through
//! [`RenderBackend`], [`TextMeasurer`] and `strata_core::Animator`.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod annotation;
mod axis;
mod backend;
mod channel;
mod chart;
mod component;
mod coordinate;
mod error;
#[cfg(not(feature = "std"))]
mod float;
mod format;
mod geometry;
mod layout;
mod legend;
mod measure;
mod options;
mod registry;
mod scale;
mod theme;
mod time;
mod tooltip;
mod view;

pub use annotation::{
    AnnotationContext, AnnotationKind, AnnotationModel, AnnotationOption, AnnotationPosition,
    PosValue, annotation_component,
};
pub use axis::{
    AxesOption, AxisCfg, AxisField, AxisGeometry, AxisLabelCfg, AxisModel, AxisSetting,
    AxisTitleCfg, LineStyle, axis_components,
};
pub use backend::{
    ComponentBackend, HeuristicComponentBackend, NullRenderBackend, RenderBackend, RenderFrame,
    ViewFrame, measure_component, resolve_component,
};
pub use channel::{Callback, Channel, Position};
pub use chart::Chart;
pub use component::{
    Align, ComponentDescriptor, ComponentHandle, ComponentKind, ComponentModel, ComponentPadding,
    Direction, Layer, Side,
};
pub use coordinate::{
    ActionDecl, CoordAction, Coordinate, CoordinateCfg, CoordinateKind, CoordinateOption, Dim,
    ReflectAxis,
};
pub use error::{ConfigError, DataError, Diagnostic, Diagnostics, RecoverableError, StrataError};
pub use format::format_tick_with_step;
pub use geometry::{
    EncodeContext, GeometryKind, GeometryOption, LabelOption, Observation, PreparedGeometry,
    encode, prepare,
};
pub use layout::{Insets, NegotiationResult, Negotiator, Padding};
pub use legend::{
    ContinuousLegend, LegendCfg, LegendItem, LegendLayout, LegendModel, LegendSetting,
    LegendsOption, legend_components, ramp_color,
};
pub use measure::{HeuristicTextMeasurer, TextMeasurer, TextStyle};
pub use options::{
    ChartCfg, DEFAULT_INTERACTIONS, InteractionOption, Options, ThemeSetting, ViewCfg,
};
pub use registry::{ScaleRegistry, ScaleSlot, sync_key};
pub use scale::{Domain, Scale, ScaleOption, ScaleSync, ScaleType, Tick, TickFormatter};
pub use theme::{Theme, lerp_color};
pub use time::{fixed_step_ticks, format_timestamp, nice_time_ticks_seconds, parse_time};
pub use tooltip::{
    CrosshairKind, CrosshairModel, CrosshairsCfg, TooltipCfg, TooltipItem, TooltipSource,
    crosshair_point, find_items, tooltip_components,
};
pub use view::{Dirty, Region, View};
