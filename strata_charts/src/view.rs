// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View tree nodes.
//!
//! Views live in the chart's arena, indexed by [`ViewId`]. A node keeps its declaration, the
//! sanitized layout inputs derived from it, the channels that changed since the last pass
//! ([`Dirty`]), and the caches a clean view reuses.

extern crate alloc;

use alloc::vec::Vec;
use core::ops::{BitOr, BitOrAssign, Range};

use kurbo::{Point, Rect};
use strata_core::{Datum, FieldName, ViewId, VisualElement};

use crate::backend::ViewFrame;
use crate::coordinate::Coordinate;
use crate::error::{ConfigError, Diagnostics};
use crate::geometry::PreparedGeometry;
use crate::layout::{Insets, Padding};
use crate::options::{Options, ThemeSetting, ViewCfg};
use crate::scale::ScaleOption;
use crate::theme::Theme;

/// A view's placement inside its parent's content region, in normalized units with y pointing
/// down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    /// Top-left corner.
    pub start: Point,
    /// Bottom-right corner.
    pub end: Point,
}

impl Region {
    /// The whole parent content region.
    pub const FULL: Self = Self {
        start: Point::ZERO,
        end: Point::new(1.0, 1.0),
    };

    /// Creates a region from its corners.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            start: Point::new(x0, y0),
            end: Point::new(x1, y1),
        }
    }

    /// Checks that both corners lie in `[0, 1]` and `start <= end`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let coords = [self.start.x, self.start.y, self.end.x, self.end.y];
        let in_unit = coords.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v));
        if in_unit && self.start.x <= self.end.x && self.start.y <= self.end.y {
            Ok(())
        } else {
            Err(ConfigError::InvalidRegion {
                x0: self.start.x,
                y0: self.start.y,
                x1: self.end.x,
                y1: self.end.y,
            })
        }
    }

    /// Maps the region into `parent`.
    pub fn resolve(&self, parent: Rect) -> Rect {
        let w = parent.width();
        let h = parent.height();
        Rect::new(
            parent.x0 + self.start.x * w,
            parent.y0 + self.start.y * h,
            parent.x0 + self.end.x * w,
            parent.y0 + self.end.y * h,
        )
    }
}

/// Channels of a view's declaration that changed since the last pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dirty(u16);

impl Dirty {
    /// Nothing changed.
    pub const NONE: Self = Self(0);
    /// Records.
    pub const DATA: Self = Self(1 << 0);
    /// Filters.
    pub const FILTERS: Self = Self(1 << 1);
    /// Scale options.
    pub const SCALES: Self = Self(1 << 2);
    /// Coordinate option.
    pub const COORDINATE: Self = Self(1 << 3);
    /// Geometry declarations.
    pub const GEOMETRIES: Self = Self(1 << 4);
    /// Axes, legends, tooltip or annotations.
    pub const COMPONENTS: Self = Self(1 << 5);
    /// Animation option.
    pub const ANIMATE: Self = Self(1 << 6);
    /// Declared child views.
    pub const CHILDREN: Self = Self(1 << 7);
    /// Region, padding, theme or visibility.
    pub const LAYOUT: Self = Self(1 << 8);
    /// Everything.
    pub const ALL: Self = Self((1 << 9) - 1);

    /// Returns `true` if every channel of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any channel of `other` is set.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if nothing is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether data preparation and scale resolution must run again.
    pub fn needs_prepare(self) -> bool {
        self.intersects(Self::DATA | Self::FILTERS | Self::SCALES | Self::GEOMETRIES)
    }
}

impl BitOr for Dirty {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Dirty {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Layout and elements of a view's last full pass.
#[derive(Clone, Debug)]
pub(crate) struct LayoutCache {
    pub(crate) bbox: Rect,
    pub(crate) versions: Vec<(FieldName, u64)>,
    pub(crate) frame: ViewFrame,
    pub(crate) elements: Vec<VisualElement>,
    /// Element range of each geometry inside `elements`.
    pub(crate) ranges: Vec<Range<usize>>,
}

/// A node of the view tree.
#[derive(Clone, Debug)]
pub struct View {
    pub(crate) id: ViewId,
    pub(crate) parent: Option<ViewId>,
    pub(crate) children: Vec<ViewId>,
    /// Position in the parent's `Options::views`, for declared children.
    pub(crate) declared: Option<usize>,
    pub(crate) region: Option<Region>,
    pub(crate) padding: Padding,
    pub(crate) append_padding: Insets,
    pub(crate) theme_setting: Option<ThemeSetting>,
    pub(crate) theme: Theme,
    pub(crate) visible: bool,
    pub(crate) options: Options,
    pub(crate) dirty: Dirty,
    pub(crate) filtered: Vec<Datum>,
    pub(crate) prepared: Vec<PreparedGeometry>,
    pub(crate) scale_options: Vec<(FieldName, ScaleOption)>,
    pub(crate) content: Rect,
    pub(crate) coordinate: Option<Coordinate>,
    pub(crate) cache: Option<LayoutCache>,
}

impl View {
    pub(crate) fn new(
        id: ViewId,
        parent: Option<ViewId>,
        declared: Option<usize>,
        cfg: &ViewCfg,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut view = Self {
            id,
            parent,
            children: Vec::new(),
            declared,
            region: None,
            padding: Padding::AUTO,
            append_padding: Insets::ZERO,
            theme_setting: None,
            theme: Theme::light(),
            visible: cfg.visible,
            options: cfg.options.clone(),
            dirty: Dirty::ALL,
            filtered: Vec::new(),
            prepared: Vec::new(),
            scale_options: Vec::new(),
            content: Rect::ZERO,
            coordinate: None,
            cache: None,
        };
        view.apply_layout_cfg(cfg, diags);
        view
    }

    /// Sanitizes and stores region, padding, theme and visibility. Returns `true` if any of them
    /// changed.
    pub(crate) fn apply_layout_cfg(&mut self, cfg: &ViewCfg, diags: &mut Diagnostics) -> bool {
        let region = cfg.region.and_then(|r| match r.validate() {
            Ok(()) => Some(r),
            Err(e) => {
                diags.push(self.id, e);
                None
            }
        });
        let padding = sanitize_padding(self.id, cfg.padding, diags);
        let append = sanitize_insets(self.id, cfg.append_padding, diags);
        if let Some(ThemeSetting::Named(name)) = &cfg.theme {
            if let Err(e) = Theme::by_name(name) {
                diags.push(self.id, e);
            }
        }
        let changed = region != self.region
            || padding != self.padding
            || append != self.append_padding
            || cfg.theme != self.theme_setting
            || cfg.visible != self.visible;
        self.region = region;
        self.padding = padding;
        self.append_padding = append;
        self.theme_setting = cfg.theme.clone();
        self.visible = cfg.visible;
        changed
    }

    /// View id.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Parent view; `None` for the root.
    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    /// Child views in traversal order.
    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    /// Current declaration.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Resolved theme.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Whether the view is drawn.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sanitized region; `None` covers the parent's whole content region.
    pub fn region(&self) -> Option<Region> {
        self.region
    }

    /// Sanitized padding.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Content region of the last pass.
    pub fn content(&self) -> Rect {
        self.content
    }

    /// Coordinate of the last pass.
    pub fn coordinate(&self) -> Option<&Coordinate> {
        self.coordinate.as_ref()
    }

    /// Records after filtering, as of the last pass.
    pub fn data(&self) -> &[Datum] {
        &self.filtered
    }

    /// Channels changed since the last pass.
    pub fn dirty(&self) -> Dirty {
        self.dirty
    }
}

fn sanitize_amount(view: ViewId, v: f64, diags: &mut Diagnostics) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        diags.push(view, ConfigError::InvalidPadding(v));
        0.0
    }
}

fn sanitize_padding(view: ViewId, padding: Padding, diags: &mut Diagnostics) -> Padding {
    let mut fix = |v: Option<f64>| v.map(|v| sanitize_amount(view, v, diags));
    Padding {
        top: fix(padding.top),
        right: fix(padding.right),
        bottom: fix(padding.bottom),
        left: fix(padding.left),
    }
}

fn sanitize_insets(view: ViewId, insets: Insets, diags: &mut Diagnostics) -> Insets {
    Insets::new(
        sanitize_amount(view, insets.top, diags),
        sanitize_amount(view, insets.right, diags),
        sanitize_amount(view, insets.bottom, diags),
        sanitize_amount(view, insets.left, diags),
    )
}

/// Resolves a declared theme against the inherited one. Unknown names fall back to the
/// inherited theme.
pub(crate) fn resolve_theme(setting: Option<&ThemeSetting>, inherited: Option<&Theme>) -> Theme {
    let fallback = || inherited.cloned().unwrap_or_default();
    match setting {
        None => fallback(),
        Some(ThemeSetting::Named(name)) => Theme::by_name(name).unwrap_or_else(|_| fallback()),
        Some(ThemeSetting::Custom(theme)) => (**theme).clone(),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn region_validation() {
        assert!(Region::FULL.validate().is_ok());
        assert!(Region::new(0.5, 0.0, 0.25, 1.0).validate().is_err());
        assert!(Region::new(0.0, 0.0, 1.5, 1.0).validate().is_err());
        assert!(Region::new(f64::NAN, 0.0, 1.0, 1.0).validate().is_err());
    }

    #[test]
    fn region_resolves_inside_parent() {
        let r = Region::new(0.5, 0.0, 1.0, 0.5).resolve(Rect::new(10.0, 20.0, 110.0, 220.0));
        assert_eq!(r, Rect::new(60.0, 20.0, 110.0, 120.0));
    }

    #[test]
    fn dirty_flags() {
        let d = Dirty::DATA | Dirty::LAYOUT;
        assert!(d.contains(Dirty::DATA));
        assert!(!d.contains(Dirty::DATA | Dirty::SCALES));
        assert!(d.needs_prepare());
        assert!(!Dirty::LAYOUT.needs_prepare());
        assert!(Dirty::ALL.contains(Dirty::CHILDREN));
        assert!(Dirty::NONE.is_empty());
    }

    #[test]
    fn malformed_layout_cfg_falls_back() {
        let mut diags = Diagnostics::new();
        let cfg = ViewCfg::new()
            .with_region(Region::new(0.8, 0.0, 0.2, 1.0))
            .with_padding(Padding {
                left: Some(-4.0),
                ..Padding::uniform(10.0)
            })
            .with_theme_name("neon");
        let view = View::new(ViewId(3), Some(ViewId::ROOT), None, &cfg, &mut diags);
        assert_eq!(view.region(), None);
        assert_eq!(view.padding().left, Some(0.0));
        assert_eq!(view.padding().top, Some(10.0));
        assert_eq!(diags.items().len(), 3);
        let theme = resolve_theme(view.theme_setting.as_ref(), Some(&Theme::dark()));
        assert_eq!(theme, Theme::dark());
    }
}
