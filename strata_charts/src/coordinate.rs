// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate systems.
//!
//! A [`Coordinate`] maps normalized `[0, 1]²` positions into the screen space of a view's
//! content region. The base mapping is chosen by [`CoordinateKind`]; declared
//! [`CoordAction`]s are then composed on top of it, in declaration order, as one affine matrix
//! about the region center. `transpose` is the exception: it swaps the input dimensions before
//! the base mapping.
//!
//! Screen space is y-down; normalized `y = 0` is the bottom of the region.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::f64::consts::{PI, TAU};
use core::fmt::Write;

use kurbo::{Affine, Point, Rect, Vec2};
use strata_core::{Value, ViewId};

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

use crate::error::{ConfigError, Diagnostics};

/// Share of the radial distance between consecutive helix turns that `y` covers. The rest is a
/// gap, so the top of one turn never meets the bottom of the next.
const HELIX_PITCH: f64 = 0.8;

/// Base coordinate mappings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoordinateKind {
    /// Cartesian.
    #[default]
    Rect,
    /// `x` drives the angle, `y` the radius.
    Polar,
    /// `y` drives the angle, `x` the radius.
    Theta,
    /// An archimedean spiral: the radius grows with the angle.
    Helix,
}

impl CoordinateKind {
    /// Parses a type name. `cartesian` is an alias of `rect`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "rect" | "cartesian" => Self::Rect,
            "polar" => Self::Polar,
            "theta" => Self::Theta,
            "helix" => Self::Helix,
            _ => return None,
        })
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Polar => "polar",
            Self::Theta => "theta",
            Self::Helix => "helix",
        }
    }

    fn default_angles(self) -> (f64, f64) {
        match self {
            Self::Helix => (1.25 * PI, 7.25 * PI),
            _ => (-PI / 2.0, 3.0 * PI / 2.0),
        }
    }
}

/// Polar-family settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateCfg {
    /// Start angle in radians. Defaults depend on the kind.
    pub start_angle: Option<f64>,
    /// End angle in radians.
    pub end_angle: Option<f64>,
    /// Outer radius as a fraction of half the shorter region side.
    pub radius: f64,
    /// Inner radius as a fraction of the outer radius.
    pub inner_radius: f64,
}

impl Default for CoordinateCfg {
    fn default() -> Self {
        Self {
            start_angle: None,
            end_angle: None,
            radius: 1.0,
            inner_radius: 0.0,
        }
    }
}

/// Reflection axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReflectAxis {
    /// Mirror horizontally (across the vertical center line).
    X,
    /// Mirror vertically (across the horizontal center line).
    Y,
}

/// A coordinate action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoordAction {
    /// Rotate about the region center by an angle in radians.
    Rotate(f64),
    /// Scale about the region center.
    Scale(f64, f64),
    /// Mirror about the region center.
    Reflect(ReflectAxis),
    /// Swap the input dimensions.
    Transpose,
}

impl CoordAction {
    /// Parses a tuple such as `["rotate", 1.57]`, `["scale", 1, -1]`, `["reflect", "y"]` or
    /// `["transpose"]`.
    pub fn parse(tuple: &[Value]) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedAction(describe(tuple));
        let (name, args) = tuple.split_first().ok_or_else(malformed)?;
        match (name.as_str().ok_or_else(malformed)?, args) {
            ("rotate", [a]) => a.as_f64().map(Self::Rotate).ok_or_else(malformed),
            ("scale", [sx, sy]) => match (sx.as_f64(), sy.as_f64()) {
                (Some(sx), Some(sy)) => Ok(Self::Scale(sx, sy)),
                _ => Err(malformed()),
            },
            ("reflect", [axis]) => match axis.as_str() {
                Some("x") => Ok(Self::Reflect(ReflectAxis::X)),
                Some("y") => Ok(Self::Reflect(ReflectAxis::Y)),
                _ => Err(malformed()),
            },
            ("transpose", []) => Ok(Self::Transpose),
            _ => Err(malformed()),
        }
    }

    /// Returns `false` for actions that would collapse or corrupt the mapping.
    pub fn is_invertible(&self) -> bool {
        match *self {
            Self::Rotate(a) => a.is_finite(),
            Self::Scale(sx, sy) => sx.is_finite() && sy.is_finite() && sx != 0.0 && sy != 0.0,
            Self::Reflect(_) | Self::Transpose => true,
        }
    }

    fn matrix(&self, center: Point) -> Affine {
        let c = center.to_vec2();
        match *self {
            Self::Rotate(a) => Affine::rotate_about(a, center),
            Self::Scale(sx, sy) => about(c, sx, sy),
            Self::Reflect(ReflectAxis::X) => about(c, -1.0, 1.0),
            Self::Reflect(ReflectAxis::Y) => about(c, 1.0, -1.0),
            Self::Transpose => Affine::IDENTITY,
        }
    }
}

fn about(c: Vec2, sx: f64, sy: f64) -> Affine {
    Affine::translate(c) * Affine::scale_non_uniform(sx, sy) * Affine::translate(-c)
}

fn describe(tuple: &[Value]) -> Arc<str> {
    let mut out = String::from("[");
    for (i, v) in tuple.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v}");
    }
    out.push(']');
    out.into()
}

/// A declared action: already typed, or a raw tuple parsed at build time.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionDecl {
    /// A typed action.
    Action(CoordAction),
    /// A tuple, e.g. `["rotate", 1.57]`.
    Tuple(Vec<Value>),
}

/// Declared coordinate options.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateOption {
    /// Type name (`rect`, `cartesian`, `polar`, `theta`, `helix`).
    pub kind: Arc<str>,
    /// Polar-family settings.
    pub cfg: CoordinateCfg,
    /// Actions in declaration order.
    pub actions: Vec<ActionDecl>,
}

impl Default for CoordinateOption {
    fn default() -> Self {
        Self {
            kind: CoordinateKind::Rect.name().into(),
            cfg: CoordinateCfg::default(),
            actions: Vec::new(),
        }
    }
}

impl CoordinateOption {
    /// Creates options for a kind.
    pub fn new(kind: CoordinateKind) -> Self {
        Self {
            kind: kind.name().into(),
            ..Self::default()
        }
    }

    /// Creates options from a type name, validated at build time.
    pub fn named(kind: impl Into<Arc<str>>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Sets the polar-family settings.
    pub fn with_cfg(mut self, cfg: CoordinateCfg) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets start and end angles.
    pub fn with_angles(mut self, start: f64, end: f64) -> Self {
        self.cfg.start_angle = Some(start);
        self.cfg.end_angle = Some(end);
        self
    }

    /// Sets the inner radius fraction.
    pub fn with_inner_radius(mut self, inner: f64) -> Self {
        self.cfg.inner_radius = inner;
        self
    }

    /// Sets the outer radius fraction.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.cfg.radius = radius;
        self
    }

    /// Appends a typed action.
    pub fn with_action(mut self, action: CoordAction) -> Self {
        self.actions.push(ActionDecl::Action(action));
        self
    }

    /// Appends a tuple action.
    pub fn with_tuple(mut self, tuple: impl IntoIterator<Item = Value>) -> Self {
        self.actions
            .push(ActionDecl::Tuple(tuple.into_iter().collect()));
        self
    }

    /// Appends a rotation (radians).
    pub fn rotate(self, angle: f64) -> Self {
        self.with_action(CoordAction::Rotate(angle))
    }

    /// Appends a scale.
    pub fn scale(self, sx: f64, sy: f64) -> Self {
        self.with_action(CoordAction::Scale(sx, sy))
    }

    /// Appends a reflection.
    pub fn reflect(self, axis: ReflectAxis) -> Self {
        self.with_action(CoordAction::Reflect(axis))
    }

    /// Appends a transpose.
    pub fn transpose(self) -> Self {
        self.with_action(CoordAction::Transpose)
    }

    /// Resolves the declared kind, falling back to `rect`.
    pub fn resolve_kind(&self) -> Result<CoordinateKind, ConfigError> {
        CoordinateKind::from_name(&self.kind)
            .ok_or_else(|| ConfigError::UnknownCoordinate(self.kind.clone()))
    }

    /// Parses and validates every action, returning the usable ones and the errors.
    pub fn parse_actions(&self) -> (Vec<CoordAction>, Vec<ConfigError>) {
        let mut ok = Vec::with_capacity(self.actions.len());
        let mut errors = Vec::new();
        for decl in &self.actions {
            let action = match decl {
                ActionDecl::Action(a) => *a,
                ActionDecl::Tuple(t) => match CoordAction::parse(t) {
                    Ok(a) => a,
                    Err(e) => {
                        errors.push(e);
                        continue;
                    }
                },
            };
            if action.is_invertible() {
                ok.push(action);
            } else {
                errors.push(ConfigError::DegenerateAction(
                    alloc::format!("{action:?}").into(),
                ));
            }
        }
        (ok, errors)
    }
}

/// Dimension selector for [`Coordinate::convert_dim`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    /// Normalized x.
    X,
    /// Normalized y.
    Y,
}

/// A built coordinate system.
#[derive(Clone, Debug, PartialEq)]
pub struct Coordinate {
    kind: CoordinateKind,
    region: Rect,
    start_angle: f64,
    end_angle: f64,
    radius: f64,
    inner_radius: f64,
    actions: Vec<CoordAction>,
    transposed: bool,
    matrix: Affine,
    inverse: Affine,
}

impl Coordinate {
    /// Builds a coordinate for `region`, recording configuration errors.
    pub fn build(
        view: ViewId,
        option: &CoordinateOption,
        region: Rect,
        diags: &mut Diagnostics,
    ) -> Self {
        let kind = option.resolve_kind().unwrap_or_else(|e| {
            diags.push(view, e);
            CoordinateKind::Rect
        });
        let (actions, errors) = option.parse_actions();
        for e in errors {
            diags.push(view, e);
        }
        Self::with_actions(kind, option.cfg, actions, region)
    }

    /// Builds a coordinate from already validated parts.
    pub fn with_actions(
        kind: CoordinateKind,
        cfg: CoordinateCfg,
        actions: Vec<CoordAction>,
        region: Rect,
    ) -> Self {
        let (s, e) = kind.default_angles();
        let mut coord = Self {
            kind,
            region,
            start_angle: cfg.start_angle.filter(|a| a.is_finite()).unwrap_or(s),
            end_angle: cfg.end_angle.filter(|a| a.is_finite()).unwrap_or(e),
            radius: if cfg.radius.is_finite() && cfg.radius > 0.0 {
                cfg.radius
            } else {
                1.0
            },
            inner_radius: if cfg.inner_radius.is_finite() {
                cfg.inner_radius.clamp(0.0, 0.99)
            } else {
                0.0
            },
            actions,
            transposed: false,
            matrix: Affine::IDENTITY,
            inverse: Affine::IDENTITY,
        };
        coord.rebuild();
        coord
    }

    /// A plain cartesian coordinate.
    pub fn rect(region: Rect) -> Self {
        Self::with_actions(
            CoordinateKind::Rect,
            CoordinateCfg::default(),
            Vec::new(),
            region,
        )
    }

    fn rebuild(&mut self) {
        let center = self.region.center();
        let mut matrix = Affine::IDENTITY;
        let mut transposed = false;
        for action in &self.actions {
            if *action == CoordAction::Transpose {
                transposed = !transposed;
            } else {
                matrix = action.matrix(center) * matrix;
            }
        }
        self.transposed = transposed;
        self.matrix = matrix;
        self.inverse = matrix.inverse();
    }

    /// Re-targets the coordinate at a new region, keeping kind and actions.
    pub fn update(&mut self, region: Rect) {
        if region != self.region {
            self.region = region;
            self.rebuild();
        }
    }

    /// Kind.
    pub fn kind(&self) -> CoordinateKind {
        self.kind
    }

    /// Region the coordinate maps into.
    pub fn region(&self) -> Rect {
        self.region
    }

    /// Valid actions, in declaration order.
    pub fn actions(&self) -> &[CoordAction] {
        &self.actions
    }

    /// Region center.
    pub fn center(&self) -> Point {
        self.region.center()
    }

    /// Outer radius in screen units (polar family).
    pub fn radius(&self) -> f64 {
        0.5 * self.region.width().min(self.region.height()).max(0.0) * self.radius
    }

    /// Inner radius fraction.
    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }

    /// Start and end angles in radians.
    pub fn angles(&self) -> (f64, f64) {
        (self.start_angle, self.end_angle)
    }

    /// Returns `true` for polar, theta and helix.
    pub fn is_polar(&self) -> bool {
        self.kind != CoordinateKind::Rect
    }

    /// Returns `true` when an odd number of `transpose` actions was declared.
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    /// Maps a normalized position into screen space.
    pub fn convert(&self, p: Point) -> Point {
        let p = if self.transposed {
            Point::new(p.y, p.x)
        } else {
            p
        };
        self.matrix * self.base(p)
    }

    /// Maps a screen position back into normalized space.
    pub fn invert(&self, p: Point) -> Point {
        let q = self.base_inverse(self.inverse * p);
        if self.transposed {
            Point::new(q.y, q.x)
        } else {
            q
        }
    }

    /// Projects one normalized dimension onto its screen measure: pixels along the axis for
    /// `rect`, the angle (radians) or radius (pixels) for the polar family.
    pub fn convert_dim(&self, dim: Dim, v: f64) -> f64 {
        let dim = match (self.transposed, dim) {
            (true, Dim::X) => Dim::Y,
            (true, Dim::Y) => Dim::X,
            (false, d) => d,
        };
        let r = self.region;
        match (self.kind, dim) {
            (CoordinateKind::Rect, Dim::X) => r.x0 + v * r.width(),
            (CoordinateKind::Rect, Dim::Y) => r.y1 - v * r.height(),
            (CoordinateKind::Polar | CoordinateKind::Helix, Dim::X)
            | (CoordinateKind::Theta, Dim::Y) => self.angle_of(v),
            (CoordinateKind::Polar | CoordinateKind::Helix, Dim::Y)
            | (CoordinateKind::Theta, Dim::X) => self.radius_of(v),
        }
    }

    fn angle_of(&self, t: f64) -> f64 {
        self.start_angle + t * (self.end_angle - self.start_angle)
    }

    fn radius_of(&self, t: f64) -> f64 {
        (self.inner_radius + t * (1.0 - self.inner_radius)) * self.radius()
    }

    fn turns(&self) -> f64 {
        ((self.end_angle - self.start_angle) / TAU).abs().max(1e-9)
    }

    fn polar_point(&self, angle: f64, r: f64) -> Point {
        let c = self.center();
        Point::new(c.x + r * angle.cos(), c.y + r * angle.sin())
    }

    fn base(&self, p: Point) -> Point {
        let r = self.region;
        match self.kind {
            CoordinateKind::Rect => Point::new(r.x0 + p.x * r.width(), r.y1 - p.y * r.height()),
            CoordinateKind::Polar => self.polar_point(self.angle_of(p.x), self.radius_of(p.y)),
            CoordinateKind::Theta => self.polar_point(self.angle_of(p.y), self.radius_of(p.x)),
            CoordinateKind::Helix => {
                let turns = self.turns();
                let s = (p.x + HELIX_PITCH * p.y / turns) / (1.0 + HELIX_PITCH / turns);
                self.polar_point(self.angle_of(p.x), self.radius_of(s))
            }
        }
    }

    /// Returns `(angle offset from start in [0, 2π), radius fraction)`.
    fn polar_parts(&self, p: Point) -> (f64, f64) {
        let c = self.center();
        let (dx, dy) = (p.x - c.x, p.y - c.y);
        let dist = (dx * dx + dy * dy).sqrt();
        let span = self.end_angle - self.start_angle;
        let mut a = dy.atan2(dx) - self.start_angle;
        if span < 0.0 {
            a = -a;
        }
        let a = a - (a / TAU).floor() * TAU;
        let max = self.radius();
        let frac = if max > 0.0 { dist / max } else { 0.0 };
        let inner = self.inner_radius;
        (a, (frac - inner) / (1.0 - inner))
    }

    fn base_inverse(&self, p: Point) -> Point {
        let r = self.region;
        let span = (self.end_angle - self.start_angle).abs();
        match self.kind {
            CoordinateKind::Rect => {
                let x = if r.width() == 0.0 {
                    0.0
                } else {
                    (p.x - r.x0) / r.width()
                };
                let y = if r.height() == 0.0 {
                    0.0
                } else {
                    (r.y1 - p.y) / r.height()
                };
                Point::new(x, y)
            }
            CoordinateKind::Polar | CoordinateKind::Theta => {
                let (a, t) = self.polar_parts(p);
                let u = if span > 0.0 { a / span } else { 0.0 };
                if self.kind == CoordinateKind::Polar {
                    Point::new(u, t)
                } else {
                    Point::new(t, u)
                }
            }
            CoordinateKind::Helix => {
                let (a, t) = self.polar_parts(p);
                let turns = self.turns();
                let s = t * (1.0 + HELIX_PITCH / turns);
                let phase = a / (TAU * turns);
                // (s - phase) * turns = k + HELIX_PITCH * y, and HELIX_PITCH * y < 1.
                let k = ((s - phase) * turns - HELIX_PITCH / 2.0).round();
                let x = phase + k / turns;
                Point::new(x, (s - x) * turns / HELIX_PITCH)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;

    fn region() -> Rect {
        Rect::new(10.0, 20.0, 410.0, 320.0)
    }

    fn assert_close(a: Point, b: Point) {
        assert!((a - b).hypot() < 1e-6, "{a:?} != {b:?}");
    }

    fn round_trip(coord: &Coordinate, points: &[(f64, f64)]) {
        for &(x, y) in points {
            let p = Point::new(x, y);
            assert_close(coord.invert(coord.convert(p)), p);
        }
    }

    const SAMPLES: &[(f64, f64)] = &[(0.1, 0.2), (0.5, 0.5), (0.9, 0.3), (0.25, 0.95)];

    #[test]
    fn rect_maps_y_up() {
        let c = Coordinate::rect(region());
        assert_close(c.convert(Point::new(0.0, 0.0)), Point::new(10.0, 320.0));
        assert_close(c.convert(Point::new(1.0, 1.0)), Point::new(410.0, 20.0));
        round_trip(&c, SAMPLES);
    }

    #[test]
    fn actions_round_trip_on_every_kind() {
        let actions = vec![
            CoordAction::Rotate(0.3),
            CoordAction::Scale(2.0, -0.5),
            CoordAction::Reflect(ReflectAxis::X),
            CoordAction::Transpose,
        ];
        for kind in [
            CoordinateKind::Rect,
            CoordinateKind::Polar,
            CoordinateKind::Theta,
            CoordinateKind::Helix,
        ] {
            let cfg = CoordinateCfg {
                inner_radius: 0.2,
                ..CoordinateCfg::default()
            };
            for n in 0..=actions.len() {
                let c = Coordinate::with_actions(kind, cfg, actions[..n].to_vec(), region());
                round_trip(&c, SAMPLES);
            }
        }
    }

    #[test]
    fn action_order_matters() {
        let a = Coordinate::with_actions(
            CoordinateKind::Rect,
            CoordinateCfg::default(),
            vec![
                CoordAction::Rotate(PI / 2.0),
                CoordAction::Reflect(ReflectAxis::X),
            ],
            region(),
        );
        let b = Coordinate::with_actions(
            CoordinateKind::Rect,
            CoordinateCfg::default(),
            vec![
                CoordAction::Reflect(ReflectAxis::X),
                CoordAction::Rotate(PI / 2.0),
            ],
            region(),
        );
        let p = Point::new(0.1, 0.2);
        assert!((a.convert(p) - b.convert(p)).hypot() > 1.0);
    }

    #[test]
    fn polar_starts_at_twelve_o_clock() {
        let c = Coordinate::with_actions(
            CoordinateKind::Polar,
            CoordinateCfg::default(),
            Vec::new(),
            Rect::new(0.0, 0.0, 200.0, 200.0),
        );
        assert_close(c.convert(Point::new(0.0, 1.0)), Point::new(100.0, 0.0));
        assert_close(c.convert(Point::new(0.25, 1.0)), Point::new(200.0, 100.0));
        assert!((c.radius() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn helix_turns_do_not_touch() {
        let cfg = CoordinateCfg {
            inner_radius: 0.2,
            ..CoordinateCfg::default()
        };
        let c = Coordinate::with_actions(CoordinateKind::Helix, cfg, Vec::new(), region());
        round_trip(
            &c,
            &[(0.1, 1.0), (0.5, 1.0), (0.9, 1.0), (0.1, 0.0), (0.5, 0.0), (1.0, 1.0)],
        );
        let step = 1.0 / c.turns();
        for x in [0.05, 0.3, 0.6] {
            let top = c.convert(Point::new(x, 1.0));
            let next = c.convert(Point::new(x + step, 0.0));
            assert!((top - next).hypot() > 1.0, "turn edges meet at x = {x}");
        }
    }

    #[test]
    fn transpose_swaps_inputs() {
        let c = Coordinate::with_actions(
            CoordinateKind::Rect,
            CoordinateCfg::default(),
            vec![CoordAction::Transpose],
            region(),
        );
        assert!(c.is_transposed());
        let plain = Coordinate::rect(region());
        assert_close(
            c.convert(Point::new(0.2, 0.7)),
            plain.convert(Point::new(0.7, 0.2)),
        );
    }

    #[test]
    fn tuples_parse_and_bad_ones_are_skipped() {
        let option = CoordinateOption::named("polar")
            .with_tuple([Value::from("rotate"), Value::from(1.0)])
            .with_tuple([Value::from("reflect"), Value::from("z")])
            .with_tuple([Value::from("scale"), Value::from(0.0), Value::from(1.0)])
            .with_tuple([Value::from("transpose")]);
        let mut diags = Diagnostics::new();
        let c = Coordinate::build(ViewId(3), &option, region(), &mut diags);
        assert_eq!(c.kind(), CoordinateKind::Polar);
        assert_eq!(
            c.actions(),
            &[CoordAction::Rotate(1.0), CoordAction::Transpose]
        );
        assert_eq!(diags.items().len(), 2);

        let mut diags = Diagnostics::new();
        let sphere = CoordinateOption::named("sphere");
        let c = Coordinate::build(ViewId(3), &sphere, region(), &mut diags);
        assert_eq!(c.kind(), CoordinateKind::Rect);
        assert_eq!(diags.items().len(), 1);
    }

    #[test]
    fn update_keeps_actions() {
        let mut c = Coordinate::with_actions(
            CoordinateKind::Rect,
            CoordinateCfg::default(),
            vec![CoordAction::Rotate(0.5)],
            region(),
        );
        c.update(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(c.region(), Rect::new(0.0, 0.0, 100.0, 50.0));
        round_trip(&c, SAMPLES);
    }
}
