// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for the coordinate pipeline and layout negotiation.

use kurbo::{Point, Rect, Size};
use proptest::prelude::*;
use strata_charts::{
    ComponentBackend, ComponentDescriptor, ComponentHandle, ComponentModel, ComponentPadding,
    CoordAction, Coordinate, CoordinateCfg, CoordinateKind, Direction, Insets, Negotiator,
    Padding, ReflectAxis, TooltipCfg,
};
use strata_core::{ComponentId, ViewId};

fn action() -> impl Strategy<Value = CoordAction> {
    prop_oneof![
        (-3.0..3.0_f64).prop_map(CoordAction::Rotate),
        (0.5..2.0_f64, 0.5..2.0_f64).prop_map(|(sx, sy)| CoordAction::Scale(sx, sy)),
        Just(CoordAction::Reflect(ReflectAxis::X)),
        Just(CoordAction::Reflect(ReflectAxis::Y)),
        Just(CoordAction::Transpose),
    ]
}

fn kind() -> impl Strategy<Value = CoordinateKind> {
    prop_oneof![
        Just(CoordinateKind::Rect),
        Just(CoordinateKind::Polar),
        Just(CoordinateKind::Theta),
        Just(CoordinateKind::Helix),
    ]
}

/// A normalized point away from the polar pole and the angular seam. The radial input may sit
/// on the outer edge.
fn sample(kind: CoordinateKind, a: f64, b: f64) -> Point {
    match kind {
        CoordinateKind::Rect => Point::new(a, b),
        CoordinateKind::Polar | CoordinateKind::Helix => Point::new(a, b),
        CoordinateKind::Theta => Point::new(b, a),
    }
}

proptest! {
    #[test]
    fn convert_then_invert_round_trips(
        kind in kind(),
        actions in prop::collection::vec(action(), 0..4),
        a in 0.02..0.98_f64,
        b in 0.05..=1.0_f64,
    ) {
        let region = Rect::new(10.0, 20.0, 410.0, 320.0);
        let coord = Coordinate::with_actions(kind, CoordinateCfg::default(), actions, region);
        let p = sample(kind, a, b);
        let q = coord.invert(coord.convert(p));
        prop_assert!((p.x - q.x).abs() < 1e-6, "{kind:?}: {p:?} -> {q:?}");
        prop_assert!((p.y - q.y).abs() < 1e-6, "{kind:?}: {p:?} -> {q:?}");
    }
}

/// Thickness steps up as the trial region narrows, like axis labels that start rotating.
struct Stepped;

impl ComponentBackend for Stepped {
    fn measure(&self, d: &ComponentDescriptor, available: Rect) -> Size {
        let base = (d.id.as_str().len() % 5) as f64 * 6.0 + 10.0;
        let t = if available.width() < 250.0 { base * 2.0 } else { base };
        if d.direction.is_horizontal() {
            Size::new(available.width().min(120.0), t)
        } else {
            Size::new(t, available.height().min(120.0))
        }
    }

    fn mount(&mut self, _d: &ComponentDescriptor) -> ComponentHandle {
        ComponentHandle(0)
    }

    fn update(&mut self, _h: ComponentHandle, _d: &ComponentDescriptor) {}

    fn unmount(&mut self, _h: ComponentHandle) {}
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Top),
        Just(Direction::Bottom),
        Just(Direction::Left),
        Just(Direction::Right),
        Just(Direction::BottomLeft),
        Just(Direction::RightTop),
        Just(Direction::None),
    ]
}

fn components(specs: &[(Direction, Option<f64>)]) -> Vec<ComponentDescriptor> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (direction, fixed))| {
            let d = ComponentDescriptor::new(
                ComponentId::new(ViewId::ROOT, &format!("c{i}")),
                *direction,
                ComponentModel::Tooltip(TooltipCfg::default()),
            );
            match fixed {
                Some(p) => d.with_padding(ComponentPadding::Fixed(*p)),
                None => d,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn negotiation_is_bounded_and_deterministic(
        specs in prop::collection::vec((direction(), prop::option::of(0.0..30.0_f64)), 0..6),
        width in 100.0..600.0_f64,
        height in 100.0..600.0_f64,
        cap in 1usize..6,
    ) {
        let bounds = Rect::new(0.0, 0.0, width, height);
        let negotiator = Negotiator::new(cap, 4.0);

        let mut first = components(&specs);
        let a = negotiator.negotiate(
            ViewId::ROOT,
            bounds,
            &Padding::AUTO,
            &Insets::ZERO,
            &mut first,
            &Stepped,
        );
        let mut second = components(&specs);
        let b = negotiator.negotiate(
            ViewId::ROOT,
            bounds,
            &Padding::AUTO,
            &Insets::ZERO,
            &mut second,
            &Stepped,
        );

        prop_assert_eq!(a, b);
        prop_assert_eq!(first, second);
        prop_assert!(a.iterations <= cap);
        prop_assert!(a.region.x0 >= bounds.x0 && a.region.y0 >= bounds.y0);
        prop_assert!(a.region.x1 <= bounds.x1 && a.region.y1 <= bounds.y1);
        prop_assert!(a.region.width() >= 0.0 && a.region.height() >= 0.0);
    }

    #[test]
    fn footprints_never_shrink_with_more_passes(
        specs in prop::collection::vec((direction(), Just(None::<f64>)), 1..6),
        width in 100.0..600.0_f64,
    ) {
        let bounds = Rect::new(0.0, 0.0, width, 300.0);
        let mut prev = Insets::ZERO;
        for cap in 1..6 {
            let mut comps = components(&specs);
            let r = Negotiator::new(cap, 0.0).negotiate(
                ViewId::ROOT,
                bounds,
                &Padding::AUTO,
                &Insets::ZERO,
                &mut comps,
                &Stepped,
            );
            prop_assert!(r.footprints.top >= prev.top);
            prop_assert!(r.footprints.right >= prev.right);
            prop_assert!(r.footprints.bottom >= prev.bottom);
            prop_assert!(r.footprints.left >= prev.left);
            prev = r.footprints;
        }
    }
}
