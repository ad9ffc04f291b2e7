// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed element diffing across render passes.
//!
//! Per key the transitions are:
//!
//! | previous pass | this pass | stage                                          |
//! |---------------|-----------|------------------------------------------------|
//! | (no render)   | present   | [`Appear`](AnimateStage::Appear)               |
//! | absent        | present   | [`Enter`](AnimateStage::Enter)                 |
//! | present       | present   | [`Update`](AnimateStage::Update)               |
//! | present       | absent    | [`Leave`](AnimateStage::Leave)                 |
//!
//! The output is a pure function of the previous and next element lists: elements of this
//! pass in their order, followed by leaving elements in their previous order.

extern crate alloc;

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::animate::{AnimateCfg, AnimateStage};
use crate::element::{ElementKey, VisualElement};

/// A classified element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementDiff {
    /// Element identity.
    pub key: ElementKey,
    /// Lifecycle stage.
    pub stage: AnimateStage,
    /// Target state. For [`AnimateStage::Leave`] this is the last known state.
    pub element: VisualElement,
    /// State on the previous pass (only for updates).
    pub previous: Option<VisualElement>,
    /// Whether an update changes any drawable state.
    pub changed: bool,
    /// Timing for this stage, or `None` for an instantaneous snap.
    pub animate: Option<AnimateCfg>,
}

/// Remembers the previous pass and classifies the next one against it.
#[derive(Debug, Default)]
pub struct DiffController {
    previous: Vec<VisualElement>,
    index: HashMap<ElementKey, usize>,
    rendered: bool,
}

impl DiffController {
    /// Creates a controller that has not rendered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once [`DiffController::diff`] has been called since the last reset.
    pub fn has_rendered(&self) -> bool {
        self.rendered
    }

    /// Elements of the last pass, with disambiguated keys.
    pub fn previous(&self) -> &[VisualElement] {
        &self.previous
    }

    /// Forgets the previous pass; the next diff classifies everything as `appear`.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.index.clear();
        self.rendered = false;
    }

    /// Classifies `next` against the previous pass and makes it the new previous pass.
    pub fn diff(&mut self, mut next: Vec<VisualElement>) -> Vec<ElementDiff> {
        disambiguate(&mut next);

        let first = !self.rendered;
        let mut next_index: HashMap<ElementKey, usize> = HashMap::with_capacity(next.len());
        let mut out = Vec::with_capacity(next.len());

        for (i, element) in next.iter().enumerate() {
            next_index.insert(element.key.clone(), i);
            let prev = if first {
                None
            } else {
                self.index.get(&element.key).map(|&p| &self.previous[p])
            };
            let (stage, previous, changed) = match prev {
                _ if first => (AnimateStage::Appear, None, true),
                Some(p) => (AnimateStage::Update, Some(p.clone()), !p.visual_eq(element)),
                None => (AnimateStage::Enter, None, true),
            };
            out.push(ElementDiff {
                key: element.key.clone(),
                stage,
                animate: element.animate.get(stage),
                element: element.clone(),
                previous,
                changed,
            });
        }

        for old in &self.previous {
            if next_index.contains_key(&old.key) {
                continue;
            }
            out.push(ElementDiff {
                key: old.key.clone(),
                stage: AnimateStage::Leave,
                animate: old.animate.get(AnimateStage::Leave),
                element: old.clone(),
                previous: None,
                changed: true,
            });
        }

        tracing::trace!(
            elements = next.len(),
            leaving = out.len() - next.len(),
            first,
            "diffed render pass"
        );

        self.previous = next;
        self.index = next_index;
        self.rendered = true;
        out
    }
}

/// Assigns occurrence counters to repeated keys so every key in a pass is unique.
fn disambiguate(elements: &mut [VisualElement]) {
    let mut seen: HashMap<ElementKey, u32> = HashMap::new();
    for element in elements.iter_mut() {
        let mut base = element.key.clone();
        base.dup = 0;
        let count = seen.entry(base).or_insert(0);
        element.key.dup = *count;
        *count += 1;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use kurbo::Point;

    use super::*;
    use crate::element::{ElementKind, ElementShape, KeyId};
    use crate::id::ViewId;
    use crate::value::Value;

    fn el(name: &str, y: f64) -> VisualElement {
        VisualElement::new(
            ElementKey::new(ViewId::ROOT, 0, KeyId::Field(Value::from(name).key())),
            ElementKind::Point,
            ElementShape::Point {
                center: Point::new(0.0, y),
                radius: 2.0,
            },
        )
    }

    fn stages(diffs: &[ElementDiff]) -> Vec<(std::string::String, AnimateStage)> {
        diffs
            .iter()
            .map(|d| (std::format!("{}", d.key.id), d.stage))
            .collect()
    }

    #[test]
    fn first_render_is_all_appear() {
        let mut c = DiffController::new();
        let diffs = c.diff(vec![el("a", 0.0), el("b", 1.0)]);
        assert!(diffs.iter().all(|d| d.stage == AnimateStage::Appear));
        assert!(c.has_rendered());
    }

    #[test]
    fn keyed_transitions() {
        let mut c = DiffController::new();
        c.diff(vec![el("a", 0.0), el("b", 1.0), el("c", 2.0)]);
        let diffs = c.diff(vec![el("b", 1.0), el("c", 5.0), el("d", 3.0)]);
        assert_eq!(
            stages(&diffs),
            vec![
                ("b".into(), AnimateStage::Update),
                ("c".into(), AnimateStage::Update),
                ("d".into(), AnimateStage::Enter),
                ("a".into(), AnimateStage::Leave),
            ]
        );
        assert!(!diffs[0].changed, "b kept its state");
        assert!(diffs[1].changed, "c moved");
        assert_eq!(
            diffs[1].previous.as_ref().map(|p| p.shape.bounds().center().y),
            Some(2.0)
        );
    }

    #[test]
    fn duplicate_keys_are_disambiguated() {
        let mut c = DiffController::new();
        let diffs = c.diff(vec![el("a", 0.0), el("a", 1.0)]);
        assert_eq!(diffs[0].key.dup, 0);
        assert_eq!(diffs[1].key.dup, 1);

        let diffs = c.diff(vec![el("a", 0.0)]);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[1].stage, AnimateStage::Leave);
        assert_eq!(diffs[1].key.dup, 1);
    }

    #[test]
    fn disabled_stage_has_no_timing() {
        let mut c = DiffController::new();
        let mut a = el("a", 0.0);
        a.animate = a.animate.with_stage(AnimateStage::Appear, None);
        let diffs = c.diff(vec![a]);
        assert_eq!(diffs[0].animate, None);
    }

    #[test]
    fn reset_starts_over_with_appear() {
        let mut c = DiffController::new();
        c.diff(vec![el("a", 0.0)]);
        c.reset();
        let diffs = c.diff(vec![el("a", 0.0)]);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].stage, AnimateStage::Appear);
    }
}
