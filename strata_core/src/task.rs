// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellable animation tasks.
//!
//! Classified diffs become [`AnimationTask`]s keyed by element identity. At most one task per
//! key is in flight: giving a key a new state cancels its running task before the new one starts.

extern crate alloc;

use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::animate::{AnimateCfg, AnimateStage};
use crate::diff::ElementDiff;
use crate::element::{ElementKey, VisualElement};

/// Identifier of a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// A single interpolation the animator should run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationTask {
    /// Task id.
    pub id: TaskId,
    /// Element identity.
    pub key: ElementKey,
    /// Stage being animated.
    pub stage: AnimateStage,
    /// Timing.
    pub cfg: AnimateCfg,
    /// Starting state, when one exists.
    pub from: Option<VisualElement>,
    /// Final state (for leaves, the state being removed).
    pub to: VisualElement,
}

/// External animation engine.
pub trait Animator {
    /// Starts playing `task`.
    fn start(&mut self, task: &AnimationTask);

    /// Stops a running task; the element jumps to whatever state comes next.
    fn cancel(&mut self, id: TaskId);
}

/// An animator that ignores every task.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAnimator;

impl Animator for NoopAnimator {
    fn start(&mut self, _task: &AnimationTask) {}

    fn cancel(&mut self, _id: TaskId) {}
}

/// What a call to [`AnimationQueue::schedule`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Tasks started, in diff order.
    pub started: Vec<TaskId>,
    /// Tasks cancelled because their key received a new state.
    pub cancelled: Vec<TaskId>,
    /// Number of diffs applied without animation.
    pub snapped: usize,
}

/// Tracks in-flight tasks per element key.
#[derive(Debug, Default)]
pub struct AnimationQueue {
    next_id: u64,
    in_flight: HashMap<ElementKey, TaskId>,
}

impl AnimationQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks not yet completed or cancelled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns the running task for `key`, if any.
    pub fn task_for(&self, key: &ElementKey) -> Option<TaskId> {
        self.in_flight.get(key).copied()
    }

    /// Turns classified diffs into animator tasks.
    ///
    /// Unchanged updates leave a running task alone. Every other diff cancels the key's running
    /// task, then either starts a new one or snaps when its stage has no timing.
    ///
    /// Keys absent from `diffs` left on an earlier pass; their tasks are forgotten without a
    /// cancel, so the queue never holds more than the current keys plus this pass's leaves.
    pub fn schedule(
        &mut self,
        diffs: &[ElementDiff],
        animator: &mut dyn Animator,
    ) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        for diff in diffs {
            if diff.stage == AnimateStage::Update && !diff.changed {
                continue;
            }
            if let Some(old) = self.in_flight.remove(&diff.key) {
                tracing::trace!(key = %diff.key, task = old.0, "cancelling superseded animation");
                animator.cancel(old);
                report.cancelled.push(old);
            }
            let Some(cfg) = diff.animate else {
                report.snapped += 1;
                continue;
            };
            let id = TaskId(self.next_id);
            self.next_id += 1;
            let task = AnimationTask {
                id,
                key: diff.key.clone(),
                stage: diff.stage,
                cfg,
                from: diff.previous.clone(),
                to: diff.element.clone(),
            };
            animator.start(&task);
            self.in_flight.insert(diff.key.clone(), id);
            report.started.push(id);
        }
        let present: HashSet<&ElementKey> = diffs.iter().map(|d| &d.key).collect();
        let before = self.in_flight.len();
        self.in_flight.retain(|key, _| present.contains(key));
        if self.in_flight.len() != before {
            tracing::trace!(
                forgotten = before - self.in_flight.len(),
                "dropped tasks of departed keys"
            );
        }
        report
    }

    /// Marks `id` finished. Returns `false` if it was not in flight.
    pub fn complete(&mut self, id: TaskId) -> bool {
        let key = self
            .in_flight
            .iter()
            .find(|(_, t)| **t == id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                self.in_flight.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Cancels every running task (used on teardown).
    pub fn cancel_all(&mut self, animator: &mut dyn Animator) {
        for (_, id) in self.in_flight.drain() {
            animator.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use kurbo::Point;

    use super::*;
    use crate::diff::DiffController;
    use crate::element::{ElementKind, ElementShape, KeyId};
    use crate::id::ViewId;

    #[derive(Default)]
    struct Recorder {
        started: Vec<TaskId>,
        cancelled: Vec<TaskId>,
    }

    impl Animator for Recorder {
        fn start(&mut self, task: &AnimationTask) {
            self.started.push(task.id);
        }

        fn cancel(&mut self, id: TaskId) {
            self.cancelled.push(id);
        }
    }

    fn el(i: usize, x: f64) -> VisualElement {
        VisualElement::new(
            ElementKey::new(ViewId::ROOT, 0, KeyId::Index(i)),
            ElementKind::Point,
            ElementShape::Point {
                center: Point::new(x, 0.0),
                radius: 1.0,
            },
        )
    }

    #[test]
    fn new_state_cancels_in_flight_task() {
        let mut diff = DiffController::new();
        let mut queue = AnimationQueue::new();
        let mut anim = Recorder::default();

        let r1 = queue.schedule(&diff.diff(vec![el(0, 0.0)]), &mut anim);
        assert_eq!(r1.started.len(), 1);
        assert_eq!(queue.in_flight(), 1);

        let r2 = queue.schedule(&diff.diff(vec![el(0, 10.0)]), &mut anim);
        assert_eq!(r2.cancelled, r1.started);
        assert_eq!(anim.cancelled, r1.started);
        assert_eq!(queue.in_flight(), 1);
        assert_ne!(queue.task_for(&el(0, 0.0).key), r1.started.first().copied());
    }

    #[test]
    fn unchanged_update_keeps_running_task() {
        let mut diff = DiffController::new();
        let mut queue = AnimationQueue::new();
        let mut anim = Recorder::default();
        queue.schedule(&diff.diff(vec![el(0, 0.0)]), &mut anim);
        let r = queue.schedule(&diff.diff(vec![el(0, 0.0)]), &mut anim);
        assert!(r.started.is_empty());
        assert!(r.cancelled.is_empty());
        assert_eq!(queue.in_flight(), 1);
    }

    #[test]
    fn complete_retires_tasks() {
        let mut diff = DiffController::new();
        let mut queue = AnimationQueue::new();
        let mut anim = Recorder::default();
        let r = queue.schedule(&diff.diff(vec![el(0, 0.0), el(1, 1.0)]), &mut anim);
        assert!(queue.complete(r.started[0]));
        assert!(!queue.complete(r.started[0]));
        assert_eq!(queue.in_flight(), 1);
        queue.cancel_all(&mut anim);
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(anim.cancelled, vec![r.started[1]]);
    }

    #[test]
    fn departed_keys_do_not_accumulate() {
        let mut diff = DiffController::new();
        let mut queue = AnimationQueue::new();
        let mut anim = Recorder::default();
        let mut first = None;
        for pass in 0..50 {
            let base = pass * 3;
            let els = (base..base + 3).map(|i| el(i, 0.0)).collect();
            let r = queue.schedule(&diff.diff(els), &mut anim);
            first.get_or_insert(r.started[0]);
            assert!(queue.in_flight() <= 6, "pass {pass}: {} in flight", queue.in_flight());
        }

        // A key returning long after it left starts fresh without touching its old task.
        let r = queue.schedule(&diff.diff(vec![el(0, 0.0)]), &mut anim);
        let first = first.unwrap();
        assert!(!r.cancelled.contains(&first), "stale task {first:?} cancelled again");
        assert_eq!(anim.cancelled.iter().filter(|id| **id == first).count(), 1);
        assert!(queue.task_for(&el(0, 0.0).key).is_some());
        assert!(queue.in_flight() <= 4, "{} in flight", queue.in_flight());
    }

    #[test]
    fn snapped_stage_cancels_without_starting() {
        let mut diff = DiffController::new();
        let mut queue = AnimationQueue::new();
        let mut anim = Recorder::default();
        queue.schedule(&diff.diff(vec![el(0, 0.0)]), &mut anim);

        let mut moved = el(0, 4.0);
        moved.animate = moved.animate.with_stage(AnimateStage::Update, None);
        let r = queue.schedule(&diff.diff(vec![moved]), &mut anim);
        assert_eq!(r.snapped, 1);
        assert_eq!(r.cancelled.len(), 1);
        assert!(r.started.is_empty());
        assert_eq!(queue.in_flight(), 0);
    }
}
