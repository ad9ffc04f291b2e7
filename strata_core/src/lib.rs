// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the Strata chart engine.
//!
//! A render pass turns records ([`Datum`]) into keyed [`VisualElement`]s. Between passes the
//! [`DiffController`] compares element sets by [`ElementKey`] and classifies every element into
//! one of the lifecycle stages in [`AnimateStage`]. The [`AnimationQueue`] then turns those
//! classifications into cancellable tasks for an external [`Animator`].
//!
//! This crate knows nothing about scales, coordinates or layout; those live in `strata_charts`.

#![no_std]

extern crate alloc;

mod animate;
mod diff;
mod element;
mod id;
mod task;
mod value;

pub use animate::{AnimateCfg, AnimateOption, AnimateStage, Easing};
pub use diff::{DiffController, ElementDiff};
pub use element::{ElementKey, ElementKind, ElementShape, ElementStyle, KeyId, VisualElement};
pub use id::{ComponentId, ViewId};
pub use task::{AnimationQueue, AnimationTask, Animator, NoopAnimator, ScheduleReport, TaskId};
pub use value::{Datum, FieldName, Value, ValueKey};
