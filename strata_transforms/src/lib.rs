// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data transforms applied before geometry encoding.
//!
//! This crate provides:
//! - position adjusts ([`stack`], [`dodge`], [`jitter`]) that run in value or normalized space,
//!   before any coordinate conversion, and
//! - per-field record filters ([`FieldFilter`]).

#![no_std]

extern crate alloc;

mod adjust;
mod filter;

pub use adjust::{
    AdjustKind, AdjustOption, StackInput, StackOffset, dodge, first_seen_ranks, jitter, stack,
};
pub use filter::{CompareOp, FieldFilter, FilterFn, Predicate, apply_filters};
