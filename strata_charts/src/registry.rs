// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The chart-wide scale registry.
//!
//! Every `(view, field)` pair that a geometry or component references owns one slot. Slots that
//! share a sync key are unified in [`ScaleRegistry::sync_all`], which runs once per pass after
//! every view has observed its data.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::hash_map::Entry;
use hashbrown::{HashMap, HashSet};
use strata_core::{FieldName, Value, ViewId};

use crate::error::{ConfigError, Diagnostics};
use crate::scale::{Domain, Scale, ScaleOption, ScaleSync, observe_domain};

/// Identifies one scale: a field as seen by one view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScaleSlot {
    /// Owning view.
    pub view: ViewId,
    /// Field name.
    pub field: FieldName,
}

impl ScaleSlot {
    /// Creates a slot.
    pub fn new(view: ViewId, field: impl Into<FieldName>) -> Self {
        Self {
            view,
            field: field.into(),
        }
    }
}

/// Owns every scale of a chart, in registration order.
#[derive(Clone, Debug, Default)]
pub struct ScaleRegistry {
    scales: HashMap<ScaleSlot, Scale>,
    order: Vec<ScaleSlot>,
}

impl ScaleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered scales.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no scale is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a scale.
    pub fn get(&self, view: ViewId, field: &str) -> Option<&Scale> {
        self.scales.get(&ScaleSlot::new(view, field))
    }

    /// Iterates scales in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ScaleSlot, &Scale)> {
        self.order
            .iter()
            .filter_map(|slot| self.scales.get(slot).map(|s| (slot, s)))
    }

    /// Creates or re-observes the scale for `(view, field)`.
    ///
    /// Unsynchronized scales receive their final domain immediately. Synchronized scales keep
    /// their previous final domain until [`ScaleRegistry::sync_all`] runs, so an unchanged group
    /// does not bump versions.
    pub fn resolve<'a>(
        &mut self,
        view: ViewId,
        field: &FieldName,
        values: impl IntoIterator<Item = &'a Value> + Clone,
        option: &ScaleOption,
        include_zero: bool,
        diags: &mut Diagnostics,
    ) -> &Scale {
        let (kind, err) = option.resolve_type(values.clone());
        if let Some(err) = err {
            diags.push(view, err);
        }
        let slot = ScaleSlot::new(view, field.clone());
        match self.scales.entry(slot) {
            Entry::Occupied(entry) => {
                let scale = entry.into_mut();
                let own = observe_domain(kind, option, values, include_zero);
                scale.reobserve(kind, option.clone(), own.clone());
                if sync_key(scale).is_none() {
                    let finished = scale.finalize(own);
                    scale.set_domain(finished);
                }
                scale
            }
            Entry::Vacant(entry) => {
                tracing::trace!(%view, field = %field, kind = kind.name(), "register scale");
                self.order.push(entry.key().clone());
                entry.insert(Scale::observe(
                    field.clone(),
                    kind,
                    option.clone(),
                    values,
                    include_zero,
                ))
            }
        }
    }

    /// Members of a sync group, in registration order.
    pub fn group(&self, key: &str) -> Vec<&ScaleSlot> {
        self.order
            .iter()
            .filter(|slot| {
                self.scales
                    .get(*slot)
                    .and_then(sync_key)
                    .is_some_and(|k| &*k == key)
            })
            .collect()
    }

    /// Distinct sync keys, in order of first registration.
    pub fn sync_keys(&self) -> Vec<Arc<str>> {
        let mut seen = HashSet::new();
        self.iter()
            .filter_map(|(_, scale)| sync_key(scale))
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }

    /// Unifies every member of `key` against the union of their own domains.
    ///
    /// Members whose scale type differs from the first member are excluded, keep their own
    /// domain, and are reported as [`ConfigError::SyncTypeConflict`]. Returns `true` if any
    /// member's domain changed.
    pub fn sync(&mut self, key: &str, diags: &mut Diagnostics) -> bool {
        let slots: Vec<ScaleSlot> = self.group(key).into_iter().cloned().collect();
        let Some(first) = slots.first().and_then(|s| self.scales.get(s)) else {
            return false;
        };
        let expected = first.kind();
        let mut union: Option<Domain> = None;
        let mut members = Vec::with_capacity(slots.len());
        let mut excluded = Vec::new();
        for slot in &slots {
            let Some(scale) = self.scales.get(slot) else {
                continue;
            };
            if scale.kind() != expected {
                excluded.push(slot.clone());
                diags.push(
                    slot.view,
                    ConfigError::SyncTypeConflict {
                        key: key.into(),
                        field: slot.field.clone(),
                        expected: expected.name(),
                        found: scale.kind().name(),
                    },
                );
                continue;
            }
            union = Some(match union {
                None => scale.own_domain().clone(),
                Some(u) => u.union(scale.own_domain()),
            });
            members.push(slot.clone());
        }
        let Some(union) = union else {
            return false;
        };
        let Some(unified) = members
            .first()
            .and_then(|s| self.scales.get(s))
            .map(|lead| lead.finalize(union))
        else {
            return false;
        };

        let mut changed = false;
        for slot in &members {
            if let Some(scale) = self.scales.get_mut(slot) {
                changed |= scale.set_domain(unified.clone());
            }
        }
        for slot in &excluded {
            if let Some(scale) = self.scales.get_mut(slot) {
                let own = scale.finalize(scale.own_domain().clone());
                changed |= scale.set_domain(own);
            }
        }
        tracing::trace!(
            key,
            members = members.len(),
            excluded = excluded.len(),
            changed,
            "sync group"
        );
        changed
    }

    /// Synchronizes every group. Returns `true` if any domain changed.
    pub fn sync_all(&mut self, diags: &mut Diagnostics) -> bool {
        let mut changed = false;
        for key in self.sync_keys() {
            changed |= self.sync(&key, diags);
        }
        changed
    }

    /// Drops every scale whose slot is not in `referenced`.
    pub fn retain(&mut self, referenced: &HashSet<ScaleSlot>) {
        let before = self.order.len();
        self.order.retain(|slot| referenced.contains(slot));
        self.scales.retain(|slot, _| referenced.contains(slot));
        if before != self.order.len() {
            tracing::trace!(dropped = before - self.order.len(), "released unreferenced scales");
        }
    }

    /// Drops every scale of `view`. Remaining group members keep their unified domain.
    pub fn remove_view(&mut self, view: ViewId) {
        self.order.retain(|slot| slot.view != view);
        self.scales.retain(|slot, _| slot.view != view);
    }
}

/// The sync key a scale participates in, if any.
pub fn sync_key(scale: &Scale) -> Option<Arc<str>> {
    match &scale.option().sync {
        ScaleSync::Off => None,
        ScaleSync::Field => Some(scale.field().clone()),
        ScaleSync::Key(k) => Some(k.clone()),
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use super::*;
    use crate::error::RecoverableError;
    use crate::scale::ScaleType;

    fn nums(xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|x| Value::Number(*x)).collect()
    }

    #[test]
    fn sync_unifies_continuous_domains() {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let field: FieldName = "y".into();
        let opt = ScaleOption::new().with_sync(true);
        reg.resolve(ViewId(1), &field, &nums(&[0.0, 10.0]), &opt, false, &mut diags);
        reg.resolve(ViewId(2), &field, &nums(&[5.0, 40.0]), &opt, false, &mut diags);
        assert!(reg.sync_all(&mut diags));

        let a = reg.get(ViewId(1), "y").unwrap().domain().clone();
        let b = reg.get(ViewId(2), "y").unwrap().domain().clone();
        assert_eq!(a, b);
        assert_eq!(a.extent(), Some((0.0, 40.0)));
        assert!(diags.is_empty());

        // A second pass with the same data changes nothing.
        let version = reg.get(ViewId(1), "y").unwrap().version();
        reg.resolve(ViewId(1), &field, &nums(&[0.0, 10.0]), &opt, false, &mut diags);
        reg.resolve(ViewId(2), &field, &nums(&[5.0, 40.0]), &opt, false, &mut diags);
        assert!(!reg.sync_all(&mut diags));
        assert_eq!(reg.get(ViewId(1), "y").unwrap().version(), version);
    }

    #[test]
    fn sync_key_groups_different_fields_and_categories() {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let opt = ScaleOption::new().with_sync_key("k");
        let a: Vec<Value> = vec!["x".into(), "y".into()];
        let b: Vec<Value> = vec!["z".into(), "x".into()];
        reg.resolve(ViewId(1), &"a".into(), &a, &opt, false, &mut diags);
        reg.resolve(ViewId(1), &"b".into(), &b, &opt, false, &mut diags);
        reg.sync_all(&mut diags);
        let expected = Domain::Categorical(vec!["x".into(), "y".into(), "z".into()]);
        assert_eq!(reg.get(ViewId(1), "a").unwrap().domain(), &expected);
        assert_eq!(reg.get(ViewId(1), "b").unwrap().domain(), &expected);
        assert_eq!(reg.group("k").len(), 2);
    }

    #[test]
    fn mixed_types_are_excluded_with_a_diagnostic() {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let field: FieldName = "v".into();
        let linear = ScaleOption::new().with_sync(true);
        let log = ScaleOption::new().with_sync(true).with_type(ScaleType::Log);
        reg.resolve(ViewId(1), &field, &nums(&[0.0, 10.0]), &linear, false, &mut diags);
        reg.resolve(ViewId(2), &field, &nums(&[1.0, 1000.0]), &log, false, &mut diags);
        reg.sync_all(&mut diags);

        assert_eq!(diags.items().len(), 1);
        assert_eq!(diags.items()[0].view, ViewId(2));
        assert!(matches!(
            diags.items()[0].error,
            RecoverableError::Config(ConfigError::SyncTypeConflict { .. })
        ));
        assert_eq!(
            reg.get(ViewId(2), "v").unwrap().domain().extent(),
            Some((1.0, 1000.0))
        );
        assert_eq!(
            reg.get(ViewId(1), "v").unwrap().domain().extent(),
            Some((0.0, 10.0))
        );
    }

    #[test]
    fn removal_keeps_remaining_members() {
        let mut reg = ScaleRegistry::new();
        let mut diags = Diagnostics::new();
        let field: FieldName = "y".into();
        let opt = ScaleOption::new().with_sync(true);
        reg.resolve(ViewId(1), &field, &nums(&[0.0, 10.0]), &opt, false, &mut diags);
        reg.resolve(ViewId(2), &field, &nums(&[0.0, 100.0]), &opt, false, &mut diags);
        reg.sync_all(&mut diags);
        reg.remove_view(ViewId(2));
        assert_eq!(reg.len(), 1);
        assert_eq!(
            reg.get(ViewId(1), "y").unwrap().domain().extent(),
            Some((0.0, 100.0))
        );

        let keep: HashSet<ScaleSlot> = HashSet::new();
        reg.retain(&keep);
        assert!(reg.is_empty());
    }
}
