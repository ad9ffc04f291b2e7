// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The chart: view arena, render passes and lifecycle.
//!
//! A render pass runs three phases over the views in pre-order:
//!
//! - **Prepare**: filters, grouping, value-space adjusts and scale observation, then registry
//!   synchronization. Views whose data-side channels are clean skip straight to marking their
//!   scales as referenced.
//! - **Layout**: coordinate, components, negotiation, child regions, encoding, annotations. A
//!   clean view with an unchanged region and unchanged scale versions reuses its cached frame.
//! - **Commit**: element diff, animation scheduling, component mount/update/unmount, and
//!   hand-off to the render backend.

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect, Size};
use strata_core::{
    AnimationQueue, Animator, ComponentId, Datum, DiffController, FieldName, NoopAnimator, TaskId,
    ViewId, VisualElement,
};
use strata_transforms::apply_filters;

use crate::annotation::{AnnotationContext, annotation_component};
use crate::axis::{AxisField, axis_components};
use crate::backend::{
    ComponentBackend, HeuristicComponentBackend, NullRenderBackend, RenderBackend, RenderFrame,
    ViewFrame,
};
use crate::component::ComponentHandle;
use crate::coordinate::{Coordinate, Dim};
use crate::error::{Diagnostics, StrataError};
use crate::geometry::{EncodeContext, GeometryOption, Observation, encode, prepare};
use crate::layout::{NegotiationResult, Negotiator};
use crate::legend::legend_components;
use crate::options::{ChartCfg, InteractionOption, Options, ViewCfg};
use crate::registry::{ScaleRegistry, ScaleSlot};
use crate::scale::{Scale, ScaleOption};
use crate::theme::Theme;
use crate::tooltip::{TooltipItem, TooltipSource, crosshair_point, find_items, tooltip_components};
use crate::view::{Dirty, LayoutCache, Region, View, resolve_theme};

/// A chart: the root of a view tree plus the state shared across its views.
pub struct Chart {
    size: Size,
    pixel_ratio: f64,
    auto_fit: bool,
    local_refresh: bool,
    default_interactions: Vec<Arc<str>>,
    max_layout_iterations: usize,
    views: HashMap<ViewId, View>,
    next_view: u32,
    registry: ScaleRegistry,
    diff: DiffController,
    queue: AnimationQueue,
    mounted: HashMap<ComponentId, (ViewId, ComponentHandle)>,
    components: Box<dyn ComponentBackend>,
    renderer: Box<dyn RenderBackend>,
    animator: Box<dyn Animator>,
    pending: Diagnostics,
    pass: u64,
    last_frame: Option<RenderFrame>,
    destroyed: bool,
}

impl fmt::Debug for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chart")
            .field("size", &self.size)
            .field("views", &self.views.len())
            .field("scales", &self.registry.len())
            .field("pass", &self.pass)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Chart {
    /// Creates a chart with the heuristic component backend and no renderer or animator.
    pub fn new(cfg: ChartCfg) -> Self {
        Self::with_backends(
            cfg,
            HeuristicComponentBackend::new(),
            NullRenderBackend,
            NoopAnimator,
        )
    }

    /// Creates a chart with explicit backends.
    pub fn with_backends(
        cfg: ChartCfg,
        components: impl ComponentBackend + 'static,
        renderer: impl RenderBackend + 'static,
        animator: impl Animator + 'static,
    ) -> Self {
        let mut chart = Self {
            size: sanitize_size(cfg.width, cfg.height),
            pixel_ratio: if cfg.pixel_ratio.is_finite() && cfg.pixel_ratio > 0.0 {
                cfg.pixel_ratio
            } else {
                1.0
            },
            auto_fit: cfg.auto_fit,
            local_refresh: cfg.local_refresh,
            default_interactions: cfg.default_interactions.clone(),
            max_layout_iterations: cfg.max_layout_iterations.max(1),
            views: HashMap::new(),
            next_view: 0,
            registry: ScaleRegistry::new(),
            diff: DiffController::new(),
            queue: AnimationQueue::new(),
            mounted: HashMap::new(),
            components: Box::new(components),
            renderer: Box::new(renderer),
            animator: Box::new(animator),
            pending: Diagnostics::new(),
            pass: 0,
            last_frame: None,
            destroyed: false,
        };
        let mut diags = Diagnostics::new();
        chart.insert_view(None, None, &cfg.root_view(), &mut diags);
        chart.pending = diags;
        chart
    }

    /// The root view.
    pub fn root(&self) -> ViewId {
        ViewId::ROOT
    }

    /// Looks up a view.
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// Canvas size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Device pixel ratio.
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Whether the host should resize the chart with its container.
    pub fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    /// Returns `true` once [`Chart::destroy`] ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The scale registry.
    pub fn registry(&self) -> &ScaleRegistry {
        &self.registry
    }

    /// The scale of `field` in `view`, as of the last pass.
    pub fn scale(&self, view: ViewId, field: &str) -> Option<&Scale> {
        self.registry.get(view, field)
    }

    /// The most recent frame.
    pub fn last_frame(&self) -> Option<&RenderFrame> {
        self.last_frame.as_ref()
    }

    fn ensure_alive(&self) -> Result<(), StrataError> {
        if self.destroyed {
            Err(StrataError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn ensure_view(&self, id: ViewId) -> Result<(), StrataError> {
        self.ensure_alive()?;
        if self.views.contains_key(&id) {
            Ok(())
        } else {
            Err(StrataError::UnknownView(id))
        }
    }

    fn insert_view(
        &mut self,
        parent: Option<ViewId>,
        declared: Option<usize>,
        cfg: &ViewCfg,
        diags: &mut Diagnostics,
    ) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        self.views
            .insert(id, View::new(id, parent, declared, cfg, diags));
        if let Some(p) = parent.and_then(|p| self.views.get_mut(&p)) {
            p.children.push(id);
        }
        tracing::trace!(%id, ?parent, "created view");
        for (i, child) in cfg.options.views.iter().enumerate() {
            self.insert_view(Some(id), Some(i), child, diags);
        }
        id
    }

    /// Creates a child view of `parent`.
    pub fn create_view(&mut self, parent: ViewId, cfg: ViewCfg) -> Result<ViewId, StrataError> {
        self.ensure_view(parent)?;
        let mut diags = core::mem::take(&mut self.pending);
        let id = self.insert_view(Some(parent), None, &cfg, &mut diags);
        self.pending = diags;
        Ok(id)
    }

    /// Replaces the root declaration.
    pub fn update(&mut self, options: Options) -> Result<(), StrataError> {
        self.update_view(ViewId::ROOT, options)
    }

    /// Replaces a view's declaration. Only channels that differ are re-run on the next pass.
    pub fn update_view(&mut self, view: ViewId, options: Options) -> Result<(), StrataError> {
        self.ensure_view(view)?;
        let mut diags = core::mem::take(&mut self.pending);
        self.apply_options(view, options, &mut diags);
        self.pending = diags;
        Ok(())
    }

    fn apply_options(&mut self, id: ViewId, options: Options, diags: &mut Diagnostics) {
        let Some(view) = self.views.get_mut(&id) else {
            return;
        };
        let dirty = view.options.diff(&options);
        view.dirty |= dirty;
        view.options = options;
        tracing::trace!(%id, ?dirty, "updated view options");
        if dirty.contains(Dirty::CHILDREN) {
            self.reconcile_children(id, diags);
        }
    }

    /// Matches declared child views to `Options::views` by position.
    fn reconcile_children(&mut self, id: ViewId, diags: &mut Diagnostics) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        let declared = view.options.views.clone();
        let existing: Vec<(usize, ViewId)> = view
            .children
            .iter()
            .filter_map(|c| self.views.get(c).and_then(|v| v.declared).map(|i| (i, *c)))
            .collect();

        for &(i, child) in &existing {
            if i >= declared.len() {
                self.remove_subtree(child);
                if let Some(view) = self.views.get_mut(&id) {
                    view.children.retain(|c| *c != child);
                }
            }
        }
        for (i, cfg) in declared.iter().enumerate() {
            match existing.iter().find(|(j, _)| *j == i) {
                Some(&(_, child)) => {
                    if let Some(view) = self.views.get_mut(&child) {
                        if view.apply_layout_cfg(cfg, diags) {
                            view.dirty |= Dirty::LAYOUT;
                        }
                    }
                    self.apply_options(child, cfg.options.clone(), diags);
                }
                None => {
                    self.insert_view(Some(id), Some(i), cfg, diags);
                }
            }
        }
    }

    /// Destroys a view and its subtree. Its elements leave on the next pass.
    pub fn destroy_view(&mut self, view: ViewId) -> Result<(), StrataError> {
        self.ensure_alive()?;
        if view == ViewId::ROOT {
            return Err(StrataError::RootView);
        }
        let parent = self
            .views
            .get(&view)
            .ok_or(StrataError::UnknownView(view))?
            .parent;
        self.remove_subtree(view);
        if let Some(p) = parent.and_then(|p| self.views.get_mut(&p)) {
            p.children.retain(|c| *c != view);
        }
        Ok(())
    }

    fn remove_subtree(&mut self, id: ViewId) {
        let children = self
            .views
            .get(&id)
            .map(|v| v.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove_subtree(child);
        }
        self.registry.remove_view(id);
        self.unmount_view(id);
        self.views.remove(&id);
        tracing::debug!(%id, "destroyed view");
    }

    fn unmount_view(&mut self, id: ViewId) {
        let owned: Vec<ComponentId> = self
            .mounted
            .iter()
            .filter(|(_, (view, _))| *view == id)
            .map(|(c, _)| c.clone())
            .collect();
        for c in owned {
            if let Some((_, handle)) = self.mounted.remove(&c) {
                self.components.unmount(handle);
            }
        }
    }

    /// Tears the chart down: unmounts every component, cancels in-flight animations and drops
    /// every view. Later calls fail with [`StrataError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), StrataError> {
        self.ensure_alive()?;
        for (_, (_, handle)) in self.mounted.drain() {
            self.components.unmount(handle);
        }
        self.queue.cancel_all(self.animator.as_mut());
        self.views.clear();
        self.registry = ScaleRegistry::new();
        self.diff.reset();
        self.last_frame = None;
        self.destroyed = true;
        tracing::debug!("destroyed chart");
        Ok(())
    }

    /// Replaces the root records.
    pub fn change_data(
        &mut self,
        data: impl IntoIterator<Item = Datum>,
    ) -> Result<(), StrataError> {
        self.ensure_alive()?;
        let data: Vec<Datum> = data.into_iter().collect();
        if let Some(root) = self.views.get_mut(&ViewId::ROOT) {
            if root.options.data.as_ref() != Some(&data) {
                root.options.data = Some(data);
                root.dirty |= Dirty::DATA;
            }
        }
        Ok(())
    }

    /// Resizes the canvas.
    pub fn change_size(&mut self, width: f64, height: f64) -> Result<(), StrataError> {
        self.ensure_alive()?;
        self.size = sanitize_size(width, height);
        if let Some(root) = self.views.get_mut(&ViewId::ROOT) {
            root.dirty |= Dirty::LAYOUT;
        }
        Ok(())
    }

    /// Retires a finished animation task. Returns `false` for unknown or cancelled tasks.
    pub fn complete_animation(&mut self, task: TaskId) -> bool {
        self.queue.complete(task)
    }

    /// Views in pre-order.
    fn preorder(&self) -> Vec<ViewId> {
        let mut out = Vec::with_capacity(self.views.len());
        let mut stack = vec![ViewId::ROOT];
        while let Some(id) = stack.pop() {
            if let Some(view) = self.views.get(&id) {
                out.push(id);
                stack.extend(view.children.iter().rev());
            }
        }
        out
    }

    /// Runs a full render pass and hands the frame to the render backend.
    pub fn render(&mut self) -> Result<&RenderFrame, StrataError> {
        self.ensure_alive()?;
        self.pass += 1;
        let mut diags = core::mem::take(&mut self.pending);
        let order = self.preorder();

        let mut reprepared = HashSet::new();
        let mut referenced = HashSet::new();
        for &id in &order {
            self.prepare_view(id, &mut reprepared, &mut referenced, &mut diags);
        }
        self.registry.retain(&referenced);
        self.registry.sync_all(&mut diags);

        let mut hidden = HashSet::new();
        let mut views = Vec::with_capacity(order.len());
        let mut elements = Vec::new();
        for &id in &order {
            if let Some((frame, els)) = self.layout_view(id, &reprepared, &mut hidden, &mut diags) {
                elements.extend(els);
                views.push(frame);
            }
        }

        let diffs = self.diff.diff(elements);
        let schedule = self.queue.schedule(&diffs, self.animator.as_mut());
        self.sync_components(&mut views);

        let mut interactions: Vec<InteractionOption> = self
            .default_interactions
            .iter()
            .map(|k| InteractionOption::new(k.clone()))
            .collect();
        for &id in &order {
            if let Some(view) = self.views.get_mut(&id) {
                view.dirty = Dirty::NONE;
                if !hidden.contains(&id) {
                    interactions.extend(view.options.interactions.iter().cloned());
                }
            }
        }
        let background = self
            .views
            .get(&ViewId::ROOT)
            .map_or_else(|| Theme::default().background, |v| v.theme.background);

        let frame = RenderFrame {
            pass: self.pass,
            size: self.size,
            pixel_ratio: self.pixel_ratio,
            background,
            views,
            diffs,
            schedule,
            diagnostics: diags.into_vec(),
            interactions,
        };
        tracing::debug!(
            pass = frame.pass,
            views = frame.views.len(),
            reused = frame.views.iter().filter(|v| v.reused).count(),
            diffs = frame.diffs.len(),
            started = frame.schedule.started.len(),
            diagnostics = frame.diagnostics.len(),
            "render pass"
        );
        self.renderer.present(&frame);
        Ok(self.last_frame.insert(frame))
    }

    fn prepare_view(
        &mut self,
        id: ViewId,
        reprepared: &mut HashSet<ViewId>,
        referenced: &mut HashSet<ScaleSlot>,
        diags: &mut Diagnostics,
    ) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        let parent = view.parent.and_then(|p| self.views.get(&p));
        let inherited = view.parent.is_some_and(|p| reprepared.contains(&p));
        if !(view.dirty.needs_prepare() || inherited) {
            for obs in view.prepared.iter().flat_map(|p| &p.observations) {
                referenced.insert(ScaleSlot::new(id, obs.field.clone()));
            }
            return;
        }

        let options = &view.options;
        let filtered = match &options.data {
            Some(data) => apply_filters(data, &options.filters),
            None => apply_filters(
                parent.map_or(&[][..], |p| p.filtered.as_slice()),
                &options.filters,
            ),
        };
        let scale_options = layered_scales(
            parent.map_or(&[][..], |p| p.scale_options.as_slice()),
            &options.scales,
        );
        let prepared: Vec<_> = options
            .geometries
            .iter()
            .enumerate()
            .map(|(i, g)| prepare(id, i, g, &filtered, diags))
            .collect();
        let default_option = ScaleOption::default();
        for obs in merge_observations(prepared.iter().flat_map(|p| &p.observations)) {
            let option = scale_options
                .iter()
                .find(|(f, _)| *f == obs.field)
                .map_or(&default_option, |(_, o)| o);
            self.registry
                .resolve(id, &obs.field, &obs.values, option, obs.include_zero, diags);
            referenced.insert(ScaleSlot::new(id, obs.field));
        }
        tracing::trace!(
            %id,
            records = filtered.len(),
            geometries = prepared.len(),
            "prepared view"
        );

        if let Some(view) = self.views.get_mut(&id) {
            view.filtered = filtered;
            view.prepared = prepared;
            view.scale_options = scale_options;
        }
        reprepared.insert(id);
    }

    fn layout_view(
        &mut self,
        id: ViewId,
        reprepared: &HashSet<ViewId>,
        hidden: &mut HashSet<ViewId>,
        diags: &mut Diagnostics,
    ) -> Option<(ViewFrame, Vec<VisualElement>)> {
        let view = self.views.get(&id)?;
        let parent = view.parent.and_then(|p| self.views.get(&p));
        let bbox = match parent {
            None => Rect::from_origin_size(Point::ZERO, self.size),
            Some(p) => view.region.unwrap_or(Region::FULL).resolve(p.content),
        };
        let theme = resolve_theme(view.theme_setting.as_ref(), parent.map(|p| &p.theme));

        if !view.visible || view.parent.is_some_and(|p| hidden.contains(&p)) {
            hidden.insert(id);
            let frame = ViewFrame {
                id,
                parent: view.parent,
                bbox,
                content: Rect::ZERO,
                visible: false,
                components: Vec::new(),
                negotiation: NegotiationResult::default(),
                elements: 0,
                reused: false,
            };
            let view = self.views.get_mut(&id)?;
            view.theme = theme;
            view.content = Rect::ZERO;
            view.coordinate = None;
            view.cache = None;
            return Some((frame, Vec::new()));
        }

        let versions = view_versions(&self.registry, id);
        let reusable = self.local_refresh
            && view.dirty.is_empty()
            && !reprepared.contains(&id)
            && theme == view.theme
            && view
                .cache
                .as_ref()
                .is_some_and(|c| c.bbox == bbox && c.versions == versions);
        if reusable {
            let cache = view.cache.as_ref()?;
            let mut frame = cache.frame.clone();
            frame.reused = true;
            tracing::debug!(%id, "reused cached layout");
            return Some((frame, cache.elements.clone()));
        }

        let options = &view.options;
        let mut coordinate = Coordinate::build(id, &options.coordinate, bbox, diags);
        let fields = position_fields(&options.geometries);
        let mut components = axis_components(
            id,
            &options.axes,
            &fields.axes(),
            &self.registry,
            &coordinate,
            &theme,
        );
        components.extend(legend_components(
            id,
            &options.legends,
            &options.geometries,
            &options.filters,
            &self.registry,
            &theme,
        ));
        components.extend(tooltip_components(id, options.tooltip.as_ref(), &theme));

        let negotiation = Negotiator::new(self.max_layout_iterations, theme.component_gap)
            .negotiate(
                id,
                bbox,
                &view.padding,
                &view.append_padding,
                &mut components,
                self.components.as_ref(),
            );
        let region = negotiation.region;
        coordinate.update(region);

        let mut elements = Vec::new();
        let mut ranges = Vec::with_capacity(options.geometries.len());
        if region.width() > 0.0 && region.height() > 0.0 {
            let animate = options.animate.unwrap_or(theme.animate);
            let pairs = options.geometries.iter().zip(&view.prepared);
            for (i, (geometry, prepared)) in pairs.enumerate() {
                let start = elements.len();
                let ctx = EncodeContext {
                    view: id,
                    index: u32::try_from(i).unwrap_or(u32::MAX),
                    data: &view.filtered,
                    registry: &self.registry,
                    coordinate: &coordinate,
                    theme: &theme,
                    animate: geometry.animate.unwrap_or(animate),
                };
                elements.extend(encode(&ctx, geometry, prepared));
                ranges.push(start..elements.len());
            }
            let actx = AnnotationContext {
                view: id,
                registry: &self.registry,
                coordinate: &coordinate,
                x_field: fields.x.first(),
                y_field: fields.y.first(),
                data: &view.filtered,
            };
            for (i, annotation) in options.annotations.iter().enumerate() {
                if let Some(desc) = annotation_component(i, annotation, &actx, &theme, diags) {
                    components.push(desc);
                }
            }
        } else {
            tracing::debug!(%id, "content region is empty, nothing to draw");
            components.clear();
        }
        for desc in &mut components {
            self.components.arrange(desc, &coordinate);
        }

        let frame = ViewFrame {
            id,
            parent: view.parent,
            bbox,
            content: region,
            visible: true,
            components,
            negotiation,
            elements: elements.len(),
            reused: false,
        };
        let view = self.views.get_mut(&id)?;
        view.theme = theme;
        view.content = region;
        view.coordinate = Some(coordinate);
        view.cache = Some(LayoutCache {
            bbox,
            versions,
            frame: frame.clone(),
            elements: elements.clone(),
            ranges,
        });
        Some((frame, elements))
    }

    fn sync_components(&mut self, frames: &mut [ViewFrame]) {
        let mut seen = HashSet::new();
        for frame in frames.iter_mut() {
            for desc in &mut frame.components {
                seen.insert(desc.id.clone());
                let handle = match self.mounted.get(&desc.id) {
                    Some(&(_, handle)) => {
                        self.components.update(handle, desc);
                        handle
                    }
                    None => {
                        let handle = self.components.mount(desc);
                        self.mounted.insert(desc.id.clone(), (frame.id, handle));
                        handle
                    }
                };
                desc.handle = Some(handle);
            }
        }
        let stale: Vec<ComponentId> = self
            .mounted
            .keys()
            .filter(|c| !seen.contains(*c))
            .cloned()
            .collect();
        for c in stale {
            if let Some((_, handle)) = self.mounted.remove(&c) {
                self.components.unmount(handle);
            }
        }
    }

    /// Records under a screen point, as of the last pass.
    pub fn tooltip_items(
        &self,
        view: ViewId,
        point: Point,
    ) -> Result<Vec<TooltipItem>, StrataError> {
        self.ensure_view(view)?;
        let Some(node) = self.views.get(&view) else {
            return Err(StrataError::UnknownView(view));
        };
        let (Some(cfg), Some(coordinate), Some(cache)) = (
            node.options.tooltip.as_ref(),
            node.coordinate.as_ref(),
            node.cache.as_ref(),
        ) else {
            return Ok(Vec::new());
        };
        let sources: Vec<TooltipSource<'_>> = node
            .options
            .geometries
            .iter()
            .zip(&cache.ranges)
            .enumerate()
            .map(|(i, (option, range))| TooltipSource {
                index: u32::try_from(i).unwrap_or(u32::MAX),
                option,
                data: &node.filtered,
                elements: cache.elements.get(range.clone()).unwrap_or(&[]),
            })
            .collect();
        Ok(find_items(view, cfg, point, coordinate, &self.registry, &sources))
    }

    /// Where the crosshair snaps for a screen point, if crosshairs are enabled.
    pub fn crosshair_point(
        &self,
        view: ViewId,
        point: Point,
    ) -> Result<Option<Point>, StrataError> {
        self.ensure_view(view)?;
        let Some(cfg) = self
            .views
            .get(&view)
            .and_then(|v| v.options.tooltip.as_ref())
            .filter(|t| t.show_crosshairs)
        else {
            return Ok(None);
        };
        let items = self.tooltip_items(view, point)?;
        Ok(crosshair_point(cfg.crosshairs.kind, point, &items))
    }
}

fn sanitize_size(width: f64, height: f64) -> Size {
    let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(clean(width), clean(height))
}

/// Own scale options layered over the inherited ones.
fn layered_scales(
    inherited: &[(FieldName, ScaleOption)],
    own: &[(FieldName, ScaleOption)],
) -> Vec<(FieldName, ScaleOption)> {
    let mut out = inherited.to_vec();
    for (field, option) in own {
        match out.iter_mut().find(|(f, _)| f == field) {
            Some((_, slot)) => *slot = option.merged_over(slot),
            None => out.push((field.clone(), option.clone())),
        }
    }
    out
}

/// Combines observations of the same field across geometries, in first-seen order.
fn merge_observations<'a>(observations: impl Iterator<Item = &'a Observation>) -> Vec<Observation> {
    let mut out: Vec<Observation> = Vec::new();
    for obs in observations {
        match out.iter_mut().find(|o| o.field == obs.field) {
            Some(o) => {
                o.values.extend(obs.values.iter().cloned());
                o.include_zero |= obs.include_zero;
            }
            None => out.push(obs.clone()),
        }
    }
    out
}

fn view_versions(registry: &ScaleRegistry, view: ViewId) -> Vec<(FieldName, u64)> {
    registry
        .iter()
        .filter(|(slot, _)| slot.view == view)
        .map(|(slot, scale)| (slot.field.clone(), scale.version()))
        .collect()
}

/// Distinct position fields of a view's visible geometries, per dimension.
struct PositionFields {
    x: Vec<FieldName>,
    y: Vec<FieldName>,
}

impl PositionFields {
    fn axes(&self) -> Vec<AxisField> {
        let x = self.x.first().map(|f| AxisField {
            field: f.clone(),
            dim: Dim::X,
            secondary: false,
        });
        let y = self.y.iter().take(2).enumerate().map(|(i, f)| AxisField {
            field: f.clone(),
            dim: Dim::Y,
            secondary: i == 1,
        });
        x.into_iter().chain(y).collect()
    }
}

fn position_fields(geometries: &[GeometryOption]) -> PositionFields {
    let mut fields = PositionFields {
        x: Vec::new(),
        y: Vec::new(),
    };
    for position in geometries
        .iter()
        .filter(|g| g.visible)
        .filter_map(|g| g.position.as_ref())
    {
        if let Some(x) = &position.x {
            if !fields.x.contains(x) {
                fields.x.push(x.clone());
            }
        }
        if !fields.y.contains(&position.y) {
            fields.y.push(position.y.clone());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::String;
    use alloc::vec;
    use core::cell::RefCell;
    use std::rc::Rc;

    use strata_core::{AnimateOption, AnimateStage, AnimationTask, ElementKey, KeyId, Value};

    use super::*;
    use crate::component::ComponentKind;
    use crate::layout::Padding;
    use crate::scale::Domain;
    use crate::tooltip::{CrosshairKind, TooltipCfg};

    fn sales(names: &[&str]) -> Vec<Datum> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Datum::new().with("name", *n).with("sales", 10.0 * (i + 1) as f64))
            .collect()
    }

    fn bar_options(data: Vec<Datum>) -> Options {
        Options::new().with_data(data).with_geometry(
            GeometryOption::interval()
                .with_position("name*sales")
                .with_key("name"),
        )
    }

    fn key(name: &str) -> ElementKey {
        ElementKey::new(ViewId::ROOT, 0, KeyId::Field(Value::from(name).key()))
    }

    fn stage_of(frame: &RenderFrame, name: &str) -> Option<AnimateStage> {
        let k = key(name);
        frame.diffs.iter().find(|d| d.key == k).map(|d| d.stage)
    }

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<String>>>);

    impl Animator for Log {
        fn start(&mut self, task: &AnimationTask) {
            self.0.borrow_mut().push(std::format!("start {}", task.key));
        }

        fn cancel(&mut self, id: TaskId) {
            self.0.borrow_mut().push(std::format!("cancel {}", id.0));
        }
    }

    #[test]
    fn first_render_appears_then_diffs() {
        let cfg = ChartCfg::new(400.0, 300.0).with_options(bar_options(sales(&["a", "b", "c"])));
        let mut chart = Chart::new(cfg);
        let frame = chart.render().unwrap();
        assert_eq!(frame.pass, 1);
        assert!(frame.diagnostics.is_empty(), "{:?}", frame.diagnostics);
        assert_eq!(frame.diffs.len(), 3);
        assert!(frame.diffs.iter().all(|d| d.stage == AnimateStage::Appear));

        chart.change_data(sales(&["b", "c", "d"])).unwrap();
        let frame = chart.render().unwrap();
        assert_eq!(stage_of(frame, "a"), Some(AnimateStage::Leave));
        assert_eq!(stage_of(frame, "b"), Some(AnimateStage::Update));
        assert_eq!(stage_of(frame, "c"), Some(AnimateStage::Update));
        assert_eq!(stage_of(frame, "d"), Some(AnimateStage::Enter));
    }

    #[test]
    fn rotating_keys_keep_the_animation_queue_bounded() {
        let mut chart = Chart::new(ChartCfg::new(400.0, 300.0));
        for pass in 0..50 {
            let names: Vec<String> = (0..3).map(|i| std::format!("k{pass}-{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            chart.update(bar_options(sales(&refs))).unwrap();
            chart.render().unwrap();
            assert!(
                chart.queue.in_flight() <= 6,
                "pass {pass}: {} tasks in flight",
                chart.queue.in_flight()
            );
        }
    }

    #[test]
    fn axes_shrink_the_content_region() {
        let cfg = ChartCfg::new(400.0, 300.0).with_options(bar_options(sales(&["a", "b"])));
        let mut chart = Chart::new(cfg);
        let frame = chart.render().unwrap();
        let root = frame.view(ViewId::ROOT).unwrap();
        assert!(root.negotiation.converged);
        assert!(root.content.y1 < 300.0);
        assert!(root.content.x0 > 0.0);
        let axes = root
            .components
            .iter()
            .filter(|c| c.kind == ComponentKind::Axis)
            .count();
        assert_eq!(axes, 2);
        for c in &root.components {
            assert!(c.handle.is_some());
        }
    }

    #[test]
    fn clean_views_reuse_their_layout() {
        let cfg = ChartCfg::new(400.0, 300.0).with_options(bar_options(sales(&["a", "b"])));
        let mut chart = Chart::new(cfg);
        let first = chart.render().unwrap().clone();
        let second = chart.render().unwrap();
        assert!(second.views[0].reused);
        assert_eq!(second.views[0].content, first.views[0].content);
        assert!(second.diffs.iter().all(|d| d.stage == AnimateStage::Update && !d.changed));

        chart.change_size(500.0, 300.0).unwrap();
        let third = chart.render().unwrap();
        assert!(!third.views[0].reused);
        assert!(third.views[0].content.x1 > first.views[0].content.x1);
    }

    #[test]
    fn local_refresh_off_always_recomputes() {
        let cfg = ChartCfg::new(400.0, 300.0)
            .with_local_refresh(false)
            .with_options(bar_options(sales(&["a"])));
        let mut chart = Chart::new(cfg);
        chart.render().unwrap();
        assert!(!chart.render().unwrap().views[0].reused);
    }

    #[test]
    fn synced_scales_share_domains_across_views() {
        let left = Options::new()
            .with_data(vec![
                Datum::new().with("m", "jan").with("v", 5.0),
                Datum::new().with("m", "feb").with("v", 12.0),
            ])
            .with_scale("v", ScaleOption::new().with_sync(true).with_nice(false))
            .with_geometry(GeometryOption::point().with_position("m*v"));
        let right = Options::new()
            .with_data(vec![
                Datum::new().with("m", "jan").with("v", -3.0),
                Datum::new().with("m", "feb").with("v", 40.0),
            ])
            .with_scale("v", ScaleOption::new().with_sync(true).with_nice(false))
            .with_geometry(GeometryOption::point().with_position("m*v"));
        let half = |x0: f64, options: Options| {
            ViewCfg::new()
                .with_region(Region::new(x0, 0.0, x0 + 0.5, 1.0))
                .with_options(options)
        };
        let root = Options::new()
            .with_view(half(0.0, left))
            .with_view(half(0.5, right));
        let mut chart = Chart::new(ChartCfg::new(600.0, 300.0).with_options(root));
        chart.render().unwrap();

        let children = chart.view(ViewId::ROOT).unwrap().children().to_vec();
        assert_eq!(children.len(), 2);
        let a = chart.scale(children[0], "v").unwrap().domain().clone();
        let b = chart.scale(children[1], "v").unwrap().domain().clone();
        assert_eq!(a, b);
        assert_eq!(a, Domain::Continuous { min: -3.0, max: 40.0 });

        let frame = chart.last_frame().unwrap();
        let left = frame.view(children[0]).unwrap();
        let right = frame.view(children[1]).unwrap();
        assert!(left.bbox.x1 <= right.bbox.x0 + 1e-9);
    }

    #[test]
    fn destroying_a_view_releases_it() {
        let child = Options::new()
            .with_data(sales(&["x", "y"]))
            .with_geometry(GeometryOption::point().with_position("name*sales"));
        let root = Options::new().with_tooltip(None);
        let mut chart = Chart::new(ChartCfg::new(400.0, 300.0).with_options(root));
        let id = chart.create_view(ViewId::ROOT, ViewCfg::new().with_options(child)).unwrap();
        chart.render().unwrap();
        assert!(chart.scale(id, "sales").is_some());
        let mounted = chart.mounted.len();
        assert!(mounted > 0);

        chart.destroy_view(id).unwrap();
        assert!(chart.view(id).is_none());
        assert!(chart.scale(id, "sales").is_none());
        assert!(chart.mounted.is_empty());
        let frame = chart.render().unwrap();
        assert_eq!(frame.diffs.len(), 2);
        assert!(frame.diffs.iter().all(|d| d.stage == AnimateStage::Leave));

        assert_eq!(chart.destroy_view(id), Err(StrataError::UnknownView(id)));
        assert_eq!(chart.destroy_view(ViewId::ROOT), Err(StrataError::RootView));
    }

    #[test]
    fn declared_views_are_reconciled_by_position() {
        let child = |n: &str| {
            ViewCfg::new().with_options(
                Options::new()
                    .with_data(sales(&[n]))
                    .with_geometry(GeometryOption::point().with_position("name*sales")),
            )
        };
        let mut chart = Chart::new(
            ChartCfg::new(400.0, 300.0)
                .with_options(Options::new().with_view(child("a")).with_view(child("b"))),
        );
        chart.render().unwrap();
        let before = chart.view(ViewId::ROOT).unwrap().children().to_vec();
        assert_eq!(before.len(), 2);

        chart.update(Options::new().with_view(child("c"))).unwrap();
        let after = chart.view(ViewId::ROOT).unwrap().children().to_vec();
        assert_eq!(after, vec![before[0]]);
        assert!(chart.view(before[1]).is_none());
        assert!(chart.view(before[0]).unwrap().dirty().contains(Dirty::DATA));
    }

    #[test]
    fn config_errors_are_recovered() {
        let options = bar_options(sales(&["a"]))
            .with_view(ViewCfg::new().with_region(Region::new(0.9, 0.0, 0.1, 1.0)))
            .with_scale("sales", ScaleOption::new().with_type_name("wobbly"));
        let mut chart = Chart::new(ChartCfg::new(400.0, 300.0).with_options(options));
        let frame = chart.render().unwrap().clone();
        assert_eq!(frame.diagnostics.len(), 2);
        let child = chart.view(ViewId::ROOT).unwrap().children()[0];
        assert_eq!(chart.view(child).unwrap().region(), None);
        assert_eq!(frame.view(child).unwrap().bbox, frame.view(ViewId::ROOT).unwrap().content);
        assert_eq!(frame.diffs.len(), 1);
    }

    #[test]
    fn oversized_padding_renders_nothing() {
        let cfg = ChartCfg::new(100.0, 100.0)
            .with_padding(Padding::uniform(80.0))
            .with_options(bar_options(sales(&["a"])));
        let mut chart = Chart::new(cfg);
        let frame = chart.render().unwrap();
        let root = frame.view(ViewId::ROOT).unwrap();
        assert_eq!(root.content.width(), 0.0);
        assert_eq!(root.elements, 0);
        assert!(root.components.is_empty());
        assert!(frame.diffs.is_empty());
    }

    #[test]
    fn hidden_views_draw_nothing() {
        let child = ViewCfg::new()
            .with_visible(false)
            .with_options(bar_options(sales(&["a", "b"])));
        let mut chart =
            Chart::new(ChartCfg::new(400.0, 300.0).with_options(Options::new().with_view(child)));
        let frame = chart.render().unwrap();
        assert!(frame.diffs.is_empty());
        assert!(frame.views.iter().any(|v| !v.visible));
    }

    #[test]
    fn animations_are_scheduled_and_cancelled() {
        let log = Log::default();
        let cfg = ChartCfg::new(400.0, 300.0).with_options(bar_options(sales(&["a", "b"])));
        let mut chart = Chart::with_backends(
            cfg,
            HeuristicComponentBackend::new(),
            NullRenderBackend,
            log.clone(),
        );
        let started = chart.render().unwrap().schedule.started.len();
        assert_eq!(started, 2);

        chart.change_data(sales(&["a", "b", "c"])).unwrap();
        let frame = chart.render().unwrap();
        // Both surviving bars moved while their appear tasks were still in flight.
        assert_eq!(frame.schedule.cancelled.len(), 2);
        assert!(log.0.borrow().iter().any(|l| l.starts_with("cancel")));

        let task = frame.schedule.started[0];
        assert!(chart.complete_animation(task));
        assert!(!chart.complete_animation(task));
    }

    #[test]
    fn animation_can_be_disabled_per_view() {
        let cfg = ChartCfg::new(400.0, 300.0)
            .with_options(bar_options(sales(&["a"])).with_animate(AnimateOption::NONE));
        let mut chart = Chart::new(cfg);
        let frame = chart.render().unwrap();
        assert!(frame.diffs.iter().all(|d| d.animate.is_none()));
        assert_eq!(frame.schedule.snapped, 1);
    }

    #[test]
    fn tooltip_finds_the_bar_under_the_cursor() {
        let options = bar_options(sales(&["a", "b", "c"]))
            .with_tooltip(Some(TooltipCfg::default().with_crosshairs(CrosshairKind::X)));
        let mut chart = Chart::new(ChartCfg::new(400.0, 300.0).with_options(options));
        let frame = chart.render().unwrap();
        let target = frame
            .diffs
            .iter()
            .find(|d| d.key == key("c"))
            .map(|d| d.element.shape.bounds().center())
            .unwrap();
        let items = chart.tooltip_items(ViewId::ROOT, target).unwrap();
        assert!(!items.is_empty());
        assert_eq!(items[0].datum.get("name"), Some(&Value::from("c")));
        assert!(chart.crosshair_point(ViewId::ROOT, target).unwrap().is_some());
        assert!(chart.tooltip_items(ViewId::ROOT, Point::new(-50.0, -50.0)).unwrap().is_empty());
    }

    #[test]
    fn destroyed_chart_rejects_calls() {
        let mut chart = Chart::new(ChartCfg::new(100.0, 100.0));
        chart.render().unwrap();
        chart.destroy().unwrap();
        assert!(chart.is_destroyed());
        assert_eq!(chart.render().err(), Some(StrataError::Destroyed));
        assert_eq!(chart.update(Options::new()), Err(StrataError::Destroyed));
        assert_eq!(chart.destroy(), Err(StrataError::Destroyed));
        assert!(chart.last_frame().is_none());
    }

    #[test]
    fn default_interactions_reach_the_frame() {
        let options = Options::new().with_interaction(InteractionOption::new("brush"));
        let mut chart = Chart::new(
            ChartCfg::new(100.0, 100.0)
                .with_default_interactions(["tooltip"])
                .with_options(options),
        );
        let kinds: Vec<_> = chart
            .render()
            .unwrap()
            .interactions
            .iter()
            .map(|i| i.kind.clone())
            .collect();
        assert_eq!(kinds, vec![Arc::from("tooltip"), Arc::from("brush")]);
    }
}
