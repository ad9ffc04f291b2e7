// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Example binary for `strata_charts`.
//!
//! Builds a stacked bar view beside a filtered donut view, renders them, changes the data and
//! the size, and prints what each pass classified.

use kurbo::Point;
use strata_charts::{
    AnnotationOption, AnnotationPosition, Chart, ChartCfg, CoordinateKind, CoordinateOption,
    HeuristicComponentBackend, LegendCfg, LegendsOption, Options, RenderBackend, RenderFrame,
    ScaleOption, TooltipCfg, ViewCfg,
};
use strata_charts::{GeometryOption, Region};
use strata_core::{AnimationTask, Animator, Datum, TaskId};
use strata_transforms::{AdjustOption, CompareOp, FieldFilter};

struct PrintingRenderer;

impl RenderBackend for PrintingRenderer {
    fn present(&mut self, frame: &RenderFrame) {
        println!(
            "pass #{}: {} views, {} diffs, {} animations started, {} cancelled, {} snapped",
            frame.pass,
            frame.views.len(),
            frame.diffs.len(),
            frame.schedule.started.len(),
            frame.schedule.cancelled.len(),
            frame.schedule.snapped,
        );
        for view in &frame.views {
            println!(
                "  {} content={:?} components={} converged={} reused={}",
                view.id,
                view.content,
                view.components.len(),
                view.negotiation.converged,
                view.reused,
            );
        }
        for d in &frame.diffs {
            println!(
                "  {:<6} {} bounds={:?}",
                d.stage.name(),
                d.key,
                d.element.shape.bounds()
            );
        }
        for diag in &frame.diagnostics {
            println!("  warning in {}: {}", diag.view, diag.error);
        }
    }
}

struct LoggingAnimator;

impl Animator for LoggingAnimator {
    fn start(&mut self, task: &AnimationTask) {
        println!("  animate #{} {} {}", task.id.0, task.stage, task.key);
    }

    fn cancel(&mut self, id: TaskId) {
        println!("  cancel #{}", id.0);
    }
}

fn records(scale: f64) -> Vec<Datum> {
    let rows = [
        ("Q1", "north", 12.0),
        ("Q1", "south", 7.0),
        ("Q2", "north", 15.0),
        ("Q2", "south", 9.0),
        ("Q3", "north", 11.0),
        ("Q3", "south", 13.0),
    ];
    rows.iter()
        .map(|(q, r, v)| {
            Datum::new()
                .with("quarter", *q)
                .with("region", *r)
                .with("sales", v * scale)
                .with("id", format!("{q}-{r}"))
        })
        .collect()
}

fn main() {
    let bars = Options::new()
        .with_scale("sales", ScaleOption::new().with_sync(true))
        .with_geometry(
            GeometryOption::interval()
                .with_position("quarter*sales")
                .with_color_field("region")
                .with_adjust(AdjustOption::stack())
                .with_key("id"),
        )
        .with_legends(LegendsOption::default().with_cfg(LegendCfg::default()))
        .with_annotation(
            AnnotationOption::line(
                AnnotationPosition::new("min", "median"),
                AnnotationPosition::new("max", "median"),
            )
            .with_text("median"),
        );

    let donut = Options::new()
        .with_filter(FieldFilter::compare("sales", CompareOp::Gt, 8.0))
        .with_coordinate(
            CoordinateOption::new(CoordinateKind::Theta).with_inner_radius(0.5),
        )
        .with_tooltip(Some(TooltipCfg::default()))
        .with_geometry(
            GeometryOption::interval()
                .with_position("sales")
                .with_color_field("region")
                .with_adjust(AdjustOption::stack())
                .with_key("id"),
        );

    let options = Options::new()
        .with_data(records(1.0))
        .with_view(
            ViewCfg::new()
                .with_region(Region::new(0.0, 0.0, 0.6, 1.0))
                .with_options(bars),
        )
        .with_view(
            ViewCfg::new()
                .with_region(Region::new(0.6, 0.0, 1.0, 1.0))
                .with_options(donut),
        );

    let mut chart = Chart::with_backends(
        ChartCfg::new(800.0, 400.0).with_options(options),
        HeuristicComponentBackend::new(),
        PrintingRenderer,
        LoggingAnimator,
    );

    if let Err(e) = chart.render() {
        eprintln!("render failed: {e}");
        return;
    }

    let Some(bars_view) = chart.view(chart.root()).and_then(|v| v.children().first().copied())
    else {
        return;
    };
    match chart.tooltip_items(bars_view, Point::new(150.0, 300.0)) {
        Ok(items) => {
            for item in items {
                println!("tooltip: {} = {}", item.name, item.value);
            }
        }
        Err(e) => eprintln!("tooltip query failed: {e}"),
    }

    let steps: [(&str, fn(&mut Chart) -> Result<(), strata_charts::StrataError>); 2] = [
        ("data", |c| c.change_data(records(1.5))),
        ("size", |c| c.change_size(640.0, 400.0)),
    ];
    for (name, step) in steps {
        println!("-- change {name}");
        if let Err(e) = step(&mut chart).and_then(|()| chart.render().map(|_| ())) {
            eprintln!("update failed: {e}");
            return;
        }
    }

    if let Err(e) = chart.destroy() {
        eprintln!("destroy failed: {e}");
    }
}
