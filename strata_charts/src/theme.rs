// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Themes: palettes, default channel values, component styling and default animations.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

use peniko::Color;
use peniko::color::palette::css;
use strata_core::AnimateOption;

use crate::error::ConfigError;

/// Visual defaults shared by a view subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
    /// Theme name.
    pub name: Arc<str>,
    /// Categorical palette, cycled by category index.
    pub palette: Vec<Color>,
    /// Endpoints of the continuous color ramp.
    pub sequential: (Color, Color),
    /// Point shapes, cycled by category index.
    pub shapes: Vec<Arc<str>>,
    /// Size channel range.
    pub size_range: (f64, f64),
    /// Color used when no color channel is declared.
    pub default_color: Color,
    /// Default point radius.
    pub point_size: f64,
    /// Default line width.
    pub line_width: f64,
    /// Fraction of a category band covered by an interval.
    pub column_width_ratio: f64,
    /// Fraction of a category band left between dodged intervals.
    pub dodge_margin_ratio: f64,
    /// Background fill.
    pub background: Color,
    /// Axis line, tick and label color.
    pub axis_color: Color,
    /// Grid line color.
    pub grid_color: Color,
    /// Label and legend text color.
    pub text_color: Color,
    /// Tick label font size.
    pub label_font_size: f64,
    /// Axis and legend title font size.
    pub title_font_size: f64,
    /// Legend marker size.
    pub legend_marker_size: f64,
    /// Spacing between legend items.
    pub legend_item_spacing: f64,
    /// Gap between stacked components and the content region.
    pub component_gap: f64,
    /// Default animations.
    pub animate: AnimateOption,
}

const G2_PALETTE: [Color; 10] = [
    Color::from_rgb8(0x5B, 0x8F, 0xF9),
    Color::from_rgb8(0x5A, 0xD8, 0xA6),
    Color::from_rgb8(0x5D, 0x70, 0x92),
    Color::from_rgb8(0xF6, 0xBD, 0x16),
    Color::from_rgb8(0xE8, 0x68, 0x4A),
    Color::from_rgb8(0x6D, 0xC8, 0xEC),
    Color::from_rgb8(0x92, 0x70, 0xCA),
    Color::from_rgb8(0xFF, 0x9D, 0x4D),
    Color::from_rgb8(0x26, 0x9A, 0x99),
    Color::from_rgb8(0xFF, 0x99, 0xC3),
];

impl Theme {
    /// The default light theme.
    pub fn light() -> Self {
        Self {
            name: "light".into(),
            palette: G2_PALETTE.to_vec(),
            sequential: (
                Color::from_rgb8(0xBA, 0xE7, 0xFF),
                Color::from_rgb8(0x00, 0x3A, 0x8C),
            ),
            shapes: ["circle", "square", "triangle", "diamond", "hexagon", "cross"]
                .into_iter()
                .map(Arc::from)
                .collect(),
            size_range: (1.0, 10.0),
            default_color: G2_PALETTE[0],
            point_size: 4.0,
            line_width: 2.0,
            column_width_ratio: 0.5,
            dodge_margin_ratio: 0.0,
            background: css::WHITE,
            axis_color: Color::from_rgb8(0xBF, 0xBF, 0xBF),
            grid_color: Color::from_rgb8(0xD9, 0xD9, 0xD9),
            text_color: Color::from_rgb8(0x59, 0x59, 0x59),
            label_font_size: 12.0,
            title_font_size: 12.0,
            legend_marker_size: 8.0,
            legend_item_spacing: 24.0,
            component_gap: 8.0,
            animate: AnimateOption::default(),
        }
    }

    /// The dark theme.
    pub fn dark() -> Self {
        Self {
            name: "dark".into(),
            background: Color::from_rgb8(0x14, 0x14, 0x14),
            axis_color: Color::from_rgb8(0x59, 0x59, 0x59),
            grid_color: Color::from_rgb8(0x40, 0x40, 0x40),
            text_color: Color::from_rgb8(0xA6, 0xA6, 0xA6),
            ..Self::light()
        }
    }

    /// Looks up a named theme.
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "light" | "default" => Ok(Self::light()),
            "dark" => Ok(Self::dark()),
            _ => Err(ConfigError::UnknownTheme(name.into())),
        }
    }

    /// Sets the categorical palette.
    pub fn with_palette(mut self, palette: impl IntoIterator<Item = Color>) -> Self {
        self.palette = palette.into_iter().collect();
        self
    }

    /// Sets the default animations.
    pub fn with_animate(mut self, animate: AnimateOption) -> Self {
        self.animate = animate;
        self
    }

    /// Palette color for a category index.
    pub fn color_at(&self, index: usize) -> Color {
        if self.palette.is_empty() {
            return self.default_color;
        }
        self.palette[index % self.palette.len()]
    }

    /// Shape name for a category index.
    pub fn shape_at(&self, index: usize) -> Arc<str> {
        if self.shapes.is_empty() {
            return Arc::from("circle");
        }
        self.shapes[index % self.shapes.len()].clone()
    }

    /// Continuous color ramp at `t` in `[0, 1]`.
    pub fn ramp(&self, t: f64) -> Color {
        lerp_color(self.sequential.0, self.sequential.1, t)
    }

    /// Size channel value at `t` in `[0, 1]`.
    pub fn size_at(&self, t: f64) -> f64 {
        let (a, b) = self.size_range;
        a + t.clamp(0.0, 1.0) * (b - a)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

/// Linear interpolation between two colors in their stored color space.
pub fn lerp_color(a: Color, b: Color, t: f64) -> Color {
    #[allow(clippy::cast_possible_truncation, reason = "color components are f32")]
    let t = t.clamp(0.0, 1.0) as f32;
    let mut out = a.components;
    for (o, (x, y)) in out.iter_mut().zip(a.components.iter().zip(b.components.iter())) {
        *o = x * (1.0 - t) + y * t;
    }
    Color::new(out)
}
