// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text measurement hooks for component layout.
//!
//! Axes and legends need text extents before the content region is known. Shaping stays
//! downstream, so measurement goes through a tiny trait that a renderer can implement, with
//! [`HeuristicTextMeasurer`] as the default.

use kurbo::Size;
use peniko::Color;
use peniko::color::palette::css;

/// Text styling inputs relevant to measurement and drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Font size in chart units.
    pub font_size: f64,
    /// Font weight (`400` normal, `700` bold).
    pub font_weight: u16,
    /// Fill paint.
    pub fill: Color,
}

impl TextStyle {
    /// Creates a normal-weight style with the given `font_size`.
    #[must_use]
    pub fn new(font_size: f64) -> Self {
        Self {
            font_size,
            font_weight: 400,
            fill: css::DIM_GRAY,
        }
    }

    /// Sets the fill.
    #[must_use]
    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(12.0)
    }
}

/// A minimal text measurement interface.
pub trait TextMeasurer {
    /// Returns the extent of a single line of text.
    fn measure(&self, text: &str, style: &TextStyle) -> Size;
}

/// Assumes an average glyph width of ~0.6em and a line height of 1.2em.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicTextMeasurer;

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> Size {
        let bold = if style.font_weight >= 600 { 1.1 } else { 1.0 };
        let width = 0.6 * bold * style.font_size * text.chars().count() as f64;
        Size::new(width, 1.2 * style.font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_scales_with_length_and_size() {
        let m = HeuristicTextMeasurer;
        let a = m.measure("abcd", &TextStyle::new(10.0));
        assert!((a.width - 24.0).abs() < 1e-9);
        assert!((a.height - 12.0).abs() < 1e-9);
        let empty = m.measure("", &TextStyle::new(10.0));
        assert_eq!(empty.width, 0.0);
    }
}
