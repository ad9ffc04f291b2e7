// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation configuration per lifecycle stage.
//!
//! The engine only decides *which* stage an element is in and *which* configuration applies.
//! Interpolation is left to an [`Animator`](crate::Animator).

use core::fmt;

/// The lifecycle stage an element is classified into by a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnimateStage {
    /// The element exists on the first render of its view.
    Appear,
    /// The element's key is new on a later render.
    Enter,
    /// The element's key existed on the previous render and still exists.
    Update,
    /// The element's key existed on the previous render and is gone now.
    Leave,
}

impl AnimateStage {
    /// All stages, in declaration order.
    pub const ALL: [Self; 4] = [Self::Appear, Self::Enter, Self::Update, Self::Leave];

    /// Returns the stage name used by option declarations.
    pub fn name(self) -> &'static str {
        match self {
            Self::Appear => "appear",
            Self::Enter => "enter",
            Self::Update => "update",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for AnimateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Easing curve names understood by animators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    /// `easeLinear`.
    Linear,
    /// `easeQuadIn`.
    QuadIn,
    /// `easeQuadOut`.
    #[default]
    QuadOut,
    /// `easeQuadInOut`.
    QuadInOut,
    /// `easeCubicIn`.
    CubicIn,
    /// `easeCubicOut`.
    CubicOut,
    /// `easeCubicInOut`.
    CubicInOut,
}

impl Easing {
    /// Parses an easing name such as `"easeQuadOut"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "easeLinear" => Self::Linear,
            "easeQuadIn" => Self::QuadIn,
            "easeQuadOut" => Self::QuadOut,
            "easeQuadInOut" => Self::QuadInOut,
            "easeCubicIn" => Self::CubicIn,
            "easeCubicOut" => Self::CubicOut,
            "easeCubicInOut" => Self::CubicInOut,
            _ => return None,
        })
    }

    /// Evaluates the curve at `t` in `[0, 1]`.
    pub fn eval(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
        }
    }
}

/// Timing for a single stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimateCfg {
    /// Duration in milliseconds.
    pub duration: f64,
    /// Delay before starting, in milliseconds.
    pub delay: f64,
    /// Easing curve.
    pub easing: Easing,
}

impl AnimateCfg {
    /// Creates a config with the given duration and easing and no delay.
    pub fn new(duration: f64, easing: Easing) -> Self {
        Self {
            duration: duration.max(0.0),
            delay: 0.0,
            easing,
        }
    }

    /// Sets the delay in milliseconds.
    #[must_use]
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay.max(0.0);
        self
    }
}

/// Per-stage animation settings.
///
/// `None` for a stage means "no animation": the element snaps to its new state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimateOption {
    /// First render.
    pub appear: Option<AnimateCfg>,
    /// New keys on later renders.
    pub enter: Option<AnimateCfg>,
    /// Surviving keys.
    pub update: Option<AnimateCfg>,
    /// Removed keys.
    pub leave: Option<AnimateCfg>,
}

impl Default for AnimateOption {
    fn default() -> Self {
        Self {
            appear: Some(AnimateCfg::new(450.0, Easing::QuadOut)),
            enter: Some(AnimateCfg::new(400.0, Easing::QuadOut)),
            update: Some(AnimateCfg::new(400.0, Easing::QuadInOut)),
            leave: Some(AnimateCfg::new(350.0, Easing::QuadIn)),
        }
    }
}

impl AnimateOption {
    /// Disables every stage.
    pub const NONE: Self = Self {
        appear: None,
        enter: None,
        update: None,
        leave: None,
    };

    /// Returns the config for `stage`.
    pub fn get(&self, stage: AnimateStage) -> Option<AnimateCfg> {
        match stage {
            AnimateStage::Appear => self.appear,
            AnimateStage::Enter => self.enter,
            AnimateStage::Update => self.update,
            AnimateStage::Leave => self.leave,
        }
    }

    /// Replaces the config for `stage`.
    #[must_use]
    pub fn with_stage(mut self, stage: AnimateStage, cfg: Option<AnimateCfg>) -> Self {
        let slot = match stage {
            AnimateStage::Appear => &mut self.appear,
            AnimateStage::Enter => &mut self.enter,
            AnimateStage::Update => &mut self.update,
            AnimateStage::Leave => &mut self.leave,
        };
        *slot = cfg;
        self
    }

    /// Returns `true` when no stage animates.
    pub fn is_none(&self) -> bool {
        AnimateStage::ALL.iter().all(|s| self.get(*s).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_stage_snaps() {
        let opt = AnimateOption::default().with_stage(AnimateStage::Leave, None);
        assert!(opt.get(AnimateStage::Leave).is_none());
        assert!(opt.get(AnimateStage::Enter).is_some());
        assert!(AnimateOption::NONE.is_none());
    }

    #[test]
    fn easing_endpoints() {
        for name in ["easeLinear", "easeQuadInOut", "easeCubicOut"] {
            let e = Easing::from_name(name).expect("known easing");
            assert!(e.eval(0.0).abs() < 1e-12, "{name} starts at 0");
            assert!((e.eval(1.0) - 1.0).abs() < 1e-12, "{name} ends at 1");
        }
        assert_eq!(Easing::from_name("bounce"), None);
    }
}
