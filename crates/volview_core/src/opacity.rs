//! Three-point scalar-opacity transfer curve.
//!
//! The curve is always `(lower, lower_opacity)`, `(mid_at, mid_opacity)`,
//! `(upper, upper_opacity)`. The middle opacity is exponential in the slider
//! position so that each tick multiplies it by `opacity_base`, which gives a
//! wide dynamic range from a coarse integer slider.
//!
//! Evaluation is piecewise-linear. When the middle point coincides with an
//! anchor the zero-width segment is skipped, so the coincident sample value
//! evaluates to the middle opacity. Outside the anchors the curve is constant.

use serde::{Deserialize, Serialize};

use crate::{config::TransferSettings, Scalar};

/// Live integer positions of the "Mid opacity" and "Mid at" sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderPositions {
    pub mid_opacity: i32,
    pub mid_at: i32,
}

impl SliderPositions {
    pub fn initial(transfer: &TransferSettings) -> Self {
        Self {
            mid_opacity: transfer.initial_mid_opacity,
            mid_at: transfer.initial_mid_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub value: Scalar,
    pub opacity: Scalar,
}

impl ControlPoint {
    pub const fn new(value: Scalar, opacity: Scalar) -> Self {
        Self { value, opacity }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpacityCurve {
    points: [ControlPoint; 3],
}

/// Opacity of the middle point for an opacity-slider position, before clamping.
pub fn mid_opacity(transfer: &TransferSettings, position: i32) -> f64 {
    transfer.opacity_scale * transfer.opacity_base.powi(position)
}

impl OpacityCurve {
    pub fn from_sliders(transfer: &TransferSettings, sliders: SliderPositions) -> Self {
        let opacity = mid_opacity(transfer, sliders.mid_opacity).clamp(0.0, 1.0) as Scalar;
        // Keeps the value axis non-decreasing.
        let value = (sliders.mid_at as Scalar).clamp(transfer.lower_value, transfer.upper_value);
        Self {
            points: [
                ControlPoint::new(transfer.lower_value, transfer.lower_opacity),
                ControlPoint::new(value, opacity),
                ControlPoint::new(transfer.upper_value, transfer.upper_opacity),
            ],
        }
    }

    pub fn points(&self) -> &[ControlPoint; 3] {
        &self.points
    }

    pub fn middle(&self) -> ControlPoint {
        self.points[1]
    }

    /// Sample-value span between the first and last control point.
    pub fn domain(&self) -> (Scalar, Scalar) {
        (self.points[0].value, self.points[2].value)
    }

    pub fn evaluate(&self, value: Scalar) -> Scalar {
        let first = self.points[0];
        let last = self.points[2];
        if value < first.value {
            return first.opacity;
        }
        if value > last.value {
            return last.opacity;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let width = b.value - a.value;
            if width <= 0.0 || value < a.value || value > b.value {
                continue;
            }
            let t = (value - a.value) / width;
            return a.opacity * (1.0 - t) + b.opacity * t;
        }
        last.opacity
    }

    /// Samples the curve into a lookup table for the GPU.
    ///
    /// Entry 0 holds the opacity below the domain and the final entry the opacity
    /// above it. The `size` entries in between span [`Self::domain`] evenly,
    /// endpoints included.
    pub fn to_lut(&self, size: u32) -> Vec<f32> {
        let size = size.max(2) as usize;
        let (lo, hi) = self.domain();
        let mut lut = Vec::with_capacity(size + 2);
        lut.push(self.points[0].opacity);
        for i in 0..size {
            let t = i as Scalar / (size - 1) as Scalar;
            lut.push(self.evaluate(lo + (hi - lo) * t));
        }
        lut.push(self.points[2].opacity);
        lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(mid_opacity: i32, mid_at: i32) -> OpacityCurve {
        OpacityCurve::from_sliders(
            &TransferSettings::default(),
            SliderPositions {
                mid_opacity,
                mid_at,
            },
        )
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn initial_sliders_place_the_middle_point() {
        let c = curve(0, 1500);
        assert_eq!(c.middle().value, 1500.0);
        assert!(close(c.middle().opacity, 0.0001));
    }

    #[test]
    fn each_opacity_tick_multiplies_by_base() {
        let transfer = TransferSettings::default();
        for position in [0, 1, 10, 200, 700] {
            let ratio = mid_opacity(&transfer, position + 1) / mid_opacity(&transfer, position);
            assert!((ratio - 1.01).abs() < 1e-12, "ratio {ratio} at {position}");
        }
        let a = curve(41, 800).middle().opacity;
        let b = curve(42, 800).middle().opacity;
        assert!(((b / a) - 1.01).abs() < 1e-5);
    }

    #[test]
    fn anchors_ignore_the_sliders() {
        for (opacity, at) in [(0, 0), (0, 3000), (925, 1500), (300, 42)] {
            let c = curve(opacity, at);
            assert_eq!(c.points()[0], ControlPoint::new(0.0, 0.0));
            assert_eq!(c.points()[2], ControlPoint::new(3000.0, 1.0));
        }
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let c = curve(5000, -20);
        assert_eq!(c.middle().value, 0.0);
        assert_eq!(c.middle().opacity, 1.0);
        let c = curve(-5000, 9000);
        assert_eq!(c.middle().value, 3000.0);
        assert!(c.middle().opacity >= 0.0);
        assert!(c.points().windows(2).all(|p| p[0].value <= p[1].value));
    }

    #[test]
    fn evaluates_piecewise_linearly() {
        let c = curve(0, 1000);
        let mid = c.middle().opacity;
        assert_eq!(c.evaluate(0.0), 0.0);
        assert!(close(c.evaluate(500.0), mid * 0.5));
        assert!(close(c.evaluate(1000.0), mid));
        assert!(close(c.evaluate(2000.0), mid + (1.0 - mid) * 0.5));
        assert_eq!(c.evaluate(3000.0), 1.0);
        assert_eq!(c.evaluate(60000.0), 1.0);
        assert_eq!(c.evaluate(-1.0), 0.0);
    }

    #[test]
    fn coincident_points_resolve_to_the_middle_opacity() {
        let low = curve(100, 0);
        let mid = low.middle().opacity;
        assert_eq!(low.points()[0].value, low.points()[1].value);
        assert!(close(low.evaluate(0.0), mid));
        assert!(close(low.evaluate(1500.0), mid + (1.0 - mid) * 0.5));

        let high = curve(100, 3000);
        assert_eq!(high.points()[1].value, high.points()[2].value);
        assert!(close(high.evaluate(3000.0), mid));
        assert!(close(high.evaluate(1500.0), mid * 0.5));
        assert_eq!(high.evaluate(3000.5), 1.0);
    }

    #[test]
    fn lut_spans_domain_with_guard_entries() {
        let c = curve(0, 1500);
        let lut = c.to_lut(3001);
        assert_eq!(lut.len(), 3003);
        assert_eq!(lut[0], 0.0);
        assert_eq!(lut[1], 0.0);
        assert!(close(lut[1501], c.middle().opacity));
        assert_eq!(lut[3001], 1.0);
        assert_eq!(lut[3002], 1.0);
    }
}
