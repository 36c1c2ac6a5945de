use glam::Vec2;

/// Easing applied to the local progress of a keyframe segment.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum EasingCurve {
    #[default]
    Linear,
    /// Holds the start value until the segment ends.
    Hold,
    /// Classic keyframe easing: `out_tangent` leaves the start keyframe,
    /// `in_tangent` enters the end keyframe. Both live in the unit square.
    CubicBezier { out_tangent: Vec2, in_tangent: Vec2 },
}

impl EasingCurve {
    pub fn cubic(out_tangent: Vec2, in_tangent: Vec2) -> Self {
        EasingCurve::CubicBezier {
            out_tangent,
            in_tangent,
        }
    }

    /// Maps linear progress in `[0, 1]` to eased progress.
    pub fn ease(&self, t: f32) -> f32 {
        match self {
            EasingCurve::Linear => t.clamp(0.0, 1.0),
            EasingCurve::Hold => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            EasingCurve::CubicBezier {
                out_tangent,
                in_tangent,
            } => solve_cubic_bezier(*out_tangent, *in_tangent, t),
        }
    }
}

// Cubic Bezier Easing
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t = (t - err / dx_dt).clamp(0.0, 1.0);
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// Spatial tangents of a point keyframe, relative to the segment endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SpatialTangents {
    pub tangent_out: Vec2,
    pub tangent_in: Vec2,
}

impl SpatialTangents {
    pub fn new(tangent_out: Vec2, tangent_in: Vec2) -> Self {
        Self {
            tangent_out,
            tangent_in,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.tangent_out == Vec2::ZERO && self.tangent_in == Vec2::ZERO
    }
}

/// One segment of an animated property.
///
/// A keyframe without an end value is static: it evaluates to its start
/// value for any progress.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe<T> {
    start_value: T,
    end_value: Option<T>,
    start_frame: f32,
    end_frame: Option<f32>,
    easing: EasingCurve,
    spatial: Option<SpatialTangents>,
}

impl<T> Keyframe<T> {
    /// A static keyframe that holds `value` from `frame` onwards.
    pub fn fixed(frame: f32, value: T) -> Self {
        Keyframe {
            start_value: value,
            end_value: None,
            start_frame: frame,
            end_frame: None,
            easing: EasingCurve::Hold,
            spatial: None,
        }
    }

    /// A static keyframe spanning `[start_frame, end_frame)`.
    pub fn hold(start_frame: f32, end_frame: f32, value: T) -> Self {
        Keyframe {
            end_frame: Some(end_frame),
            ..Self::fixed(start_frame, value)
        }
    }

    /// An interpolating keyframe. A `Hold` easing yields a static keyframe.
    pub fn new(
        start_frame: f32,
        end_frame: f32,
        start_value: T,
        end_value: T,
        easing: EasingCurve,
    ) -> Self {
        Keyframe {
            start_value,
            end_value: (easing != EasingCurve::Hold).then_some(end_value),
            start_frame,
            end_frame: Some(end_frame),
            easing,
            spatial: None,
        }
    }

    pub fn with_spatial_tangents(mut self, tangents: SpatialTangents) -> Self {
        self.spatial = (!tangents.is_zero()).then_some(tangents);
        self
    }

    pub fn start_value(&self) -> &T {
        &self.start_value
    }

    pub fn end_value(&self) -> Option<&T> {
        self.end_value.as_ref()
    }

    pub fn start_frame(&self) -> f32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> Option<f32> {
        self.end_frame
    }

    pub fn easing(&self) -> EasingCurve {
        self.easing
    }

    pub fn spatial_tangents(&self) -> Option<&SpatialTangents> {
        self.spatial.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.end_value.is_none()
    }

    /// Eased progress of `frame` through this segment.
    ///
    /// A zero-length segment is treated as already complete.
    pub fn progress(&self, frame: f32) -> f32 {
        let Some(end_frame) = self.end_frame else {
            return 0.0;
        };
        let duration = end_frame - self.start_frame;
        if duration <= 0.0 {
            return 1.0;
        }
        let t = ((frame - self.start_frame) / duration).clamp(0.0, 1.0);
        self.easing.ease(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_bezier_endpoints() {
        let p1 = Vec2::new(0.42, 0.0);
        let p2 = Vec2::new(0.58, 1.0);
        assert_eq!(solve_cubic_bezier(p1, p2, 0.0), 0.0);
        assert_eq!(solve_cubic_bezier(p1, p2, 1.0), 1.0);
        let mid = solve_cubic_bezier(p1, p2, 0.5);
        assert!((mid - 0.5).abs() < 1e-3, "ease-in-out is symmetric, got {mid}");
    }

    #[test]
    fn test_cubic_bezier_is_monotone() {
        let p1 = Vec2::new(0.33, 0.0);
        let p2 = Vec2::new(0.67, 1.0);
        let mut last = 0.0;
        for i in 0..=20 {
            let v = solve_cubic_bezier(p1, p2, i as f32 / 20.0);
            assert!(v >= last - 1e-4, "step {i}: {v} < {last}");
            last = v;
        }
    }

    #[test]
    fn test_zero_length_segment_is_complete() {
        let kf = Keyframe::new(5.0, 5.0, 0.0_f32, 1.0, EasingCurve::Linear);
        assert_eq!(kf.progress(5.0), 1.0);
    }

    #[test]
    fn test_static_keyframe() {
        let kf = Keyframe::fixed(0.0, 3.0_f32);
        assert!(kf.is_static());
        assert_eq!(kf.end_value(), None);

        let hold = Keyframe::hold(0.0, 10.0, 3.0_f32);
        assert!(hold.is_static());
        assert_eq!(hold.end_frame(), Some(10.0));

        let eased_hold = Keyframe::new(0.0, 10.0, 1.0_f32, 2.0, EasingCurve::Hold);
        assert!(eased_hold.is_static());
    }

    #[test]
    fn test_zero_spatial_tangents_are_dropped() {
        let kf = Keyframe::new(0.0, 1.0, Vec2::ZERO, Vec2::ONE, EasingCurve::Linear)
            .with_spatial_tangents(SpatialTangents::default());
        assert!(kf.spatial_tangents().is_none());
    }
}
