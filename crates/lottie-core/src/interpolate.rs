use crate::color::Color;
use crate::error::Result;
use crate::keyframe::SpatialTangents;
use glam::Vec2;
use lottie_data::model::TextDocument;

/// Values that can be blended between two keyframes.
///
/// Implementations must return `self` exactly at `t = 0` and `other`
/// exactly at `t = 1`. Results are written into a caller-owned buffer so
/// heavy values (shape outlines, gradients) can be reused across frames.
pub trait Interpolatable: Clone {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()>;

    fn interpolate(&self, other: &Self, t: f32) -> Result<Self> {
        let mut out = self.clone();
        self.interpolate_into(other, t, &mut out)?;
        Ok(out)
    }

    /// Interpolation along a spatial curve. Only points bend; other values
    /// fall back to [`Interpolatable::interpolate_into`].
    fn interpolate_spatial_into(
        &self,
        other: &Self,
        t: f32,
        _tangents: Option<&SpatialTangents>,
        out: &mut Self,
    ) -> Result<()> {
        self.interpolate_into(other, t, out)
    }
}

/// Linear blend that is exact at both endpoints.
#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
pub(crate) fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

impl Interpolatable for f32 {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        *out = lerp(*self, *other, t);
        Ok(())
    }
}

impl Interpolatable for Vec2 {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        *out = lerp_vec2(*self, *other, t);
        Ok(())
    }

    fn interpolate_spatial_into(
        &self,
        other: &Self,
        t: f32,
        tangents: Option<&SpatialTangents>,
        out: &mut Self,
    ) -> Result<()> {
        let Some(tangents) = tangents else {
            return self.interpolate_into(other, t, out);
        };

        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + tangents.tangent_out;
        let p2 = p3 + tangents.tangent_in;

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let one_minus_t_cub = one_minus_t_sq * one_minus_t;

        let t_sq = t * t;
        let t_cub = t_sq * t;

        *out = p0 * one_minus_t_cub
            + p1 * 3.0 * one_minus_t_sq * t
            + p2 * 3.0 * one_minus_t * t_sq
            + p3 * t_cub;
        Ok(())
    }
}

impl Interpolatable for Color {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        let channel = |a: u8, b: u8| lerp(a as f32, b as f32, t).round().clamp(0.0, 255.0) as u8;
        *out = Color::rgba(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
            channel(self.a, other.a),
        );
        Ok(())
    }
}

// Text documents switch at the end of the segment.
impl Interpolatable for TextDocument {
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        if t < 1.0 {
            out.clone_from(self);
        } else {
            out.clone_from(other);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_endpoints_are_exact() {
        let pairs = [(0.0_f32, 100.0_f32), (-3.7, 12.1), (0.1, 0.3), (1e6, -1e-3)];
        for (a, b) in pairs {
            assert_eq!(a.interpolate(&b, 0.0).unwrap(), a);
            assert_eq!(a.interpolate(&b, 1.0).unwrap(), b);
        }
        assert_eq!(0.0_f32.interpolate(&100.0, 0.25).unwrap(), 25.0);
    }

    #[test]
    fn test_point_endpoints_are_exact() {
        let a = Vec2::new(0.3, -7.9);
        let b = Vec2::new(11.1, 0.7);
        assert_eq!(a.interpolate(&b, 0.0).unwrap(), a);
        assert_eq!(a.interpolate(&b, 1.0).unwrap(), b);
    }

    #[test]
    fn test_spatial_curve_bends_and_keeps_endpoints() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(100.0, 0.0);
        let tangents = SpatialTangents::new(Vec2::new(0.0, 50.0), Vec2::new(0.0, 50.0));
        let mut out = Vec2::ZERO;

        a.interpolate_spatial_into(&b, 0.5, Some(&tangents), &mut out).unwrap();
        assert!((out.x - 50.0).abs() < 1e-4);
        assert!((out.y - 37.5).abs() < 1e-4);

        a.interpolate_spatial_into(&b, 0.0, Some(&tangents), &mut out).unwrap();
        assert_eq!(out, a);
        a.interpolate_spatial_into(&b, 1.0, Some(&tangents), &mut out).unwrap();
        assert_eq!(out, b);
    }

    #[test]
    fn test_color_rounds_per_channel() {
        let a = Color::rgba(0, 0, 0, 255);
        let b = Color::rgba(255, 10, 1, 0);
        assert_eq!(a.interpolate(&b, 0.0).unwrap(), a);
        assert_eq!(a.interpolate(&b, 1.0).unwrap(), b);
        assert_eq!(a.interpolate(&b, 0.5).unwrap(), Color::rgba(128, 5, 1, 128));
    }

    #[test]
    fn test_text_switches_at_end() {
        let a = TextDocument {
            t: "Hello".into(),
            ..Default::default()
        };
        let b = TextDocument {
            t: "World".into(),
            ..Default::default()
        };
        assert_eq!(a.interpolate(&b, 0.99).unwrap().t, "Hello");
        assert_eq!(a.interpolate(&b, 1.0).unwrap().t, "World");
    }
}
