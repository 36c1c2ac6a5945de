use crate::error::Result;
use crate::interpolate::{lerp_vec2, Interpolatable};
use glam::Vec2;
use kurbo::{BezPath, Point};
use lottie_data::model::BezierPath;
use tracing::warn;

/// One cubic segment ending at `vertex`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CubicSegment {
    pub control_point1: Vec2,
    pub control_point2: Vec2,
    pub vertex: Vec2,
}

impl CubicSegment {
    pub fn new(control_point1: Vec2, control_point2: Vec2, vertex: Vec2) -> Self {
        Self {
            control_point1,
            control_point2,
            vertex,
        }
    }

    fn interpolate(&self, other: &Self, t: f32) -> Self {
        CubicSegment {
            control_point1: lerp_vec2(self.control_point1, other.control_point1, t),
            control_point2: lerp_vec2(self.control_point2, other.control_point2, t),
            vertex: lerp_vec2(self.vertex, other.vertex, t),
        }
    }
}

/// A single contour made of cubic segments, with absolute control points.
#[derive(Debug, PartialEq, Default)]
pub struct ShapeOutline {
    initial_point: Vec2,
    closed: bool,
    curves: Vec<CubicSegment>,
}

impl ShapeOutline {
    pub fn new(initial_point: Vec2, closed: bool, curves: Vec<CubicSegment>) -> Self {
        Self {
            initial_point,
            closed,
            curves,
        }
    }

    /// Converts Lottie's vertex/tangent form, where `i`/`o` are relative to
    /// their vertex. Closed paths get an extra segment back to the start.
    pub fn from_bezier_path(path: &BezierPath) -> Self {
        let vertex = |k: usize| path.v.get(k).map(|v| Vec2::from(*v)).unwrap_or_default();
        let in_tangent = |k: usize| path.i.get(k).map(|v| Vec2::from(*v)).unwrap_or_default();
        let out_tangent = |k: usize| path.o.get(k).map(|v| Vec2::from(*v)).unwrap_or_default();

        let count = path.v.len();
        if count == 0 {
            return ShapeOutline {
                closed: path.c,
                ..Default::default()
            };
        }

        let mut curves = Vec::with_capacity(count);
        for k in 1..count {
            curves.push(CubicSegment::new(
                vertex(k - 1) + out_tangent(k - 1),
                vertex(k) + in_tangent(k),
                vertex(k),
            ));
        }
        if path.c {
            let last = count - 1;
            curves.push(CubicSegment::new(
                vertex(last) + out_tangent(last),
                vertex(0) + in_tangent(0),
                vertex(0),
            ));
        }

        ShapeOutline {
            initial_point: vertex(0),
            closed: path.c,
            curves,
        }
    }

    pub fn initial_point(&self) -> Vec2 {
        self.initial_point
    }

    pub fn set_initial_point(&mut self, point: Vec2) {
        self.initial_point = point;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn curves(&self) -> &[CubicSegment] {
        &self.curves
    }

    pub fn push_curve(&mut self, curve: CubicSegment) {
        self.curves.push(curve);
    }

    /// Flattens to a kurbo path. Segments whose control points sit on their
    /// endpoints become straight lines.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(to_point(self.initial_point));
        let mut previous = self.initial_point;
        for curve in &self.curves {
            if curve.control_point1 == previous && curve.control_point2 == curve.vertex {
                path.line_to(to_point(curve.vertex));
            } else {
                path.curve_to(
                    to_point(curve.control_point1),
                    to_point(curve.control_point2),
                    to_point(curve.vertex),
                );
            }
            previous = curve.vertex;
        }
        if self.closed {
            path.close_path();
        }
        path
    }
}

impl Clone for ShapeOutline {
    fn clone(&self) -> Self {
        ShapeOutline {
            initial_point: self.initial_point,
            closed: self.closed,
            curves: self.curves.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.initial_point = source.initial_point;
        self.closed = source.closed;
        self.curves.clone_from(&source.curves);
    }
}

fn to_point(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

impl Interpolatable for ShapeOutline {
    /// Morphs curve by curve into `out`.
    ///
    /// Outlines with different curve counts are truncated to the shorter
    /// one; the morph still succeeds.
    fn interpolate_into(&self, other: &Self, t: f32, out: &mut Self) -> Result<()> {
        let count = self.curves.len().min(other.curves.len());
        if self.curves.len() != other.curves.len() {
            warn!(
                left = self.curves.len(),
                right = other.curves.len(),
                "Shape morph between outlines with different curve counts, truncating to {count}"
            );
        }

        out.closed = self.closed || other.closed;
        out.initial_point = lerp_vec2(self.initial_point, other.initial_point, t);
        out.curves.truncate(count);
        out.curves.resize(count, CubicSegment::default());
        for (slot, (a, b)) in out
            .curves
            .iter_mut()
            .zip(self.curves.iter().zip(&other.curves))
        {
            *slot = a.interpolate(b, t);
        }
        Ok(())
    }
}
