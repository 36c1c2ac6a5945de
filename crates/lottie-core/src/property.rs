//! Typed property kinds and their per-pass evaluators.

use crate::animatable::{AnimatableValue, KeyframeEvaluator};
use crate::color::Color;
use crate::error::Result;
use crate::gradient::GradientColor;
use crate::shape::ShapeOutline;
use glam::{Mat3, Vec2};
use lottie_data::model::{self as data, PositionProperty};

/// Borrowed view of one animatable property of a content node.
#[derive(Clone, Copy, Debug)]
pub enum AnimatableProperty<'a> {
    Scalar(&'a AnimatableValue<f32>),
    Point(&'a AnimatableValue<Vec2>),
    Color(&'a AnimatableValue<Color>),
    Gradient(&'a AnimatableValue<GradientColor>),
    Shape(&'a AnimatableValue<ShapeOutline>),
    Transform(&'a AnimatableTransform),
}

impl<'a> AnimatableProperty<'a> {
    pub fn evaluator(&self) -> PropertyEvaluator<'a> {
        match *self {
            AnimatableProperty::Scalar(v) => PropertyEvaluator::Scalar(v.evaluator()),
            AnimatableProperty::Point(v) => PropertyEvaluator::Point(v.evaluator()),
            AnimatableProperty::Color(v) => PropertyEvaluator::Color(v.evaluator()),
            AnimatableProperty::Gradient(v) => PropertyEvaluator::Gradient(v.evaluator()),
            AnimatableProperty::Shape(v) => PropertyEvaluator::Shape(v.evaluator()),
            AnimatableProperty::Transform(t) => PropertyEvaluator::Transform(Box::new(t.evaluator())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnimatableProperty::Scalar(_) => "scalar",
            AnimatableProperty::Point(_) => "point",
            AnimatableProperty::Color(_) => "color",
            AnimatableProperty::Gradient(_) => "gradient",
            AnimatableProperty::Shape(_) => "shape",
            AnimatableProperty::Transform(_) => "transform",
        }
    }

    pub fn is_animated(&self) -> bool {
        match self {
            AnimatableProperty::Scalar(v) => v.is_animated(),
            AnimatableProperty::Point(v) => v.is_animated(),
            AnimatableProperty::Color(v) => v.is_animated(),
            AnimatableProperty::Gradient(v) => v.is_animated(),
            AnimatableProperty::Shape(v) => v.is_animated(),
            AnimatableProperty::Transform(t) => t.is_animated(),
        }
    }
}

/// Evaluated value of an [`AnimatableProperty`].
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Scalar(f32),
    Point(Vec2),
    Color(Color),
    Gradient(GradientColor),
    Shape(ShapeOutline),
    Transform(TransformValue),
}

pub enum PropertyEvaluator<'a> {
    Scalar(KeyframeEvaluator<'a, f32>),
    Point(KeyframeEvaluator<'a, Vec2>),
    Color(KeyframeEvaluator<'a, Color>),
    Gradient(KeyframeEvaluator<'a, GradientColor>),
    Shape(KeyframeEvaluator<'a, ShapeOutline>),
    Transform(Box<TransformEvaluator<'a>>),
}

impl PropertyEvaluator<'_> {
    pub fn evaluate(&mut self, frame: f32) -> Result<PropertyValue> {
        Ok(match self {
            PropertyEvaluator::Scalar(e) => PropertyValue::Scalar(*e.evaluate(frame)?),
            PropertyEvaluator::Point(e) => PropertyValue::Point(*e.evaluate(frame)?),
            PropertyEvaluator::Color(e) => PropertyValue::Color(*e.evaluate(frame)?),
            PropertyEvaluator::Gradient(e) => PropertyValue::Gradient(e.evaluate(frame)?.clone()),
            PropertyEvaluator::Shape(e) => PropertyValue::Shape(e.evaluate(frame)?.clone()),
            PropertyEvaluator::Transform(e) => PropertyValue::Transform(e.evaluate(frame)?),
        })
    }
}

/// Position is either one 2D value or two independent scalars.
#[derive(Clone, Debug, PartialEq)]
pub enum AnimatablePosition {
    Unified(AnimatableValue<Vec2>),
    Split {
        x: AnimatableValue<f32>,
        y: AnimatableValue<f32>,
    },
}

/// Anchor, position, scale (percent), rotation (degrees) and opacity
/// (percent) of a layer or group.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatableTransform {
    pub anchor: AnimatableValue<Vec2>,
    pub position: AnimatablePosition,
    pub scale: AnimatableValue<Vec2>,
    pub rotation: AnimatableValue<f32>,
    pub opacity: AnimatableValue<f32>,
}

impl Default for AnimatableTransform {
    fn default() -> Self {
        AnimatableTransform {
            anchor: AnimatableValue::fixed(Vec2::ZERO),
            position: AnimatablePosition::Unified(AnimatableValue::fixed(Vec2::ZERO)),
            scale: AnimatableValue::fixed(Vec2::splat(100.0)),
            rotation: AnimatableValue::fixed(0.0),
            opacity: AnimatableValue::fixed(100.0),
        }
    }
}

impl AnimatableTransform {
    pub fn from_lottie(t: &data::Transform) -> Self {
        let xy = |v: &data::Vec3DefaultZero| Vec2::new(v.0[0], v.0[1]);
        let position = match &t.p {
            PositionProperty::Split { x, y, .. } => AnimatablePosition::Split {
                x: AnimatableValue::from_property(x, |v| *v, 0.0),
                y: AnimatableValue::from_property(y, |v| *v, 0.0),
            },
            PositionProperty::Unified(p) => {
                AnimatablePosition::Unified(AnimatableValue::from_property(p, xy, Vec2::ZERO))
            }
        };
        AnimatableTransform {
            anchor: AnimatableValue::from_property(&t.a, xy, Vec2::ZERO),
            position,
            scale: AnimatableValue::from_property(
                &t.s,
                |v| Vec2::new(v.0[0], v.0[1]),
                Vec2::splat(100.0),
            ),
            rotation: AnimatableValue::from_property(&t.r, |v| *v, 0.0),
            opacity: AnimatableValue::from_property(&t.o, |v| *v, 100.0),
        }
    }

    pub fn is_animated(&self) -> bool {
        let position = match &self.position {
            AnimatablePosition::Unified(p) => p.is_animated(),
            AnimatablePosition::Split { x, y } => x.is_animated() || y.is_animated(),
        };
        position
            || self.anchor.is_animated()
            || self.scale.is_animated()
            || self.rotation.is_animated()
            || self.opacity.is_animated()
    }

    pub fn evaluator(&self) -> TransformEvaluator<'_> {
        let position = match &self.position {
            AnimatablePosition::Unified(p) => PositionEvaluator::Unified(p.evaluator()),
            AnimatablePosition::Split { x, y } => PositionEvaluator::Split(x.evaluator(), y.evaluator()),
        };
        TransformEvaluator {
            anchor: self.anchor.evaluator(),
            position,
            scale: self.scale.evaluator(),
            rotation: self.rotation.evaluator(),
            opacity: self.opacity.evaluator(),
        }
    }

    pub fn value_at(&self, frame: f32) -> Result<TransformValue> {
        self.evaluator().evaluate(frame)
    }
}

enum PositionEvaluator<'a> {
    Unified(KeyframeEvaluator<'a, Vec2>),
    Split(KeyframeEvaluator<'a, f32>, KeyframeEvaluator<'a, f32>),
}

pub struct TransformEvaluator<'a> {
    anchor: KeyframeEvaluator<'a, Vec2>,
    position: PositionEvaluator<'a>,
    scale: KeyframeEvaluator<'a, Vec2>,
    rotation: KeyframeEvaluator<'a, f32>,
    opacity: KeyframeEvaluator<'a, f32>,
}

impl TransformEvaluator<'_> {
    pub fn evaluate(&mut self, frame: f32) -> Result<TransformValue> {
        let position = match &mut self.position {
            PositionEvaluator::Unified(p) => *p.evaluate(frame)?,
            PositionEvaluator::Split(x, y) => Vec2::new(*x.evaluate(frame)?, *y.evaluate(frame)?),
        };
        Ok(TransformValue {
            anchor: *self.anchor.evaluate(frame)?,
            position,
            scale: *self.scale.evaluate(frame)? / 100.0,
            rotation: *self.rotation.evaluate(frame)?,
            opacity: (*self.opacity.evaluate(frame)? / 100.0).clamp(0.0, 1.0),
        })
    }
}

/// Transform components at one frame. `scale` is a factor and `opacity`
/// is in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformValue {
    pub anchor: Vec2,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub opacity: f32,
}

impl TransformValue {
    /// Local-to-parent matrix: translate, rotate, scale, then offset by the
    /// anchor.
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_translation(self.position)
            * Mat3::from_angle(self.rotation.to_radians())
            * Mat3::from_scale(self.scale)
            * Mat3::from_translation(-self.anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{EasingCurve, Keyframe};
    use serde_json::json;

    #[test]
    fn test_transform_matrix_applies_anchor_first() {
        let value = TransformValue {
            anchor: Vec2::new(10.0, 10.0),
            position: Vec2::new(100.0, 50.0),
            scale: Vec2::splat(2.0),
            rotation: 0.0,
            opacity: 1.0,
        };
        let p = value.matrix().transform_point2(Vec2::new(10.0, 10.0));
        assert_eq!(p, Vec2::new(100.0, 50.0));
        let q = value.matrix().transform_point2(Vec2::new(20.0, 10.0));
        assert_eq!(q, Vec2::new(120.0, 50.0));
    }

    #[test]
    fn test_transform_from_document() {
        let t: data::Transform = serde_json::from_value(json!({
            "a": { "a": 0, "k": [5, 5, 0] },
            "p": { "a": 0, "k": [50, 60, 0] },
            "s": { "a": 0, "k": [50, 50, 100] },
            "r": { "a": 0, "k": 90 },
            "o": { "a": 1, "k": [
                { "t": 0, "s": [0] },
                { "t": 10, "s": [100] }
            ]}
        }))
        .unwrap();
        let transform = AnimatableTransform::from_lottie(&t);
        assert!(transform.is_animated());

        let value = transform.value_at(5.0).unwrap();
        assert_eq!(value.position, Vec2::new(50.0, 60.0));
        assert_eq!(value.scale, Vec2::splat(0.5));
        assert!((value.opacity - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_split_position() {
        let t: data::Transform = serde_json::from_value(json!({
            "p": { "s": true, "x": { "a": 0, "k": 3 }, "y": { "a": 0, "k": 4 } }
        }))
        .unwrap();
        let value = AnimatableTransform::from_lottie(&t).value_at(0.0).unwrap();
        assert_eq!(value.position, Vec2::new(3.0, 4.0));
        assert_eq!(value.opacity, 1.0);
        assert_eq!(value.matrix(), Mat3::from_translation(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_property_evaluator_dispatch() {
        let scalar = AnimatableValue::new(vec![
            Keyframe::new(0.0, 10.0, 0.0, 10.0, EasingCurve::Linear),
            Keyframe::fixed(10.0, 10.0),
        ])
        .unwrap();
        let color = AnimatableValue::fixed(Color::WHITE);

        let props = [
            AnimatableProperty::Scalar(&scalar),
            AnimatableProperty::Color(&color),
        ];
        assert_eq!(props[0].kind(), "scalar");
        assert!(props[0].is_animated());
        assert!(!props[1].is_animated());

        let mut evaluators: Vec<_> = props.iter().map(|p| p.evaluator()).collect();
        assert_eq!(
            evaluators[0].evaluate(4.0).unwrap(),
            PropertyValue::Scalar(4.0)
        );
        assert_eq!(
            evaluators[1].evaluate(4.0).unwrap(),
            PropertyValue::Color(Color::WHITE)
        );
    }
}
