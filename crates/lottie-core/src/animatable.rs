use crate::error::{LottieError, Result};
use crate::interpolate::Interpolatable;
use crate::keyframe::{EasingCurve, Keyframe, SpatialTangents};
use glam::Vec2;
use lottie_data::model::{self as data, Property, Value};
use tracing::trace;

/// An ordered, non-empty list of keyframes for one property.
///
/// Built once when a composition is compiled and never mutated afterwards.
/// Evaluation goes through a [`KeyframeEvaluator`], one per rendering pass.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatableValue<T> {
    keyframes: Vec<Keyframe<T>>,
}

impl<T: Interpolatable> AnimatableValue<T> {
    /// Builds a value from keyframes, ordering them by start frame.
    pub fn new(mut keyframes: Vec<Keyframe<T>>) -> Result<Self> {
        if keyframes.is_empty() {
            return Err(LottieError::EmptyKeyframes);
        }
        keyframes.sort_by(|a, b| a.start_frame().total_cmp(&b.start_frame()));
        Ok(AnimatableValue { keyframes })
    }

    /// A value that never changes.
    pub fn fixed(value: T) -> Self {
        AnimatableValue {
            keyframes: vec![Keyframe::fixed(0.0, value)],
        }
    }

    /// Imports a document property.
    ///
    /// Each keyframe ends where the next one starts. Its end value is its
    /// own `e` or the next keyframe's `s`, and the last keyframe is static.
    /// Missing or empty properties fall back to `default`.
    pub fn from_property<D>(property: &Property<D>, convert: impl Fn(&D) -> T, default: T) -> Self {
        let raw = match &property.k {
            Value::Default => return Self::fixed(default),
            Value::Static(v) => return Self::fixed(convert(v)),
            Value::Animated(raw) if raw.is_empty() => return Self::fixed(default),
            Value::Animated(raw) => raw,
        };

        let mut keyframes = Vec::with_capacity(raw.len());
        let mut carried: Option<T> = None;
        for (index, kf) in raw.iter().enumerate() {
            let start = kf
                .s
                .as_ref()
                .map(&convert)
                .or_else(|| carried.clone())
                .unwrap_or_else(|| default.clone());

            let keyframe = match raw.get(index + 1) {
                None => Keyframe::fixed(kf.t, start),
                Some(next) if kf.h == Some(1) => Keyframe::hold(kf.t, next.t, start),
                Some(next) => {
                    let end = kf
                        .e
                        .as_ref()
                        .or(next.s.as_ref())
                        .map(&convert)
                        .unwrap_or_else(|| start.clone());
                    carried = Some(end.clone());
                    Keyframe::new(kf.t, next.t, start, end, easing_of(kf))
                        .with_spatial_tangents(spatial_of(kf))
                }
            };
            if keyframe.is_static() {
                carried = Some(keyframe.start_value().clone());
            }
            keyframes.push(keyframe);
        }

        keyframes.sort_by(|a, b| a.start_frame().total_cmp(&b.start_frame()));
        AnimatableValue { keyframes }
    }

    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1 || !self.keyframes[0].is_static()
    }

    pub fn start_frame(&self) -> f32 {
        self.keyframes[0].start_frame()
    }

    pub fn end_frame(&self) -> f32 {
        let last = &self.keyframes[self.keyframes.len() - 1];
        last.end_frame().unwrap_or(last.start_frame())
    }

    /// Fresh per-pass evaluator.
    pub fn evaluator(&self) -> KeyframeEvaluator<'_, T> {
        KeyframeEvaluator {
            value: self,
            current_index: 0,
            output: None,
        }
    }

    /// One-off evaluation, for callers that don't keep an evaluator around.
    pub fn value_at(&self, frame: f32) -> Result<T> {
        self.evaluator().evaluate(frame).cloned()
    }
}

fn easing_of<D>(kf: &data::Keyframe<D>) -> EasingCurve {
    let handles = kf
        .o
        .as_ref()
        .and_then(|o| o.first())
        .zip(kf.i.as_ref().and_then(|i| i.first()));
    match handles {
        Some((out_tangent, in_tangent)) => {
            EasingCurve::cubic(Vec2::from(out_tangent), Vec2::from(in_tangent))
        }
        None => EasingCurve::Linear,
    }
}

fn spatial_of<D>(kf: &data::Keyframe<D>) -> SpatialTangents {
    let vec = |v: &Option<Vec<f32>>| match v.as_deref() {
        Some([x, y, ..]) => Vec2::new(*x, *y),
        _ => Vec2::ZERO,
    };
    SpatialTangents::new(vec(&kf.to), vec(&kf.ti))
}

/// Stateful cursor over an [`AnimatableValue`].
///
/// Remembers the last matched segment so monotonic playback only scans
/// forward. Seeking backwards restarts the scan from the first keyframe.
#[derive(Debug)]
pub struct KeyframeEvaluator<'a, T> {
    value: &'a AnimatableValue<T>,
    current_index: usize,
    output: Option<T>,
}

impl<'a, T: Interpolatable> KeyframeEvaluator<'a, T> {
    pub fn evaluate(&mut self, frame: f32) -> Result<&T> {
        let value: &'a AnimatableValue<T> = self.value;
        let keyframes = &value.keyframes;
        let first = &keyframes[0];
        if keyframes.len() == 1 || frame < first.start_frame() {
            self.current_index = 0;
            return Ok(store(&mut self.output, first.start_value()));
        }

        let last = keyframes.len() - 1;
        let mut index = self.current_index.min(last);
        if frame < keyframes[index].start_frame() {
            trace!(frame, from = index, "Keyframe cursor moved backwards, rescanning");
            index = 0;
        }
        while index < last && frame >= keyframes[index + 1].start_frame() {
            index += 1;
        }
        self.current_index = index;

        let segment = &keyframes[index];
        let Some(end_value) = segment.end_value() else {
            return Ok(store(&mut self.output, segment.start_value()));
        };
        if segment.end_frame().is_some_and(|end| frame >= end) {
            return Ok(store(&mut self.output, end_value));
        }

        let t = segment.progress(frame);
        let start_value = segment.start_value();
        let out = self.output.get_or_insert_with(|| start_value.clone());
        start_value.interpolate_spatial_into(end_value, t, segment.spatial_tangents(), out)?;
        Ok(out)
    }

    /// Index of the segment matched by the last call.
    pub fn current_index(&self) -> usize {
        self.current_index
    }
}

fn store<'o, T: Clone>(slot: &'o mut Option<T>, value: &T) -> &'o T {
    match slot {
        Some(existing) => existing.clone_from(value),
        None => *slot = Some(value.clone()),
    }
    slot.get_or_insert_with(|| value.clone())
}
