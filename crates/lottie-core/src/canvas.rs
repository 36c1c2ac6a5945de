//! Save/restore state machine in front of a [`DrawBackend`].

use crate::assets::ImageData;
use crate::backend::{DrawBackend, LayerComposite, Paint, TextRun};
use bitflags::bitflags;
use glam::{Mat3, Vec2};
use kurbo::{BezPath, Rect};
use tracing::debug;

bitflags! {
    /// Aspects of canvas state captured by one save.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SaveFlags: u8 {
        const TRANSFORM = 1 << 0;
        const CLIP = 1 << 1;
        const LAYER = 1 << 2;
    }
}

#[derive(Debug)]
struct SaveFrame {
    flags: SaveFlags,
    transform: Mat3,
    clip: Rect,
    clip_pushes: usize,
    layer: Option<LayerComposite>,
}

/// Drawing canvas with a transform, a device-space clip rectangle and
/// nested off-screen layers.
///
/// Each save records which aspects it captured, and `restore` pops exactly
/// those: transform first, then clip, then the layer.
pub struct CompositingCanvas<B> {
    backend: B,
    transform: Mat3,
    clip: Rect,
    clip_pushes: usize,
    stack: Vec<SaveFrame>,
}

impl<B: DrawBackend> CompositingCanvas<B> {
    pub fn new(backend: B, width: f32, height: f32) -> Self {
        CompositingCanvas {
            backend,
            transform: Mat3::IDENTITY,
            clip: Rect::new(0.0, 0.0, width as f64, height as f64),
            clip_pushes: 0,
            stack: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Unwinds any open saves, pops clips applied outside of any save and
    /// hands the backend back.
    pub fn into_backend(mut self) -> B {
        self.restore_to_count(0);
        for _ in 0..self.clip_pushes {
            self.backend.pop_clip();
        }
        self.backend
    }

    pub fn transform(&self) -> Mat3 {
        self.transform
    }

    /// Current clip in device space.
    pub fn clip_bounds(&self) -> Rect {
        self.clip
    }

    /// Current clip mapped back into local coordinates.
    pub fn local_clip_bounds(&self) -> Rect {
        if self.transform.determinant().abs() <= f32::EPSILON {
            return Rect::ZERO;
        }
        map_rect(&self.transform.inverse(), self.clip)
    }

    pub fn save_count(&self) -> usize {
        self.stack.len()
    }

    /// Saves transform and clip.
    pub fn save(&mut self) -> usize {
        self.save_with(SaveFlags::TRANSFORM | SaveFlags::CLIP)
    }

    /// Saves only the aspects in `flags`. `LAYER` is ignored here, layers
    /// need bounds and go through [`CompositingCanvas::save_layer`].
    pub fn save_with(&mut self, flags: SaveFlags) -> usize {
        let flags = flags - SaveFlags::LAYER;
        self.push_frame(flags, None);
        self.stack.len()
    }

    /// Saves state and, when `flags` contains `LAYER`, redirects drawing into
    /// a cleared off-screen target covering `bounds` (local coordinates).
    ///
    /// The clip is always saved. `composite` is applied when the matching
    /// `restore` merges the layer back, so content inside draws at full
    /// opacity.
    pub fn save_layer(&mut self, bounds: Rect, composite: LayerComposite, flags: SaveFlags) -> usize {
        let flags = flags | SaveFlags::CLIP;
        let layer = flags.contains(SaveFlags::LAYER).then(|| {
            let device = intersect(map_rect(&self.transform, bounds), self.clip);
            debug!(target: "canvas", ?device, ?composite, "push layer");
            self.backend.push_layer(device);
            composite
        });
        self.push_frame(flags, layer);
        self.stack.len()
    }

    fn push_frame(&mut self, flags: SaveFlags, layer: Option<LayerComposite>) {
        self.stack.push(SaveFrame {
            flags,
            transform: self.transform,
            clip: self.clip,
            clip_pushes: self.clip_pushes,
            layer,
        });
        if flags.contains(SaveFlags::CLIP) {
            self.clip_pushes = 0;
        }
    }

    /// Pops the most recent save. Restoring with nothing saved is a no-op.
    pub fn restore(&mut self) {
        let Some(frame) = self.stack.pop() else {
            debug!(target: "canvas", "restore without matching save ignored");
            return;
        };

        if frame.flags.contains(SaveFlags::TRANSFORM) {
            self.transform = frame.transform;
        }

        if frame.flags.contains(SaveFlags::CLIP) {
            for _ in 0..self.clip_pushes {
                self.backend.pop_clip();
            }
            self.clip = frame.clip;
            self.clip_pushes = frame.clip_pushes;
        }

        if let Some(composite) = frame.layer {
            debug!(target: "canvas", ?composite, "pop layer");
            self.backend.pop_layer(&composite);
        }
    }

    pub fn restore_to_count(&mut self, count: usize) {
        while self.stack.len() > count {
            self.restore();
        }
    }

    /// Pre-multiplies `matrix`: it applies to drawing coordinates before
    /// the existing transform.
    pub fn concat(&mut self, matrix: &Mat3) {
        self.transform *= *matrix;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.concat(&Mat3::from_translation(Vec2::new(dx, dy)));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(&Mat3::from_scale(Vec2::new(sx, sy)));
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.concat(&Mat3::from_angle(degrees.to_radians()));
    }

    /// Intersects the clip with `rect` (local coordinates). Returns whether
    /// anything remains visible.
    pub fn clip_rect(&mut self, rect: Rect) -> bool {
        self.clip = intersect(self.clip, map_rect(&self.transform, rect));
        self.backend.push_clip(self.clip);
        self.clip_pushes += 1;
        !is_empty(self.clip)
    }

    pub fn is_clip_empty(&self) -> bool {
        is_empty(self.clip)
    }

    pub fn draw_path(&mut self, path: &BezPath, paint: &Paint) {
        if self.is_clip_empty() {
            return;
        }
        self.backend.draw_path(path, &self.transform, paint);
    }

    pub fn draw_image(&mut self, image: &ImageData, alpha: f32) {
        if self.is_clip_empty() {
            return;
        }
        self.backend.draw_image(image, &self.transform, alpha);
    }

    pub fn draw_text(&mut self, run: &TextRun, paint: &Paint) {
        if self.is_clip_empty() {
            return;
        }
        self.backend.draw_text(run, &self.transform, paint);
    }
}

/// Bounding box of `rect` after `matrix`.
pub fn map_rect(matrix: &Mat3, rect: Rect) -> Rect {
    let corners = [
        (rect.x0, rect.y0),
        (rect.x1, rect.y0),
        (rect.x1, rect.y1),
        (rect.x0, rect.y1),
    ]
    .map(|(x, y)| matrix.transform_point2(Vec2::new(x as f32, y as f32)));

    let (mut min, mut max) = (corners[0], corners[0]);
    for c in &corners[1..] {
        min = min.min(*c);
        max = max.max(*c);
    }
    Rect::new(min.x as f64, min.y as f64, max.x as f64, max.y as f64)
}

fn intersect(a: Rect, b: Rect) -> Rect {
    let x0 = a.x0.max(b.x0);
    let y0 = a.y0.max(b.y0);
    let x1 = a.x1.min(b.x1).max(x0);
    let y1 = a.y1.min(b.y1).max(y0);
    Rect::new(x0, y0, x1, y1)
}

fn is_empty(rect: Rect) -> bool {
    rect.width() <= 0.0 || rect.height() <= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BlendMode, DrawCommand, RecordingBackend};
    use crate::color::Color;

    fn canvas() -> CompositingCanvas<RecordingBackend> {
        CompositingCanvas::new(RecordingBackend::new(), 100.0, 100.0)
    }

    fn square() -> BezPath {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.line_to((10.0, 10.0));
        path.close_path();
        path
    }

    #[test]
    fn test_nested_clips_restore_to_initial_state() {
        let mut canvas = canvas();
        let before = canvas.clip_bounds();

        canvas.save();
        assert!(canvas.clip_rect(Rect::new(10.0, 10.0, 60.0, 60.0)));
        canvas.save();
        assert!(canvas.clip_rect(Rect::new(40.0, 40.0, 90.0, 90.0)));
        assert_eq!(canvas.clip_bounds(), Rect::new(40.0, 40.0, 60.0, 60.0));
        canvas.restore();
        assert_eq!(canvas.clip_bounds(), Rect::new(10.0, 10.0, 60.0, 60.0));
        canvas.restore();

        assert_eq!(canvas.clip_bounds(), before);
        let pushes = canvas
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::PushClip(_)))
            .count();
        let pops = canvas
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::PopClip))
            .count();
        assert_eq!(pushes, pops);
    }

    #[test]
    fn test_restore_on_empty_stack_is_noop() {
        let mut canvas = canvas();
        canvas.translate(5.0, 5.0);
        canvas.restore();
        canvas.restore();
        assert_eq!(canvas.save_count(), 0);
        assert_eq!(canvas.transform(), Mat3::from_translation(Vec2::new(5.0, 5.0)));
        assert!(canvas.backend().commands().is_empty());
    }

    #[test]
    fn test_concat_applies_child_first() {
        let mut canvas = canvas();
        canvas.translate(10.0, 0.0);
        canvas.scale(2.0, 2.0);
        let p = canvas.transform().transform_point2(Vec2::new(1.0, 1.0));
        assert_eq!(p, Vec2::new(12.0, 2.0));
    }

    #[test]
    fn test_clip_rect_reports_empty() {
        let mut canvas = canvas();
        canvas.save();
        assert!(!canvas.clip_rect(Rect::new(200.0, 200.0, 300.0, 300.0)));
        canvas.draw_path(&square(), &Paint::fill(Color::BLACK));
        canvas.restore();
        assert_eq!(canvas.backend().path_count(), 0);

        canvas.draw_path(&square(), &Paint::fill(Color::BLACK));
        assert_eq!(canvas.backend().path_count(), 1);
    }

    #[test]
    fn test_clip_follows_transform() {
        let mut canvas = canvas();
        canvas.save();
        canvas.translate(20.0, 30.0);
        canvas.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(canvas.clip_bounds(), Rect::new(20.0, 30.0, 30.0, 40.0));
        assert_eq!(canvas.local_clip_bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
        canvas.restore();
    }

    #[test]
    fn test_save_layer_composites_on_restore() {
        let mut canvas = canvas();
        let composite = LayerComposite {
            blend_mode: BlendMode::Multiply,
            alpha: 0.5,
        };
        canvas.save_layer(Rect::new(0.0, 0.0, 50.0, 50.0), composite, SaveFlags::LAYER);
        canvas.clip_rect(Rect::new(0.0, 0.0, 25.0, 25.0));
        canvas.draw_path(&square(), &Paint::fill(Color::BLACK));
        canvas.restore();

        let commands = canvas.backend().commands();
        assert!(matches!(commands[0], DrawCommand::PushLayer(r) if r == Rect::new(0.0, 0.0, 50.0, 50.0)));
        assert!(matches!(commands[1], DrawCommand::PushClip(_)));
        assert!(matches!(commands[2], DrawCommand::Path { .. }));
        assert_eq!(commands[3], DrawCommand::PopClip);
        assert_eq!(commands[4], DrawCommand::PopLayer(composite));
    }

    #[test]
    fn test_save_layer_without_layer_flag_keeps_target() {
        let mut canvas = canvas();
        canvas.save_layer(Rect::new(0.0, 0.0, 50.0, 50.0), LayerComposite::default(), SaveFlags::TRANSFORM);
        canvas.translate(3.0, 3.0);
        canvas.restore();
        assert!(canvas.backend().commands().is_empty());
        assert_eq!(canvas.transform(), Mat3::IDENTITY);
    }

    #[test]
    fn test_transform_only_save_leaves_clip_in_place() {
        let mut canvas = canvas();
        canvas.save();
        canvas.save_with(SaveFlags::TRANSFORM);
        canvas.translate(1.0, 1.0);
        canvas.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        canvas.restore();
        assert_eq!(canvas.transform(), Mat3::IDENTITY);
        assert_eq!(canvas.clip_bounds(), Rect::new(1.0, 1.0, 11.0, 11.0));

        canvas.restore();
        assert_eq!(canvas.clip_bounds(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(canvas.backend().commands().last(), Some(&DrawCommand::PopClip));
    }

    #[test]
    fn test_into_backend_pops_root_clips() {
        let mut canvas = canvas();
        canvas.clip_rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        canvas.save();
        canvas.clip_rect(Rect::new(10.0, 10.0, 40.0, 40.0));
        canvas.clip_rect(Rect::new(20.0, 20.0, 40.0, 40.0));
        let backend = canvas.into_backend();

        let commands = backend.commands();
        let pushes = commands.iter().filter(|c| matches!(c, DrawCommand::PushClip(_))).count();
        let pops = commands.iter().filter(|c| matches!(c, DrawCommand::PopClip)).count();
        assert_eq!(pushes, 3);
        assert_eq!(pops, 3);
        assert_eq!(commands.last(), Some(&DrawCommand::PopClip));
    }

    #[test]
    fn test_into_backend_unwinds_open_saves() {
        let mut canvas = canvas();
        canvas.save_layer(Rect::new(0.0, 0.0, 10.0, 10.0), LayerComposite::default(), SaveFlags::LAYER);
        canvas.save();
        let backend = canvas.into_backend();
        assert!(matches!(backend.commands().last(), Some(DrawCommand::PopLayer(_))));
    }
}
