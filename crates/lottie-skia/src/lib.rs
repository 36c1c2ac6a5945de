use glam::Mat3;
use kurbo::{BezPath, PathEl};
use lottie_core::backend::{
    BlendMode as CoreBlendMode, DrawBackend, FillRule as CoreFillRule, GradientKind,
    Justification, LayerComposite, LineCap as CoreLineCap, LineJoin as CoreLineJoin,
    Paint as CorePaint, PaintSource, PaintStyle as CorePaintStyle, TextRun, Trim,
};
use lottie_core::{Color as CoreColor, CompositingCanvas, ImageData, LottiePlayer};
use skia_safe::{
    gradient_shader, surfaces, trim_path_effect, BlendMode, Canvas, ClipOp, Color, Data, EncodedImageFormat,
    Font, FontMgr, FontStyle, IPoint, IRect, Image as SkImage, Matrix, Paint, PaintStyle, Path,
    PathEffect, PathFillType, Point, Rect, Surface, TextBlob, TileMode, Typeface,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Off-screen surfaces kept per size once their layer is popped.
const MAX_POOLED_PER_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum SkiaError {
    #[error("Failed to create a {width}x{height} raster surface")]
    SurfaceCreation { width: i32, height: i32 },

    #[error("Failed to encode frame as PNG")]
    Encode,
}

/// Host font lookup, consulted before the system font manager.
pub trait TypefaceProvider: Send + Sync {
    fn typeface(&self, family: &str) -> Option<Typeface>;
}

impl TypefaceProvider for () {
    fn typeface(&self, _family: &str) -> Option<Typeface> {
        None
    }
}

struct OffscreenLayer {
    /// `None` when the surface could not be allocated; draws are dropped.
    surface: Option<Surface>,
    origin: IPoint,
    size: (i32, i32),
}

#[derive(Default)]
struct SurfacePool {
    free: HashMap<(i32, i32), Vec<Surface>>,
}

impl SurfacePool {
    fn take(&mut self, size: (i32, i32)) -> Option<Surface> {
        if let Some(mut surface) = self.free.get_mut(&size).and_then(Vec::pop) {
            surface.canvas().clear(Color::TRANSPARENT);
            debug!(target: "skia", ?size, "Reusing pooled surface");
            return Some(surface);
        }
        surfaces::raster_n32_premul(size)
    }

    fn give_back(&mut self, size: (i32, i32), surface: Surface) {
        let slot = self.free.entry(size).or_default();
        if slot.len() < MAX_POOLED_PER_SIZE {
            slot.push(surface);
        }
    }

    fn len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }
}

/// [`DrawBackend`] drawing into a raster [`Surface`].
///
/// Each pushed layer is a separate surface from a size-keyed pool, and
/// popping composites it onto the target below with the requested blend
/// mode and alpha.
pub struct SkiaBackend {
    surface: Surface,
    layers: Vec<OffscreenLayer>,
    pool: SurfacePool,
    images: HashMap<String, Option<SkImage>>,
    fonts: Arc<dyn TypefaceProvider>,
    font_mgr: FontMgr,
}

impl SkiaBackend {
    pub fn new(width: i32, height: i32) -> Result<Self, SkiaError> {
        let surface = surfaces::raster_n32_premul((width, height))
            .ok_or(SkiaError::SurfaceCreation { width, height })?;
        Ok(Self::from_surface(surface))
    }

    pub fn from_surface(surface: Surface) -> Self {
        SkiaBackend {
            surface,
            layers: Vec::new(),
            pool: SurfacePool::default(),
            images: HashMap::new(),
            fonts: Arc::new(()),
            font_mgr: FontMgr::new(),
        }
    }

    pub fn with_fonts(mut self, fonts: Arc<dyn TypefaceProvider>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn surface(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn into_surface(self) -> Surface {
        self.surface
    }

    /// Number of idle off-screen surfaces waiting for reuse.
    pub fn pooled_surfaces(&self) -> usize {
        self.pool.len()
    }

    pub fn encode_png(&mut self) -> Result<Vec<u8>, SkiaError> {
        let image = self.surface.image_snapshot();
        let data = image
            .encode(None, EncodedImageFormat::PNG, 100)
            .ok_or(SkiaError::Encode)?;
        Ok(data.as_bytes().to_vec())
    }

    /// Canvas of the innermost target and its device-space origin.
    fn target(&mut self) -> Option<(&Canvas, IPoint)> {
        match self.layers.last_mut() {
            Some(layer) => {
                let origin = layer.origin;
                layer.surface.as_mut().map(|s| (s.canvas(), origin))
            }
            None => Some((self.surface.canvas(), IPoint::new(0, 0))),
        }
    }

    fn decoded(&mut self, image: &ImageData) -> Option<SkImage> {
        self.images
            .entry(image.id.clone())
            .or_insert_with(|| {
                let decoded = SkImage::from_encoded(Data::new_copy(&image.bytes));
                if decoded.is_none() {
                    warn!(id = %image.id, "Undecodable image, skipping");
                }
                decoded
            })
            .clone()
    }

    fn typeface(&self, family: &str) -> Option<Typeface> {
        self.fonts
            .typeface(family)
            .or_else(|| self.font_mgr.match_family_style(family, FontStyle::normal()))
            .or_else(|| self.font_mgr.match_family_style("", FontStyle::normal()))
    }
}

/// Runs `draw` with `transform` applied on top of the target's origin.
fn with_transform(canvas: &Canvas, origin: IPoint, transform: &Mat3, draw: impl FnOnce(&Canvas)) {
    canvas.save();
    canvas.translate((-origin.x as f32, -origin.y as f32));
    canvas.concat(&to_matrix(transform));
    draw(canvas);
    canvas.restore();
}

impl DrawBackend for SkiaBackend {
    fn draw_path(&mut self, path: &BezPath, transform: &Mat3, paint: &CorePaint) {
        let mut sk_path = kurbo_to_skia_path(path);
        if let CorePaintStyle::Fill(rule) = &paint.style {
            sk_path.set_fill_type(convert_fill_rule(*rule));
        }
        let sk_paint = convert_paint(paint);
        if let Some((canvas, origin)) = self.target() {
            with_transform(canvas, origin, transform, |c| {
                c.draw_path(&sk_path, &sk_paint);
            });
        }
    }

    fn draw_image(&mut self, image: &ImageData, transform: &Mat3, alpha: f32) {
        let Some(decoded) = self.decoded(image) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_anti_alias(true);
        paint.set_alpha_f(sanitize(alpha));
        let src = Rect::from_wh(decoded.width() as f32, decoded.height() as f32);
        let dst = Rect::from_wh(image.width as f32, image.height as f32);
        if let Some((canvas, origin)) = self.target() {
            with_transform(canvas, origin, transform, |c| {
                c.draw_image_rect(
                    &decoded,
                    Some((&src, skia_safe::canvas::SrcRectConstraint::Strict)),
                    dst,
                    &paint,
                );
            });
        }
    }

    fn draw_text(&mut self, run: &TextRun, transform: &Mat3, paint: &CorePaint) {
        let Some(typeface) = self.typeface(&run.font_family) else {
            warn!(family = %run.font_family, "No typeface available, skipping text");
            return;
        };
        let font = Font::new(typeface, Some(run.size));
        let sk_paint = convert_paint(paint);
        let line_height = if run.line_height > 0.0 {
            run.line_height
        } else {
            run.size * 1.2
        };
        let tracking = run.tracking * run.size / 1000.0;

        if let Some((canvas, origin)) = self.target() {
            with_transform(canvas, origin, transform, |c| {
                for (row, line) in run.text.split(['\r', '\n']).enumerate() {
                    let y = row as f32 * line_height;
                    let advances: Vec<(String, f32)> = line
                        .chars()
                        .map(|ch| {
                            let glyph = ch.to_string();
                            let (width, _) = font.measure_str(&glyph, None);
                            (glyph, width + tracking)
                        })
                        .collect();
                    let width: f32 = advances.iter().map(|(_, w)| w).sum();
                    let mut x = match run.justify {
                        Justification::Left => 0.0,
                        Justification::Right => -width,
                        Justification::Center => -width / 2.0,
                    };
                    for (glyph, advance) in &advances {
                        if let Some(blob) = TextBlob::from_str(glyph, &font) {
                            c.draw_text_blob(&blob, (x, y), &sk_paint);
                        }
                        x += advance;
                    }
                }
            });
        }
    }

    fn push_clip(&mut self, rect: kurbo::Rect) {
        if let Some((canvas, origin)) = self.target() {
            canvas.save();
            canvas.clip_rect(offset_rect(rect, origin), ClipOp::Intersect, true);
        }
    }

    fn pop_clip(&mut self) {
        if let Some((canvas, _)) = self.target() {
            canvas.restore();
        }
    }

    fn push_layer(&mut self, bounds: kurbo::Rect) {
        let root = IRect::from_wh(self.surface.width(), self.surface.height());
        let device = to_skia_rect(bounds).round_out();
        let area = IRect::intersect(&device, &root).unwrap_or_else(|| IRect::from_xywh(0, 0, 1, 1));
        let size = (area.width().max(1), area.height().max(1));

        let surface = self.pool.take(size);
        if surface.is_none() {
            warn!(target: "skia", ?size, "Failed to allocate layer surface, dropping its content");
        }
        self.layers.push(OffscreenLayer {
            surface,
            origin: IPoint::new(area.left, area.top),
            size,
        });
    }

    fn pop_layer(&mut self, composite: &LayerComposite) {
        let Some(layer) = self.layers.pop() else {
            debug!(target: "skia", "pop_layer without matching push ignored");
            return;
        };
        let Some(mut surface) = layer.surface else {
            return;
        };

        let image = surface.image_snapshot();
        let mut paint = Paint::default();
        paint.set_alpha_f(sanitize(composite.alpha));
        paint.set_blend_mode(convert_blend_mode(composite.blend_mode));
        if let Some((canvas, origin)) = self.target() {
            let at = Point::new(
                (layer.origin.x - origin.x) as f32,
                (layer.origin.y - origin.y) as f32,
            );
            canvas.draw_image(&image, at, Some(&paint));
        }
        self.pool.give_back(layer.size, surface);
    }
}

/// Renders the player's current frame into a fresh `width` x `height`
/// surface and returns it PNG-encoded.
pub fn render_to_png(player: &LottiePlayer, width: i32, height: i32) -> Result<Vec<u8>, SkiaError> {
    let backend = SkiaBackend::new(width, height)?;
    let mut canvas = CompositingCanvas::new(backend, width as f32, height as f32);
    player.render(
        &mut canvas,
        kurbo::Rect::new(0.0, 0.0, width as f64, height as f64),
    );
    canvas.into_backend().encode_png()
}

fn convert_paint(core: &CorePaint) -> Paint {
    let mut paint = Paint::default();
    paint.set_anti_alias(true);

    match &core.source {
        PaintSource::Solid(color) => {
            paint.set_color(to_skia_color(*color));
        }
        PaintSource::Gradient {
            kind,
            start,
            end,
            stops,
        } => {
            let colors: Vec<Color> = stops.colors().iter().map(|c| to_skia_color(*c)).collect();
            let pos: Vec<f32> = stops.positions().iter().map(|&p| sanitize(p)).collect();
            let pt1 = Point::new(sanitize(start.x), sanitize(start.y));
            let pt2 = Point::new(sanitize(end.x), sanitize(end.y));
            let shader = match kind {
                GradientKind::Linear => gradient_shader::linear(
                    (pt1, pt2),
                    colors.as_slice(),
                    Some(pos.as_slice()),
                    TileMode::Clamp,
                    None,
                    None,
                ),
                GradientKind::Radial => gradient_shader::radial(
                    pt1,
                    Point::distance(pt1, pt2),
                    colors.as_slice(),
                    Some(pos.as_slice()),
                    TileMode::Clamp,
                    None,
                    None,
                ),
            };
            match shader {
                Some(shader) => {
                    paint.set_shader(shader);
                }
                None => {
                    debug!(target: "skia", stops = stops.len(), "Gradient has no shader, drawing transparent");
                    paint.set_color(Color::TRANSPARENT);
                }
            }
        }
    }
    // Multiplies into the colour's own alpha.
    paint.set_alpha_f(sanitize(paint.alpha_f() * core.alpha));

    let mut effect = core.trim.and_then(trim_effect);
    match &core.style {
        CorePaintStyle::Fill(_) => {
            paint.set_style(PaintStyle::Fill);
        }
        CorePaintStyle::Stroke(stroke) => {
            paint.set_style(PaintStyle::Stroke);
            paint.set_stroke_width(sanitize(stroke.width));
            paint.set_stroke_cap(convert_cap(stroke.cap));
            paint.set_stroke_join(convert_join(stroke.join));
            paint.set_stroke_miter(sanitize(stroke.miter_limit));
            if let Some(dash) = &stroke.dash {
                let array: Vec<f32> = dash.array.iter().map(|&v| sanitize(v)).collect();
                if let Some(dash_effect) = PathEffect::dash(&array, sanitize(dash.offset)) {
                    effect = Some(match effect {
                        Some(trim) => PathEffect::compose(dash_effect, trim),
                        None => dash_effect,
                    });
                }
            }
        }
    }
    if let Some(effect) = effect {
        paint.set_path_effect(effect);
    }
    paint
}

/// Trim with the offset applied. A window that wraps past the end of the
/// path is drawn as the inverse of the gap.
fn trim_effect(trim: Trim) -> Option<PathEffect> {
    let (lo, hi) = if trim.start <= trim.end {
        (trim.start, trim.end)
    } else {
        (trim.end, trim.start)
    };
    if hi - lo >= 1.0 {
        return None;
    }
    let start = (lo + trim.offset).rem_euclid(1.0);
    let end = (hi + trim.offset).rem_euclid(1.0);
    if start <= end {
        PathEffect::trim(start, end, trim_path_effect::Mode::Normal)
    } else {
        PathEffect::trim(end, start, trim_path_effect::Mode::Inverted)
    }
}

fn sanitize(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn to_matrix(m: &Mat3) -> Matrix {
    let c0 = m.x_axis;
    let c1 = m.y_axis;
    let c2 = m.z_axis;
    Matrix::new_all(
        sanitize(c0.x), sanitize(c1.x), sanitize(c2.x),
        sanitize(c0.y), sanitize(c1.y), sanitize(c2.y),
        0.0, 0.0, 1.0,
    )
}

fn to_skia_color(c: CoreColor) -> Color {
    Color::from_argb(c.a, c.r, c.g, c.b)
}

fn to_skia_rect(r: kurbo::Rect) -> Rect {
    Rect::new(r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32)
}

fn offset_rect(r: kurbo::Rect, origin: IPoint) -> Rect {
    to_skia_rect(r).with_offset((-origin.x as f32, -origin.y as f32))
}

fn kurbo_to_skia_path(bez_path: &BezPath) -> Path {
    let mut path = Path::new();
    for el in bez_path.elements() {
        match el {
            PathEl::MoveTo(p) => {
                path.move_to((sanitize(p.x as f32), sanitize(p.y as f32)));
            }
            PathEl::LineTo(p) => {
                path.line_to((sanitize(p.x as f32), sanitize(p.y as f32)));
            }
            PathEl::QuadTo(p1, p2) => {
                path.quad_to(
                    (sanitize(p1.x as f32), sanitize(p1.y as f32)),
                    (sanitize(p2.x as f32), sanitize(p2.y as f32)),
                );
            }
            PathEl::CurveTo(p1, p2, p3) => {
                path.cubic_to(
                    (sanitize(p1.x as f32), sanitize(p1.y as f32)),
                    (sanitize(p2.x as f32), sanitize(p2.y as f32)),
                    (sanitize(p3.x as f32), sanitize(p3.y as f32)),
                );
            }
            PathEl::ClosePath => {
                path.close();
            }
        }
    }
    path
}

fn convert_blend_mode(mode: CoreBlendMode) -> BlendMode {
    match mode {
        CoreBlendMode::Normal => BlendMode::SrcOver,
        CoreBlendMode::Multiply => BlendMode::Multiply,
        CoreBlendMode::Screen => BlendMode::Screen,
        CoreBlendMode::Overlay => BlendMode::Overlay,
        CoreBlendMode::Darken => BlendMode::Darken,
        CoreBlendMode::Lighten => BlendMode::Lighten,
        CoreBlendMode::ColorDodge => BlendMode::ColorDodge,
        CoreBlendMode::ColorBurn => BlendMode::ColorBurn,
        CoreBlendMode::HardLight => BlendMode::HardLight,
        CoreBlendMode::SoftLight => BlendMode::SoftLight,
        CoreBlendMode::Difference => BlendMode::Difference,
        CoreBlendMode::Exclusion => BlendMode::Exclusion,
        CoreBlendMode::Hue => BlendMode::Hue,
        CoreBlendMode::Saturation => BlendMode::Saturation,
        CoreBlendMode::Color => BlendMode::Color,
        CoreBlendMode::Luminosity => BlendMode::Luminosity,
        CoreBlendMode::DestinationIn => BlendMode::DstIn,
        CoreBlendMode::DestinationOut => BlendMode::DstOut,
    }
}

fn convert_fill_rule(rule: CoreFillRule) -> PathFillType {
    match rule {
        CoreFillRule::NonZero => PathFillType::Winding,
        CoreFillRule::EvenOdd => PathFillType::EvenOdd,
    }
}

fn convert_cap(cap: CoreLineCap) -> skia_safe::PaintCap {
    match cap {
        CoreLineCap::Butt => skia_safe::PaintCap::Butt,
        CoreLineCap::Round => skia_safe::PaintCap::Round,
        CoreLineCap::Square => skia_safe::PaintCap::Square,
    }
}

fn convert_join(join: CoreLineJoin) -> skia_safe::PaintJoin {
    match join {
        CoreLineJoin::Miter => skia_safe::PaintJoin::Miter,
        CoreLineJoin::Round => skia_safe::PaintJoin::Round,
        CoreLineJoin::Bevel => skia_safe::PaintJoin::Bevel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_wrapping_past_end_is_inverted() {
        assert!(trim_effect(Trim { start: 0.0, end: 1.0, offset: 0.3 }).is_none());
        assert!(trim_effect(Trim { start: 0.2, end: 0.6, offset: 0.0 }).is_some());
        assert!(trim_effect(Trim { start: 0.6, end: 0.9, offset: 0.3 }).is_some());
    }

    #[test]
    fn test_matrix_translation() {
        let m = Mat3::from_translation(glam::Vec2::new(7.0, -3.0));
        let p = to_matrix(&m).map_point((1.0, 1.0));
        assert_eq!((p.x, p.y), (8.0, -2.0));
    }

    #[test]
    fn test_layer_surfaces_are_pooled() {
        let mut backend = SkiaBackend::new(32, 32).unwrap();
        let bounds = kurbo::Rect::new(0.0, 0.0, 16.0, 16.0);
        backend.push_layer(bounds);
        backend.pop_layer(&LayerComposite::default());
        assert_eq!(backend.pooled_surfaces(), 1);

        backend.push_layer(bounds);
        assert_eq!(backend.pooled_surfaces(), 0);
        backend.pop_layer(&LayerComposite::default());
        assert_eq!(backend.pooled_surfaces(), 1);
    }
}
