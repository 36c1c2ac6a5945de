//! Draws one frame of a [`Composition`] through a [`CompositingCanvas`].

use crate::animatable::AnimatableValue;
use crate::assets::ImageAssetTable;
use crate::backend::{
    BlendMode, DashPattern, DrawBackend, FillRule, Justification, LayerComposite, LineCap,
    LineJoin, Paint, PaintSource, PaintStyle, StrokeStyle, TextRun, Trim,
};
use crate::canvas::{CompositingCanvas, SaveFlags};
use crate::color::Color;
use crate::composition::{
    Composition, DashItem, DashKind, EllipseItem, GradientItem, Layer, LayerKind, LayerList, Mask,
    MaskMode, PreComp, RectItem, ShapeGroup, ShapeItem,
};
use crate::error::Result;
use crate::keypath::ContentId;
use crate::overrides::Overrides;
use glam::Mat3;
use kurbo::{Affine, BezPath, Ellipse, Rect, Shape as _};
use lottie_data::model::TextDocument;
use tracing::{trace, warn};

/// Parent chains longer than this are treated as cyclic.
const MAX_PARENT_DEPTH: usize = 64;

const PATH_TOLERANCE: f64 = 0.1;

/// Per-pass inputs that live outside the composition.
pub struct RenderContext<'a> {
    pub images: &'a ImageAssetTable,
    pub overrides: &'a Overrides,
    /// Composite groups with partial opacity through an off-screen layer
    /// so overlapping children don't show through each other.
    pub isolate_group_opacity: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(images: &'a ImageAssetTable, overrides: &'a Overrides) -> Self {
        RenderContext {
            images,
            overrides,
            isolate_group_opacity: true,
        }
    }
}

/// Renders `composition` at `frame`, scaled into `dest` (device space).
///
/// Failing layers and shape items are logged and skipped. The canvas save
/// stack is left as it was found.
pub fn render_frame<B: DrawBackend>(
    canvas: &mut CompositingCanvas<B>,
    composition: &Composition,
    frame: f32,
    dest: Rect,
    ctx: &RenderContext<'_>,
) {
    trace!(frame, "Rendering frame");
    let count = canvas.save_count();
    canvas.save();
    canvas.translate(dest.x0 as f32, dest.y0 as f32);
    let (width, height) = (composition.width() as f32, composition.height() as f32);
    if width > 0.0 && height > 0.0 {
        canvas.scale(dest.width() as f32 / width, dest.height() as f32 / height);
    }

    if canvas.clip_rect(composition.bounds()) {
        let mut pass = FramePass {
            canvas: &mut *canvas,
            ctx,
            composition,
        };
        pass.layers(composition.layers(), frame);
    }
    canvas.restore_to_count(count);
}

struct FramePass<'p, 'c, B> {
    canvas: &'p mut CompositingCanvas<B>,
    ctx: &'p RenderContext<'c>,
    composition: &'p Composition,
}

enum Draw<'g> {
    Group(&'g ShapeGroup),
    Paint(&'g ShapeItem, BezPath),
}

impl<B: DrawBackend> FramePass<'_, '_, B> {
    fn layers(&mut self, list: &LayerList, frame: f32) {
        for layer in list.iter().rev() {
            if !layer.is_visible_at(frame) {
                continue;
            }
            let count = self.canvas.save_count();
            if let Err(err) = self.layer(list, layer, frame) {
                warn!(layer = layer.name.as_deref().unwrap_or(""), %err, "Failed to render layer, skipping");
            }
            self.canvas.restore_to_count(count);
        }
    }

    /// Layer-to-parent-space matrix including the parent chain, plus the
    /// layer's own opacity. Parent opacity is not inherited.
    fn layer_matrix(&self, list: &LayerList, layer: &Layer, frame: f32) -> Result<(Mat3, f32)> {
        let value = layer.transform.value_at(layer.local_frame(frame))?;
        let mut matrix = value.matrix();
        let mut current = layer;
        let mut depth = 0;
        while let Some(parent) = list.parent_of(current) {
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                warn!(layer = layer.name.as_deref().unwrap_or(""), "Parent chain is cyclic, truncating");
                break;
            }
            matrix = parent.transform.value_at(parent.local_frame(frame))?.matrix() * matrix;
            current = parent;
        }
        Ok((matrix, value.opacity))
    }

    fn layer(&mut self, list: &LayerList, layer: &Layer, frame: f32) -> Result<()> {
        let (matrix, mut opacity) = self.layer_matrix(list, layer, frame)?;
        if let Some(o) = self.ctx.overrides.opacity(layer.id) {
            opacity = o;
        }
        if opacity <= 0.0 {
            return Ok(());
        }

        let local = layer.local_frame(frame);
        self.canvas.save();
        self.canvas.concat(&matrix);

        let bounds = match &layer.kind {
            LayerKind::Solid { width, height, .. } | LayerKind::Image { width, height, .. } => {
                Rect::new(0.0, 0.0, *width as f64, *height as f64)
            }
            LayerKind::PreComp(pre) if pre.width > 0.0 && pre.height > 0.0 => {
                Rect::new(0.0, 0.0, pre.width as f64, pre.height as f64)
            }
            _ => self.canvas.local_clip_bounds(),
        };

        let isolate = (opacity < 1.0 && self.ctx.isolate_group_opacity)
            || layer.blend_mode != BlendMode::Normal
            || !layer.masks.is_empty();
        let alpha = if isolate {
            let composite = LayerComposite {
                blend_mode: layer.blend_mode,
                alpha: opacity,
            };
            self.canvas.save_layer(bounds, composite, SaveFlags::LAYER);
            1.0
        } else {
            opacity
        };

        match &layer.kind {
            LayerKind::Null => {}
            LayerKind::Solid { color, .. } => {
                let color = self.ctx.overrides.color(layer.id).unwrap_or(*color);
                let paint = Paint {
                    alpha,
                    ..Paint::fill(color)
                };
                self.canvas.draw_path(&bounds.to_path(PATH_TOLERANCE), &paint);
            }
            LayerKind::Image { ref_id, .. } => self.image(ref_id, alpha),
            LayerKind::PreComp(pre) => self.precomp(pre, bounds, local, alpha)?,
            LayerKind::Shape(root) => self.group(root, local, alpha, None)?,
            LayerKind::Text(document) => self.text(layer, document, local, alpha)?,
        }

        self.masks(&layer.masks, local, bounds)
    }

    fn image(&mut self, ref_id: &str, alpha: f32) {
        let composition = self.composition;
        let Some(asset) = composition.image_asset(ref_id) else {
            warn!(ref_id, "Image layer references an undeclared asset");
            return;
        };
        match self.ctx.images.image(asset) {
            Ok(Some(image)) => self.canvas.draw_image(&image, alpha),
            Ok(None) => {}
            Err(err) => warn!(ref_id, %err, "Image unavailable, skipping"),
        }
    }

    fn precomp(&mut self, pre: &PreComp, bounds: Rect, local: f32, alpha: f32) -> Result<()> {
        if pre.width > 0.0 && pre.height > 0.0 && !self.canvas.clip_rect(bounds) {
            return Ok(());
        }
        let child_frame = match &pre.time_remap {
            Some(tm) => tm.value_at(local)? * self.composition.frame_rate(),
            None => local,
        };
        if alpha < 1.0 {
            let composite = LayerComposite {
                blend_mode: BlendMode::Normal,
                alpha,
            };
            self.canvas.save_layer(bounds, composite, SaveFlags::LAYER);
        }
        self.layers(&pre.layers, child_frame);
        Ok(())
    }

    fn text(
        &mut self,
        layer: &Layer,
        document: &AnimatableValue<TextDocument>,
        frame: f32,
        alpha: f32,
    ) -> Result<()> {
        let doc = document.value_at(frame)?;
        let run = TextRun {
            text: doc.t,
            font_family: doc.f,
            size: doc.s,
            justify: Justification::from_lottie(doc.j),
            tracking: doc.tr,
            line_height: doc.lh,
        };

        let fill = self
            .ctx
            .overrides
            .color(layer.id)
            .unwrap_or_else(|| Color::from_floats(&doc.fc));
        let paint = Paint {
            alpha,
            ..Paint::fill(fill)
        };
        self.canvas.draw_text(&run, &paint);

        if let Some(stroke) = &doc.sc {
            let paint = Paint {
                source: PaintSource::Solid(Color::from_floats(stroke)),
                style: PaintStyle::Stroke(StrokeStyle {
                    width: doc.sw.unwrap_or(1.0),
                    cap: LineCap::Round,
                    join: LineJoin::Round,
                    miter_limit: 4.0,
                    dash: None,
                }),
                alpha,
                trim: None,
            };
            self.canvas.draw_text(&run, &paint);
        }
        Ok(())
    }

    /// Add masks are unioned into one destination-in layer, subtract and
    /// intersect masks each get their own pass.
    fn masks(&mut self, masks: &[Mask], frame: f32, bounds: Rect) -> Result<()> {
        let mut adds = masks.iter().filter(|m| m.mode == MaskMode::Add).peekable();
        if adds.peek().is_some() {
            let composite = LayerComposite {
                blend_mode: BlendMode::DestinationIn,
                alpha: 1.0,
            };
            self.canvas.save_layer(bounds, composite, SaveFlags::LAYER);
            for mask in adds {
                self.mask_path(mask, frame, bounds)?;
            }
            self.canvas.restore();
        }

        for mask in masks {
            let blend_mode = match mask.mode {
                MaskMode::Subtract => BlendMode::DestinationOut,
                MaskMode::Intersect => BlendMode::DestinationIn,
                MaskMode::Add | MaskMode::None => continue,
            };
            let composite = LayerComposite {
                blend_mode,
                alpha: 1.0,
            };
            self.canvas.save_layer(bounds, composite, SaveFlags::LAYER);
            self.mask_path(mask, frame, bounds)?;
            self.canvas.restore();
        }
        Ok(())
    }

    fn mask_path(&mut self, mask: &Mask, frame: f32, bounds: Rect) -> Result<()> {
        let outline = mask.path.value_at(frame)?.to_bez_path();
        let opacity = (mask.opacity.value_at(frame)? / 100.0).clamp(0.0, 1.0);
        let mut paint = Paint {
            alpha: opacity,
            ..Paint::fill(Color::BLACK)
        };
        let path = if mask.inverted {
            paint.style = PaintStyle::Fill(FillRule::EvenOdd);
            let mut path = bounds.to_path(PATH_TOLERANCE);
            append(&mut path, &outline);
            path
        } else {
            outline
        };
        self.canvas.draw_path(&path, &paint);
        Ok(())
    }

    fn group(&mut self, group: &ShapeGroup, frame: f32, alpha: f32, trim: Option<Trim>) -> Result<()> {
        if group.hidden {
            return Ok(());
        }
        let (matrix, mut opacity) = match &group.transform {
            Some(t) => {
                let value = t.value_at(frame)?;
                (value.matrix(), value.opacity)
            }
            None => (Mat3::IDENTITY, 1.0),
        };
        if let Some(o) = self.ctx.overrides.opacity(group.id) {
            opacity = o;
        }
        if opacity <= 0.0 {
            return Ok(());
        }
        let trim = group_trim(group, frame)?.or(trim);

        let count = self.canvas.save_count();
        self.canvas.save();
        self.canvas.concat(&matrix);
        let alpha = if self.ctx.isolate_group_opacity && opacity < 1.0 && paint_count(group) > 1 {
            let bounds = self.canvas.local_clip_bounds();
            let composite = LayerComposite {
                blend_mode: BlendMode::Normal,
                alpha: opacity,
            };
            self.canvas.save_layer(bounds, composite, SaveFlags::LAYER);
            alpha
        } else {
            alpha * opacity
        };

        self.group_contents(group, frame, alpha, trim);
        self.canvas.restore_to_count(count);
        Ok(())
    }

    /// Paints apply to the geometry listed before them. Items later in the
    /// list are drawn first.
    fn group_contents(&mut self, group: &ShapeGroup, frame: f32, alpha: f32, trim: Option<Trim>) {
        let mut geometry = BezPath::new();
        let mut draws = Vec::new();
        for item in &group.items {
            match item {
                ShapeItem::Group(child) => {
                    match group_geometry(child, frame) {
                        Ok(path) => append(&mut geometry, &path),
                        Err(err) => warn!(group = child.name.as_deref().unwrap_or(""), %err, "Skipping group geometry"),
                    }
                    draws.push(Draw::Group(child));
                }
                ShapeItem::Fill(_)
                | ShapeItem::Stroke(_)
                | ShapeItem::GradientFill(_)
                | ShapeItem::GradientStroke(_) => draws.push(Draw::Paint(item, geometry.clone())),
                other => match item_geometry(other, frame) {
                    Ok(Some(path)) => append(&mut geometry, &path),
                    Ok(None) => {}
                    Err(err) => warn!(item = other.name().unwrap_or(""), %err, "Skipping shape geometry"),
                },
            }
        }

        for draw in draws.into_iter().rev() {
            let result = match draw {
                Draw::Group(child) => self.group(child, frame, alpha, trim),
                Draw::Paint(item, path) => self.paint(item, frame, alpha, trim).map(|paint| {
                    if let Some(paint) = paint {
                        self.canvas.draw_path(&path, &paint);
                    }
                }),
            };
            if let Err(err) = result {
                warn!(%err, "Skipping shape content");
            }
        }
    }

    fn paint(&self, item: &ShapeItem, frame: f32, alpha: f32, trim: Option<Trim>) -> Result<Option<Paint>> {
        let overrides = self.ctx.overrides;
        let opacity = |id: ContentId, value: &AnimatableValue<f32>| -> Result<f32> {
            let o = match overrides.opacity(id) {
                Some(o) => o,
                None => value.value_at(frame)? / 100.0,
            };
            Ok(o.clamp(0.0, 1.0))
        };

        let paint = match item {
            ShapeItem::Fill(f) => Paint {
                source: PaintSource::Solid(match overrides.color(f.id) {
                    Some(c) => c,
                    None => f.color.value_at(frame)?,
                }),
                style: PaintStyle::Fill(f.fill_rule),
                alpha: alpha * opacity(f.id, &f.opacity)?,
                trim,
            },
            ShapeItem::Stroke(s) => Paint {
                source: PaintSource::Solid(match overrides.color(s.id) {
                    Some(c) => c,
                    None => s.color.value_at(frame)?,
                }),
                style: PaintStyle::Stroke(StrokeStyle {
                    width: match overrides.stroke_width(s.id) {
                        Some(w) => w,
                        None => s.width.value_at(frame)?,
                    },
                    cap: s.cap,
                    join: s.join,
                    miter_limit: s.miter_limit,
                    dash: resolve_dash(&s.dashes, frame)?,
                }),
                alpha: alpha * opacity(s.id, &s.opacity)?,
                trim,
            },
            ShapeItem::GradientFill(g) => Paint {
                source: gradient_source(g, frame)?,
                style: PaintStyle::Fill(g.fill_rule),
                alpha: alpha * opacity(g.id, &g.opacity)?,
                trim,
            },
            ShapeItem::GradientStroke(gs) => Paint {
                source: gradient_source(&gs.gradient, frame)?,
                style: PaintStyle::Stroke(StrokeStyle {
                    width: match overrides.stroke_width(gs.gradient.id) {
                        Some(w) => w,
                        None => gs.width.value_at(frame)?,
                    },
                    cap: gs.cap,
                    join: gs.join,
                    miter_limit: gs.miter_limit,
                    dash: None,
                }),
                alpha: alpha * opacity(gs.gradient.id, &gs.gradient.opacity)?,
                trim,
            },
            _ => return Ok(None),
        };

        let visible = paint.alpha > 0.0
            && !matches!(&paint.source, PaintSource::Gradient { stops, .. } if stops.is_empty())
            && match &paint.style {
                PaintStyle::Stroke(stroke) => stroke.width > 0.0,
                PaintStyle::Fill(_) => true,
            };
        Ok(visible.then_some(paint))
    }
}

fn paint_count(group: &ShapeGroup) -> usize {
    group
        .items
        .iter()
        .map(|item| match item {
            ShapeItem::Group(child) => paint_count(child),
            ShapeItem::Fill(_)
            | ShapeItem::Stroke(_)
            | ShapeItem::GradientFill(_)
            | ShapeItem::GradientStroke(_) => 1,
            _ => 0,
        })
        .sum()
}

/// Trim path of this group, as fractions of the path length.
fn group_trim(group: &ShapeGroup, frame: f32) -> Result<Option<Trim>> {
    let Some(trim) = group.items.iter().find_map(|item| match item {
        ShapeItem::Trim(t) => Some(t),
        _ => None,
    }) else {
        return Ok(None);
    };
    Ok(Some(Trim {
        start: trim.start.value_at(frame)? / 100.0,
        end: trim.end.value_at(frame)? / 100.0,
        offset: trim.offset.value_at(frame)? / 360.0,
    }))
}

/// Combined geometry of a nested group in its parent's space.
fn group_geometry(group: &ShapeGroup, frame: f32) -> Result<BezPath> {
    let mut path = BezPath::new();
    if group.hidden {
        return Ok(path);
    }
    for item in &group.items {
        let geometry = match item {
            ShapeItem::Group(child) => Some(group_geometry(child, frame)?),
            other => item_geometry(other, frame)?,
        };
        if let Some(geometry) = geometry {
            append(&mut path, &geometry);
        }
    }
    if let Some(transform) = &group.transform {
        path.apply_affine(to_affine(&transform.value_at(frame)?.matrix()));
    }
    Ok(path)
}

fn append(dst: &mut BezPath, src: &BezPath) {
    dst.extend(src.elements().iter().copied());
}

fn item_geometry(item: &ShapeItem, frame: f32) -> Result<Option<BezPath>> {
    Ok(match item {
        ShapeItem::Path(p) => Some(p.outline.value_at(frame)?.to_bez_path()),
        ShapeItem::Rect(r) => Some(rect_path(r, frame)?),
        ShapeItem::Ellipse(e) => Some(ellipse_path(e, frame)?),
        _ => None,
    })
}

fn rect_path(rect: &RectItem, frame: f32) -> Result<BezPath> {
    let size = rect.size.value_at(frame)?;
    let pos = rect.position.value_at(frame)?;
    let radius = rect.roundness.value_at(frame)?;
    let half = size / 2.0;
    let bounds = Rect::new(
        (pos.x - half.x) as f64,
        (pos.y - half.y) as f64,
        (pos.x + half.x) as f64,
        (pos.y + half.y) as f64,
    );
    Ok(if radius > 0.0 {
        bounds.to_rounded_rect(radius as f64).to_path(PATH_TOLERANCE)
    } else {
        bounds.to_path(PATH_TOLERANCE)
    })
}

fn ellipse_path(ellipse: &EllipseItem, frame: f32) -> Result<BezPath> {
    let size = ellipse.size.value_at(frame)?;
    let pos = ellipse.position.value_at(frame)?;
    let half = size / 2.0;
    let shape = Ellipse::new(
        (pos.x as f64, pos.y as f64),
        (half.x as f64, half.y as f64),
        0.0,
    );
    Ok(shape.to_path(PATH_TOLERANCE))
}

fn gradient_source(gradient: &GradientItem, frame: f32) -> Result<PaintSource> {
    Ok(PaintSource::Gradient {
        kind: gradient.kind,
        start: gradient.start.value_at(frame)?,
        end: gradient.end.value_at(frame)?,
        stops: gradient.colors.value_at(frame)?,
    })
}

/// Dash lengths padded to an even count, with the offset wrapped into one
/// period.
fn resolve_dash(dashes: &[DashItem], frame: f32) -> Result<Option<DashPattern>> {
    let mut array = Vec::new();
    let mut offset = 0.0;
    for dash in dashes {
        let value = dash.value.value_at(frame)?;
        match dash.kind {
            DashKind::Offset => offset = value,
            DashKind::Dash | DashKind::Gap => array.push(value),
        }
    }
    if array.is_empty() {
        return Ok(None);
    }
    if array.len() % 2 != 0 {
        array.extend_from_within(..);
    }
    let total: f32 = array.iter().sum();
    let offset = if total > 0.0 { offset.rem_euclid(total) } else { 0.0 };
    Ok(Some(DashPattern { array, offset }))
}

pub(crate) fn to_affine(m: &Mat3) -> Affine {
    let m = m.to_cols_array();
    Affine::new([
        m[0] as f64,
        m[1] as f64,
        m[3] as f64,
        m[4] as f64,
        m[6] as f64,
        m[7] as f64,
    ])
}
