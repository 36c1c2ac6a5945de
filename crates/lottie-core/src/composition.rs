//! Compiled scene graph of one animation document.
//!
//! [`Composition::from_json`] turns the serde model into typed
//! [`AnimatableValue`]s once. The result is immutable and can be shared
//! between threads; each rendering pass evaluates it with its own
//! evaluators.

use crate::animatable::AnimatableValue;
use crate::assets::ImageAsset;
use crate::backend::{BlendMode, FillRule, GradientKind, LineCap, LineJoin};
use crate::color::Color;
use crate::error::Result;
use crate::gradient::GradientColor;
use crate::keypath::{self, ContentId, KeyPath, KeyPathElement, NodeName};
use crate::property::{AnimatableProperty, AnimatableTransform};
use crate::shape::ShapeOutline;
use glam::Vec2;
use kurbo::Rect;
use lottie_data::model::{self as data, LottieJson, TextDocument};
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, warn};

/// Immutable, compiled animation.
#[derive(Debug)]
pub struct Composition {
    name: Option<String>,
    width: u32,
    height: u32,
    start_frame: f32,
    end_frame: f32,
    frame_rate: f32,
    layers: LayerList,
    images: HashMap<String, ImageAsset>,
    root_id: ContentId,
}

impl Composition {
    pub fn from_json(model: LottieJson) -> Self {
        let mut compiler = Compiler::new(&model.assets);
        let root_id = compiler.next_id();
        let layers = compiler.layers(&model.layers);

        let images = model
            .assets
            .iter()
            .filter(|a| a.layers.is_none())
            .filter_map(|a| {
                let file_name = a.p.clone()?;
                Some((
                    a.id.clone(),
                    ImageAsset {
                        id: a.id.clone(),
                        width: a.w.unwrap_or(0),
                        height: a.h.unwrap_or(0),
                        directory: a.u.clone().unwrap_or_default(),
                        file_name,
                    },
                ))
            })
            .collect();

        debug!(
            name = model.nm.as_deref().unwrap_or(""),
            layers = layers.len(),
            nodes = compiler.next,
            "Compiled composition"
        );

        Composition {
            name: model.nm,
            width: model.w,
            height: model.h,
            start_frame: model.ip,
            end_frame: model.op,
            frame_rate: model.fr,
            layers,
            images,
            root_id,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: LottieJson = serde_json::from_str(json)?;
        Ok(Self::from_json(model))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let model: LottieJson = serde_json::from_reader(reader)?;
        Ok(Self::from_json(model))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    pub fn start_frame(&self) -> f32 {
        self.start_frame
    }

    pub fn end_frame(&self) -> f32 {
        self.end_frame
    }

    /// Last frame that still draws layers ending at the out point. Out
    /// points are exclusive.
    pub fn last_frame(&self) -> f32 {
        (self.end_frame - 1.0).max(self.start_frame)
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn duration_frames(&self) -> f32 {
        (self.end_frame - self.start_frame).max(0.0)
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.frame_rate > 0.0 {
            self.duration_frames() / self.frame_rate
        } else {
            0.0
        }
    }

    pub fn layers(&self) -> &LayerList {
        &self.layers
    }

    pub fn image_asset(&self, id: &str) -> Option<&ImageAsset> {
        self.images.get(id)
    }

    pub fn image_assets(&self) -> impl Iterator<Item = &ImageAsset> {
        self.images.values()
    }

    /// Concrete key paths of every node `search` fully resolves to, each
    /// carrying its target.
    pub fn resolve_key_path(&self, search: &KeyPath) -> Vec<KeyPath> {
        let mut acc = Vec::new();
        keypath::resolve_key_path(self, search, 0, &KeyPath::default(), &mut acc);
        acc
    }

    /// Looks a content node up by id.
    pub fn content(&self, id: ContentId) -> Option<ContentRef<'_>> {
        fn in_items(items: &[ShapeItem], id: ContentId) -> Option<ContentRef<'_>> {
            items.iter().find_map(|item| match item {
                ShapeItem::Group(g) if g.id == id => Some(ContentRef::Group(g)),
                ShapeItem::Group(g) => in_items(&g.items, id),
                other if other.id() == id => Some(ContentRef::Item(other)),
                _ => None,
            })
        }

        fn in_layers(layers: &LayerList, id: ContentId) -> Option<ContentRef<'_>> {
            layers.iter().find_map(|layer| {
                if layer.id == id {
                    return Some(ContentRef::Layer(layer));
                }
                match &layer.kind {
                    LayerKind::Shape(root) if root.id == id => Some(ContentRef::Group(root)),
                    LayerKind::Shape(root) => in_items(&root.items, id),
                    LayerKind::PreComp(pre) => in_layers(&pre.layers, id),
                    _ => None,
                }
            })
        }

        in_layers(&self.layers, id)
    }
}

impl KeyPathElement for Composition {
    fn key_path_name(&self) -> NodeName<'_> {
        NodeName::Container
    }

    fn content_id(&self) -> ContentId {
        self.root_id
    }

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
        self.layers.key_path_children()
    }
}

/// Borrowed handle to any addressable node.
#[derive(Clone, Copy, Debug)]
pub enum ContentRef<'a> {
    Layer(&'a Layer),
    Group(&'a ShapeGroup),
    Item(&'a ShapeItem),
}

impl<'a> ContentRef<'a> {
    pub fn name(&self) -> Option<&'a str> {
        match *self {
            ContentRef::Layer(l) => l.name.as_deref(),
            ContentRef::Group(g) => g.name.as_deref(),
            ContentRef::Item(i) => i.name(),
        }
    }

    pub fn properties(&self) -> Vec<(&'static str, AnimatableProperty<'a>)> {
        match *self {
            ContentRef::Layer(l) => l.properties(),
            ContentRef::Group(g) => g.properties(),
            ContentRef::Item(i) => i.properties(),
        }
    }
}

/// Layers in document order (topmost first), indexed by their `ind`.
#[derive(Debug, Default)]
pub struct LayerList {
    layers: Vec<Layer>,
    by_index: HashMap<u32, usize>,
}

impl LayerList {
    fn new(layers: Vec<Layer>) -> Self {
        let by_index = layers
            .iter()
            .enumerate()
            .filter_map(|(pos, layer)| layer.index.map(|ind| (ind, pos)))
            .collect();
        LayerList { layers, by_index }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn by_index(&self, index: u32) -> Option<&Layer> {
        self.by_index.get(&index).map(|&pos| &self.layers[pos])
    }

    pub fn parent_of(&self, layer: &Layer) -> Option<&Layer> {
        layer.parent.and_then(|ind| self.by_index(ind))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name.as_deref() == Some(name))
    }

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
        self.layers.iter().map(|l| l as &dyn KeyPathElement).collect()
    }
}

impl<'a> IntoIterator for &'a LayerList {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[derive(Debug)]
pub struct Layer {
    pub id: ContentId,
    pub name: Option<String>,
    pub index: Option<u32>,
    pub parent: Option<u32>,
    pub in_point: f32,
    pub out_point: f32,
    pub start_time: f32,
    pub transform: AnimatableTransform,
    pub blend_mode: BlendMode,
    pub hidden: bool,
    pub masks: Vec<Mask>,
    pub kind: LayerKind,
}

impl Layer {
    pub fn is_visible_at(&self, frame: f32) -> bool {
        !self.hidden && frame >= self.in_point && frame < self.out_point
    }

    /// Maps a composition frame into this layer's own time.
    pub fn local_frame(&self, frame: f32) -> f32 {
        frame - self.start_time
    }

    pub fn properties(&self) -> Vec<(&'static str, AnimatableProperty<'_>)> {
        let mut props = vec![("transform", AnimatableProperty::Transform(&self.transform))];
        for mask in &self.masks {
            props.push(("mask path", AnimatableProperty::Shape(&mask.path)));
            props.push(("mask opacity", AnimatableProperty::Scalar(&mask.opacity)));
        }
        if let LayerKind::PreComp(PreComp {
            time_remap: Some(tm),
            ..
        }) = &self.kind
        {
            props.push(("time remap", AnimatableProperty::Scalar(tm)));
        }
        props
    }
}

impl KeyPathElement for Layer {
    fn key_path_name(&self) -> NodeName<'_> {
        NodeName::Named(self.name.as_deref().unwrap_or_default())
    }

    fn content_id(&self) -> ContentId {
        self.id
    }

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
        match &self.kind {
            LayerKind::Shape(root) => vec![root as &dyn KeyPathElement],
            LayerKind::PreComp(pre) => pre.layers.key_path_children(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum LayerKind {
    Null,
    Solid {
        color: Color,
        width: f32,
        height: f32,
    },
    Image {
        ref_id: String,
        width: f32,
        height: f32,
    },
    PreComp(PreComp),
    /// Shape contents wrapped in a synthetic container group.
    Shape(ShapeGroup),
    Text(AnimatableValue<TextDocument>),
}

#[derive(Debug)]
pub struct PreComp {
    pub ref_id: String,
    pub width: f32,
    pub height: f32,
    pub layers: LayerList,
    /// Seconds into the precomposition, when remapped.
    pub time_remap: Option<AnimatableValue<f32>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskMode {
    Add,
    Subtract,
    Intersect,
    None,
}

impl MaskMode {
    fn from_lottie(mode: Option<&str>) -> Self {
        match mode {
            Some("a") | None => MaskMode::Add,
            Some("s") => MaskMode::Subtract,
            Some("i") => MaskMode::Intersect,
            Some("n") => MaskMode::None,
            Some(other) => {
                warn!(mode = other, "Unsupported mask mode, treating as add");
                MaskMode::Add
            }
        }
    }
}

#[derive(Debug)]
pub struct Mask {
    pub name: Option<String>,
    pub mode: MaskMode,
    pub path: AnimatableValue<ShapeOutline>,
    /// Percent.
    pub opacity: AnimatableValue<f32>,
    pub inverted: bool,
}

/// A group of shape items with an optional transform.
#[derive(Debug)]
pub struct ShapeGroup {
    pub id: ContentId,
    pub name: Option<String>,
    /// Synthetic wrapper around a shape layer's contents.
    pub container: bool,
    pub hidden: bool,
    pub transform: Option<AnimatableTransform>,
    pub items: Vec<ShapeItem>,
}

impl ShapeGroup {
    pub fn properties(&self) -> Vec<(&'static str, AnimatableProperty<'_>)> {
        self.transform
            .iter()
            .map(|t| ("transform", AnimatableProperty::Transform(t)))
            .collect()
    }
}

impl KeyPathElement for ShapeGroup {
    fn key_path_name(&self) -> NodeName<'_> {
        if self.container {
            NodeName::Container
        } else {
            NodeName::Named(self.name.as_deref().unwrap_or_default())
        }
    }

    fn content_id(&self) -> ContentId {
        self.id
    }

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
        self.items.iter().map(|i| i as &dyn KeyPathElement).collect()
    }
}

#[derive(Debug)]
pub enum ShapeItem {
    Group(ShapeGroup),
    Path(PathItem),
    Rect(RectItem),
    Ellipse(EllipseItem),
    Fill(FillItem),
    Stroke(StrokeItem),
    GradientFill(GradientItem),
    GradientStroke(GradientStrokeItem),
    Trim(TrimItem),
}

impl ShapeItem {
    pub fn id(&self) -> ContentId {
        match self {
            ShapeItem::Group(g) => g.id,
            ShapeItem::Path(p) => p.id,
            ShapeItem::Rect(r) => r.id,
            ShapeItem::Ellipse(e) => e.id,
            ShapeItem::Fill(f) => f.id,
            ShapeItem::Stroke(s) => s.id,
            ShapeItem::GradientFill(g) => g.id,
            ShapeItem::GradientStroke(g) => g.gradient.id,
            ShapeItem::Trim(t) => t.id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ShapeItem::Group(g) => g.name.as_deref(),
            ShapeItem::Path(p) => p.name.as_deref(),
            ShapeItem::Rect(r) => r.name.as_deref(),
            ShapeItem::Ellipse(e) => e.name.as_deref(),
            ShapeItem::Fill(f) => f.name.as_deref(),
            ShapeItem::Stroke(s) => s.name.as_deref(),
            ShapeItem::GradientFill(g) => g.name.as_deref(),
            ShapeItem::GradientStroke(g) => g.gradient.name.as_deref(),
            ShapeItem::Trim(t) => t.name.as_deref(),
        }
    }

    pub fn properties(&self) -> Vec<(&'static str, AnimatableProperty<'_>)> {
        use AnimatableProperty as P;
        match self {
            ShapeItem::Group(g) => g.properties(),
            ShapeItem::Path(p) => vec![("path", P::Shape(&p.outline))],
            ShapeItem::Rect(r) => vec![
                ("size", P::Point(&r.size)),
                ("position", P::Point(&r.position)),
                ("roundness", P::Scalar(&r.roundness)),
            ],
            ShapeItem::Ellipse(e) => vec![("size", P::Point(&e.size)), ("position", P::Point(&e.position))],
            ShapeItem::Fill(f) => vec![("color", P::Color(&f.color)), ("opacity", P::Scalar(&f.opacity))],
            ShapeItem::Stroke(s) => {
                let mut props = vec![
                    ("color", P::Color(&s.color)),
                    ("opacity", P::Scalar(&s.opacity)),
                    ("stroke width", P::Scalar(&s.width)),
                ];
                props.extend(s.dashes.iter().map(|d| ("dash", P::Scalar(&d.value))));
                props
            }
            ShapeItem::GradientFill(g) => g.properties(),
            ShapeItem::GradientStroke(g) => {
                let mut props = g.gradient.properties();
                props.push(("stroke width", P::Scalar(&g.width)));
                props
            }
            ShapeItem::Trim(t) => vec![
                ("trim start", P::Scalar(&t.start)),
                ("trim end", P::Scalar(&t.end)),
                ("trim offset", P::Scalar(&t.offset)),
            ],
        }
    }
}

impl KeyPathElement for ShapeItem {
    fn key_path_name(&self) -> NodeName<'_> {
        match self {
            ShapeItem::Group(g) => g.key_path_name(),
            other => NodeName::Named(other.name().unwrap_or_default()),
        }
    }

    fn content_id(&self) -> ContentId {
        self.id()
    }

    fn key_path_children(&self) -> Vec<&dyn KeyPathElement> {
        match self {
            ShapeItem::Group(g) => g.key_path_children(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct PathItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub outline: AnimatableValue<ShapeOutline>,
}

#[derive(Debug)]
pub struct RectItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub size: AnimatableValue<Vec2>,
    /// Centre of the rectangle.
    pub position: AnimatableValue<Vec2>,
    pub roundness: AnimatableValue<f32>,
}

#[derive(Debug)]
pub struct EllipseItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub size: AnimatableValue<Vec2>,
    pub position: AnimatableValue<Vec2>,
}

#[derive(Debug)]
pub struct FillItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub color: AnimatableValue<Color>,
    /// Percent.
    pub opacity: AnimatableValue<f32>,
    pub fill_rule: FillRule,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DashKind {
    Dash,
    Gap,
    Offset,
}

#[derive(Debug)]
pub struct DashItem {
    pub kind: DashKind,
    pub value: AnimatableValue<f32>,
}

#[derive(Debug)]
pub struct StrokeItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub color: AnimatableValue<Color>,
    pub opacity: AnimatableValue<f32>,
    pub width: AnimatableValue<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub dashes: Vec<DashItem>,
}

#[derive(Debug)]
pub struct GradientItem {
    pub id: ContentId,
    pub name: Option<String>,
    pub kind: GradientKind,
    pub opacity: AnimatableValue<f32>,
    pub start: AnimatableValue<Vec2>,
    pub end: AnimatableValue<Vec2>,
    pub colors: AnimatableValue<GradientColor>,
    pub fill_rule: FillRule,
}

impl GradientItem {
    fn properties(&self) -> Vec<(&'static str, AnimatableProperty<'_>)> {
        vec![
            ("opacity", AnimatableProperty::Scalar(&self.opacity)),
            ("start point", AnimatableProperty::Point(&self.start)),
            ("end point", AnimatableProperty::Point(&self.end)),
            ("gradient", AnimatableProperty::Gradient(&self.colors)),
        ]
    }
}

#[derive(Debug)]
pub struct GradientStrokeItem {
    pub gradient: GradientItem,
    pub width: AnimatableValue<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

#[derive(Debug)]
pub struct TrimItem {
    pub id: ContentId,
    pub name: Option<String>,
    /// Percent.
    pub start: AnimatableValue<f32>,
    /// Percent.
    pub end: AnimatableValue<f32>,
    /// Degrees.
    pub offset: AnimatableValue<f32>,
}

const DEFAULT_MITER_LIMIT: f32 = 4.0;

struct Compiler<'a> {
    assets: HashMap<&'a str, &'a data::Asset>,
    next: u32,
    /// Precompositions being compiled, to break reference cycles.
    precomps: Vec<&'a str>,
}

impl<'a> Compiler<'a> {
    fn new(assets: &'a [data::Asset]) -> Self {
        Compiler {
            assets: assets.iter().map(|a| (a.id.as_str(), a)).collect(),
            next: 0,
            precomps: Vec::new(),
        }
    }

    fn next_id(&mut self) -> ContentId {
        let id = ContentId(self.next);
        self.next += 1;
        id
    }

    fn layers(&mut self, layers: &'a [data::Layer]) -> LayerList {
        LayerList::new(layers.iter().map(|l| self.layer(l)).collect())
    }

    fn layer(&mut self, layer: &'a data::Layer) -> Layer {
        let id = self.next_id();
        let masks = layer
            .masks_properties
            .iter()
            .flatten()
            .map(|m| Mask {
                name: m.nm.clone(),
                mode: MaskMode::from_lottie(m.mode.as_deref()),
                path: AnimatableValue::from_property(
                    &m.pt,
                    ShapeOutline::from_bezier_path,
                    ShapeOutline::default(),
                ),
                opacity: AnimatableValue::from_property(&m.o, |v| *v, 100.0),
                inverted: m.inv,
            })
            .collect();

        Layer {
            id,
            name: layer.nm.clone(),
            index: layer.ind,
            parent: layer.parent,
            in_point: layer.ip,
            out_point: layer.op,
            start_time: layer.st,
            transform: AnimatableTransform::from_lottie(&layer.ks),
            blend_mode: layer.bm.map(BlendMode::from_lottie).unwrap_or_default(),
            hidden: layer.hd.unwrap_or(false),
            masks,
            kind: self.layer_kind(layer),
        }
    }

    fn layer_kind(&mut self, layer: &'a data::Layer) -> LayerKind {
        match layer.ty {
            0 => self.precomp(layer),
            1 => LayerKind::Solid {
                color: layer
                    .color
                    .as_deref()
                    .and_then(Color::from_hex)
                    .unwrap_or(Color::BLACK),
                width: layer.sw.unwrap_or(0) as f32,
                height: layer.sh.unwrap_or(0) as f32,
            },
            2 => {
                let ref_id = layer.ref_id.clone().unwrap_or_default();
                let asset = self.assets.get(ref_id.as_str()).copied();
                LayerKind::Image {
                    width: asset.and_then(|a| a.w).unwrap_or(0) as f32,
                    height: asset.and_then(|a| a.h).unwrap_or(0) as f32,
                    ref_id,
                }
            }
            3 => LayerKind::Null,
            4 => {
                let id = self.next_id();
                let (items, _) = self.shapes(layer.shapes.as_deref().unwrap_or_default());
                LayerKind::Shape(ShapeGroup {
                    id,
                    name: None,
                    container: true,
                    hidden: false,
                    transform: None,
                    items,
                })
            }
            5 => match &layer.t {
                Some(text) => LayerKind::Text(AnimatableValue::from_property(
                    &text.d,
                    TextDocument::clone,
                    TextDocument::default(),
                )),
                None => LayerKind::Null,
            },
            other => {
                warn!(ty = other, name = layer.nm.as_deref(), "Unsupported layer type, drawing nothing");
                LayerKind::Null
            }
        }
    }

    fn precomp(&mut self, layer: &'a data::Layer) -> LayerKind {
        let ref_id = layer.ref_id.as_deref().unwrap_or_default();
        let time_remap = layer
            .tm
            .as_ref()
            .map(|tm| AnimatableValue::from_property(tm, |v| *v, 0.0));
        let child_layers = self
            .assets
            .get(ref_id)
            .copied()
            .and_then(|a| a.layers.as_deref());

        let layers = match child_layers {
            None => {
                warn!(ref_id, "Precomposition asset not found");
                LayerList::default()
            }
            Some(_) if self.precomps.contains(&ref_id) => {
                warn!(ref_id, "Precomposition references itself, skipping");
                LayerList::default()
            }
            Some(children) => {
                self.precomps.push(ref_id);
                let list = self.layers(children);
                self.precomps.pop();
                list
            }
        };

        LayerKind::PreComp(PreComp {
            ref_id: ref_id.to_string(),
            width: layer.w.unwrap_or(0) as f32,
            height: layer.h.unwrap_or(0) as f32,
            layers,
            time_remap,
        })
    }

    fn shapes(&mut self, shapes: &'a [data::Shape]) -> (Vec<ShapeItem>, Option<AnimatableTransform>) {
        let mut items = Vec::with_capacity(shapes.len());
        let mut transform = None;
        for shape in shapes {
            match shape {
                data::Shape::Transform(tr) => transform = Some(AnimatableTransform::from_lottie(&tr.t)),
                data::Shape::Unknown => debug!("Skipping unsupported shape item"),
                other => items.push(self.shape_item(other)),
            }
        }
        (items, transform)
    }

    fn shape_item(&mut self, shape: &'a data::Shape) -> ShapeItem {
        let id = self.next_id();
        let name = shape.name().map(str::to_string);
        let point = |v: &data::Vec2| Vec2::from(*v);
        let percent = |p: &data::Property<f32>| AnimatableValue::from_property(p, |v| *v, 100.0);
        let color = |p: &data::Property<Vec<f32>>| {
            AnimatableValue::from_property(p, |v| Color::from_floats(v), Color::BLACK)
        };

        match shape {
            data::Shape::Group(g) => {
                let (items, transform) = self.shapes(&g.it);
                ShapeItem::Group(ShapeGroup {
                    id,
                    name,
                    container: false,
                    hidden: g.hd.unwrap_or(false),
                    transform,
                    items,
                })
            }
            data::Shape::Path(p) => ShapeItem::Path(PathItem {
                id,
                name,
                outline: AnimatableValue::from_property(
                    &p.ks,
                    ShapeOutline::from_bezier_path,
                    ShapeOutline::default(),
                ),
            }),
            data::Shape::Rect(r) => ShapeItem::Rect(RectItem {
                id,
                name,
                size: AnimatableValue::from_property(&r.s, point, Vec2::ZERO),
                position: AnimatableValue::from_property(&r.p, point, Vec2::ZERO),
                roundness: AnimatableValue::from_property(&r.r, |v| *v, 0.0),
            }),
            data::Shape::Ellipse(e) => ShapeItem::Ellipse(EllipseItem {
                id,
                name,
                size: AnimatableValue::from_property(&e.s, point, Vec2::ZERO),
                position: AnimatableValue::from_property(&e.p, point, Vec2::ZERO),
            }),
            data::Shape::Fill(f) => ShapeItem::Fill(FillItem {
                id,
                name,
                color: color(&f.c),
                opacity: percent(&f.o),
                fill_rule: FillRule::from_lottie(f.r),
            }),
            data::Shape::Stroke(s) => ShapeItem::Stroke(StrokeItem {
                id,
                name,
                color: color(&s.c),
                opacity: percent(&s.o),
                width: AnimatableValue::from_property(&s.w, |v| *v, 1.0),
                cap: LineCap::from_lottie(s.lc),
                join: LineJoin::from_lottie(s.lj),
                miter_limit: s.ml.unwrap_or(DEFAULT_MITER_LIMIT),
                dashes: s
                    .d
                    .iter()
                    .filter_map(|d| {
                        let kind = match d.n.as_deref() {
                            Some("d") => DashKind::Dash,
                            Some("g") => DashKind::Gap,
                            Some("o") => DashKind::Offset,
                            _ => return None,
                        };
                        Some(DashItem {
                            kind,
                            value: AnimatableValue::from_property(&d.v, |v| *v, 0.0),
                        })
                    })
                    .collect(),
            }),
            data::Shape::GradientFill(g) => ShapeItem::GradientFill(GradientItem {
                id,
                name,
                kind: gradient_kind(g.t),
                opacity: percent(&g.o),
                start: AnimatableValue::from_property(&g.s, point, Vec2::ZERO),
                end: AnimatableValue::from_property(&g.e, point, Vec2::ZERO),
                colors: gradient_colors(&g.g),
                fill_rule: FillRule::from_lottie(g.r),
            }),
            data::Shape::GradientStroke(g) => ShapeItem::GradientStroke(GradientStrokeItem {
                gradient: GradientItem {
                    id,
                    name,
                    kind: gradient_kind(g.t),
                    opacity: percent(&g.o),
                    start: AnimatableValue::from_property(&g.s, point, Vec2::ZERO),
                    end: AnimatableValue::from_property(&g.e, point, Vec2::ZERO),
                    colors: gradient_colors(&g.g),
                    fill_rule: FillRule::NonZero,
                },
                width: AnimatableValue::from_property(&g.w, |v| *v, 1.0),
                cap: LineCap::from_lottie(g.lc),
                join: LineJoin::from_lottie(g.lj),
                miter_limit: g.ml.unwrap_or(DEFAULT_MITER_LIMIT),
            }),
            data::Shape::Trim(t) => ShapeItem::Trim(TrimItem {
                id,
                name,
                start: AnimatableValue::from_property(&t.s, |v| *v, 0.0),
                end: AnimatableValue::from_property(&t.e, |v| *v, 100.0),
                offset: AnimatableValue::from_property(&t.o, |v| *v, 0.0),
            }),
            // Transforms and unknown items are filtered out by `shapes`.
            data::Shape::Transform(_) | data::Shape::Unknown => ShapeItem::Group(ShapeGroup {
                id,
                name,
                container: false,
                hidden: true,
                transform: None,
                items: Vec::new(),
            }),
        }
    }
}

fn gradient_kind(code: u8) -> GradientKind {
    if code == 2 {
        GradientKind::Radial
    } else {
        GradientKind::Linear
    }
}

fn gradient_colors(g: &data::GradientColors) -> AnimatableValue<GradientColor> {
    let points = g.p as usize;
    AnimatableValue::from_property(
        &g.k,
        |raw| GradientColor::from_lottie(raw, points),
        GradientColor::default(),
    )
}
