//! Primitive drawing contract and a recording implementation.

use crate::assets::ImageData;
use crate::color::Color;
use crate::gradient::GradientColor;
use glam::{Mat3, Vec2};
use kurbo::{BezPath, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    /// Keeps the destination where the source is opaque. Used for masks.
    DestinationIn,
    /// Keeps the destination where the source is transparent.
    DestinationOut,
}

impl BlendMode {
    /// Maps the document's `bm` code.
    pub fn from_lottie(code: u8) -> Self {
        match code {
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            4 => BlendMode::Darken,
            5 => BlendMode::Lighten,
            6 => BlendMode::ColorDodge,
            7 => BlendMode::ColorBurn,
            8 => BlendMode::HardLight,
            9 => BlendMode::SoftLight,
            10 => BlendMode::Difference,
            11 => BlendMode::Exclusion,
            12 => BlendMode::Hue,
            13 => BlendMode::Saturation,
            14 => BlendMode::Color,
            15 => BlendMode::Luminosity,
            _ => BlendMode::Normal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn from_lottie(code: Option<u8>) -> Self {
        match code {
            Some(2) => FillRule::EvenOdd,
            _ => FillRule::NonZero,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn from_lottie(code: u8) -> Self {
        match code {
            2 => LineCap::Round,
            3 => LineCap::Square,
            _ => LineCap::Butt,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_lottie(code: u8) -> Self {
        match code {
            2 => LineJoin::Round,
            3 => LineJoin::Bevel,
            _ => LineJoin::Miter,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PaintSource {
    Solid(Color),
    Gradient {
        kind: GradientKind,
        start: Vec2,
        end: Vec2,
        stops: GradientColor,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashPattern {
    pub array: Vec<f32>,
    pub offset: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub dash: Option<DashPattern>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PaintStyle {
    Fill(FillRule),
    Stroke(StrokeStyle),
}

/// Trim range as fractions of the path length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trim {
    pub start: f32,
    pub end: f32,
    pub offset: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub source: PaintSource,
    pub style: PaintStyle,
    /// Multiplied into the source colour's alpha, `0..=1`.
    pub alpha: f32,
    pub trim: Option<Trim>,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Paint {
            source: PaintSource::Solid(color),
            style: PaintStyle::Fill(FillRule::NonZero),
            alpha: 1.0,
            trim: None,
        }
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self.style, PaintStyle::Stroke(_))
    }
}

/// How a popped off-screen layer is merged into its parent target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerComposite {
    pub blend_mode: BlendMode,
    pub alpha: f32,
}

impl Default for LayerComposite {
    fn default() -> Self {
        LayerComposite {
            blend_mode: BlendMode::Normal,
            alpha: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Justification {
    #[default]
    Left,
    Right,
    Center,
}

impl Justification {
    pub fn from_lottie(code: u8) -> Self {
        match code {
            1 => Justification::Right,
            2 => Justification::Center,
            _ => Justification::Left,
        }
    }
}

/// A run of text laid out by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font_family: String,
    pub size: f32,
    pub justify: Justification,
    pub tracking: f32,
    pub line_height: f32,
}

/// Target of the compositing canvas.
///
/// Transforms arrive fully resolved (local to device). Clip rectangles and
/// layer bounds are in device space. Layers nest: every `push_layer` is
/// matched by exactly one `pop_layer`, likewise for clips.
pub trait DrawBackend {
    fn draw_path(&mut self, path: &BezPath, transform: &Mat3, paint: &Paint);

    /// Draws `image` into the local rectangle `(0, 0, width, height)`.
    fn draw_image(&mut self, image: &ImageData, transform: &Mat3, alpha: f32);

    fn draw_text(&mut self, run: &TextRun, transform: &Mat3, paint: &Paint);

    fn push_clip(&mut self, rect: Rect);

    fn pop_clip(&mut self);

    /// Starts a cleared off-screen target covering `bounds`.
    fn push_layer(&mut self, bounds: Rect);

    /// Composites the current off-screen target onto its parent.
    fn pop_layer(&mut self, composite: &LayerComposite);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Path {
        path: BezPath,
        transform: Mat3,
        paint: Paint,
    },
    Image {
        id: String,
        transform: Mat3,
        alpha: f32,
    },
    Text {
        run: TextRun,
        transform: Mat3,
        paint: Paint,
    },
    PushClip(Rect),
    PopClip,
    PushLayer(Rect),
    PopLayer(LayerComposite),
}

/// Backend that records every primitive.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<DrawCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    /// Ids of drawn images, in order.
    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Image { id, .. } => Some(id.as_str()),
            _ => None,
        })
    }

    /// Number of path draws, handy for assertions.
    pub fn path_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Path { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawBackend for RecordingBackend {
    fn draw_path(&mut self, path: &BezPath, transform: &Mat3, paint: &Paint) {
        self.commands.push(DrawCommand::Path {
            path: path.clone(),
            transform: *transform,
            paint: paint.clone(),
        });
    }

    fn draw_image(&mut self, image: &ImageData, transform: &Mat3, alpha: f32) {
        self.commands.push(DrawCommand::Image {
            id: image.id.clone(),
            transform: *transform,
            alpha,
        });
    }

    fn draw_text(&mut self, run: &TextRun, transform: &Mat3, paint: &Paint) {
        self.commands.push(DrawCommand::Text {
            run: run.clone(),
            transform: *transform,
            paint: paint.clone(),
        });
    }

    fn push_clip(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::PushClip(rect));
    }

    fn pop_clip(&mut self) {
        self.commands.push(DrawCommand::PopClip);
    }

    fn push_layer(&mut self, bounds: Rect) {
        self.commands.push(DrawCommand::PushLayer(bounds));
    }

    fn pop_layer(&mut self, composite: &LayerComposite) {
        self.commands.push(DrawCommand::PopLayer(*composite));
    }
}
