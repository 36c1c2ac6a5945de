//! Lottie animation runtime: keyframe evaluation, key path queries and a
//! compositing canvas that renders through any [`DrawBackend`].

pub mod animatable;
pub mod assets;
pub mod backend;
pub mod cache;
pub mod canvas;
pub mod color;
pub mod composition;
pub mod config;
pub mod error;
pub mod gradient;
pub mod interpolate;
pub mod keyframe;
pub mod keypath;
pub mod overrides;
pub mod property;
pub mod render;
pub mod shape;

pub use animatable::{AnimatableValue, KeyframeEvaluator};
pub use assets::{ImageAsset, ImageAssetResolver, ImageAssetTable, ImageData};
pub use backend::{
    BlendMode, DrawBackend, DrawCommand, LayerComposite, Paint, PaintSource, PaintStyle,
    RecordingBackend, TextRun,
};
pub use cache::{CompositionCache, LruCache, DEFAULT_CACHE_CAPACITY};
pub use canvas::{CompositingCanvas, SaveFlags};
pub use color::Color;
pub use composition::{Composition, ContentRef, Layer, LayerKind};
pub use config::PlayerConfig;
pub use error::{AssetError, LottieError, Result};
pub use gradient::GradientColor;
pub use keyframe::{EasingCurve, Keyframe, SpatialTangents};
pub use keypath::{ContentId, KeyPath};
pub use overrides::{Overrides, PropertyOverride};
pub use property::{AnimatableProperty, AnimatableTransform, PropertyValue, TransformValue};
pub use render::{render_frame, RenderContext};
pub use shape::{CubicSegment, ShapeOutline};

use kurbo::{Rect, Shape as _};
use lottie_data::model::LottieJson;
use std::sync::Arc;
use tracing::{debug, info};

/// Plays one composition: tracks the current frame, holds property
/// overrides and the image table, and renders frames on demand.
pub struct LottiePlayer {
    composition: Option<Arc<Composition>>,
    current_frame: f32,
    config: PlayerConfig,
    images: Arc<ImageAssetTable>,
    resolver: Option<Arc<dyn ImageAssetResolver>>,
    overrides: Overrides,
    resolved: LruCache<Vec<KeyPath>>,
}

impl LottiePlayer {
    pub fn new(config: PlayerConfig) -> Result<Self> {
        let resolved = LruCache::new(config.cache_capacity)?;
        let images = Arc::new(image_table(&config, None));
        Ok(LottiePlayer {
            composition: None,
            current_frame: 0.0,
            config,
            images,
            resolver: None,
            overrides: Overrides::new(),
            resolved,
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Installs the delegate consulted before the images folder. Previously
    /// fetched images are dropped.
    pub fn set_image_resolver(&mut self, resolver: Option<Arc<dyn ImageAssetResolver>>) {
        self.resolver = resolver;
        self.images = Arc::new(image_table(&self.config, self.resolver.clone()));
    }

    /// Shared image table, for hosts updating images from other threads.
    pub fn image_table(&self) -> &Arc<ImageAssetTable> {
        &self.images
    }

    /// Replaces the current composition, resetting overrides, resolved key
    /// paths and cached images. Playback starts at the in point.
    pub fn load(&mut self, composition: Arc<Composition>) {
        info!(
            name = composition.name().unwrap_or(""),
            width = composition.width(),
            height = composition.height(),
            frames = composition.duration_frames(),
            "Loaded composition"
        );
        self.current_frame = composition.start_frame();
        self.composition = Some(composition);
        self.overrides.clear();
        self.resolved.clear();
        self.images.clear();
    }

    pub fn load_json(&mut self, model: LottieJson) {
        self.load(Arc::new(Composition::from_json(model)));
    }

    pub fn load_str(&mut self, json: &str) -> Result<()> {
        self.load(Arc::new(Composition::from_json_str(json)?));
        Ok(())
    }

    pub fn composition(&self) -> Option<&Arc<Composition>> {
        self.composition.as_ref()
    }

    pub fn current_frame(&self) -> f32 {
        self.current_frame
    }

    /// Jumps to `frame`, clamped between the in point and the last
    /// drawable frame.
    pub fn set_frame(&mut self, frame: f32) {
        if let Some(comp) = &self.composition {
            self.current_frame = frame.clamp(comp.start_frame(), comp.last_frame());
        }
    }

    /// Advances by `dt` seconds at the composition's frame rate. Playback
    /// loops over `[in point, out point)` in both directions.
    pub fn advance(&mut self, dt: f32) {
        let Some(comp) = &self.composition else {
            return;
        };
        let frame = self.current_frame + dt * comp.frame_rate();
        let duration = comp.duration_frames();
        self.current_frame = if duration > 0.0 {
            comp.start_frame() + (frame - comp.start_frame()).rem_euclid(duration)
        } else {
            comp.start_frame()
        };
    }

    /// Moves to `progress` (`0..=1`) of the way through the composition.
    pub fn set_progress(&mut self, progress: f32) {
        if let Some(comp) = &self.composition {
            let frame = comp.start_frame() + progress.clamp(0.0, 1.0) * comp.duration_frames();
            self.set_frame(frame);
        }
    }

    pub fn progress(&self) -> f32 {
        match &self.composition {
            Some(comp) if comp.duration_frames() > 0.0 => {
                (self.current_frame - comp.start_frame()) / comp.duration_frames()
            }
            _ => 0.0,
        }
    }

    /// Concrete key paths matching `search` in the loaded composition.
    pub fn resolve_key_path(&self, search: &KeyPath) -> Vec<KeyPath> {
        let Some(comp) = &self.composition else {
            return Vec::new();
        };
        let key = search.keys().join(".");
        if let Some(hit) = self.resolved.get(&key) {
            debug!(key_path = %key, "Key path cache hit");
            return hit;
        }
        let resolved = comp.resolve_key_path(search);
        self.resolved.put(key, resolved.clone());
        resolved
    }

    /// Applies `value` to every node `search` resolves to, returning how
    /// many nodes were affected.
    pub fn set_override(&mut self, search: &KeyPath, value: PropertyOverride) -> usize {
        let targets: Vec<ContentId> = self
            .resolve_key_path(search)
            .iter()
            .filter_map(KeyPath::resolved_target)
            .collect();
        for target in &targets {
            self.overrides.set(*target, value);
        }
        debug!(key_path = %search, targets = targets.len(), ?value, "Override set");
        targets.len()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Fetches every declared image up front, so configuration problems
    /// surface here instead of being skipped mid-frame. Returns how many
    /// images are available.
    pub fn preload_images(&self) -> Result<usize> {
        let Some(comp) = &self.composition else {
            return Ok(0);
        };
        let mut loaded = 0;
        for asset in comp.image_assets() {
            if self.images.image(asset)?.is_some() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Renders the current frame into `dest` (device space).
    pub fn render<B: DrawBackend>(&self, canvas: &mut CompositingCanvas<B>, dest: Rect) {
        let Some(comp) = &self.composition else {
            return;
        };
        if let Some(background) = self.config.background_color() {
            canvas.draw_path(&dest.to_path(0.1), &Paint::fill(background));
        }
        let ctx = RenderContext {
            images: &self.images,
            overrides: &self.overrides,
            isolate_group_opacity: self.config.isolate_group_opacity,
        };
        render_frame(canvas, comp, self.current_frame, dest, &ctx);
    }
}

fn image_table(config: &PlayerConfig, resolver: Option<Arc<dyn ImageAssetResolver>>) -> ImageAssetTable {
    let mut table = ImageAssetTable::new();
    table.set_images_folder(config.images_folder.clone());
    table.set_resolver(resolver);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn player() -> LottiePlayer {
        let mut player = LottiePlayer::new(PlayerConfig::default()).unwrap();
        player
            .load_str(
                &json!({
                    "v": "5.7.0", "ip": 10, "op": 70, "fr": 30, "w": 200, "h": 100,
                    "layers": [{
                        "ty": 4, "nm": "Shapes", "ip": 10, "op": 70, "ks": {},
                        "shapes": [{
                            "ty": "gr", "nm": "Dot",
                            "it": [
                                {"ty": "el", "nm": "Circle", "s": {"k": [10, 10]}, "p": {"k": [0, 0]}},
                                {"ty": "fl", "nm": "Fill", "c": {"k": [1, 0, 0, 1]}, "o": {"k": 100}}
                            ]
                        }]
                    }]
                })
                .to_string(),
            )
            .unwrap();
        player
    }

    #[test]
    fn test_advance_loops_to_in_point() {
        let mut player = player();
        assert_eq!(player.current_frame(), 10.0);

        player.advance(1.0);
        assert_eq!(player.current_frame(), 40.0);
        assert_eq!(player.progress(), 0.5);

        player.advance(1.5);
        assert_eq!(player.current_frame(), 25.0);
    }

    #[test]
    fn test_advance_backwards_wraps_to_out_point() {
        let mut player = player();
        player.advance(-0.5);
        assert_eq!(player.current_frame(), 55.0);

        player.advance(-2.0);
        assert_eq!(player.current_frame(), 55.0);
    }

    #[test]
    fn test_progress_and_frame_are_clamped() {
        let mut player = player();
        player.set_progress(2.0);
        assert_eq!(player.current_frame(), 69.0);
        player.set_frame(-5.0);
        assert_eq!(player.current_frame(), 10.0);
    }

    #[test]
    fn test_final_progress_still_draws_content() {
        let mut player = player();
        player.set_progress(1.0);
        assert_eq!(player.current_frame(), 69.0);

        let mut canvas = CompositingCanvas::new(RecordingBackend::new(), 200.0, 100.0);
        player.render(&mut canvas, Rect::new(0.0, 0.0, 200.0, 100.0));
        assert_eq!(canvas.into_backend().path_count(), 1);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = PlayerConfig {
            cache_capacity: 0,
            ..PlayerConfig::default()
        };
        assert!(matches!(LottiePlayer::new(config), Err(LottieError::InvalidCacheCapacity)));
    }

    #[test]
    fn test_override_reaches_rendered_paint() {
        let mut player = player();
        let search = KeyPath::parse("Shapes.Dot.Fill").unwrap();
        assert_eq!(player.set_override(&search, PropertyOverride::Color(Color::WHITE)), 1);

        let mut canvas = CompositingCanvas::new(RecordingBackend::new(), 200.0, 100.0);
        player.render(&mut canvas, Rect::new(0.0, 0.0, 200.0, 100.0));
        let backend = canvas.into_backend();
        assert_eq!(backend.path_count(), 1);
        assert!(backend.commands().iter().any(|c| matches!(c,
            DrawCommand::Path { paint, .. } if paint.source == PaintSource::Solid(Color::WHITE))));

        player.clear_overrides();
        assert!(player.overrides().is_empty());
    }

    #[test]
    fn test_background_is_drawn_first() {
        let mut player = player();
        player.config.background = Some("#000000".into());
        let mut canvas = CompositingCanvas::new(RecordingBackend::new(), 200.0, 100.0);
        player.render(&mut canvas, Rect::new(0.0, 0.0, 200.0, 100.0));

        let first = canvas.backend().commands().first().cloned();
        assert!(matches!(first,
            Some(DrawCommand::Path { paint, .. }) if paint.source == PaintSource::Solid(Color::BLACK)));
    }

    #[test]
    fn test_resolved_paths_are_cached_until_reload() {
        let mut player = player();
        let search = KeyPath::parse("**.Fill").unwrap();
        let first = player.resolve_key_path(&search);
        assert_eq!(first.len(), 1);
        assert_eq!(player.resolved.len(), 1);
        assert_eq!(player.resolve_key_path(&search), first);

        player.load_str(&json!({"ip": 0, "op": 10, "fr": 10, "w": 1, "h": 1, "layers": []}).to_string())
            .unwrap();
        assert!(player.resolved.is_empty());
        assert!(player.resolve_key_path(&search).is_empty());
    }

    #[test]
    fn test_preload_without_images_folder_fails() {
        let mut player = LottiePlayer::new(PlayerConfig::default()).unwrap();
        player
            .load_str(
                &json!({
                    "ip": 0, "op": 10, "fr": 10, "w": 10, "h": 10,
                    "assets": [{"id": "image_0", "w": 4, "h": 4, "u": "images/", "p": "img_0.png"}],
                    "layers": []
                })
                .to_string(),
            )
            .unwrap();
        assert!(matches!(
            player.preload_images(),
            Err(LottieError::MissingImagesFolder { id }) if id == "image_0"
        ));
    }
}
