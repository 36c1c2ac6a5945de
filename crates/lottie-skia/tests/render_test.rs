use kurbo::Rect;
use lottie_core::{CompositingCanvas, LottiePlayer, PlayerConfig};
use lottie_skia::{render_to_png, SkiaBackend};
use serde_json::{json, Value};
use skia_safe::{AlphaType, ColorType, ImageInfo};

const SIZE: i32 = 100;

fn player(layers: Value) -> LottiePlayer {
    let doc = json!({
        "v": "5.7.0", "ip": 0, "op": 30, "fr": 30, "w": SIZE, "h": SIZE,
        "layers": layers
    });
    let mut player = LottiePlayer::new(PlayerConfig::default()).unwrap();
    player.load_str(&doc.to_string()).unwrap();
    player
}

/// Renders the current frame and returns unpremultiplied RGBA pixels.
fn pixels(player: &LottiePlayer) -> Vec<u8> {
    let backend = SkiaBackend::new(SIZE, SIZE).unwrap();
    let mut canvas = CompositingCanvas::new(backend, SIZE as f32, SIZE as f32);
    player.render(&mut canvas, Rect::new(0.0, 0.0, SIZE as f64, SIZE as f64));
    let mut backend = canvas.into_backend();

    let info = ImageInfo::new((SIZE, SIZE), ColorType::RGBA8888, AlphaType::Unpremul, None);
    let mut pixels = vec![0u8; (SIZE * SIZE * 4) as usize];
    assert!(backend
        .surface()
        .read_pixels(&info, &mut pixels, (SIZE * 4) as usize, (0, 0)));
    pixels
}

fn pixel(pixels: &[u8], x: i32, y: i32) -> [u8; 4] {
    let idx = ((y * SIZE + x) * 4) as usize;
    [pixels[idx], pixels[idx + 1], pixels[idx + 2], pixels[idx + 3]]
}

fn solid(name: &str, color: &str, extra: Value) -> Value {
    let mut layer = json!({
        "ty": 1, "nm": name, "sc": color, "sw": SIZE, "sh": SIZE, "ip": 0, "op": 30, "ks": {}
    });
    if let (Some(layer), Some(extra)) = (layer.as_object_mut(), extra.as_object()) {
        layer.extend(extra.clone());
    }
    layer
}

#[test]
fn test_solid_layer_fills_frame() {
    let pixels = pixels(&player(json!([solid("Red", "#ff0000", json!({}))])));
    assert_eq!(pixel(&pixels, 50, 50), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, 0, 99), [255, 0, 0, 255]);
}

#[test]
fn test_top_layer_covers_bottom_layer() {
    let pixels = pixels(&player(json!([
        solid("Top", "#0000ff", json!({"sw": 50})),
        solid("Bottom", "#00ff00", json!({}))
    ])));
    assert_eq!(pixel(&pixels, 25, 50), [0, 0, 255, 255]);
    assert_eq!(pixel(&pixels, 75, 50), [0, 255, 0, 255]);
}

#[test]
fn test_layer_opacity_is_composited() {
    let pixels = pixels(&player(json!([solid("Faded", "#ffffff", json!({"ks": {"o": {"k": 50}}}))])));
    let [_, _, _, alpha] = pixel(&pixels, 50, 50);
    assert!((alpha as i32 - 128).abs() <= 1, "alpha {alpha}");
}

#[test]
fn test_subtract_mask_cuts_hole() {
    let square = |x0: f32, x1: f32| {
        json!({"k": {"c": true,
            "v": [[x0, x0], [x1, x0], [x1, x1], [x0, x1]],
            "i": [[0, 0], [0, 0], [0, 0], [0, 0]],
            "o": [[0, 0], [0, 0], [0, 0], [0, 0]]}})
    };
    let pixels = pixels(&player(json!([solid(
        "Masked",
        "#ff0000",
        json!({"masksProperties": [
            {"mode": "a", "pt": square(0.0, 100.0)},
            {"mode": "s", "pt": square(40.0, 60.0)}
        ]})
    )])));

    assert_eq!(pixel(&pixels, 50, 50)[3], 0);
    assert_eq!(pixel(&pixels, 10, 10), [255, 0, 0, 255]);
}

#[test]
fn test_render_to_png_produces_png() {
    let png = render_to_png(&player(json!([solid("Red", "#ff0000", json!({}))])), 64, 32).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}
