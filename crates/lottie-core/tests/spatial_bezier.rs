use glam::Vec2;
use lottie_core::AnimatableValue;
use lottie_data::model::{Keyframe, Property};

fn point(v: &[f32; 2]) -> Vec2 {
    Vec2::from_slice(v)
}

#[test]
fn test_spatial_bezier_interpolation() {
    // P0 = (0, 0), P3 = (100, 100)
    // out tangent (50, 0) -> P1 = (50, 0)
    // in tangent (0, -50) -> P2 = (100, 50)
    //
    // At t = 0.5 the weights are 0.125, 0.375, 0.375, 0.125:
    // x = 0.375*50 + 0.375*100 + 0.125*100 = 68.75
    // y = 0.375*50 + 0.125*100 = 31.25
    let kf1 = Keyframe {
        e: Some([100.0, 100.0]),
        to: Some(vec![50.0, 0.0]),
        ti: Some(vec![0.0, -50.0]),
        ..Keyframe::at(0.0, [0.0, 0.0])
    };
    let kf2 = Keyframe::at(10.0, [100.0, 100.0]);

    let value = AnimatableValue::from_property(&Property::animated(vec![kf1, kf2]), point, Vec2::ZERO);
    let result = value.value_at(5.0).unwrap();

    assert!((result.x - 68.75).abs() < 0.001, "X should be ~68.75, got {}", result.x);
    assert!((result.y - 31.25).abs() < 0.001, "Y should be ~31.25, got {}", result.y);
}

#[test]
fn test_zero_tangents_move_in_a_straight_line() {
    let kf1 = Keyframe {
        to: Some(vec![0.0, 0.0]),
        ti: Some(vec![0.0, 0.0]),
        ..Keyframe::at(0.0, [0.0, 0.0])
    };
    let kf2 = Keyframe::at(10.0, [100.0, 50.0]);

    let value = AnimatableValue::from_property(&Property::animated(vec![kf1, kf2]), point, Vec2::ZERO);
    let result = value.value_at(2.5).unwrap();
    assert!((result - Vec2::new(25.0, 12.5)).length() < 0.001, "got {result}");
}

#[test]
fn test_scalar_values_ignore_spatial_tangents() {
    let kf1 = Keyframe {
        to: Some(vec![500.0, 500.0]),
        ti: Some(vec![-500.0, 0.0]),
        ..Keyframe::at(0.0, 0.0_f32)
    };
    let kf2 = Keyframe::at(10.0, 10.0_f32);

    let value = AnimatableValue::from_property(&Property::animated(vec![kf1, kf2]), |v: &f32| *v, 0.0);
    assert_eq!(value.value_at(5.0).unwrap(), 5.0);
}
