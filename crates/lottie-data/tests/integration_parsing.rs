#![recursion_limit = "256"]

use lottie_data::model::{LottieJson, Shape, Value};
use serde_json::json;

fn sample_document() -> serde_json::Value {
    json!({
        "v": "5.7.4", "nm": "Sample", "ip": 0, "op": 90, "fr": 30, "w": 400, "h": 300,
        "assets": [
            { "id": "image_0", "w": 64, "h": 64, "u": "images/", "p": "img_0.png", "e": 0 },
            { "id": "comp_0", "layers": [
                { "ty": 3, "ind": 1, "nm": "Null", "ip": 0, "op": 90, "st": 0, "ks": {} }
            ]}
        ],
        "layers": [
            {
                "ty": 4, "ind": 1, "nm": "Body", "ip": 0, "op": 90, "st": 0,
                "ks": {
                    "o": { "a": 1, "k": [
                        { "t": 0, "s": [0], "o": { "x": [0.33], "y": [0] }, "i": { "x": [0.67], "y": [1] } },
                        { "t": 30, "s": [100] }
                    ]},
                    "p": { "a": 0, "k": [200, 150, 0] },
                    "s": { "a": 0, "k": [100, 100] }
                },
                "shapes": [
                    { "ty": "gr", "nm": "Left Hand", "it": [
                        { "ty": "sh", "nm": "Path 1", "ks": { "a": 1, "k": [
                            { "t": 0, "s": [{ "c": true, "v": [[0,0],[10,0],[10,10]], "i": [[0,0],[0,0],[0,0]], "o": [[0,0],[0,0],[0,0]] }] },
                            { "t": 20, "s": [{ "c": true, "v": [[0,0],[20,0],[20,20]], "i": [[0,0],[0,0],[0,0]], "o": [[0,0],[0,0],[0,0]] }] }
                        ]}},
                        { "ty": "fl", "nm": "Fill", "c": { "a": 0, "k": [1, 0.5, 0] }, "o": { "a": 0, "k": 100 } },
                        { "ty": "tr", "p": { "a": 0, "k": [0, 0] }, "a": { "a": 0, "k": [0, 0] },
                          "s": { "a": 0, "k": [100, 100] }, "r": { "a": 0, "k": 0 }, "o": { "a": 0, "k": 100 } }
                    ]},
                    { "ty": "gf", "nm": "Gradient", "o": { "a": 0, "k": 100 },
                      "s": { "a": 0, "k": [0, 0] }, "e": { "a": 0, "k": [100, 0] }, "t": 1,
                      "g": { "p": 2, "k": { "a": 0, "k": [0, 1, 0, 0, 1, 0, 0, 1] } } }
                ]
            },
            { "ty": 2, "ind": 2, "nm": "Picture", "refId": "image_0", "ip": 0, "op": 90, "st": 0, "ks": {} },
            { "ty": 1, "ind": 3, "nm": "Backdrop", "sc": "#336699", "sw": 400, "sh": 300,
              "ip": 0, "op": 90, "st": 0, "ks": {} }
        ]
    })
}

#[test]
fn test_parse_full_document() {
    let lottie: LottieJson =
        serde_json::from_value(sample_document()).expect("Failed to parse sample document");
    assert_eq!(lottie.nm.as_deref(), Some("Sample"));
    assert_eq!(lottie.layers.len(), 3);
    assert_eq!(lottie.assets.len(), 2);
    assert!(lottie.assets[1].layers.is_some());
    assert_eq!(lottie.layers[2].color.as_deref(), Some("#336699"));
}

#[test]
fn test_parse_animated_path_keyframes() {
    let lottie: LottieJson = serde_json::from_value(sample_document()).unwrap();
    let shapes = lottie.layers[0].shapes.as_ref().expect("shape layer has shapes");
    let Shape::Group(group) = &shapes[0] else {
        panic!("Expected group, got {:?}", shapes[0]);
    };
    let Shape::Path(path) = &group.it[0] else {
        panic!("Expected path, got {:?}", group.it[0]);
    };
    match &path.ks.k {
        Value::Animated(kfs) => {
            assert_eq!(kfs.len(), 2);
            let start = kfs[0].s.as_ref().expect("first keyframe has a start path");
            assert!(start.c);
            assert_eq!(start.v.len(), 3);
        }
        other => panic!("Expected animated path, got {:?}", other),
    }
}
