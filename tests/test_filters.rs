use rasterstack::{
    EngineError, Filter, FilterEngine, FilterParams, InpaintMethod, LayerStack, ParamValue, Pixel,
    Vec2,
};

fn filled_stack(width: usize, height: usize, color: Pixel) -> LayerStack {
    let mut stack = LayerStack::with_tile_size(width, height, 16);
    let idx = stack.add_layer("base");
    stack.layer_mut(idx).unwrap().pixels_mut().fill(color).unwrap();
    stack
}

fn layer_pixel(stack: &LayerStack, x: i32, y: i32) -> Pixel {
    stack.layer(0).unwrap().pixels().get_pixel(x, y)
}

#[test]
fn test_blur_keeps_uniform_layer() {
    let color = Pixel::rgba(40, 120, 220, 255);
    let mut stack = filled_stack(40, 24, color);
    let params = FilterParams::new().with("radius", 4);
    FilterEngine::apply(&mut stack, 0, "gaussian_blur", &params).unwrap();
    for y in 0..24 {
        for x in 0..40 {
            assert_eq!(layer_pixel(&stack, x, y), color, "pixel ({x}, {y}) changed");
        }
    }
}

#[test]
fn test_blur_softens_hard_edge() {
    let mut stack = filled_stack(32, 8, Pixel::BLACK);
    for y in 0..8 {
        for x in 16..32 {
            stack.layer_mut(0).unwrap().pixels_mut().set_pixel(x, y, Pixel::WHITE).unwrap();
        }
    }
    FilterEngine::apply(&mut stack, 0, "gaussian_blur", &FilterParams::new().with("radius", 3)).unwrap();
    let left = layer_pixel(&stack, 15, 4).r;
    let right = layer_pixel(&stack, 16, 4).r;
    assert!(left > 0 && left < 128, "left of edge was {left}");
    assert!(right > 128 && right < 255, "right of edge was {right}");
    assert_eq!(layer_pixel(&stack, 0, 4), Pixel::BLACK);
    assert_eq!(layer_pixel(&stack, 31, 4), Pixel::WHITE);
}

#[test]
fn test_unsharp_leaves_alpha() {
    let mut stack = filled_stack(24, 8, Pixel::rgba(100, 100, 100, 180));
    for y in 0..8 {
        for x in 12..24 {
            stack
                .layer_mut(0)
                .unwrap()
                .pixels_mut()
                .set_pixel(x, y, Pixel::rgba(160, 160, 160, 180))
                .unwrap();
        }
    }
    let params = FilterParams::new().with("radius", 2).with("amount", 1.5);
    FilterEngine::apply(&mut stack, 0, "unsharp_mask", &params).unwrap();
    assert!(layer_pixel(&stack, 11, 3).r < 100);
    assert!(layer_pixel(&stack, 12, 3).r > 160);
    for x in 0..24 {
        assert_eq!(layer_pixel(&stack, x, 3).a, 180);
    }
}

#[test]
fn test_contrast_scales_channels() {
    let mut stack = filled_stack(8, 8, Pixel::rgb(100, 128, 200));
    let params = FilterParams::new().with("contrast", 50).with("brightness", -10);
    FilterEngine::apply(&mut stack, 0, "brightness_contrast", &params).unwrap();
    assert_eq!(layer_pixel(&stack, 3, 3), Pixel::rgb(140, 182, 255));
}

#[test]
fn test_inpaint_fills_hole_from_surroundings() {
    let color = Pixel::rgb(30, 180, 90);
    let mut stack = filled_stack(32, 32, color);
    for y in 12..18 {
        for x in 12..18 {
            stack
                .layer_mut(0)
                .unwrap()
                .pixels_mut()
                .set_pixel(x, y, Pixel::TRANSPARENT)
                .unwrap();
        }
    }
    for method in ["telea", "ns"] {
        let mut work = stack.clone();
        let params = FilterParams::new().with("method", method).with("radius", 3);
        FilterEngine::apply(&mut work, 0, "inpaint", &params).unwrap();
        for y in 12..18 {
            for x in 12..18 {
                assert_eq!(layer_pixel(&work, x, y), color, "{method}: ({x}, {y}) not filled");
            }
        }
    }
}

#[test]
fn test_inpaint_points_limit_the_hole() {
    let mut stack = filled_stack(32, 32, Pixel::WHITE);
    stack.layer_mut(0).unwrap().pixels_mut().set_pixel(5, 5, Pixel::BLACK).unwrap();
    stack.layer_mut(0).unwrap().pixels_mut().set_pixel(25, 25, Pixel::BLACK).unwrap();

    let params = FilterParams::new()
        .with("radius", 2)
        .with("points", vec![Vec2::new(5.0, 5.0)]);
    FilterEngine::apply(&mut stack, 0, "inpaint", &params).unwrap();
    assert_eq!(layer_pixel(&stack, 5, 5), Pixel::WHITE);
    assert_eq!(layer_pixel(&stack, 25, 25), Pixel::BLACK);
}

#[test]
fn test_smudge_zero_strength_is_noop() {
    let mut stack = filled_stack(30, 10, Pixel::WHITE);
    for y in 0..10 {
        for x in 0..10 {
            stack.layer_mut(0).unwrap().pixels_mut().set_pixel(x, y, Pixel::rgb(200, 0, 0)).unwrap();
        }
    }
    let before = stack.clone();
    let path = vec![Vec2::new(5.0, 5.0), Vec2::new(25.0, 5.0)];
    let params = FilterParams::new()
        .with("size", 6.0)
        .with("strength", 0.0)
        .with("points", path.clone());
    FilterEngine::apply(&mut stack, 0, "smudge", &params).unwrap();
    assert_eq!(stack, before);

    let params = FilterParams::new().with("size", 6.0).with("strength", 0.8).with("points", path);
    FilterEngine::apply(&mut stack, 0, "smudge", &params).unwrap();
    let dragged = layer_pixel(&stack, 12, 5);
    assert!(dragged.g < 255, "red should be dragged to the right");
}

#[test]
fn test_smudge_path_far_off_canvas() {
    let mut stack = filled_stack(32, 32, Pixel::WHITE);
    for y in 0..32 {
        stack.layer_mut(0).unwrap().pixels_mut().set_pixel(0, y, Pixel::BLACK).unwrap();
    }
    let params = FilterParams::new()
        .with("size", 2.0)
        .with("strength", 0.5)
        .with("points", vec![Vec2::new(1.0, 1.0), Vec2::new(2.0e9, 1.0)]);
    let started = std::time::Instant::now();
    FilterEngine::apply(&mut stack, 0, "smudge", &params).unwrap();
    assert!(
        started.elapsed().as_secs() < 5,
        "smudge walked the off-canvas part of the path"
    );
    assert!(layer_pixel(&stack, 2, 1).r < 255, "dark column should be dragged right");
    assert_eq!(layer_pixel(&stack, 5, 20), Pixel::WHITE);
}

#[test]
fn test_unknown_filter_is_unsupported() {
    let mut stack = filled_stack(8, 8, Pixel::WHITE);
    let err = FilterEngine::apply(&mut stack, 0, "posterize", &FilterParams::new()).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedOperation(_)));
}

#[test]
fn test_invalid_params_leave_layer_untouched() {
    let mut stack = filled_stack(16, 16, Pixel::rgb(10, 20, 30));
    let before = stack.clone();
    let cases = [
        ("gaussian_blur", FilterParams::new().with("radius", 0)),
        ("gaussian_blur", FilterParams::new().with("radius", 100_000)),
        ("gaussian_blur", FilterParams::new().with("radius", "big")),
        ("brightness_contrast", FilterParams::new().with("brightness", 101)),
        ("inpaint", FilterParams::new().with("method", "fast-marching")),
        ("smudge", FilterParams::new().with("strength", 0.5)),
        (
            "smudge",
            FilterParams::new()
                .with("size", 70_000.0)
                .with("points", vec![Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0)]),
        ),
    ];
    for (name, params) in cases {
        let err = FilterEngine::apply(&mut stack, 0, name, &params).unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidArgument(_)),
            "{name}: expected InvalidArgument, got {err:?}"
        );
        assert_eq!(stack, before, "{name}: layer changed after a rejected call");
    }
    let err = FilterEngine::apply(&mut stack, 3, "gaussian_blur", &FilterParams::new()).unwrap_err();
    assert!(matches!(err, EngineError::OutOfRange(_)));
}

#[test]
fn test_parse_reads_defaults() {
    assert_eq!(
        Filter::parse("gaussian_blur", &FilterParams::new()).unwrap(),
        Filter::GaussianBlur { radius: 5 }
    );
    let mut params = FilterParams::new();
    params.insert("method", ParamValue::Str("navier-stokes".into()));
    match Filter::parse("inpaint", &params).unwrap() {
        Filter::Inpaint { method, radius, points } => {
            assert_eq!(method, InpaintMethod::NavierStokes);
            assert_eq!(radius, 3);
            assert!(points.is_none());
        }
        other => panic!("unexpected {other:?}"),
    }
}
