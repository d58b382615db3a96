use rasterstack::{
    FilterEngine, FilterParams, LayerStack, Pixel, StrokeRasterizer, UndoManager, Vec2,
};

const RED: Pixel = Pixel::rgb(255, 0, 0);

fn white_background(width: usize, height: usize) -> LayerStack {
    let mut stack = LayerStack::new(width, height);
    let bg = stack.add_layer("Background");
    stack
        .layer_mut(bg)
        .unwrap()
        .pixels_mut()
        .fill(Pixel::WHITE)
        .unwrap();
    stack
}

#[test]
fn test_red_stroke_undo_redo() {
    let mut stack = white_background(100, 100);
    let mut history = UndoManager::new();

    let white = stack.composite();
    assert_eq!(white.width(), 100);
    assert_eq!(white.height(), 100);
    assert!(
        white.pixels().iter().all(|p| *p == Pixel::WHITE),
        "fresh background should composite to opaque white"
    );

    history.checkpoint(&stack);
    let points = [Vec2::new(10.0, 10.0), Vec2::new(20.0, 10.0)];
    StrokeRasterizer::paint_stroke(&mut stack, 0, &points, 5.0, 1.0, RED).unwrap();
    let painted = stack.composite();

    for x in 8..=22 {
        assert_eq!(painted.get(x, 10), RED, "stroke should cover x={x}");
    }
    assert_eq!(painted.get(7, 10), Pixel::WHITE);
    assert_eq!(painted.get(23, 10), Pixel::WHITE);
    assert_eq!(painted.get(15, 14), Pixel::WHITE);
    assert_eq!(painted.get(50, 50), Pixel::WHITE);
    assert!(painted.pixels().iter().all(|p| p.a == 255));

    assert!(history.undo(&mut stack));
    assert_eq!(stack.composite(), white, "undo should restore the white canvas");

    assert!(history.redo(&mut stack));
    assert_eq!(stack.composite(), painted, "redo should bring back the same stroke");
}

#[test]
fn test_brightness_on_mid_gray() {
    let mut stack = LayerStack::new(16, 16);
    let idx = stack.add_layer("gray");
    let gray = Pixel::rgb(128, 128, 128);
    stack.layer_mut(idx).unwrap().pixels_mut().fill(gray).unwrap();

    let params = FilterParams::new().with("brightness", 50).with("contrast", 0);
    FilterEngine::apply(&mut stack, idx, "brightness_contrast", &params).unwrap();

    let out = stack.composite();
    assert!(out.pixels().iter().all(|p| *p == Pixel::rgb(178, 178, 178)));

    let params = FilterParams::new().with("brightness", 100);
    FilterEngine::apply(&mut stack, idx, "brightness_contrast", &params).unwrap();
    assert!(
        stack.composite().pixels().iter().all(|p| *p == Pixel::WHITE),
        "channels should clamp at 255"
    );
}

#[test]
fn test_single_layer_composites_exactly() {
    let mut stack = LayerStack::with_tile_size(37, 23, 16);
    let idx = stack.add_layer("art");
    let points = [
        Vec2::new(2.0, 3.0),
        Vec2::new(30.0, 20.0),
        Vec2::new(5.0, 18.0),
    ];
    StrokeRasterizer::paint_stroke(&mut stack, idx, &points, 7.0, 0.7, Pixel::rgba(10, 200, 90, 180))
        .unwrap();
    assert_eq!(
        stack.composite(),
        stack.layer(idx).unwrap().pixels().to_buffer()
    );
}

#[test]
fn test_erase_is_idempotent() {
    let mut stack = white_background(64, 64);
    let points = [
        Vec2::new(-5.0, 10.0),
        Vec2::new(40.0, 30.0),
        Vec2::new(70.0, 60.0),
    ];

    StrokeRasterizer::erase_stroke(&mut stack, 0, &points, 9.0, 1.0).unwrap();
    let once = stack.clone();
    StrokeRasterizer::erase_stroke(&mut stack, 0, &points, 9.0, 1.0).unwrap();
    assert_eq!(stack, once, "erasing twice should equal erasing once");

    let grid = stack.layer(0).unwrap().pixels();
    assert_eq!(grid.get_pixel(40, 30).a, 0);
    assert_eq!(grid.get_pixel(0, 63), Pixel::WHITE);
}

#[test]
fn test_strokes_past_the_edge_are_clipped() {
    let mut stack = white_background(20, 20);
    let points = [Vec2::new(-100.0, 5.0), Vec2::new(100.0, 5.0)];
    StrokeRasterizer::paint_stroke(&mut stack, 0, &points, 3.0, 1.0, RED).unwrap();
    let grid = stack.layer(0).unwrap().pixels();
    assert_eq!(grid.get_pixel(0, 5), RED);
    assert_eq!(grid.get_pixel(19, 5), RED);
    assert_eq!(grid.get_pixel(20, 5), Pixel::TRANSPARENT);
}

#[test]
fn test_out_of_bounds_reads_never_allocate() {
    let mut stack = LayerStack::new(50, 50);
    let idx = stack.add_layer("empty");
    let grid = stack.layer(idx).unwrap().pixels();
    for (x, y) in [(-1, 0), (0, -1), (50, 0), (0, 50), (i32::MAX, i32::MIN), (25, 25)] {
        assert_eq!(grid.get_pixel(x, y), Pixel::TRANSPARENT);
    }
    assert_eq!(grid.tile_count(), 0);
}

#[test]
fn test_long_scribble_stays_fast() {
    let mut stack = LayerStack::new(1920, 1080);
    let idx = stack.add_layer("sketch");
    let points: Vec<Vec2> = (0..400)
        .map(|i| {
            let x = 40.0 + (i as f32 * 4.6) % 1840.0;
            let y = if i % 2 == 0 { 60.0 } else { 1020.0 };
            Vec2::new(x, y)
        })
        .collect();

    let started = std::time::Instant::now();
    StrokeRasterizer::paint_stroke(&mut stack, idx, &points, 4.0, 1.0, RED).unwrap();
    let elapsed = started.elapsed();
    assert!(
        elapsed.as_secs_f32() < 10.0,
        "400-point stroke took {elapsed:?}"
    );

    let grid = stack.layer(idx).unwrap().pixels();
    assert_eq!(grid.get_pixel(40, 60), RED);
    assert_eq!(grid.get_pixel(1900, 5), Pixel::TRANSPARENT);
}
