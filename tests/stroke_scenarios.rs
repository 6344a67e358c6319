//! End-to-end stroke scenarios through the public engine API.

use tusche::brush::BrushTip;
use tusche::canvas::{BlendMode, Canvas};
use tusche::color::Rgba8;
use tusche::history::MemoryStore;
use tusche::settings::{BrushSettings, ConstraintHandling, ConstraintTarget, PressureConstraint};
use tusche::stroke::{DrawStrategy, JitterEngine, StrokeEngine};
use tusche::symmetry::SymmetryMode;

fn engine_on(source: Canvas, settings: BrushSettings) -> StrokeEngine {
    let mut engine = StrokeEngine::new(
        source,
        BrushTip::round(64),
        settings,
        Box::new(MemoryStore::new()),
    );
    engine.set_jitter(JitterEngine::with_seed(7));
    engine
}

fn drag(engine: &mut StrokeEngine, from: (f32, f32), to: (f32, f32), steps: usize) {
    engine.pointer_down(from.0, from.1, 1.0);
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        engine.pointer_move(
            from.0 + (to.0 - from.0) * t,
            from.1 + (to.1 - from.1) * t,
            1.0,
        );
    }
    engine.pointer_up(to.0, to.1, 1.0);
}

#[test]
fn unbounded_density_paints_a_continuous_line() {
    let settings = BrushSettings {
        size: 12.0,
        density: 0.0,
        color: Rgba8::opaque(200, 30, 30),
        ..Default::default()
    };
    let mut engine = engine_on(Canvas::new(256, 256), settings);
    // Move events two pixels apart, well under the brush diameter.
    drag(&mut engine, (40.0, 128.0), (200.0, 128.0), 80);

    // Every pixel along the path centerline is covered.
    for x in 40..=200 {
        assert!(
            engine.committed().pixel(x, 128).a > 0,
            "gap in stroke at x={x}"
        );
    }
}

#[test]
fn density_spacing_emits_expected_stamp_count() {
    // size 20 at density 4 spaces stamps 5 units apart; an 80 unit drag
    // yields 16 interpolated stamps plus the pointer-down stamp.
    let settings = BrushSettings {
        size: 20.0,
        density: 4.0,
        ..Default::default()
    };
    let mut engine = engine_on(Canvas::new(256, 256), settings);
    drag(&mut engine, (60.0, 100.0), (140.0, 100.0), 9);

    let interpolated = engine.stamp_count() - 1;
    assert!(
        (15..=17).contains(&interpolated),
        "expected ~16 interpolated stamps, got {interpolated}"
    );
}

#[test]
fn eraser_restores_the_original_source_pixels() {
    let mut source = Canvas::new(128, 128);
    source.fill(Rgba8::opaque(10, 120, 40));

    let mut engine = engine_on(source, BrushSettings::default());

    // Paint black over a patch, then erase the middle of it.
    drag(&mut engine, (40.0, 64.0), (90.0, 64.0), 25);
    assert_eq!(engine.committed().pixel(64, 64), Rgba8::opaque(0, 0, 0));

    engine.set_strategy(DrawStrategy::Eraser);
    engine.pointer_down(64.0, 64.0, 1.0);
    engine.pointer_up(64.0, 64.0, 1.0);

    // Fully covered center pixels come back bit-exact.
    assert_eq!(engine.committed().pixel(64, 64), Rgba8::opaque(10, 120, 40));
}

#[test]
fn horizontal_symmetry_mirrors_across_the_vertical_axis() {
    let settings = BrushSettings {
        size: 16.0,
        symmetry: SymmetryMode::Horizontal,
        color: Rgba8::opaque(0, 0, 255),
        ..Default::default()
    };
    let mut engine = engine_on(Canvas::new(200, 200), settings);
    // Mirror axis defaults to the canvas center (x = 100).
    engine.pointer_down(60.0, 80.0, 1.0);
    engine.pointer_up(60.0, 80.0, 1.0);

    assert!(engine.committed().pixel(60, 80).a > 0);
    assert!(engine.committed().pixel(140, 80).a > 0);
    // Mirrored pair is symmetric about the axis.
    assert_eq!(
        engine.committed().pixel(55, 80),
        engine.committed().pixel(145, 80)
    );
    // Nothing painted on the axis itself for an off-axis stamp.
    assert_eq!(engine.committed().pixel(100, 80).a, 0);
}

#[test]
fn radial_symmetry_emits_one_stamp_per_point() {
    let settings = BrushSettings {
        size: 10.0,
        symmetry: SymmetryMode::Radial(6),
        ..Default::default()
    };
    let mut engine = engine_on(Canvas::new(200, 200), settings);
    engine.pointer_down(100.0, 40.0, 1.0);
    engine.pointer_up(100.0, 40.0, 1.0);

    // One logical stamp, six painted sites 60 degrees apart around the
    // center at radius 60.
    assert_eq!(engine.stamp_count(), 1);
    for k in 0..6 {
        let angle = (k as f32) * std::f32::consts::TAU / 6.0;
        let base = (100.0f32 - 100.0, 40.0f32 - 100.0);
        let x = 100.0 + base.0 * angle.cos() - base.1 * angle.sin();
        let y = 100.0 + base.0 * angle.sin() + base.1 * angle.cos();
        assert!(
            engine.committed().pixel(x.round() as i32, y.round() as i32).a > 0,
            "missing radial copy {k}"
        );
    }
}

#[test]
fn pressure_constraint_scales_stamp_size() {
    let mut settings = BrushSettings {
        size: 10.0,
        density: 0.0,
        ..Default::default()
    };
    settings.constraints.insert(
        ConstraintTarget::Size,
        PressureConstraint::new(ConstraintHandling::MatchValue, 100.0),
    );
    let mut engine = engine_on(Canvas::new(220, 220), settings);

    // Light pressure: size 10 + (100 - 10) * 0.2 = 28, radius 14.
    engine.pointer_down(50.0, 50.0, 0.2);
    engine.pointer_up(50.0, 50.0, 0.2);
    assert!(engine.committed().pixel(50 + 10, 50).a > 0);
    assert_eq!(engine.committed().pixel(50 + 22, 50).a, 0);

    // Full pressure elsewhere: size 100, radius 50.
    engine.pointer_down(150.0, 150.0, 1.0);
    engine.pointer_up(150.0, 150.0, 1.0);
    assert!(engine.committed().pixel(150 + 40, 150).a > 0);
}

#[test]
fn blend_mode_stroke_stages_and_commits_once() {
    let mut source = Canvas::new(100, 100);
    source.fill(Rgba8::opaque(200, 200, 200));

    let settings = BrushSettings {
        size: 30.0,
        density: 0.0,
        color: Rgba8::opaque(100, 100, 100),
        blend_mode: BlendMode::Multiply,
        ..Default::default()
    };
    let mut engine = engine_on(source, settings);

    engine.pointer_down(50.0, 50.0, 1.0);
    // Mid-stroke: committed untouched, display shows the staged composite.
    assert_eq!(engine.committed().pixel(50, 50), Rgba8::opaque(200, 200, 200));
    let shown = engine.display().pixel(50, 50);
    assert!(shown.r < 200);

    // Overlapping self-passes must not double-multiply within one stroke.
    engine.pointer_move(52.0, 50.0, 1.0);
    engine.pointer_move(50.0, 50.0, 1.0);
    engine.pointer_up(50.0, 50.0, 1.0);

    // 200 * 100/255 ~= 78.
    let px = engine.committed().pixel(50, 50);
    assert!((px.r as i32 - 78).abs() <= 2, "got r={}", px.r);
}

#[test]
fn undo_redo_walks_stroke_states() {
    let mut engine = engine_on(Canvas::new(64, 64), BrushSettings::default());
    let blank = engine.committed().clone();

    drag(&mut engine, (10.0, 32.0), (30.0, 32.0), 5);
    let first = engine.committed().clone();
    drag(&mut engine, (30.0, 40.0), (55.0, 40.0), 5);
    let second = engine.committed().clone();

    assert!(engine.undo().unwrap());
    assert_eq!(*engine.committed(), first);
    assert!(engine.undo().unwrap());
    assert_eq!(*engine.committed(), blank);
    assert!(!engine.undo().unwrap());

    assert!(engine.redo().unwrap());
    assert_eq!(*engine.committed(), first);
    assert!(engine.redo().unwrap());
    assert_eq!(*engine.committed(), second);
    assert!(!engine.redo().unwrap());

    // A new stroke invalidates the redo branch.
    assert!(engine.undo().unwrap());
    drag(&mut engine, (5.0, 5.0), (15.0, 5.0), 3);
    assert!(!engine.redo().unwrap());
}

#[test]
fn clone_stamp_copies_from_the_armed_origin() {
    let mut source = Canvas::new(128, 128);
    source.fill(Rgba8::opaque(255, 255, 255));
    for y in 20..30 {
        for x in 20..30 {
            source.set_pixel(x, y, Rgba8::opaque(255, 0, 0));
        }
    }

    let settings = BrushSettings {
        size: 24.0,
        ..Default::default()
    };
    let mut engine = engine_on(source, settings);
    engine.set_strategy(DrawStrategy::CloneStamp);

    // First press arms the origin on the red patch; second paints it
    // elsewhere.
    engine.pointer_down(25.0, 25.0, 1.0);
    engine.pointer_down(90.0, 90.0, 1.0);
    engine.pointer_up(90.0, 90.0, 1.0);

    assert_eq!(engine.committed().pixel(90, 90), Rgba8::opaque(255, 0, 0));
    // The origin patch itself is untouched.
    assert_eq!(engine.committed().pixel(25, 25), Rgba8::opaque(255, 0, 0));
}

#[test]
fn seamless_stroke_wraps_around_edges() {
    let settings = BrushSettings {
        size: 20.0,
        seamless: true,
        color: Rgba8::opaque(0, 0, 0),
        ..Default::default()
    };
    let mut engine = engine_on(Canvas::new(100, 100), settings);
    engine.pointer_down(2.0, 50.0, 1.0);
    engine.pointer_up(2.0, 50.0, 1.0);

    // Paint near the left edge shows up on the right edge.
    assert!(engine.committed().pixel(1, 50).a > 0);
    assert!(engine.committed().pixel(97, 50).a > 0);
}
