use deepbrot_app::{presets, AppPreferences, Animator, Completion, Easing, Target, TravelSettings};
use deepbrot_core::{Complex, Viewport};
use deepbrot_render::{
    EngineConfig, FractalRenderer, HeadlessGpu, JuliaRenderer, MandelbrotRenderer, RebuildReason,
};

fn quick_travel() -> TravelSettings {
    TravelSettings {
        pan_ms: 200.0,
        zoom_ms: 200.0,
        rotation_ms: 200.0,
        julia_c_ms: 200.0,
        easing: Easing::QuinticInOut,
    }
}

fn mandelbrot() -> MandelbrotRenderer<HeadlessGpu> {
    MandelbrotRenderer::new(
        HeadlessGpu::new(),
        EngineConfig::default(),
        Viewport::new(16, 12).unwrap(),
    )
    .unwrap()
}

#[test]
fn travel_lands_exactly_on_a_deep_preset() {
    let mut r = mandelbrot();
    r.draw().unwrap();
    let preset = presets::find("seahorse-valley").unwrap();

    let mut animator = Animator::new();
    let trip = animator.travel_to(&preset, &quick_travel()).unwrap();
    let mut last = None;
    for i in 0..=20 {
        last = animator.tick(f64::from(i) * 10.0, &mut r).draw;
    }

    assert!(trip.is_finished());
    assert_eq!(r.view().pan_dd(), preset.pan());
    assert_eq!(r.view().zoom(), preset.zoom);
    assert!(!r.engine().continuous_animation());
    let last = last.unwrap();
    assert!(last.rebuild.is_some());
    assert!(!last.deferred);
    assert!(r.backend().rasterize().is_some());
}

#[test]
fn demo_keeps_travelling_between_presets() {
    let mut r = mandelbrot();
    let elephant = presets::find("elephant-valley").unwrap();
    let spiral = presets::find("triple-spiral").unwrap();
    let settings = TravelSettings {
        pan_ms: 100.0,
        zoom_ms: 100.0,
        rotation_ms: 100.0,
        julia_c_ms: 100.0,
        easing: Easing::Linear,
    };

    let mut animator = Animator::new();
    let demo = animator
        .demo(vec![elephant.clone(), spiral.clone()], settings, 50.0)
        .unwrap();

    let mut visited_elephant = false;
    let mut visited_spiral = false;
    let mut back_at_elephant = false;
    for i in 0..=40 {
        animator.tick(f64::from(i) * 10.0, &mut r);
        let at = |p: &deepbrot_app::Preset| r.view().pan_dd() == p.pan() && r.view().zoom() == p.zoom;
        match i {
            12 => visited_elephant = at(&elephant),
            26 => visited_spiral = at(&spiral),
            40 => back_at_elephant = at(&elephant),
            _ => {}
        }
    }
    assert!(visited_elephant);
    assert!(visited_spiral);
    assert!(back_at_elephant);
    assert_eq!(demo.completion(), Completion::Pending);

    demo.cancel();
    animator.tick(500.0, &mut r);
    assert!(animator.is_idle());
    assert_eq!(demo.completion(), Completion::Cancelled);
}

#[test]
fn julia_constant_change_mid_pan_rebuilds_while_pan_stays_deferred() {
    let mut r = JuliaRenderer::new(
        HeadlessGpu::new(),
        EngineConfig::default(),
        Viewport::new(32, 32).unwrap(),
    )
    .unwrap();
    r.set_zoom(0.5).unwrap();
    r.draw().unwrap();

    let mut target = r.view().pan_dd();
    target.add_f64(Complex::new(0.02, 0.0));
    let mut animator = Animator::new();
    let pan = animator
        .animate(Target::Pan(target), 1000.0, Easing::Linear)
        .unwrap();

    animator.tick(0.0, &mut r);
    let report = animator.tick(100.0, &mut r).draw.unwrap();
    assert_eq!(report.rebuild, None);
    assert!(report.deferred);

    r.set_julia_c(Complex::new(-0.75, 0.11)).unwrap();
    let report = animator.tick(200.0, &mut r).draw.unwrap();
    assert_eq!(report.rebuild, Some(RebuildReason::JuliaConstant));

    let report = animator.tick(300.0, &mut r).draw.unwrap();
    assert_eq!(report.rebuild, None);
    assert!(report.deferred);

    let report = animator.tick(1000.0, &mut r).draw.unwrap();
    assert!(pan.is_finished());
    assert!(report.rebuild.is_some());
    assert!(!report.deferred);
}

#[test]
fn palette_cycle_runs_alongside_travel() {
    let mut r = mandelbrot();
    let mut animator = Animator::new();
    let trip = animator
        .travel_to(&presets::find("triple-spiral").unwrap(), &quick_travel())
        .unwrap();
    let cycle = animator.cycle_palette(1.0).unwrap();

    for i in 0..=20 {
        animator.tick(f64::from(i) * 10.0, &mut r);
    }
    assert!(trip.is_finished());
    assert_eq!(cycle.completion(), Completion::Pending);
    assert!((r.view().palette().offset - 0.2).abs() < 1e-4);
}

#[test]
fn dive_from_preferences_passes_through_both_stops() {
    let prefs = AppPreferences {
        dive_phase_ms: 100.0,
        ..AppPreferences::default()
    };
    let mut r = JuliaRenderer::new(
        HeadlessGpu::new(),
        prefs.engine.clone(),
        Viewport::new(16, 16).unwrap(),
    )
    .unwrap();
    let base = r.view().julia_c();

    let mut animator = Animator::new();
    let dive = animator.julia_dive(prefs.julia_dive()).unwrap();
    animator.tick(0.0, &mut r);
    assert_eq!(r.view().julia_c(), base);

    let report = animator.tick(100.0, &mut r).draw.unwrap();
    assert_eq!(r.view().julia_c(), prefs.dive_a);
    assert_eq!(report.rebuild, Some(RebuildReason::JuliaConstant));

    animator.tick(200.0, &mut r);
    assert_eq!(r.view().julia_c(), base);
    animator.tick(300.0, &mut r);
    assert_eq!(r.view().julia_c(), prefs.dive_b);

    assert_eq!(dive.completion(), Completion::Pending);
    dive.cancel();
    animator.tick(310.0, &mut r);
    assert!(animator.is_idle());
    assert_eq!(dive.completion(), Completion::Cancelled);
}

#[test]
fn demo_tours_builtins_with_preference_dwell() {
    let prefs = AppPreferences {
        travel: quick_travel(),
        demo_dwell_ms: 100.0,
        ..AppPreferences::default()
    };
    let stops = presets::builtin_presets();
    let first = stops[0].clone();
    let second = stops[1].clone();

    let mut r = mandelbrot();
    let mut animator = Animator::new();
    let tour = animator
        .demo(stops, prefs.travel, prefs.demo_dwell_ms)
        .unwrap();

    // Leg one lands at 200 ms, rests until 300 ms, then leg two runs.
    animator.tick(0.0, &mut r);
    animator.tick(200.0, &mut r);
    assert_eq!(r.view().pan_dd(), first.pan());
    animator.tick(250.0, &mut r);
    assert!(!r.engine().continuous_animation());
    animator.tick(300.0, &mut r);
    assert!(r.engine().continuous_animation());
    animator.tick(500.0, &mut r);
    assert_eq!(r.view().pan_dd(), second.pan());
    assert_eq!(r.view().zoom(), second.zoom);

    tour.cancel();
    animator.tick(510.0, &mut r);
    assert_eq!(tour.completion(), Completion::Cancelled);
}
