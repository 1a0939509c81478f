use deepbrot_core::{
    Complex, ComplexDD, DoubleDouble, IterationMap, IterationResult, MandelbrotMap, Viewport,
};
use deepbrot_render::{
    EngineConfig, FractalRenderer, HeadlessGpu, IterationBuffer, JuliaRenderer,
    MandelbrotRenderer, RebuildReason,
};

fn mandelbrot(width: u32, height: u32) -> MandelbrotRenderer<HeadlessGpu> {
    MandelbrotRenderer::new(
        HeadlessGpu::new(),
        EngineConfig::default(),
        Viewport::new(width, height).unwrap(),
    )
    .unwrap()
}

/// Direct DD iteration of every pixel, the reference the raster is held to.
fn direct_render(r: &MandelbrotRenderer<HeadlessGpu>, max_iterations: u32) -> IterationBuffer {
    let vp = r.viewport();
    let view = r.view();
    let mut buffer = IterationBuffer::new(vp.width, vp.height, max_iterations);
    for py in 0..vp.height {
        for px in 0..vp.width {
            let mut point = view.pan_dd();
            point.add_f64(vp.pixel_offset(f64::from(px), f64::from(py), view.zoom(), view.rotation()));
            buffer.set(px, py, MandelbrotMap.escape_time(point, 4.0, max_iterations));
        }
    }
    buffer
}

#[test]
fn end_to_end_mandelbrot_render() {
    let mut r = mandelbrot(80, 60);
    let report = r.draw().unwrap();
    assert_eq!(report.rebuild, Some(RebuildReason::Initial));

    let raster = r.backend().rasterize().unwrap();
    assert_eq!(raster.width, 80);
    assert_eq!(raster.height, 60);
    assert_eq!(raster.data.len(), 80 * 60);
    assert!(raster.interior_count() > 0, "should have some interior points");
    assert!(raster.escaped_count() > 0, "should have some escaped points");
}

#[test]
fn deep_zoom_raster_matches_direct_iteration() {
    let mut r = mandelbrot(16, 12);
    r.set_pan_dd(ComplexDD::new(
        DoubleDouble::new(-0.745, 3e-18),
        DoubleDouble::from(0.113),
    ))
    .unwrap();
    r.set_zoom(1e-13).unwrap();
    let report = r.draw().unwrap();

    let raster = r.backend().rasterize().unwrap();
    let direct = direct_render(&r, report.budget);
    let bad = raster.mismatches(&direct, 1);
    assert!(bad * 50 <= raster.data.len(), "{bad} pixels disagree");
}

#[test]
fn render_determinism() {
    let mut a = mandelbrot(48, 36);
    let mut b = mandelbrot(48, 36);
    for r in [&mut a, &mut b] {
        r.set_zoom(0.01).unwrap();
        r.draw().unwrap();
    }
    assert_eq!(
        a.backend().rasterize().unwrap(),
        b.backend().rasterize().unwrap(),
        "renders must be deterministic"
    );
}

#[test]
fn context_loss_does_not_change_the_image() {
    let mut r = mandelbrot(40, 30);
    r.draw().unwrap();
    let before = r.backend().rasterize().unwrap();

    r.backend_mut().lose_context();
    let report = r.draw().unwrap();
    assert!(report.reinitialized);
    let after = r.backend().rasterize().unwrap();
    assert_eq!(before, after);
}

#[test]
fn julia_constant_change_forces_rebuild_while_pan_is_deferred() {
    let mut r = JuliaRenderer::new(
        HeadlessGpu::new(),
        EngineConfig::default(),
        Viewport::new(32, 32).unwrap(),
    )
    .unwrap();
    r.set_zoom(0.5).unwrap();
    r.draw().unwrap();
    r.set_continuous_animation(true);

    // Pan-only motion, well inside the rebase band.
    let mut pan = r.view().pan_dd();
    pan.add_f64(Complex::new(0.05, 0.0));
    r.set_pan_dd(pan).unwrap();
    let report = r.draw().unwrap();
    assert_eq!(report.rebuild, None);
    assert!(report.deferred);

    // The constant moves mid-flight.
    r.set_julia_c(Complex::new(-0.75, 0.11)).unwrap();
    let report = r.draw().unwrap();
    assert_eq!(report.rebuild, Some(RebuildReason::JuliaConstant));

    // More panning stays deferred.
    pan.add_f64(Complex::new(0.05, 0.0));
    r.set_pan_dd(pan).unwrap();
    let report = r.draw().unwrap();
    assert_eq!(report.rebuild, None);
    assert!(report.deferred);

    // Ending the animation triggers the final accurate rebuild.
    r.set_continuous_animation(false);
    let report = r.draw().unwrap();
    assert!(report.rebuild.is_some());
    assert!(!report.deferred);
}

#[test]
fn reference_is_stable_under_small_idle_pans() {
    let mut r = mandelbrot(32, 24);
    r.draw().unwrap();
    let reference = r.engine().orbit().map(|o| o.reference()).unwrap();
    for _ in 0..5 {
        r.pan_by_screen(0.5, 0.25).unwrap();
        let report = r.draw().unwrap();
        assert_eq!(report.rebuild, Some(RebuildReason::ViewChanged));
        assert_eq!(r.engine().orbit().map(|o| o.reference()), Some(reference));
    }
}

#[test]
fn interior_reference_pixel_is_interior() {
    let mut r = mandelbrot(9, 9);
    r.set_zoom(1e-3).unwrap();
    r.draw().unwrap();
    // The default centre (-0.5, 0) lies in the main cardioid.
    let raster = r.backend().rasterize().unwrap();
    assert_eq!(raster.get(4, 4), IterationResult::Interior);
}
