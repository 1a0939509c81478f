use tracing::{info, warn};

use deepbrot_app::{presets, AppError, AppPreferences, Animator, Completion, Preset};
use deepbrot_core::Viewport;
use deepbrot_render::{
    FractalRenderer, HeadlessGpu, JuliaRenderer, MandelbrotRenderer, Renderer, Variant,
};

/// Simulated display refresh.
const FRAME_MS: f64 = 1000.0 / 60.0;
/// Upper bound on any simulated run.
const MAX_FRAMES: u32 = 60 * 60;

fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting deepbrot");

    let mut prefs = AppPreferences::load();
    let mode = Mode::parse(std::env::args().nth(1).as_deref())?;
    let viewport = Viewport::new(prefs.viewport_width, prefs.viewport_height)?;

    match mode {
        Mode::Travel(preset) if preset.julia_c.is_some() => {
            let renderer = JuliaRenderer::new(HeadlessGpu::new(), prefs.engine.clone(), viewport)?;
            run(renderer, &preset, &mut prefs)?;
        }
        Mode::Travel(preset) => {
            let renderer =
                MandelbrotRenderer::new(HeadlessGpu::new(), prefs.engine.clone(), viewport)?;
            run(renderer, &preset, &mut prefs)?;
        }
        Mode::Demo => {
            let renderer =
                MandelbrotRenderer::new(HeadlessGpu::new(), prefs.engine.clone(), viewport)?;
            demo(renderer, &mut prefs)?;
        }
        Mode::Dive => {
            let renderer = JuliaRenderer::new(HeadlessGpu::new(), prefs.engine.clone(), viewport)?;
            dive(renderer, &mut prefs)?;
        }
    }

    prefs.save();
    Ok(())
}

enum Mode {
    /// Fly to one preset and stop.
    Travel(Preset),
    /// Tour the built-in presets.
    Demo,
    /// Oscillate the Julia constant.
    Dive,
}

impl Mode {
    fn parse(arg: Option<&str>) -> Result<Self, AppError> {
        match arg {
            Some("demo") => Ok(Self::Demo),
            Some("dive") => Ok(Self::Dive),
            Some(name) => Ok(Self::Travel(presets::find(name)?)),
            None => Ok(Self::Travel(presets::find("seahorse-valley")?)),
        }
    }
}

/// Fly to `preset` on a simulated clock while cycling the palette, then
/// rasterize the final frame.
fn run<V: Variant>(
    mut renderer: Renderer<V, HeadlessGpu>,
    preset: &Preset,
    prefs: &mut AppPreferences,
) -> Result<(), AppError> {
    if let Some(snapshot) = prefs.last_view.as_ref().filter(|_| prefs.restore_last_view) {
        if snapshot.kind == renderer.kind() {
            renderer.restore(snapshot)?;
            info!(zoom = snapshot.zoom, "Restored last view");
        }
    }
    renderer.draw()?;

    let mut animator = Animator::new();
    let trip = animator.travel_to(preset, &prefs.travel)?;
    let cycle = animator.cycle_palette(prefs.palette_cycle_speed)?;

    let mut frames = 0;
    while trip.completion() == Completion::Pending && frames < MAX_FRAMES {
        animator.tick(f64::from(frames) * FRAME_MS, &mut renderer);
        frames += 1;
    }
    if !trip.is_finished() {
        warn!(frames, "Trip did not finish");
    }
    cycle.cancel();
    animator.tick(f64::from(frames) * FRAME_MS, &mut renderer);

    let view = renderer.view();
    info!(
        preset = %preset.name,
        frames,
        zoom = view.zoom(),
        pan = %view.pan_dd(),
        "Arrived"
    );

    finish(renderer, prefs);
    Ok(())
}

/// Tour every built-in preset once, then stop the demo.
fn demo<V: Variant>(
    mut renderer: Renderer<V, HeadlessGpu>,
    prefs: &mut AppPreferences,
) -> Result<(), AppError> {
    renderer.draw()?;
    let stops = presets::builtin_presets();
    let travel = &prefs.travel;
    let leg_ms = travel
        .pan_ms
        .max(travel.zoom_ms)
        .max(travel.rotation_ms)
        .max(travel.julia_c_ms);
    let tour_ms = (leg_ms + prefs.demo_dwell_ms) * stops.len() as f64;
    let stop_count = stops.len();

    let mut animator = Animator::new();
    let tour = animator.demo(stops, prefs.travel, prefs.demo_dwell_ms)?;
    let cycle = animator.cycle_palette(prefs.palette_cycle_speed)?;

    let frames = tick_for(&mut animator, &mut renderer, tour_ms);
    tour.cancel();
    cycle.cancel();
    animator.tick(f64::from(frames) * FRAME_MS, &mut renderer);
    info!(stops = stop_count, frames, "Demo tour complete");

    finish(renderer, prefs);
    Ok(())
}

/// Run one full four-phase Julia dive.
fn dive<V: Variant>(
    mut renderer: Renderer<V, HeadlessGpu>,
    prefs: &mut AppPreferences,
) -> Result<(), AppError> {
    renderer.draw()?;
    let start_c = renderer.view().julia_c();

    let mut animator = Animator::new();
    let dive = animator.julia_dive(prefs.julia_dive())?;
    let frames = tick_for(&mut animator, &mut renderer, 4.0 * prefs.dive_phase_ms);
    dive.cancel();
    animator.tick(f64::from(frames) * FRAME_MS, &mut renderer);

    let c = renderer.view().julia_c();
    info!(
        frames,
        start_re = start_c.re,
        start_im = start_c.im,
        end_re = c.re,
        end_im = c.im,
        "Julia dive complete"
    );

    finish(renderer, prefs);
    Ok(())
}

/// Tick a simulated 60 Hz clock for `duration_ms`, capped at [`MAX_FRAMES`].
/// Returns the number of frames run.
fn tick_for<V: Variant>(
    animator: &mut Animator,
    renderer: &mut Renderer<V, HeadlessGpu>,
    duration_ms: f64,
) -> u32 {
    let mut frames = 0;
    while f64::from(frames) * FRAME_MS <= duration_ms && frames < MAX_FRAMES {
        animator.tick(f64::from(frames) * FRAME_MS, renderer);
        frames += 1;
    }
    frames
}

/// Log the final raster and remember the view.
fn finish<V: Variant>(mut renderer: Renderer<V, HeadlessGpu>, prefs: &mut AppPreferences) {
    if let Some(raster) = renderer.backend().rasterize() {
        info!(
            width = raster.width,
            height = raster.height,
            interior = raster.interior_count(),
            escaped = raster.escaped_count(),
            "Rasterized final frame"
        );
    }

    prefs.last_view = Some(renderer.snapshot());
    renderer.destroy();
}
