use std::marker::PhantomData;

use tracing::{debug, info, warn};

use deepbrot_core::reference_orbit::{orbit_trace, ORBIT_TRACE_LIMIT};
use deepbrot_core::{
    Complex, ComplexDD, FractalKind, IterationMap, JuliaMap, MandelbrotMap, PaletteState,
    ViewSnapshot, ViewState, Viewport,
};

use crate::config::EngineConfig;
use crate::engine::{PerturbationEngine, RebuildReason};
use crate::error::RenderError;
use crate::gpu::{GpuBackend, ProgramHandle, TextureHandle};
use crate::uniforms::{FrameInputs, FrameUniforms};

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Supplies the iteration function of a renderer.
pub trait Variant {
    type Map: IterationMap;
    const KIND: FractalKind;
    /// Whether the orbit depends on the Julia constant.
    const USES_JULIA_C: bool;

    fn map(julia_c: Complex) -> Self::Map;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mandelbrot;

#[derive(Debug, Clone, Copy, Default)]
pub struct Julia;

impl Variant for Mandelbrot {
    type Map = MandelbrotMap;
    const KIND: FractalKind = FractalKind::Mandelbrot;
    const USES_JULIA_C: bool = false;

    fn map(_julia_c: Complex) -> MandelbrotMap {
        MandelbrotMap
    }
}

impl Variant for Julia {
    type Map = JuliaMap;
    const KIND: FractalKind = FractalKind::Julia;
    const USES_JULIA_C: bool = true;

    fn map(julia_c: Complex) -> JuliaMap {
        JuliaMap::new(julia_c)
    }
}

// ---------------------------------------------------------------------------
// Renderer capability
// ---------------------------------------------------------------------------

/// What one `draw()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawReport {
    pub frame: u64,
    /// Iteration budget used for this frame.
    pub budget: u32,
    pub rebuild: Option<RebuildReason>,
    /// The orbit is stale and waits for motion to stop.
    pub deferred: bool,
    /// GPU resources were recreated after a lost context.
    pub reinitialized: bool,
}

/// The operations every fractal renderer offers to its host and to the
/// animation orchestrator.
pub trait FractalRenderer {
    /// Compile the program. Called lazily by `draw` if needed.
    fn init(&mut self) -> crate::Result<()>;
    fn draw(&mut self) -> crate::Result<DrawReport>;
    /// Back to the default view; the orbit is dropped.
    fn reset(&mut self);
    /// Release every GPU resource.
    fn destroy(&mut self);
    fn iteration_function(&self) -> &dyn IterationMap;

    fn kind(&self) -> FractalKind;
    fn view(&self) -> &ViewState;
    fn min_zoom(&self) -> f64;

    fn set_pan_dd(&mut self, pan: ComplexDD) -> crate::Result<()>;
    /// Returns `true` if the zoom was clamped.
    fn set_zoom(&mut self, zoom: f64) -> crate::Result<bool>;
    fn set_rotation(&mut self, rotation: f64) -> crate::Result<()>;
    fn set_julia_c(&mut self, c: Complex) -> crate::Result<()>;
    fn set_palette(&mut self, palette: PaletteState);
    fn set_extra_iterations(&mut self, extra: i32);

    fn mark_dirty(&mut self);
    fn set_interaction_active(&mut self, active: bool);
    fn set_continuous_animation(&mut self, active: bool);
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GpuResources {
    program: ProgramHandle,
    texture: Option<(TextureHandle, usize)>,
}

/// Perturbation renderer for one fractal family on one backend.
pub struct Renderer<V: Variant, G: GpuBackend> {
    backend: G,
    engine: PerturbationEngine,
    view: ViewState,
    viewport: Viewport,
    map: V::Map,
    resources: Option<GpuResources>,
    /// The current orbit has not reached the texture yet.
    orbit_pending_upload: bool,
    frame: u64,
    _variant: PhantomData<V>,
}

pub type MandelbrotRenderer<G> = Renderer<Mandelbrot, G>;
pub type JuliaRenderer<G> = Renderer<Julia, G>;

impl<V: Variant, G: GpuBackend> Renderer<V, G> {
    /// Check device capabilities and set up CPU-side state.
    pub fn new(backend: G, config: EngineConfig, viewport: Viewport) -> crate::Result<Self> {
        let caps = backend.capabilities();
        if !caps.float_textures {
            return Err(RenderError::MissingCapability(
                "float textures are not supported".to_string(),
            ));
        }
        if caps.max_texture_size < config.budget.cap {
            return Err(RenderError::MissingCapability(format!(
                "max texture size {} is below the iteration cap {}",
                caps.max_texture_size, config.budget.cap
            )));
        }
        let engine = PerturbationEngine::new(config)?;
        let view = ViewState::default();
        info!(kind = V::KIND.label(), ?caps, "Renderer created");
        Ok(Self {
            backend,
            engine,
            map: V::map(view.julia_c()),
            view,
            viewport,
            resources: None,
            orbit_pending_upload: false,
            frame: 0,
            _variant: PhantomData,
        })
    }

    pub fn backend(&self) -> &G {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut G {
        &mut self.backend
    }

    pub fn engine(&self) -> &PerturbationEngine {
        &self.engine
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Drag the view by a screen displacement; the content follows the pointer.
    pub fn pan_by_screen(&mut self, dx: f64, dy: f64) -> crate::Result<()> {
        let delta =
            self.viewport
                .screen_delta_to_fractal(dx, dy, self.view.zoom(), self.view.rotation());
        self.view.offset_pan(-delta)?;
        Ok(())
    }

    /// Zoom by `factor` keeping the point under pixel `(px, py)` fixed.
    pub fn zoom_at_screen(&mut self, px: f64, py: f64, factor: f64) -> crate::Result<()> {
        let zoom = self.view.zoom();
        let anchor = self
            .viewport
            .pixel_offset(px, py, zoom, self.view.rotation());
        self.set_zoom(zoom * factor)?;
        let ratio = self.view.zoom() / zoom;
        self.view.offset_pan(anchor * (1.0 - ratio))?;
        Ok(())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.snapshot(V::KIND)
    }

    pub fn restore(&mut self, snapshot: &ViewSnapshot) -> crate::Result<()> {
        if snapshot.kind != V::KIND {
            warn!(
                expected = V::KIND.label(),
                found = snapshot.kind.label(),
                "Restoring a snapshot from another fractal kind"
            );
        }
        self.view = ViewState::from_snapshot(snapshot, self.engine.config().min_zoom)?;
        self.map = V::map(self.view.julia_c());
        self.engine.mark_dirty(RebuildReason::Requested);
        Ok(())
    }

    /// The plain orbit of the point under pixel `(px, py)`.
    pub fn probe_orbit(&self, px: f64, py: f64) -> Vec<Complex> {
        let mut point = self.view.pan_dd();
        point.add_f64(
            self.viewport
                .pixel_offset(px, py, self.view.zoom(), self.view.rotation()),
        );
        let escape_radius = self.engine.config().escape_radius;
        orbit_trace(&self.map, point, escape_radius * escape_radius, ORBIT_TRACE_LIMIT)
    }

    fn budget(&self) -> u32 {
        self.engine
            .config()
            .budget
            .iterations(self.view.zoom(), self.view.extra_iterations())
    }

    /// Recreate program and texture after the device dropped them.
    fn recover_context(&mut self) -> crate::Result<()> {
        warn!("GPU context lost; reinitializing");
        self.backend.restore_context()?;
        self.resources = None;
        self.init()?;
        self.orbit_pending_upload = self.engine.orbit().is_some();
        self.engine.mark_dirty(RebuildReason::Requested);
        Ok(())
    }

    /// Push the current orbit into the texture, resizing it if needed.
    fn upload_orbit(&mut self) -> crate::Result<TextureHandle> {
        let Some(resources) = self.resources.as_mut() else {
            return Err(RenderError::Backend("renderer not initialized".to_string()));
        };
        let Some(orbit) = self.engine.orbit() else {
            return Err(RenderError::Backend("no reference orbit".to_string()));
        };
        let len = orbit.len();
        let texture = match resources.texture {
            Some((texture, capacity)) if capacity == len => texture,
            stale => {
                if let Some((old, _)) = stale {
                    self.backend.delete_texture(old);
                }
                let texture = self.backend.create_orbit_texture(len)?;
                resources.texture = Some((texture, len));
                debug!(len, "Created orbit texture");
                texture
            }
        };
        self.backend
            .upload_orbit(texture, bytemuck::cast_slice(orbit.texels()))?;
        self.orbit_pending_upload = false;
        Ok(texture)
    }
}

impl<V: Variant, G: GpuBackend> FractalRenderer for Renderer<V, G> {
    fn init(&mut self) -> crate::Result<()> {
        if self.resources.is_some() {
            return Ok(());
        }
        let program = self.backend.compile_program(V::KIND)?;
        self.resources = Some(GpuResources {
            program,
            texture: None,
        });
        self.orbit_pending_upload = self.engine.orbit().is_some();
        debug!(kind = V::KIND.label(), "Program compiled");
        Ok(())
    }

    fn draw(&mut self) -> crate::Result<DrawReport> {
        let mut reinitialized = false;
        if self.backend.is_context_lost() {
            self.recover_context()?;
            reinitialized = true;
        }
        self.init()?;

        let budget = self.budget();
        let prepared = self
            .engine
            .prepare(&self.map, &self.view, budget, V::USES_JULIA_C)?;
        if prepared.rebuilt.is_some() {
            self.orbit_pending_upload = true;
        }

        let texture = match self.resources.and_then(|r| r.texture) {
            Some((texture, _)) if !self.orbit_pending_upload => texture,
            _ => self.upload_orbit()?,
        };
        let program = match self.resources {
            Some(r) => r.program,
            None => return Err(RenderError::Backend("renderer not initialized".to_string())),
        };
        let Some(orbit) = self.engine.orbit() else {
            return Err(RenderError::Backend("no reference orbit".to_string()));
        };

        let escape_radius = self.engine.config().escape_radius;
        let inputs = FrameInputs {
            pan: self.view.pan_dd(),
            reference: orbit.reference(),
            zoom: self.view.zoom(),
            rotation: self.view.rotation(),
            julia_c: self.view.julia_c(),
            palette: self.view.palette(),
            escape_radius_sq: escape_radius * escape_radius,
            max_iterations: budget,
            orbit_len: orbit.len(),
            orbit_valid_len: orbit.valid_len(),
            reference_escaped: orbit.escaped_at().is_some(),
            viewport: (self.viewport.width, self.viewport.height),
        };
        let uniforms = FrameUniforms::new(&inputs, self.engine.config().split);
        self.backend
            .upload_uniforms(program, bytemuck::bytes_of(&uniforms))?;
        self.backend.draw(program, texture)?;

        self.frame += 1;
        Ok(DrawReport {
            frame: self.frame,
            budget,
            rebuild: prepared.rebuilt,
            deferred: prepared.deferred,
            reinitialized,
        })
    }

    fn reset(&mut self) {
        self.view = ViewState::default();
        self.map = V::map(self.view.julia_c());
        self.engine.reset();
        debug!(kind = V::KIND.label(), "Renderer reset");
    }

    fn destroy(&mut self) {
        self.backend.release();
        self.resources = None;
        self.engine.reset();
        info!(kind = V::KIND.label(), "Renderer destroyed");
    }

    fn iteration_function(&self) -> &dyn IterationMap {
        &self.map
    }

    fn kind(&self) -> FractalKind {
        V::KIND
    }

    fn view(&self) -> &ViewState {
        &self.view
    }

    fn min_zoom(&self) -> f64 {
        self.engine.config().min_zoom
    }

    fn set_pan_dd(&mut self, pan: ComplexDD) -> crate::Result<()> {
        Ok(self.view.set_pan_dd(pan)?)
    }

    fn set_zoom(&mut self, zoom: f64) -> crate::Result<bool> {
        let min_zoom = self.engine.config().min_zoom;
        let clamped = self.view.set_zoom(zoom, min_zoom)?;
        if clamped {
            debug!(requested = zoom, min_zoom, "Zoom clamped at precision limit");
        }
        Ok(clamped)
    }

    fn set_rotation(&mut self, rotation: f64) -> crate::Result<()> {
        Ok(self.view.set_rotation(rotation)?)
    }

    fn set_julia_c(&mut self, c: Complex) -> crate::Result<()> {
        self.view.set_julia_c(c)?;
        self.map = V::map(c);
        Ok(())
    }

    fn set_palette(&mut self, palette: PaletteState) {
        *self.view.palette_mut() = PaletteState::new(palette.index, palette.offset);
    }

    fn set_extra_iterations(&mut self, extra: i32) {
        self.view.set_extra_iterations(extra);
    }

    fn mark_dirty(&mut self) {
        self.engine.mark_dirty(RebuildReason::Requested);
    }

    fn set_interaction_active(&mut self, active: bool) {
        self.engine.set_interaction_active(active);
    }

    fn set_continuous_animation(&mut self, active: bool) {
        self.engine.set_continuous_animation(active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Capabilities;
    use crate::headless::HeadlessGpu;

    fn mandelbrot() -> MandelbrotRenderer<HeadlessGpu> {
        Renderer::new(
            HeadlessGpu::new(),
            EngineConfig::default(),
            Viewport::new(32, 24).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn missing_float_textures_is_fatal() {
        let r = MandelbrotRenderer::new(
            HeadlessGpu::without_float_textures(),
            EngineConfig::default(),
            Viewport::default(),
        );
        assert!(matches!(r, Err(RenderError::MissingCapability(_))));
    }

    #[test]
    fn small_textures_are_fatal() {
        let gpu = HeadlessGpu::with_capabilities(Capabilities {
            float_textures: true,
            max_texture_size: 1024,
        });
        let r = JuliaRenderer::new(gpu, EngineConfig::default(), Viewport::default());
        assert!(matches!(r, Err(RenderError::MissingCapability(_))));
    }

    #[test]
    fn first_draw_builds_and_uploads() {
        let mut r = mandelbrot();
        let report = r.draw().unwrap();
        assert_eq!(report.rebuild, Some(RebuildReason::Initial));
        let stats = r.backend().stats();
        assert_eq!(stats.programs_compiled, 1);
        assert_eq!(stats.orbit_uploads, 1);
        assert_eq!(stats.draws, 1);

        // Nothing changed: uniforms only.
        let report = r.draw().unwrap();
        assert_eq!(report.rebuild, None);
        let stats = r.backend().stats();
        assert_eq!(stats.orbit_uploads, 1);
        assert_eq!(stats.uniform_uploads, 2);
    }

    #[test]
    fn texture_recreated_when_budget_changes() {
        let mut r = mandelbrot();
        r.draw().unwrap();
        r.set_zoom(1e-6).unwrap();
        let report = r.draw().unwrap();
        assert!(report.rebuild.is_some());
        assert_eq!(r.backend().stats().textures_created, 2);
        assert_eq!(r.backend().stats().textures_deleted, 1);
        assert_eq!(r.backend().last_orbit().map(<[_]>::len), Some(report.budget as usize));
    }

    #[test]
    fn context_loss_reinitializes_everything() {
        let mut r = mandelbrot();
        r.draw().unwrap();
        r.backend_mut().lose_context();
        let report = r.draw().unwrap();
        assert!(report.reinitialized);
        assert_eq!(report.rebuild, Some(RebuildReason::Requested));
        let stats = r.backend().stats();
        assert_eq!(stats.context_restores, 1);
        assert_eq!(stats.programs_compiled, 2);
        assert_eq!(stats.textures_created, 2);
        assert!(r.backend().rasterize().is_some());
    }

    #[test]
    fn zoom_clamps_at_min_zoom() {
        let mut r = mandelbrot();
        assert!(r.set_zoom(1e-30).unwrap());
        assert_eq!(r.view().zoom(), EngineConfig::DEFAULT_MIN_ZOOM);
    }

    #[test]
    fn pan_by_screen_follows_pointer() {
        let mut r = mandelbrot();
        let before = r.view().pan();
        // Dragging right moves the view centre left.
        r.pan_by_screen(12.0, 0.0).unwrap();
        let after = r.view().pan();
        assert!(after.re < before.re);
        assert!((after.im - before.im).abs() < 1e-15);
    }

    #[test]
    fn zoom_at_screen_keeps_anchor_fixed() {
        let mut r = mandelbrot();
        let vp = r.viewport();
        let anchor_before = r.view().pan() + vp.pixel_offset(4.0, 3.0, r.view().zoom(), 0.0);
        r.zoom_at_screen(4.0, 3.0, 0.25).unwrap();
        let anchor_after = r.view().pan() + vp.pixel_offset(4.0, 3.0, r.view().zoom(), 0.0);
        assert!((anchor_before - anchor_after).norm() < 1e-12);
    }

    #[test]
    fn set_julia_c_swaps_iteration_function() {
        let gpu = HeadlessGpu::new();
        let mut r = JuliaRenderer::new(gpu, EngineConfig::default(), Viewport::default()).unwrap();
        r.set_julia_c(Complex::new(0.285, 0.01)).unwrap();
        assert_eq!(r.map.c(), Complex::new(0.285, 0.01));
        assert_eq!(r.iteration_function().kind(), FractalKind::Julia);
    }

    #[test]
    fn snapshot_restore_marks_dirty() {
        let mut r = mandelbrot();
        r.draw().unwrap();
        let mut snap = r.snapshot();
        snap.pan_re_lo = 1e-20;
        r.restore(&snap).unwrap();
        assert!(r.engine().is_dirty());
        assert_eq!(r.view().pan_dd().re.lo, 1e-20);
    }

    #[test]
    fn probe_orbit_of_escaping_pixel_ends_outside_bailout() {
        let mut r = mandelbrot();
        r.set_zoom(4.0).unwrap();
        let trace = r.probe_orbit(0.0, 0.0);
        let last = trace.last().copied().unwrap_or(Complex::ZERO);
        assert!(last.norm_sq() > 4.0);
    }

    #[test]
    fn destroy_releases_backend() {
        let mut r = mandelbrot();
        r.draw().unwrap();
        r.destroy();
        assert!(r.backend().last_uniforms().is_none());
        // Drawing again starts from scratch.
        let report = r.draw().unwrap();
        assert_eq!(report.rebuild, Some(RebuildReason::Initial));
    }
}
