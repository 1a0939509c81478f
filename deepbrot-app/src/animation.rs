//! Cooperative, single-threaded animation of renderer parameters.
//!
//! The host calls [`Animator::tick`] once per frame. Each tick mutates the
//! renderer, draws once, and only then resolves the handles of tasks that
//! reached their end.

use std::cell::Cell;
use std::f64::consts::{PI, TAU};
use std::rc::Rc;

use tracing::{debug, error, warn};

use deepbrot_core::{Complex, ComplexDD, PaletteState};
use deepbrot_render::{DrawReport, FractalRenderer};

use crate::easing::Easing;
use crate::error::AppError;
use crate::presets::{self, Preset, TravelSettings};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Where an animation ended up. Only `Finished` counts as resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Finished,
    Cancelled,
}

/// Shared view of one running animation.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    state: Rc<Cell<Completion>>,
}

impl AnimationHandle {
    fn new() -> Self {
        Self {
            state: Rc::new(Cell::new(Completion::Pending)),
        }
    }

    /// Stop the animation at its next tick. Has no effect once resolved.
    pub fn cancel(&self) {
        if self.state.get() == Completion::Pending {
            self.state.set(Completion::Cancelled);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.get() == Completion::Cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.state.get() == Completion::Finished
    }

    pub fn completion(&self) -> Completion {
        self.state.get()
    }

    fn finish(&self) {
        if self.state.get() == Completion::Pending {
            self.state.set(Completion::Finished);
        }
    }
}

// ---------------------------------------------------------------------------
// Targets and segments
// ---------------------------------------------------------------------------

/// Tasks of one class are mutually exclusive; the two classes run side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    /// Anything that moves the view or the Julia constant.
    Motion,
    /// Palette offset changes.
    Color,
}

/// One animatable renderer parameter and the value to reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Pan(ComplexDD),
    Zoom(f64),
    /// Radians. Travels along the shorter arc.
    Rotation(f64),
    JuliaC(Complex),
    PaletteOffset(f32),
}

impl Target {
    pub fn class(&self) -> TaskClass {
        match self {
            Self::PaletteOffset(_) => TaskClass::Color,
            _ => TaskClass::Motion,
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let bad = |what, value| Err(AppError::InvalidTarget { what, value });
        match *self {
            Self::Pan(p) if !p.is_finite() => {
                let v = p.value();
                bad("pan", if v.re.is_finite() { v.im } else { v.re })
            }
            Self::Zoom(z) if !z.is_finite() || z <= 0.0 => bad("zoom", z),
            Self::Rotation(r) if !r.is_finite() => bad("rotation", r),
            Self::JuliaC(c) if !c.is_finite() => {
                bad("julia c", if c.re.is_finite() { c.im } else { c.re })
            }
            Self::PaletteOffset(o) if !o.is_finite() => bad("palette offset", f64::from(o)),
            _ => Ok(()),
        }
    }

    /// The renderer's current value of the same parameter.
    fn current(&self, r: &dyn FractalRenderer) -> Self {
        let view = r.view();
        match self {
            Self::Pan(_) => Self::Pan(view.pan_dd()),
            Self::Zoom(_) => Self::Zoom(view.zoom()),
            Self::Rotation(_) => Self::Rotation(view.rotation()),
            Self::JuliaC(_) => Self::JuliaC(view.julia_c()),
            Self::PaletteOffset(_) => Self::PaletteOffset(view.palette().offset),
        }
    }

    /// Eased blend between `from` and `self` at progress `t`.
    fn interpolate(&self, from: Self, t: f64) -> Self {
        match (*self, from) {
            (Self::Pan(to), Self::Pan(from)) => Self::Pan(from + (to - from) * t),
            (Self::Zoom(to), Self::Zoom(from)) => Self::Zoom(from * (to / from).powf(t)),
            (Self::Rotation(to), Self::Rotation(from)) => {
                Self::Rotation(from + shortest_arc(from, to) * t)
            }
            (Self::JuliaC(to), Self::JuliaC(from)) => Self::JuliaC(from.lerp(to, t)),
            (Self::PaletteOffset(to), Self::PaletteOffset(from)) => {
                Self::PaletteOffset(from + (to - from) * t as f32)
            }
            (to, _) => to,
        }
    }

    fn apply(&self, r: &mut dyn FractalRenderer) -> deepbrot_render::Result<()> {
        match *self {
            Self::Pan(p) => r.set_pan_dd(p),
            Self::Zoom(z) => r.set_zoom(z).map(|_| ()),
            Self::Rotation(a) => r.set_rotation(a),
            Self::JuliaC(c) => r.set_julia_c(c),
            Self::PaletteOffset(o) => {
                let palette = r.view().palette();
                r.set_palette(PaletteState::new(palette.index, o));
                Ok(())
            }
        }
    }
}

/// Signed angle in `(-π, π]` taking `from` to `to`.
fn shortest_arc(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI {
        d - TAU
    } else {
        d
    }
}

/// One parameter moving to its target over a duration.
#[derive(Debug, Clone)]
pub struct Segment {
    target: Target,
    duration_ms: f64,
    easing: Easing,
    /// Read from the renderer at the first tick.
    from: Option<Target>,
}

impl Segment {
    pub fn new(target: Target, duration_ms: f64, easing: Easing) -> Self {
        Self {
            target,
            duration_ms,
            easing,
            from: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn validate(&self) -> Result<(), AppError> {
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(AppError::InvalidTarget {
                what: "duration",
                value: self.duration_ms,
            });
        }
        self.target.validate()
    }

    /// Advance to `elapsed_ms`. Returns `true` once the target is reached.
    fn step(&mut self, elapsed_ms: f64, r: &mut dyn FractalRenderer) -> bool {
        let from = *self.from.get_or_insert_with(|| self.target.current(r));
        let progress = if self.duration_ms > 0.0 {
            (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let done = progress >= 1.0;
        let value = if done {
            self.target
        } else {
            self.target.interpolate(from, self.easing.apply(progress))
        };
        if let Err(e) = value.apply(r) {
            warn!(error = %e, target = ?self.target, "Animation step rejected");
        }
        done
    }
}

/// Step every unfinished segment. Returns `true` when all are done.
fn step_segments(
    segments: &mut [Segment],
    done: &mut [bool],
    elapsed_ms: f64,
    r: &mut dyn FractalRenderer,
) -> bool {
    for (segment, done) in segments.iter_mut().zip(done.iter_mut()) {
        if !*done {
            *done = segment.step(elapsed_ms, r);
        }
    }
    done.iter().all(|d| *d)
}

// ---------------------------------------------------------------------------
// Infinite tasks
// ---------------------------------------------------------------------------

/// Settings for the four-phase Julia constant oscillation
/// `base → a → base → b → base`, repeated forever.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JuliaDive {
    pub a: Complex,
    pub b: Complex,
    pub phase_ms: f64,
    pub easing: Easing,
}

impl JuliaDive {
    fn validate(&self) -> Result<(), AppError> {
        Target::JuliaC(self.a).validate()?;
        Target::JuliaC(self.b).validate()?;
        if !self.phase_ms.is_finite() || self.phase_ms <= 0.0 {
            return Err(AppError::InvalidTarget {
                what: "dive phase",
                value: self.phase_ms,
            });
        }
        Ok(())
    }

    fn value_at(&self, base: Complex, elapsed_ms: f64) -> Complex {
        let phases = elapsed_ms / self.phase_ms;
        let index = (phases.floor() as u64 % 4) as usize;
        let local = self.easing.apply(phases.fract());
        let stops = [base, self.a, base, self.b, base];
        stops[index].lerp(stops[index + 1], local)
    }
}

#[derive(Debug)]
struct Demo {
    presets: Vec<Preset>,
    settings: TravelSettings,
    dwell_ms: f64,
    next: usize,
    leg: Option<Leg>,
    /// Time at which the next leg may start.
    resume_at: f64,
}

#[derive(Debug)]
struct Leg {
    segments: Vec<Segment>,
    done: Vec<bool>,
    started_ms: f64,
}

impl Leg {
    fn new(segments: Vec<Segment>, started_ms: f64) -> Self {
        let done = vec![false; segments.len()];
        Self {
            segments,
            done,
            started_ms,
        }
    }
}

impl Demo {
    fn step(&mut self, now_ms: f64, r: &mut dyn FractalRenderer) {
        if self.leg.is_none() && now_ms >= self.resume_at {
            let preset = &self.presets[self.next];
            debug!(preset = %preset.name, "Demo travelling");
            self.leg = Some(Leg::new(presets::travel_to(preset, &self.settings), now_ms));
            self.next = (self.next + 1) % self.presets.len();
        }
        if let Some(leg) = self.leg.as_mut() {
            let elapsed = now_ms - leg.started_ms;
            if step_segments(&mut leg.segments, &mut leg.done, elapsed, r) {
                self.leg = None;
                self.resume_at = now_ms + self.dwell_ms;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Job {
    Segments { segments: Vec<Segment>, done: Vec<bool> },
    PaletteCycle { per_second: f32, last_ms: Option<f64> },
    Dive { dive: JuliaDive, base: Option<Complex> },
    Demo(Demo),
}

#[derive(Debug)]
struct Task {
    handle: AnimationHandle,
    job: Job,
    started_ms: Option<f64>,
}

impl Task {
    fn new(job: Job) -> Self {
        Self {
            handle: AnimationHandle::new(),
            job,
            started_ms: None,
        }
    }

    /// Returns `true` when the task has reached its end.
    fn step(&mut self, now_ms: f64, r: &mut dyn FractalRenderer) -> bool {
        let started = *self.started_ms.get_or_insert(now_ms);
        let elapsed = (now_ms - started).max(0.0);
        match &mut self.job {
            Job::Segments { segments, done } => step_segments(segments, done, elapsed, r),
            Job::PaletteCycle { per_second, last_ms } => {
                if let Some(last) = last_ms.replace(now_ms) {
                    let mut palette = r.view().palette();
                    palette.advance(*per_second * ((now_ms - last) / 1000.0) as f32);
                    r.set_palette(palette);
                }
                false
            }
            Job::Dive { dive, base } => {
                let base = *base.get_or_insert_with(|| r.view().julia_c());
                if let Err(e) = r.set_julia_c(dive.value_at(base, elapsed)) {
                    warn!(error = %e, "Julia dive step rejected");
                }
                false
            }
            Job::Demo(demo) => {
                demo.step(now_ms, r);
                false
            }
        }
    }

    /// `false` while a demo rests between legs.
    fn in_motion(&self) -> bool {
        match &self.job {
            Job::Demo(demo) => demo.leg.is_some(),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

/// What one [`Animator::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// `None` when nothing was animating or the draw failed.
    pub draw: Option<DrawReport>,
    /// Tasks resolved as finished by this tick.
    pub finished: usize,
    /// Tasks still running after this tick.
    pub active: usize,
}

/// Owns at most one motion task and one color task.
#[derive(Debug, Default)]
pub struct Animator {
    motion: Option<Task>,
    color: Option<Task>,
    /// The renderer has been told a continuous animation is running.
    continuous: bool,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.motion.is_none() && self.color.is_none()
    }

    /// Tween a single parameter.
    pub fn animate(
        &mut self,
        target: Target,
        duration_ms: f64,
        easing: Easing,
    ) -> Result<AnimationHandle, AppError> {
        self.animate_all(vec![Segment::new(target, duration_ms, easing)])
    }

    /// Run several segments together. Resolves once every segment is done.
    /// The task is a color task only if every segment moves the palette.
    pub fn animate_all(&mut self, segments: Vec<Segment>) -> Result<AnimationHandle, AppError> {
        if let Err(e) = segments.iter().try_for_each(Segment::validate) {
            warn!(error = %e, "Rejected animation");
            return Err(e);
        }
        let color_only = segments.iter().all(|s| s.target.class() == TaskClass::Color);
        let class = if !segments.is_empty() && color_only {
            TaskClass::Color
        } else {
            TaskClass::Motion
        };
        let done = vec![false; segments.len()];
        Ok(self.start(class, Job::Segments { segments, done }))
    }

    /// Travel to a preset: pan, zoom, rotation and optionally the Julia constant.
    pub fn travel_to(
        &mut self,
        preset: &Preset,
        settings: &TravelSettings,
    ) -> Result<AnimationHandle, AppError> {
        debug!(preset = %preset.name, "Travel started");
        self.animate_all(presets::travel_to(preset, settings))
    }

    /// Cycle the palette offset forever at `per_second` turns per second.
    pub fn cycle_palette(&mut self, per_second: f32) -> Result<AnimationHandle, AppError> {
        if !per_second.is_finite() {
            let e = AppError::InvalidTarget {
                what: "palette cycle speed",
                value: f64::from(per_second),
            };
            warn!(error = %e, "Rejected animation");
            return Err(e);
        }
        Ok(self.start(
            TaskClass::Color,
            Job::PaletteCycle {
                per_second,
                last_ms: None,
            },
        ))
    }

    /// Oscillate the Julia constant around its current value forever.
    pub fn julia_dive(&mut self, dive: JuliaDive) -> Result<AnimationHandle, AppError> {
        if let Err(e) = dive.validate() {
            warn!(error = %e, "Rejected animation");
            return Err(e);
        }
        Ok(self.start(TaskClass::Motion, Job::Dive { dive, base: None }))
    }

    /// Travel through `stops` in order, forever, resting `dwell_ms` at each.
    pub fn demo(
        &mut self,
        stops: Vec<Preset>,
        settings: TravelSettings,
        dwell_ms: f64,
    ) -> Result<AnimationHandle, AppError> {
        let check = || -> Result<(), AppError> {
            if stops.is_empty() {
                return Err(AppError::InvalidTarget {
                    what: "demo preset count",
                    value: 0.0,
                });
            }
            if !dwell_ms.is_finite() || dwell_ms < 0.0 {
                return Err(AppError::InvalidTarget {
                    what: "demo dwell",
                    value: dwell_ms,
                });
            }
            stops
                .iter()
                .flat_map(|p| presets::travel_to(p, &settings))
                .try_for_each(|s| s.validate())
        };
        if let Err(e) = check() {
            warn!(error = %e, "Rejected animation");
            return Err(e);
        }
        let demo = Demo {
            presets: stops,
            settings,
            dwell_ms,
            next: 0,
            leg: None,
            resume_at: f64::NEG_INFINITY,
        };
        Ok(self.start(TaskClass::Motion, Job::Demo(demo)))
    }

    /// Cancel every running task. The renderer is released at the next tick.
    pub fn cancel_all(&mut self) {
        for task in self.motion.iter().chain(self.color.iter()) {
            task.handle.cancel();
        }
    }

    fn start(&mut self, class: TaskClass, job: Job) -> AnimationHandle {
        let task = Task::new(job);
        let handle = task.handle.clone();
        let slot = match class {
            TaskClass::Motion => &mut self.motion,
            TaskClass::Color => &mut self.color,
        };
        if let Some(previous) = slot.replace(task) {
            debug!(?class, "Cancelling previous animation");
            previous.handle.cancel();
        }
        handle
    }

    /// Advance every task to `now_ms`, draw once, then resolve finished tasks.
    pub fn tick(&mut self, now_ms: f64, renderer: &mut dyn FractalRenderer) -> TickReport {
        for slot in [&mut self.motion, &mut self.color] {
            if slot.as_ref().is_some_and(|t| t.handle.is_cancelled()) {
                *slot = None;
            }
        }
        let had_work = !self.is_idle() || self.continuous;

        let motion_done = self.motion.as_mut().is_some_and(|t| t.step(now_ms, renderer));
        let color_done = self.color.as_mut().is_some_and(|t| t.step(now_ms, renderer));

        // Lowering the flag schedules the accurate rebuild for this draw.
        let moving = !motion_done && self.motion.as_ref().is_some_and(Task::in_motion);
        if moving != self.continuous {
            renderer.set_continuous_animation(moving);
            self.continuous = moving;
        }

        let draw = if had_work {
            match renderer.draw() {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(error = %e, "Draw failed during animation");
                    None
                }
            }
        } else {
            None
        };

        let mut finished = 0;
        for (slot, done) in [(&mut self.motion, motion_done), (&mut self.color, color_done)] {
            if done {
                if let Some(task) = slot.take() {
                    task.handle.finish();
                    finished += 1;
                }
            }
        }

        TickReport {
            draw,
            finished,
            active: usize::from(self.motion.is_some()) + usize::from(self.color.is_some()),
        }
    }
}
