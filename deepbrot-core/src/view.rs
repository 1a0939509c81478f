use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::complex_dd::ComplexDD;
use crate::double_double::DoubleDouble;
use crate::error::CoreError;
use crate::fractal::FractalKind;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Palette selection plus the cyclic offset animated by palette cycling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PaletteState {
    pub index: u32,
    /// Always in `[0, 1)`.
    pub offset: f32,
}

impl PaletteState {
    pub fn new(index: u32, offset: f32) -> Self {
        Self {
            index,
            offset: wrap_unit(offset),
        }
    }

    /// Shift the offset, wrapping around.
    pub fn advance(&mut self, delta: f32) {
        self.offset = wrap_unit(self.offset + delta);
    }

    pub fn set_offset(&mut self, offset: f32) {
        self.offset = wrap_unit(offset);
    }
}

fn wrap_unit(v: f32) -> f32 {
    if !v.is_finite() {
        return 0.0;
    }
    let w = v.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs.
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

// ---------------------------------------------------------------------------
// Live view state
// ---------------------------------------------------------------------------

/// Authoritative view parameters owned by a renderer.
///
/// The pan is kept twice: a `ComplexDD` that receives every incremental
/// update, and a plain mirror refreshed from it after each update.
#[derive(Debug, Clone)]
pub struct ViewState {
    pan: ComplexDD,
    pan_plain: Complex,
    zoom: f64,
    rotation: f64,
    julia_c: Complex,
    palette: PaletteState,
    extra_iterations: i32,
}

impl ViewState {
    pub const DEFAULT_ZOOM: f64 = 1.02;

    pub fn new(pan: ComplexDD, zoom: f64) -> Self {
        Self {
            pan,
            pan_plain: pan.value(),
            zoom,
            ..Self::default()
        }
    }

    pub fn pan(&self) -> Complex {
        self.pan_plain
    }

    pub fn pan_dd(&self) -> ComplexDD {
        self.pan
    }

    pub fn set_pan_dd(&mut self, pan: ComplexDD) -> crate::Result<()> {
        ensure_finite("pan", pan.value())?;
        self.pan = pan;
        self.pan_plain = pan.value();
        Ok(())
    }

    /// Move the pan by a plain offset without losing the DD low words.
    pub fn offset_pan(&mut self, delta: Complex) -> crate::Result<()> {
        ensure_finite("pan delta", delta)?;
        self.pan.add_f64(delta);
        self.pan_plain = self.pan.value();
        Ok(())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped below at `min_zoom`. Returns `true` if clamped.
    pub fn set_zoom(&mut self, zoom: f64, min_zoom: f64) -> crate::Result<bool> {
        if !zoom.is_finite() {
            return Err(CoreError::NonFinite { what: "zoom", value: zoom });
        }
        let clamped = zoom < min_zoom;
        self.zoom = zoom.max(min_zoom);
        Ok(clamped)
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Set the rotation in radians, normalised into `[0, 2π)`.
    pub fn set_rotation(&mut self, rotation: f64) -> crate::Result<()> {
        if !rotation.is_finite() {
            return Err(CoreError::NonFinite {
                what: "rotation",
                value: rotation,
            });
        }
        self.rotation = rotation.rem_euclid(std::f64::consts::TAU);
        Ok(())
    }

    pub fn julia_c(&self) -> Complex {
        self.julia_c
    }

    pub fn set_julia_c(&mut self, c: Complex) -> crate::Result<()> {
        ensure_finite("julia c", c)?;
        self.julia_c = c;
        Ok(())
    }

    pub fn palette(&self) -> PaletteState {
        self.palette
    }

    pub fn palette_mut(&mut self) -> &mut PaletteState {
        &mut self.palette
    }

    pub fn extra_iterations(&self) -> i32 {
        self.extra_iterations
    }

    pub fn set_extra_iterations(&mut self, extra: i32) {
        self.extra_iterations = extra;
    }

    pub fn snapshot(&self, kind: FractalKind) -> ViewSnapshot {
        ViewSnapshot {
            kind,
            pan_re: self.pan.re.hi,
            pan_re_lo: self.pan.re.lo,
            pan_im: self.pan.im.hi,
            pan_im_lo: self.pan.im.lo,
            zoom: self.zoom,
            rotation: self.rotation,
            julia_c_re: self.julia_c.re,
            julia_c_im: self.julia_c.im,
            palette_index: self.palette.index,
            palette_offset: self.palette.offset,
            extra_iterations: self.extra_iterations,
        }
    }

    /// Rebuild a view from a snapshot, validating every field.
    pub fn from_snapshot(snap: &ViewSnapshot, min_zoom: f64) -> crate::Result<Self> {
        let mut view = Self::default();
        view.set_pan_dd(snap.pan())?;
        view.set_zoom(snap.zoom, min_zoom)?;
        view.set_rotation(snap.rotation)?;
        view.set_julia_c(Complex::new(snap.julia_c_re, snap.julia_c_im))?;
        view.palette = PaletteState::new(snap.palette_index, snap.palette_offset);
        view.extra_iterations = snap.extra_iterations;
        Ok(view)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        let pan = ComplexDD::from(Complex::new(-0.5, 0.0));
        Self {
            pan,
            pan_plain: pan.value(),
            zoom: Self::DEFAULT_ZOOM,
            rotation: 0.0,
            julia_c: Complex::new(-0.7, 0.27015),
            palette: PaletteState::default(),
            extra_iterations: 0,
        }
    }
}

fn ensure_finite(what: &'static str, c: Complex) -> crate::Result<()> {
    if c.re.is_finite() && c.im.is_finite() {
        Ok(())
    } else {
        let value = if c.re.is_finite() { c.im } else { c.re };
        Err(CoreError::NonFinite { what, value })
    }
}

// ---------------------------------------------------------------------------
// Serializable snapshot
// ---------------------------------------------------------------------------

/// Everything needed to restore a view, with the pan at full DD precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    #[serde(default)]
    pub kind: FractalKind,
    pub pan_re: f64,
    /// Low-order word of the DD real pan.
    #[serde(default)]
    pub pan_re_lo: f64,
    pub pan_im: f64,
    /// Low-order word of the DD imaginary pan.
    #[serde(default)]
    pub pan_im_lo: f64,
    pub zoom: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub julia_c_re: f64,
    #[serde(default)]
    pub julia_c_im: f64,
    #[serde(default)]
    pub palette_index: u32,
    #[serde(default)]
    pub palette_offset: f32,
    #[serde(default)]
    pub extra_iterations: i32,
}

impl ViewSnapshot {
    pub fn pan(&self) -> ComplexDD {
        ComplexDD::new(
            DoubleDouble::new(self.pan_re, self.pan_re_lo),
            DoubleDouble::new(self.pan_im, self.pan_im_lo),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pan_mirrors_dd_after_updates() {
        let mut v = ViewState::default();
        for _ in 0..1000 {
            v.offset_pan(Complex::new(1e-19, -3e-19)).unwrap();
            assert_eq!(v.pan(), v.pan_dd().value());
        }
    }

    #[test]
    fn zoom_clamps_at_minimum() {
        let mut v = ViewState::default();
        assert!(!v.set_zoom(1e-10, 1e-17).unwrap());
        assert_eq!(v.zoom(), 1e-10);
        assert!(v.set_zoom(1e-20, 1e-17).unwrap());
        assert_eq!(v.zoom(), 1e-17);
        assert!(v.set_zoom(f64::NAN, 1e-17).is_err());
        assert_eq!(v.zoom(), 1e-17);
    }

    #[test]
    fn rotation_wraps() {
        let mut v = ViewState::default();
        v.set_rotation(-std::f64::consts::FRAC_PI_2).unwrap();
        assert!((v.rotation() - 1.5 * std::f64::consts::PI).abs() < 1e-12);
        assert!(v.set_rotation(f64::INFINITY).is_err());
    }

    #[test]
    fn non_finite_pan_rejected() {
        let mut v = ViewState::default();
        let before = v.pan_dd();
        assert!(v.offset_pan(Complex::new(f64::NAN, 0.0)).is_err());
        assert_eq!(v.pan_dd(), before);
    }

    #[test]
    fn palette_offset_wraps() {
        let mut p = PaletteState::default();
        p.advance(0.75);
        p.advance(0.5);
        assert!((p.offset - 0.25).abs() < 1e-6);
        p.advance(-0.5);
        assert!((p.offset - 0.75).abs() < 1e-6);
        p.set_offset(f32::NAN);
        assert_eq!(p.offset, 0.0);
    }

    #[test]
    fn snapshot_round_trips_dd_bits_through_json() {
        let mut v = ViewState::default();
        v.set_pan_dd(ComplexDD::new(
            DoubleDouble::new(-0.743_643_887_037_158_7, 1.3e-20),
            DoubleDouble::new(0.131_825_904_205_311_97, -4.2e-21),
        ))
        .unwrap();
        v.set_zoom(3.5e-15, 1e-17).unwrap();
        v.palette_mut().index = 3;
        let snap = v.snapshot(FractalKind::Julia);
        let json = serde_json::to_string(&snap).unwrap();
        let back: ViewSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.pan().re.lo.to_bits(), (1.3e-20f64).to_bits());

        let restored = ViewState::from_snapshot(&back, 1e-17).unwrap();
        assert_eq!(restored.pan_dd(), v.pan_dd());
        assert_eq!(restored.zoom(), 3.5e-15);
        assert_eq!(restored.palette().index, 3);
    }

    #[test]
    fn snapshot_without_low_words_still_loads() {
        let snap: ViewSnapshot =
            serde_json::from_str(r#"{"pan_re":-0.5,"pan_im":0.0,"zoom":1.02}"#).unwrap();
        assert_eq!(snap.pan_re_lo, 0.0);
        assert_eq!(snap.kind, FractalKind::Mandelbrot);
    }
}
