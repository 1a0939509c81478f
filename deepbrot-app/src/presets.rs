use serde::{Deserialize, Serialize};

use deepbrot_core::{Complex, ComplexDD, DoubleDouble};

use crate::animation::{Segment, Target};
use crate::easing::Easing;
use crate::error::AppError;

/// A named place to travel to. The pan carries both DD words so deep
/// locations survive the trip through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub pan_re: f64,
    #[serde(default)]
    pub pan_re_lo: f64,
    pub pan_im: f64,
    #[serde(default)]
    pub pan_im_lo: f64,
    pub zoom: f64,
    #[serde(default)]
    pub rotation: f64,
    /// Julia constant to animate towards, if any.
    #[serde(default)]
    pub julia_c: Option<Complex>,
}

impl Preset {
    pub fn pan(&self) -> ComplexDD {
        ComplexDD::new(
            DoubleDouble::new(self.pan_re, self.pan_re_lo),
            DoubleDouble::new(self.pan_im, self.pan_im_lo),
        )
    }
}

fn preset(name: &str, re: (f64, f64), im: (f64, f64), zoom: f64, rotation: f64) -> Preset {
    Preset {
        name: name.to_string(),
        pan_re: re.0,
        pan_re_lo: re.1,
        pan_im: im.0,
        pan_im_lo: im.1,
        zoom,
        rotation,
        julia_c: None,
    }
}

/// Locations shipped with the app.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        preset("home", (-0.5, 0.0), (0.0, 0.0), 1.02, 0.0),
        preset(
            "seahorse-valley",
            (-0.743_643_887_037_158_7, -3.628_952_515_063_387e-17),
            (0.131_825_904_205_311_98, -1.289_280_775_495_667_5e-17),
            2.5e-14,
            0.0,
        ),
        preset("elephant-valley", (0.292_575_5, 0.0), (-0.014_997_7, 0.0), 2e-4, 0.0),
        preset("triple-spiral", (-0.088, 0.0), (0.654, 0.0), 1.5e-2, 0.6),
        preset("mini-brot", (-1.768_778_833, 0.0), (-0.001_738_996, 0.0), 4e-9, 0.0),
        Preset {
            julia_c: Some(Complex::new(-0.8, 0.156)),
            ..preset("dendrite-julia", (0.0, 0.0), (0.0, 0.0), 1.4, 0.0)
        },
    ]
}

/// Durations of the parallel legs of a preset trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelSettings {
    pub pan_ms: f64,
    pub zoom_ms: f64,
    pub rotation_ms: f64,
    pub julia_c_ms: f64,
    pub easing: Easing,
}

impl Default for TravelSettings {
    fn default() -> Self {
        Self {
            pan_ms: 2500.0,
            zoom_ms: 3000.0,
            rotation_ms: 2000.0,
            julia_c_ms: 2000.0,
            easing: Easing::QuinticInOut,
        }
    }
}

/// The segments of a trip to `preset`, all starting together.
pub fn travel_to(preset: &Preset, settings: &TravelSettings) -> Vec<Segment> {
    let mut segments = vec![
        Segment::new(Target::Pan(preset.pan()), settings.pan_ms, settings.easing),
        Segment::new(Target::Zoom(preset.zoom), settings.zoom_ms, settings.easing),
        Segment::new(Target::Rotation(preset.rotation), settings.rotation_ms, settings.easing),
    ];
    if let Some(c) = preset.julia_c {
        segments.push(Segment::new(Target::JuliaC(c), settings.julia_c_ms, settings.easing));
    }
    segments
}

/// Look up a built-in preset by name.
pub fn find(name: &str) -> Result<Preset, AppError> {
    builtin_presets()
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| AppError::UnknownPreset(name.to_string()))
}
