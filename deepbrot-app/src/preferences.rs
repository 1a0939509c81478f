use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use deepbrot_core::{Complex, ViewSnapshot};
use deepbrot_render::EngineConfig;

use crate::animation::JuliaDive;
use crate::easing::Easing;
use crate::error::AppError;
use crate::presets::TravelSettings;

// ---------------------------------------------------------------------------
// Application preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppPreferences {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Iteration budget, rebase thresholds, reference search and precision floor.
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub travel: TravelSettings,
    /// Palette turns per second while cycling.
    #[serde(default = "default_palette_cycle_speed")]
    pub palette_cycle_speed: f32,

    // Julia dive
    #[serde(default = "default_dive_a")]
    pub dive_a: Complex,
    #[serde(default = "default_dive_b")]
    pub dive_b: Complex,
    /// Length of each of the four dive phases.
    #[serde(default = "default_dive_phase_ms")]
    pub dive_phase_ms: f64,
    #[serde(default = "default_dive_easing")]
    pub dive_easing: Easing,

    /// Pause at each stop of demo mode.
    #[serde(default = "default_demo_dwell_ms")]
    pub demo_dwell_ms: f64,

    #[serde(default = "default_true")]
    pub restore_last_view: bool,
    #[serde(default)]
    pub last_view: Option<ViewSnapshot>,
}

fn default_viewport_width() -> u32 {
    1280
}
fn default_viewport_height() -> u32 {
    720
}
fn default_palette_cycle_speed() -> f32 {
    0.1
}
fn default_dive_a() -> Complex {
    Complex::new(-0.75, 0.11)
}
fn default_dive_b() -> Complex {
    Complex::new(-0.8, 0.156)
}
fn default_dive_phase_ms() -> f64 {
    4000.0
}
fn default_dive_easing() -> Easing {
    Easing::SineInOut
}
fn default_demo_dwell_ms() -> f64 {
    1500.0
}
fn default_true() -> bool {
    true
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            engine: EngineConfig::default(),
            travel: TravelSettings::default(),
            palette_cycle_speed: default_palette_cycle_speed(),
            dive_a: default_dive_a(),
            dive_b: default_dive_b(),
            dive_phase_ms: default_dive_phase_ms(),
            dive_easing: default_dive_easing(),
            demo_dwell_ms: default_demo_dwell_ms(),
            restore_last_view: true,
            last_view: None,
        }
    }
}

impl AppPreferences {
    pub fn julia_dive(&self) -> JuliaDive {
        JuliaDive {
            a: self.dive_a,
            b: self.dive_b,
            phase_ms: self.dive_phase_ms,
            easing: self.dive_easing,
        }
    }

    /// Load preferences from next to the executable, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            debug!("No preferences file at {}", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(prefs) => {
                info!("Loaded preferences from {}", path.display());
                prefs
            }
            Err(e) => {
                error!("Failed to load preferences: {e}");
                Self::default()
            }
        }
    }

    /// Persist preferences to disk.
    pub fn save(&self) {
        match self.save_to(&config_path()) {
            Ok(()) => debug!("Saved preferences"),
            Err(e) => error!("Failed to save preferences: {e}"),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let json = fs::read_to_string(path)?;
        let prefs: Self = serde_json::from_str(&json)?;
        prefs.engine.validate()?;
        Ok(prefs)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn config_path() -> PathBuf {
    crate::app_dir::preferences_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepbrot_core::{ComplexDD, DoubleDouble, FractalKind, ViewState};

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("deepbrot-prefs-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn empty_object_gives_defaults() {
        let prefs: AppPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, AppPreferences::default());
        assert_eq!(prefs.dive_easing, Easing::SineInOut);
        assert!(prefs.restore_last_view);
    }

    #[test]
    fn round_trip_preserves_dd_pan_bits() {
        let mut view = ViewState::default();
        view.set_pan_dd(ComplexDD::new(
            DoubleDouble::new(-0.743_643_887_037_158_7, -3.628_952_515_063_387e-17),
            DoubleDouble::new(0.131_825_904_205_311_98, 7.1e-21),
        ))
        .unwrap();
        let prefs = AppPreferences {
            last_view: Some(view.snapshot(FractalKind::Mandelbrot)),
            palette_cycle_speed: 0.25,
            ..AppPreferences::default()
        };

        let path = temp_file("round_trip.json");
        prefs.save_to(&path).unwrap();
        let back = AppPreferences::load_from(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(back, prefs);
        let pan = back.last_view.unwrap().pan();
        assert_eq!(pan.im.lo.to_bits(), 7.1e-21f64.to_bits());
        assert_eq!(pan, view.pan_dd());
    }

    #[test]
    fn invalid_engine_config_is_an_error() {
        let path = temp_file("invalid.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"engine":{"rebase":{"on":0.5,"off":0.9}}}"#).unwrap();
        let result = AppPreferences::load_from(&path);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_json_is_reported() {
        let path = temp_file("malformed.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        let result = AppPreferences::load_from(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(AppError::Json(_))));
    }
}
