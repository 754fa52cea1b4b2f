/// Renderer settings
///
/// Settings load from JSON with a default for every field, so a partial
/// file only overrides what it names.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::RenderMode;
use crate::error::ConfigError;

/// Root settings for the renderer front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Camera movement and look speeds.
    #[serde(default)]
    pub camera: CameraSettings,
    /// Initial render configuration.
    #[serde(default)]
    pub render: RenderSettings,
    /// Swap OBJ y/z on load (y' = -z, z' = y) for z-up exporters.
    #[serde(default = "default_exchange_axes")]
    pub exchange_axes: bool,
    /// Directories scanned for `.obj` models.
    #[serde(default = "default_model_dirs")]
    pub model_dirs: Vec<PathBuf>,
}

fn default_exchange_axes() -> bool {
    true
}

fn default_model_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("assets/demo_objects"), PathBuf::from("assets/quake_objs")]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            render: RenderSettings::default(),
            exchange_axes: default_exchange_axes(),
            model_dirs: default_model_dirs(),
        }
    }
}

/// Camera control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// World units moved per key press.
    pub cam_speed: f32,
    /// Radians turned per key press.
    pub cam_sensitivity: f32,
    /// Scale applied to mouse deltas.
    pub mouse_sensitivity: f32,
    /// Margin kept from straight up/down, in degrees.
    pub pitch_clamp_degrees: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            cam_speed: 0.1,
            cam_sensitivity: 0.1 / 2.0 / std::f32::consts::PI,
            mouse_sensitivity: 1.2,
            pitch_clamp_degrees: 1.0,
        }
    }
}

/// Initial values for the render context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub mode: RenderMode,
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub backface_culling: bool,
    pub viewport_culling: bool,
    pub z_sorting: bool,
    pub depth_shading: bool,
    pub show_normals: bool,
    pub ccw_normals: bool,
    /// Length of the normal overlay, in view-space units.
    pub normal_length: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::Flat,
            fov_degrees: 90.0,
            z_near: 0.5,
            z_far: 100.0,
            backface_culling: true,
            viewport_culling: true,
            z_sorting: true,
            depth_shading: false,
            show_normals: false,
            ccw_normals: true,
            normal_length: 0.25,
        }
    }
}

impl Settings {
    /// Parses settings from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Reads and parses a settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// All `.obj` files in the model directories, sorted by path.
    ///
    /// Missing or unreadable directories are skipped with a warning.
    pub fn list_models(&self) -> Vec<PathBuf> {
        let mut models = Vec::new();
        for dir in &self.model_dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping model directory");
                    continue;
                }
            };
            models.extend(entries.filter_map(Result::ok).map(|e| e.path()).filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("obj"))
            }));
        }
        models.sort();
        models
    }
}
