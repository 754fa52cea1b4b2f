/// Per-frame render configuration and its derived matrices
use std::fmt;
use std::str::FromStr;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RenderSettings;
use crate::transform::Transform;

const MIN_FOV_DEGREES: f32 = 1.0;
const MAX_FOV_DEGREES: f32 = 179.0;
const MIN_NEAR: f32 = 1e-3;

/// How surviving faces are turned into draw commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Depth-shaded edges.
    Wireframe,
    /// One lit colour per face.
    #[default]
    Flat,
    /// Per-vertex shading. Not implemented; renders as [`RenderMode::Flat`].
    Gouraud,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Wireframe, RenderMode::Flat, RenderMode::Gouraud];

    pub fn name(&self) -> &'static str {
        match self {
            RenderMode::Wireframe => "wireframe",
            RenderMode::Flat => "flat",
            RenderMode::Gouraud => "gouraud",
        }
    }

    /// The mode after this one in [`RenderMode::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wire" | "wireframe" => Ok(RenderMode::Wireframe),
            "flat" => Ok(RenderMode::Flat),
            "gouraud" => Ok(RenderMode::Gouraud),
            other => Err(format!("unknown render mode '{other}'")),
        }
    }
}

/// Render configuration read by the pipeline.
///
/// Projection parameters are private so that every change goes through a
/// setter that rebuilds the cached projection matrix. The viewport is fixed
/// at construction; a resized window needs a new context.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub mode: RenderMode,
    pub backface_culling: bool,
    pub viewport_culling: bool,
    pub z_sorting: bool,
    pub depth_shading: bool,
    pub show_normals: bool,
    /// Front faces are wound counter-clockwise as seen by the viewer.
    pub ccw_normals: bool,
    pub normal_length: f32,
    fov: f32,
    z_near: f32,
    z_far: f32,
    aspect: f32,
    width: f32,
    height: f32,
    projection: Matrix4<f32>,
    viewport: Matrix4<f32>,
}

impl RenderContext {
    /// Context for a `width` x `height` screen with default settings.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_settings(&RenderSettings::default(), width, height)
    }

    pub fn from_settings(settings: &RenderSettings, width: u32, height: u32) -> Self {
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        let mut ctx = Self {
            mode: settings.mode,
            backface_culling: settings.backface_culling,
            viewport_culling: settings.viewport_culling,
            z_sorting: settings.z_sorting,
            depth_shading: settings.depth_shading,
            show_normals: settings.show_normals,
            ccw_normals: settings.ccw_normals,
            normal_length: settings.normal_length,
            fov: clamp_fov(settings.fov_degrees.to_radians()),
            z_near: settings.z_near.max(MIN_NEAR),
            z_far: settings.z_far,
            aspect: width / height,
            width,
            height,
            projection: Transform::identity(),
            viewport: Transform::viewport(width, height),
        };
        ctx.z_far = ctx.z_far.max(ctx.z_near * 2.0);
        ctx.update_projection();
        ctx
    }

    /// Current toggles and projection parameters, e.g. to rebuild the
    /// context for a new screen size.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            mode: self.mode,
            fov_degrees: self.fov_degrees(),
            z_near: self.z_near,
            z_far: self.z_far,
            backface_culling: self.backface_culling,
            viewport_culling: self.viewport_culling,
            z_sorting: self.z_sorting,
            depth_shading: self.depth_shading,
            show_normals: self.show_normals,
            ccw_normals: self.ccw_normals,
            normal_length: self.normal_length,
        }
    }

    fn update_projection(&mut self) {
        self.projection = Transform::perspective(self.fov, self.aspect, self.z_near, self.z_far);
        debug!(
            fov = self.fov.to_degrees(),
            near = self.z_near,
            far = self.z_far,
            aspect = self.aspect,
            "Rebuilt projection matrix"
        );
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Set the vertical field of view in radians, kept within 1..179 degrees.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = clamp_fov(fov);
        self.update_projection();
    }

    pub fn set_fov_degrees(&mut self, degrees: f32) {
        self.set_fov(degrees.to_radians());
    }

    /// Set the near plane. It stays positive and in front of the far plane.
    pub fn set_z_near(&mut self, z_near: f32) {
        self.z_near = z_near.max(MIN_NEAR).min(self.z_far * 0.5);
        self.update_projection();
    }

    /// Set the far plane. It stays beyond the near plane.
    pub fn set_z_far(&mut self, z_far: f32) {
        self.z_far = z_far.max(self.z_near * 2.0);
        self.update_projection();
    }

    /// Override the aspect ratio, e.g. to account for non-square pixels.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
            self.update_projection();
        }
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn viewport(&self) -> &Matrix4<f32> {
        &self.viewport
    }

    /// View space straight to (pre-divide) screen space.
    pub fn view_to_screen(&self) -> Matrix4<f32> {
        Transform::compose(&[self.projection, self.viewport])
    }
}

fn clamp_fov(fov: f32) -> f32 {
    if fov.is_finite() {
        fov.clamp(MIN_FOV_DEGREES.to_radians(), MAX_FOV_DEGREES.to_radians())
    } else {
        std::f32::consts::FRAC_PI_2
    }
}
