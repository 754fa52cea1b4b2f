/// Scene lighting
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::GeometryResult;
use crate::transform::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Directional,
    /// Accepted but shaded as directional.
    Point,
    /// Accepted but shaded as directional.
    Diffuse,
}

/// A light with a unit direction in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightType,
    direction: Vector3<f32>,
}

impl Light {
    pub fn new(kind: LightType, direction: Vector3<f32>) -> GeometryResult<Self> {
        Ok(Self {
            kind,
            direction: normalize(&direction)?,
        })
    }

    pub fn directional(direction: Vector3<f32>) -> GeometryResult<Self> {
        Self::new(LightType::Directional, direction)
    }

    /// Unit direction from the lit surfaces towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightType::Directional,
            direction: Vector3::new(0.0, 0.0, -1.0),
        }
    }
}
