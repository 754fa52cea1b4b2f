/// SW3D Core Library - Software 3D rendering pipeline
///
/// This library holds the renderer-independent core: the linear algebra
/// kernel, the polygon mesh model, the camera and light, and the pipeline
/// that turns a mesh into back-to-front draw commands for any 2D surface.
/// OBJ and Quake MAP loaders and JSON settings live here too.

pub mod camera;
pub mod config;
pub mod context;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod light;
pub mod map;
pub mod obj;
pub mod pipeline;
pub mod transform;

// Re-export commonly used types
pub use camera::Camera;
pub use config::Settings;
pub use context::{RenderContext, RenderMode};
pub use draw::{Color, DrawCommand, DrawSurface};
pub use error::{ConfigError, GeometryError, LoadError};
pub use geometry::Mesh;
pub use light::{Light, LightType};
pub use pipeline::{build_draw_list, FrameStats, RenderSurface, Scene};
pub use transform::{ModelTransform, RotationState, Transform};
