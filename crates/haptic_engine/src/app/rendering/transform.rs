use serde::{Deserialize, Serialize};

use crate::math::{Vec2, Vec3};

pub const DEFAULT_PROJECTION_FOV_DEGREES: f64 = 90.0;
pub const DEFAULT_DEPTH_EPSILON: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fov_degrees: f64,
    pub depth_epsilon: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: DEFAULT_PROJECTION_FOV_DEGREES,
            depth_epsilon: DEFAULT_DEPTH_EPSILON,
        }
    }
}

/// Pinhole-style projection that treats world coordinates as camera space and
/// pads depth by `depth_epsilon`. Not a real camera transform.
pub fn project(position: Vec3, projection: ProjectionConfig, viewport: Viewport) -> Vec2 {
    let focal_length = 1.0 / (projection.fov_degrees.to_radians() / 2.0).tan();
    let depth = position.z + projection.depth_epsilon;
    let half_width = f64::from(viewport.width) / 2.0;
    let half_height = f64::from(viewport.height) / 2.0;
    Vec2 {
        x: position.x * focal_length / depth * half_width + half_width,
        y: -position.y * focal_length / depth * half_height + half_height,
    }
}
