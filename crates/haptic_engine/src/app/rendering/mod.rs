mod transform;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::telemetry::EntityCandidate;

pub use transform::{
    project, ProjectionConfig, Viewport, DEFAULT_DEPTH_EPSILON, DEFAULT_PROJECTION_FOV_DEGREES,
};

pub const MARKER_HALF_SIZE: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Drawing surface for the optional overlay.
pub trait OverlayRenderer: Send {
    fn find_surface(&mut self, title: &str) -> Option<SurfaceId>;

    fn draw_box(&mut self, surface: SurfaceId, center_x: f64, center_y: f64, half_size: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub surface_title: String,
    pub projection: ProjectionConfig,
    pub viewport: Viewport,
    pub marker_half_size: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            surface_title: String::new(),
            projection: ProjectionConfig::default(),
            viewport: Viewport::default(),
            marker_half_size: MARKER_HALF_SIZE,
        }
    }
}

/// Draws one box per candidate. Returns how many boxes were drawn; zero when
/// the surface cannot be found.
pub fn draw_markers(
    renderer: &mut dyn OverlayRenderer,
    config: &OverlayConfig,
    candidates: &[EntityCandidate],
) -> usize {
    let Some(surface) = renderer.find_surface(&config.surface_title) else {
        debug!(title = %config.surface_title, "overlay_surface_missing");
        return 0;
    };
    for candidate in candidates {
        let screen = project(candidate.position, config.projection, config.viewport);
        renderer.draw_box(surface, screen.x, screen.y, config.marker_half_size);
    }
    candidates.len()
}
