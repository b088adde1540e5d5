use haptic_engine::{OverlayRenderer, SurfaceId};
use tracing::{debug, info};

/// Overlay stand-in that reports markers through tracing instead of drawing.
/// Any non-empty title resolves to the same surface.
#[derive(Debug, Default)]
pub(crate) struct LogOverlay {
    announced: Option<String>,
    boxes_drawn: u64,
}

impl OverlayRenderer for LogOverlay {
    fn find_surface(&mut self, title: &str) -> Option<SurfaceId> {
        if title.trim().is_empty() {
            return None;
        }
        if self.announced.as_deref() != Some(title) {
            info!(title, "overlay_surface_found");
            self.announced = Some(title.to_string());
        }
        Some(SurfaceId(0))
    }

    fn draw_box(&mut self, surface: SurfaceId, center_x: f64, center_y: f64, half_size: f64) {
        self.boxes_drawn = self.boxes_drawn.saturating_add(1);
        debug!(
            surface = surface.0,
            x = center_x,
            y = center_y,
            half_size,
            total = self.boxes_drawn,
            "overlay_box"
        );
    }
}
