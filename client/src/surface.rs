//! Rendering boundary.
//!
//! Turning a point list into pixels is out of scope for the sync client;
//! anything that can draw a polyline plugs in behind this trait.

use protocol::Point;

pub trait Surface: Send {
    /// Render one committed stroke from its immutable point list.
    fn draw_stroke(&mut self, points: &[Point], color: &str, line_width: f64);

    /// Wipe the whole canvas.
    fn clear(&mut self);
}

/// Surface that logs applied actions instead of drawing. CLI default.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceSurface;

impl Surface for TraceSurface {
    fn draw_stroke(&mut self, points: &[Point], color: &str, line_width: f64) {
        tracing::info!(points = points.len(), color, line_width, "stroke applied");
    }

    fn clear(&mut self) {
        tracing::info!("canvas cleared");
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
