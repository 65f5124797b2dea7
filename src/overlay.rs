//! Overlay Renderer
//!
//! The two drawing paths for the drawing overlay: an O(1) incremental segment
//! while a stroke is in progress, and a full redraw that replays the store
//! after anything invalidates the surface (resize, page change, expiry,
//! clear).

use crate::brush::StrokeStyle;
use crate::geometry::Point;
use crate::store::StrokeStore;
use crate::surface::OverlaySurface;

/// Append one segment of the active stroke
pub fn draw_segment<S: OverlaySurface + ?Sized>(surface: &mut S, from: Point, to: Point, style: &StrokeStyle) {
    surface.stroke_segment(from, to, style);
}

/// Clear the surface and replay every stored stroke in order
pub fn redraw<S: OverlaySurface + ?Sized>(surface: &mut S, store: &StrokeStore, style: &StrokeStyle) {
    surface.clear();
    for stroke in store {
        surface.stroke_polyline(stroke.points(), style);
    }
    log::debug!(
        "Full redraw: {} strokes, {} points at {:?}",
        store.len(),
        store.point_count(),
        surface.size()
    );
}
