//! Drawing Surfaces
//!
//! [`OverlaySurface`] is the seam between the overlay logic and whatever
//! actually holds pixels: a 2D canvas context on the web, a GPU layer on
//! desktop. [`RecordingSurface`] records the calls as [`DrawCommand`]s; the
//! desktop renderer replays them and tests inspect them.

use crate::brush::StrokeStyle;
use crate::color::Rgba8;
use crate::geometry::{Point, SurfaceSize};

/// A transparent drawable layer
pub trait OverlaySurface {
    /// Current backing-store size in pixels
    fn size(&self) -> SurfaceSize;

    /// Resize the backing store; contents are lost
    fn resize(&mut self, size: SurfaceSize);

    /// Clear every pixel to transparent
    fn clear(&mut self);

    /// Stroke a connected polyline with round caps and joins
    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle);

    /// Fill a circle; `alpha` multiplies the color's own alpha
    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba8, alpha: f32);

    /// Fade existing content toward transparent by `alpha`
    fn fade(&mut self, alpha: f32);

    /// Stroke a single segment
    fn stroke_segment(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        self.stroke_polyline(&[from, to], style);
    }
}

/// One recorded surface call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Resize(SurfaceSize),
    Clear,
    Polyline { points: Vec<Point>, style: StrokeStyle },
    Circle { center: Point, radius: f32, color: Rgba8, alpha: f32 },
    Fade { alpha: f32 },
}

/// A surface that records commands instead of rasterizing them
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    size: SurfaceSize,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self { size, commands: Vec::new() }
    }

    /// Commands recorded since the last take
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hand recorded commands to a rasterizer, leaving the list empty
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Polylines painted since the most recent clear or resize
    ///
    /// This is what the surface currently shows, as long as the commands
    /// have not been taken since that clear.
    pub fn visible_polylines(&self) -> Vec<&[Point]> {
        let start = self
            .commands
            .iter()
            .rposition(|c| matches!(c, DrawCommand::Clear | DrawCommand::Resize(_)))
            .map_or(0, |i| i + 1);
        self.commands[start..]
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { points, .. } => Some(points.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl OverlaySurface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.commands.push(DrawCommand::Resize(size));
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        if points.is_empty() {
            return;
        }
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba8, alpha: f32) {
        self.commands.push(DrawCommand::Circle { center, radius, color, alpha });
    }

    fn fade(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Fade { alpha });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_polylines_start_after_last_clear() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(10, 10));
        let style = StrokeStyle::default();
        surface.stroke_segment(Point::new(0.0, 0.0), Point::new(1.0, 1.0), &style);
        surface.clear();
        surface.stroke_segment(Point::new(2.0, 2.0), Point::new(3.0, 3.0), &style);

        let visible = surface.visible_polylines();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0], &[Point::new(2.0, 2.0), Point::new(3.0, 3.0)]);
    }

    #[test]
    fn take_commands_drains() {
        let mut surface = RecordingSurface::default();
        surface.resize(SurfaceSize::new(4, 4));
        surface.fade(0.1);
        assert_eq!(surface.take_commands().len(), 2);
        assert!(surface.commands().is_empty());
        assert_eq!(surface.size(), SurfaceSize::new(4, 4));
    }
}
