//! Stroke Style and Brush Dabs
//!
//! This module defines the stroke style set from the page's color/width
//! inputs and turns polylines into evenly spaced circular dabs for the GPU
//! renderer. A line of overlapping round dabs gives round caps and joins
//! without any tessellation.

use crate::color::Rgba8;
use crate::error::{OverlayError, Result};
use crate::geometry::Point;

/// Allowed stroke width range in pixels (mirrors the width input)
pub const MIN_STROKE_WIDTH: f32 = 1.0;
pub const MAX_STROKE_WIDTH: f32 = 64.0;

/// Dab spacing as a fraction of the stroke width
const SPACING_RATIO: f32 = 0.25;

/// Parameters that define how strokes look
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// Stroke color (sRGB)
    pub color: Rgba8,
    /// Line width in pixels
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: Rgba8, width: f32) -> Self {
        Self { color, width }
    }

    /// Build a style from the raw values of the color and width inputs
    pub fn from_inputs(color: &str, width: &str) -> Result<Self> {
        let color = Rgba8::parse_hex(color)?;
        let width: f32 = width
            .trim()
            .parse()
            .map_err(|_| OverlayError::InvalidStyle(format!("width '{}' is not a number", width.trim())))?;
        let style = Self { color, width };
        style.validate()?;
        Ok(style)
    }

    /// Validate that parameters are in acceptable ranges
    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || !(MIN_STROKE_WIDTH..=MAX_STROKE_WIDTH).contains(&self.width) {
            return Err(OverlayError::InvalidStyle(format!(
                "width must be between {MIN_STROKE_WIDTH} and {MAX_STROKE_WIDTH}, got {}",
                self.width
            )));
        }
        Ok(())
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Rgba8::rgb(0xff, 0x00, 0x00), // Red
            width: 5.0,
        }
    }
}

/// A single brush dab to be rendered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushDab {
    /// Position in layer space (pixels)
    pub position: [f32; 2],
    /// Size in pixels (diameter)
    pub size: f32,
    /// Opacity for this dab (0.0-1.0)
    pub opacity: f32,
    /// Color (sRGB)
    pub color: Rgba8,
    /// Hardness (0.0=soft, 1.0=hard)
    pub hardness: f32,
}

impl BrushDab {
    /// A hard filled circle, as used for particles
    pub fn circle(center: Point, radius: f32, color: Rgba8, opacity: f32) -> Self {
        Self {
            position: [center.x, center.y],
            size: radius * 2.0,
            opacity,
            color,
            hardness: 1.0,
        }
    }
}

/// Spacing state for one polyline
struct DabSpacer {
    style: StrokeStyle,
    spacing: f32,
    /// Last input position (not dab position) for segment calculation
    last_input_position: Option<Point>,
    /// Accumulated distance since last dab
    accumulated_distance: f32,
}

impl DabSpacer {
    fn new(style: StrokeStyle) -> Self {
        Self {
            style,
            spacing: (style.width * SPACING_RATIO).max(0.5),
            last_input_position: None,
            accumulated_distance: 0.0,
        }
    }

    /// Place dabs for the segment from the previous input to `position`
    fn calculate_dabs(&mut self, position: Point, dabs: &mut Vec<BrushDab>) {
        let prev_pos = match self.last_input_position {
            Some(pos) => pos,
            None => {
                // First dab of the polyline
                dabs.push(self.create_dab(position));
                self.last_input_position = Some(position);
                self.accumulated_distance = 0.0;
                return;
            }
        };

        let segment_distance = prev_pos.distance_to(position);
        if segment_distance <= f32::EPSILON {
            return;
        }
        self.accumulated_distance += segment_distance;

        let dx = position.x - prev_pos.x;
        let dy = position.y - prev_pos.y;

        while self.accumulated_distance >= self.spacing {
            // accumulated_distance is measured from the last dab, which may
            // sit in an earlier segment
            let distance_into_segment = segment_distance - (self.accumulated_distance - self.spacing);
            let t = (distance_into_segment / segment_distance).clamp(0.0, 1.0);

            dabs.push(self.create_dab(Point::new(prev_pos.x + dx * t, prev_pos.y + dy * t)));
            self.accumulated_distance -= self.spacing;
        }

        self.last_input_position = Some(position);
    }

    fn create_dab(&self, position: Point) -> BrushDab {
        BrushDab {
            position: [position.x, position.y],
            size: self.style.width,
            opacity: 1.0,
            color: self.style.color,
            hardness: 1.0,
        }
    }
}

/// Convert a polyline into dabs, including both end caps
pub fn polyline_dabs(points: &[Point], style: &StrokeStyle) -> Vec<BrushDab> {
    let mut dabs = Vec::new();
    let mut spacer = DabSpacer::new(*style);
    for &point in points {
        spacer.calculate_dabs(point, &mut dabs);
    }

    // End cap: the spacing walk can stop up to one spacing short of the end
    if let (Some(&last), Some(dab)) = (points.last(), dabs.last()) {
        if dab.position != [last.x, last.y] {
            dabs.push(spacer.create_dab(last));
        }
    }
    dabs
}
