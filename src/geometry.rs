//! Geometry primitives shared by every overlay component

/// A point in overlay backing-store pixels (post-scaling)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Pixel dimensions of a drawable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The rendered (CSS pixel) bounding box of a surface in viewport space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ClientRect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// A rect at the origin whose CSS size equals the backing size (no scaling)
    pub fn unscaled(size: SurfaceSize) -> Self {
        Self::new(0.0, 0.0, size.width as f64, size.height as f64)
    }

    /// Whether a viewport position falls inside the box (right/bottom edges excluded)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_excludes_far_edges() {
        let rect = ClientRect::new(16.0, 16.0, 100.0, 50.0);
        assert!(rect.contains(16.0, 16.0));
        assert!(rect.contains(115.9, 65.9));
        assert!(!rect.contains(116.0, 20.0));
        assert!(!rect.contains(10.0, 20.0));
        assert!(!rect.contains(20.0, 66.0));
    }
}
