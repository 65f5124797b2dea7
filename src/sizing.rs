//! Surface Sizing Controller
//!
//! The only writer of overlay geometry. Whenever the background surface
//! finishes a render, its output size is applied to both overlays so they
//! stay pixel-aligned with the page. Window resizes are debounced before a
//! re-render is requested.

use crate::geometry::SurfaceSize;
use crate::surface::OverlaySurface;

/// Default quiet period before a resize triggers a page re-render
pub const DEFAULT_RESIZE_DEBOUNCE_MS: f64 = 250.0;

#[derive(Debug, Default, Clone)]
pub struct SurfaceSizer {
    current: Option<SurfaceSize>,
}

impl SurfaceSizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match both overlays to a freshly rendered background
    ///
    /// The particle overlay is cleared (particles at the old scale are
    /// dropped rather than rescaled). Returns false if the size was rejected;
    /// the caller follows a `true` with a full redraw of the drawing overlay.
    pub fn apply<D, P>(&mut self, size: SurfaceSize, drawing: &mut D, particles: &mut P) -> bool
    where
        D: OverlaySurface + ?Sized,
        P: OverlaySurface + ?Sized,
    {
        if size.is_empty() {
            log::warn!("Ignoring background render with empty size: {:?}", size);
            return false;
        }

        drawing.resize(size);
        particles.resize(size);
        particles.clear();
        self.current = Some(size);
        log::info!("Overlays resized to {}x{}", size.width, size.height);
        true
    }

    /// Size of the last applied background render
    pub fn current(&self) -> Option<SurfaceSize> {
        self.current
    }
}

/// Deadline-based debouncer polled from the frame loop
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    delay_ms: f64,
    deadline: Option<f64>,
}

impl ResizeDebouncer {
    pub fn new(delay_ms: f64) -> Self {
        Self { delay_ms, deadline: None }
    }

    /// Record a resize; restarts the quiet period
    pub fn trigger(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    /// True exactly once, when the quiet period has elapsed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

impl Default for ResizeDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_DEBOUNCE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, RecordingSurface};

    #[test]
    fn apply_keeps_overlays_identical() {
        let mut sizer = SurfaceSizer::new();
        let mut drawing = RecordingSurface::new(SurfaceSize::new(10, 10));
        let mut particles = RecordingSurface::new(SurfaceSize::new(20, 5));

        assert!(sizer.apply(SurfaceSize::new(800, 600), &mut drawing, &mut particles));
        assert_eq!(drawing.size(), SurfaceSize::new(800, 600));
        assert_eq!(particles.size(), drawing.size());
        assert_eq!(particles.commands().last(), Some(&DrawCommand::Clear));
        assert_eq!(sizer.current(), Some(SurfaceSize::new(800, 600)));
    }

    #[test]
    fn apply_rejects_empty_size() {
        let mut sizer = SurfaceSizer::new();
        let mut drawing = RecordingSurface::new(SurfaceSize::new(10, 10));
        let mut particles = RecordingSurface::new(SurfaceSize::new(10, 10));
        assert!(!sizer.apply(SurfaceSize::new(0, 300), &mut drawing, &mut particles));
        assert_eq!(drawing.size(), SurfaceSize::new(10, 10));
        assert!(drawing.commands().is_empty());
    }

    #[test]
    fn debouncer_restarts_and_fires_once() {
        let mut debouncer = ResizeDebouncer::new(250.0);
        debouncer.trigger(0.0);
        debouncer.trigger(200.0);
        assert!(!debouncer.poll(300.0));
        assert!(debouncer.poll(450.0));
        assert!(!debouncer.poll(900.0));
        assert!(!debouncer.is_pending());
    }
}
