//! Input Event Handling
//!
//! This module describes pointer input (mouse and touch) in a
//! platform-neutral form and maps it from viewport coordinates into overlay
//! backing-store pixels. Events are handled synchronously, in arrival order;
//! nothing is coalesced, because every incremental segment depends on the
//! previous point.

use crate::geometry::{ClientRect, Point, SurfaceSize};

/// Type of pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventType {
    /// Pointer button pressed / touch started (start of stroke)
    Down,
    /// Pointer moved (continue stroke, spawn trail particles)
    Move,
    /// Pointer released / touch ended (end of stroke)
    Up,
    /// Pointer left the surface or the touch was cancelled
    Leave,
}

/// A touch contact in viewport (client) coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub client_x: f64,
    pub client_y: f64,
}

/// Source-specific payload of a pointer event
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Mouse { client_x: f64, client_y: f64 },
    Touch {
        /// Contacts currently on the surface
        touches: Vec<TouchPoint>,
        /// Contacts that changed in this event (the only ones left on touchend)
        changed_touches: Vec<TouchPoint>,
    },
}

/// A pointer input event (mouse or touch)
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub event_type: PointerEventType,
    pub input: PointerInput,
}

impl PointerEvent {
    pub fn mouse(event_type: PointerEventType, client_x: f64, client_y: f64) -> Self {
        Self {
            event_type,
            input: PointerInput::Mouse { client_x, client_y },
        }
    }

    pub fn touch(event_type: PointerEventType, touches: Vec<TouchPoint>, changed_touches: Vec<TouchPoint>) -> Self {
        Self {
            event_type,
            input: PointerInput::Touch { touches, changed_touches },
        }
    }

    /// Viewport position of the event
    ///
    /// Touch start/move read the first active contact; touch end/cancel read
    /// the first changed contact, since the lifted finger is no longer in
    /// `touches`.
    pub fn client_position(&self) -> Option<(f64, f64)> {
        match &self.input {
            PointerInput::Mouse { client_x, client_y } => Some((*client_x, *client_y)),
            PointerInput::Touch { touches, changed_touches } => {
                let list = match self.event_type {
                    PointerEventType::Down | PointerEventType::Move => touches,
                    PointerEventType::Up | PointerEventType::Leave => changed_touches,
                };
                list.first().map(|t| (t.client_x, t.client_y))
            }
        }
    }
}

/// Map an event into backing-store pixels of a surface
///
/// `rect` is the surface's CSS bounding box and `backing` its pixel
/// dimensions; the two differ whenever the page is zoomed or the surface is
/// stretched by layout. Returns `None` for touch events without a usable
/// contact or for a degenerate (zero-sized) box.
pub fn map_to_surface(event: &PointerEvent, rect: &ClientRect, backing: SurfaceSize) -> Option<Point> {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return None;
    }
    let (client_x, client_y) = event.client_position()?;
    let scale_x = backing.width as f64 / rect.width;
    let scale_y = backing.height as f64 / rect.height;
    Some(Point::new(
        ((client_x - rect.left) * scale_x) as f32,
        ((client_y - rect.top) * scale_y) as f32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(x: f64, y: f64) -> TouchPoint {
        TouchPoint { client_x: x, client_y: y }
    }

    #[test]
    fn mouse_maps_with_backing_scale() {
        // CSS box is half the backing size: one CSS pixel covers two backing pixels
        let rect = ClientRect::new(100.0, 50.0, 400.0, 300.0);
        let event = PointerEvent::mouse(PointerEventType::Move, 150.0, 80.0);
        let point = map_to_surface(&event, &rect, SurfaceSize::new(800, 600)).unwrap();
        assert_eq!(point, Point::new(100.0, 60.0));
    }

    #[test]
    fn touch_start_uses_touches() {
        let rect = ClientRect::unscaled(SurfaceSize::new(100, 100));
        let event = PointerEvent::touch(PointerEventType::Down, vec![touch(10.0, 20.0)], vec![touch(99.0, 99.0)]);
        assert_eq!(map_to_surface(&event, &rect, SurfaceSize::new(100, 100)), Some(Point::new(10.0, 20.0)));
    }

    #[test]
    fn touch_end_uses_changed_touches() {
        let rect = ClientRect::unscaled(SurfaceSize::new(100, 100));
        let event = PointerEvent::touch(PointerEventType::Up, vec![], vec![touch(30.0, 40.0)]);
        assert_eq!(map_to_surface(&event, &rect, SurfaceSize::new(100, 100)), Some(Point::new(30.0, 40.0)));
    }

    #[test]
    fn missing_touch_or_empty_box_yields_none() {
        let backing = SurfaceSize::new(100, 100);
        let event = PointerEvent::touch(PointerEventType::Move, vec![], vec![]);
        assert_eq!(map_to_surface(&event, &ClientRect::unscaled(backing), backing), None);

        let mouse = PointerEvent::mouse(PointerEventType::Move, 5.0, 5.0);
        assert_eq!(map_to_surface(&mouse, &ClientRect::new(0.0, 0.0, 0.0, 10.0), backing), None);
    }
}
