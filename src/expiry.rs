//! Expiry Scheduler
//!
//! A single-slot deferred action on a caller-supplied millisecond clock. The
//! host polls it from its frame loop (`performance.now()` on the web, a
//! monotonic `Instant` on desktop; tests pass plain numbers), so firing is
//! always ordered with respect to input handling.

use crate::stroke::Stroke;

/// Default visibility window of an auto-expiring stroke
pub const DEFAULT_EXPIRY_DELAY_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
struct PendingExpiry {
    stroke: Stroke,
    deadline_ms: f64,
}

#[derive(Debug, Clone)]
pub struct ExpiryScheduler {
    delay_ms: f64,
    slot: Option<PendingExpiry>,
    /// Stroke whose countdown is suspended by [`ExpiryScheduler::hold`]
    held: Option<Stroke>,
}

impl ExpiryScheduler {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            slot: None,
            held: None,
        }
    }

    /// Schedule `stroke` to expire `delay_ms` after `now_ms`
    ///
    /// Replaces any pending expiry; there is never more than one.
    pub fn arm(&mut self, stroke: Stroke, now_ms: f64) {
        if self.slot.is_some() {
            log::debug!("Re-arming expiry, previous deadline dropped");
        }
        let deadline_ms = now_ms + self.delay_ms;
        self.held = None;
        self.slot = Some(PendingExpiry { stroke, deadline_ms });
        log::debug!("Expiry armed for t={:.0}ms", deadline_ms);
    }

    /// Invalidate the pending expiry, held or armed
    ///
    /// Returns whether something was cancelled.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.slot.take().is_some() | self.held.take().is_some();
        if cancelled {
            log::debug!("Pending expiry cancelled");
        }
        cancelled
    }

    /// Stop the countdown but keep the stroke
    ///
    /// The next [`arm`](Self::arm) supersedes it; [`resume`](Self::resume)
    /// restarts it. Returns whether an expiry was armed.
    pub fn hold(&mut self) -> bool {
        match self.slot.take() {
            Some(pending) => {
                log::debug!("Expiry held (deadline was t={:.0}ms)", pending.deadline_ms);
                self.held = Some(pending.stroke);
                true
            }
            None => false,
        }
    }

    /// Restart a held stroke's countdown from `now_ms` with the full delay
    pub fn resume(&mut self, now_ms: f64) -> bool {
        match self.held.take() {
            Some(stroke) => {
                self.arm(stroke, now_ms);
                true
            }
            None => false,
        }
    }

    /// Fire the pending expiry if its deadline has passed
    ///
    /// Returns the expired stroke; the slot is empty afterwards.
    pub fn poll(&mut self, now_ms: f64) -> Option<Stroke> {
        match &self.slot {
            Some(pending) if now_ms >= pending.deadline_ms => {
                self.slot.take().map(|pending| pending.stroke)
            }
            _ => None,
        }
    }

    /// Fire immediately regardless of the deadline, held strokes included
    pub fn flush(&mut self) -> Option<Stroke> {
        let held = self.held.take();
        self.slot.take().map(|pending| pending.stroke).or(held)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.slot.as_ref().map(|pending| pending.deadline_ms)
    }

    pub fn pending_stroke(&self) -> Option<&Stroke> {
        self.slot.as_ref().map(|pending| &pending.stroke)
    }

    pub fn delay_ms(&self) -> f64 {
        self.delay_ms
    }
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn stroke(tag: f32) -> Stroke {
        Stroke::from_points(vec![Point::new(tag, 0.0), Point::new(tag, 1.0)]).unwrap()
    }

    #[test]
    fn fires_only_after_deadline() {
        let mut scheduler = ExpiryScheduler::default();
        scheduler.arm(stroke(1.0), 0.0);
        assert_eq!(scheduler.poll(999.0), None);
        assert_eq!(scheduler.poll(1000.0), Some(stroke(1.0)));
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.poll(5000.0), None);
    }

    #[test]
    fn rearm_replaces_previous_slot() {
        let mut scheduler = ExpiryScheduler::default();
        scheduler.arm(stroke(1.0), 0.0);
        scheduler.cancel();
        scheduler.arm(stroke(2.0), 600.0);

        // A's original deadline passes without anything firing
        assert_eq!(scheduler.poll(1001.0), None);
        assert_eq!(scheduler.deadline(), Some(1600.0));
        assert_eq!(scheduler.poll(1600.0), Some(stroke(2.0)));
    }

    #[test]
    fn arm_without_cancel_still_single_slot() {
        let mut scheduler = ExpiryScheduler::new(100.0);
        scheduler.arm(stroke(1.0), 0.0);
        scheduler.arm(stroke(2.0), 50.0);
        assert_eq!(scheduler.pending_stroke(), Some(&stroke(2.0)));
        assert_eq!(scheduler.poll(100.0), None);
        assert_eq!(scheduler.poll(150.0), Some(stroke(2.0)));
    }

    #[test]
    fn held_stroke_resumes_with_full_delay() {
        let mut scheduler = ExpiryScheduler::default();
        scheduler.arm(stroke(1.0), 0.0);
        assert!(scheduler.hold());
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.poll(5000.0), None);

        assert!(scheduler.resume(500.0));
        assert_eq!(scheduler.deadline(), Some(1500.0));
        assert_eq!(scheduler.poll(1500.0), Some(stroke(1.0)));
        assert!(!scheduler.resume(2000.0));
    }

    #[test]
    fn arm_supersedes_held_stroke() {
        let mut scheduler = ExpiryScheduler::default();
        scheduler.arm(stroke(1.0), 0.0);
        scheduler.hold();
        scheduler.arm(stroke(2.0), 600.0);
        assert!(!scheduler.is_held());
        assert_eq!(scheduler.pending_stroke(), Some(&stroke(2.0)));
    }

    #[test]
    fn cancel_and_flush_cover_held_stroke() {
        let mut scheduler = ExpiryScheduler::default();
        scheduler.arm(stroke(1.0), 0.0);
        scheduler.hold();
        assert_eq!(scheduler.flush(), Some(stroke(1.0)));

        scheduler.arm(stroke(2.0), 0.0);
        scheduler.hold();
        assert!(scheduler.cancel());
        assert!(!scheduler.resume(0.0));
    }

    #[test]
    fn cancel_reports_whether_armed() {
        let mut scheduler = ExpiryScheduler::default();
        assert!(!scheduler.cancel());
        scheduler.arm(stroke(1.0), 0.0);
        assert!(scheduler.cancel());
        assert_eq!(scheduler.flush(), None);
    }
}
