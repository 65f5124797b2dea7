//! Strokes and the Stroke Recorder
//!
//! The recorder is a two-state machine (`Idle`, `Active`) driven by
//! down/move/up/leave events. [`transition`] is pure, so the lifecycle can be
//! tested without any event binding; [`StrokeRecorder`] just owns the current
//! state and applies it.

use crate::geometry::Point;

/// An ordered sequence of at least two points
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Build a stroke, rejecting buffers that are only a tap (< 2 points)
    pub fn from_points(points: Vec<Point>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Recorder state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    /// A stroke is in progress; `points` is the in-progress buffer
    Active { points: Vec<Point> },
}

/// Input to the recorder, already mapped into surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecorderEvent {
    Down(Point),
    Move(Point),
    Up,
    Leave,
}

/// What the caller must do after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderAction {
    /// Nothing happened
    Ignored,
    /// A stroke started at this point
    Began(Point),
    /// Draw one segment incrementally
    Segment { from: Point, to: Point },
    /// A stroke completed; hand it to the store or the expiry scheduler
    Finished(Stroke),
    /// The buffer was a tap and was dropped
    Discarded,
}

/// Pure transition function
///
/// `accepting` is whether draw mode is on; it only gates
/// `Idle -> Active`, so an active stroke always runs to completion.
pub fn transition(state: RecorderState, event: RecorderEvent, accepting: bool) -> (RecorderState, RecorderAction) {
    match (state, event) {
        (RecorderState::Idle, RecorderEvent::Down(point)) if accepting => {
            (RecorderState::Active { points: vec![point] }, RecorderAction::Began(point))
        }
        (RecorderState::Active { mut points }, RecorderEvent::Move(point)) => {
            let action = match points.last() {
                Some(&from) => RecorderAction::Segment { from, to: point },
                None => RecorderAction::Began(point),
            };
            points.push(point);
            (RecorderState::Active { points }, action)
        }
        (RecorderState::Active { points }, RecorderEvent::Up | RecorderEvent::Leave) => {
            let action = match Stroke::from_points(points) {
                Some(stroke) => RecorderAction::Finished(stroke),
                None => RecorderAction::Discarded,
            };
            (RecorderState::Idle, action)
        }
        // Moves/ups while idle, a second down while active, downs while draw
        // mode is off
        (state, _) => (state, RecorderAction::Ignored),
    }
}

/// Owns the recorder state between events
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    state: RecorderState,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event through the state machine
    pub fn handle(&mut self, event: RecorderEvent, accepting: bool) -> RecorderAction {
        let state = std::mem::take(&mut self.state);
        let (next, action) = transition(state, event, accepting);
        self.state = next;
        if !matches!(action, RecorderAction::Ignored) {
            log::debug!("Recorder {:?} -> {}", event, action_name(&action));
        }
        action
    }

    /// Drop any in-progress buffer without producing a stroke
    ///
    /// Returns whether a stroke was active.
    pub fn abort(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = RecorderState::Idle;
        was_active
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RecorderState::Active { .. })
    }

    /// Points of the stroke in progress
    pub fn active_points(&self) -> Option<&[Point]> {
        match &self.state {
            RecorderState::Active { points } => Some(points),
            RecorderState::Idle => None,
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }
}

fn action_name(action: &RecorderAction) -> &'static str {
    match action {
        RecorderAction::Ignored => "ignored",
        RecorderAction::Began(_) => "began",
        RecorderAction::Segment { .. } => "segment",
        RecorderAction::Finished(_) => "finished",
        RecorderAction::Discarded => "discarded",
    }
}
