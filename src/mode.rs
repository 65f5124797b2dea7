//! Mode Controller
//!
//! The three feature flags live in one [`ModeFlags`] value that is only
//! replaced through [`ModeController::apply`]. Each effective change is
//! reported as a [`ModeTransition`] so the session can react (clear the
//! overlay, cancel expiry, ...).

/// One of the independent feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Particle trail follows the pointer
    Trail,
    /// Strokes are kept until cleared
    Draw,
    /// Modifies drawing: strokes vanish shortly after they are finished
    AutoExpire,
}

/// Snapshot of all flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeFlags {
    pub trail: bool,
    pub draw: bool,
    pub auto_expire: bool,
}

/// What happens to a stroke once it is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokePolicy {
    Permanent,
    Expiring,
}

impl ModeFlags {
    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::Trail => self.trail,
            Mode::Draw => self.draw,
            Mode::AutoExpire => self.auto_expire,
        }
    }

    pub fn with(mut self, mode: Mode, on: bool) -> Self {
        match mode {
            Mode::Trail => self.trail = on,
            Mode::Draw => self.draw = on,
            Mode::AutoExpire => self.auto_expire = on,
        }
        self
    }

    /// Whether pointer-down may start a stroke
    ///
    /// Only draw mode gates input; auto-expire alone draws nothing.
    pub fn accepts_strokes(&self) -> bool {
        self.draw
    }

    /// Policy for the next finished stroke
    ///
    /// Auto-expire takes precedence when both drawing flags are on.
    pub fn stroke_policy(&self) -> Option<StrokePolicy> {
        match (self.draw, self.auto_expire) {
            (false, _) => None,
            (true, true) => Some(StrokePolicy::Expiring),
            (true, false) => Some(StrokePolicy::Permanent),
        }
    }
}

/// A requested flag change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Toggle(Mode),
    Set(Mode, bool),
}

/// An effective change, before and after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub before: ModeFlags,
    pub after: ModeFlags,
}

impl ModeTransition {
    pub fn turned_on(&self, mode: Mode) -> bool {
        !self.before.get(mode) && self.after.get(mode)
    }

    pub fn turned_off(&self, mode: Mode) -> bool {
        self.before.get(mode) && !self.after.get(mode)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ModeController {
    flags: ModeFlags,
}

impl ModeController {
    pub fn new(flags: ModeFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags
    }

    /// Apply a change; `None` when the flags are unchanged
    pub fn apply(&mut self, change: ModeChange) -> Option<ModeTransition> {
        let before = self.flags;
        let after = match change {
            ModeChange::Toggle(mode) => before.with(mode, !before.get(mode)),
            ModeChange::Set(mode, on) => before.with(mode, on),
        };
        if before == after {
            return None;
        }
        self.flags = after;
        log::info!("Modes: {:?} -> {:?}", before, after);
        Some(ModeTransition { before, after })
    }
}

/// Whether the background (document) surface may be scrolled/panned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundInteraction {
    #[default]
    Enabled,
    /// A stroke is in progress
    Suspended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_reports_transition() {
        let mut modes = ModeController::default();
        let transition = modes.apply(ModeChange::Toggle(Mode::Draw)).unwrap();
        assert!(transition.turned_on(Mode::Draw));
        assert!(!transition.turned_on(Mode::Trail));
        assert!(modes.flags().draw);

        let transition = modes.apply(ModeChange::Toggle(Mode::Draw)).unwrap();
        assert!(transition.turned_off(Mode::Draw));
    }

    #[test]
    fn setting_same_value_is_not_a_change() {
        let mut modes = ModeController::new(ModeFlags { trail: true, ..Default::default() });
        assert_eq!(modes.apply(ModeChange::Set(Mode::Trail, true)), None);
    }

    #[test]
    fn flags_are_independent() {
        let mut modes = ModeController::default();
        modes.apply(ModeChange::Set(Mode::Draw, true));
        modes.apply(ModeChange::Set(Mode::AutoExpire, true));
        modes.apply(ModeChange::Set(Mode::Trail, true));
        assert_eq!(modes.flags(), ModeFlags { trail: true, draw: true, auto_expire: true });
    }

    #[test]
    fn auto_expire_takes_precedence() {
        let both = ModeFlags { trail: false, draw: true, auto_expire: true };
        assert_eq!(both.stroke_policy(), Some(StrokePolicy::Expiring));
        assert_eq!(both.with(Mode::AutoExpire, false).stroke_policy(), Some(StrokePolicy::Permanent));
        assert_eq!(ModeFlags::default().stroke_policy(), None);
        assert!(!ModeFlags { trail: true, ..Default::default() }.accepts_strokes());
    }

    #[test]
    fn auto_expire_alone_accepts_nothing() {
        let flags = ModeFlags { auto_expire: true, ..Default::default() };
        assert!(!flags.accepts_strokes());
        assert_eq!(flags.stroke_policy(), None);
        assert!(flags.with(Mode::Draw, true).accepts_strokes());
    }
}
