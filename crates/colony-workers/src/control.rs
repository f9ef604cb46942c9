//! Multi-tick dig and place actions.

use colony_types::WorkItem;

/// Progress of an action after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// Nothing in progress.
    Idle,
    /// Still working.
    Working,
    /// The action finished this tick.
    Done,
}

/// A timed action on one work item (a dig or a placement).
#[derive(Debug, Clone)]
pub struct ActionControl {
    duration: u32,
    remaining: u32,
    target: Option<WorkItem>,
}

impl ActionControl {
    /// An idle control whose actions take `duration` ticks (at least one).
    pub const fn new(duration: u32) -> Self {
        Self {
            duration: if duration == 0 { 1 } else { duration },
            remaining: 0,
            target: None,
        }
    }

    /// Begin working on `target`, replacing any unfinished action.
    pub fn start(&mut self, target: WorkItem) {
        self.remaining = self.duration;
        self.target = Some(target);
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> ControlStatus {
        if self.target.is_none() {
            return ControlStatus::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            ControlStatus::Done
        } else {
            ControlStatus::Working
        }
    }

    /// Take the finished target, leaving the control idle.
    pub fn take_done(&mut self) -> Option<WorkItem> {
        if self.remaining == 0 {
            self.target.take()
        } else {
            None
        }
    }

    /// Whether an action is in progress.
    pub const fn is_busy(&self) -> bool {
        self.target.is_some()
    }

    /// Abandon any action.
    pub fn reset(&mut self) {
        self.remaining = 0;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use colony_types::Coordinate;

    use super::*;

    #[test]
    fn action_takes_its_duration() {
        let mut control = ActionControl::new(3);
        control.start(WorkItem::dig(Coordinate::new(1, 2, 3)));
        assert_eq!(control.tick(), ControlStatus::Working);
        assert_eq!(control.take_done(), None);
        assert_eq!(control.tick(), ControlStatus::Working);
        assert_eq!(control.tick(), ControlStatus::Done);
        assert_eq!(control.take_done().map(|i| i.pos), Some(Coordinate::new(1, 2, 3)));
        assert!(!control.is_busy());
        assert_eq!(control.tick(), ControlStatus::Idle);
    }

    #[test]
    fn reset_abandons_action() {
        let mut control = ActionControl::new(0);
        control.start(WorkItem::dig(Coordinate::ZERO));
        control.reset();
        assert_eq!(control.tick(), ControlStatus::Idle);
        assert_eq!(control.take_done(), None);
    }
}
