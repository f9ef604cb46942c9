//! Prioritised behaviour selection.
//!
//! Each worker runs at most one [`Behaviour`] at a time. A lower priority
//! number wins:
//!
//! | Behaviour | Priority | Holds control while |
//! |-----------|----------|---------------------|
//! | `Flee` | 3 | scared |
//! | `Fight` | 4 | fighting |
//! | `ExecuteTask` | 6 | bound to a task, not starving |
//! | `Eat` | 7 | starving |
//!
//! A startable behaviour with a better priority pre-empts the running one.
//! A running behaviour whose continue guard fails is stopped and the best
//! startable behaviour takes over.

use std::fmt;

/// A competing worker behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Behaviour {
    /// Run from danger.
    Flee,
    /// Engage an attacker.
    Fight,
    /// Work on the bound task.
    ExecuteTask,
    /// Find food.
    Eat,
}

impl Behaviour {
    /// Every behaviour, best priority first.
    pub const ALL: [Self; 4] = [Self::Flee, Self::Fight, Self::ExecuteTask, Self::Eat];

    /// Selection priority. Lower wins.
    pub const fn priority(self) -> u8 {
        match self {
            Self::Flee => 3,
            Self::Fight => 4,
            Self::ExecuteTask => 6,
            Self::Eat => 7,
        }
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flee => "flee",
            Self::Fight => "fight",
            Self::ExecuteTask => "execute_task",
            Self::Eat => "eat",
        };
        f.write_str(name)
    }
}

/// Flags set by the host that gate the non-task behaviours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Conditions {
    /// A threat is nearby.
    pub scared: bool,
    /// The worker is in combat.
    pub fighting: bool,
    /// The worker must eat before doing anything else useful.
    pub starving: bool,
}

impl Conditions {
    /// Whether the non-task behaviour `behaviour` wants control.
    /// Always `false` for [`Behaviour::ExecuteTask`].
    pub const fn wants(self, behaviour: Behaviour) -> bool {
        match behaviour {
            Behaviour::Flee => self.scared,
            Behaviour::Fight => self.fighting,
            Behaviour::Eat => self.starving,
            Behaviour::ExecuteTask => false,
        }
    }

    /// Whether anything should keep a worker off its task.
    pub const fn blocks_task(self) -> bool {
        self.scared || self.fighting || self.starving
    }
}

/// The change made by one selection round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    /// The behaviour that lost control, if any.
    pub stopped: Option<Behaviour>,
    /// The behaviour that gained control, if any.
    pub started: Option<Behaviour>,
}

impl Transition {
    /// Whether control changed hands.
    pub const fn is_change(&self) -> bool {
        self.stopped.is_some() || self.started.is_some()
    }
}

/// Picks the behaviour that runs each tick.
#[derive(Debug, Clone, Default)]
pub struct BehaviourSelector {
    running: Option<Behaviour>,
}

impl BehaviourSelector {
    /// A selector with nothing running.
    pub const fn new() -> Self {
        Self { running: None }
    }

    /// The behaviour currently in control.
    pub const fn running(&self) -> Option<Behaviour> {
        self.running
    }

    /// Run one selection round.
    ///
    /// `can_start` is the start guard of each behaviour; `keep_running` is
    /// the continue guard of the running behaviour, evaluated by the caller.
    pub fn select(&mut self, can_start: impl Fn(Behaviour) -> bool, keep_running: bool) -> Transition {
        let current = self.running;
        let best = Behaviour::ALL
            .into_iter()
            .find(|b| Some(*b) != current && can_start(*b));

        let next = match current {
            Some(running) if keep_running => match best {
                Some(candidate) if candidate.priority() < running.priority() => Some(candidate),
                _ => return Transition::default(),
            },
            _ => best,
        };

        self.running = next;
        Transition {
            stopped: current,
            started: next,
        }
    }

    /// Drop the running behaviour without selecting another.
    pub fn clear(&mut self) -> Option<Behaviour> {
        self.running.take()
    }
}
