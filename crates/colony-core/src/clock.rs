//! Colony clock.
//!
//! The tick counter is the only temporal state in the engine. Periodic
//! work (resource sync, autosave) derives its schedule from it with
//! [`ColonyClock::is_every`].

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Tick counter. Tick 0 is the state before the first tick ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColonyClock {
    tick: u64,
}

impl ColonyClock {
    /// A clock at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// A clock resumed at `tick`.
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// The current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether the current tick falls on a period of `interval` ticks.
    /// An interval of 0 never fires.
    pub const fn is_every(&self, interval: u64) -> bool {
        match self.tick.checked_rem(interval) {
            Some(rem) => rem == 0 && self.tick > 0,
            None => false,
        }
    }
}
