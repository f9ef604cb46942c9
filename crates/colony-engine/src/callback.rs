//! Tick callback that reports progress and autosaves.
//!
//! After each tick the callback logs task endings, stock syncs and
//! integrity changes, and writes the save file every
//! `persistence.autosave_interval_ticks` ticks.

use std::path::PathBuf;

use colony_core::{ColonyClock, ColonySession, TickCallback, TickSummary};
use tracing::{debug, info, warn};

/// Callback wiring the tick loop to logs and the save file.
pub struct EngineCallback {
    save_path: PathBuf,
    autosave_interval_ticks: u64,
    saves: u64,
}

impl EngineCallback {
    /// Create a callback saving to `save_path` every `autosave_interval_ticks`
    /// ticks (0 = never).
    pub const fn new(save_path: PathBuf, autosave_interval_ticks: u64) -> Self {
        Self {
            save_path,
            autosave_interval_ticks,
            saves: 0,
        }
    }

    /// Autosaves written so far.
    pub const fn saves(&self) -> u64 {
        self.saves
    }
}

impl TickCallback for EngineCallback {
    fn on_tick(&mut self, summary: &TickSummary, session: &ColonySession) {
        for event in &summary.events {
            info!(tick = summary.tick, event = ?event, "Task ended");
        }

        if let Some(sync) = &summary.resource_sync {
            debug!(
                tick = summary.tick,
                reset = sync.reset,
                items = sync.items.len(),
                "Stock synced"
            );
        }

        for report in &summary.integrity {
            info!(
                building_id = %report.building_id,
                health = report.health,
                destroyed = report.destroyed,
                "Building integrity changed"
            );
        }

        if ColonyClock::from_tick(summary.tick).is_every(self.autosave_interval_ticks) {
            match session.save(&self.save_path) {
                Ok(()) => self.saves = self.saves.saturating_add(1),
                Err(e) => warn!(error = %e, path = %self.save_path.display(), "Autosave failed"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colony_core::{ColonyConfig, SaveFile, run_tick};
    use colony_types::Item;

    use super::*;

    fn temp_save(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("colony-engine-{}-{name}", std::process::id()))
            .join("save.json")
    }

    #[test]
    fn autosaves_on_interval() {
        let path = temp_save("interval");
        let mut session = ColonySession::new(ColonyConfig::default());
        session.ledger_mut().credit(&Item::new("stone"), 2);
        let mut callback = EngineCallback::new(path.clone(), 2);

        for _ in 0..5 {
            let summary = run_tick(&mut session).unwrap();
            callback.on_tick(&summary, &session);
        }

        assert_eq!(callback.saves(), 2);
        let save = SaveFile::load(&path).unwrap().unwrap();
        assert!(save.resources.iter().any(|s| s.item == Item::new("stone")));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn zero_interval_never_saves() {
        let path = temp_save("never");
        let mut session = ColonySession::new(ColonyConfig::default());
        let mut callback = EngineCallback::new(path.clone(), 0);

        for _ in 0..3 {
            let summary = run_tick(&mut session).unwrap();
            callback.on_tick(&summary, &session);
        }

        assert_eq!(callback.saves(), 0);
        assert!(!path.exists());
    }
}
