use serde::{Deserialize, Serialize};

use crate::*;

/// Progress kept across runs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifetimeStats {
    pub total_runs: u32,
    pub best_floor: u8,
    pub best_score: u64,
    pub floors_cleared: u32,
    pub highest_ascension_unlocked: AscensionLevel,
    pub highest_ascension_cleared: AscensionLevel,
}

impl LifetimeStats {
    /// Folds a finished run into the totals. Victories unlock the next ascension.
    pub fn record_run(&mut self, run: &RunState, victory: bool) {
        let floor = run.current_floor;
        self.total_runs = self.total_runs.saturating_add(1);
        self.best_floor = self.best_floor.max(floor);
        self.best_score = self.best_score.max(run.score);

        let cleared = if victory { floor } else { floor.saturating_sub(1) };
        self.floors_cleared = self.floors_cleared.saturating_add(u32::from(cleared));

        if victory {
            self.highest_ascension_cleared = self.highest_ascension_cleared.max(run.ascension);
            self.highest_ascension_unlocked = self
                .highest_ascension_unlocked
                .max(run.ascension.next());
        }
        log::debug!("Recorded run: {:?}", self);
    }

    /// Highest ascension a new run may start at.
    pub fn clamp_ascension(&self, requested: AscensionLevel) -> AscensionLevel {
        requested.min(self.highest_ascension_unlocked)
    }
}
