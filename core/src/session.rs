//! Host-facing session: the reducer wired to persistence.

use crate::*;

/// A game session backed by `S`.
///
/// Every dispatched action autosaves the run while it can be resumed and clears the saved run
/// once it ends. Storage failures are logged and never interrupt play.
#[derive(Debug)]
pub struct Session<S: Storage> {
    state: GameState,
    stats: LifetimeStats,
    storage: S,
}

impl<S: Storage> Session<S> {
    /// Loads lifetime stats and resumes the saved run, if there is a valid one.
    pub fn open(mut storage: S) -> Self {
        let stats = load_stats(&storage);
        let state = load_run(&mut storage).unwrap_or_default();
        log::info!(
            "Session opened in {:?}, {} runs recorded",
            state.phase,
            stats.total_runs
        );
        Self {
            state,
            stats,
            storage,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stats(&self) -> &LifetimeStats {
        &self.stats
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn dispatch(&mut self, action: &Action) -> &GameState {
        let action = match *action {
            Action::StartRun { ascension, seed } => Action::StartRun {
                ascension: self.stats.clamp_ascension(ascension),
                seed,
            },
            ref other => other.clone(),
        };

        let before = self.state.phase;
        self.state.apply(&action);
        let after = self.state.phase;

        if after != before && after.is_finished() {
            self.stats
                .record_run(&self.state.run, after == Phase::Victory);
            if let Err(err) = save_stats(&mut self.storage, &self.stats) {
                log::warn!("Cannot save stats: {}", err);
            }
        }

        if after.is_resumable() {
            if let Err(err) = save_run(&mut self.storage, &self.state) {
                log::warn!("Cannot save run: {}", err);
            }
        } else if after != before && (after == Phase::Start || after.is_finished()) {
            clear_run(&mut self.storage);
        }

        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> Action {
        Action::StartRun {
            ascension: AscensionLevel::MAX,
            seed: RunSeed::new(4242),
        }
    }

    #[test]
    fn locked_ascension_is_clamped() {
        let mut session = Session::open(MemoryStorage::new());

        session.dispatch(&start());

        assert_eq!(session.state().run.ascension, AscensionLevel::NONE);
    }

    #[test]
    fn playing_autosaves_and_resumes() {
        let mut session = Session::open(MemoryStorage::new());
        session.dispatch(&start());
        session.dispatch(&Action::Reveal { row: 3, col: 3 });
        let expected = session.state().clone();

        let resumed = Session::open(session.into_storage());

        assert_eq!(resumed.state(), &expected);
    }

    #[test]
    fn returning_to_start_clears_the_save() {
        let mut session = Session::open(MemoryStorage::new());
        session.dispatch(&start());
        assert!(session.storage().contains(GameState::KEY));

        session.dispatch(&Action::ReturnToStart);

        assert!(!session.storage().contains(GameState::KEY));
    }

    #[test]
    fn read_only_storage_does_not_stop_play() {
        let mut session = Session::open(MemoryStorage::read_only());

        let state = session.dispatch(&start());

        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(session.stats(), &LifetimeStats::default());
    }
}
