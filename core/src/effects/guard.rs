//! Relics that step in when a mine goes off.

use super::*;

/// Quick Recovery only fires if fewer cells than this were opened on the floor.
const QUICK_RECOVERY_MAX_CELLS: u32 = 10;
/// Cells a single reveal has to open for Momentum to prime.
const MOMENTUM_CASCADE: usize = 5;

fn flag_detonated(board: &mut Board, report: &mut Reveal) {
    for pos in report.detonated.drain(..) {
        board.set_state(pos, CellState::Flagged);
    }
}

pub(crate) struct QuickRecovery;

impl RelicEffect for QuickRecovery {
    fn on_defeat(&self, defeat: &mut Defeat<'_>) {
        if defeat.restart || defeat.cells_revealed >= QUICK_RECOVERY_MAX_CELLS {
            return;
        }
        if defeat.run.consume(RelicId::QuickRecovery) {
            log::info!("Quick Recovery restarts floor {}", defeat.run.current_floor);
            defeat.restart = true;
        }
    }
}

pub(crate) struct Momentum;

impl RelicEffect for Momentum {
    fn on_reveal(&self, event: &mut RevealEvent<'_>) {
        match (event.detonation, event.source) {
            (Detonation::Pending, RevealSource::Click(_)) => {
                if event.run.consume(RelicId::Momentum) {
                    flag_detonated(event.board, event.report);
                    event.detonation = Detonation::Averted;
                }
            }
            (Detonation::None, _) if event.report.opened.len() >= MOMENTUM_CASCADE => {
                event.run.prime(RelicId::Momentum);
            }
            _ => {}
        }
    }
}

pub(crate) struct SteadyHand;

impl RelicEffect for SteadyHand {
    fn on_reveal(&self, event: &mut RevealEvent<'_>) {
        let (Detonation::Pending, RevealSource::Chord(center)) = (event.detonation, event.source)
        else {
            return;
        };
        let misplaced: Vec<Coord2> = event
            .before
            .neighbors(center)
            .filter(|&pos| {
                let cell = event.before[pos];
                cell.is_flagged() && !cell.is_mine
            })
            .collect();
        if misplaced.is_empty() || !event.run.consume(RelicId::SteadyHand) {
            return;
        }

        *event.board = event.before.clone();
        for &pos in &misplaced {
            event.board.set_state(pos, CellState::Hidden);
        }
        *event.report = Reveal::default();
        event.detonation = Detonation::Averted;
        log::debug!("Steady Hand cancelled chord at {:?}, unflagged {:?}", center, misplaced);
    }
}

pub(crate) struct DefusalKit;

impl RelicEffect for DefusalKit {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Some(pos) = activation.target.coords() else {
            return ActivationOutcome::Rejected;
        };
        if !activation.board.get(pos).is_some_and(Cell::is_flagged) {
            return ActivationOutcome::Rejected;
        }

        match activation.board.remove_mine(pos) {
            Some(next) => {
                *activation.board = next;
                activation.floor_config.mines = activation.floor_config.mines.saturating_sub(1);
            }
            None => log::info!("Defusal Kit wasted on a misplaced flag at {:?}", pos),
        }
        ActivationOutcome::Used
    }
}

pub(crate) struct IronWill;

impl RelicEffect for IronWill {
    fn on_reveal(&self, event: &mut RevealEvent<'_>) {
        if event.detonation != Detonation::Pending || !event.run.consume(RelicId::IronWill) {
            return;
        }
        let Some(&first) = event.report.detonated.first() else {
            return;
        };
        flag_detonated(event.board, event.report);
        event.run.trauma_stacks += 1;
        event.detonation = Detonation::Saved(first);
        log::info!(
            "Iron Will absorbed the mine at {:?}, trauma now {}",
            first,
            event.run.trauma_stacks
        );
    }
}
