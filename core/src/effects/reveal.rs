//! Relics that open cells or shape the first click.

use rand::Rng;

use super::*;

/// Cells Lucky Start opens after the first click.
const LUCKY_REVEALS: usize = 3;
/// Cells Safe Path opens along its line.
const SAFE_PATH_REVEALS: usize = 3;

pub(crate) struct EdgeWalker;

impl RelicEffect for EdgeWalker {
    fn on_first_click(&self, click: &mut FirstClick<'_>) {
        let (rows, cols) = click.board.size();
        if rows < 2 || cols < 2 {
            return;
        }
        for corner in [(0, 0), (0, cols - 1), (rows - 1, 0), (rows - 1, cols - 1)] {
            let cell = click.board[corner];
            if !cell.is_hidden() {
                continue;
            }
            if cell.is_mine {
                click.board.set_state(corner, CellState::Flagged);
            } else {
                *click.report |= click.board.reveal_in_place(corner);
            }
        }
    }
}

pub(crate) struct CautiousStart;

impl RelicEffect for CautiousStart {
    fn on_floor_setup(&self, setup: &mut FloorSetup) {
        setup.placement.cautious = true;
    }
}

pub(crate) struct BreathingRoom;

impl RelicEffect for BreathingRoom {
    fn on_floor_setup(&self, setup: &mut FloorSetup) {
        setup.placement.zone = setup.placement.zone.max(StartZone::Block);
    }
}

pub(crate) struct LuckyStart;

impl RelicEffect for LuckyStart {
    fn on_first_click(&self, click: &mut FirstClick<'_>) {
        if !click.run.consume(RelicId::LuckyStart) {
            return;
        }
        let mut rng = click.run.stream(Stream::LuckyStart);
        for _ in 0..LUCKY_REVEALS {
            let candidates = isolated_safe_cells(click.board);
            if candidates.is_empty() {
                break;
            }
            let pool = (candidates.len() / 3).max(3).min(candidates.len());
            let pick = candidates[rng.random_range(0..pool)];
            *click.report |= click.board.reveal_in_place(pick);
        }
    }
}

pub(crate) struct SixthSense;

impl RelicEffect for SixthSense {
    fn on_floor_setup(&self, setup: &mut FloorSetup) {
        setup.placement.redirect_to_zero = true;
    }
}

pub(crate) struct SafePath;

impl RelicEffect for SafePath {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Target::Line { line } = activation.target else {
            return ActivationOutcome::Rejected;
        };
        let size = activation.board.size();
        if !line.fits(size) {
            return ActivationOutcome::Rejected;
        }

        let safe: Vec<Coord2> = line
            .cells(size)
            .into_iter()
            .filter(|&pos| {
                let cell = activation.board[pos];
                cell.is_hidden() && !cell.is_mine
            })
            .take(SAFE_PATH_REVEALS)
            .collect();
        for pos in safe {
            *activation.report |= activation.board.reveal_in_place(pos);
        }
        ActivationOutcome::Used
    }
}

pub(crate) struct XRayVision;

impl RelicEffect for XRayVision {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Some(center) = activation.target.coords() else {
            return ActivationOutcome::Rejected;
        };
        if !activation.board.contains(center) {
            return ActivationOutcome::Rejected;
        }

        for pos in window(center, 1, activation.board.size()) {
            let cell = activation.board[pos];
            if !cell.is_hidden() {
                continue;
            }
            if cell.is_mine {
                activation.board.set_state(pos, CellState::Flagged);
            } else {
                *activation.report |= activation.board.reveal_in_place(pos);
            }
        }
        ActivationOutcome::Used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> Board {
        Board::from_mines(size, mines, Topology::Bounded).unwrap()
    }

    fn activate(relic: &dyn RelicEffect, board: &mut Board, target: Target) -> (ActivationOutcome, Reveal) {
        let mut floor_config = FloorConfig::base(1, Layout::Wide);
        let mut findings = Findings::default();
        let mut report = Reveal::default();
        let outcome = relic.on_activate(&mut Activation {
            target,
            board,
            floor_config: &mut floor_config,
            findings: &mut findings,
            report: &mut report,
            now: 0,
        });
        (outcome, report)
    }

    #[test]
    fn edge_walker_flags_mined_corners_and_opens_the_rest() {
        let mut board = layout((4, 4), &[(0, 0), (1, 2)]);
        let mut report = Reveal::default();
        let mut run = RunState::default();

        EdgeWalker.on_first_click(&mut FirstClick {
            board: &mut board,
            report: &mut report,
            run: &mut run,
        });

        assert!(board[(0, 0)].is_flagged());
        assert!(board[(0, 3)].is_revealed());
        assert!(board[(3, 0)].is_revealed());
        assert!(board[(3, 3)].is_revealed());
        assert!(report.detonated.is_empty());
    }

    #[test]
    fn edge_walker_skips_single_row_boards() {
        let mut board = layout((1, 4), &[(0, 0)]);
        let mut report = Reveal::default();
        let mut run = RunState::default();

        EdgeWalker.on_first_click(&mut FirstClick {
            board: &mut board,
            report: &mut report,
            run: &mut run,
        });

        assert!(board.iter().all(Cell::is_hidden));
    }

    #[test]
    fn lucky_start_opens_safe_cells_once_per_floor() {
        let mines = [(0, 4), (2, 2), (4, 0), (4, 4)];
        let mut board = layout((5, 5), &mines);
        let mut run = RunState::default();
        run.add_relic(RelicId::LuckyStart);

        let mut report = Reveal::default();
        LuckyStart.on_first_click(&mut FirstClick {
            board: &mut board,
            report: &mut report,
            run: &mut run,
        });
        assert!(!report.opened.is_empty());
        assert!(report.detonated.is_empty());

        let mut again = Reveal::default();
        LuckyStart.on_first_click(&mut FirstClick {
            board: &mut board,
            report: &mut again,
            run: &mut run,
        });
        assert!(again.opened.is_empty());
    }

    #[test]
    fn breathing_room_never_weakens_the_zone() {
        let mut setup = FloorSetup {
            density: DensitySurcharge::default(),
            placement: Placement::for_modifiers(&AscensionModifiers::for_level(AscensionLevel::NONE)),
        };
        BreathingRoom.on_floor_setup(&mut setup);
        assert_eq!(setup.placement.zone, StartZone::Opening);

        setup.placement.zone = StartZone::Single;
        BreathingRoom.on_floor_setup(&mut setup);
        assert_eq!(setup.placement.zone, StartZone::Block);
    }

    #[test]
    fn safe_path_opens_three_safe_cells() {
        let mut board = layout((3, 6), &[(1, 0), (1, 2), (1, 4), (0, 1), (2, 1)]);

        let (outcome, report) = activate(&SafePath, &mut board, Target::Line { line: Line::Row(1) });

        assert_eq!(outcome, ActivationOutcome::Used);
        assert_eq!(report.opened, vec![(1, 1), (1, 3), (1, 5)]);
        assert!(report.detonated.is_empty());
    }

    #[test]
    fn safe_path_rejects_cells_and_missing_lines() {
        let mut board = layout((3, 3), &[(0, 0)]);
        let (outcome, _) = activate(&SafePath, &mut board, Target::cell((1, 1)));
        assert_eq!(outcome, ActivationOutcome::Rejected);
        let (outcome, _) = activate(&SafePath, &mut board, Target::Line { line: Line::Col(3) });
        assert_eq!(outcome, ActivationOutcome::Rejected);
    }

    #[test]
    fn xray_flags_mines_and_opens_safe_cells() {
        let mut board = layout((5, 5), &[(1, 1), (3, 3)]);

        let (outcome, report) = activate(&XRayVision, &mut board, Target::cell((0, 0)));

        assert_eq!(outcome, ActivationOutcome::Used);
        assert!(board[(1, 1)].is_flagged());
        assert!(board[(0, 0)].is_revealed());
        assert!(board[(0, 1)].is_revealed());
        assert!(board[(1, 0)].is_revealed());
        assert!(board[(3, 3)].is_hidden());
        assert!(report.detonated.is_empty());
    }
}
