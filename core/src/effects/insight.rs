//! Relics that show information without touching the board.

use super::*;

const DANGER_CELLS: usize = 3;
const DANGER_MIN_ADJACENT: u8 = 3;
const PATTERN_MIN_ADJACENT: u8 = 3;
const LENS_CELLS: usize = 3;
const SCAN_RADIUS: u8 = 2;

pub(crate) struct DangerSense;

impl RelicEffect for DangerSense {
    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        if !refresh.mines_placed {
            return;
        }
        let mut risky: Vec<(u64, Coord2)> = refresh
            .board
            .iter()
            .filter(|cell| {
                cell.is_hidden() && !cell.is_mine && cell.adjacent_mines >= DANGER_MIN_ADJACENT
            })
            .map(|cell| (refresh.run.rank(Stream::DangerSense, cell.coords()), cell.coords()))
            .collect();
        risky.sort_unstable();
        refresh.overlays.danger = risky
            .into_iter()
            .take(DANGER_CELLS)
            .map(|(_, pos)| pos)
            .collect();
    }
}

pub(crate) struct HeatMap;

impl RelicEffect for HeatMap {
    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        refresh.overlays.heat_map = true;
    }
}

pub(crate) struct FloorScout;

impl RelicEffect for FloorScout {
    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        if refresh.mines_placed {
            refresh.overlays.zero_cells = Some(refresh.board.count_zero_cells());
        }
    }
}

pub(crate) struct PatternMemory;

impl RelicEffect for PatternMemory {
    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        if !refresh.mines_placed {
            return;
        }
        let board = refresh.board;
        let run = refresh.run;
        refresh.overlays.pattern_memory = board
            .iter()
            .filter(|cell| {
                cell.is_revealed() && !cell.is_mine && cell.adjacent_mines >= PATTERN_MIN_ADJACENT
            })
            .filter_map(|cell| {
                board
                    .neighbors(cell.coords())
                    .filter(|&pos| board[pos].is_hidden() && !board[pos].is_mine)
                    .min_by_key(|&pos| run.rank(Stream::PatternMemory, pos))
            })
            .collect();
    }
}

pub(crate) struct Survey;

impl RelicEffect for Survey {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Target::Line { line } = activation.target else {
            return ActivationOutcome::Rejected;
        };
        let size = activation.board.size();
        if !line.fits(size) {
            return ActivationOutcome::Rejected;
        }
        let mines = count_mines(activation.board, line.cells(size));
        activation.findings.survey = Some(SurveyResult { line, mines });
        ActivationOutcome::Used
    }
}

pub(crate) struct MineDetector;

impl RelicEffect for MineDetector {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Some(cell) = activation.target.coords() else {
            return ActivationOutcome::Rejected;
        };
        let scannable = activation.board.get(cell).is_some_and(Cell::is_hidden)
            && !activation.findings.scanned.contains(&cell);
        if !scannable {
            return ActivationOutcome::Rejected;
        }

        let board = &*activation.board;
        let mines = count_mines(board, window(cell, SCAN_RADIUS, board.size()));
        activation.findings.scan = Some(ScanResult {
            cell,
            mines,
            expires_at: activation.now + SCAN_SECS,
        });
        activation.findings.scanned.insert(cell);
        ActivationOutcome::Used
    }
}

pub(crate) struct Peek;

impl RelicEffect for Peek {
    fn on_activate(&self, activation: &mut Activation<'_>) -> ActivationOutcome {
        let Some(target) = activation
            .target
            .coords()
            .and_then(|pos| activation.board.get(pos).copied())
            .filter(|cell| cell.is_hidden())
        else {
            return ActivationOutcome::Rejected;
        };

        let value = if target.is_mine {
            PeekValue::Mine
        } else {
            PeekValue::Number(target.adjacent_mines)
        };
        activation.findings.peek = Some(PeekResult {
            cell: target.coords(),
            value,
            expires_at: activation.now + PEEK_SECS,
        });
        ActivationOutcome::Used
    }
}

pub(crate) struct ProbabilityLens;

impl RelicEffect for ProbabilityLens {
    fn on_activate(&self, _activation: &mut Activation<'_>) -> ActivationOutcome {
        ActivationOutcome::Used
    }

    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        // The lens stays up for the rest of the floor once spent.
        let spent = refresh
            .run
            .tracker(RelicId::ProbabilityLens)
            .is_some_and(|tracker| !tracker.is_available());
        if spent && refresh.mines_placed {
            refresh.overlays.lens = safest_cells(refresh.board, LENS_CELLS);
        }
    }
}

pub(crate) struct OraclesGift;

impl RelicEffect for OraclesGift {
    fn on_floor_setup(&self, setup: &mut FloorSetup) {
        setup.density.relics += ORACLE_DENSITY_PERCENT;
    }

    fn on_refresh(&self, refresh: &mut Refresh<'_>) {
        if refresh.mines_placed {
            refresh.overlays.oracle = oracle_cells(refresh.board);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> Board {
        Board::from_mines(size, mines, Topology::Bounded).unwrap()
    }

    fn activate(
        relic: &dyn RelicEffect,
        board: &mut Board,
        target: Target,
        findings: &mut Findings,
    ) -> ActivationOutcome {
        let mut floor_config = FloorConfig::base(1, Layout::Wide);
        let mut report = Reveal::default();
        relic.on_activate(&mut Activation {
            target,
            board,
            floor_config: &mut floor_config,
            findings,
            report: &mut report,
            now: 10,
        })
    }

    fn refresh(relic: &dyn RelicEffect, board: &Board, run: &RunState) -> Overlays {
        let mut overlays = Overlays::default();
        relic.on_refresh(&mut Refresh {
            board,
            run,
            mines_placed: true,
            overlays: &mut overlays,
        });
        overlays
    }

    #[test]
    fn survey_counts_mines_in_a_column() {
        let mut board = layout((4, 4), &[(0, 1), (2, 1), (3, 3)]);
        let mut findings = Findings::default();

        let outcome = activate(
            &Survey,
            &mut board,
            Target::Line { line: Line::Col(1) },
            &mut findings,
        );

        assert_eq!(outcome, ActivationOutcome::Used);
        assert_eq!(
            findings.survey,
            Some(SurveyResult {
                line: Line::Col(1),
                mines: 2
            })
        );
    }

    #[test]
    fn mine_detector_scans_each_cell_once() {
        let mut board = layout((6, 6), &[(0, 0), (2, 2), (5, 5)]);
        let mut findings = Findings::default();

        let first = activate(&MineDetector, &mut board, Target::cell((1, 1)), &mut findings);
        let second = activate(&MineDetector, &mut board, Target::cell((1, 1)), &mut findings);

        assert_eq!(first, ActivationOutcome::Used);
        assert_eq!(second, ActivationOutcome::Rejected);
        assert_eq!(
            findings.scan,
            Some(ScanResult {
                cell: (1, 1),
                mines: 2,
                expires_at: 13
            })
        );
    }

    #[test]
    fn peek_reports_the_hidden_value() {
        let mut board = layout((3, 3), &[(0, 0)]);
        let mut findings = Findings::default();

        assert_eq!(
            activate(&Peek, &mut board, Target::cell((1, 1)), &mut findings),
            ActivationOutcome::Used
        );
        assert_eq!(findings.peek.map(|peek| peek.value), Some(PeekValue::Number(1)));

        let (mut board, _) = board.reveal((2, 2));
        assert_eq!(
            activate(&Peek, &mut board, Target::cell((2, 2)), &mut findings),
            ActivationOutcome::Rejected
        );

        findings.expire(12);
        assert_eq!(findings.peek, None);
    }

    #[test]
    fn danger_sense_marks_at_most_three_risky_cells() {
        let mines = [(0, 0), (0, 1), (0, 2), (2, 0), (2, 2), (4, 4), (4, 1)];
        let board = layout((5, 5), &mines);
        let mut run = RunState::default();
        run.add_relic(RelicId::DangerSense);

        let overlays = refresh(&DangerSense, &board, &run);

        assert!(!overlays.danger.is_empty());
        assert!(overlays.danger.len() <= 3);
        for &pos in &overlays.danger {
            assert!(!board[pos].is_mine);
            assert!(board[pos].adjacent_mines >= 3);
        }
        assert_eq!(overlays, refresh(&DangerSense, &board, &run));
    }

    #[test]
    fn pattern_memory_points_next_to_dense_numbers() {
        let board = layout((3, 3), &[(0, 0), (0, 1), (1, 0)]);
        let (board, _) = board.reveal((1, 1));
        let run = RunState::default();

        let overlays = refresh(&PatternMemory, &board, &run);

        assert_eq!(overlays.pattern_memory.len(), 1);
        let pos = *overlays.pattern_memory.first().unwrap();
        assert!(!board[pos].is_mine);
        assert!(board[pos].is_hidden());
    }

    #[test]
    fn lens_only_shows_after_use() {
        let board = layout((3, 3), &[(0, 0)]);
        let (board, _) = board.reveal((1, 1));
        let mut run = RunState::default();
        run.add_relic(RelicId::ProbabilityLens);

        assert!(refresh(&ProbabilityLens, &board, &run).lens.is_empty());

        assert!(run.consume(RelicId::ProbabilityLens));
        assert_eq!(refresh(&ProbabilityLens, &board, &run).lens.len(), 3);
    }

    #[test]
    fn oracle_raises_density() {
        let mut setup = FloorSetup {
            density: DensitySurcharge::default(),
            placement: Placement::for_modifiers(&AscensionModifiers::for_level(AscensionLevel::NONE)),
        };
        OraclesGift.on_floor_setup(&mut setup);
        assert_eq!(setup.density.total_percent(), ORACLE_DENSITY_PERCENT);
    }
}
