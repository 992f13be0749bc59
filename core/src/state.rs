//! Run orchestration: the phase machine and the action reducer.

use serde::{Deserialize, Serialize};

use crate::effects::{
    Activation, ActivationOutcome, Defeat, Detonation, FirstClick, Refresh, RevealEvent,
    RevealSource, fire_activate, fire_defeat, fire_first_click, fire_refresh, fire_reveal,
};
use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    Start,
    Playing,
    /// A mine went off; waits for the explosion to finish playing.
    Exploding,
    /// A shield absorbed a mine; waits before play resumes.
    IronWillSave,
    FloorClear,
    Draft,
    RunOver,
    Victory,
}

impl Phase {
    /// Phases whose run can be saved and resumed later.
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Playing | Self::Draft | Self::FloorClear)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::RunOver | Self::Victory)
    }
}

/// Logical input from the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    StartRun {
        #[serde(default)]
        ascension: AscensionLevel,
        #[serde(default)]
        seed: RunSeed,
    },
    ReturnToStart,
    Reveal {
        row: Coord,
        col: Coord,
    },
    ToggleFlag {
        row: Coord,
        col: Coord,
    },
    Chord {
        row: Coord,
        col: Coord,
    },
    /// Toggles targeting mode for an active relic.
    ArmRelic {
        relic: RelicId,
    },
    ActivateRelic {
        relic: RelicId,
        #[serde(default)]
        target: Target,
    },
    SelectDraft {
        relic: RelicId,
    },
    SkipDraft,
    /// One second of floor time.
    Tick,
    /// The host finished animating `phase`.
    AnimationComplete {
        phase: Phase,
    },
    SetLayout {
        layout: Layout,
    },
    HighlightChord {
        row: Coord,
        col: Coord,
    },
    ClearChordHighlight,
}

/// Floor clock, in whole seconds since the first click.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clock {
    pub elapsed: u32,
    /// Time limit when the clock counts down.
    #[serde(default)]
    pub countdown: Option<u32>,
}

/// Largest value the clock display shows.
pub const CLOCK_DISPLAY_MAX: u32 = 999;

impl Clock {
    pub const fn for_modifiers(modifiers: &AscensionModifiers) -> Self {
        Self {
            elapsed: 0,
            countdown: modifiers.countdown_secs,
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        self.countdown
            .map(|limit| limit.saturating_sub(self.elapsed))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Value to show: seconds left when counting down, else seconds elapsed.
    pub fn display(&self) -> u32 {
        self.remaining()
            .unwrap_or(self.elapsed)
            .min(CLOCK_DISPLAY_MAX)
    }
}

/// Floor time at which a numbered cell was revealed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealStamp {
    pub cell: Coord2,
    pub at: u32,
}

/// Complete state of a session, handed read-only to the host after every action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: Phase,
    pub board: Board,
    pub floor_config: FloorConfig,
    pub layout: Layout,
    pub run: RunState,
    pub clock: Clock,
    /// Mines are placed on the first reveal of a floor.
    pub first_click_pending: bool,
    pub draft_options: Vec<RelicId>,
    pub cells_revealed_this_floor: u32,
    pub exploded_cell: Option<Coord2>,
    pub close_call_cell: Option<Coord2>,
    #[serde(default)]
    pub reveal_stamps: Vec<RevealStamp>,
    #[serde(default)]
    pub findings: Findings,
    #[serde(skip)]
    chord_target: Option<Coord2>,
    #[serde(skip)]
    overlays: Overlays,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

impl GameState {
    /// Fresh session on the start screen.
    pub fn new(layout: Layout) -> Self {
        let floor_config = FloorConfig::base(1, layout);
        Self {
            phase: Phase::Start,
            board: Board::for_floor(&floor_config, Topology::Bounded),
            floor_config,
            layout,
            run: RunState::default(),
            clock: Clock::default(),
            first_click_pending: true,
            draft_options: Vec::new(),
            cells_revealed_this_floor: 0,
            exploded_cell: None,
            close_call_cell: None,
            reveal_stamps: Vec::new(),
            findings: Findings::default(),
            chord_target: None,
            overlays: Overlays::default(),
        }
    }

    /// Flag counter shown to the player. Goes negative when over-flagged.
    pub fn mines_remaining(&self) -> i32 {
        i32::from(self.floor_config.mines) - i32::from(self.board.count_flags())
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn mines_placed(&self) -> bool {
        !self.first_click_pending
    }

    /// Rebuilds state that is never persisted. Call after deserializing.
    pub fn restore_derived(&mut self) {
        self.chord_target = None;
        self.refresh_overlays();
    }

    /// Pure transition: the state after `action`, leaving `self` untouched.
    pub fn reduce(&self, action: &Action) -> Self {
        let mut next = self.clone();
        next.apply(action);
        next
    }

    pub fn apply(&mut self, action: &Action) {
        use Action::*;

        log::trace!("Applying {:?} in {:?}", action, self.phase);
        match *action {
            StartRun { ascension, seed } => self.start_run(ascension, seed),
            ReturnToStart => *self = Self::new(self.layout),
            Reveal { row, col } => self.reveal((row, col)),
            ToggleFlag { row, col } => self.toggle_flag((row, col)),
            Chord { row, col } => self.chord((row, col)),
            ArmRelic { relic } => self.arm(relic),
            ActivateRelic { relic, target } => self.activate(relic, target),
            SelectDraft { relic } => self.select_draft(relic),
            SkipDraft => self.skip_draft(),
            Tick => self.tick(),
            AnimationComplete { phase } => self.animation_complete(phase),
            SetLayout { layout } => self.set_layout(layout),
            HighlightChord { row, col } => {
                if self.phase == Phase::Playing && self.board.contains((row, col)) {
                    self.chord_target = Some((row, col));
                }
            }
            ClearChordHighlight => self.chord_target = None,
        }
        self.refresh_overlays();
    }

    fn start_run(&mut self, ascension: AscensionLevel, seed: RunSeed) {
        log::info!("Starting run {} at ascension {}", seed, ascension.get());
        let layout = self.layout;
        *self = Self::new(layout);
        self.run = RunState::new(ascension, seed);
        self.run.begin_floor(1);
        self.enter_floor();
    }

    /// Sets up the current floor of the run from scratch.
    fn enter_floor(&mut self) {
        let setup = FloorSetup::for_run(&self.run);
        let modifiers = self.run.modifiers();
        self.floor_config = FloorConfig::with_density(
            self.run.current_floor,
            self.layout,
            setup.density.total_percent(),
        );
        self.board = Board::for_floor(&self.floor_config, modifiers.topology);
        self.clock = Clock::for_modifiers(&modifiers);
        self.first_click_pending = true;
        self.draft_options.clear();
        self.cells_revealed_this_floor = 0;
        self.exploded_cell = None;
        self.close_call_cell = None;
        self.reveal_stamps.clear();
        self.findings = Findings::default();
        self.chord_target = None;
        self.phase = Phase::Playing;
        log::debug!(
            "Floor {} (attempt {}): {}x{} with {} mines",
            self.floor_config.floor,
            self.run.floor_attempt,
            self.floor_config.rows,
            self.floor_config.cols,
            self.floor_config.mines
        );
    }

    fn can_play_at(&self, coords: Coord2) -> bool {
        self.phase == Phase::Playing && self.board.contains(coords)
    }

    fn reveal(&mut self, coords: Coord2) {
        if !self.can_play_at(coords) {
            return;
        }
        if self.first_click_pending {
            self.first_click(coords);
            return;
        }

        let before = self.board.clone();
        let report = self.board.reveal_in_place(coords);
        self.settle(RevealSource::Click(coords), &before, report);
    }

    fn first_click(&mut self, coords: Coord2) {
        let placement = FloorSetup::for_run(&self.run).placement;
        let seed = self.run.seed.stream_seed(
            self.run.current_floor,
            self.run.floor_attempt,
            Stream::Placement,
        );
        self.board = RandomBoardGenerator::new(seed, coords, placement.zone)
            .cautious(placement.cautious)
            .generate(&self.floor_config, self.board.topology());
        self.first_click_pending = false;
        let before = self.board.clone();

        let opening = if placement.redirect_to_zero {
            nearest_zero(&self.board, coords).unwrap_or(coords)
        } else {
            coords
        };
        let mut report = self.board.reveal_in_place(opening);
        if self.board[coords].is_hidden() {
            report |= self.board.reveal_in_place(coords);
        }

        fire_first_click(&mut FirstClick {
            board: &mut self.board,
            report: &mut report,
            run: &mut self.run,
        });
        self.settle(RevealSource::Click(coords), &before, report);
    }

    fn chord(&mut self, coords: Coord2) {
        if !self.can_play_at(coords) || self.first_click_pending {
            return;
        }
        let before = self.board.clone();
        let report = self.board.chord_in_place(coords);
        self.settle(RevealSource::Chord(coords), &before, report);
    }

    /// Runs the reveal hooks over a finished reveal and moves to the phase it leads to.
    fn settle(&mut self, source: RevealSource, before: &Board, mut report: Reveal) {
        if !report.outcome().has_update() {
            return;
        }

        let detonation = if report.detonated.is_empty() {
            Detonation::None
        } else {
            Detonation::Pending
        };
        let mut event = RevealEvent {
            source,
            before,
            board: &mut self.board,
            report: &mut report,
            run: &mut self.run,
            detonation,
        };
        fire_reveal(&mut event);
        let detonation = event.detonation;

        self.award(&report);
        match detonation {
            Detonation::Pending => {
                self.exploded_cell = report.detonated.first().copied();
                self.run.armed = None;
                self.phase = Phase::Exploding;
                log::debug!("Mine hit at {:?}", self.exploded_cell);
            }
            Detonation::Saved(coords) => {
                self.close_call_cell = Some(coords);
                self.phase = Phase::IronWillSave;
            }
            Detonation::None | Detonation::Averted => self.check_cleared(),
        }
    }

    /// Scores newly opened cells and stamps them for amnesia.
    fn award(&mut self, report: &Reveal) {
        let cells = report.opened_count();
        if cells == 0 {
            return;
        }
        self.cells_revealed_this_floor += cells;
        self.run.score += scoring::reveal_score(cells, self.run.current_floor);

        if self.run.modifiers().amnesia_secs.is_some() {
            let at = self.clock.elapsed;
            self.reveal_stamps.extend(
                report
                    .opened
                    .iter()
                    .filter(|&&cell| self.board[cell].adjacent_mines > 0)
                    .map(|&cell| RevealStamp { cell, at }),
            );
        }
    }

    fn check_cleared(&mut self) {
        if !self.board.is_cleared() {
            return;
        }

        let floor = self.run.current_floor;
        let bonus = scoring::floor_clear_bonus(floor, self.clock.elapsed);
        self.run.score += bonus;
        self.run.armed = None;
        self.draft_options = if self.floor_config.is_final() {
            Vec::new()
        } else {
            let mut rng = self.run.stream(Stream::Draft);
            draft_options(
                &self.run.relic_ids(),
                self.run.modifiers().draft_choices,
                &mut rng,
            )
        };
        self.phase = Phase::FloorClear;
        log::debug!(
            "Floor {} cleared in {}s, bonus {}",
            floor,
            self.clock.elapsed,
            bonus
        );
    }

    fn toggle_flag(&mut self, coords: Coord2) {
        if !self.can_play_at(coords) || self.first_click_pending {
            return;
        }
        if self.board.toggle_flag_in_place(coords).has_update() {
            self.run.clear_primed();
        }
    }

    fn arm(&mut self, relic: RelicId) {
        if self.phase != Phase::Playing
            || !relic.is_active()
            || relic.power_up().target == TargetKind::None
            || !self.run.is_available(relic)
        {
            return;
        }
        self.run.armed = if self.run.armed == Some(relic) {
            None
        } else {
            Some(relic)
        };
    }

    fn activate(&mut self, relic: RelicId, target: Target) {
        if self.phase != Phase::Playing
            || self.first_click_pending
            || !relic.is_active()
            || !self.run.is_available(relic)
        {
            return;
        }

        let mut report = Reveal::default();
        let outcome = fire_activate(
            relic,
            &mut Activation {
                target,
                board: &mut self.board,
                floor_config: &mut self.floor_config,
                findings: &mut self.findings,
                report: &mut report,
                now: self.clock.elapsed,
            },
        );
        if outcome == ActivationOutcome::Rejected {
            log::debug!("{} rejected target {:?}", relic, target);
            return;
        }

        self.run.consume(relic);
        self.run.armed = None;
        self.run.clear_primed();
        log::debug!("{} used on {:?}", relic, target);

        self.award(&report);
        self.check_cleared();
    }

    fn tick(&mut self) {
        if self.phase != Phase::Playing || self.first_click_pending {
            return;
        }
        self.clock.elapsed = self.clock.elapsed.saturating_add(1);
        self.findings.expire(self.clock.elapsed);

        if self.clock.is_expired() {
            log::info!("Countdown expired on floor {}", self.run.current_floor);
            self.exploded_cell = None;
            self.run.armed = None;
            self.phase = Phase::Exploding;
        }
    }

    fn animation_complete(&mut self, phase: Phase) {
        if phase != self.phase {
            log::debug!(
                "Ignoring completion of {:?} while in {:?}",
                phase,
                self.phase
            );
            return;
        }

        match phase {
            Phase::Exploding => self.resolve_defeat(),
            Phase::IronWillSave => {
                self.close_call_cell = None;
                self.phase = Phase::Playing;
                self.check_cleared();
            }
            Phase::FloorClear => {
                self.phase = if self.floor_config.is_final() {
                    log::info!("Run won with {} points", self.run.score);
                    Phase::Victory
                } else {
                    Phase::Draft
                };
            }
            _ => {}
        }
    }

    fn resolve_defeat(&mut self) {
        let mut defeat = Defeat {
            cells_revealed: self.cells_revealed_this_floor,
            run: &mut self.run,
            restart: false,
        };
        fire_defeat(&mut defeat);

        if defeat.restart {
            self.run.restart_floor();
            self.enter_floor();
        } else {
            self.board = self.board.reveal_all_mines();
            self.phase = Phase::RunOver;
            log::info!(
                "Run over on floor {} with {} points",
                self.run.current_floor,
                self.run.score
            );
        }
    }

    fn select_draft(&mut self, relic: RelicId) {
        if self.phase != Phase::Draft || !self.draft_options.contains(&relic) {
            return;
        }
        self.run.add_relic(relic);
        self.advance_floor();
    }

    fn skip_draft(&mut self) {
        if self.phase != Phase::Draft {
            return;
        }
        self.run.score += scoring::skip_draft_bonus(self.run.current_floor);
        self.advance_floor();
    }

    fn advance_floor(&mut self) {
        self.run.begin_floor(self.run.current_floor + 1);
        self.enter_floor();
    }

    fn set_layout(&mut self, layout: Layout) {
        if self.layout == layout {
            return;
        }
        self.layout = layout;
        match self.phase {
            Phase::Start => *self = Self::new(layout),
            Phase::Playing if self.first_click_pending => {
                let setup = FloorSetup::for_run(&self.run);
                self.floor_config = FloorConfig::with_density(
                    self.run.current_floor,
                    layout,
                    setup.density.total_percent(),
                );
                self.board = Board::for_floor(&self.floor_config, self.board.topology());
            }
            // A floor in progress keeps its dimensions; the next one picks up the layout.
            _ => {}
        }
    }

    fn refresh_overlays(&mut self) {
        let mut overlays = Overlays::default();
        if let Some(center) = self.chord_target {
            overlays.chord_highlight = self.board.chord_highlight(center);
        }
        if let Some(window) = self.run.modifiers().amnesia_secs {
            let now = self.clock.elapsed;
            overlays.faded = self
                .reveal_stamps
                .iter()
                .filter(|stamp| now.saturating_sub(stamp.at) >= window)
                .map(|stamp| stamp.cell)
                .filter(|&cell| self.board.get(cell).is_some_and(Cell::is_revealed))
                .collect();
        }
        fire_refresh(&mut Refresh {
            board: &self.board,
            run: &self.run,
            mines_placed: self.mines_placed(),
            overlays: &mut overlays,
        });
        self.overlays = overlays;
    }
}
