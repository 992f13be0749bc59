//! Relic effect handlers.
//!
//! Each relic has a handler implementing [`RelicEffect`]. The orchestrator fires the hooks of
//! every owned relic in catalog order at floor setup, after the first click, after every reveal
//! or chord, on explicit activation, when the run is about to end, and whenever the derived
//! overlays are rebuilt.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::*;
pub use heuristics::*;

mod guard;
mod heuristics;
mod insight;
mod reveal;

/// A full row or column of the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Line {
    Row(Coord),
    Col(Coord),
}

impl Line {
    pub fn fits(self, (rows, cols): Coord2) -> bool {
        match self {
            Self::Row(row) => row < rows,
            Self::Col(col) => col < cols,
        }
    }

    pub fn cells(self, (rows, cols): Coord2) -> Vec<Coord2> {
        match self {
            Self::Row(row) => (0..cols).map(|col| (row, col)).collect(),
            Self::Col(col) => (0..rows).map(|row| (row, col)).collect(),
        }
    }
}

/// Target handed to an active relic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Target {
    #[default]
    None,
    Cell {
        row: Coord,
        col: Coord,
    },
    Line {
        line: Line,
    },
}

impl Target {
    pub const fn cell(coords: Coord2) -> Self {
        Self::Cell {
            row: coords.0,
            col: coords.1,
        }
    }

    pub const fn coords(self) -> Option<Coord2> {
        match self {
            Self::Cell { row, col } => Some((row, col)),
            _ => None,
        }
    }
}

/// First-click placement rules in force for a floor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub zone: StartZone,
    pub cautious: bool,
    /// Open the nearest zero cell instead of the clicked one.
    pub redirect_to_zero: bool,
}

impl Placement {
    pub const fn for_modifiers(modifiers: &AscensionModifiers) -> Self {
        Self {
            zone: if modifiers.cold_start {
                StartZone::Single
            } else {
                StartZone::Opening
            },
            cautious: false,
            redirect_to_zero: false,
        }
    }
}

/// Everything relics may adjust before a floor's board exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FloorSetup {
    pub density: DensitySurcharge,
    pub placement: Placement,
}

impl FloorSetup {
    pub fn for_run(run: &RunState) -> Self {
        let modifiers = run.modifiers();
        let mut setup = Self {
            density: DensitySurcharge {
                ascension: modifiers.density_percent,
                relics: 0,
                trauma_stacks: run.trauma_stacks,
            },
            placement: Placement::for_modifiers(&modifiers),
        };
        for id in run.dispatch_order() {
            effect(id).on_floor_setup(&mut setup);
        }
        setup
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PeekValue {
    Mine,
    Number(u8),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeekResult {
    pub cell: Coord2,
    pub value: PeekValue,
    pub expires_at: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub cell: Coord2,
    pub mines: CellCount,
    pub expires_at: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResult {
    pub line: Line,
    pub mines: CellCount,
}

pub const PEEK_SECS: u32 = 2;
pub const SCAN_SECS: u32 = 3;

/// Results of information relics on the current floor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    #[serde(skip)]
    pub peek: Option<PeekResult>,
    #[serde(skip)]
    pub scan: Option<ScanResult>,
    #[serde(default)]
    pub survey: Option<SurveyResult>,
    /// Cells the mine detector has already been pointed at this floor.
    #[serde(default)]
    pub scanned: BTreeSet<Coord2>,
}

impl Findings {
    /// Drops timed results whose display window has passed.
    pub fn expire(&mut self, now: u32) {
        if self.peek.is_some_and(|peek| now >= peek.expires_at) {
            self.peek = None;
        }
        if self.scan.is_some_and(|scan| now >= scan.expires_at) {
            self.scan = None;
        }
    }
}

/// Derived highlight sets, rebuilt after every change to the floor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlays {
    pub danger: BTreeSet<Coord2>,
    pub pattern_memory: BTreeSet<Coord2>,
    pub oracle: BTreeSet<Coord2>,
    pub lens: BTreeSet<Coord2>,
    pub faded: BTreeSet<Coord2>,
    pub chord_highlight: BTreeSet<Coord2>,
    pub heat_map: bool,
    pub zero_cells: Option<CellCount>,
}

pub(crate) struct FirstClick<'a> {
    pub board: &'a mut Board,
    pub report: &'a mut Reveal,
    pub run: &'a mut RunState,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RevealSource {
    Click(Coord2),
    Chord(Coord2),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Detonation {
    None,
    /// A mine went off and nothing has stepped in yet.
    Pending,
    /// Cancelled outright.
    Averted,
    /// Absorbed by a shield; the run pauses on the save.
    Saved(Coord2),
}

pub(crate) struct RevealEvent<'a> {
    pub source: RevealSource,
    pub before: &'a Board,
    pub board: &'a mut Board,
    pub report: &'a mut Reveal,
    pub run: &'a mut RunState,
    pub detonation: Detonation,
}

pub(crate) struct Activation<'a> {
    pub target: Target,
    pub board: &'a mut Board,
    pub floor_config: &'a mut FloorConfig,
    pub findings: &'a mut Findings,
    pub report: &'a mut Reveal,
    pub now: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ActivationOutcome {
    Rejected,
    Used,
}

pub(crate) struct Defeat<'a> {
    pub cells_revealed: u32,
    pub run: &'a mut RunState,
    pub restart: bool,
}

pub(crate) struct Refresh<'a> {
    pub board: &'a Board,
    pub run: &'a RunState,
    pub mines_placed: bool,
    pub overlays: &'a mut Overlays,
}

pub(crate) trait RelicEffect: Sync {
    fn on_floor_setup(&self, _setup: &mut FloorSetup) {}

    fn on_first_click(&self, _click: &mut FirstClick<'_>) {}

    fn on_reveal(&self, _event: &mut RevealEvent<'_>) {}

    fn on_activate(&self, _activation: &mut Activation<'_>) -> ActivationOutcome {
        ActivationOutcome::Rejected
    }

    fn on_defeat(&self, _defeat: &mut Defeat<'_>) {}

    fn on_refresh(&self, _refresh: &mut Refresh<'_>) {}
}

pub(crate) fn effect(id: RelicId) -> &'static dyn RelicEffect {
    use RelicId::*;
    match id {
        EdgeWalker => &reveal::EdgeWalker,
        DangerSense => &insight::DangerSense,
        CautiousStart => &reveal::CautiousStart,
        HeatMap => &insight::HeatMap,
        QuickRecovery => &guard::QuickRecovery,
        BreathingRoom => &reveal::BreathingRoom,
        FloorScout => &insight::FloorScout,
        PatternMemory => &insight::PatternMemory,
        Survey => &insight::Survey,
        Momentum => &guard::Momentum,
        LuckyStart => &reveal::LuckyStart,
        SixthSense => &reveal::SixthSense,
        MineDetector => &insight::MineDetector,
        SteadyHand => &guard::SteadyHand,
        Peek => &insight::Peek,
        SafePath => &reveal::SafePath,
        DefusalKit => &guard::DefusalKit,
        IronWill => &guard::IronWill,
        XRayVision => &reveal::XRayVision,
        ProbabilityLens => &insight::ProbabilityLens,
        OraclesGift => &insight::OraclesGift,
    }
}

pub(crate) fn fire_first_click(click: &mut FirstClick<'_>) {
    let order: Vec<_> = click.run.dispatch_order().collect();
    for id in order {
        effect(id).on_first_click(click);
    }
}

pub(crate) fn fire_reveal(event: &mut RevealEvent<'_>) {
    let order: Vec<_> = event.run.dispatch_order().collect();
    for id in order {
        effect(id).on_reveal(event);
    }
}

pub(crate) fn fire_activate(id: RelicId, activation: &mut Activation<'_>) -> ActivationOutcome {
    effect(id).on_activate(activation)
}

pub(crate) fn fire_defeat(defeat: &mut Defeat<'_>) {
    let order: Vec<_> = defeat.run.dispatch_order().collect();
    for id in order {
        effect(id).on_defeat(defeat);
    }
}

pub(crate) fn fire_refresh(refresh: &mut Refresh<'_>) {
    let run = refresh.run;
    for id in run.dispatch_order() {
        effect(id).on_refresh(refresh);
    }
}
