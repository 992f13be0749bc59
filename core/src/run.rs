use serde::{Deserialize, Serialize};

use crate::*;

/// Usage state of one owned relic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Tracker {
    Passive,
    FloorFlag { used: bool },
    RunFlag { used: bool },
    #[serde(rename_all = "camelCase")]
    Charges { remaining: u8, per_floor: u8 },
    Primed { primed: bool },
}

impl Tracker {
    pub const fn for_usage(usage: Usage) -> Self {
        match usage {
            Usage::Unlimited => Self::Passive,
            Usage::OncePerFloor => Self::FloorFlag { used: false },
            Usage::OncePerRun => Self::RunFlag { used: false },
            Usage::Charges(per_floor) => Self::Charges {
                remaining: per_floor,
                per_floor,
            },
            Usage::Primed => Self::Primed { primed: false },
        }
    }

    pub const fn is_available(&self) -> bool {
        match *self {
            Self::Passive => true,
            Self::FloorFlag { used } | Self::RunFlag { used } => !used,
            Self::Charges { remaining, .. } => remaining > 0,
            Self::Primed { primed } => primed,
        }
    }

    /// Spends one use. Returns false, leaving the tracker untouched, when nothing was left.
    pub fn consume(&mut self) -> bool {
        if !self.is_available() {
            return false;
        }
        match self {
            Self::Passive => {}
            Self::FloorFlag { used } | Self::RunFlag { used } => *used = true,
            Self::Charges { remaining, .. } => *remaining -= 1,
            Self::Primed { primed } => *primed = false,
        }
        true
    }

    pub fn reset_for_floor(&mut self) {
        match self {
            Self::Passive | Self::RunFlag { .. } => {}
            Self::FloorFlag { used } => *used = false,
            Self::Charges {
                remaining,
                per_floor,
            } => *remaining = *per_floor,
            Self::Primed { primed } => *primed = false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedRelic {
    pub id: RelicId,
    pub tracker: Tracker,
}

impl OwnedRelic {
    pub fn new(id: RelicId) -> Self {
        Self {
            id,
            tracker: Tracker::for_usage(id.power_up().usage),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub current_floor: u8,
    pub score: u64,
    /// Owned relics in the order they were drafted.
    pub relics: Vec<OwnedRelic>,
    #[serde(rename = "ascensionLevel")]
    pub ascension: AscensionLevel,
    pub seed: RunSeed,
    pub trauma_stacks: u32,
    /// Active relic currently waiting for a target.
    pub armed: Option<RelicId>,
    /// Restarts of the current floor, mixed into its random streams.
    pub floor_attempt: u8,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(AscensionLevel::NONE, RunSeed::default())
    }
}

impl RunState {
    pub fn new(ascension: AscensionLevel, seed: RunSeed) -> Self {
        Self {
            current_floor: 1,
            score: 0,
            relics: Vec::new(),
            ascension,
            seed,
            trauma_stacks: 0,
            armed: None,
            floor_attempt: 0,
        }
    }

    pub fn modifiers(&self) -> AscensionModifiers {
        self.ascension.modifiers()
    }

    pub fn has(&self, id: RelicId) -> bool {
        self.relics.iter().any(|relic| relic.id == id)
    }

    pub fn relic_ids(&self) -> Vec<RelicId> {
        self.relics.iter().map(|relic| relic.id).collect()
    }

    /// Owned relics in catalog order, which is the order their effects fire in.
    pub fn dispatch_order(&self) -> impl Iterator<Item = RelicId> + '_ {
        RelicId::ALL.iter().copied().filter(|&id| self.has(id))
    }

    pub fn tracker(&self, id: RelicId) -> Option<&Tracker> {
        self.relics
            .iter()
            .find(|relic| relic.id == id)
            .map(|relic| &relic.tracker)
    }

    fn tracker_mut(&mut self, id: RelicId) -> Option<&mut Tracker> {
        self.relics
            .iter_mut()
            .find(|relic| relic.id == id)
            .map(|relic| &mut relic.tracker)
    }

    pub fn is_available(&self, id: RelicId) -> bool {
        self.tracker(id).is_some_and(Tracker::is_available)
    }

    /// Spends a use of an owned relic, if one is left.
    pub fn consume(&mut self, id: RelicId) -> bool {
        self.tracker_mut(id).is_some_and(Tracker::consume)
    }

    pub fn prime(&mut self, id: RelicId) {
        if let Some(Tracker::Primed { primed }) = self.tracker_mut(id) {
            *primed = true;
        }
    }

    /// Drops every primed effect. Flagging and relic use do this.
    pub fn clear_primed(&mut self) {
        for relic in &mut self.relics {
            if let Tracker::Primed { primed } = &mut relic.tracker {
                *primed = false;
            }
        }
    }

    pub fn add_relic(&mut self, id: RelicId) {
        if self.has(id) {
            log::warn!("Relic {} already owned", id.as_str());
            return;
        }
        self.relics.push(OwnedRelic::new(id));
    }

    /// Moves to `floor` and refreshes every per-floor tracker.
    pub fn begin_floor(&mut self, floor: u8) {
        self.current_floor = floor.clamp(1, MAX_FLOOR);
        self.floor_attempt = 0;
        self.reset_floor_trackers();
    }

    /// Restarts the current floor with fresh per-floor trackers and new random streams.
    pub fn restart_floor(&mut self) {
        self.floor_attempt = self.floor_attempt.saturating_add(1);
        self.reset_floor_trackers();
    }

    fn reset_floor_trackers(&mut self) {
        self.armed = None;
        for relic in &mut self.relics {
            relic.tracker.reset_for_floor();
        }
    }

    pub fn stream(&self, purpose: Stream) -> rand_chacha::ChaCha8Rng {
        self.seed
            .stream(self.current_floor, self.floor_attempt, purpose)
    }

    pub fn rank(&self, purpose: Stream, coords: Coord2) -> u64 {
        self.seed
            .rank(self.current_floor, self.floor_attempt, purpose, coords)
    }
}
