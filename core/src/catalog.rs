//! Static relic registry and draft selection.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
}

impl Rarity {
    /// Relative draft weight. The four weights sum to 100.
    pub const fn weight(self) -> u32 {
        match self {
            Self::Common => 50,
            Self::Uncommon => 30,
            Self::Rare => 15,
            Self::Epic => 5,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelicKind {
    Passive,
    Active,
}

/// What an active relic needs from the player when it is used.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetKind {
    None,
    Cell,
    Line,
}

/// How often a relic may fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Usage {
    /// Always on.
    Unlimited,
    /// Once, then spent until the next floor.
    OncePerFloor,
    /// Once per run.
    OncePerRun,
    /// A fixed number of charges restored each floor.
    Charges(u8),
    /// Armed by play, spent when it fires, disarmed on every floor.
    Primed,
}

/// Immutable relic definition.
#[derive(Debug, PartialEq, Eq)]
pub struct PowerUp {
    pub id: RelicId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub kind: RelicKind,
    pub rarity: Rarity,
    pub usage: Usage,
    pub target: TargetKind,
}

impl PowerUp {
    pub const fn uses_per_floor(&self) -> Option<u8> {
        match (self.kind, self.usage) {
            (RelicKind::Active, Usage::OncePerFloor) => Some(1),
            (RelicKind::Active, Usage::Charges(n)) => Some(n),
            _ => None,
        }
    }
}

macro_rules! relics {
    ($($variant:ident => $id:literal, $name:literal, $icon:literal, $kind:ident, $rarity:ident, $usage:expr, $target:ident, $desc:literal;)*) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum RelicId {
            $(#[serde(rename = $id)] $variant,)*
        }

        impl RelicId {
            pub const ALL: &'static [RelicId] = &[$(RelicId::$variant,)*];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(RelicId::$variant => $id,)*
                }
            }

            pub fn parse(id: &str) -> Option<Self> {
                match id {
                    $($id => Some(RelicId::$variant),)*
                    _ => None,
                }
            }
        }

        static CATALOG: &[PowerUp] = &[
            $(PowerUp {
                id: RelicId::$variant,
                name: $name,
                description: $desc,
                icon: $icon,
                kind: RelicKind::$kind,
                rarity: Rarity::$rarity,
                usage: $usage,
                target: TargetKind::$target,
            },)*
        ];
    };
}

relics! {
    EdgeWalker => "edge-walker", "Edge Walker", "🧭", Passive, Common, Usage::Unlimited, None,
        "All four corners are revealed if safe or flagged if mined after the first click";
    DangerSense => "danger-sense", "Danger Sense", "⚠️", Passive, Common, Usage::Unlimited, None,
        "Up to 3 hidden safe cells touching 3+ mines glow";
    CautiousStart => "cautious-start", "Cautious Start", "🐢", Passive, Common, Usage::Unlimited, None,
        "The first click of each floor touches at most 2 mines";
    HeatMap => "heat-map", "Heat Map", "🌡️", Passive, Common, Usage::Unlimited, None,
        "Revealed numbers are tinted by danger";
    QuickRecovery => "quick-recovery", "Quick Recovery", "💫", Passive, Common, Usage::OncePerRun, None,
        "Dying before revealing 10 cells restarts the floor, once per run";
    BreathingRoom => "breathing-room", "Breathing Room", "🫁", Passive, Common, Usage::Unlimited, None,
        "The first click of each floor opens a guaranteed safe 2×2 block";
    FloorScout => "floor-scout", "Floor Scout", "🔍", Passive, Common, Usage::Unlimited, None,
        "Shows how many cells touch no mines after the first click";
    PatternMemory => "pattern-memory", "Pattern Memory", "🧩", Passive, Uncommon, Usage::Unlimited, None,
        "Revealing a 3+ marks one of its hidden neighbours as safe";
    Survey => "survey", "Survey", "📊", Active, Uncommon, Usage::OncePerFloor, Line,
        "Once per floor, count the mines in a row or column";
    Momentum => "momentum", "Momentum", "⚡", Passive, Uncommon, Usage::Primed, None,
        "After a cascade of 5+ cells the next mine you click is flagged instead";
    LuckyStart => "lucky-start", "Lucky Start", "🍀", Passive, Uncommon, Usage::OncePerFloor, None,
        "The first click also reveals 3 safe cells far from the opening";
    SixthSense => "sixth-sense", "Sixth Sense", "✨", Passive, Uncommon, Usage::Unlimited, None,
        "The first click is redirected to the nearest cell touching no mines";
    MineDetector => "mine-detector", "Mine Detector", "📡", Active, Uncommon, Usage::Charges(3), Cell,
        "Three scans per floor count the mines in a 5×5 area around a hidden cell";
    SteadyHand => "steady-hand", "Steady Hand", "✋", Passive, Uncommon, Usage::OncePerFloor, None,
        "Once per floor, a chord set off by a misplaced flag is cancelled and the flag removed";
    Peek => "peek", "Peek", "👀", Active, Rare, Usage::OncePerFloor, Cell,
        "Once per floor, preview a hidden cell without revealing it";
    SafePath => "safe-path", "Safe Path", "🛤️", Active, Rare, Usage::OncePerFloor, Line,
        "Once per floor, reveal up to 3 safe cells in a row or column";
    DefusalKit => "defusal-kit", "Defusal Kit", "🔧", Active, Rare, Usage::OncePerFloor, Cell,
        "Once per floor, remove a correctly flagged mine. A wrong flag wastes the charge";
    IronWill => "iron-will", "Iron Will", "🛡️", Passive, Rare, Usage::OncePerFloor, None,
        "Once per floor, a mine you hit is flagged instead. Each save adds 5% mine density";
    XRayVision => "x-ray-vision", "X-Ray Vision", "👁️", Active, Rare, Usage::OncePerFloor, Cell,
        "Once per floor, safely open a 3×3 area with its mines flagged";
    ProbabilityLens => "probability-lens", "Probability Lens", "🔮", Active, Epic, Usage::OncePerFloor, None,
        "Once per floor, highlight the 3 safest hidden cells";
    OraclesGift => "oracles-gift", "Oracle's Gift", "🌟", Passive, Epic, Usage::Unlimited, None,
        "Forced 50/50 guesses show the safe side. Floors hold 25% more mines";
}

impl RelicId {
    pub fn power_up(self) -> &'static PowerUp {
        &CATALOG[self as usize]
    }

    pub fn is_active(self) -> bool {
        self.power_up().kind == RelicKind::Active
    }
}

impl fmt::Display for RelicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.power_up().name)
    }
}

/// Extra mine density carried by Oracle's Gift, in percent.
pub const ORACLE_DENSITY_PERCENT: u32 = 25;

/// Draws up to `count` distinct relics the player does not own yet, weighted by rarity.
pub fn draft_options<R: Rng + ?Sized>(owned: &[RelicId], count: u8, rng: &mut R) -> Vec<RelicId> {
    let mut pool: Vec<RelicId> = RelicId::ALL
        .iter()
        .copied()
        .filter(|id| !owned.contains(id))
        .collect();
    let mut picks = Vec::with_capacity(count as usize);

    while picks.len() < count as usize && !pool.is_empty() {
        let total: u32 = pool.iter().map(|id| id.power_up().rarity.weight()).sum();
        let mut roll = rng.random_range(0..total);
        let index = pool
            .iter()
            .position(|id| {
                let weight = id.power_up().rarity.weight();
                if roll < weight {
                    true
                } else {
                    roll -= weight;
                    false
                }
            })
            .unwrap_or(pool.len() - 1);
        picks.push(pool.remove(index));
    }

    log::debug!("Draft offers {:?}", picks);
    picks
}
