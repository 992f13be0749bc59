use core::fmt;

use serde::{Deserialize, Serialize};

use crate::*;

/// Cumulative difficulty tier of a run, `0..=5`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct AscensionLevel(u8);

impl AscensionLevel {
    pub const NONE: Self = Self(0);
    pub const MAX: Self = Self(5);

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Clamps an arbitrary level into range.
    pub const fn saturating(level: u8) -> Self {
        if level > Self::MAX.0 {
            Self::MAX
        } else {
            Self(level)
        }
    }

    pub fn next(self) -> Self {
        Self::saturating(self.0 + 1)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::MAX.0).map(Self)
    }

    pub fn modifiers(self) -> AscensionModifiers {
        AscensionModifiers::for_level(self)
    }

    pub const fn name(self) -> &'static str {
        ASCENSION_NAMES[self.0 as usize]
    }
}

impl TryFrom<u8> for AscensionLevel {
    type Error = GameError;

    fn try_from(level: u8) -> Result<Self> {
        if level <= Self::MAX.0 {
            Ok(Self(level))
        } else {
            Err(GameError::InvalidAscension(level))
        }
    }
}

impl From<AscensionLevel> for u8 {
    fn from(level: AscensionLevel) -> Self {
        level.0
    }
}

impl fmt::Display for AscensionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const ASCENSION_NAMES: [&str; 6] = [
    "Normal",
    "Ascension I",
    "Ascension II",
    "Ascension III",
    "Ascension IV",
    "Ascension V",
];

pub const STANDARD_DRAFT_CHOICES: u8 = 3;
pub const NARROW_DRAFT_CHOICES: u8 = 2;
pub const COUNTDOWN_SECS: u32 = 90;
pub const MINE_PRESSURE_PERCENT: u32 = 15;
pub const AMNESIA_SECS: u32 = 8;

/// Gameplay changes in force at a given ascension level.
///
/// Each field only ever switches on as the level rises.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AscensionModifiers {
    /// First click only guarantees the clicked cell, not a cascade.
    pub cold_start: bool,
    pub draft_choices: u8,
    /// Floor clock counts down from this many seconds instead of up.
    pub countdown_secs: Option<u32>,
    pub density_percent: u32,
    /// Revealed numbers fade after this many seconds.
    pub amnesia_secs: Option<u32>,
    pub topology: Topology,
}

impl AscensionModifiers {
    pub const fn for_level(level: AscensionLevel) -> Self {
        let level = level.0;
        Self {
            cold_start: level >= 1,
            draft_choices: if level >= 1 {
                NARROW_DRAFT_CHOICES
            } else {
                STANDARD_DRAFT_CHOICES
            },
            countdown_secs: if level >= 2 { Some(COUNTDOWN_SECS) } else { None },
            density_percent: if level >= 3 { MINE_PRESSURE_PERCENT } else { 0 },
            amnesia_secs: if level >= 4 { Some(AMNESIA_SECS) } else { None },
            topology: if level >= 5 {
                Topology::Toroidal
            } else {
                Topology::Bounded
            },
        }
    }

    /// True when every modifier of `other` is also in force here.
    pub fn includes(&self, other: &Self) -> bool {
        (self.cold_start || !other.cold_start)
            && self.draft_choices <= other.draft_choices
            && (self.countdown_secs.is_some() || other.countdown_secs.is_none())
            && self.density_percent >= other.density_percent
            && (self.amnesia_secs.is_some() || other.amnesia_secs.is_none())
            && (self.topology == Topology::Toroidal || other.topology == Topology::Bounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_has_no_modifiers() {
        let mods = AscensionLevel::NONE.modifiers();
        assert!(!mods.cold_start);
        assert_eq!(mods.draft_choices, 3);
        assert_eq!(mods.countdown_secs, None);
        assert_eq!(mods.density_percent, 0);
        assert_eq!(mods.amnesia_secs, None);
        assert_eq!(mods.topology, Topology::Bounded);
    }

    #[test]
    fn max_level_has_everything() {
        let mods = AscensionLevel::MAX.modifiers();
        assert!(mods.cold_start);
        assert_eq!(mods.draft_choices, 2);
        assert_eq!(mods.countdown_secs, Some(90));
        assert_eq!(mods.density_percent, 15);
        assert_eq!(mods.amnesia_secs, Some(8));
        assert_eq!(mods.topology, Topology::Toroidal);
    }

    #[test]
    fn each_level_strictly_adds() {
        let levels: Vec<_> = AscensionLevel::all().collect();
        for pair in levels.windows(2) {
            let lower = pair[0].modifiers();
            let higher = pair[1].modifiers();
            assert!(higher.includes(&lower));
            assert_ne!(higher, lower);
        }
    }

    #[test]
    fn out_of_range_level_is_rejected() {
        assert_eq!(AscensionLevel::try_from(6), Err(GameError::InvalidAscension(6)));
        assert_eq!(AscensionLevel::saturating(9), AscensionLevel::MAX);
        assert!(serde_json::from_str::<AscensionLevel>("7").is_err());
        assert_eq!(AscensionLevel::MAX.next(), AscensionLevel::MAX);
    }
}
