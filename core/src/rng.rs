//! Seeded randomness for a run.
//!
//! Every random decision of a run draws from its own ChaCha8 stream, keyed by the run seed, the
//! floor, the attempt on that floor and a purpose tag. Replaying the same actions against the
//! same seed reproduces the same run, and adding draws to one purpose never perturbs another.

use core::fmt;
use core::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::Coord2;

/// Symbols of a share code. Visually ambiguous glyphs (`0/O`, `1/I`) are left out.
const SHARE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SHARE_CODE_LEN: usize = 6;
const SEED_BITS: u32 = 5 * SHARE_CODE_LEN as u32;
const SEED_MASK: u64 = (1 << SEED_BITS) - 1;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Run seed, restricted to the values a six-character share code can express.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct RunSeed(u64);

impl RunSeed {
    pub const fn new(raw: u64) -> Self {
        Self(raw & SEED_MASK)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn share_code(self) -> String {
        (0..SHARE_CODE_LEN)
            .rev()
            .map(|i| {
                let symbol = (self.0 >> (5 * i)) & 0x1f;
                SHARE_ALPHABET[symbol as usize] as char
            })
            .collect()
    }

    pub fn from_share_code(code: &str) -> Option<Self> {
        if code.len() != SHARE_CODE_LEN {
            return None;
        }
        code.bytes().try_fold(0u64, |acc, byte| {
            let byte = byte.to_ascii_uppercase();
            let symbol = SHARE_ALPHABET.iter().position(|&s| s == byte)?;
            Some((acc << 5) | symbol as u64)
        })
        .map(Self)
    }

    /// Independent generator for one purpose on one floor attempt.
    pub fn stream(self, floor: u8, attempt: u8, purpose: Stream) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.stream_seed(floor, attempt, purpose))
    }

    pub fn stream_seed(self, floor: u8, attempt: u8, purpose: Stream) -> u64 {
        let key = (u64::from(floor) << 16) | (u64::from(attempt) << 8) | purpose.tag();
        mix(self.0 ^ mix(key.wrapping_mul(GOLDEN_GAMMA)))
    }

    /// Stable pseudo-random rank of a cell. Picking the lowest-ranked candidates keeps a
    /// selection steady while the candidate set changes around it.
    pub fn rank(self, floor: u8, attempt: u8, purpose: Stream, (row, col): Coord2) -> u64 {
        let cell = (u64::from(row) << 8) | u64::from(col);
        mix(self.stream_seed(floor, attempt, purpose) ^ cell.wrapping_mul(GOLDEN_GAMMA))
    }
}

impl From<u64> for RunSeed {
    fn from(raw: u64) -> Self {
        Self::new(raw)
    }
}

impl From<RunSeed> for u64 {
    fn from(seed: RunSeed) -> Self {
        seed.0
    }
}

impl fmt::Display for RunSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.share_code())
    }
}

impl FromStr for RunSeed {
    type Err = InvalidShareCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_share_code(s.trim()).ok_or(InvalidShareCode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("share codes are six characters from A-Z and 2-9, without I, O, 0 or 1")]
pub struct InvalidShareCode;

/// Purpose tag separating the random streams of a floor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Placement,
    Draft,
    LuckyStart,
    DangerSense,
    PatternMemory,
}

impl Stream {
    const fn tag(self) -> u64 {
        match self {
            Self::Placement => 1,
            Self::Draft => 2,
            Self::LuckyStart => 3,
            Self::DangerSense => 4,
            Self::PatternMemory => 5,
        }
    }
}

// splitmix64 finaliser
const fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
