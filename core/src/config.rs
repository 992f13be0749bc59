//! Static tuning tables: floor dimensions, density surcharges and scoring.

use serde::{Deserialize, Serialize};

use crate::*;

pub const MAX_FLOOR: u8 = 10;

/// Cells kept free of mines around the first click in the widest opening.
const OPENING_CELLS: CellCount = 9;

/// Layout width reported by the host. Only ever changes board dimensions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    Wide,
    Compact,
}

impl Layout {
    pub const fn from_compact(compact: bool) -> Self {
        if compact { Self::Compact } else { Self::Wide }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorConfig {
    pub floor: u8,
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
}

const fn floor(floor: u8, rows: Coord, cols: Coord, mines: CellCount) -> FloorConfig {
    FloorConfig {
        floor,
        rows,
        cols,
        mines,
    }
}

const WIDE_FLOORS: [FloorConfig; MAX_FLOOR as usize] = [
    floor(1, 6, 6, 6),
    floor(2, 7, 7, 6),
    floor(3, 8, 8, 10),
    floor(4, 8, 8, 12),
    floor(5, 9, 9, 15),
    floor(6, 9, 9, 18),
    floor(7, 10, 10, 22),
    floor(8, 10, 10, 28),
    floor(9, 11, 11, 34),
    floor(10, 12, 12, 40),
];

// taller than wide, same mine counts
const COMPACT_FLOORS: [FloorConfig; MAX_FLOOR as usize] = [
    floor(1, 6, 6, 6),
    floor(2, 7, 7, 6),
    floor(3, 8, 8, 10),
    floor(4, 9, 8, 12),
    floor(5, 10, 8, 15),
    floor(6, 10, 9, 18),
    floor(7, 11, 9, 22),
    floor(8, 12, 9, 28),
    floor(9, 12, 10, 34),
    floor(10, 13, 10, 40),
];

impl FloorConfig {
    /// Table entry for `floor`, clamped into `1..=MAX_FLOOR`.
    pub fn base(floor: u8, layout: Layout) -> Self {
        let table = match layout {
            Layout::Wide => &WIDE_FLOORS,
            Layout::Compact => &COMPACT_FLOORS,
        };
        let index = floor.clamp(1, MAX_FLOOR) - 1;
        table[index as usize]
    }

    /// Table entry with an additive density surcharge in percent applied to the mine count.
    pub fn with_density(floor: u8, layout: Layout, surcharge_percent: u32) -> Self {
        let base = Self::base(floor, layout);
        let bonus = (base.mines as u32 * surcharge_percent / 100) as CellCount;
        let ceiling = base.total_cells().saturating_sub(OPENING_CELLS).max(1);
        let mines = base.mines.saturating_add(bonus).min(ceiling);
        if mines < base.mines + bonus {
            log::warn!(
                "Floor {} density capped at {} mines, requested {}",
                base.floor,
                mines,
                base.mines + bonus
            );
        }
        Self { mines, ..base }
    }

    pub const fn size(&self) -> Coord2 {
        (self.rows, self.cols)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }

    pub const fn is_final(&self) -> bool {
        self.floor >= MAX_FLOOR
    }
}

/// Sources of additive mine density, in percent of the table mine count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DensitySurcharge {
    pub ascension: u32,
    pub relics: u32,
    pub trauma_stacks: u32,
}

impl DensitySurcharge {
    pub const TRAUMA_PERCENT: u32 = 5;

    pub const fn total_percent(&self) -> u32 {
        self.ascension + self.relics + self.trauma_stacks * Self::TRAUMA_PERCENT
    }
}

pub mod scoring {
    pub const BASE_CELL_REVEAL: u64 = 10;
    pub const FLOOR_CLEAR_BONUS: u64 = 100;
    pub const TIME_BONUS_THRESHOLD_SECS: u32 = 60;
    pub const TIME_BONUS_MULTIPLIER: u64 = 2;
    pub const SKIP_DRAFT_BONUS: u64 = 50;

    /// `floor(cells × 10 × 1.5^(floor − 1))`, computed exactly in integers.
    pub fn reveal_score(cells: u32, floor: u8) -> u64 {
        let exp = u32::from(floor.max(1) - 1);
        let numerator = u64::from(cells) * BASE_CELL_REVEAL * 3u64.pow(exp);
        numerator / 2u64.pow(exp)
    }

    pub fn floor_clear_bonus(floor: u8, elapsed_secs: u32) -> u64 {
        let bonus = FLOOR_CLEAR_BONUS * u64::from(floor);
        if elapsed_secs < TIME_BONUS_THRESHOLD_SECS {
            bonus * TIME_BONUS_MULTIPLIER
        } else {
            bonus
        }
    }

    pub fn skip_draft_bonus(floor: u8) -> u64 {
        SKIP_DRAFT_BONUS * u64::from(floor)
    }
}
