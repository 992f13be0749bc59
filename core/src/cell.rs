use serde::{Deserialize, Serialize};

use crate::Coord2;

/// Player-visible state of a cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellState {
    #[default]
    Hidden,
    Revealed,
    Flagged,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub row: u8,
    pub col: u8,
    pub is_mine: bool,
    pub state: CellState,
    pub adjacent_mines: u8,
}

impl Cell {
    pub const fn hidden(row: u8, col: u8) -> Self {
        Self {
            row,
            col,
            is_mine: false,
            state: CellState::Hidden,
            adjacent_mines: 0,
        }
    }

    pub const fn coords(&self) -> Coord2 {
        (self.row, self.col)
    }

    pub const fn is_hidden(&self) -> bool {
        matches!(self.state, CellState::Hidden)
    }

    pub const fn is_revealed(&self) -> bool {
        matches!(self.state, CellState::Revealed)
    }

    pub const fn is_flagged(&self) -> bool {
        matches!(self.state, CellState::Flagged)
    }

    /// A revealed safe cell showing a non-zero number.
    pub const fn is_revealed_number(&self) -> bool {
        self.is_revealed() && !self.is_mine && self.adjacent_mines > 0
    }
}
