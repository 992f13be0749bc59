use crate::*;
pub use random::*;

mod random;

pub trait BoardGenerator {
    fn generate(self, config: &FloorConfig, topology: Topology) -> Board;
}

/// Cells around the first click that are kept free of mines, weakest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartZone {
    /// Only the clicked cell.
    Single,
    /// The clicked cell plus one step toward the board interior along each axis.
    Block,
    /// The clicked cell and its whole neighbourhood, so the first reveal always cascades.
    Opening,
}

impl StartZone {
    /// Coordinates the zone covers for a click at `start`.
    pub fn cells(self, start: Coord2, bounds: Coord2, topology: Topology) -> Vec<Coord2> {
        let mut cells = vec![start];
        match self {
            Self::Single => {}
            Self::Block => {
                let (row, col) = start;
                let (rows, cols) = bounds;
                let step_row = toward_interior(row, rows);
                let step_col = toward_interior(col, cols);
                for pos in [
                    step_row.map(|r| (r, col)),
                    step_col.map(|c| (row, c)),
                    step_row.zip(step_col),
                ]
                .into_iter()
                .flatten()
                {
                    if !cells.contains(&pos) {
                        cells.push(pos);
                    }
                }
            }
            Self::Opening => cells.extend(NeighborIter::new(start, bounds, topology)),
        }
        cells
    }

    /// Next weaker zone, used when the board cannot fit the mines around this one.
    pub const fn weaker(self) -> Option<Self> {
        match self {
            Self::Opening => Some(Self::Block),
            Self::Block => Some(Self::Single),
            Self::Single => None,
        }
    }
}

fn toward_interior(pos: Coord, len: Coord) -> Option<Coord> {
    if len < 2 {
        None
    } else if pos < len / 2 {
        Some(pos + 1)
    } else {
        Some(pos - 1)
    }
}
