use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Single coordinate axis used for board rows, columns and positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(row, col)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

/// How the 8-neighbourhood behaves at the board edges.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// Neighbours outside the board are clipped.
    #[default]
    Bounded,
    /// Neighbour coordinates wrap modulo rows/cols.
    Toroidal,
}

const DISPLACEMENTS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Applies `delta` to `coords`, clipping or wrapping at `bounds` depending on `topology`.
fn apply_delta(
    coords: Coord2,
    delta: (isize, isize),
    bounds: Coord2,
    topology: Topology,
) -> Option<Coord2> {
    let (row, col) = coords;
    let (dr, dc) = delta;
    let (rows, cols) = bounds;

    match topology {
        Topology::Bounded => {
            let next_row = row.checked_add_signed(dr.try_into().ok()?)?;
            if next_row >= rows {
                return None;
            }

            let next_col = col.checked_add_signed(dc.try_into().ok()?)?;
            if next_col >= cols {
                return None;
            }

            Some((next_row, next_col))
        }
        Topology::Toroidal => {
            if rows == 0 || cols == 0 {
                return None;
            }
            let next_row = (row as isize + dr).rem_euclid(rows as isize);
            let next_col = (col as isize + dc).rem_euclid(cols as isize);
            Some((next_row as Coord, next_col as Coord))
        }
    }
}

/// Distinct 8-neighbours of a cell, never including the cell itself.
///
/// On narrow toroidal boards several displacements can wrap onto the same cell; those are
/// yielded once.
#[derive(Debug)]
pub struct NeighborIter {
    cells: smallvec::IntoIter<[Coord2; 8]>,
}

impl NeighborIter {
    pub fn new(center: Coord2, bounds: Coord2, topology: Topology) -> Self {
        let mut cells: SmallVec<[Coord2; 8]> = SmallVec::new();
        for delta in DISPLACEMENTS {
            if let Some(pos) = apply_delta(center, delta, bounds, topology) {
                if pos != center && !cells.contains(&pos) {
                    cells.push(pos);
                }
            }
        }
        Self {
            cells: cells.into_iter(),
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        self.cells.next()
    }
}

/// Square window of `2 * radius + 1` cells per side around `center`, clipped to the board.
pub fn window(center: Coord2, radius: u8, bounds: Coord2) -> impl Iterator<Item = Coord2> {
    let (row, col) = center;
    let (rows, cols) = bounds;
    let row_range = row.saturating_sub(radius)..=row.saturating_add(radius).min(rows.saturating_sub(1));
    let col_range = col.saturating_sub(radius)..=col.saturating_add(radius).min(cols.saturating_sub(1));
    row_range.flat_map(move |r| col_range.clone().map(move |c| (r, c)))
}

pub const fn manhattan(a: Coord2, b: Coord2) -> u16 {
    (a.0.abs_diff(b.0) as u16) + (a.1.abs_diff(b.1) as u16)
}
