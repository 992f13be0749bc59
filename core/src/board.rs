use std::collections::BTreeSet;
use std::ops::{BitOrAssign, Index};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Grid of cells for one floor.
///
/// Public mutating operations take `&self` and hand back a new board; the original is never
/// touched. Cells in the wrong state for an operation are left alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BoardRepr", into = "BoardRepr")]
pub struct Board {
    cells: Array2<Cell>,
    topology: Topology,
}

impl Board {
    pub fn empty(size: Coord2, topology: Topology) -> Self {
        Self {
            cells: Array2::from_shape_fn(size.to_nd_index(), |(r, c)| {
                Cell::hidden(r as Coord, c as Coord)
            }),
            topology,
        }
    }

    pub fn for_floor(config: &FloorConfig, topology: Topology) -> Self {
        Self::empty(config.size(), topology)
    }

    /// Board with mines at exactly `mines` and adjacency computed under `topology`.
    pub fn from_mines(size: Coord2, mines: &[Coord2], topology: Topology) -> Result<Self> {
        let mut board = Self::empty(size, topology);
        for &coords in mines {
            board.validate_coords(coords)?;
            board.cells[coords.to_nd_index()].is_mine = true;
        }
        board.recompute_adjacency();
        Ok(board)
    }

    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        (rows as Coord, cols as Coord)
    }

    pub fn rows(&self) -> Coord {
        self.size().0
    }

    pub fn cols(&self) -> Coord {
        self.size().1
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len() as CellCount
    }

    pub fn contains(&self, (row, col): Coord2) -> bool {
        let (rows, cols) = self.size();
        row < rows && col < cols
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if self.contains(coords) {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn get(&self, coords: Coord2) -> Option<&Cell> {
        if self.contains(coords) {
            Some(&self.cells[coords.to_nd_index()])
        } else {
            None
        }
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.size(), self.topology)
    }

    pub fn mine_count(&self) -> CellCount {
        self.count_where(|cell| cell.is_mine)
    }

    pub fn count_flags(&self) -> CellCount {
        self.count_where(Cell::is_flagged)
    }

    pub fn count_zero_cells(&self) -> CellCount {
        self.count_where(|cell| !cell.is_mine && cell.adjacent_mines == 0)
    }

    fn count_where(&self, pred: impl Fn(&Cell) -> bool) -> CellCount {
        self.cells.iter().filter(|&cell| pred(cell)).count() as CellCount
    }

    pub fn count_flagged_neighbors(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self[pos].is_flagged())
            .count() as u8
    }

    pub fn live_adjacent_mines(&self, coords: Coord2) -> u8 {
        self.neighbors(coords).filter(|&pos| self[pos].is_mine).count() as u8
    }

    /// True once every safe cell is revealed. Flags play no part.
    pub fn is_cleared(&self) -> bool {
        self.cells
            .iter()
            .all(|cell| cell.is_mine || cell.is_revealed())
    }

    /// Copy of the board with adjacency recomputed from the live mine positions.
    pub fn calculate_adjacent_mines(&self) -> Self {
        self.with(Self::recompute_adjacency).0
    }

    pub fn reveal(&self, coords: Coord2) -> (Self, Reveal) {
        self.with(|board| board.reveal_in_place(coords))
    }

    pub fn chord(&self, coords: Coord2) -> (Self, Reveal) {
        self.with(|board| board.chord_in_place(coords))
    }

    pub fn toggle_flag(&self, coords: Coord2) -> (Self, MarkOutcome) {
        self.with(|board| board.toggle_flag_in_place(coords))
    }

    pub fn reveal_all_mines(&self) -> Self {
        self.with(|board| {
            board
                .cells
                .iter_mut()
                .filter(|cell| cell.is_mine)
                .for_each(|cell| cell.state = CellState::Revealed);
        })
        .0
    }

    /// Hidden or flagged neighbours a chord on `coords` would act on.
    pub fn chord_highlight(&self, coords: Coord2) -> BTreeSet<Coord2> {
        match self.get(coords) {
            Some(cell) if cell.is_revealed_number() => self
                .neighbors(coords)
                .filter(|&pos| !self[pos].is_revealed())
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Removes a correctly flagged mine and reveals its cell. `None` if the cell is not a flagged
    /// mine.
    pub fn remove_mine(&self, coords: Coord2) -> Option<Self> {
        let cell = self.get(coords)?;
        if !(cell.is_flagged() && cell.is_mine) {
            return None;
        }

        let mut next = self.clone();
        let target = &mut next.cells[coords.to_nd_index()];
        target.is_mine = false;
        target.state = CellState::Revealed;
        next.recompute_adjacency();
        log::debug!("Mine at {:?} removed", coords);
        Some(next)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Self) -> R) -> (Self, R) {
        let mut next = self.clone();
        let result = f(&mut next);
        (next, result)
    }

    pub(crate) fn recompute_adjacency(&mut self) {
        let (rows, cols) = self.size();
        for row in 0..rows {
            for col in 0..cols {
                let coords = (row, col);
                let count = if self[coords].is_mine {
                    0
                } else {
                    self.live_adjacent_mines(coords)
                };
                self.cells[coords.to_nd_index()].adjacent_mines = count;
            }
        }
    }

    pub(crate) fn set_state(&mut self, coords: Coord2, state: CellState) {
        if let Some(cell) = self.cells.get_mut(coords.to_nd_index()) {
            cell.state = state;
        }
    }

    pub(crate) fn toggle_flag_in_place(&mut self, coords: Coord2) -> MarkOutcome {
        let Some(cell) = self.cells.get_mut(coords.to_nd_index()) else {
            return MarkOutcome::NoChange;
        };
        match cell.state {
            CellState::Hidden => cell.state = CellState::Flagged,
            CellState::Flagged => cell.state = CellState::Hidden,
            CellState::Revealed => return MarkOutcome::NoChange,
        }
        MarkOutcome::Changed
    }

    /// Reveals a hidden cell, flooding outward through zero cells. A hidden mine is revealed and
    /// reported as detonated.
    pub(crate) fn reveal_in_place(&mut self, coords: Coord2) -> Reveal {
        let mut report = Reveal::default();
        let Some(&cell) = self.get(coords) else {
            return report;
        };
        if !cell.is_hidden() {
            return report;
        }

        if cell.is_mine {
            self.cells[coords.to_nd_index()].state = CellState::Revealed;
            report.detonated.push(coords);
            return report;
        }

        let mut visited = BTreeSet::new();
        let mut stack = vec![coords];
        while let Some(pos) = stack.pop() {
            if !visited.insert(pos) {
                continue;
            }

            let cell = &mut self.cells[pos.to_nd_index()];
            if !cell.is_hidden() || cell.is_mine {
                continue;
            }
            cell.state = CellState::Revealed;
            let is_zero = cell.adjacent_mines == 0;
            report.opened.push(pos);

            if is_zero {
                stack.extend(
                    self.neighbors(pos)
                        .filter(|next| !visited.contains(next))
                        .filter(|&next| self[next].is_hidden()),
                );
            }
        }

        if report.opened.len() > 1 {
            log::trace!("Cascade from {:?} opened {} cells", coords, report.opened.len());
        }
        report
    }

    /// Reveals every hidden neighbour of a revealed number whose flag count matches it.
    pub(crate) fn chord_in_place(&mut self, coords: Coord2) -> Reveal {
        let Some(&cell) = self.get(coords) else {
            return Reveal::default();
        };
        if !cell.is_revealed_number() || self.count_flagged_neighbors(coords) != cell.adjacent_mines
        {
            return Reveal::default();
        }

        let targets: SmallVec<[Coord2; 8]> = self.neighbors(coords).collect();
        let mut report = Reveal::default();
        for target in targets {
            report |= self.reveal_in_place(target);
        }
        report
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[coords.to_nd_index()]
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardRepr {
    #[serde(default)]
    topology: Topology,
    cells: Vec<Vec<Cell>>,
}

impl From<Board> for BoardRepr {
    fn from(board: Board) -> Self {
        Self {
            topology: board.topology,
            cells: board
                .cells
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

impl TryFrom<BoardRepr> for Board {
    type Error = GameError;

    fn try_from(repr: BoardRepr) -> Result<Self> {
        let rows = repr.cells.len();
        let cols = repr.cells.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 || rows > Coord::MAX as usize || cols > Coord::MAX as usize {
            return Err(GameError::InvalidBoardShape);
        }
        if repr.cells.iter().any(|row| row.len() != cols) {
            return Err(GameError::InvalidBoardShape);
        }

        let flat: Vec<Cell> = repr.cells.into_iter().flatten().collect();
        let cells =
            Array2::from_shape_vec((rows, cols), flat).map_err(|_| GameError::InvalidBoardShape)?;
        for ((r, c), cell) in cells.indexed_iter() {
            if (cell.row as usize, cell.col as usize) != (r, c) || cell.adjacent_mines > 8 {
                return Err(GameError::InvalidBoardShape);
            }
        }

        Ok(Self {
            cells,
            topology: repr.topology,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Changed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Cells touched by a reveal or chord, in the order they were opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reveal {
    pub opened: Vec<Coord2>,
    pub detonated: Vec<Coord2>,
}

impl Reveal {
    pub fn outcome(&self) -> RevealOutcome {
        if !self.detonated.is_empty() {
            RevealOutcome::HitMine
        } else if !self.opened.is_empty() {
            RevealOutcome::Revealed
        } else {
            RevealOutcome::NoChange
        }
    }

    pub fn opened_count(&self) -> u32 {
        self.opened.len() as u32
    }
}

impl BitOrAssign for Reveal {
    fn bitor_assign(&mut self, rhs: Self) {
        self.opened.extend(rhs.opened);
        self.detonated.extend(rhs.detonated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> Board {
        Board::from_mines(size, mines, Topology::Bounded).unwrap()
    }

    #[test]
    fn single_center_mine_cascades_from_corner() {
        let board = layout((3, 3), &[(1, 1)]);

        let (next, reveal) = board.reveal((0, 0));

        assert_eq!(reveal.outcome(), RevealOutcome::Revealed);
        assert_eq!(reveal.opened, vec![(0, 0)]);
        for pos in board.neighbors((1, 1)) {
            assert_eq!(next[pos].adjacent_mines, 1);
        }
        assert!(next[(1, 1)].is_hidden());
    }

    #[test]
    fn adjacency_follows_moved_mines() {
        let mut board = layout((4, 4), &[(0, 0), (2, 2)]);
        board.cells[(0, 0).to_nd_index()].is_mine = false;
        board.cells[(3, 0).to_nd_index()].is_mine = true;

        let recounted = board.calculate_adjacent_mines();

        assert_eq!(recounted, layout((4, 4), &[(3, 0), (2, 2)]));
        assert_eq!(recounted[(0, 1)].adjacent_mines, 0);
        assert_eq!(recounted[(2, 1)].adjacent_mines, 2);
        assert_eq!(board[(0, 1)].adjacent_mines, 1);
    }

    #[test]
    fn zero_region_flood_fills_to_numbered_border() {
        let board = layout((4, 4), &[(3, 3)]);

        let (next, reveal) = board.reveal((0, 0));

        assert_eq!(reveal.opened_count(), 15);
        assert!(next.is_cleared());
        assert!(board.iter().all(Cell::is_hidden));
    }

    #[test]
    fn cascade_stops_at_flags() {
        let board = layout((1, 5), &[(0, 4)]);
        let (board, _) = board.toggle_flag((0, 1));

        let (next, reveal) = board.reveal((0, 0));

        assert_eq!(reveal.opened, vec![(0, 0)]);
        assert!(next[(0, 1)].is_flagged());
        assert!(next[(0, 2)].is_hidden());
    }

    #[test]
    fn revealing_a_mine_reports_detonation() {
        let board = layout((2, 2), &[(0, 0)]);

        let (next, reveal) = board.reveal((0, 0));

        assert_eq!(reveal.outcome(), RevealOutcome::HitMine);
        assert_eq!(reveal.detonated, vec![(0, 0)]);
        assert!(next[(0, 0)].is_revealed());
    }

    #[test]
    fn wrong_state_operations_are_no_ops() {
        let board = layout((2, 2), &[(0, 0)]);
        let (board, _) = board.reveal((1, 1));

        let (again, reveal) = board.reveal((1, 1));
        assert_eq!(reveal.outcome(), RevealOutcome::NoChange);
        assert_eq!(again, board);

        let (flagged, mark) = board.toggle_flag((1, 1));
        assert_eq!(mark, MarkOutcome::NoChange);
        assert_eq!(flagged, board);

        let (_, reveal) = board.reveal((9, 9));
        assert_eq!(reveal, Reveal::default());
    }

    #[test]
    fn chord_reveals_remaining_neighbors_when_flags_match() {
        let board = layout((3, 3), &[(0, 1), (2, 1)]);
        let (board, _) = board.reveal((1, 1));
        let (board, _) = board.toggle_flag((0, 1));
        let (board, _) = board.toggle_flag((2, 1));

        let (next, reveal) = board.chord((1, 1));

        assert!(reveal.detonated.is_empty());
        assert_eq!(reveal.opened_count(), 6);
        assert!(next.is_cleared());
    }

    #[test]
    fn chord_with_misplaced_flag_detonates() {
        let board = layout((3, 3), &[(0, 1)]);
        let (board, _) = board.reveal((1, 1));
        let (board, _) = board.toggle_flag((2, 2));

        let (next, reveal) = board.chord((1, 1));

        assert_eq!(reveal.detonated, vec![(0, 1)]);
        assert!(next[(0, 1)].is_revealed());
    }

    #[test]
    fn chord_without_matching_flags_does_nothing() {
        let board = layout((3, 3), &[(0, 1)]);
        let (board, _) = board.reveal((1, 1));

        let (next, reveal) = board.chord((1, 1));

        assert_eq!(reveal.outcome(), RevealOutcome::NoChange);
        assert_eq!(next, board);
    }

    #[test]
    fn remove_mine_recomputes_neighbors() {
        let board = layout((3, 3), &[(1, 1), (0, 0)]);
        let (board, _) = board.toggle_flag((1, 1));

        let next = board.remove_mine((1, 1)).unwrap();

        assert!(!next[(1, 1)].is_mine);
        assert!(next[(1, 1)].is_revealed());
        assert_eq!(next[(1, 1)].adjacent_mines, 1);
        assert_eq!(next[(0, 1)].adjacent_mines, 1);
        assert_eq!(next[(2, 2)].adjacent_mines, 0);
        assert_eq!(next.mine_count(), 1);
    }

    #[test]
    fn remove_mine_rejects_unflagged_or_safe_cells() {
        let board = layout((3, 3), &[(1, 1)]);
        assert!(board.remove_mine((1, 1)).is_none());
        let (board, _) = board.toggle_flag((0, 0));
        assert!(board.remove_mine((0, 0)).is_none());
    }

    #[test]
    fn toroidal_adjacency_wraps() {
        let board = Board::from_mines((4, 4), &[(0, 0)], Topology::Toroidal).unwrap();
        assert_eq!(board[(3, 3)].adjacent_mines, 1);
        assert_eq!(board[(0, 3)].adjacent_mines, 1);
        assert_eq!(board[(2, 2)].adjacent_mines, 0);
    }

    #[test]
    fn chord_highlight_lists_unrevealed_neighbors() {
        let board = layout((3, 3), &[(0, 0)]);
        let (board, _) = board.reveal((1, 1));
        let (board, _) = board.toggle_flag((0, 0));

        let highlight = board.chord_highlight((1, 1));

        assert_eq!(highlight.len(), 8);
        assert!(highlight.contains(&(0, 0)));
        assert!(board.chord_highlight((2, 2)).is_empty());
    }

    #[test]
    fn serde_round_trip_preserves_board() {
        let board = layout((2, 3), &[(0, 2)]);
        let (board, _) = board.reveal((1, 0));

        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();

        assert_eq!(back, board);
        assert!(json.contains("\"adjacentMines\""));
    }

    #[test]
    fn ragged_board_is_rejected() {
        let json = r#"{"topology":"bounded","cells":[[{"row":0,"col":0,"isMine":false,"state":"hidden","adjacentMines":0}],[]]}"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }
}
