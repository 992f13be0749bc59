//! Board analysis shared by the information and reveal relics.

use std::collections::BTreeSet;

use crate::*;

/// Hidden zero cell closest to `from` by Manhattan distance, first in row-major order on ties.
pub fn nearest_zero(board: &Board, from: Coord2) -> Option<Coord2> {
    board
        .iter()
        .filter(|cell| cell.is_hidden() && !cell.is_mine && cell.adjacent_mines == 0)
        .map(Cell::coords)
        .min_by_key(|&pos| manhattan(pos, from))
}

/// Hidden safe cells ordered from most to least isolated, measured as the Manhattan distance to
/// the nearest revealed cell.
pub fn isolated_safe_cells(board: &Board) -> Vec<Coord2> {
    let revealed: Vec<Coord2> = board
        .iter()
        .filter(|cell| cell.is_revealed())
        .map(Cell::coords)
        .collect();

    let mut scored: Vec<(u16, Coord2)> = board
        .iter()
        .filter(|cell| cell.is_hidden() && !cell.is_mine)
        .map(|cell| {
            let distance = revealed
                .iter()
                .map(|&pos| manhattan(pos, cell.coords()))
                .min()
                .unwrap_or(u16::MAX);
            (distance, cell.coords())
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, pos)| pos).collect()
}

/// Bonus for a hidden cell next to a number whose mines are all flagged already.
const SATISFIED_BONUS: u32 = 100;

/// Ranks hidden cells by how much the revealed numbers around them vouch for their safety and
/// returns the best `k`. Uses only what the player can see.
///
/// Each revealed numbered neighbour contributes `9 - n`, so low numbers count more. A neighbour
/// whose number is already matched by flags adds [`SATISFIED_BONUS`]. Cells with no revealed
/// neighbours carry no evidence and are never picked.
pub fn safest_cells(board: &Board, k: usize) -> BTreeSet<Coord2> {
    let mut scored: Vec<(u32, Coord2)> = board
        .iter()
        .filter(|cell| cell.is_hidden())
        .filter_map(|cell| {
            let score: u32 = board
                .neighbors(cell.coords())
                .map(|pos| board[pos])
                .filter(|n| n.is_revealed() && !n.is_mine)
                .map(|n| {
                    let base = 9 - u32::from(n.adjacent_mines.min(8));
                    let satisfied = n.adjacent_mines > 0
                        && board.count_flagged_neighbors(n.coords()) == n.adjacent_mines;
                    base + if satisfied { SATISFIED_BONUS } else { 0 }
                })
                .sum();
            (score > 0).then_some((score, cell.coords()))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().take(k).map(|(_, pos)| pos).collect()
}

fn numbered_neighbors(board: &Board, coords: Coord2) -> BTreeSet<Coord2> {
    board
        .neighbors(coords)
        .filter(|&pos| board[pos].is_revealed_number())
        .collect()
}

/// Safe sides of forced 50/50 guesses.
///
/// A revealed number with one unflagged mine left among exactly two hidden neighbours is a
/// forced guess when both candidates touch the very same set of revealed numbers, so no other
/// clue on the board can tell them apart. Overlapping constraints elsewhere can still make a
/// pair a true coin flip without matching this test; those are not reported.
pub fn oracle_cells(board: &Board) -> BTreeSet<Coord2> {
    let mut safe = BTreeSet::new();
    for cell in board.iter().filter(|cell| cell.is_revealed_number()) {
        let hidden: Vec<Coord2> = board
            .neighbors(cell.coords())
            .filter(|&pos| board[pos].is_hidden())
            .collect();
        let flags = board.count_flagged_neighbors(cell.coords());
        let &[a, b] = hidden.as_slice() else {
            continue;
        };
        if cell.adjacent_mines.checked_sub(flags) != Some(1) {
            continue;
        }
        if board[a].is_mine == board[b].is_mine {
            continue;
        }
        if numbered_neighbors(board, a) != numbered_neighbors(board, b) {
            continue;
        }
        safe.insert(if board[a].is_mine { b } else { a });
    }
    safe
}

pub fn count_mines(board: &Board, cells: impl IntoIterator<Item = Coord2>) -> CellCount {
    cells
        .into_iter()
        .filter(|&pos| board.get(pos).is_some_and(|cell| cell.is_mine))
        .count() as CellCount
}
