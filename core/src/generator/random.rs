use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::*;

/// Attempts spent looking for a layout whose first cell touches few enough mines.
pub const CAUTIOUS_START_ATTEMPTS: usize = 50;
pub const CAUTIOUS_START_MAX_ADJACENT: u8 = 2;

/// Uniform placement outside a start zone, optionally retried until the first click touches at
/// most [`CAUTIOUS_START_MAX_ADJACENT`] mines.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomBoardGenerator {
    seed: u64,
    start: Coord2,
    start_zone: StartZone,
    cautious: bool,
}

impl RandomBoardGenerator {
    pub fn new(seed: u64, start: Coord2, start_zone: StartZone) -> Self {
        Self {
            seed,
            start,
            start_zone,
            cautious: false,
        }
    }

    pub fn cautious(mut self, cautious: bool) -> Self {
        self.cautious = cautious;
        self
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(self, config: &FloorConfig, topology: Topology) -> Board {
        let size = config.size();
        let total_cells = config.total_cells();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut zone = Some(self.start_zone);
        let mut excluded = Vec::new();
        while let Some(current) = zone {
            excluded = current.cells(self.start, size, topology);
            if config.mines as usize + excluded.len() <= total_cells as usize {
                break;
            }
            zone = current.weaker();
            log::warn!(
                "Start zone {:?} does not fit {} mines, falling back to {:?}",
                current,
                config.mines,
                zone
            );
        }
        if zone.is_none() {
            excluded.clear();
        }

        let candidates: Vec<Coord2> = (0..size.0)
            .flat_map(|row| (0..size.1).map(move |col| (row, col)))
            .filter(|pos| !excluded.contains(pos))
            .collect();
        let mine_count = (config.mines as usize).min(candidates.len());
        if mine_count < config.mines as usize {
            log::warn!(
                "Generated board mine count mismatch, actual: {}, requested: {}",
                mine_count,
                config.mines
            );
        }

        let attempts = if self.cautious {
            CAUTIOUS_START_ATTEMPTS
        } else {
            1
        };

        let mut best: Option<(u8, Board)> = None;
        for attempt in 0..attempts {
            let mut shuffled = candidates.clone();
            shuffled.shuffle(&mut rng);
            shuffled.truncate(mine_count);

            let board = match Board::from_mines(size, &shuffled, topology) {
                Ok(board) => board,
                Err(err) => {
                    log::warn!("Discarding placement attempt {}: {}", attempt, err);
                    continue;
                }
            };
            let adjacent = board.live_adjacent_mines(self.start);

            if !self.cautious || adjacent <= CAUTIOUS_START_MAX_ADJACENT {
                log::debug!(
                    "Placed {} mines on {}x{} after {} attempt(s)",
                    mine_count,
                    size.0,
                    size.1,
                    attempt + 1
                );
                return board;
            }
            if best.as_ref().is_none_or(|(fewest, _)| adjacent < *fewest) {
                best = Some((adjacent, board));
            }
        }

        match best {
            Some((adjacent, board)) => {
                log::warn!(
                    "Cautious start not satisfied after {} attempts, first cell touches {} mines",
                    attempts,
                    adjacent
                );
                board
            }
            None => Board::empty(size, topology),
        }
    }
}
