use log::{debug, warn};
use rand::RngExt;
use rand::rngs::SmallRng;

use crate::board::Board;
use crate::types::{CellCount, Coord2};

/// The 3x3 neighborhood around the first revealed cell stays mine-free.
pub(crate) fn in_safe_zone(coords: Coord2, center: Coord2) -> bool {
    coords.0.abs_diff(center.0) <= 1 && coords.1.abs_diff(center.1) <= 1
}

/// Place `mines` mines by rejection sampling: pick uniformly random cells,
/// skipping ones already mined or inside the safe zone around
/// `first_reveal`, until the count is reached. Then recompute every neighbor
/// count. This is the only point mines are assigned for a generated board.
pub(crate) fn place_mines(
    board: &mut Board,
    mines: CellCount,
    first_reveal: Coord2,
    rng: &mut SmallRng,
) {
    let (rows, cols) = board.size();

    let zone_cells = 1 + board.neighbors(first_reveal.0, first_reveal.1).count() as CellCount;
    let capacity = crate::types::cell_count(rows, cols) - zone_cells;
    let mines = if mines > capacity {
        warn!("cannot place {mines} mines outside the safe zone, clamping to {capacity}");
        capacity
    } else {
        mines
    };

    let mut placed: CellCount = 0;
    while placed < mines {
        let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
        if board.cell(coords).has_mine || in_safe_zone(coords, first_reveal) {
            continue;
        }
        board.cell_mut(coords).has_mine = true;
        placed += 1;
    }

    recount_neighbor_mines(board);
    debug!("placed {placed} mines, safe zone at {first_reveal:?}");
}

/// Recompute `neighbor_mines` for every non-mine cell; mine cells stay at 0.
pub(crate) fn recount_neighbor_mines(board: &mut Board) {
    let (rows, cols) = board.size();
    for row in 0..rows {
        for col in 0..cols {
            let count = board.count_neighbor_mines((row, col));
            let cell = board.cell_mut((row, col));
            cell.neighbor_mines = if cell.has_mine { 0 } else { count };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn place(rows: u8, cols: u8, mines: CellCount, first_reveal: Coord2, seed: u64) -> Board {
        let mut board = Board::empty(rows, cols);
        let mut rng = SmallRng::seed_from_u64(seed);
        place_mines(&mut board, mines, first_reveal, &mut rng);
        board
    }

    fn mine_count(board: &Board) -> usize {
        board.cells().filter(|cell| cell.has_mine).count()
    }

    #[test]
    fn places_exactly_the_requested_mines() {
        for seed in 0..50 {
            let board = place(9, 9, 10, (4, 4), seed);
            assert_eq!(mine_count(&board), 10);
        }
    }

    #[test]
    fn safe_zone_is_clear_for_center_and_corner_starts() {
        for seed in 0..100 {
            for start in [(4, 4), (0, 0), (8, 8), (0, 4)] {
                let board = place(9, 9, 10, start, seed);
                for cell in board.cells() {
                    if in_safe_zone((cell.row, cell.col), start) {
                        assert!(!cell.has_mine, "seed {seed}, start {start:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn neighbor_counts_match_the_placed_mines() {
        let board = place(9, 9, 10, (4, 4), 7);
        for cell in board.cells() {
            if !cell.has_mine {
                assert_eq!(
                    cell.neighbor_mines,
                    board.count_neighbor_mines((cell.row, cell.col)),
                );
            }
        }
    }

    #[test]
    fn over_capacity_request_is_clamped() {
        // corner start: the clipped zone is 4 cells, leaving 5 free
        let board = place(3, 3, 9, (0, 0), 1);
        assert_eq!(mine_count(&board), 5);
    }
}
