use serde::{Deserialize, Serialize};

use crate::types::{CellCount, Coord, cell_count};

/// Closed set of board presets; an invalid tag is unrepresentable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Preset lookup. Pure and total; there is no failure mode.
    pub const fn config(self) -> DifficultyConfig {
        match self {
            Difficulty::Easy => DifficultyConfig {
                rows: 9,
                cols: 9,
                mines: 10,
                label: "Fácil",
            },
            Difficulty::Medium => DifficultyConfig {
                rows: 16,
                cols: 16,
                mines: 40,
                label: "Medio",
            },
            Difficulty::Hard => DifficultyConfig {
                rows: 16,
                cols: 30,
                mines: 99,
                label: "Difícil",
            },
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Easy
    }
}

/// Board geometry and mine count for one game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DifficultyConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
    pub label: &'static str,
}

impl DifficultyConfig {
    pub const fn total_cells(&self) -> CellCount {
        cell_count(self.rows, self.cols)
    }

    /// Cells that must be revealed to win.
    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.mines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_the_fixed_contract() {
        let easy = Difficulty::Easy.config();
        assert_eq!((easy.rows, easy.cols, easy.mines), (9, 9, 10));

        let medium = Difficulty::Medium.config();
        assert_eq!((medium.rows, medium.cols, medium.mines), (16, 16, 40));

        let hard = Difficulty::Hard.config();
        assert_eq!((hard.rows, hard.cols, hard.mines), (16, 30, 99));
    }

    #[test]
    fn every_preset_leaves_room_for_the_safe_zone() {
        for difficulty in Difficulty::ALL {
            let config = difficulty.config();
            assert!(config.mines < config.total_cells() - 9, "{:?}", difficulty);
        }
    }

    #[test]
    fn safe_cells_is_total_minus_mines() {
        assert_eq!(Difficulty::Easy.config().safe_cells(), 71);
        assert_eq!(Difficulty::Hard.config().safe_cells(), 381);
    }
}
