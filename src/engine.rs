use std::collections::VecDeque;
use std::fmt;
use std::ops::BitOr;

use hashbrown::HashSet;
use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::board::{Board, Cell};
use crate::clock::Clock;
use crate::difficulty::{Difficulty, DifficultyConfig};
use crate::error::{GameError, Result};
use crate::generator;
use crate::types::{CellCount, Coord, Coord2, cell_count};

/// Session lifecycle. `Idle` means the board is allocated but no mines are
/// placed and the clock is not running; `Won`/`Lost` are terminal until the
/// next reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Idle,
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Outcome of a reveal-path operation. Not an error type: rejected input is
/// reported as `NoChange`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    Exploded,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Merge outcomes when a chord fans out over several reveals.
impl BitOr for RevealOutcome {
    type Output = RevealOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use RevealOutcome::*;
        match (self, rhs) {
            (Exploded, _) | (_, Exploded) => Exploded,
            (Won, _) | (_, Won) => Won,
            (Revealed, _) | (_, Revealed) => Revealed,
            (NoChange, NoChange) => NoChange,
        }
    }
}

/// Outcome of a flag toggle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Changed,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Immutable view published to renderer collaborators. Holds owned data
/// only; no reference back into the engine escapes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub board: Board,
    pub status: GameStatus,
    pub difficulty: Difficulty,
    pub config: DifficultyConfig,
    pub flags_used: CellCount,
    pub mines_remaining: i32,
    pub elapsed_secs: u32,
}

pub type SnapshotListener = Box<dyn FnMut(&SessionSnapshot)>;

/// The authoritative game session: owns the board, status, counters, clock,
/// and placement RNG. Collaborators read snapshots and call the mutators
/// below; every coordinate-taking mutator is total and treats out-of-range
/// input as a silent no-op.
pub struct GameEngine {
    difficulty: Difficulty,
    config: DifficultyConfig,
    board: Board,
    status: GameStatus,
    flags_used: CellCount,
    revealed_count: CellCount,
    mines_placed: bool,
    clock: Clock,
    last_published_secs: u32,
    rng: SmallRng,
    listeners: Vec<SnapshotListener>,
}

impl GameEngine {
    /// Fresh `Idle` session for `difficulty`, seeded from OS entropy.
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_seed(difficulty, rand::rng().random())
    }

    /// Deterministic session: mine placement depends only on `seed` and the
    /// first-reveal coordinate.
    pub fn with_seed(difficulty: Difficulty, seed: u64) -> Self {
        let config = difficulty.config();
        Self::new_session(difficulty, config, SmallRng::seed_from_u64(seed), false)
    }

    /// Session over a hand-built layout: `mine_coords` are placed up front
    /// and deferred placement is disabled. The layout must be non-empty, in
    /// bounds, and keep at least one safe cell.
    pub fn with_layout(rows: Coord, cols: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(GameError::InvalidCoords);
        }

        let mut board = Board::empty(rows, cols);
        let mut mines: CellCount = 0;
        for &(row, col) in mine_coords {
            if row >= rows || col >= cols {
                return Err(GameError::InvalidCoords);
            }
            let cell = board.cell_mut((row, col));
            if !cell.has_mine {
                cell.has_mine = true;
                mines += 1;
            }
        }
        if mines >= cell_count(rows, cols) {
            return Err(GameError::TooManyMines);
        }
        generator::recount_neighbor_mines(&mut board);

        let config = DifficultyConfig {
            rows,
            cols,
            mines,
            label: "custom",
        };
        let mut engine = Self::new_session(
            Difficulty::default(),
            config,
            SmallRng::seed_from_u64(0),
            true,
        );
        engine.board = board;
        Ok(engine)
    }

    fn new_session(
        difficulty: Difficulty,
        config: DifficultyConfig,
        rng: SmallRng,
        mines_placed: bool,
    ) -> Self {
        Self {
            difficulty,
            config,
            board: Board::empty(config.rows, config.cols),
            status: GameStatus::Idle,
            flags_used: 0,
            revealed_count: 0,
            mines_placed,
            clock: Clock::new(),
            last_published_secs: 0,
            rng,
            listeners: Vec::new(),
        }
    }

    /// Stop any running clock, allocate a fresh board for the active
    /// difficulty, and return to `Idle` with no mines placed.
    pub fn initialize_game(&mut self) {
        self.clock.reset();
        self.config = self.difficulty.config();
        self.board = Board::empty(self.config.rows, self.config.cols);
        self.status = GameStatus::Idle;
        self.flags_used = 0;
        self.revealed_count = 0;
        self.mines_placed = false;
        self.last_published_secs = 0;
        debug!(
            "new {} game: {}x{}, {} mines",
            self.config.label, self.config.rows, self.config.cols, self.config.mines
        );
        self.notify();
    }

    /// Switch presets, then behave exactly like [`Self::initialize_game`].
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.initialize_game();
    }

    /// Reveal a cell. Out-of-range, already-revealed, and flagged targets
    /// are silent no-ops; the very first reveal of a generated game places
    /// the mines with a 3x3 safe zone around the target.
    pub fn reveal_cell(&mut self, row: i32, col: i32) -> RevealOutcome {
        let Some(coords) = self.checked_coords(row, col) else {
            return RevealOutcome::NoChange;
        };

        let cell = self.board.cell(coords);
        if cell.is_revealed || cell.is_flagged {
            return RevealOutcome::NoChange;
        }

        if !self.mines_placed {
            self.mines_placed = true;
            generator::place_mines(&mut self.board, self.config.mines, coords, &mut self.rng);
        }
        self.mark_started();

        if self.status != GameStatus::Playing {
            return RevealOutcome::NoChange;
        }

        let outcome = self.reveal_target(coords);
        if outcome.has_update() {
            self.notify();
        }
        outcome
    }

    /// Toggle a flag. Flagging from `Idle` starts play and the clock but
    /// does not place mines; placement happens only inside `reveal_cell`.
    /// Flags never exceed the mine count.
    pub fn toggle_flag(&mut self, row: i32, col: i32) -> FlagOutcome {
        let Some(coords) = self.checked_coords(row, col) else {
            return FlagOutcome::NoChange;
        };
        if self.status.is_finished() || self.board.cell(coords).is_revealed {
            return FlagOutcome::NoChange;
        }

        self.mark_started();

        let outcome = if self.board.cell(coords).is_flagged {
            self.board.cell_mut(coords).is_flagged = false;
            self.flags_used -= 1;
            FlagOutcome::Changed
        } else if self.flags_used < self.config.mines {
            self.board.cell_mut(coords).is_flagged = true;
            self.flags_used += 1;
            FlagOutcome::Changed
        } else {
            trace!("flag budget exhausted at {coords:?}");
            FlagOutcome::NoChange
        };

        if outcome.has_update() {
            self.notify();
        }
        outcome
    }

    /// Bulk-reveal around a revealed numbered cell when its adjacent flag
    /// count exactly matches its number; any mismatch is a pure no-op. Each
    /// fan-out reveal goes through the normal `reveal_cell` path, so a
    /// misplaced flag can end the game.
    pub fn chord_click(&mut self, row: i32, col: i32) -> RevealOutcome {
        let Some(coords) = self.checked_coords(row, col) else {
            return RevealOutcome::NoChange;
        };
        if self.status != GameStatus::Playing {
            return RevealOutcome::NoChange;
        }

        let cell = self.board.cell(coords);
        if !cell.is_revealed || cell.neighbor_mines == 0 {
            return RevealOutcome::NoChange;
        }
        let number = cell.neighbor_mines;
        if self.board.count_flagged_neighbors(coords) != number {
            return RevealOutcome::NoChange;
        }

        let targets: SmallVec<[Coord2; 8]> = self
            .board
            .neighbors(coords.0, coords.1)
            .filter(|&pos| {
                let neighbor = self.board.cell(pos);
                !neighbor.is_flagged && !neighbor.is_revealed
            })
            .collect();

        trace!("chord at {coords:?} fans out to {} cells", targets.len());
        let mut outcome = RevealOutcome::NoChange;
        for (target_row, target_col) in targets {
            outcome = outcome | self.reveal_cell(target_row as i32, target_col as i32);
        }
        outcome
    }

    // --- read-only queries -------------------------------------------------

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn game_status(&self) -> GameStatus {
        self.status
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn config(&self) -> DifficultyConfig {
        self.config
    }

    pub fn flags_used(&self) -> CellCount {
        self.flags_used
    }

    /// Configured mines minus flags used; reaches 0 when a won game
    /// auto-flags the rest.
    pub fn mines_remaining(&self) -> i32 {
        self.config.mines as i32 - self.flags_used as i32
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.clock.elapsed_secs()
    }

    /// Bounds-checked read; `None` (not an error) out of range.
    pub fn get_cell_at(&self, row: i32, col: i32) -> Option<&Cell> {
        self.board.get(row, col)
    }

    /// Owned, immutable view of the whole session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            board: self.board.clone(),
            status: self.status,
            difficulty: self.difficulty,
            config: self.config,
            flags_used: self.flags_used,
            mines_remaining: self.mines_remaining(),
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Register a change listener. It fires after every state-changing
    /// operation and after clock ticks that change the second reading.
    pub fn subscribe(&mut self, listener: impl FnMut(&SessionSnapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Cooperative timer hook: call from the host's periodic scheduler.
    /// Returns the new reading when the displayed second changed (notifying
    /// listeners), `None` otherwise.
    pub fn tick_clock(&mut self) -> Option<u32> {
        let secs = self.clock.elapsed_secs();
        if secs == self.last_published_secs {
            return None;
        }
        self.last_published_secs = secs;
        self.notify();
        Some(secs)
    }

    // --- internals ---------------------------------------------------------

    fn checked_coords(&self, row: i32, col: i32) -> Option<Coord2> {
        self.board
            .in_bounds(row, col)
            .then(|| (row as Coord, col as Coord))
    }

    /// First interaction of a game: `Idle` becomes `Playing` and the clock
    /// starts. Mines may or may not be placed yet.
    fn mark_started(&mut self) {
        if self.status.is_idle() {
            self.status = GameStatus::Playing;
            self.clock.start();
        }
    }

    fn reveal_target(&mut self, coords: Coord2) -> RevealOutcome {
        if self.board.cell(coords).has_mine {
            debug!("mine hit at {coords:?}");
            self.board.reveal_all_mines();
            self.status = GameStatus::Lost;
            self.clock.stop();
            return RevealOutcome::Exploded;
        }

        self.flood_reveal(coords);

        if self.revealed_count == self.config.safe_cells() {
            self.status = GameStatus::Won;
            self.clock.stop();
            // cosmetic completion: flag the rest and zero the counter
            self.board.flag_remaining_mines();
            self.flags_used = self.config.mines;
            RevealOutcome::Won
        } else {
            RevealOutcome::Revealed
        }
    }

    /// Cascade from `start` with an explicit frontier: zero-neighbor cells
    /// expand, numbered cells form the boundary, mines and flagged cells are
    /// never revealed here.
    fn flood_reveal(&mut self, start: Coord2) {
        let mut frontier = VecDeque::from([start]);
        let mut visited: HashSet<Coord2> = HashSet::new();

        while let Some(coords) = frontier.pop_front() {
            if !visited.insert(coords) {
                continue;
            }

            let cell = self.board.cell(coords);
            if cell.is_revealed || cell.is_flagged || cell.has_mine {
                continue;
            }
            let adjacent = cell.neighbor_mines;

            self.board.cell_mut(coords).is_revealed = true;
            self.revealed_count += 1;
            trace!("revealed {coords:?} ({adjacent} adjacent)");

            if adjacent == 0 {
                frontier.extend(
                    self.board
                        .neighbors(coords.0, coords.1)
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("difficulty", &self.difficulty)
            .field("status", &self.status)
            .field("flags_used", &self.flags_used)
            .field("revealed_count", &self.revealed_count)
            .field("mines_placed", &self.mines_placed)
            .finish_non_exhaustive()
    }
}
