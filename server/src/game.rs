//! Authoritative grid battle state and the rules that mutate it
//!
//! Nothing in here touches the network. The caller owns locking: every
//! method assumes exclusive access, and [`crate::client_manager`] is the only
//! place that holds a `GameState` behind the shared mutex.

use log::{debug, info};
use rand::seq::index::sample;
use rand::Rng;
use shared::{symbol_for, Direction, DAMAGE, GRID_SIZE, MAX_HP, MAX_PLAYERS};
use std::fmt;
use thiserror::Error;

/// Index into the fixed player table.
pub type SlotId = usize;

pub const MIN_OBSTACLES: usize = 3;
pub const MAX_OBSTACLES: usize = 5;
/// Random spawn picks tried before a join is refused.
pub const MAX_SPAWN_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub symbol: char,
    pub row: usize,
    pub col: usize,
    pub hp: u32,
    pub active: bool,
}

impl Player {
    fn vacant(slot: SlotId) -> Self {
        Self {
            symbol: symbol_for(slot),
            row: 0,
            col: 0,
            hp: 0,
            active: false,
        }
    }

    /// True when the two cells differ by one along exactly one axis.
    pub fn is_adjacent_to(&self, row: usize, col: usize) -> bool {
        self.row.abs_diff(row) + self.col.abs_diff(col) == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Obstacle,
    Player(char),
    Empty,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("all player slots are taken")]
    Full,
    #[error("no free cell found after {0} attempts")]
    NoFreeCell(usize),
    #[error("cell ({0},{1}) cannot hold a new player")]
    CellUnavailable(usize, usize),
}

/// Rejections of a player action.
///
/// The `Display` text is the exact line sent back to the acting client.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("Move blocked: out of bounds.")]
    OutOfBounds,
    #[error("Move blocked: obstacle in the way.")]
    Obstacle,
    #[error("Move blocked: another player is in that cell.")]
    Occupied,
    #[error("No targets adjacent to attack.")]
    NoTarget,
    #[error("You are no longer in the game.")]
    Inactive,
}

/// Result of an attack that found at least one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackReport {
    /// Every opponent that took damage, with its remaining hit points.
    pub hits: Vec<(SlotId, u32)>,
    /// Opponents whose hit points reached zero and were removed.
    pub eliminated: Vec<SlotId>,
}

#[derive(Debug, Clone)]
pub struct GameState {
    players: [Player; MAX_PLAYERS],
    obstacles: [[bool; GRID_SIZE]; GRID_SIZE],
    active_count: usize,
}

impl GameState {
    /// Creates a board with 3 to 5 distinct random obstacles.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let count = rng.gen_range(MIN_OBSTACLES..=MAX_OBSTACLES);
        let cells: Vec<(usize, usize)> = sample(rng, GRID_SIZE * GRID_SIZE, count)
            .into_iter()
            .map(|index| (index / GRID_SIZE, index % GRID_SIZE))
            .collect();
        Self::with_obstacles(&cells)
    }

    /// Creates a board with a fixed obstacle layout. Out-of-range cells are ignored.
    pub fn with_obstacles(cells: &[(usize, usize)]) -> Self {
        let mut obstacles = [[false; GRID_SIZE]; GRID_SIZE];
        for &(row, col) in cells {
            if row < GRID_SIZE && col < GRID_SIZE {
                obstacles[row][col] = true;
            }
        }

        Self {
            players: std::array::from_fn(Player::vacant),
            obstacles,
            active_count: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn is_full(&self) -> bool {
        self.active_count >= MAX_PLAYERS
    }

    pub fn is_obstacle(&self, row: usize, col: usize) -> bool {
        row < GRID_SIZE && col < GRID_SIZE && self.obstacles[row][col]
    }

    /// Returns the player in `slot` if it is active.
    pub fn player(&self, slot: SlotId) -> Option<&Player> {
        self.players.get(slot).filter(|player| player.active)
    }

    /// Active players in slot order.
    pub fn active_players(&self) -> impl Iterator<Item = (SlotId, &Player)> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, player)| player.active)
    }

    /// Slot of the active player standing on the cell, if any.
    pub fn occupant(&self, row: usize, col: usize) -> Option<SlotId> {
        self.active_players()
            .find(|(_, player)| player.row == row && player.col == col)
            .map(|(slot, _)| slot)
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        if self.is_obstacle(row, col) {
            return Cell::Obstacle;
        }
        match self.occupant(row, col) {
            Some(slot) => Cell::Player(self.players[slot].symbol),
            None => Cell::Empty,
        }
    }

    fn is_free(&self, row: usize, col: usize) -> bool {
        row < GRID_SIZE && col < GRID_SIZE && matches!(self.cell(row, col), Cell::Empty)
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self, slot: SlotId) -> &mut Player {
        &mut self.players[slot]
    }

    fn first_vacant_slot(&self) -> Option<SlotId> {
        self.players.iter().position(|player| !player.active)
    }

    /// Places a new player on a random free cell.
    ///
    /// The spawn search gives up after [`MAX_SPAWN_ATTEMPTS`] picks, leaving
    /// the state untouched.
    pub fn join<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<SlotId, JoinError> {
        if self.is_full() {
            return Err(JoinError::Full);
        }

        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let row = rng.gen_range(0..GRID_SIZE);
            let col = rng.gen_range(0..GRID_SIZE);
            if self.is_free(row, col) {
                return self.join_at(row, col);
            }
        }

        Err(JoinError::NoFreeCell(MAX_SPAWN_ATTEMPTS))
    }

    /// Places a new player on a specific cell, taking the first vacant slot.
    pub fn join_at(&mut self, row: usize, col: usize) -> Result<SlotId, JoinError> {
        let slot = self.first_vacant_slot().ok_or(JoinError::Full)?;
        if !self.is_free(row, col) {
            return Err(JoinError::CellUnavailable(row, col));
        }

        let player = &mut self.players[slot];
        player.row = row;
        player.col = col;
        player.hp = MAX_HP;
        player.active = true;
        self.active_count += 1;

        info!("Player {} joined at ({},{})", player.symbol, row, col);
        Ok(slot)
    }

    /// Deactivates `slot`. Returns false if it was already inactive, so
    /// repeated cleanup never double-counts.
    pub fn leave(&mut self, slot: SlotId) -> bool {
        match self.players.get_mut(slot) {
            Some(player) if player.active => {
                player.active = false;
                self.active_count -= 1;
                info!("Player {} left the game", player.symbol);
                true
            }
            _ => false,
        }
    }

    /// Moves the player one cell. On error nothing changes.
    pub fn move_player(&mut self, slot: SlotId, direction: Direction) -> Result<(), ActionError> {
        let player = self.player(slot).ok_or(ActionError::Inactive)?;
        let (dr, dc) = direction.offset();

        let (row, col) = match (
            player.row.checked_add_signed(dr),
            player.col.checked_add_signed(dc),
        ) {
            (Some(row), Some(col)) if row < GRID_SIZE && col < GRID_SIZE => (row, col),
            _ => return Err(ActionError::OutOfBounds),
        };

        if self.obstacles[row][col] {
            return Err(ActionError::Obstacle);
        }
        if matches!(self.occupant(row, col), Some(other) if other != slot) {
            return Err(ActionError::Occupied);
        }

        let player = &mut self.players[slot];
        player.row = row;
        player.col = col;
        debug!("Player {} moved {} to ({},{})", player.symbol, direction, row, col);
        Ok(())
    }

    /// Damages every active opponent adjacent to the attacker.
    ///
    /// Opponents brought to zero hit points are deactivated as part of the
    /// same call.
    pub fn attack(&mut self, slot: SlotId) -> Result<AttackReport, ActionError> {
        let attacker = self.player(slot).ok_or(ActionError::Inactive)?;
        let (row, col) = (attacker.row, attacker.col);

        let targets: Vec<SlotId> = self
            .active_players()
            .filter(|(other, player)| *other != slot && player.is_adjacent_to(row, col))
            .map(|(other, _)| other)
            .collect();

        if targets.is_empty() {
            return Err(ActionError::NoTarget);
        }

        let mut report = AttackReport::default();
        for target in targets {
            let victim = &mut self.players[target];
            victim.hp = victim.hp.saturating_sub(DAMAGE);
            debug!(
                "Player {} hit {} (HP={})",
                self.players[slot].symbol, self.players[target].symbol, self.players[target].hp
            );
            report.hits.push((target, self.players[target].hp));
            if self.players[target].hp == 0 {
                self.leave(target);
                report.eliminated.push(target);
            }
        }

        Ok(report)
    }
}

/// Full snapshot text: the grid block followed by one status line per
/// active player.
impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid:")?;
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let marker = match self.cell(row, col) {
                    Cell::Obstacle => 'X',
                    Cell::Player(symbol) => symbol,
                    Cell::Empty => '.',
                };
                write!(f, "{} ", marker)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Players:")?;
        for (_, player) in self.active_players() {
            writeln!(
                f,
                "{}: HP={} at ({},{})",
                player.symbol, player.hp, player.row, player.col
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_places_three_to_five_obstacles() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = GameState::new(&mut rng);
            let count = (0..GRID_SIZE)
                .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
                .filter(|&(r, c)| state.is_obstacle(r, c))
                .count();
            assert!((MIN_OBSTACLES..=MAX_OBSTACLES).contains(&count));
            assert_eq!(state.active_count(), 0);
        }
    }

    #[test]
    fn test_join_assigns_slots_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = GameState::with_obstacles(&[(2, 2)]);

        for expected in 0..MAX_PLAYERS {
            let slot = state.join(&mut rng).unwrap();
            assert_eq!(slot, expected);
            let player = state.player(slot).unwrap();
            assert_eq!(player.symbol, symbol_for(expected));
            assert_eq!(player.hp, MAX_HP);
            assert!(!state.is_obstacle(player.row, player.col));
        }

        assert_eq!(state.active_count(), MAX_PLAYERS);
        assert_eq!(state.join(&mut rng), Err(JoinError::Full));
        assert_eq!(state.active_count(), MAX_PLAYERS);
    }

    #[test]
    fn test_join_gives_up_when_no_cell_is_free() {
        let every_cell: Vec<(usize, usize)> = (0..GRID_SIZE)
            .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
            .collect();
        let mut state = GameState::with_obstacles(&every_cell);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(
            state.join(&mut rng),
            Err(JoinError::NoFreeCell(MAX_SPAWN_ATTEMPTS))
        );
        assert_eq!(state.active_count(), 0);
    }

    #[test]
    fn test_join_at_rejects_taken_cells() {
        let mut state = GameState::with_obstacles(&[(1, 1)]);
        assert_eq!(state.join_at(1, 1), Err(JoinError::CellUnavailable(1, 1)));
        state.join_at(0, 0).unwrap();
        assert_eq!(state.join_at(0, 0), Err(JoinError::CellUnavailable(0, 0)));
        assert_eq!(state.join_at(9, 0), Err(JoinError::CellUnavailable(9, 0)));
    }

    #[test]
    fn test_move_blocked_by_obstacle() {
        let mut state = GameState::with_obstacles(&[(2, 2)]);
        let a = state.join_at(2, 1).unwrap();

        let result = state.move_player(a, Direction::Right);

        assert_eq!(result, Err(ActionError::Obstacle));
        assert_eq!(result.unwrap_err().to_string(), "Move blocked: obstacle in the way.");
        let player = state.player(a).unwrap();
        assert_eq!((player.row, player.col), (2, 1));
    }

    #[test]
    fn test_move_blocked_by_bounds() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();
        let b = state.join_at(4, 4).unwrap();

        assert_eq!(state.move_player(a, Direction::Up), Err(ActionError::OutOfBounds));
        assert_eq!(state.move_player(a, Direction::Left), Err(ActionError::OutOfBounds));
        assert_eq!(state.move_player(b, Direction::Down), Err(ActionError::OutOfBounds));
        assert_eq!(state.move_player(b, Direction::Right), Err(ActionError::OutOfBounds));
    }

    #[test]
    fn test_move_blocked_by_other_player() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();
        state.join_at(0, 1).unwrap();

        assert_eq!(state.move_player(a, Direction::Right), Err(ActionError::Occupied));
        assert_eq!(
            ActionError::Occupied.to_string(),
            "Move blocked: another player is in that cell."
        );
    }

    #[test]
    fn test_move_updates_position() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(3, 3).unwrap();

        state.move_player(a, Direction::Up).unwrap();
        state.move_player(a, Direction::Left).unwrap();

        let player = state.player(a).unwrap();
        assert_eq!((player.row, player.col), (2, 2));
        assert_eq!(state.cell(2, 2), Cell::Player('A'));
        assert_eq!(state.cell(3, 3), Cell::Empty);
    }

    #[test]
    fn test_attack_damages_adjacent_player() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();
        let b = state.join_at(0, 1).unwrap();

        let report = state.attack(a).unwrap();

        assert_eq!(report.hits, vec![(b, 80)]);
        assert!(report.eliminated.is_empty());
        assert_eq!(state.player(b).unwrap().hp, 80);
        assert_eq!(state.player(a).unwrap().hp, MAX_HP);
    }

    #[test]
    fn test_attack_ignores_diagonal_and_distant_players() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(2, 2).unwrap();
        state.join_at(3, 3).unwrap();
        state.join_at(2, 4).unwrap();

        assert_eq!(state.attack(a), Err(ActionError::NoTarget));
        assert!(state.active_players().all(|(_, p)| p.hp == MAX_HP));
    }

    #[test]
    fn test_attack_hits_every_adjacent_player() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(2, 2).unwrap();
        let b = state.join_at(1, 2).unwrap();
        let c = state.join_at(2, 3).unwrap();
        let d = state.join_at(4, 4).unwrap();

        let report = state.attack(a).unwrap();

        assert_eq!(report.hits, vec![(b, 80), (c, 80)]);
        assert_eq!(state.player(d).unwrap().hp, MAX_HP);
    }

    #[test]
    fn test_attack_eliminates_at_zero_and_frees_slot() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();
        let b = state.join_at(0, 1).unwrap();

        for _ in 0..4 {
            state.attack(a).unwrap();
        }
        assert_eq!(state.player(b).unwrap().hp, 20);

        let report = state.attack(a).unwrap();
        assert_eq!(report.hits, vec![(b, 0)]);
        assert_eq!(report.eliminated, vec![b]);
        assert!(state.player(b).is_none());
        assert_eq!(state.active_count(), 1);

        // The freed slot is reused by the next arrival.
        assert_eq!(state.join_at(4, 4), Ok(b));
        assert_eq!(state.player(b).unwrap().hp, MAX_HP);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();

        assert!(state.leave(a));
        assert!(!state.leave(a));
        assert!(!state.leave(MAX_PLAYERS + 3));
        assert_eq!(state.active_count(), 0);
    }

    #[test]
    fn test_inactive_slot_cannot_act() {
        let mut state = GameState::with_obstacles(&[]);
        assert_eq!(state.move_player(0, Direction::Up), Err(ActionError::Inactive));
        assert_eq!(state.attack(0), Err(ActionError::Inactive));
    }

    #[test]
    fn test_render_snapshot() {
        let mut state = GameState::with_obstacles(&[(2, 2), (4, 0)]);
        state.join_at(0, 1).unwrap();
        state.join_at(3, 4).unwrap();

        let expected = "Grid:\n\
                        . A . . . \n\
                        . . . . . \n\
                        . . X . . \n\
                        . . . . B \n\
                        X . . . . \n\
                        Players:\n\
                        A: HP=100 at (0,1)\n\
                        B: HP=100 at (3,4)\n";
        assert_eq!(state.to_string(), expected);
    }

    #[test]
    fn test_render_omits_inactive_players() {
        let mut state = GameState::with_obstacles(&[]);
        let a = state.join_at(0, 0).unwrap();
        state.join_at(1, 1).unwrap();
        state.leave(a);

        let snapshot = state.to_string();
        assert!(!snapshot.contains("A: HP"));
        assert!(snapshot.contains("B: HP=100 at (1,1)"));
        assert!(snapshot.starts_with("Grid:\n. . . . . \n"));
    }
}
