use std::fmt;
use thiserror::Error;

pub const GRID_SIZE: usize = 5;
pub const MAX_PLAYERS: usize = 4;
pub const MAX_HP: u32 = 100;
pub const DAMAGE: u32 = 20;

pub const SERVER_FULL: &str = "Server full. Try again later.";
pub const NO_FREE_CELL: &str = "Server error: no free cell available.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Available commands: MOVE, ATTACK, QUIT.";

/// Symbol shown on the grid for the player occupying `slot`.
pub fn symbol_for(slot: usize) -> char {
    (b'A' + slot as u8) as char
}

pub fn welcome_line(symbol: char) -> String {
    format!("Welcome to the game! You are player {}.", symbol)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Case-insensitive keyword lookup.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("UP") {
            Some(Direction::Up)
        } else if token.eq_ignore_ascii_case("DOWN") {
            Some(Direction::Down)
        } else if token.eq_ignore_ascii_case("LEFT") {
            Some(Direction::Left)
        } else if token.eq_ignore_ascii_case("RIGHT") {
            Some(Direction::Right)
        } else {
            None
        }
    }

    /// Row/column delta of a single step.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// Reasons a recognised keyword was used incorrectly.
///
/// The `Display` text is the exact line sent back to the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: MOVE <UP|DOWN|LEFT|RIGHT>")]
    MissingDirection,
    #[error("Invalid direction. Use UP, DOWN, LEFT, or RIGHT.")]
    UnknownDirection(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Attack,
    Quit,
    Invalid(CommandError),
    Unknown,
}

impl Command {
    /// Decodes one line of client input.
    ///
    /// Trailing `\r`/`\n` are ignored and keywords match case-insensitively.
    /// `ATTACK` and `QUIT` must appear alone on the line; `MOVE` takes the
    /// next whitespace-separated token as its direction and ignores the rest.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, Some(rest)),
            None => (line, None),
        };

        if keyword.eq_ignore_ascii_case("MOVE") {
            return match rest.and_then(|rest| rest.split_whitespace().next()) {
                None => Command::Invalid(CommandError::MissingDirection),
                Some(token) => match Direction::from_token(token) {
                    Some(direction) => Command::Move(direction),
                    None => Command::Invalid(CommandError::UnknownDirection(token.to_string())),
                },
            };
        }

        if line.eq_ignore_ascii_case("ATTACK") {
            Command::Attack
        } else if line.eq_ignore_ascii_case("QUIT") {
            Command::Quit
        } else {
            Command::Unknown
        }
    }
}
