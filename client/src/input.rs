//! Terminal command input

use shared::Command;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Reads one command per line from the user.
pub struct InputManager<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> InputManager<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Next line typed by the user, or `None` once input is closed (Ctrl+D).
    pub async fn next_command(&mut self) -> std::io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// True if the line asks the server to end the session.
pub fn is_quit(line: &str) -> bool {
    matches!(Command::parse(line), Command::Quit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_lines_until_end_of_input() {
        let mock = tokio_test::io::Builder::new()
            .read(b"move up\r\n")
            .read(b"ATTACK\nQUIT\n")
            .build();
        let mut input = InputManager::new(mock);

        assert_eq!(input.next_command().await.unwrap().as_deref(), Some("move up"));
        assert_eq!(input.next_command().await.unwrap().as_deref(), Some("ATTACK"));
        assert_eq!(input.next_command().await.unwrap().as_deref(), Some("QUIT"));
        assert_eq!(input.next_command().await.unwrap(), None);
    }

    #[test]
    fn test_is_quit() {
        assert!(is_quit("QUIT"));
        assert!(is_quit("quit"));
        assert!(!is_quit("QUIT now"));
        assert!(!is_quit("MOVE UP"));
    }
}
