//! Terminal output for server messages and prompts

use std::io::{self, Write};

pub const PROMPT: &str = "Enter command (MOVE/ATTACK/QUIT): ";

pub struct Renderer<W: Write> {
    out: W,
}

impl Renderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Prints a chunk of server output on its own block.
    pub fn show(&mut self, message: &str) -> io::Result<()> {
        write!(self.out, "\n{}\n", message.trim_end_matches('\n'))?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{}", PROMPT)?;
        self.out.flush()
    }

    pub fn notice(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
