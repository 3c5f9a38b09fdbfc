use std::{collections::TryReserveError, io::Write};

use tracing::trace;

/// Lines submitted at the prompt, oldest first.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an owned copy of `line`.
    ///
    /// Running out of memory is not fatal here, the line is simply not
    /// recorded.
    pub fn save(&mut self, line: &str) -> Result<(), TryReserveError> {
        let mut copy = String::new();
        copy.try_reserve_exact(line.len())?;
        copy.push_str(line);

        self.entries.try_reserve(1)?;
        self.entries.push(copy);

        trace!(entries = self.entries.len(), "saved history entry");
        Ok(())
    }

    pub fn print(&self, stdout: &mut dyn Write) -> std::io::Result<()> {
        if self.is_empty() {
            trace!("no history to print");
            return Ok(());
        }

        for (i, l) in self.iter().enumerate() {
            writeln!(stdout, "    {} >{}", i + 1, l)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry along with its storage.
    pub fn release(&mut self) {
        trace!(entries = self.entries.len(), "releasing history");
        self.entries = Vec::new();
    }
}
