use std::{
    collections::TryReserveError,
    fmt,
    io::{Read, Write},
    ops::Deref,
};

use crossterm::{cursor, style, terminal, QueueableCommand};

pub const PROMPT: &str = "? ";
/// Content of the line returned once the source is exhausted.
pub const END_OF_INPUT: &str = "\n";
pub const BANNER: &str = "UNIX SHELL, version 1.0.0";

/// Initial buffer size, also the amount the buffer grows by once full.
const LINE_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ReadLineError {
    #[error("Io Error <{0}>")]
    Io(#[from] std::io::Error),
    #[error("Allocation error <{0}>")]
    Alloc(#[from] TryReserveError),
}

/// One line of input without its terminating newline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line(String);

impl Line {
    pub fn end_of_input() -> Self {
        Self(END_OF_INPUT.to_string())
    }

    pub fn is_end_of_input(&self) -> bool {
        self.0 == END_OF_INPUT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_bytes(buffer: Vec<u8>) -> Self {
        match String::from_utf8(buffer) {
            Ok(s) => Self(s),
            Err(err) => Self(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        }
    }
}

impl Deref for Line {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads bytes from `source` up to the next newline.
///
/// The buffer starts at [`LINE_CAPACITY`] bytes and grows by the same amount
/// every time it fills up. Text pending when the source runs dry is returned
/// as a regular line; a read that finds the source already exhausted yields
/// [`Line::end_of_input`].
pub fn read_line<R: Read>(source: &mut R) -> Result<Line, ReadLineError> {
    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(LINE_CAPACITY)?;

    for byte in source.bytes() {
        match byte? {
            b'\n' => return Ok(Line::from_bytes(buffer)),
            b => {
                if buffer.len() == buffer.capacity() {
                    buffer.try_reserve_exact(LINE_CAPACITY)?;
                }
                buffer.push(b);
            }
        }
    }

    if buffer.is_empty() {
        return Ok(Line::end_of_input());
    }
    Ok(Line::from_bytes(buffer))
}

pub fn prompt(stdout: &mut dyn Write) -> std::io::Result<()> {
    stdout.queue(style::Print(PROMPT))?;
    stdout.flush()
}

/// Clears the screen and greets the user.
pub fn print_banner(stdout: &mut dyn Write) -> std::io::Result<()> {
    stdout
        .queue(terminal::Clear(terminal::ClearType::All))?
        .queue(cursor::MoveTo(0, 0))?;

    writeln!(stdout, "{}", BANNER)?;
    writeln!(stdout, "Type 'help' to see this list.")?;
    writeln!(stdout)?;
    stdout.flush()
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::{assert_eq, assert_str_eq};

    #[test]
    fn short_line() {
        let mut src = "cd /tmp\nls\n".as_bytes();
        let line = read_line(&mut src).unwrap();
        assert_str_eq!("cd /tmp", line.as_str());
        let line = read_line(&mut src).unwrap();
        assert_str_eq!("ls", line.as_str());
    }

    #[test]
    fn empty_line() {
        let mut src = "\nfoo\n".as_bytes();
        let line = read_line(&mut src).unwrap();
        assert!(line.is_empty());
        assert!(!line.is_end_of_input());
    }

    #[test]
    fn exactly_capacity() {
        let txt = "x".repeat(LINE_CAPACITY);
        let input = format!("{txt}\n");
        let line = read_line(&mut input.as_bytes()).unwrap();
        assert_eq!(LINE_CAPACITY, line.len());
        assert_str_eq!(txt.as_str(), line.as_str());
    }

    #[test]
    fn many_times_capacity() {
        let txt: String = (0..LINE_CAPACITY * 7 + 13)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let input = format!("{txt}\nnext\n");
        let mut src = input.as_bytes();

        let line = read_line(&mut src).unwrap();
        assert_str_eq!(txt.as_str(), line.as_str());

        let line = read_line(&mut src).unwrap();
        assert_str_eq!("next", line.as_str());
    }

    #[test]
    fn exhausted_source() {
        let mut src = "".as_bytes();
        let line = read_line(&mut src).unwrap();
        assert!(line.is_end_of_input());
        assert_str_eq!("\n", line.as_str());
    }

    #[test]
    fn pending_text_before_end() {
        let mut src = "echo".as_bytes();
        let line = read_line(&mut src).unwrap();
        assert_str_eq!("echo", line.as_str());

        let line = read_line(&mut src).unwrap();
        assert_eq!(Line::end_of_input(), line);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut src: &[u8] = b"a\xffb\n";
        let line = read_line(&mut src).unwrap();
        assert_str_eq!("a\u{fffd}b", line.as_str());
    }

    #[test]
    fn prompt_is_flushed() {
        let mut out = Vec::new();
        prompt(&mut out).unwrap();
        assert_eq!(b"? ".as_slice(), out.as_slice());
    }

    #[test]
    fn banner() {
        let mut out = Vec::new();
        print_banner(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(BANNER));
        assert!(out.ends_with("Type 'help' to see this list.\n\n"));
    }
}
