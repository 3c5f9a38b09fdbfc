use std::{collections::TryReserveError, slice};

use crate::terminal::Line;

const DELIMITER: char = ' ';
/// Initial slot count, also the amount the vector grows by once full.
const TOKEN_CAPACITY: usize = 32;

/// The words of a [`Line`], borrowed from its storage.
///
/// Reading one slot past the last word gives `None`, which callers treat as
/// the end of the argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVector<'line> {
    tokens: Vec<&'line str>,
}

impl<'line> ArgVector<'line> {
    /// The command name, `None` when the line held no words.
    pub fn command(&self) -> Option<&'line str> {
        self.get(0)
    }

    pub fn get(&self, idx: usize) -> Option<&'line str> {
        self.tokens.get(idx).copied()
    }

    /// Everything after the command name.
    pub fn rest(&self) -> &[&'line str] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[&'line str] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, &'line str> {
        self.tokens.iter()
    }
}

impl<'a, 'line> IntoIterator for &'a ArgVector<'line> {
    type Item = &'a &'line str;
    type IntoIter = slice::Iter<'a, &'line str>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Splits `line` on spaces. Consecutive spaces never produce empty words and
/// tabs are kept as part of a word.
pub fn split_line(line: &Line) -> Result<ArgVector<'_>, TryReserveError> {
    let mut tokens = Vec::new();
    tokens.try_reserve_exact(TOKEN_CAPACITY)?;

    for token in line.split(DELIMITER).filter(|t| !t.is_empty()) {
        if tokens.len() == tokens.capacity() {
            tokens.try_reserve_exact(TOKEN_CAPACITY)?;
        }
        tokens.push(token);
    }

    Ok(ArgVector { tokens })
}
