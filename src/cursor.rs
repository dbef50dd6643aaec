//! Line cursor: the parse position within one logical line.
//!
//! Offsets and widths are counted in characters, not bytes. A cursor can
//! pull the next physical line from its `LineSource` when a field starts on
//! a new line or a quoted value spans lines.

use crate::error::{ErrorContext, LengthViolation, RecordError};

/// A sequential source of physical lines.
pub trait LineSource {
    /// The next line, without its terminator, or `None` when exhausted.
    fn next_line(&mut self) -> Option<String>;

    /// 1-based number of the line most recently returned (0 before the first).
    fn line_number(&self) -> usize;
}

/// Lines of an in-memory text.
#[derive(Debug, Clone)]
pub struct TextLines<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl<'a> TextLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            next: 0,
        }
    }

    /// Remove the last `n` lines (trailer records) and return them.
    pub fn drop_last(&mut self, n: usize) -> Vec<&'a str> {
        let keep = self.lines.len().saturating_sub(n).max(self.next);
        self.lines.split_off(keep)
    }

    /// Lines not yet returned.
    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.next)
    }
}

impl LineSource for TextLines<'_> {
    fn next_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.next)?;
        self.next += 1;
        Some((*line).to_string())
    }

    fn line_number(&self) -> usize {
        self.next
    }
}

/// An exhausted source, for cursors over a single standalone line.
#[derive(Debug, Default)]
pub struct NoMoreLines;

impl LineSource for NoMoreLines {
    fn next_line(&mut self) -> Option<String> {
        None
    }

    fn line_number(&self) -> usize {
        1
    }
}

/// Mutable view over the line being parsed.
pub struct LineCursor<'s> {
    chars: Vec<char>,
    pos: usize,
    line_number: usize,
    source: &'s mut dyn LineSource,
}

impl<'s> LineCursor<'s> {
    /// Cursor at the start of `line`; `source` supplies any continuation lines.
    pub fn new(line: &str, line_number: usize, source: &'s mut dyn LineSource) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
            line_number,
            source,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn remaining_len(&self) -> usize {
        self.chars.len().saturating_sub(self.pos)
    }

    pub fn is_eol(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Only whitespace is left on the line.
    pub fn is_blank_from_pos(&self) -> bool {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .all(|c| c.is_whitespace())
    }

    pub fn current_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn remaining_text(&self) -> String {
        self.slice(self.pos, self.chars.len())
    }

    /// Characters in `[from, to)`, clamped to the line.
    pub fn slice(&self, from: usize, to: usize) -> String {
        let to = to.min(self.chars.len());
        let from = from.min(to);
        self.chars[from..to].iter().collect()
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.chars.len());
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.chars.len());
    }

    pub fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Skip spaces and tabs only, stopping at anything else.
    pub fn skip_blanks(&mut self) {
        while matches!(self.current_char(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.matches_at(self.pos, pat)
    }

    /// Absolute offset of the next occurrence of `pat` at or after the cursor.
    pub fn find(&self, pat: &str) -> Option<usize> {
        if pat.is_empty() {
            return Some(self.pos);
        }
        (self.pos..self.chars.len()).find(|&at| self.matches_at(at, pat))
    }

    fn matches_at(&self, at: usize, pat: &str) -> bool {
        let mut i = at;
        for c in pat.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Replace the current text with the next physical line. Returns `false`
    /// when the source is exhausted, leaving the cursor untouched.
    pub fn load_next(&mut self) -> bool {
        match self.source.next_line() {
            Some(line) => {
                self.chars = line.chars().collect();
                self.pos = 0;
                self.line_number = self.source.line_number();
                true
            }
            None => false,
        }
    }

    /// Move to the next physical line for a field that starts on a new line.
    /// Anything but whitespace left on the current line is an error.
    pub fn reload(&mut self, field: &str) -> Result<(), RecordError> {
        if !self.is_blank_from_pos() {
            return Err(RecordError::length(
                self.context(field, self.remaining_text()),
                LengthViolation::TextBeforeNewLine,
            ));
        }
        if !self.load_next() {
            return Err(RecordError::EndOfInput {
                context: self.context(field, String::new()),
            });
        }
        Ok(())
    }

    /// Error context at the current position (1-based column).
    pub fn context(&self, field: &str, text: impl Into<String>) -> ErrorContext {
        ErrorContext::new(self.line_number, self.pos + 1, field, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_clamps_to_line() {
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("abc", 1, &mut src);
        cursor.advance(2);
        assert_eq!(cursor.remaining_len(), 1);
        cursor.advance(10);
        assert!(cursor.is_eol());
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_find_multichar_delimiter() {
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("a||b||c", 1, &mut src);
        assert_eq!(cursor.find("||"), Some(1));
        cursor.seek(3);
        assert_eq!(cursor.find("||"), Some(4));
        cursor.seek(6);
        assert_eq!(cursor.find("||"), None);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let mut src = NoMoreLines;
        let cursor = LineCursor::new("héllo", 1, &mut src);
        assert_eq!(cursor.len(), 5);
        assert_eq!(cursor.slice(1, 3), "él");
    }

    #[test]
    fn test_reload_pulls_next_line() {
        let mut src = TextLines::new("first\nsecond\nthird");
        let first = src.next_line().unwrap();
        let mut cursor = LineCursor::new(&first, src.line_number(), &mut src);
        cursor.advance(5);
        cursor.reload("f").unwrap();
        assert_eq!(cursor.line_number(), 2);
        assert_eq!(cursor.remaining_text(), "second");
    }

    #[test]
    fn test_reload_rejects_trailing_text() {
        let mut src = TextLines::new("first\nsecond");
        let first = src.next_line().unwrap();
        let mut cursor = LineCursor::new(&first, 1, &mut src);
        cursor.advance(2);
        let err = cursor.reload("f").unwrap_err();
        assert!(matches!(
            err,
            RecordError::Length {
                violation: LengthViolation::TextBeforeNewLine,
                ..
            }
        ));
    }

    #[test]
    fn test_reload_end_of_input() {
        let mut src = TextLines::new("only");
        let first = src.next_line().unwrap();
        let mut cursor = LineCursor::new(&first, 1, &mut src);
        cursor.advance(4);
        let err = cursor.reload("notes").unwrap_err();
        assert!(matches!(err, RecordError::EndOfInput { .. }));
        assert_eq!(err.context().field, "notes");
    }

    #[test]
    fn test_text_lines_drop_last() {
        let mut src = TextLines::new("a\nb\nc\nTRAILER");
        assert_eq!(src.drop_last(1), vec!["TRAILER"]);
        assert_eq!(src.remaining(), 3);
        src.next_line();
        assert_eq!(src.line_number(), 1);
    }
}
