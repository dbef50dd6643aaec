//! Fixed-width (column bound) fields.

use crate::cursor::LineCursor;
use crate::error::{LengthViolation, RecordError};

use super::{ExtractedSpan, FieldDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    Left,
    Right,
    Center,
}

/// Where padding goes when a value is narrower than its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub mode: AlignMode,
    pub pad: char,
}

impl Alignment {
    pub fn new(mode: AlignMode, pad: char) -> Self {
        Self { mode, pad }
    }
}

/// Tolerance for lines that do not match the declared widths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FixedMode {
    /// Every field must be exactly its width; the line must end with the last field.
    #[default]
    ExactLength,
    /// The last field may be followed by extra characters.
    AllowMoreChars,
    /// A field may be cut short by the end of the line.
    AllowLessChars,
    /// Both of the above.
    AllowVariableLength,
}

impl FixedMode {
    fn allows_less(&self) -> bool {
        matches!(
            self,
            FixedMode::AllowLessChars | FixedMode::AllowVariableLength
        )
    }

    fn allows_more(&self) -> bool {
        matches!(
            self,
            FixedMode::AllowMoreChars | FixedMode::AllowVariableLength
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedLayout {
    /// Width in characters, always > 0.
    pub width: usize,
    pub align: Alignment,
    pub mode: FixedMode,
}

impl FixedLayout {
    pub(crate) fn extract(
        &self,
        field: &FieldDescriptor,
        cursor: &mut LineCursor<'_>,
    ) -> Result<ExtractedSpan, RecordError> {
        let from = cursor.position();
        let remaining = cursor.remaining_len();

        if remaining == 0 {
            if field.optional {
                return Ok(ExtractedSpan::empty(cursor.line_number(), from));
            }
            return Err(RecordError::length(
                cursor.context(&field.name, ""),
                LengthViolation::EndOfLine,
            ));
        }

        if remaining < self.width {
            if !self.mode.allows_less() {
                return Err(RecordError::length(
                    cursor.context(&field.name, cursor.remaining_text()),
                    LengthViolation::TooShort {
                        found: remaining,
                        width: self.width,
                    },
                ));
            }
            let span = ExtractedSpan::raw(cursor, from, from + remaining);
            cursor.advance(remaining);
            return Ok(span);
        }

        if remaining > self.width && field.is_last && !field.is_array() && !self.mode.allows_more()
        {
            return Err(RecordError::length(
                cursor.context(&field.name, cursor.remaining_text()),
                LengthViolation::TooLong {
                    found: remaining,
                    width: self.width,
                },
            ));
        }

        let span = ExtractedSpan::raw(cursor, from, from + self.width);
        cursor.advance(self.width);
        Ok(span)
    }

    /// Pad or truncate `text` to exactly `width` characters.
    pub(crate) fn render(&self, buf: &mut String, text: &str) {
        let text: String = text.chars().take(self.width).collect();
        let padding = self.width - text.chars().count();
        let pad = self.align.pad;

        let (before, after) = match self.align.mode {
            AlignMode::Left => (0, padding),
            AlignMode::Right => (padding, 0),
            AlignMode::Center => (padding / 2, padding - padding / 2),
        };
        buf.extend(std::iter::repeat_n(pad, before));
        buf.push_str(&text);
        buf.extend(std::iter::repeat_n(pad, after));
    }
}
