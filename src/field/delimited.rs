//! Delimiter bound fields, optionally quoted.

use crate::convert::TrimMode;
use crate::cursor::LineCursor;
use crate::error::{ErrorContext, LengthViolation, RecordError};

use super::{ExtractedSpan, FieldDescriptor};

/// When a quoted field must carry quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteMode {
    /// Quotes are required on read and always written.
    #[default]
    AlwaysQuoted,
    /// Quotes are optional on read, always written.
    OptionalForRead,
    /// Quotes are required on read, written only when needed.
    OptionalForWrite,
    /// Quotes are optional on read, written only when needed.
    OptionalForBoth,
}

impl QuoteMode {
    fn optional_on_read(&self) -> bool {
        matches!(self, QuoteMode::OptionalForRead | QuoteMode::OptionalForBoth)
    }

    fn always_on_write(&self) -> bool {
        matches!(self, QuoteMode::AlwaysQuoted | QuoteMode::OptionalForRead)
    }
}

/// Whether a quoted value may span physical lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultilineMode {
    #[default]
    AllowForBoth,
    AllowForRead,
    AllowForWrite,
    NotAllow,
}

impl MultilineMode {
    fn allows_read(&self) -> bool {
        matches!(self, MultilineMode::AllowForBoth | MultilineMode::AllowForRead)
    }

    fn allows_write(&self) -> bool {
        matches!(self, MultilineMode::AllowForBoth | MultilineMode::AllowForWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteSpec {
    pub quote: char,
    pub mode: QuoteMode,
    pub multiline: MultilineMode,
}

impl QuoteSpec {
    pub fn new(quote: char) -> Self {
        Self {
            quote,
            mode: QuoteMode::default(),
            multiline: MultilineMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedLayout {
    /// Never empty.
    pub delimiter: String,
    pub quote: Option<QuoteSpec>,
}

impl DelimitedLayout {
    pub(crate) fn extract(
        &self,
        field: &FieldDescriptor,
        cursor: &mut LineCursor<'_>,
    ) -> Result<ExtractedSpan, RecordError> {
        if field.optional && cursor.is_eol() {
            return Ok(ExtractedSpan::empty(cursor.line_number(), cursor.position()));
        }

        let Some(quote) = self.quote else {
            return self.extract_basic(field, cursor);
        };

        if matches!(field.conversion.trim, TrimMode::Both | TrimMode::Left) {
            cursor.skip_whitespace();
        }

        if cursor.current_char() == Some(quote.quote) {
            return self.extract_quoted(field, quote, cursor);
        }
        if quote.mode.optional_on_read() {
            return self.extract_basic(field, cursor);
        }

        let context = cursor.context(&field.name, cursor.remaining_text());
        if cursor.remaining_text().trim_start().starts_with(quote.quote) {
            Err(RecordError::quoting(
                context,
                format!(
                    "the field has spaces before the quote char '{}' (use a trim mode to allow them)",
                    quote.quote
                ),
            ))
        } else {
            Err(RecordError::quoting(
                context,
                format!("the field must start with the quote char '{}'", quote.quote),
            ))
        }
    }

    fn extract_basic(
        &self,
        field: &FieldDescriptor,
        cursor: &mut LineCursor<'_>,
    ) -> Result<ExtractedSpan, RecordError> {
        let from = cursor.position();
        let end = cursor.len();

        if field.is_last && !field.is_array() {
            if let Some(at) = cursor.find(&self.delimiter) {
                cursor.seek(at);
                return Err(RecordError::length(
                    cursor.context(&field.name, cursor.remaining_text()),
                    LengthViolation::ExtraDelimiter {
                        delimiter: self.delimiter.clone(),
                    },
                ));
            }
            let span = ExtractedSpan::raw(cursor, from, end);
            cursor.seek(end);
            return Ok(span);
        }

        match cursor.find(&self.delimiter) {
            Some(at) => {
                let span = ExtractedSpan::raw(cursor, from, at);
                cursor.seek(at + self.delimiter.chars().count());
                Ok(span)
            }
            None if field.is_last || field.next_is_optional => {
                let span = ExtractedSpan::raw(cursor, from, end);
                cursor.seek(end);
                Ok(span)
            }
            None => Err(RecordError::length(
                cursor.context(&field.name, cursor.remaining_text()),
                LengthViolation::MissingDelimiter {
                    delimiter: self.delimiter.clone(),
                },
            )),
        }
    }

    fn extract_quoted(
        &self,
        field: &FieldDescriptor,
        quote: QuoteSpec,
        cursor: &mut LineCursor<'_>,
    ) -> Result<ExtractedSpan, RecordError> {
        let line = cursor.line_number();
        let from = cursor.position();
        let opened = cursor.context(&field.name, cursor.remaining_text());
        cursor.advance(1);

        let mut text = String::new();
        loop {
            match cursor.current_char() {
                None => {
                    if quote.multiline.allows_read() && cursor.load_next() {
                        text.push('\n');
                        continue;
                    }
                    return Err(RecordError::quoting(
                        opened,
                        format!("the closing quote char '{}' was not found", quote.quote),
                    ));
                }
                Some(c) if c == quote.quote => {
                    cursor.advance(1);
                    if cursor.current_char() == Some(quote.quote) {
                        text.push(c);
                        cursor.advance(1);
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    text.push(c);
                    cursor.advance(1);
                }
            }
        }

        let to = cursor.position();
        cursor.skip_blanks();

        if cursor.starts_with(&self.delimiter) {
            if field.is_last && !field.is_array() {
                return Err(RecordError::length(
                    cursor.context(&field.name, cursor.remaining_text()),
                    LengthViolation::ExtraDelimiter {
                        delimiter: self.delimiter.clone(),
                    },
                ));
            }
            cursor.advance(self.delimiter.chars().count());
        } else if cursor.is_eol() {
            if !(field.is_last || field.next_is_optional) {
                return Err(RecordError::length(
                    cursor.context(&field.name, ""),
                    LengthViolation::MissingDelimiter {
                        delimiter: self.delimiter.clone(),
                    },
                ));
            }
        } else {
            return Err(RecordError::quoting(
                cursor.context(&field.name, cursor.remaining_text()),
                format!(
                    "the quoted field is not followed by the delimiter '{}'",
                    self.delimiter
                ),
            ));
        }

        Ok(ExtractedSpan {
            line,
            from,
            to,
            text,
            dequoted: true,
        })
    }

    pub(crate) fn render(
        &self,
        field: &FieldDescriptor,
        buf: &mut String,
        text: &str,
        is_last: bool,
    ) -> Result<(), RecordError> {
        let has_newline = text.contains(['\n', '\r']);

        match self.quote {
            None => buf.push_str(text),
            Some(quote) => {
                if has_newline && !quote.multiline.allows_write() {
                    return Err(RecordError::quoting(
                        ErrorContext::new(0, 0, &field.name, text),
                        "the value has a new line inside and multiline writing is not allowed",
                    ));
                }
                let needs_quotes = quote.mode.always_on_write()
                    || text.contains(quote.quote)
                    || text.contains(self.delimiter.as_str())
                    || has_newline;
                if needs_quotes {
                    buf.push(quote.quote);
                    for c in text.chars() {
                        if c == quote.quote {
                            buf.push(c);
                        }
                        buf.push(c);
                    }
                    buf.push(quote.quote);
                } else {
                    buf.push_str(text);
                }
            }
        }

        if !is_last {
            buf.push_str(&self.delimiter);
        }
        Ok(())
    }
}
