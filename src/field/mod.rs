//! Field descriptors: how one field is located in a line and written back.
//!
//! A descriptor pairs a layout (`FieldLayout::Fixed` or
//! `FieldLayout::Delimited`) with the field's `Conversion`. The layout
//! finds the field's text (`extract_span`) and writes it (`render_into`);
//! `extract_value` and `render_value` add new-line handling, array
//! repetition, and conversion on top.

pub mod delimited;
pub mod fixed;

use tracing::trace;

use crate::convert::{Assigned, Conversion};
use crate::cursor::LineCursor;
use crate::error::{ErrorContext, LengthViolation, RecordError};
use crate::value::Value;

pub use delimited::{DelimitedLayout, MultilineMode, QuoteMode, QuoteSpec};
pub use fixed::{AlignMode, Alignment, FixedLayout, FixedMode};

/// Bounds on the number of elements of an array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySpec {
    pub min: usize,
    pub max: usize,
}

impl ArraySpec {
    /// No declared bounds.
    pub const UNBOUNDED: ArraySpec = ArraySpec {
        min: 0,
        max: usize::MAX,
    };

    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Exactly `min` elements, so later fields start at a known offset.
    pub fn is_fixed_count(&self) -> bool {
        self.min == self.max
    }
}

impl Default for ArraySpec {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Text located for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSpan {
    /// Line the span starts on.
    pub line: usize,
    /// Start offset in that line.
    pub from: usize,
    /// End offset (exclusive); for multi-line quoted values this is an
    /// offset in the last line read.
    pub to: usize,
    /// The field text. Differs from the raw characters when quotes were removed.
    pub text: String,
    pub dequoted: bool,
}

impl ExtractedSpan {
    pub fn empty(line: usize, at: usize) -> Self {
        Self {
            line,
            from: at,
            to: at,
            text: String::new(),
            dequoted: false,
        }
    }

    pub(crate) fn raw(cursor: &LineCursor<'_>, from: usize, to: usize) -> Self {
        Self {
            line: cursor.line_number(),
            from,
            to,
            text: cursor.slice(from, to),
            dequoted: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Layout strategy of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldLayout {
    Fixed(FixedLayout),
    Delimited(DelimitedLayout),
}

/// Everything needed to read and write one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Output name; defaults to `name`.
    pub friendly_name: String,
    /// Header caption, if any.
    pub caption: Option<String>,
    /// Position in the resolved field order.
    pub index: usize,
    pub order: Option<i32>,
    pub layout: FieldLayout,
    pub conversion: Conversion,
    pub array: Option<ArraySpec>,
    pub optional: bool,
    pub in_new_line: bool,
    /// Read but not stored: the value is always the null value.
    pub discarded: bool,
    pub is_last: bool,
    pub next_is_optional: bool,
}

impl FieldDescriptor {
    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Locate this field's text at the cursor and move past it.
    pub fn extract_span(&self, cursor: &mut LineCursor<'_>) -> Result<ExtractedSpan, RecordError> {
        let span = match &self.layout {
            FieldLayout::Fixed(layout) => layout.extract(self, cursor)?,
            FieldLayout::Delimited(layout) => layout.extract(self, cursor)?,
        };
        trace!(
            field = %self.name,
            line = span.line,
            from = span.from,
            to = span.to,
            "extracted field text"
        );
        Ok(span)
    }

    /// Append the text of one element to `buf`.
    pub fn render_into(
        &self,
        buf: &mut String,
        value: &Value,
        is_last: bool,
    ) -> Result<(), RecordError> {
        let text = self.conversion.to_text(value, self.render_context())?;
        match &self.layout {
            FieldLayout::Fixed(layout) => {
                layout.render(buf, &text);
                Ok(())
            }
            FieldLayout::Delimited(layout) => layout.render(self, buf, &text, is_last),
        }
    }

    /// Read this field's value from the cursor.
    pub fn extract_value(&self, cursor: &mut LineCursor<'_>) -> Result<Value, RecordError> {
        if self.in_new_line {
            cursor.reload(&self.name)?;
        }

        let Some(spec) = self.array else {
            let span = self.extract_span(cursor)?;
            let context = self.span_context(&span);
            if self.discarded {
                return self.conversion.null_value(context);
            }
            return self
                .conversion
                .assign(&span.text, context)
                .map(Assigned::into_value);
        };

        let mut values = Vec::with_capacity(spec.min.min(16));
        while !cursor.is_eol() && values.len() < spec.max {
            let span = self.extract_span(cursor)?;
            match self.conversion.assign(&span.text, self.span_context(&span)) {
                Ok(assigned) => {
                    if values.is_empty() && assigned.is_substituted_null() && cursor.is_eol() {
                        break;
                    }
                    values.push(assigned.into_value());
                }
                Err(RecordError::NullValue { .. }) if values.is_empty() => break,
                Err(e) => return Err(e),
            }
        }

        if values.len() < spec.min {
            return Err(RecordError::length(
                cursor.context(&self.name, cursor.remaining_text()),
                LengthViolation::ArrayTooShort {
                    found: values.len(),
                    min: spec.min,
                },
            ));
        }
        if self.is_last && !cursor.is_eol() {
            return Err(RecordError::length(
                cursor.context(&self.name, cursor.remaining_text()),
                LengthViolation::ArrayTooLong { max: spec.max },
            ));
        }

        if self.discarded {
            return Ok(Value::Null);
        }
        Ok(Value::Array(values))
    }

    /// Append this field's value to an output line.
    pub fn render_value(&self, buf: &mut String, value: &Value) -> Result<(), RecordError> {
        if self.in_new_line {
            buf.push('\n');
        }

        let Some(spec) = self.array else {
            return self.render_into(buf, value, self.is_last);
        };

        let items: &[Value] = match value {
            Value::Null => {
                if spec.min > 0 {
                    return Err(RecordError::length(
                        self.render_context(),
                        LengthViolation::NullArray { min: spec.min },
                    ));
                }
                return Ok(());
            }
            Value::Array(items) => items,
            single => std::slice::from_ref(single),
        };

        if items.len() < spec.min {
            return Err(RecordError::length(
                self.render_context(),
                LengthViolation::ArrayTooShort {
                    found: items.len(),
                    min: spec.min,
                },
            ));
        }
        if items.len() > spec.max {
            return Err(RecordError::length(
                self.render_context(),
                LengthViolation::ArrayTooLong { max: spec.max },
            ));
        }

        let last = items.len().saturating_sub(1);
        for (i, item) in items.iter().enumerate() {
            self.render_into(buf, item, self.is_last && i == last)?;
        }
        Ok(())
    }

    fn span_context(&self, span: &ExtractedSpan) -> ErrorContext {
        ErrorContext::new(span.line, span.from + 1, &self.name, span.text.as_str())
    }

    /// Rendering has no input position; the engine fills the line in.
    fn render_context(&self) -> ErrorContext {
        ErrorContext::new(0, 0, &self.name, "")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cursor::{LineSource, NoMoreLines, TextLines};
    use crate::value::ScalarKind;

    pub(crate) fn fixed_field(name: &str, kind: ScalarKind, width: usize) -> FieldDescriptor {
        let align = if kind.is_numeric() {
            Alignment::new(AlignMode::Right, ' ')
        } else {
            Alignment::new(AlignMode::Left, ' ')
        };
        FieldDescriptor {
            name: name.to_string(),
            friendly_name: name.to_string(),
            caption: None,
            index: 0,
            order: None,
            layout: FieldLayout::Fixed(FixedLayout {
                width,
                align,
                mode: FixedMode::ExactLength,
            }),
            conversion: Conversion::new(kind),
            array: None,
            optional: false,
            in_new_line: false,
            discarded: false,
            is_last: false,
            next_is_optional: false,
        }
    }

    pub(crate) fn delimited_field(name: &str, kind: ScalarKind, delimiter: &str) -> FieldDescriptor {
        FieldDescriptor {
            layout: FieldLayout::Delimited(DelimitedLayout {
                delimiter: delimiter.to_string(),
                quote: None,
            }),
            ..fixed_field(name, kind, 1)
        }
    }

    #[test]
    fn test_array_stops_at_max_and_parses_elements() {
        let mut field = fixed_field("scores", ScalarKind::I32, 3);
        field.array = Some(ArraySpec::new(0, 2));
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("  1 22333", 1, &mut src);
        let value = field.extract_value(&mut cursor).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(22)]));
        assert_eq!(cursor.remaining_text(), "333");
    }

    #[test]
    fn test_array_below_min_reports_found_and_min() {
        let mut field = delimited_field("tags", ScalarKind::Text, ",");
        field.array = Some(ArraySpec::new(2, 4));
        field.is_last = true;
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("only", 4, &mut src);
        let err = field.extract_value(&mut cursor).unwrap_err();
        match err {
            RecordError::Length { context, violation } => {
                assert_eq!(violation, LengthViolation::ArrayTooShort { found: 1, min: 2 });
                assert_eq!(context.field, "tags");
                assert_eq!(context.line, 4);
            }
            other => panic!("Expected Length, got {other:?}"),
        }
    }

    #[test]
    fn test_last_array_with_leftover_text_fails() {
        let mut field = fixed_field("codes", ScalarKind::Text, 2);
        field.array = Some(ArraySpec::new(0, 2));
        field.is_last = true;
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("AABBCC", 1, &mut src);
        let err = field.extract_value(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Length {
                violation: LengthViolation::ArrayTooLong { max: 2 },
                ..
            }
        ));
    }

    #[test]
    fn test_array_empty_first_element_yields_empty_array() {
        let mut field = delimited_field("amounts", ScalarKind::I32, ",");
        field.array = Some(ArraySpec::UNBOUNDED);
        field.is_last = true;
        field.conversion.nullable = true;
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new(" ", 1, &mut src);
        let value = field.extract_value(&mut cursor).unwrap();
        assert_eq!(value, Value::Array(vec![]));
    }

    #[test]
    fn test_array_first_null_without_null_value_tolerated() {
        let mut field = delimited_field("amounts", ScalarKind::I32, ",");
        field.array = Some(ArraySpec::UNBOUNDED);
        field.is_last = true;
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("   ", 1, &mut src);
        assert_eq!(
            field.extract_value(&mut cursor).unwrap(),
            Value::Array(vec![])
        );
    }

    #[test]
    fn test_in_new_line_field_reads_next_line() {
        let mut field = delimited_field("notes", ScalarKind::Text, ",");
        field.in_new_line = true;
        field.is_last = true;
        let mut src = TextLines::new("header\nsecond line");
        let first = src.next_line().unwrap();
        let mut cursor = LineCursor::new(&first, 1, &mut src);
        cursor.advance(6);
        let value = field.extract_value(&mut cursor).unwrap();
        assert_eq!(value, Value::Text("second line".into()));
        assert_eq!(cursor.line_number(), 2);
    }

    #[test]
    fn test_discarded_field_yields_null_value() {
        let mut field = fixed_field("filler", ScalarKind::Text, 4);
        field.discarded = true;
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("XXXXrest", 1, &mut src);
        assert_eq!(field.extract_value(&mut cursor).unwrap(), Value::Null);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_conversion_error_column_is_span_start() {
        let field = fixed_field("age", ScalarKind::U8, 3);
        let mut src = NoMoreLines;
        let mut cursor = LineCursor::new("abcxyz", 2, &mut src);
        cursor.advance(3);
        let err = field.extract_value(&mut cursor).unwrap_err();
        assert_eq!(err.context().column, 4);
        assert_eq!(err.context().line, 2);
        assert_eq!(err.context().text, "xyz");
    }

    #[test]
    fn test_render_array_bounds() {
        let mut field = fixed_field("codes", ScalarKind::Text, 2);
        field.array = Some(ArraySpec::new(1, 2));
        let mut buf = String::new();
        assert!(matches!(
            field.render_value(&mut buf, &Value::Null),
            Err(RecordError::Length {
                violation: LengthViolation::NullArray { min: 1 },
                ..
            })
        ));
        let three = Value::Array(vec!["a".into(), "b".into(), "c".into()]);
        assert!(field.render_value(&mut buf, &three).is_err());
        field
            .render_value(&mut buf, &Value::Array(vec!["a".into(), "b".into()]))
            .unwrap();
        assert_eq!(buf, "a b ");
    }

    #[test]
    fn test_render_in_new_line_prefixes_newline() {
        let mut field = delimited_field("notes", ScalarKind::Text, ",");
        field.in_new_line = true;
        field.is_last = true;
        let mut buf = String::from("a,");
        field.render_value(&mut buf, &"hello".into()).unwrap();
        assert_eq!(buf, "a,\nhello");
    }
}
