//! Error types for schema construction and record parsing/rendering.

use std::fmt;

use thiserror::Error;

use crate::value::ScalarKind;

/// Where in the input a record error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// 1-based physical line number.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    pub field: String,
    /// The raw text involved (the field text or the rest of the line).
    pub text: String,
}

impl ErrorContext {
    pub fn new(line: usize, column: usize, field: &str, text: impl Into<String>) -> Self {
        Self {
            line,
            column,
            field: field.to_string(),
            text: text.into(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Line: {} Column: {} Field: {}",
            self.line, self.column, self.field
        )
    }
}

/// The bound a `RecordError::Length` violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthViolation {
    /// The line ended before a required field.
    EndOfLine,
    /// Fewer characters than the field width.
    TooShort { found: usize, width: usize },
    /// More characters than the width of the last field.
    TooLong { found: usize, width: usize },
    ArrayTooShort { found: usize, min: usize },
    ArrayTooLong { max: usize },
    /// A null array was written to a field requiring elements.
    NullArray { min: usize },
    MissingDelimiter { delimiter: String },
    ExtraDelimiter { delimiter: String },
    /// Text left on the line before a field that starts on a new line.
    TextBeforeNewLine,
}

impl fmt::Display for LengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthViolation::EndOfLine => {
                write!(f, "end of line found (mark the field optional to allow this)")
            }
            LengthViolation::TooShort { found, width } => write!(
                f,
                "the text has {found} chars, less than the defined width of {width}"
            ),
            LengthViolation::TooLong { found, width } => write!(
                f,
                "the text has {found} chars, more than the defined width of the last field ({width})"
            ),
            LengthViolation::ArrayTooShort { found, min } => write!(
                f,
                "the array has only {found} values, less than the minimum length of {min}"
            ),
            LengthViolation::ArrayTooLong { max } => write!(
                f,
                "the array has more values than the maximum length of {max}"
            ),
            LengthViolation::NullArray { min } => {
                write!(f, "the array is null, but the minimum length is {min}")
            }
            LengthViolation::MissingDelimiter { delimiter } => write!(
                f,
                "delimiter '{delimiter}' not found after the field (the record has less fields or the next field must be optional)"
            ),
            LengthViolation::ExtraDelimiter { delimiter } => write!(
                f,
                "delimiter '{delimiter}' found after the last field"
            ),
            LengthViolation::TextBeforeNewLine => {
                write!(f, "text found before the new line of the field")
            }
        }
    }
}

/// Where a conversion failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOrigin {
    BuiltIn,
    Custom { converter: String },
}

/// A failure reported by a `Converter`, before positional context is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConvertError {
    pub message: String,
}

impl ConvertError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised while parsing or rendering one record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("{context}. {violation}")]
    Length {
        context: ErrorContext,
        violation: LengthViolation,
    },

    #[error("{context}. Error converting '{}' to type {target}: {message}", context.text)]
    Conversion {
        context: ErrorContext,
        target: ScalarKind,
        origin: ConversionOrigin,
        message: String,
    },

    #[error(
        "{context}. No value found for the field of type {kind}; configure a null value or declare it nullable"
    )]
    NullValue {
        context: ErrorContext,
        kind: ScalarKind,
    },

    #[error("{context}. End of input found before the field that starts on a new line")]
    EndOfInput { context: ErrorContext },

    #[error("{context}. {message}")]
    Quoting {
        context: ErrorContext,
        message: String,
    },

    #[error("{context}. The value is empty and must be populated")]
    EmptyValue { context: ErrorContext },
}

impl RecordError {
    pub fn context(&self) -> &ErrorContext {
        match self {
            RecordError::Length { context, .. }
            | RecordError::Conversion { context, .. }
            | RecordError::NullValue { context, .. }
            | RecordError::EndOfInput { context }
            | RecordError::Quoting { context, .. }
            | RecordError::EmptyValue { context } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            RecordError::Length { context, .. }
            | RecordError::Conversion { context, .. }
            | RecordError::NullValue { context, .. }
            | RecordError::EndOfInput { context }
            | RecordError::Quoting { context, .. }
            | RecordError::EmptyValue { context } => context,
        }
    }

    /// Attach an output line number to an error raised while rendering.
    pub fn at_line(mut self, line: usize) -> Self {
        let context = self.context_mut();
        if context.line == 0 {
            context.line = line;
        }
        self
    }

    /// A missing null value means the schema cannot describe the data at
    /// all, so collecting and continuing makes no sense.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecordError::NullValue { .. })
    }

    pub fn length(context: ErrorContext, violation: LengthViolation) -> Self {
        RecordError::Length { context, violation }
    }

    pub fn quoting(context: ErrorContext, message: impl Into<String>) -> Self {
        RecordError::Quoting {
            context,
            message: message.into(),
        }
    }
}

/// Errors raised while building a `RecordSchema`. These are schema defects,
/// never data defects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the record {record} does not contain any field")]
    NoFields { record: String },

    #[error("the field '{field}' must declare a fixed length because the record is fixed length")]
    MissingLength { field: String },

    #[error("the field '{field}' declares more than one layout (fixed length and delimiter)")]
    ConflictingLayout { field: String },

    #[error("the field '{field}' declares a fixed length, which is only valid for fixed length records")]
    LengthOnDelimited { field: String },

    #[error("the field '{field}' declares a delimiter, which is only valid for delimited records")]
    DelimiterOnFixed { field: String },

    #[error("the field '{field}' declares an alignment, which is only valid for fixed length records")]
    AlignOnDelimited { field: String },

    #[error("the field '{field}' is quoted, which is only valid for delimited records")]
    QuotedOnFixed { field: String },

    #[error("the field '{field}' declares an array length but is not an array")]
    ArrayLengthOnScalar { field: String },

    #[error("the field '{field}' has invalid array length bounds ({min}, {max})")]
    InvalidArrayLength {
        field: String,
        min: usize,
        max: usize,
    },

    #[error("the field '{field}' has width 0")]
    ZeroLength { field: String },

    #[error("the field '{field}' has an empty delimiter")]
    EmptyDelimiter { field: String },

    #[error("the field '{field}' must declare an order because other fields of the record do")]
    PartialOrder { field: String },

    #[error("the fields '{field}' and '{other}' share the order {order}")]
    DuplicateOrder {
        field: String,
        other: String,
        order: i32,
    },

    #[error("the field '{field}' must be optional because the previous field '{after}' is optional")]
    OptionalChain { field: String, after: String },

    #[error("the array field '{field}' is not the last field, so its min and max length must be equal")]
    VariableArrayNotLast { field: String },

    #[error("the converter {converter} of the field '{field}' produces {found}, expected {expected}")]
    ConverterKind {
        field: String,
        converter: String,
        expected: ScalarKind,
        found: ScalarKind,
    },

    #[error("the null value of the field '{field}' is not assignable to type {kind}")]
    NullValueKind { field: String, kind: ScalarKind },

    #[error("the field '{field}' of type {kind} is discarded and needs a null value or a nullable type")]
    DiscardedWithoutNull { field: String, kind: ScalarKind },
}
