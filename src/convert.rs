//! Conversion between extracted field text and typed values.
//!
//! Every field owns a `Conversion`: the element kind plus the trim, not-empty,
//! null-value, and converter settings that decide how text becomes a
//! `Value` (and back).

use std::fmt;
use std::sync::Arc;

use crate::error::{ConversionOrigin, ConvertError, ErrorContext, RecordError};
use crate::value::{ScalarKind, Value};

/// Whitespace trimming applied to extracted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrimMode {
    #[default]
    None,
    Both,
    Left,
    Right,
}

impl TrimMode {
    pub fn apply<'a>(&self, text: &'a str) -> &'a str {
        match self {
            TrimMode::None => text,
            TrimMode::Both => text.trim(),
            TrimMode::Left => text.trim_start(),
            TrimMode::Right => text.trim_end(),
        }
    }
}

/// Pluggable text to value mapping for one element kind.
pub trait Converter: fmt::Debug + Send + Sync {
    /// Name used in error reports.
    fn name(&self) -> &str;

    /// The kind of value this converter produces.
    fn kind(&self) -> ScalarKind;

    /// When true, empty text is handed to `from_text` instead of going
    /// straight to the field's null value.
    fn custom_null_handling(&self) -> bool {
        false
    }

    /// Converters shipped with this crate report failures as built-in ones.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Parse text; `Ok(Value::Null)` means "no value".
    fn from_text(&self, text: &str) -> Result<Value, ConvertError>;

    fn to_text(&self, value: &Value) -> String {
        value.to_string()
    }

    /// Name plus settings. Two conversions are equal only when their
    /// converters describe themselves the same way.
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Result of converting one span of text.
#[derive(Debug, Clone, PartialEq)]
pub enum Assigned {
    Converted(Value),
    /// The text was empty (or converted to nothing) and the null value was used.
    SubstitutedNull(Value),
}

impl Assigned {
    pub fn into_value(self) -> Value {
        match self {
            Assigned::Converted(v) | Assigned::SubstitutedNull(v) => v,
        }
    }

    pub fn is_substituted_null(&self) -> bool {
        matches!(self, Assigned::SubstitutedNull(_))
    }
}

/// Per-field conversion settings.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub kind: ScalarKind,
    pub nullable: bool,
    pub trim: TrimMode,
    pub not_empty: bool,
    pub null_value: Option<Value>,
    pub converter: Option<Arc<dyn Converter>>,
}

impl PartialEq for Conversion {
    fn eq(&self, other: &Self) -> bool {
        let same_converter = match (&self.converter, &other.converter) {
            (None, None) => true,
            (Some(a), Some(b)) => a.kind() == b.kind() && a.describe() == b.describe(),
            _ => false,
        };
        self.kind == other.kind
            && self.nullable == other.nullable
            && self.trim == other.trim
            && self.not_empty == other.not_empty
            && self.null_value == other.null_value
            && same_converter
    }
}

impl Conversion {
    pub fn new(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
            trim: TrimMode::None,
            not_empty: false,
            null_value: None,
            converter: None,
        }
    }

    /// Whether "no value" is representable without a configured null value.
    pub fn accepts_absence(&self) -> bool {
        self.kind.is_reference() || self.nullable
    }

    /// Convert extracted text. `context` carries the field name, line and
    /// the span's 1-based column; its text is filled in here.
    pub fn assign(&self, text: &str, context: ErrorContext) -> Result<Assigned, RecordError> {
        let context = ErrorContext {
            text: text.to_string(),
            ..context
        };

        if self.not_empty && text.is_empty() {
            return Err(RecordError::EmptyValue { context });
        }

        let Some(converter) = &self.converter else {
            if self.kind == ScalarKind::Text {
                return Ok(Assigned::Converted(Value::Text(
                    self.trim.apply(text).to_string(),
                )));
            }
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return self.null_value(context).map(Assigned::SubstitutedNull);
            }
            return self
                .kind
                .coerce(trimmed)
                .map(Assigned::Converted)
                .map_err(|message| RecordError::Conversion {
                    context,
                    target: self.kind,
                    origin: ConversionOrigin::BuiltIn,
                    message,
                });
        };

        if !converter.custom_null_handling() && text.trim().is_empty() {
            return self.null_value(context).map(Assigned::SubstitutedNull);
        }

        match converter.from_text(self.trim.apply(text)) {
            Ok(Value::Null) => self.null_value(context).map(Assigned::SubstitutedNull),
            Ok(value) => Ok(Assigned::Converted(value)),
            Err(e) => {
                let origin = if converter.is_builtin() {
                    ConversionOrigin::BuiltIn
                } else {
                    ConversionOrigin::Custom {
                        converter: converter.name().to_string(),
                    }
                };
                let message = match &origin {
                    ConversionOrigin::BuiltIn => e.message,
                    ConversionOrigin::Custom { converter } => {
                        format!("custom converter {converter} failed: {}", e.message)
                    }
                };
                Err(RecordError::Conversion {
                    context,
                    target: self.kind,
                    origin,
                    message,
                })
            }
        }
    }

    /// The value used when the input has none.
    pub fn null_value(&self, context: ErrorContext) -> Result<Value, RecordError> {
        if let Some(v) = &self.null_value {
            return Ok(v.clone());
        }
        if self.accepts_absence() {
            return Ok(Value::Null);
        }
        Err(RecordError::NullValue {
            context,
            kind: self.kind,
        })
    }

    /// Text representation of one element for writing.
    pub fn to_text(&self, value: &Value, context: ErrorContext) -> Result<String, RecordError> {
        let value = match value {
            Value::Null => match &self.null_value {
                Some(v) => v,
                None if self.accepts_absence() => return Ok(String::new()),
                None => {
                    return Err(RecordError::NullValue {
                        context,
                        kind: self.kind,
                    });
                }
            },
            v => v,
        };

        if let Some(converter) = &self.converter {
            return Ok(converter.to_text(value));
        }

        if !value.kind_matches(self.kind) {
            // Coerce foreign values through their text form.
            let text = value.to_string();
            let coerced = self.kind.coerce(text.trim()).map_err(|message| {
                RecordError::Conversion {
                    context: ErrorContext { text, ..context },
                    target: self.kind,
                    origin: ConversionOrigin::BuiltIn,
                    message,
                }
            })?;
            return Ok(self.format(&coerced));
        }
        Ok(self.format(value))
    }

    fn format(&self, value: &Value) -> String {
        match (value, self.kind) {
            (Value::Float(v), ScalarKind::F32) => (*v as f32).to_string(),
            (v, _) => v.to_string(),
        }
    }
}

/// Maps text onto one of a fixed set of names, ignoring case.
#[derive(Debug, Clone)]
pub struct EnumConverter {
    name: String,
    variants: Vec<String>,
}

impl EnumConverter {
    pub fn new<I, S>(name: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}

impl Converter for EnumConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ScalarKind {
        ScalarKind::Text
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn from_text(&self, text: &str) -> Result<Value, ConvertError> {
        let wanted = text.trim();
        self.variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(wanted))
            .map(|v| Value::Text(v.clone()))
            .ok_or_else(|| {
                ConvertError::new(format!(
                    "the value {wanted} is not present in the enum {}",
                    self.name
                ))
            })
    }

    fn describe(&self) -> String {
        format!("{}({})", self.name, self.variants.join(","))
    }
}

/// Booleans spelled with custom words, e.g. `Y`/`N`.
#[derive(Debug, Clone)]
pub struct BoolConverter {
    true_text: String,
    false_text: String,
}

impl BoolConverter {
    pub fn new(true_text: &str, false_text: &str) -> Self {
        Self {
            true_text: true_text.to_string(),
            false_text: false_text.to_string(),
        }
    }
}

impl Converter for BoolConverter {
    fn name(&self) -> &str {
        "BoolConverter"
    }

    fn kind(&self) -> ScalarKind {
        ScalarKind::Bool
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn from_text(&self, text: &str) -> Result<Value, ConvertError> {
        let text = text.trim();
        if text.eq_ignore_ascii_case(&self.true_text) {
            Ok(Value::Bool(true))
        } else if text.eq_ignore_ascii_case(&self.false_text) {
            Ok(Value::Bool(false))
        } else {
            Err(ConvertError::new(format!(
                "expected {} or {}",
                self.true_text, self.false_text
            )))
        }
    }

    fn to_text(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => self.true_text.clone(),
            Value::Bool(false) => self.false_text.clone(),
            other => other.to_string(),
        }
    }

    fn describe(&self) -> String {
        format!("BoolConverter({}/{})", self.true_text, self.false_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ErrorContext {
        ErrorContext::new(7, 12, "amount", "")
    }

    #[derive(Debug)]
    struct Percent;

    impl Converter for Percent {
        fn name(&self) -> &str {
            "Percent"
        }

        fn kind(&self) -> ScalarKind {
            ScalarKind::F64
        }

        fn from_text(&self, text: &str) -> Result<Value, ConvertError> {
            let digits = text
                .strip_suffix('%')
                .ok_or_else(|| ConvertError::new("missing %"))?;
            digits
                .parse::<f64>()
                .map(|v| Value::Float(v / 100.0))
                .map_err(|e| ConvertError::new(e.to_string()))
        }
    }

    #[derive(Debug)]
    struct DashIsNothing;

    impl Converter for DashIsNothing {
        fn name(&self) -> &str {
            "DashIsNothing"
        }

        fn kind(&self) -> ScalarKind {
            ScalarKind::I32
        }

        fn custom_null_handling(&self) -> bool {
            true
        }

        fn from_text(&self, text: &str) -> Result<Value, ConvertError> {
            match text {
                "" => Ok(Value::Int(-1)),
                "-" => Ok(Value::Null),
                t => t
                    .parse::<i32>()
                    .map(|v| Value::Int(v.into()))
                    .map_err(|e| ConvertError::new(e.to_string())),
            }
        }
    }

    #[test]
    fn test_text_field_keeps_whitespace_without_trim() {
        let conv = Conversion::new(ScalarKind::Text);
        let out = conv.assign("  ab ", ctx()).unwrap();
        assert_eq!(out, Assigned::Converted(Value::Text("  ab ".into())));
    }

    #[test]
    fn test_text_field_trim_modes() {
        let mut conv = Conversion::new(ScalarKind::Text);
        conv.trim = TrimMode::Left;
        assert_eq!(
            conv.assign("  ab ", ctx()).unwrap().into_value(),
            Value::Text("ab ".into())
        );
        conv.trim = TrimMode::Right;
        assert_eq!(
            conv.assign("  ab ", ctx()).unwrap().into_value(),
            Value::Text("  ab".into())
        );
    }

    #[test]
    fn test_numeric_trims_and_coerces() {
        let conv = Conversion::new(ScalarKind::I32);
        assert_eq!(
            conv.assign("   42", ctx()).unwrap(),
            Assigned::Converted(Value::Int(42))
        );
    }

    #[test]
    fn test_empty_numeric_without_null_value_fails() {
        let conv = Conversion::new(ScalarKind::I32);
        let err = conv.assign("    ", ctx()).unwrap_err();
        match err {
            RecordError::NullValue { context, kind } => {
                assert_eq!(context.field, "amount");
                assert_eq!(kind, ScalarKind::I32);
            }
            other => panic!("Expected NullValue, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_numeric_uses_null_value_or_nullable() {
        let mut conv = Conversion::new(ScalarKind::I32);
        conv.null_value = Some(Value::Int(0));
        assert_eq!(
            conv.assign("", ctx()).unwrap(),
            Assigned::SubstitutedNull(Value::Int(0))
        );

        let mut conv = Conversion::new(ScalarKind::I32);
        conv.nullable = true;
        assert_eq!(
            conv.assign("", ctx()).unwrap(),
            Assigned::SubstitutedNull(Value::Null)
        );
    }

    #[test]
    fn test_not_empty_rejects_empty_text() {
        let mut conv = Conversion::new(ScalarKind::Text);
        conv.not_empty = true;
        assert!(matches!(
            conv.assign("", ctx()),
            Err(RecordError::EmptyValue { .. })
        ));
    }

    #[test]
    fn test_builtin_conversion_error_has_context() {
        let conv = Conversion::new(ScalarKind::U8);
        let err = conv.assign("300", ctx()).unwrap_err();
        match err {
            RecordError::Conversion {
                context,
                target,
                origin,
                ..
            } => {
                assert_eq!(context.line, 7);
                assert_eq!(context.column, 12);
                assert_eq!(context.text, "300");
                assert_eq!(target, ScalarKind::U8);
                assert_eq!(origin, ConversionOrigin::BuiltIn);
            }
            other => panic!("Expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_converter_failure_names_converter() {
        let mut conv = Conversion::new(ScalarKind::F64);
        conv.converter = Some(Arc::new(Percent));
        assert_eq!(
            conv.assign("25%", ctx()).unwrap().into_value(),
            Value::Float(0.25)
        );
        let err = conv.assign("25", ctx()).unwrap_err();
        match err {
            RecordError::Conversion {
                origin, message, ..
            } => {
                assert_eq!(
                    origin,
                    ConversionOrigin::Custom {
                        converter: "Percent".to_string()
                    }
                );
                assert!(message.contains("missing %"), "Got: {message}");
            }
            other => panic!("Expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_null_handling_sees_empty_text() {
        let mut conv = Conversion::new(ScalarKind::I32);
        conv.converter = Some(Arc::new(DashIsNothing));
        conv.trim = TrimMode::Both;
        assert_eq!(
            conv.assign("   ", ctx()).unwrap(),
            Assigned::Converted(Value::Int(-1))
        );
        // A converter answering "nothing" still goes through the null policy.
        assert!(matches!(
            conv.assign(" - ", ctx()),
            Err(RecordError::NullValue { .. })
        ));
    }

    #[test]
    fn test_enum_converter() {
        let mut conv = Conversion::new(ScalarKind::Text);
        conv.converter = Some(Arc::new(EnumConverter::new(
            "Dept",
            ["Sales", "Engineer"],
        )));
        assert_eq!(
            conv.assign(" SALES ", ctx()).unwrap().into_value(),
            Value::Text("Sales".into())
        );
        let err = conv.assign("Legal", ctx()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Conversion {
                origin: ConversionOrigin::BuiltIn,
                ..
            }
        ));
    }

    #[test]
    fn test_conversions_compare_converter_settings() {
        let with = |converter: EnumConverter| Conversion {
            converter: Some(Arc::new(converter)),
            ..Conversion::new(ScalarKind::Text)
        };
        let rgb = with(EnumConverter::new("color", ["red", "green", "blue"]));
        assert_eq!(rgb, with(EnumConverter::new("color", ["red", "green", "blue"])));
        assert_ne!(rgb, with(EnumConverter::new("color", ["cyan", "magenta"])));
        assert_ne!(rgb, Conversion::new(ScalarKind::Text));

        let yes_no = Conversion {
            converter: Some(Arc::new(BoolConverter::new("Y", "N"))),
            ..Conversion::new(ScalarKind::Bool)
        };
        let one_zero = Conversion {
            converter: Some(Arc::new(BoolConverter::new("1", "0"))),
            ..Conversion::new(ScalarKind::Bool)
        };
        assert_ne!(yes_no, one_zero);
    }

    #[test]
    fn test_bool_converter_round_trip() {
        let conv = BoolConverter::new("Y", "N");
        assert_eq!(conv.from_text("y").unwrap(), Value::Bool(true));
        assert_eq!(conv.to_text(&Value::Bool(false)), "N");
        assert!(conv.from_text("maybe").is_err());
    }

    #[test]
    fn test_to_text_null_handling() {
        let conv = Conversion::new(ScalarKind::I64);
        assert!(matches!(
            conv.to_text(&Value::Null, ctx()),
            Err(RecordError::NullValue { .. })
        ));

        let mut conv = Conversion::new(ScalarKind::I64);
        conv.null_value = Some(Value::Int(0));
        assert_eq!(conv.to_text(&Value::Null, ctx()).unwrap(), "0");

        let conv = Conversion::new(ScalarKind::Text);
        assert_eq!(conv.to_text(&Value::Null, ctx()).unwrap(), "");
    }

    #[test]
    fn test_to_text_coerces_foreign_values() {
        let conv = Conversion::new(ScalarKind::I32);
        assert_eq!(
            conv.to_text(&Value::Text(" 17 ".into()), ctx()).unwrap(),
            "17"
        );
        assert!(conv.to_text(&Value::Text("x".into()), ctx()).is_err());
    }
}
