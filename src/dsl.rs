//! Schema description language.
//!
//! Layout file format:
//! ```text
//! # Employee master, one record per line
//! RECORD employee FIXED EXACT
//! FIELD last   TEXT  LENGTH 8
//! FIELD first  TEXT  LENGTH 10
//! FIELD dept   TEXT  LENGTH 10 ENUM SALES,ENGINEER,ADMIN
//! FIELD salary U32   LENGTH 8 ALIGN RIGHT /0/
//! ```
//!
//! - `RECORD <name> FIXED [EXACT|MORE|LESS|VARIABLE]` or
//!   `RECORD <name> DELIMITED /<delimiter>/` comes first, exactly once
//! - `FIELD <name> <KIND>[?][[]] <directive>...` declares the next field;
//!   `?` makes a value kind nullable, `[]` makes the field an array
//! - Kinds: `TEXT` (or `STRING`), `CHAR`, `BOOL`, `I8`..`I64`, `U8`..`U64`, `F32`, `F64`
//! - Keywords are case-insensitive; lines starting with `#` are comments
//! - Strings use the first non-blank character as delimiter: `/,/`, `"|"`, `.x.`
//!
//! Field directives:
//! - `LENGTH n` - fixed width
//! - `DELIM /s/` - own delimiter (otherwise the record's)
//! - `ALIGN LEFT|RIGHT|CENTER [/c/]` - alignment and pad character
//! - `ORDER n` - explicit position
//! - `QUOTED [/c/] [ALWAYS|OPTIONAL|OPTIONAL_READ|OPTIONAL_WRITE] [MULTILINE|MULTILINE_READ|MULTILINE_WRITE|SINGLELINE]`;
//!   a mode word right after `QUOTED` belongs to it, so put the field's
//!   own `OPTIONAL` before `QUOTED`
//! - `ARRAY min,max` - element count bounds; `*` as max means unbounded
//! - `NULL /v/` - value used when the text is empty
//! - `TRIM NONE|BOTH|LEFT|RIGHT`
//! - `OPTIONAL`, `NOTEMPTY`, `NEWLINE`, `DISCARD`
//! - `CAPTION /c/` - header title, `AS /n/` - friendly name
//! - `ENUM a,b,c` - accept only these names (case-insensitive)
//! - `BOOLS /t/ /f/` - booleans spelled with custom words

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::convert::{BoolConverter, EnumConverter, TrimMode};
use crate::error::ConfigError;
use crate::field::{AlignMode, Alignment, FixedMode, MultilineMode, QuoteMode, QuoteSpec};
use crate::schema::{build_schema, FieldMeta, RecordLayout, RecordSchema, SchemaDescription};
use crate::value::{ScalarKind, Value};

/// Errors reading a layout description.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("the layout does not contain a RECORD statement")]
    MissingRecord,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read layout file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse layout text into a schema description.
pub fn parse_description(text: &str) -> Result<SchemaDescription, DslError> {
    let mut desc: Option<SchemaDescription> = None;

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let syntax = |message: String| DslError::Syntax {
            line: line_num + 1,
            message,
        };

        let mut words = Words::new(line);
        let keyword = words.next().unwrap_or_default().to_uppercase();
        match keyword.as_str() {
            "RECORD" => {
                if desc.is_some() {
                    return Err(syntax("only one RECORD statement is allowed".to_string()));
                }
                desc = Some(parse_record(&mut words).map_err(syntax)?);
            }
            "FIELD" => {
                let Some(record) = desc.as_mut() else {
                    return Err(syntax("FIELD found before the RECORD statement".to_string()));
                };
                record.fields.push(parse_field(&mut words).map_err(syntax)?);
            }
            _ => {
                return Err(syntax(format!(
                    "Unknown statement: {}",
                    line.split_whitespace().next().unwrap_or(line)
                )));
            }
        }
    }

    let desc = desc.ok_or(DslError::MissingRecord)?;
    debug!(
        record = %desc.record_name,
        fields = desc.fields.len(),
        "parsed layout description"
    );
    Ok(desc)
}

/// Parse layout text and build its schema.
pub fn load_schema(text: &str) -> Result<RecordSchema, DslError> {
    let desc = parse_description(text)?;
    Ok(build_schema(&desc)?)
}

/// Read a layout file and build its schema.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<RecordSchema, DslError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| DslError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_schema(&text)
}

/// Parse the rest of a RECORD statement.
fn parse_record(words: &mut Words<'_>) -> Result<SchemaDescription, String> {
    let name = words.expect("record name")?;
    let kind = words.expect("FIXED or DELIMITED")?.to_uppercase();

    let layout = match kind.as_str() {
        "FIXED" => {
            let mode = match words.next().map(str::to_uppercase).as_deref() {
                None | Some("EXACT") => FixedMode::ExactLength,
                Some("MORE") => FixedMode::AllowMoreChars,
                Some("LESS") => FixedMode::AllowLessChars,
                Some("VARIABLE") => FixedMode::AllowVariableLength,
                Some(other) => return Err(format!("Unknown fixed mode: {other}")),
            };
            RecordLayout::Fixed { mode }
        }
        "DELIMITED" => RecordLayout::Delimited {
            delimiter: words.delimited()?,
        },
        other => return Err(format!("Unknown record layout: {other}")),
    };

    words.finish()?;
    Ok(SchemaDescription::new(name, layout))
}

/// Parse the rest of a FIELD statement.
fn parse_field(words: &mut Words<'_>) -> Result<FieldMeta, String> {
    let name = words.expect("field name")?;
    let mut meta = parse_kind(name, words.expect("field kind")?)?;

    while let Some(word) = words.next() {
        match word.to_uppercase().as_str() {
            "LENGTH" => meta = meta.fixed_length(words.number("LENGTH")?),
            "DELIM" => meta = meta.delimiter(&words.delimited()?),
            "ALIGN" => {
                let mode = match words.expect("LEFT, RIGHT or CENTER")?.to_uppercase().as_str() {
                    "LEFT" => AlignMode::Left,
                    "RIGHT" => AlignMode::Right,
                    "CENTER" => AlignMode::Center,
                    other => return Err(format!("Unknown alignment: {other}")),
                };
                let pad = if words.at_delimited() {
                    single_char(&words.delimited()?, "ALIGN pad")?
                } else {
                    ' '
                };
                meta.align = Some(Alignment::new(mode, pad));
            }
            "ORDER" => meta = meta.order(words.number("ORDER")?),
            "QUOTED" => meta.quote = Some(parse_quoted(words)?),
            "ARRAY" => {
                let bounds = words.expect("min,max")?;
                let (min, max) = bounds
                    .split_once(',')
                    .ok_or_else(|| format!("ARRAY requires min,max, found '{bounds}'"))?;
                let min: usize = min
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid ARRAY minimum in '{bounds}'"))?;
                let max: usize = match max.trim() {
                    "*" => usize::MAX,
                    max => max
                        .parse()
                        .map_err(|_| format!("Invalid ARRAY maximum in '{bounds}'"))?,
                };
                meta = meta.array_length(min, max);
            }
            "NULL" => {
                let text = words.delimited()?;
                let value = match meta.kind {
                    ScalarKind::Text => Value::Text(text),
                    kind => kind
                        .coerce(text.trim())
                        .map_err(|e| format!("NULL value '{text}' is not a valid {kind}: {e}"))?,
                };
                meta.null_value = Some(value);
            }
            "TRIM" => {
                meta.trim = match words.expect("NONE, BOTH, LEFT or RIGHT")?.to_uppercase().as_str()
                {
                    "NONE" => TrimMode::None,
                    "BOTH" => TrimMode::Both,
                    "LEFT" => TrimMode::Left,
                    "RIGHT" => TrimMode::Right,
                    other => return Err(format!("Unknown trim mode: {other}")),
                };
            }
            "OPTIONAL" => meta.optional = true,
            "NOTEMPTY" => meta.not_empty = true,
            "NEWLINE" => meta.in_new_line = true,
            "DISCARD" => meta.discarded = true,
            "CAPTION" => meta.caption = Some(words.delimited()?),
            "AS" => meta.friendly_name = Some(words.delimited()?),
            "ENUM" => {
                let list = words.expect("enum names")?;
                let variants: Vec<&str> = list.split(',').map(str::trim).collect();
                if variants.iter().any(|v| v.is_empty()) {
                    return Err(format!("ENUM has an empty name in '{list}'"));
                }
                meta.converter = Some(Arc::new(EnumConverter::new(name, variants)));
            }
            "BOOLS" => {
                let yes = words.delimited()?;
                let no = words.delimited()?;
                meta.converter = Some(Arc::new(BoolConverter::new(&yes, &no)));
            }
            _ => return Err(format!("Unknown field directive: {word}")),
        }
    }

    Ok(meta)
}

/// `KIND`, `KIND?`, `KIND[]` or `KIND?[]`.
fn parse_kind(name: &str, spec: &str) -> Result<FieldMeta, String> {
    let (spec, array) = match spec.strip_suffix("[]") {
        Some(rest) => (rest, true),
        None => (spec, false),
    };
    let (spec, nullable) = match spec.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (spec, false),
    };
    let kind = ScalarKind::from_name(spec).ok_or_else(|| format!("Unknown field kind: {spec}"))?;

    let mut meta = FieldMeta::new(name, kind);
    meta.nullable = nullable;
    meta.array = array;
    Ok(meta)
}

fn parse_quoted(words: &mut Words<'_>) -> Result<QuoteSpec, String> {
    let mut spec = QuoteSpec::new('"');
    if words.at_delimited() {
        spec.quote = single_char(&words.delimited()?, "QUOTED")?;
    }

    let mode = match words.peek().map(str::to_uppercase).as_deref() {
        Some("ALWAYS") => Some(QuoteMode::AlwaysQuoted),
        Some("OPTIONAL") => Some(QuoteMode::OptionalForBoth),
        Some("OPTIONAL_READ") => Some(QuoteMode::OptionalForRead),
        Some("OPTIONAL_WRITE") => Some(QuoteMode::OptionalForWrite),
        _ => None,
    };
    if let Some(mode) = mode {
        spec.mode = mode;
        words.next();
    }

    let multiline = match words.peek().map(str::to_uppercase).as_deref() {
        Some("MULTILINE") => Some(MultilineMode::AllowForBoth),
        Some("MULTILINE_READ") => Some(MultilineMode::AllowForRead),
        Some("MULTILINE_WRITE") => Some(MultilineMode::AllowForWrite),
        Some("SINGLELINE") => Some(MultilineMode::NotAllow),
        _ => None,
    };
    if let Some(multiline) = multiline {
        spec.multiline = multiline;
        words.next();
    }

    Ok(spec)
}

fn single_char(text: &str, what: &str) -> Result<char, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("{what} requires exactly one character, found '{text}'")),
    }
}

/// Split off a string whose first non-blank character is its delimiter,
/// e.g. `/a b/` or `"x"`. Returns the text and the input after it.
fn parse_delimited_string(s: &str) -> Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    if let Some(end) = after_delim.find(delim) {
        let extracted = after_delim[..end].to_string();
        let rest = &after_delim[end + delim.len_utf8()..];
        Ok((extracted, rest))
    } else {
        Err(format!("Unclosed delimiter '{}'", delim))
    }
}

/// Whitespace separated words of one statement.
#[derive(Clone, Copy)]
struct Words<'a> {
    rest: &'a str,
}

impl<'a> Words<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn next(&mut self) -> Option<&'a str> {
        let s = self.rest.trim_start();
        if s.is_empty() {
            self.rest = s;
            return None;
        }
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        let (word, rest) = s.split_at(end);
        self.rest = rest;
        Some(word)
    }

    fn peek(&self) -> Option<&'a str> {
        let mut ahead = *self;
        ahead.next()
    }

    fn expect(&mut self, what: &str) -> Result<&'a str, String> {
        self.next().ok_or_else(|| format!("Expected {what}"))
    }

    fn number<T: FromStr>(&mut self, what: &str) -> Result<T, String> {
        let word = self.expect(&format!("a number after {what}"))?;
        word.parse()
            .map_err(|_| format!("{what} requires a number, found '{word}'"))
    }

    /// The next word starts with a string delimiter rather than a keyword.
    fn at_delimited(&self) -> bool {
        self.rest
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| !c.is_alphanumeric() && c != '_')
    }

    fn delimited(&mut self) -> Result<String, String> {
        let (text, rest) = parse_delimited_string(self.rest)?;
        self.rest = rest;
        Ok(text)
    }

    fn finish(&mut self) -> Result<(), String> {
        match self.next() {
            None => Ok(()),
            Some(extra) => Err(format!("Unexpected text: {extra}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldLayout;
    use std::io::Write;

    const EMPLOYEE: &str = "\
# Employee master
RECORD employee FIXED EXACT
FIELD last   TEXT LENGTH 8
FIELD first  TEXT LENGTH 10
FIELD dept   TEXT LENGTH 10 TRIM BOTH
FIELD salary U32  LENGTH 8 ALIGN RIGHT /0/
";

    #[test]
    fn test_parse_fixed_record() {
        let desc = parse_description(EMPLOYEE).unwrap();
        assert_eq!(desc.record_name, "employee");
        assert_eq!(
            desc.layout,
            RecordLayout::Fixed {
                mode: FixedMode::ExactLength
            }
        );
        assert_eq!(desc.fields.len(), 4);
        assert_eq!(desc.fields[2].trim, TrimMode::Both);
        assert_eq!(
            desc.fields[3].align,
            Some(Alignment::new(AlignMode::Right, '0'))
        );
    }

    #[test]
    fn test_load_schema_parses_lines() {
        let schema = load_schema(EMPLOYEE).unwrap();
        let record = schema
            .parse_str("SMITH   JOHN      SALES     00050000", 1)
            .unwrap();
        assert_eq!(schema.value(&record, "dept"), Some(&Value::Text("SALES".into())));
        assert_eq!(schema.value(&record, "salary"), Some(&Value::UInt(50000)));
    }

    #[test]
    fn test_parse_delimited_record_and_kinds() {
        let desc = parse_description(
            "record orders delimited /;/\n\
             field id U64\n\
             field note text? OPTIONAL\n\
             field scores i32?[] ARRAY 0,* OPTIONAL",
        )
        .unwrap();
        assert_eq!(desc.layout, RecordLayout::delimited(";"));
        assert!(desc.fields[1].nullable);
        assert!(desc.fields[2].nullable && desc.fields[2].array);
        assert_eq!(desc.fields[2].kind, ScalarKind::I32);
        assert_eq!(
            desc.fields[2].array_length,
            Some(crate::field::ArraySpec::UNBOUNDED)
        );
    }

    #[test]
    fn test_parse_quoted_directive() {
        let desc = parse_description(
            "RECORD r DELIMITED /,/\n\
             FIELD a TEXT OPTIONAL QUOTED /'/ OPTIONAL MULTILINE_READ\n\
             FIELD b TEXT OPTIONAL QUOTED",
        )
        .unwrap();
        let a = &desc.fields[0];
        assert!(a.optional);
        assert_eq!(
            a.quote,
            Some(QuoteSpec {
                quote: '\'',
                mode: QuoteMode::OptionalForBoth,
                multiline: MultilineMode::AllowForRead,
            })
        );
        assert_eq!(desc.fields[1].quote, Some(QuoteSpec::new('"')));
    }

    #[test]
    fn test_parse_misc_directives() {
        let schema = load_schema(
            "RECORD r DELIMITED /|/\n\
             FIELD code TEXT DELIM /::/ CAPTION /Code/ NOTEMPTY\n\
             FIELD kind TEXT ENUM red,green AS /Colour/\n\
             FIELD ok BOOL BOOLS /Y/ /N/\n\
             FIELD qty I32 NULL /0/ ORDER 9\n\
             FIELD extra TEXT NEWLINE DISCARD ORDER 10",
        );
        // ORDER on only some fields.
        assert!(matches!(
            schema,
            Err(DslError::Config(ConfigError::PartialOrder { .. }))
        ));

        let desc = parse_description(
            "RECORD r DELIMITED /|/\n\
             FIELD code TEXT DELIM /::/ CAPTION /Code/ NOTEMPTY\n\
             FIELD kind TEXT ENUM red,green AS /Colour/\n\
             FIELD ok BOOL BOOLS /Y/ /N/\n\
             FIELD qty I32 NULL /0/\n\
             FIELD extra TEXT NEWLINE DISCARD",
        )
        .unwrap();
        let schema = build_schema(&desc).unwrap();
        let fields = schema.fields();
        assert!(matches!(
            &fields[0].layout,
            FieldLayout::Delimited(layout) if layout.delimiter == "::"
        ));
        assert_eq!(fields[0].caption.as_deref(), Some("Code"));
        assert!(fields[0].conversion.not_empty);
        assert_eq!(fields[1].friendly_name, "Colour");
        assert_eq!(fields[3].conversion.null_value, Some(Value::Int(0)));
        assert!(fields[4].in_new_line && fields[4].discarded);

        let record = schema.parse_str("c1::RED|y|5|", 1);
        // `extra` starts on a line the standalone parse cannot supply.
        assert!(matches!(record, Err(crate::RecordError::EndOfInput { .. })));
    }

    #[test]
    fn test_error_reports_line_number() {
        let err = parse_description("RECORD r FIXED\n\nFIELD a TEXT LENGTH x").unwrap_err();
        match err {
            DslError::Syntax { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("LENGTH"), "Got: {message}");
            }
            other => panic!("Expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_statement_and_directive() {
        let err = parse_description("TABLE x").unwrap_err();
        assert!(err.to_string().contains("Unknown statement: TABLE"));

        let err = parse_description("RECORD r FIXED\nFIELD a TEXT LENGTH 2 BOLD").unwrap_err();
        assert!(err.to_string().contains("Unknown field directive: BOLD"));
    }

    #[test]
    fn test_record_statement_rules() {
        assert!(matches!(
            parse_description("# nothing here\n"),
            Err(DslError::MissingRecord)
        ));
        assert!(matches!(
            parse_description("FIELD a TEXT"),
            Err(DslError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_description("RECORD a FIXED\nRECORD b FIXED"),
            Err(DslError::Syntax { line: 2, .. })
        ));
        let err = parse_description("RECORD a DELIMITED /,").unwrap_err();
        assert!(err.to_string().contains("Unclosed delimiter"));
    }

    #[test]
    fn test_null_value_must_fit_kind() {
        let err = parse_description("RECORD r DELIMITED /,/\nFIELD a U8 NULL /-1/").unwrap_err();
        assert!(err.to_string().contains("NULL value '-1'"), "Got: {err}");
    }

    #[test]
    fn test_parse_delimited_string() {
        assert_eq!(
            parse_delimited_string("  /a b/ rest").unwrap(),
            ("a b".to_string(), " rest")
        );
        assert!(parse_delimited_string("   ").is_err());
    }

    #[test]
    fn test_load_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EMPLOYEE.as_bytes()).unwrap();
        let schema = load_schema_file(file.path()).unwrap();
        assert_eq!(schema.record_name(), "employee");

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            load_schema_file(missing),
            Err(DslError::Io { .. })
        ));
    }
}
