//! Record schemas: validated, ordered field descriptors for one record type.
//!
//! A `SchemaDescription` is plain data (what a front-end such as the
//! description language in `dsl` produces). `build_schema` checks it once
//! and returns an immutable `RecordSchema` that parses lines into `Record`s
//! and renders them back.
//!
//! ```
//! use flatrecords_rs::{build_schema, FieldMeta, RecordLayout, ScalarKind, SchemaDescription};
//!
//! let desc = SchemaDescription::new("item", RecordLayout::delimited(","))
//!     .field(FieldMeta::new("code", ScalarKind::Text))
//!     .field(FieldMeta::new("qty", ScalarKind::U32));
//! let schema = build_schema(&desc).unwrap();
//! let record = schema.parse_str("A-1,12", 1).unwrap();
//! assert_eq!(schema.render_record(&record).unwrap(), "A-1,12");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::convert::{Conversion, Converter, TrimMode};
use crate::cursor::{LineCursor, NoMoreLines};
use crate::error::{ConfigError, RecordError};
use crate::field::{
    AlignMode, Alignment, ArraySpec, DelimitedLayout, FieldDescriptor, FieldLayout, FixedLayout,
    FixedMode, QuoteSpec,
};
use crate::value::{ScalarKind, Value};

/// Layout attached directly to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutDirective {
    FixedLength(usize),
    Delimiter(String),
}

/// Declared metadata of one field, before validation.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    /// Element kind (for arrays, the kind of each element).
    pub kind: ScalarKind,
    pub nullable: bool,
    pub array: bool,
    pub layouts: Vec<LayoutDirective>,
    pub align: Option<Alignment>,
    pub order: Option<i32>,
    pub quote: Option<QuoteSpec>,
    pub array_length: Option<ArraySpec>,
    pub null_value: Option<Value>,
    pub trim: TrimMode,
    pub optional: bool,
    pub not_empty: bool,
    pub in_new_line: bool,
    pub discarded: bool,
    pub caption: Option<String>,
    pub friendly_name: Option<String>,
    pub converter: Option<Arc<dyn Converter>>,
}

impl FieldMeta {
    pub fn new(name: &str, kind: ScalarKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            array: false,
            layouts: Vec::new(),
            align: None,
            order: None,
            quote: None,
            array_length: None,
            null_value: None,
            trim: TrimMode::None,
            optional: false,
            not_empty: false,
            in_new_line: false,
            discarded: false,
            caption: None,
            friendly_name: None,
            converter: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn fixed_length(mut self, width: usize) -> Self {
        self.layouts.push(LayoutDirective::FixedLength(width));
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.layouts
            .push(LayoutDirective::Delimiter(delimiter.to_string()));
        self
    }

    pub fn align(mut self, mode: AlignMode, pad: char) -> Self {
        self.align = Some(Alignment::new(mode, pad));
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn quoted(mut self, quote: QuoteSpec) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn array_length(mut self, min: usize, max: usize) -> Self {
        self.array_length = Some(ArraySpec::new(min, max));
        self
    }

    pub fn null_value(mut self, value: impl Into<Value>) -> Self {
        self.null_value = Some(value.into());
        self
    }

    pub fn trim(mut self, trim: TrimMode) -> Self {
        self.trim = trim;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn not_empty(mut self) -> Self {
        self.not_empty = true;
        self
    }

    pub fn in_new_line(mut self) -> Self {
        self.in_new_line = true;
        self
    }

    pub fn discarded(mut self) -> Self {
        self.discarded = true;
        self
    }

    pub fn caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }

    pub fn friendly_name(mut self, name: &str) -> Self {
        self.friendly_name = Some(name.to_string());
        self
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// Layout strategy of a whole record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLayout {
    Fixed { mode: FixedMode },
    /// Fields without their own delimiter use this one.
    Delimited { delimiter: String },
}

impl RecordLayout {
    pub fn fixed(mode: FixedMode) -> Self {
        RecordLayout::Fixed { mode }
    }

    pub fn delimited(delimiter: &str) -> Self {
        RecordLayout::Delimited {
            delimiter: delimiter.to_string(),
        }
    }
}

/// Everything the builder needs to know about one record type.
#[derive(Debug, Clone)]
pub struct SchemaDescription {
    pub record_name: String,
    pub layout: RecordLayout,
    /// In declaration order.
    pub fields: Vec<FieldMeta>,
}

impl SchemaDescription {
    pub fn new(record_name: &str, layout: RecordLayout) -> Self {
        Self {
            record_name: record_name.to_string(),
            layout,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, meta: FieldMeta) -> Self {
        self.fields.push(meta);
        self
    }
}

/// Values of one parsed record, in schema field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl FromIterator<Value> for Record {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Validated field layout of one record type. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    record_name: String,
    layout: RecordLayout,
    fields: Vec<FieldDescriptor>,
}

/// Validate `desc` and build its schema.
pub fn build_schema(desc: &SchemaDescription) -> Result<RecordSchema, ConfigError> {
    RecordSchema::build(desc)
}

impl RecordSchema {
    pub fn build(desc: &SchemaDescription) -> Result<Self, ConfigError> {
        if desc.fields.is_empty() {
            return Err(ConfigError::NoFields {
                record: desc.record_name.clone(),
            });
        }

        let mut fields = desc
            .fields
            .iter()
            .map(|meta| describe_field(meta, &desc.layout))
            .collect::<Result<Vec<_>, _>>()?;

        resolve_order(&mut fields)?;

        let count = fields.len();
        for i in 0..count {
            let next_is_optional = fields.get(i + 1).is_some_and(|f| f.optional);
            let field = &mut fields[i];
            field.index = i;
            field.is_last = i + 1 == count;
            field.next_is_optional = next_is_optional;
        }

        for pair in fields.windows(2) {
            let (prev, field) = (&pair[0], &pair[1]);
            if prev.optional && !field.optional {
                return Err(ConfigError::OptionalChain {
                    field: field.name.clone(),
                    after: prev.name.clone(),
                });
            }
        }
        for field in &fields[..count - 1] {
            if field.array.is_some_and(|spec| !spec.is_fixed_count()) {
                return Err(ConfigError::VariableArrayNotLast {
                    field: field.name.clone(),
                });
            }
        }

        debug!(
            record = %desc.record_name,
            fields = count,
            layout = ?desc.layout,
            "built record schema"
        );

        Ok(Self {
            record_name: desc.record_name.clone(),
            layout: desc.layout.clone(),
            fields,
        })
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Descriptors in resolved order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Value of the field called `name` in a record of this schema.
    pub fn value<'r>(&self, record: &'r Record, name: &str) -> Option<&'r Value> {
        self.field_index(name).and_then(|i| record.get(i))
    }

    /// Parse the logical line under `cursor`. Fields marked to start on a
    /// new line, and multi-line quoted values, pull more lines from the
    /// cursor's source.
    pub fn parse_line(&self, cursor: &mut LineCursor<'_>) -> Result<Record, RecordError> {
        self.fields
            .iter()
            .map(|field| field.extract_value(cursor))
            .collect()
    }

    /// Parse a single standalone line.
    pub fn parse_str(&self, line: &str, line_number: usize) -> Result<Record, RecordError> {
        let mut source = NoMoreLines;
        let mut cursor = LineCursor::new(line, line_number, &mut source);
        self.parse_line(&mut cursor)
    }

    /// Render a record. Missing trailing values are written as null.
    pub fn render_record(&self, record: &Record) -> Result<String, RecordError> {
        let mut line = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            let value = record.get(i).unwrap_or(&Value::Null);
            field.render_value(&mut line, value)?;
        }
        Ok(line)
    }

    /// Column titles: captions, or friendly names when no caption is set.
    pub fn header_line(&self) -> String {
        let mut line = String::new();
        for field in &self.fields {
            let title = field.caption.as_deref().unwrap_or(&field.friendly_name);
            match &field.layout {
                FieldLayout::Fixed(layout) => {
                    let titled = FixedLayout {
                        align: Alignment::new(AlignMode::Left, ' '),
                        ..layout.clone()
                    };
                    titled.render(&mut line, title);
                }
                FieldLayout::Delimited(layout) => {
                    line.push_str(title);
                    if !field.is_last {
                        line.push_str(&layout.delimiter);
                    }
                }
            }
        }
        line
    }
}

fn describe_field(meta: &FieldMeta, record: &RecordLayout) -> Result<FieldDescriptor, ConfigError> {
    let field = || meta.name.clone();

    if meta.layouts.len() > 1 {
        return Err(ConfigError::ConflictingLayout { field: field() });
    }

    let layout = match record {
        RecordLayout::Fixed { mode } => {
            if meta.quote.is_some() {
                return Err(ConfigError::QuotedOnFixed { field: field() });
            }
            let width = match meta.layouts.first() {
                None => return Err(ConfigError::MissingLength { field: field() }),
                Some(LayoutDirective::Delimiter(_)) => {
                    return Err(ConfigError::DelimiterOnFixed { field: field() });
                }
                Some(LayoutDirective::FixedLength(0)) => {
                    return Err(ConfigError::ZeroLength { field: field() });
                }
                Some(LayoutDirective::FixedLength(width)) => *width,
            };
            let align = meta.align.unwrap_or_else(|| {
                if meta.kind.is_numeric() {
                    Alignment::new(AlignMode::Right, ' ')
                } else {
                    Alignment::new(AlignMode::Left, ' ')
                }
            });
            FieldLayout::Fixed(FixedLayout {
                width,
                align,
                mode: *mode,
            })
        }
        RecordLayout::Delimited { delimiter } => {
            if meta.align.is_some() {
                return Err(ConfigError::AlignOnDelimited { field: field() });
            }
            let delimiter = match meta.layouts.first() {
                None => delimiter.clone(),
                Some(LayoutDirective::Delimiter(own)) => own.clone(),
                Some(LayoutDirective::FixedLength(_)) => {
                    return Err(ConfigError::LengthOnDelimited { field: field() });
                }
            };
            if delimiter.is_empty() {
                return Err(ConfigError::EmptyDelimiter { field: field() });
            }
            FieldLayout::Delimited(DelimitedLayout {
                delimiter,
                quote: meta.quote,
            })
        }
    };

    let array = match (meta.array, meta.array_length) {
        (false, Some(_)) => return Err(ConfigError::ArrayLengthOnScalar { field: field() }),
        (false, None) => None,
        (true, spec) => {
            let spec = spec.unwrap_or_default();
            if spec.max < spec.min || spec.max == 0 {
                return Err(ConfigError::InvalidArrayLength {
                    field: field(),
                    min: spec.min,
                    max: spec.max,
                });
            }
            Some(spec)
        }
    };

    if let Some(converter) = &meta.converter
        && converter.kind() != meta.kind
    {
        return Err(ConfigError::ConverterKind {
            field: field(),
            converter: converter.name().to_string(),
            expected: meta.kind,
            found: converter.kind(),
        });
    }

    if let Some(null_value) = &meta.null_value
        && !null_value.kind_matches(meta.kind)
    {
        return Err(ConfigError::NullValueKind {
            field: field(),
            kind: meta.kind,
        });
    }

    let conversion = Conversion {
        kind: meta.kind,
        nullable: meta.nullable,
        trim: meta.trim,
        not_empty: meta.not_empty,
        null_value: meta.null_value.clone(),
        converter: meta.converter.clone(),
    };

    if meta.discarded
        && array.is_none()
        && conversion.null_value.is_none()
        && !conversion.accepts_absence()
    {
        return Err(ConfigError::DiscardedWithoutNull {
            field: field(),
            kind: meta.kind,
        });
    }

    Ok(FieldDescriptor {
        name: meta.name.clone(),
        friendly_name: meta.friendly_name.clone().unwrap_or_else(field),
        caption: meta.caption.clone(),
        index: 0,
        order: meta.order,
        layout,
        conversion,
        array,
        optional: meta.optional,
        in_new_line: meta.in_new_line,
        discarded: meta.discarded,
        is_last: false,
        next_is_optional: false,
    })
}

/// Sort by explicit order when fields carry one. Either all fields are
/// ordered or none is; order values are unique.
fn resolve_order(fields: &mut [FieldDescriptor]) -> Result<(), ConfigError> {
    if fields.iter().all(|f| f.order.is_none()) {
        return Ok(());
    }
    if let Some(unordered) = fields.iter().find(|f| f.order.is_none()) {
        return Err(ConfigError::PartialOrder {
            field: unordered.name.clone(),
        });
    }

    fields.sort_by_key(|f| f.order);
    for pair in fields.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(ConfigError::DuplicateOrder {
                field: pair[1].name.clone(),
                other: pair[0].name.clone(),
                order: pair[0].order.unwrap_or_default(),
            });
        }
    }
    Ok(())
}
