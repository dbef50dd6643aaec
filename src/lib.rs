//! # flatrecords-rs
//!
//! A schema-driven codec for flat files: fixed-width and delimited text
//! records mapped to typed values and back.
//!
//! ## Overview
//!
//! - **Schemas**: a `SchemaDescription` lists each field's kind and
//!   directives (width or delimiter, alignment, quoting, arrays, null value,
//!   trimming, optional/new-line flags). `build_schema` validates it once.
//! - **Parsing**: `RecordSchema::parse_line` walks a `LineCursor` field by
//!   field, pulling extra lines for multi-line quoted values and fields that
//!   start on a new line.
//! - **Rendering**: `RecordSchema::render_record` pads, truncates, quotes and
//!   delimits values back into a line.
//! - **Diagnostics**: every `RecordError` carries the line, 1-based column,
//!   field name and text involved.
//!
//! ## Example
//!
//! ```
//! use flatrecords_rs::{load_schema, Value};
//!
//! // Record layout: Last(8) First(10) Dept(10) Salary(8)
//! let schema = load_schema(
//!     "RECORD employee FIXED
//!      FIELD last   TEXT LENGTH 8  TRIM BOTH
//!      FIELD first  TEXT LENGTH 10 TRIM BOTH
//!      FIELD dept   TEXT LENGTH 10 TRIM BOTH
//!      FIELD salary U32  LENGTH 8  ALIGN RIGHT /0/",
//! )
//! .unwrap();
//!
//! let record = schema.parse_str("SMITH   JOHN      SALES     00050000", 1).unwrap();
//! assert_eq!(schema.value(&record, "dept"), Some(&Value::from("SALES")));
//! assert_eq!(
//!     schema.render_record(&record).unwrap(),
//!     "SMITH   JOHN      SALES     00050000"
//! );
//! ```

pub mod convert;
pub mod cursor;
pub mod dsl;
pub mod error;
pub mod field;
pub mod schema;
pub mod value;

pub use convert::{Assigned, BoolConverter, Conversion, Converter, EnumConverter, TrimMode};
pub use cursor::{LineCursor, LineSource, NoMoreLines, TextLines};
pub use dsl::{DslError, load_schema, load_schema_file, parse_description};
pub use error::{
    ConfigError, ConversionOrigin, ConvertError, ErrorContext, LengthViolation, RecordError,
};
pub use field::{
    AlignMode, Alignment, ArraySpec, DelimitedLayout, ExtractedSpan, FieldDescriptor, FieldLayout,
    FixedLayout, FixedMode, MultilineMode, QuoteMode, QuoteSpec,
};
pub use schema::{
    FieldMeta, LayoutDirective, Record, RecordLayout, RecordSchema, SchemaDescription,
    build_schema,
};
pub use value::{ScalarKind, Value};
