//! Reading and writing whole texts and files, one record at a time.
//!
//! Each input line is handed to the schema before the next line is read;
//! a record that spans lines (multi-line quoted values, fields that start
//! on a new line) pulls its extra lines from the same source, so line
//! numbers in errors always point at the physical line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use flatrecords_rs::{
    LineCursor, LineSource, Record, RecordError, RecordSchema, SchemaDescription, TextLines,
    build_schema, load_schema,
};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::error_manager::{ErrorInfo, ErrorManager, ErrorMode};
use crate::hooks::{HookAction, NoHooks, RecordHooks};

/// Options shared by reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Leading lines skipped on read (kept as the header text).
    pub ignore_first: usize,
    /// Trailing lines skipped on read (kept as the footer text).
    pub ignore_last: usize,
    pub ignore_empty_lines: bool,
    /// Written before the records.
    pub header: Option<String>,
    /// Written after the records.
    pub footer: Option<String>,
    /// Stop after this many records.
    pub max_records: Option<usize>,
    /// Line terminator used on write.
    pub newline: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ignore_first: 0,
            ignore_last: 0,
            ignore_empty_lines: false,
            header: None,
            footer: None,
            max_records: None,
            newline: "\n".to_string(),
        }
    }
}

/// Reads and writes records of one schema.
pub struct Engine {
    schema: Arc<RecordSchema>,
    options: EngineOptions,
    hooks: Box<dyn RecordHooks>,
    error_manager: ErrorManager,
    line_number: usize,
    total_records: usize,
    header_text: String,
    footer_text: String,
}

impl Engine {
    pub fn new(schema: impl Into<Arc<RecordSchema>>) -> Self {
        Self {
            schema: schema.into(),
            options: EngineOptions::default(),
            hooks: Box::new(NoHooks),
            error_manager: ErrorManager::default(),
            line_number: 0,
            total_records: 0,
            header_text: String::new(),
            footer_text: String::new(),
        }
    }

    /// Engine over a schema given in the layout description language.
    pub fn from_layout(layout: &str) -> Result<Self, EngineError> {
        Ok(Self::new(load_schema(layout)?))
    }

    /// Engine over a schema built from field metadata.
    pub fn from_description(desc: &SchemaDescription) -> Result<Self, EngineError> {
        Ok(Self::new(build_schema(desc)?))
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: impl RecordHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_manager.set_mode(mode);
        self
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut EngineOptions {
        &mut self.options
    }

    /// Line reached by the last read or write.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Records returned by the last read, or written by the last write.
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn error_manager(&self) -> &ErrorManager {
        &self.error_manager
    }

    /// Lines skipped by `ignore_first` on the last read.
    pub fn header_text(&self) -> &str {
        &self.header_text
    }

    /// Lines skipped by `ignore_last` on the last read.
    pub fn footer_text(&self) -> &str {
        &self.footer_text
    }

    /// Parse every record of `text`.
    pub fn read_str(&mut self, text: &str) -> Result<Vec<Record>, EngineError> {
        self.line_number = 0;
        self.total_records = 0;
        self.error_manager.clear();

        let mut source = TextLines::new(text);
        self.footer_text = source.drop_last(self.options.ignore_last).join("\n");
        let mut header = Vec::with_capacity(self.options.ignore_first);
        for _ in 0..self.options.ignore_first {
            match source.next_line() {
                Some(line) => header.push(line),
                None => break,
            }
        }
        self.header_text = header.join("\n");
        self.line_number = source.line_number();

        let schema = Arc::clone(&self.schema);
        let mut records = Vec::new();

        while let Some(mut line) = source.next_line() {
            if self
                .options
                .max_records
                .is_some_and(|max| records.len() >= max)
            {
                break;
            }
            let line_number = source.line_number();
            self.line_number = line_number;

            if self.options.ignore_empty_lines && line.trim().is_empty() {
                continue;
            }
            if self.hooks.before_read(line_number, &mut line) == HookAction::Skip {
                continue;
            }

            let parsed = {
                let mut cursor = LineCursor::new(&line, line_number, &mut source);
                schema.parse_line(&mut cursor)
            };
            self.line_number = source.line_number().max(line_number);

            match parsed {
                Ok(record) => {
                    if self.hooks.after_read(line_number, &record) == HookAction::Skip {
                        continue;
                    }
                    records.push(record);
                }
                Err(error) => self.handle_error(error, line_number, line)?,
            }
        }

        self.total_records = records.len();
        debug!(
            record = %schema.record_name(),
            records = records.len(),
            lines = self.line_number,
            errors = self.error_manager.error_count(),
            "read records"
        );
        Ok(records)
    }

    /// Parse every record of a file.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<Record>, EngineError> {
        let text = fs::read_to_string(path)?;
        self.read_str(&text)
    }

    /// Render records, with the configured header and footer.
    pub fn write_string(&mut self, records: &[Record]) -> Result<String, EngineError> {
        self.render(records, true)
    }

    /// Render records into a new (or truncated) file.
    pub fn write_file(
        &mut self,
        path: impl AsRef<Path>,
        records: &[Record],
    ) -> Result<(), EngineError> {
        let text = self.render(records, true)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Append records to a file, without header or footer.
    pub fn append_to_file(
        &mut self,
        path: impl AsRef<Path>,
        records: &[Record],
    ) -> Result<(), EngineError> {
        let text = self.render(records, false)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    fn render(&mut self, records: &[Record], framed: bool) -> Result<String, EngineError> {
        self.line_number = 0;
        self.total_records = 0;
        self.error_manager.clear();

        let newline = self.options.newline.clone();
        let mut out = String::new();
        if framed && let Some(header) = &self.options.header {
            out.push_str(header);
            out.push_str(&newline);
            self.line_number += header.lines().count().max(1);
        }

        let limit = self.options.max_records.unwrap_or(usize::MAX);
        for record in records.iter().take(limit) {
            let line_number = self.line_number + 1;
            if self.hooks.before_write(line_number, record) == HookAction::Skip {
                continue;
            }
            match self.schema.render_record(record) {
                Ok(mut line) => {
                    self.hooks.after_write(line_number, &mut line);
                    self.line_number += line.lines().count().max(1);
                    out.push_str(&line);
                    out.push_str(&newline);
                    self.total_records += 1;
                }
                Err(error) => {
                    self.handle_error(error.at_line(line_number), line_number, String::new())?
                }
            }
        }

        if framed && let Some(footer) = &self.options.footer {
            out.push_str(footer);
            out.push_str(&newline);
        }

        debug!(
            record = %self.schema.record_name(),
            records = self.total_records,
            errors = self.error_manager.error_count(),
            "wrote records"
        );
        Ok(out)
    }

    /// Fatal errors always abort; others follow the error mode.
    fn handle_error(
        &mut self,
        error: RecordError,
        line: usize,
        text: String,
    ) -> Result<(), EngineError> {
        if error.is_fatal() {
            return Err(error.into());
        }
        match self.error_manager.mode() {
            ErrorMode::ThrowException => Err(error.into()),
            ErrorMode::IgnoreAndContinue => {
                warn!(line, %error, "ignored record error");
                Ok(())
            }
            ErrorMode::SaveAndContinue => {
                warn!(line, %error, "saved record error");
                self.error_manager.save(ErrorInfo { line, text, error });
                Ok(())
            }
        }
    }
}
