//! Error collection for reads and writes that continue past bad records.

use flatrecords_rs::RecordError;

/// What the engine does when a record fails to parse or render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Stop at the first error and return it.
    #[default]
    ThrowException,
    /// Drop the record and go on.
    IgnoreAndContinue,
    /// Drop the record, keep the error in the `ErrorManager`, and go on.
    SaveAndContinue,
}

/// One saved record error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    /// Line the record started on.
    pub line: usize,
    /// The raw line (empty for write errors).
    pub text: String,
    pub error: RecordError,
}

/// Errors saved under `ErrorMode::SaveAndContinue`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorManager {
    mode: ErrorMode,
    errors: Vec<ErrorInfo>,
}

impl ErrorManager {
    pub fn new(mode: ErrorMode) -> Self {
        Self {
            mode,
            errors: Vec::new(),
        }
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ErrorMode) {
        self.mode = mode;
    }

    pub fn errors(&self) -> &[ErrorInfo] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub(crate) fn save(&mut self, info: ErrorInfo) {
        self.errors.push(info);
    }

    /// One line per saved error: `line|message|text`.
    pub fn report(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}|{}|{}", e.line, e.error, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatrecords_rs::{ErrorContext, LengthViolation};

    fn sample(line: usize) -> ErrorInfo {
        ErrorInfo {
            line,
            text: "ABC".to_string(),
            error: RecordError::length(
                ErrorContext::new(line, 1, "code", "ABC"),
                LengthViolation::TooShort { found: 3, width: 5 },
            ),
        }
    }

    #[test]
    fn test_save_and_clear() {
        let mut manager = ErrorManager::new(ErrorMode::SaveAndContinue);
        assert!(!manager.has_errors());
        manager.save(sample(2));
        manager.save(sample(5));
        assert_eq!(manager.error_count(), 2);
        assert_eq!(manager.errors()[1].line, 5);
        manager.clear();
        assert!(!manager.has_errors());
        assert_eq!(manager.mode(), ErrorMode::SaveAndContinue);
    }

    #[test]
    fn test_report_lists_each_error() {
        let mut manager = ErrorManager::default();
        manager.save(sample(7));
        let report = manager.report();
        assert!(report.starts_with("7|Line: 7 Column: 1 Field: code"), "Got: {report}");
        assert!(report.ends_with("|ABC"));
    }
}
