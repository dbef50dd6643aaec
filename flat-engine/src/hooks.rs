//! Callbacks around each record read or written.
//!
//! Every hook defaults to doing nothing, so implementors override only the
//! points they care about.

use flatrecords_rs::Record;

/// What the engine does with the current record after a hook runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookAction {
    #[default]
    Continue,
    /// Drop the record: it is not returned (read) or not written (write).
    Skip,
}

/// Synchronous hooks invoked by the engine around each record.
pub trait RecordHooks {
    /// Before a line is parsed. The line may be edited in place.
    fn before_read(&mut self, _line_number: usize, _line: &mut String) -> HookAction {
        HookAction::Continue
    }

    /// After a line parsed successfully.
    fn after_read(&mut self, _line_number: usize, _record: &Record) -> HookAction {
        HookAction::Continue
    }

    /// Before a record is rendered.
    fn before_write(&mut self, _line_number: usize, _record: &Record) -> HookAction {
        HookAction::Continue
    }

    /// After a record was rendered. The line may be edited in place.
    fn after_write(&mut self, _line_number: usize, _line: &mut String) {}
}

/// Hooks that never intervene.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl RecordHooks for NoHooks {}
