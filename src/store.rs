//! Result store and change-notification events.

use serde::{Deserialize, Serialize};

use crate::document::ResultDocument;

/// Capacity for the pipeline event broadcast channel.
/// Slow subscribers that fall behind lose the oldest events; they can always
/// resynchronize from the store.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Coarse change notifications broadcast by the pipeline.
///
/// Consumers that only need "new data available" can watch
/// `result_version` instead of diffing documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A primary request was dispatched with this request version.
    GenerationStarted { version: u64 },
    /// A new result document was accepted.
    ResultUpdated { result_version: u64 },
    /// Meshes were merged into the current document.
    MeshesUpdated { result_version: u64 },
    /// The cycle failed; the message is the store's current error.
    GenerationFailed { message: String },
}

/// Latest accepted pipeline state.
///
/// A pure synchronous holder: nothing here awaits, and all mutation funnels
/// through the coordinator's handlers, which execute one at a time.
#[derive(Debug, Default)]
pub struct ResultStore {
    document: Option<ResultDocument>,
    result_version: u64,
    busy: bool,
    error: Option<String>,
    warning: Option<String>,
}

impl ResultStore {
    /// Latest accepted result document, if any cycle has succeeded.
    pub fn document(&self) -> Option<&ResultDocument> {
        self.document.as_ref()
    }

    /// Monotonic counter bumped on every accepted document change.
    ///
    /// This is a change-notification counter, not a content hash: accepting
    /// an identical document still increments it.
    pub fn result_version(&self) -> u64 {
        self.result_version
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Clear the current error. Idempotent.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Clear the current warning text. Idempotent.
    pub fn clear_warning(&mut self) {
        self.warning = None;
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Replace the current error wholesale.
    pub(crate) fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Append a warning line; warnings accumulate within a cycle.
    pub(crate) fn append_warning(&mut self, text: &str) {
        match &mut self.warning {
            Some(current) => {
                current.push('\n');
                current.push_str(text);
            }
            None => self.warning = Some(text.to_string()),
        }
    }

    /// Accept a new result document and bump the result version.
    pub(crate) fn accept_document(&mut self, document: ResultDocument) {
        self.document = Some(document);
        self.result_version += 1;
    }

    /// Mutable access for the in-place mesh merge.
    pub(crate) fn document_mut(&mut self) -> Option<&mut ResultDocument> {
        self.document.as_mut()
    }

    pub(crate) fn bump_result_version(&mut self) {
        self.result_version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_accumulate_and_clear_wholesale() {
        let mut store = ResultStore::default();
        assert_eq!(store.warning(), None);

        store.append_warning("first");
        store.append_warning("second");
        assert_eq!(store.warning(), Some("first\nsecond"));

        store.clear_warning();
        store.clear_warning();
        assert_eq!(store.warning(), None);
    }

    #[test]
    fn accepting_a_document_bumps_the_version() {
        let mut store = ResultStore::default();
        assert_eq!(store.result_version(), 0);
        store.accept_document(ResultDocument::default());
        store.accept_document(ResultDocument::default());
        assert_eq!(store.result_version(), 2);
    }

    #[test]
    fn error_is_single_and_replaced() {
        let mut store = ResultStore::default();
        store.set_error("one".into());
        store.set_error("two".into());
        assert_eq!(store.error(), Some("two"));
        store.clear_error();
        assert_eq!(store.error(), None);
    }
}
