//! Scriptable host for tests.
//!
//! [`MockHost`] plays both host roles: it is a [`HostEventSource`] whose
//! events tests fire by hand, and the [`HostContext`] those events carry.
//! Compiled unconditionally so integration tests and other crates can use
//! it without feature gates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use telemetry_core::{
    ChangeSet, CommandInfo, ElementId, ElementInfo, FailureBatch, FailureNote, HostContext,
    HostEventSink, HostEventSource,
};

/// In-memory host with a scripted username, document, view, selection, and
/// element table.
pub struct MockHost {
    username: String,
    document_path: String,
    view_name: String,
    selection: Mutex<Vec<ElementId>>,
    elements: Mutex<HashMap<i64, ElementInfo>>,
    sink: RwLock<Option<Arc<dyn HostEventSink>>>,
}

impl MockHost {
    #[must_use]
    pub fn new(username: &str, document_path: &str, view_name: &str) -> Self {
        Self {
            username: username.to_string(),
            document_path: document_path.to_string(),
            view_name: view_name.to_string(),
            selection: Mutex::new(Vec::new()),
            elements: Mutex::new(HashMap::new()),
            sink: RwLock::new(None),
        }
    }

    /// Registers an element the context will report for `id`.
    pub fn put_element(&self, id: ElementId, info: ElementInfo) {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.0, info);
    }

    /// Replaces the scripted selection.
    pub fn set_selection(&self, ids: Vec<ElementId>) {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = ids;
    }

    fn with_sink(&self, f: impl FnOnce(&Arc<dyn HostEventSink>)) {
        if let Some(sink) = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            f(sink);
        }
    }

    // ── Event firing ──────────────────────────────────────────────────────────

    pub fn fire_document_opened(&self, path: &str) {
        self.with_sink(|sink| sink.document_opened(path));
    }

    pub fn fire_command_executed(&self, command: &CommandInfo) {
        self.with_sink(|sink| sink.command_executed(command));
    }

    pub fn fire_document_changed(&self, changes: &ChangeSet) {
        self.with_sink(|sink| sink.document_changed(self, changes));
    }

    pub fn fire_failures_processing(&self, batch: &dyn FailureBatch) {
        self.with_sink(|sink| sink.failures_processing(self, batch));
    }

    #[must_use]
    pub fn has_subscriber(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl HostContext for MockHost {
    fn username(&self) -> String {
        self.username.clone()
    }

    fn active_document_path(&self) -> String {
        self.document_path.clone()
    }

    fn active_view_name(&self) -> String {
        self.view_name.clone()
    }

    fn selection(&self) -> Vec<ElementId> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn element(&self, id: ElementId) -> Option<ElementInfo> {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.0)
            .cloned()
    }
}

impl HostEventSource for MockHost {
    fn subscribe(&self, sink: Arc<dyn HostEventSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn unsubscribe(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHost")
            .field("username", &self.username)
            .field("document_path", &self.document_path)
            .finish_non_exhaustive()
    }
}

/// Scripted failure batch counting `mark_journaled` calls.
pub struct MockFailureBatch {
    transaction: String,
    notes: Vec<FailureNote>,
    journaled: AtomicUsize,
}

impl MockFailureBatch {
    #[must_use]
    pub fn new(transaction: &str, notes: Vec<FailureNote>) -> Self {
        Self {
            transaction: transaction.to_string(),
            notes,
            journaled: AtomicUsize::new(0),
        }
    }

    /// How many times the batch was marked journaled.
    #[must_use]
    pub fn journaled_count(&self) -> usize {
        self.journaled.load(Ordering::SeqCst)
    }
}

impl FailureBatch for MockFailureBatch {
    fn transaction_name(&self) -> String {
        self.transaction.clone()
    }

    fn messages(&self) -> Vec<FailureNote> {
        self.notes.clone()
    }

    fn mark_journaled(&self) {
        self.journaled.fetch_add(1, Ordering::SeqCst);
    }
}
