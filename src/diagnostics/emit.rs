//! Diagnostic emission backend.
//!
//! With the `log` feature diagnostics go to the `log` facade. Without it they are
//! written to stderr in debug builds (or release builds with `diagnostics`).

use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::Diagnostic;
#[cfg(feature = "log")]
use super::kind::DiagnosticKind;
use crate::sync::mutex::Mutex;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
pub fn emit(diag: &Diagnostic) {
    emit_with_context(diag, "");
}

/// Emit a diagnostic with runtime context (handles, sizes, frame index).
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    if is_suppressed() {
        return;
    }

    #[cfg(feature = "log")]
    emit_to_log(diag, context);

    #[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
    emit_to_stderr(diag, context);

    #[cfg(all(not(feature = "log"), not(debug_assertions), not(feature = "diagnostics")))]
    let _ = (diag, context);
}

#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    let level = match diag.kind {
        DiagnosticKind::Warning => log::Level::Warn,
        DiagnosticKind::Note => log::Level::Info,
    };

    if context.is_empty() {
        log::log!(target: "framearena", level, "[{}] {}", diag.code, diag.message);
    } else {
        log::log!(target: "framearena", level, "[{}] {} ({})", diag.code, diag.message, context);
    }
    if let Some(note) = diag.note {
        log::debug!(target: "framearena", "  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::debug!(target: "framearena", "  help: {}", help);
    }
}

#[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "[framearena][{}] {}: {}", diag.code, diag.kind.prefix(), diag.message);
    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic, context: &str);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<(Diagnostic, String)>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes of all collected diagnostics, in order.
    pub fn codes(&self) -> Vec<&'static str> {
        self.diagnostics.lock().iter().map(|(d, _)| d.code).collect()
    }

    /// Number of collected diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic, context: &str) {
        self.diagnostics.lock().push((diag.clone(), context.to_string()));
    }
}

/// Sink that forwards to the global [`emit_with_context`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalSink;

impl DiagnosticSink for GlobalSink {
    fn emit(&self, diag: &Diagnostic, context: &str) {
        emit_with_context(diag, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{FR001, FR901};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&FR001, "");
        sink.emit(&FR901, "image=0x2a");

        assert_eq!(sink.codes(), vec!["FR001", "FR901"]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
