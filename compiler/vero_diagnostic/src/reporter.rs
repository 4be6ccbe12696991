//! The reporter: a thread-safe diagnostic sink.
//!
//! Passes report from rayon workers, so collection happens behind a mutex
//! and ordering is restored at flush time: diagnostics come out sorted by
//! (span, code, message) regardless of the order workers produced them.

use parking_lot::Mutex;

use crate::{Diagnostic, Severity};

/// Thread-safe diagnostic sink.
///
/// The only external output channel of a pass. A pipeline runs a pass,
/// then consults [`Reporter::error_count`] to decide whether to proceed.
#[derive(Debug, Default)]
pub struct Reporter {
    collected: Mutex<Vec<Diagnostic>>,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter::default()
    }

    /// Record a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        self.collected.lock().push(diagnostic);
    }

    /// Number of error-severity diagnostics recorded so far.
    pub fn error_count(&self) -> usize {
        self.collected
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Whether any error has been recorded.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Take all recorded diagnostics, sorted deterministically.
    pub fn flush(&self) -> Vec<Diagnostic> {
        let mut out = std::mem::take(&mut *self.collected.lock());
        out.sort_by(|a, b| {
            (a.span.start, a.span.end, a.code, &a.message).cmp(&(
                b.span.start,
                b.span.end,
                b.code,
                &b.message,
            ))
        });
        out
    }
}
