//! Replacement for the original tool's process-wide `g_bPrintfOn`/`DbgPrintf`
//! debug flag: a sink the caller injects, rather than a global toggle.

/// Receives non-fatal diagnostic lines emitted during a conversion (title
/// truncation, a non-fatal `DUMPINFO` failure, and the like).
///
/// A conversion that encounters one of these conditions keeps running; only
/// an [`Error`](crate::Error) aborts it.
pub trait WarningSink {
    /// Record a single warning or informational line.
    fn warn(&mut self, message: &str);
}

/// Default sink used by the CLI binaries: prints each line to stderr.
#[derive(Default)]
pub struct StderrSink;

impl WarningSink for StderrSink {
    fn warn(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// A sink that discards everything. Useful for library callers and tests
/// that don't care about warning text.
#[derive(Default)]
pub struct NullSink;

impl WarningSink for NullSink {
    fn warn(&mut self, _message: &str) {}
}

/// A sink that records every line it receives, for tests that assert on
/// warning content.
#[derive(Default)]
pub struct VecSink(pub Vec<String>);

impl WarningSink for VecSink {
    fn warn(&mut self, message: &str) {
        self.0.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_records_messages() {
        let mut sink = VecSink::default();
        sink.warn("hello");
        sink.warn("world");
        assert_eq!(sink.0, vec!["hello".to_string(), "world".to_string()]);
    }
}
