//! Capture `tracing` events so tests can assert on what was logged.
//!
//! Capture is scoped to a closure through `tracing::subscriber::with_default`,
//! so parallel tests never see each other's events.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

/// Entries kept per capture before the oldest are dropped.
const MAX_ENTRIES: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this capture installed as the thread's subscriber.
    /// `directive` is an `EnvFilter` directive such as `"patpack=debug"`.
    pub fn run<T>(&self, directive: &str, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new(directive))
            .with(CaptureLayer {
                entries: Arc::clone(&self.entries),
            });
        tracing::subscriber::with_default(subscriber, f)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message))
    }

    /// Entries at `level` whose message contains `message`.
    #[must_use]
    pub fn matching(&self, level: Level, message: &str) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level && e.message.contains(message))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Human-readable dump for assertion messages.
    #[must_use]
    pub fn display(&self) -> String {
        let entries = self.entries.lock();
        if entries.is_empty() {
            return "no events captured".to_string();
        }
        let mut out = String::new();
        for entry in entries.iter() {
            let _ = write!(out, "[{}] {}: {}", entry.level, entry.target, entry.message);
            for (key, value) in &entry.fields {
                let _ = write!(out, " {key}={value}");
            }
            out.push('\n');
        }
        out
    }
}

struct CaptureLayer {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_ENTRIES {
            entries.remove(0);
        }
        entries.push(LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Assert that a capture holds an event at `level` containing `message`.
#[macro_export]
macro_rules! assert_logged {
    ($capture:expr, $level:expr, $message:expr) => {{
        let capture = &$capture;
        assert!(
            capture.contains($level, $message),
            "expected {} event containing {:?}\ncaptured:\n{}",
            $level,
            $message,
            capture.display()
        );
    }};
}
