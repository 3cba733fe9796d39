use crate::domains::logger::DomainLogger;
use std::sync::{Arc, Mutex};

/// Keeps every line in memory, prefixed with its level.
#[derive(Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    fn push(&self, level: &str, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{}:{}", level, msg));
        }
    }
}

impl DomainLogger for MemoryLogger {
    fn info(&self, msg: &str) { self.push("INFO", msg); }
    fn warn(&self, msg: &str) { self.push("WARN", msg); }
    fn error(&self, msg: &str) { self.push("ERR", msg); }
}
