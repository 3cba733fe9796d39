use crate::domains::logger::DomainLogger;
use chrono::Local;
use std::sync::Arc;

struct ConsoleBridge;

impl DomainLogger for ConsoleBridge {
    fn info(&self, msg: &str) { println!("{} {}", Local::now().format("%H:%M:%S%.3f"), msg); }
    fn warn(&self, msg: &str) { println!("{} WARN: {}", Local::now().format("%H:%M:%S%.3f"), msg); }
    fn error(&self, msg: &str) { eprintln!("{} ERROR: {}", Local::now().format("%H:%M:%S%.3f"), msg); }
}

/// Console-backed narrative log, one timestamped line per message.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(ConsoleBridge {})
}
