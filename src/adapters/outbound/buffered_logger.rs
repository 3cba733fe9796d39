use crate::domains::logger::DomainLogger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

enum Level {
    Info,
    Warn,
    Error,
}

struct LogMessage {
    level: Level,
    msg: String,
}

/// Narrative logger that never blocks the caller.
///
/// Lines are forwarded to `bridge` from a background task; when the buffer
/// of `capacity` lines is full new lines are dropped and counted. Must be
/// created inside a Tokio runtime.
pub struct BufferedLogger {
    sender: mpsc::Sender<LogMessage>,
    dropped: AtomicU64,
}

impl BufferedLogger {
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn forward(&self, level: Level, msg: &str) {
        let message = LogMessage { level, msg: msg.to_string() };
        if self.sender.try_send(message).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) { self.forward(Level::Info, msg); }
    fn warn(&self, msg: &str) { self.forward(Level::Warn, msg); }
    fn error(&self, msg: &str) { self.forward(Level::Error, msg); }
}

pub fn init_buffered_logger(bridge: Arc<dyn DomainLogger>, capacity: usize) -> Arc<BufferedLogger> {
    let (tx, mut rx) = mpsc::channel::<LogMessage>(capacity.max(1));

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg.level {
                Level::Info => bridge.info(&msg.msg),
                Level::Warn => bridge.warn(&msg.msg),
                Level::Error => bridge.error(&msg.msg),
            }
        }
    });

    Arc::new(BufferedLogger { sender: tx, dropped: AtomicU64::new(0) })
}
