use crate::config::LoggingConfig;
use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Fans every line out to several loggers.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.error(msg));
    }
}

/// Builds the narrative logger described by `config`: console plus file when
/// a file is configured, console alone otherwise, optionally behind a
/// buffer. Falls back to the console if the file cannot be opened.
pub fn init_logger(config: &LoggingConfig) -> Arc<dyn DomainLogger> {
    let console = super::init_console_logger();
    let level = config.level.parse().unwrap_or(log::LevelFilter::Info);

    let base: Arc<dyn DomainLogger> = match &config.file {
        Some(path) => match super::init_file_logger(path, level) {
            Ok(file) => Arc::new(MultiLogger::new(vec![file, console])) as Arc<dyn DomainLogger>,
            Err(e) => {
                console.warn(&format!("{}; logging to console only", e));
                console
            }
        },
        None => console,
    };

    if config.buffer_capacity > 0 {
        super::init_buffered_logger(base, config.buffer_capacity) as Arc<dyn DomainLogger>
    } else {
        base
    }
}
