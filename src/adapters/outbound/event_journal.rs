use crate::common::{DomainResult, EventEnvelope, EventMetadata};
use crate::domains::car::CarEvent;
use crate::domains::logger::DynLogger;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn, Level};

pub const JOURNAL_SOURCE: &str = "rollercoaster-app";

/// Serializes `event` as the `sequence`-th envelope of a run.
pub fn envelope_json(event: &CarEvent, sequence: u64) -> DomainResult<String> {
    let metadata = EventMetadata {
        sequence,
        source: JOURNAL_SOURCE.to_string(),
    };
    let envelope = EventEnvelope::new(event, "Car", metadata)?;
    Ok(serde_json::to_string(&envelope)?)
}

/// Drains the car's event stream until every publisher is gone.
///
/// Each event is written to `logger` as a narrative line (when given) and,
/// at trace level, as a JSON envelope on the `coaster::events` target. The
/// task returns all events in arrival order.
pub fn spawn_event_journal(
    mut events: mpsc::UnboundedReceiver<CarEvent>,
    logger: Option<DynLogger>,
) -> JoinHandle<Vec<CarEvent>> {
    tokio::spawn(async move {
        let mut journal = Vec::new();
        let mut sequence = 0u64;
        while let Some(event) = events.recv().await {
            sequence += 1;
            if tracing::enabled!(target: "coaster::events", Level::TRACE) {
                match envelope_json(&event, sequence) {
                    Ok(json) => trace!(target: "coaster::events", "{}", json),
                    Err(e) => warn!("could not serialize event {}: {}", sequence, e),
                }
            }
            if let Some(logger) = &logger {
                logger.info(&event.to_string());
            }
            journal.push(event);
        }
        journal
    })
}
