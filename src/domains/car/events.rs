use super::phase::PassengerId;
use super::state::RideOutcome;
use crate::common::DomainEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CarEvent {
    PassengerQueued {
        car_id: String,
        passenger: PassengerId,
        position: usize,
        timestamp: DateTime<Utc>,
    },
    PassengerBoarded {
        car_id: String,
        passenger: PassengerId,
        onboard: usize,
        timestamp: DateTime<Utc>,
    },
    PassengerDisembarked {
        car_id: String,
        passenger: PassengerId,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },
    PassengerWalking {
        car_id: String,
        passenger: PassengerId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    PassengerReturned {
        car_id: String,
        passenger: PassengerId,
        timestamp: DateTime<Utc>,
    },
    PassengerLeft {
        car_id: String,
        passenger: PassengerId,
        rides: u32,
        timestamp: DateTime<Utc>,
    },
    BoardingOpened {
        car_id: String,
        ride: u32,
        timestamp: DateTime<Utc>,
    },
    UnboardingOpened {
        car_id: String,
        ride: u32,
        timestamp: DateTime<Utc>,
    },
    RideStarted {
        car_id: String,
        ride: u32,
        passengers: Vec<PassengerId>,
        timestamp: DateTime<Utc>,
    },
    RideEnded {
        car_id: String,
        ride: u32,
        outcome: RideOutcome,
        timestamp: DateTime<Utc>,
    },
    CarClosed {
        car_id: String,
        total_rides: u32,
        timestamp: DateTime<Utc>,
    },
}

impl CarEvent {
    /// Passenger concerned by the event, if any.
    pub fn passenger(&self) -> Option<PassengerId> {
        match self {
            CarEvent::PassengerQueued { passenger, .. }
            | CarEvent::PassengerBoarded { passenger, .. }
            | CarEvent::PassengerDisembarked { passenger, .. }
            | CarEvent::PassengerWalking { passenger, .. }
            | CarEvent::PassengerReturned { passenger, .. }
            | CarEvent::PassengerLeft { passenger, .. } => Some(*passenger),
            _ => None,
        }
    }
}

impl DomainEvent for CarEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CarEvent::PassengerQueued { .. } => "PassengerQueued",
            CarEvent::PassengerBoarded { .. } => "PassengerBoarded",
            CarEvent::PassengerDisembarked { .. } => "PassengerDisembarked",
            CarEvent::PassengerWalking { .. } => "PassengerWalking",
            CarEvent::PassengerReturned { .. } => "PassengerReturned",
            CarEvent::PassengerLeft { .. } => "PassengerLeft",
            CarEvent::BoardingOpened { .. } => "BoardingOpened",
            CarEvent::UnboardingOpened { .. } => "UnboardingOpened",
            CarEvent::RideStarted { .. } => "RideStarted",
            CarEvent::RideEnded { .. } => "RideEnded",
            CarEvent::CarClosed { .. } => "CarClosed",
        }
    }

    fn aggregate_id(&self) -> &str {
        match self {
            CarEvent::PassengerQueued { car_id, .. }
            | CarEvent::PassengerBoarded { car_id, .. }
            | CarEvent::PassengerDisembarked { car_id, .. }
            | CarEvent::PassengerWalking { car_id, .. }
            | CarEvent::PassengerReturned { car_id, .. }
            | CarEvent::PassengerLeft { car_id, .. }
            | CarEvent::BoardingOpened { car_id, .. }
            | CarEvent::UnboardingOpened { car_id, .. }
            | CarEvent::RideStarted { car_id, .. }
            | CarEvent::RideEnded { car_id, .. }
            | CarEvent::CarClosed { car_id, .. } => car_id,
        }
    }

    fn event_version(&self) -> u64 { 1 }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CarEvent::PassengerQueued { timestamp, .. }
            | CarEvent::PassengerBoarded { timestamp, .. }
            | CarEvent::PassengerDisembarked { timestamp, .. }
            | CarEvent::PassengerWalking { timestamp, .. }
            | CarEvent::PassengerReturned { timestamp, .. }
            | CarEvent::PassengerLeft { timestamp, .. }
            | CarEvent::BoardingOpened { timestamp, .. }
            | CarEvent::UnboardingOpened { timestamp, .. }
            | CarEvent::RideStarted { timestamp, .. }
            | CarEvent::RideEnded { timestamp, .. }
            | CarEvent::CarClosed { timestamp, .. } => *timestamp,
        }
    }
}

impl fmt::Display for CarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarEvent::PassengerQueued { passenger, position, .. } => {
                write!(f, "{} is in line (position {}).", passenger, position)
            }
            CarEvent::PassengerBoarded { passenger, onboard, .. } => {
                write!(f, "{} is on board ({} aboard).", passenger, onboard)
            }
            CarEvent::PassengerDisembarked { passenger, remaining, .. } => {
                write!(f, "{} disembarked ({} still aboard).", passenger, remaining)
            }
            CarEvent::PassengerWalking { passenger, duration_ms, .. } => {
                write!(f, "{} is walking for {} ms.", passenger, duration_ms)
            }
            CarEvent::PassengerReturned { passenger, .. } => {
                write!(f, "{} back to roller coaster.", passenger)
            }
            CarEvent::PassengerLeft { passenger, rides, .. } => {
                write!(f, "{} is leaving after {} rides.", passenger, rides)
            }
            CarEvent::BoardingOpened { ride, .. } => write!(f, "Boarding for ride {}...", ride),
            CarEvent::UnboardingOpened { ride, .. } => write!(f, "Unboarding after ride {}...", ride),
            CarEvent::RideStarted { ride, passengers, .. } => {
                let names: Vec<String> = passengers.iter().map(|p| p.0.to_string()).collect();
                write!(f, "Ride {} started with passengers [{}].", ride, names.join(", "))
            }
            CarEvent::RideEnded { ride, outcome, .. } => {
                write!(f, "Ride {} ended ({:?}).", ride, outcome)
            }
            CarEvent::CarClosed { total_rides, .. } => {
                write!(f, "The car closed after {} rides.", total_rides)
            }
        }
    }
}

/// Outbound side of the car's event stream.
///
/// Sending never blocks, so events can be published while the car's lock is
/// held and arrive in the same order as the transitions that caused them.
#[derive(Debug, Clone, Default)]
pub struct EventPublisher {
    car_id: String,
    sender: Option<mpsc::UnboundedSender<CarEvent>>,
}

impl EventPublisher {
    pub fn new(car_id: impl Into<String>, sender: mpsc::UnboundedSender<CarEvent>) -> Self {
        Self {
            car_id: car_id.into(),
            sender: Some(sender),
        }
    }

    /// A publisher that drops everything.
    pub fn disabled(car_id: impl Into<String>) -> Self {
        Self {
            car_id: car_id.into(),
            sender: None,
        }
    }

    pub fn car_id(&self) -> &str {
        &self.car_id
    }

    pub fn publish(&self, event: CarEvent) {
        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is listening anymore.
            let _ = sender.send(event);
        }
    }

    pub fn queued(&self, passenger: PassengerId, position: usize) {
        self.publish(CarEvent::PassengerQueued {
            car_id: self.car_id.clone(),
            passenger,
            position,
            timestamp: Utc::now(),
        });
    }

    pub fn boarded(&self, passenger: PassengerId, onboard: usize) {
        self.publish(CarEvent::PassengerBoarded {
            car_id: self.car_id.clone(),
            passenger,
            onboard,
            timestamp: Utc::now(),
        });
    }

    pub fn disembarked(&self, passenger: PassengerId, remaining: usize) {
        self.publish(CarEvent::PassengerDisembarked {
            car_id: self.car_id.clone(),
            passenger,
            remaining,
            timestamp: Utc::now(),
        });
    }

    /// Walk lengths beyond `u64::MAX` milliseconds are reported as `u64::MAX`.
    pub fn walking(&self, passenger: PassengerId, duration: Duration) {
        self.publish(CarEvent::PassengerWalking {
            car_id: self.car_id.clone(),
            passenger,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
        });
    }

    pub fn returned(&self, passenger: PassengerId) {
        self.publish(CarEvent::PassengerReturned {
            car_id: self.car_id.clone(),
            passenger,
            timestamp: Utc::now(),
        });
    }

    pub fn left(&self, passenger: PassengerId, rides: u32) {
        self.publish(CarEvent::PassengerLeft {
            car_id: self.car_id.clone(),
            passenger,
            rides,
            timestamp: Utc::now(),
        });
    }

    pub fn boarding_opened(&self, ride: u32) {
        self.publish(CarEvent::BoardingOpened {
            car_id: self.car_id.clone(),
            ride,
            timestamp: Utc::now(),
        });
    }

    pub fn unboarding_opened(&self, ride: u32) {
        self.publish(CarEvent::UnboardingOpened {
            car_id: self.car_id.clone(),
            ride,
            timestamp: Utc::now(),
        });
    }

    pub fn ride_started(&self, ride: u32, passengers: Vec<PassengerId>) {
        self.publish(CarEvent::RideStarted {
            car_id: self.car_id.clone(),
            ride,
            passengers,
            timestamp: Utc::now(),
        });
    }

    pub fn ride_ended(&self, ride: u32, outcome: RideOutcome) {
        self.publish(CarEvent::RideEnded {
            car_id: self.car_id.clone(),
            ride,
            outcome,
            timestamp: Utc::now(),
        });
    }

    pub fn closed(&self, total_rides: u32) {
        self.publish(CarEvent::CarClosed {
            car_id: self.car_id.clone(),
            total_rides,
            timestamp: Utc::now(),
        });
    }
}
