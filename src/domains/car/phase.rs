use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a passenger. Assigned once when the simulation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassengerId(pub u32);

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passenger {}", self.0)
    }
}

/// Stage of the car's operating cycle.
///
/// The gate flags of a car (boarding allowed, unboarding allowed, ready,
/// moving) are all derived from this value, so at most one gate can be open
/// at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Stopped, empty, both gates closed.
    Idle,
    /// Boarding gate open.
    Boarding,
    /// Full and waiting to be dispatched.
    Ready,
    /// On the track.
    Running,
    /// Back at the platform. Passengers may leave once the gate is open.
    Unboarding { gate_open: bool },
    /// Ride budget spent and nobody aboard.
    Closed,
}

impl Phase {
    pub fn is_boarding_open(&self) -> bool {
        matches!(self, Phase::Boarding)
    }

    pub fn is_unboarding_open(&self) -> bool {
        matches!(self, Phase::Unboarding { gate_open: true })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Phase::Ready)
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, Phase::Running)
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_moving()
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Phase::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Boarding => write!(f, "boarding"),
            Phase::Ready => write!(f, "ready"),
            Phase::Running => write!(f, "running"),
            Phase::Unboarding { gate_open: true } => write!(f, "unboarding"),
            Phase::Unboarding { gate_open: false } => write!(f, "arrived"),
            Phase::Closed => write!(f, "closed"),
        }
    }
}

/// How waiting is implemented inside the car. All three keep the same
/// invariants; they differ only in how callers are suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// One lock plus "became full" / "became empty" condition variables.
    #[default]
    Blocking,
    /// A counting semaphore of free seats gates every boarding.
    AdmissionCounting,
    /// Callers re-read predicates with a sleep in between. Slower baseline.
    Polling,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Blocking => write!(f, "blocking"),
            Discipline::AdmissionCounting => write!(f, "admission-counting"),
            Discipline::Polling => write!(f, "polling"),
        }
    }
}
