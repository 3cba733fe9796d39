use super::phase::{PassengerId, Phase};
use super::queue::FairnessQueue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideOutcome {
    /// The ride delay ran to the end.
    Completed,
    /// The ride delay was cut short. The ride still counts.
    Interrupted,
    /// The car was not ready; nothing happened.
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RideRecord {
    pub number: u32,
    pub passengers: Vec<PassengerId>,
    pub outcome: RideOutcome,
}

/// Why the car turned down a board/unboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    GateClosed,
    CarFull,
    NotAtHead,
    AlreadyOnboard,
    NotOnboard,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::GateClosed => "gate closed",
            Rejection::CarFull => "car full",
            Rejection::NotAtHead => "not at the head of the line",
            Rejection::AlreadyOnboard => "already on board",
            Rejection::NotOnboard => "not on board",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOutcome {
    Boarded { onboard: usize, filled: bool },
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnboardOutcome {
    Disembarked { remaining: usize, closed: bool },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    OverCapacity { onboard: usize, capacity: usize },
    OverBudget { total_rides: u32, max_rides: u32 },
    QueuedWhileOnboard(PassengerId),
    RunningNotFull { onboard: usize, capacity: usize },
    ClosedWithRiders(usize),
    ClosedWithBudget { total_rides: u32, max_rides: u32 },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::OverCapacity { onboard, capacity } => {
                write!(f, "{} passengers on board of a {}-seat car", onboard, capacity)
            }
            InvariantViolation::OverBudget { total_rides, max_rides } => {
                write!(f, "{} rides run with a budget of {}", total_rides, max_rides)
            }
            InvariantViolation::QueuedWhileOnboard(id) => {
                write!(f, "{} is both on board and in line", id)
            }
            InvariantViolation::RunningNotFull { onboard, capacity } => {
                write!(f, "car running with {} of {} seats taken", onboard, capacity)
            }
            InvariantViolation::ClosedWithRiders(n) => {
                write!(f, "car closed with {} passengers aboard", n)
            }
            InvariantViolation::ClosedWithBudget { total_rides, max_rides } => {
                write!(f, "car closed after {} of {} rides", total_rides, max_rides)
            }
        }
    }
}

/// Everything the car knows, without any synchronization.
///
/// Each method is one atomic transition; the caller provides mutual
/// exclusion. Transitions that are not allowed in the current phase leave
/// the state untouched and report a rejection.
#[derive(Debug, Clone)]
pub struct CarState {
    capacity: usize,
    max_rides: u32,
    total_rides: u32,
    onboard: BTreeSet<PassengerId>,
    queue: Option<FairnessQueue>,
    phase: Phase,
    boarding_order: Vec<PassengerId>,
    history: Vec<RideRecord>,
}

impl CarState {
    pub fn new(capacity: usize, max_rides: u32, fairness: bool) -> Self {
        Self {
            capacity,
            max_rides,
            total_rides: 0,
            onboard: BTreeSet::new(),
            queue: fairness.then(FairnessQueue::new),
            phase: Phase::Idle,
            boarding_order: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_rides(&self) -> u32 {
        self.max_rides
    }

    pub fn total_rides(&self) -> u32 {
        self.total_rides
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_fairness(&self) -> bool {
        self.queue.is_some()
    }

    pub fn passengers(&self) -> Vec<PassengerId> {
        self.onboard.iter().copied().collect()
    }

    pub fn waiting(&self) -> Vec<PassengerId> {
        self.queue
            .as_ref()
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn boarding_order(&self) -> &[PassengerId] {
        &self.boarding_order
    }

    pub fn history(&self) -> &[RideRecord] {
        &self.history
    }

    pub fn is_full(&self) -> bool {
        self.onboard.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.onboard.is_empty()
    }

    pub fn is_operating(&self) -> bool {
        self.total_rides < self.max_rides
    }

    pub fn is_onboard(&self, id: PassengerId) -> bool {
        self.onboard.contains(&id)
    }

    pub fn is_in_line(&self, id: PassengerId) -> bool {
        self.queue.as_ref().is_some_and(|q| q.contains(id))
    }

    pub fn next_passenger(&self) -> Option<PassengerId> {
        self.queue.as_ref().and_then(FairnessQueue::head)
    }

    pub fn line_is_empty(&self) -> bool {
        self.queue.as_ref().map_or(true, FairnessQueue::is_empty)
    }

    /// Puts `id` at the back of the line. Returns the 1-based position, or
    /// `None` when there is no line, the passenger is already in it, is on
    /// board, or the car no longer operates.
    pub fn enqueue(&mut self, id: PassengerId) -> Option<usize> {
        if self.onboard.contains(&id) || !self.is_operating() {
            return None;
        }
        let queue = self.queue.as_mut()?;
        if !queue.enqueue(id) {
            return None;
        }
        queue.position(id)
    }

    pub fn dequeue_if_head(&mut self, id: PassengerId) -> bool {
        self.queue.as_mut().is_some_and(|q| q.dequeue_if_head(id))
    }

    pub fn leave_queue(&mut self, id: PassengerId) -> bool {
        self.queue.as_mut().is_some_and(|q| q.remove(id))
    }

    pub fn board(&mut self, id: PassengerId) -> BoardOutcome {
        if !self.phase.is_boarding_open() {
            return BoardOutcome::Rejected(Rejection::GateClosed);
        }
        if self.onboard.contains(&id) {
            return BoardOutcome::Rejected(Rejection::AlreadyOnboard);
        }
        if self.is_full() {
            return BoardOutcome::Rejected(Rejection::CarFull);
        }
        if let Some(queue) = self.queue.as_mut() {
            if !queue.dequeue_if_head(id) {
                return BoardOutcome::Rejected(Rejection::NotAtHead);
            }
        }

        self.onboard.insert(id);
        self.boarding_order.push(id);
        let filled = self.is_full();
        if filled {
            self.phase = Phase::Ready;
        }
        BoardOutcome::Boarded {
            onboard: self.onboard.len(),
            filled,
        }
    }

    pub fn unboard(&mut self, id: PassengerId) -> UnboardOutcome {
        if !self.phase.is_unboarding_open() {
            return UnboardOutcome::Rejected(Rejection::GateClosed);
        }
        if !self.onboard.remove(&id) {
            return UnboardOutcome::Rejected(Rejection::NotOnboard);
        }

        let mut closed = false;
        if self.onboard.is_empty() {
            if self.is_operating() {
                self.phase = Phase::Idle;
            } else {
                self.phase = Phase::Closed;
                closed = true;
            }
        }
        UnboardOutcome::Disembarked {
            remaining: self.onboard.len(),
            closed,
        }
    }

    pub fn open_boarding(&mut self) -> bool {
        if self.phase == Phase::Idle && self.is_operating() {
            self.phase = Phase::Boarding;
            true
        } else {
            false
        }
    }

    pub fn open_unboarding(&mut self) -> bool {
        if self.phase == (Phase::Unboarding { gate_open: false }) {
            self.phase = Phase::Unboarding { gate_open: true };
            true
        } else {
            false
        }
    }

    /// Shuts an idle car whose budget is spent.
    pub fn close(&mut self) -> bool {
        if self.phase == Phase::Idle && !self.is_operating() && self.is_empty() {
            self.phase = Phase::Closed;
            true
        } else {
            false
        }
    }

    /// `Ready -> Running`. Returns the number of the ride that just started.
    pub fn start_ride(&mut self) -> Option<u32> {
        if !self.phase.is_ready() || !self.is_full() || !self.is_operating() {
            return None;
        }
        self.phase = Phase::Running;
        self.total_rides += 1;
        Some(self.total_rides)
    }

    /// `Running -> Unboarding` with the gate still closed.
    pub fn finish_ride(&mut self, outcome: RideOutcome) -> Option<&RideRecord> {
        if !self.phase.is_moving() {
            return None;
        }
        self.phase = Phase::Unboarding { gate_open: false };
        self.history.push(RideRecord {
            number: self.total_rides,
            passengers: self.passengers(),
            outcome,
        });
        self.history.last()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let onboard = self.onboard.len();
        if onboard > self.capacity {
            return Err(InvariantViolation::OverCapacity {
                onboard,
                capacity: self.capacity,
            });
        }
        if self.total_rides > self.max_rides {
            return Err(InvariantViolation::OverBudget {
                total_rides: self.total_rides,
                max_rides: self.max_rides,
            });
        }
        if let Some(queue) = &self.queue {
            if let Some(id) = queue.iter().find(|id| self.onboard.contains(*id)) {
                return Err(InvariantViolation::QueuedWhileOnboard(*id));
            }
        }
        if self.phase.is_moving() && onboard != self.capacity {
            return Err(InvariantViolation::RunningNotFull {
                onboard,
                capacity: self.capacity,
            });
        }
        if self.phase.is_closed() {
            if onboard > 0 {
                return Err(InvariantViolation::ClosedWithRiders(onboard));
            }
            if self.total_rides != self.max_rides {
                return Err(InvariantViolation::ClosedWithBudget {
                    total_rides: self.total_rides,
                    max_rides: self.max_rides,
                });
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> CarSnapshot {
        CarSnapshot {
            phase: self.phase,
            capacity: self.capacity,
            max_rides: self.max_rides,
            total_rides: self.total_rides,
            onboard: self.passengers(),
            waiting: self.waiting(),
        }
    }
}

/// A consistent, owned copy of the car's predicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarSnapshot {
    pub phase: Phase,
    pub capacity: usize,
    pub max_rides: u32,
    pub total_rides: u32,
    pub onboard: Vec<PassengerId>,
    pub waiting: Vec<PassengerId>,
}

impl CarSnapshot {
    pub fn is_full(&self) -> bool {
        self.onboard.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.onboard.is_empty()
    }

    pub fn is_operating(&self) -> bool {
        self.total_rides < self.max_rides
    }

    pub fn is_boarding_open(&self) -> bool {
        self.phase.is_boarding_open()
    }

    pub fn is_unboarding_open(&self) -> bool {
        self.phase.is_unboarding_open()
    }

    pub fn is_ready(&self) -> bool {
        self.phase.is_ready()
    }

    pub fn is_stopped(&self) -> bool {
        self.phase.is_stopped()
    }

    pub fn is_onboard(&self, id: PassengerId) -> bool {
        self.onboard.contains(&id)
    }

    pub fn is_in_line(&self, id: PassengerId) -> bool {
        self.waiting.contains(&id)
    }

    pub fn is_next(&self, id: PassengerId) -> bool {
        self.waiting.first() == Some(&id)
    }
}
