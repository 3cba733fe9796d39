use crate::domains::car::{Car, CarSnapshot, DelayProvider, Discipline, PassengerId};
use crate::domains::logger::DynLogger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassengerState {
    Away,
    Queued,
    Onboard,
    Walking,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerSummary {
    pub id: PassengerId,
    pub rides: u32,
}

/// One passenger's loop around the park.
///
/// The agent holds nothing but its own identity and progress; every
/// decision is taken from a fresh snapshot of the car, and every change to
/// shared state goes through the car's operations.
pub struct PassengerAgent {
    id: PassengerId,
    car: Arc<Car>,
    walk: Arc<dyn DelayProvider>,
    logger: DynLogger,
    poll_interval: Duration,
    state: PassengerState,
    rides: u32,
}

impl PassengerAgent {
    pub fn new(
        id: PassengerId,
        car: Arc<Car>,
        walk: Arc<dyn DelayProvider>,
        logger: DynLogger,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            car,
            walk,
            logger,
            poll_interval,
            state: PassengerState::Away,
            rides: 0,
        }
    }

    pub fn id(&self) -> PassengerId {
        self.id
    }

    pub fn state(&self) -> PassengerState {
        self.state
    }

    pub fn rides(&self) -> u32 {
        self.rides
    }

    /// Runs until the car has stopped taking riders and this passenger is
    /// off it.
    pub async fn run(mut self) -> PassengerSummary {
        self.logger.info(&format!("{} arrives at the park.", self.id));
        let mut changes = self.car.subscribe();
        loop {
            changes.borrow_and_update();
            let view = self.car.snapshot().await;
            let progressed = self.step(&view).await;
            if self.state == PassengerState::Left {
                break;
            }
            if !progressed {
                self.pause(&mut changes).await;
            }
        }
        PassengerSummary {
            id: self.id,
            rides: self.rides,
        }
    }

    /// Takes at most one transition based on `view`. Returns whether the
    /// passenger moved.
    pub async fn step(&mut self, view: &CarSnapshot) -> bool {
        match self.state {
            PassengerState::Away => self.arrive(view).await,
            PassengerState::Queued => self.try_board(view).await,
            PassengerState::Onboard => self.try_unboard(view).await,
            PassengerState::Walking => {
                self.walk_in_the_park().await;
                true
            }
            PassengerState::Left => false,
        }
    }

    async fn arrive(&mut self, view: &CarSnapshot) -> bool {
        if !view.is_operating() && !view.is_onboard(self.id) {
            self.leave();
            return true;
        }
        if self.car.has_fairness() && !view.is_in_line(self.id) && !self.car.enqueue(self.id).await {
            // Lost a race with the last ride starting; re-read next time.
            return false;
        }
        self.state = PassengerState::Queued;
        true
    }

    async fn try_board(&mut self, view: &CarSnapshot) -> bool {
        if !view.is_operating() {
            self.car.leave_queue(self.id).await;
            self.leave();
            return true;
        }
        if self.car.has_fairness() && !view.is_next(self.id) {
            return false;
        }
        // With seat counting the car itself waits for the gate.
        let gate_ready = self.car.discipline() == Discipline::AdmissionCounting
            || view.is_boarding_open();
        if !gate_ready || !self.car.request_board(self.id).await {
            return false;
        }
        self.state = PassengerState::Onboard;
        self.rides += 1;
        true
    }

    async fn try_unboard(&mut self, view: &CarSnapshot) -> bool {
        if !view.is_unboarding_open() || !self.car.request_unboard(self.id).await {
            return false;
        }
        // Nobody strolls around a park that is closing.
        self.state = if view.is_operating() {
            PassengerState::Walking
        } else {
            PassengerState::Away
        };
        true
    }

    async fn walk_in_the_park(&mut self) {
        let duration = self.walk.next_delay();
        self.car.events().walking(self.id, duration);
        tokio::time::sleep(duration).await;
        self.car.events().returned(self.id);
        self.state = PassengerState::Away;
    }

    fn leave(&mut self) {
        debug!(passenger = %self.id, rides = self.rides, "leaving the park");
        self.car.events().left(self.id, self.rides);
        self.state = PassengerState::Left;
    }

    async fn pause(&self, changes: &mut watch::Receiver<u64>) {
        match self.car.discipline() {
            Discipline::Polling => tokio::time::sleep(self.poll_interval).await,
            Discipline::Blocking | Discipline::AdmissionCounting => {
                // The car outlives its agents, so the channel stays open.
                let _ = changes.changed().await;
            }
        }
    }
}
