use super::events::EventPublisher;
use super::phase::{Discipline, PassengerId, Phase};
use super::ports::DelayProvider;
use super::state::{BoardOutcome, CarSnapshot, CarState, RideOutcome, RideRecord, UnboardOutcome};
use crate::common::{DomainError, DomainResult};
use tokio::sync::{watch, Mutex, Notify, Semaphore};
use tracing::{debug, warn};

/// Fixed parameters of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarSettings {
    pub capacity: usize,
    pub max_rides: u32,
    pub fairness: bool,
    pub discipline: Discipline,
}

/// The roller coaster car: the only owner of shared simulation state.
///
/// Every operation takes the state lock for exactly one transition and
/// never holds it across the ride delay or any other suspension. Passengers
/// and the controller share the car through an `Arc` and talk to it only
/// through these methods.
pub struct Car {
    id: String,
    settings: CarSettings,
    state: Mutex<CarState>,
    became_full: Notify,
    became_empty: Notify,
    ride_interrupt: Notify,
    /// Free seats; consulted only by the admission-counting discipline.
    seats: Semaphore,
    /// Bumped after every transition so waiters can re-read the car.
    changes: watch::Sender<u64>,
    events: EventPublisher,
}

impl Car {
    pub fn new(settings: CarSettings, events: EventPublisher) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            id: events.car_id().to_string(),
            state: Mutex::new(CarState::new(
                settings.capacity,
                settings.max_rides,
                settings.fairness,
            )),
            became_full: Notify::new(),
            became_empty: Notify::new(),
            ride_interrupt: Notify::new(),
            seats: Semaphore::new(settings.capacity),
            changes,
            events,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> CarSettings {
        self.settings
    }

    pub fn discipline(&self) -> Discipline {
        self.settings.discipline
    }

    pub fn has_fairness(&self) -> bool {
        self.settings.fairness
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Receiver that is marked changed after every transition of the car.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn commit(&self, state: &CarState) {
        debug_assert!(
            state.check_invariants().is_ok(),
            "car {} left in an invalid state: {:?}",
            self.id,
            state.check_invariants()
        );
        self.changes.send_modify(|epoch| *epoch += 1);
    }

    fn shut_down(&self, state: &CarState) {
        debug!(car = %self.id, rides = state.total_rides(), "car closed");
        self.events.closed(state.total_rides());
        self.seats.close();
        self.became_full.notify_waiters();
        self.became_empty.notify_waiters();
    }

    // ---- fairness line -------------------------------------------------

    pub async fn enqueue(&self, id: PassengerId) -> bool {
        let mut state = self.state.lock().await;
        match state.enqueue(id) {
            Some(position) => {
                self.events.queued(id, position);
                self.commit(&state);
                true
            }
            None => false,
        }
    }

    pub async fn dequeue_if_head(&self, id: PassengerId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.dequeue_if_head(id);
        if removed {
            self.commit(&state);
        }
        removed
    }

    pub async fn leave_queue(&self, id: PassengerId) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.leave_queue(id);
        if removed {
            self.commit(&state);
        }
        removed
    }

    // ---- admission and exit --------------------------------------------

    /// Admits `id` if boarding is open, a seat is free and (with fairness)
    /// `id` heads the line. A rejected request returns `false` and changes
    /// nothing; the caller retries on its own schedule.
    ///
    /// Under the admission-counting discipline the call first waits for a
    /// free seat and then for the boarding gate; it returns `false` only
    /// once admission has become impossible.
    pub async fn request_board(&self, id: PassengerId) -> bool {
        match self.settings.discipline {
            Discipline::AdmissionCounting => self.board_with_seat(id).await,
            Discipline::Blocking | Discipline::Polling => {
                let mut state = self.state.lock().await;
                self.board_locked(&mut state, id)
            }
        }
    }

    fn board_locked(&self, state: &mut CarState, id: PassengerId) -> bool {
        match state.board(id) {
            BoardOutcome::Boarded { onboard, filled } => {
                self.events.boarded(id, onboard);
                if filled {
                    debug!(car = %self.id, "car is full");
                    self.became_full.notify_waiters();
                }
                self.commit(state);
                true
            }
            BoardOutcome::Rejected(reason) => {
                debug!(car = %self.id, passenger = %id, %reason, "boarding rejected");
                false
            }
        }
    }

    async fn board_with_seat(&self, id: PassengerId) -> bool {
        if self.state.lock().await.is_onboard(id) {
            return false;
        }
        let seat = match self.seats.acquire().await {
            Ok(seat) => seat,
            Err(_) => return false,
        };

        let mut changes = self.changes.subscribe();
        loop {
            changes.borrow_and_update();
            {
                let mut state = self.state.lock().await;
                if state.phase().is_boarding_open() {
                    let admitted = self.board_locked(&mut state, id);
                    if admitted {
                        // The seat is given back by `request_unboard`.
                        seat.forget();
                    }
                    return admitted;
                }
                if !state.is_operating() || state.phase().is_closed() {
                    return false;
                }
            }
            if changes.changed().await.is_err() {
                return false;
            }
        }
    }

    /// Lets `id` off the car if the unboarding gate is open and `id` is on
    /// board. Emptying the car returns it to idle, or closes it when the
    /// ride budget is spent.
    pub async fn request_unboard(&self, id: PassengerId) -> bool {
        let mut state = self.state.lock().await;
        match state.unboard(id) {
            UnboardOutcome::Disembarked { remaining, closed } => {
                self.events.disembarked(id, remaining);
                if self.settings.discipline == Discipline::AdmissionCounting {
                    self.seats.add_permits(1);
                }
                if remaining == 0 {
                    debug!(car = %self.id, "car is empty");
                    self.became_empty.notify_waiters();
                }
                if closed {
                    self.shut_down(&state);
                }
                self.commit(&state);
                true
            }
            UnboardOutcome::Rejected(reason) => {
                debug!(car = %self.id, passenger = %id, %reason, "unboarding rejected");
                false
            }
        }
    }

    // ---- controller transitions ----------------------------------------

    pub async fn open_boarding(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.open_boarding() {
            return false;
        }
        self.events.boarding_opened(state.total_rides() + 1);
        self.commit(&state);
        true
    }

    pub async fn open_unboarding(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.open_unboarding() {
            return false;
        }
        self.events.unboarding_opened(state.total_rides());
        self.commit(&state);
        true
    }

    /// Closes an idle car that has no rides left.
    pub async fn close(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.close() {
            return false;
        }
        self.shut_down(&state);
        self.commit(&state);
        true
    }

    /// Dispatches a full, ready car for one ride.
    ///
    /// The lock is released for the duration of the ride. If the delay is
    /// interrupted the ride ends early but still counts, and the car always
    /// comes back to the platform with its unboarding gate closed.
    pub async fn run_ride(&self, delay: &dyn DelayProvider) -> RideOutcome {
        let interrupt = self.ride_interrupt.notified();
        tokio::pin!(interrupt);

        let ride = {
            let mut state = self.state.lock().await;
            let Some(ride) = state.start_ride() else {
                return RideOutcome::NotReady;
            };
            interrupt.as_mut().enable();
            self.events.ride_started(ride, state.passengers());
            self.commit(&state);
            ride
        };

        let duration = delay.next_delay();
        debug!(car = %self.id, ride, ?duration, "ride started");
        let outcome = tokio::select! {
            _ = tokio::time::sleep(duration) => RideOutcome::Completed,
            _ = &mut interrupt => {
                warn!(car = %self.id, ride, "ride interrupted, ending it early");
                RideOutcome::Interrupted
            }
        };

        let mut state = self.state.lock().await;
        if state.finish_ride(outcome).is_some() {
            self.events.ride_ended(ride, outcome);
            self.commit(&state);
        }
        outcome
    }

    /// Cuts the current ride short. Returns `false` when no ride is running.
    pub async fn interrupt_ride(&self) -> bool {
        let state = self.state.lock().await;
        if state.phase().is_moving() {
            self.ride_interrupt.notify_waiters();
            true
        } else {
            false
        }
    }

    // ---- waiting -------------------------------------------------------

    /// Suspends until the car is full or boarding is no longer open.
    pub async fn wait_until_full(&self) {
        self.wait_on(&self.became_full, |state| {
            state.is_full() || !state.phase().is_boarding_open()
        })
        .await
    }

    /// Suspends until nobody is aboard.
    pub async fn wait_until_empty(&self) {
        self.wait_on(&self.became_empty, CarState::is_empty).await
    }

    async fn wait_on<F>(&self, condition: &Notify, done: F)
    where
        F: Fn(&CarState) -> bool,
    {
        loop {
            let notified = condition.notified();
            tokio::pin!(notified);
            // Register before checking so a signal sent after the check
            // cannot be missed.
            notified.as_mut().enable();
            let satisfied = {
                let state = self.state.lock().await;
                done(&state)
            };
            if satisfied {
                return;
            }
            notified.await;
        }
    }

    // ---- queries -------------------------------------------------------

    pub async fn snapshot(&self) -> CarSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase()
    }

    pub async fn is_full(&self) -> bool {
        self.state.lock().await.is_full()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    pub async fn is_operating(&self) -> bool {
        self.state.lock().await.is_operating()
    }

    pub async fn is_onboard(&self, id: PassengerId) -> bool {
        self.state.lock().await.is_onboard(id)
    }

    pub async fn is_in_line(&self, id: PassengerId) -> bool {
        self.state.lock().await.is_in_line(id)
    }

    pub async fn next_passenger(&self) -> Option<PassengerId> {
        self.state.lock().await.next_passenger()
    }

    pub async fn line_is_empty(&self) -> bool {
        self.state.lock().await.line_is_empty()
    }

    pub async fn total_rides(&self) -> u32 {
        self.state.lock().await.total_rides()
    }

    pub async fn ride_history(&self) -> Vec<RideRecord> {
        self.state.lock().await.history().to_vec()
    }

    pub async fn boarding_order(&self) -> Vec<PassengerId> {
        self.state.lock().await.boarding_order().to_vec()
    }

    /// Re-checks every car invariant.
    pub async fn verify(&self) -> DomainResult<()> {
        self.state
            .lock()
            .await
            .check_invariants()
            .map_err(|violation| DomainError::InvariantViolated(violation.to_string()))
    }
}
