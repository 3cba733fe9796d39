use crate::domains::car::{Car, DelayProvider, Discipline, RideOutcome};
use crate::domains::logger::DynLogger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// The single transition the controller took in one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStep {
    Close,
    Unload,
    Load,
    Run(RideOutcome),
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Full,
    Empty,
    Change,
}

/// Drives the car through open-for-boarding, ride, open-for-unboarding until
/// the ride budget is spent and the car is empty.
pub struct CarController {
    car: Arc<Car>,
    ride_time: Arc<dyn DelayProvider>,
    logger: DynLogger,
    poll_interval: Duration,
}

impl CarController {
    pub fn new(
        car: Arc<Car>,
        ride_time: Arc<dyn DelayProvider>,
        logger: DynLogger,
        poll_interval: Duration,
    ) -> Self {
        Self {
            car,
            ride_time,
            logger,
            poll_interval,
        }
    }

    /// Runs to the Close transition and returns the number of rides run.
    pub async fn run(&self) -> u32 {
        let mut changes = self.car.subscribe();
        loop {
            changes.borrow_and_update();
            match self.step().await {
                ControllerStep::Close => break,
                ControllerStep::Load => self.settle(Settle::Full, &mut changes).await,
                ControllerStep::Unload => self.settle(Settle::Empty, &mut changes).await,
                ControllerStep::Run(_) => {}
                ControllerStep::Wait => self.settle(Settle::Change, &mut changes).await,
            }
        }
        self.car.total_rides().await
    }

    /// Decides and performs at most one transition, checked in the order
    /// Close, Unload, Load, Run against a single snapshot.
    pub async fn step(&self) -> ControllerStep {
        let view = self.car.snapshot().await;
        let gates_closed = !view.is_boarding_open() && !view.is_unboarding_open();

        if !view.is_operating() && view.is_empty() {
            // Already closed by the last passenger off, or closing an idle car.
            self.car.close().await;
            return ControllerStep::Close;
        }
        if view.is_stopped() && view.is_full() && !view.is_ready() && gates_closed
            && self.car.open_unboarding().await
        {
            return ControllerStep::Unload;
        }
        if view.is_operating() && view.is_stopped() && !view.is_ready() && gates_closed
            && self.car.open_boarding().await
        {
            return ControllerStep::Load;
        }
        if view.is_stopped() && view.is_full() && view.is_ready() && !view.is_unboarding_open() {
            let outcome = self.car.run_ride(self.ride_time.as_ref()).await;
            return ControllerStep::Run(outcome);
        }
        ControllerStep::Wait
    }

    async fn settle(&self, target: Settle, changes: &mut watch::Receiver<u64>) {
        match (self.car.discipline(), target) {
            (Discipline::Blocking, Settle::Full) => {
                self.logger.info("Waiting for the car to be full");
                self.car.wait_until_full().await;
                debug!(car = %self.car.id(), "done waiting for a full car");
            }
            (Discipline::Blocking, Settle::Empty) => {
                self.logger.info("Waiting for the car to be empty");
                self.car.wait_until_empty().await;
                debug!(car = %self.car.id(), "done waiting for an empty car");
            }
            (Discipline::Polling, _) => tokio::time::sleep(self.poll_interval).await,
            (Discipline::Blocking, Settle::Change) | (Discipline::AdmissionCounting, _) => {
                let _ = changes.changed().await;
            }
        }
    }
}
