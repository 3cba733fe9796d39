use super::controller::CarController;
use crate::adapters::outbound::{spawn_event_journal, RandomDelay};
use crate::common::{ApplicationResult, DomainResult};
use crate::config::Config;
use crate::domains::car::{
    Car, CarEvent, CarSettings, DelayProvider, Discipline, EventPublisher, PassengerId, RideRecord,
};
use crate::domains::logger::DynLogger;
use crate::domains::passenger::{PassengerAgent, PassengerSummary};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub car_id: String,
    pub discipline: Discipline,
    pub total_rides: u32,
    pub rides: Vec<RideRecord>,
    pub boarding_order: Vec<PassengerId>,
    pub passengers: Vec<PassengerSummary>,
    pub events: Vec<CarEvent>,
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Rides taken by `id`.
    pub fn rides_of(&self, id: PassengerId) -> u32 {
        self.passengers
            .iter()
            .find(|p| p.id == id)
            .map_or(0, |p| p.rides)
    }

    /// Passengers that rode at least once.
    pub fn riders(&self) -> usize {
        self.passengers.iter().filter(|p| p.rides > 0).count()
    }
}

/// One complete run: a car, its passengers and the controller.
pub struct Simulation {
    config: Config,
    logger: DynLogger,
    ride_time: Arc<dyn DelayProvider>,
    walk_time: Arc<dyn DelayProvider>,
}

impl Simulation {
    pub fn new(config: Config, logger: DynLogger) -> DomainResult<Self> {
        config.validate()?;
        let seed = config.simulation.seed;
        let ride_time = Arc::new(RandomDelay::new(config.simulation.ride_time_ms, seed));
        let walk_time = Arc::new(RandomDelay::new(
            config.simulation.walk_time_ms,
            seed.map(|s| s.wrapping_add(1)),
        ));
        Ok(Self {
            config,
            logger,
            ride_time,
            walk_time,
        })
    }

    /// Replaces the configured delay generators.
    pub fn with_delays(
        mut self,
        ride_time: Arc<dyn DelayProvider>,
        walk_time: Arc<dyn DelayProvider>,
    ) -> Self {
        self.ride_time = ride_time;
        self.walk_time = walk_time;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> ApplicationResult<SimulationReport> {
        let started = Instant::now();
        let settings = CarSettings::from(&self.config.car);
        let passenger_count = self.config.simulation.passenger_count;
        let poll_interval = Duration::from_millis(self.config.simulation.poll_interval_ms);

        let car_id = format!("car-{}", Uuid::new_v4());
        let (sender, receiver) = mpsc::unbounded_channel();
        let journal = spawn_event_journal(
            receiver,
            self.config.logging.journal.then(|| self.logger.clone()),
        );
        let car = Arc::new(Car::new(settings, EventPublisher::new(car_id.clone(), sender)));

        info!(
            car = %car_id,
            capacity = settings.capacity,
            max_rides = settings.max_rides,
            passengers = passenger_count,
            discipline = %settings.discipline,
            fairness = settings.fairness,
            "simulation starting"
        );
        self.logger.info(&format!(
            "Car opens: {} seats, {} rides, {} passengers, {} discipline{}",
            settings.capacity,
            settings.max_rides,
            passenger_count,
            settings.discipline,
            if settings.fairness { ", first come first served" } else { "" },
        ));

        let mut agents = JoinSet::new();
        for n in 1..=passenger_count {
            let agent = PassengerAgent::new(
                PassengerId(n as u32),
                car.clone(),
                self.walk_time.clone(),
                self.logger.clone(),
                poll_interval,
            );
            agents.spawn(agent.run());
        }

        let controller = CarController::new(
            car.clone(),
            self.ride_time.clone(),
            self.logger.clone(),
            poll_interval,
        );
        let total_rides = controller.run().await;
        drop(controller);

        let mut passengers = Vec::with_capacity(passenger_count);
        while let Some(joined) = agents.join_next().await {
            passengers.push(joined?);
        }
        passengers.sort_by_key(|p| p.id);

        car.verify().await?;
        let rides = car.ride_history().await;
        let boarding_order = car.boarding_order().await;
        // Last publisher gone: the journal drains and finishes.
        drop(car);
        let events = journal.await?;

        let elapsed = started.elapsed();
        info!(car = %car_id, total_rides, ?elapsed, "simulation finished");
        Ok(SimulationReport {
            car_id,
            discipline: settings.discipline,
            total_rides,
            rides,
            boarding_order,
            passengers,
            events,
            elapsed,
        })
    }
}
