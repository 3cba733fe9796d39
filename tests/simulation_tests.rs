use rollercoaster_app::adapters::outbound::{init_noop_logger, FixedDelay, MemoryLogger};
use rollercoaster_app::application::{Simulation, SimulationReport};
use rollercoaster_app::config::{Config, DelayRange};
use rollercoaster_app::domains::car::{CarEvent, Discipline, PassengerId, RideOutcome};
use rollercoaster_app::domains::logger::DomainLogger;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

const DISCIPLINES: [Discipline; 3] = [
    Discipline::Blocking,
    Discipline::AdmissionCounting,
    Discipline::Polling,
];

fn config(capacity: usize, max_rides: u32, passengers: usize, fairness: bool, discipline: Discipline) -> Config {
    let mut config = Config::default();
    config.car.capacity = capacity;
    config.car.max_rides = max_rides;
    config.car.fairness = fairness;
    config.car.discipline = discipline;
    config.simulation.passenger_count = passengers;
    config.simulation.poll_interval_ms = 1;
    config.simulation.ride_time_ms = DelayRange::fixed(5);
    config.simulation.walk_time_ms = DelayRange::fixed(2);
    config
}

async fn run(config: Config) -> SimulationReport {
    let simulation = Simulation::new(config, init_noop_logger()).expect("valid configuration");
    tokio::time::timeout(Duration::from_secs(20), simulation.run())
        .await
        .expect("simulation should terminate")
        .expect("simulation should succeed")
}

/// Checks what every finished run must satisfy, whatever the interleaving.
fn assert_consistent(report: &SimulationReport, capacity: usize, max_rides: u32) {
    assert_eq!(report.total_rides, max_rides);
    assert_eq!(report.rides.len(), max_rides as usize);

    for (n, ride) in report.rides.iter().enumerate() {
        assert_eq!(ride.number as usize, n + 1);
        assert_eq!(ride.outcome, RideOutcome::Completed);
        assert_eq!(ride.passengers.len(), capacity);
        let distinct: HashSet<_> = ride.passengers.iter().collect();
        assert_eq!(distinct.len(), capacity);
    }

    let boardings: u32 = report.passengers.iter().map(|p| p.rides).sum();
    assert_eq!(boardings as usize, capacity * max_rides as usize);
    assert_eq!(report.boarding_order.len(), boardings as usize);

    let mut aboard = 0usize;
    for event in &report.events {
        match event {
            CarEvent::PassengerBoarded { .. } => aboard += 1,
            CarEvent::PassengerDisembarked { .. } => aboard -= 1,
            CarEvent::RideStarted { passengers, .. } => assert_eq!(passengers.len(), capacity),
            _ => {}
        }
        assert!(aboard <= capacity);
    }
    assert_eq!(aboard, 0);
    assert_closed_once(report);
}

/// The car closes exactly once; afterwards only passengers finishing their
/// own walk and leaving the park show up in the stream.
fn assert_closed_once(report: &SimulationReport) {
    let closed: Vec<usize> = report
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, CarEvent::CarClosed { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(closed.len(), 1, "car closed {} times", closed.len());

    for event in &report.events[closed[0] + 1..] {
        assert!(
            matches!(
                event,
                CarEvent::PassengerLeft { .. }
                    | CarEvent::PassengerReturned { .. }
                    | CarEvent::PassengerWalking { .. }
            ),
            "{} after the car closed",
            event
        );
    }
}

/// Replays the line from the event stream: every boarding must be by the
/// passenger that queued earliest.
fn assert_first_come_first_served(report: &SimulationReport) {
    let mut line: VecDeque<PassengerId> = VecDeque::new();
    for event in &report.events {
        match event {
            CarEvent::PassengerQueued { passenger, .. } => line.push_back(*passenger),
            CarEvent::PassengerBoarded { passenger, .. } => {
                assert_eq!(line.pop_front(), Some(*passenger), "{} jumped the line", passenger)
            }
            _ => {}
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_ride_fills_car_once() {
    for discipline in DISCIPLINES {
        let report = run(config(4, 1, 4, false, discipline)).await;
        assert_consistent(&report, 4, 1);
        for id in 1..=4 {
            assert_eq!(report.rides_of(PassengerId(id)), 1, "{:?}", discipline);
        }
        let disembarked = report
            .events
            .iter()
            .filter(|e| matches!(e, CarEvent::PassengerDisembarked { .. }))
            .count();
        assert_eq!(disembarked, 4);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_four_rides_five_passengers() {
    for discipline in DISCIPLINES {
        let report = run(config(4, 4, 5, true, discipline)).await;
        assert_consistent(&report, 4, 4);
        assert_first_come_first_served(&report);
        // Whoever missed the first ride heads the line for the second.
        let first: HashSet<_> = report.rides[0].passengers.iter().collect();
        let missed = (1..=5)
            .map(PassengerId)
            .find(|p| !first.contains(p))
            .expect("one passenger waits");
        assert!(report.rides[1].passengers.contains(&missed), "{:?}", discipline);
        assert_eq!(report.riders(), 5);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_terminates_under_every_discipline() {
    for discipline in DISCIPLINES {
        for fairness in [false, true] {
            let report = run(config(3, 5, 7, fairness, discipline)).await;
            assert_consistent(&report, 3, 5);
            if fairness {
                assert_first_come_first_served(&report);
            }
            let left = report
                .events
                .iter()
                .filter(|e| matches!(e, CarEvent::PassengerLeft { .. }))
                .count();
            assert_eq!(left, 7);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_rides_closes_immediately() {
    let report = run(config(4, 0, 2, true, Discipline::Blocking)).await;
    assert_eq!(report.total_rides, 0);
    assert!(report.rides.is_empty());
    assert_eq!(report.riders(), 0);
    assert_eq!(report.passengers.len(), 2);
    assert_closed_once(&report);
    // Nobody can ride, so passengers may leave before or after the close.
    let left = report
        .events
        .iter()
        .filter(|e| matches!(e, CarEvent::PassengerLeft { .. }))
        .count();
    assert_eq!(left, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_narrative_log_and_injected_delays() {
    let memory = MemoryLogger::new();
    let simulation = Simulation::new(
        config(2, 2, 3, true, Discipline::Blocking),
        memory.clone() as Arc<dyn DomainLogger>,
    )
    .unwrap()
    .with_delays(Arc::new(FixedDelay::millis(1)), Arc::new(FixedDelay::millis(1)));

    let report = tokio::time::timeout(Duration::from_secs(20), simulation.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.total_rides, 2);
    assert!(report.car_id.starts_with("car-"));
    assert!(memory.contains("Car opens: 2 seats, 2 rides, 3 passengers"));
    assert!(memory.contains("Passenger 3 arrives at the park."));
    assert!(memory.contains("The car closed after 2 rides."));
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut config = config(0, 1, 4, false, Discipline::Blocking);
    assert!(Simulation::new(config.clone(), init_noop_logger()).is_err());

    config.car.capacity = 5;
    assert!(Simulation::new(config, init_noop_logger()).is_err());
}
