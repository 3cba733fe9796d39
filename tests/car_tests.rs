use rollercoaster_app::adapters::outbound::FixedDelay;
use rollercoaster_app::common::DomainEvent;
use rollercoaster_app::domains::car::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_test::{assert_pending, assert_ready_eq};

const P1: PassengerId = PassengerId(1);
const P2: PassengerId = PassengerId(2);
const P3: PassengerId = PassengerId(3);

fn car(capacity: usize, max_rides: u32, fairness: bool, discipline: Discipline) -> Arc<Car> {
    Arc::new(Car::new(
        CarSettings {
            capacity,
            max_rides,
            fairness,
            discipline,
        },
        EventPublisher::disabled("test-car"),
    ))
}

async fn ride_and_open_gate(car: &Car) {
    assert_eq!(car.run_ride(&FixedDelay::millis(1)).await, RideOutcome::Completed);
    assert!(car.open_unboarding().await);
}

#[tokio::test]
async fn test_boarding_requires_open_gate() {
    let car = car(2, 1, false, Discipline::Blocking);

    assert!(!car.request_board(P1).await);
    assert!(car.open_boarding().await);
    assert!(car.request_board(P1).await);
    assert!(!car.request_board(P1).await, "same passenger cannot take two seats");
    assert_eq!(car.phase().await, Phase::Boarding);

    assert!(car.request_board(P2).await);
    assert_eq!(car.phase().await, Phase::Ready);
    assert!(car.is_full().await);
    assert!(!car.request_board(P3).await);
    assert!(car.verify().await.is_ok());
}

#[tokio::test]
async fn test_unboarding_is_idempotent() {
    let car = car(1, 2, false, Discipline::Blocking);
    car.open_boarding().await;
    car.request_board(P1).await;
    assert!(!car.request_unboard(P1).await, "gate still closed");

    ride_and_open_gate(&car).await;
    assert!(car.request_unboard(P1).await);
    let before = car.snapshot().await;
    assert!(!car.request_unboard(P1).await);
    assert_eq!(car.snapshot().await, before);
    assert_eq!(before.phase, Phase::Idle);
}

#[tokio::test]
async fn test_gates_follow_the_ride_cycle() {
    let car = car(1, 1, false, Discipline::Polling);

    assert!(!car.open_unboarding().await);
    assert_eq!(car.run_ride(&FixedDelay::millis(1)).await, RideOutcome::NotReady);
    assert!(car.open_boarding().await);
    assert!(!car.open_boarding().await);
    car.request_board(P1).await;

    assert_eq!(car.run_ride(&FixedDelay::millis(1)).await, RideOutcome::Completed);
    assert_eq!(car.phase().await, Phase::Unboarding { gate_open: false });
    assert!(!car.is_operating().await);
    assert!(!car.open_boarding().await);
    assert!(car.open_unboarding().await);

    assert!(car.request_unboard(P1).await);
    assert_eq!(car.phase().await, Phase::Closed);
    assert!(car.is_empty().await);
    assert_eq!(car.total_rides().await, 1);
}

#[tokio::test]
async fn test_fairness_boards_in_arrival_order() {
    let car = car(1, 3, true, Discipline::Blocking);
    for id in [P3, P1, P2] {
        assert!(car.enqueue(id).await);
    }
    assert!(!car.enqueue(P1).await, "no double places in line");
    assert_eq!(car.next_passenger().await, Some(P3));

    for expected in [P3, P1, P2] {
        assert!(car.open_boarding().await);
        for other in [P1, P2, P3].into_iter().filter(|p| *p != expected) {
            assert!(!car.request_board(other).await);
        }
        assert!(car.request_board(expected).await);
        assert!(!car.is_in_line(expected).await);
        ride_and_open_gate(&car).await;
        assert!(car.request_unboard(expected).await);
    }

    assert_eq!(car.boarding_order().await, vec![P3, P1, P2]);
    assert!(car.line_is_empty().await);
    assert_eq!(car.phase().await, Phase::Closed);
}

#[tokio::test]
async fn test_dequeue_if_head_and_leave_queue() {
    let car = car(2, 1, true, Discipline::Blocking);
    car.enqueue(P1).await;
    car.enqueue(P2).await;
    car.enqueue(P3).await;

    assert!(!car.dequeue_if_head(P2).await);
    assert!(car.dequeue_if_head(P1).await);
    assert!(car.leave_queue(P3).await);
    assert!(!car.leave_queue(P3).await);
    assert_eq!(car.snapshot().await.waiting, vec![P2]);
}

#[tokio::test]
async fn test_admission_counting_admits_one_and_holds_the_other() {
    let car = car(1, 2, false, Discipline::AdmissionCounting);
    assert!(car.open_boarding().await);

    let mut first = tokio_test::task::spawn(car.request_board(P1));
    let mut second = tokio_test::task::spawn(car.request_board(P2));
    assert_ready_eq!(first.poll(), true);
    assert_pending!(second.poll());

    ride_and_open_gate(&car).await;
    assert_pending!(second.poll());
    assert!(car.request_unboard(P1).await);

    // Holding the freed seat, waiting for the next boarding call.
    assert_pending!(second.poll());
    assert!(car.open_boarding().await);
    assert_ready_eq!(second.poll(), true);
    assert_eq!(car.boarding_order().await, vec![P1, P2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_admission_counting_never_double_books() {
    let car = car(1, 1, false, Discipline::AdmissionCounting);
    car.open_boarding().await;

    let a = tokio::spawn({
        let car = car.clone();
        async move { car.request_board(P1).await }
    });
    let b = tokio::spawn({
        let car = car.clone();
        async move { car.request_board(P2).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let finished: Vec<bool> = [a.is_finished(), b.is_finished()].into();
    assert_eq!(finished.iter().filter(|f| **f).count(), 1);
    assert_eq!(car.snapshot().await.onboard.len(), 1);

    // Last ride: once it is over the waiting boarder is turned away.
    ride_and_open_gate(&car).await;
    let rider = car.snapshot().await.onboard[0];
    assert!(car.request_unboard(rider).await);

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert!(a ^ b);
    assert_eq!(car.phase().await, Phase::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ride_interrupt_ends_ride_early() {
    let car = car(1, 1, false, Discipline::Blocking);
    car.open_boarding().await;
    car.request_board(P1).await;

    let ride = tokio::spawn({
        let car = car.clone();
        async move { car.run_ride(&FixedDelay(Duration::from_secs(30))).await }
    });
    while car.phase().await != Phase::Running {
        tokio::task::yield_now().await;
    }
    assert!(car.interrupt_ride().await);

    let outcome = tokio::time::timeout(Duration::from_secs(5), ride)
        .await
        .expect("interrupted ride should end promptly")
        .unwrap();
    assert_eq!(outcome, RideOutcome::Interrupted);
    assert_eq!(car.phase().await, Phase::Unboarding { gate_open: false });
    assert_eq!(car.ride_history().await[0].outcome, RideOutcome::Interrupted);
    assert!(!car.interrupt_ride().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_until_full_and_empty_wake_up() {
    let car = car(2, 2, false, Discipline::Blocking);
    car.open_boarding().await;

    let waiter = tokio::spawn({
        let car = car.clone();
        async move { car.wait_until_full().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());
    car.request_board(P1).await;
    car.request_board(P2).await;
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("full car should wake the waiter")
        .unwrap();

    ride_and_open_gate(&car).await;
    let waiter = tokio::spawn({
        let car = car.clone();
        async move { car.wait_until_empty().await }
    });
    car.request_unboard(P1).await;
    car.request_unboard(P2).await;
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("empty car should wake the waiter")
        .unwrap();
}

#[tokio::test]
async fn test_events_follow_transitions() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let car = Car::new(
        CarSettings {
            capacity: 1,
            max_rides: 1,
            fairness: true,
            discipline: Discipline::Blocking,
        },
        EventPublisher::new("car-events", tx),
    );
    car.enqueue(P1).await;
    car.open_boarding().await;
    car.request_board(P1).await;
    car.run_ride(&FixedDelay::millis(1)).await;
    car.open_unboarding().await;
    car.request_unboard(P1).await;
    drop(car);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        assert_eq!(event.aggregate_id(), "car-events");
        kinds.push(event.event_type());
    }
    assert_eq!(
        kinds,
        vec![
            "PassengerQueued",
            "BoardingOpened",
            "PassengerBoarded",
            "RideStarted",
            "RideEnded",
            "UnboardingOpened",
            "PassengerDisembarked",
            "CarClosed",
        ]
    );
}

#[tokio::test]
async fn test_walking_event_saturates_long_walks() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let events = EventPublisher::new("walks", tx);
    events.walking(P1, Duration::from_millis(1_500));
    events.walking(P2, Duration::MAX);
    drop(events);

    let mut walks = Vec::new();
    while let Some(event) = rx.recv().await {
        if let CarEvent::PassengerWalking { passenger, duration_ms, .. } = event {
            walks.push((passenger, duration_ms));
        }
    }
    assert_eq!(walks, vec![(P1, 1_500), (P2, u64::MAX)]);
}
