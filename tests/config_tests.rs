use rollercoaster_app::common::DomainError;
use rollercoaster_app::config::{Config, DelayRange};
use rollercoaster_app::domains::car::{CarSettings, Discipline};
use std::io::Write;

#[test]
fn test_defaults_are_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.car.capacity, 4);
    assert_eq!(config.car.discipline, Discipline::Blocking);
    assert!(config.car.fairness);

    let settings = CarSettings::from(&config.car);
    assert_eq!(settings.capacity, 4);
    assert_eq!(settings.max_rides, 4);
}

#[test]
fn test_validation_errors() {
    let mut config = Config::default();
    config.car.capacity = 0;
    assert!(matches!(
        config.validate(),
        Err(DomainError::InvalidConfiguration { .. })
    ));

    let mut config = Config::default();
    config.simulation.passenger_count = 2;
    assert!(config.validate().is_err());
    config.car.max_rides = 0;
    assert!(config.validate().is_ok(), "no rides needs no riders");

    let mut config = Config::default();
    config.simulation.walk_time_ms = DelayRange::new(10, 5);
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.car.discipline = Discipline::Polling;
    config.simulation.poll_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.logging.level = "chatty".to_string();
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_from_file_keeps_defaults_for_missing_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[car]
capacity = 2
discipline = "admission-counting"

[simulation]
passenger_count = 3
ride_time_ms = {{ min = 5, max = 10 }}
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).await.unwrap();
    assert_eq!(config.car.capacity, 2);
    assert_eq!(config.car.discipline, Discipline::AdmissionCounting);
    assert_eq!(config.car.max_rides, 4);
    assert_eq!(config.simulation.passenger_count, 3);
    assert_eq!(config.simulation.ride_time_ms, DelayRange::new(5, 10));
    assert_eq!(config.simulation.walk_time_ms, DelayRange::new(1_000, 5_000));
    assert!(config.validate().is_ok());
}

#[tokio::test]
async fn test_from_file_rejects_unknown_discipline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[car]\ndiscipline = \"telepathy\"").unwrap();
    assert!(Config::from_file(file.path()).await.is_err());
}

#[test]
fn test_load_layers_file_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coaster.toml");
    std::fs::write(&path, "[car]\nmax_rides = 9\nfairness = false\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.car.max_rides, 9);
    assert!(!config.car.fairness);
    assert_eq!(config.car.capacity, 4);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_without_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(dir.path().join("missing.toml")).unwrap();
    assert_eq!(config.car, Config::default().car);
}
