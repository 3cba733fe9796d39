use crate::common::{DomainError, DomainResult};
use crate::domains::car::{CarSettings, Discipline};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables overriding file settings, e.g.
/// `COASTER__CAR__CAPACITY=6`.
pub const ENV_PREFIX: &str = "COASTER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub car: CarConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub capacity: usize,
    pub max_rides: u32,
    pub fairness: bool,
    pub discipline: Discipline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub passenger_count: usize,
    pub poll_interval_ms: u64,
    pub ride_time_ms: DelayRange,
    pub walk_time_ms: DelayRange,
    /// Seed for the delay generators; random when absent.
    pub seed: Option<u64>,
}

/// Inclusive range of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Also write the narrative log to this file.
    pub file: Option<String>,
    /// Buffer narrative lines through a background task when non-zero.
    pub buffer_capacity: usize,
    /// Log every car event as it happens.
    pub journal: bool,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, overlaid by the TOML file at `path` if it exists, overlaid by
    /// `COASTER__*` environment variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?)
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.car.capacity == 0 {
            return Err(invalid("car.capacity must be at least 1"));
        }
        if self.car.max_rides > 0 && self.simulation.passenger_count < self.car.capacity {
            return Err(invalid(format!(
                "{} passengers can never fill a car of capacity {}",
                self.simulation.passenger_count, self.car.capacity
            )));
        }
        if self.car.discipline == Discipline::Polling && self.simulation.poll_interval_ms == 0 {
            return Err(invalid("simulation.poll_interval_ms must be positive when polling"));
        }
        self.simulation.ride_time_ms.check("simulation.ride_time_ms")?;
        self.simulation.walk_time_ms.check("simulation.walk_time_ms")?;
        self.logging
            .level
            .parse::<log::LevelFilter>()
            .map_err(|_| invalid(format!("unknown log level '{}'", self.logging.level)))?;
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> DomainError {
    DomainError::InvalidConfiguration {
        reason: reason.into(),
    }
}

impl DelayRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn fixed(ms: u64) -> Self {
        Self { min: ms, max: ms }
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (Duration::from_millis(self.min), Duration::from_millis(self.max))
    }

    fn check(&self, name: &str) -> DomainResult<()> {
        if self.min > self.max {
            return Err(invalid(format!(
                "{}: min {} is greater than max {}",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<&CarConfig> for CarSettings {
    fn from(config: &CarConfig) -> Self {
        CarSettings {
            capacity: config.capacity,
            max_rides: config.max_rides,
            fairness: config.fairness,
            discipline: config.discipline,
        }
    }
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            max_rides: 4,
            fairness: true,
            discipline: Discipline::Blocking,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            passenger_count: 10,
            poll_interval_ms: 50,
            ride_time_ms: DelayRange::new(1_000, 4_000),
            walk_time_ms: DelayRange::new(1_000, 5_000),
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            buffer_capacity: 0,
            journal: true,
        }
    }
}
