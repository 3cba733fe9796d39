use rollercoaster_app::adapters::outbound::init_logger;
use rollercoaster_app::application::Simulation;
use rollercoaster_app::Config;
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "coaster.toml".to_string());
    let config = Config::load(&path)?;
    info!(path = %path, "configuration loaded");

    let logger = init_logger(&config.logging);
    let simulation = Simulation::new(config, logger.clone())?;
    let report = simulation.run().await?;

    logger.info(&format!(
        "{} rides in {:.1?}; {} of {} passengers rode",
        report.total_rides,
        report.elapsed,
        report.riders(),
        report.passengers.len()
    ));
    for ride in &report.rides {
        let names: Vec<String> = ride.passengers.iter().map(|p| p.0.to_string()).collect();
        logger.info(&format!("  ride {}: [{}] {:?}", ride.number, names.join(", "), ride.outcome));
    }

    Ok(())
}
