use std::time::Duration;

/// Port for the stochastic delays the simulation needs (ride length, walk
/// in the park). Adapters decide where the numbers come from.
pub trait DelayProvider: Send + Sync + 'static {
    fn next_delay(&self) -> Duration;
}
