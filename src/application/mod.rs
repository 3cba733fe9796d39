pub mod controller;
pub mod simulation;

pub use controller::*;
pub use simulation::*;
