pub mod car;
pub mod logger;
pub mod passenger;

pub use car::*;
pub use logger::*;
pub use passenger::*;
