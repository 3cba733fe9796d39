pub mod events;
pub mod phase;
pub mod ports;
pub mod queue;
pub mod state;
pub mod sync_core;

pub use events::*;
pub use phase::*;
pub use ports::*;
pub use queue::*;
pub use state::*;
pub use sync_core::*;
