pub mod combat_state;
mod handler;
mod processor;
mod signal;

pub use combat_state::{DEFAULT_INACTIVITY_THRESHOLD, advance_combat_state, tick_combat_state};
pub use handler::SignalHandler;
pub use processor::EventProcessor;
pub use signal::GameSignal;
