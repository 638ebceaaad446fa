//! Transfer module
//!
//! Data connections and the per-session transmission state machine.

pub mod data_channel;
pub mod transmission;

pub use data_channel::{close_passive_listener, establish, open_passive_listener, passive_port};
pub use transmission::{StepOutcome, Transmission, close, open, step};
