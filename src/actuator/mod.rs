//! Vent actuator: servo state machine and the simulated driver used when no
//! hardware is attached.

pub mod state;
pub mod vent;

pub use state::{VentState, VentStateMachine};
pub use vent::SimulatedVent;
