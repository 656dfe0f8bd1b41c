//! Receding-horizon control loop and battery state tracking.

pub mod driver;
/// Battery state-of-charge derivation from observations.
pub mod soc;

pub use driver::{ControlLoopDriver, ControlObserver, SolveTimer, StepRecord};
pub use soc::{SOC_OBSERVATION_INDEX, SOC_OBSERVATION_NAME, SocTracker};
