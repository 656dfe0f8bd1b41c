//! Receding-horizon design evaluation for building districts.
//!
//! A candidate sizing of batteries and solar is turned into a schema, the
//! district is simulated under receding-horizon battery control, and the
//! resulting energy series are reduced to a scalar cost and its breakdown.

pub mod config;
/// Control loop and state-of-charge tracking.
pub mod control;
pub mod design;
pub mod devices;
pub mod env;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod logging;
pub mod objective;
pub mod planner;
pub mod pricing;
pub mod schema;
/// Reference district environment.
pub mod sim;
