//! Device models composing a simulated building.

/// Residential base-load profile generator.
pub mod baseload;
/// Stationary battery storage model.
pub mod battery;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use battery::Battery;
pub use solar::SolarPv;
pub use types::Device;
pub use types::DeviceContext;
