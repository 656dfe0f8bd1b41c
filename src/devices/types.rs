//! Common types and traits for device simulation components.

use rand::{Rng, rngs::StdRng};

/// Contextual information passed to devices during power calculations.
/// Includes the current timestep and optional setpoints for controllable devices.
/// # Fields
/// * `timestep` - Current simulation timestep
/// * `setpoint_kw` - Optional power setpoint for controllable devices (kW)
pub struct DeviceContext {
    pub timestep: usize,
    pub setpoint_kw: Option<f64>,
}

impl DeviceContext {
    /// Creates a new DeviceContext with the given timestep and no setpoint.
    pub fn new(timestep: usize) -> Self {
        Self {
            timestep,
            setpoint_kw: None,
        }
    }

    /// Creates a new DeviceContext with the given timestep and setpoint.
    pub fn with_setpoint(timestep: usize, setpoint_kw: f64) -> Self {
        Self {
            timestep,
            setpoint_kw: Some(setpoint_kw),
        }
    }
}

/// A device that produces or consumes electricity.
///
/// Positive power is consumption (load), negative power is generation.
pub trait Device {
    /// Returns the power in kW at the context's timestep.
    fn power_kw(&mut self, context: &DeviceContext) -> f64;
}

/// Gaussian noise with mean 0 via the Box-Muller transform.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-cosine daylight fraction in `[0, 1]` for step `t` of a day.
///
/// Zero outside `[sunrise_idx, sunset_idx)`, peaking at solar noon.
pub fn daylight_frac(t: usize, steps_per_day: usize, sunrise_idx: usize, sunset_idx: usize) -> f64 {
    let t_day = t % steps_per_day.max(1);
    if t_day < sunrise_idx || t_day >= sunset_idx {
        return 0.0;
    }
    let span = (sunset_idx - sunrise_idx) as f64;
    let x = (t_day - sunrise_idx) as f64 + 0.5;
    (std::f64::consts::PI * x / span).sin().max(0.0)
}
