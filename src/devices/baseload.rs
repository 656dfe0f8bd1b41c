use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, DeviceContext, gaussian_noise};

/// A baseload generator that models daily electricity consumption patterns.
///
/// `BaseLoad` creates a sinusoidal power demand pattern with configurable baseline,
/// amplitude, phase, and random noise to simulate typical daily load patterns.
///
/// # Examples
///
/// ```
/// use mpc_design_eval::devices::baseload::BaseLoad;
///
/// let mut load = BaseLoad::new(
///     1.0,   // base_kw - average consumption
///     0.5,   // amp_kw - daily variation
///     0.0,   // phase_rad - no phase shift
///     0.0,   // noise_std - deterministic
///     24,    // steps_per_day - hourly resolution
///     42,    // seed - for reproducible randomness
/// );
///
/// assert!(load.demand_kw(12) >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Baseline power consumption in kilowatts
    pub base_kw: f64,

    /// Amplitude of the sinusoidal variation in kilowatts
    pub amp_kw: f64,

    /// Phase offset of the sinusoidal pattern in radians
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise in kilowatts
    pub noise_std: f64,

    /// Number of time steps per simulated day
    pub steps_per_day: usize,

    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new baseload generator with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `base_kw` - The baseline power consumption in kilowatts
    /// * `amp_kw` - The amplitude of sinusoidal daily variation in kilowatts
    /// * `phase_rad` - The phase offset in radians
    /// * `noise_std` - The standard deviation of Gaussian noise in kilowatts
    /// * `steps_per_day` - The number of time steps per simulated day
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(
        base_kw: f64,
        amp_kw: f64,
        phase_rad: f64,
        noise_std: f64,
        steps_per_day: usize,
        seed: u64,
    ) -> Self {
        Self {
            base_kw,
            amp_kw,
            phase_rad,
            noise_std,
            steps_per_day: steps_per_day.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Power demand at `timestep` in kW, never negative.
    pub fn demand_kw(&mut self, timestep: usize) -> f64 {
        let day_pos = (timestep % self.steps_per_day) as f64 / self.steps_per_day as f64;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);

        (self.base_kw + self.amp_kw * angle.sin() + noise).max(0.0)
    }
}

impl Device for BaseLoad {
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        self.demand_kw(context.timestep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_is_never_negative() {
        let mut load = BaseLoad::new(0.1, 2.0, 0.0, 0.5, 24, 7);
        for t in 0..96 {
            assert!(load.demand_kw(t) >= 0.0);
        }
    }

    #[test]
    fn noiseless_profile_repeats_daily() {
        let mut load = BaseLoad::new(1.0, 0.5, 0.3, 0.0, 24, 7);
        let day1: Vec<f64> = (0..24).map(|t| load.demand_kw(t)).collect();
        let day2: Vec<f64> = (24..48).map(|t| load.demand_kw(t)).collect();
        assert_eq!(day1, day2);
    }
}
