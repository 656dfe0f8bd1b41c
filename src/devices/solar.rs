use crate::devices::types::{Device, DeviceContext, daylight_frac, gaussian_noise};
use crate::sim::types::SimConfig;
use rand::{SeedableRng, rngs::StdRng};

/// A solar PV generator with a half-cosine profile between sunrise and sunset.
///
/// Returns **negative** power during daylight (generation).
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Nominal (peak) power in kWp.
    pub kw_peak: f64,

    /// Number of time steps per simulated day.
    steps_per_day: usize,

    /// Time step index when sunrise occurs (inclusive).
    pub sunrise_idx: usize,

    /// Time step index when sunset occurs (exclusive).
    pub sunset_idx: usize,

    /// Standard deviation of the Gaussian noise as a fraction of output.
    pub noise_std: f64,

    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar PV generator.
    ///
    /// # Arguments
    ///
    /// * `kw_peak` - Nominal power in kWp
    /// * `sunrise_idx` - Time step index when sunrise occurs (inclusive)
    /// * `sunset_idx` - Time step index when sunset occurs (exclusive)
    /// * `noise_std` - Standard deviation of noise (e.g., 0.05 for +/-5% variation)
    /// * `config` - Simulation configuration for timing
    /// * `seed` - Random seed for reproducible noise generation
    ///
    /// # Panics
    ///
    /// Panics if `sunrise_idx >= sunset_idx` or `sunset_idx > steps_per_day`.
    pub fn new(
        kw_peak: f64,
        sunrise_idx: usize,
        sunset_idx: usize,
        noise_std: f64,
        config: &SimConfig,
        seed: u64,
    ) -> Self {
        assert!(sunrise_idx < sunset_idx && sunset_idx <= config.steps_per_day);
        Self {
            kw_peak: kw_peak.max(0.0),
            steps_per_day: config.steps_per_day,
            sunrise_idx,
            sunset_idx,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Device for SolarPv {
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        let frac = daylight_frac(
            context.timestep,
            self.steps_per_day,
            self.sunrise_idx,
            self.sunset_idx,
        );
        if frac <= 0.0 || self.kw_peak <= 0.0 {
            return 0.0;
        }

        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        -(self.kw_peak * frac * noise_mult).max(0.0)
    }
}
