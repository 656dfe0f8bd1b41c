use crate::devices::types::{Device, DeviceContext};
use crate::sim::types::SimConfig;

/// A battery energy storage system that can charge and discharge electricity.
///
/// `Battery` models a battery with configurable capacity, charge/discharge rates,
/// and efficiencies. It maintains its state of charge (SOC) and enforces operational
/// constraints when given power setpoints. A zero-capacity battery is allowed and
/// never moves energy.
///
/// # Power Flow Convention
/// - Positive power: Charging (consuming power from the grid / load)
/// - Negative power: Discharging (supplying power to the building)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// State of charge as a fraction (0.0 to 1.0).
    pub soc: f64,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f64,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f64,

    /// Charging efficiency (0..1.0).
    pub eta_c: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f64,

    /// Duration of one timestep in hours.
    dt_hours: f64,
}

impl Battery {
    /// Creates a new battery with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Battery capacity in kWh (must be >= 0)
    /// * `soc` - Initial state of charge as a fraction (0.0 to 1.0)
    /// * `max_charge_kw` - Maximum charging power in kW
    /// * `max_discharge_kw` - Maximum discharging power in kW
    /// * `eta_c` - Charging efficiency (0..1.0)
    /// * `eta_d` - Discharging efficiency (0..1.0)
    /// * `config` - Simulation configuration for timing
    ///
    /// # Panics
    ///
    /// Panics if capacity is negative, SOC out of range, or efficiencies invalid.
    pub fn new(
        capacity_kwh: f64,
        soc: f64,
        max_charge_kw: f64,
        max_discharge_kw: f64,
        eta_c: f64,
        eta_d: f64,
        config: &SimConfig,
    ) -> Self {
        assert!(capacity_kwh >= 0.0);
        assert!((0.0..=1.0).contains(&soc));
        assert!(max_charge_kw >= 0.0 && max_discharge_kw >= 0.0);
        assert!(eta_c > 0.0 && eta_c <= 1.0);
        assert!(eta_d > 0.0 && eta_d <= 1.0);

        Self {
            capacity_kwh,
            soc,
            max_charge_kw,
            max_discharge_kw,
            eta_c,
            eta_d,
            dt_hours: config.dt_hours,
        }
    }

    /// Creates a battery from a round-trip efficiency, split evenly between
    /// charging and discharging.
    pub fn with_round_trip(
        capacity_kwh: f64,
        soc: f64,
        max_power_kw: f64,
        round_trip_efficiency: f64,
        config: &SimConfig,
    ) -> Self {
        let eta = round_trip_efficiency.sqrt();
        Self::new(capacity_kwh, soc, max_power_kw, max_power_kw, eta, eta, config)
    }
}

impl Device for Battery {
    /// Returns the actual power given a power setpoint.
    ///
    /// Enforces charge/discharge power limits, SOC bounds, and efficiency losses.
    fn power_kw(&mut self, context: &DeviceContext) -> f64 {
        if self.capacity_kwh <= 0.0 {
            return 0.0;
        }
        let setpoint_kw = context.setpoint_kw.unwrap_or(0.0);

        // Enforce kW limits
        let cmd_kw = if setpoint_kw >= 0.0 {
            setpoint_kw.min(self.max_charge_kw)
        } else {
            setpoint_kw.max(-self.max_discharge_kw)
        };

        if cmd_kw > 0.0 {
            // Charging: limited by free capacity
            let max_kwh_this_step = (1.0 - self.soc) * self.capacity_kwh / self.eta_c;
            let max_kw_soc = max_kwh_this_step / self.dt_hours;
            let actual_kw = cmd_kw.min(max_kw_soc.max(0.0));

            self.soc += (actual_kw * self.dt_hours * self.eta_c) / self.capacity_kwh;
            self.soc = self.soc.clamp(0.0, 1.0);

            actual_kw
        } else if cmd_kw < 0.0 {
            // Discharging: limited by stored energy
            let cmd_abs = -cmd_kw;
            let max_kwh_this_step = self.soc * self.capacity_kwh * self.eta_d;
            let max_kw_soc = max_kwh_this_step / self.dt_hours;
            let actual_abs_kw = cmd_abs.min(max_kw_soc.max(0.0));

            self.soc -= (actual_abs_kw * self.dt_hours) / (self.capacity_kwh * self.eta_d);
            self.soc = self.soc.clamp(0.0, 1.0);

            -actual_abs_kw
        } else {
            0.0
        }
    }
}
