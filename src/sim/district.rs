//! District environment: buildings with base load, solar and a battery,
//! stepped one control action at a time.

use std::ops::Range;
use std::path::Path;

use tracing::debug;

use crate::devices::{BaseLoad, Battery, Device, DeviceContext, SolarPv};
use crate::env::{ActionVector, Environment, ForecastSource, Observations, StepOutcome};
use crate::error::EnvError;
use crate::schema::{BuildingSchema, DistrictSchema};

use super::observation::{self as obs, OBSERVATION_NAMES};
use super::types::SimConfig;

/// Seed stride between buildings so device noise streams do not correlate.
const BUILDING_SEED_STRIDE: u64 = 7919;

#[derive(Debug, Clone)]
struct Building {
    capacity_kwh: f64,
    efficiency: f64,
    max_power_kw: f64,
    pv_nominal_kw: f64,
    battery: Battery,
}

impl Building {
    fn from_schema(schema: &BuildingSchema, config: &SimConfig) -> Result<Self, EnvError> {
        let eff = schema.battery.efficiency;
        if !(eff > 0.0 && eff <= 1.0) {
            return Err(EnvError::Setup(format!(
                "{}: battery efficiency must be in (0, 1], got {eff}",
                schema.name
            )));
        }
        // Installed sizes are what the environment accepts, not what was asked for.
        let capacity_kwh = finite_non_negative(schema.battery.capacity_kwh);
        let max_power_kw = capacity_kwh * finite_non_negative(schema.battery.c_rate);
        Ok(Self {
            capacity_kwh,
            efficiency: eff,
            max_power_kw,
            pv_nominal_kw: finite_non_negative(schema.pv_nominal_power_kw),
            battery: Battery::with_round_trip(capacity_kwh, 0.0, max_power_kw, eff, config),
        })
    }

    fn reset_battery(&mut self, config: &SimConfig) {
        self.battery = Battery::with_round_trip(
            self.capacity_kwh,
            0.0,
            self.max_power_kw,
            self.efficiency,
            config,
        );
    }
}

fn finite_non_negative(x: f64) -> f64 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

/// Stepping district simulation built from a [`DistrictSchema`].
///
/// Load and solar profiles are generated once at construction so that every
/// reset replays the same episode and the planner's window data is ground
/// truth. Energy quantities are kWh per step.
#[derive(Debug, Clone)]
pub struct DistrictEnv {
    config: SimConfig,
    buildings: Vec<Building>,
    loads: Vec<Vec<f64>>,
    solar: Vec<Vec<f64>>,
    price_profile: Vec<f64>,
    carbon_profile: Vec<f64>,
    t: usize,
    net_consumption: Vec<Vec<f64>>,
    electricity_pricing: Vec<f64>,
    carbon_intensity: Vec<f64>,
    capacity_history: Vec<Vec<f64>>,
}

impl DistrictEnv {
    /// Loads the schema at `path` and builds the environment.
    ///
    /// # Errors
    ///
    /// Returns `EnvError` if the schema cannot be read or is inconsistent.
    pub fn from_schema_path(path: &Path) -> Result<Self, EnvError> {
        let schema = DistrictSchema::load(path)?;
        Self::from_schema(&schema)
    }

    /// Builds the environment from an in-memory schema.
    ///
    /// # Errors
    ///
    /// Returns `EnvError::Setup` if timing, solar window or buildings are invalid.
    pub fn from_schema(schema: &DistrictSchema) -> Result<Self, EnvError> {
        if schema.steps_per_day == 0 || schema.days == 0 {
            return Err(EnvError::Setup(
                "steps_per_day and days must be > 0".to_string(),
            ));
        }
        if schema.buildings.is_empty() {
            return Err(EnvError::Setup("schema has no buildings".to_string()));
        }
        let s = &schema.solar;
        if s.sunrise_idx >= s.sunset_idx || s.sunset_idx > schema.steps_per_day {
            return Err(EnvError::Setup(format!(
                "solar window [{}, {}) does not fit a {}-step day",
                s.sunrise_idx, s.sunset_idx, schema.steps_per_day
            )));
        }

        let total = schema.time_steps().ok_or_else(|| {
            EnvError::Setup(format!(
                "{} steps per day over {} days overflows the step count",
                schema.steps_per_day, schema.days
            ))
        })?;
        let config = SimConfig::new(schema.steps_per_day, schema.days, schema.seed);
        let dt = config.dt_hours;

        let buildings = schema
            .buildings
            .iter()
            .map(|b| Building::from_schema(b, &config))
            .collect::<Result<Vec<_>, _>>()?;

        let mut loads = Vec::with_capacity(buildings.len());
        let mut solar = Vec::with_capacity(buildings.len());
        for (i, (b, building)) in schema.buildings.iter().zip(&buildings).enumerate() {
            let seed = schema.seed.wrapping_add(BUILDING_SEED_STRIDE * i as u64);
            let mut load = BaseLoad::new(
                b.load.base_kw,
                b.load.amp_kw,
                b.load.phase_rad,
                b.load.noise_std,
                config.steps_per_day,
                seed,
            );
            let mut pv = SolarPv::new(
                building.pv_nominal_kw,
                s.sunrise_idx,
                s.sunset_idx,
                s.noise_std,
                &config,
                seed.wrapping_add(1),
            );
            loads.push((0..total).map(|t| load.power_kw(&DeviceContext::new(t)) * dt).collect());
            // Generation is negative in device convention.
            solar.push((0..total).map(|t| -pv.power_kw(&DeviceContext::new(t)) * dt).collect());
        }

        let spd = config.steps_per_day;
        let tariff = &schema.tariff;
        let price_profile = (0..total)
            .map(|t| {
                let h = t % spd;
                if (tariff.peak_start_idx..tariff.peak_end_idx).contains(&h) {
                    tariff.peak_price
                } else {
                    tariff.off_peak_price
                }
            })
            .collect();
        let carbon_profile = (0..total)
            .map(|t| {
                let day_pos = (t % spd) as f64 / spd as f64;
                let angle = 2.0 * std::f64::consts::PI * (day_pos - 0.75);
                (schema.carbon.base + schema.carbon.amplitude * angle.cos()).max(0.0)
            })
            .collect();

        debug!(
            schema = %schema.schema_name,
            buildings = buildings.len(),
            time_steps = total,
            "district environment built"
        );

        let n = buildings.len();
        Ok(Self {
            config,
            buildings,
            loads,
            solar,
            price_profile,
            carbon_profile,
            t: 0,
            net_consumption: vec![Vec::new(); n],
            electricity_pricing: Vec::new(),
            carbon_intensity: Vec::new(),
            capacity_history: vec![Vec::new(); n],
        })
    }

    fn observe(&self) -> Observations {
        let total = self.config.total_steps();
        let spd = self.config.steps_per_day;
        let at = |t: usize| t.min(total - 1);
        let t = at(self.t);
        let day = t / spd;
        let ahead = |hours: f64| at(t + (hours / self.config.dt_hours).round() as usize);

        let rows = self
            .buildings
            .iter()
            .enumerate()
            .map(|(b, building)| {
                let mut row = vec![0.0; OBSERVATION_NAMES.len()];
                row[obs::MONTH] = ((day / 30) % 12 + 1) as f64;
                row[obs::DAY_TYPE] = (day % 7 + 1) as f64;
                row[obs::HOUR] = ((t % spd) as f64 * self.config.dt_hours).floor() + 1.0;
                row[obs::CARBON_INTENSITY] = self.carbon_profile[t];
                row[obs::NON_SHIFTABLE_LOAD] = self.loads[b][t];
                row[obs::SOLAR_GENERATION] = self.solar[b][t];
                row[obs::ELECTRICAL_STORAGE_SOC] = building.battery.soc;
                row[obs::NET_ELECTRICITY_CONSUMPTION] =
                    self.net_consumption[b].last().copied().unwrap_or(0.0);
                row[obs::ELECTRICITY_PRICING] = self.price_profile[t];
                row[obs::ELECTRICITY_PRICING_PREDICTED_6H] = self.price_profile[ahead(6.0)];
                row[obs::ELECTRICITY_PRICING_PREDICTED_12H] = self.price_profile[ahead(12.0)];
                row[obs::ELECTRICITY_PRICING_PREDICTED_24H] = self.price_profile[ahead(24.0)];
                row
            })
            .collect();
        Observations::new(rows)
    }
}

impl Environment for DistrictEnv {
    fn building_count(&self) -> usize {
        self.buildings.len()
    }

    fn time_steps(&self) -> usize {
        self.config.total_steps()
    }

    fn observation_names(&self) -> &[&'static str] {
        &OBSERVATION_NAMES
    }

    fn reset(&mut self) -> Result<Observations, EnvError> {
        let config = self.config.clone();
        for building in &mut self.buildings {
            building.reset_battery(&config);
        }
        self.t = 0;
        self.net_consumption.iter_mut().for_each(Vec::clear);
        self.electricity_pricing.clear();
        self.carbon_intensity.clear();
        for (history, building) in self.capacity_history.iter_mut().zip(&self.buildings) {
            history.clear();
            history.push(building.capacity_kwh);
        }
        Ok(self.observe())
    }

    fn step(&mut self, actions: &ActionVector) -> Result<StepOutcome, EnvError> {
        let n = self.buildings.len();
        if actions.len() != n {
            return Err(EnvError::ActionShape {
                expected: n,
                got: actions.len(),
            });
        }
        let total = self.config.total_steps();
        if self.t >= total {
            return Err(EnvError::Finished(total));
        }

        let t = self.t;
        let dt = self.config.dt_hours;
        let price = self.price_profile[t];
        let mut reward = 0.0;
        for (b, building) in self.buildings.iter_mut().enumerate() {
            let requested_kwh = actions.as_slice()[b] * building.capacity_kwh;
            let battery_kw = building
                .battery
                .power_kw(&DeviceContext::with_setpoint(t, requested_kwh / dt));
            let net = self.loads[b][t] - self.solar[b][t] + battery_kw * dt;
            reward -= net.max(0.0) * price;
            self.net_consumption[b].push(net);
            self.capacity_history[b].push(building.battery.capacity_kwh);
        }
        self.electricity_pricing.push(price);
        self.carbon_intensity.push(self.carbon_profile[t]);
        self.t += 1;

        Ok(StepOutcome {
            observations: self.observe(),
            reward,
            done: self.t >= total,
        })
    }

    fn net_electricity_consumption(&self, b: usize) -> &[f64] {
        self.net_consumption.get(b).map(Vec::as_slice).unwrap_or_default()
    }

    fn electricity_pricing(&self) -> &[f64] {
        &self.electricity_pricing
    }

    fn carbon_intensity(&self) -> &[f64] {
        &self.carbon_intensity
    }

    fn capacity_history(&self, b: usize) -> &[f64] {
        self.capacity_history.get(b).map(Vec::as_slice).unwrap_or_default()
    }

    fn nominal_solar_power(&self, b: usize) -> f64 {
        self.buildings.get(b).map_or(0.0, |b| b.pv_nominal_kw)
    }
}

impl ForecastSource for DistrictEnv {
    fn load_forecast(&self, b: usize, steps: Range<usize>) -> Vec<f64> {
        window(&self.loads[b], steps)
    }

    fn solar_forecast(&self, b: usize, steps: Range<usize>) -> Vec<f64> {
        window(&self.solar[b], steps)
    }

    fn battery_efficiency(&self, b: usize) -> f64 {
        self.buildings[b].efficiency
    }

    fn battery_capacity(&self, b: usize) -> f64 {
        self.buildings[b].capacity_kwh
    }

    fn battery_step_limit(&self, b: usize) -> f64 {
        self.buildings[b].max_power_kw * self.config.dt_hours
    }
}

fn window(series: &[f64], steps: Range<usize>) -> Vec<f64> {
    let end = steps.end.min(series.len());
    let start = steps.start.min(end);
    series[start..end].to_vec()
}
