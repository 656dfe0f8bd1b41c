//! Schema construction: turns a design and shared district settings into a
//! JSON configuration artifact the environment is built from.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::design::DesignParameters;
use crate::error::{ConfigError, SchemaError};

/// File name of the hand-authored reference schema. Never deleted.
pub const CANONICAL_SCHEMA_FILE: &str = "schema.json";

/// Schema name used when no worker identifier is given.
pub const CANONICAL_SCHEMA_NAME: &str = "schema";

/// Time-of-use electricity tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Off-peak price ($/kWh).
    pub off_peak_price: f64,
    /// Peak price ($/kWh).
    pub peak_price: f64,
    /// First peak step of the day (inclusive).
    pub peak_start_idx: usize,
    /// Last peak step of the day (exclusive).
    pub peak_end_idx: usize,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            off_peak_price: 0.15,
            peak_price: 0.35,
            peak_start_idx: 16,
            peak_end_idx: 21,
        }
    }
}

/// Daily grid carbon intensity profile (kgCO2/kWh).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarbonConfig {
    pub base: f64,
    /// Amplitude of the daily sinusoid, peaking in the evening.
    pub amplitude: f64,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            base: 0.3,
            amplitude: 0.1,
        }
    }
}

/// Building base-load profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Mean demand (kW).
    pub base_kw: f64,
    /// Daily sinusoidal amplitude (kW).
    pub amp_kw: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_kw: 1.5,
            amp_kw: 0.8,
            phase_rad: 1.2,
            noise_std: 0.05,
        }
    }
}

/// Daylight window and variability for solar generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarWindowConfig {
    /// Sunrise step of the day (inclusive).
    pub sunrise_idx: usize,
    /// Sunset step of the day (exclusive).
    pub sunset_idx: usize,
    /// Relative noise standard deviation.
    pub noise_std: f64,
}

impl Default for SolarWindowConfig {
    fn default() -> Self {
        Self {
            sunrise_idx: 6,
            sunset_idx: 18,
            noise_std: 0.05,
        }
    }
}

/// District settings shared by every candidate design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Directory schema artifacts are written to.
    pub output_dir: PathBuf,
    pub steps_per_day: usize,
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// Battery power limit as a fraction of capacity per hour.
    pub battery_c_rate: f64,
    pub tariff: TariffConfig,
    pub carbon: CarbonConfig,
    pub load: LoadConfig,
    pub solar: SolarWindowConfig,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            steps_per_day: 24,
            days: 7,
            seed: 42,
            battery_c_rate: 0.5,
            tariff: TariffConfig::default(),
            carbon: CarbonConfig::default(),
            load: LoadConfig::default(),
            solar: SolarWindowConfig::default(),
        }
    }
}

impl SchemaConfig {
    /// Episode length in steps, or `None` if it does not fit in a `usize`.
    pub fn time_steps(&self) -> Option<usize> {
        self.steps_per_day.checked_mul(self.days)
    }

    /// Validates all fields and returns a list of errors.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.steps_per_day == 0 {
            errors.push(ConfigError::new("district.steps_per_day", "must be > 0"));
        }
        if self.days == 0 {
            errors.push(ConfigError::new("district.days", "must be > 0"));
        }
        if self.time_steps().is_none() {
            errors.push(ConfigError::new(
                "district.days",
                "steps_per_day * days overflows the step count",
            ));
        }
        if !(self.battery_c_rate > 0.0 && self.battery_c_rate.is_finite()) {
            errors.push(ConfigError::new("district.battery_c_rate", "must be > 0"));
        }
        let t = &self.tariff;
        if t.off_peak_price < 0.0 || t.peak_price < 0.0 {
            errors.push(ConfigError::new("district.tariff", "prices must be >= 0"));
        }
        if t.peak_start_idx > t.peak_end_idx || t.peak_end_idx > self.steps_per_day {
            errors.push(ConfigError::new(
                "district.tariff.peak_start_idx",
                "peak window must satisfy start <= end <= steps_per_day",
            ));
        }
        if self.carbon.base - self.carbon.amplitude.abs() < 0.0 {
            errors.push(ConfigError::new(
                "district.carbon",
                "intensity must stay >= 0 (base >= |amplitude|)",
            ));
        }
        if self.load.base_kw < 0.0 || self.load.noise_std < 0.0 {
            errors.push(ConfigError::new(
                "district.load",
                "base_kw and noise_std must be >= 0",
            ));
        }
        let s = &self.solar;
        if s.sunrise_idx >= s.sunset_idx {
            errors.push(ConfigError::new(
                "district.solar.sunrise_idx",
                "must be < district.solar.sunset_idx",
            ));
        }
        if self.steps_per_day > 0 && s.sunset_idx > self.steps_per_day {
            errors.push(ConfigError::new(
                "district.solar.sunset_idx",
                "must be <= district.steps_per_day",
            ));
        }
        errors
    }
}

/// Battery section of a building in the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterySchema {
    pub capacity_kwh: f64,
    pub efficiency: f64,
    pub c_rate: f64,
}

/// One building in the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSchema {
    pub name: String,
    pub load: LoadConfig,
    pub battery: BatterySchema,
    pub pv_nominal_power_kw: f64,
}

/// Complete district configuration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSchema {
    pub schema_name: String,
    pub steps_per_day: usize,
    pub days: usize,
    pub seed: u64,
    pub tariff: TariffConfig,
    pub carbon: CarbonConfig,
    pub solar: SolarWindowConfig,
    pub buildings: Vec<BuildingSchema>,
}

impl DistrictSchema {
    /// Episode length in steps, or `None` if it does not fit in a `usize`.
    pub fn time_steps(&self) -> Option<usize> {
        self.steps_per_day.checked_mul(self.days)
    }

    /// Reads a schema artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SchemaError::Format {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything schema construction needs for one candidate.
///
/// Built fresh from caller inputs; the shared config is cloned, never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRequest {
    pub config: SchemaConfig,
    pub design: DesignParameters,
    pub schema_name: String,
}

impl SchemaRequest {
    pub fn new(
        config: &SchemaConfig,
        design: &DesignParameters,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            config: config.clone(),
            design: design.clone(),
            schema_name: schema_name.into(),
        }
    }

    /// Merges shared settings and per-building design into a schema.
    ///
    /// Buildings share the load profile, each shifted by a small phase offset
    /// so their peaks do not coincide.
    pub fn to_schema(&self) -> DistrictSchema {
        let c = &self.config;
        let d = &self.design;
        let buildings = (0..d.building_count())
            .map(|b| BuildingSchema {
                name: format!("Building_{}", b + 1),
                load: LoadConfig {
                    phase_rad: c.load.phase_rad + 0.3 * b as f64,
                    ..c.load.clone()
                },
                battery: BatterySchema {
                    capacity_kwh: d.battery_capacities[b],
                    efficiency: d.battery_efficiencies.get(b).copied().unwrap_or(1.0),
                    c_rate: c.battery_c_rate,
                },
                pv_nominal_power_kw: d.solar_capacities.get(b).copied().unwrap_or(0.0),
            })
            .collect();

        DistrictSchema {
            schema_name: self.schema_name.clone(),
            steps_per_day: c.steps_per_day,
            days: c.days,
            seed: c.seed,
            tariff: c.tariff.clone(),
            carbon: c.carbon.clone(),
            solar: c.solar.clone(),
            buildings,
        }
    }
}

/// Writes a schema artifact for a request and returns its path.
///
/// Two concurrent callers passing the same schema name write the same path;
/// callers must keep names distinct.
pub trait SchemaBuilder {
    fn build(&self, request: &SchemaRequest) -> Result<PathBuf, SchemaError>;
}

/// Writes schemas as pretty-printed JSON into a directory.
#[derive(Debug, Clone)]
pub struct JsonSchemaBuilder {
    output_dir: PathBuf,
}

impl JsonSchemaBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, schema_name: &str) -> PathBuf {
        self.output_dir.join(format!("{schema_name}.json"))
    }
}

impl SchemaBuilder for JsonSchemaBuilder {
    fn build(&self, request: &SchemaRequest) -> Result<PathBuf, SchemaError> {
        let path = self.path_for(&request.schema_name);
        let write_err = |source| SchemaError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.output_dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(&request.to_schema()).map_err(|source| {
            SchemaError::Format {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(write_err)?;
        debug!(path = %path.display(), "schema written");
        Ok(path)
    }
}
