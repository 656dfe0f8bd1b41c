//! TOML-based evaluation configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::design::DesignParameters;
use crate::error::ConfigError;
use crate::evaluate::{DEFAULT_TAU, EvalOptions};
use crate::objective::ClipLevel;
use crate::pricing::{PricingConfig, PricingModel};
use crate::schema::SchemaConfig;

/// Top-level evaluation configuration parsed from TOML.
///
/// All sections have defaults. Load from TOML with
/// [`EvaluationConfig::from_toml_file`] or use [`EvaluationConfig::baseline`]
/// for the built-in demo district.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    /// District settings shared by every candidate design.
    #[serde(default)]
    pub district: SchemaConfig,
    /// Candidate hardware sizing.
    #[serde(default)]
    pub design: DesignParameters,
    /// Unit costs.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// How the design is scored.
    #[serde(default)]
    pub evaluation: EvaluationSection,
}

/// Scoring options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationSection {
    /// Lifetime multiplier applied to operating costs when `design` is set.
    pub opex_factor: f64,
    /// `"d"`, `"b"` or `"m"` (also `"district"`, `"building"`, `"mixed"`).
    pub clip_level: ClipLevel,
    /// Include capital costs.
    pub design: bool,
    /// Planning horizon in steps.
    pub tau: usize,
    /// Apply the zero action throughout.
    pub no_control: bool,
}

impl Default for EvaluationSection {
    fn default() -> Self {
        Self {
            opex_factor: 10.0,
            clip_level: ClipLevel::Mixed,
            design: true,
            tau: DEFAULT_TAU,
            no_control: false,
        }
    }
}

impl EvaluationConfig {
    /// Returns the baseline demo district: three buildings, one without assets.
    pub fn baseline() -> Self {
        Self {
            district: SchemaConfig::default(),
            design: DesignParameters::new(vec![10.0, 6.0, 0.0], vec![0.9, 0.9, 0.9], vec![
                5.0, 3.0, 0.0,
            ]),
            pricing: PricingConfig {
                carbon: Some(0.05),
                battery: Some(1e3),
                solar: Some(2e3),
            },
            evaluation: EvaluationSection::default(),
        }
    }

    /// Returns the operational preset: baseline assets scored on running cost only.
    pub fn operational() -> Self {
        Self {
            evaluation: EvaluationSection {
                design: false,
                clip_level: ClipLevel::Building,
                ..EvaluationSection::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the no-storage preset: solar only, nothing to control.
    pub fn no_storage() -> Self {
        let mut cfg = Self::baseline();
        cfg.design.battery_capacities = vec![0.0; cfg.design.building_count()];
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "operational", "no_storage"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "operational" => Ok(Self::operational()),
            "no_storage" => Ok(Self::no_storage()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Resolves the prices required by `evaluation.design`.
    ///
    /// # Errors
    ///
    /// Returns every missing or invalid price.
    pub fn pricing_model(&self) -> Result<PricingModel, Vec<ConfigError>> {
        self.pricing.resolve(self.evaluation.design)
    }

    /// Evaluation options for this configuration.
    pub fn eval_options(&self, suppress_output: bool) -> EvalOptions {
        let e = &self.evaluation;
        EvalOptions {
            clip_level: e.clip_level,
            design: e.design,
            tau: e.tau,
            suppress_output,
            no_control: e.no_control,
        }
    }

    /// Validates all sections and returns a list of errors.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = self.district.validate();
        errors.extend(self.design.validate());
        errors.extend(self.validate_scoring());
        errors
    }

    /// Validates only the sections used to score an already-built schema:
    /// `[pricing]` and `[evaluation]`.
    pub fn validate_scoring(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Err(e) = self.pricing_model() {
            errors.extend(e);
        }
        errors.extend(
            self.eval_options(false)
                .validate(self.evaluation.opex_factor),
        );
        errors
    }
}
