use crate::env::Observations;
use crate::error::EvalError;

/// Column of the observation row holding the battery state of charge as a
/// fraction of capacity.
pub const SOC_OBSERVATION_INDEX: usize = 22;

/// Name the environment must declare at [`SOC_OBSERVATION_INDEX`].
pub const SOC_OBSERVATION_NAME: &str = "electrical_storage_soc";

/// Derives per-building stored energy from the latest observations.
///
/// Holds no state besides battery capacities: every call to [`derive`]
/// recomputes the vector from the observation matrix it is given, so the
/// controller never carries its own estimate between steps.
///
/// [`derive`]: SocTracker::derive
#[derive(Debug, Clone)]
pub struct SocTracker {
    capacities: Vec<f64>,
}

impl SocTracker {
    /// Creates a tracker after checking the environment's observation layout.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Layout` if the declared layout does not carry the
    /// state of charge at [`SOC_OBSERVATION_INDEX`].
    pub fn new(observation_names: &[&str], capacities: Vec<f64>) -> Result<Self, EvalError> {
        match observation_names.get(SOC_OBSERVATION_INDEX) {
            Some(&name) if name == SOC_OBSERVATION_NAME => Ok(Self { capacities }),
            found => Err(EvalError::Layout {
                index: SOC_OBSERVATION_INDEX,
                expected: SOC_OBSERVATION_NAME,
                found: found.map_or_else(|| "<missing>".to_string(), |n| n.to_string()),
            }),
        }
    }

    pub fn capacities(&self) -> &[f64] {
        &self.capacities
    }

    /// Stored energy per building (kWh): SoC fraction × capacity.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::Series` if the observation matrix does not have one
    /// row per building or a row lacks the state-of-charge column.
    pub fn derive(&self, observations: &Observations) -> Result<Vec<f64>, EvalError> {
        if observations.building_count() != self.capacities.len() {
            return Err(EvalError::Series(format!(
                "observations cover {} buildings, expected {}",
                observations.building_count(),
                self.capacities.len()
            )));
        }
        let fractions = observations.column(SOC_OBSERVATION_INDEX).ok_or_else(|| {
            EvalError::Series(format!(
                "observation row shorter than {} columns",
                SOC_OBSERVATION_INDEX + 1
            ))
        })?;
        Ok(fractions
            .iter()
            .zip(&self.capacities)
            .map(|(soc, capacity)| soc * capacity)
            .collect())
    }
}
