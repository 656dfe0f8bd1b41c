/// Per-building observation columns of the district environment, in order.
pub const OBSERVATION_NAMES: [&str; 28] = [
    "month",
    "day_type",
    "hour",
    "outdoor_dry_bulb_temperature",
    "outdoor_dry_bulb_temperature_predicted_6h",
    "outdoor_dry_bulb_temperature_predicted_12h",
    "outdoor_dry_bulb_temperature_predicted_24h",
    "outdoor_relative_humidity",
    "outdoor_relative_humidity_predicted_6h",
    "outdoor_relative_humidity_predicted_12h",
    "outdoor_relative_humidity_predicted_24h",
    "diffuse_solar_irradiance",
    "diffuse_solar_irradiance_predicted_6h",
    "diffuse_solar_irradiance_predicted_12h",
    "diffuse_solar_irradiance_predicted_24h",
    "direct_solar_irradiance",
    "direct_solar_irradiance_predicted_6h",
    "direct_solar_irradiance_predicted_12h",
    "direct_solar_irradiance_predicted_24h",
    "carbon_intensity",
    "non_shiftable_load",
    "solar_generation",
    "electrical_storage_soc",
    "net_electricity_consumption",
    "electricity_pricing",
    "electricity_pricing_predicted_6h",
    "electricity_pricing_predicted_12h",
    "electricity_pricing_predicted_24h",
];

pub const MONTH: usize = 0;
pub const DAY_TYPE: usize = 1;
pub const HOUR: usize = 2;
pub const CARBON_INTENSITY: usize = 19;
pub const NON_SHIFTABLE_LOAD: usize = 20;
pub const SOLAR_GENERATION: usize = 21;
pub const ELECTRICAL_STORAGE_SOC: usize = 22;
pub const NET_ELECTRICITY_CONSUMPTION: usize = 23;
pub const ELECTRICITY_PRICING: usize = 24;
pub const ELECTRICITY_PRICING_PREDICTED_6H: usize = 25;
pub const ELECTRICITY_PRICING_PREDICTED_12H: usize = 26;
pub const ELECTRICITY_PRICING_PREDICTED_24H: usize = 27;
