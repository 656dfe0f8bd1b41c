/// Reference district environment built from a schema artifact.
pub mod district;
/// Names and positions of the per-building observation features.
pub mod observation;
pub mod types;

pub use district::DistrictEnv;
