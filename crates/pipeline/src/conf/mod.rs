//! Conf module — query-scoped labels configuration, loading, and errors.

pub mod model;
pub mod load;
pub mod error;

pub use model::LabelsConfig;
pub use error::ConfigError;
