// Label categorization, mutation and result caching for log query pipelines.

// Core label model and builders
pub mod labels;

// Services used by the builders
pub mod hints;
pub mod intern;
pub mod pool;
pub mod metrics;

// Ambient
pub mod conf;
pub mod telemetry;
mod serde_utils;

pub use conf::{ConfigError, LabelsConfig};
pub use hints::{KeyHints, NoParserHints, ParserHint};
pub use labels::{
    BaseLabelsBuilder, Label, LabelCategory, Labels, LabelsBuilder, LabelsResult,
};
pub use metrics::{LabelsMetrics, MetricsSnapshot};
