//! Labels — per-line label state for the log query pipeline.

pub mod model;
pub mod category;
pub mod hash;
pub mod result;
pub mod builder;
mod group;

pub use model::{Label, Labels};
pub use category::LabelCategory;
pub use hash::Hasher;
pub use result::{empty_labels_result, LabelsResult};
pub use builder::{
    BaseLabelsBuilder, LabelsBuilder, LabelsMap, DUPLICATE_SUFFIX, ERROR_DETAILS_LABEL, ERROR_LABEL,
};
