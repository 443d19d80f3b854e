//! Fiducial localization pipeline.
//!
//! This module wires together the frontal view search, view sampling,
//! per-view render/detect/pick and the per-landmark aggregation.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::{FiducialError, ParamsError};
pub use params::FiducialParams;
pub use pipeline::{CancelToken, FiducialPipeline};
pub use result::{FiducialDetectionResult, FiducialResult};
