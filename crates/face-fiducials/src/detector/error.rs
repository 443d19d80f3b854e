use face_fiducials_core::{LandmarkId, MeshError, PoseError};
use std::path::PathBuf;

/// A configuration value the pipeline cannot work with.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("{name} must be at least 1")]
    Zero { name: &'static str },
    #[error("{name} = {value} outside {range}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },
    #[error("frontal axes must be finite and non-zero")]
    DegenerateAxis,
    #[error("frontal forward_axis is parallel to up_axis")]
    ParallelAxes,
    #[error("landmark {0} mapped more than once")]
    DuplicateLandmark(LandmarkId),
}

/// Errors that abort a fiducial localization run.
///
/// Per-view failures are not errors; they are recorded in the view reports.
#[derive(thiserror::Error, Debug)]
pub enum FiducialError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ParamsError),
    #[error("detector model not found at {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Pose(#[from] PoseError),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
    #[error("run cancelled after {completed} of {total} views")]
    Cancelled { completed: usize, total: usize },
}
