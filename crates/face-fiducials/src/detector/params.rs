use super::{FiducialError, ParamsError};
use crate::aggregate::Reduction;
use crate::detect2d::LandmarkScheme;
use crate::frontal::FrontalSearchParams;
use crate::views::ViewSamplerParams;
use face_fiducials_core::{CoordinateSystem, DEFAULT_FOV_Y_DEG};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the fiducial pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiducialParams {
    /// Number of views rendered around the frontal anchor.
    pub num_views: usize,
    /// Side of the square renders, in pixels.
    pub image_size: u32,
    /// Angular step of the frontal view search, in degrees.
    pub sweep_size: f64,
    /// Candidates farther than this many standard deviations above the mean
    /// distance to their centroid are rejected.
    pub filter_thresh: f64,
    /// Model artifact of the external landmark detector. Only checked for
    /// existence; loading is the detector's concern.
    pub model_path: Option<PathBuf>,
    /// Vertical field of view of every camera, in degrees.
    pub fov_y_deg: f64,
    /// Worker threads for the view loop; `None` uses the rayon default.
    pub num_workers: Option<usize>,
    /// Soft per-view budget; slower views are dropped.
    pub view_timeout_ms: Option<u64>,
    pub frontal: FrontalSearchParams,
    pub sampler: ViewSamplerParams,
    pub reduction: Reduction,
    pub scheme: LandmarkScheme,
    /// Convention of the input mesh; results are reported in it.
    pub coordinate_system: CoordinateSystem,
}

impl Default for FiducialParams {
    fn default() -> Self {
        Self {
            num_views: 16,
            image_size: 800,
            sweep_size: 5.0,
            filter_thresh: 1.0,
            model_path: None,
            fov_y_deg: DEFAULT_FOV_Y_DEG,
            num_workers: None,
            view_timeout_ms: None,
            frontal: FrontalSearchParams::default(),
            sampler: ViewSamplerParams::default(),
            reduction: Reduction::default(),
            scheme: LandmarkScheme::default(),
            coordinate_system: CoordinateSystem::default(),
        }
    }
}

impl FiducialParams {
    /// Check every option; called by [`crate::FiducialPipeline::new`].
    pub fn validate(&self) -> Result<(), FiducialError> {
        if self.num_views == 0 {
            return Err(ParamsError::Zero { name: "num_views" }.into());
        }
        if self.image_size == 0 {
            return Err(ParamsError::Zero { name: "image_size" }.into());
        }
        if self.num_workers == Some(0) {
            return Err(ParamsError::Zero { name: "num_workers" }.into());
        }
        let out_of_range = |name, value, range| ParamsError::OutOfRange { name, value, range };
        if !(self.sweep_size > 0.0 && self.sweep_size <= 180.0) {
            return Err(out_of_range("sweep_size", self.sweep_size, "(0, 180]").into());
        }
        if !(self.filter_thresh.is_finite() && self.filter_thresh > 0.0) {
            return Err(out_of_range("filter_thresh", self.filter_thresh, "(0, inf)").into());
        }
        if !(self.fov_y_deg > 0.0 && self.fov_y_deg < 180.0) {
            return Err(out_of_range("fov_y_deg", self.fov_y_deg, "(0, 180)").into());
        }
        self.frontal.validate()?;
        self.sampler.validate()?;
        self.scheme.validate()?;
        if let Some(path) = &self.model_path {
            if !path.exists() {
                return Err(FiducialError::ModelNotFound(path.clone()));
            }
        }
        Ok(())
    }
}
