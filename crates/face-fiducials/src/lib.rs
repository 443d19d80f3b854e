//! Multi-view facial fiducial localization on photogrammetry meshes.
//!
//! The pipeline finds seven anatomical landmarks (tragus points, eye corners
//! and nasion) on a textured face mesh:
//! - a frontal view search picks the camera that sees the face head-on,
//! - views are sampled around it and rendered by an external [`Renderer`],
//! - an external [`LandmarkDetector2d`] reports landmark pixels per view,
//! - each pixel is picked back onto the surface by a [`Picker`],
//! - per-landmark candidate clouds are filtered and reduced to one point.
//!
//! Rendering and 2D detection are backend concerns and enter through traits.
//! [`MeshRayCaster`] is a ready-made picker.
//!
//! ## Quickstart
//!
//! ```no_run
//! use face_fiducials::{
//!     BackendError, FaceLandmarks2d, FiducialParams, FiducialPipeline, LandmarkDetector2d,
//!     Mesh, MeshRayCaster, Renderer,
//! };
//! use face_fiducials::core::CameraPose;
//! use image::RgbImage;
//!
//! struct MyRenderer;
//! impl Renderer for MyRenderer {
//!     fn render(&self, _mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError> {
//!         Ok(RgbImage::new(pose.width, pose.height))
//!     }
//! }
//!
//! struct MyDetector;
//! impl LandmarkDetector2d for MyDetector {
//!     fn detect(&self, _image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError> {
//!         Ok(None)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mesh: Mesh = unimplemented!();
//! let pipeline = FiducialPipeline::new(FiducialParams::default())?;
//! let result = pipeline.run(&mesh, &MyRenderer, &MeshRayCaster::new(), &MyDetector)?;
//! for f in &result.fiducials {
//!     println!("{}: {:?} ({:?})", f.label(), f.position, f.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `face_fiducials::core`: mesh, camera pose, landmark ids, ray casting.
//! - [`frontal`], [`views`]: anchor search and view sampling.
//! - [`adapter`], [`detect2d`]: per-view render, detect and pick.
//! - [`aggregate`], [`prior`]: candidate filtering and the geometric fallback.
//! - [`FiducialPipeline`]: the end-to-end run.

pub mod adapter;
pub mod aggregate;
pub mod backend;
pub mod detect2d;
mod detector;
pub mod frontal;
mod io;
pub mod prior;
pub mod views;

pub use face_fiducials_core as core;

pub use adapter::{RenderPickAdapter, RenderedView, ViewOutcome, ViewReport, ViewStatus};
pub use aggregate::{Aggregator, FiducialStatus, Reduction};
pub use backend::{BackendError, Picker, Renderer};
pub use detect2d::{FaceLandmarks2d, LandmarkDetector2d, LandmarkScheme, SchemeEntry};
pub use detector::{
    CancelToken, FiducialDetectionResult, FiducialError, FiducialParams, FiducialPipeline,
    FiducialResult, ParamsError,
};
pub use frontal::{FrontalSearchParams, FrontalView};
pub use io::{FiducialConfig, FiducialIoError, FiducialReport};
pub use prior::GeometricPrior;
pub use views::ViewSamplerParams;

pub use face_fiducials_core::{
    Candidate3D, CoordinateSystem, LandmarkId, Mesh, MeshError, MeshRayCaster,
};
