//! Capability interfaces for the external rendering and picking engines.
//!
//! The pipeline never rasterizes or ray-casts on its own behalf; it asks a
//! [`Renderer`] for an image of the mesh and a [`Picker`] for the surface
//! point behind a pixel. Both are shared across worker threads.

use face_fiducials_core::{CameraPose, Mesh, MeshRayCaster};
use image::RgbImage;
use nalgebra::{Point2, Point3};

/// Failure reported by an external collaborator for a single view.
///
/// These never abort a run; the view is dropped and recorded in the report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("landmark detection failed: {0}")]
    Detect(String),
}

/// Renders a mesh as seen from a camera pose.
pub trait Renderer: Sync {
    /// Produce an RGB image of `mesh` from `pose`.
    ///
    /// The image is expected to be `pose.width x pose.height`; other sizes
    /// are accepted and detections are rescaled into pose pixels.
    fn render(&self, mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError>;
}

/// Answers which surface point a pixel of a rendered view shows.
pub trait Picker: Sync {
    /// Surface point seen through `pixel`, `None` if the ray misses the mesh.
    fn pick(&self, mesh: &Mesh, pose: &CameraPose, pixel: Point2<f64>) -> Option<Point3<f64>>;
}

impl Picker for MeshRayCaster {
    fn pick(&self, mesh: &Mesh, pose: &CameraPose, pixel: Point2<f64>) -> Option<Point3<f64>> {
        MeshRayCaster::pick(self, mesh, pose, pixel)
    }
}

impl<T: Renderer + ?Sized> Renderer for &T {
    fn render(&self, mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError> {
        (**self).render(mesh, pose)
    }
}

impl<T: Picker + ?Sized> Picker for &T {
    fn pick(&self, mesh: &Mesh, pose: &CameraPose, pixel: Point2<f64>) -> Option<Point3<f64>> {
        (**self).pick(mesh, pose, pixel)
    }
}
