//! Per-view render, detect and pick.
//!
//! A view is processed in isolation: the mesh is rendered from the view's
//! pose, the detector reports fiducial pixels and each pixel is picked back
//! onto the surface. Every failure stays local to the view and is recorded
//! in its [`ViewReport`].

use crate::backend::{BackendError, Picker, Renderer};
use crate::detect2d::{Detection2d, DetectorAdapter, LandmarkDetector2d, LandmarkScheme};
use face_fiducials_core::{CameraPose, Candidate3D, Mesh};
use image::RgbImage;
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A rendered image together with the pose it was rendered from.
#[derive(Clone, Debug)]
pub struct RenderedView {
    pub index: usize,
    pub pose: CameraPose,
    pub image: RgbImage,
}

impl RenderedView {
    /// Map an image pixel into the pose's pixel grid.
    ///
    /// Renderers may return an image of a different resolution than the pose
    /// asks for; picking always happens in pose pixels.
    pub fn to_pose_pixel(&self, pixel: Point2<f64>) -> Point2<f64> {
        let (w, h) = self.image.dimensions();
        if (w == self.pose.width && h == self.pose.height) || w == 0 || h == 0 {
            return pixel;
        }
        Point2::new(
            pixel.x * self.pose.width as f64 / w as f64,
            pixel.y * self.pose.height as f64 / h as f64,
        )
    }
}

/// Why a view did or did not contribute candidates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewStatus {
    Ok,
    NoFace,
    RenderFailed { message: String },
    DetectFailed { message: String },
    /// Processing exceeded the per-view budget; its candidates were dropped.
    TimedOut { elapsed_ms: u64 },
}

/// Diagnostics of one processed view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub index: usize,
    pub pose: CameraPose,
    pub status: ViewStatus,
    /// Fiducials reported by the detector.
    pub detected: usize,
    /// Fiducials whose pick hit the mesh.
    pub picked: usize,
    pub elapsed_ms: u64,
}

/// Report and candidates of one view.
#[derive(Clone, Debug)]
pub struct ViewOutcome {
    pub report: ViewReport,
    pub candidates: Vec<Candidate3D>,
}

/// Drives the external renderer, detector and picker for single views.
pub struct RenderPickAdapter<'a, R: ?Sized, P: ?Sized, D: ?Sized> {
    mesh: &'a Mesh,
    renderer: &'a R,
    picker: &'a P,
    detector: DetectorAdapter<'a, D>,
    timeout: Option<Duration>,
}

impl<'a, R, P, D> RenderPickAdapter<'a, R, P, D>
where
    R: Renderer + ?Sized,
    P: Picker + ?Sized,
    D: LandmarkDetector2d + ?Sized,
{
    pub fn new(
        mesh: &'a Mesh,
        renderer: &'a R,
        picker: &'a P,
        detector: &'a D,
        scheme: &'a LandmarkScheme,
    ) -> Self {
        Self {
            mesh,
            renderer,
            picker,
            detector: DetectorAdapter::new(detector, scheme),
            timeout: None,
        }
    }

    /// Drop views whose processing takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn render(&self, index: usize, pose: &CameraPose) -> Result<RenderedView, BackendError> {
        let image = self.renderer.render(self.mesh, pose)?;
        Ok(RenderedView {
            index,
            pose: *pose,
            image,
        })
    }

    /// Pick every detection; misses are dropped.
    pub fn pick(&self, view: &RenderedView, detections: &[Detection2d]) -> Vec<Candidate3D> {
        detections
            .iter()
            .filter_map(|d| {
                let pixel = view.to_pose_pixel(d.pixel);
                match self.picker.pick(self.mesh, &view.pose, pixel) {
                    Some(position) => Some(Candidate3D {
                        landmark: d.landmark,
                        position,
                        view_index: view.index,
                    }),
                    None => {
                        debug!(
                            "view {}: {} at ({:.1}, {:.1}) missed the mesh",
                            view.index, d.landmark, pixel.x, pixel.y
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Render, detect and pick one view.
    pub fn process(&self, index: usize, pose: &CameraPose) -> ViewOutcome {
        let start = Instant::now();
        let mut report = ViewReport {
            index,
            pose: *pose,
            status: ViewStatus::Ok,
            detected: 0,
            picked: 0,
            elapsed_ms: 0,
        };

        let mut candidates = match self.render(index, pose) {
            Err(err) => {
                warn!("view {index}: {err}");
                report.status = ViewStatus::RenderFailed {
                    message: err.to_string(),
                };
                Vec::new()
            }
            Ok(view) => match self.detector.detect(&view.image) {
                Err(err) => {
                    warn!("view {index}: {err}");
                    report.status = ViewStatus::DetectFailed {
                        message: err.to_string(),
                    };
                    Vec::new()
                }
                Ok(detections) if detections.is_empty() => {
                    debug!("view {index}: no face detected");
                    report.status = ViewStatus::NoFace;
                    Vec::new()
                }
                Ok(detections) => {
                    report.detected = detections.len();
                    self.pick(&view, &detections)
                }
            },
        };

        let elapsed = start.elapsed();
        report.elapsed_ms = elapsed.as_millis() as u64;
        if let Some(limit) = self.timeout {
            if elapsed > limit {
                warn!(
                    "view {index}: took {} ms, over the {} ms budget; dropped",
                    report.elapsed_ms,
                    limit.as_millis()
                );
                report.status = ViewStatus::TimedOut {
                    elapsed_ms: report.elapsed_ms,
                };
                candidates.clear();
            }
        }
        report.picked = candidates.len();
        ViewOutcome { report, candidates }
    }
}
