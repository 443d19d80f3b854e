//! Frontal view search.
//!
//! Candidate cameras sit on a sphere around the mesh centroid. Starting from
//! the configured face axis they are swept in yaw (about the up axis) and
//! pitch (about the ear-to-ear axis) on a fixed angular step. Each camera is
//! scored by the projected area of the triangles that face it and project
//! into the central part of its image; the best camera anchors the multi-view
//! sweep.

use crate::ParamsError;
use face_fiducials_core::{rotate_about, CameraPose, Mesh, PoseError};
use log::{debug, warn};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Settings of the frontal view search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontalSearchParams {
    /// Initial guess of the direction the face looks at (mesh frame).
    pub forward_axis: Vector3<f64>,
    /// Head up direction (mesh frame).
    pub up_axis: Vector3<f64>,
    /// Yaw is searched in `[-yaw_range_deg, +yaw_range_deg]`.
    pub yaw_range_deg: f64,
    /// Pitch is searched in `[-pitch_range_deg, +pitch_range_deg]`.
    pub pitch_range_deg: f64,
    /// Minimum cosine between a triangle normal and the direction to the
    /// camera for the triangle to count as facing it.
    pub facing_cos_min: f64,
    /// Side fraction of the centered image window counted by the score.
    pub central_frac: f64,
    /// Camera distance as a multiple of the distance at which the bounding
    /// sphere exactly fills the vertical field of view.
    pub distance_scale: f64,
}

impl Default for FrontalSearchParams {
    fn default() -> Self {
        // LPS: anterior is -y, superior is +z.
        Self {
            forward_axis: Vector3::new(0.0, -1.0, 0.0),
            up_axis: Vector3::new(0.0, 0.0, 1.0),
            yaw_range_deg: 180.0,
            pitch_range_deg: 30.0,
            facing_cos_min: 0.2,
            central_frac: 0.8,
            distance_scale: 1.1,
        }
    }
}

impl FrontalSearchParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let up_norm = self.up_axis.norm();
        let fwd_norm = self.forward_axis.norm();
        if !(up_norm.is_finite() && up_norm > 0.0 && fwd_norm.is_finite() && fwd_norm > 0.0) {
            return Err(ParamsError::DegenerateAxis);
        }
        let cos = self.forward_axis.dot(&self.up_axis) / (up_norm * fwd_norm);
        if cos.abs() > 0.999 {
            return Err(ParamsError::ParallelAxes);
        }
        let out_of_range = |name, value, range| ParamsError::OutOfRange { name, value, range };
        if !(0.0..=180.0).contains(&self.yaw_range_deg) {
            return Err(out_of_range("yaw_range_deg", self.yaw_range_deg, "[0, 180]"));
        }
        if !(0.0..=80.0).contains(&self.pitch_range_deg) {
            return Err(out_of_range("pitch_range_deg", self.pitch_range_deg, "[0, 80]"));
        }
        if !(-1.0..=1.0).contains(&self.facing_cos_min) {
            return Err(out_of_range("facing_cos_min", self.facing_cos_min, "[-1, 1]"));
        }
        if !(self.central_frac > 0.0 && self.central_frac <= 1.0) {
            return Err(out_of_range("central_frac", self.central_frac, "(0, 1]"));
        }
        if !(self.distance_scale.is_finite() && self.distance_scale > 0.0) {
            return Err(out_of_range("distance_scale", self.distance_scale, "(0, inf)"));
        }
        Ok(())
    }

    /// Unit face axis and up axis, with up orthogonalized against the face axis.
    pub fn frame(&self) -> (Vector3<f64>, Vector3<f64>) {
        let forward = self.forward_axis.normalize();
        let up = (self.up_axis - forward * self.up_axis.dot(&forward)).normalize();
        (forward, up)
    }
}

/// The anchor camera chosen by the search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontalView {
    pub pose: CameraPose,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    /// Projected area of the facing triangles in the central region.
    pub score: f64,
    pub candidates_evaluated: usize,
    /// Set when no candidate scored and the configured axis was used.
    pub fallback: bool,
}

impl FrontalView {
    /// Unit direction out of the face (from the mesh center towards the camera).
    pub fn face_forward(&self) -> Vector3<f64> {
        (self.pose.eye - self.pose.target).normalize()
    }

    pub fn face_up(&self) -> Vector3<f64> {
        self.pose.true_up()
    }
}

/// Triangle data needed for scoring, computed once per search.
struct Facet {
    centroid: Point3<f64>,
    normal: Vector3<f64>,
    area: f64,
}

/// Relative margin below which two scores count as equal.
const SCORE_TIE_REL: f64 = 1e-9;

/// Symmetric offsets `k * step` covering `[-range, range]`. A full turn does
/// not repeat the `±180°` direction.
fn sweep_offsets(range_deg: f64, step_deg: f64) -> Vec<f64> {
    let n = (range_deg / step_deg + 1e-9).floor() as i64;
    let full_turn = 2.0 * n as f64 * step_deg >= 360.0 - 1e-9;
    let hi = if full_turn { n - 1 } else { n };
    (-n..=hi).map(|k| k as f64 * step_deg).collect()
}

/// Finds the camera pose that sees the face most frontally.
pub struct FrontalLocator<'a> {
    params: &'a FrontalSearchParams,
    sweep_deg: f64,
    fov_y_deg: f64,
    image_size: u32,
}

impl<'a> FrontalLocator<'a> {
    pub fn new(
        params: &'a FrontalSearchParams,
        sweep_deg: f64,
        fov_y_deg: f64,
        image_size: u32,
    ) -> Self {
        Self {
            params,
            sweep_deg,
            fov_y_deg,
            image_size,
        }
    }

    /// Camera distance that keeps the whole mesh in view.
    fn camera_distance(&self, mesh: &Mesh, center: &Point3<f64>) -> f64 {
        let radius = mesh.radius_about(center).max(f64::EPSILON);
        let half_fov = 0.5 * self.fov_y_deg.to_radians();
        self.params.distance_scale * radius / half_fov.sin()
    }

    fn pose_for(
        &self,
        center: &Point3<f64>,
        distance: f64,
        yaw_deg: f64,
        pitch_deg: f64,
    ) -> Result<CameraPose, PoseError> {
        let (forward, up) = self.params.frame();
        let dir = direction_from(&forward, &up, yaw_deg, pitch_deg);
        CameraPose::look_at(
            center + dir * distance,
            *center,
            up,
            self.fov_y_deg,
            self.image_size,
            self.image_size,
        )
    }

    fn score(&self, pose: &CameraPose, facets: &[Facet]) -> f64 {
        let view = pose.view();
        facets
            .iter()
            .filter_map(|f| {
                let cos = f.normal.dot(&(pose.eye - f.centroid).normalize());
                let central = pose
                    .project_with(&view, &f.centroid)
                    .is_some_and(|px| pose.in_central_region(px, self.params.central_frac));
                (cos >= self.params.facing_cos_min && central).then(|| f.area * cos)
            })
            .sum()
    }

    /// Sweep all candidate orientations and return the best one.
    ///
    /// Ties keep the first candidate in sweep order (yaw-major, ascending),
    /// so the choice does not depend on summation noise.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, mesh), fields(triangles = mesh.num_triangles()))
    )]
    pub fn locate(&self, mesh: &Mesh) -> Result<FrontalView, PoseError> {
        let center = mesh.centroid();
        let distance = self.camera_distance(mesh, &center);
        let facets: Vec<Facet> = (0..mesh.num_triangles())
            .filter_map(|t| {
                let [a, b, c] = mesh.triangle(t);
                let cross = (b - a).cross(&(c - a));
                let len = cross.norm();
                (len > 0.0).then(|| Facet {
                    centroid: mesh.triangle_centroid(t),
                    normal: cross / len,
                    area: 0.5 * len,
                })
            })
            .collect();

        let mut grid = Vec::new();
        for yaw in sweep_offsets(self.params.yaw_range_deg, self.sweep_deg) {
            for pitch in sweep_offsets(self.params.pitch_range_deg, self.sweep_deg) {
                grid.push((yaw, pitch));
            }
        }

        let scored: Vec<(f64, f64, CameraPose, f64)> = grid
            .par_iter()
            .map(|&(yaw, pitch)| {
                let pose = self.pose_for(&center, distance, yaw, pitch)?;
                let score = self.score(&pose, &facets);
                Ok((yaw, pitch, pose, score))
            })
            .collect::<Result<_, PoseError>>()?;

        let mut best: Option<&(f64, f64, CameraPose, f64)> = None;
        for cand in &scored {
            if best.is_none_or(|b| cand.3 > b.3 + SCORE_TIE_REL * b.3.abs()) {
                best = Some(cand);
            }
        }

        match best {
            Some(&(yaw_deg, pitch_deg, pose, score)) if score > 0.0 => {
                debug!(
                    "frontal view: yaw={yaw_deg:.1} pitch={pitch_deg:.1} score={score:.4} \
                     of {} candidates",
                    scored.len()
                );
                Ok(FrontalView {
                    pose,
                    yaw_deg,
                    pitch_deg,
                    score,
                    candidates_evaluated: scored.len(),
                    fallback: false,
                })
            }
            _ => {
                warn!(
                    "no candidate orientation sees the face, \
                     falling back to the configured axis"
                );
                Ok(FrontalView {
                    pose: self.pose_for(&center, distance, 0.0, 0.0)?,
                    yaw_deg: 0.0,
                    pitch_deg: 0.0,
                    score: 0.0,
                    candidates_evaluated: scored.len(),
                    fallback: true,
                })
            }
        }
    }
}

/// Rotate `forward` by `yaw` about `up`, then by `pitch` about the resulting
/// lateral axis.
pub(crate) fn direction_from(
    forward: &Vector3<f64>,
    up: &Vector3<f64>,
    yaw_deg: f64,
    pitch_deg: f64,
) -> Vector3<f64> {
    let yawed = rotate_about(forward, up, yaw_deg.to_radians());
    if pitch_deg == 0.0 {
        return yawed;
    }
    let lateral = yawed.cross(up);
    rotate_about(&yawed, &lateral, pitch_deg.to_radians())
}
