//! Coarse fiducial positions from mesh geometry alone.
//!
//! Nasion is taken as the most anterior vertex close to the face axis, the
//! tragus points as the most lateral vertices close to the ear-to-ear axis,
//! and the eye corners are interpolated between nasion and tragus (inner at a
//! quarter, outer at half way) and pushed back onto the radial shell between
//! them. This is far less accurate than the multi-view estimate and only
//! stands in for landmarks that no view could observe.

use face_fiducials_core::{LandmarkId, Mesh};
use nalgebra::{Point3, Vector3};

/// Slab half-width around an axis, relative to the mean bounding-box side.
const AXIS_SLAB_FRAC: f64 = 1.0 / 30.0;

/// Geometric estimate of all seven fiducials.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometricPrior {
    positions: [Point3<f64>; LandmarkId::COUNT],
}

/// Vertex maximizing `score` among those within `slab` of the line through
/// `center` along `axis`; any vertex if the slab is empty.
fn extreme_near_axis(
    mesh: &Mesh,
    center: &Point3<f64>,
    axis: &Vector3<f64>,
    slab: f64,
    sign: f64,
) -> Point3<f64> {
    let score = |v: &Point3<f64>| sign * (v - center).dot(axis);
    let off_axis = |v: &Point3<f64>| {
        let c = v - center;
        (c - axis * c.dot(axis)).norm()
    };
    let best = |near_only: bool| {
        mesh.vertices
            .iter()
            .filter(|v| !near_only || off_axis(*v) < slab)
            .max_by(|a, b| score(*a).total_cmp(&score(*b)))
            .copied()
    };
    best(true).or_else(|| best(false)).unwrap_or(*center)
}

/// Interpolate between `ear` and `nasion` and rescale to the blended radius.
fn shell_blend(
    center: &Point3<f64>,
    ear: &Point3<f64>,
    nasion: &Point3<f64>,
    w_ear: f64,
) -> Point3<f64> {
    let w_nasion = 1.0 - w_ear;
    let p = Point3::from(ear.coords * w_ear + nasion.coords * w_nasion);
    let r = (p - center).norm();
    if r <= f64::EPSILON {
        return p;
    }
    let target_r = (ear - center).norm() * w_ear + (nasion - center).norm() * w_nasion;
    center + (p - center) * (target_r / r)
}

impl GeometricPrior {
    /// Estimate fiducials given the face direction and the head's up axis.
    ///
    /// `forward` points out of the face; both vectors need not be unit length.
    pub fn estimate(mesh: &Mesh, forward: &Vector3<f64>, up: &Vector3<f64>) -> Self {
        let center = mesh.centroid();
        let forward = forward.normalize();
        let up = (up - forward * up.dot(&forward)).normalize();
        let left = up.cross(&forward);

        let ravg = mesh
            .bounds()
            .map(|(lo, hi)| (hi - lo).sum() / 3.0)
            .unwrap_or(0.0);
        let slab = ravg * AXIS_SLAB_FRAC;

        let nasion = extreme_near_axis(mesh, &center, &forward, slab, 1.0);
        let left_ear = extreme_near_axis(mesh, &center, &left, slab, 1.0);
        let right_ear = extreme_near_axis(mesh, &center, &left, slab, -1.0);

        let mut positions = [center; LandmarkId::COUNT];
        positions[LandmarkId::Nasion.index()] = nasion;
        positions[LandmarkId::LeftTragus.index()] = left_ear;
        positions[LandmarkId::RightTragus.index()] = right_ear;
        positions[LandmarkId::LeftEyeOuter.index()] =
            shell_blend(&center, &left_ear, &nasion, 0.5);
        positions[LandmarkId::LeftEyeInner.index()] =
            shell_blend(&center, &left_ear, &nasion, 0.25);
        positions[LandmarkId::RightEyeOuter.index()] =
            shell_blend(&center, &right_ear, &nasion, 0.5);
        positions[LandmarkId::RightEyeInner.index()] =
            shell_blend(&center, &right_ear, &nasion, 0.25);
        Self { positions }
    }

    #[inline]
    pub fn get(&self, landmark: LandmarkId) -> Point3<f64> {
        self.positions[landmark.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Octahedron: tip vertices on each axis at radius 1.
    fn octahedron() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, -1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, -1.0),
            ],
            vec![
                [0, 2, 4],
                [2, 1, 4],
                [1, 3, 4],
                [3, 0, 4],
                [2, 0, 5],
                [1, 2, 5],
                [3, 1, 5],
                [0, 3, 5],
            ],
        )
        .unwrap()
    }

    #[test]
    fn axis_tips_become_nasion_and_ears() {
        // Face looks along +z with +y up: subject's left is +x.
        let prior = GeometricPrior::estimate(&octahedron(), &Vector3::z(), &Vector3::y());
        assert_eq!(prior.get(LandmarkId::Nasion), Point3::new(0.0, 0.0, 1.0));
        assert_eq!(prior.get(LandmarkId::LeftTragus), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(prior.get(LandmarkId::RightTragus), Point3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn eye_corners_lie_on_the_shell_between_nasion_and_ears() {
        let prior = GeometricPrior::estimate(&octahedron(), &Vector3::z(), &Vector3::y());
        for id in [
            LandmarkId::LeftEyeOuter,
            LandmarkId::LeftEyeInner,
            LandmarkId::RightEyeInner,
            LandmarkId::RightEyeOuter,
        ] {
            let p = prior.get(id);
            assert_relative_eq!(p.coords.norm(), 1.0, epsilon = 1e-12);
            assert!(p.z > 0.0);
        }
        assert!(prior.get(LandmarkId::LeftEyeOuter).x > prior.get(LandmarkId::LeftEyeInner).x);
        assert!(prior.get(LandmarkId::RightEyeOuter).x < prior.get(LandmarkId::RightEyeInner).x);
    }
}
