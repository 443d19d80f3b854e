//! Camera poses, pinhole projection and coordinate-frame helpers.
//!
//! Pixel coordinates follow the image convention: `x` grows to the right,
//! `y` grows downwards, the pixel `(0, 0)` covers `[0, 1) x [0, 1)`.

use nalgebra::{Isometry3, Point2, Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vertical field of view used when a caller does not specify one.
pub const DEFAULT_FOV_Y_DEG: f64 = 30.0;

const PARALLEL_EPS: f64 = 1e-9;

/// Errors produced when a camera pose cannot be constructed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("camera eye coincides with target")]
    EyeAtTarget,
    #[error("up vector is parallel to the viewing direction")]
    UpParallelToForward,
    #[error("invalid vertical field of view {0} deg (expected 0 < fov < 180)")]
    InvalidFov(f64),
    #[error("invalid image size {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

/// A ray with a unit-length direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub dir: Vector3<f64>,
}

impl Ray {
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.dir * t
    }
}

/// Pinhole camera looking from `eye` at `target`.
///
/// Poses are value types: every view gets a freshly built pose and nothing
/// mutates it afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub eye: Point3<f64>,
    pub target: Point3<f64>,
    pub up: Vector3<f64>,
    pub fov_y_deg: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraPose {
    /// Build a validated look-at pose.
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
        fov_y_deg: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, PoseError> {
        let forward = target - eye;
        if forward.norm() < PARALLEL_EPS {
            return Err(PoseError::EyeAtTarget);
        }
        if forward.normalize().cross(&up).norm() < PARALLEL_EPS {
            return Err(PoseError::UpParallelToForward);
        }
        if !(fov_y_deg > 0.0 && fov_y_deg < 180.0) {
            return Err(PoseError::InvalidFov(fov_y_deg));
        }
        if width == 0 || height == 0 {
            return Err(PoseError::EmptyImage { width, height });
        }
        Ok(Self {
            eye,
            target,
            up,
            fov_y_deg,
            width,
            height,
        })
    }

    /// Unit viewing direction (from eye towards target).
    #[inline]
    pub fn forward(&self) -> Vector3<f64> {
        (self.target - self.eye).normalize()
    }

    /// Unit vector pointing to the right of the image.
    #[inline]
    pub fn right(&self) -> Vector3<f64> {
        self.forward().cross(&self.up).normalize()
    }

    /// Unit up vector orthogonalized against the viewing direction.
    #[inline]
    pub fn true_up(&self) -> Vector3<f64> {
        self.right().cross(&self.forward())
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        (self.target - self.eye).norm()
    }

    /// World-to-camera transform. The camera looks down its local `-Z`.
    pub fn view(&self) -> Isometry3<f64> {
        Isometry3::look_at_rh(&self.eye, &self.target, &self.up)
    }

    /// Focal length in pixels derived from the vertical field of view.
    #[inline]
    pub fn focal_px(&self) -> f64 {
        0.5 * self.height as f64 / (0.5 * self.fov_y_deg.to_radians()).tan()
    }

    #[inline]
    pub fn principal_point(&self) -> Point2<f64> {
        Point2::new(0.5 * self.width as f64, 0.5 * self.height as f64)
    }

    /// Project a world point to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the camera plane. The result may
    /// lie outside the image; use [`CameraPose::contains_pixel`] to check.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        self.project_with(&self.view(), p)
    }

    /// [`CameraPose::project`] with a precomputed [`CameraPose::view`], for
    /// projecting many points from one pose.
    pub fn project_with(&self, view: &Isometry3<f64>, p: &Point3<f64>) -> Option<Point2<f64>> {
        let pc = view * p;
        let depth = -pc.z;
        if depth <= PARALLEL_EPS {
            return None;
        }
        let f = self.focal_px();
        let c = self.principal_point();
        Some(Point2::new(c.x + f * pc.x / depth, c.y - f * pc.y / depth))
    }

    /// World-space ray through the given pixel position.
    pub fn pixel_ray(&self, pixel: Point2<f64>) -> Ray {
        let f = self.focal_px();
        let c = self.principal_point();
        let dir_cam = Vector3::new((pixel.x - c.x) / f, -(pixel.y - c.y) / f, -1.0);
        let dir = self.view().inverse_transform_vector(&dir_cam).normalize();
        Ray {
            origin: self.eye,
            dir,
        }
    }

    #[inline]
    pub fn contains_pixel(&self, pixel: Point2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < self.width as f64
            && pixel.y < self.height as f64
    }

    /// Whether `pixel` lies in the centered window covering `frac` of each image side.
    pub fn in_central_region(&self, pixel: Point2<f64>, frac: f64) -> bool {
        let c = self.principal_point();
        let hw = 0.5 * frac * self.width as f64;
        let hh = 0.5 * frac * self.height as f64;
        (pixel.x - c.x).abs() <= hw && (pixel.y - c.y).abs() <= hh
    }
}

/// Rotate `v` by `angle_rad` around `axis` (right-hand rule).
pub fn rotate_about(v: &Vector3<f64>, axis: &Vector3<f64>, angle_rad: f64) -> Vector3<f64> {
    let q = UnitQuaternion::from_axis_angle(&Unit::new_normalize(*axis), angle_rad);
    q * v
}

/// Anatomical world frame convention of a mesh or point set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Left, posterior, superior.
    #[default]
    #[serde(rename = "LPS")]
    Lps,
    /// Right, anterior, superior.
    #[serde(rename = "RAS")]
    Ras,
}

impl CoordinateSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystem::Lps => "LPS",
            CoordinateSystem::Ras => "RAS",
        }
    }

    /// Express a point given in `self` in the `target` convention.
    ///
    /// RAS and LPS differ by a half-turn about the superior axis.
    pub fn convert_point(&self, p: &Point3<f64>, target: CoordinateSystem) -> Point3<f64> {
        if *self == target {
            *p
        } else {
            Point3::new(-p.x, -p.y, p.z)
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
