//! Brute-force ray casting against a triangle mesh.
//!
//! This is the reference implementation of "which surface point does this
//! pixel see". It is exact but linear in the triangle count.

use crate::{CameraPose, Mesh, Ray};
use nalgebra::{Point2, Point3};

const EPS: f64 = 1e-12;

/// Nearest intersection of a ray with a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Point3<f64>,
    /// Ray parameter of the hit (distance along the unit direction).
    pub t: f64,
    pub triangle: usize,
}

/// Möller–Trumbore ray/triangle intersection.
///
/// Returns the ray parameter `t > 0` of the hit. With `cull_backfaces` set,
/// triangles whose winding faces away from the ray origin are ignored.
pub fn intersect_triangle(ray: &Ray, tri: &[Point3<f64>; 3], cull_backfaces: bool) -> Option<f64> {
    let [a, b, c] = tri;
    let e1 = b - a;
    let e2 = c - a;
    let pvec = ray.dir.cross(&e2);
    let det = e1.dot(&pvec);
    if cull_backfaces {
        if det < EPS {
            return None;
        }
    } else if det.abs() < EPS {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = ray.dir.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    (t > EPS).then_some(t)
}

/// Casts camera rays against a mesh and reports the nearest surface hit.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshRayCaster {
    /// Ignore triangles seen from behind.
    pub cull_backfaces: bool,
}

impl MeshRayCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backface_culling(mut self, cull: bool) -> Self {
        self.cull_backfaces = cull;
        self
    }

    /// Nearest hit of `ray` with any triangle of `mesh`.
    pub fn cast(&self, mesh: &Mesh, ray: &Ray) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for t_idx in 0..mesh.num_triangles() {
            let tri = mesh.triangle(t_idx);
            let Some(t) = intersect_triangle(ray, &tri, self.cull_backfaces) else {
                continue;
            };
            if best.is_none_or(|b| t < b.t) {
                best = Some(RayHit {
                    point: ray.at(t),
                    t,
                    triangle: t_idx,
                });
            }
        }
        best
    }

    /// Surface point seen through `pixel`, or `None` for background pixels and
    /// pixels outside the image.
    pub fn pick(&self, mesh: &Mesh, pose: &CameraPose, pixel: Point2<f64>) -> Option<Point3<f64>> {
        if !pose.contains_pixel(pixel) {
            return None;
        }
        self.cast(mesh, &pose.pixel_ray(pixel)).map(|hit| hit.point)
    }
}
