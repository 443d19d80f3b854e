use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Errors raised when a mesh fails validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    NoVertices,
    #[error("mesh has no triangles")]
    NoTriangles,
    #[error(
        "triangle {triangle} references vertex {index} but the mesh has {num_vertices} vertices"
    )]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        num_vertices: usize,
    },
    #[error("vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(usize),
    #[error("texture coordinate count {got} does not match vertex count {expected}")]
    TexCoordCount { expected: usize, got: usize },
}

/// Triangle surface mesh, e.g. a photogrammetry face scan.
///
/// The pipeline only ever borrows a mesh; it never mutates the geometry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<[u32; 3]>,
    /// Optional per-vertex texture coordinates.
    #[serde(default)]
    pub tex_coords: Option<Vec<Point2<f64>>>,
}

impl Mesh {
    /// Build and validate a mesh without texture coordinates.
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        let mesh = Self {
            vertices,
            triangles,
            tex_coords: None,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_tex_coords(mut self, tex_coords: Vec<Point2<f64>>) -> Result<Self, MeshError> {
        if tex_coords.len() != self.vertices.len() {
            return Err(MeshError::TexCoordCount {
                expected: self.vertices.len(),
                got: tex_coords.len(),
            });
        }
        self.tex_coords = Some(tex_coords);
        Ok(self)
    }

    /// Check that the mesh is non-empty, finite and index-consistent.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if self.triangles.is_empty() {
            return Err(MeshError::NoTriangles);
        }
        if let Some(i) = self
            .vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex(i));
        }
        let n = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= n) {
                return Err(MeshError::IndexOutOfRange {
                    triangle: t,
                    index,
                    num_vertices: n,
                });
            }
        }
        if let Some(uv) = &self.tex_coords {
            if uv.len() != n {
                return Err(MeshError::TexCoordCount {
                    expected: n,
                    got: uv.len(),
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[t];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Unit normal of triangle `t` from its winding, or `None` for zero area.
    pub fn triangle_normal(&self, t: usize) -> Option<Vector3<f64>> {
        let [a, b, c] = self.triangle(t);
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        (len > 0.0).then(|| n / len)
    }

    pub fn triangle_centroid(&self, t: usize) -> Point3<f64> {
        let [a, b, c] = self.triangle(t);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Mean of all vertex positions.
    pub fn centroid(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Axis-aligned bounds `(min, max)`.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        }))
    }

    /// Largest distance from `center` to any vertex.
    pub fn radius_about(&self, center: &Point3<f64>) -> f64 {
        self.vertices
            .iter()
            .map(|v| (v - center).norm())
            .fold(0.0, f64::max)
    }
}
