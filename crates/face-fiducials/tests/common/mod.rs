//! Synthetic face shell and mock backends shared by the integration tests.

#![allow(dead_code)]

use face_fiducials::core::CameraPose;
use face_fiducials::{
    BackendError, CancelToken, FaceLandmarks2d, LandmarkDetector2d, LandmarkId, LandmarkScheme,
    Mesh, MeshRayCaster, Picker, Renderer,
};
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3, Vector3};

/// Pick distance under which a painted landmark counts as visible.
pub const VISIBLE_TOL: f64 = 0.1;

/// Unit-sphere direction at azimuth `az_deg` (towards +x = subject's left)
/// and elevation `el_deg`, with azimuth 0 facing anterior (-y, LPS).
pub fn shell_dir(az_deg: f64, el_deg: f64) -> Vector3<f64> {
    let (az, el) = (az_deg.to_radians(), el_deg.to_radians());
    Vector3::new(el.cos() * az.sin(), -el.cos() * az.cos(), el.sin())
}

fn outward(vertices: &[Point3<f64>], [a, b, c]: [u32; 3]) -> [u32; 3] {
    let (pa, pb, pc) = (
        vertices[a as usize],
        vertices[b as usize],
        vertices[c as usize],
    );
    let normal = (pb - pa).cross(&(pc - pa));
    let centroid = (pa.coords + pb.coords + pc.coords) / 3.0;
    if normal.dot(&centroid) < 0.0 {
        [a, c, b]
    } else {
        [a, b, c]
    }
}

/// Open spherical shell facing -y, azimuth ±100°, elevation ±80°, on a 10°
/// grid. Outward normals.
pub fn face_shell() -> Mesh {
    let azs: Vec<f64> = (-10..=10).map(|k| k as f64 * 10.0).collect();
    let els: Vec<f64> = (-8..=8).map(|k| k as f64 * 10.0).collect();
    let mut vertices = Vec::new();
    for &el in &els {
        for &az in &azs {
            vertices.push(Point3::from(shell_dir(az, el)));
        }
    }
    let cols = azs.len() as u32;
    let rows = els.len() as u32;
    let mut triangles = Vec::new();
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let a = r * cols + c;
            let b = a + 1;
            let d = a + cols;
            let e = d + 1;
            triangles.push(outward(&vertices, [a, b, e]));
            triangles.push(outward(&vertices, [a, e, d]));
        }
    }
    Mesh::new(vertices, triangles).expect("valid shell")
}

/// Ground-truth fiducials on shell vertices.
pub fn truth() -> Vec<(LandmarkId, Point3<f64>)> {
    let at = |az, el| Point3::from(shell_dir(az, el));
    vec![
        (LandmarkId::LeftTragus, at(90.0, 0.0)),
        (LandmarkId::LeftEyeOuter, at(30.0, 0.0)),
        (LandmarkId::LeftEyeInner, at(10.0, 0.0)),
        (LandmarkId::Nasion, at(0.0, 10.0)),
        (LandmarkId::RightEyeInner, at(-10.0, 0.0)),
        (LandmarkId::RightEyeOuter, at(-30.0, 0.0)),
        (LandmarkId::RightTragus, at(-90.0, 0.0)),
    ]
}

fn landmark_color(id: LandmarkId) -> Rgb<u8> {
    Rgb([255, 10 * (id.index() as u8 + 1), 7])
}

fn color_landmark(px: &Rgb<u8>) -> Option<LandmarkId> {
    let [r, g, b] = px.0;
    if r != 255 || b != 7 || g % 10 != 0 || g == 0 {
        return None;
    }
    LandmarkId::ALL.get(g as usize / 10 - 1).copied()
}

/// Paints every landmark that the camera can see as one colored pixel.
pub struct PaintingRenderer {
    pub points: Vec<(LandmarkId, Point3<f64>)>,
}

impl Renderer for PaintingRenderer {
    fn render(&self, mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError> {
        let mut image = RgbImage::new(pose.width, pose.height);
        let caster = MeshRayCaster::new();
        for (id, p) in &self.points {
            let Some(px) = pose.project(p) else {
                continue;
            };
            if !pose.contains_pixel(px) {
                continue;
            }
            let (col, row) = (px.x.floor() as u32, px.y.floor() as u32);
            let center = Point2::new(col as f64 + 0.5, row as f64 + 0.5);
            let visible = caster
                .pick(mesh, pose, center)
                .is_some_and(|hit| (hit - p).norm() < VISIBLE_TOL);
            if visible {
                image.put_pixel(col, row, landmark_color(*id));
            }
        }
        Ok(image)
    }
}

/// Finds the painted pixels and reports them in the 68-point layout.
pub struct PaintDetector;

impl LandmarkDetector2d for PaintDetector {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError> {
        let scheme = LandmarkScheme::Ibug68;
        let mut points = vec![Point2::new(-1.0, -1.0); 68];
        let mut found = false;
        for (x, y, px) in image.enumerate_pixels() {
            let Some(id) = color_landmark(px) else {
                continue;
            };
            if let Some(i) = scheme.index_of(id) {
                points[i] = Point2::new(x as f64 + 0.5, y as f64 + 0.5);
                found = true;
            }
        }
        Ok(found.then_some(FaceLandmarks2d {
            points,
            normalized: false,
        }))
    }
}

/// Renders nothing.
pub struct BlankRenderer;

impl Renderer for BlankRenderer {
    fn render(&self, _mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError> {
        Ok(RgbImage::new(pose.width, pose.height))
    }
}

/// Normalized x position reported for a landmark by [`FixedDetector`].
pub fn fixed_x(id: LandmarkId) -> f64 {
    0.1 + 0.1 * id.index() as f64
}

/// Reports every fiducial at the same place in every image.
pub struct FixedDetector;

impl LandmarkDetector2d for FixedDetector {
    fn detect(&self, _image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError> {
        let scheme = LandmarkScheme::Ibug68;
        let mut points = vec![Point2::new(0.5, 0.5); 68];
        for id in LandmarkId::ALL {
            let i = scheme.index_of(id).expect("ibug68 covers all fiducials");
            points[i] = Point2::new(fixed_x(id), 0.5);
        }
        Ok(Some(FaceLandmarks2d {
            points,
            normalized: true,
        }))
    }
}

/// Maps a pixel to a fixed surface point, independent of the pose.
pub struct PixelPicker;

impl PixelPicker {
    pub fn point_for(pixel: Point2<f64>) -> Point3<f64> {
        Point3::new(pixel.x, pixel.y, 1.0)
    }
}

impl Picker for PixelPicker {
    fn pick(&self, _mesh: &Mesh, _pose: &CameraPose, pixel: Point2<f64>) -> Option<Point3<f64>> {
        Some(Self::point_for(pixel))
    }
}

/// Cancels the run from inside the first render.
pub struct CancellingRenderer {
    pub token: CancelToken,
}

impl Renderer for CancellingRenderer {
    fn render(&self, _mesh: &Mesh, pose: &CameraPose) -> Result<RgbImage, BackendError> {
        self.token.cancel();
        Ok(RgbImage::new(pose.width, pose.height))
    }
}
