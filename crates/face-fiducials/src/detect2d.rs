//! 2D landmark detector interface and the mapping onto the seven fiducials.
//!
//! Detectors report a dense, model-specific landmark layout (68-point iBUG,
//! 468-point face mesh, ...). A [`LandmarkScheme`] names which index of that
//! layout corresponds to each fiducial; [`DetectorAdapter`] applies it and
//! turns the detector output into pixel positions.

use crate::backend::BackendError;
use crate::ParamsError;
use face_fiducials_core::LandmarkId;
use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Landmarks of the single face found in an image.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks2d {
    /// Points in the detector's native index order.
    pub points: Vec<Point2<f64>>,
    /// `true` when points are in `[0, 1]` image-relative units, `false` for pixels.
    pub normalized: bool,
}

/// A pretrained 2D facial landmark detector.
pub trait LandmarkDetector2d: Sync {
    /// Detect facial landmarks; `Ok(None)` when no face is found.
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError>;
}

impl<T: LandmarkDetector2d + ?Sized> LandmarkDetector2d for &T {
    fn detect(&self, image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError> {
        (**self).detect(image)
    }
}

/// One fiducial-to-detector-index assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeEntry {
    pub landmark: LandmarkId,
    pub index: usize,
}

/// Which detector landmark index stands for which fiducial.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LandmarkScheme {
    /// 68-point iBUG / Multi-PIE layout. The tragus points are approximated
    /// by the jaw-line ends, which sit just in front of the ears.
    #[default]
    Ibug68,
    /// 468-point face mesh layout.
    #[serde(rename = "mediapipe468")]
    MediaPipe468,
    Custom { entries: Vec<SchemeEntry> },
}

const IBUG68: [SchemeEntry; LandmarkId::COUNT] = [
    SchemeEntry {
        landmark: LandmarkId::LeftTragus,
        index: 16,
    },
    SchemeEntry {
        landmark: LandmarkId::LeftEyeOuter,
        index: 45,
    },
    SchemeEntry {
        landmark: LandmarkId::LeftEyeInner,
        index: 42,
    },
    SchemeEntry {
        landmark: LandmarkId::Nasion,
        index: 27,
    },
    SchemeEntry {
        landmark: LandmarkId::RightEyeInner,
        index: 39,
    },
    SchemeEntry {
        landmark: LandmarkId::RightEyeOuter,
        index: 36,
    },
    SchemeEntry {
        landmark: LandmarkId::RightTragus,
        index: 0,
    },
];

const MEDIAPIPE468: [SchemeEntry; LandmarkId::COUNT] = [
    SchemeEntry {
        landmark: LandmarkId::LeftTragus,
        index: 454,
    },
    SchemeEntry {
        landmark: LandmarkId::LeftEyeOuter,
        index: 263,
    },
    SchemeEntry {
        landmark: LandmarkId::LeftEyeInner,
        index: 362,
    },
    SchemeEntry {
        landmark: LandmarkId::Nasion,
        index: 168,
    },
    SchemeEntry {
        landmark: LandmarkId::RightEyeInner,
        index: 133,
    },
    SchemeEntry {
        landmark: LandmarkId::RightEyeOuter,
        index: 33,
    },
    SchemeEntry {
        landmark: LandmarkId::RightTragus,
        index: 234,
    },
];

impl LandmarkScheme {
    pub fn entries(&self) -> &[SchemeEntry] {
        match self {
            LandmarkScheme::Ibug68 => &IBUG68,
            LandmarkScheme::MediaPipe468 => &MEDIAPIPE468,
            LandmarkScheme::Custom { entries } => entries,
        }
    }

    /// Detector index used for `landmark`, if the scheme covers it.
    pub fn index_of(&self, landmark: LandmarkId) -> Option<usize> {
        self.entries()
            .iter()
            .find(|e| e.landmark == landmark)
            .map(|e| e.index)
    }

    /// A fiducial may be mapped at most once; unmapped fiducials are allowed
    /// and simply never receive candidates.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let mut seen = [false; LandmarkId::COUNT];
        for e in self.entries() {
            let slot = &mut seen[e.landmark.index()];
            if *slot {
                return Err(ParamsError::DuplicateLandmark(e.landmark));
            }
            *slot = true;
        }
        Ok(())
    }
}

/// A fiducial located in a rendered image, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection2d {
    pub landmark: LandmarkId,
    pub pixel: Point2<f64>,
}

/// Runs a [`LandmarkDetector2d`] and keeps only the fiducials of a scheme.
pub struct DetectorAdapter<'a, D: ?Sized> {
    detector: &'a D,
    scheme: &'a LandmarkScheme,
}

impl<'a, D: LandmarkDetector2d + ?Sized> DetectorAdapter<'a, D> {
    pub fn new(detector: &'a D, scheme: &'a LandmarkScheme) -> Self {
        Self { detector, scheme }
    }

    /// Detect fiducials in `image`.
    ///
    /// Returns an empty list when no face is found. Points that are missing
    /// from the detector output, non-finite, or outside the image are dropped.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection2d>, BackendError> {
        let Some(face) = self.detector.detect(image)? else {
            return Ok(Vec::new());
        };
        Ok(map_to_fiducials(&face, self.scheme, image.width(), image.height()))
    }
}

/// Select the scheme's fiducials from `face`, converting to pixel units.
pub fn map_to_fiducials(
    face: &FaceLandmarks2d,
    scheme: &LandmarkScheme,
    width: u32,
    height: u32,
) -> Vec<Detection2d> {
    let (sx, sy) = if face.normalized {
        (width as f64, height as f64)
    } else {
        (1.0, 1.0)
    };
    scheme
        .entries()
        .iter()
        .filter_map(|e| {
            let p = face.points.get(e.index)?;
            let pixel = Point2::new(p.x * sx, p.y * sy);
            let inside = pixel.x.is_finite()
                && pixel.y.is_finite()
                && pixel.x >= 0.0
                && pixel.y >= 0.0
                && pixel.x < width as f64
                && pixel.y < height as f64;
            inside.then_some(Detection2d {
                landmark: e.landmark,
                pixel,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDetector(Option<FaceLandmarks2d>);

    impl LandmarkDetector2d for FixedDetector {
        fn detect(&self, _image: &RgbImage) -> Result<Option<FaceLandmarks2d>, BackendError> {
            Ok(self.0.clone())
        }
    }

    fn ibug_face(normalized: bool) -> FaceLandmarks2d {
        let points = (0..68)
            .map(|i| {
                let v = i as f64 / 100.0;
                if normalized {
                    Point2::new(v, v)
                } else {
                    Point2::new(v * 200.0, v * 100.0)
                }
            })
            .collect();
        FaceLandmarks2d { points, normalized }
    }

    #[test]
    fn builtin_schemes_cover_all_fiducials_once() {
        for scheme in [LandmarkScheme::Ibug68, LandmarkScheme::MediaPipe468] {
            scheme.validate().expect("valid scheme");
            for id in LandmarkId::ALL {
                assert!(scheme.index_of(id).is_some(), "{id} missing");
            }
        }
    }

    #[test]
    fn subject_left_eye_is_on_image_right_in_ibug68() {
        let s = LandmarkScheme::Ibug68;
        assert_eq!(s.index_of(LandmarkId::LeftEyeOuter), Some(45));
        assert_eq!(s.index_of(LandmarkId::RightEyeOuter), Some(36));
    }

    #[test]
    fn duplicate_custom_entries_are_rejected() {
        let scheme = LandmarkScheme::Custom {
            entries: vec![
                SchemeEntry {
                    landmark: LandmarkId::Nasion,
                    index: 1,
                },
                SchemeEntry {
                    landmark: LandmarkId::Nasion,
                    index: 2,
                },
            ],
        };
        assert_eq!(
            scheme.validate(),
            Err(ParamsError::DuplicateLandmark(LandmarkId::Nasion))
        );
    }

    #[test]
    fn normalized_points_scale_to_pixels() {
        let image = RgbImage::new(200, 100);
        let det = FixedDetector(Some(ibug_face(true)));
        let scheme = LandmarkScheme::Ibug68;
        let out = DetectorAdapter::new(&det, &scheme).detect(&image).unwrap();
        assert_eq!(out.len(), LandmarkId::COUNT);
        let nasion = out
            .iter()
            .find(|d| d.landmark == LandmarkId::Nasion)
            .unwrap();
        assert!((nasion.pixel.x - 54.0).abs() < 1e-9);
        assert!((nasion.pixel.y - 27.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_points_pass_through() {
        let face = ibug_face(false);
        let out = map_to_fiducials(&face, &LandmarkScheme::Ibug68, 200, 100);
        let right_tragus = out
            .iter()
            .find(|d| d.landmark == LandmarkId::RightTragus)
            .unwrap();
        assert_eq!(right_tragus.pixel, Point2::new(0.0, 0.0));
    }

    #[test]
    fn out_of_range_and_missing_points_are_dropped() {
        let mut face = ibug_face(true);
        face.points[27] = Point2::new(1.5, 0.5);
        face.points[16] = Point2::new(f64::NAN, 0.5);
        face.points.truncate(40);
        let out = map_to_fiducials(&face, &LandmarkScheme::Ibug68, 200, 100);
        let ids: Vec<_> = out.iter().map(|d| d.landmark).collect();
        assert_eq!(
            ids,
            vec![
                LandmarkId::RightEyeInner,
                LandmarkId::RightEyeOuter,
                LandmarkId::RightTragus
            ]
        );
    }

    #[test]
    fn no_face_yields_no_detections() {
        let image = RgbImage::new(10, 10);
        let det = FixedDetector(None);
        let scheme = LandmarkScheme::Ibug68;
        assert!(DetectorAdapter::new(&det, &scheme)
            .detect(&image)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn scheme_serde_is_tagged() {
        let json = serde_json::to_string(&LandmarkScheme::MediaPipe468).unwrap();
        assert_eq!(json, r#"{"kind":"mediapipe468"}"#);
        let back: LandmarkScheme = serde_json::from_str(r#"{"kind":"ibug68"}"#).unwrap();
        assert_eq!(back, LandmarkScheme::Ibug68);
    }
}
