use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven facial fiducials used to seed registration.
///
/// Left and right refer to the subject's sides, not to the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkId {
    LeftTragus,
    LeftEyeOuter,
    LeftEyeInner,
    Nasion,
    RightEyeInner,
    RightEyeOuter,
    RightTragus,
}

impl LandmarkId {
    pub const COUNT: usize = 7;

    /// All fiducials in canonical output order (left ear to right ear).
    pub const ALL: [LandmarkId; Self::COUNT] = [
        LandmarkId::LeftTragus,
        LandmarkId::LeftEyeOuter,
        LandmarkId::LeftEyeInner,
        LandmarkId::Nasion,
        LandmarkId::RightEyeInner,
        LandmarkId::RightEyeOuter,
        LandmarkId::RightTragus,
    ];

    /// Position in [`LandmarkId::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Control point label used by markup files.
    pub fn label(self) -> &'static str {
        match self {
            LandmarkId::LeftTragus => "left_ear",
            LandmarkId::LeftEyeOuter => "left_eye_outside",
            LandmarkId::LeftEyeInner => "left_eye_inside",
            LandmarkId::Nasion => "nasion",
            LandmarkId::RightEyeInner => "right_eye_inside",
            LandmarkId::RightEyeOuter => "right_eye_outside",
            LandmarkId::RightTragus => "right_ear",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.label() == label)
    }
}

impl fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One surface point observed for a landmark in one rendered view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate3D {
    pub landmark: LandmarkId,
    pub position: Point3<f64>,
    pub view_index: usize,
}
