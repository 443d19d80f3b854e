use crate::adapter::ViewReport;
use crate::aggregate::FiducialStatus;
use crate::frontal::FrontalView;
use face_fiducials_core::{CoordinateSystem, LandmarkId};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Final estimate for one fiducial.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiducialResult {
    pub landmark: LandmarkId,
    pub position: Point3<f64>,
    pub status: FiducialStatus,
    /// Candidates gathered over all views.
    pub num_candidates: usize,
    /// Candidates that survived outlier rejection.
    pub num_retained: usize,
}

impl FiducialResult {
    #[inline]
    pub fn label(&self) -> &'static str {
        self.landmark.label()
    }
}

/// Output of a fiducial pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FiducialDetectionResult {
    /// Exactly one entry per [`LandmarkId`], in canonical order.
    pub fiducials: Vec<FiducialResult>,
    /// Anchor of the view sweep.
    pub anchor: FrontalView,
    /// Per-view diagnostics, in view order.
    pub views: Vec<ViewReport>,
    /// Convention the positions are expressed in.
    pub coordinate_system: CoordinateSystem,
}

impl FiducialDetectionResult {
    pub fn get(&self, landmark: LandmarkId) -> Option<&FiducialResult> {
        self.fiducials.iter().find(|f| f.landmark == landmark)
    }

    /// Fiducials that no view observed.
    pub fn unresolved(&self) -> impl Iterator<Item = &FiducialResult> + '_ {
        self.fiducials.iter().filter(|f| !f.status.is_resolved())
    }

    /// Candidates contributed by all views together.
    pub fn num_candidates(&self) -> usize {
        self.fiducials.iter().map(|f| f.num_candidates).sum()
    }

    /// Express the fiducial positions in `target`.
    ///
    /// Only the fiducials are converted; anchor and view poses stay in the
    /// mesh frame.
    pub fn to_coordinate_system(&self, target: CoordinateSystem) -> Self {
        let fiducials = self
            .fiducials
            .iter()
            .map(|f| FiducialResult {
                position: self.coordinate_system.convert_point(&f.position, target),
                ..*f
            })
            .collect();
        Self {
            fiducials,
            anchor: self.anchor.clone(),
            views: self.views.clone(),
            coordinate_system: target,
        }
    }
}
