//! Reduction of per-landmark candidate clouds to single fiducial positions.
//!
//! Every landmark is observed once per successful view. Oblique views and
//! detector misfires leave a few far-away candidates; they are removed with a
//! z-score test on the distance to the candidate centroid before the
//! remaining points are reduced to one position.

use crate::prior::GeometricPrior;
use crate::FiducialResult;
use face_fiducials_core::{Candidate3D, LandmarkId};
use log::warn;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// How retained candidates are combined into one point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Mean,
    /// Coordinate-wise median.
    Median,
}

/// How a fiducial position was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FiducialStatus {
    /// Outlier rejection ran; `rejected` candidates were discarded.
    Filtered { rejected: usize },
    /// Too few or too tightly clustered candidates to estimate a spread; all
    /// candidates were reduced as-is.
    Unfiltered,
    /// No view produced a candidate. The position is the geometric prior and
    /// needs manual review.
    Unresolved,
}

impl FiducialStatus {
    #[inline]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, FiducialStatus::Unresolved)
    }
}

/// Outcome of filtering and reducing one candidate cloud.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregatedPoint {
    pub position: Point3<f64>,
    pub retained: usize,
    pub status: FiducialStatus,
}

/// Mean accumulated relative to the first point, so identical inputs
/// reproduce that point bit for bit.
fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let origin = points[0];
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + (p - origin));
    origin + sum / points.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

/// Reduce points to one position; `None` for an empty slice.
pub fn reduce(points: &[Point3<f64>], reduction: Reduction) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    Some(match reduction {
        Reduction::Mean => centroid(points),
        Reduction::Median => {
            let mut xs: Vec<f64> = points.iter().map(|p| p.x).collect();
            let mut ys: Vec<f64> = points.iter().map(|p| p.y).collect();
            let mut zs: Vec<f64> = points.iter().map(|p| p.z).collect();
            Point3::new(median(&mut xs), median(&mut ys), median(&mut zs))
        }
    })
}

/// Keep-mask of the z-score test on distances to the centroid.
///
/// Returns `None` when no meaningful spread exists: fewer than two points or
/// (numerically) identical distances. Points closer to the centroid than
/// average are never rejected.
pub fn zscore_inliers(points: &[Point3<f64>], thresh: f64) -> Option<Vec<bool>> {
    if points.len() < 2 {
        return None;
    }
    let c = centroid(points);
    let dists: Vec<f64> = points.iter().map(|p| (p - c).norm()).collect();
    let n = dists.len() as f64;
    let mean = dists.iter().sum::<f64>() / n;
    let var = dists.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if !(std > 1e-12 * mean.max(1.0)) {
        return None;
    }
    Some(dists.iter().map(|d| (d - mean) / std <= thresh).collect())
}

/// Filter outliers from `points` and reduce the rest.
///
/// Returns `None` only for an empty cloud. A single point comes back
/// unchanged; if the filter would reject everything, the unfiltered cloud is
/// reduced instead.
pub fn aggregate_points(
    points: &[Point3<f64>],
    thresh: f64,
    reduction: Reduction,
) -> Option<AggregatedPoint> {
    let all = reduce(points, reduction)?;
    let unfiltered = AggregatedPoint {
        position: all,
        retained: points.len(),
        status: FiducialStatus::Unfiltered,
    };
    let Some(mask) = zscore_inliers(points, thresh) else {
        return Some(unfiltered);
    };
    let kept: Vec<Point3<f64>> = points
        .iter()
        .zip(&mask)
        .filter(|(_, &keep)| keep)
        .map(|(p, _)| *p)
        .collect();
    let Some(position) = reduce(&kept, reduction) else {
        return Some(unfiltered);
    };
    Some(AggregatedPoint {
        position,
        retained: kept.len(),
        status: FiducialStatus::Filtered {
            rejected: points.len() - kept.len(),
        },
    })
}

/// Split candidates by landmark, preserving view order within each group.
pub fn group_by_landmark(candidates: &[Candidate3D]) -> [Vec<Point3<f64>>; LandmarkId::COUNT] {
    let mut groups: [Vec<Point3<f64>>; LandmarkId::COUNT] = Default::default();
    for c in candidates {
        groups[c.landmark.index()].push(c.position);
    }
    groups
}

/// Per-landmark outlier filter and reduction.
#[derive(Clone, Copy, Debug)]
pub struct Aggregator {
    pub filter_thresh: f64,
    pub reduction: Reduction,
}

impl Aggregator {
    pub fn new(filter_thresh: f64, reduction: Reduction) -> Self {
        Self {
            filter_thresh,
            reduction,
        }
    }

    /// One result per [`LandmarkId`], in canonical order.
    ///
    /// Landmarks without candidates are reported as
    /// [`FiducialStatus::Unresolved`] at the prior's position.
    pub fn aggregate(
        &self,
        candidates: &[Candidate3D],
        prior: &GeometricPrior,
    ) -> Vec<FiducialResult> {
        let groups = group_by_landmark(candidates);
        LandmarkId::ALL
            .iter()
            .map(|&landmark| {
                let points = &groups[landmark.index()];
                match aggregate_points(points, self.filter_thresh, self.reduction) {
                    Some(agg) => FiducialResult {
                        landmark,
                        position: agg.position,
                        status: agg.status,
                        num_candidates: points.len(),
                        num_retained: agg.retained,
                    },
                    None => {
                        warn!("{landmark}: no candidates in any view, using geometric prior");
                        FiducialResult {
                            landmark,
                            position: prior.get(landmark),
                            status: FiducialStatus::Unresolved,
                            num_candidates: 0,
                            num_retained: 0,
                        }
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Point3<f64>> {
        let offsets = [-0.01, 0.0, 0.01];
        let mut pts = Vec::new();
        for (i, &dx) in offsets.iter().enumerate() {
            for (j, &dy) in offsets.iter().enumerate() {
                if pts.len() == 8 {
                    break;
                }
                pts.push(Point3::new(dx, dy, offsets[(i + j) % 3]));
            }
        }
        pts.push(Point3::new(100.0, 100.0, 100.0));
        pts
    }

    #[test]
    fn outlier_is_rejected() {
        let pts = cluster_with_outlier();
        assert_eq!(pts.len(), 9);
        let agg = aggregate_points(&pts, 1.0, Reduction::Mean).unwrap();
        assert_eq!(agg.status, FiducialStatus::Filtered { rejected: 1 });
        assert_eq!(agg.retained, 8);
        assert!(agg.position.coords.amax() <= 0.05);
    }

    #[test]
    fn median_reduction_also_rejects_outlier() {
        let pts = cluster_with_outlier();
        let agg = aggregate_points(&pts, 1.0, Reduction::Median).unwrap();
        assert!(agg.position.coords.amax() <= 0.05);
    }

    #[test]
    fn single_candidate_is_returned_unchanged() {
        let p = Point3::new(1.25, -3.5, 7.0);
        let agg = aggregate_points(&[p], 1.0, Reduction::Mean).unwrap();
        assert_eq!(agg.position, p);
        assert_eq!(agg.status, FiducialStatus::Unfiltered);
        assert_eq!(agg.retained, 1);
    }

    #[test]
    fn empty_cloud_has_no_aggregate() {
        assert!(aggregate_points(&[], 1.0, Reduction::Mean).is_none());
        assert!(zscore_inliers(&[], 1.0).is_none());
    }

    #[test]
    fn unanimous_observations_aggregate_exactly() {
        let p = Point3::new(0.1, 0.2, 0.3);
        let pts = vec![p; 16];
        for reduction in [Reduction::Mean, Reduction::Median] {
            let agg = aggregate_points(&pts, 1.0, reduction).unwrap();
            assert_eq!(agg.status, FiducialStatus::Unfiltered);
            assert_eq!(agg.position, p);
        }
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let pts = [
            Point3::new(0.0, 4.0, 1.0),
            Point3::new(1.0, 3.0, 1.0),
            Point3::new(2.0, 2.0, 1.0),
            Point3::new(10.0, 1.0, 1.0),
        ];
        let m = reduce(&pts, Reduction::Median).unwrap();
        assert_eq!(m, Point3::new(1.5, 2.5, 1.0));
    }

    #[test]
    fn points_nearer_than_average_are_kept() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mask = zscore_inliers(&pts, 0.1).unwrap();
        assert!(mask[0]);
    }

    #[test]
    fn groups_follow_canonical_index() {
        let cands = [
            Candidate3D {
                landmark: LandmarkId::Nasion,
                position: Point3::new(1.0, 0.0, 0.0),
                view_index: 0,
            },
            Candidate3D {
                landmark: LandmarkId::RightTragus,
                position: Point3::new(2.0, 0.0, 0.0),
                view_index: 0,
            },
            Candidate3D {
                landmark: LandmarkId::Nasion,
                position: Point3::new(3.0, 0.0, 0.0),
                view_index: 1,
            },
        ];
        let groups = group_by_landmark(&cands);
        assert_eq!(groups[LandmarkId::Nasion.index()].len(), 2);
        assert_eq!(groups[LandmarkId::RightTragus.index()].len(), 1);
        assert!(groups[LandmarkId::LeftTragus.index()].is_empty());
        assert_eq!(groups[LandmarkId::Nasion.index()][1].x, 3.0);
    }
}
