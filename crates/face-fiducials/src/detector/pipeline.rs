use super::{FiducialDetectionResult, FiducialError, FiducialParams};
use crate::adapter::{RenderPickAdapter, ViewOutcome, ViewStatus};
use crate::aggregate::Aggregator;
use crate::backend::{Picker, Renderer};
use crate::detect2d::LandmarkDetector2d;
use crate::frontal::FrontalLocator;
use crate::prior::GeometricPrior;
use crate::views::sample_views;
use face_fiducials_core::Mesh;
use log::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Shared flag to stop a running pipeline between views.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Multi-view fiducial localizer.
///
/// Holds validated parameters and the worker pool used for the view loop.
pub struct FiducialPipeline {
    params: FiducialParams,
    pool: ThreadPool,
}

impl FiducialPipeline {
    /// Validate `params` and set up the worker pool.
    pub fn new(params: FiducialParams) -> Result<Self, FiducialError> {
        params.validate()?;
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("fiducial-view-{i}"));
        if let Some(n) = params.num_workers {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| FiducialError::WorkerPool(e.to_string()))?;
        Ok(Self { params, pool })
    }

    #[inline]
    pub fn params(&self) -> &FiducialParams {
        &self.params
    }

    /// Locate the seven fiducials on `mesh`.
    pub fn run<R, P, D>(
        &self,
        mesh: &Mesh,
        renderer: &R,
        picker: &P,
        detector: &D,
    ) -> Result<FiducialDetectionResult, FiducialError>
    where
        R: Renderer + ?Sized,
        P: Picker + ?Sized,
        D: LandmarkDetector2d + ?Sized,
    {
        self.run_with_cancel(mesh, renderer, picker, detector, &CancelToken::new())
    }

    /// [`FiducialPipeline::run`] that stops early once `cancel` is set.
    ///
    /// Views already in flight finish; no further view starts.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(vertices = mesh.num_vertices(), num_views = self.params.num_views)
        )
    )]
    pub fn run_with_cancel<R, P, D>(
        &self,
        mesh: &Mesh,
        renderer: &R,
        picker: &P,
        detector: &D,
        cancel: &CancelToken,
    ) -> Result<FiducialDetectionResult, FiducialError>
    where
        R: Renderer + ?Sized,
        P: Picker + ?Sized,
        D: LandmarkDetector2d + ?Sized,
    {
        let params = &self.params;
        mesh.validate()?;

        let anchor = self.pool.install(|| {
            FrontalLocator::new(
                &params.frontal,
                params.sweep_size,
                params.fov_y_deg,
                params.image_size,
            )
            .locate(mesh)
        })?;
        let poses = sample_views(
            &anchor.pose,
            params.num_views,
            params.image_size,
            &params.sampler,
        )?;
        debug!(
            "anchor yaw={:.1} pitch={:.1}, {} views",
            anchor.yaw_deg,
            anchor.pitch_deg,
            poses.len()
        );

        let adapter = RenderPickAdapter::new(mesh, renderer, picker, detector, &params.scheme)
            .with_timeout(params.view_timeout_ms.map(Duration::from_millis));
        let outcomes: Vec<Option<ViewOutcome>> = self.pool.install(|| {
            poses
                .par_iter()
                .enumerate()
                .map(|(i, pose)| (!cancel.is_cancelled()).then(|| adapter.process(i, pose)))
                .collect()
        });

        if cancel.is_cancelled() {
            return Err(FiducialError::Cancelled {
                completed: outcomes.iter().flatten().count(),
                total: poses.len(),
            });
        }

        let mut candidates = Vec::new();
        let mut views = Vec::with_capacity(outcomes.len());
        for outcome in outcomes.into_iter().flatten() {
            candidates.extend(outcome.candidates);
            views.push(outcome.report);
        }

        let prior = GeometricPrior::estimate(mesh, &anchor.face_forward(), &anchor.face_up());
        let fiducials = Aggregator::new(params.filter_thresh, params.reduction)
            .aggregate(&candidates, &prior);

        let productive = views
            .iter()
            .filter(|v| v.status == ViewStatus::Ok && v.picked > 0)
            .count();
        let result = FiducialDetectionResult {
            fiducials,
            anchor,
            views,
            coordinate_system: params.coordinate_system,
        };
        info!(
            "fiducials ({}): {} candidates from {}/{} views, {} unresolved",
            result.coordinate_system,
            result.num_candidates(),
            productive,
            result.views.len(),
            result.unresolved().count()
        );
        Ok(result)
    }
}
