//! Camera poses for the multi-view sweep around the frontal anchor.

use crate::frontal::direction_from;
use crate::ParamsError;
use face_fiducials_core::{CameraPose, PoseError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Angular spread of the sampled views around the anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSamplerParams {
    /// Views reach yaw offsets up to `±yaw_span_deg`. Tragus points are near
    /// profile, so this should reach close to 90°.
    pub yaw_span_deg: f64,
    /// View pairs cycle through pitch offsets `0, +pitch_span_deg, -pitch_span_deg`.
    pub pitch_span_deg: f64,
}

impl Default for ViewSamplerParams {
    fn default() -> Self {
        Self {
            yaw_span_deg: 90.0,
            pitch_span_deg: 15.0,
        }
    }
}

impl ViewSamplerParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(0.0..=180.0).contains(&self.yaw_span_deg) {
            return Err(ParamsError::OutOfRange {
                name: "yaw_span_deg",
                value: self.yaw_span_deg,
                range: "[0, 180]",
            });
        }
        if !(0.0..=80.0).contains(&self.pitch_span_deg) {
            return Err(ParamsError::OutOfRange {
                name: "pitch_span_deg",
                value: self.pitch_span_deg,
                range: "[0, 80]",
            });
        }
        Ok(())
    }

    /// Yaw and pitch offset of view `i`, in degrees.
    ///
    /// View 0 is the anchor. Views `2k + 1` and `2k + 2` form pair `k`, at
    /// `+yaw` and `-yaw` with `yaw = yaw_span_deg * pair_fraction(k)`. Offsets
    /// do not depend on the view count, so adding views never moves the
    /// existing ones.
    pub fn offsets(&self, i: usize) -> (f64, f64) {
        if i == 0 {
            return (0.0, 0.0);
        }
        let pair = (i - 1) / 2;
        let sign = if (i - 1) % 2 == 0 { 1.0 } else { -1.0 };
        let pitch = match pair % 3 {
            0 => 0.0,
            1 => self.pitch_span_deg,
            _ => -self.pitch_span_deg,
        };
        (sign * self.yaw_span_deg * pair_fraction(pair), pitch)
    }
}

/// Bisection order over `(0, 1]`: `1, 1/2, 1/4, 3/4, 1/8, 3/8, 5/8, 7/8, 1/16, ...`
fn pair_fraction(pair: usize) -> f64 {
    if pair == 0 {
        return 1.0;
    }
    let level = pair.ilog2();
    let odd = 2 * (pair - (1 << level)) + 1;
    odd as f64 / (1u64 << (level + 1)) as f64
}

/// Generate `num_views` square poses of side `image_size` around `anchor`.
///
/// All views look at the anchor target from the anchor distance and share
/// its field of view. View 0 reproduces the anchor direction and the poses for
/// `n` views are a prefix of the poses for `n + 1`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(anchor, params))
)]
pub fn sample_views(
    anchor: &CameraPose,
    num_views: usize,
    image_size: u32,
    params: &ViewSamplerParams,
) -> Result<Vec<CameraPose>, PoseError> {
    let center = anchor.target;
    let distance = anchor.distance();
    let face = (anchor.eye - anchor.target).normalize();
    let up = anchor.true_up();
    (0..num_views)
        .map(|i| {
            let (yaw, pitch) = params.offsets(i);
            let dir = direction_from(&face, &up, yaw, pitch);
            CameraPose::look_at(
                center + dir * distance,
                center,
                up,
                anchor.fov_y_deg,
                image_size,
                image_size,
            )
        })
        .collect()
}
