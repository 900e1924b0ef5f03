//! Increment policies: how far one submission or one ambient tick moves
//! the shared progress value.
//!
//! Two interchangeable variants exist, selected by
//! [`ProgressConfig::policy`](crate::config::ProgressConfig):
//!
//! - **Decelerating band** -- five progress bands, each drawing uniformly
//!   from a fixed range that shrinks as the session nears completion.
//! - **Fixed target** -- a single narrow range whose mean is
//!   `100 / target_submitters`, so the configured crowd size carries the
//!   session to roughly 100% on average.
//!
//! Organic growth is always clamped to the configured ceiling, which is
//! strictly below 100. Only the completion trigger reaches 100.

use rand::Rng;

use crate::config::{PolicyKind, ProgressConfig};

/// One progress band: deltas in `[min, max)` apply while progress is
/// below `below`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    below: f64,
    min: f64,
    max: f64,
}

/// Decelerating bands for participant submissions.
const USER_BANDS: [Band; 5] = [
    Band { below: 30.0, min: 5.0, max: 8.0 },
    Band { below: 60.0, min: 2.0, max: 4.0 },
    Band { below: 80.0, min: 0.5, max: 2.0 },
    Band { below: 95.0, min: 0.1, max: 0.3 },
    CRAWL_BAND,
];

/// Last band; catches everything at or above 95, including NaN.
const CRAWL_BAND: Band = Band { below: f64::INFINITY, min: 0.01, max: 0.05 };

/// Half-width of the fixed-target range, as a fraction of the mean delta.
const FIXED_TARGET_SPREAD: f64 = 0.2;

/// Ambient delta while progress is at most 80.
const AUTO_DELTA_EARLY: f64 = 0.02;
/// Ambient delta while progress is in `(80, 95]`.
const AUTO_DELTA_LATE: f64 = 0.005;
/// Ambient delta above 95.
const AUTO_DELTA_CRAWL: f64 = 0.001;

/// Strategy mapping current progress to the next delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncrementPolicy {
    /// Five bands with shrinking ranges.
    DeceleratingBand,
    /// Uniform draw from `[min, max)` regardless of progress.
    FixedTarget {
        /// Smallest delta.
        min: f64,
        /// Exclusive upper bound of the delta.
        max: f64,
    },
}

impl IncrementPolicy {
    /// Build the policy named by the configuration.
    pub fn from_config(config: &ProgressConfig) -> Self {
        match config.policy {
            PolicyKind::DeceleratingBand => Self::DeceleratingBand,
            PolicyKind::FixedTarget => Self::fixed_target(config.target_submitters),
        }
    }

    /// A fixed-target policy whose mean delta is `100 / target_submitters`.
    ///
    /// A target of zero is treated as one.
    pub fn fixed_target(target_submitters: u32) -> Self {
        let mean = charge_types::COMPLETION_PROGRESS / f64::from(target_submitters.max(1));
        Self::FixedTarget {
            min: mean * (1.0 - FIXED_TARGET_SPREAD),
            max: mean * (1.0 + FIXED_TARGET_SPREAD),
        }
    }

    /// Delta for one accepted, non-trigger submission at `progress`.
    pub fn next_user_delta<R: Rng + ?Sized>(&self, progress: f64, rng: &mut R) -> f64 {
        let (min, max) = match *self {
            Self::DeceleratingBand => {
                let band = band_for(progress);
                (band.min, band.max)
            }
            Self::FixedTarget { min, max } => (min, max),
        };
        rng.random_range(min..max)
    }

    /// Ambient delta for one tick at `progress`.
    ///
    /// Independent of the configured variant and of randomness.
    pub fn next_auto_delta(progress: f64) -> f64 {
        if progress > 95.0 {
            AUTO_DELTA_CRAWL
        } else if progress > 80.0 {
            AUTO_DELTA_LATE
        } else {
            AUTO_DELTA_EARLY
        }
    }
}

/// Apply `delta` to `progress`, never exceeding `ceiling`.
pub fn advance(progress: f64, delta: f64, ceiling: f64) -> f64 {
    (progress + delta).min(ceiling)
}

fn band_for(progress: f64) -> Band {
    USER_BANDS
        .iter()
        .copied()
        .find(|band| progress < band.below)
        .unwrap_or(CRAWL_BAND)
}
