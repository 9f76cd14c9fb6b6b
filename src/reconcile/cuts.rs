//! Cut planning.

use super::{ReconcileConfig, VariationSlot};
use crate::error::{ReelcutError, Result};
use crate::narration::NarrationTimeline;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

/// One extracted sub-clip of the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cut {
    pub source_start: f64,
    pub source_end: f64,
}

impl Cut {
    pub fn duration(&self) -> f64 {
        self.source_end - self.source_start
    }
}

/// Ordered cuts that together cover the narration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutPlan {
    pub cuts: Vec<Cut>,
    pub clip_duration: f64,
    pub narration_duration: f64,
    /// Source range the cuts were sampled from.
    pub window: (f64, f64),
}

impl CutPlan {
    /// Length of the joined cuts before fitting.
    pub fn visual_duration(&self) -> f64 {
        self.clip_duration * self.cuts.len() as f64
    }
}

/// Plan evenly spread, jittered cuts for a narration of known length.
///
/// Cut count is at least one per sentence and at least
/// `ceil(total / target_cut_seconds)`. When the window cannot supply that
/// much footage the count drops and each cut gets longer instead; the
/// shortfall is made up by looping during assembly. Same inputs and seed
/// always give the same plan.
pub fn plan_cuts(
    timeline: &NarrationTimeline,
    source_duration: f64,
    config: &ReconcileConfig,
    slot: VariationSlot,
    seed: u64,
) -> Result<CutPlan> {
    let total = timeline.total_duration();
    if total <= 0.0 {
        return Err(ReelcutError::Reconcile("narration timeline is empty".into()));
    }
    if !source_duration.is_finite() || source_duration <= 0.0 {
        return Err(ReelcutError::Reconcile(format!(
            "source duration {} is not positive",
            source_duration
        )));
    }

    let (mut usable_start, mut usable_end) = (
        config.usable_start * source_duration,
        config.usable_end * source_duration,
    );
    if usable_end <= usable_start || usable_start < 0.0 || usable_end > source_duration {
        usable_start = 0.0;
        usable_end = source_duration;
    }
    let (window_start, window_end) = slot.window(usable_start, usable_end);
    let window = window_end - window_start;

    let target = if config.target_cut_seconds > 0.0 {
        config.target_cut_seconds
    } else {
        2.5
    };

    let mut num_cuts = timeline.len().max((total / target).ceil() as usize).max(1);
    let mut clip_duration = total / num_cuts as f64;

    if total > window {
        let supported = (window / target).floor() as usize;
        num_cuts = num_cuts.min(supported).max(1);
        clip_duration = window / num_cuts as f64;
        info!(
            num_cuts,
            clip_duration, "Source window of {:.1}s is shorter than narration, fewer cuts", window
        );
    }

    let latest_start = (window_end - clip_duration).max(window_start);
    let mut rng = StdRng::seed_from_u64(seed);

    let starts: Vec<f64> = if num_cuts == 1 {
        vec![window_start + (window - clip_duration).max(0.0) / 2.0]
    } else {
        let step = (window - clip_duration).max(0.0) / (num_cuts - 1) as f64;
        let spread = config.jitter.max(0.0) * step;
        (0..num_cuts)
            .map(|i| {
                let base = window_start + i as f64 * step;
                let jitter = if spread > 0.0 {
                    rng.gen_range(-spread..=spread)
                } else {
                    0.0
                };
                base + jitter
            })
            .collect()
    };

    let cuts: Vec<Cut> = starts
        .into_iter()
        .map(|s| {
            let source_start = s.max(window_start).min(latest_start);
            Cut {
                source_start,
                source_end: source_start + clip_duration,
            }
        })
        .collect();

    debug!(
        num_cuts,
        clip_duration,
        window_start,
        window_end,
        "Planned cuts for {:.2}s narration",
        total
    );

    Ok(CutPlan {
        cuts,
        clip_duration,
        narration_duration: total,
        window: (window_start, window_end),
    })
}
