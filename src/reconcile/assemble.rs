//! Extract, join and fit the planned cuts.

use super::CutPlan;
use crate::context::RunContext;
use crate::error::Result;
use crate::media::{Framing, MediaEncoder};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// What to do with a joined visual track of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitAction {
    /// Already within tolerance.
    Keep,
    /// Shorter than the narration: loop it.
    Loop,
    /// Longer than the narration: cut it off.
    Trim,
}

impl FitAction {
    pub fn decide(actual: f64, target: f64, tolerance: f64) -> Self {
        if (actual - target).abs() <= tolerance {
            FitAction::Keep
        } else if actual < target {
            FitAction::Loop
        } else {
            FitAction::Trim
        }
    }
}

/// Visual track ready for composition.
#[derive(Debug, Clone)]
pub struct AssembledVisuals {
    pub path: PathBuf,
    pub action: FitAction,
    /// Duration of the joined cuts before fitting.
    pub joined_duration: f64,
}

/// Extract every cut, join them losslessly, then loop or trim the result to
/// exactly the narration length.
#[instrument(skip_all, fields(run = %ctx.run_id, cuts = plan.cuts.len()))]
pub async fn assemble_visuals(
    encoder: &dyn MediaEncoder,
    ctx: &RunContext,
    source: &Path,
    plan: &CutPlan,
    framing: Framing,
    tolerance: f64,
) -> Result<AssembledVisuals> {
    ctx.prepare().await?;

    let mut clips = Vec::with_capacity(plan.cuts.len());
    for (i, cut) in plan.cuts.iter().enumerate() {
        ctx.ensure_active()?;
        let clip = ctx.path(&format!("cut_{:03}.mp4", i));
        encoder
            .extract_clip(source, cut.source_start, plan.clip_duration, framing, &clip)
            .await?;
        clips.push(clip);
    }

    ctx.ensure_active()?;
    let joined = ctx.path("visual_joined.mp4");
    encoder.concat_copy(&clips, &joined).await?;

    let joined_duration = encoder.probe_duration(&joined).await?;
    let target = plan.narration_duration;
    let action = FitAction::decide(joined_duration, target, tolerance);
    debug!(joined_duration, target, ?action, "Fitting visuals to narration");

    if action == FitAction::Keep {
        return Ok(AssembledVisuals {
            path: joined,
            action,
            joined_duration,
        });
    }

    let fitted = ctx.path("visual.mp4");
    encoder.fit_to_duration(&joined, target, &fitted).await?;

    match encoder.probe_duration(&fitted).await {
        Ok(d) if (d - target).abs() > tolerance => {
            warn!("Fitted visuals are {:.3}s against {:.3}s narration", d, target)
        }
        Ok(_) => {}
        Err(e) => debug!("Could not re-measure fitted visuals: {}", e),
    }
    info!(?action, "Visuals fitted to {:.2}s", target);

    Ok(AssembledVisuals {
        path: fitted,
        action,
        joined_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::FakeEncoder;
    use crate::narration::timeline_of;
    use crate::reconcile::{plan_cuts, ReconcileConfig, VariationSlot};

    #[test]
    fn test_fit_decision() {
        assert_eq!(FitAction::decide(30.02, 30.0, 0.05), FitAction::Keep);
        assert_eq!(FitAction::decide(9.6, 30.0, 0.05), FitAction::Loop);
        assert_eq!(FitAction::decide(31.0, 30.0, 0.05), FitAction::Trim);
    }

    #[tokio::test]
    async fn test_short_source_is_looped_to_narration() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _handle) = RunContext::new(dir.path(), Some(3));
        let timeline = timeline_of(&[("One.", 10.0), ("Two.", 10.0), ("Three.", 10.0)]);
        let plan = plan_cuts(&timeline, 10.0, &ReconcileConfig::default(), VariationSlot::single(), 3).unwrap();

        let encoder = FakeEncoder::with_default(5.0);
        encoder.set_duration("visual_joined.mp4", plan.visual_duration());

        let visuals = assemble_visuals(&encoder, &ctx, Path::new("src.mp4"), &plan, Framing::Crop, 0.05)
            .await
            .unwrap();

        assert_eq!(visuals.action, FitAction::Loop);
        assert!(visuals.path.ends_with("visual.mp4"));
        let calls = encoder.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("extract")).count(), 3);
        assert!(calls.contains(&"fit 30.000".to_string()));
        assert_eq!(encoder.probe_duration(&visuals.path).await.unwrap(), 30.0);
    }

    #[tokio::test]
    async fn test_exact_join_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _handle) = RunContext::new(dir.path(), Some(3));
        let timeline = timeline_of(&[("One.", 4.0), ("Two.", 3.5)]);
        let plan = plan_cuts(&timeline, 300.0, &ReconcileConfig::default(), VariationSlot::single(), 3).unwrap();

        let encoder = FakeEncoder::with_default(7.5);
        let visuals = assemble_visuals(&encoder, &ctx, Path::new("src.mp4"), &plan, Framing::Crop, 0.05)
            .await
            .unwrap();
        assert_eq!(visuals.action, FitAction::Keep);
        assert!(!encoder.calls().iter().any(|c| c.starts_with("fit")));
    }
}
