//! Segment selection.
//!
//! Decides which span (or spans) of the source becomes the output. Each
//! strategy implements [`SegmentSelector`]; the [`SelectionEngine`] runs them
//! as a cascade, clamps whatever comes back, and falls back to a fixed
//! default segment when nothing works. Selection never fails the run.

mod golden_zone;
mod heuristics;
mod scene_density;
mod transcript;

pub use golden_zone::GoldenZoneSelector;
pub use heuristics::{ChapterSelector, EngagementSelector};
pub use scene_density::{
    pick_windows, rank_windows, score_window, split_at_scenes, SceneDensitySelector,
};
pub use transcript::TranscriptSelector;

use crate::config::{Prompts, SelectionSettings, SelectionStrategy};
use crate::error::Result;
use crate::media::SceneDetector;
use crate::provider::{FallbackChain, TextGenerator};
use crate::source::MediaSource;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a segment came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentOrigin {
    Engagement,
    Chapter,
    Transcript { provider: String },
    SceneDensity,
    GoldenZone,
    /// No strategy produced anything usable.
    Fallback,
}

impl std::fmt::Display for SegmentOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentOrigin::Engagement => write!(f, "engagement"),
            SegmentOrigin::Chapter => write!(f, "chapter"),
            SegmentOrigin::Transcript { provider } => write!(f, "transcript ({})", provider),
            SegmentOrigin::SceneDensity => write!(f, "scene density"),
            SegmentOrigin::GoldenZone => write!(f, "golden zone"),
            SegmentOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

/// A span of the source chosen for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    pub origin: SegmentOrigin,
}

impl Segment {
    pub fn new(start: f64, end: f64, rationale: impl Into<String>, origin: SegmentOrigin) -> Self {
        Self {
            start,
            end,
            rationale: rationale.into(),
            hook: None,
            origin,
        }
    }

    pub fn with_hook(mut self, hook: Option<String>) -> Self {
        self.hook = hook.filter(|h| !h.trim().is_empty());
        self
    }

    /// The fixed default used when every strategy fails. Unclamped.
    pub fn fallback() -> Self {
        Self::new(
            30.0,
            90.0,
            "Fallback segment: no selection strategy succeeded",
            SegmentOrigin::Fallback,
        )
        .with_hook(Some("Check this out".to_string()))
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == SegmentOrigin::Fallback
    }

    fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Force a segment inside `[0, duration]` with `start < end`.
///
/// `end` is capped at `duration` and `start` at `duration - min_clip` (or 0
/// when the source is shorter than `min_clip`). Non-finite inputs are
/// replaced before clamping. Requires `duration > 0`.
pub fn clamp_segment(mut segment: Segment, duration: f64, min_clip: f64) -> Segment {
    let min_len = if min_clip.is_finite() && min_clip > 0.0 {
        min_clip.min(duration)
    } else {
        0.0
    };

    let mut start = if segment.start.is_finite() { segment.start } else { 0.0 };
    let mut end = if segment.end.is_finite() {
        segment.end
    } else {
        start + min_len
    };

    end = end.min(duration);
    start = start.max(0.0).min((duration - min_len).max(0.0));

    if end <= start {
        end = (start + min_len).min(duration);
    }
    if end <= start {
        start = 0.0;
        end = duration;
    }

    segment.start = start;
    segment.end = end;
    segment
}

/// Inputs shared by every strategy.
#[derive(Debug, Clone)]
pub struct SelectionOptions {
    /// Length of each selected clip.
    pub clip_seconds: f64,
    /// Minimum length enforced when clamping.
    pub min_clip_seconds: f64,
    /// Number of segments wanted (montage and scene modes use more than one).
    pub count: usize,
    /// Golden zone as fractions of the duration.
    pub band: (f64, f64),
    /// Band scanned by scene-density scoring.
    pub scene_band: (f64, f64),
    pub seed: u64,
    pub transcript_max_chars: usize,
    pub scene_threshold: f64,
    pub spike_ratio: f64,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self::from_settings(&SelectionSettings::default(), 0)
    }
}

impl SelectionOptions {
    pub fn from_settings(settings: &SelectionSettings, seed: u64) -> Self {
        Self {
            clip_seconds: settings.clip_seconds,
            min_clip_seconds: settings.min_clip_seconds,
            count: 1,
            band: (settings.golden_zone[0], settings.golden_zone[1]),
            scene_band: (settings.scene_band[0], settings.scene_band[1]),
            seed,
            transcript_max_chars: settings.transcript_max_chars,
            scene_threshold: settings.scene_threshold,
            spike_ratio: settings.spike_ratio,
        }
    }

    /// `count` clips sharing `total_seconds` between them.
    pub fn montage(mut self, count: usize, total_seconds: f64) -> Self {
        let count = count.max(1);
        self.count = count;
        self.clip_seconds = total_seconds / count as f64;
        self
    }

    /// Clamp floor actually applied: never longer than the clip itself.
    pub fn effective_min_clip(&self) -> f64 {
        self.min_clip_seconds.min(self.clip_seconds)
    }

    pub(crate) fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }
}

/// One selection strategy.
#[async_trait]
pub trait SegmentSelector: Send + Sync {
    fn name(&self) -> &str;

    /// Produce up to `options.count` segments, or fail so the next strategy runs.
    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>>;
}

/// Ordered cascade of strategies with a guaranteed result.
pub struct SelectionEngine {
    selectors: Vec<Box<dyn SegmentSelector>>,
}

impl SelectionEngine {
    pub fn new(selectors: Vec<Box<dyn SegmentSelector>>) -> Self {
        Self { selectors }
    }

    /// Build the cascade for a strategy.
    ///
    /// `Auto` runs engagement, transcript, chapters, scene density (when a
    /// detector is given) and golden zone. A named strategy runs alone, with
    /// golden zone behind it.
    pub fn for_strategy(
        strategy: SelectionStrategy,
        text: FallbackChain<dyn TextGenerator>,
        prompts: Arc<Prompts>,
        scenes: Option<Arc<dyn SceneDetector>>,
    ) -> Self {
        let mut selectors: Vec<Box<dyn SegmentSelector>> = Vec::new();

        match strategy {
            SelectionStrategy::Auto => {
                selectors.push(Box::new(EngagementSelector));
                selectors.push(Box::new(TranscriptSelector::new(text, prompts)));
                selectors.push(Box::new(ChapterSelector));
                if let Some(detector) = scenes {
                    selectors.push(Box::new(SceneDensitySelector::new(detector)));
                }
            }
            SelectionStrategy::Engagement => selectors.push(Box::new(EngagementSelector)),
            SelectionStrategy::Transcript => {
                selectors.push(Box::new(TranscriptSelector::new(text, prompts)))
            }
            SelectionStrategy::Chapters => selectors.push(Box::new(ChapterSelector)),
            SelectionStrategy::Scenes => {
                if let Some(detector) = scenes {
                    selectors.push(Box::new(SceneDensitySelector::new(detector)));
                } else {
                    warn!("Scene strategy requested without a detector");
                }
            }
            SelectionStrategy::GoldenZone => {}
        }
        selectors.push(Box::new(GoldenZoneSelector));

        Self::new(selectors)
    }

    pub fn names(&self) -> Vec<&str> {
        self.selectors.iter().map(|s| s.name()).collect()
    }

    /// Run the cascade. Always returns at least one clamped segment.
    pub async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Vec<Segment> {
        let duration = source.duration();
        let min_clip = options.effective_min_clip();

        for selector in &self.selectors {
            debug!(strategy = selector.name(), "Trying selection strategy");
            match selector.select(source, options).await {
                Ok(segments) if !segments.is_empty() => {
                    let segments = normalize(segments, duration, min_clip, options.count);
                    info!(
                        strategy = selector.name(),
                        count = segments.len(),
                        "Selected {:.1}s-{:.1}s",
                        segments[0].start,
                        segments[0].end
                    );
                    return segments;
                }
                Ok(_) => warn!(strategy = selector.name(), "Strategy returned nothing"),
                Err(e) => warn!(strategy = selector.name(), "Strategy failed: {}", e),
            }
        }

        warn!("All selection strategies failed, using default segment");
        vec![clamp_segment(Segment::fallback(), duration, min_clip)]
    }
}

/// Clamp, order, and drop overlapping segments.
fn normalize(segments: Vec<Segment>, duration: f64, min_clip: f64, count: usize) -> Vec<Segment> {
    let mut clamped: Vec<Segment> = segments
        .into_iter()
        .map(|s| clamp_segment(s, duration, min_clip))
        .collect();
    clamped.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut kept: Vec<Segment> = Vec::with_capacity(clamped.len());
    for segment in clamped {
        if kept.last().map(|last| last.overlaps(&segment)).unwrap_or(false) {
            debug!("Dropping overlapping segment at {:.1}s", segment.start);
            continue;
        }
        kept.push(segment);
    }
    kept.truncate(count.max(1));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReelcutError;
    use crate::provider::testing::{text_chain, ScriptedText};
    use std::path::PathBuf;

    pub(crate) fn source(duration: f64) -> MediaSource {
        MediaSource::new("test", PathBuf::from("test.mp4"), duration).unwrap()
    }

    fn check(s: &Segment, duration: f64) {
        assert!(0.0 <= s.start, "{:?}", s);
        assert!(s.start < s.end, "{:?}", s);
        assert!(s.end <= duration, "{:?}", s);
    }

    #[test]
    fn test_clamp_holds_for_awkward_inputs() {
        let raws = [
            (-10.0, 5.0),
            (500.0, 900.0),
            (50.0, 40.0),
            (f64::NAN, f64::INFINITY),
            (f64::NEG_INFINITY, f64::NAN),
            (0.0, 0.0),
            (99.99, 100.0),
            (1e12, -1e12),
        ];
        for duration in [0.5, 10.0, 59.9, 60.0, 100.0, 3600.0] {
            for min_clip in [0.0, 5.0, 60.0, 120.0] {
                for (start, end) in raws {
                    let seg = Segment::new(start, end, "raw", SegmentOrigin::GoldenZone);
                    let clamped = clamp_segment(seg, duration, min_clip);
                    check(&clamped, duration);
                    if min_clip <= duration {
                        assert!(clamped.start <= duration - min_clip + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_clamp_matches_llm_result_rule() {
        // start = min(start, D - 60), end = min(end, D)
        let seg = Segment::new(280.0, 340.0, "late", SegmentOrigin::GoldenZone);
        let clamped = clamp_segment(seg, 300.0, 60.0);
        assert_eq!(clamped.start, 240.0);
        assert_eq!(clamped.end, 300.0);
    }

    #[test]
    fn test_fallback_is_marked() {
        let seg = clamp_segment(Segment::fallback(), 45.0, 60.0);
        assert!(seg.is_fallback());
        assert!(seg.rationale.starts_with("Fallback"));
        check(&seg, 45.0);
    }

    #[test]
    fn test_normalize_drops_overlaps() {
        let segs = vec![
            Segment::new(50.0, 60.0, "b", SegmentOrigin::SceneDensity),
            Segment::new(10.0, 20.0, "a", SegmentOrigin::SceneDensity),
            Segment::new(55.0, 65.0, "c", SegmentOrigin::SceneDensity),
        ];
        let out = normalize(segs, 100.0, 5.0, 5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].rationale, "a");
        assert_eq!(out[1].rationale, "b");
    }

    struct Failing;

    #[async_trait]
    impl SegmentSelector for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn select(&self, _: &MediaSource, _: &SelectionOptions) -> Result<Vec<Segment>> {
            Err(ReelcutError::Selection("nope".into()))
        }
    }

    #[tokio::test]
    async fn test_engine_falls_back_when_everything_fails() {
        let engine = SelectionEngine::new(vec![Box::new(Failing), Box::new(Failing)]);
        let out = engine.select(&source(200.0), &SelectionOptions::default()).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_fallback());
        assert_eq!((out[0].start, out[0].end), (30.0, 90.0));
    }

    #[tokio::test]
    async fn test_exhausted_providers_still_yield_a_segment() {
        let captions = crate::captions::CaptionTrack::from_cues(vec![
            crate::captions::CaptionCue::new(0.0, 5.0, "hello"),
        ]);
        let src = source(120.0).with_captions(captions);
        let chain = text_chain(vec![ScriptedText::failing("groq"), ScriptedText::failing("gemini")]);
        let engine = SelectionEngine::new(vec![Box::new(TranscriptSelector::new(
            chain,
            Arc::new(Prompts::default()),
        ))]);

        let out = engine.select(&src, &SelectionOptions::default()).await;
        assert!(out[0].is_fallback());
        check(&out[0], 120.0);
    }

    #[tokio::test]
    async fn test_auto_cascade_order() {
        let detector: Arc<dyn SceneDetector> =
            Arc::new(crate::media::scene_testing::FixedScenes(vec![]));
        let engine = SelectionEngine::for_strategy(
            SelectionStrategy::Auto,
            text_chain(vec![]),
            Arc::new(Prompts::default()),
            Some(detector),
        );
        assert_eq!(
            engine.names(),
            vec!["engagement", "transcript", "chapters", "scene-density", "golden-zone"]
        );

        let engine = SelectionEngine::for_strategy(
            SelectionStrategy::Chapters,
            text_chain(vec![]),
            Arc::new(Prompts::default()),
            None,
        );
        assert_eq!(engine.names(), vec!["chapters", "golden-zone"]);
    }

    #[tokio::test]
    async fn test_auto_without_side_data_uses_golden_zone() {
        let engine = SelectionEngine::for_strategy(
            SelectionStrategy::Auto,
            text_chain(vec![]),
            Arc::new(Prompts::default()),
            None,
        );
        let out = engine.select(&source(300.0), &SelectionOptions::default()).await;
        assert_eq!(out[0].origin, SegmentOrigin::GoldenZone);
        assert!(out[0].start >= 30.0 && out[0].start <= 210.0);
    }
}
