//! Scene-change density.
//!
//! Slides a clip-sized window across the middle of the video in half-window
//! steps and keeps the windows with the most cuts. Busy stretches tend to be
//! the action.

use super::{Segment, SegmentOrigin, SegmentSelector, SelectionOptions};
use crate::error::{ReelcutError, Result};
use crate::media::SceneDetector;
use crate::source::MediaSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Number of timestamps in `[start, start + width]`, both ends inclusive.
pub fn score_window(timestamps: &[f64], start: f64, width: f64) -> usize {
    let end = start + width;
    timestamps.iter().filter(|&&t| t >= start && t <= end).count()
}

/// Candidate windows in `[band_start, band_end]`, best first.
///
/// Ties keep their original order, so the earlier window wins.
pub fn rank_windows(timestamps: &[f64], band_start: f64, band_end: f64, width: f64) -> Vec<(f64, usize)> {
    if width <= 0.0 {
        return Vec::new();
    }
    let step = width / 2.0;

    let mut windows = Vec::new();
    let mut current = band_start;
    while current + width <= band_end + 1e-9 {
        windows.push((current, score_window(timestamps, current, width)));
        current += step;
    }

    windows.sort_by(|a, b| b.1.cmp(&a.1));
    windows
}

/// Up to `count` non-overlapping windows, highest scoring first, returned in
/// time order. Windows that only touch are not overlapping.
pub fn pick_windows(
    timestamps: &[f64],
    band_start: f64,
    band_end: f64,
    width: f64,
    count: usize,
) -> Vec<(f64, f64, usize)> {
    let mut picked: Vec<(f64, f64, usize)> = Vec::new();

    for (start, score) in rank_windows(timestamps, band_start, band_end, width) {
        if picked.len() >= count {
            break;
        }
        let end = start + width;
        if picked.iter().all(|&(s, e, _)| end <= s || start >= e) {
            picked.push((start, end, score));
        }
    }

    picked.sort_by(|a, b| a.0.total_cmp(&b.0));
    picked
}

/// Cut the whole video at scene changes into clips of `min_len..=max_len`.
///
/// Gaps shorter than `min_len` are merged into the next scene; scenes longer
/// than `max_len` are split, dropping a remainder shorter than `min_len`.
pub fn split_at_scenes(timestamps: &[f64], duration: f64, min_len: f64, max_len: f64) -> Vec<Segment> {
    let mut bounds: Vec<f64> = timestamps
        .iter()
        .copied()
        .filter(|t| t.is_finite() && *t > 0.0 && *t < duration)
        .collect();
    bounds.push(duration);
    bounds.sort_by(f64::total_cmp);
    bounds.dedup();

    let mut spans = Vec::new();
    let mut current = 0.0;
    for &bound in &bounds {
        let length = bound - current;
        if length < min_len {
            continue;
        }
        if length <= max_len {
            spans.push((current, bound));
        } else {
            while current < bound {
                let end = (current + max_len).min(bound);
                if end - current >= min_len {
                    spans.push((current, end));
                }
                current = end;
            }
        }
        current = bound;
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| {
            Segment::new(start, end, format!("Scene {}", i + 1), SegmentOrigin::SceneDensity)
        })
        .collect()
}

pub struct SceneDensitySelector {
    detector: Arc<dyn SceneDetector>,
}

impl SceneDensitySelector {
    pub fn new(detector: Arc<dyn SceneDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl SegmentSelector for SceneDensitySelector {
    fn name(&self) -> &str {
        "scene-density"
    }

    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>> {
        let timestamps = self
            .detector
            .detect(&source.path, options.scene_threshold)
            .await?;
        if timestamps.len() < 2 {
            return Err(ReelcutError::Selection(format!(
                "only {} scene changes detected",
                timestamps.len()
            )));
        }

        let duration = source.duration();
        let width = options.clip_seconds.min(duration);
        let (mut band_start, mut band_end) =
            (options.scene_band.0 * duration, options.scene_band.1 * duration);
        if band_end - band_start < width {
            band_start = 0.0;
            band_end = duration;
        }

        let picked = pick_windows(&timestamps, band_start, band_end, width, options.count.max(1));
        debug!(scenes = timestamps.len(), windows = picked.len(), "Scored scene windows");

        if picked.iter().all(|&(_, _, score)| score == 0) {
            return Err(ReelcutError::Selection(
                "no scene changes inside the scan band".into(),
            ));
        }

        Ok(picked
            .into_iter()
            .map(|(start, end, score)| {
                Segment::new(
                    start,
                    end,
                    format!("{} scene changes in {:.0}s window", score, width),
                    SegmentOrigin::SceneDensity,
                )
            })
            .collect())
    }
}
