//! Side-data heuristics: engagement heatmap and chapter markers.

use super::{Segment, SegmentOrigin, SegmentSelector, SelectionOptions};
use crate::error::{ReelcutError, Result};
use crate::source::{Chapter, HeatMarker, MediaSource};
use async_trait::async_trait;
use rand::seq::SliceRandom;

/// Centres a clip on the "most replayed" spike, if there is a real spike.
pub struct EngagementSelector;

/// The peak marker and its ratio to the mean, when the ratio reaches `spike_ratio`.
pub(crate) fn find_spike(heatmap: &[HeatMarker], spike_ratio: f64) -> Option<(&HeatMarker, f64)> {
    if heatmap.is_empty() {
        return None;
    }
    let mean = heatmap.iter().map(|m| m.value).sum::<f64>() / heatmap.len() as f64;
    if mean <= 0.0 {
        return None;
    }

    let peak = heatmap
        .iter()
        .fold(None::<&HeatMarker>, |best, m| match best {
            Some(b) if b.value >= m.value => Some(b),
            _ => Some(m),
        })?;

    let ratio = peak.value / mean;
    (ratio >= spike_ratio).then_some((peak, ratio))
}

#[async_trait]
impl SegmentSelector for EngagementSelector {
    fn name(&self) -> &str {
        "engagement"
    }

    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>> {
        let (peak, ratio) = find_spike(&source.heatmap, options.spike_ratio)
            .ok_or_else(|| ReelcutError::Selection("no engagement spike".into()))?;

        let centre = (peak.start + peak.end) / 2.0;
        let start = centre - options.clip_seconds / 2.0;
        Ok(vec![Segment::new(
            start,
            start + options.clip_seconds,
            format!("Most replayed moment at {:.0}s ({:.1}x average)", centre, ratio),
            SegmentOrigin::Engagement,
        )])
    }
}

/// Picks a random interior chapter when the video has more than two.
pub struct ChapterSelector;

/// Chapters other than the first and last, or nothing if there are two or fewer.
pub(crate) fn interior_chapters(chapters: &[Chapter]) -> &[Chapter] {
    if chapters.len() > 2 {
        &chapters[1..chapters.len() - 1]
    } else {
        &[]
    }
}

#[async_trait]
impl SegmentSelector for ChapterSelector {
    fn name(&self) -> &str {
        "chapters"
    }

    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>> {
        let mut rng = options.rng();
        let chapter = interior_chapters(&source.chapters)
            .choose(&mut rng)
            .ok_or_else(|| ReelcutError::Selection("not enough chapters".into()))?;

        Ok(vec![Segment::new(
            chapter.start,
            chapter.start + options.clip_seconds,
            format!("Chapter: {}", chapter.title),
            SegmentOrigin::Chapter,
        )
        .with_hook(Some(chapter.title.clone()))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn marker(start: f64, value: f64) -> HeatMarker {
        HeatMarker {
            start,
            end: start + 10.0,
            value,
        }
    }

    fn chapter(title: &str, start: f64, end: f64) -> Chapter {
        Chapter {
            title: title.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_spike_detection() {
        let flat = vec![marker(0.0, 0.5), marker(10.0, 0.5), marker(20.0, 0.6)];
        assert!(find_spike(&flat, 1.5).is_none());

        let spiky = vec![marker(0.0, 0.2), marker(10.0, 0.2), marker(20.0, 1.0), marker(30.0, 0.2)];
        let (peak, ratio) = find_spike(&spiky, 1.5).unwrap();
        assert_eq!(peak.start, 20.0);
        assert!((ratio - 2.5).abs() < 1e-9);

        assert!(find_spike(&[], 1.5).is_none());
        assert!(find_spike(&[marker(0.0, 0.0)], 1.5).is_none());
    }

    #[test]
    fn test_interior_chapters() {
        let two = vec![chapter("a", 0.0, 10.0), chapter("b", 10.0, 20.0)];
        assert!(interior_chapters(&two).is_empty());

        let four = vec![
            chapter("intro", 0.0, 30.0),
            chapter("one", 30.0, 200.0),
            chapter("two", 200.0, 400.0),
            chapter("outro", 400.0, 420.0),
        ];
        let titles: Vec<_> = interior_chapters(&four).iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_engagement_centres_on_peak() {
        let mut source = MediaSource::new("x", PathBuf::from("x.mp4"), 600.0).unwrap();
        source.heatmap = vec![marker(0.0, 0.1), marker(295.0, 0.9), marker(400.0, 0.1)];
        let segs = EngagementSelector
            .select(&source, &SelectionOptions::default())
            .await
            .unwrap();
        assert_eq!((segs[0].start, segs[0].end), (270.0, 330.0));
        assert_eq!(segs[0].origin, SegmentOrigin::Engagement);
    }

    #[tokio::test]
    async fn test_chapter_never_first_or_last() {
        let mut source = MediaSource::new("x", PathBuf::from("x.mp4"), 420.0).unwrap();
        source.chapters = vec![
            chapter("intro", 0.0, 30.0),
            chapter("one", 30.0, 200.0),
            chapter("outro", 200.0, 420.0),
        ];
        for seed in 0..20 {
            let options = SelectionOptions {
                seed,
                ..SelectionOptions::default()
            };
            let segs = ChapterSelector.select(&source, &options).await.unwrap();
            assert_eq!(segs[0].start, 30.0);
            assert_eq!(segs[0].rationale, "Chapter: one");
        }
    }
}
