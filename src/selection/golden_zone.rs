//! Random sampling inside the "golden zone".
//!
//! Intros and outros rarely make good shorts, so the zone skips the first and
//! last part of the video. Works on any source and never fails.

use super::{Segment, SegmentOrigin, SegmentSelector, SelectionOptions};
use crate::error::Result;
use crate::source::MediaSource;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;

pub struct GoldenZoneSelector;

fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// One clip starting uniformly in `[zone_start, zone_end - clip]`.
///
/// Falls back to the whole video when the zone can't hold the clip.
pub(crate) fn sample_single(
    rng: &mut StdRng,
    duration: f64,
    band: (f64, f64),
    clip: f64,
) -> (f64, f64) {
    let clip = clip.min(duration);
    let zone_start = band.0 * duration;
    let zone_end = band.1 * duration;

    let start = if zone_end - clip >= zone_start {
        uniform(rng, zone_start, zone_end - clip)
    } else {
        uniform(rng, 0.0, duration - clip)
    };
    (start, start + clip)
}

/// `count` clips, one per equal section of the zone, in order.
pub(crate) fn sample_sections(
    rng: &mut StdRng,
    duration: f64,
    band: (f64, f64),
    clip: f64,
    count: usize,
) -> Vec<(f64, f64)> {
    let count = count.max(1);
    let (mut zone_start, mut zone_end) = (band.0 * duration, band.1 * duration);
    if zone_end - zone_start < clip * count as f64 {
        zone_start = 0.0;
        zone_end = duration;
    }

    let section = (zone_end - zone_start) / count as f64;
    let clip = clip.min(section);

    (0..count)
        .map(|i| {
            let section_start = zone_start + i as f64 * section;
            let start = uniform(rng, section_start, section_start + section - clip);
            (start, start + clip)
        })
        .collect()
}

#[async_trait]
impl SegmentSelector for GoldenZoneSelector {
    fn name(&self) -> &str {
        "golden-zone"
    }

    async fn select(&self, source: &MediaSource, options: &SelectionOptions) -> Result<Vec<Segment>> {
        let duration = source.duration();
        let mut rng = options.rng();
        let rationale = format!(
            "Random pick from golden zone ({:.0}s-{:.0}s)",
            options.band.0 * duration,
            options.band.1 * duration
        );

        let spans = if options.count <= 1 {
            vec![sample_single(&mut rng, duration, options.band, options.clip_seconds)]
        } else {
            sample_sections(&mut rng, duration, options.band, options.clip_seconds, options.count)
        };

        Ok(spans
            .into_iter()
            .map(|(start, end)| Segment::new(start, end, rationale.clone(), SegmentOrigin::GoldenZone))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::path::PathBuf;

    #[test]
    fn test_single_stays_in_zone() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (start, end) = sample_single(&mut rng, 300.0, (0.10, 0.80), 60.0);
            assert!((30.0..=210.0).contains(&start), "seed {seed}: {start}");
            assert!((end - start - 60.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_short_video_uses_whole_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let (start, end) = sample_single(&mut rng, 70.0, (0.10, 0.80), 60.0);
        assert!(start >= 0.0 && end <= 70.0);

        let (start, end) = sample_single(&mut rng, 40.0, (0.10, 0.80), 60.0);
        assert_eq!((start, end), (0.0, 40.0));
    }

    #[test]
    fn test_sections_are_ordered_and_disjoint() {
        let mut rng = StdRng::seed_from_u64(3);
        let spans = sample_sections(&mut rng, 600.0, (0.10, 0.80), 3.0, 10);
        assert_eq!(spans.len(), 10);
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
        assert!(spans[0].0 >= 60.0);
        assert!(spans[9].1 <= 480.0 + 1e-9);
    }

    #[test]
    fn test_same_seed_same_pick() {
        let a = sample_single(&mut StdRng::seed_from_u64(42), 500.0, (0.1, 0.8), 60.0);
        let b = sample_single(&mut StdRng::seed_from_u64(42), 500.0, (0.1, 0.8), 60.0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_selector_uses_options() {
        let source = MediaSource::new("x", PathBuf::from("x.mp4"), 300.0).unwrap();
        let options = SelectionOptions::default().montage(10, 30.0);
        let segs = GoldenZoneSelector.select(&source, &options).await.unwrap();
        assert_eq!(segs.len(), 10);
        assert!(segs.iter().all(|s| (s.duration() - 3.0).abs() < 1e-9));
    }
}
