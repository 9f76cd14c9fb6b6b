//! Timeline reconciliation.
//!
//! Takes the measured narration length as the only duration authority and
//! derives everything else from it: how many visual cuts, where in the source
//! each one comes from, how the joined cuts are fitted to the narration, and
//! when each on-screen word chunk appears.

mod assemble;
mod cuts;
mod subtitles;

pub use assemble::{assemble_visuals, AssembledVisuals, FitAction};
pub use cuts::{plan_cuts, Cut, CutPlan};
pub use subtitles::{derive_subtitles, SubtitleCue, SubtitleStyle, SubtitleTrack};

use crate::config::ReconcileSettings;

/// Cut planning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileConfig {
    /// Preferred length of one visual beat.
    pub target_cut_seconds: f64,
    /// Usable sampling window as fractions of the source duration.
    pub usable_start: f64,
    pub usable_end: f64,
    /// Jitter as a fraction of the spacing between cuts.
    pub jitter: f64,
    /// Drift allowed between visuals and narration before re-fitting.
    pub tolerance_seconds: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::from_settings(&ReconcileSettings::default())
    }
}

impl ReconcileConfig {
    pub fn from_settings(settings: &ReconcileSettings) -> Self {
        Self {
            target_cut_seconds: settings.target_cut_seconds,
            usable_start: settings.usable_band[0],
            usable_end: settings.usable_band[1],
            jitter: settings.jitter,
            tolerance_seconds: settings.tolerance_seconds,
        }
    }
}

/// Which share of the usable window a variation samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationSlot {
    pub index: usize,
    pub count: usize,
}

impl Default for VariationSlot {
    fn default() -> Self {
        Self::single()
    }
}

impl VariationSlot {
    pub fn single() -> Self {
        Self { index: 0, count: 1 }
    }

    pub fn new(index: usize, count: usize) -> Self {
        let count = count.max(1);
        Self {
            index: index.min(count - 1),
            count,
        }
    }

    /// This slot's equal, non-overlapping share of `[start, end]`.
    pub fn window(&self, start: f64, end: f64) -> (f64, f64) {
        let size = (end - start) / self.count as f64;
        let slot_start = start + self.index as f64 * size;
        (slot_start, slot_start + size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_partition_window() {
        let slots: Vec<_> = (0..4).map(|i| VariationSlot::new(i, 4).window(2.0, 98.0)).collect();
        assert_eq!(slots[0], (2.0, 26.0));
        assert_eq!(slots[3], (74.0, 98.0));
        for pair in slots.windows(2) {
            assert!((pair[0].1 - pair[1].0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_slot_index_is_bounded() {
        assert_eq!(VariationSlot::new(7, 3), VariationSlot { index: 2, count: 3 });
        assert_eq!(VariationSlot::new(0, 0), VariationSlot::single());
    }
}
