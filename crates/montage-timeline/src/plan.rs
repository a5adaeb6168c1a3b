//! Renderer-facing snapshot of a timeline.
//!
//! A [`CompositionPlan`] owns plain copies of everything a player or
//! exporter needs and has no link back to the timeline it came from, so it
//! can be handed to another thread (behind an `Arc`) and read without
//! tearing while the timeline keeps changing.

use montage_core::{MontageError, RationalTime, Result, Speed, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::anchor::active_at;
use crate::effects::{ActiveEffects, EffectKind};
use crate::id::SegmentId;
use crate::segment::{SegmentKind, SourceRef};

/// One segment with its absolute placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub source: SourceRef,
    pub source_trim: TimeRange,
    pub speed: Speed,
    pub reversed: bool,
    pub range_at_composition: TimeRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectCue {
    pub range: TimeRange,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub range: TimeRange,
    pub text: String,
}

/// Immutable, declarative description of the edited composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub total_duration: RationalTime,
    /// Contiguous, in playback order.
    pub segments: Vec<SegmentDescriptor>,
    /// Per kind: sorted, non-overlapping.
    pub effects: BTreeMap<EffectKind, Vec<EffectCue>>,
    /// Sorted, non-overlapping.
    pub captions: Vec<CaptionCue>,
}

impl CompositionPlan {
    /// Active effect values at `time`.
    pub fn effects_at(&self, time: RationalTime) -> ActiveEffects {
        let mut active = ActiveEffects::default();
        for (&kind, cues) in &self.effects {
            if let Some(i) = active_at(cues, time, |cue| cue.range) {
                active.set(kind, cues[i].value);
            }
        }
        active
    }

    /// Caption showing at `time`.
    pub fn caption_at(&self, time: RationalTime) -> Option<&CaptionCue> {
        active_at(&self.captions, time, |cue| cue.range).map(|i| &self.captions[i])
    }

    /// Segment playing at `time`.
    pub fn segment_at(&self, time: RationalTime) -> Option<&SegmentDescriptor> {
        active_at(&self.segments, time, |seg| seg.range_at_composition).map(|i| &self.segments[i])
    }

    /// Every cut position including `0` and the end, without duplicates.
    pub fn segment_boundaries(&self) -> Vec<RationalTime> {
        let mut points: Vec<_> = self
            .segments
            .iter()
            .map(|seg| seg.range_at_composition.start())
            .collect();
        points.push(self.total_duration);
        points.dedup();
        points
    }

    /// Ruler ticks for thumbnail generation: for each segment, its start and
    /// then every `step` while still inside the segment.
    pub fn split_points(&self, step: RationalTime) -> Result<Vec<RationalTime>> {
        if !step.is_positive() {
            return Err(MontageError::InvalidValue(format!(
                "split step {step} must be positive"
            )));
        }
        let mut points = Vec::new();
        for seg in &self.segments {
            let range = seg.range_at_composition;
            let mut t = range.start();
            while t < range.end() {
                points.push(t);
                t = t.checked_add(step).ok_or_else(|| {
                    MontageError::InvalidValue(format!("split step {step} overflows after {t}"))
                })?;
            }
        }
        Ok(points)
    }

    /// Deterministic JSON encoding.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| MontageError::Serialization(format!("Failed to serialize plan: {}", e)))
    }
}
