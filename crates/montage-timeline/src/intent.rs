//! Edit intents: the one-way message channel from UI to timeline.
//!
//! A UI gesture becomes an `EditIntent`, which is applied to the timeline
//! and reports what it produced. No UI state holds closures into the
//! timeline or into other widgets.

use montage_core::{RationalTime, Result, Speed, TimeRange};

use crate::captions::CaptionSegment;
use crate::effects::{EffectInterval, EffectKind};
use crate::id::{CaptionId, EffectId, SegmentId};
use crate::segment::Segment;
use crate::timeline::Timeline;

/// A requested change to a timeline.
#[derive(Debug, Clone)]
pub enum EditIntent {
    /// Insert a segment before position `index`.
    InsertSegment { index: usize, segment: Segment },
    /// Remove a segment and close the gap.
    DeleteSegment { id: SegmentId },
    /// Cut a segment at an absolute composition time.
    SplitSegment { id: SegmentId, at: RationalTime },
    /// Put segments in a new order.
    Reorder { ids: Vec<SegmentId> },
    SetSpeed { id: SegmentId, speed: Speed },
    Reverse { id: SegmentId },
    Trim { id: SegmentId, source_trim: TimeRange },
    SetEffect {
        kind: EffectKind,
        range: TimeRange,
        value: f64,
    },
    RemoveEffect { kind: EffectKind, id: EffectId },
    InsertCaption { text: String, range: TimeRange },
    UpdateCaption {
        id: CaptionId,
        text: Option<String>,
        range: Option<TimeRange>,
    },
    RemoveCaption { id: CaptionId },
    /// Several intents applied all-or-nothing.
    Batch(Vec<EditIntent>),
}

/// What an applied intent produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Inserted(SegmentId),
    Deleted(Segment),
    Split(SegmentId, SegmentId),
    EffectSet(EffectId),
    EffectRemoved(EffectInterval),
    Caption(CaptionSegment),
    CaptionRemoved(CaptionSegment),
    /// The intent had no product beyond the state change.
    Applied,
    Batch(Vec<EditOutcome>),
}

impl EditIntent {
    /// Apply this intent. On error the timeline is unchanged; for `Batch`
    /// that holds for the whole batch.
    pub fn apply(self, timeline: &mut Timeline) -> Result<EditOutcome> {
        Ok(match self {
            Self::InsertSegment { index, segment } => {
                EditOutcome::Inserted(timeline.insert_segment(index, segment)?)
            }
            Self::DeleteSegment { id } => EditOutcome::Deleted(timeline.delete_segment(id)?),
            Self::SplitSegment { id, at } => {
                let (left, right) = timeline.split_segment_at(id, at)?;
                EditOutcome::Split(left, right)
            }
            Self::Reorder { ids } => {
                timeline.reorder(&ids)?;
                EditOutcome::Applied
            }
            Self::SetSpeed { id, speed } => {
                timeline.set_segment_speed(id, speed)?;
                EditOutcome::Applied
            }
            Self::Reverse { id } => {
                timeline.reverse_segment(id)?;
                EditOutcome::Applied
            }
            Self::Trim { id, source_trim } => {
                timeline.trim_segment(id, source_trim)?;
                EditOutcome::Applied
            }
            Self::SetEffect { kind, range, value } => {
                EditOutcome::EffectSet(timeline.set_effect(kind, range, value)?)
            }
            Self::RemoveEffect { kind, id } => {
                EditOutcome::EffectRemoved(timeline.remove_effect(kind, id)?)
            }
            Self::InsertCaption { text, range } => {
                EditOutcome::Caption(timeline.insert_caption(text, range)?)
            }
            Self::UpdateCaption { id, text, range } => {
                EditOutcome::Caption(timeline.update_caption(id, text, range)?)
            }
            Self::RemoveCaption { id } => {
                EditOutcome::CaptionRemoved(timeline.remove_caption(id)?)
            }
            Self::Batch(intents) => {
                // Work on a scratch copy; commit only if every step succeeds.
                let mut scratch = timeline.clone();
                let outcomes = intents
                    .into_iter()
                    .map(|intent| intent.apply(&mut scratch))
                    .collect::<Result<Vec<_>>>()?;
                *timeline = scratch;
                EditOutcome::Batch(outcomes)
            }
        })
    }
}
