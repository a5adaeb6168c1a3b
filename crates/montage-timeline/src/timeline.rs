//! The timeline: ordered segments plus the effect and caption tracks.
//!
//! `Timeline` is the single owner of all three collections and the only
//! place composition time is mapped to source time. Every mutation checks
//! everything it needs before it touches state, so a rejected call leaves
//! the timeline exactly as it was.
//!
//! Effect intervals and captions are anchored to absolute composition time.
//! Inserting, deleting or resizing a segment shifts them with the time axis;
//! reordering segments does not move them.
//!
//! Every segment boundary is representable as a `Rational64`. Edits that
//! would push a boundary past that fail with `OutOfRange` instead.

use montage_core::{MontageError, RationalTime, Result, Speed, TimeRange};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::anchor::Retime;
use crate::captions::{CaptionSegment, CaptionTrack};
use crate::config::EngineConfig;
use crate::effects::{ActiveEffects, EffectInterval, EffectKind, EffectTrack};
use crate::id::{CaptionId, EffectId, SegmentId};
use crate::plan::{CaptionCue, CompositionPlan, EffectCue, SegmentDescriptor};
use crate::segment::{Segment, SourceRef};
use crate::serialization::TimelineSnapshot;

/// Where a composition instant lands in the source media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTime {
    pub segment: SegmentId,
    pub source: SourceRef,
    pub time: RationalTime,
}

/// An editable sequence of segments with effect and caption tracks.
#[derive(Debug, Clone)]
pub struct Timeline {
    config: EngineConfig,
    segments: Vec<Segment>,
    effects: EffectTrack,
    captions: CaptionTrack,
    /// Maintained incrementally by every structural edit.
    total_duration: RationalTime,
    /// Ids of deleted or split segments; never accepted again.
    retired: HashSet<SegmentId>,
    revision: u64,
    published: Option<u64>,
    editing: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl Timeline {
    /// Create an empty timeline with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty timeline.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            segments: Vec::new(),
            effects: EffectTrack::new(),
            captions: CaptionTrack::new(),
            total_duration: RationalTime::ZERO,
            retired: HashSet::new(),
            revision: 0,
            published: None,
            editing: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    pub fn effects(&self) -> &EffectTrack {
        &self.effects
    }

    pub fn captions(&self) -> &CaptionTrack {
        &self.captions
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> RationalTime {
        self.total_duration
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Incremented by every committed mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// `[0, total_duration)`.
    pub fn bounds(&self) -> TimeRange {
        placed(RationalTime::ZERO, self.total_duration)
    }

    // ── Derived placement ───────────────────────────────────────

    /// Segments paired with their composition ranges, in order.
    pub fn layout(&self) -> impl Iterator<Item = (&Segment, TimeRange)> + '_ {
        self.segments.iter().scan(RationalTime::ZERO, |cursor, segment| {
            let start = *cursor;
            *cursor = start + segment.duration();
            Some((segment, placed(start, segment.duration())))
        })
    }

    /// Composition range of one segment.
    pub fn segment_range(&self, id: SegmentId) -> Result<TimeRange> {
        self.layout()
            .find(|(segment, _)| segment.id() == id)
            .map(|(_, range)| range)
            .ok_or_else(|| not_found(id))
    }

    /// Segment index and offset into it for a composition instant.
    pub fn segment_at(&self, time: RationalTime) -> Option<(usize, RationalTime)> {
        self.layout()
            .enumerate()
            .find(|(_, (_, range))| range.contains(time))
            .and_then(|(index, (_, range))| Some((index, time.checked_sub(range.start())?)))
    }

    /// Map a composition instant to the source media playing there.
    pub fn source_time_at(&self, time: RationalTime) -> Option<SourceTime> {
        let (index, offset) = self.segment_at(time)?;
        let segment = &self.segments[index];
        Some(SourceTime {
            segment: segment.id(),
            source: segment.source().clone(),
            time: segment.source_time_at(offset)?,
        })
    }

    // ── Structural edits ────────────────────────────────────────

    /// Insert `segment` before position `index` (`len()` appends). Anchored
    /// entries starting at or after the insertion point move right by the
    /// segment's duration.
    pub fn insert_segment(&mut self, index: usize, segment: Segment) -> Result<SegmentId> {
        if index > self.segments.len() {
            return Err(MontageError::OutOfRange(format!(
                "insert index {index} beyond {} segments",
                self.segments.len()
            )));
        }
        let id = segment.id();
        if self.retired.contains(&id) || self.segment(id).is_some() {
            return Err(MontageError::DuplicateId(format!(
                "segment {id} is already used"
            )));
        }

        let total = checked_total(
            self.segments[..index]
                .iter()
                .chain([&segment])
                .chain(&self.segments[index..]),
        )?;
        let at = self.start_of(index);
        let length = segment.duration();
        let (effects, captions) = self.reanchored(Retime::Insert { at, length })?;

        self.segments.insert(index, segment);
        self.total_duration = total;
        self.effects = effects;
        self.captions = captions;
        self.commit();
        debug!(segment = %id, index, at = %at, total = %self.total_duration, "Inserted segment");
        Ok(id)
    }

    /// Append `segment` at the end.
    pub fn append_segment(&mut self, segment: Segment) -> Result<SegmentId> {
        self.insert_segment(self.segments.len(), segment)
    }

    /// Remove a segment and close the gap. Entries inside its range are
    /// dropped, entries straddling it are clipped, later entries move left.
    pub fn delete_segment(&mut self, id: SegmentId) -> Result<Segment> {
        let index = self.index_of(id)?;
        let range = placed(self.start_of(index), self.segments[index].duration());
        let total = checked_total(self.segments[..index].iter().chain(&self.segments[index + 1..]))?;
        let (effects, captions) = self.reanchored(Retime::Remove { range })?;

        let removed = self.segments.remove(index);
        self.retired.insert(id);
        self.total_duration = total;
        self.effects = effects;
        self.captions = captions;
        self.commit();
        debug!(segment = %id, range = %range, total = %self.total_duration, "Deleted segment");
        Ok(removed)
    }

    /// Split the segment `id` at absolute composition time `at`. The total
    /// duration and every anchored entry are unchanged.
    pub fn split_segment_at(
        &mut self,
        id: SegmentId,
        at: RationalTime,
    ) -> Result<(SegmentId, SegmentId)> {
        let index = self.index_of(id)?;
        let start = self.start_of(index);
        let offset = at.checked_sub(start).ok_or_else(|| {
            MontageError::OutOfRange(format!("split time {at} is not inside segment {id}"))
        })?;
        let (left, right) = self.segments[index].split(offset)?;
        let ids = (left.id(), right.id());

        self.segments.splice(index..=index, [left, right]);
        self.retired.insert(id);
        self.commit();
        debug!(segment = %id, at = %at, left = %ids.0, right = %ids.1, "Split segment");
        Ok(ids)
    }

    /// Put the segments in the order given by `ids`, which must name every
    /// current segment exactly once. Effects and captions stay at their
    /// absolute times and do not follow their segments.
    pub fn reorder(&mut self, ids: &[SegmentId]) -> Result<()> {
        if ids.len() != self.segments.len() {
            return Err(MontageError::InvalidPermutation(format!(
                "got {} ids for {} segments",
                ids.len(),
                self.segments.len()
            )));
        }
        let positions: HashMap<SegmentId, usize> = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect();
        let mut seen = HashSet::with_capacity(ids.len());
        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            let position = positions.get(id).ok_or_else(|| {
                MontageError::InvalidPermutation(format!("segment {id} is not on the timeline"))
            })?;
            if !seen.insert(*id) {
                return Err(MontageError::InvalidPermutation(format!(
                    "segment {id} listed twice"
                )));
            }
            order.push(*position);
        }
        checked_total(order.iter().map(|&i| &self.segments[i]))?;

        self.segments = order.into_iter().map(|i| self.segments[i].clone()).collect();
        self.commit();
        debug!(segments = self.segments.len(), "Reordered segments");
        Ok(())
    }

    /// Change a segment's speed. Later segments and anchored entries follow
    /// the change in length at the segment's tail.
    pub fn set_segment_speed(&mut self, id: SegmentId, speed: Speed) -> Result<()> {
        let index = self.index_of(id)?;
        let next = self.segments[index].with_speed(speed)?;
        self.replace_resized(index, next)?;
        debug!(segment = %id, speed = %speed, total = %self.total_duration, "Changed segment speed");
        Ok(())
    }

    /// Use a different window of the segment's source.
    pub fn trim_segment(&mut self, id: SegmentId, source_trim: TimeRange) -> Result<()> {
        let index = self.index_of(id)?;
        let next = self.segments[index].with_trim(source_trim)?;
        self.replace_resized(index, next)?;
        debug!(segment = %id, trim = %source_trim, total = %self.total_duration, "Trimmed segment");
        Ok(())
    }

    /// Toggle a video segment's playback direction.
    pub fn reverse_segment(&mut self, id: SegmentId) -> Result<()> {
        let index = self.index_of(id)?;
        let next = self.segments[index].reverse()?;
        let reversed = next.is_reversed();
        self.segments[index] = next;
        self.commit();
        debug!(segment = %id, reversed, "Reversed segment");
        Ok(())
    }

    // ── Effects ─────────────────────────────────────────────────

    /// Set `kind` to `value` over `range`; overlapped intervals of the same
    /// kind are truncated.
    pub fn set_effect(&mut self, kind: EffectKind, range: TimeRange, value: f64) -> Result<EffectId> {
        let id = self.effects.set_interval(
            kind,
            range,
            value,
            self.total_duration,
            &self.config.effect_domains,
        )?;
        self.commit();
        debug!(effect = %id, kind = %kind, range = %range, value, "Set effect interval");
        Ok(id)
    }

    pub fn remove_effect(&mut self, kind: EffectKind, id: EffectId) -> Result<EffectInterval> {
        let removed = self.effects.remove_interval(kind, id)?;
        self.commit();
        debug!(effect = %id, kind = %kind, "Removed effect interval");
        Ok(removed)
    }

    /// Active effect values at `time`.
    pub fn effects_at(&self, time: RationalTime) -> ActiveEffects {
        self.effects.intervals_at(time)
    }

    // ── Captions ────────────────────────────────────────────────

    pub fn insert_caption(
        &mut self,
        text: impl Into<String>,
        range: TimeRange,
    ) -> Result<CaptionSegment> {
        let caption = self.captions.insert(
            text,
            range,
            self.total_duration,
            self.config.min_caption_duration,
        )?;
        self.commit();
        debug!(caption = %caption.id(), range = %range, "Inserted caption");
        Ok(caption)
    }

    /// Change a caption's text and/or range.
    pub fn update_caption(
        &mut self,
        id: CaptionId,
        text: Option<String>,
        range: Option<TimeRange>,
    ) -> Result<CaptionSegment> {
        let caption = self.captions.update(
            id,
            text,
            range,
            self.total_duration,
            self.config.min_caption_duration,
        )?;
        self.commit();
        debug!(caption = %id, range = %caption.range(), "Updated caption");
        Ok(caption)
    }

    pub fn remove_caption(&mut self, id: CaptionId) -> Result<CaptionSegment> {
        let removed = self.captions.remove(id)?;
        self.commit();
        debug!(caption = %id, "Removed caption");
        Ok(removed)
    }

    pub fn caption_at(&self, time: RationalTime) -> Option<&CaptionSegment> {
        self.captions.at(time)
    }

    // ── Plans ───────────────────────────────────────────────────

    /// Snapshot the current state for a renderer. Pure; never mutates.
    pub fn build_composition_plan(&self) -> CompositionPlan {
        let segments = self
            .layout()
            .map(|(segment, range)| SegmentDescriptor {
                id: segment.id(),
                kind: segment.kind(),
                source: segment.source().clone(),
                source_trim: segment.source_trim(),
                speed: segment.speed(),
                reversed: segment.is_reversed(),
                range_at_composition: range,
            })
            .collect();

        let effects = EffectKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let cues: Vec<_> = self
                    .effects
                    .intervals(kind)
                    .iter()
                    .map(|iv| EffectCue {
                        range: iv.range(),
                        value: iv.value(),
                    })
                    .collect();
                (!cues.is_empty()).then_some((kind, cues))
            })
            .collect();

        let captions = self
            .captions
            .iter()
            .map(|c| CaptionCue {
                range: c.range(),
                text: c.text().to_string(),
            })
            .collect();

        CompositionPlan {
            total_duration: self.total_duration,
            segments,
            effects,
            captions,
        }
    }

    /// Open an edit session (e.g. while a caption boundary is dragged).
    /// Mutations still apply, but no plan is published until it ends.
    pub fn begin_edit(&mut self) {
        self.editing = true;
    }

    /// Close the edit session and publish once if anything changed.
    pub fn end_edit(&mut self) -> Option<CompositionPlan> {
        self.editing = false;
        self.take_plan_update()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// A fresh plan if state changed since the last one handed out and no
    /// edit session is open.
    pub fn take_plan_update(&mut self) -> Option<CompositionPlan> {
        if self.editing || self.published == Some(self.revision) {
            return None;
        }
        self.published = Some(self.revision);
        Some(self.build_composition_plan())
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Copy of the owned collections and the retired segment ids.
    pub fn snapshot(&self) -> TimelineSnapshot {
        let mut retired: Vec<_> = self.retired.iter().copied().collect();
        retired.sort();
        TimelineSnapshot {
            segments: self.segments.clone(),
            effects: self.effects.clone(),
            captions: self.captions.clone(),
            retired,
        }
    }

    /// Rebuild a timeline, re-checking every invariant. Retired ids stay
    /// retired, so a segment deleted before saving cannot come back under
    /// its old id.
    pub fn from_snapshot(snapshot: TimelineSnapshot, config: EngineConfig) -> Result<Self> {
        let retired: HashSet<SegmentId> = snapshot.retired.into_iter().collect();
        let mut ids = HashSet::with_capacity(snapshot.segments.len());
        for segment in &snapshot.segments {
            if !ids.insert(segment.id()) {
                return Err(MontageError::DuplicateId(format!(
                    "segment {} appears twice",
                    segment.id()
                )));
            }
            if retired.contains(&segment.id()) {
                return Err(MontageError::DuplicateId(format!(
                    "segment {} was retired",
                    segment.id()
                )));
            }
            segment.check()?;
            if !segment.duration().is_positive() {
                return Err(MontageError::InvalidTrim(format!(
                    "segment {} has non-positive duration {}",
                    segment.id(),
                    segment.duration()
                )));
            }
        }
        let total = checked_total(&snapshot.segments)?;

        snapshot.effects.validate(total, &config.effect_domains)?;
        snapshot.captions.validate(total)?;
        let mut effect_ids = HashSet::new();
        if let Some(dup) = snapshot.effects.iter().find(|iv| !effect_ids.insert(iv.id())) {
            return Err(MontageError::DuplicateId(format!(
                "effect interval {} appears twice",
                dup.id()
            )));
        }
        let mut caption_ids = HashSet::new();
        if let Some(dup) = snapshot.captions.iter().find(|c| !caption_ids.insert(c.id())) {
            return Err(MontageError::DuplicateId(format!(
                "caption {} appears twice",
                dup.id()
            )));
        }

        info!(
            segments = snapshot.segments.len(),
            effects = snapshot.effects.len(),
            captions = snapshot.captions.len(),
            retired = retired.len(),
            total = %total,
            "Restored timeline"
        );
        Ok(Self {
            segments: snapshot.segments,
            effects: snapshot.effects,
            captions: snapshot.captions,
            total_duration: total,
            retired,
            ..Self::with_config(config)
        })
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn index_of(&self, id: SegmentId) -> Result<usize> {
        self.segments
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| not_found(id))
    }

    /// Composition start of the segment at `index` (or the end, for `len()`).
    fn start_of(&self, index: usize) -> RationalTime {
        self.segments[..index].iter().map(Segment::duration).sum()
    }

    fn replace_resized(&mut self, index: usize, next: Segment) -> Result<()> {
        let total = checked_total(
            self.segments[..index]
                .iter()
                .chain([&next])
                .chain(&self.segments[index + 1..]),
        )?;
        let start = self.start_of(index);
        let old = self.segments[index].duration();
        let tracks = match Retime::resize(start, old, next.duration())? {
            Some(edit) => Some(self.reanchored(edit)?),
            None => None,
        };

        self.segments[index] = next;
        self.total_duration = total;
        if let Some((effects, captions)) = tracks {
            self.effects = effects;
            self.captions = captions;
        }
        self.commit();
        Ok(())
    }

    /// Both tracks pushed through `edit`. Nothing is changed here; the
    /// caller installs the result once every other check has passed.
    fn reanchored(&self, edit: Retime) -> Result<(EffectTrack, CaptionTrack)> {
        let (effects, dropped_effects) = self.effects.retimed(edit)?;
        let (captions, dropped_captions) = self.captions.retimed(edit)?;
        if dropped_effects + dropped_captions > 0 {
            info!(
                effects = dropped_effects,
                captions = dropped_captions,
                "Structural edit removes anchored entries"
            );
        }
        Ok((effects, captions))
    }

    fn commit(&mut self) {
        self.revision += 1;
        debug_assert_eq!(checked_total(&self.segments).ok(), Some(self.total_duration));
    }
}

/// Length of `segments` laid end to end, failing if any boundary on the way
/// is not representable. Once this passes, `layout` cannot overflow.
fn checked_total<'a>(segments: impl IntoIterator<Item = &'a Segment>) -> Result<RationalTime> {
    segments
        .into_iter()
        .try_fold(RationalTime::ZERO, |end, segment| {
            end.checked_add(segment.duration()).ok_or_else(|| {
                MontageError::OutOfRange(format!(
                    "segment {} would end past the representable composition time",
                    segment.id()
                ))
            })
        })
}

fn placed(start: RationalTime, duration: RationalTime) -> TimeRange {
    let range = TimeRange::new(start, duration);
    debug_assert!(range.is_ok(), "boundary {start} + {duration} escaped checked_total");
    range.unwrap_or_default()
}

fn not_found(id: SegmentId) -> MontageError {
    MontageError::NotFound(format!("segment {id}"))
}
