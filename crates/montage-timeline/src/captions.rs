//! Caption track: timed text overlays that never stack.

use montage_core::{MontageError, RationalTime, Result, TimeRange};
use serde::{Deserialize, Serialize};

use crate::anchor::{active_at, Retime};
use crate::id::CaptionId;

/// A text overlay over a composition range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionSegment {
    id: CaptionId,
    text: String,
    range: TimeRange,
}

impl CaptionSegment {
    pub fn id(&self) -> CaptionId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }
}

/// Captions of a timeline, sorted by start and pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionTrack {
    captions: Vec<CaptionSegment>,
}

impl CaptionTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a caption over `range`.
    ///
    /// Fails with `OutOfRange` outside `[0, total)`, `TooShort` below
    /// `min_duration`, and `Overlap` when another caption occupies any part
    /// of `range`.
    pub fn insert(
        &mut self,
        text: impl Into<String>,
        range: TimeRange,
        total: RationalTime,
        min_duration: RationalTime,
    ) -> Result<CaptionSegment> {
        self.check_placement(None, range, total, min_duration)?;
        let caption = CaptionSegment {
            id: CaptionId::new(),
            text: text.into(),
            range,
        };
        let at = self.insertion_index(range);
        self.captions.insert(at, caption.clone());
        Ok(caption)
    }

    /// Change a caption's text, range, or both. The caption does not count
    /// as an overlap against itself.
    pub fn update(
        &mut self,
        id: CaptionId,
        text: Option<String>,
        range: Option<TimeRange>,
        total: RationalTime,
        min_duration: RationalTime,
    ) -> Result<CaptionSegment> {
        let index = self.index_of(id)?;
        if let Some(range) = range {
            self.check_placement(Some(id), range, total, min_duration)?;
        }

        let mut caption = self.captions.remove(index);
        if let Some(text) = text {
            caption.text = text;
        }
        if let Some(range) = range {
            caption.range = range;
        }
        let at = self.insertion_index(caption.range);
        self.captions.insert(at, caption.clone());
        Ok(caption)
    }

    pub fn remove(&mut self, id: CaptionId) -> Result<CaptionSegment> {
        let index = self.index_of(id)?;
        Ok(self.captions.remove(index))
    }

    /// The caption showing at `time`, if any.
    pub fn at(&self, time: RationalTime) -> Option<&CaptionSegment> {
        active_at(&self.captions, time, |c| c.range).map(|i| &self.captions[i])
    }

    pub fn get(&self, id: CaptionId) -> Option<&CaptionSegment> {
        self.captions.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaptionSegment> {
        self.captions.iter()
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    /// This track pushed through a structural edit, and how many captions
    /// vanished on the way.
    pub(crate) fn retimed(&self, edit: Retime) -> Result<(Self, usize)> {
        let mut captions = Vec::with_capacity(self.captions.len());
        for caption in &self.captions {
            if let Some(range) = edit.map(caption.range)? {
                captions.push(CaptionSegment {
                    range,
                    ..caption.clone()
                });
            }
        }
        let dropped = self.captions.len() - captions.len();
        Ok((Self { captions }, dropped))
    }

    /// Check ordering, disjointness and bounds. Length is not checked: a
    /// structural edit may legitimately leave a caption shorter than the
    /// insert minimum.
    pub(crate) fn validate(&self, total: RationalTime) -> Result<()> {
        let bounds = TimeRange::from_zero(total)?;
        for (i, caption) in self.captions.iter().enumerate() {
            if caption.range.is_empty() {
                return Err(MontageError::InvalidRange(format!(
                    "caption {} is empty",
                    caption.id
                )));
            }
            if !bounds.contains_range(caption.range) {
                return Err(MontageError::OutOfRange(format!(
                    "caption {} at {} exceeds timeline {bounds}",
                    caption.id, caption.range
                )));
            }
            if i > 0 && self.captions[i - 1].range.end() > caption.range.start() {
                return Err(MontageError::Overlap(format!(
                    "captions {} and {} overlap or are out of order",
                    self.captions[i - 1].id,
                    caption.id
                )));
            }
        }
        Ok(())
    }

    fn check_placement(
        &self,
        ignore: Option<CaptionId>,
        range: TimeRange,
        total: RationalTime,
        min_duration: RationalTime,
    ) -> Result<()> {
        let bounds = TimeRange::from_zero(total)?;
        if !bounds.contains_range(range) {
            return Err(MontageError::OutOfRange(format!(
                "caption range {range} exceeds timeline {bounds}"
            )));
        }
        if range.duration() < min_duration || range.is_empty() {
            return Err(MontageError::TooShort {
                duration: range.duration(),
                minimum: min_duration,
            });
        }
        if let Some(other) = self
            .captions
            .iter()
            .find(|c| Some(c.id) != ignore && c.range.overlaps(range))
        {
            return Err(MontageError::Overlap(format!(
                "caption range {range} overlaps caption {} at {}",
                other.id, other.range
            )));
        }
        Ok(())
    }

    fn insertion_index(&self, range: TimeRange) -> usize {
        self.captions
            .partition_point(|c| c.range.start() < range.start())
    }

    fn index_of(&self, id: CaptionId) -> Result<usize> {
        self.captions
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| MontageError::NotFound(format!("caption {id}")))
    }
}
