//! Segment types for the timeline.
//!
//! A segment is one clip placed on the timeline. Its position is never
//! stored: the owning [`Timeline`](crate::Timeline) derives it from sequence
//! order.

use montage_core::{MontageError, RationalTime, Result, Speed, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::id::SegmentId;

// ── Sources ─────────────────────────────────────────────────────

/// Opaque reference to a media asset, resolved by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Intrinsic properties of a media asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Playable length; `None` for stills.
    pub duration: Option<RationalTime>,
    pub width: u32,
    pub height: u32,
}

impl AssetMetadata {
    pub fn video(duration: RationalTime, width: u32, height: u32) -> Self {
        Self {
            duration: Some(duration),
            width,
            height,
        }
    }

    pub fn still(width: u32, height: u32) -> Self {
        Self {
            duration: None,
            width,
            height,
        }
    }
}

/// Looks up asset metadata. Implementations must be side-effect free.
pub trait AssetResolver {
    fn resolve(&self, source: &SourceRef) -> Option<AssetMetadata>;
}

/// In-memory [`AssetResolver`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetCatalog {
    assets: HashMap<SourceRef, AssetMetadata>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an asset.
    pub fn insert(&mut self, source: SourceRef, metadata: AssetMetadata) {
        self.assets.insert(source, metadata);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetResolver for AssetCatalog {
    fn resolve(&self, source: &SourceRef) -> Option<AssetMetadata> {
        self.assets.get(source).copied()
    }
}

// ── Clip ────────────────────────────────────────────────────────

/// Fields shared by every segment variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    id: SegmentId,
    source: SourceRef,
    source_trim: TimeRange,
    speed: Speed,
}

impl Clip {
    fn new(source: SourceRef, source_trim: TimeRange, speed: Speed) -> Result<Self> {
        let clip = Self {
            id: SegmentId::new(),
            source,
            source_trim,
            speed,
        };
        clip.check()?;
        Ok(clip)
    }

    /// Same media and speed, new trim, fresh id.
    fn derive(&self, source_trim: TimeRange) -> Result<Self> {
        let clip = Self {
            id: SegmentId::new(),
            source: self.source.clone(),
            source_trim,
            speed: self.speed,
        };
        clip.check()?;
        Ok(clip)
    }

    /// The trim must be non-empty and its composition length must be
    /// representable, so [`Clip::duration`] never overflows.
    fn check(&self) -> Result<()> {
        if self.source_trim.is_empty() {
            return Err(MontageError::InvalidTrim(format!(
                "trim {} of {} is empty",
                self.source_trim, self.source
            )));
        }
        if self.source_trim.duration().checked_div_speed(self.speed).is_none() {
            return Err(MontageError::InvalidSpeed(format!(
                "trim {} at {} has no representable duration",
                self.source_trim, self.speed
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Window of source material used.
    pub fn source_trim(&self) -> TimeRange {
        self.source_trim
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Length on the composition: `source_trim.duration / speed`.
    pub fn duration(&self) -> RationalTime {
        self.source_trim.duration() / self.speed
    }
}

// ── Segment ─────────────────────────────────────────────────────

/// Discriminant of [`Segment`], as exposed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Video,
    Image,
}

/// A clip placed on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Video { clip: Clip, reversed: bool },
    Image { clip: Clip },
}

impl Segment {
    /// Create a video segment playing `source_trim` of `source` at `speed`.
    pub fn video(source: SourceRef, source_trim: TimeRange, speed: Speed) -> Result<Self> {
        Ok(Self::Video {
            clip: Clip::new(source, source_trim, speed)?,
            reversed: false,
        })
    }

    /// Create a still image segment shown for `duration`.
    pub fn image(source: SourceRef, duration: RationalTime) -> Result<Self> {
        let trim = TimeRange::from_zero(duration)
            .map_err(|e| MontageError::InvalidTrim(e.to_string()))?;
        Ok(Self::Image {
            clip: Clip::new(source, trim, Speed::NORMAL)?,
        })
    }

    /// Create a video segment after checking the trim against the asset's
    /// intrinsic duration.
    pub fn video_from_asset(
        resolver: &dyn AssetResolver,
        source: SourceRef,
        source_trim: TimeRange,
        speed: Speed,
    ) -> Result<Self> {
        let metadata = resolve(resolver, &source)?;
        let Some(available) = metadata.duration else {
            return Err(MontageError::InvalidTrim(format!(
                "{source} is a still and has no playable duration"
            )));
        };
        if source_trim.end() > available {
            return Err(MontageError::InvalidTrim(format!(
                "trim {source_trim} exceeds the {available} available in {source}"
            )));
        }
        Self::video(source, source_trim, speed)
    }

    /// Create an image segment after checking the asset exists.
    pub fn image_from_asset(
        resolver: &dyn AssetResolver,
        source: SourceRef,
        duration: RationalTime,
    ) -> Result<Self> {
        resolve(resolver, &source)?;
        Self::image(source, duration)
    }

    pub fn clip(&self) -> &Clip {
        match self {
            Self::Video { clip, .. } | Self::Image { clip } => clip,
        }
    }

    fn clip_mut(&mut self) -> &mut Clip {
        match self {
            Self::Video { clip, .. } | Self::Image { clip } => clip,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Video { .. } => SegmentKind::Video,
            Self::Image { .. } => SegmentKind::Image,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.clip().id
    }

    pub fn source(&self) -> &SourceRef {
        &self.clip().source
    }

    pub fn source_trim(&self) -> TimeRange {
        self.clip().source_trim
    }

    pub fn speed(&self) -> Speed {
        self.clip().speed
    }

    /// Whether playback runs backwards through the source. Always false for
    /// images.
    pub fn is_reversed(&self) -> bool {
        matches!(self, Self::Video { reversed: true, .. })
    }

    /// Length on the composition.
    pub fn duration(&self) -> RationalTime {
        self.clip().duration()
    }

    /// Same segment at a different speed. The composition duration changes;
    /// the owning timeline re-lays out everything after it.
    pub fn with_speed(&self, speed: Speed) -> Result<Self> {
        let mut next = self.clone();
        next.clip_mut().speed = speed;
        next.clip().check()?;
        Ok(next)
    }

    /// Same segment over a different source window.
    pub fn with_trim(&self, source_trim: TimeRange) -> Result<Self> {
        let mut next = self.clone();
        next.clip_mut().source_trim = source_trim;
        next.clip().check()?;
        Ok(next)
    }

    /// Re-check a segment that did not come through a constructor, such
    /// as one decoded from a project file.
    pub(crate) fn check(&self) -> Result<()> {
        self.clip().check()
    }

    /// Toggle playback direction. Duration is unchanged.
    pub fn reverse(&self) -> Result<Self> {
        match self {
            Self::Video { clip, reversed } => Ok(Self::Video {
                clip: clip.clone(),
                reversed: !reversed,
            }),
            Self::Image { clip } => Err(MontageError::UnsupportedOperation(format!(
                "image segment {} cannot be reversed",
                clip.id
            ))),
        }
    }

    /// Split at `offset` from the segment's own start.
    ///
    /// Both halves keep the source and speed and get fresh ids; the
    /// original id is retired by the caller. For a reversed segment the
    /// first half on the composition plays the tail of the source window.
    pub fn split(&self, offset: RationalTime) -> Result<(Self, Self)> {
        let duration = self.duration();
        if offset <= RationalTime::ZERO || offset >= duration {
            return Err(MontageError::OutOfRange(format!(
                "split offset {offset} is not strictly inside segment {} of length {duration}",
                self.id()
            )));
        }
        let clip = self.clip();
        let trim = clip.source_trim;
        let consumed = offset.checked_mul_speed(clip.speed).ok_or_else(|| {
            MontageError::OutOfRange(format!(
                "split offset {offset} at {} is not representable",
                clip.speed
            ))
        })?;
        // Playing backwards, the first `consumed` seconds of composition
        // come from the end of the window.
        let cut = if self.is_reversed() {
            trim.end().checked_sub(consumed)
        } else {
            trim.start().checked_add(consumed)
        };
        let cut = cut.ok_or_else(|| {
            MontageError::OutOfRange(format!("split point in {trim} is not representable"))
        })?;
        let lower = clip.derive(TimeRange::from_start_end(trim.start(), cut)?)?;
        let upper = clip.derive(TimeRange::from_start_end(cut, trim.end())?)?;

        Ok(match self {
            Self::Video {
                reversed: false, ..
            } => (
                Self::Video {
                    clip: lower,
                    reversed: false,
                },
                Self::Video {
                    clip: upper,
                    reversed: false,
                },
            ),
            Self::Video { reversed: true, .. } => (
                Self::Video {
                    clip: upper,
                    reversed: true,
                },
                Self::Video {
                    clip: lower,
                    reversed: true,
                },
            ),
            Self::Image { .. } => (Self::Image { clip: lower }, Self::Image { clip: upper }),
        })
    }

    /// Map an offset from the segment's start to a time in the source.
    ///
    /// Forward playback maps `[0, duration)` onto `[trim.start, trim.end)`.
    /// Reversed playback maps it onto `(trim.start, trim.end]`: offset zero
    /// reads `trim.end`, the edge playback runs back from, and `trim.start`
    /// is reached only at the segment's exclusive end.
    pub fn source_time_at(&self, offset: RationalTime) -> Option<RationalTime> {
        if offset.is_negative() || offset >= self.duration() {
            return None;
        }
        let trim = self.source_trim();
        let consumed = offset.checked_mul_speed(self.speed())?;
        if self.is_reversed() {
            trim.end().checked_sub(consumed)
        } else {
            trim.start().checked_add(consumed)
        }
    }
}

fn resolve(resolver: &dyn AssetResolver, source: &SourceRef) -> Result<AssetMetadata> {
    resolver
        .resolve(source)
        .ok_or_else(|| MontageError::NotFound(format!("asset {source}")))
}
