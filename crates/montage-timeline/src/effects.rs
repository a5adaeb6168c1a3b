//! Interval-scoped visual adjustments.
//!
//! Intervals of one kind never overlap and are kept sorted by start; a new
//! interval overwrites whatever it covers (last writer wins).

use montage_core::{MontageError, RationalTime, Result, TimeRange};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::anchor::{active_at, Retime};
use crate::config::EffectDomains;
use crate::id::EffectId;

/// Adjustable visual parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Brightness,
    Saturation,
    Contrast,
    Blur,
}

impl EffectKind {
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Brightness,
        EffectKind::Saturation,
        EffectKind::Contrast,
        EffectKind::Blur,
    ];

    /// Value meaning "unchanged". Colour adjustments are signed offsets and
    /// blur is a radius, so every kind is neutral at zero.
    pub fn neutral(self) -> f64 {
        0.0
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Brightness => "brightness",
            Self::Saturation => "saturation",
            Self::Contrast => "contrast",
            Self::Blur => "blur",
        })
    }
}

/// One kind's value over a composition range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInterval {
    id: EffectId,
    kind: EffectKind,
    range: TimeRange,
    value: f64,
}

impl EffectInterval {
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// What is left of `self` once `cut` is carved out: zero, one or two
    /// pieces. The first piece keeps the id.
    fn remnants(&self, cut: TimeRange) -> Result<SmallVec<[EffectInterval; 2]>> {
        let mut pieces = SmallVec::new();
        if self.range.start() < cut.start() {
            let range = TimeRange::from_start_end(self.range.start(), cut.start())?;
            pieces.push(Self { range, ..self.clone() });
        }
        if self.range.end() > cut.end() {
            let range = TimeRange::from_start_end(cut.end(), self.range.end())?;
            let id = if pieces.is_empty() {
                self.id
            } else {
                EffectId::new()
            };
            pieces.push(Self {
                id,
                range,
                ..self.clone()
            });
        }
        Ok(pieces)
    }
}

/// Value of every effect kind at one instant; neutral where nothing is set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub brightness: f64,
    pub saturation: f64,
    pub contrast: f64,
    pub blur: f64,
}

impl ActiveEffects {
    pub fn get(&self, kind: EffectKind) -> f64 {
        match kind {
            EffectKind::Brightness => self.brightness,
            EffectKind::Saturation => self.saturation,
            EffectKind::Contrast => self.contrast,
            EffectKind::Blur => self.blur,
        }
    }

    pub(crate) fn set(&mut self, kind: EffectKind, value: f64) {
        match kind {
            EffectKind::Brightness => self.brightness = value,
            EffectKind::Saturation => self.saturation = value,
            EffectKind::Contrast => self.contrast = value,
            EffectKind::Blur => self.blur = value,
        }
    }

    pub fn is_neutral(&self) -> bool {
        EffectKind::ALL
            .iter()
            .all(|&kind| self.get(kind) == kind.neutral())
    }
}

/// All effect intervals of a timeline, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectTrack {
    intervals: BTreeMap<EffectKind, Vec<EffectInterval>>,
}

impl EffectTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `kind` to `value` over `range`, truncating or removing whatever
    /// intervals of the same kind it covers. `range` must lie inside
    /// `[0, total)`.
    pub fn set_interval(
        &mut self,
        kind: EffectKind,
        range: TimeRange,
        value: f64,
        total: RationalTime,
        domains: &EffectDomains,
    ) -> Result<EffectId> {
        if range.is_empty() {
            return Err(MontageError::InvalidRange(format!(
                "{kind} interval {range} is empty"
            )));
        }
        let bounds = TimeRange::from_zero(total)?;
        if !bounds.contains_range(range) {
            return Err(MontageError::OutOfRange(format!(
                "{kind} interval {range} exceeds timeline {bounds}"
            )));
        }
        let domain = domains.for_kind(kind);
        if !domain.accepts(value) {
            return Err(MontageError::InvalidValue(format!(
                "{kind} value {value} outside [{}, {}]",
                domain.min, domain.max
            )));
        }

        let id = EffectId::new();
        let list = self.intervals(kind);
        let mut next = Vec::with_capacity(list.len() + 2);
        for existing in list {
            if existing.range.overlaps(range) {
                next.extend(existing.remnants(range)?);
            } else {
                next.push(existing.clone());
            }
        }
        let at = next.partition_point(|iv| iv.range.start() < range.start());
        next.insert(
            at,
            EffectInterval {
                id,
                kind,
                range,
                value,
            },
        );
        self.intervals.insert(kind, next);
        Ok(id)
    }

    /// Remove one interval. Other kinds are untouched.
    pub fn remove_interval(&mut self, kind: EffectKind, id: EffectId) -> Result<EffectInterval> {
        let list = self
            .intervals
            .get_mut(&kind)
            .ok_or_else(|| MontageError::NotFound(format!("{kind} interval {id}")))?;
        let index = list
            .iter()
            .position(|iv| iv.id == id)
            .ok_or_else(|| MontageError::NotFound(format!("{kind} interval {id}")))?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.intervals.remove(&kind);
        }
        Ok(removed)
    }

    /// Active value of every kind at `time`.
    pub fn intervals_at(&self, time: RationalTime) -> ActiveEffects {
        let mut active = ActiveEffects::default();
        for (&kind, list) in &self.intervals {
            if let Some(i) = active_at(list, time, |iv| iv.range) {
                active.set(kind, list[i].value);
            }
        }
        active
    }

    /// Intervals of one kind, sorted by start.
    pub fn intervals(&self, kind: EffectKind) -> &[EffectInterval] {
        self.intervals.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every interval, grouped by kind in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectInterval> {
        self.intervals.values().flatten()
    }

    pub fn get(&self, id: EffectId) -> Option<&EffectInterval> {
        self.iter().find(|iv| iv.id == id)
    }

    pub fn len(&self) -> usize {
        self.intervals.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// This track pushed through a structural edit, and how many intervals
    /// vanished on the way. `self` is untouched, so a failure part way
    /// through leaves nothing to undo.
    pub(crate) fn retimed(&self, edit: Retime) -> Result<(Self, usize)> {
        let mut intervals = BTreeMap::new();
        let mut dropped = 0;
        for (&kind, list) in &self.intervals {
            let mut mapped = Vec::with_capacity(list.len());
            for iv in list {
                match edit.map(iv.range)? {
                    Some(range) => mapped.push(EffectInterval {
                        range,
                        ..iv.clone()
                    }),
                    None => dropped += 1,
                }
            }
            if !mapped.is_empty() {
                intervals.insert(kind, mapped);
            }
        }
        Ok((Self { intervals }, dropped))
    }

    /// Check every invariant against a timeline of length `total`.
    pub(crate) fn validate(&self, total: RationalTime, domains: &EffectDomains) -> Result<()> {
        let bounds = TimeRange::from_zero(total)?;
        for (&kind, list) in &self.intervals {
            let domain = domains.for_kind(kind);
            for (i, iv) in list.iter().enumerate() {
                if iv.kind != kind {
                    return Err(MontageError::InvalidValue(format!(
                        "interval {} of kind {} filed under {kind}",
                        iv.id, iv.kind
                    )));
                }
                if iv.range.is_empty() {
                    return Err(MontageError::InvalidRange(format!(
                        "{kind} interval {} is empty",
                        iv.id
                    )));
                }
                if !bounds.contains_range(iv.range) {
                    return Err(MontageError::OutOfRange(format!(
                        "{kind} interval {} at {} exceeds timeline {bounds}",
                        iv.id, iv.range
                    )));
                }
                if !domain.accepts(iv.value) {
                    return Err(MontageError::InvalidValue(format!(
                        "{kind} interval {} has value {} outside [{}, {}]",
                        iv.id, iv.value, domain.min, domain.max
                    )));
                }
                if i > 0 && list[i - 1].range.end() > iv.range.start() {
                    return Err(MontageError::Overlap(format!(
                        "{kind} intervals {} and {} overlap or are out of order",
                        list[i - 1].id,
                        iv.id
                    )));
                }
            }
        }
        Ok(())
    }
}
