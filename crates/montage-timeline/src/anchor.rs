//! Re-anchoring of absolute-time entries after a structural edit.
//!
//! Effect intervals and captions are anchored to composition time, not to
//! segment identity. When time is inserted or removed, every anchored range
//! is pushed through the same monotone map, which keeps sorted tracks sorted
//! and disjoint tracks disjoint.

use montage_core::{MontageError, RationalTime, Result, TimeRange};

/// A change to the composition's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retime {
    /// `length` of new time appears at `at`.
    Insert {
        at: RationalTime,
        length: RationalTime,
    },
    /// The span `range` disappears; later time moves left.
    Remove { range: TimeRange },
}

impl Retime {
    /// The edit turning a segment of `old` length starting at `start` into
    /// one of `new` length, applied at the segment's tail.
    pub(crate) fn resize(
        start: RationalTime,
        old: RationalTime,
        new: RationalTime,
    ) -> Result<Option<Self>> {
        let segment = TimeRange::new(start, old)?;
        if new > old {
            Ok(Some(Self::Insert {
                at: segment.end(),
                length: new.checked_sub(old).ok_or_else(|| unrepresentable(new))?,
            }))
        } else if new < old {
            let tail = start.checked_add(new).ok_or_else(|| unrepresentable(new))?;
            let range = TimeRange::from_start_end(tail, segment.end())?;
            Ok(Some(Self::Remove { range }))
        } else {
            Ok(None)
        }
    }

    /// Map an anchored range through the edit; `None` when nothing of it
    /// survives.
    ///
    /// On insert, ranges starting at or after `at` shift right and ranges
    /// straddling `at` stay put. On removal, the removed span collapses onto
    /// its start: contained ranges vanish and straddling ranges are clipped.
    pub(crate) fn map(self, range: TimeRange) -> Result<Option<TimeRange>> {
        let mapped = match self {
            Self::Insert { at, length } => {
                if range.start() >= at {
                    range.shifted(length)?
                } else {
                    range
                }
            }
            Self::Remove { range: removed } => {
                let start = collapse(removed, range.start())?;
                let end = collapse(removed, range.end())?;
                TimeRange::from_start_end(start, end)?
            }
        };
        Ok((!mapped.is_empty()).then_some(mapped))
    }
}

/// Index of the entry active at `time` in a slice sorted by start with
/// disjoint ranges. Binary search, O(log n).
pub(crate) fn active_at<T>(
    entries: &[T],
    time: RationalTime,
    range_of: impl Fn(&T) -> TimeRange,
) -> Option<usize> {
    let after = entries.partition_point(|e| range_of(e).start() <= time);
    let index = after.checked_sub(1)?;
    range_of(&entries[index]).contains(time).then_some(index)
}

fn collapse(removed: TimeRange, t: RationalTime) -> Result<RationalTime> {
    if t <= removed.start() {
        Ok(t)
    } else if t >= removed.end() {
        t.checked_sub(removed.duration())
            .ok_or_else(|| unrepresentable(t))
    } else {
        Ok(removed.start())
    }
}

fn unrepresentable(t: RationalTime) -> MontageError {
    MontageError::OutOfRange(format!("retiming around {t} overflows"))
}
