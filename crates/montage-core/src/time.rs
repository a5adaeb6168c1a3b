//! Exact composition time.
//!
//! Seconds are `Rational64`, so cuts and sums never drift. Structural
//! decisions (splits, overlaps, bounds) are always made on exact
//! rational values; `f64` conversions exist only for display and input.

use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{MontageError, Result};

/// A rational time value in seconds, always in lowest terms with a
/// positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Rational64", into = "Rational64")]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// Create a new RationalTime of `numerator / denominator` seconds.
    ///
    /// Panics if `denominator` is zero.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Whole seconds.
    #[inline]
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            value: Rational64::from_integer(seconds),
        }
    }

    /// Milliseconds, reduced to lowest terms.
    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Self::new(millis, 1000)
    }

    /// Wrap a rational number of seconds produced by `Rational64`
    /// arithmetic. Use `try_from` for ratios built with `new_raw`.
    #[inline]
    pub fn from_ratio(value: Rational64) -> Self {
        Self { value }
    }

    /// The underlying rational number of seconds.
    #[inline]
    pub fn as_ratio(self) -> Rational64 {
        self.value
    }

    /// Lossy; for display only.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Zero time constant.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Check if this time lies before zero.
    #[inline]
    pub fn is_negative(self) -> bool {
        self < Self::ZERO
    }

    /// Check if this time lies after zero.
    #[inline]
    pub fn is_positive(self) -> bool {
        self > Self::ZERO
    }

    /// `self + rhs`, or `None` if the result does not fit in 64-bit terms.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.value.checked_add(&rhs.value).map(Self::from_ratio)
    }

    /// `self - rhs`, or `None` if the result does not fit in 64-bit terms.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.value.checked_sub(&rhs.value).map(Self::from_ratio)
    }

    /// Checked form of `self * speed`.
    pub fn checked_mul_speed(self, speed: Speed) -> Option<Self> {
        self.value.checked_mul(&speed.0).map(Self::from_ratio)
    }

    /// Checked form of `self / speed`.
    pub fn checked_div_speed(self, speed: Speed) -> Option<Self> {
        self.value.checked_div(&speed.0).map(Self::from_ratio)
    }

    /// Sum of `times`, or `None` as soon as a partial sum overflows.
    pub fn checked_sum(times: impl IntoIterator<Item = Self>) -> Option<Self> {
        times
            .into_iter()
            .try_fold(Self::ZERO, |acc, t| acc.checked_add(t))
    }
}

/// Lowest terms with a positive denominator. Ratios decoded by serde are
/// taken as written, so `[3, -1]` must be brought into this form before
/// any comparison. `None` for a zero denominator or an `i64::MIN` term.
fn canonical(raw: Rational64) -> Option<Rational64> {
    let (numer, denom) = (*raw.numer(), *raw.denom());
    if denom == 0 || numer == i64::MIN || denom == i64::MIN {
        return None;
    }
    Some(Rational64::new(numer, denom))
}

impl TryFrom<Rational64> for RationalTime {
    type Error = MontageError;
    fn try_from(raw: Rational64) -> Result<Self> {
        canonical(raw).map(Self::from_ratio).ok_or_else(|| {
            MontageError::InvalidValue(format!(
                "{}/{} is not a valid time",
                raw.numer(),
                raw.denom()
            ))
        })
    }
}

impl From<RationalTime> for Rational64 {
    fn from(time: RationalTime) -> Self {
        time.value
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self {
            value: self.value * rhs,
        }
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self {
            value: self.value / rhs,
        }
    }
}

/// Composition offset to source offset.
impl Mul<Speed> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: Speed) -> Self {
        Self {
            value: self.value * rhs.0,
        }
    }
}

/// Source duration to composition duration.
impl Div<Speed> for RationalTime {
    type Output = Self;
    fn div(self, rhs: Speed) -> Self {
        Self {
            value: self.value / rhs.0,
        }
    }
}

impl std::iter::Sum for RationalTime {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, t| acc + t)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

// ── Speed ───────────────────────────────────────────────────────

/// Playback speed factor, a strictly positive rational (2 = twice as fast).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Rational64", into = "Rational64")]
pub struct Speed(Rational64);

impl Speed {
    /// Normal playback.
    pub const NORMAL: Self = Self(Rational64::new_raw(1, 1));

    /// Create a speed of `numerator / denominator`.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        if denominator == 0 {
            return Err(MontageError::InvalidSpeed(format!(
                "{numerator}/{denominator} has a zero denominator"
            )));
        }
        Self::from_ratio(Rational64::new(numerator, denominator))
    }

    /// Create a speed from a rational factor.
    pub fn from_ratio(ratio: Rational64) -> Result<Self> {
        match canonical(ratio) {
            Some(speed) if speed > Rational64::from_integer(0) => Ok(Self(speed)),
            _ => Err(MontageError::InvalidSpeed(format!(
                "speed must be positive, got {}/{}",
                ratio.numer(),
                ratio.denom()
            ))),
        }
    }

    /// The speed factor as a rational.
    #[inline]
    pub fn as_ratio(self) -> Rational64 {
        self.0
    }

    /// The speed factor as f64, for display.
    #[inline]
    pub fn to_f64(self) -> f64 {
        *self.0.numer() as f64 / *self.0.denom() as f64
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<Rational64> for Speed {
    type Error = MontageError;
    fn try_from(value: Rational64) -> Result<Self> {
        Self::from_ratio(value)
    }
}

impl From<Speed> for Rational64 {
    fn from(speed: Speed) -> Self {
        speed.0
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// ── TimeRange ───────────────────────────────────────────────────

/// A closed-open time range `[start, start + duration)`.
///
/// Both `start` and `duration` are non-negative and `end` is representable;
/// every constructor and operation that would break this fails with
/// [`MontageError::InvalidRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    start: RationalTime,
    duration: RationalTime,
}

/// Unvalidated wire form of a [`TimeRange`].
#[derive(Deserialize)]
struct RawTimeRange {
    start: RationalTime,
    duration: RationalTime,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = MontageError;
    fn try_from(raw: RawTimeRange) -> Result<Self> {
        Self::new(raw.start, raw.duration)
    }
}

impl TimeRange {
    /// `[start, start + duration)`. Fails on a negative start or duration,
    /// or when the end overflows.
    pub fn new(start: RationalTime, duration: RationalTime) -> Result<Self> {
        if start.is_negative() {
            return Err(MontageError::InvalidRange(format!(
                "start {start} is negative"
            )));
        }
        if duration.is_negative() {
            return Err(MontageError::InvalidRange(format!(
                "duration {duration} is negative"
            )));
        }
        if start.checked_add(duration).is_none() {
            return Err(MontageError::InvalidRange(format!(
                "end of {start} + {duration} is not representable"
            )));
        }
        Ok(Self { start, duration })
    }

    /// `[start, end)`. Fails when `end < start`.
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Result<Self> {
        let duration = end.checked_sub(start).ok_or_else(|| {
            MontageError::InvalidRange(format!("{end} - {start} is not representable"))
        })?;
        Self::new(start, duration)
    }

    /// The range `[0, duration)`.
    pub fn from_zero(duration: RationalTime) -> Result<Self> {
        Self::new(RationalTime::ZERO, duration)
    }

    /// Start time (inclusive).
    #[inline]
    pub fn start(self) -> RationalTime {
        self.start
    }

    /// Length of the range.
    #[inline]
    pub fn duration(self) -> RationalTime {
        self.duration
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.duration.is_zero()
    }

    /// Half-open membership: `start <= time < end`.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// Check if `other` lies entirely inside this range.
    #[inline]
    pub fn contains_range(self, other: Self) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    /// Check if two ranges share an interior point.
    pub fn overlaps(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start < other.end()
            && other.start < self.end()
    }

    /// Check if one range ends exactly where the other begins.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.end() == other.start || other.end() == self.start
    }

    /// Compute the intersection of two ranges. `None` when they do not
    /// overlap or the overlap's length is not representable.
    pub fn intersect(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        Self::from_start_end(start, end).ok()
    }

    /// Restrict this range to `bounds`. A range entirely outside `bounds`
    /// collapses to an empty range on the nearest edge.
    pub fn clamp(self, bounds: Self) -> Result<Self> {
        let start = self.start.clamp(bounds.start, bounds.end());
        let end = self.end().clamp(bounds.start, bounds.end());
        Self::from_start_end(start, end)
    }

    /// Move the range by `by`; fails if the start would become negative.
    pub fn shifted(self, by: RationalTime) -> Result<Self> {
        let start = self.start.checked_add(by).ok_or_else(|| {
            MontageError::InvalidRange(format!("{} + {by} is not representable", self.start))
        })?;
        Self::new(start, self.duration)
    }

    pub const EMPTY: Self = Self {
        start: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
