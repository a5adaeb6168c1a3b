//! Property tests: random edit sequences never break timeline invariants.

use montage_core::{RationalTime, Result, Speed, TimeRange};
use montage_timeline::{CaptionId, EffectKind, Segment, SegmentId, SourceRef, Timeline};
use proptest::prelude::*;

/// One randomly generated edit. Positions are in quarter seconds and
/// indices are reduced modulo the current segment count when applied.
#[derive(Debug, Clone)]
enum Op {
    Insert { index: usize, quarters: i64 },
    Delete { index: usize },
    Split { index: usize, at: i64 },
    Speed { index: usize, num: i64, den: i64 },
    Reverse { index: usize },
    Reorder { rotate: usize },
    Effect { kind: usize, start: i64, len: i64, value: f64 },
    Caption { start: i64, len: i64 },
}

fn quarters(n: i64) -> RationalTime {
    RationalTime::new(n, 4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..8, 1i64..40).prop_map(|(index, quarters)| Op::Insert { index, quarters }),
        (0usize..8).prop_map(|index| Op::Delete { index }),
        (0usize..8, 0i64..160).prop_map(|(index, at)| Op::Split { index, at }),
        (0usize..8, 1i64..5, 1i64..5).prop_map(|(index, num, den)| Op::Speed { index, num, den }),
        (0usize..8).prop_map(|index| Op::Reverse { index }),
        (0usize..8).prop_map(|rotate| Op::Reorder { rotate }),
        (0usize..4, 0i64..160, 1i64..20, -1.0f64..1.0)
            .prop_map(|(kind, start, len, value)| Op::Effect { kind, start, len, value }),
        (0i64..160, 4i64..20).prop_map(|(start, len)| Op::Caption { start, len }),
    ]
}

/// An edit that cannot succeed on any timeline.
#[derive(Debug, Clone)]
enum Doomed {
    EffectPastEnd { kind: usize, start: i64, overshoot: i64 },
    EffectNotFinite { kind: usize },
    SplitOutside { index: usize, beyond: i64 },
    ReorderBad { mode: usize },
    DeleteUnknown,
    InsertExisting { index: usize },
    TrimEmpty { index: usize },
    RemoveUnknownCaption,
}

/// One edit tried against a built-up timeline: either an ordinary random
/// edit, which may or may not be accepted, or one that must be refused.
#[derive(Debug, Clone)]
enum Attempt {
    Edit(Op),
    Doomed(Doomed),
}

fn doomed_strategy() -> impl Strategy<Value = Doomed> {
    prop_oneof![
        (0usize..4, 0i64..160, 1i64..20)
            .prop_map(|(kind, start, overshoot)| Doomed::EffectPastEnd { kind, start, overshoot }),
        (0usize..4).prop_map(|kind| Doomed::EffectNotFinite { kind }),
        (0usize..8, 0i64..40).prop_map(|(index, beyond)| Doomed::SplitOutside { index, beyond }),
        (0usize..3).prop_map(|mode| Doomed::ReorderBad { mode }),
        Just(Doomed::DeleteUnknown),
        (0usize..8).prop_map(|index| Doomed::InsertExisting { index }),
        (0usize..8).prop_map(|index| Doomed::TrimEmpty { index }),
        Just(Doomed::RemoveUnknownCaption),
    ]
}

fn attempt_strategy() -> impl Strategy<Value = Attempt> {
    prop_oneof![
        op_strategy().prop_map(Attempt::Edit),
        doomed_strategy().prop_map(Attempt::Doomed),
    ]
}

fn pick(tl: &Timeline, index: usize) -> Option<SegmentId> {
    (!tl.is_empty()).then(|| tl.segments()[index % tl.len()].id())
}

fn apply_doomed(tl: &mut Timeline, doomed: &Doomed) -> Result<()> {
    match *doomed {
        Doomed::EffectPastEnd {
            kind,
            start,
            overshoot,
        } => {
            let range = TimeRange::new(quarters(start), tl.total_duration() + quarters(overshoot))?;
            tl.set_effect(EffectKind::ALL[kind], range, 0.0).map(drop)
        }
        Doomed::EffectNotFinite { kind } => {
            let range = TimeRange::from_zero(quarters(1))?;
            tl.set_effect(EffectKind::ALL[kind], range, f64::NAN).map(drop)
        }
        Doomed::SplitOutside { index, beyond } => match pick(tl, index) {
            Some(id) => {
                let end = tl.segment_range(id)?.end();
                tl.split_segment_at(id, end + quarters(beyond)).map(drop)
            }
            None => tl.split_segment_at(SegmentId::new(), quarters(1)).map(drop),
        },
        Doomed::ReorderBad { mode } => {
            let mut ids: Vec<_> = tl.segments().iter().map(Segment::id).collect();
            let first = ids.first().copied();
            match (mode, first) {
                (_, None) => ids.push(SegmentId::new()),
                (0, _) => {
                    ids.pop();
                }
                (1, Some(first)) if ids.len() == 1 => ids.push(first),
                (1, Some(first)) => {
                    let last = ids.len() - 1;
                    ids[last] = first;
                }
                _ => {
                    let last = ids.len() - 1;
                    ids[last] = SegmentId::new();
                }
            }
            tl.reorder(&ids)
        }
        Doomed::DeleteUnknown => tl.delete_segment(SegmentId::new()).map(drop),
        Doomed::InsertExisting { index } => match pick(tl, index) {
            Some(id) => {
                let existing = tl.segment(id).cloned().expect("picked from the timeline");
                tl.insert_segment(index % (tl.len() + 1), existing).map(drop)
            }
            None => {
                let fresh = Segment::image(SourceRef::new("still.png"), quarters(4))?;
                tl.insert_segment(1, fresh).map(drop)
            }
        },
        Doomed::TrimEmpty { index } => {
            let id = pick(tl, index).unwrap_or_default();
            tl.trim_segment(id, TimeRange::EMPTY)
        }
        Doomed::RemoveUnknownCaption => tl.remove_caption(CaptionId::new()).map(drop),
    }
}

fn apply(tl: &mut Timeline, op: &Op) -> Result<()> {
    match *op {
        Op::Insert { index, quarters: q } => {
            let segment = Segment::video(
                SourceRef::new("clip.mov"),
                TimeRange::from_zero(quarters(q)).unwrap(),
                Speed::NORMAL,
            )
            .unwrap();
            tl.insert_segment(index % (tl.len() + 1), segment).map(drop)
        }
        Op::Delete { index } => match pick(tl, index) {
            Some(id) => tl.delete_segment(id).map(drop),
            None => Ok(()),
        },
        Op::Split { index, at } => match pick(tl, index) {
            Some(id) => tl.split_segment_at(id, quarters(at)).map(drop),
            None => Ok(()),
        },
        Op::Speed { index, num, den } => match pick(tl, index) {
            Some(id) => tl.set_segment_speed(id, Speed::new(num, den).unwrap()),
            None => Ok(()),
        },
        Op::Reverse { index } => match pick(tl, index) {
            Some(id) => tl.reverse_segment(id),
            None => Ok(()),
        },
        Op::Reorder { rotate } => {
            let mut ids: Vec<_> = tl.segments().iter().map(Segment::id).collect();
            if !ids.is_empty() {
                let by = rotate % ids.len();
                ids.rotate_left(by);
            }
            tl.reorder(&ids)
        }
        Op::Effect {
            kind,
            start,
            len,
            value,
        } => {
            let range = TimeRange::new(quarters(start), quarters(len)).unwrap();
            tl.set_effect(EffectKind::ALL[kind], range, value).map(drop)
        }
        Op::Caption { start, len } => {
            let range = TimeRange::new(quarters(start), quarters(len)).unwrap();
            tl.insert_caption("line", range).map(drop)
        }
    }
}

fn assert_disjoint_sorted(ranges: &[TimeRange], bounds: TimeRange) {
    for range in ranges {
        assert!(!range.is_empty(), "empty range {range}");
        assert!(bounds.contains_range(*range), "{range} outside {bounds}");
    }
    for pair in ranges.windows(2) {
        assert!(
            pair[0].end() <= pair[1].start(),
            "{} overlaps {}",
            pair[0],
            pair[1]
        );
    }
}

fn check_invariants(tl: &Timeline) {
    let mut cursor = RationalTime::ZERO;
    for (segment, range) in tl.layout() {
        assert_eq!(range.start(), cursor, "gap before segment {}", segment.id());
        assert!(segment.duration().is_positive());
        cursor = range.end();
    }
    assert_eq!(cursor, tl.total_duration());

    let bounds = tl.bounds();
    for kind in EffectKind::ALL {
        let ranges: Vec<_> = tl.effects().intervals(kind).iter().map(|iv| iv.range()).collect();
        assert_disjoint_sorted(&ranges, bounds);
    }
    let captions: Vec<_> = tl.captions().iter().map(|c| c.range()).collect();
    assert_disjoint_sorted(&captions, bounds);
}

proptest! {
    #[test]
    fn edits_preserve_invariants(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut tl = Timeline::new();
        for op in &ops {
            // Rejected edits are expected; only the invariants matter here.
            let _ = apply(&mut tl, op);
            check_invariants(&tl);
        }
    }

    #[test]
    fn rejected_edits_leave_state_untouched(
        setup in prop::collection::vec(op_strategy(), 1..20),
        attempt in attempt_strategy(),
    ) {
        let mut tl = Timeline::new();
        for op in &setup {
            let _ = apply(&mut tl, op);
        }
        let plan = tl.build_composition_plan();
        let revision = tl.revision();
        let snapshot = tl.snapshot();

        let outcome = match &attempt {
            Attempt::Edit(op) => apply(&mut tl, op),
            Attempt::Doomed(doomed) => {
                let outcome = apply_doomed(&mut tl, doomed);
                prop_assert!(outcome.is_err(), "{:?} was accepted", doomed);
                outcome
            }
        };
        if outcome.is_err() {
            prop_assert_eq!(tl.build_composition_plan(), plan);
            prop_assert_eq!(tl.revision(), revision);
            prop_assert_eq!(tl.snapshot(), snapshot);
        } else {
            check_invariants(&tl);
        }
    }

    #[test]
    fn split_keeps_total_duration(
        setup in prop::collection::vec(op_strategy(), 1..20),
        index in 0usize..8,
        at in 0i64..160,
    ) {
        let mut tl = Timeline::new();
        for op in &setup {
            let _ = apply(&mut tl, op);
        }
        prop_assume!(!tl.is_empty());
        let id = tl.segments()[index % tl.len()].id();
        let total = tl.total_duration();
        let captions = tl.captions().clone();
        if tl.split_segment_at(id, quarters(at)).is_ok() {
            prop_assert_eq!(tl.total_duration(), total);
            prop_assert_eq!(tl.captions(), &captions);
        }
    }
}
