//! Integration tests for the timeline subsystem.
//!
//! Walks the editing scenarios end to end through the public API of
//! montage-core and montage-timeline.

use montage_core::{ErrorKind, RationalTime, Speed, TimeRange};
use montage_timeline::{
    AssetCatalog, AssetMetadata, EditIntent, EffectKind, Segment, SegmentId, SourceRef, Timeline,
};

// ── Helpers ────────────────────────────────────────────────────

fn secs(n: i64) -> RationalTime {
    RationalTime::from_seconds(n)
}

fn range(start: i64, duration: i64) -> TimeRange {
    TimeRange::new(secs(start), secs(duration)).unwrap()
}

fn clip(name: &str, seconds: i64) -> Segment {
    Segment::video(SourceRef::new(name), range(0, seconds), Speed::NORMAL).unwrap()
}

fn build(lengths: &[i64]) -> (Timeline, Vec<SegmentId>) {
    let mut tl = Timeline::new();
    let ids = lengths
        .iter()
        .enumerate()
        .map(|(i, &n)| tl.append_segment(clip(&format!("clip-{i}.mov"), n)).unwrap())
        .collect();
    (tl, ids)
}

fn caption_ranges(tl: &Timeline) -> Vec<TimeRange> {
    tl.captions().iter().map(|c| c.range()).collect()
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn split_ten_second_clip_at_four() {
    let (mut tl, ids) = build(&[10]);
    let (left, right) = tl.split_segment_at(ids[0], secs(4)).unwrap();

    assert_eq!(tl.segment(left).unwrap().duration(), secs(4));
    assert_eq!(tl.segment(right).unwrap().duration(), secs(6));
    assert_eq!(tl.total_duration(), secs(10));
}

#[test]
fn overlapping_caption_is_rejected() {
    let (mut tl, _) = build(&[10]);
    tl.insert_caption("hi", range(2, 3)).unwrap();

    let err = tl.insert_caption("again", range(4, 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overlap);
    assert_eq!(caption_ranges(&tl), vec![range(2, 3)]);
}

#[test]
fn later_brightness_overwrites_overlap() {
    let (mut tl, _) = build(&[10]);
    tl.set_effect(EffectKind::Brightness, range(0, 5), 0.2).unwrap();
    tl.set_effect(EffectKind::Brightness, range(3, 4), 0.5).unwrap();

    let bright: Vec<_> = tl
        .effects()
        .intervals(EffectKind::Brightness)
        .iter()
        .map(|iv| (iv.range(), iv.value()))
        .collect();
    assert_eq!(bright, vec![(range(0, 3), 0.2), (range(3, 4), 0.5)]);
    assert_eq!(tl.effects_at(secs(4)).brightness, 0.5);
}

#[test]
fn delete_middle_segment_drops_and_clips_captions() {
    let (mut tl, ids) = build(&[4, 3, 5]);
    tl.insert_caption("inside", range(5, 1)).unwrap();
    tl.insert_caption("straddle", range(6, 3)).unwrap();

    tl.delete_segment(ids[1]).unwrap();

    assert_eq!(tl.total_duration(), secs(9));
    assert_eq!(caption_ranges(&tl), vec![range(4, 2)]);
    assert_eq!(tl.captions().iter().next().unwrap().text(), "straddle");
    assert_eq!(tl.segment_range(ids[2]).unwrap(), range(4, 5));
}

#[test]
fn doubling_speed_pulls_followers_and_anchors_left() {
    let (mut tl, ids) = build(&[10, 5]);
    tl.insert_caption("after", range(11, 3)).unwrap();
    tl.set_effect(EffectKind::Blur, range(12, 2), 5.0).unwrap();

    tl.set_segment_speed(ids[0], Speed::new(2, 1).unwrap()).unwrap();

    assert_eq!(tl.segment(ids[0]).unwrap().duration(), secs(5));
    assert_eq!(tl.segment_range(ids[1]).unwrap(), range(5, 5));
    assert_eq!(caption_ranges(&tl), vec![range(6, 3)]);
    assert_eq!(
        tl.effects().intervals(EffectKind::Blur)[0].range(),
        range(7, 2)
    );
}

// ── Cross-cutting behaviour ────────────────────────────────────

#[test]
fn insert_then_delete_restores_duration() {
    let (mut tl, _) = build(&[4, 6]);
    let before = tl.total_duration();
    let id = tl.insert_segment(1, clip("extra.mov", 7)).unwrap();
    assert_eq!(tl.total_duration(), before + secs(7));
    tl.delete_segment(id).unwrap();
    assert_eq!(tl.total_duration(), before);
}

#[test]
fn reorder_keeps_captions_at_absolute_time() {
    let (mut tl, ids) = build(&[2, 8]);
    tl.insert_caption("over first", range(0, 2)).unwrap();
    tl.reorder(&[ids[1], ids[0]]).unwrap();

    // The caption stays at [0, 2) even though its clip moved to the end.
    assert_eq!(caption_ranges(&tl), vec![range(0, 2)]);
    assert_eq!(tl.segment_range(ids[0]).unwrap(), range(8, 2));
}

#[test]
fn caption_outside_timeline_rejected() {
    let (mut tl, _) = build(&[3]);
    let err = tl.insert_caption("late", range(2, 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn segments_from_catalog() {
    let mut catalog = AssetCatalog::new();
    catalog.insert(SourceRef::new("beach.mov"), AssetMetadata::video(secs(20), 3840, 2160));
    catalog.insert(SourceRef::new("logo.png"), AssetMetadata::still(512, 512));

    let mut tl = Timeline::new();
    tl.append_segment(
        Segment::video_from_asset(&catalog, SourceRef::new("beach.mov"), range(5, 10), Speed::NORMAL)
            .unwrap(),
    )
    .unwrap();
    tl.append_segment(Segment::image_from_asset(&catalog, SourceRef::new("logo.png"), secs(2)).unwrap())
        .unwrap();

    let plan = tl.build_composition_plan();
    assert_eq!(plan.total_duration, secs(12));
    assert_eq!(plan.segment_boundaries(), vec![secs(0), secs(10), secs(12)]);

    let err = Segment::video_from_asset(
        &catalog,
        SourceRef::new("beach.mov"),
        range(15, 10),
        Speed::NORMAL,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTrim);
}

#[test]
fn intents_drive_a_full_edit() {
    let mut tl = Timeline::new();
    EditIntent::Batch(vec![
        EditIntent::InsertSegment {
            index: 0,
            segment: clip("a.mov", 6),
        },
        EditIntent::InsertSegment {
            index: 1,
            segment: clip("b.mov", 4),
        },
        EditIntent::InsertCaption {
            text: "intro".into(),
            range: range(0, 2),
        },
    ])
    .apply(&mut tl)
    .unwrap();

    let first = tl.segments()[0].id();
    EditIntent::SplitSegment {
        id: first,
        at: secs(3),
    }
    .apply(&mut tl)
    .unwrap();
    assert_eq!(tl.len(), 3);

    let plan = tl.take_plan_update().unwrap();
    assert_eq!(plan.segments.len(), 3);
    assert_eq!(plan.caption_at(secs(1)).unwrap().text, "intro");
}
