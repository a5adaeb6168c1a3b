//! Integration tests for project files.

use montage_core::{ErrorKind, RationalTime, Speed, TimeRange};
use montage_timeline::{EffectKind, EngineConfig, ProjectFile, Segment, SourceRef, Timeline};

fn secs(n: i64) -> RationalTime {
    RationalTime::from_seconds(n)
}

fn range(start: i64, duration: i64) -> TimeRange {
    TimeRange::new(secs(start), secs(duration)).unwrap()
}

fn edited_timeline() -> Timeline {
    let mut tl = Timeline::new();
    let a = tl
        .append_segment(
            Segment::video(SourceRef::new("a.mov"), range(2, 9), Speed::NORMAL).unwrap(),
        )
        .unwrap();
    tl.append_segment(Segment::image(SourceRef::new("title.png"), secs(3)).unwrap())
        .unwrap();
    tl.set_segment_speed(a, Speed::new(3, 2).unwrap()).unwrap();
    tl.reverse_segment(a).unwrap();
    tl.set_effect(EffectKind::Saturation, range(1, 4), -0.25)
        .unwrap();
    tl.set_effect(EffectKind::Blur, range(6, 2), 12.5).unwrap();
    tl.insert_caption("Welcome", range(0, 2)).unwrap();
    tl.insert_caption("Thanks", range(7, 2)).unwrap();
    tl
}

#[test]
fn roundtrip_reproduces_identical_plan() {
    let tl = edited_timeline();
    let bytes = ProjectFile::new(&tl).to_json().unwrap();

    let restored = ProjectFile::from_json(&bytes)
        .unwrap()
        .into_timeline(EngineConfig::default())
        .unwrap();

    assert_eq!(
        tl.build_composition_plan().to_json().unwrap(),
        restored.build_composition_plan().to_json().unwrap()
    );
    assert_eq!(restored.total_duration(), secs(9));
}

#[test]
fn roundtrip_through_disk() {
    let tl = edited_timeline();
    let path = std::env::temp_dir().join(format!("montage-{}.json", uuid::Uuid::new_v4()));

    ProjectFile::new(&tl).save_to_file(&path).unwrap();
    let restored = ProjectFile::load_from_file(&path)
        .unwrap()
        .into_timeline(EngineConfig::default())
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(tl.build_composition_plan(), restored.build_composition_plan());
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join(format!("montage-missing-{}.json", uuid::Uuid::new_v4()));
    let err = ProjectFile::load_from_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn stricter_config_rejects_loaded_effects() {
    let tl = edited_timeline();
    let bytes = ProjectFile::new(&tl).to_json().unwrap();

    let mut config = EngineConfig::default();
    config.effect_domains.blur.max = 10.0;

    let err = ProjectFile::from_json(&bytes)
        .unwrap()
        .into_timeline(config)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}
