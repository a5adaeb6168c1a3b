//! Project files: a versioned JSON envelope around the timeline's owned
//! collections.
//!
//! Total duration and composition ranges are not stored; they are derived
//! again on load. Older schemas are lifted one step at a time.

use montage_core::{MontageError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::captions::CaptionTrack;
use crate::config::EngineConfig;
use crate::effects::EffectTrack;
use crate::id::SegmentId;
use crate::segment::Segment;
use crate::timeline::Timeline;

/// Schema written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// The persisted state of a [`Timeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub segments: Vec<Segment>,
    pub effects: EffectTrack,
    pub captions: CaptionTrack,
    /// Ids of deleted or split segments, sorted. Missing in files written
    /// before it was recorded.
    #[serde(default)]
    pub retired: Vec<SegmentId>,
}

/// On-disk envelope around a [`TimelineSnapshot`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    /// Crate version of the writer, informational only.
    pub app_version: String,
    pub timeline: TimelineSnapshot,
}

impl ProjectFile {
    /// Capture a timeline.
    pub fn new(timeline: &Timeline) -> Self {
        Self {
            version: CURRENT_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            timeline: timeline.snapshot(),
        }
    }

    /// Rebuild the timeline, re-validating every invariant.
    pub fn into_timeline(self, config: EngineConfig) -> Result<Timeline> {
        Timeline::from_snapshot(self.timeline, config)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| serialization("encode project", e))
    }

    /// Parse a project written by this or any older schema version.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let mut doc: Value =
            serde_json::from_slice(data).map_err(|e| serialization("read project JSON", e))?;

        let found = schema_version(&doc)?;
        if found > CURRENT_VERSION {
            return Err(MontageError::Serialization(format!(
                "project schema {found} is newer than {CURRENT_VERSION}; upgrade Montage to open it"
            )));
        }
        for (from, step) in MIGRATIONS.iter().enumerate().skip(found as usize) {
            doc = step(doc);
            debug!(from, to = from + 1, "Migrated project schema");
        }

        serde_json::from_value(doc).map_err(|e| serialization("decode project", e))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "Saved project");
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = Self::from_json(&std::fs::read(path)?)?;
        info!(
            path = %path.display(),
            segments = file.timeline.segments.len(),
            "Loaded project"
        );
        Ok(file)
    }
}

/// `MIGRATIONS[n]` lifts a schema `n` document to schema `n + 1`.
const MIGRATIONS: [fn(Value) -> Value; CURRENT_VERSION as usize] = [wrap_bare_snapshot];

/// Schema 0 stored the snapshot itself with no envelope.
fn wrap_bare_snapshot(snapshot: Value) -> Value {
    json!({
        "version": 1,
        "app_version": "0.1.0",
        "timeline": snapshot,
    })
}

/// A document without a `version` field predates versioning.
fn schema_version(doc: &Value) -> Result<u32> {
    match doc.get("version") {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| MontageError::Serialization(format!("bad schema version {v}"))),
    }
}

fn serialization(action: &str, err: serde_json::Error) -> MontageError {
    MontageError::Serialization(format!("failed to {action}: {err}"))
}
