//! Montage Timeline - Timeline composition engine
//!
//! Implements the non-destructive editing model:
//! - Segments (video and image clips) laid out contiguously
//! - Interval-scoped effects and non-stacking captions anchored to
//!   composition time
//! - Structural edits (insert, delete, split, reorder, retime) that keep
//!   every track consistent
//! - Immutable composition plans for renderers, and versioned persistence

mod anchor;
pub mod captions;
pub mod config;
pub mod effects;
pub mod id;
pub mod intent;
pub mod plan;
pub mod segment;
pub mod serialization;
pub mod timeline;

pub use captions::{CaptionSegment, CaptionTrack};
pub use config::{EffectDomain, EffectDomains, EngineConfig};
pub use effects::{ActiveEffects, EffectInterval, EffectKind, EffectTrack};
pub use id::{CaptionId, EffectId, SegmentId};
pub use intent::{EditIntent, EditOutcome};
pub use plan::{CaptionCue, CompositionPlan, EffectCue, SegmentDescriptor};
pub use segment::{AssetCatalog, AssetMetadata, AssetResolver, Clip, Segment, SegmentKind, SourceRef};
pub use serialization::{ProjectFile, TimelineSnapshot};
pub use timeline::{SourceTime, Timeline};
