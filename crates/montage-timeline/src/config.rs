//! Engine configuration.
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names.

use montage_core::{MontageError, RationalTime, Result};
use serde::{Deserialize, Serialize};

use crate::effects::EffectKind;

/// Built-in defaults.
pub mod defaults {
    /// Shortest caption a user may insert, in seconds.
    pub const MIN_CAPTION_SECONDS: i64 = 1;

    /// Largest blur radius accepted.
    pub const MAX_BLUR_RADIUS: f64 = 100.0;
}

/// Inclusive value domain for one effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectDomain {
    pub min: f64,
    pub max: f64,
}

impl EffectDomain {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check whether `value` is finite and inside the domain.
    pub fn accepts(self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Value domains for every effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDomains {
    pub brightness: EffectDomain,
    pub saturation: EffectDomain,
    pub contrast: EffectDomain,
    pub blur: EffectDomain,
}

impl EffectDomains {
    /// Domain for the given kind.
    pub fn for_kind(&self, kind: EffectKind) -> EffectDomain {
        match kind {
            EffectKind::Brightness => self.brightness,
            EffectKind::Saturation => self.saturation,
            EffectKind::Contrast => self.contrast,
            EffectKind::Blur => self.blur,
        }
    }
}

impl Default for EffectDomains {
    fn default() -> Self {
        Self {
            brightness: EffectDomain::new(-1.0, 1.0),
            saturation: EffectDomain::new(-1.0, 1.0),
            contrast: EffectDomain::new(-1.0, 1.0),
            blur: EffectDomain::new(0.0, defaults::MAX_BLUR_RADIUS),
        }
    }
}

/// Tunable policy for the timeline engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Captions shorter than this are rejected on insert and update.
    pub min_caption_duration: RationalTime,
    /// Accepted value range per effect kind.
    pub effect_domains: EffectDomains,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_caption_duration: RationalTime::from_seconds(defaults::MIN_CAPTION_SECONDS),
            effect_domains: EffectDomains::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| MontageError::Serialization(format!("Invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    fn validate(&self) -> Result<()> {
        if self.min_caption_duration.is_negative() {
            return Err(MontageError::InvalidValue(format!(
                "min_caption_duration {} is negative",
                self.min_caption_duration
            )));
        }
        for kind in EffectKind::ALL {
            let domain = self.effect_domains.for_kind(kind);
            if !(domain.min.is_finite() && domain.max.is_finite() && domain.min <= domain.max) {
                return Err(MontageError::InvalidValue(format!(
                    "{kind} domain [{}, {}] is not a finite interval",
                    domain.min, domain.max
                )));
            }
            if !domain.accepts(kind.neutral()) {
                return Err(MontageError::InvalidValue(format!(
                    "{kind} domain [{}, {}] excludes the neutral value {}",
                    domain.min,
                    domain.max,
                    kind.neutral()
                )));
            }
        }
        Ok(())
    }
}
