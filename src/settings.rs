//! Simulation tuning
//!
//! Persisted as JSON next to the spell book. Every field has a default from
//! [`crate::consts`], so a settings file only needs the values it overrides.

use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Simulation tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    // === Lifetime and speed ===
    /// Particles die once their lifetime reaches this (seconds)
    pub max_lifetime: f64,
    /// Minimum speed for a target hit to deal damage (units/s)
    pub min_damage_speed: f64,
    /// Below this speed a particle is a blocker (units/s)
    pub stationary_speed: f64,
    /// Blocker collision radius as a multiple of width
    pub blocker_scale: f64,
    /// Lower bound on dt when deriving speed
    pub speed_epsilon: f64,

    // === World ===
    pub arena_width: f64,
    pub arena_height: f64,
    /// Distance outside the arena a particle survives
    pub bounds_margin: f64,

    // === Particle shape ===
    /// Width used when the width formula fails
    pub default_width: f64,
    pub min_width: f64,
    pub max_width: f64,

    // === Emission ===
    /// Emit-delay fallback is `i * emit_stagger`
    pub emit_stagger: f64,
    /// Live particle cap; emissions past it are refused and refunded
    pub max_live_particles: usize,

    // === Cosmetic ===
    /// Trail points recorded per particle for the renderer
    pub trail_length: usize,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            max_lifetime: MAX_LIFETIME,
            min_damage_speed: MIN_DAMAGE_SPEED,
            stationary_speed: STATIONARY_SPEED,
            blocker_scale: BLOCKER_SCALE,
            speed_epsilon: SPEED_EPSILON,

            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            bounds_margin: BOUNDS_MARGIN,

            default_width: DEFAULT_WIDTH,
            min_width: MIN_WIDTH,
            max_width: MAX_WIDTH,

            emit_stagger: EMIT_STAGGER,
            max_live_particles: MAX_LIVE_PARTICLES,

            trail_length: TRAIL_LENGTH,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl SimSettings {
    /// Parse and validate settings JSON
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let settings = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Reject values the simulator cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("max_lifetime", self.max_lifetime),
            ("blocker_scale", self.blocker_scale),
            ("speed_epsilon", self.speed_epsilon),
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("min_width", self.min_width),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, format!("must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("min_damage_speed", self.min_damage_speed),
            ("stationary_speed", self.stationary_speed),
            ("bounds_margin", self.bounds_margin),
            ("emit_stagger", self.emit_stagger),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(field, format!("must be non-negative, got {value}")));
            }
        }
        if !(self.max_width.is_finite() && self.max_width >= self.min_width) {
            return Err(invalid("max_width", "must be at least min_width"));
        }
        if !(self.min_width..=self.max_width).contains(&self.default_width) {
            return Err(invalid("default_width", "must lie within [min_width, max_width]"));
        }
        Ok(())
    }

    /// Whether a position is inside the arena plus margin
    pub fn in_bounds(&self, pos: DVec2) -> bool {
        let m = self.bounds_margin;
        pos.x >= -m && pos.x <= self.arena_width + m && pos.y >= -m && pos.y <= self.arena_height + m
    }

    /// Clamp a formula width into the allowed range
    pub fn clamp_width(&self, width: f64) -> f64 {
        width.clamp(self.min_width, self.max_width)
    }
}
