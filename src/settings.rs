//! Growth settings
//!
//! Every tunable of the simulation lives here. Settings can be loaded from a
//! JSON file; anything missing falls back to the defaults in [`crate::consts`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::error::SimError;

/// Errors raised while reading a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// Particle spacing presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DetailPreset {
    Coarse,
    #[default]
    Medium,
    Fine,
}

impl DetailPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailPreset::Coarse => "Coarse",
            DetailPreset::Medium => "Medium",
            DetailPreset::Fine => "Fine",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "coarse" | "low" => Some(DetailPreset::Coarse),
            "medium" | "med" => Some(DetailPreset::Medium),
            "fine" | "high" => Some(DetailPreset::Fine),
            _ => None,
        }
    }

    /// Target spacing between neighbouring particles
    pub fn target_edge_length(&self) -> f64 {
        match self {
            DetailPreset::Coarse => TARGET_EDGE_LENGTH * 2.0,
            DetailPreset::Medium => TARGET_EDGE_LENGTH,
            DetailPreset::Fine => TARGET_EDGE_LENGTH * 0.5,
        }
    }
}

/// Simulation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthSettings {
    // === Field ===
    /// Seed for the noise permutation table
    pub noise_seed: u32,
    /// Iso value on the noise remapped to [0, 1]
    pub level_curve: f64,
    /// Spatial frequency applied to noise coordinates
    pub frequency: f64,

    // === Projection ===
    /// Per-iteration and per-step displacement cap
    pub speed_limit: f64,
    /// Numerical zero
    pub tolerance: f64,
    /// Gradient descent multiplier
    pub descent_rate: f64,
    /// Iteration cap for the root finders
    pub max_projection_iterations: u32,

    // === Growth ===
    /// Spacing the population is grown towards
    pub target_edge_length: f64,
    /// Neighbour radius as a multiple of `target_edge_length`
    pub repulsion_radius_factor: f64,
    /// Force strength right after an insertion
    pub force_strength_reset: f64,
    /// Steps for the force strength to halve
    pub force_half_life: f64,

    // === Driver ===
    /// Seed for tangent-direction draws
    pub rng_seed: u64,
    /// Soft per-step frame budget (milliseconds)
    pub frame_ms: u64,
}

impl Default for GrowthSettings {
    fn default() -> Self {
        Self {
            noise_seed: DEFAULT_NOISE_SEED,
            level_curve: DEFAULT_LEVEL_CURVE,
            frequency: 1.0,

            speed_limit: SPEED_LIMIT,
            tolerance: TOLERANCE,
            descent_rate: DESCENT_RATE,
            max_projection_iterations: MAX_PROJECTION_ITERATIONS,

            target_edge_length: TARGET_EDGE_LENGTH,
            repulsion_radius_factor: REPULSION_RADIUS_FACTOR,
            force_strength_reset: FORCE_STRENGTH_RESET,
            force_half_life: FORCE_HALF_LIFE_STEPS,

            rng_seed: DEFAULT_RNG_SEED,
            frame_ms: TARGET_FRAME_MS,
        }
    }
}

impl GrowthSettings {
    /// Create settings from a detail preset
    pub fn from_preset(preset: DetailPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a detail preset (only the spacing depends on it)
    pub fn apply_preset(&mut self, preset: DetailPreset) {
        self.target_edge_length = preset.target_edge_length();
    }

    /// Neighbour search radius
    #[inline]
    pub fn max_repulsion_radius(&self) -> f64 {
        self.target_edge_length * self.repulsion_radius_factor
    }

    /// Per-step multiplicative decay of the force strength
    #[inline]
    pub fn force_decay(&self) -> f64 {
        0.5_f64.powf(1.0 / self.force_half_life)
    }

    /// Force strength below which the system is considered at rest
    #[inline]
    pub fn quiescence_threshold(&self) -> f64 {
        self.tolerance * self.tolerance
    }

    /// Reject settings that would stall or blow up the simulation
    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [
            ("frequency", self.frequency),
            ("speed_limit", self.speed_limit),
            ("tolerance", self.tolerance),
            ("descent_rate", self.descent_rate),
            ("target_edge_length", self.target_edge_length),
            ("repulsion_radius_factor", self.repulsion_radius_factor),
            ("force_strength_reset", self.force_strength_reset),
            ("force_half_life", self.force_half_life),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidSettings(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if !self.level_curve.is_finite() {
            return Err(SimError::InvalidSettings(format!(
                "level_curve must be finite, got {}",
                self.level_curve
            )));
        }
        if self.max_projection_iterations == 0 {
            return Err(SimError::InvalidSettings(
                "max_projection_iterations must be non-zero".into(),
            ));
        }
        if self.repulsion_radius_factor <= 1.0 {
            return Err(SimError::InvalidSettings(format!(
                "repulsion_radius_factor must exceed 1 so spacing can be measured, got {}",
                self.repulsion_radius_factor
            )));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> String {
        // Plain numeric struct: serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
