use serde::Deserialize;

use crate::error::ConfigError;
use crate::Mm;

/// Most steps `validate` accepts.
pub const MAX_SLOPE_STEPS: u32 = 1000;

/// Tuning knobs for seam sloping. Every field has a default, so a TOML file
/// only needs the ones it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    /// Loops at or below this height are left alone.
    pub first_layer_height: Mm,
    /// Height climbed by one sloped loop.
    pub layer_height: Mm,
    /// Loops must be strictly longer than this to be sloped.
    pub min_loop_length: Mm,
    pub slope_steps: u32,
    /// How close a loop's end must come back to its start.
    pub max_loop_gap: Mm,
    /// A move overshooting a step by no more than this is kept whole
    /// rather than split into a tiny leftover.
    pub min_fragment_length: Mm,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        SlopeConfig {
            first_layer_height: 0.3,
            layer_height: 0.3,
            min_loop_length: 5.0,
            slope_steps: 10,
            max_loop_gap: 0.4,
            min_fragment_length: 0.1,
        }
    }
}

impl SlopeConfig {
    pub fn from_toml_str(s: &str) -> Result<SlopeConfig, ConfigError> {
        let config: SlopeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [("first_layer_height", self.first_layer_height), ("layer_height", self.layer_height)];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::Invalid { field, reason: format!("must be positive, got {}", value) });
            }
        }
        let non_negative = [
            ("min_loop_length", self.min_loop_length),
            ("max_loop_gap", self.max_loop_gap),
            ("min_fragment_length", self.min_fragment_length),
        ];
        for (field, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Invalid { field, reason: format!("must not be negative, got {}", value) });
            }
        }
        if self.slope_steps == 0 || self.slope_steps > MAX_SLOPE_STEPS {
            return Err(ConfigError::Invalid {
                field: "slope_steps",
                reason: format!("must be between 1 and {}, got {}", MAX_SLOPE_STEPS, self.slope_steps),
            });
        }
        Ok(())
    }
}
