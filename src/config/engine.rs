// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Default maximum number of concurrent voices.
pub const DEFAULT_MAX_VOICES: usize = 64;

/// How a trigger velocity becomes a voice gain.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GainCurve {
    /// `velocity / 127`
    #[default]
    Linear,
    /// `(velocity / 127)^2`
    Squared,
}

impl GainCurve {
    /// Gain for a velocity in 1..=127.
    #[inline]
    pub fn gain(&self, velocity: u8) -> f32 {
        let normalized = velocity as f32 / 127.0;
        match self {
            GainCurve::Linear => normalized,
            GainCurve::Squared => normalized * normalized,
        }
    }
}

impl fmt::Display for GainCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GainCurve::Linear => write!(f, "linear"),
            GainCurve::Squared => write!(f, "squared"),
        }
    }
}

impl FromStr for GainCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(GainCurve::Linear),
            "squared" => Ok(GainCurve::Squared),
            other => Err(format!("unknown gain curve {other}, expected linear or squared")),
        }
    }
}

/// Options for the voice engine. Fixed for the lifetime of an engine.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hard cap on simultaneous voices. The oldest voice is dropped when exceeded.
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,

    #[serde(default)]
    pub gain_curve: GainCurve,
}

fn default_max_voices() -> usize {
    DEFAULT_MAX_VOICES
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_voices: DEFAULT_MAX_VOICES,
            gain_curve: GainCurve::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(max_voices: usize, gain_curve: GainCurve) -> Self {
        Self {
            max_voices,
            gain_curve,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_gain_curves() {
        assert_eq!(GainCurve::Linear.gain(127), 1.0);
        assert!((GainCurve::Linear.gain(64) - 64.0 / 127.0).abs() < 1e-6);
        assert_eq!(GainCurve::Squared.gain(127), 1.0);
        let half = 64.0f32 / 127.0;
        assert!((GainCurve::Squared.gain(64) - half * half).abs() < 1e-6);
    }

    #[test]
    fn test_gain_curve_from_str() {
        assert_eq!("Linear".parse::<GainCurve>(), Ok(GainCurve::Linear));
        assert_eq!("squared".parse::<GainCurve>(), Ok(GainCurve::Squared));
        assert!("cubic".parse::<GainCurve>().is_err());
    }

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: EngineConfig = Config::builder()
            .add_source(File::from_str("{}", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_voices, 64);
        assert_eq!(config.gain_curve, GainCurve::Linear);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
            max_voices: 12
            gain_curve: squared
        "#;
        let config: EngineConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.max_voices, 12);
        assert_eq!(config.gain_curve, GainCurve::Squared);
    }

    #[test]
    fn test_validate_rejects_zero_voices() {
        assert!(matches!(
            EngineConfig::new(0, GainCurve::Linear).validate(),
            Err(ConfigError::NoVoices)
        ));
        assert!(EngineConfig::default().validate().is_ok());
    }
}
