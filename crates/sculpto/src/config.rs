//! Engine configuration.
//!
//! TOML-backed settings for the window, the render backend toggles and the
//! default camera effects. Invalid values are never fatal: `sanitize` warns
//! and falls back to the default for the offending field, so a hand-edited
//! config cannot keep the engine from starting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::Vec4;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written.
    #[error("config IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Settings could not be serialized back to TOML.
    #[error("config serialize error: {0}")]
    Serialize(String),
}

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "sculpto".to_owned(),
        }
    }
}

/// Render backend toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Vertical synchronization.
    pub vsync: bool,
    /// Wireframe rasterization.
    pub wireframe: bool,
    /// Clear color as RGBA in `[0, 1]`.
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            wireframe: false,
            clear_color: [0.1, 0.1, 0.12, 1.0],
        }
    }
}

/// Default post-processing effects for new cameras.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// HDR rendering.
    pub hdr: bool,
    /// Tone-mapping exposure.
    pub exposure: f32,
    /// Bloom (requires HDR).
    pub bloom: bool,
    /// Bloom blur iterations.
    pub bloom_amount: u32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            hdr: false,
            exposure: 1.0,
            bloom: false,
            bloom_amount: 4,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window settings.
    pub window: WindowConfig,
    /// Render backend toggles.
    pub render: RenderConfig,
    /// Default camera effects.
    pub effects: EffectsConfig,
}

impl EngineConfig {
    /// Parse from TOML text, then sanitize.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.sanitize();
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config at '{path}', using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Clear color as a vector.
    #[must_use]
    pub fn clear_color(&self) -> Vec4 {
        Vec4::from(self.render.clear_color)
    }

    /// Replace out-of-range values with defaults, warning for each.
    pub fn sanitize(&mut self) {
        if self.window.width == 0 || self.window.height == 0 {
            log::warn!(
                "invalid window extent {}x{}, using default",
                self.window.width,
                self.window.height
            );
            let default = WindowConfig::default();
            self.window.width = default.width;
            self.window.height = default.height;
        }
        if !self.effects.exposure.is_finite() || self.effects.exposure <= 0.0 {
            log::warn!("invalid exposure {}, using default", self.effects.exposure);
            self.effects.exposure = EffectsConfig::default().exposure;
        }
        if self.effects.bloom && !self.effects.hdr {
            log::warn!("bloom without HDR in config, disabling bloom");
            self.effects.bloom = false;
        }
        if !self
            .render
            .clear_color
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
        {
            log::warn!("clear color out of range, using default");
            self.render.clear_color = RenderConfig::default().clear_color;
        }
    }

    /// Camera effects matching this config.
    #[must_use]
    pub fn camera_effects(&self) -> crate::render::camera::CameraEffects {
        crate::render::camera::CameraEffects {
            hdr: self.effects.hdr,
            exposure: self.effects.exposure,
            bloom: self.effects.bloom,
            bloom_amount: self.effects.bloom_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.window.width, 1280);
        assert!(config.render.vsync);
        assert!(!config.effects.hdr);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config = EngineConfig::from_toml_str(
            "[effects]\nhdr = true\nexposure = 2.0\n",
        )
        .unwrap();
        assert!(config.effects.hdr);
        assert!((config.effects.exposure - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.window.height, 720);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("[window\nwidth ="),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn sanitize_downgrades_instead_of_failing() {
        let mut config = EngineConfig::default();
        config.window.width = 0;
        config.effects.exposure = -1.0;
        config.effects.bloom = true;
        config.render.clear_color = [2.0, 0.0, 0.0, 1.0];

        config.sanitize();

        assert_eq!(config.window.width, 1280);
        assert!((config.effects.exposure - 1.0).abs() < f32::EPSILON);
        assert!(!config.effects.bloom);
        assert!((config.render.clear_color[0] - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = EngineConfig::default();
        config.effects.hdr = true;
        config.effects.bloom = true;
        let text = config.to_toml_string().unwrap();
        let restored = EngineConfig::from_toml_str(&text).unwrap();
        assert!(restored.effects.hdr);
        assert!(restored.effects.bloom);
    }
}
