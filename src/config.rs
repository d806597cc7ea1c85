//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`SDFVIEW_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use sdfview_core::Mode;
use sdfview_render::{Clim, Colormap};
use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    /// Where volumes and segmentations come from
    #[serde(default)]
    pub data: DataConfig,
    /// Initial view parameters
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub rendering: RenderingConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`SDFVIEW_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // SDFVIEW_VIEW__SURFACE=0.1 -> view.surface = 0.1
        figment = figment.merge(Env::prefixed("SDFVIEW_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no view can start from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::invalid(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        if let Some([lo, hi]) = self.view.clim {
            if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
                return Err(ConfigError::invalid(format!("clim [{}, {}] is not an increasing range", lo, hi)));
            }
        }
        Ok(())
    }
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Start in fullscreen mode
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "sdfview".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
        }
    }
}

/// Data source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset directory (`volume.ron`, `segment.ron` and raw grids);
    /// the built-in synthetic dataset is used when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Initial view parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub mode: Mode,
    /// Layer id to select first; the first layer of the dataset when unset
    #[serde(default)]
    pub layer: Option<String>,
    pub surface: f32,
    pub inverse: bool,
    pub colormap: Colormap,
    /// Fixed intensity range `[lo, hi]`; each volume's own range when unset
    #[serde(default)]
    pub clim: Option<[f32; 2]>,
}

impl ViewConfig {
    pub fn clim(&self) -> Option<Clim> {
        self.clim.map(|[lo, hi]| Clim::new(lo, hi))
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Layer,
            layer: None,
            surface: 0.05,
            inverse: false,
            colormap: Colormap::Viridis,
            clim: None,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    /// Background color [r, g, b, a], shown where the clip is letterboxed
    pub background_color: [f32; 4],
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            background_color: [0.02, 0.02, 0.04, 1.0],
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn invalid(message: String) -> Self {
        ConfigError { message }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.view.mode, Mode::Layer);
        assert!(config.data.dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("title"));
        assert!(toml.contains("surface"));
        assert!(toml.contains("colormap = \"viridis\""));
    }

    #[test]
    fn test_inverted_clim_rejected() {
        let mut config = AppConfig::default();
        config.view.clim = Some([1.0, 0.0]);
        assert!(config.validate().is_err());
        config.view.clim = Some([0.0, 1.0]);
        assert_eq!(config.view.clim(), Some(Clim::new(0.0, 1.0)));
    }
}
