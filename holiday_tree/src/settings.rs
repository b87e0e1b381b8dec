//! Settings file: one TOML document, every key optional.
//!
//! ```toml
//! [scene]
//! stagger = 0.2
//!
//! [scene.gesture]
//! pinch = 0.04
//!
//! [window]
//! width = 1280
//!
//! [soundtrack]
//! lyrics = "lyric.lrc"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use tree_morph::{ConfigError, MorphConfig};

use crate::camera::{CameraError, CameraSettings};
use crate::soundtrack::SoundtrackSettings;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid scene settings: {0}")]
    Scene(#[from] ConfigError),

    #[error("invalid camera settings: {0}")]
    Camera(#[from] CameraError),

    #[error("window must be at least {min}x{min} pixels (got {width}x{height})")]
    WindowTooSmall { width: usize, height: usize, min: usize },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: usize,
    pub height: usize,
    pub fps: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings {
            title: "Holiday Tree".to_string(),
            width: 1024,
            height: 720,
            fps: 60,
        }
    }
}

impl WindowSettings {
    pub const MIN_SIDE: usize = 160;

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps.max(1) as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    /// Poll period of the simulator and replay sources.
    pub frame_interval_ms: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        VisionSettings { frame_interval_ms: 33 }
    }
}

impl VisionSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub scene: MorphConfig,
    pub window: WindowSettings,
    pub camera: CameraSettings,
    pub soundtrack: SoundtrackSettings,
    pub vision: VisionSettings,
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.scene.validate()?;
        self.camera.validate()?;
        let (width, height) = (self.window.width, self.window.height);
        let min = WindowSettings::MIN_SIDE;
        if width < min || height < min {
            return Err(SettingsError::WindowTooSmall { width, height, min });
        }
        Ok(())
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let mut settings: AppSettings = toml::from_str(text).map_err(|source| {
            SettingsError::Parse { path: path.to_path_buf(), source }
        })?;
        // Relative lyric paths are taken from the settings file's directory.
        if let (Some(lyrics), Some(dir)) = (settings.soundtrack.lyrics.as_mut(), path.parent()) {
            if lyrics.is_relative() {
                let joined = dir.join(&*lyrics);
                *lyrics = joined;
            }
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Load `path`, or the defaults when no file is given.
pub fn load(path: Option<&Path>) -> Result<AppSettings, SettingsError> {
    let Some(path) = path else {
        info!("no settings file, using defaults");
        return Ok(AppSettings::default());
    };
    let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = AppSettings::from_toml(&text, path)?;
    info!(path = %path.display(), "settings loaded");
    Ok(settings)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
