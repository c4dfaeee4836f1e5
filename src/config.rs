use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::display::snapshot::DisplayMode;
use crate::errors::{QrLensError, QrLensResult};
use crate::perception::replay::DirectorySource;
use crate::perception::screenshot::ScreenSource;
use crate::perception::session::CaptureSession;
use crate::perception::traits::FrameSource;
use crate::perception::types::Rotation;

const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "QRLENS_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// "directory" or "screen".
    #[serde(default = "default_source")]
    pub source: String,
    /// Image directory for the "directory" source.
    #[serde(default = "default_capture_path")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub loop_frames: bool,
    /// Clockwise turn that makes source images upright (0, 90, 180, 270).
    #[serde(default = "default_rotation")]
    pub rotation_degrees: u32,
    /// Monitor index for the "screen" source; primary when absent.
    #[serde(default)]
    pub monitor: Option<usize>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            path: default_capture_path(),
            interval_ms: default_interval_ms(),
            loop_frames: false,
            rotation_degrees: default_rotation(),
            monitor: None,
        }
    }
}

fn default_source() -> String {
    "directory".into()
}

fn default_capture_path() -> Option<PathBuf> {
    Some(PathBuf::from("frames"))
}

fn default_interval_ms() -> u64 {
    200
}

fn default_rotation() -> u32 {
    90
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_width")]
    pub width: f64,
    #[serde(default = "default_preview_height")]
    pub height: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: default_preview_width(),
            height: default_preview_height(),
        }
    }
}

fn default_preview_width() -> f64 {
    1080.0
}

fn default_preview_height() -> f64 {
    1920.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    /// `#RRGGBB` or `#RRGGBBAA`.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            stroke_width: default_stroke_width(),
            color: default_color(),
        }
    }
}

fn default_stroke_width() -> u32 {
    10
}

fn default_color() -> String {
    "#6200EE".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Longest side fed to the decoder; 0 disables downsampling.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            max_entries: default_max_entries(),
            max_dimension: default_max_dimension(),
        }
    }
}

fn default_max_entries() -> usize {
    50
}

fn default_max_dimension() -> u32 {
    1280
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub overlay_dir: Option<PathBuf>,
}

fn resolve_config_path() -> QrLensResult<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        let candidate = PathBuf::from(explicit);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config taken from {CONFIG_ENV}");
            return Ok(candidate);
        }
        return Err(QrLensError::Config(format!(
            "{CONFIG_ENV} points to missing file {}",
            candidate.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("qrlens").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(QrLensError::Config(
        "config.toml not found via QRLENS_CONFIG, next to executable, in working directory or user config directory".into(),
    ))
}

pub fn load_config_from(path: &Path) -> QrLensResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        source = %config.capture.source,
        mode = ?config.scanner.display_mode,
        "config loaded"
    );
    Ok(config)
}

pub fn load_config() -> QrLensResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn save_config(config: &AppConfig, path: &Path) -> QrLensResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

/// Default location written by `qrlens init-config`.
pub fn user_config_path() -> QrLensResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("qrlens").join(CONFIG_FILE))
        .ok_or_else(|| QrLensError::Config("no user config directory on this platform".into()))
}

/// Write the default configuration to `path` (or the user config path).
/// Refuses to overwrite an existing file.
pub fn init_config(path: Option<PathBuf>) -> QrLensResult<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => user_config_path()?,
    };
    if path.exists() {
        return Err(QrLensError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    save_config(&AppConfig::default(), &path)?;
    Ok(path)
}

/// Build the configured frame source.
pub fn create_source(capture: &CaptureConfig) -> QrLensResult<Box<dyn FrameSource>> {
    let rotation = Rotation::from_degrees(capture.rotation_degrees).ok_or_else(|| {
        QrLensError::Config(format!(
            "rotation_degrees must be 0, 90, 180 or 270, got {}",
            capture.rotation_degrees
        ))
    })?;
    match capture.source.as_str() {
        "directory" => {
            let path = capture.path.clone().ok_or_else(|| {
                QrLensError::Config("capture.path is required for the directory source".into())
            })?;
            Ok(Box::new(DirectorySource::new(path, rotation, capture.loop_frames)))
        }
        "screen" => Ok(Box::new(ScreenSource::new(capture.monitor))),
        other => Err(QrLensError::Config(format!("unknown capture source '{other}'"))),
    }
}

pub fn create_session(capture: &CaptureConfig) -> QrLensResult<CaptureSession> {
    let source = create_source(capture)?;
    Ok(CaptureSession::new(
        source,
        Duration::from_millis(capture.interval_ms),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.capture.source, "directory");
        assert_eq!(config.capture.rotation_degrees, 90);
        assert_eq!(config.capture.path, Some(PathBuf::from("frames")));
        assert_eq!(config.preview.width, 1080.0);
        assert_eq!(config.overlay.stroke_width, 10);
        assert_eq!(config.overlay.color, "#6200EE");
        assert_eq!(config.scanner.display_mode, DisplayMode::List);
        assert!(config.output.overlay_dir.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [capture]
            source = "screen"
            monitor = 1
            interval_ms = 50

            [scanner]
            display_mode = "latest"
            max_entries = 5

            [output]
            overlay_dir = "out"
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.source, "screen");
        assert_eq!(config.capture.monitor, Some(1));
        assert_eq!(config.scanner.display_mode, DisplayMode::Latest);
        assert_eq!(config.scanner.max_entries, 5);
        assert_eq!(config.scanner.max_dimension, 1280);
        assert_eq!(config.output.overlay_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.capture.path = Some(PathBuf::from("/tmp/frames"));
        config.scanner.display_mode = DisplayMode::Latest;

        save_config(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.capture.path, config.capture.path);
        assert_eq!(loaded.scanner.display_mode, DisplayMode::Latest);
    }

    #[test]
    fn source_factory_validates_settings() {
        let mut capture = CaptureConfig {
            path: None,
            ..Default::default()
        };
        assert!(matches!(create_source(&capture), Err(QrLensError::Config(_))));

        capture.path = Some(PathBuf::from("frames"));
        assert_eq!(create_source(&capture).unwrap().name(), "directory");

        capture.rotation_degrees = 45;
        assert!(create_source(&capture).is_err());

        capture.rotation_degrees = 0;
        capture.source = "screen".into();
        assert_eq!(create_source(&capture).unwrap().name(), "screen");

        capture.source = "camera".into();
        assert!(create_source(&capture).is_err());
    }

    #[test]
    fn default_config_builds_a_session() {
        let session = create_session(&AppConfig::default().capture).unwrap();
        assert!(!session.id().is_empty());
    }

    #[test]
    fn init_config_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let written = init_config(Some(path.clone())).unwrap();
        assert_eq!(written, path);
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.capture.path, Some(PathBuf::from("frames")));
        assert_eq!(loaded.overlay.color, "#6200EE");

        assert!(matches!(
            init_config(Some(path)),
            Err(QrLensError::Config(_))
        ));
    }
}
