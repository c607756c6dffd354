use crate::camera::{Flip, FrameFormat, Orientation, PreviewFormat, Rotation};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UvcConfig {
    pub camera: CameraConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Desired preview resolution (width, height)
    #[serde(default = "default_preview_resolution")]
    pub preview_resolution: (u32, u32),

    /// Frame format requested from the device
    #[serde(default = "default_frame_format")]
    pub format: FrameFormat,

    /// Frame rate scale passed to the device with the preview size
    #[serde(default = "default_frame_rate_scale")]
    pub frame_rate_scale: f32,

    /// Preview rotation applied after open
    #[serde(default = "default_rotation")]
    pub rotation: Rotation,

    /// Preview mirroring applied after open
    #[serde(default = "default_flip")]
    pub flip: Flip,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Tear the session down when the live device reports a disconnect
    #[serde(default = "default_teardown_on_disconnect")]
    pub teardown_on_disconnect: bool,

    /// Start streaming right after open when a surface is already available
    #[serde(default = "default_auto_start_on_open")]
    pub auto_start_on_open: bool,

    /// Device picked from the candidate list when nothing was selected yet
    #[serde(default = "default_device_index")]
    pub device_index: usize,

    /// Session notice bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CameraConfig {
    /// Preview format requested before negotiation
    pub fn preview_format(&self) -> PreviewFormat {
        PreviewFormat {
            resolution: self.preview_resolution.into(),
            format: self.format,
            frame_rate_scale: self.frame_rate_scale,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation {
            rotation: self.rotation,
            flip: self.flip,
        }
    }
}

impl UvcConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("uvc-session.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "camera.preview_resolution",
                vec![default_preview_resolution().0, default_preview_resolution().1],
            )?
            .set_default("camera.format", "Mjpeg")?
            .set_default("camera.frame_rate_scale", default_frame_rate_scale() as f64)?
            .set_default("camera.rotation", "Rotate90")?
            .set_default("camera.flip", "Horizontal")?
            .set_default(
                "session.teardown_on_disconnect",
                default_teardown_on_disconnect(),
            )?
            .set_default("session.auto_start_on_open", default_auto_start_on_open())?
            .set_default("session.device_index", default_device_index() as i64)?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // e.g. UVC_SESSION__TEARDOWN_ON_DISCONNECT=true
            .add_source(
                Environment::with_prefix("UVC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: UvcConfig = settings.try_deserialize()?;
        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.camera.preview_resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::Message(
                "Preview resolution must be greater than 0".to_string(),
            ));
        }

        if !self.camera.frame_rate_scale.is_finite() || self.camera.frame_rate_scale <= 0.0 {
            return Err(ConfigError::Message(
                "Frame rate scale must be a positive number".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for UvcConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                preview_resolution: default_preview_resolution(),
                format: default_frame_format(),
                frame_rate_scale: default_frame_rate_scale(),
                rotation: default_rotation(),
                flip: default_flip(),
            },
            session: SessionConfig {
                teardown_on_disconnect: default_teardown_on_disconnect(),
                auto_start_on_open: default_auto_start_on_open(),
                device_index: default_device_index(),
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_preview_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_frame_format() -> FrameFormat {
    FrameFormat::Mjpeg
}
fn default_frame_rate_scale() -> f32 {
    1.0
}
fn default_rotation() -> Rotation {
    Rotation::Rotate90
}
fn default_flip() -> Flip {
    Flip::Horizontal
}

fn default_teardown_on_disconnect() -> bool {
    false
}
fn default_auto_start_on_open() -> bool {
    true
}
fn default_device_index() -> usize {
    0
}
fn default_event_bus_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Resolution;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = UvcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.camera.preview_format().resolution,
            Resolution::new(1280, 720)
        );
        assert_eq!(config.camera.orientation().rotation, Rotation::Rotate90);
        assert_eq!(config.camera.orientation().flip, Flip::Horizontal);
        assert!(!config.session.teardown_on_disconnect);
    }

    #[test]
    fn test_config_validation() {
        let mut config = UvcConfig::default();
        config.camera.preview_resolution = (0, 720);
        assert!(config.validate().is_err());

        config.camera.preview_resolution = (640, 480);
        config.camera.frame_rate_scale = -1.0;
        assert!(config.validate().is_err());

        config.camera.frame_rate_scale = 0.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UvcConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, UvcConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[camera]
preview_resolution = [640, 480]
format = "Yuyv"
rotation = "Rotate0"
flip = "None"

[session]
teardown_on_disconnect = true
device_index = 1
"#
        )
        .unwrap();

        let config = UvcConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.preview_resolution, (640, 480));
        assert_eq!(config.camera.format, FrameFormat::Yuyv);
        assert_eq!(config.camera.rotation, Rotation::Rotate0);
        assert_eq!(config.camera.flip, Flip::None);
        assert_eq!(config.camera.frame_rate_scale, 1.0);
        assert!(config.session.teardown_on_disconnect);
        assert!(config.session.auto_start_on_open);
        assert_eq!(config.session.device_index, 1);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[camera]\npreview_resolution = [0, 0]").unwrap();

        assert!(UvcConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_from_default_path() {
        // No uvc-session.toml sits next to the crate manifest
        let config = UvcConfig::load().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera, UvcConfig::default().camera);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = UvcConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[session]"));
        let parsed: UvcConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, UvcConfig::default());
    }
}
