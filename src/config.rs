use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    pub upload: UploadConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_index")]
    pub index: u32,
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
    /// Consecutive reads issued per capture; only the last one is kept.
    #[serde(default = "default_drain_count")]
    pub drain_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// File written by the climate logger: temperature, CO2 ppm, humidity,
    /// one per line.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_font_path")]
    pub font_path: String,
    #[serde(default = "default_font_px")]
    pub font_px: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// "latest" overwrites a single file, "archive" keeps one file per tick.
    #[serde(default = "default_output_mode")]
    pub output: String,
    #[serde(default = "default_image_path")]
    pub image_path: String,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub url: String,
    pub password: String,
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_capture_interval")]
    pub capture_interval_secs: u64,
    #[serde(default = "default_upload_interval")]
    pub upload_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_error_log")]
    pub error_log: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            width: default_frame_width(),
            height: default_frame_height(),
            drain_count: default_drain_count(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            font_px: default_font_px(),
            jpeg_quality: default_jpeg_quality(),
            output: default_output_mode(),
            image_path: default_image_path(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            capture_interval_secs: default_capture_interval(),
            upload_interval_secs: default_upload_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            error_log: default_error_log(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_frame_width() -> u32 {
    1920
}
fn default_frame_height() -> u32 {
    1080
}
fn default_drain_count() -> u32 {
    6
}
fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".into()
}
fn default_font_px() -> f32 {
    32.0
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_output_mode() -> String {
    "latest".into()
}
fn default_image_path() -> String {
    "camera.jpg".into()
}
fn default_archive_dir() -> String {
    "frames".into()
}
fn default_camera_id() -> String {
    "0".into()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    30
}
fn default_capture_interval() -> u64 {
    5
}
fn default_upload_interval() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}
fn default_error_log() -> String {
    "camera-errors.log".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [telemetry]
            path = "/var/lib/climate/latest.txt"

            [upload]
            url = "http://example.org/upload.php"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.drain_count, 6);
        assert_eq!(config.overlay.output, "latest");
        assert_eq!(config.upload.camera_id, "0");
        assert_eq!(config.schedule.capture_interval_secs, 5);
        assert_eq!(config.schedule.upload_interval_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_upload_section_is_an_error() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [telemetry]
            path = "/var/lib/climate/latest.txt"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [camera]
            index = 2
            drain_count = 3

            [telemetry]
            path = "telemetry.txt"

            [overlay]
            output = "archive"
            archive_dir = "/srv/cam/history"

            [upload]
            url = "http://example.org/upload.php"
            password = "hunter2"
            camera_id = "lounge"

            [schedule]
            capture_interval_secs = 2
            upload_interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.drain_count, 3);
        assert_eq!(config.overlay.output, "archive");
        assert_eq!(config.upload.camera_id, "lounge");
        assert_eq!(config.schedule.upload_interval_secs, 10);
    }
}
