use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::path::{Path, PathBuf};

use crate::color::co2_color;
use crate::config::OverlayConfig;
use crate::telemetry::TelemetryReading;

/// Base color for every overlay except the CO2 value.
const NEUTRAL: Rgb<u8> = Rgb([200, 200, 200]);
/// Top-left anchor and left edge of the bottom block, in pixels.
const MARGIN: i32 = 16;

/// Consumes a captured frame and a telemetry reading and persists the
/// annotated image, returning the path it was written to. The scheduler
/// only depends on this seam, so tests can swap in a sink that needs no
/// font or disk layout.
pub trait FrameSink {
    fn store(&mut self, frame: RgbImage, reading: &TelemetryReading)
        -> Result<PathBuf, AnnotateError>;
}

/// Where annotated frames go: a single file overwritten on every tick, or
/// one timestamped file per tick.
pub enum OutputMode {
    Latest(PathBuf),
    Archive(PathBuf),
}

pub struct Annotator {
    font: FontArc,
    font_px: f32,
    jpeg_quality: u8,
    output: OutputMode,
}

impl Annotator {
    pub fn new(config: &OverlayConfig, output: OutputMode) -> Result<Self, AnnotateError> {
        let bytes = std::fs::read(&config.font_path)
            .map_err(|e| AnnotateError::FontLoad(config.font_path.clone(), e))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|_| AnnotateError::FontParse(config.font_path.clone()))?;

        if let OutputMode::Archive(dir) = &output {
            std::fs::create_dir_all(dir)
                .map_err(|e| AnnotateError::ArchiveDir(dir.display().to_string(), e))?;
        }

        Ok(Self {
            font,
            font_px: config.font_px,
            jpeg_quality: config.jpeg_quality,
            output,
        })
    }

    /// Draw the fixed overlay layout: date and time top-left, temperature /
    /// CO2 / humidity anchored to the bottom-left. The CO2 value sits at its
    /// own x-offset on the label's line, colored by the warning scale.
    fn render(&self, frame: &mut RgbImage, reading: &TelemetryReading, now: DateTime<Local>) {
        let scale = PxScale::from(self.font_px);
        let line = self.font_px.ceil() as i32 + 4;
        let height = frame.height() as i32;

        let date = now.format("%d.%m.%Y").to_string();
        let time = now.format("%H.%M.%S").to_string();
        draw_text_mut(frame, NEUTRAL, MARGIN, MARGIN, scale, &self.font, &date);
        draw_text_mut(frame, NEUTRAL, MARGIN, MARGIN + line, scale, &self.font, &time);

        let humidity_y = height - MARGIN - line;
        let co2_y = humidity_y - line;
        let temp_y = co2_y - line;
        let co2_value_x = MARGIN + (self.font_px * 3.2) as i32;

        draw_text_mut(
            frame,
            NEUTRAL,
            MARGIN,
            temp_y,
            scale,
            &self.font,
            &format!("Temp: {}C", reading.temperature),
        );
        draw_text_mut(frame, NEUTRAL, MARGIN, co2_y, scale, &self.font, "CO2: ");
        draw_text_mut(
            frame,
            co2_color(reading.co2_ppm),
            co2_value_x,
            co2_y,
            scale,
            &self.font,
            &reading.co2_ppm.to_string(),
        );
        draw_text_mut(
            frame,
            NEUTRAL,
            MARGIN,
            humidity_y,
            scale,
            &self.font,
            &format!("Humidity: {}%", reading.humidity),
        );
    }
}

impl FrameSink for Annotator {
    fn store(
        &mut self,
        mut frame: RgbImage,
        reading: &TelemetryReading,
    ) -> Result<PathBuf, AnnotateError> {
        let now = Local::now();
        self.render(&mut frame, reading, now);

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .encode_image(&frame)
            .map_err(AnnotateError::Encode)?;

        let path = match &self.output {
            OutputMode::Latest(path) => path.clone(),
            OutputMode::Archive(dir) => archive_path(dir, &now),
        };
        write_atomic(&path, &jpeg)
            .map_err(|e| AnnotateError::Write(path.display().to_string(), e))?;
        Ok(path)
    }
}

/// Timestamped filename for archive mode.
fn archive_path(dir: &Path, now: &DateTime<Local>) -> PathBuf {
    dir.join(format!("frame_{}.jpg", now.format("%Y%m%dT%H%M%S")))
}

/// Write to a sibling temp file and rename over the target, so a reader
/// never observes a half-written image.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    #[error("failed to load font {0}: {1}")]
    FontLoad(String, std::io::Error),
    #[error("font file {0} is not a usable font")]
    FontParse(String),
    #[error("failed to create archive directory {0}: {1}")]
    ArchiveDir(String, std::io::Error),
    #[error("failed to encode JPEG: {0}")]
    Encode(image::ImageError),
    #[error("failed to write image {0}: {1}")]
    Write(String, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("roomcam-annotate-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn overwrite_leaves_only_the_second_content() {
        let dir = tmp_dir("overwrite");
        let path = dir.join("camera.jpg");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1, "temp file left behind");
    }

    #[test]
    fn atomic_write_cleans_up_its_temp_file() {
        let dir = tmp_dir("tmpfile");
        let path = dir.join("camera.jpg");

        write_atomic(&path, b"payload").unwrap();
        assert!(!dir.join("camera.tmp").exists());
    }

    #[test]
    fn archive_names_are_distinct_per_tick() {
        let dir = PathBuf::from("/srv/cam/history");
        let first = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let second = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 58).unwrap();

        let a = archive_path(&dir, &first);
        let b = archive_path(&dir, &second);
        assert_ne!(a, b);
        assert_eq!(a, dir.join("frame_20260314T092653.jpg"));
    }
}
