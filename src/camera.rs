use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use tracing::info;

use crate::config::CameraConfig;

/// A single-frame video source. Implemented by the real USB camera and by
/// test doubles, so the drain policy can be exercised without hardware.
pub trait FrameSource {
    fn grab(&mut self) -> Result<RgbImage, CaptureError>;
}

/// The process-wide camera handle. Opened once at startup and held for the
/// lifetime of the process; the device is never explicitly closed.
pub struct UsbCamera {
    camera: nokhwa::Camera,
}

impl UsbCamera {
    /// Open the device at the configured index. The resolution is a hint;
    /// the driver may deliver a different size and the rest of the pipeline
    /// works from the actual frame dimensions.
    pub fn open(config: &CameraConfig) -> Result<Self, CaptureError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                Resolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                30,
            ),
        ));

        let mut camera = nokhwa::Camera::new(CameraIndex::Index(config.index), requested)
            .map_err(|e| CaptureError::Open {
                index: config.index,
                reason: e.to_string(),
            })?;
        camera.open_stream().map_err(|e| CaptureError::Open {
            index: config.index,
            reason: e.to_string(),
        })?;

        let resolution = camera.resolution();
        info!(
            index = config.index,
            width = resolution.width(),
            height = resolution.height(),
            "camera opened"
        );

        Ok(Self { camera })
    }
}

impl FrameSource for UsbCamera {
    fn grab(&mut self) -> Result<RgbImage, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::NoFrame(e.to_string()))?;
        buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Decode(e.to_string()))
    }
}

/// Wraps a frame source with the drain-and-keep-last read policy: the
/// driver buffers several frames, so a single read would return a stale
/// image. Issuing `drain` consecutive reads and trusting only the final one
/// yields the current scene.
pub struct Capturer<S: FrameSource> {
    source: S,
    drain: u32,
}

impl<S: FrameSource> Capturer<S> {
    pub fn new(source: S, drain: u32) -> Self {
        Self {
            source,
            drain: drain.max(1),
        }
    }

    /// Capture one fresh frame. Only the outcome of the final read counts;
    /// earlier reads exist to flush the driver buffer.
    pub fn capture(&mut self) -> Result<RgbImage, CaptureError> {
        let mut frame = self.source.grab();
        for _ in 1..self.drain {
            frame = self.source.grab();
        }
        frame
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("camera produced no frame: {0}")]
    NoFrame(String),
    #[error("failed to decode camera frame: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Yields 1x1 frames whose red channel counts grab calls.
    struct MarkerSource {
        reads: u8,
    }

    impl FrameSource for MarkerSource {
        fn grab(&mut self) -> Result<RgbImage, CaptureError> {
            self.reads += 1;
            Ok(RgbImage::from_pixel(1, 1, Rgb([self.reads, 0, 0])))
        }
    }

    /// Fails only on the final read of a 6-read drain.
    struct FailsOnSixth {
        reads: u8,
    }

    impl FrameSource for FailsOnSixth {
        fn grab(&mut self) -> Result<RgbImage, CaptureError> {
            self.reads += 1;
            if self.reads == 6 {
                Err(CaptureError::NoFrame("device returned nothing".into()))
            } else {
                Ok(RgbImage::from_pixel(1, 1, Rgb([self.reads, 0, 0])))
            }
        }
    }

    #[test]
    fn drain_keeps_the_last_frame() {
        let mut capturer = Capturer::new(MarkerSource { reads: 0 }, 6);
        let frame = capturer.capture().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgb([6, 0, 0]));
    }

    #[test]
    fn only_the_final_read_decides_the_outcome() {
        let mut capturer = Capturer::new(FailsOnSixth { reads: 0 }, 6);
        assert!(matches!(
            capturer.capture(),
            Err(CaptureError::NoFrame(_))
        ));
    }

    #[test]
    fn drain_count_is_configurable() {
        let mut capturer = Capturer::new(MarkerSource { reads: 0 }, 3);
        let frame = capturer.capture().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgb([3, 0, 0]));
    }

    #[test]
    fn zero_drain_still_reads_once() {
        let mut capturer = Capturer::new(MarkerSource { reads: 0 }, 0);
        let frame = capturer.capture().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgb([1, 0, 0]));
    }
}
