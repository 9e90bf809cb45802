use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::annotate::{AnnotateError, FrameSink};
use crate::camera::{CaptureError, Capturer, FrameSource};
use crate::errlog::ErrorLog;
use crate::telemetry::{TelemetryError, TelemetryReading};
use crate::upload::{Publish, UploadError};

/// Drives the two cadences: every fast tick a frame is captured, annotated
/// and stored; when more than the slow interval has passed since the last
/// trigger, the stored file is also uploaded. All loop state lives here,
/// nothing is global.
pub struct Scheduler<S: FrameSource, K: FrameSink, P: Publish> {
    capturer: Capturer<S>,
    telemetry_path: PathBuf,
    sink: K,
    publisher: P,
    errors: ErrorLog,
    fast_tick: Duration,
    slow_tick: Duration,
    /// Advanced whenever the upload gate fires, whether or not the upload
    /// itself succeeds. A failed attempt therefore defers the next one by a
    /// full slow interval.
    last_upload_at: Instant,
}

/// What one successful iteration did.
pub struct TickOutcome {
    pub uploaded: bool,
}

impl<S: FrameSource, K: FrameSink, P: Publish> Scheduler<S, K, P> {
    pub fn new(
        capturer: Capturer<S>,
        telemetry_path: PathBuf,
        sink: K,
        publisher: P,
        errors: ErrorLog,
        fast_tick: Duration,
        slow_tick: Duration,
    ) -> Self {
        Self {
            capturer,
            telemetry_path,
            sink,
            publisher,
            errors,
            fast_tick,
            slow_tick,
            last_upload_at: Instant::now(),
        }
    }

    /// Run forever. Sleep is not drift-compensated: the effective capture
    /// period is the fast tick plus processing time.
    pub async fn run(&mut self) {
        info!(
            fast_secs = self.fast_tick.as_secs(),
            slow_secs = self.slow_tick.as_secs(),
            "entering capture loop"
        );
        loop {
            self.step(Instant::now()).await;
            tokio::time::sleep(self.fast_tick).await;
        }
    }

    /// One iteration with the loop-boundary failure policy: any tick error
    /// is journaled and swallowed so a transient fault never stops the loop.
    pub async fn step(&mut self, now: Instant) {
        match self.tick(now).await {
            Ok(outcome) => {
                debug!(uploaded = outcome.uploaded, "tick complete");
            }
            Err(e) => {
                warn!(error = %e, "tick failed");
                self.errors.record(&e);
            }
        }
    }

    /// Capture, annotate and store unconditionally; upload when the slow
    /// interval has elapsed since the last trigger. The gate is advanced
    /// before the attempt.
    async fn tick(&mut self, now: Instant) -> Result<TickOutcome, TickError> {
        let frame = self.capturer.capture()?;
        let reading = TelemetryReading::read(&self.telemetry_path)?;
        let image = self.sink.store(frame, &reading)?;

        let mut uploaded = false;
        if now.duration_since(self.last_upload_at) > self.slow_tick {
            self.last_upload_at = now;
            self.publisher.publish(&image).await?;
            uploaded = true;
        }

        Ok(TickOutcome { uploaded })
    }
}

/// Typed per-iteration failure, so logs and tests can tell the stages
/// apart instead of seeing one opaque catch-all.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("annotate: {0}")]
    Annotate(#[from] AnnotateError),
    #[error("upload: {0}")]
    Upload(#[from] UploadError),
}
