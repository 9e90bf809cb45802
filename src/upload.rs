use reqwest::multipart;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::UploadConfig;

/// Publishes a locally stored image to the remote endpoint. The scheduler
/// is generic over this seam so cadence tests run without a network.
#[allow(async_fn_in_trait)]
pub trait Publish {
    async fn publish(&self, image: &Path) -> Result<(), UploadError>;
}

/// Posts the image as a multipart form with the shared-secret password and
/// camera identifier. One attempt per call; the next upload tick is the
/// retry.
pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
    password: String,
    camera_id: String,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(UploadError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
            password: config.password.clone(),
            camera_id: config.camera_id.clone(),
        })
    }
}

impl Publish for HttpUploader {
    async fn publish(&self, image: &Path) -> Result<(), UploadError> {
        let data = tokio::fs::read(image)
            .await
            .map_err(|e| UploadError::ReadImage(image.display().to_string(), e))?;
        let filename = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("frame.jpg")
            .to_string();

        let part = multipart::Part::bytes(data)
            .file_name(filename)
            .mime_str("image/jpeg")
            .map_err(UploadError::Request)?;
        let form = multipart::Form::new()
            .text("password", self.password.clone())
            .text("camera", self.camera_id.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(UploadError::Request)?;
        if !status.is_success() {
            return Err(UploadError::Status {
                code: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        // The endpoint's response body is opaque text; log it, don't parse it.
        info!(status = %status, response = %body.trim(), "image uploaded");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("failed to read image {0}: {1}")]
    ReadImage(String, std::io::Error),
    #[error("upload request failed: {0}")]
    Request(reqwest::Error),
    #[error("upload rejected with HTTP {code}: {body}")]
    Status { code: u16, body: String },
}
