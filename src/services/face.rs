//! Face presence check for captured photos.

use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A face found in a photo, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Display)]
pub enum DetectorError {
    #[display(fmt = "detector request failed: {}", _0)]
    Request(reqwest::Error),
    #[display(fmt = "detector returned HTTP {}", _0)]
    Status(u16),
}

impl std::error::Error for DetectorError {}

impl From<reqwest::Error> for DetectorError {
    fn from(e: reqwest::Error) -> Self {
        DetectorError::Request(e)
    }
}

#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Returns every face found in the image. An empty list is not an error.
    async fn detect(&self, image: &[u8], content_type: &str) -> Result<Vec<FaceBox>, DetectorError>;
}

#[derive(Deserialize)]
struct DetectionResponse {
    #[serde(default)]
    faces: Vec<FaceBox>,
}

/// Posts the raw image to a detection endpoint that answers
/// `{"faces": [{"x", "y", "width", "height", "confidence"}]}`.
pub struct HttpFaceDetector {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpFaceDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    async fn detect(&self, image: &[u8], content_type: &str) -> Result<Vec<FaceBox>, DetectorError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image.to_vec())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DetectorError::Status(status.as_u16()));
        }

        let parsed: DetectionResponse = resp.json().await?;
        tracing::debug!(faces = parsed.faces.len(), bytes = image.len(), "face detection finished");
        Ok(parsed.faces)
    }
}
