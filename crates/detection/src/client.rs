use capture::EncodedFrame;

use crate::event::DetectionFields;

#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// Transport failure or non-success response from the detect
    /// endpoint. The caller logs and continues; no retry here.
    #[error("detection request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The frame source could not supply a frame for this cycle.
    #[error("frame capture failed: {0}")]
    Frame(#[source] anyhow::Error),
}

/// Client for the remote detection endpoint. Sends one encoded frame
/// and returns the response body verbatim; only the envelope shape is
/// validated, never the detection content.
#[derive(Clone)]
pub struct DetectionClient {
    client: reqwest::Client,
    base_url: String,
}

impl DetectionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn detect(&self, frame: &EncodedFrame) -> Result<DetectionFields, DetectionError> {
        let url = format!("{}/detect", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "image": frame.to_data_url() });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let fields: DetectionFields = resp.json().await?;
        Ok(fields)
    }
}
