use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Hard cap on the dataset archive: 1 GiB.
pub const MAX_DATASET_BYTES: usize = 1 << 30;

const UPLOAD_TICK: Duration = Duration::from_millis(500);
const UPLOAD_TICK_STEP: u8 = 10;

/// An in-memory file selection: a name and the raw bytes.
#[derive(Clone, Debug)]
pub struct FileBlob {
    pub name: String,
    pub bytes: Bytes,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("dataset exceeds the 1 GiB limit ({size} bytes)")]
    OversizedDataset { size: usize },

    #[error("configuration file must be JSON format: {name}")]
    InvalidConfigFormat { name: String },

    #[error("both a dataset and a configuration file are required")]
    IncompleteSubmission,

    #[error("training submission failed: {0}")]
    SubmissionFailed(String),
}

#[derive(Deserialize)]
struct TrainResponse {
    #[serde(rename = "modelId")]
    model_id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Holds the dataset/config selection, validates each field on entry,
/// and submits both as one multipart request.
///
/// The upload gauge it exposes is synthetic: a fixed step on a fixed
/// period, independent of bytes on the wire. The ticker is cancelled
/// whenever the real request settles, whatever value it had reached.
pub struct UploadCoordinator {
    client: reqwest::Client,
    base_url: String,
    dataset: Option<FileBlob>,
    config: Option<FileBlob>,
    progress_tx: watch::Sender<u8>,
    progress_tick: Duration,
}

impl UploadCoordinator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (progress_tx, _) = watch::channel(0);
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            dataset: None,
            config: None,
            progress_tx,
            progress_tick: UPLOAD_TICK,
        }
    }

    pub fn with_progress_tick(mut self, tick: Duration) -> Self {
        self.progress_tick = tick;
        self
    }

    /// Accepts the dataset iff it fits the 1 GiB cap. On rejection the
    /// prior selection (if any) is left untouched.
    pub fn select_dataset(&mut self, blob: FileBlob) -> Result<(), TrainingError> {
        if blob.len() > MAX_DATASET_BYTES {
            return Err(TrainingError::OversizedDataset { size: blob.len() });
        }
        info!(
            dataset = %blob.name,
            size = blob.len(),
            fingerprint = %blake3::hash(&blob.bytes).to_hex(),
            "dataset accepted"
        );
        self.dataset = Some(blob);
        Ok(())
    }

    /// Accepts the config iff the name ends in `.json` (case-sensitive,
    /// a deliberate policy). Prior selection untouched on rejection.
    pub fn select_config(&mut self, blob: FileBlob) -> Result<(), TrainingError> {
        if !blob.name.ends_with(".json") {
            return Err(TrainingError::InvalidConfigFormat { name: blob.name });
        }
        self.config = Some(blob);
        Ok(())
    }

    pub fn dataset(&self) -> Option<&FileBlob> {
        self.dataset.as_ref()
    }

    pub fn config(&self) -> Option<&FileBlob> {
        self.config.as_ref()
    }

    pub fn reset(&mut self) {
        self.dataset = None;
        self.config = None;
        let _ = self.progress_tx.send(0);
    }

    /// Observer for the synthetic upload gauge (0-100).
    pub fn upload_progress(&self) -> watch::Receiver<u8> {
        self.progress_tx.subscribe()
    }

    /// Packages both selections into a multipart request and returns the
    /// server-assigned model id. Requires both fields; never touches the
    /// network otherwise.
    pub async fn submit(&mut self) -> Result<String, TrainingError> {
        let (Some(dataset), Some(config)) = (&self.dataset, &self.config) else {
            return Err(TrainingError::IncompleteSubmission);
        };

        let _ = self.progress_tx.send(0);
        let ticker_cancel = CancellationToken::new();
        spawn_progress_ticker(
            self.progress_tx.clone(),
            ticker_cancel.clone(),
            self.progress_tick,
        );

        let form = Form::new()
            .part(
                "dataset",
                Part::stream(reqwest::Body::from(dataset.bytes.clone()))
                    .file_name(dataset.name.clone()),
            )
            .part(
                "config",
                Part::stream(reqwest::Body::from(config.bytes.clone()))
                    .file_name(config.name.clone()),
            );

        let url = format!("{}/api/model/train", self.base_url.trim_end_matches('/'));
        let result = send_submission(&self.client, &url, form).await;

        // The real request settled; the cosmetic ticker dies with it.
        ticker_cancel.cancel();
        if result.is_ok() {
            let _ = self.progress_tx.send(100);
        }
        result
    }
}

async fn send_submission(
    client: &reqwest::Client,
    url: &str,
    form: Form,
) -> Result<String, TrainingError> {
    let resp = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| TrainingError::SubmissionFailed(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("training request failed: HTTP {status}"));
        return Err(TrainingError::SubmissionFailed(message));
    }

    let body: TrainResponse = resp
        .json()
        .await
        .map_err(|e| TrainingError::SubmissionFailed(e.to_string()))?;
    Ok(body.model_id)
}

fn spawn_progress_ticker(tx: watch::Sender<u8>, cancel: CancellationToken, tick: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tx.send_modify(|p| *p = (*p + UPLOAD_TICK_STEP).min(100));
                }
            }
        }
    });
}
