use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::job::{JobPhase, StatusReport, TrainingJob};

pub const POLL_EVERY: Duration = Duration::from_secs(5);

/// Owns the lifecycle of one training job from submission through a
/// terminal status.
///
/// The poll timer is an owned cancellation token; `track` is idempotent
/// and cancels any prior poller before starting the next one, so a
/// re-submission can never leave two timers polling different model
/// ids. Once a job reads `Completed` or `Failed`, no further status
/// request is issued for it.
pub struct TrainingJobTracker {
    client: reqwest::Client,
    base_url: String,
    period: Duration,
    job: Arc<RwLock<Option<TrainingJob>>>,
    cancel: Option<CancellationToken>,
}

impl TrainingJobTracker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            period: POLL_EVERY,
            job: Arc::new(RwLock::new(None)),
            cancel: None,
        }
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Current job state for display.
    pub async fn snapshot(&self) -> Option<TrainingJob> {
        self.job.read().await.clone()
    }

    /// Marks the instant a submission request goes out. Any prior job,
    /// terminal or not, is discarded; one job per session.
    pub async fn begin(&mut self) {
        self.stop_polling();
        *self.job.write().await = Some(TrainingJob::uploading());
    }

    /// Starts polling the status endpoint for the given model id,
    /// replacing any previous poller.
    pub async fn track(&mut self, model_id: String) {
        self.stop_polling();
        *self.job.write().await = Some(TrainingJob::polling(model_id.clone()));

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        self.cancel = Some(cancel);

        let client = self.client.clone();
        let url = format!(
            "{}/api/model/status/{}",
            self.base_url.trim_end_matches('/'),
            model_id
        );
        let job = self.job.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match poll_status(&client, &url).await {
                            Ok(report) => {
                                let mut guard = job.write().await;
                                let Some(j) = guard.as_mut() else { break };
                                j.apply_report(&report);
                                if j.phase.is_terminal() {
                                    info!(model_id = %model_id, phase = ?j.phase, "training job reached terminal state");
                                    break;
                                }
                            }
                            Err(message) => {
                                // A failed poll is terminal: a stalled,
                                // never-terminating job is worse than a
                                // falsely reported failure.
                                warn!(model_id = %model_id, "{message}");
                                let mut guard = job.write().await;
                                if let Some(j) = guard.as_mut() {
                                    j.phase = JobPhase::Failed;
                                    j.error = Some(message);
                                }
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    /// Cancels the poll timer, if one is live.
    pub fn stop_polling(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Drops all job state (form reset, or a submission that never got
    /// a model id).
    pub async fn clear(&mut self) {
        self.stop_polling();
        *self.job.write().await = None;
    }
}

impl Drop for TrainingJobTracker {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn poll_status(client: &reqwest::Client, url: &str) -> Result<StatusReport, String> {
    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| format!("status poll failed: {e}"))?;
    resp.json::<StatusReport>()
        .await
        .map_err(|e| format!("status response malformed: {e}"))
}
