use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobPhase {
    /// Submission request dispatched, no model id yet.
    Uploading,
    /// Server accepted the job; the status endpoint is being polled.
    Polling,
    Completed,
    Failed,
}

impl JobPhase {
    /// Terminal phases are never polled again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

/// The one training job tracked per session. Starting a new submission
/// discards any prior terminal job state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingJob {
    pub model_id: Option<String>,
    pub phase: JobPhase,
    pub progress: u8,
    pub error: Option<String>,
}

impl TrainingJob {
    pub fn uploading() -> Self {
        Self {
            model_id: None,
            phase: JobPhase::Uploading,
            progress: 0,
            error: None,
        }
    }

    pub fn polling(model_id: String) -> Self {
        Self {
            model_id: Some(model_id),
            phase: JobPhase::Polling,
            progress: 0,
            error: None,
        }
    }

    /// Folds one status response into the job: progress and error are
    /// taken verbatim, the reported status maps onto the phase, and a
    /// completed job always reads 100%.
    pub fn apply_report(&mut self, report: &StatusReport) {
        self.progress = report.progress;
        self.error = report.error.clone();
        self.phase = match report.status {
            ReportedStatus::Training => JobPhase::Polling,
            ReportedStatus::Completed => {
                self.progress = 100;
                JobPhase::Completed
            }
            ReportedStatus::Failed => JobPhase::Failed,
        };
    }
}

/// One response body from `GET /api/model/status/{modelId}`.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusReport {
    pub status: ReportedStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    Training,
    Completed,
    Failed,
}
