//! Remote model-training client: credit-balance reads, dataset/config
//! upload with validation, and the poll-until-terminal job tracker.

mod credits;
mod job;
mod tracker;
mod upload;

pub use credits::{CreditAccount, CreditError, CreditLedgerClient};
pub use job::{JobPhase, ReportedStatus, StatusReport, TrainingJob};
pub use tracker::{TrainingJobTracker, POLL_EVERY};
pub use upload::{FileBlob, TrainingError, UploadCoordinator, MAX_DATASET_BYTES};
