use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whatever the detect endpoint returned; no schema is enforced.
pub type DetectionFields = serde_json::Map<String, serde_json::Value>;

/// One inference result plus the capture-side timestamp, assigned when
/// the response arrived (not by the server). Immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: DetectionFields,
}

impl DetectionEvent {
    pub fn now(fields: DetectionFields) -> Self {
        Self {
            timestamp: Utc::now(),
            fields,
        }
    }
}
