use serde::{Deserialize, Serialize};

/// Read-only snapshot of the operator's training-credit balance.
/// Refreshed only by wholesale re-fetch, never mutated locally.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CreditAccount {
    pub available: i64,
    pub used: i64,
}

impl CreditAccount {
    /// Derived client-side from the two server-reported numbers; can go
    /// negative on degenerate responses. TODO: have the server return
    /// `remaining` directly so the two sides cannot drift.
    pub fn remaining(&self) -> i64 {
        self.available - self.used
    }

    /// One training run costs one credit.
    pub fn can_train(&self) -> bool {
        self.remaining() >= 1
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// Transport failure or non-success response. The previously shown
    /// balance stays as-is and is reported "unavailable", never zero.
    #[error("credit balance fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),
}

pub struct CreditLedgerClient {
    client: reqwest::Client,
    base_url: String,
}

impl CreditLedgerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_balance(&self) -> Result<CreditAccount, CreditError> {
        let url = format!("{}/api/user/credits", self.base_url.trim_end_matches('/'));
        let account = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<CreditAccount>()
            .await?;
        Ok(account)
    }
}
