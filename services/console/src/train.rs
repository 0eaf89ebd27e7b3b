use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::warn;

use training::{CreditLedgerClient, FileBlob, JobPhase, TrainingJobTracker, UploadCoordinator};

use crate::config::AppConfig;

pub async fn show_credits(cfg: &AppConfig) -> Result<()> {
    let ledger = CreditLedgerClient::new(cfg.api_base_url.clone());
    match ledger.fetch_balance().await {
        Ok(account) => {
            println!("available: {}", account.available);
            println!("used:      {}", account.used);
            println!("remaining: {}", account.remaining());
        }
        Err(e) => {
            warn!("{e}");
            println!("credit balance unavailable");
        }
    }
    Ok(())
}

pub async fn run(cfg: &AppConfig, dataset_path: &Path, config_path: &Path) -> Result<()> {
    // Credit gate before anything is uploaded.
    let ledger = CreditLedgerClient::new(cfg.api_base_url.clone());
    let account = ledger
        .fetch_balance()
        .await
        .context("credit balance unavailable")?;
    if !account.can_train() {
        bail!(
            "insufficient credits: {} remaining, training costs 1",
            account.remaining()
        );
    }

    let dataset = FileBlob::new(
        file_name(dataset_path)?,
        tokio::fs::read(dataset_path)
            .await
            .with_context(|| format!("failed to read {}", dataset_path.display()))?,
    );
    let config = FileBlob::new(
        file_name(config_path)?,
        tokio::fs::read(config_path)
            .await
            .with_context(|| format!("failed to read {}", config_path.display()))?,
    );

    let mut coordinator = UploadCoordinator::new(cfg.api_base_url.clone());
    coordinator.select_dataset(dataset)?;
    coordinator.select_config(config)?;

    let mut tracker = TrainingJobTracker::new(cfg.api_base_url.clone());
    tracker.begin().await;

    // The gauge is cosmetic; submission success is what matters.
    let mut progress = coordinator.upload_progress();
    let gauge = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            print!("\ruploading... {:>3}%", *progress.borrow());
            let _ = std::io::stdout().flush();
        }
    });

    let submitted = coordinator.submit().await;
    gauge.abort();
    println!();

    let model_id = match submitted {
        Ok(id) => id,
        Err(e) => {
            tracker.clear().await;
            return Err(e.into());
        }
    };
    println!("submission accepted, model id: {model_id}");

    // A credit was spent; show the fresh balance if the ledger answers.
    match ledger.fetch_balance().await {
        Ok(refreshed) => println!("credits remaining: {}", refreshed.remaining()),
        Err(e) => warn!("balance refresh failed: {e}"),
    }

    tracker.track(model_id).await;
    let mut last_printed = None;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let Some(job) = tracker.snapshot().await else {
            break;
        };
        match job.phase {
            JobPhase::Polling => {
                if last_printed != Some(job.progress) {
                    println!("training... {:>3}%", job.progress);
                    last_printed = Some(job.progress);
                }
            }
            JobPhase::Completed => {
                println!("training completed; the model is ready for detection");
                break;
            }
            JobPhase::Failed => bail!(
                "training failed: {}",
                job.error.unwrap_or_else(|| "unknown error".to_string())
            ),
            JobPhase::Uploading => {}
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .with_context(|| format!("invalid file name: {}", path.display()))
}
