use anyhow::{Context, Result};

use capture::FrameCapturer;
use detection::{DetectionClient, DetectionLog, DetectionLoop};

use crate::config::AppConfig;

pub async fn run(cfg: &AppConfig, once: bool) -> Result<()> {
    let mut capturer =
        FrameCapturer::new(cfg.camera_index).with_jpeg_quality(cfg.jpeg_quality);
    capturer
        .start()
        .context("camera unavailable; detection cannot run this session")?;

    let client = DetectionClient::new(cfg.detect_url.clone());
    let log = DetectionLog::new();
    let mut looper = DetectionLoop::new(client, log.clone());

    if once {
        let event = looper.detect_once(&mut capturer).await?;
        println!("{}", serde_json::to_string_pretty(&event)?);
        return Ok(());
    }

    looper.start(capturer);
    println!(
        "detection armed ({}s period); press Ctrl-C to stop",
        detection::DETECT_EVERY.as_secs()
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    looper.stop();

    let entries = log.snapshot().await;
    println!("\ndetections logged: {}", entries.len());
    for event in &entries {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}
