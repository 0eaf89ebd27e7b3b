use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{DetectionClient, DetectionError};
use crate::event::DetectionEvent;
use crate::log::DetectionLog;
use crate::source::FrameSource;

pub const DETECT_EVERY: Duration = Duration::from_secs(1);

/// Recurring capture-detect-append timer over a frame source.
///
/// Idle until `start` arms it; while armed, each tick captures the
/// current frame, submits it, and appends the timestamped result to
/// the log. A failed tick logs a diagnostic and the loop continues.
/// The timer is an owned cancellation token: `start` is idempotent
/// (any prior timer is cancelled first) and no tick fires after `stop`.
pub struct DetectionLoop {
    client: DetectionClient,
    log: DetectionLog,
    period: Duration,
    cancel: Option<CancellationToken>,
}

impl DetectionLoop {
    pub fn new(client: DetectionClient, log: DetectionLog) -> Self {
        Self {
            client,
            log,
            period: DETECT_EVERY,
            cancel: None,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn log(&self) -> &DetectionLog {
        &self.log
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    /// Arms the recurring timer, cancelling any previous one first.
    pub fn start<S: FrameSource + 'static>(&mut self, mut source: S) {
        self.stop();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        self.cancel = Some(cancel);

        let client = self.client.clone();
        let log = self.log.clone();
        let period = self.period;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match run_tick(&client, &log, &mut source).await {
                            Ok(event) => debug!(at = %event.timestamp, "detection appended"),
                            // The loop's value is continuous operation;
                            // a single failed tick is only a diagnostic.
                            Err(e) => warn!("detection tick failed: {e:#}"),
                        }
                    }
                }
            }
            debug!("detection loop stopped");
        });
    }

    /// Disarms the timer. In-flight work from the current tick is
    /// allowed to finish; its result still lands in the log.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// One capture-detect-append cycle outside the timer, usable while
    /// idle. Concurrent invocations are a caller error to avoid.
    pub async fn detect_once<S: FrameSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<DetectionEvent, DetectionError> {
        run_tick(&self.client, &self.log, source).await
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_tick<S: FrameSource + ?Sized>(
    client: &DetectionClient,
    log: &DetectionLog,
    source: &mut S,
) -> Result<DetectionEvent, DetectionError> {
    let frame = source.latest_frame().map_err(DetectionError::Frame)?;
    let fields = client.detect(&frame).await?;
    let event = DetectionEvent::now(fields);
    log.append(event.clone()).await;
    Ok(event)
}
