//! Camera acquisition. A capture thread holds the device for the
//! lifetime of the capturer and keeps the most recent frame re-encoded
//! as JPEG; callers sample that frame on demand.

mod frame;

pub use frame::EncodedFrame;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{info, warn};

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The device denied access or does not exist. Fatal for this
    /// session; the capturer never produces frames and is not retried.
    #[error("video device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `capture_frame` was called before `start` succeeded, or before
    /// the stream delivered its first frame.
    #[error("no frame available yet")]
    NoFrameAvailable,
}

/// Exclusive handle on one video input device.
///
/// `start` opens the device and spawns the capture thread; dropping the
/// capturer (or calling `stop`) stops the thread and releases the
/// device on every exit path.
pub struct FrameCapturer {
    camera_index: u32,
    jpeg_quality: u8,
    latest: Arc<Mutex<Option<EncodedFrame>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FrameCapturer {
    pub fn new(camera_index: u32) -> Self {
        Self {
            camera_index,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            latest: Arc::new(Mutex::new(None)),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Opens the device and starts streaming. Blocks until the device
    /// grant/denial is known; on denial no frames are ever produced.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.stop.store(false, Ordering::Relaxed);

        let index = self.camera_index;
        let quality = self.jpeg_quality;
        let latest = self.latest.clone();
        let stop = self.stop.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let handle = std::thread::spawn(move || {
            let requested =
                RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
            let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = camera.open_stream() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            info!(camera_index = index, "camera stream started");

            while !stop.load(Ordering::Relaxed) {
                let buffer = match camera.frame() {
                    Ok(b) => b,
                    Err(e) => {
                        warn!("camera frame read failed: {e}");
                        std::thread::sleep(Duration::from_millis(100));
                        continue;
                    }
                };
                let img = match buffer.decode_image::<RgbFormat>() {
                    Ok(i) => i,
                    Err(e) => {
                        warn!("camera frame decode failed: {e}");
                        continue;
                    }
                };
                match frame::encode_jpeg(&img, quality) {
                    Ok(jpeg) => {
                        *latest.lock().expect("frame mutex poisoned") =
                            Some(EncodedFrame::new(jpeg));
                    }
                    Err(e) => warn!("jpeg encode failed: {e}"),
                }
            }

            if let Err(e) = camera.stop_stream() {
                warn!("camera stream stop failed: {e}");
            }
            info!(camera_index = index, "camera stream stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(handle);
                Ok(())
            }
            Ok(Err(msg)) => {
                let _ = handle.join();
                Err(CaptureError::DeviceUnavailable(msg))
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::DeviceUnavailable(
                    "capture thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    /// Returns the most recent frame as compressed JPEG.
    pub fn capture_frame(&self) -> Result<EncodedFrame, CaptureError> {
        if self.worker.is_none() {
            return Err(CaptureError::NoFrameAvailable);
        }
        self.latest
            .lock()
            .expect("frame mutex poisoned")
            .clone()
            .ok_or(CaptureError::NoFrameAvailable)
    }

    /// Stops the capture thread and releases the device handle.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        // A later start must not serve a frame from the old stream.
        *self.latest.lock().expect("frame mutex poisoned") = None;
    }
}

impl Drop for FrameCapturer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_before_start_reports_no_frame() {
        let capturer = FrameCapturer::new(0);
        assert!(matches!(
            capturer.capture_frame(),
            Err(CaptureError::NoFrameAvailable)
        ));
    }
}
