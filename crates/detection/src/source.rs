use capture::{EncodedFrame, FrameCapturer};

/// Supplies the current camera frame to a detection cycle.
pub trait FrameSource: Send {
    fn latest_frame(&mut self) -> anyhow::Result<EncodedFrame>;
}

impl FrameSource for FrameCapturer {
    fn latest_frame(&mut self) -> anyhow::Result<EncodedFrame> {
        Ok(self.capture_frame()?)
    }
}
