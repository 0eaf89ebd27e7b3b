//! Periodic frame detection: a client for the remote detect endpoint,
//! an append-only event log, and the armed loop that ties a frame
//! source to both.

mod client;
mod event;
mod log;
mod runner;
mod source;

pub use client::{DetectionClient, DetectionError};
pub use event::{DetectionEvent, DetectionFields};
pub use log::DetectionLog;
pub use runner::{DetectionLoop, DETECT_EVERY};
pub use source::FrameSource;
