//! Presence detection for waybar-eyes.
//!
//! The face detector itself lives outside this crate. This module defines the
//! capability the poll loop needs from it, an adapter that runs an external
//! detector program, and the debouncer that smooths out single-frame misses.

pub mod command;
pub mod debounce;
pub mod scripted;

// Re-export commonly used types
pub use command::CommandDetector;
pub use debounce::{Debouncer, Sample};
pub use scripted::ScriptedSource;

/// One detector invocation's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    /// Number of faces found in the frame
    pub face_count: u32,
    /// Whether a subject is present
    pub present: bool,
}

impl Detection {
    /// A detection is present whenever at least one face was found.
    pub fn from_faces(face_count: u32) -> Self {
        Self {
            face_count,
            present: face_count > 0,
        }
    }

    pub fn absent() -> Self {
        Self::from_faces(0)
    }
}

/// Something that can be asked whether a subject is in front of the camera.
///
/// Implementations may block on hardware I/O.
pub trait PresenceSource: Send {
    fn detect(&mut self) -> Result<Detection, DetectionError>;
}

/// Errors that can occur during detection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectionError {
    /// The detector (or the camera behind it) could not be started at all.
    #[error("Detector unavailable: {0}")]
    Unavailable(String),
    /// The detector ran but reported a failure (frame read, classifier load).
    #[error("Detection failed: {0}")]
    Failed(String),
    /// The detector produced output that is not a face count.
    #[error("Invalid detector output: {0:?}")]
    InvalidOutput(String),
}
