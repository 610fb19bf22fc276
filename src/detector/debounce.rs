//! Repeated sampling within one poll to suppress detector noise.

use crate::detector::PresenceSource;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one debounced poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub face_count: u32,
    pub present: bool,
}

impl Sample {
    pub fn absent() -> Self {
        Self {
            face_count: 0,
            present: false,
        }
    }
}

/// Queries a [`PresenceSource`] until it sees someone or runs out of attempts.
pub struct Debouncer<S> {
    source: S,
    retries: u32,
    retry_delay: Duration,
}

impl<S: PresenceSource> Debouncer<S> {
    pub fn new(source: S, retries: u32, retry_delay: Duration) -> Self {
        Self {
            source,
            retries,
            retry_delay,
        }
    }

    /// Take one debounced sample.
    ///
    /// Returns on the first positive attempt. Detector errors count as absence.
    pub fn sample(&mut self) -> Sample {
        for attempt in 1..=self.retries {
            match self.source.detect() {
                Ok(detection) if detection.present => {
                    debug!(attempt, faces = detection.face_count, "Presence detected");
                    return Sample {
                        face_count: detection.face_count,
                        present: true,
                    };
                }
                Ok(_) => {}
                Err(e) => warn!(attempt, error = %e, "Detection attempt failed"),
            }

            if attempt < self.retries && !self.retry_delay.is_zero() {
                std::thread::sleep(self.retry_delay);
            }
        }

        debug!(retries = self.retries, "No presence after all attempts");
        Sample::absent()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
