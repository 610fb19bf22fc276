//! Presence detection through an external detector program.
//!
//! The program is run once per attempt and must print the number of faces it
//! found on stdout. Camera access and classifier inference happen entirely in
//! that process.

use crate::config::DetectorConfig;
use crate::detector::{Detection, DetectionError, PresenceSource};
use std::process::{Command, Stdio};
use tracing::trace;

/// Runs a detector executable and parses its face count.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        let device = config.device.to_string();
        let classifier = config.classifier.to_string_lossy();
        let args = config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{device}", &device)
                    .replace("{classifier}", &classifier)
            })
            .collect();

        Self {
            program: config.program.clone(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after placeholder substitution.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl PresenceSource for CommandDetector {
    fn detect(&mut self) -> Result<Detection, DetectionError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DetectionError::Unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectionError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        trace!(program = %self.program, output = text, "Detector finished");

        let face_count = text
            .parse::<u32>()
            .map_err(|_| DetectionError::InvalidOutput(text.to_string()))?;
        Ok(Detection::from_faces(face_count))
    }
}
