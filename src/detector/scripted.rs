//! A presence source that replays predetermined results.

use crate::detector::{Detection, DetectionError, PresenceSource};
use std::collections::VecDeque;

/// Replays a fixed list of detector results, then keeps returning the fallback.
pub struct ScriptedSource {
    script: VecDeque<Result<Detection, DetectionError>>,
    fallback: Result<Detection, DetectionError>,
    calls: usize,
}

impl ScriptedSource {
    /// Replay `script`, then report absence.
    pub fn new(script: Vec<Result<Detection, DetectionError>>) -> Self {
        Self {
            script: script.into(),
            fallback: Ok(Detection::absent()),
            calls: 0,
        }
    }

    /// Return `result` on every call.
    pub fn repeating(result: Result<Detection, DetectionError>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: result,
            calls: 0,
        }
    }

    /// Build a script of plain presence flags.
    pub fn from_presence(flags: &[bool]) -> Self {
        Self::new(
            flags
                .iter()
                .map(|&present| Ok(Detection::from_faces(u32::from(present))))
                .collect(),
        )
    }

    /// Number of times `detect` has been called.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PresenceSource for ScriptedSource {
    fn detect(&mut self) -> Result<Detection, DetectionError> {
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
