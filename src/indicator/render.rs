//! Rendering of the counter into the waybar `return-type: json` payload.

use crate::indicator::state::IndicatorState;
use serde::{Deserialize, Serialize};

/// Coarse display tier used as the waybar CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What waybar reads from the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPayload {
    pub text: String,
    pub tooltip: String,
    pub class: Severity,
    pub count: u32,
}

impl RenderedPayload {
    /// Serialize to the single-line JSON object waybar expects.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Maps an [`IndicatorState`] to its payload.
#[derive(Debug, Clone)]
pub struct Renderer {
    glyph: String,
}

impl Renderer {
    pub fn new(glyph: impl Into<String>) -> Self {
        Self {
            glyph: glyph.into(),
        }
    }

    pub fn render(&self, state: &IndicatorState) -> RenderedPayload {
        let count = state.count();
        let class = if count == state.max_count() {
            Severity::Critical
        } else {
            Severity::Normal
        };

        RenderedPayload {
            text: self.glyph.repeat(count as usize),
            tooltip: String::new(),
            class,
            count,
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GLYPH)
    }
}
