//! waybar-eyes - a presence-driven eye counter for waybar.
//!
//! A webcam face detector is polled on a schedule. While someone keeps sitting
//! in front of the screen, an eye is added to the status bar every cool-down
//! period, up to a fixed maximum. When nobody is there, eyes disappear one per
//! poll. Clicking the widget sends `SIGUSR1`, which clears the eyes at once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         waybar-eyes                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────────┐  │
//! │  │  Detector  │──▶│ Debouncer  │──▶│      Scheduler       │  │
//! │  │ (external) │   │ (retries)  │   │ (poll thread)        │  │
//! │  └────────────┘   └────────────┘   └──────────┬───────────┘  │
//! │                                               ▼              │
//! │  ┌────────────┐                    ┌──────────────────────┐  │
//! │  │   Reset    │───────────────────▶│   SharedIndicator    │  │
//! │  │  Listener  │  SIGUSR1 / SIGTERM │ state ▸ render ▸ sink│  │
//! │  └────────────┘                    └──────────┬───────────┘  │
//! │                                               ▼              │
//! │                                    ~/.cache/waybar-eyes.json │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use waybar_eyes::{Config, IndicatorState, JsonFileSink, Renderer, SharedIndicator};
//!
//! let config = Config::default();
//! let indicator = SharedIndicator::new(
//!     IndicatorState::new(config.max_count, config.min_increment_interval, Instant::now()),
//!     Renderer::new(config.glyph.clone()),
//!     Arc::new(JsonFileSink::new(&config.output_path)),
//!     config.reset_policy,
//! );
//!
//! // One absent sample publishes the initial, empty payload.
//! indicator.observe(false, Instant::now());
//! ```

pub mod config;
pub mod detector;
pub mod indicator;
pub mod output;
pub mod pidfile;
pub mod reset;
pub mod scheduler;

use std::path::Path;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, DetectorConfig, ResetPolicy};
pub use detector::{
    CommandDetector, Debouncer, Detection, DetectionError, PresenceSource, Sample, ScriptedSource,
};
pub use indicator::{IndicatorState, RenderedPayload, Renderer, Severity, SharedIndicator, Update};
pub use output::{JsonFileSink, MemorySink, OutputError, OutputSink};
pub use pidfile::{PidFile, PidFileError};
pub use reset::{trigger_channel, ListenerExit, ResetListener, Trigger};
pub use scheduler::{Scheduler, SchedulerTiming, Tick};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The waybar module definition that reads the published payload.
pub fn waybar_module_snippet(output_path: &Path) -> String {
    format!(
        r#""custom/eyes": {{
  "exec": "cat {}",
  "interval": 5,
  "return-type": "json",
  "on-click": "waybar-eyes reset"
}},"#,
        output_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waybar_snippet_contents() {
        let snippet = waybar_module_snippet(Path::new("/home/me/.cache/waybar-eyes.json"));
        assert!(snippet.contains("custom/eyes"));
        assert!(snippet.contains("cat /home/me/.cache/waybar-eyes.json"));
        assert!(snippet.contains(r#""return-type": "json""#));
        assert!(snippet.contains("waybar-eyes reset"));
    }
}
