//! The presence-to-indicator core.
//!
//! This module contains:
//! - The hysteretic eye counter
//! - Rendering of the counter into the waybar payload
//! - The lock-protected indicator shared by the poll loop and reset listener

pub mod render;
pub mod shared;
pub mod state;

// Re-export commonly used types
pub use render::{RenderedPayload, Renderer, Severity};
pub use shared::{SharedIndicator, Update};
pub use state::IndicatorState;
