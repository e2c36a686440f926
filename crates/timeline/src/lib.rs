use thiserror::Error;

mod layer;
pub use layer::*;
mod patch;
pub use patch::*;
mod history;
pub use history::*;
mod config;
pub use config::*;
mod service;
pub use service::*;
mod tracks;
pub use tracks::*;
mod interaction;
pub use interaction::*;
mod derived;
pub use derived::*;
mod keyboard;
pub use keyboard::*;
mod templates;
pub use templates::*;
mod editor;
pub use editor::*;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("layer not found: {0}")]
    LayerNotFound(String),
    #[error("layer is locked: {0}")]
    LayerLocked(String),
    #[error("invalid patch for layer {id}: {source}")]
    InvalidPatch {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported media for {expected} upload: {mime_type}")]
    UnsupportedMedia {
        expected: LayerType,
        mime_type: String,
    },
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("stale result from generation {ticket}, editor is at {current}")]
    StaleResult { ticket: u64, current: u64 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Time in frames. Signed so that offsets and out-of-range input can be clamped.
pub type Frame = i64;

/// The composition frame rate used throughout the editor.
pub const DEFAULT_FPS: u32 = 30;

/// Total frame count of a composition of `duration_seconds` at `fps`.
pub fn total_frames(duration_seconds: u32, fps: u32) -> Frame {
    Frame::from(duration_seconds) * Frame::from(fps)
}

/// Converts seconds to whole frames, rounding up so media is never cut short.
pub fn seconds_to_frames(seconds: f64, fps: u32) -> Frame {
    (seconds * f64::from(fps)).ceil() as Frame
}
