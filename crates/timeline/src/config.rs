use serde::{Deserialize, Serialize};

use crate::{Frame, DEFAULT_FPS};

/// What to do with an async tool result that was dispatched before the latest edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Apply it anyway on top of whatever is current.
    #[default]
    LastWriteWins,
    /// Drop it and report a notification.
    Reject,
}

/// Editor tunables. Every field has a default, so partial config files load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub fps: u32,
    pub default_duration_seconds: u32,
    /// Span of a new text layer, in frames.
    pub text_span: Frame,
    pub image_span: Frame,
    pub audio_span: Frame,
    pub video_span: Frame,
    pub chat_bubble_span: Frame,
    pub reddit_card_span: Frame,
    /// Designated-layer height (percent) under which a dual-panel layout reads
    /// as picture-in-picture.
    pub pip_height_threshold: f32,
    /// Maximum undo depth; `None` keeps everything.
    pub history_limit: Option<usize>,
    pub stale_policy: StalePolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            default_duration_seconds: 30,
            text_span: 90,
            image_span: 150,
            audio_span: 300,
            video_span: 300,
            chat_bubble_span: 60,
            reddit_card_span: 150,
            pip_height_threshold: 40.0,
            history_limit: None,
            stale_policy: StalePolicy::LastWriteWins,
        }
    }
}

impl EditorConfig {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
