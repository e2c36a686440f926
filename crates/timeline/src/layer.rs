use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::Frame;

/// Canvas-relative coordinate, in percent of the composition size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Canvas-relative extent, in percent of the composition size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(100.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EntranceAnimation {
    #[default]
    None,
    Fade,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    Scale,
    Bounce,
    Typewriter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub entrance: EntranceAnimation,
    /// Length of the entrance in frames.
    #[serde(default = "default_entrance_duration")]
    pub entrance_duration: Frame,
}

fn default_entrance_duration() -> Frame {
    15
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextShadow {
    pub color: String,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextOutline {
    pub color: String,
    pub width: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<TextShadow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<TextOutline>,
}

fn default_font_weight() -> u16 {
    700
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            content: "Your text here".to_string(),
            font_family: "Inter".to_string(),
            font_size: 48.0,
            font_weight: default_font_weight(),
            color: "#FFFFFF".to_string(),
            background_color: None,
            text_align: TextAlign::Center,
            shadow: Some(TextShadow {
                color: "rgba(0,0,0,0.5)".to_string(),
                blur: 4.0,
                offset_x: 2.0,
                offset_y: 2.0,
            }),
            outline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ObjectFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

/// Crop rectangle in percent of the source media.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Crop {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    pub src: String,
    #[serde(default)]
    pub object_fit: ObjectFit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
    #[serde(default)]
    pub is_background: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioLayer {
    pub src: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub r#loop: bool,
    /// Fade-in length in frames.
    #[serde(default)]
    pub fade_in: Frame,
    /// Fade-out length in frames.
    #[serde(default)]
    pub fade_out: Frame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoLayer {
    pub src: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub r#loop: bool,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f32,
    #[serde(default)]
    pub object_fit: ObjectFit,
    #[serde(default)]
    pub fade_in: Frame,
    #[serde(default)]
    pub fade_out: Frame,
}

fn default_volume() -> f32 {
    1.0
}

fn default_playback_rate() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ChatStyle {
    #[default]
    Imessage,
    Whatsapp,
    Messenger,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatBubbleLayer {
    pub message: String,
    pub is_sender: bool,
    #[serde(default)]
    pub chat_style: ChatStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Reddit post card. A card with a `body` is rendered as a full story.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedditCardLayer {
    pub title: String,
    pub subreddit: String,
    pub username: String,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub comments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,
    #[serde(default = "default_body_font_size")]
    pub body_font_size: f32,
}

fn default_title_font_size() -> f32 {
    32.0
}

fn default_body_font_size() -> f32 {
    24.0
}

impl Default for RedditCardLayer {
    fn default() -> Self {
        Self {
            title: String::new(),
            subreddit: "r/AskReddit".to_string(),
            username: "u/anonymous".to_string(),
            upvotes: 0,
            comments: 0,
            avatar: None,
            body: None,
            title_font_size: default_title_font_size(),
            body_font_size: default_body_font_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerKind {
    Text(TextLayer),
    Image(ImageLayer),
    Audio(AudioLayer),
    Video(VideoLayer),
    ChatBubble(ChatBubbleLayer),
    RedditCard(RedditCardLayer),
}

/// Fieldless discriminant of [`LayerKind`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LayerType {
    Text,
    Image,
    Audio,
    Video,
    ChatBubble,
    RedditCard,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::ChatBubble => "chatBubble",
            Self::RedditCard => "redditCard",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Audio => "Audio",
            Self::Video => "Video",
            Self::ChatBubble => "Chat Bubble",
            Self::RedditCard => "Reddit Card",
        }
    }

    /// Timeline swatch color in hex.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Text => "#3B82F6",
            Self::Image => "#10B981",
            Self::Audio => "#F59E0B",
            Self::Video => "#EF4444",
            Self::ChatBubble => "#8B5CF6",
            Self::RedditCard => "#FF4500",
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LayerKind {
    pub fn layer_type(&self) -> LayerType {
        match self {
            Self::Text(_) => LayerType::Text,
            Self::Image(_) => LayerType::Image,
            Self::Audio(_) => LayerType::Audio,
            Self::Video(_) => LayerType::Video,
            Self::ChatBubble(_) => LayerType::ChatBubble,
            Self::RedditCard(_) => LayerType::RedditCard,
        }
    }

    /// Placement a freshly created layer of this kind gets on the canvas.
    pub fn default_geometry(&self) -> (Position, Size) {
        match self {
            Self::Text(_) => (Position::new(10.0, 40.0), Size::new(80.0, 20.0)),
            Self::ChatBubble(_) => (Position::new(5.0, 10.0), Size::new(90.0, 15.0)),
            Self::RedditCard(_) => (Position::new(5.0, 30.0), Size::new(90.0, 40.0)),
            Self::Image(_) | Self::Audio(_) | Self::Video(_) => {
                (Position::default(), Size::default())
            }
        }
    }
}

/// A single timed, positioned element of the composition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    pub start_frame: Frame,
    pub end_frame: Frame,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Animation>,
    #[serde(flatten)]
    pub kind: LayerKind,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f32 {
    1.0
}

impl Layer {
    /// Builds a layer with the kind's default geometry and a generated id.
    pub fn new(name: impl Into<String>, start_frame: Frame, end_frame: Frame, kind: LayerKind) -> Self {
        let (position, size) = kind.default_geometry();
        Self {
            id: new_layer_id(kind.layer_type()),
            name: name.into(),
            visible: true,
            locked: false,
            start_frame,
            end_frame,
            position,
            size,
            rotation: 0.0,
            opacity: 1.0,
            animation: None,
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_geometry(mut self, position: Position, size: Size) -> Self {
        self.position = position;
        self.size = size;
        self
    }

    pub fn with_animation(mut self, entrance: EntranceAnimation, duration: Frame) -> Self {
        self.animation = Some(Animation {
            entrance,
            entrance_duration: duration,
        });
        self
    }

    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    pub fn frame_count(&self) -> Frame {
        self.end_frame - self.start_frame
    }

    /// Half-open: `start_frame <= frame < end_frame`.
    pub fn contains_frame(&self, frame: Frame) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }

    /// Pulls the frame range back inside `[0, total_frames]` with at least one frame.
    pub fn clamp_to(&mut self, total_frames: Frame) {
        let (start, end) = clamp_frame_range(self.start_frame, self.end_frame, total_frames);
        self.start_frame = start;
        self.end_frame = end;
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, LayerKind::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, LayerKind::Image(_))
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.kind, LayerKind::Audio(_))
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, LayerKind::Video(_))
    }

    pub fn is_chat_bubble(&self) -> bool {
        matches!(self.kind, LayerKind::ChatBubble(_))
    }

    pub fn is_reddit_card(&self) -> bool {
        matches!(self.kind, LayerKind::RedditCard(_))
    }

    pub fn as_text(&self) -> Option<&TextLayer> {
        match &self.kind {
            LayerKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextLayer> {
        match &mut self.kind {
            LayerKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioLayer> {
        match &self.kind {
            LayerKind::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoLayer> {
        match &self.kind {
            LayerKind::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn as_chat_bubble(&self) -> Option<&ChatBubbleLayer> {
        match &self.kind {
            LayerKind::ChatBubble(bubble) => Some(bubble),
            _ => None,
        }
    }

    pub fn as_reddit_card(&self) -> Option<&RedditCardLayer> {
        match &self.kind {
            LayerKind::RedditCard(card) => Some(card),
            _ => None,
        }
    }

    /// Source URL for media-backed layers.
    pub fn media_src(&self) -> Option<&str> {
        match &self.kind {
            LayerKind::Image(image) => Some(&image.src),
            LayerKind::Audio(audio) => Some(&audio.src),
            LayerKind::Video(video) => Some(&video.src),
            _ => None,
        }
    }
}

pub fn new_layer_id(layer_type: LayerType) -> String {
    format!("{}-{}", layer_type.as_str(), Uuid::new_v4().simple())
}

/// Clamps a range to `[0, total_frames]` keeping `start < end`.
///
/// A composition always has at least one frame; `total_frames < 1` is treated as 1.
pub fn clamp_frame_range(start: Frame, end: Frame, total_frames: Frame) -> (Frame, Frame) {
    let total = total_frames.max(1);
    let start = start.clamp(0, total - 1);
    let end = end.clamp(start + 1, total);
    (start, end)
}
