use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    clamp_frame_range, seconds_to_frames, AudioLayer, ChatBubbleLayer, ChatStyle, EditorConfig,
    Frame, ImageLayer, Layer, LayerKind, LayerPatch, LayerType, ObjectFit, RedditCardLayer,
    TextLayer, TimelineError, VideoLayer,
};

/// A file handed over by the upload primitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub name: String,
    /// MIME type as reported by the picker; empty when unknown.
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    /// Media length when the uploader could probe it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: 0,
            duration_seconds: None,
            local_path: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// File name without extension, used as the layer name.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }

    fn accepts(&self, expected: LayerType) -> bool {
        if self.mime_type.is_empty() {
            return true;
        }
        let prefix = match expected {
            LayerType::Image => "image/",
            LayerType::Audio => "audio/",
            LayerType::Video => "video/",
            _ => return false,
        };
        self.mime_type.starts_with(prefix)
    }
}

/// Turns an uploaded file into a URL the preview player can load.
pub trait ObjectUrlSource: Send + Sync {
    fn object_url(&self, file: &MediaFile) -> String;
}

/// Produces `blob:` style URLs, one per call.
#[derive(Debug, Clone, Default)]
pub struct BlobUrlSource;

impl ObjectUrlSource for BlobUrlSource {
    fn object_url(&self, _file: &MediaFile) -> String {
        format!("blob:reel/{}", Uuid::new_v4())
    }
}

/// Uses the file's local path when it has one (headless use).
#[derive(Debug, Clone, Default)]
pub struct FileUrlSource;

impl ObjectUrlSource for FileUrlSource {
    fn object_url(&self, file: &MediaFile) -> String {
        match &file.local_path {
            Some(path) => format!("file://{}", path.display()),
            None => BlobUrlSource.object_url(file),
        }
    }
}

/// Result payload of the text-to-speech tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAudio {
    pub audio_url: String,
    pub voice: String,
    pub speed: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// Result payload of the image generation tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_url: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub title: String,
    pub subreddit: String,
    pub username: String,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub body: Option<String>,
}

/// Builds candidate layer arrays for every creation, mutation, and deletion.
///
/// Every method is pure: it reads the current collection and returns the next
/// one. Committing to history and tracking selection belong to the caller.
pub struct LayerService<'a> {
    config: &'a EditorConfig,
    total_frames: Frame,
}

impl<'a> LayerService<'a> {
    pub fn new(config: &'a EditorConfig, total_frames: Frame) -> Self {
        Self {
            config,
            total_frames,
        }
    }

    pub fn total_frames(&self) -> Frame {
        self.total_frames
    }

    fn span_from(&self, start: Frame, span: Frame) -> (Frame, Frame) {
        clamp_frame_range(start, start + span.max(1), self.total_frames)
    }

    fn append(&self, layers: &[Layer], layer: Layer) -> (Vec<Layer>, String) {
        let id = layer.id.clone();
        let mut next = Vec::with_capacity(layers.len() + 1);
        next.extend_from_slice(layers);
        next.push(layer);
        (next, id)
    }

    pub fn add_text_layer(&self, layers: &[Layer], current_frame: Frame) -> (Vec<Layer>, String) {
        self.append_text(layers, current_frame, TextLayer::default())
    }

    /// Same as [`Self::add_text_layer`] with `content` in place of the
    /// placeholder text.
    pub fn add_text_layer_with_content(
        &self,
        layers: &[Layer],
        current_frame: Frame,
        content: impl Into<String>,
    ) -> (Vec<Layer>, String) {
        let text = TextLayer {
            content: content.into(),
            ..TextLayer::default()
        };
        self.append_text(layers, current_frame, text)
    }

    fn append_text(
        &self,
        layers: &[Layer],
        current_frame: Frame,
        text: TextLayer,
    ) -> (Vec<Layer>, String) {
        let (start, end) = self.span_from(current_frame, self.config.text_span);
        let name = format!("Text {}", count_of(layers, LayerType::Text) + 1);
        self.append(layers, Layer::new(name, start, end, LayerKind::Text(text)))
    }

    pub fn add_image_layer(
        &self,
        layers: &[Layer],
        file: &MediaFile,
        urls: &dyn ObjectUrlSource,
        current_frame: Frame,
    ) -> Result<(Vec<Layer>, String), TimelineError> {
        check_media(file, LayerType::Image)?;
        let (start, end) = self.span_from(current_frame, self.config.image_span);
        let kind = LayerKind::Image(ImageLayer {
            src: urls.object_url(file),
            object_fit: ObjectFit::Cover,
            crop: None,
            is_background: false,
        });
        Ok(self.append(layers, Layer::new(file.stem(), start, end, kind)))
    }

    pub fn add_audio_layer(
        &self,
        layers: &[Layer],
        file: &MediaFile,
        urls: &dyn ObjectUrlSource,
        current_frame: Frame,
    ) -> Result<(Vec<Layer>, String), TimelineError> {
        check_media(file, LayerType::Audio)?;
        let span = self.media_span(file.duration_seconds, self.config.audio_span);
        let (start, end) = self.span_from(current_frame, span);
        let kind = LayerKind::Audio(AudioLayer {
            src: urls.object_url(file),
            volume: 1.0,
            r#loop: false,
            fade_in: 0,
            fade_out: 0,
        });
        Ok(self.append(layers, Layer::new(file.stem(), start, end, kind)))
    }

    pub fn add_video_layer(
        &self,
        layers: &[Layer],
        file: &MediaFile,
        urls: &dyn ObjectUrlSource,
        current_frame: Frame,
    ) -> Result<(Vec<Layer>, String), TimelineError> {
        check_media(file, LayerType::Video)?;
        let span = self.media_span(file.duration_seconds, self.config.video_span);
        let (start, end) = self.span_from(current_frame, span);
        let kind = LayerKind::Video(VideoLayer {
            src: urls.object_url(file),
            volume: 1.0,
            r#loop: false,
            playback_rate: 1.0,
            object_fit: ObjectFit::Cover,
            fade_in: 0,
            fade_out: 0,
        });
        Ok(self.append(layers, Layer::new(file.stem(), start, end, kind)))
    }

    pub fn add_generated_audio(
        &self,
        layers: &[Layer],
        audio: &GeneratedAudio,
        current_frame: Frame,
    ) -> (Vec<Layer>, String) {
        let span = self.media_span(audio.duration_seconds, self.config.audio_span);
        let (start, end) = self.span_from(current_frame, span);
        let kind = LayerKind::Audio(AudioLayer {
            src: audio.audio_url.clone(),
            volume: 1.0,
            r#loop: false,
            fade_in: 0,
            fade_out: 0,
        });
        let name = format!("Voiceover ({}, {}x)", audio.voice, audio.speed);
        self.append(layers, Layer::new(name, start, end, kind))
    }

    pub fn add_generated_image(
        &self,
        layers: &[Layer],
        image: &GeneratedImage,
        current_frame: Frame,
    ) -> (Vec<Layer>, String) {
        let (start, end) = self.span_from(current_frame, self.config.image_span);
        let kind = LayerKind::Image(ImageLayer {
            src: image.image_url.clone(),
            object_fit: ObjectFit::Cover,
            crop: None,
            is_background: false,
        });
        let name: String = image.prompt.chars().take(32).collect();
        let name = if name.is_empty() { "Generated image".to_string() } else { name };
        self.append(layers, Layer::new(name, start, end, kind))
    }

    pub fn add_chat_bubble(
        &self,
        layers: &[Layer],
        message: &str,
        is_sender: bool,
        current_frame: Frame,
    ) -> (Vec<Layer>, String) {
        let (start, end) = self.span_from(current_frame, self.config.chat_bubble_span);
        let kind = LayerKind::ChatBubble(ChatBubbleLayer {
            message: message.to_string(),
            is_sender,
            chat_style: ChatStyle::Imessage,
            avatar: None,
        });
        let name = format!("Message {}", count_of(layers, LayerType::ChatBubble) + 1);
        self.append(layers, Layer::new(name, start, end, kind))
    }

    pub fn add_reddit_card(
        &self,
        layers: &[Layer],
        post: &RedditPost,
        current_frame: Frame,
    ) -> (Vec<Layer>, String) {
        let (start, end) = self.span_from(current_frame, self.config.reddit_card_span);
        let kind = LayerKind::RedditCard(RedditCardLayer {
            title: post.title.clone(),
            subreddit: post.subreddit.clone(),
            username: post.username.clone(),
            upvotes: post.upvotes,
            comments: post.comments,
            body: post.body.clone(),
            ..RedditCardLayer::default()
        });
        self.append(layers, Layer::new("Reddit Post", start, end, kind))
    }

    /// Shallow-merges `patch` into the layer with `id`.
    ///
    /// Returns `Ok(None)` when nothing would change: no layer has that id, or
    /// the merged layer equals the current one.
    pub fn update_layer(
        &self,
        layers: &[Layer],
        id: &str,
        patch: &LayerPatch,
    ) -> Result<Option<Vec<Layer>>, TimelineError> {
        let Some(index) = layers.iter().position(|l| l.id == id) else {
            tracing::debug!(layer = id, "update for unknown layer ignored");
            return Ok(None);
        };
        let mut updated = patch.apply_to(&layers[index])?;
        updated.clamp_to(self.total_frames);
        if updated == layers[index] {
            return Ok(None);
        }
        let mut next = layers.to_vec();
        next[index] = updated;
        Ok(Some(next))
    }

    /// Removes the layer with `id`; `None` when no such layer exists.
    pub fn delete_layer(&self, layers: &[Layer], id: &str) -> Option<Vec<Layer>> {
        if !layers.iter().any(|l| l.id == id) {
            return None;
        }
        Some(layers.iter().filter(|l| l.id != id).cloned().collect())
    }

    /// Inserts a copy of `source` right after the layer it was copied from,
    /// or at the top when that layer is gone.
    pub fn insert_copy(&self, layers: &[Layer], source: &Layer) -> (Vec<Layer>, String) {
        let mut copy = source.clone();
        copy.id = crate::new_layer_id(source.layer_type());
        copy.name = format!("{} (copy)", source.name);
        copy.clamp_to(self.total_frames);
        let id = copy.id.clone();

        let mut next = layers.to_vec();
        match next.iter().position(|l| l.id == source.id) {
            Some(index) => next.insert(index + 1, copy),
            None => next.push(copy),
        }
        (next, id)
    }

    fn media_span(&self, duration_seconds: Option<f64>, fallback: Frame) -> Frame {
        match duration_seconds {
            Some(seconds) if seconds > 0.0 => seconds_to_frames(seconds, self.config.fps),
            _ => fallback,
        }
    }
}

fn count_of(layers: &[Layer], layer_type: LayerType) -> usize {
    layers.iter().filter(|l| l.layer_type() == layer_type).count()
}

fn check_media(file: &MediaFile, expected: LayerType) -> Result<(), TimelineError> {
    if file.accepts(expected) {
        Ok(())
    } else {
        Err(TimelineError::UnsupportedMedia {
            expected,
            mime_type: file.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedUrl;

    impl ObjectUrlSource for FixedUrl {
        fn object_url(&self, file: &MediaFile) -> String {
            format!("blob:test/{}", file.name)
        }
    }

    fn service(config: &EditorConfig) -> LayerService<'_> {
        LayerService::new(config, 300)
    }

    #[test]
    fn text_layer_spans_default_from_playhead() {
        let config = EditorConfig::default();
        let (layers, id) = service(&config).add_text_layer(&[], 30);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].id, id);
        assert_eq!((layers[0].start_frame, layers[0].end_frame), (30, 120));
        assert_eq!(layers[0].name, "Text 1");
    }

    #[test]
    fn text_layer_with_content_keeps_default_styling() {
        let config = EditorConfig::default();
        let existing = service(&config).add_text_layer(&[], 0).0;
        let (layers, id) = service(&config).add_text_layer_with_content(&existing, 30, "Hi");
        let text = layers[1].as_text().unwrap();
        assert_eq!(layers[1].id, id);
        assert_eq!(layers[1].name, "Text 2");
        assert_eq!(text.content, "Hi");
        assert_eq!(text.font_family, TextLayer::default().font_family);
    }

    #[test]
    fn text_layer_near_end_is_clamped() {
        let config = EditorConfig::default();
        let (layers, _) = service(&config).add_text_layer(&[], 250);
        assert_eq!((layers[0].start_frame, layers[0].end_frame), (250, 300));
    }

    #[test]
    fn video_upload_uses_probed_duration() {
        let config = EditorConfig::default();
        let file = MediaFile::new("beach.mp4", "video/mp4").with_duration(2.5);
        let (layers, _) = service(&config)
            .add_video_layer(&[], &file, &FixedUrl, 10)
            .unwrap();
        let layer = &layers[0];
        assert_eq!((layer.start_frame, layer.end_frame), (10, 85));
        assert_eq!(layer.name, "beach");
        assert_eq!(layer.as_video().unwrap().src, "blob:test/beach.mp4");
    }

    #[test]
    fn upload_with_wrong_mime_is_rejected() {
        let config = EditorConfig::default();
        let file = MediaFile::new("song.mp3", "audio/mpeg");
        let err = service(&config)
            .add_image_layer(&[], &file, &FixedUrl, 0)
            .unwrap_err();
        assert!(matches!(err, TimelineError::UnsupportedMedia { expected: LayerType::Image, .. }));
    }

    #[test]
    fn update_unknown_or_identical_is_noop() {
        let config = EditorConfig::default();
        let svc = service(&config);
        let (layers, id) = svc.add_text_layer(&[], 0);

        assert!(svc
            .update_layer(&layers, "missing", &LayerPatch::new().visible(false))
            .unwrap()
            .is_none());
        assert!(svc
            .update_layer(&layers, &id, &LayerPatch::new().visible(true))
            .unwrap()
            .is_none());

        let next = svc
            .update_layer(&layers, &id, &LayerPatch::new().visible(false))
            .unwrap()
            .unwrap();
        assert!(!next[0].visible);
    }

    #[test]
    fn update_clamps_frames_to_composition() {
        let config = EditorConfig::default();
        let svc = service(&config);
        let (layers, id) = svc.add_text_layer(&[], 0);
        let next = svc
            .update_layer(&layers, &id, &LayerPatch::new().frames(-20, 999))
            .unwrap()
            .unwrap();
        assert_eq!((next[0].start_frame, next[0].end_frame), (0, 300));
    }

    #[test]
    fn copy_lands_after_source_with_fresh_id() {
        let config = EditorConfig::default();
        let svc = service(&config);
        let (layers, first) = svc.add_text_layer(&[], 0);
        let (layers, _) = svc.add_chat_bubble(&layers, "hi", true, 0);
        let source = layers[0].clone();

        let (next, copy_id) = svc.insert_copy(&layers, &source);
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].id, first);
        assert_eq!(next[1].id, copy_id);
        assert_ne!(copy_id, first);
        assert_eq!(next[1].name, "Text 1 (copy)");
        assert!(next[2].is_chat_bubble());
    }

    #[test]
    fn generated_audio_becomes_named_audio_layer() {
        let config = EditorConfig::default();
        let audio = GeneratedAudio {
            audio_url: "https://cdn/voice.mp3".to_string(),
            voice: "nova".to_string(),
            speed: 1.25,
            duration_seconds: Some(4.0),
        };
        let (layers, _) = service(&config).add_generated_audio(&[], &audio, 0);
        assert_eq!(layers[0].end_frame, 120);
        assert_eq!(layers[0].as_audio().unwrap().src, "https://cdn/voice.mp3");
        assert!(layers[0].name.contains("nova"));
    }
}
