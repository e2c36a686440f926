use serde_json::{json, Map, Value};

use crate::{
    AudioLayer, ChatBubbleLayer, ChatStyle, DualPanelLayout, Frame, Layer, LayerKind, ObjectFit,
    Position, RedditCardLayer, Size, TextLayer, TimelineError, VideoLayer,
};

/// A starting point for a project: default layers plus optional derived props.
pub trait Template: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn default_duration_seconds(&self) -> u32 {
        30
    }

    fn create_default_layers(&self, total_frames: Frame) -> Vec<Layer>;

    /// Extra preview props computed from the layers.
    fn layers_to_props(&self, _layers: &[Layer], _pip_threshold: f32) -> Map<String, Value> {
        Map::new()
    }

    /// Composition length (seconds) implied by the layers, when the template
    /// sizes itself to its content.
    fn calculate_duration(&self, _layers: &[Layer], _fps: u32) -> Option<u32> {
        None
    }

    /// Panel roles for templates with a split-screen / picture-in-picture layout.
    fn dual_panel_layout(&self) -> Option<DualPanelLayout> {
        None
    }
}

pub struct BlankTemplate;

impl Template for BlankTemplate {
    fn id(&self) -> &'static str {
        "blank"
    }

    fn name(&self) -> &'static str {
        "Blank"
    }

    fn create_default_layers(&self, _total_frames: Frame) -> Vec<Layer> {
        Vec::new()
    }
}

pub struct SplitScreenTemplate;

impl SplitScreenTemplate {
    pub const TOP_ID: &'static str = "top-video";
    pub const BOTTOM_ID: &'static str = "bottom-video";
    pub const DIVIDER_ID: &'static str = "divider";
}

fn placeholder_video(src: &str) -> LayerKind {
    LayerKind::Video(VideoLayer {
        src: src.to_string(),
        volume: 1.0,
        r#loop: true,
        playback_rate: 1.0,
        object_fit: ObjectFit::Cover,
        fade_in: 0,
        fade_out: 0,
    })
}

impl Template for SplitScreenTemplate {
    fn id(&self) -> &'static str {
        "split-screen"
    }

    fn name(&self) -> &'static str {
        "Split Screen"
    }

    fn create_default_layers(&self, total_frames: Frame) -> Vec<Layer> {
        let end = total_frames.max(1);
        let top = Layer::new("Top Video", 0, end, placeholder_video(""))
            .with_id(Self::TOP_ID)
            .with_geometry(Position::new(0.0, 0.0), Size::new(100.0, 50.0));
        let mut bottom = Layer::new("Bottom Video", 0, end, placeholder_video(""))
            .with_id(Self::BOTTOM_ID)
            .with_geometry(Position::new(0.0, 50.0), Size::new(100.0, 50.0));
        if let LayerKind::Video(video) = &mut bottom.kind {
            video.volume = 0.0;
        }
        let divider = Layer::new(
            "Divider",
            0,
            end,
            LayerKind::Text(TextLayer {
                content: String::new(),
                background_color: Some("#FFFFFF".to_string()),
                shadow: None,
                ..TextLayer::default()
            }),
        )
        .with_id(Self::DIVIDER_ID)
        .with_geometry(Position::new(0.0, 49.5), Size::new(100.0, 1.0));
        vec![top, bottom, divider]
    }

    fn layers_to_props(&self, layers: &[Layer], pip_threshold: f32) -> Map<String, Value> {
        let mut props = Map::new();
        if let Some(mode) = self
            .dual_panel_layout()
            .and_then(|layout| layout.infer(layers, pip_threshold))
        {
            props.insert("layoutMode".to_string(), json!(mode));
        }
        props
    }

    fn dual_panel_layout(&self) -> Option<DualPanelLayout> {
        Some(DualPanelLayout {
            primary_id: Self::TOP_ID.to_string(),
            secondary_id: Self::BOTTOM_ID.to_string(),
            divider_id: Some(Self::DIVIDER_ID.to_string()),
        })
    }
}

/// Fake text-message conversation.
pub struct TextStoryTemplate;

impl TextStoryTemplate {
    const MESSAGE_SPAN: Frame = 60;
}

impl Template for TextStoryTemplate {
    fn id(&self) -> &'static str {
        "text-story"
    }

    fn name(&self) -> &'static str {
        "Text Story"
    }

    fn default_duration_seconds(&self) -> u32 {
        20
    }

    fn create_default_layers(&self, total_frames: Frame) -> Vec<Layer> {
        let script = [
            ("did you see what happened?", false),
            ("no?? tell me", true),
            ("you won't believe it", false),
        ];
        script
            .iter()
            .enumerate()
            .filter_map(|(i, (message, is_sender))| {
                let start = i as Frame * Self::MESSAGE_SPAN;
                if start >= total_frames {
                    return None;
                }
                let layer = Layer::new(
                    format!("Message {}", i + 1),
                    start,
                    total_frames,
                    LayerKind::ChatBubble(ChatBubbleLayer {
                        message: message.to_string(),
                        is_sender: *is_sender,
                        chat_style: ChatStyle::Imessage,
                        avatar: None,
                    }),
                )
                .with_geometry(Position::new(5.0, 10.0 + 15.0 * i as f32), Size::new(90.0, 12.0));
                Some(layer)
            })
            .collect()
    }

    fn layers_to_props(&self, layers: &[Layer], _pip_threshold: f32) -> Map<String, Value> {
        let count = layers.iter().filter(|l| l.is_chat_bubble()).count();
        let mut props = Map::new();
        props.insert("messageCount".to_string(), json!(count));
        props
    }

    fn calculate_duration(&self, layers: &[Layer], fps: u32) -> Option<u32> {
        let last_start = layers
            .iter()
            .filter(|l| l.is_chat_bubble())
            .map(|l| l.start_frame)
            .max()?;
        let frames = last_start + Self::MESSAGE_SPAN * 2;
        Some(frames_to_whole_seconds(frames, fps))
    }
}

/// Reddit post read aloud over gameplay footage.
pub struct RedditStoryTemplate;

impl Template for RedditStoryTemplate {
    fn id(&self) -> &'static str {
        "reddit-story"
    }

    fn name(&self) -> &'static str {
        "Reddit Story"
    }

    fn default_duration_seconds(&self) -> u32 {
        60
    }

    fn create_default_layers(&self, total_frames: Frame) -> Vec<Layer> {
        let end = total_frames.max(1);
        let background = Layer::new("Background", 0, end, placeholder_video(""));
        let card = Layer::new(
            "Reddit Post",
            0,
            end.min(150),
            LayerKind::RedditCard(RedditCardLayer {
                title: "What's the strangest thing that happened to you?".to_string(),
                ..RedditCardLayer::default()
            }),
        );
        let voice = Layer::new(
            "Voiceover",
            0,
            end,
            LayerKind::Audio(AudioLayer {
                src: String::new(),
                volume: 1.0,
                r#loop: false,
                fade_in: 0,
                fade_out: 0,
            }),
        );
        vec![background, card, voice]
    }

    fn layers_to_props(&self, layers: &[Layer], _pip_threshold: f32) -> Map<String, Value> {
        let mut props = Map::new();
        if let Some(card) = layers.iter().find_map(Layer::as_reddit_card) {
            props.insert("postTitle".to_string(), json!(card.title));
            props.insert("subreddit".to_string(), json!(card.subreddit));
        }
        props
    }

    /// Sized to the voice-over when one has been generated.
    fn calculate_duration(&self, layers: &[Layer], fps: u32) -> Option<u32> {
        let end = layers
            .iter()
            .filter(|l| l.as_audio().is_some_and(|a| !a.src.is_empty()))
            .map(|l| l.end_frame)
            .max()?;
        Some(frames_to_whole_seconds(end, fps))
    }
}

fn frames_to_whole_seconds(frames: Frame, fps: u32) -> u32 {
    let fps = Frame::from(fps.max(1));
    ((frames.max(0) + fps - 1) / fps) as u32
}

/// Lookup of the templates a project can be created from.
pub struct TemplateRegistry {
    templates: Vec<Box<dyn Template>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateRegistry {
    pub fn empty() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BlankTemplate));
        registry.register(Box::new(SplitScreenTemplate));
        registry.register(Box::new(TextStoryTemplate));
        registry.register(Box::new(RedditStoryTemplate));
        registry
    }

    /// Adds a template, replacing any with the same id.
    pub fn register(&mut self, template: Box<dyn Template>) {
        self.templates.retain(|t| t.id() != template.id());
        self.templates.push(template);
    }

    pub fn get(&self, id: &str) -> Result<&dyn Template, TimelineError> {
        self.templates
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.as_ref())
            .ok_or_else(|| TimelineError::UnknownTemplate(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.iter().map(|t| t.id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Template> {
        self.templates.iter().map(|t| t.as_ref())
    }
}

/// Duration the composition should have for `layers` under `template`,
/// with frame positions read at `fps`.
pub fn template_duration(
    template: &dyn Template,
    layers: &[Layer],
    fps: u32,
    fallback_seconds: u32,
) -> u32 {
    template
        .calculate_duration(layers, fps)
        .filter(|seconds| *seconds > 0)
        .unwrap_or(fallback_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutMode;

    #[test]
    fn builtin_registry_resolves_ids() {
        let registry = TemplateRegistry::builtin();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, ["blank", "split-screen", "text-story", "reddit-story"]);
        assert!(registry.get("split-screen").is_ok());
        assert!(matches!(
            registry.get("nope"),
            Err(TimelineError::UnknownTemplate(id)) if id == "nope"
        ));
    }

    #[test]
    fn default_layers_fit_composition() {
        let registry = TemplateRegistry::builtin();
        for template in registry.iter() {
            let total = 90;
            for layer in template.create_default_layers(total) {
                assert!(layer.start_frame >= 0);
                assert!(layer.start_frame < layer.end_frame);
                assert!(layer.end_frame <= total, "{} overflows", layer.name);
            }
        }
    }

    #[test]
    fn split_screen_reports_layout_mode() {
        let template = SplitScreenTemplate;
        let layers = template.create_default_layers(300);
        let props = template.layers_to_props(&layers, 40.0);
        assert_eq!(props["layoutMode"], json!("splitScreen"));

        let layout = template.dual_panel_layout().unwrap();
        let pip = layout.apply(&layers, LayoutMode::PictureInPicture);
        let props = template.layers_to_props(&pip, 40.0);
        assert_eq!(props["layoutMode"], json!("pictureInPicture"));
    }

    #[test]
    fn reddit_story_sizes_to_voiceover() {
        let template = RedditStoryTemplate;
        let mut layers = template.create_default_layers(1800);
        assert_eq!(template.calculate_duration(&layers, 30), None);

        let voice = layers.iter_mut().find(|l| l.is_audio()).unwrap();
        if let LayerKind::Audio(audio) = &mut voice.kind {
            audio.src = "https://cdn/voice.mp3".to_string();
        }
        voice.end_frame = 301;
        assert_eq!(template.calculate_duration(&layers, 30), Some(11));
        assert_eq!(template_duration(&template, &layers, 30, 60), 11);
        // The same frames last half as long at 60 fps
        assert_eq!(template_duration(&template, &layers, 60, 60), 6);
    }
}
