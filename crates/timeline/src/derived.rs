use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    AudioLayer, ChatBubbleLayer, EditorMode, Frame, ImageLayer, Layer, LayerKind, Position,
    RedditCardLayer, Size, TextLayer, ToolTab, VideoLayer,
};

/// The selected layer narrowed to its variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectedView<'a> {
    Text(&'a TextLayer),
    Image(&'a ImageLayer),
    Audio(&'a AudioLayer),
    Video(&'a VideoLayer),
    ChatBubble(&'a ChatBubbleLayer),
    RedditCard(&'a RedditCardLayer),
}

impl<'a> SelectedView<'a> {
    pub fn of(layer: &'a Layer) -> Self {
        match &layer.kind {
            LayerKind::Text(text) => Self::Text(text),
            LayerKind::Image(image) => Self::Image(image),
            LayerKind::Audio(audio) => Self::Audio(audio),
            LayerKind::Video(video) => Self::Video(video),
            LayerKind::ChatBubble(bubble) => Self::ChatBubble(bubble),
            LayerKind::RedditCard(card) => Self::RedditCard(card),
        }
    }

    pub fn text(&self) -> Option<&'a TextLayer> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&'a ImageLayer> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&'a AudioLayer> {
        match self {
            Self::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    pub fn video(&self) -> Option<&'a VideoLayer> {
        match self {
            Self::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn chat_bubble(&self) -> Option<&'a ChatBubbleLayer> {
        match self {
            Self::ChatBubble(bubble) => Some(bubble),
            _ => None,
        }
    }

    pub fn reddit_card(&self) -> Option<&'a RedditCardLayer> {
        match self {
            Self::RedditCard(card) => Some(card),
            _ => None,
        }
    }
}

/// Everything the editor chrome reads per render.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedState<'a> {
    pub selected_layer: Option<&'a Layer>,
    pub selected_view: Option<SelectedView<'a>>,
    pub show_edit_panel: bool,
    pub current_frame: Frame,
    pub active_tab: Option<ToolTab>,
}

/// Pure projection of the current layers and UI cursor.
pub fn derive_state<'a>(
    layers: &'a [Layer],
    mode: &EditorMode,
    current_frame: Frame,
) -> DerivedState<'a> {
    let selected_layer = mode
        .selected_layer_id()
        .and_then(|id| layers.iter().find(|l| l.id == id));
    let selected_view = selected_layer.map(SelectedView::of);
    DerivedState {
        selected_layer,
        selected_view,
        show_edit_panel: selected_view.is_some(),
        current_frame,
        active_tab: mode.active_tab(),
    }
}

/// Visible layers active at `frame`, bottom to top.
pub fn visible_layers_at(layers: &[Layer], frame: Frame) -> Vec<&Layer> {
    layers
        .iter()
        .filter(|l| l.visible && l.contains_frame(frame))
        .collect()
}

/// Input handed to the preview player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInputProps {
    pub layers: Vec<Layer>,
    pub current_frame: Frame,
    pub editing_layer_id: Option<String>,
    pub template_id: String,
    pub duration_in_frames: Frame,
    pub fps: u32,
    /// Changes whenever any other input changes.
    pub render_tag: u64,
    /// Template-specific fields computed from the layers.
    #[serde(flatten)]
    pub template_props: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct PreviewKey {
    history_timestamp: u64,
    current_frame: Frame,
    editing_layer_id: Option<String>,
    template_id: String,
    duration_in_frames: Frame,
}

/// Memoized preview props: rebuilt only when layers, frame, editing layer, or
/// template change, each rebuild with a new render tag.
#[derive(Debug, Clone, Default)]
pub struct PreviewCache {
    cached: Option<(PreviewKey, PreviewInputProps)>,
    next_tag: u64,
}

/// Inputs of one preview computation.
pub struct PreviewInputs<'a> {
    pub layers: &'a [Layer],
    pub history_timestamp: u64,
    pub current_frame: Frame,
    pub editing_layer_id: Option<&'a str>,
    pub template_id: &'a str,
    pub duration_in_frames: Frame,
    pub fps: u32,
}

impl PreviewCache {
    pub fn get_or_build(
        &mut self,
        inputs: PreviewInputs<'_>,
        template_props: impl FnOnce(&[Layer]) -> Map<String, Value>,
    ) -> &PreviewInputProps {
        let key = PreviewKey {
            history_timestamp: inputs.history_timestamp,
            current_frame: inputs.current_frame,
            editing_layer_id: inputs.editing_layer_id.map(str::to_string),
            template_id: inputs.template_id.to_string(),
            duration_in_frames: inputs.duration_in_frames,
        };
        if self.cached.as_ref().map(|(cached, _)| cached) != Some(&key) {
            self.cached = None;
        }

        let next_tag = &mut self.next_tag;
        let (_, props) = self.cached.get_or_insert_with(|| {
            *next_tag += 1;
            let props = PreviewInputProps {
                layers: inputs.layers.to_vec(),
                current_frame: inputs.current_frame,
                editing_layer_id: key.editing_layer_id.clone(),
                template_id: key.template_id.clone(),
                duration_in_frames: inputs.duration_in_frames,
                fps: inputs.fps,
                render_tag: *next_tag,
                template_props: template_props(inputs.layers),
            };
            (key, props)
        });
        props
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LayoutMode {
    SplitScreen,
    PictureInPicture,
}

/// Layer roles of a dual-panel template.
#[derive(Debug, Clone, PartialEq)]
pub struct DualPanelLayout {
    pub primary_id: String,
    /// The layer whose height decides the layout.
    pub secondary_id: String,
    pub divider_id: Option<String>,
}

impl DualPanelLayout {
    /// Infers the mode from the secondary layer's height; `None` when that
    /// layer is missing.
    pub fn infer(&self, layers: &[Layer], threshold: f32) -> Option<LayoutMode> {
        let secondary = layers.iter().find(|l| l.id == self.secondary_id)?;
        if secondary.size.height < threshold {
            Some(LayoutMode::PictureInPicture)
        } else {
            Some(LayoutMode::SplitScreen)
        }
    }

    /// Rewrites geometry of the two panels and divider visibility for `mode`.
    pub fn apply(&self, layers: &[Layer], mode: LayoutMode) -> Vec<Layer> {
        let (primary, secondary, divider_visible) = match mode {
            LayoutMode::SplitScreen => (
                (Position::new(0.0, 0.0), Size::new(100.0, 50.0)),
                (Position::new(0.0, 50.0), Size::new(100.0, 50.0)),
                true,
            ),
            LayoutMode::PictureInPicture => (
                (Position::new(0.0, 0.0), Size::new(100.0, 100.0)),
                (Position::new(60.0, 5.0), Size::new(35.0, 25.0)),
                false,
            ),
        };

        layers
            .iter()
            .map(|layer| {
                let mut layer = layer.clone();
                if layer.id == self.primary_id {
                    (layer.position, layer.size) = primary;
                } else if layer.id == self.secondary_id {
                    (layer.position, layer.size) = secondary;
                } else if self.divider_id.as_deref() == Some(layer.id.as_str()) {
                    layer.visible = divider_visible;
                }
                layer
            })
            .collect()
    }
}
