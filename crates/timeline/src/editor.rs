use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::{
    apply_track_edits, derive_state, layers_to_tracks, reorder_tracks, split_track_at,
    total_frames, BlobUrlSource, DerivedState, EditorConfig, EditorMode, Frame, GeneratedAudio,
    GeneratedImage, HistoryStore, KeyCommand, KeyInput, Layer, LayerPatch, LayerService,
    LayerType, LayoutMode, MediaFile, ObjectUrlSource, PreviewCache, PreviewInputProps,
    PreviewInputs, RedditPost, Result, StalePolicy, Template, TimelineError, TimelineTrack,
    ToolTab,
};

/// Editor generation an async tool call was dispatched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationTicket(pub u64);

impl fmt::Display for GenerationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Successful result of an async tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum ToolOutput {
    UploadedMedia { kind: LayerType, file: MediaFile },
    GeneratedAudio(GeneratedAudio),
    GeneratedImage(GeneratedImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// User-facing message raised by a failed or discarded tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }
}

/// One open project: layer history, cursor, interaction mode, and clipboard.
///
/// Every edit builds the next layer array with [`LayerService`] and commits it
/// as a single history snapshot. Edits that would not change anything are not
/// committed.
pub struct Editor {
    config: EditorConfig,
    history: HistoryStore,
    template_id: String,
    duration_seconds: u32,
    current_frame: Frame,
    mode: EditorMode,
    clipboard: Option<Layer>,
    generation: u64,
    /// Composition length each live snapshot was committed under, by timestamp.
    durations: HashMap<u64, u32>,
    preview_cache: PreviewCache,
    url_source: Box<dyn ObjectUrlSource>,
    notifications: Vec<Notification>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("template_id", &self.template_id)
            .field("duration_seconds", &self.duration_seconds)
            .field("current_frame", &self.current_frame)
            .field("mode", &self.mode)
            .field("layers", &self.history.present().len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Editor {
    /// Starts a project from a template's default layers.
    pub fn new(config: EditorConfig, template: &dyn Template) -> Self {
        let duration_seconds = template.default_duration_seconds();
        let layers = template.create_default_layers(total_frames(duration_seconds, config.fps));
        Self::from_parts(config, template.id(), duration_seconds, layers, 0)
    }

    /// Reopens a saved project as a fresh history with no undo steps.
    pub fn from_parts(
        config: EditorConfig,
        template_id: impl Into<String>,
        duration_seconds: u32,
        layers: Vec<Layer>,
        current_frame: Frame,
    ) -> Self {
        let history = HistoryStore::new(layers).with_limit(config.history_limit);
        let duration_seconds = duration_seconds.max(1);
        let durations = HashMap::from([(history.timestamp(), duration_seconds)]);
        let mut editor = Self {
            config,
            history,
            template_id: template_id.into(),
            duration_seconds,
            current_frame: 0,
            mode: EditorMode::default(),
            clipboard: None,
            generation: 0,
            durations,
            preview_cache: PreviewCache::default(),
            url_source: Box::new(BlobUrlSource),
            notifications: Vec::new(),
        };
        editor.seek_to(current_frame);
        editor
    }

    pub fn with_url_source(mut self, source: Box<dyn ObjectUrlSource>) -> Self {
        self.url_source = source;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn layers(&self) -> &[Layer] {
        self.history.layers()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.history.present().find(id)
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn fps(&self) -> u32 {
        self.config.fps
    }

    pub fn total_frames(&self) -> Frame {
        total_frames(self.duration_seconds, self.config.fps)
    }

    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn selected_layer_id(&self) -> Option<&str> {
        self.mode.selected_layer_id()
    }

    pub fn clipboard(&self) -> Option<&Layer> {
        self.clipboard.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Changes the composition length as one undoable snapshot. Layers
    /// reaching past the new end are clamped in that snapshot. Returns `false`
    /// when the length is unchanged.
    pub fn set_duration(&mut self, seconds: u32) -> bool {
        let seconds = seconds.max(1);
        if seconds == self.duration_seconds {
            return false;
        }
        self.duration_seconds = seconds;
        let total = self.total_frames();
        self.current_frame = self.current_frame.min(total - 1);

        let mut next = self.layers().to_vec();
        for layer in &mut next {
            layer.clamp_to(total);
        }
        tracing::debug!(seconds, "composition duration changed");
        self.commit(next);
        true
    }

    fn service(&self) -> LayerService<'_> {
        LayerService::new(&self.config, self.total_frames())
    }

    fn commit(&mut self, next: Vec<Layer>) {
        self.history.push_state(next);
        self.generation += 1;
        self.durations.insert(self.history.timestamp(), self.duration_seconds);
        let live = self.history.past_len() + self.history.future_len() + 1;
        if self.durations.len() > live {
            let kept: HashSet<u64> = self.history.timestamps().collect();
            self.durations.retain(|timestamp, _| kept.contains(timestamp));
        }
    }

    /// Brings the composition length back to the one the present snapshot
    /// was committed under.
    fn restore_duration(&mut self) {
        if let Some(&seconds) = self.durations.get(&self.history.timestamp()) {
            if seconds != self.duration_seconds {
                self.duration_seconds = seconds;
                self.seek_to(self.current_frame);
            }
        }
    }

    fn commit_and_select(&mut self, (next, id): (Vec<Layer>, String)) -> String {
        self.commit(next);
        self.mode.select(id.clone());
        id
    }

    // Layer management

    pub fn add_text_layer(&mut self) -> String {
        let created = self.service().add_text_layer(self.layers(), self.current_frame);
        self.commit_and_select(created)
    }

    /// Adds a text layer already holding `content`, as one undo step.
    pub fn add_text_layer_with_content(&mut self, content: impl Into<String>) -> String {
        let created = self.service().add_text_layer_with_content(
            self.layers(),
            self.current_frame,
            content,
        );
        self.commit_and_select(created)
    }

    pub fn handle_image_upload(&mut self, file: &MediaFile) -> Result<String> {
        let created = self.service().add_image_layer(
            self.layers(),
            file,
            self.url_source.as_ref(),
            self.current_frame,
        )?;
        Ok(self.commit_and_select(created))
    }

    pub fn handle_audio_upload(&mut self, file: &MediaFile) -> Result<String> {
        let created = self.service().add_audio_layer(
            self.layers(),
            file,
            self.url_source.as_ref(),
            self.current_frame,
        )?;
        Ok(self.commit_and_select(created))
    }

    pub fn handle_video_upload(&mut self, file: &MediaFile) -> Result<String> {
        let created = self.service().add_video_layer(
            self.layers(),
            file,
            self.url_source.as_ref(),
            self.current_frame,
        )?;
        Ok(self.commit_and_select(created))
    }

    pub fn add_generated_audio(&mut self, audio: &GeneratedAudio) -> String {
        let created = self
            .service()
            .add_generated_audio(self.layers(), audio, self.current_frame);
        self.commit_and_select(created)
    }

    pub fn add_generated_image(&mut self, image: &GeneratedImage) -> String {
        let created = self
            .service()
            .add_generated_image(self.layers(), image, self.current_frame);
        self.commit_and_select(created)
    }

    pub fn add_chat_bubble(&mut self, message: &str, is_sender: bool) -> String {
        let created =
            self.service()
                .add_chat_bubble(self.layers(), message, is_sender, self.current_frame);
        self.commit_and_select(created)
    }

    pub fn add_reddit_card(&mut self, post: &RedditPost) -> String {
        let created = self
            .service()
            .add_reddit_card(self.layers(), post, self.current_frame);
        self.commit_and_select(created)
    }

    /// Returns whether anything changed. Unknown ids and patches that leave
    /// the layer as it was are not committed.
    pub fn update_layer(&mut self, id: &str, patch: &LayerPatch) -> Result<bool> {
        match self.service().update_layer(self.layers(), id, patch)? {
            Some(next) => {
                self.commit(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete_layer(&mut self, id: &str) -> bool {
        let Some(next) = self.service().delete_layer(self.layers(), id) else {
            return false;
        };
        self.commit(next);
        self.mode.forget_layer(id);
        true
    }

    pub fn duplicate_layer(&mut self, id: &str) -> Result<String> {
        let source = self
            .layer(id)
            .cloned()
            .ok_or_else(|| TimelineError::LayerNotFound(id.to_string()))?;
        let created = self.service().insert_copy(self.layers(), &source);
        Ok(self.commit_and_select(created))
    }

    pub fn copy_layer(&mut self, id: &str) -> Result<()> {
        let layer = self
            .layer(id)
            .cloned()
            .ok_or_else(|| TimelineError::LayerNotFound(id.to_string()))?;
        self.clipboard = Some(layer);
        Ok(())
    }

    /// Pastes the clipboard layer after its source, or on top if the source is gone.
    pub fn paste(&mut self) -> Option<String> {
        let source = self.clipboard.clone()?;
        let created = self.service().insert_copy(self.layers(), &source);
        Some(self.commit_and_select(created))
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.generation += 1;
        self.restore_duration();
        self.reconcile_mode();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.generation += 1;
        self.restore_duration();
        self.reconcile_mode();
        true
    }

    fn reconcile_mode(&mut self) {
        if let Some(id) = self.mode.selected_layer_id().map(str::to_string) {
            if self.layer(&id).is_none() {
                self.mode.forget_layer(&id);
            }
        }
    }

    // Timeline bindings

    pub fn tracks(&self) -> Vec<TimelineTrack> {
        layers_to_tracks(self.layers())
    }

    /// Applies the timeline widget's edited tracks. Returns whether a snapshot
    /// was committed.
    pub fn on_tracks_change(&mut self, updated_tracks: &[TimelineTrack]) -> bool {
        let total = self.total_frames();
        let touched: HashSet<&str> = updated_tracks.iter().map(|t| t.id.as_str()).collect();
        let mut next = apply_track_edits(self.layers(), updated_tracks);
        for layer in next.iter_mut().filter(|l| touched.contains(l.id.as_str())) {
            layer.clamp_to(total);
        }
        if next.as_slice() == self.layers() {
            return false;
        }
        self.commit(next);
        true
    }

    pub fn on_reorder_tracks(&mut self, from_index: usize, to_index: usize) -> bool {
        let next = reorder_tracks(self.layers(), from_index, to_index);
        if next.as_slice() == self.layers() {
            return false;
        }
        self.commit(next);
        true
    }

    pub fn on_track_select(&mut self, track_id: &str) -> bool {
        self.select_layer(track_id)
    }

    pub fn on_delete_track(&mut self, track_id: &str) -> bool {
        self.delete_layer(track_id)
    }

    /// Razor cut of `id` at `frame`; returns the id of the new tail layer.
    pub fn split_layer_at(&mut self, id: &str, frame: Frame) -> Result<Option<String>> {
        let layer = self
            .layer(id)
            .ok_or_else(|| TimelineError::LayerNotFound(id.to_string()))?;
        if layer.locked {
            return Err(TimelineError::LayerLocked(id.to_string()));
        }
        let Some(tracks) = split_track_at(&self.tracks(), id, frame) else {
            return Ok(None);
        };
        let existing: HashSet<&str> = self.layers().iter().map(|l| l.id.as_str()).collect();
        let cut = tracks
            .iter()
            .find(|t| !existing.contains(t.id.as_str()))
            .map(|t| t.id.clone());
        if self.on_tracks_change(&tracks) {
            Ok(cut)
        } else {
            Ok(None)
        }
    }

    pub fn split_selected_at_playhead(&mut self) -> Result<Option<String>> {
        let Some(id) = self.selected_layer_id().map(str::to_string) else {
            return Ok(None);
        };
        self.split_layer_at(&id, self.current_frame)
    }

    // Cursor and interaction mode

    /// Moves the playhead, clamped to `[0, totalFrames - 1]`.
    pub fn seek_to(&mut self, frame: Frame) {
        self.current_frame = frame.clamp(0, (self.total_frames() - 1).max(0));
    }

    pub fn step(&mut self, delta: Frame) {
        self.seek_to(self.current_frame.saturating_add(delta));
    }

    pub fn select_layer(&mut self, id: &str) -> bool {
        if self.layer(id).is_none() {
            return false;
        }
        self.mode.select(id);
        true
    }

    pub fn start_editing(&mut self) -> bool {
        self.mode.start_editing()
    }

    pub fn clear_selection(&mut self) {
        self.mode.reset();
    }

    pub fn open_tool_panel(&mut self, tab: ToolTab) {
        self.mode.open_tool_panel(tab);
    }

    pub fn toggle_tool_panel(&mut self, tab: ToolTab) {
        self.mode.toggle_tool_panel(tab);
    }

    /// Runs the shortcut bound to `input`. Returns `false` when the key is
    /// not claimed or the command had nothing to act on.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        let Some(command) = KeyCommand::from_input(&input) else {
            return false;
        };
        tracing::trace!(?command, "key command");
        let selected = self.selected_layer_id().map(str::to_string);

        match command {
            KeyCommand::Copy => selected.is_some_and(|id| self.copy_layer(&id).is_ok()),
            KeyCommand::Paste => self.paste().is_some(),
            KeyCommand::Duplicate => selected.is_some_and(|id| self.duplicate_layer(&id).is_ok()),
            KeyCommand::Delete => match selected {
                Some(id) if self.layer(&id).is_some_and(|l| !l.locked) => self.delete_layer(&id),
                _ => false,
            },
            KeyCommand::Undo => self.undo(),
            KeyCommand::Redo => self.redo(),
            KeyCommand::StartEditing => self.start_editing(),
            KeyCommand::Escape => {
                self.mode.reset();
                true
            }
            KeyCommand::StepBackward => {
                self.step(-1);
                true
            }
            KeyCommand::StepForward => {
                self.step(1);
                true
            }
            KeyCommand::JumpToStart => {
                self.seek_to(0);
                true
            }
            KeyCommand::JumpToEnd => {
                self.seek_to(self.total_frames() - 1);
                true
            }
        }
    }

    // Derived views

    pub fn derived(&self) -> DerivedState<'_> {
        derive_state(self.history.layers(), &self.mode, self.current_frame)
    }

    pub fn preview_input_props(&mut self, template: &dyn Template) -> &PreviewInputProps {
        let threshold = self.config.pip_height_threshold;
        let inputs = PreviewInputs {
            layers: self.history.layers(),
            history_timestamp: self.history.timestamp(),
            current_frame: self.current_frame,
            editing_layer_id: self.mode.editing_layer_id(),
            template_id: &self.template_id,
            duration_in_frames: total_frames(self.duration_seconds, self.config.fps),
            fps: self.config.fps,
        };
        self.preview_cache
            .get_or_build(inputs, |layers| template.layers_to_props(layers, threshold))
    }

    pub fn layout_mode(&self, template: &dyn Template) -> Option<LayoutMode> {
        template
            .dual_panel_layout()?
            .infer(self.layers(), self.config.pip_height_threshold)
    }

    /// Rewrites the dual-panel geometry as one snapshot. Returns `false` for
    /// templates without a dual-panel layout or when already in `mode`.
    pub fn switch_layout_mode(&mut self, template: &dyn Template, mode: LayoutMode) -> bool {
        let Some(layout) = template.dual_panel_layout() else {
            return false;
        };
        let next = layout.apply(self.layers(), mode);
        if next.as_slice() == self.layers() {
            return false;
        }
        self.commit(next);
        true
    }

    // Async tool results

    /// Tags an async tool call with the current generation.
    pub fn begin_async(&self) -> GenerationTicket {
        GenerationTicket(self.generation)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Applies a finished tool call as one snapshot and returns the new layer id.
    ///
    /// Under [`StalePolicy::Reject`], a result dispatched before the latest
    /// edit is dropped with a notification.
    pub fn apply_tool_output(
        &mut self,
        ticket: GenerationTicket,
        output: ToolOutput,
    ) -> Result<String> {
        if self.config.stale_policy == StalePolicy::Reject && ticket.0 < self.generation {
            tracing::warn!(%ticket, current = self.generation, "discarding stale tool result");
            self.notifications.push(Notification::info(
                "A tool result arrived after further edits and was discarded",
            ));
            return Err(TimelineError::StaleResult {
                ticket: ticket.0,
                current: self.generation,
            });
        }

        let result = match output {
            ToolOutput::UploadedMedia { kind, file } => match kind {
                LayerType::Image => self.handle_image_upload(&file),
                LayerType::Audio => self.handle_audio_upload(&file),
                LayerType::Video => self.handle_video_upload(&file),
                other => Err(TimelineError::UnsupportedMedia {
                    expected: other,
                    mime_type: file.mime_type.clone(),
                }),
            },
            ToolOutput::GeneratedAudio(audio) => Ok(self.add_generated_audio(&audio)),
            ToolOutput::GeneratedImage(image) => Ok(self.add_generated_image(&image)),
        };
        if let Err(err) = &result {
            self.notifications.push(Notification::error(err.to_string()));
        }
        result
    }

    /// Records a failed tool call. The layers are left untouched.
    pub fn report_tool_failure(&mut self, ticket: GenerationTicket, message: &str) {
        tracing::warn!(%ticket, error = message, "tool call failed");
        self.notifications.push(Notification::error(message));
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Key, Modifiers, SplitScreenTemplate, TemplateRegistry};

    struct FixedUrl;

    impl ObjectUrlSource for FixedUrl {
        fn object_url(&self, file: &MediaFile) -> String {
            format!("blob:test/{}", file.name)
        }
    }

    fn blank_editor() -> Editor {
        let registry = TemplateRegistry::builtin();
        let blank = registry.get("blank").unwrap();
        Editor::new(EditorConfig::default(), blank).with_url_source(Box::new(FixedUrl))
    }

    fn key(key: Key) -> KeyInput {
        KeyInput::new(key, Modifiers::NONE)
    }

    #[test]
    fn new_editor_uses_template_defaults() {
        let editor = Editor::new(EditorConfig::default(), &SplitScreenTemplate);
        assert_eq!(editor.template_id(), "split-screen");
        assert_eq!(editor.total_frames(), 900);
        assert_eq!(editor.layers().len(), 3);
        assert!(!editor.can_undo());
    }

    #[test]
    fn text_layer_lands_at_playhead_and_is_selected() {
        let mut editor = blank_editor();
        editor.seek_to(30);
        let id = editor.add_text_layer();
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.start_frame, layer.end_frame), (30, 120));
        assert_eq!(editor.selected_layer_id(), Some(id.as_str()));
        assert!(editor.derived().show_edit_panel);
    }

    #[test]
    fn spans_are_clamped_to_composition_end() {
        let mut editor = blank_editor();
        editor.seek_to(880);
        let file = MediaFile::new("clip.mp4", "video/mp4");
        let id = editor.handle_video_upload(&file).unwrap();
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.start_frame, layer.end_frame), (880, 900));
        assert_eq!(layer.media_src(), Some("blob:test/clip.mp4"));
        assert_eq!(layer.name, "clip");
    }

    #[test]
    fn wrong_mime_is_rejected_without_commit() {
        let mut editor = blank_editor();
        let file = MediaFile::new("song.mp3", "audio/mpeg");
        assert!(matches!(
            editor.handle_image_upload(&file),
            Err(TimelineError::UnsupportedMedia { .. })
        ));
        assert!(editor.layers().is_empty());
        assert!(!editor.can_undo());
    }

    #[test]
    fn unknown_update_is_not_committed() {
        let mut editor = blank_editor();
        let id = editor.add_text_layer();
        let past = editor.history().past_len();

        assert!(!editor.update_layer("nope", &LayerPatch::new().name("x")).unwrap());
        assert!(!editor.update_layer(&id, &LayerPatch::new()).unwrap());
        assert_eq!(editor.history().past_len(), past);

        assert!(editor.update_layer(&id, &LayerPatch::new().frames(10, 5000)).unwrap());
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.start_frame, layer.end_frame), (10, 900));
    }

    #[test]
    fn delete_key_respects_lock_and_focus() {
        let mut editor = blank_editor();
        let id = editor.add_text_layer();

        assert!(!editor.handle_key(key(Key::Delete).in_text_field()));
        assert!(editor.layer(&id).is_some());

        editor.update_layer(&id, &LayerPatch::new().locked(true)).unwrap();
        editor.select_layer(&id);
        assert!(!editor.handle_key(key(Key::Delete)));
        assert!(editor.layer(&id).is_some());

        editor.update_layer(&id, &LayerPatch::new().locked(false)).unwrap();
        assert!(editor.handle_key(key(Key::Delete)));
        assert!(editor.layer(&id).is_none());
        assert!(editor.mode().is_idle());
        assert!(!editor.handle_key(key(Key::Delete)));
    }

    #[test]
    fn undo_of_add_clears_selection() {
        let mut editor = blank_editor();
        editor.add_text_layer();
        assert!(editor.handle_key(KeyInput::new(Key::Char('z'), Modifiers::COMMAND)));
        assert!(editor.layers().is_empty());
        assert!(editor.selected_layer_id().is_none());
        assert!(editor.can_redo());
        assert!(editor.redo());
        assert_eq!(editor.layers().len(), 1);
    }

    #[test]
    fn copy_paste_inserts_after_source() {
        let mut editor = blank_editor();
        let first = editor.add_text_layer();
        let second = editor.add_text_layer();
        editor.copy_layer(&first).unwrap();
        let pasted = editor.paste().unwrap();

        let ids: Vec<&str> = editor.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, [first.as_str(), pasted.as_str(), second.as_str()]);
        assert_eq!(editor.layer(&pasted).unwrap().name, "Text 1 (copy)");
        assert!(matches!(
            editor.duplicate_layer("missing"),
            Err(TimelineError::LayerNotFound(_))
        ));
    }

    #[test]
    fn split_at_playhead_creates_adjacent_cut() {
        let mut editor = blank_editor();
        let id = editor.add_text_layer();
        editor.seek_to(40);
        let cut = editor.split_selected_at_playhead().unwrap().unwrap();
        assert_eq!(cut, format!("{id}-cut-1"));

        let layers = editor.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!((layers[0].start_frame, layers[0].end_frame), (0, 40));
        assert_eq!((layers[1].start_frame, layers[1].end_frame), (40, 90));
        assert_eq!(layers[0].kind, layers[1].kind);
    }

    #[test]
    fn locked_layer_cannot_be_split() {
        let mut editor = blank_editor();
        let id = editor.add_text_layer();
        editor.update_layer(&id, &LayerPatch::new().locked(true)).unwrap();
        assert!(matches!(
            editor.split_layer_at(&id, 10),
            Err(TimelineError::LayerLocked(_))
        ));
    }

    #[test]
    fn track_edits_are_clamped() {
        let mut editor = blank_editor();
        let id = editor.add_text_layer();
        let mut tracks = editor.tracks();
        tracks[0].start_frame = Some(-20);
        tracks[0].end_frame = Some(10_000);
        assert!(editor.on_tracks_change(&tracks));
        let layer = editor.layer(&id).unwrap();
        assert_eq!((layer.start_frame, layer.end_frame), (0, 900));

        let unchanged = editor.tracks();
        assert!(!editor.on_tracks_change(&unchanged));
    }

    #[test]
    fn seek_and_arrow_keys_stay_in_range() {
        let mut editor = blank_editor();
        editor.seek_to(-5);
        assert_eq!(editor.current_frame(), 0);
        editor.handle_key(key(Key::ArrowLeft));
        assert_eq!(editor.current_frame(), 0);
        editor.handle_key(key(Key::End));
        assert_eq!(editor.current_frame(), 899);
        editor.handle_key(key(Key::ArrowRight));
        assert_eq!(editor.current_frame(), 899);
    }

    #[test]
    fn shrinking_duration_bounds_new_edits() {
        let mut editor = blank_editor();
        editor.seek_to(500);
        assert!(editor.set_duration(10));
        assert!(!editor.set_duration(10));
        assert_eq!(editor.current_frame(), 299);
        let id = editor.add_text_layer();
        assert_eq!(editor.layer(&id).unwrap().end_frame, 300);
    }

    #[test]
    fn shrinking_duration_clamps_existing_layers_in_one_step() {
        let mut editor = blank_editor();
        let long = editor.add_text_layer();
        editor.update_layer(&long, &LayerPatch::new().frames(0, 900)).unwrap();
        editor.seek_to(400);
        let late = editor.add_text_layer();
        let past = editor.history().past_len();

        assert!(editor.set_duration(10));
        assert_eq!(editor.history().past_len(), past + 1);
        let long_layer = editor.layer(&long).unwrap();
        assert_eq!((long_layer.start_frame, long_layer.end_frame), (0, 300));
        let late_layer = editor.layer(&late).unwrap();
        assert_eq!((late_layer.start_frame, late_layer.end_frame), (299, 300));

        // One undo brings back the full-length layers and the old duration
        assert!(editor.undo());
        assert_eq!(editor.duration_seconds(), 30);
        assert_eq!(editor.layer(&long).unwrap().end_frame, 900);
        assert!(editor.redo());
        assert_eq!(editor.duration_seconds(), 10);
        assert_eq!(editor.layer(&long).unwrap().end_frame, 300);
    }

    #[test]
    fn stale_result_rejected_under_reject_policy() {
        let config = EditorConfig {
            stale_policy: StalePolicy::Reject,
            ..EditorConfig::default()
        };
        let mut editor = Editor::from_parts(config, "blank", 30, Vec::new(), 0);
        let ticket = editor.begin_async();
        editor.add_text_layer();

        let audio = GeneratedAudio {
            audio_url: "https://cdn/voice.mp3".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            duration_seconds: None,
        };
        let result = editor.apply_tool_output(ticket, ToolOutput::GeneratedAudio(audio.clone()));
        assert!(matches!(result, Err(TimelineError::StaleResult { .. })));
        assert_eq!(editor.layers().len(), 1);
        assert_eq!(editor.take_notifications().len(), 1);

        let fresh = editor.begin_async();
        let id = editor
            .apply_tool_output(fresh, ToolOutput::GeneratedAudio(audio))
            .unwrap();
        assert_eq!(editor.layer(&id).unwrap().name, "Voiceover (alloy, 1x)");
    }

    #[test]
    fn late_result_applies_by_default() {
        let mut editor = blank_editor();
        let ticket = editor.begin_async();
        editor.add_text_layer();
        let file = MediaFile::new("photo.png", "image/png");
        let id = editor
            .apply_tool_output(ticket, ToolOutput::UploadedMedia { kind: LayerType::Image, file })
            .unwrap();
        assert!(editor.layer(&id).unwrap().is_image());
        assert_eq!(editor.layers().len(), 2);
    }

    #[test]
    fn failure_only_notifies() {
        let mut editor = blank_editor();
        let ticket = editor.begin_async();
        editor.report_tool_failure(ticket, "voice service unavailable");
        assert!(editor.layers().is_empty());
        let notes = editor.take_notifications();
        assert_eq!(notes, [Notification::error("voice service unavailable")]);
        assert!(editor.notifications().is_empty());
    }

    #[test]
    fn layout_switch_is_one_snapshot() {
        let template = SplitScreenTemplate;
        let mut editor = Editor::new(EditorConfig::default(), &template);
        assert_eq!(editor.layout_mode(&template), Some(LayoutMode::SplitScreen));

        assert!(editor.switch_layout_mode(&template, LayoutMode::PictureInPicture));
        assert_eq!(editor.layout_mode(&template), Some(LayoutMode::PictureInPicture));
        assert_eq!(editor.history().past_len(), 1);
        assert!(!editor.switch_layout_mode(&template, LayoutMode::PictureInPicture));

        let tag = editor.preview_input_props(&template).render_tag;
        let props = editor.preview_input_props(&template);
        assert_eq!(props.render_tag, tag);
        assert_eq!(props.template_props["layoutMode"], "pictureInPicture");
    }
}
