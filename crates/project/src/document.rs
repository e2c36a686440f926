use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use reel_timeline::{
    new_layer_id, template_duration, total_frames, Editor, EditorConfig, Frame, Layer,
    TemplateRegistry,
};

use crate::ProjectError;

/// Editor state as stored with a saved project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProps {
    #[serde(default)]
    pub layers: Vec<Layer>,
    /// Composition length in whole seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub current_frame: Frame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

/// A saved project: `{title, templateId, props, projectVidUrl}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub title: String,
    pub template_id: String,
    pub props: ProjectProps,
    /// Last rendered output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_vid_url: Option<String>,
}

impl ProjectDocument {
    pub fn from_editor(editor: &Editor, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            template_id: editor.template_id().to_string(),
            props: ProjectProps {
                layers: editor.layers().to_vec(),
                duration: Some(editor.duration_seconds()),
                current_frame: editor.current_frame(),
                template_id: Some(editor.template_id().to_string()),
            },
            project_vid_url: None,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ProjectError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let raw = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let io_err = |source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(path, self.to_json_pretty()?).map_err(io_err)?;
        tracing::debug!(path = %path.display(), layers = self.props.layers.len(), "project saved");
        Ok(())
    }

    /// Reopens the project in an editor with a single-entry history.
    ///
    /// The template must be known. A missing duration comes from the template,
    /// sized to the layers when the template does that. Layers are clamped to
    /// the composition and duplicate ids get fresh ones.
    pub fn into_editor(
        self,
        config: EditorConfig,
        registry: &TemplateRegistry,
    ) -> Result<Editor, ProjectError> {
        let template_id = self.props.template_id.as_deref().unwrap_or(&self.template_id);
        let template = registry.get(template_id)?;
        let duration = match self.props.duration {
            Some(seconds) if seconds > 0 => seconds,
            _ => template_duration(
                template,
                &self.props.layers,
                config.fps,
                template.default_duration_seconds(),
            ),
        };
        let layers = normalize_layers(self.props.layers, total_frames(duration, config.fps));
        Ok(Editor::from_parts(
            config,
            template.id(),
            duration,
            layers,
            self.props.current_frame,
        ))
    }
}

fn normalize_layers(mut layers: Vec<Layer>, total: Frame) -> Vec<Layer> {
    let mut seen = HashSet::new();
    for layer in &mut layers {
        layer.clamp_to(total);
        if !seen.insert(layer.id.clone()) {
            let fresh = new_layer_id(layer.layer_type());
            tracing::warn!(duplicate = %layer.id, %fresh, "re-keying duplicate layer id");
            layer.id = fresh.clone();
            seen.insert(fresh);
        }
    }
    layers
}

/// Payload handed to the renderer to export a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub template_id: String,
    pub layers: Vec<Layer>,
    pub duration_in_frames: Frame,
    pub fps: u32,
    pub title: String,
}

impl RenderRequest {
    pub fn from_editor(editor: &Editor, title: impl Into<String>) -> Self {
        Self {
            template_id: editor.template_id().to_string(),
            layers: editor.layers().to_vec(),
            duration_in_frames: editor.total_frames(),
            fps: editor.fps(),
            title: title.into(),
        }
    }
}
