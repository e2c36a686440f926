use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use reel_jobs::{apply_tool_event, upload_task, ToolHandle, ToolKind, ToolSpec};
use reel_timeline::{
    Editor, Frame, KeyInput, LayerPatch, LayoutMode, Notification, RedditPost, Template,
};

/// Placeholder id that refers to the layer most recently created by the script.
pub const LAST_CREATED: &str = "$last";

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// One step of an edit script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    Seek {
        frame: Frame,
    },
    AddText {
        #[serde(default)]
        content: Option<String>,
    },
    AddChatBubble {
        message: String,
        #[serde(default, rename = "isSender")]
        is_sender: bool,
    },
    AddRedditCard {
        post: RedditPost,
    },
    Upload {
        path: PathBuf,
        #[serde(default, rename = "durationSeconds")]
        duration_seconds: Option<f64>,
    },
    Update {
        id: String,
        patch: LayerPatch,
    },
    Delete {
        id: String,
    },
    Duplicate {
        id: String,
    },
    Select {
        id: String,
    },
    Split {
        id: String,
        frame: Frame,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    Key {
        input: KeyInput,
    },
    Undo,
    Redo,
    Layout {
        mode: LayoutMode,
    },
    SetDuration {
        seconds: u32,
    },
}

#[derive(Debug, Default)]
pub struct ScriptOutcome {
    /// Ops that changed something.
    pub applied: usize,
    pub created: Vec<String>,
    pub notifications: Vec<Notification>,
}

pub fn parse_script(raw: &str) -> Result<Vec<EditOp>> {
    serde_json::from_str(raw).context("parsing edit script")
}

/// Runs `ops` against `editor` in order. Uploads go through the tool runtime
/// and land when their result arrives.
pub fn run_script(
    editor: &mut Editor,
    template: &dyn Template,
    tools: &ToolHandle,
    ops: Vec<EditOp>,
) -> Result<ScriptOutcome> {
    let mut outcome = ScriptOutcome::default();
    for (index, op) in ops.into_iter().enumerate() {
        debug!(index, ?op, "edit op");
        let changed = apply_op(editor, template, tools, op, &mut outcome)
            .with_context(|| format!("edit op #{index}"))?;
        if changed {
            outcome.applied += 1;
        }
    }
    outcome.notifications.extend(editor.take_notifications());
    info!(
        applied = outcome.applied,
        created = outcome.created.len(),
        layers = editor.layers().len(),
        "edit script finished"
    );
    Ok(outcome)
}

fn resolve<'a>(id: &'a str, outcome: &'a ScriptOutcome) -> &'a str {
    if id == LAST_CREATED {
        outcome.created.last().map(String::as_str).unwrap_or(id)
    } else {
        id
    }
}

fn apply_op(
    editor: &mut Editor,
    template: &dyn Template,
    tools: &ToolHandle,
    op: EditOp,
    outcome: &mut ScriptOutcome,
) -> Result<bool> {
    let created = match op {
        EditOp::Seek { frame } => {
            editor.seek_to(frame);
            return Ok(true);
        }
        EditOp::AddText { content } => Some(match content {
            Some(content) => editor.add_text_layer_with_content(content),
            None => editor.add_text_layer(),
        }),
        EditOp::AddChatBubble { message, is_sender } => {
            Some(editor.add_chat_bubble(&message, is_sender))
        }
        EditOp::AddRedditCard { post } => Some(editor.add_reddit_card(&post)),
        EditOp::Upload {
            path,
            duration_seconds,
        } => {
            let spec = ToolSpec {
                kind: ToolKind::Upload,
                ticket: editor.begin_async(),
                label: format!("upload {}", path.display()),
            };
            tools.submit(spec, upload_task(path, duration_seconds))?;
            match tools.recv_finished(UPLOAD_TIMEOUT) {
                Some(event) => apply_tool_event(editor, event),
                None => {
                    warn!("upload did not finish in time");
                    None
                }
            }
        }
        EditOp::Update { id, patch } => {
            let id = resolve(&id, outcome).to_string();
            return Ok(editor.update_layer(&id, &patch)?);
        }
        EditOp::Delete { id } => {
            let id = resolve(&id, outcome).to_string();
            return Ok(editor.delete_layer(&id));
        }
        EditOp::Duplicate { id } => {
            let id = resolve(&id, outcome).to_string();
            Some(editor.duplicate_layer(&id)?)
        }
        EditOp::Select { id } => {
            let id = resolve(&id, outcome).to_string();
            return Ok(editor.select_layer(&id));
        }
        EditOp::Split { id, frame } => {
            let id = resolve(&id, outcome).to_string();
            editor.split_layer_at(&id, frame)?
        }
        EditOp::Reorder { from, to } => return Ok(editor.on_reorder_tracks(from, to)),
        EditOp::Key { input } => return Ok(editor.handle_key(input)),
        EditOp::Undo => return Ok(editor.undo()),
        EditOp::Redo => return Ok(editor.redo()),
        EditOp::Layout { mode } => return Ok(editor.switch_layout_mode(template, mode)),
        EditOp::SetDuration { seconds } => return Ok(editor.set_duration(seconds)),
    };

    match created {
        Some(id) => {
            outcome.created.push(id);
            Ok(true)
        }
        None => Ok(false),
    }
}
