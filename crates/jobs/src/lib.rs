use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use thiserror::Error;
use uuid::Uuid;

use reel_timeline::{Editor, GenerationTicket, LayerType, MediaFile, ToolOutput};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool runtime stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolKind {
    Upload,
    Voiceover,
    ImageGeneration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub kind: ToolKind,
    /// Editor generation at dispatch.
    pub ticket: GenerationTicket,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolStatus {
    Pending,
    Running,
    Done(ToolOutput),
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    pub id: String,
    pub kind: ToolKind,
    pub ticket: GenerationTicket,
    pub status: ToolStatus,
}

impl ToolEvent {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, ToolStatus::Done(_) | ToolStatus::Failed(_))
    }
}

/// Work run off the editing thread: an upload probe or an AI service call.
pub type ToolTask = Box<dyn FnOnce() -> Result<ToolOutput> + Send + 'static>;

type QueuedTask = (String, ToolSpec, ToolTask);

#[derive(Clone)]
pub struct ToolHandle {
    tx_submit: Sender<QueuedTask>,
    pub rx_events: Receiver<ToolEvent>,
}

pub struct ToolRuntime {
    queue: Arc<Mutex<VecDeque<QueuedTask>>>,
    tx_events: Sender<ToolEvent>,
    closed: Arc<AtomicBool>,
}

impl ToolRuntime {
    /// Spawns `num_workers` worker threads and a feeder. Workers exit once
    /// every handle is dropped and the queue has drained.
    pub fn start(num_workers: usize) -> ToolHandle {
        let (tx_submit, rx_submit) = unbounded::<QueuedTask>();
        let (tx_events, rx_events) = unbounded::<ToolEvent>();

        let runtime = ToolRuntime {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            tx_events,
            closed: Arc::new(AtomicBool::new(false)),
        };
        runtime.spawn_workers(num_workers.max(1));

        // Feeder thread
        {
            let q = runtime.queue.clone();
            let tx_e = runtime.tx_events.clone();
            let closed = runtime.closed.clone();
            thread::spawn(move || loop {
                match rx_submit.recv_timeout(Duration::from_millis(10)) {
                    Ok((id, spec, task)) => {
                        let _ = tx_e.send(ToolEvent {
                            id: id.clone(),
                            kind: spec.kind,
                            ticket: spec.ticket,
                            status: ToolStatus::Pending,
                        });
                        q.lock().push_back((id, spec, task));
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        closed.store(true, Ordering::Release);
                        break;
                    }
                }
            });
        }

        ToolHandle {
            tx_submit,
            rx_events,
        }
    }

    fn spawn_workers(&self, n: usize) {
        for worker in 0..n {
            let q = self.queue.clone();
            let tx_e = self.tx_events.clone();
            let closed = self.closed.clone();
            thread::spawn(move || loop {
                let job = q.lock().pop_front();
                let Some((id, spec, task)) = job else {
                    if closed.load(Ordering::Acquire) && q.lock().is_empty() {
                        tracing::trace!(worker, "tool worker exiting");
                        break;
                    }
                    thread::sleep(Duration::from_millis(10));
                    continue;
                };

                let _ = tx_e.send(ToolEvent {
                    id: id.clone(),
                    kind: spec.kind,
                    ticket: spec.ticket,
                    status: ToolStatus::Running,
                });
                tracing::debug!(worker, job = %id, label = %spec.label, "tool started");

                let status = match panic::catch_unwind(AssertUnwindSafe(task)) {
                    Ok(Ok(output)) => ToolStatus::Done(output),
                    Ok(Err(e)) => {
                        tracing::warn!(job = %id, error = %e, "tool failed");
                        ToolStatus::Failed(format!("{}: {e:#}", spec.label))
                    }
                    Err(_) => {
                        tracing::error!(job = %id, "tool panicked");
                        ToolStatus::Failed(format!("{}: tool panicked", spec.label))
                    }
                };
                let _ = tx_e.send(ToolEvent {
                    id,
                    kind: spec.kind,
                    ticket: spec.ticket,
                    status,
                });
            });
        }
    }
}

impl ToolHandle {
    pub fn submit(&self, spec: ToolSpec, task: ToolTask) -> Result<String, ToolError> {
        let id = Uuid::new_v4().to_string();
        self.tx_submit
            .send((id.clone(), spec, task))
            .map_err(|_| ToolError::Stopped)?;
        Ok(id)
    }

    /// Waits for the next finished tool call, skipping progress events.
    pub fn recv_finished(&self, timeout: Duration) -> Option<ToolEvent> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx_events.recv_timeout(remaining) {
                Ok(event) if event.is_finished() => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Folds a finished tool call into the editor. Returns the id of the layer it
/// created; failures and stale results become editor notifications.
pub fn apply_tool_event(editor: &mut Editor, event: ToolEvent) -> Option<String> {
    match event.status {
        ToolStatus::Done(output) => match editor.apply_tool_output(event.ticket, output) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(job = %event.id, error = %e, "tool result not applied");
                None
            }
        },
        ToolStatus::Failed(message) => {
            editor.report_tool_failure(event.ticket, &message);
            None
        }
        ToolStatus::Pending | ToolStatus::Running => None,
    }
}

/// Guesses a MIME type from the file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}

/// Media kind implied by a MIME type.
pub fn layer_type_for_mime(mime: &str) -> Option<LayerType> {
    match mime.split('/').next()? {
        "image" => Some(LayerType::Image),
        "audio" => Some(LayerType::Audio),
        "video" => Some(LayerType::Video),
        _ => None,
    }
}

/// Task that reads a local media file into an upload result.
pub fn upload_task(path: PathBuf, duration_seconds: Option<f64>) -> ToolTask {
    Box::new(move || {
        let meta = fs::metadata(&path).with_context(|| format!("reading {}", path.display()))?;
        if !meta.is_file() {
            return Err(anyhow!("{} is not a file", path.display()));
        }
        let mime = mime_for_path(&path)
            .ok_or_else(|| anyhow!("unrecognized media type: {}", path.display()))?;
        let kind = layer_type_for_mime(mime)
            .ok_or_else(|| anyhow!("unsupported media type {mime}"))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut file = MediaFile::new(name, mime);
        file.size_bytes = meta.len();
        file.duration_seconds = duration_seconds;
        file.local_path = Some(path);
        Ok(ToolOutput::UploadedMedia { kind, file })
    })
}
