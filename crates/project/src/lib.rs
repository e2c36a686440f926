use std::path::PathBuf;
use thiserror::Error;

use reel_timeline::TimelineError;

mod db;
pub use db::*;
mod document;
pub use document::*;

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("reel_editor")
}

/// Default location of the project database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("projects.db")
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed project document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
