use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{ProjectDocument, RenderRequest};

/// SQLite-backed store of saved projects and their render history.
pub struct ProjectDb {
    conn: Connection,
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInfo {
    pub id: String,
    pub title: String,
    pub template_id: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
    pub id: String,
    pub project_id: String,
    pub request: RenderRequest,
    pub output_url: Option<String>,
    pub created_at: i64,
}

impl ProjectDb {
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating database directory {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening project database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "project database ready");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn begin_tx(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Inserts or overwrites a project. A new id is generated when `id` is `None`.
    pub fn save_project(&self, id: Option<&str>, doc: &ProjectDocument) -> Result<String> {
        let id = id.map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let json = serde_json::to_string(doc)?;
        let now = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO projects(id, title, template_id, document_json, created_at, updated_at) VALUES(?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, template_id = excluded.template_id, document_json = excluded.document_json, updated_at = excluded.updated_at",
            params![id, doc.title, doc.template_id, json, now],
        )?;
        tracing::info!(project = %id, title = %doc.title, "project saved");
        Ok(id)
    }

    pub fn load_project(&self, id: &str) -> Result<Option<ProjectDocument>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT document_json FROM projects WHERE id = ?1 LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| {
            ProjectDocument::from_json(&raw).with_context(|| format!("decoding project {id}"))
        })
        .transpose()
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, template_id, updated_at FROM projects ORDER BY updated_at DESC, created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectInfo {
                id: row.get(0)?,
                title: row.get(1)?,
                template_id: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Removes a project and its render history. Returns whether it existed.
    pub fn delete_project(&self, id: &str) -> Result<bool> {
        let tx = self.begin_tx()?;
        tx.execute("DELETE FROM renders WHERE project_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn record_render(&self, project_id: &str, request: &RenderRequest) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        self.conn
            .execute(
                "INSERT INTO renders(id, project_id, request_json, output_url, created_at) VALUES(?1, ?2, ?3, NULL, ?4)",
                params![id, project_id, serde_json::to_string(request)?, now],
            )
            .with_context(|| format!("recording render for project {project_id}"))?;
        Ok(id)
    }

    /// Stores the rendered output URL on the render row and as the project's
    /// `projectVidUrl`.
    pub fn set_render_output(&self, render_id: &str, output_url: &str) -> Result<()> {
        let tx = self.begin_tx()?;
        let project_id: String = tx
            .query_row(
                "SELECT project_id FROM renders WHERE id = ?1",
                params![render_id],
                |row| row.get(0),
            )
            .with_context(|| format!("unknown render {render_id}"))?;
        tx.execute(
            "UPDATE renders SET output_url = ?2 WHERE id = ?1",
            params![render_id, output_url],
        )?;

        let raw: String = tx.query_row(
            "SELECT document_json FROM projects WHERE id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        let mut doc = ProjectDocument::from_json(&raw)?;
        doc.project_vid_url = Some(output_url.to_string());
        tx.execute(
            "UPDATE projects SET document_json = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                project_id,
                serde_json::to_string(&doc)?,
                chrono::Utc::now().timestamp()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_renders(&self, project_id: &str) -> Result<Vec<RenderRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, request_json, output_url, created_at FROM renders WHERE project_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let mut rows = stmt.query(params![project_id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(2)?;
            out.push(RenderRow {
                id: row.get(0)?,
                project_id: row.get(1)?,
                request: serde_json::from_str(&raw)?,
                output_url: row.get(3)?,
                created_at: row.get(4)?,
            });
        }
        Ok(out)
    }
}

fn apply_migrations(conn: &Connection) -> Result<()> {
    // Simple migration tracking by name
    conn.execute_batch(include_str!("../migrations/V0001__init.sql"))?;
    conn.execute(
        "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
        params!["V0001__init"],
    )?;
    // Render history (V0002)
    conn.execute_batch(include_str!("../migrations/V0002__renders.sql"))?;
    conn.execute(
        "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
        params!["V0002__renders"],
    )?;
    Ok(())
}
