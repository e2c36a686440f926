use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reel_jobs::ToolRuntime;
use reel_project::{default_db_path, ProjectDb, ProjectDocument, RenderRequest};
use reel_timeline::{
    total_frames, visible_layers_at, Editor, EditorConfig, LayoutMode, TemplateRegistry,
    TimelineTrack,
};

mod script;

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Reel editor CLI - Headless short-form video composition")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Editor config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project from a template
    New {
        /// Project title
        title: String,

        /// Template id (see `reel templates`)
        #[arg(short, long, default_value = "blank")]
        template: String,

        /// Composition length in seconds (template default if omitted)
        #[arg(short, long)]
        duration: Option<u32>,

        /// Project file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a project's tracks and what is on screen at a frame
    Show {
        /// Project file path
        project: PathBuf,

        /// Frame to inspect (defaults to the saved playhead)
        #[arg(short, long)]
        frame: Option<i64>,

        /// Print the preview input props as JSON
        #[arg(long)]
        props: bool,
    },

    /// Apply a JSON edit script to a project
    Edit {
        /// Project file path
        project: PathBuf,

        /// Edit script (JSON array of ops)
        script: PathBuf,

        /// Where to write the result (defaults to overwriting the project)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the render request for a project
    Export {
        /// Project file path
        project: PathBuf,

        /// Render request output path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record the render against this stored project id
        #[arg(long)]
        record: Option<String>,
    },

    /// Store a project file in the project database
    Save {
        /// Project file path
        project: PathBuf,

        /// Existing project id to overwrite
        #[arg(long)]
        id: Option<String>,
    },

    /// Write a stored project back to a file
    Open {
        /// Stored project id
        id: String,

        /// Project file to write
        output: PathBuf,
    },

    /// List stored projects
    List,

    /// Delete a stored project
    Delete {
        /// Stored project id
        id: String,
    },

    /// List available templates
    Templates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(cli.config.as_deref()).await?;
    let db_path = cli.db.unwrap_or_else(default_db_path);
    let registry = TemplateRegistry::builtin();

    match cli.command {
        Commands::New {
            title,
            template,
            duration,
            output,
        } => new_command(&registry, config, title, template, duration, output).await,
        Commands::Show {
            project,
            frame,
            props,
        } => show_command(&registry, config, project, frame, props).await,
        Commands::Edit {
            project,
            script,
            output,
        } => edit_command(&registry, config, project, script, output).await,
        Commands::Export {
            project,
            output,
            record,
        } => export_command(&registry, config, &db_path, project, output, record).await,
        Commands::Save { project, id } => save_command(&db_path, project, id).await,
        Commands::Open { id, output } => open_command(&db_path, id, output).await,
        Commands::List => list_command(&db_path),
        Commands::Delete { id } => delete_command(&db_path, id),
        Commands::Templates => templates_command(&registry),
    }
}

async fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EditorConfig::from_json(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("Loaded editor config from {:?}", path);
    Ok(config)
}

async fn read_document(path: &Path) -> Result<ProjectDocument> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading project {}", path.display()))?;
    ProjectDocument::from_json(&raw).with_context(|| format!("parsing project {}", path.display()))
}

async fn write_document(path: &Path, doc: &ProjectDocument) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, doc.to_json_pretty()?)
        .await
        .with_context(|| format!("writing project {}", path.display()))?;
    Ok(())
}

async fn open_editor(
    registry: &TemplateRegistry,
    config: EditorConfig,
    path: &Path,
) -> Result<(Editor, ProjectDocument)> {
    let doc = read_document(path).await?;
    let editor = doc.clone().into_editor(config, registry)?;
    Ok((editor, doc))
}

fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

async fn new_command(
    registry: &TemplateRegistry,
    config: EditorConfig,
    title: String,
    template_id: String,
    duration: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let template = registry.get(&template_id)?;
    let editor = match duration {
        Some(seconds) => {
            let layers = template.create_default_layers(total_frames(seconds, config.fps));
            Editor::from_parts(config, template.id(), seconds, layers, 0)
        }
        None => Editor::new(config, template),
    };

    let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.reel.json", slug(&title))));
    info!(
        "Creating '{}' from template {} ({}s, {} layers)",
        title,
        template.name(),
        editor.duration_seconds(),
        editor.layers().len()
    );
    write_document(&output, &ProjectDocument::from_editor(&editor, title)).await?;
    info!("Project file: {:?}", output);
    Ok(())
}

fn print_tracks(tracks: &[TimelineTrack]) {
    println!("{:<4} {:<40} {:<11} {:>6} {:>6}  flags", "#", "id", "type", "start", "end");
    for (i, t) in tracks.iter().enumerate() {
        let mut flags = String::new();
        if t.visible == Some(false) {
            flags.push_str("hidden ");
        }
        if t.locked == Some(true) {
            flags.push_str("locked");
        }
        println!(
            "{:<4} {:<40} {:<11} {:>6} {:>6}  {}",
            i,
            t.id,
            t.layer_type.as_str(),
            t.start_frame.unwrap_or_default(),
            t.end_frame.unwrap_or_default(),
            flags.trim_end()
        );
    }
}

async fn show_command(
    registry: &TemplateRegistry,
    config: EditorConfig,
    project: PathBuf,
    frame: Option<i64>,
    props: bool,
) -> Result<()> {
    let (mut editor, doc) = open_editor(registry, config, &project).await?;
    if let Some(frame) = frame {
        editor.seek_to(frame);
    }
    let template = registry.get(editor.template_id())?;

    println!(
        "{} [{}] {}s @ {}fps ({} frames)",
        doc.title,
        editor.template_id(),
        editor.duration_seconds(),
        editor.fps(),
        editor.total_frames()
    );
    if let Some(mode) = editor.layout_mode(template) {
        println!("layout: {mode:?}");
    }
    print_tracks(&editor.tracks());

    let frame = editor.current_frame();
    let visible: Vec<&str> = visible_layers_at(editor.layers(), frame)
        .into_iter()
        .map(|l| l.name.as_str())
        .collect();
    println!("frame {frame}: {}", visible.join(", "));

    if props {
        let props = editor.preview_input_props(template);
        println!("{}", serde_json::to_string_pretty(props)?);
    }
    Ok(())
}

async fn edit_command(
    registry: &TemplateRegistry,
    config: EditorConfig,
    project: PathBuf,
    script_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let (mut editor, doc) = open_editor(registry, config, &project).await?;
    let raw = tokio::fs::read_to_string(&script_path)
        .await
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let ops = script::parse_script(&raw)?;
    let template = registry.get(editor.template_id())?;

    let tools = ToolRuntime::start(2);
    let outcome = script::run_script(&mut editor, template, &tools, ops)?;
    for note in &outcome.notifications {
        warn!("{:?}: {}", note.level, note.message);
    }

    let mut next = ProjectDocument::from_editor(&editor, doc.title);
    next.project_vid_url = doc.project_vid_url;
    let output = output.unwrap_or(project);
    write_document(&output, &next).await?;
    info!(
        "Applied {} ops ({} layers created), wrote {:?}",
        outcome.applied,
        outcome.created.len(),
        output
    );
    Ok(())
}

async fn export_command(
    registry: &TemplateRegistry,
    config: EditorConfig,
    db_path: &Path,
    project: PathBuf,
    output: Option<PathBuf>,
    record: Option<String>,
) -> Result<()> {
    let (editor, doc) = open_editor(registry, config, &project).await?;
    if editor.layers().is_empty() {
        warn!("Project {:?} has no layers", project);
    }
    let request = RenderRequest::from_editor(&editor, doc.title);
    let json = serde_json::to_string_pretty(&request)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            info!("Render request written to {:?}", path);
        }
        None => println!("{json}"),
    }

    if let Some(project_id) = record {
        let db = ProjectDb::open_or_create(db_path)?;
        if db.load_project(&project_id)?.is_none() {
            return Err(anyhow!("no stored project with id {project_id}"));
        }
        let render_id = db.record_render(&project_id, &request)?;
        info!("Recorded render {} for project {}", render_id, project_id);
    }
    Ok(())
}

async fn save_command(db_path: &Path, project: PathBuf, id: Option<String>) -> Result<()> {
    let doc = read_document(&project).await?;
    let db = ProjectDb::open_or_create(db_path)?;
    let id = db.save_project(id.as_deref(), &doc)?;
    println!("{id}");
    Ok(())
}

async fn open_command(db_path: &Path, id: String, output: PathBuf) -> Result<()> {
    let db = ProjectDb::open_or_create(db_path)?;
    let doc = db
        .load_project(&id)?
        .ok_or_else(|| anyhow!("no stored project with id {id}"))?;
    write_document(&output, &doc).await?;
    info!("Wrote '{}' to {:?}", doc.title, output);
    Ok(())
}

fn list_command(db_path: &Path) -> Result<()> {
    let db = ProjectDb::open_or_create(db_path)?;
    let projects = db.list_projects()?;
    if projects.is_empty() {
        println!("No stored projects in {}", db.path().display());
        return Ok(());
    }
    for p in projects {
        let updated = chrono::DateTime::from_timestamp(p.updated_at, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        println!("{}  {:<14} {}  {}", p.id, p.template_id, updated, p.title);
    }
    Ok(())
}

fn delete_command(db_path: &Path, id: String) -> Result<()> {
    let db = ProjectDb::open_or_create(db_path)?;
    if db.delete_project(&id)? {
        info!("Deleted project {}", id);
    } else {
        warn!("No stored project with id {}", id);
    }
    Ok(())
}

fn templates_command(registry: &TemplateRegistry) -> Result<()> {
    for template in registry.iter() {
        let layout = if template.dual_panel_layout().is_some() {
            format!(" (layouts: {:?}, {:?})", LayoutMode::SplitScreen, LayoutMode::PictureInPicture)
        } else {
            String::new()
        };
        println!(
            "{:<14} {:<14} {}s{}",
            template.id(),
            template.name(),
            template.default_duration_seconds(),
            layout
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_filename_safe() {
        assert_eq!(slug("My First Reel!"), "my-first-reel");
        assert_eq!(slug("???"), "project");
    }

    #[tokio::test]
    async fn new_then_edit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("story.reel.json");
        let registry = TemplateRegistry::builtin();

        new_command(
            &registry,
            EditorConfig::default(),
            "Story".to_string(),
            "text-story".to_string(),
            Some(12),
            Some(project.clone()),
        )
        .await
        .unwrap();

        let script_path = dir.path().join("edit.json");
        tokio::fs::write(
            &script_path,
            r#"[{"op": "seek", "frame": 300}, {"op": "addChatBubble", "message": "bye"}]"#,
        )
        .await
        .unwrap();
        edit_command(&registry, EditorConfig::default(), project.clone(), script_path, None)
            .await
            .unwrap();

        let doc = read_document(&project).await.unwrap();
        assert_eq!(doc.title, "Story");
        assert_eq!(doc.props.duration, Some(12));
        assert!(doc.props.layers.iter().all(|l| l.end_frame <= 360));
        assert_eq!(doc.props.layers.len(), 4);
        assert_eq!(doc.props.current_frame, 300);
        let last = doc.props.layers.last().unwrap();
        assert_eq!((last.start_frame, last.end_frame), (300, 360));
    }

    #[tokio::test]
    async fn export_writes_render_request() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("split.reel.json");
        let request_path = dir.path().join("render.json");
        let registry = TemplateRegistry::builtin();

        new_command(
            &registry,
            EditorConfig::default(),
            "Split".to_string(),
            "split-screen".to_string(),
            None,
            Some(project.clone()),
        )
        .await
        .unwrap();
        export_command(
            &registry,
            EditorConfig::default(),
            &dir.path().join("projects.db"),
            project,
            Some(request_path.clone()),
            None,
        )
        .await
        .unwrap();

        let raw = tokio::fs::read_to_string(&request_path).await.unwrap();
        let request: RenderRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(request.template_id, "split-screen");
        assert_eq!(request.duration_in_frames, 900);
        assert_eq!(request.layers.len(), 3);
    }
}
