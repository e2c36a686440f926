/// Project persistence: JSON files and the SQLite store
use reel_project::*;
use reel_timeline::{Editor, EditorConfig, LayerPatch, TemplateRegistry};

fn sample_editor() -> Editor {
    let registry = TemplateRegistry::builtin();
    let mut editor = Editor::new(EditorConfig::default(), registry.get("text-story").unwrap());
    editor.seek_to(200);
    let id = editor.add_chat_bubble("see you there", true);
    editor
        .update_layer(&id, &LayerPatch::new().opacity(0.5))
        .unwrap();
    editor
}

#[test]
fn test_file_round_trip_reopens_same_layers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("story.json");

    let editor = sample_editor();
    ProjectDocument::from_editor(&editor, "Story").save(&path).unwrap();

    let doc = ProjectDocument::load(&path).unwrap();
    assert_eq!(doc.title, "Story");
    let reopened = doc
        .into_editor(EditorConfig::default(), &TemplateRegistry::builtin())
        .unwrap();
    assert_eq!(reopened.layers(), editor.layers());
    assert_eq!(reopened.current_frame(), 200);
    assert_eq!(reopened.template_id(), "text-story");
    assert!(!reopened.can_undo());
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match ProjectDocument::load(&path) {
        Err(ProjectError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn test_db_save_list_load_delete() {
    let dir = tempfile::tempdir().unwrap();
    let db = ProjectDb::open_or_create(&dir.path().join("db").join("projects.db")).unwrap();

    let editor = sample_editor();
    let doc = ProjectDocument::from_editor(&editor, "First");
    let id = db.save_project(None, &doc).unwrap();

    let mut renamed = doc.clone();
    renamed.title = "First (final)".to_string();
    assert_eq!(db.save_project(Some(&id), &renamed).unwrap(), id);

    let listed = db.list_projects().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "First (final)");
    assert_eq!(listed[0].template_id, "text-story");

    let loaded = db.load_project(&id).unwrap().unwrap();
    assert_eq!(loaded, renamed);

    assert!(db.delete_project(&id).unwrap());
    assert!(!db.delete_project(&id).unwrap());
    assert!(db.load_project(&id).unwrap().is_none());
}

#[test]
fn test_render_output_updates_project_video_url() {
    let dir = tempfile::tempdir().unwrap();
    let db = ProjectDb::open_or_create(&dir.path().join("projects.db")).unwrap();

    let editor = sample_editor();
    let id = db
        .save_project(None, &ProjectDocument::from_editor(&editor, "Clip"))
        .unwrap();
    let request = RenderRequest::from_editor(&editor, "Clip");
    assert_eq!(request.duration_in_frames, 600);
    assert_eq!(request.fps, 30);

    let render_id = db.record_render(&id, &request).unwrap();
    db.set_render_output(&render_id, "https://cdn/renders/clip.mp4")
        .unwrap();

    let renders = db.list_renders(&id).unwrap();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].request, request);
    assert_eq!(
        renders[0].output_url.as_deref(),
        Some("https://cdn/renders/clip.mp4")
    );

    let doc = db.load_project(&id).unwrap().unwrap();
    assert_eq!(
        doc.project_vid_url.as_deref(),
        Some("https://cdn/renders/clip.mp4")
    );
}

#[test]
fn test_reopening_database_keeps_projects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("projects.db");
    let id = {
        let db = ProjectDb::open_or_create(&path).unwrap();
        db.save_project(None, &ProjectDocument::from_editor(&sample_editor(), "Kept"))
            .unwrap()
    };
    let db = ProjectDb::open_or_create(&path).unwrap();
    assert!(db.load_project(&id).unwrap().is_some());
}
