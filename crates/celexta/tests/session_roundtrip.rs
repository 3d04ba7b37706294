//! Saving a workspace and opening it again.

use approx::assert_abs_diff_eq;
use celexta::items::{Candidate, CatalogTable, CollectionItem, ImageFrame, Region};
use celexta::samples::{self, ExampleImage};
use celexta::session::{read_session_file, SESSION_DATA_DIR, SESSION_FILE};
use celexta::{CelextaError, Controller, Workspace};

fn populate(controller: &Controller, kind: ExampleImage, seed: u64) {
    let frame = samples::example_image(kind).unwrap();
    let region = samples::example_region(&frame, seed).unwrap();
    let table = samples::example_table(&frame, seed + 1).unwrap();
    let candidate = samples::example_candidate(&frame, seed + 2, 3).unwrap();
    controller.add_image_frame(frame);
    controller.add(region);
    controller.add(table);
    controller.add(candidate);
}

fn sample_workspace() -> Workspace {
    let mut workspace = Workspace::default();
    let first = workspace.add_tab("Field A");
    populate(workspace.tab(first).unwrap(), ExampleImage::Starfield, 10);
    let second = workspace.add_tab("Field B");
    populate(workspace.tab(second).unwrap(), ExampleImage::Nebula, 20);
    workspace
}

#[test]
fn test_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let original = sample_workspace();
    let hidden = original.tab(0).unwrap().collection::<Region>().ids()[0];
    original.tab(0).unwrap().set_visibility(hidden, false);

    let path = original.save_session(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(SESSION_FILE));
    assert!(dir.path().join(SESSION_DATA_DIR).join("Field_A").is_dir());

    let mut restored = Workspace::default();
    assert_eq!(restored.load_session(dir.path()).unwrap(), 2);
    assert_eq!(restored.titles(), vec!["Field A", "Field B"]);
    assert_eq!(restored.current_index(), Some(1));

    for index in 0..2 {
        let before = original.tab(index).unwrap();
        let after = restored.tab(index).unwrap();
        assert_eq!(after.item_count(), before.item_count());

        let old_region = &before.collection::<Region>().items()[0];
        let new_region = &after.collection::<Region>().items()[0];
        assert_eq!(new_region.name(), old_region.name());
        assert_eq!(new_region.color(), old_region.color());
        assert_abs_diff_eq!(new_region.center().ra.deg(), old_region.center().ra.deg(), epsilon = 1e-9);
        assert_ne!(new_region.id(), old_region.id());
        assert_eq!(after.collection::<Region>().is_visible(new_region.id()), Some(true));

        let old_table = &before.collection::<CatalogTable>().items()[0];
        let new_table = &after.collection::<CatalogTable>().items()[0];
        assert_eq!(new_table.len(), old_table.len());
        assert_eq!(new_table.columns(), old_table.columns());

        let old_candidate = &before.collection::<Candidate>().items()[0];
        let new_candidate = &after.collection::<Candidate>().items()[0];
        assert_eq!(new_candidate.observations().len(), old_candidate.observations().len());
        assert_eq!(new_candidate.t0(), old_candidate.t0());

        let old_frame = &before.collection::<ImageFrame>().items()[0];
        let new_frame = &after.collection::<ImageFrame>().items()[0];
        assert_eq!(new_frame.image().unwrap().pixels(), old_frame.image().unwrap().pixels());
        assert_eq!(new_frame.wcs(), old_frame.wcs());

        let focused = after.focused_surface().unwrap();
        let drawn = after.with_surface(focused, |view| view.handle_count());
        assert_eq!(drawn, Some(3));
        assert_eq!(after.light_curve().lock().len(), 1);
    }
}

#[test]
fn test_saving_again_replaces_side_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = sample_workspace();
    workspace.save_session(dir.path()).unwrap();
    assert!(dir.path().join(SESSION_DATA_DIR).join("Field_B").exists());

    workspace.close_tab(1);
    workspace.save_session(dir.path()).unwrap();
    assert!(!dir.path().join(SESSION_DATA_DIR).join("Field_B").exists());

    let session = read_session_file(dir.path().join(SESSION_FILE)).unwrap();
    assert_eq!(session.tabs.len(), 1);
    assert_eq!(session.tabs[0].0, "Field A");
}

#[test]
fn test_duplicate_titles_are_kept_apart() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = Workspace::default();
    let first = workspace.add_tab("Tab");
    populate(workspace.tab(first).unwrap(), ExampleImage::Starfield, 1);
    let second = workspace.add_tab("Tab");
    populate(workspace.tab(second).unwrap(), ExampleImage::Galactic, 2);
    workspace.save_session(dir.path()).unwrap();

    let mut restored = Workspace::default();
    assert_eq!(restored.load_session(dir.path()).unwrap(), 2);
    assert_eq!(restored.titles(), vec!["Tab", "Tab (2)"]);
    let names: Vec<String> = (0..2)
        .map(|i| restored.tab(i).unwrap().collection::<ImageFrame>().items()[0].name().to_string())
        .collect();
    assert_eq!(names, vec!["starfield", "galactic"]);
}

#[test]
fn test_broken_side_file_discards_loaded_tabs() {
    let dir = tempfile::tempdir().unwrap();
    sample_workspace().save_session(dir.path()).unwrap();

    let tab_dir = dir.path().join(SESSION_DATA_DIR).join("Field_B");
    let csv = std::fs::read_dir(&tab_dir)
        .unwrap()
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .find(|path| path.extension().is_some_and(|ext| ext == "csv") && !path.to_string_lossy().ends_with(".obs.csv"))
        .unwrap();
    std::fs::write(&csv, "name,mag\nx,1\n").unwrap();

    let mut workspace = Workspace::default();
    workspace.add_tab("kept");
    let err = workspace.load_session(dir.path()).unwrap_err();
    assert!(matches!(err, CelextaError::MissingColumn { .. }));
    assert_eq!(workspace.titles(), vec!["kept"]);
    assert_eq!(workspace.current_index(), Some(0));
}
