//! A tab's controller keeps lists, frames and the light curve in step with
//! its collections.

use celexta::items::{
    AnyItem, Candidate, CatalogTable, CollectionItem, Color, ImageFrame, ItemKind, ItemUpdate, Region,
};
use celexta::samples::{self, ExampleImage};
use celexta::view::VisualHandle;
use celexta::Controller;

fn sample_frame() -> ImageFrame {
    samples::example_image(ExampleImage::Starfield).unwrap()
}

#[test]
fn test_add_to_active_surface_without_focus() {
    let controller = Controller::new();
    let frame = sample_frame();
    let region = samples::example_region(&frame, 4).unwrap();
    let frame_id = controller.add_image_frame(frame);
    controller.set_focused_surface(None);

    let region_id = controller.add(region);
    let before = controller.with_surface(frame_id, |view| view.handle_count());
    assert_eq!(controller.add_to_active_surface(region_id), 0);
    assert_eq!(controller.remove_from_active_surface(region_id), 0);
    let after = controller.with_surface(frame_id, |view| view.handle_count());

    assert_eq!(before, Some(0));
    assert_eq!(after, before);
    assert_eq!(controller.list_surface::<Region>().lock().len(), 1);
}

#[test]
fn test_item_follows_focus_and_fans_out() {
    let controller = Controller::new();
    let first = sample_frame();
    let table = samples::example_table(&first, 2).unwrap();
    let first_id = controller.add_image_frame(first);
    let second_id = controller.add_image_frame(sample_frame());
    assert_eq!(controller.focused_surface(), Some(second_id));

    let table_id = controller.add(table);
    let on = |frame| controller.with_surface(frame, |view| view.has_item(table_id));
    assert_eq!(on(first_id), Some(false));
    assert_eq!(on(second_id), Some(true));

    assert_eq!(controller.add_to_all_surfaces(table_id), 1);
    assert_eq!(on(first_id), Some(true));

    controller.set_visibility(table_id, false);
    for frame in [first_id, second_id] {
        let visible = controller.with_surface(frame, |view| view.artist(table_id).map(|a| a.is_visible()));
        assert_eq!(visible, Some(Some(false)));
    }
    let row_checked = controller
        .list_surface::<CatalogTable>()
        .lock()
        .row(table_id)
        .map(|row| row.checked);
    assert_eq!(row_checked, Some(false));

    assert!(controller.delete(table_id));
    assert_eq!(on(first_id), Some(false));
    assert_eq!(on(second_id), Some(false));
    assert!(controller.list_surface::<CatalogTable>().lock().is_empty());
}

#[test]
fn test_colors_come_from_pool_and_return() {
    let controller = Controller::new();
    let frame = sample_frame();
    let region = Region::circle(frame.world_center().unwrap(), celexta::astro::Angle::from_arcsec(20.0));
    controller.add_image_frame(frame);

    let first_color = controller.colors().available()[0];
    let id = controller.add(region);
    let Some(AnyItem::Region(stored)) = controller.item(id) else {
        panic!("region missing");
    };
    assert_eq!(stored.color(), Some(first_color));
    assert!(controller.colors().allocated().contains(&first_color));

    let new_color = Color::rgb(1, 2, 3);
    assert!(controller.edit(id, &ItemUpdate::new().color(new_color)));
    let artist_pen = controller.with_surface(controller.focused_surface().unwrap(), |view| {
        view.artist(id).and_then(|artist| artist.pen())
    });
    assert_eq!(artist_pen, Some(Some(new_color)));
    assert!(!controller.colors().allocated().contains(&first_color));

    controller.delete(id);
    assert!(controller.colors().allocated().is_empty());
}

#[test]
fn test_candidates_reach_the_light_curve() {
    let controller = Controller::new();
    let frame = sample_frame();
    let candidate = samples::example_candidate(&frame, 3, 2).unwrap();
    let id = candidate.id();
    controller.add_image_frame(frame);
    controller.add(candidate);

    {
        let light_curve = controller.light_curve().lock();
        let curve = light_curve.curve(id).unwrap();
        assert_eq!(curve.points.len(), 14);
        assert_eq!(curve.limits().count(), 2);
    }
    assert!(!controller.toggle_light_curve());

    controller.delete(id);
    assert!(controller.light_curve().lock().is_empty());
    assert_eq!(controller.kind_of(id), None::<ItemKind>);
}

#[test]
fn test_deleting_focused_frame_clears_focus() {
    let controller = Controller::new();
    let frame_id = controller.add_image_frame(sample_frame());
    assert_eq!(controller.surface_ids(), vec![frame_id]);

    assert!(controller.delete(frame_id));
    assert!(controller.surface_ids().is_empty());
    assert_eq!(controller.focused_surface(), None);
    assert!(!controller.delete(frame_id));
}

#[test]
fn test_frames_without_wcs_hold_no_items() {
    let controller = Controller::new();
    let frame_id = controller.add_image_frame(ImageFrame::new().with_name("blank"));
    let candidate = Candidate::new(celexta::astro::SkyCoord::from_deg(1.0, 1.0));
    let id = controller.add(candidate);

    assert_eq!(controller.kind_of(id), Some(ItemKind::Candidate));
    assert_eq!(controller.with_surface(frame_id, |view| view.handle_count()), Some(0));
}
