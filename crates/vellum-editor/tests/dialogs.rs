use std::cell::RefCell;
use std::sync::Arc;

use vellum_core::{Point, Selection};
use vellum_editor::{
    EditorSurface, ImageFile, ImageUploader, ToolbarControl, UploadError, UploadRequest,
};

#[derive(Default)]
struct RecordingUploader {
    requests: RefCell<Vec<UploadRequest>>,
}

impl ImageUploader for RecordingUploader {
    fn upload(&self, request: UploadRequest) {
        self.requests.borrow_mut().push(request);
    }
}

fn png_file() -> ImageFile {
    ImageFile {
        name: "photo.png".to_string(),
        mime: "image/png".to_string(),
        bytes: vec![1, 2, 3, 4],
    }
}

#[test]
fn upload_path_goes_busy_and_inserts_on_success() {
    let uploader = Arc::new(RecordingUploader::default());
    let mut surface = EditorSurface::new()
        .default_value("<p>text</p>")
        .uploader(uploader.clone());

    surface.activate(ToolbarControl::Image);
    assert!(surface.image_dialog().is_open());
    assert!(!surface.image_dialog().is_busy());

    surface.submit_image_file(png_file());
    assert!(surface.image_dialog().is_busy());
    assert_eq!(uploader.requests.borrow().len(), 1);

    // The drop target is disabled while pending; a second submission is
    // refused.
    surface.submit_image_file(png_file());
    assert_eq!(uploader.requests.borrow().len(), 1);

    let id = uploader.requests.borrow()[0].id;
    surface.finish_image_upload(id, Ok("https://cdn.example.com/photo.png".to_string()));

    assert!(!surface.image_dialog().is_open());
    assert!(surface
        .value()
        .contains("src=\"https://cdn.example.com/photo.png\""));
}

#[test]
fn upload_failure_keeps_the_dialog_open_with_the_error() {
    let uploader = Arc::new(RecordingUploader::default());
    let mut surface = EditorSurface::new()
        .default_value("<p>text</p>")
        .uploader(uploader.clone());

    surface.activate(ToolbarControl::Image);
    surface.submit_image_file(png_file());
    let id = uploader.requests.borrow()[0].id;

    surface.finish_image_upload(id, Err(UploadError::Failed("network down".to_string())));

    assert!(surface.image_dialog().is_open());
    assert!(!surface.image_dialog().is_busy());
    assert!(surface.image_dialog().error().unwrap().contains("network down"));
    assert!(!surface.value().contains("<img"));

    // The dialog is usable again after the failure.
    surface.submit_image_file(png_file());
    assert_eq!(uploader.requests.borrow().len(), 2);
}

#[test]
fn outcomes_for_stale_requests_are_dropped() {
    let uploader = Arc::new(RecordingUploader::default());
    let mut surface = EditorSurface::new()
        .default_value("<p>text</p>")
        .uploader(uploader.clone());

    surface.activate(ToolbarControl::Image);
    surface.submit_image_file(png_file());
    let id = uploader.requests.borrow()[0].id;

    surface.finish_image_upload(id + 1, Ok("https://cdn.example.com/wrong.png".to_string()));
    assert!(surface.image_dialog().is_busy());
    assert!(!surface.value().contains("<img"));

    // Closing the dialog abandons the pending request entirely.
    surface.close_image_dialog();
    surface.finish_image_upload(id, Ok("https://cdn.example.com/late.png".to_string()));
    assert!(!surface.value().contains("<img"));
}

#[test]
fn without_an_uploader_the_file_is_inlined_as_a_data_url() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");

    surface.activate(ToolbarControl::Image);
    surface.submit_image_file(png_file());

    assert!(!surface.image_dialog().is_open());
    assert!(surface.value().contains("src=\"data:image/png;base64,"));
    assert!(surface.value().contains("alt=\"photo.png\""));
}

#[test]
fn direct_url_inserts_immediately_and_requires_a_url() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");

    surface.activate(ToolbarControl::Image);
    assert!(!surface.submit_image_url("   ", None));
    assert!(surface.image_dialog().is_open());

    assert!(surface.submit_image_url("https://example.com/a.png", Some("alt text")));
    assert!(!surface.image_dialog().is_open());
    assert!(surface.value().contains("src=\"https://example.com/a.png\""));
    assert!(surface.value().contains("alt=\"alt text\""));
}

#[test]
fn link_dialog_requires_a_non_empty_url() {
    let mut surface = EditorSurface::new().default_value("<p>Hello</p>");
    surface.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 5),
    });

    surface.activate(ToolbarControl::Link);
    assert!(surface.link_dialog().is_open());

    assert!(!surface.submit_link("  "));
    assert!(surface.link_dialog().is_open());

    assert!(surface.submit_link("https://example.com"));
    assert!(!surface.link_dialog().is_open());
    assert!(surface.value().contains("href=\"https://example.com\""));
    assert!(surface.value().contains("rel=\"noopener noreferrer\""));
}

#[test]
fn table_dialog_inserts_a_header_table_with_clamped_counts() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");

    surface.activate(ToolbarControl::Table);
    assert!(surface.table_dialog().is_open());

    assert!(surface.submit_table(2, 25));
    assert!(!surface.table_dialog().is_open());

    let markup = surface.value();
    assert_eq!(markup.matches("<tr>").count(), 2);
    assert_eq!(markup.matches("<th").count(), 10);
    assert_eq!(markup.matches("<td").count(), 10);
}
