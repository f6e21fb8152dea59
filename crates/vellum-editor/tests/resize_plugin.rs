use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use vellum_core::Path;
use vellum_editor::{
    EditorSurface, ImageHit, ImageId, PointerPosition, RenderedSize, ViewGeometry,
};

/// Minimal host view: one hit-testable image with a document path that can
/// be revoked to simulate the node vanishing mid-drag.
#[derive(Default)]
struct FakeView {
    hit: Option<ImageHit>,
    doc_paths: HashMap<ImageId, Path>,
    previews: HashMap<ImageId, RenderedSize>,
}

impl ViewGeometry for FakeView {
    fn image_at(&self, _position: PointerPosition) -> Option<ImageHit> {
        self.hit
    }

    fn image_document_path(&self, image: ImageId) -> Option<Path> {
        self.doc_paths.get(&image).cloned()
    }

    fn set_preview_size(&mut self, image: ImageId, size: RenderedSize) {
        self.previews.insert(image, size);
    }

    fn clear_preview_size(&mut self, image: ImageId) {
        self.previews.remove(&image);
    }
}

const IMAGE: ImageId = 7;

fn view_with_image() -> FakeView {
    let mut view = FakeView::default();
    view.hit = Some(ImageHit {
        id: IMAGE,
        size: RenderedSize::new(200.0, 100.0),
    });
    view.doc_paths.insert(IMAGE, vec![1]);
    view
}

fn surface_with_image() -> (EditorSurface, Rc<RefCell<usize>>) {
    let changes: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
    let counter = changes.clone();
    let surface = EditorSurface::new()
        .default_value("<p>x</p><img src=\"https://example.com/a.png\">")
        .on_change(move |_| *counter.borrow_mut() += 1);
    (surface, changes)
}

#[test]
fn drag_previews_transiently_and_commits_once_on_release() {
    let (mut surface, changes) = surface_with_image();
    let mut view = view_with_image();

    assert!(surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    assert!(surface.is_resizing());
    assert_eq!(*changes.borrow(), 0);

    surface.pointer_move(PointerPosition::new(60.0, 500.0), &mut view);
    assert_eq!(
        view.previews.get(&IMAGE),
        Some(&RenderedSize::new(250.0, 125.0))
    );
    // Transient feedback only; the model has not moved.
    assert_eq!(*changes.borrow(), 0);
    assert!(!surface.value().contains("width"));

    surface.pointer_up(PointerPosition::new(60.0, 500.0), &mut view);
    assert!(!surface.is_resizing());
    assert!(view.previews.is_empty());
    assert!(surface.value().contains("width=\"250px\""));
    assert!(surface.value().contains("height=\"125px\""));
    assert_eq!(*changes.borrow(), 1);
}

#[test]
fn pointer_down_away_from_an_image_is_not_claimed() {
    let (mut surface, _changes) = surface_with_image();
    let view = FakeView::default();

    assert!(!surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    assert!(!surface.is_resizing());
}

#[test]
fn width_floor_applies_to_the_commit() {
    let (mut surface, _changes) = surface_with_image();
    let mut view = view_with_image();

    assert!(surface.pointer_down(PointerPosition::new(400.0, 0.0), &view));
    surface.pointer_up(PointerPosition::new(0.0, 0.0), &mut view);

    assert!(surface.value().contains("width=\"50px\""));
    assert!(surface.value().contains("height=\"25px\""));
}

#[test]
fn vertical_only_movement_commits_nothing() {
    let (mut surface, changes) = surface_with_image();
    let mut view = view_with_image();

    assert!(surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    surface.pointer_move(PointerPosition::new(10.0, 400.0), &mut view);
    surface.pointer_up(PointerPosition::new(10.0, 400.0), &mut view);

    assert!(!surface.value().contains("width"));
    assert_eq!(*changes.borrow(), 0);
}

#[test]
fn stale_document_path_discards_the_commit_silently() {
    let (mut surface, changes) = surface_with_image();
    let mut view = view_with_image();

    assert!(surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    // The image node disappears while the drag is live.
    view.doc_paths.clear();
    surface.pointer_up(PointerPosition::new(60.0, 10.0), &mut view);

    assert!(!surface.value().contains("width"));
    assert_eq!(*changes.borrow(), 0);
    assert!(view.previews.is_empty());
}

#[test]
fn a_path_that_no_longer_addresses_an_image_is_ignored() {
    let (mut surface, changes) = surface_with_image();
    let mut view = view_with_image();
    // Points at the leading paragraph, not the image.
    view.doc_paths.insert(IMAGE, vec![0]);

    assert!(surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    surface.pointer_up(PointerPosition::new(60.0, 10.0), &mut view);

    assert!(!surface.value().contains("width"));
    assert_eq!(*changes.borrow(), 0);
}

#[test]
fn detach_mid_drag_cancels_without_committing() {
    let (mut surface, changes) = surface_with_image();
    let mut view = view_with_image();

    assert!(surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    surface.pointer_move(PointerPosition::new(60.0, 10.0), &mut view);
    assert!(!view.previews.is_empty());

    surface.detach(&mut view);
    assert!(!surface.is_resizing());
    assert!(view.previews.is_empty());

    // A pointer-up arriving after teardown does nothing.
    surface.pointer_up(PointerPosition::new(120.0, 10.0), &mut view);
    assert!(!surface.value().contains("width"));
    assert_eq!(*changes.borrow(), 0);
}

#[test]
fn read_only_surfaces_never_claim_the_gesture() {
    let (surface, changes) = surface_with_image();
    let mut surface = surface.read_only(true);
    let mut view = view_with_image();

    assert!(!surface.pointer_down(PointerPosition::new(10.0, 10.0), &view));
    surface.pointer_move(PointerPosition::new(60.0, 10.0), &mut view);
    surface.pointer_up(PointerPosition::new(60.0, 10.0), &mut view);

    assert!(view.previews.is_empty());
    assert!(!surface.value().contains("width"));
    assert_eq!(*changes.borrow(), 0);
}
