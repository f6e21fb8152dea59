use std::cell::RefCell;
use std::rc::Rc;

use vellum_core::{Point, Selection};
use vellum_editor::{EditorSurface, ToolbarControl};

fn recording_surface(value: &str) -> (EditorSurface, Rc<RefCell<Vec<String>>>) {
    let emitted: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = emitted.clone();
    let surface = EditorSurface::new()
        .default_value(value)
        .on_change(move |value| sink.borrow_mut().push(value.to_string()));
    (surface, emitted)
}

fn select_range(surface: &mut EditorSurface, path: Vec<usize>, start: usize, end: usize) {
    surface.set_selection(Selection {
        anchor: Point::new(path.clone(), start),
        focus: Point::new(path, end),
    });
}

#[test]
fn loading_a_value_round_trips_through_the_surface() {
    let (surface, emitted) = recording_surface("<p>Hello</p>");
    assert_eq!(surface.value(), "<p>Hello</p>");
    assert!(emitted.borrow().is_empty());
}

#[test]
fn local_edits_emit_the_new_serialization() {
    let (mut surface, emitted) = recording_surface("<p>Hello</p>");
    select_range(&mut surface, vec![0, 0], 0, 5);

    surface.activate(ToolbarControl::Bold);
    assert_eq!(
        emitted.borrow().as_slice(),
        ["<p><strong>Hello</strong></p>"]
    );
    assert_eq!(surface.value(), "<p><strong>Hello</strong></p>");

    select_range(&mut surface, vec![0, 0], 0, 5);
    surface.activate(ToolbarControl::Bold);
    assert_eq!(
        emitted.borrow().as_slice(),
        ["<p><strong>Hello</strong></p>", "<p>Hello</p>"]
    );
}

#[test]
fn setting_the_emitted_value_back_does_not_replace_content() {
    let (mut surface, emitted) = recording_surface("<p>Hello</p>");
    select_range(&mut surface, vec![0, 0], 0, 5);
    surface.activate(ToolbarControl::Bold);

    let last = emitted.borrow().last().unwrap().clone();
    surface.set_selection(Selection::collapsed(Point::new(vec![0, 0], 3)));

    // Feeding the value the surface just emitted back in must be a no-op:
    // the selection survives and nothing new is emitted.
    surface.set_value(&last);
    assert_eq!(surface.editor().selection().focus.offset, 3);
    assert_eq!(emitted.borrow().len(), 1);
}

#[test]
fn a_diverged_external_value_replaces_content_wholesale() {
    let (mut surface, emitted) = recording_surface("<p>Hello</p>");
    surface.set_selection(Selection::collapsed(Point::new(vec![0, 0], 3)));

    surface.set_value("<p>Replaced</p>");
    assert_eq!(surface.value(), "<p>Replaced</p>");
    assert_eq!(surface.editor().selection().focus.offset, 0);
    // External loads never echo back out.
    assert!(emitted.borrow().is_empty());
}

#[test]
fn malformed_values_fall_back_to_an_empty_document() {
    let (mut surface, emitted) = recording_surface("<p>Hello</p>");

    surface.set_value("<p class=");
    assert!(surface.is_empty());
    assert_eq!(surface.value(), "<p></p>");
    assert!(emitted.borrow().is_empty());
}

#[test]
fn placeholder_is_surface_state_for_the_empty_document() {
    let surface = EditorSurface::new().placeholder("Write something...");
    assert!(surface.is_empty());
    assert_eq!(surface.placeholder_text(), Some("Write something..."));

    let surface = EditorSurface::new()
        .placeholder("Write something...")
        .default_value("<p>content</p>");
    assert!(!surface.is_empty());
}

#[test]
fn undo_and_redo_emit_like_any_other_transaction() {
    let (mut surface, emitted) = recording_surface("<p>Hello</p>");
    select_range(&mut surface, vec![0, 0], 0, 5);
    surface.activate(ToolbarControl::Bold);

    surface.undo();
    assert_eq!(surface.value(), "<p>Hello</p>");
    surface.redo();
    assert_eq!(surface.value(), "<p><strong>Hello</strong></p>");
    assert_eq!(emitted.borrow().len(), 3);
}
