use vellum_core::{parse_markup, to_markup, Editor, PluginRegistry, Point, Selection};

fn editor_with_value(value: &str) -> Editor {
    let doc = parse_markup(value).expect("parse");
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::richtext())
}

#[test]
fn wrap_selection_collects_the_selected_blocks() {
    let mut editor = editor_with_value("<p>a</p><p>b</p><p>c</p>");
    editor.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0], 1),
    });

    editor.run_command("blockquote.wrap_selection", None).unwrap();

    assert_eq!(
        to_markup(editor.doc()),
        "<blockquote><p>a</p><p>b</p></blockquote><p>c</p>"
    );
    assert!(editor.run_query::<bool>("blockquote.is_active", None).unwrap());
    assert_eq!(editor.selection().focus.path, vec![0, 1, 0]);
    assert_eq!(editor.selection().focus.offset, 1);
}

#[test]
fn unwrap_restores_the_blocks_in_place() {
    let mut editor = editor_with_value("<blockquote><p>a</p><p>b</p></blockquote><p>c</p>");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 1, 0], 1)));

    editor.run_command("blockquote.unwrap", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<p>a</p><p>b</p><p>c</p>");
    assert_eq!(editor.selection().focus.path, vec![1, 0]);
    assert_eq!(editor.selection().focus.offset, 1);
}

#[test]
fn wrap_is_unavailable_inside_a_blockquote() {
    let mut editor = editor_with_value("<blockquote><p>a</p></blockquote>");
    editor.set_selection(Selection::collapsed(Point::new(vec![0, 0, 0], 0)));

    assert!(!editor.command_available("blockquote.wrap_selection"));
    assert!(editor.command_available("blockquote.unwrap"));

    // Pre-gated command reaching the dispatcher anyway is a no-op.
    let before = editor.doc().clone();
    editor.run_command("blockquote.wrap_selection", None).unwrap();
    assert_eq!(editor.doc(), &before);
}

#[test]
fn empty_blockquote_is_normalized_to_hold_a_paragraph() {
    let editor = editor_with_value("<blockquote></blockquote>");
    assert_eq!(to_markup(editor.doc()), "<blockquote><p></p></blockquote>");
}
