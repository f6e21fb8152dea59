use vellum_core::{
    parse_markup, to_markup, Editor, Node, PluginRegistry, Point, Selection,
};

fn editor_with_value(value: &str) -> Editor {
    let doc = parse_markup(value).expect("parse");
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::richtext())
}

fn select(editor: &mut Editor, anchor: (Vec<usize>, usize), focus: (Vec<usize>, usize)) {
    editor.set_selection(Selection {
        anchor: Point::new(anchor.0, anchor.1),
        focus: Point::new(focus.0, focus.1),
    });
}

#[test]
fn bold_toggle_wraps_run_and_second_toggle_restores_it() {
    let mut editor = editor_with_value("<p>Hello</p>");
    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(to_markup(editor.doc()), "<p><strong>Hello</strong></p>");

    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));
    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(to_markup(editor.doc()), "<p>Hello</p>");
}

#[test]
fn partial_range_splits_the_run() {
    let mut editor = editor_with_value("<p>Hello</p>");
    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 2));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(to_markup(editor.doc()), "<p><strong>He</strong>llo</p>");

    let Node::Element(el) = &editor.doc().children[0] else {
        panic!("expected paragraph");
    };
    assert_eq!(el.children.len(), 2);
}

#[test]
fn mixed_range_toggle_sets_the_mark_everywhere() {
    let mut editor = editor_with_value("<p><strong>He</strong>llo</p>");
    select(&mut editor, (vec![0, 0], 0), (vec![0, 1], 3));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(to_markup(editor.doc()), "<p><strong>Hello</strong></p>");
}

#[test]
fn marks_stack_without_clobbering_each_other() {
    let mut editor = editor_with_value("<p>Hello</p>");
    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));
    editor.run_command("marks.toggle_bold", None).unwrap();

    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));
    editor.run_command("marks.toggle_italic", None).unwrap();

    assert_eq!(
        to_markup(editor.doc()),
        "<p><strong><em>Hello</em></strong></p>"
    );
    assert!(editor.run_query::<bool>("marks.is_bold_active", None).unwrap());
    assert!(
        editor
            .run_query::<bool>("marks.is_italic_active", None)
            .unwrap()
    );
}

#[test]
fn set_link_applies_href_and_unset_removes_it() {
    let mut editor = editor_with_value("<p>Hello</p>");
    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));

    editor
        .run_command(
            "marks.set_link",
            Some(serde_json::json!({ "url": "https://example.com" })),
        )
        .unwrap();

    let markup = to_markup(editor.doc());
    assert!(markup.contains("href=\"https://example.com\""));
    assert!(markup.contains("target=\"_blank\""));
    assert!(markup.contains("rel=\"noopener noreferrer\""));
    assert!(
        editor
            .run_query::<bool>("marks.has_link_active", None)
            .unwrap()
    );

    select(&mut editor, (vec![0, 0], 0), (vec![0, 0], 5));
    editor.run_command("marks.unset_link", None).unwrap();
    assert_eq!(to_markup(editor.doc()), "<p>Hello</p>");
}

#[test]
fn set_link_requires_a_url() {
    let mut editor = editor_with_value("<p>Hello</p>");
    let err = editor
        .run_command("marks.set_link", Some(serde_json::json!({ "url": "  " })))
        .unwrap_err();
    assert!(err.message().contains("url"));
}
