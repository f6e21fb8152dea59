use vellum_core::{parse_markup, to_markup, Editor, Node, PluginRegistry, Point, Selection};

fn editor_with_value(value: &str) -> Editor {
    let doc = parse_markup(value).expect("parse");
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::richtext())
}

#[test]
fn set_heading_converts_the_active_paragraph() {
    let mut editor = editor_with_value("<p>Title</p>");

    editor
        .run_command("block.set_heading", Some(serde_json::json!({ "level": 1 })))
        .unwrap();

    assert_eq!(to_markup(editor.doc()), "<h1>Title</h1>");
    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        Some(1)
    );
}

#[test]
fn heading_levels_clamp_to_two() {
    let mut editor = editor_with_value("<p>Title</p>");

    editor
        .run_command("block.set_heading", Some(serde_json::json!({ "level": 5 })))
        .unwrap();

    assert_eq!(to_markup(editor.doc()), "<h2>Title</h2>");
}

#[test]
fn unset_heading_restores_a_paragraph() {
    let mut editor = editor_with_value("<h2>Title</h2>");

    editor.run_command("block.unset_heading", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<p>Title</p>");
    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        None
    );
}

#[test]
fn unset_heading_is_unavailable_outside_a_heading() {
    let editor = editor_with_value("<p>Body</p>");
    assert!(!editor.command_available("block.unset_heading"));
    assert!(editor.command_available("block.set_heading"));
}

#[test]
fn setting_the_current_level_is_a_no_op() {
    let mut editor = editor_with_value("<h1>Title</h1>");
    let before = editor.doc().clone();

    editor
        .run_command("block.set_heading", Some(serde_json::json!({ "level": 1 })))
        .unwrap();

    assert_eq!(editor.doc(), &before);
    assert!(matches!(
        editor.doc().children.first(),
        Some(Node::Element(el)) if el.kind == "heading"
    ));
}
