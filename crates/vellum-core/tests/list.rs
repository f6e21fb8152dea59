use vellum_core::{parse_markup, to_markup, Editor, PluginRegistry, Point, Selection};

fn editor_with_value(value: &str) -> Editor {
    let doc = parse_markup(value).expect("parse");
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::richtext())
}

#[test]
fn toggle_bulleted_converts_paragraph_to_list_item() {
    let mut editor = editor_with_value("<p>item</p>");

    editor.run_command("list.toggle_bulleted", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<ul><li>item</li></ul>");
    assert_eq!(
        editor
            .run_query::<Option<String>>("list.active_type", None)
            .unwrap()
            .as_deref(),
        Some("bulleted")
    );
    assert!(
        editor
            .run_query::<bool>("list.is_active", Some(serde_json::json!({ "type": "bulleted" })))
            .unwrap()
    );
}

#[test]
fn toggle_same_type_again_restores_a_paragraph() {
    let mut editor = editor_with_value("<p>item</p>");

    editor.run_command("list.toggle_bulleted", None).unwrap();
    editor.run_command("list.toggle_bulleted", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<p>item</p>");
}

#[test]
fn toggle_other_type_switches_the_list_type_in_place() {
    let mut editor = editor_with_value("<ul><li>item</li></ul>");

    editor.run_command("list.toggle_ordered", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<ol><li>item</li></ol>");
}

#[test]
fn unwrap_converts_list_item_back_to_paragraph() {
    let mut editor = editor_with_value("<ol><li>item</li></ol>");

    editor.run_command("list.unwrap", None).unwrap();

    assert_eq!(to_markup(editor.doc()), "<p>item</p>");
}

#[test]
fn unwrap_is_unavailable_outside_a_list() {
    let editor = editor_with_value("<p>item</p>");
    assert!(!editor.command_available("list.unwrap"));
}

#[test]
fn adjacent_items_of_one_type_serialize_as_one_container() {
    let editor = editor_with_value("<ul><li>one</li><li>two</li></ul><ol><li>three</li></ol>");

    assert_eq!(
        to_markup(editor.doc()),
        "<ul><li>one</li><li>two</li></ul><ol><li>three</li></ol>"
    );
}
