use vellum_core::{Editor, Marks, Op, Transaction};

#[test]
fn marks_queries_reflect_active_marks_at_focus() {
    let mut editor = Editor::with_richtext_plugins();

    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "hello".to_string(),
        }]))
        .unwrap();

    assert_eq!(
        editor
            .run_query::<bool>("marks.is_bold_active", None)
            .unwrap(),
        false
    );

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(
        editor
            .run_query::<bool>("marks.is_bold_active", None)
            .unwrap(),
        true
    );

    editor.run_command("marks.toggle_italic", None).unwrap();
    let active = editor.run_query::<Marks>("marks.get_active", None).unwrap();
    assert!(active.bold);
    assert!(active.italic);
    assert!(!active.underline);
}

#[test]
fn block_queries_follow_the_selection() {
    let mut editor = Editor::with_richtext_plugins();

    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        None
    );
    assert!(!editor.run_query::<bool>("table.is_active", None).unwrap());
    assert!(
        !editor
            .run_query::<bool>("blockquote.is_active", None)
            .unwrap()
    );
    assert!(
        !editor
            .run_query::<bool>("code_block.is_active", None)
            .unwrap()
    );

    editor
        .run_command("block.set_heading", Some(serde_json::json!({ "level": 2 })))
        .unwrap();
    assert_eq!(
        editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap(),
        Some(2)
    );
}

#[test]
fn unknown_command_is_an_error_and_unknown_availability_is_false() {
    let mut editor = Editor::with_richtext_plugins();
    assert!(editor.run_command("nope.nothing", None).is_err());
    assert!(!editor.command_available("nope.nothing"));
    assert!(editor.run_query_json("nope.nothing", None).is_err());
}
