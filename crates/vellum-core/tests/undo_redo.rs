use vellum_core::{to_markup, Editor, Op, Transaction};

#[test]
fn undo_and_redo_walk_the_transaction_history() {
    let mut editor = Editor::with_richtext_plugins();
    assert!(!editor.can_undo());

    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "hello".to_string(),
        }]))
        .unwrap();
    assert_eq!(to_markup(editor.doc()), "<p>hello</p>");
    assert!(editor.can_undo());

    assert!(editor.undo());
    assert_eq!(to_markup(editor.doc()), "<p></p>");
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(to_markup(editor.doc()), "<p>hello</p>");
}

#[test]
fn command_transactions_are_undoable() {
    let mut editor = Editor::with_richtext_plugins();
    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "hello".to_string(),
        }]))
        .unwrap();

    editor
        .run_command("block.set_heading", Some(serde_json::json!({ "level": 1 })))
        .unwrap();
    assert_eq!(to_markup(editor.doc()), "<h1>hello</h1>");

    assert!(editor.undo());
    assert_eq!(to_markup(editor.doc()), "<p>hello</p>");
}

#[test]
fn a_new_transaction_clears_the_redo_stack() {
    let mut editor = Editor::with_richtext_plugins();
    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".to_string(),
        }]))
        .unwrap();
    assert!(editor.undo());
    assert!(editor.can_redo());

    editor
        .apply(Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "b".to_string(),
        }]))
        .unwrap();
    assert!(!editor.can_redo());
}
