use vellum_core::{Point, Selection};
use vellum_editor::{EditorSurface, TableControl, ToolbarControl};

fn button(surface: &EditorSurface, control: ToolbarControl) -> (bool, bool) {
    let buttons = surface.toolbar().expect("toolbar rendered");
    let button = buttons
        .iter()
        .find(|b| b.control == control)
        .expect("button present");
    (button.active, button.enabled)
}

#[test]
fn toggled_state_tracks_the_selection() {
    let mut surface = EditorSurface::new().default_value("<p>Hello</p>");
    surface.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 5),
    });

    assert_eq!(button(&surface, ToolbarControl::Bold), (false, true));

    surface.activate(ToolbarControl::Bold);
    assert_eq!(button(&surface, ToolbarControl::Bold), (true, true));

    surface.activate(ToolbarControl::Heading2);
    assert_eq!(button(&surface, ToolbarControl::Heading2), (true, true));
    assert_eq!(button(&surface, ToolbarControl::Heading1), (false, true));

    // Toggling the active level off restores a paragraph.
    surface.activate(ToolbarControl::Heading2);
    assert_eq!(button(&surface, ToolbarControl::Heading2), (false, true));
    assert!(surface.value().starts_with("<p>"));
}

#[test]
fn table_insert_button_disables_inside_a_table() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");
    assert_eq!(button(&surface, ToolbarControl::Table), (false, true));

    surface.activate(ToolbarControl::Table);
    surface.submit_table(2, 2);

    // Selection landed in the first header cell.
    assert_eq!(button(&surface, ToolbarControl::Table), (false, false));
}

#[test]
fn table_toolbar_appears_only_inside_a_table() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");
    assert!(surface.table_toolbar().is_none());

    surface.activate(ToolbarControl::Table);
    surface.submit_table(2, 2);

    let toolbar = surface.table_toolbar().expect("toolbar visible in table");
    assert_eq!(toolbar.buttons.len(), 7);
    assert!(toolbar.buttons.iter().all(|b| b.enabled));
}

#[test]
fn add_column_after_on_the_last_column_grows_every_row() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");
    surface.activate(ToolbarControl::Table);
    surface.submit_table(2, 2);

    // Move into the last column of the header row.
    surface.set_selection(Selection::collapsed(Point::new(vec![1, 0, 1, 0, 0], 0)));
    surface.activate_table(TableControl::AddColumnAfter);

    let markup = surface.value();
    assert_eq!(markup.matches("<tr>").count(), 2);
    assert_eq!(markup.matches("<th").count(), 3);
    assert_eq!(markup.matches("<td").count(), 3);
    // Header cells all precede body cells: row 0 is still the header.
    let last_th = markup.rfind("<th").unwrap();
    let first_td = markup.find("<td").unwrap();
    assert!(last_th < first_td);
}

#[test]
fn delete_table_control_dismisses_the_toolbar() {
    let mut surface = EditorSurface::new().default_value("<p>text</p>");
    surface.activate(ToolbarControl::Table);
    surface.submit_table(2, 2);
    assert!(surface.table_toolbar().is_some());

    surface.activate_table(TableControl::DeleteTable);
    assert!(surface.table_toolbar().is_none());
    assert!(!surface.value().contains("<table>"));
}

#[test]
fn read_only_renders_no_toolbar_and_suppresses_every_edit() {
    let mut surface = EditorSurface::new()
        .default_value("<p>Hello</p>")
        .read_only(true);
    let before = surface.value().to_string();

    assert!(surface.toolbar().is_none());
    assert!(surface.table_toolbar().is_none());

    surface.set_selection(Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 0], 5),
    });
    for control in ToolbarControl::ALL {
        surface.activate(control);
    }
    assert!(!surface.link_dialog().is_open());
    assert!(!surface.image_dialog().is_open());
    assert!(!surface.table_dialog().is_open());

    surface.run_command("marks.toggle_bold", None);
    surface.run_command(
        "table.insert",
        Some(serde_json::json!({ "rows": 2, "cols": 2 })),
    );
    assert!(!surface.submit_link("https://example.com"));
    assert!(!surface.submit_table(2, 2));
    surface.undo();

    assert_eq!(surface.value(), before);
}
