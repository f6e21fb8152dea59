use vellum_core::Editor;

/// The toolbar's button set. Buttons either run one command or open the
/// matching dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarControl {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Heading1,
    Heading2,
    BulletedList,
    OrderedList,
    Blockquote,
    CodeBlock,
    Link,
    Image,
    Table,
}

impl ToolbarControl {
    pub const ALL: [ToolbarControl; 13] = [
        ToolbarControl::Bold,
        ToolbarControl::Italic,
        ToolbarControl::Underline,
        ToolbarControl::Strikethrough,
        ToolbarControl::Heading1,
        ToolbarControl::Heading2,
        ToolbarControl::BulletedList,
        ToolbarControl::OrderedList,
        ToolbarControl::Blockquote,
        ToolbarControl::CodeBlock,
        ToolbarControl::Link,
        ToolbarControl::Image,
        ToolbarControl::Table,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolbarButton {
    pub control: ToolbarControl,
    pub active: bool,
    pub enabled: bool,
}

pub(crate) fn toolbar_buttons(editor: &Editor) -> Vec<ToolbarButton> {
    ToolbarControl::ALL
        .iter()
        .map(|&control| ToolbarButton {
            control,
            active: control_active(editor, control),
            enabled: control_enabled(editor, control),
        })
        .collect()
}

fn query_bool(editor: &Editor, id: &str) -> bool {
    editor.run_query::<bool>(id, None).unwrap_or(false)
}

fn heading_level(editor: &Editor) -> Option<u64> {
    editor
        .run_query::<Option<u64>>("block.heading_level", None)
        .unwrap_or(None)
}

fn list_type(editor: &Editor) -> Option<String> {
    editor
        .run_query::<Option<String>>("list.active_type", None)
        .unwrap_or(None)
}

pub(crate) fn control_active(editor: &Editor, control: ToolbarControl) -> bool {
    match control {
        ToolbarControl::Bold => query_bool(editor, "marks.is_bold_active"),
        ToolbarControl::Italic => query_bool(editor, "marks.is_italic_active"),
        ToolbarControl::Underline => query_bool(editor, "marks.is_underline_active"),
        ToolbarControl::Strikethrough => query_bool(editor, "marks.is_strikethrough_active"),
        ToolbarControl::Heading1 => heading_level(editor) == Some(1),
        ToolbarControl::Heading2 => heading_level(editor) == Some(2),
        ToolbarControl::BulletedList => list_type(editor).as_deref() == Some("bulleted"),
        ToolbarControl::OrderedList => list_type(editor).as_deref() == Some("ordered"),
        ToolbarControl::Blockquote => query_bool(editor, "blockquote.is_active"),
        ToolbarControl::CodeBlock => query_bool(editor, "code_block.is_active"),
        ToolbarControl::Link => query_bool(editor, "marks.has_link_active"),
        ToolbarControl::Image | ToolbarControl::Table => false,
    }
}

/// Enabled state mirrors the commands' own availability checks; the toolbar
/// maintains no flag of its own.
pub(crate) fn control_enabled(editor: &Editor, control: ToolbarControl) -> bool {
    match control {
        ToolbarControl::Bold => editor.command_available("marks.toggle_bold"),
        ToolbarControl::Italic => editor.command_available("marks.toggle_italic"),
        ToolbarControl::Underline => editor.command_available("marks.toggle_underline"),
        ToolbarControl::Strikethrough => editor.command_available("marks.toggle_strikethrough"),
        ToolbarControl::Heading1 | ToolbarControl::Heading2 => {
            editor.command_available("block.set_heading")
                || editor.command_available("block.unset_heading")
        }
        ToolbarControl::BulletedList => editor.command_available("list.toggle_bulleted"),
        ToolbarControl::OrderedList => editor.command_available("list.toggle_ordered"),
        ToolbarControl::Blockquote => {
            editor.command_available("blockquote.wrap_selection")
                || editor.command_available("blockquote.unwrap")
        }
        ToolbarControl::CodeBlock => editor.command_available("code_block.toggle"),
        ToolbarControl::Link => editor.command_available("marks.set_link"),
        ToolbarControl::Image => editor.command_available("image.insert"),
        ToolbarControl::Table => editor.command_available("table.insert"),
    }
}
