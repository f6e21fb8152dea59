use vellum_core::Editor;

/// Contextual controls shown while the selection sits inside a table. Each
/// is a direct passthrough to one table command; the model's normalize pass
/// keeps the grid rectangular, so no cell bookkeeping happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableControl {
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    DeleteTable,
}

impl TableControl {
    pub const ALL: [TableControl; 7] = [
        TableControl::AddColumnBefore,
        TableControl::AddColumnAfter,
        TableControl::DeleteColumn,
        TableControl::AddRowBefore,
        TableControl::AddRowAfter,
        TableControl::DeleteRow,
        TableControl::DeleteTable,
    ];

    pub fn command_id(self) -> &'static str {
        match self {
            TableControl::AddColumnBefore => "table.insert_col_left",
            TableControl::AddColumnAfter => "table.insert_col_right",
            TableControl::DeleteColumn => "table.delete_col",
            TableControl::AddRowBefore => "table.insert_row_above",
            TableControl::AddRowAfter => "table.insert_row_below",
            TableControl::DeleteRow => "table.delete_row",
            TableControl::DeleteTable => "table.delete_table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableToolbarButton {
    pub control: TableControl,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableToolbar {
    pub buttons: Vec<TableToolbarButton>,
}

pub(crate) fn table_toolbar(editor: &Editor) -> Option<TableToolbar> {
    let in_table = editor
        .run_query::<bool>("table.is_active", None)
        .unwrap_or(false);
    if !in_table {
        return None;
    }

    Some(TableToolbar {
        buttons: TableControl::ALL
            .iter()
            .map(|&control| TableToolbarButton {
                control,
                enabled: editor.command_available(control.command_id()),
            })
            .collect(),
    })
}
