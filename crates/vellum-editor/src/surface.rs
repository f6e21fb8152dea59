//! The editable surface: owns the document editor, keeps the external
//! serialized value in sync with it, and hosts the toolbar, dialogs and
//! pointer interactions.
//!
//! The external value is the source of truth. Incoming values that differ
//! from the current serialization replace the content wholesale; local
//! transactions serialize back out through `on_change`. Neither path feeds
//! the other, so no update loop is possible.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::json;
use vellum_core::{to_markup, parse_markup, Document, Editor, Node, Selection};

use crate::dialogs::{
    ImageDialog, ImageFile, ImageUploader, LinkDialog, TableDialog, UploadError, UploadRequest,
    UploadRequestId,
};
use crate::resize::{px_string, ImageResize};
use crate::table_toolbar::{table_toolbar, TableControl, TableToolbar};
use crate::theme::EditorTheme;
use crate::toolbar::{control_active, toolbar_buttons, ToolbarButton, ToolbarControl};
use crate::view::{PointerPosition, ViewGeometry};

pub struct EditorSurface {
    editor: Editor,
    read_only: bool,
    placeholder: Option<String>,
    uploader: Option<Arc<dyn ImageUploader>>,
    on_change: Option<Box<dyn FnMut(&str)>>,
    /// Serialization of the live document; compared against incoming
    /// external values and handed to `on_change`.
    serialized: String,
    theme: EditorTheme,
    image_dialog: ImageDialog,
    link_dialog: LinkDialog,
    table_dialog: TableDialog,
    resize: ImageResize,
    next_upload_id: UploadRequestId,
}

impl Default for EditorSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSurface {
    pub fn new() -> Self {
        let editor = Editor::with_richtext_plugins();
        let serialized = to_markup(editor.doc());
        Self {
            editor,
            read_only: false,
            placeholder: None,
            uploader: None,
            on_change: None,
            serialized,
            theme: EditorTheme::default(),
            image_dialog: ImageDialog::default(),
            link_dialog: LinkDialog::default(),
            table_dialog: TableDialog::default(),
            resize: ImageResize::new(),
            next_upload_id: 1,
        }
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.load_value(value);
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.set_read_only(read_only);
        self
    }

    pub fn uploader(mut self, uploader: Arc<dyn ImageUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn theme(mut self, theme: EditorTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn on_change(mut self, on_change: impl FnMut(&str) + 'static) -> Self {
        self.on_change = Some(Box::new(on_change));
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn current_theme(&self) -> &EditorTheme {
        &self.theme
    }

    pub fn placeholder_text(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        if self.read_only == read_only {
            return;
        }
        self.read_only = read_only;
        if read_only {
            self.image_dialog.close();
            self.link_dialog.close();
            self.table_dialog.close();
        }
    }

    /// The current serialized value, as last emitted or loaded.
    pub fn value(&self) -> &str {
        &self.serialized
    }

    /// True when the document is a single empty paragraph; hosts render the
    /// placeholder in that case.
    pub fn is_empty(&self) -> bool {
        let children = &self.editor.doc().children;
        children.len() == 1
            && matches!(
                &children[0],
                Node::Element(el) if el.kind == "paragraph"
                    && el.children.iter().all(
                        |n| matches!(n, Node::Text(t) if t.text.is_empty()),
                    )
            )
    }

    /// Reconcile an external value change. A value equal to the current
    /// serialization is a no-op; anything else replaces the content
    /// wholesale. `on_change` does not fire for external loads.
    pub fn set_value(&mut self, value: &str) {
        if value == self.serialized {
            return;
        }
        self.load_value(value);
    }

    fn load_value(&mut self, value: &str) {
        let doc = match parse_markup(value) {
            Ok(doc) => doc,
            Err(err) => {
                // A corrupt persisted value must never take the editor down.
                log::warn!("failed to parse editor value, substituting empty document: {err}");
                Document::default()
            }
        };
        self.editor.replace_document(doc);
        self.serialized = to_markup(self.editor.doc());
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.editor.set_selection(selection);
    }

    /// Run a document command and push the resulting value outward. Inert
    /// in read-only mode.
    pub fn run_command(&mut self, id: &str, args: Option<serde_json::Value>) {
        if self.read_only {
            return;
        }
        match self.editor.run_command(id, args) {
            Ok(()) => self.sync_after_local_edit(),
            Err(err) => log::debug!("command {id} failed: {}", err.message()),
        }
    }

    fn sync_after_local_edit(&mut self) {
        let value = to_markup(self.editor.doc());
        if value == self.serialized {
            return;
        }
        self.serialized = value;
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&self.serialized);
        }
    }

    pub fn undo(&mut self) {
        if self.read_only {
            return;
        }
        if self.editor.undo() {
            self.sync_after_local_edit();
        }
    }

    pub fn redo(&mut self) {
        if self.read_only {
            return;
        }
        if self.editor.redo() {
            self.sync_after_local_edit();
        }
    }

    /// The toolbar row, or None in read-only mode (the toolbar is not
    /// rendered at all).
    pub fn toolbar(&self) -> Option<Vec<ToolbarButton>> {
        if self.read_only {
            return None;
        }
        Some(toolbar_buttons(&self.editor))
    }

    pub fn activate(&mut self, control: ToolbarControl) {
        if self.read_only {
            return;
        }
        match control {
            ToolbarControl::Bold => self.run_command("marks.toggle_bold", None),
            ToolbarControl::Italic => self.run_command("marks.toggle_italic", None),
            ToolbarControl::Underline => self.run_command("marks.toggle_underline", None),
            ToolbarControl::Strikethrough => self.run_command("marks.toggle_strikethrough", None),
            ToolbarControl::Heading1 => self.toggle_heading(1),
            ToolbarControl::Heading2 => self.toggle_heading(2),
            ToolbarControl::BulletedList => self.run_command("list.toggle_bulleted", None),
            ToolbarControl::OrderedList => self.run_command("list.toggle_ordered", None),
            ToolbarControl::Blockquote => {
                if control_active(&self.editor, ToolbarControl::Blockquote) {
                    self.run_command("blockquote.unwrap", None);
                } else {
                    self.run_command("blockquote.wrap_selection", None);
                }
            }
            ToolbarControl::CodeBlock => self.run_command("code_block.toggle", None),
            ToolbarControl::Link => self.link_dialog.open(),
            ToolbarControl::Image => self.image_dialog.open(),
            ToolbarControl::Table => self.table_dialog.open(),
        }
    }

    fn toggle_heading(&mut self, level: u64) {
        let active = self
            .editor
            .run_query::<Option<u64>>("block.heading_level", None)
            .unwrap_or(None);
        if active == Some(level) {
            self.run_command("block.unset_heading", None);
        } else {
            self.run_command("block.set_heading", Some(json!({ "level": level })));
        }
    }

    pub fn link_dialog(&self) -> &LinkDialog {
        &self.link_dialog
    }

    pub fn close_link_dialog(&mut self) {
        self.link_dialog.close();
    }

    /// Submit the link dialog. Requires a non-empty URL; returns whether the
    /// link was applied and the dialog closed.
    pub fn submit_link(&mut self, url: &str) -> bool {
        if self.read_only || !self.link_dialog.is_open() {
            return false;
        }
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        self.run_command("marks.set_link", Some(json!({ "url": url })));
        self.link_dialog.close();
        true
    }

    pub fn remove_link(&mut self) {
        self.run_command("marks.unset_link", None);
    }

    pub fn image_dialog(&self) -> &ImageDialog {
        &self.image_dialog
    }

    pub fn close_image_dialog(&mut self) {
        self.image_dialog.close();
    }

    /// Insert an image by direct URL. Requires a non-empty URL; returns
    /// whether the image was inserted and the dialog closed.
    pub fn submit_image_url(&mut self, url: &str, alt: Option<&str>) -> bool {
        if self.read_only || !self.image_dialog.is_open() || self.image_dialog.is_busy() {
            return false;
        }
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        let mut args = json!({ "src": url });
        if let Some(alt) = alt {
            args["alt"] = json!(alt);
        }
        self.run_command("image.insert", Some(args));
        self.image_dialog.close();
        true
    }

    /// Submit a file through the upload path. With an uploader injected the
    /// dialog goes busy until the host resolves the request; without one the
    /// file is inlined as a data URL and inserted immediately.
    pub fn submit_image_file(&mut self, file: ImageFile) {
        if self.read_only || !self.image_dialog.is_open() || self.image_dialog.is_busy() {
            return;
        }

        match self.uploader.clone() {
            Some(uploader) => {
                let id = self.next_upload_id;
                self.next_upload_id += 1;
                self.image_dialog.begin_upload(id);
                uploader.upload(UploadRequest { id, file });
            }
            None => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
                let src = format!("data:{};base64,{encoded}", file.mime);
                let alt = file.name;
                self.run_command("image.insert", Some(json!({ "src": src, "alt": alt })));
                self.image_dialog.close();
            }
        }
    }

    /// Deliver the outcome of an upload started by `submit_image_file`.
    /// Success inserts the image and closes the dialog; failure keeps the
    /// dialog open with the error recorded. Outcomes for requests the
    /// dialog no longer tracks are dropped.
    pub fn finish_image_upload(
        &mut self,
        id: UploadRequestId,
        result: Result<String, UploadError>,
    ) {
        if !self.image_dialog.is_pending(id) {
            return;
        }
        match result {
            Ok(url) => {
                self.image_dialog.close();
                self.run_command("image.insert", Some(json!({ "src": url })));
            }
            Err(err) => {
                log::warn!("image upload failed: {err}");
                self.image_dialog.fail_upload(err.to_string());
            }
        }
    }

    pub fn table_dialog(&self) -> &TableDialog {
        &self.table_dialog
    }

    pub fn close_table_dialog(&mut self) {
        self.table_dialog.close();
    }

    /// Submit the table dialog. Counts are clamped to the model's 1..=10
    /// bounds; the inserted table always has a header row.
    pub fn submit_table(&mut self, rows: u64, cols: u64) -> bool {
        if self.read_only || !self.table_dialog.is_open() {
            return false;
        }
        self.run_command("table.insert", Some(json!({ "rows": rows, "cols": cols })));
        self.table_dialog.close();
        true
    }

    /// The contextual table toolbar, present only while the selection is
    /// inside a table. Recomputed from the live selection on every call.
    pub fn table_toolbar(&self) -> Option<TableToolbar> {
        if self.read_only {
            return None;
        }
        table_toolbar(&self.editor)
    }

    pub fn activate_table(&mut self, control: TableControl) {
        self.run_command(control.command_id(), None);
    }

    /// Pointer-down over the surface. Returns true when the gesture was
    /// claimed for an image resize, in which case the host must suppress its
    /// own handling (text selection) for this gesture.
    pub fn pointer_down<V: ViewGeometry>(&mut self, position: PointerPosition, view: &V) -> bool {
        if self.read_only {
            return false;
        }
        let Some(hit) = view.image_at(position) else {
            return false;
        };
        self.resize.begin(hit, position)
    }

    /// Pointer movement while a resize is live: transient preview only, no
    /// model mutation.
    pub fn pointer_move<V: ViewGeometry>(&mut self, position: PointerPosition, view: &mut V) {
        if let Some((image, size)) = self.resize.update(position) {
            view.set_preview_size(image, size);
        }
    }

    /// Pointer-up: commit the final size through the document model. This is
    /// the only point at which a resize reaches `on_change`.
    pub fn pointer_up<V: ViewGeometry>(&mut self, position: PointerPosition, view: &mut V) {
        let Some(commit) = self.resize.finish(position) else {
            return;
        };
        view.clear_preview_size(commit.image);
        if !commit.changed {
            return;
        }
        let Some(path) = view.image_document_path(commit.image) else {
            // Node vanished mid-drag; a benign race, drop the change.
            log::debug!("resize target no longer resolves to a document node; discarding");
            return;
        };
        self.run_command(
            "image.set_size",
            Some(json!({
                "path": path,
                "width": px_string(commit.size.width),
                "height": px_string(commit.size.height),
            })),
        );
    }

    /// Surface teardown. Abandons a live drag without committing and drops
    /// its preview, so an unmount mid-gesture never mutates a dead view.
    pub fn detach<V: ViewGeometry>(&mut self, view: &mut V) {
        if let Some(image) = self.resize.cancel() {
            view.clear_preview_size(image);
        }
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_dragging()
    }
}
