//! Modal dialog state for the toolbar's insert flows.
//!
//! The dialogs are plain state machines; rendering them is the host's job.
//! Only the image dialog carries asynchronous state: an in-flight upload,
//! identified by a request id so a stale completion can be told apart from
//! the current one.

#[derive(Debug, Clone, thiserror::Error)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Failed(String),
}

/// An image file handed to the upload capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub type UploadRequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub id: UploadRequestId,
    pub file: ImageFile,
}

/// Injected upload capability. `upload` is handed the file and must
/// eventually resolve the request through
/// [`EditorSurface::finish_image_upload`](crate::EditorSurface::finish_image_upload)
/// with the same id. The editor is indifferent to the transport.
pub trait ImageUploader {
    fn upload(&self, request: UploadRequest);
}

#[derive(Debug, Default)]
pub struct ImageDialog {
    open: bool,
    pending: Option<UploadRequestId>,
    error: Option<String>,
}

impl ImageDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True while an upload is in flight; the drop target is disabled and
    /// further submissions are refused.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
        self.pending = None;
        self.error = None;
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
        self.pending = None;
        self.error = None;
    }

    pub(crate) fn begin_upload(&mut self, id: UploadRequestId) {
        self.pending = Some(id);
        self.error = None;
    }

    pub(crate) fn is_pending(&self, id: UploadRequestId) -> bool {
        self.open && self.pending == Some(id)
    }

    pub(crate) fn fail_upload(&mut self, message: String) {
        self.pending = None;
        self.error = Some(message);
    }
}

#[derive(Debug, Default)]
pub struct LinkDialog {
    open: bool,
}

impl LinkDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
    }
}

#[derive(Debug, Default)]
pub struct TableDialog {
    open: bool,
}

impl TableDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
    }
}
