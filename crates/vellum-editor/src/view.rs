//! View-geometry traits between the editor surface and the host toolkit.
//!
//! The surface never touches a widget tree directly. The host implements
//! [`ViewGeometry`] over whatever it renders with; the surface drives it
//! through pointer events and transient preview sizes. This keeps the same
//! interaction logic usable across toolkits.

use vellum_core::Path;

/// Identifier the host assigns to a rendered image element. Stable for the
/// lifetime of that element; meaningless to the document model.
pub type ImageId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedSize {
    pub width: f32,
    pub height: f32,
}

impl RenderedSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Result of hit-testing a pointer position against rendered images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageHit {
    pub id: ImageId,
    /// The element's current rendered size at gesture start.
    pub size: RenderedSize,
}

/// Host-implemented geometry access for the editable surface.
pub trait ViewGeometry {
    /// Hit-test a pointer position against rendered image elements.
    fn image_at(&self, position: PointerPosition) -> Option<ImageHit>;

    /// Resolve a rendered image back to its position in the document tree.
    ///
    /// Returns None if the element no longer maps to a document node (for
    /// example, the node was deleted while a gesture was in flight).
    fn image_document_path(&self, image: ImageId) -> Option<Path>;

    /// Apply a transient on-screen size to a rendered image. Purely visual;
    /// the document model is not involved.
    fn set_preview_size(&mut self, image: ImageId, size: RenderedSize);

    /// Drop any transient size previously applied to a rendered image.
    fn clear_preview_size(&mut self, image: ImageId);
}
