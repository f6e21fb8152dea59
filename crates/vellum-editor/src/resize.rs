//! Pointer-driven image resizing.
//!
//! A gesture has two states: idle and dragging. The drag session is the only
//! mutable state and has a single writer; it lives from pointer-down over an
//! image until pointer-up, and is never serialized. While a session is live
//! the session is the source of truth for the image's on-screen size; the
//! document model is only touched at commit.

use crate::view::{ImageHit, ImageId, PointerPosition, RenderedSize};

/// Floor for the committed and previewed width. Keeps a drag from
/// collapsing an image into an invisible sliver.
pub const MIN_IMAGE_WIDTH: f32 = 50.0;

#[derive(Debug, Clone)]
struct DragSession {
    image: ImageId,
    start_x: f32,
    start_size: RenderedSize,
    aspect_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeCommit {
    pub image: ImageId,
    pub size: RenderedSize,
    /// False when the pointer came back to the starting width; nothing to
    /// write in that case.
    pub changed: bool,
}

#[derive(Debug, Default)]
pub struct ImageResize {
    session: Option<DragSession>,
}

impl ImageResize {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session from a hit image. Returns whether the gesture was
    /// claimed; degenerate starting geometry refuses the gesture.
    pub fn begin(&mut self, hit: ImageHit, position: PointerPosition) -> bool {
        if self.session.is_some() {
            // Drags only originate from a fresh pointer-down; a second one
            // mid-gesture is ignored and the live session kept.
            return true;
        }
        if hit.size.width <= 0.0 || hit.size.height <= 0.0 {
            return false;
        }

        self.session = Some(DragSession {
            image: hit.id,
            start_x: position.x,
            start_size: hit.size,
            aspect_ratio: hit.size.width / hit.size.height,
        });
        true
    }

    /// Track pointer movement. Returns the preview size to apply, or None
    /// when no session is live.
    pub fn update(&mut self, position: PointerPosition) -> Option<(ImageId, RenderedSize)> {
        let session = self.session.as_ref()?;
        Some((session.image, session.size_at(position.x)))
    }

    /// End the session at a pointer position and report what to commit.
    pub fn finish(&mut self, position: PointerPosition) -> Option<ResizeCommit> {
        let session = self.session.take()?;
        let size = session.size_at(position.x);
        let changed = (size.width - session.start_size.width).abs() >= 0.5;
        Some(ResizeCommit {
            image: session.image,
            size,
            changed,
        })
    }

    /// Abandon a live session without committing (surface teardown).
    pub fn cancel(&mut self) -> Option<ImageId> {
        self.session.take().map(|session| session.image)
    }
}

impl DragSession {
    /// Only horizontal movement drives the resize; the height follows from
    /// the captured aspect ratio. Single-axis scaling is deliberate.
    fn size_at(&self, x: f32) -> RenderedSize {
        let delta_x = x - self.start_x;
        let width = (self.start_size.width + delta_x).max(MIN_IMAGE_WIDTH);
        RenderedSize {
            width,
            height: width / self.aspect_ratio,
        }
    }
}

/// Attribute value for a committed dimension, e.g. `"250px"`.
pub(crate) fn px_string(value: f32) -> String {
    format!("{}px", value.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(width: f32, height: f32) -> ImageHit {
        ImageHit {
            id: 7,
            size: RenderedSize { width, height },
        }
    }

    #[test]
    fn width_follows_horizontal_delta_and_height_keeps_aspect() {
        let mut resize = ImageResize::new();
        assert!(resize.begin(hit(200.0, 100.0), PointerPosition::new(10.0, 10.0)));

        let (_, size) = resize.update(PointerPosition::new(60.0, 400.0)).unwrap();
        assert_eq!(size.width, 250.0);
        assert_eq!(size.height, 125.0);

        let commit = resize.finish(PointerPosition::new(60.0, 400.0)).unwrap();
        assert!(commit.changed);
        assert_eq!(commit.size.width, 250.0);
        assert_eq!(commit.size.height, 125.0);
        assert!(!resize.is_dragging());
    }

    #[test]
    fn vertical_only_movement_changes_nothing() {
        let mut resize = ImageResize::new();
        assert!(resize.begin(hit(200.0, 100.0), PointerPosition::new(10.0, 10.0)));

        let commit = resize.finish(PointerPosition::new(10.0, 300.0)).unwrap();
        assert!(!commit.changed);
    }

    #[test]
    fn width_clamps_to_minimum() {
        let mut resize = ImageResize::new();
        assert!(resize.begin(hit(200.0, 100.0), PointerPosition::new(500.0, 0.0)));

        let (_, size) = resize.update(PointerPosition::new(0.0, 0.0)).unwrap();
        assert_eq!(size.width, MIN_IMAGE_WIDTH);
        assert_eq!(size.height, MIN_IMAGE_WIDTH / 2.0);
    }

    #[test]
    fn degenerate_start_size_refuses_the_gesture() {
        let mut resize = ImageResize::new();
        assert!(!resize.begin(hit(0.0, 100.0), PointerPosition::default()));
        assert!(!resize.is_dragging());
    }

    #[test]
    fn px_string_rounds_to_whole_pixels() {
        assert_eq!(px_string(249.6), "250px");
        assert_eq!(px_string(50.0), "50px");
    }
}
