mod dialogs;
mod resize;
mod surface;
mod table_toolbar;
mod theme;
mod toolbar;
mod view;

pub use crate::dialogs::*;
pub use crate::resize::*;
pub use crate::surface::*;
pub use crate::table_toolbar::*;
pub use crate::theme::*;
pub use crate::toolbar::*;
pub use crate::view::*;
