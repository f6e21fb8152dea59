/// Visual constants for a surface. Owned by the surface and dropped with
/// it; there is no process-wide stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorTheme {
    pub background: &'static str,
    pub border: &'static str,
    pub radius: f32,
    pub foreground: &'static str,
    pub muted_foreground: &'static str,
    pub link: &'static str,
    pub selection: &'static str,
    pub code_background: &'static str,
}

impl Default for EditorTheme {
    fn default() -> Self {
        Self {
            background: "#ffffff",
            border: "#e0e0e0",
            radius: 8.0,
            foreground: "#1f1f1f",
            muted_foreground: "#6b6b6b",
            link: "#0066cc",
            selection: "#0066cc40",
            code_background: "#f0f0f0",
        }
    }
}
