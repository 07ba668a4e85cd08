use serde::{Deserialize, Serialize};

const TABLEAU_PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1", "#ff9da7",
    "#9c755f", "#bab0ab",
];

const MODERN_PALETTE: [&str; 8] = [
    "#2563eb", "#f97316", "#10b981", "#e11d48", "#8b5cf6", "#0ea5e9", "#eab308", "#64748b",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub node_stroke: String,
    pub background: String,
    pub palette: Vec<String>,
    pub link_opacity: f32,
    pub show_values: bool,
}

impl Theme {
    pub fn mermaid_default() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            text_color: "#333333".to_string(),
            node_stroke: "none".to_string(),
            background: "#FFFFFF".to_string(),
            palette: TABLEAU_PALETTE.iter().map(|c| c.to_string()).collect(),
            link_opacity: 0.5,
            show_values: false,
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#0F172A".to_string(),
            node_stroke: "none".to_string(),
            background: "#FFFFFF".to_string(),
            palette: MODERN_PALETTE.iter().map(|c| c.to_string()).collect(),
            link_opacity: 0.35,
            show_values: true,
        }
    }

    /// Palette entry for the `idx`-th node, cycling.
    pub fn node_color(&self, idx: usize) -> &str {
        if self.palette.is_empty() {
            return "#888888";
        }
        &self.palette[idx % self.palette.len()]
    }
}
