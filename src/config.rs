use crate::layout::LayoutError;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What an alignment policy may look at when choosing a node's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignNode {
    /// Longest path from any source.
    pub depth: usize,
    /// Longest path to any sink.
    pub inverse_depth: usize,
    pub inbound: usize,
    pub outbound: usize,
    /// Smallest depth among outbound targets, if any.
    pub min_target_depth: Option<usize>,
}

pub type AlignFn = fn(&AlignNode, usize) -> usize;

/// Maps a ranked node onto a column index given the total column count.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    #[default]
    Justify,
    Center,
    #[serde(skip)]
    Custom(AlignFn),
}

impl Align {
    /// Column for `node`, clamped into `[0, columns)`.
    pub fn column(&self, node: &AlignNode, columns: usize) -> usize {
        let last = columns.saturating_sub(1);
        let column = match self {
            Align::Left => node.depth,
            Align::Right => last.saturating_sub(node.inverse_depth),
            Align::Justify => {
                if node.outbound > 0 {
                    node.depth
                } else {
                    last
                }
            }
            Align::Center => {
                if node.inbound > 0 {
                    node.depth
                } else if let Some(target_depth) = node.min_target_depth {
                    target_depth.saturating_sub(1)
                } else {
                    0
                }
            }
            Align::Custom(align) => align(node, columns),
        };
        column.min(last)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SankeyConfig {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    #[serde(alias = "nodePadding")]
    pub node_y_padding: f64,
    pub link_x_padding: f64,
    /// Padding budget each node carves out of its link bands.
    pub link_y_padding: f64,
    pub iterations: usize,
    pub ordering_passes: usize,
    pub align: Align,
    /// Extra gap after a derived column, keyed by column index.
    pub column_padding: BTreeMap<usize, f64>,
    pub max_visible_rows: Option<usize>,
    pub visible_columns_from_center: Option<f64>,
}

impl Default for SankeyConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            node_width: 24.0,
            node_y_padding: 8.0,
            link_x_padding: 0.0,
            link_y_padding: 0.0,
            iterations: 6,
            ordering_passes: 6,
            align: Align::Justify,
            column_padding: BTreeMap::new(),
            max_visible_rows: None,
            visible_columns_from_center: None,
        }
    }
}

impl SankeyConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |reason: String| Err(LayoutError::InvalidConfig { reason });
        if !(self.width.is_finite() && self.width > 0.0) {
            return invalid(format!("width must be positive, got {}", self.width));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return invalid(format!("height must be positive, got {}", self.height));
        }
        if !(self.node_width.is_finite() && self.node_width >= 0.0) {
            return invalid(format!("nodeWidth must be non-negative, got {}", self.node_width));
        }
        if self.node_width > self.width {
            return invalid(format!(
                "nodeWidth {} does not fit in width {}",
                self.node_width, self.width
            ));
        }
        for (name, value) in [
            ("nodeYPadding", self.node_y_padding),
            ("linkXPadding", self.link_x_padding),
            ("linkYPadding", self.link_y_padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        if let Some((column, padding)) = self
            .column_padding
            .iter()
            .find(|(_, padding)| !(padding.is_finite() && **padding >= 0.0))
        {
            return invalid(format!("columnPadding[{column}] must be non-negative, got {padding}"));
        }
        if let Some(distance) = self.visible_columns_from_center {
            if distance.is_nan() {
                return invalid("visibleColumnsFromCenter must be a number".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: SankeyConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::mermaid_default();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: SankeyConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_text_color: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SankeyConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    node_width: Option<f64>,
    #[serde(alias = "nodePadding")]
    node_y_padding: Option<f64>,
    link_x_padding: Option<f64>,
    link_y_padding: Option<f64>,
    iterations: Option<usize>,
    ordering_passes: Option<usize>,
    align: Option<Align>,
    column_padding: Option<BTreeMap<usize, f64>>,
    max_visible_rows: Option<usize>,
    visible_columns_from_center: Option<f64>,
    link_opacity: Option<f32>,
    show_values: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    sankey: Option<SankeyConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_config_file(&mut config, parsed);
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Merges a Mermaid `%%{init: ...}%%` payload over `config`.
pub fn merge_init_config(mut config: Config, init: serde_json::Value) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_value(init)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "base" || theme_name == "default" || theme_name == "mermaid" {
            config.theme = Theme::mermaid_default();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.primary_text_color.or(vars.text_color) {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.node_stroke = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(sankey) = parsed.sankey {
        let layout = &mut config.layout;
        if let Some(v) = sankey.width {
            layout.width = v;
        }
        if let Some(v) = sankey.height {
            layout.height = v;
        }
        if let Some(v) = sankey.node_width {
            layout.node_width = v;
        }
        if let Some(v) = sankey.node_y_padding {
            layout.node_y_padding = v;
        }
        if let Some(v) = sankey.link_x_padding {
            layout.link_x_padding = v;
        }
        if let Some(v) = sankey.link_y_padding {
            layout.link_y_padding = v;
        }
        if let Some(v) = sankey.iterations {
            layout.iterations = v;
        }
        if let Some(v) = sankey.ordering_passes {
            layout.ordering_passes = v;
        }
        if let Some(v) = sankey.align {
            layout.align = v;
        }
        if let Some(v) = sankey.column_padding {
            layout.column_padding = v;
        }
        if let Some(v) = sankey.max_visible_rows {
            layout.max_visible_rows = Some(v);
        }
        if let Some(v) = sankey.visible_columns_from_center {
            layout.visible_columns_from_center = Some(v);
        }
        if let Some(v) = sankey.link_opacity {
            config.theme.link_opacity = v;
        }
        if let Some(v) = sankey.show_values {
            config.theme.show_values = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(depth: usize, inverse_depth: usize, inbound: usize, outbound: usize) -> AlignNode {
        AlignNode {
            depth,
            inverse_depth,
            inbound,
            outbound,
            min_target_depth: None,
        }
    }

    #[test]
    fn align_presets() {
        let sink = node(1, 0, 1, 0);
        assert_eq!(Align::Left.column(&sink, 4), 1);
        assert_eq!(Align::Justify.column(&sink, 4), 3);
        assert_eq!(Align::Right.column(&sink, 4), 3);

        let source = AlignNode {
            min_target_depth: Some(2),
            ..node(0, 1, 0, 1)
        };
        assert_eq!(Align::Center.column(&source, 4), 1);
        assert_eq!(Align::Left.column(&source, 4), 0);
        assert_eq!(Align::Right.column(&source, 4), 2);

        let isolated = node(0, 0, 0, 0);
        assert_eq!(Align::Center.column(&isolated, 4), 0);
    }

    #[test]
    fn custom_align_is_clamped() {
        fn far_right(_: &AlignNode, columns: usize) -> usize {
            columns + 10
        }
        assert_eq!(Align::Custom(far_right).column(&node(0, 0, 0, 0), 3), 2);
    }

    #[test]
    fn validate_rejects_bad_sizes() {
        let mut config = SankeyConfig::default();
        assert!(config.validate().is_ok());
        config.height = 0.0;
        assert!(matches!(config.validate(), Err(LayoutError::InvalidConfig { .. })));
        config.height = 100.0;
        config.node_y_padding = -1.0;
        assert!(matches!(config.validate(), Err(LayoutError::InvalidConfig { .. })));
        config.node_y_padding = 0.0;
        config.node_width = config.width + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sankey_section_overrides_defaults() {
        let init = serde_json::json!({
            "theme": "modern",
            "sankey": {
                "nodePadding": 2,
                "align": "center",
                "iterations": 12,
                "columnPadding": {"1": 30}
            }
        });
        let config = merge_init_config(Config::default(), init).unwrap();
        assert_eq!(config.layout.node_y_padding, 2.0);
        assert!(matches!(config.layout.align, Align::Center));
        assert_eq!(config.layout.iterations, 12);
        assert_eq!(config.layout.column_padding.get(&1), Some(&30.0));
        assert_eq!(config.layout.width, SankeyConfig::default().width);
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
    }
}
