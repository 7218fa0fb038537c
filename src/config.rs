use crate::style::{Alignment, TextStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spacing constants of the tree layout, in user units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between adjacent sibling subtrees.
    pub node_horizontal_margin: f32,
    /// Distance from a mother to its daughters' row.
    pub node_vertical_margin: f32,
    /// Gap between a label and the connector touching it.
    pub node_vertical_padding: f32,
    /// Gap between adjacent trees of a forest.
    pub tree_horizontal_margin: f32,
    /// Gap between the lines of a label.
    pub text_vertical_padding: f32,
    /// Extra clearance above a daughter with an empty label.
    pub empty_node_vertical_padding: f32,
    pub invisible_node_horizontal_padding: f32,
    pub invisible_node_vertical_padding: f32,
    /// Placeholder rectangle for empty and hidden labels.
    pub invisible_node_width: f32,
    pub invisible_node_height: f32,
    pub node_rect_horizontal_padding: f32,
    pub node_rect_vertical_padding: f32,
    pub branch_rect_horizontal_padding: f32,
    pub branch_rect_vertical_padding: f32,
    /// Length of a freshly created multi-dominance edge without daughter.
    pub unconnected_mdom_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_horizontal_margin: 25.0,
            node_vertical_margin: 35.0,
            node_vertical_padding: 4.0,
            tree_horizontal_margin: 75.0,
            text_vertical_padding: 3.0,
            empty_node_vertical_padding: 10.0,
            invisible_node_horizontal_padding: 10.0,
            invisible_node_vertical_padding: 5.0,
            invisible_node_width: 12.0,
            invisible_node_height: 12.0,
            node_rect_horizontal_padding: 0.0,
            node_rect_vertical_padding: 1.5,
            branch_rect_horizontal_padding: 1.5,
            branch_rect_vertical_padding: 1.5,
            unconnected_mdom_height: 35.0,
        }
    }
}

/// Formatting applied to newly created nodes and to runs without an
/// explicit style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    pub text_style: TextStyle,
    pub alignment: Alignment,
    pub default_text: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            text_style: TextStyle::default(),
            alignment: Alignment::Center,
            default_text: "x".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Use the calibrated character table instead of system fonts.
    pub fast_text_metrics: bool,
    /// Run height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            fast_text_metrics: false,
            line_height: 1.2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub style: StyleConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_horizontal_margin: Option<f32>,
    node_vertical_margin: Option<f32>,
    node_vertical_padding: Option<f32>,
    tree_horizontal_margin: Option<f32>,
    text_vertical_padding: Option<f32>,
    empty_node_vertical_padding: Option<f32>,
    invisible_node_horizontal_padding: Option<f32>,
    invisible_node_vertical_padding: Option<f32>,
    invisible_node_width: Option<f32>,
    invisible_node_height: Option<f32>,
    node_rect_horizontal_padding: Option<f32>,
    node_rect_vertical_padding: Option<f32>,
    branch_rect_horizontal_padding: Option<f32>,
    branch_rect_vertical_padding: Option<f32>,
    unconnected_mdom_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StyleConfigFile {
    /// SVG style attribute, e.g. `font-family:'Arial';font-size:14pt;`.
    text_style: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    alignment: Option<String>,
    default_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsConfigFile {
    fast_text_metrics: Option<bool>,
    line_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfigFile>,
    style: Option<StyleConfigFile>,
    metrics: Option<MetricsConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.node_horizontal_margin {
            target.node_horizontal_margin = v;
        }
        if let Some(v) = layout.node_vertical_margin {
            target.node_vertical_margin = v;
        }
        if let Some(v) = layout.node_vertical_padding {
            target.node_vertical_padding = v;
        }
        if let Some(v) = layout.tree_horizontal_margin {
            target.tree_horizontal_margin = v;
        }
        if let Some(v) = layout.text_vertical_padding {
            target.text_vertical_padding = v;
        }
        if let Some(v) = layout.empty_node_vertical_padding {
            target.empty_node_vertical_padding = v;
        }
        if let Some(v) = layout.invisible_node_horizontal_padding {
            target.invisible_node_horizontal_padding = v;
        }
        if let Some(v) = layout.invisible_node_vertical_padding {
            target.invisible_node_vertical_padding = v;
        }
        if let Some(v) = layout.invisible_node_width {
            target.invisible_node_width = v;
        }
        if let Some(v) = layout.invisible_node_height {
            target.invisible_node_height = v;
        }
        if let Some(v) = layout.node_rect_horizontal_padding {
            target.node_rect_horizontal_padding = v;
        }
        if let Some(v) = layout.node_rect_vertical_padding {
            target.node_rect_vertical_padding = v;
        }
        if let Some(v) = layout.branch_rect_horizontal_padding {
            target.branch_rect_horizontal_padding = v;
        }
        if let Some(v) = layout.branch_rect_vertical_padding {
            target.branch_rect_vertical_padding = v;
        }
        if let Some(v) = layout.unconnected_mdom_height {
            target.unconnected_mdom_height = v;
        }
    }

    if let Some(style) = parsed.style {
        if let Some(css) = style.text_style.as_deref() {
            config.style.text_style = TextStyle::parse_css(css, &config.style.text_style);
        }
        if let Some(v) = style.font_family {
            config.style.text_style.font_family = v;
        }
        if let Some(v) = style.font_size {
            config.style.text_style.font_size = v;
        }
        if let Some(v) = style.alignment.as_deref() {
            config.style.alignment = Alignment::parse(v)
                .ok_or_else(|| anyhow::anyhow!("unknown alignment `{v}`"))?;
        }
        if let Some(v) = style.default_text {
            config.style.default_text = v;
        }
    }

    if let Some(metrics) = parsed.metrics {
        if let Some(v) = metrics.fast_text_metrics {
            config.metrics.fast_text_metrics = v;
        }
        if let Some(v) = metrics.line_height {
            config.metrics.line_height = v;
        }
    }

    Ok(config)
}
