use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[a-zA-Z-]+)\s*:\s*(?P<value>[^;]*)").expect("valid declaration regex")
});
static FONT_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<num>[0-9]*\.?[0-9]+)\s*(pt|px)?\s*$").expect("valid size regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" | "middle" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineShift {
    Sub,
    Super,
}

/// Formatting of a single text run. The layout engine only reads the font
/// family and size; everything else is carried through for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub fill: String,
    pub bold: bool,
    pub italic: bool,
    pub small_caps: bool,
    pub underline: bool,
    pub line_through: bool,
    pub baseline_shift: Option<BaselineShift>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size: 12.0,
            fill: "#000000".to_string(),
            bold: false,
            italic: false,
            small_caps: false,
            underline: false,
            line_through: false,
            baseline_shift: None,
        }
    }
}

impl TextStyle {
    /// Serializes to an SVG `style` attribute value.
    pub fn to_css(&self) -> String {
        let mut out = format!(
            "font-family:'{}';font-size:{}pt;fill:{};",
            self.font_family, self.font_size, self.fill
        );
        out.push_str(if self.bold { "font-weight:bold;" } else { "font-weight:normal;" });
        out.push_str(if self.italic { "font-style:italic;" } else { "font-style:normal;" });
        out.push_str(if self.small_caps {
            "font-variant:small-caps;"
        } else {
            "font-variant:normal;"
        });
        match (self.line_through, self.underline) {
            (true, true) => out.push_str("text-decoration:line-through underline;"),
            (true, false) => out.push_str("text-decoration:line-through;"),
            (false, true) => out.push_str("text-decoration:underline;"),
            (false, false) => {}
        }
        match self.baseline_shift {
            Some(BaselineShift::Sub) => out.push_str("baseline-shift:sub;"),
            Some(BaselineShift::Super) => out.push_str("baseline-shift:super;"),
            None => {}
        }
        out
    }

    /// Reads an SVG `style` attribute value on top of `base`. Unknown
    /// properties and unparsable values leave the base value in place.
    pub fn parse_css(css: &str, base: &TextStyle) -> TextStyle {
        let mut style = base.clone();
        for caps in DECLARATION.captures_iter(css) {
            let name = caps["name"].trim().to_ascii_lowercase();
            let value = caps["value"].trim();
            match name.as_str() {
                "font-family" => {
                    let family = value.trim_matches(|c| c == '\'' || c == '"');
                    if !family.is_empty() {
                        style.font_family = family.to_string();
                    }
                }
                "font-size" => {
                    if let Some(size) = FONT_SIZE
                        .captures(value)
                        .and_then(|c| c["num"].parse::<f32>().ok())
                    {
                        style.font_size = size;
                    }
                }
                "fill" => style.fill = value.to_string(),
                "font-weight" => style.bold = value != "normal",
                "font-style" => style.italic = value != "normal",
                "font-variant" => style.small_caps = value == "small-caps",
                "text-decoration" => {
                    style.underline = value.contains("underline");
                    style.line_through = value.contains("line-through");
                }
                "baseline-shift" => {
                    style.baseline_shift = match value {
                        "sub" => Some(BaselineShift::Sub),
                        "super" => Some(BaselineShift::Super),
                        _ => None,
                    }
                }
                _ => {}
            }
        }
        style
    }
}
