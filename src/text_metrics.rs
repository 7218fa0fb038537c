//! Text measurement used by label layout.
//!
//! Layout never talks to fonts directly; it goes through [`TextMetrics`].
//! [`FontTextMetrics`] measures against system fonts through `fontdb`, and
//! [`DeterministicTextMetrics`] is a font-free implementation for tests and
//! headless use.

use crate::config::MetricsConfig;
use crate::geometry::Point;
use crate::label::TextRun;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Mutex;
use ttf_parser::{Face, GlyphId};

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunMetrics {
    pub width: f32,
    pub height: f32,
}

pub trait TextMetrics {
    /// Size of a run, or `None` when the run cannot be measured.
    fn measure(&self, run: &TextRun) -> Option<RunMetrics>;

    /// Offset of the start of character `char_index` from the start of the
    /// run.
    fn caret_start(&self, run: &TextRun, char_index: usize) -> Option<Point> {
        let prefix: String = run.text.chars().take(char_index).collect();
        let probe = TextRun {
            text: prefix,
            style: run.style.clone(),
            line: run.line,
        };
        Some(Point::new(self.measure(&probe)?.width, 0.0))
    }

    /// Offset of the end of character `char_index` from the start of the run.
    fn caret_end(&self, run: &TextRun, char_index: usize) -> Option<Point> {
        if char_index >= run.text.chars().count() {
            return None;
        }
        self.caret_start(run, char_index + 1)
    }
}

/// Font-backed metrics. With `fast` set, ASCII runs use the calibrated
/// per-character table instead of loading a font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontTextMetrics {
    pub fast: bool,
    pub line_height: f32,
}

impl Default for FontTextMetrics {
    fn default() -> Self {
        Self {
            fast: false,
            line_height: 1.2,
        }
    }
}

impl From<&MetricsConfig> for FontTextMetrics {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            fast: config.fast_text_metrics,
            line_height: config.line_height,
        }
    }
}

impl TextMetrics for FontTextMetrics {
    fn measure(&self, run: &TextRun) -> Option<RunMetrics> {
        let size = run.style.font_size;
        if size <= 0.0 || !size.is_finite() {
            return None;
        }
        let width = if self.fast && run.text.is_ascii() {
            fallback_text_width(&run.text, size)
        } else {
            measure_text_width(&run.text, size, &run.style.font_family)
                .unwrap_or_else(|| fallback_text_width(&run.text, size))
        };
        Some(RunMetrics {
            width,
            height: size * self.line_height,
        })
    }
}

/// Every character is `char_width_factor × font_size` wide and every run
/// `line_height_factor × font_size` tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeterministicTextMetrics {
    pub char_width_factor: f32,
    pub line_height_factor: f32,
}

impl Default for DeterministicTextMetrics {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
            line_height_factor: 1.2,
        }
    }
}

impl TextMetrics for DeterministicTextMetrics {
    fn measure(&self, run: &TextRun) -> Option<RunMetrics> {
        let size = run.style.font_size;
        Some(RunMetrics {
            width: run.text.chars().count() as f32 * self.char_width_factor * size,
            height: self.line_height_factor * size,
        })
    }
}

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

pub(crate) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    // Advance widths of a common sans-serif stack, as a fraction of the em.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        '\'' | '`' => 0.214,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0'..='9' => 0.600,
        '\u{2032}' => 0.250,
        _ => 0.568,
    }
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let family_key = normalize_family_key(font_family);
        if !self.cache.contains_key(&family_key) {
            let face = self.load_face(font_family, &family_key);
            if face.is_none() {
                tracing::debug!(family = %family_key, "no font face found");
            }
            self.cache.insert(family_key.clone(), face);
        }
        let face = self.cache.get_mut(&family_key)?.as_mut()?;
        face.measure_width(&text.replace('\t', "    "), font_size)
    }

    fn load_face(&mut self, font_family: &str, family_key: &str) -> Option<FontFace> {
        if let Some(face) = load_cached_face(family_key) {
            return Some(face);
        }
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names.iter().copied().map(generic_family).collect();
        if families.is_empty() {
            families.push(Family::Serif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded = None;
        self.db.with_face_data(id, |data, index| {
            let bytes = data.to_vec();
            if let Ok(face) = Face::parse(&bytes, index) {
                let units_per_em = face.units_per_em().max(1);
                store_cached_face(family_key, &bytes, index);
                loaded = Some(FontFace::new(bytes, index, units_per_em));
            }
        });
        loaded
    }
}

fn generic_family(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Family::Serif,
        "sans-serif" | "system-ui" => Family::SansSerif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

struct FontFace {
    _data: Vec<u8>,
    units_per_em: u16,
    face: Option<Face<'static>>,
    glyph_cache: HashMap<char, Option<u16>>,
    advance_cache: HashMap<u16, u16>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32, units_per_em: u16) -> Self {
        // The face borrows `data`, which lives in the same struct and is never
        // mutated or moved out of its heap allocation.
        let face = Face::parse(&data, index)
            .ok()
            .map(|parsed| unsafe { std::mem::transmute::<Face<'_>, Face<'static>>(parsed) });
        Self {
            _data: data,
            units_per_em,
            face,
            glyph_cache: HashMap::new(),
            advance_cache: HashMap::new(),
        }
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let face = self.face.as_ref()?;
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;

        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph = *self
                .glyph_cache
                .entry(ch)
                .or_insert_with(|| face.glyph_index(ch).map(|id| id.0));
            let Some(glyph_id) = glyph else {
                width += fallback;
                continue;
            };
            let advance = *self
                .advance_cache
                .entry(glyph_id)
                .or_insert_with(|| face.glyph_hor_advance(GlyphId(glyph_id)).unwrap_or(0));
            width += advance as f32 * scale;
        }

        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "serif".to_string()
    } else {
        trimmed.to_string()
    }
}

fn cache_paths(family_key: &str) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    family_key.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("syntree").join("font-cache");
    Some((dir.join(format!("{hash:x}.font")), dir.join(format!("{hash:x}.meta"))))
}

fn store_cached_face(family_key: &str, bytes: &[u8], index: u32) {
    let Some((font_path, meta_path)) = cache_paths(family_key) else {
        return;
    };
    if font_path.exists() {
        return;
    }
    if let Some(parent) = font_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if fs::write(&font_path, bytes).is_err() || fs::write(&meta_path, index.to_string()).is_err() {
        tracing::debug!(path = %font_path.display(), "could not write font cache");
    }
}

fn load_cached_face(family_key: &str) -> Option<FontFace> {
    let (font_path, meta_path) = cache_paths(family_key)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    let face = Face::parse(&bytes, index).ok()?;
    let units_per_em = face.units_per_em().max(1);
    Some(FontFace::new(bytes, index, units_per_em))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextStyle;

    fn run(text: &str, size: f32) -> TextRun {
        TextRun::new(
            text,
            TextStyle {
                font_size: size,
                ..TextStyle::default()
            },
            0,
        )
    }

    #[test]
    fn deterministic_metrics_scale_with_chars_and_size() {
        let metrics = DeterministicTextMetrics {
            char_width_factor: 1.0,
            line_height_factor: 1.0,
        };
        let m = metrics.measure(&run("abc", 10.0)).unwrap();
        assert_eq!(m, RunMetrics { width: 30.0, height: 10.0 });
    }

    #[test]
    fn default_caret_uses_prefix_width() {
        let metrics = DeterministicTextMetrics {
            char_width_factor: 1.0,
            line_height_factor: 1.0,
        };
        let r = run("abcd", 10.0);
        assert_eq!(metrics.caret_start(&r, 2), Some(Point::new(20.0, 0.0)));
        assert_eq!(metrics.caret_end(&r, 2), Some(Point::new(30.0, 0.0)));
        assert_eq!(metrics.caret_end(&r, 4), None);
    }

    #[test]
    fn fast_font_metrics_use_calibrated_table() {
        let metrics = FontTextMetrics {
            fast: true,
            line_height: 1.0,
        };
        let m = metrics.measure(&run("Hello", 16.0)).unwrap();
        let expected = fallback_text_width("Hello", 16.0);
        assert!((m.width - expected).abs() < 1e-4);
        assert_eq!(m.height, 16.0);
    }

    #[test]
    fn zero_font_size_is_unmeasurable() {
        let metrics = FontTextMetrics::default();
        assert!(metrics.measure(&run("x", 0.0)).is_none());
    }

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }
}
