use crate::geometry::{Point, Rect};
use crate::style::{Alignment, TextStyle};
use crate::taint::Taint;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
    /// Zero-based line the run belongs to. Line breaks are decided by the
    /// caller, never by the layout engine.
    pub line: usize,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle, line: usize) -> Self {
        Self {
            text: text.into(),
            style,
            line,
        }
    }
}

/// Measured size and placement of one run, in the node frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunPlacement {
    pub x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

/// Measured size and placement of one line, in the node frame.
///
/// `dx`/`dy` are the relative pen offsets an SVG renderer sets on the first
/// non-empty run of the line; they are zero for lines without text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinePlacement {
    pub x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelMetrics {
    pub width: f32,
    pub height: f32,
    pub first_line_height: f32,
    pub lines: Vec<LinePlacement>,
    pub runs: Vec<RunPlacement>,
    pub bbox: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub(crate) runs: Vec<TextRun>,
    pub(crate) alignment: Alignment,
    pub(crate) visible: bool,
    pub(crate) taint: Taint,
    pub(crate) metrics: LabelMetrics,
}

impl Label {
    pub fn new(runs: Vec<TextRun>, alignment: Alignment) -> Self {
        let mut label = Self {
            runs,
            alignment,
            visible: true,
            taint: Taint::Stale,
            metrics: LabelMetrics::default(),
        };
        label.normalize_lines();
        label
    }

    /// A label from plain text; every `\n` starts a new line.
    pub fn plain(text: &str, style: &TextStyle, alignment: Alignment) -> Self {
        Self::new(runs_from_text(text, style), alignment)
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn taint(&self) -> Taint {
        self.taint
    }

    pub fn metrics(&self) -> &LabelMetrics {
        &self.metrics
    }

    pub fn line_count(&self) -> usize {
        self.runs.last().map(|run| run.line + 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| run.text.is_empty())
    }

    /// True when the label takes part in layout with its measured size.
    pub fn is_shown(&self) -> bool {
        self.visible && !self.is_empty()
    }

    /// Text with lines joined by `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut line = 0;
        for run in &self.runs {
            while line < run.line {
                out.push('\n');
                line += 1;
            }
            out.push_str(&run.text);
        }
        out
    }

    /// Sorts runs by line (stable) and renumbers lines so they are
    /// contiguous from zero.
    pub(crate) fn normalize_lines(&mut self) {
        self.runs.sort_by_key(|run| run.line);
        let mut next = 0;
        let mut previous = None;
        for run in &mut self.runs {
            if previous.is_some_and(|p| p != run.line) {
                next += 1;
            }
            previous = Some(run.line);
            run.line = next;
        }
    }

    pub(crate) fn replace_runs(&mut self, runs: Vec<TextRun>) {
        self.runs = runs;
        self.normalize_lines();
    }

    pub(crate) fn placement_of_char(&self, char_index: usize) -> Option<(usize, usize)> {
        let mut remaining = char_index;
        for (i, run) in self.runs.iter().enumerate() {
            let len = run.text.chars().count();
            if remaining < len {
                return Some((i, remaining));
            }
            remaining -= len;
        }
        None
    }

    pub(crate) fn run_origin(&self, run_index: usize) -> Option<Point> {
        let placement = self.metrics.runs.get(run_index)?;
        Some(Point::new(placement.x, placement.center_y))
    }
}

pub fn runs_from_text(text: &str, style: &TextStyle) -> Vec<TextRun> {
    text.split('\n')
        .enumerate()
        .map(|(line, part)| TextRun::new(part, style.clone(), line))
        .collect()
}
