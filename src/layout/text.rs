use crate::config::LayoutConfig;
use crate::forest::{Forest, NodeId};
use crate::geometry::{Point, Rect};
use crate::label::{Label, LabelMetrics, LinePlacement, RunPlacement};
use crate::style::Alignment;
use crate::taint::Taint;
use crate::text_metrics::{RunMetrics, TextMetrics};

/// Measures a label and places its lines, then marks it fresh.
///
/// The first line is vertically centred on the node origin and every
/// following line sits `text_vertical_padding` below the previous one. The
/// label block is horizontally centred; alignment only moves lines within
/// the block.
pub(super) fn measure_label(label: &mut Label, metrics: &dyn TextMetrics, config: &LayoutConfig) {
    let line_count = label.line_count();
    let shown = label.is_shown();

    let run_sizes: Vec<RunMetrics> = label
        .runs
        .iter()
        .map(|run| {
            if !shown || run.text.is_empty() {
                return RunMetrics::default();
            }
            metrics.measure(run).unwrap_or_else(|| {
                tracing::warn!(text = %run.text, font = %run.style.font_family, "no text metrics for run; treating it as empty");
                RunMetrics::default()
            })
        })
        .collect();

    let mut lines = vec![LinePlacement::default(); line_count];
    let mut has_text = vec![false; line_count];
    for (run, size) in label.runs.iter().zip(&run_sizes) {
        let line = &mut lines[run.line];
        line.width += size.width;
        line.height = line.height.max(size.height);
        has_text[run.line] |= !run.text.is_empty();
    }

    let pad = config.text_vertical_padding;
    let width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    let first_line_height = lines.first().map(|l| l.height).unwrap_or(0.0);
    let height = if shown {
        lines.iter().map(|l| l.height).sum::<f32>() + pad * line_count.saturating_sub(1) as f32
    } else {
        0.0
    };

    let mut center_y = 0.0;
    let mut pen = Point::ORIGIN;
    for i in 0..line_count {
        if i > 0 {
            center_y += lines[i - 1].height / 2.0 + pad + lines[i].height / 2.0;
        }
        let line = &mut lines[i];
        line.center_y = center_y;
        line.x = match label.alignment {
            Alignment::Left => -width / 2.0,
            Alignment::Center => -line.width / 2.0,
            Alignment::Right => width / 2.0 - line.width,
        };
        if shown && has_text[i] {
            line.dx = line.x - pen.x;
            line.dy = line.center_y - pen.y;
            pen = Point::new(line.x + line.width, line.center_y);
        }
    }

    let mut runs = Vec::with_capacity(label.runs.len());
    let mut cursor: Vec<f32> = lines.iter().map(|l| l.x).collect();
    for (run, size) in label.runs.iter().zip(&run_sizes) {
        let x = cursor[run.line];
        cursor[run.line] += size.width;
        runs.push(RunPlacement {
            x,
            center_y: lines[run.line].center_y,
            width: size.width,
            height: size.height,
        });
    }

    let bbox = if shown {
        Rect::new(-width / 2.0, -first_line_height / 2.0, width, height)
    } else {
        Rect::default()
    };

    label.metrics = LabelMetrics {
        width: if shown { width } else { 0.0 },
        height,
        first_line_height: if shown { first_line_height } else { 0.0 },
        lines,
        runs,
        bbox,
    };
    label.taint = Taint::Fresh;
}

/// Highlight rectangle of a node: the padded label box, or a fixed
/// placeholder for empty and hidden labels.
pub(super) fn node_rect(label: &Label, config: &LayoutConfig) -> Rect {
    if label.is_shown() {
        return label.metrics.bbox.inflated(
            config.node_rect_horizontal_padding,
            config.node_rect_vertical_padding,
        );
    }
    let w = config.invisible_node_width;
    let h = config.invisible_node_height;
    Rect::new(-w / 2.0, -(h - 2.0), w, h)
}

/// Remeasures the label of `id` if it is stale and refreshes the node
/// rectangle. Returns whether the label's outer size changed.
pub(super) fn refresh_label(forest: &mut Forest, id: NodeId, metrics: &dyn TextMetrics, config: &LayoutConfig) -> bool {
    let Some(node) = forest.node_mut(id) else {
        return false;
    };
    if node.label.taint.is_fresh() {
        return false;
    }
    let before = extent(&node.label.metrics);
    measure_label(&mut node.label, metrics, config);
    node.rect = node_rect(&node.label, config);
    before != extent(&node.label.metrics)
}

fn extent(metrics: &LabelMetrics) -> (f32, f32, f32) {
    (metrics.width, metrics.height, metrics.first_line_height)
}

/// Start and end of character `char_index` of a node's label, in the node
/// frame. Characters are counted across runs without line separators.
pub fn caret_position(
    forest: &Forest,
    node: NodeId,
    char_index: usize,
    metrics: &dyn TextMetrics,
) -> Option<(Point, Point)> {
    let label = forest.node(node)?.label();
    let (run_index, offset) = label.placement_of_char(char_index)?;
    let run = label.runs().get(run_index)?;
    let origin = label.run_origin(run_index)?;
    let start = metrics.caret_start(run, offset)?;
    let end = metrics.caret_end(run, offset)?;
    Some((origin + start, origin + end))
}
