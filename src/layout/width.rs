use crate::config::LayoutConfig;
use crate::forest::{Forest, NodeId};
use crate::label::Label;

/// Half of the horizontal space the label itself occupies.
pub(super) fn label_half_width(label: &Label, config: &LayoutConfig) -> f32 {
    if label.is_shown() {
        label.metrics.width / 2.0
    } else {
        config.invisible_node_width / 2.0
    }
}

/// Recomputes the inner and outer width of `id` from its label and its
/// daughters' translations. Daughters must already be laid out.
pub(super) fn compute_width(forest: &mut Forest, id: NodeId, config: &LayoutConfig) {
    let Some(node) = forest.node(id) else {
        return;
    };
    let half = label_half_width(&node.label, config);
    let (inner, outer) = match (node.daughters.first(), node.daughters.last()) {
        (Some(&first), Some(&last)) => {
            let first_inner = daughter_width(forest, first, config).0;
            let last_outer = daughter_width(forest, last, config).1;
            let first_x = forest.node(first).map(|d| d.translate.x).unwrap_or(0.0);
            let last_x = forest.node(last).map(|d| d.translate.x).unwrap_or(0.0);
            (
                half.max(first_x.abs() + first_inner),
                half.max(last_x.abs() + last_outer),
            )
        }
        _ => (half, half),
    };
    if let Some(node) = forest.node_mut(id) {
        node.inner_width = inner;
        node.outer_width = outer;
    }
}

/// Widths of a daughter about to be read by its mother. Reading a stale
/// daughter is a logic error; release builds recompute from its own label.
fn daughter_width(forest: &mut Forest, id: NodeId, config: &LayoutConfig) -> (f32, f32) {
    let stale = forest.node(id).is_some_and(|d| d.taint.is_stale());
    debug_assert!(!stale, "width of stale node {id} requested");
    if stale {
        tracing::warn!(node = %id, "width of stale node requested; recomputing");
        compute_width(forest, id, config);
    }
    forest
        .node(id)
        .map(|d| (d.inner_width, d.outer_width))
        .unwrap_or((0.0, 0.0))
}
