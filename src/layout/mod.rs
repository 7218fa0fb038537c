//! Incremental layout of a forest.
//!
//! Edits only raise taint on nodes and labels. The redraw entry points in
//! this module walk each tree from its deepest generation upward and
//! recompute widths, positions and connectors for stale parts only.

mod branch;
mod generation;
mod routing;
mod text;
pub mod types;
mod width;

pub use branch::hit_region;
pub use routing::{
    anchor_to_nodes, attach_daughter, create_mdom, daughter_anchor, detach_daughter, mother_anchor,
    move_control_point, remove_mdom, set_daughter_anchor, set_mother_anchor,
};
pub use text::caret_position;
pub use types::*;

use crate::config::LayoutConfig;
use crate::error::ForestError;
use crate::forest::{Forest, NodeId, TreeId};
use crate::taint::Taint;
use crate::text_metrics::TextMetrics;

/// Lays out every stale tree, places the trees side by side and anchors
/// multi-dominance edges whose stored curve was rejected.
pub fn redraw_forest(forest: &mut Forest, metrics: &dyn TextMetrics, config: &LayoutConfig) {
    let _span = tracing::debug_span!("redraw_forest", trees = forest.trees().len()).entered();
    let view: &Forest = forest;
    let stale: Vec<TreeId> = view
        .trees()
        .iter()
        .filter(|tree| tree_is_stale(view, tree.id()))
        .map(|tree| tree.id())
        .collect();
    for tree in stale {
        generation::layout_tree(forest, tree, metrics, config);
    }
    repack(forest, config);
    routing::anchor_pending(forest, config);
}

/// Lays out a single tree and re-places the trees of the forest.
pub fn redraw_tree(
    forest: &mut Forest,
    tree: TreeId,
    metrics: &dyn TextMetrics,
    config: &LayoutConfig,
) -> Result<(), ForestError> {
    forest.tree(tree).ok_or(ForestError::UnknownTree(tree))?;
    let _span = tracing::debug_span!("redraw_tree", tree = %tree).entered();
    generation::layout_tree(forest, tree, metrics, config);
    repack(forest, config);
    Ok(())
}

/// Remeasures one label without moving anything.
///
/// Returns `true` when the label's extent changed. The node and its
/// ancestors are then stale and need a tree or forest redraw.
pub fn redraw_node(
    forest: &mut Forest,
    node: NodeId,
    metrics: &dyn TextMetrics,
    config: &LayoutConfig,
) -> Result<bool, ForestError> {
    forest.get_mut(node)?.label.taint = Taint::Stale;
    let changed = text::refresh_label(forest, node, metrics, config);
    if changed {
        tracing::debug!(node = %node, "label extent changed");
        forest.stale_ancestry(node);
    }
    Ok(changed)
}

fn tree_is_stale(forest: &Forest, tree: TreeId) -> bool {
    forest.tree(tree).is_some_and(|t| {
        t.nodes().any(|id| {
            forest
                .node(id)
                .is_some_and(|n| n.taint().is_stale() || n.label().taint().is_stale())
        })
    })
}

/// Places trees left to right, each separated by the tree margin.
fn repack(forest: &mut Forest, config: &LayoutConfig) {
    let widths: Vec<(f32, f32)> = forest
        .trees()
        .iter()
        .map(|tree| {
            forest
                .node(tree.root())
                .map(|root| (root.inner_width(), root.outer_width()))
                .unwrap_or((0.0, 0.0))
        })
        .collect();
    let mut cursor = 0.0;
    for (tree, (inner, outer)) in forest.trees_mut().iter_mut().zip(widths) {
        tree.x = cursor + inner;
        cursor = tree.x + outer + config.tree_horizontal_margin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::style::{Alignment, TextStyle};
    use crate::text_metrics::DeterministicTextMetrics;

    fn metrics() -> DeterministicTextMetrics {
        DeterministicTextMetrics {
            char_width_factor: 1.0,
            line_height_factor: 1.0,
        }
    }

    fn style() -> TextStyle {
        TextStyle {
            font_size: 10.0,
            ..TextStyle::default()
        }
    }

    #[test]
    fn trees_are_packed_with_margin() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let first = forest.create_tree(Label::plain("abcd", &style(), Alignment::Center));
        let second = forest.create_tree(Label::plain("ab", &style(), Alignment::Center));
        redraw_forest(&mut forest, &metrics(), &config);
        assert_eq!(forest.tree(first).unwrap().x(), 20.0);
        assert_eq!(forest.tree(second).unwrap().x(), 20.0 + 20.0 + 75.0 + 10.0);
        assert!(!forest.is_stale());
    }

    #[test]
    fn redraw_node_reports_extent_changes() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let tree = forest.create_tree(Label::plain("S", &style(), Alignment::Center));
        let root = forest.tree(tree).unwrap().root();
        let leaf = forest.append_daughter(root, Label::plain("ab", &style(), Alignment::Center)).unwrap();
        redraw_forest(&mut forest, &metrics(), &config);

        assert!(!redraw_node(&mut forest, leaf, &metrics(), &config).unwrap());
        assert!(!forest.is_stale());

        forest.node_mut(leaf).unwrap().label.runs[0].text = "abc".into();
        assert!(redraw_node(&mut forest, leaf, &metrics(), &config).unwrap());
        assert!(forest.get(root).unwrap().taint().is_stale());
        assert_eq!(forest.get(leaf).unwrap().label().metrics().width, 30.0);
    }

    #[test]
    fn unknown_tree_is_an_error() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let tree = forest.create_tree(Label::plain("S", &style(), Alignment::Center));
        forest.remove_tree(tree).unwrap();
        assert_eq!(
            redraw_tree(&mut forest, tree, &metrics(), &config),
            Err(ForestError::UnknownTree(tree))
        );
    }
}
