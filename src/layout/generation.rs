use super::branch::layout_branch;
use super::text::refresh_label;
use super::width::compute_width;
use crate::config::LayoutConfig;
use crate::forest::{Forest, NodeId, TreeId};
use crate::geometry::Point;
use crate::taint::Taint;
use crate::text_metrics::TextMetrics;
use std::collections::HashSet;

/// Lays out one tree bottom-up, touching only sibling sets that are stale
/// or whose row clearance changed.
pub(super) fn layout_tree(forest: &mut Forest, tree_id: TreeId, metrics: &dyn TextMetrics, config: &LayoutConfig) {
    let Some(tree) = forest.tree(tree_id) else {
        return;
    };
    let depth = tree.depth();
    let root = tree.root();
    let _span = tracing::debug_span!("layout_tree", tree = %tree_id, depth).entered();

    for g in (1..=depth).rev() {
        measure_generation(forest, tree_id, g, metrics, config);
        measure_generation(forest, tree_id, g - 1, metrics, config);
        let row_height = generation_height(forest, tree_id, g - 1);

        let Some(tree) = forest.tree_mut(tree_id) else {
            return;
        };
        let previous = tree.row_heights.get(g).copied().flatten();
        if let Some(slot) = tree.row_heights.get_mut(g) {
            *slot = Some(row_height);
        }
        let row_changed = previous.is_some_and(|p| p != row_height);
        if row_changed {
            tracing::debug!(generation = g, previous, row_height, "row clearance changed");
        }
        // Seeded trees have no recorded clearance; check their rows against it.
        let row_y = row_offset(row_height, config);
        let row_unknown = previous.is_none();

        for mother in mothers_of_generation(forest, tree_id, g) {
            let Some(m) = forest.node(mother) else {
                continue;
            };
            let mother_stale = m.taint.is_stale();
            let sister_stale = m
                .daughters
                .iter()
                .any(|d| forest.node(*d).is_some_and(|n| n.taint.is_stale()));
            let off_row = row_unknown
                && m
                    .daughters
                    .iter()
                    .any(|d| forest.node(*d).is_some_and(|n| n.translate.y != row_y));
            if !(mother_stale || sister_stale || row_changed || off_row) {
                continue;
            }
            if !mother_stale {
                if sister_stale {
                    tracing::debug!(mother = %mother, "stale daughter under fresh mother; restaling");
                }
                if let Some(m) = forest.node_mut(mother) {
                    m.taint = Taint::Stale;
                }
            }
            layout_sibling_set(forest, mother, row_height, config);
        }
    }

    measure_generation(forest, tree_id, 0, metrics, config);
    if forest.node(root).is_some_and(|n| n.taint.is_stale()) {
        compute_width(forest, root, config);
        if let Some(n) = forest.node_mut(root) {
            n.translate = Point::ORIGIN;
            n.taint = Taint::Fresh;
        }
    }
}

fn measure_generation(forest: &mut Forest, tree_id: TreeId, g: usize, metrics: &dyn TextMetrics, config: &LayoutConfig) {
    let ids: Vec<NodeId> = forest
        .tree(tree_id)
        .map(|t| t.generation(g).to_vec())
        .unwrap_or_default();
    for id in ids {
        refresh_label(forest, id, metrics, config);
    }
}

/// Tallest label of generation `g`, including childless nodes, so every
/// sibling set below `g` shares one row.
fn generation_height(forest: &Forest, tree_id: TreeId, g: usize) -> f32 {
    let Some(tree) = forest.tree(tree_id) else {
        return 0.0;
    };
    tree.generation(g)
        .iter()
        .filter_map(|id| forest.node(*id))
        .map(|n| n.label.metrics.height)
        .fold(0.0, f32::max)
}

/// Mothers of generation `g`, in generation order.
fn mothers_of_generation(forest: &Forest, tree_id: TreeId, g: usize) -> Vec<NodeId> {
    let Some(tree) = forest.tree(tree_id) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    tree.generation(g)
        .iter()
        .filter_map(|id| forest.node(*id)?.mother)
        .filter(|m| seen.insert(*m))
        .collect()
}

/// Vertical offset of a generation below its mothers.
fn row_offset(row_height: f32, config: &LayoutConfig) -> f32 {
    let margin = config.node_vertical_margin;
    if row_height > 0.5 * margin { margin + row_height } else { margin }
}

/// Positions the daughters of `mother` side by side, centred under it, and
/// rebuilds their connectors.
fn layout_sibling_set(forest: &mut Forest, mother: NodeId, row_height: f32, config: &LayoutConfig) {
    let daughters = match forest.node(mother) {
        Some(m) => m.daughters.clone(),
        None => return,
    };
    if daughters.is_empty() {
        return;
    }

    for &d in &daughters {
        if forest.node(d).is_some_and(|n| n.taint.is_stale()) {
            compute_width(forest, d, config);
        }
    }
    let widths: Vec<(f32, f32)> = daughters
        .iter()
        .map(|d| {
            forest
                .node(*d)
                .map(|n| (n.inner_width, n.outer_width))
                .unwrap_or((0.0, 0.0))
        })
        .collect();

    let margin = config.node_horizontal_margin;
    let n = widths.len();
    let total = if n > 1 {
        let middle: f32 = widths[1..n - 1].iter().map(|(i, o)| i + o).sum();
        widths[0].1 + widths[n - 1].0 + (n - 1) as f32 * margin + middle
    } else {
        0.0
    };

    let y = row_offset(row_height, config);
    let mut x = -total / 2.0;
    for (i, &d) in daughters.iter().enumerate() {
        if i > 0 {
            x += widths[i - 1].1 + margin + widths[i].0;
        }
        if let Some(node) = forest.node_mut(d) {
            node.translate = Point::new(x, y);
        }
        layout_branch(forest, mother, d, y, config);
        if let Some(node) = forest.node_mut(d) {
            node.taint = Taint::Fresh;
        }
    }
    tracing::trace!(mother = %mother, daughters = n, total, y, "laid out sibling set");
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

    fn label(text: &str) -> Label {
        let style = TextStyle {
            font_size: 10.0,
            ..TextStyle::default()
        };
        Label::plain(text, &style, Alignment::Center)
    }

    #[test]
    fn three_equal_leaves_are_centred() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let tree = forest.create_tree(label("VP"));
        let root = forest.tree(tree).unwrap().root();
        let ids: Vec<NodeId> = ["a", "b", "c"]
            .iter()
            .map(|t| forest.append_daughter(root, label(t)).unwrap())
            .collect();

        layout_tree(&mut forest, tree, &metrics(), &config);
        let xs: Vec<f32> = ids.iter().map(|d| forest.get(*d).unwrap().translate().x).collect();
        assert_eq!(xs, vec![-35.0, 0.0, 35.0]);
        let root_node = forest.get(root).unwrap();
        assert_eq!(root_node.inner_width(), 40.0);
        assert_eq!(root_node.outer_width(), 40.0);
        assert!(forest.nodes().all(|(_, n)| n.taint().is_fresh()));
    }

    #[test]
    fn fresh_sibling_sets_are_skipped() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let tree = forest.create_tree(label("S"));
        let root = forest.tree(tree).unwrap().root();
        let a = forest.append_daughter(root, label("a")).unwrap();
        let b = forest.append_daughter(root, label("b")).unwrap();
        let c = forest.append_daughter(a, label("c")).unwrap();
        layout_tree(&mut forest, tree, &metrics(), &config);

        // Corrupt a cached value that only a relayout of `a`'s set would fix.
        forest.node_mut(c).unwrap().translate.x = 99.0;
        forest.set_label_text(b, "bb", &TextStyle { font_size: 10.0, ..TextStyle::default() }).unwrap();
        layout_tree(&mut forest, tree, &metrics(), &config);
        assert_eq!(forest.get(c).unwrap().translate().x, 99.0);
        assert!(forest.get(b).unwrap().translate().x > 0.0);
    }

    #[test]
    fn stale_daughter_under_fresh_mother_is_repaired() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let tree = forest.create_tree(label("S"));
        let root = forest.tree(tree).unwrap().root();
        let a = forest.append_daughter(root, label("a")).unwrap();
        layout_tree(&mut forest, tree, &metrics(), &config);

        forest.mark_stale(a, crate::taint::StaleScope::Label).unwrap();
        forest.node_mut(a).unwrap().taint = Taint::Stale;
        forest.node_mut(a).unwrap().label.runs[0].text = "aaaaaaaaaa".into();
        layout_tree(&mut forest, tree, &metrics(), &config);
        assert_eq!(forest.get(root).unwrap().inner_width(), 50.0);
        assert!(forest.get(root).unwrap().taint().is_fresh());
    }
}
