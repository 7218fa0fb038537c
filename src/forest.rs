//! The document model: an arena of nodes grouped into trees, plus the
//! multi-dominance edges that link nodes across the tree structure.
//!
//! Every edit goes through [`Forest`] and only ever raises taint; the layout
//! pass in [`crate::layout`] is what clears it again.

use crate::error::ForestError;
use crate::geometry::{Point, Rect};
use crate::label::{Label, TextRun, runs_from_text};
use crate::layout::types::{Connector, ConnectorKind};
use crate::mdom::MdomEdge;
use crate::style::{Alignment, TextStyle};
use crate::taint::{StaleScope, Taint};
use std::collections::HashSet;
use std::fmt;

/// Handle to a node. Handles of removed nodes never resolve again, even
/// after their slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}g{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u32);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MdomId(u32);

impl fmt::Display for MdomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) tree: TreeId,
    pub(crate) mother: Option<NodeId>,
    pub(crate) daughters: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) label: Label,
    pub(crate) connector: Connector,
    pub(crate) inner_width: f32,
    pub(crate) outer_width: f32,
    pub(crate) translate: Point,
    pub(crate) taint: Taint,
    /// Highlight rectangle in the node frame.
    pub(crate) rect: Rect,
}

impl Node {
    fn new(tree: TreeId, mother: Option<NodeId>, depth: usize, label: Label, kind: ConnectorKind) -> Self {
        Self {
            tree,
            mother,
            daughters: Vec::new(),
            depth,
            label,
            connector: Connector::new(kind),
            inner_width: 0.0,
            outer_width: 0.0,
            translate: Point::ORIGIN,
            taint: Taint::Stale,
            rect: Rect::default(),
        }
    }

    pub fn tree(&self) -> TreeId {
        self.tree
    }

    pub fn mother(&self) -> Option<NodeId> {
        self.mother
    }

    pub fn daughters(&self) -> &[NodeId] {
        &self.daughters
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Clearance left of the node's center required by its subtree. Only
    /// meaningful while the node is fresh.
    pub fn inner_width(&self) -> f32 {
        self.inner_width
    }

    /// Clearance right of the node's center required by its subtree.
    pub fn outer_width(&self) -> f32 {
        self.outer_width
    }

    pub fn width(&self) -> f32 {
        self.inner_width + self.outer_width
    }

    /// Offset from the mother's origin (or the tree origin for a root).
    pub fn translate(&self) -> Point {
        self.translate
    }

    pub fn taint(&self) -> Taint {
        self.taint
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) id: TreeId,
    pub(crate) root: NodeId,
    /// Nodes partitioned by depth.
    pub(crate) generations: Vec<Vec<NodeId>>,
    /// Clearance each generation last applied below its mothers' row.
    pub(crate) row_heights: Vec<Option<f32>>,
    /// Horizontal position of the root in forest coordinates.
    pub(crate) x: f32,
}

impl Tree {
    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Deepest generation index.
    pub fn depth(&self) -> usize {
        self.generations.len().saturating_sub(1)
    }

    pub fn generation(&self, depth: usize) -> &[NodeId] {
        self.generations.get(depth).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.generations.iter().map(Vec::len).sum()
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.generations.iter().flatten().copied()
    }

    fn register(&mut self, id: NodeId, depth: usize) {
        while self.generations.len() <= depth {
            self.generations.push(Vec::new());
            self.row_heights.push(None);
        }
        self.generations[depth].push(id);
    }

    fn unregister(&mut self, id: NodeId, depth: usize) {
        if let Some(generation) = self.generations.get_mut(depth) {
            generation.retain(|n| *n != id);
        }
        while self.generations.last().is_some_and(Vec::is_empty) {
            self.generations.pop();
            self.row_heights.pop();
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Content and cached geometry of a subtree, detached from the arena.
struct Snapshot {
    label: Label,
    kind: ConnectorKind,
    daughters: Vec<Snapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    slots: Vec<Slot>,
    free: Vec<u32>,
    trees: Vec<Tree>,
    next_tree: u32,
    pub(crate) mdoms: Vec<MdomEdge>,
    next_mdom: u32,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, ForestError> {
        self.node(id).ok_or(ForestError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, ForestError> {
        self.node_mut(id).ok_or(ForestError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn tree(&self, id: TreeId) -> Option<&Tree> {
        self.trees.iter().find(|tree| tree.id == id)
    }

    pub(crate) fn tree_mut(&mut self, id: TreeId) -> Option<&mut Tree> {
        self.trees.iter_mut().find(|tree| tree.id == id)
    }

    pub(crate) fn trees_mut(&mut self) -> &mut [Tree] {
        &mut self.trees
    }

    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// All live nodes, tree by tree and generation by generation.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.trees
            .iter()
            .flat_map(|tree| tree.nodes())
            .filter_map(|id| self.node(id).map(|node| (id, node)))
    }

    pub fn mdoms(&self) -> &[MdomEdge] {
        &self.mdoms
    }

    pub fn mdom(&self, id: MdomId) -> Option<&MdomEdge> {
        self.mdoms.iter().find(|edge| edge.id == id)
    }

    pub(crate) fn mdom_mut(&mut self, id: MdomId) -> Result<&mut MdomEdge, ForestError> {
        self.mdoms
            .iter_mut()
            .find(|edge| edge.id == id)
            .ok_or(ForestError::UnknownMdom(id))
    }

    pub(crate) fn next_mdom_id(&mut self) -> MdomId {
        let id = MdomId(self.next_mdom);
        self.next_mdom += 1;
        id
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).and_then(Node::mother), move |current| {
            self.node(*current).and_then(Node::mother)
        })
    }

    pub fn is_stale(&self) -> bool {
        self.nodes()
            .any(|(_, node)| node.taint.is_stale() || node.label.taint.is_stale())
    }

    /// Appends a new tree with a single root node on the right of the forest.
    pub fn create_tree(&mut self, label: Label) -> TreeId {
        let tree_id = TreeId(self.next_tree);
        self.next_tree += 1;
        let root = self.alloc(Node::new(tree_id, None, 0, label, ConnectorKind::Line));
        let mut tree = Tree {
            id: tree_id,
            root,
            generations: Vec::new(),
            row_heights: Vec::new(),
            x: 0.0,
        };
        tree.register(root, 0);
        self.trees.push(tree);
        tracing::debug!(tree = %tree_id, root = %root, "created tree");
        tree_id
    }

    pub fn remove_tree(&mut self, id: TreeId) -> Result<(), ForestError> {
        let position = self
            .trees
            .iter()
            .position(|tree| tree.id == id)
            .ok_or(ForestError::UnknownTree(id))?;
        let tree = self.trees.remove(position);
        let removed: HashSet<NodeId> = tree.nodes().collect();
        for node in &removed {
            self.release(*node);
        }
        self.forget_nodes(&removed);
        tracing::debug!(tree = %id, nodes = removed.len(), "removed tree");
        Ok(())
    }

    pub fn append_daughter(&mut self, mother: NodeId, label: Label) -> Result<NodeId, ForestError> {
        let at = self.get(mother)?.daughters.len();
        self.insert_daughter_at(mother, at, label, ConnectorKind::Line)
    }

    pub fn insert_daughter_before(
        &mut self,
        mother: NodeId,
        sibling: NodeId,
        label: Label,
    ) -> Result<NodeId, ForestError> {
        let at = self.daughter_position(mother, sibling)?;
        self.insert_daughter_at(mother, at, label, ConnectorKind::Line)
    }

    /// Copies the subtree rooted at `source` (from any tree) into a new
    /// daughter of `mother`, before `before` or at the end.
    pub fn merge_daughter(
        &mut self,
        mother: NodeId,
        source: NodeId,
        before: Option<NodeId>,
    ) -> Result<NodeId, ForestError> {
        let at = match before {
            Some(sibling) => self.daughter_position(mother, sibling)?,
            None => self.get(mother)?.daughters.len(),
        };
        let snapshot = self.snapshot(source)?;
        let copy = self.instantiate(mother, at, snapshot)?;
        tracing::debug!(source = %source, copy = %copy, mother = %mother, "merged subtree copy");
        Ok(copy)
    }

    /// Detaches `node` from its mother and discards its whole subtree.
    pub fn remove_daughter(&mut self, node: NodeId) -> Result<(), ForestError> {
        let (mother, tree_id) = {
            let n = self.get(node)?;
            (n.mother.ok_or(ForestError::RootRemoval(node))?, n.tree)
        };
        if let Some(m) = self.node_mut(mother) {
            m.daughters.retain(|d| *d != node);
        }
        let mut removed = HashSet::new();
        self.collect_subtree(node, &mut removed);
        for id in &removed {
            let depth = self.node(*id).map(Node::depth).unwrap_or(0);
            if let Some(tree) = self.tree_mut(tree_id) {
                tree.unregister(*id, depth);
            }
            self.release(*id);
        }
        self.forget_nodes(&removed);
        self.stale_node_and_ancestors(mother);
        Ok(())
    }

    /// Replaces the runs of a label. A change in line count stales the whole
    /// tree, since it can change the clearance of an entire generation.
    pub fn set_label_runs(&mut self, node: NodeId, runs: Vec<TextRun>) -> Result<(), ForestError> {
        let n = self.get_mut(node)?;
        let before = n.label.line_count();
        n.label.replace_runs(runs);
        let after = n.label.line_count();
        let tree = n.tree;
        if before != after {
            tracing::debug!(node = %node, before, after, "line count changed");
            self.stale_tree(tree);
        } else {
            self.stale_node_and_ancestors(node);
        }
        Ok(())
    }

    pub fn set_label_text(&mut self, node: NodeId, text: &str, style: &TextStyle) -> Result<(), ForestError> {
        self.set_label_runs(node, runs_from_text(text, style))
    }

    pub fn set_label_visible(&mut self, node: NodeId, visible: bool) -> Result<(), ForestError> {
        let n = self.get_mut(node)?;
        if n.label.visible == visible {
            return Ok(());
        }
        n.label.visible = visible;
        self.stale_node_and_ancestors(node);
        Ok(())
    }

    pub fn set_alignment(&mut self, node: NodeId, alignment: Alignment) -> Result<(), ForestError> {
        let n = self.get_mut(node)?;
        if n.label.alignment == alignment {
            return Ok(());
        }
        n.label.alignment = alignment;
        self.stale_node_and_ancestors(node);
        Ok(())
    }

    pub fn set_connector_kind(&mut self, node: NodeId, kind: ConnectorKind) -> Result<(), ForestError> {
        let n = self.get_mut(node)?;
        if n.connector.kind == kind {
            return Ok(());
        }
        n.connector.kind = kind;
        self.stale_ancestry(node);
        Ok(())
    }

    pub fn mark_stale(&mut self, node: NodeId, scope: StaleScope) -> Result<(), ForestError> {
        let tree = self.get(node)?.tree;
        match scope {
            StaleScope::Label => {
                self.get_mut(node)?.label.taint = Taint::Stale;
            }
            StaleScope::Node => self.stale_node_and_ancestors(node),
            StaleScope::Subtree => {
                let mut subtree = HashSet::new();
                self.collect_subtree(node, &mut subtree);
                for id in subtree {
                    if let Some(n) = self.node_mut(id) {
                        n.taint = Taint::Stale;
                        n.label.taint = Taint::Stale;
                    }
                }
                self.stale_node_and_ancestors(node);
            }
            StaleScope::WholeTree => self.stale_tree(tree),
        }
        Ok(())
    }

    /// Position of the node's origin in forest coordinates.
    pub fn absolute_position(&self, id: NodeId) -> Option<Point> {
        let node = self.node(id)?;
        let mut position = node.translate;
        let mut current = node.mother;
        while let Some(m) = current {
            let mother = self.node(m)?;
            position += mother.translate;
            current = mother.mother;
        }
        let tree = self.tree(node.tree)?;
        Some(position + Point::new(tree.x, 0.0))
    }

    /// Node whose highlight rectangle contains `point`.
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.nodes().find_map(|(id, node)| {
            let origin = self.absolute_position(id)?;
            node.rect.translated(origin).contains(point).then_some(id)
        })
    }

    /// Daughter whose connector hit region contains `point`.
    pub fn branch_at(&self, point: Point) -> Option<NodeId> {
        self.nodes().find_map(|(id, node)| {
            let mother = self.absolute_position(node.mother?)?;
            node.connector.hit.contains(point - mother).then_some(id)
        })
    }

    /// Extent of all node rectangles, connectors and multi-dominance control
    /// polygons in forest coordinates.
    pub fn bounds(&self) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        let mut add = |r: Rect| {
            bounds = Some(match bounds {
                Some(b) => b.union(&r),
                None => r,
            });
        };
        for (id, node) in self.nodes() {
            let Some(origin) = self.absolute_position(id) else {
                continue;
            };
            add(node.rect.translated(origin));
            if let Some(mother) = node.mother.and_then(|m| self.absolute_position(m))
                && let Some(r) = Rect::from_points(node.connector.points().into_iter().map(|p| p + mother))
            {
                add(r);
            }
        }
        for edge in &self.mdoms {
            if let Some(r) = Rect::from_points(edge.path.control_polygon()) {
                add(r);
            }
        }
        bounds
    }

    pub(crate) fn stale_node_and_ancestors(&mut self, node: NodeId) {
        if let Some(n) = self.node_mut(node) {
            n.label.taint = Taint::Stale;
        }
        self.stale_ancestry(node);
    }

    /// Stales the node and its ancestors but leaves every label alone.
    pub(crate) fn stale_ancestry(&mut self, node: NodeId) {
        let chain: Vec<NodeId> = std::iter::once(node).chain(self.ancestors(node)).collect();
        for id in chain {
            if let Some(n) = self.node_mut(id) {
                n.taint = Taint::Stale;
            }
        }
    }

    pub(crate) fn stale_tree(&mut self, tree: TreeId) {
        let ids: Vec<NodeId> = self.tree(tree).map(|t| t.nodes().collect()).unwrap_or_default();
        for id in ids {
            if let Some(n) = self.node_mut(id) {
                n.taint = Taint::Stale;
                n.label.taint = Taint::Stale;
            }
        }
    }

    fn daughter_position(&self, mother: NodeId, sibling: NodeId) -> Result<usize, ForestError> {
        self.get(mother)?
            .daughters
            .iter()
            .position(|d| *d == sibling)
            .ok_or(ForestError::NotADaughter {
                mother,
                node: sibling,
            })
    }

    pub(crate) fn insert_daughter_at(
        &mut self,
        mother: NodeId,
        at: usize,
        label: Label,
        kind: ConnectorKind,
    ) -> Result<NodeId, ForestError> {
        let (tree_id, depth) = {
            let m = self.get(mother)?;
            (m.tree, m.depth + 1)
        };
        let id = self.alloc(Node::new(tree_id, Some(mother), depth, label, kind));
        if let Some(m) = self.node_mut(mother) {
            let at = at.min(m.daughters.len());
            m.daughters.insert(at, id);
        }
        if let Some(tree) = self.tree_mut(tree_id) {
            tree.register(id, depth);
        }
        self.stale_node_and_ancestors(mother);
        Ok(id)
    }

    fn snapshot(&self, id: NodeId) -> Result<Snapshot, ForestError> {
        let node = self.get(id)?;
        let mut label = node.label.clone();
        label.taint = Taint::Stale;
        let daughters = node
            .daughters
            .iter()
            .map(|d| self.snapshot(*d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot {
            label,
            kind: node.connector.kind,
            daughters,
        })
    }

    fn instantiate(&mut self, mother: NodeId, at: usize, snapshot: Snapshot) -> Result<NodeId, ForestError> {
        let id = self.insert_daughter_at(mother, at, snapshot.label, snapshot.kind)?;
        for (i, daughter) in snapshot.daughters.into_iter().enumerate() {
            self.instantiate(id, i, daughter)?;
        }
        Ok(id)
    }

    fn collect_subtree(&self, id: NodeId, out: &mut HashSet<NodeId>) {
        out.insert(id);
        if let Some(node) = self.node(id) {
            for daughter in &node.daughters {
                self.collect_subtree(*daughter, out);
            }
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId { index, generation: 0 }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize)
            && slot.generation == id.generation
            && slot.node.take().is_some()
        {
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
        }
    }

    /// Drops references to removed nodes from multi-dominance edges. An
    /// edge whose mother is gone is removed entirely.
    fn forget_nodes(&mut self, removed: &HashSet<NodeId>) {
        self.mdoms.retain(|edge| !removed.contains(&edge.mother));
        for edge in &mut self.mdoms {
            if edge.daughter.is_some_and(|d| removed.contains(&d)) {
                edge.daughter = None;
            }
        }
    }
}
