//! Dirty tracking for cached layout.
//!
//! Every node and every label carries its own [`Taint`]. Edits only ever move
//! a flag to [`Taint::Stale`]; the layout pass is the only code that moves a
//! flag back to [`Taint::Fresh`], and only after the cached values it guards
//! have been recomputed.
//!
//! Label taint is local: a stale label means its measured text metrics and
//! line placement are out of date. Node taint propagates: a stale node means
//! its half-widths, its position within its sibling set, or the connector to
//! its mother may be out of date, and every ancestor of a stale node is stale
//! as well once an edit has been fully recorded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Taint {
    #[default]
    Stale,
    Fresh,
}

impl Taint {
    pub fn is_stale(self) -> bool {
        matches!(self, Taint::Stale)
    }

    pub fn is_fresh(self) -> bool {
        matches!(self, Taint::Fresh)
    }
}

/// How far a [`crate::forest::Forest::mark_stale`] call reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaleScope {
    /// Only the node's label. Enough for a keystroke-level repaint.
    Label,
    /// The label, the node and every strict ancestor.
    Node,
    /// [`StaleScope::Node`] plus every descendant and descendant label.
    Subtree,
    /// Every node and label of the node's tree.
    WholeTree,
}
