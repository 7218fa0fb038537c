//! Placement of multi-dominance curves.
//!
//! Curves are only re-derived from node positions when an edge is created,
//! attached or explicitly re-anchored. Everything else is direct
//! manipulation of the stored path.

use crate::config::LayoutConfig;
use crate::error::ForestError;
use crate::forest::{Forest, MdomId, NodeId};
use crate::geometry::Point;
use crate::mdom::{ControlPoint, CubicPath, MdomEdge};

/// Bottom centre of the node's hit rectangle in forest coordinates. Hidden
/// and empty labels anchor inside their placeholder instead.
pub fn mother_anchor(forest: &Forest, node: NodeId) -> Option<Point> {
    let n = forest.node(node)?;
    let origin = forest.absolute_position(node)?;
    let rect = n.rect.translated(origin);
    let mut anchor = Point::new(rect.center_x(), rect.bottom());
    if !n.label.is_shown() {
        anchor.y -= (rect.height + 2.0) / 2.0;
    }
    Some(anchor)
}

/// Top centre of the node's hit rectangle in forest coordinates.
pub fn daughter_anchor(forest: &Forest, node: NodeId) -> Option<Point> {
    let n = forest.node(node)?;
    let origin = forest.absolute_position(node)?;
    let rect = n.rect.translated(origin);
    let mut anchor = Point::new(rect.center_x(), rect.y);
    if !n.label.is_shown() {
        anchor.y += (rect.height + 2.0) / 2.0;
    }
    Some(anchor)
}

/// Starts a new edge below `mother`, hanging straight down until a
/// daughter is attached.
pub fn create_mdom(forest: &mut Forest, mother: NodeId, config: &LayoutConfig) -> Result<MdomId, ForestError> {
    let anchor = mother_anchor(forest, mother).ok_or(ForestError::UnknownNode(mother))?;
    let id = forest.next_mdom_id();
    let path = CubicPath::unconnected(anchor, config.unconnected_mdom_height);
    forest.mdoms.push(MdomEdge::new(id, mother, path));
    tracing::debug!(mdom = %id, mother = %mother, "created mdom edge");
    Ok(id)
}

pub fn remove_mdom(forest: &mut Forest, id: MdomId) -> Result<(), ForestError> {
    let before = forest.mdoms.len();
    forest.mdoms.retain(|edge| edge.id != id);
    if forest.mdoms.len() == before {
        return Err(ForestError::UnknownMdom(id));
    }
    Ok(())
}

/// Binds `daughter` to the edge and re-derives the curve between the two
/// anchors.
pub fn attach_daughter(forest: &mut Forest, id: MdomId, daughter: NodeId, config: &LayoutConfig) -> Result<(), ForestError> {
    forest.get(daughter)?;
    forest.mdom_mut(id)?.daughter = Some(daughter);
    anchor_to_nodes(forest, id, config)
}

/// Unbinds the daughter but leaves the curve where it is.
pub fn detach_daughter(forest: &mut Forest, id: MdomId) -> Result<(), ForestError> {
    forest.mdom_mut(id)?.daughter = None;
    Ok(())
}

/// Moves the start of the curve to `point`, keeping its end in place.
pub fn set_mother_anchor(forest: &mut Forest, id: MdomId, point: Point) -> Result<(), ForestError> {
    let edge = forest.mdom_mut(id)?;
    edge.path = CubicPath::between(point, edge.path.end());
    edge.sync_background();
    Ok(())
}

/// Moves the end of the curve to `point`, keeping its start in place.
pub fn set_daughter_anchor(forest: &mut Forest, id: MdomId, point: Point) -> Result<(), ForestError> {
    let edge = forest.mdom_mut(id)?;
    edge.path = CubicPath::between(edge.path.moveto, point);
    edge.sync_background();
    Ok(())
}

/// Re-derives the curve from the current node geometry.
pub fn anchor_to_nodes(forest: &mut Forest, id: MdomId, config: &LayoutConfig) -> Result<(), ForestError> {
    let (mother, daughter) = {
        let edge = forest.mdom(id).ok_or(ForestError::UnknownMdom(id))?;
        (edge.mother, edge.daughter)
    };
    let start = mother_anchor(forest, mother).ok_or(ForestError::UnknownNode(mother))?;
    let end = daughter.and_then(|d| daughter_anchor(forest, d));
    let edge = forest.mdom_mut(id)?;
    edge.path = match end {
        Some(end) => CubicPath::between(start, end),
        None => CubicPath::unconnected(start, config.unconnected_mdom_height),
    };
    edge.needs_anchor = false;
    edge.sync_background();
    Ok(())
}

/// Drags one point of the curve to the absolute position `point`.
///
/// Inner handles next to the join are kept point-symmetric through it, so
/// the curve stays smooth. Dropping the start or the end over a node binds
/// the edge to that node.
pub fn move_control_point(
    forest: &mut Forest,
    id: MdomId,
    control: ControlPoint,
    point: Point,
) -> Result<(), ForestError> {
    match control {
        ControlPoint::Moveto => {
            set_mother_anchor(forest, id, point)?;
            if let Some(node) = forest.node_at(point) {
                forest.mdom_mut(id)?.mother = node;
            }
            return Ok(());
        }
        ControlPoint::End => {
            set_daughter_anchor(forest, id, point)?;
            let node = forest.node_at(point);
            forest.mdom_mut(id)?.daughter = node;
            return Ok(());
        }
        _ => {}
    }

    let edge = forest.mdom_mut(id)?;
    let path = &mut edge.path;
    let join = path.join();
    match control {
        ControlPoint::FirstCp1 => path.first.cp1 = point - path.moveto,
        ControlPoint::FirstCp2 => {
            path.first.cp2 = point - path.moveto;
            path.second.cp1 = path.first.end - path.first.cp2;
        }
        ControlPoint::Join => {
            let delta = point - join;
            path.first.end += delta;
            path.first.cp2 += delta;
            path.second.cp2 -= delta;
            path.second.end -= delta;
        }
        ControlPoint::SecondCp1 => {
            path.second.cp1 = point - join;
            path.first.cp2 = path.first.end - path.second.cp1;
        }
        ControlPoint::SecondCp2 => path.second.cp2 = point - join,
        ControlPoint::Moveto | ControlPoint::End => {}
    }
    edge.sync_background();
    Ok(())
}

/// Anchors every edge whose stored curve was rejected on load.
pub(super) fn anchor_pending(forest: &mut Forest, config: &LayoutConfig) {
    let pending: Vec<MdomId> = forest
        .mdoms
        .iter()
        .filter(|edge| edge.needs_anchor)
        .map(|edge| edge.id)
        .collect();
    for id in pending {
        if let Err(err) = anchor_to_nodes(forest, id, config) {
            tracing::warn!(mdom = %id, %err, "could not anchor mdom edge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::label::Label;
    use crate::style::{Alignment, TextStyle};

    fn forest_with_pair() -> (Forest, NodeId, NodeId) {
        let mut forest = Forest::new();
        let style = TextStyle::default();
        let tree = forest.create_tree(Label::plain("S", &style, Alignment::Center));
        let root = forest.tree(tree).unwrap().root();
        let a = forest.append_daughter(root, Label::plain("a", &style, Alignment::Center)).unwrap();
        let b = forest.append_daughter(root, Label::plain("b", &style, Alignment::Center)).unwrap();
        for (id, x, rect) in [
            (root, 0.0, Rect::new(-10.0, -5.0, 20.0, 10.0)),
            (a, -40.0, Rect::new(-10.0, -5.0, 20.0, 10.0)),
            (b, 40.0, Rect::new(-10.0, -5.0, 20.0, 10.0)),
        ] {
            let n = forest.node_mut(id).unwrap();
            n.rect = rect;
            if id != root {
                n.translate = Point::new(x, 35.0);
            }
        }
        (forest, a, b)
    }

    #[test]
    fn new_edge_hangs_below_mother() {
        let config = LayoutConfig::default();
        let (mut forest, a, _) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();
        let edge = forest.mdom(id).unwrap();
        assert_eq!(edge.path().moveto, Point::new(-40.0, 40.0));
        assert_eq!(edge.path().end(), Point::new(-40.0, 75.0));
        assert_eq!(edge.background(), edge.path());
    }

    #[test]
    fn attaching_runs_the_curve_to_the_daughter_top() {
        let config = LayoutConfig::default();
        let (mut forest, a, b) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();
        attach_daughter(&mut forest, id, b, &config).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert_eq!(path.end(), Point::new(40.0, 30.0));
        assert_eq!(path.join(), Point::new(0.0, 35.0));
        assert_eq!(forest.mdom(id).unwrap().daughter(), Some(b));
    }

    #[test]
    fn dragging_a_handle_mirrors_its_partner() {
        let config = LayoutConfig::default();
        let (mut forest, a, _) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();

        move_control_point(&mut forest, id, ControlPoint::FirstCp2, Point::new(-20.0, 50.0)).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert!(path.is_smooth(1e-4));
        assert_eq!(path.absolute(ControlPoint::SecondCp1), Point::new(-60.0, 65.0));

        move_control_point(&mut forest, id, ControlPoint::SecondCp1, Point::new(-45.0, 70.0)).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert!(path.is_smooth(1e-4));
        assert_eq!(path.absolute(ControlPoint::FirstCp2), Point::new(-35.0, 45.0));
        assert_eq!(forest.mdom(id).unwrap().background(), &path);
    }

    #[test]
    fn moving_the_join_keeps_both_ends() {
        let config = LayoutConfig::default();
        let (mut forest, a, _) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();
        move_control_point(&mut forest, id, ControlPoint::FirstCp2, Point::new(-30.0, 50.0)).unwrap();
        let before = *forest.mdom(id).unwrap().path();

        move_control_point(&mut forest, id, ControlPoint::Join, Point::new(-20.0, 60.0)).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert_eq!(path.moveto, before.moveto);
        assert_eq!(path.end(), before.end());
        assert_eq!(path.join(), Point::new(-20.0, 60.0));
        assert!(path.is_smooth(1e-4));
    }

    #[test]
    fn dropping_the_end_on_a_node_binds_it() {
        let config = LayoutConfig::default();
        let (mut forest, a, b) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();
        move_control_point(&mut forest, id, ControlPoint::End, Point::new(42.0, 33.0)).unwrap();
        assert_eq!(forest.mdom(id).unwrap().daughter(), Some(b));
        assert_eq!(forest.mdom(id).unwrap().path().end(), Point::new(42.0, 33.0));

        move_control_point(&mut forest, id, ControlPoint::End, Point::new(200.0, 200.0)).unwrap();
        assert_eq!(forest.mdom(id).unwrap().daughter(), None);
    }

    #[test]
    fn anchor_setters_keep_the_other_end() {
        let config = LayoutConfig::default();
        let (mut forest, a, b) = forest_with_pair();
        let id = create_mdom(&mut forest, a, &config).unwrap();
        attach_daughter(&mut forest, id, b, &config).unwrap();
        let attached = *forest.mdom(id).unwrap().path();

        detach_daughter(&mut forest, id).unwrap();
        assert_eq!(forest.mdom(id).unwrap().daughter(), None);
        assert_eq!(forest.mdom(id).unwrap().path(), &attached);

        set_daughter_anchor(&mut forest, id, Point::new(10.0, 90.0)).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert_eq!(path.moveto, attached.moveto);
        assert_eq!(path.end(), Point::new(10.0, 90.0));

        set_mother_anchor(&mut forest, id, Point::new(0.0, 0.0)).unwrap();
        let path = *forest.mdom(id).unwrap().path();
        assert_eq!(path.moveto, Point::ORIGIN);
        assert_eq!(path.end(), Point::new(10.0, 90.0));
        assert_eq!(forest.mdom(id).unwrap().background(), &path);
    }

    #[test]
    fn unknown_edge_is_reported() {
        let (mut forest, _, _) = forest_with_pair();
        let config = LayoutConfig::default();
        let root = forest.trees()[0].root();
        let id = create_mdom(&mut forest, root, &config).unwrap();
        remove_mdom(&mut forest, id).unwrap();
        assert_eq!(remove_mdom(&mut forest, id), Err(ForestError::UnknownMdom(id)));
    }
}
