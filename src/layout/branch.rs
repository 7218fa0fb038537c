use super::types::{Connector, ConnectorKind, HitRegion};
use crate::config::LayoutConfig;
use crate::forest::{Forest, NodeId};
use crate::geometry::{Point, Rect};

/// Recomputes the connector from `mother` to `daughter`.
///
/// Endpoints are derived in the mother frame from the daughter's current
/// translation, whose vertical component is `length`. The connector keeps a
/// `frame_offset` back into the daughter frame.
pub(super) fn layout_branch(forest: &mut Forest, mother: NodeId, daughter: NodeId, length: f32, config: &LayoutConfig) {
    let Some(m) = forest.node(mother) else {
        return;
    };
    let Some(d) = forest.node(daughter) else {
        return;
    };
    let pad = config.node_vertical_padding;

    let start = if m.label.is_visible() {
        let metrics = &m.label.metrics;
        Point::new(0.0, pad + metrics.height - metrics.first_line_height / 2.0)
    } else {
        Point::new(0.0, -config.invisible_node_vertical_padding)
    };

    let dx = d.translate.x;
    let kind = d.connector.kind;
    let (end, corner) = if d.label.is_visible() {
        let metrics = &d.label.metrics;
        let mut y = length - pad - metrics.first_line_height / 2.0;
        if metrics.first_line_height == 0.0 {
            y -= config.empty_node_vertical_padding;
        }
        match kind {
            ConnectorKind::Line => (Point::new(dx, y), None),
            ConnectorKind::Triangle => {
                let half = metrics.width / 2.0;
                (Point::new(dx - half, y), Some(Point::new(dx + half, y)))
            }
        }
    } else {
        let y = length - config.invisible_node_vertical_padding;
        match kind {
            ConnectorKind::Line => (Point::new(dx, y), None),
            ConnectorKind::Triangle => {
                let half = config.invisible_node_horizontal_padding;
                (Point::new(dx - half, y), Some(Point::new(dx + half, y)))
            }
        }
    };
    let frame_offset = -d.translate;

    let mut connector = Connector {
        kind,
        start,
        end,
        corner,
        frame_offset,
        hit: HitRegion::default(),
    };
    connector.hit = hit_region(&connector, config);

    if let Some(d) = forest.node_mut(daughter) {
        d.connector = connector;
    }
}

/// Pointer-highlight area around a connector, in the mother frame.
///
/// A line gets a zero-width strip along its length, rotated about the
/// start point; a triangle gets its axis-aligned bounding box. Both are then
/// padded by the branch rectangle paddings.
pub fn hit_region(connector: &Connector, config: &LayoutConfig) -> HitRegion {
    let h = config.branch_rect_horizontal_padding;
    let v = config.branch_rect_vertical_padding;
    let start = connector.start;
    match connector.corner {
        None => {
            let delta = connector.end - start;
            let length = (delta.x * delta.x + delta.y * delta.y).sqrt();
            let rotation = if length > 0.0 {
                (-delta.x).atan2(delta.y).to_degrees()
            } else {
                0.0
            };
            HitRegion {
                rect: Rect::new(start.x, start.y, 0.0, length).inflated(h, v),
                rotation,
                pivot: start,
            }
        }
        Some(corner) => {
            let left = connector.end;
            HitRegion {
                rect: Rect::new(left.x, start.y, corner.x - left.x, left.y - start.y).inflated(h, v),
                rotation: 0.0,
                pivot: start,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::style::{Alignment, TextStyle};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn pair(forest: &mut Forest, mother_text: &str, daughter_text: &str) -> (NodeId, NodeId) {
        let style = TextStyle::default();
        let tree = forest.create_tree(Label::plain(mother_text, &style, Alignment::Center));
        let mother = forest.tree(tree).unwrap().root();
        let daughter = forest
            .append_daughter(mother, Label::plain(daughter_text, &style, Alignment::Center))
            .unwrap();
        (mother, daughter)
    }

    fn set_label_box(forest: &mut Forest, id: NodeId, width: f32, height: f32, first: f32) {
        let metrics = &mut forest.node_mut(id).unwrap().label.metrics;
        metrics.width = width;
        metrics.height = height;
        metrics.first_line_height = first;
    }

    #[test]
    fn visible_pair_connects_label_edges() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "S", "NP");
        set_label_box(&mut forest, mother, 10.0, 30.0, 10.0);
        set_label_box(&mut forest, daughter, 20.0, 14.0, 14.0);
        forest.node_mut(daughter).unwrap().translate = Point::new(-20.0, 35.0);

        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let connector = forest.get(daughter).unwrap().connector();
        assert_eq!(connector.start, Point::new(0.0, 29.0));
        assert_eq!(connector.end, Point::new(-20.0, 24.0));
        assert_eq!(connector.frame_offset, Point::new(20.0, -35.0));
        assert_eq!(connector.points_in_daughter_frame()[1], Point::new(0.0, -11.0));
    }

    #[test]
    fn empty_daughter_gets_extra_clearance() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "S", "");
        set_label_box(&mut forest, mother, 10.0, 10.0, 10.0);
        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        assert_eq!(forest.get(daughter).unwrap().connector().end, Point::new(0.0, 21.0));
    }

    #[test]
    fn hidden_labels_use_fixed_pads() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "S", "NP");
        forest.set_label_visible(mother, false).unwrap();
        forest.set_label_visible(daughter, false).unwrap();
        forest.set_connector_kind(daughter, ConnectorKind::Triangle).unwrap();
        forest.node_mut(daughter).unwrap().translate = Point::new(0.0, 35.0);

        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let connector = forest.get(daughter).unwrap().connector();
        assert_eq!(connector.start, Point::new(0.0, -5.0));
        assert_eq!(connector.end, Point::new(-10.0, 30.0));
        assert_eq!(connector.corner, Some(Point::new(10.0, 30.0)));
    }

    #[test]
    fn hidden_mother_above_visible_daughter() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "S", "NP");
        forest.set_label_visible(mother, false).unwrap();
        set_label_box(&mut forest, daughter, 20.0, 14.0, 14.0);
        forest.node_mut(daughter).unwrap().translate = Point::new(15.0, 35.0);

        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let line = *forest.get(daughter).unwrap().connector();
        assert_eq!(line.start, Point::new(0.0, -5.0));
        assert_eq!(line.end, Point::new(15.0, 24.0));
        assert_eq!(line.corner, None);

        forest.set_connector_kind(daughter, ConnectorKind::Triangle).unwrap();
        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let triangle = forest.get(daughter).unwrap().connector();
        assert_eq!(triangle.start, Point::new(0.0, -5.0));
        assert_eq!(triangle.end, Point::new(5.0, 24.0));
        assert_eq!(triangle.corner, Some(Point::new(25.0, 24.0)));
    }

    #[test]
    fn visible_mother_above_hidden_daughter() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "S", "NP");
        set_label_box(&mut forest, mother, 10.0, 10.0, 10.0);
        forest.set_label_visible(daughter, false).unwrap();
        forest.node_mut(daughter).unwrap().translate = Point::new(-15.0, 35.0);

        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let line = *forest.get(daughter).unwrap().connector();
        assert_eq!(line.start, Point::new(0.0, 9.0));
        assert_eq!(line.end, Point::new(-15.0, 30.0));
        assert_eq!(line.corner, None);

        forest.set_connector_kind(daughter, ConnectorKind::Triangle).unwrap();
        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let triangle = forest.get(daughter).unwrap().connector();
        assert_eq!(triangle.start, Point::new(0.0, 9.0));
        assert_eq!(triangle.end, Point::new(-25.0, 30.0));
        assert_eq!(triangle.corner, Some(Point::new(-5.0, 30.0)));
    }

    #[test]
    fn triangle_base_spans_daughter_label() {
        let config = LayoutConfig::default();
        let mut forest = Forest::new();
        let (mother, daughter) = pair(&mut forest, "NP", "the old man");
        set_label_box(&mut forest, mother, 10.0, 10.0, 10.0);
        set_label_box(&mut forest, daughter, 60.0, 10.0, 10.0);
        forest.set_connector_kind(daughter, ConnectorKind::Triangle).unwrap();

        layout_branch(&mut forest, mother, daughter, 35.0, &config);
        let connector = forest.get(daughter).unwrap().connector();
        assert_eq!(connector.end, Point::new(-30.0, 26.0));
        assert_eq!(connector.corner, Some(Point::new(30.0, 26.0)));
        assert_eq!(connector.hit.rotation, 0.0);
        assert_eq!(connector.hit.rect, Rect::new(-31.5, 7.5, 63.0, 20.0));
    }

    #[test]
    fn line_hit_region_is_rotated_towards_the_daughter() {
        let config = LayoutConfig::default();
        let connector = Connector {
            kind: ConnectorKind::Line,
            start: Point::new(0.0, 0.0),
            end: Point::new(30.0, 40.0),
            corner: None,
            frame_offset: Point::ORIGIN,
            hit: HitRegion::default(),
        };
        let hit = hit_region(&connector, &config);
        assert!(approx(hit.rotation, -(30.0f32 / 50.0).asin().to_degrees()));
        assert_eq!(hit.rect, Rect::new(-1.5, -1.5, 3.0, 53.0));
        assert!(hit.contains(Point::new(15.0, 20.0)));
        assert!(!hit.contains(Point::new(-15.0, 20.0)));
    }
}
