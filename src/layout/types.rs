use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    #[default]
    Line,
    Triangle,
}

/// Pointer-highlight area around a connector: `rect` rotated by `rotation`
/// degrees about `pivot`, in the mother frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HitRegion {
    pub rect: Rect,
    pub rotation: f32,
    pub pivot: Point,
}

impl HitRegion {
    pub fn contains(&self, point: Point) -> bool {
        let local = point.rotate_about(self.pivot, -self.rotation);
        self.rect.contains(local)
    }

    pub fn corners(&self) -> [Point; 4] {
        let r = self.rect;
        [
            Point::new(r.x, r.y),
            Point::new(r.right(), r.y),
            Point::new(r.right(), r.bottom()),
            Point::new(r.x, r.bottom()),
        ]
        .map(|p| p.rotate_about(self.pivot, self.rotation))
    }
}

/// The drawn link from a mother to one daughter.
///
/// `start`, `end` and `corner` are stored in the mother frame. The connector
/// is attached to the daughter with a `frame_offset` of minus the daughter's
/// translation, so retranslating the daughter only has to update the offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Connector {
    pub kind: ConnectorKind,
    pub start: Point,
    /// Line end, or the left base corner of a triangle.
    pub end: Point,
    /// Right base corner of a triangle.
    pub corner: Option<Point>,
    pub frame_offset: Point,
    pub hit: HitRegion,
}

impl Connector {
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn points(&self) -> Vec<Point> {
        let mut points = vec![self.start, self.end];
        points.extend(self.corner);
        points
    }

    /// Endpoints in the daughter's own frame.
    pub fn points_in_daughter_frame(&self) -> Vec<Point> {
        self.points()
            .into_iter()
            .map(|p| p + self.frame_offset)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotated_hit_region_follows_the_line() {
        // A vertical strip rotated so it leans towards +x.
        let hit = HitRegion {
            rect: Rect::new(-1.0, 0.0, 2.0, 10.0),
            rotation: -30.0,
            pivot: Point::ORIGIN,
        };
        let along = Point::new(0.0, 8.0).rotate_about(Point::ORIGIN, -30.0);
        assert!(along.x > 0.0);
        assert!(hit.contains(along));
        assert!(!hit.contains(Point::new(-4.0, 8.0)));
    }

    #[test]
    fn daughter_frame_points_apply_offset() {
        let connector = Connector {
            kind: ConnectorKind::Triangle,
            start: Point::new(0.0, 10.0),
            end: Point::new(-5.0, 30.0),
            corner: Some(Point::new(5.0, 30.0)),
            frame_offset: Point::new(0.0, -40.0),
            hit: HitRegion::default(),
        };
        assert_eq!(
            connector.points_in_daughter_frame(),
            vec![Point::new(0.0, -30.0), Point::new(-5.0, -10.0), Point::new(5.0, -10.0)]
        );
    }
}
