//! Multi-dominance edges: secondary links drawn as a two-segment cubic
//! curve that is positioned by direct manipulation instead of by tree layout.

use crate::error::PathDataError;
use crate::forest::{MdomId, NodeId};
use crate::geometry::Point;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]|[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("valid path token regex")
});

/// One cubic segment; all three points are relative to the segment's start.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    pub cp1: Point,
    pub cp2: Point,
    pub end: Point,
}

impl Segment {
    /// A straight segment of `delta` whose handles sit at its two ends.
    pub fn straight(delta: Point) -> Self {
        Self {
            cp1: Point::ORIGIN,
            cp2: delta,
            end: delta,
        }
    }
}

/// `M moveto c first c second` with relative curve segments. `first.end` is
/// the join between the two segments.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CubicPath {
    pub moveto: Point,
    pub first: Segment,
    pub second: Segment,
}

impl CubicPath {
    /// Straight curve from `start` to `end`, joined halfway.
    pub fn between(start: Point, end: Point) -> Self {
        let half = Point::new((end.x - start.x) / 2.0, (end.y - start.y) / 2.0);
        Self {
            moveto: start,
            first: Segment::straight(half),
            second: Segment::straight(half),
        }
    }

    /// The curve of a new edge without daughter: straight down by `height`.
    pub fn unconnected(anchor: Point, height: f32) -> Self {
        Self::between(anchor, anchor + Point::new(0.0, height))
    }

    pub fn join(&self) -> Point {
        self.moveto + self.first.end
    }

    pub fn end(&self) -> Point {
        self.join() + self.second.end
    }

    pub fn absolute(&self, point: ControlPoint) -> Point {
        match point {
            ControlPoint::Moveto => self.moveto,
            ControlPoint::FirstCp1 => self.moveto + self.first.cp1,
            ControlPoint::FirstCp2 => self.moveto + self.first.cp2,
            ControlPoint::Join => self.join(),
            ControlPoint::SecondCp1 => self.join() + self.second.cp1,
            ControlPoint::SecondCp2 => self.join() + self.second.cp2,
            ControlPoint::End => self.end(),
        }
    }

    pub fn control_polygon(&self) -> [Point; 7] {
        ControlPoint::ALL.map(|point| self.absolute(point))
    }

    /// True when the handles on both sides of the join are point
    /// reflections of each other.
    pub fn is_smooth(&self, tolerance: f32) -> bool {
        let join = self.join();
        let mirrored = self.absolute(ControlPoint::FirstCp2).reflect_through(join);
        mirrored.distance(self.absolute(ControlPoint::SecondCp1)) <= tolerance
    }

    pub fn to_path_data(&self) -> String {
        let s = |p: Point| format!("{},{}", p.x, p.y);
        format!(
            "M {} c {} {} {} c {} {} {}",
            s(self.moveto),
            s(self.first.cp1),
            s(self.first.cp2),
            s(self.first.end),
            s(self.second.cp1),
            s(self.second.cp2),
            s(self.second.end)
        )
    }

    /// Parses `M x,y c x1,y1 x2,y2 x,y c x1,y1 x2,y2 x,y`. The second `c` may
    /// be omitted, as SVG allows for repeated commands.
    pub fn parse(data: &str) -> Result<Self, PathDataError> {
        let mut numbers = Vec::with_capacity(14);
        let mut commands = Vec::with_capacity(3);
        for token in PATH_TOKEN.find_iter(data) {
            let text = token.as_str();
            let mut chars = text.chars();
            if let (Some(ch), None) = (chars.next(), chars.next())
                && ch.is_ascii_alphabetic()
            {
                commands.push((ch, numbers.len()));
                continue;
            }
            let value: f32 = text
                .parse()
                .map_err(|_| PathDataError::InvalidNumber(text.to_string()))?;
            if !value.is_finite() {
                return Err(PathDataError::InvalidNumber(text.to_string()));
            }
            numbers.push(value);
        }

        match commands.first() {
            Some(('M', 0)) => {}
            _ => return Err(PathDataError::MissingMoveto),
        }
        for &(command, at) in &commands[1..] {
            if command != 'c' || (at != 2 && at != 8) {
                return Err(PathDataError::UnsupportedCommand(command));
            }
        }
        if numbers.len() != 14 {
            return Err(PathDataError::CoordinateCount {
                expected: 14,
                found: numbers.len(),
            });
        }

        let p = |i: usize| Point::new(numbers[i], numbers[i + 1]);
        Ok(Self {
            moveto: p(0),
            first: Segment {
                cp1: p(2),
                cp2: p(4),
                end: p(6),
            },
            second: Segment {
                cp1: p(8),
                cp2: p(10),
                end: p(12),
            },
        })
    }
}

impl fmt::Display for CubicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_data())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlPoint {
    Moveto,
    FirstCp1,
    FirstCp2,
    Join,
    SecondCp1,
    SecondCp2,
    End,
}

impl ControlPoint {
    pub const ALL: [ControlPoint; 7] = [
        ControlPoint::Moveto,
        ControlPoint::FirstCp1,
        ControlPoint::FirstCp2,
        ControlPoint::Join,
        ControlPoint::SecondCp1,
        ControlPoint::SecondCp2,
        ControlPoint::End,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct MdomEdge {
    pub(crate) id: MdomId,
    pub(crate) mother: NodeId,
    pub(crate) daughter: Option<NodeId>,
    pub(crate) path: CubicPath,
    /// Wider copy of `path` used for pointer highlighting.
    pub(crate) background: CubicPath,
    /// Set when the stored curve could not be trusted; the next forest
    /// redraw anchors it to its nodes.
    pub(crate) needs_anchor: bool,
}

impl MdomEdge {
    pub(crate) fn new(id: MdomId, mother: NodeId, path: CubicPath) -> Self {
        Self {
            id,
            mother,
            daughter: None,
            path,
            background: path,
            needs_anchor: false,
        }
    }

    pub fn id(&self) -> MdomId {
        self.id
    }

    pub fn mother(&self) -> NodeId {
        self.mother
    }

    pub fn daughter(&self) -> Option<NodeId> {
        self.daughter
    }

    pub fn path(&self) -> &CubicPath {
        &self.path
    }

    pub fn background(&self) -> &CubicPath {
        &self.background
    }

    pub(crate) fn sync_background(&mut self) {
        self.background = self.path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconnected_curve_runs_straight_down() {
        let path = CubicPath::unconnected(Point::new(10.0, 20.0), 35.0);
        assert_eq!(path.join(), Point::new(10.0, 37.5));
        assert_eq!(path.end(), Point::new(10.0, 55.0));
        assert!(path.is_smooth(1e-4));
    }

    #[test]
    fn parse_reads_formatted_data() {
        let path = CubicPath {
            moveto: Point::new(3.0, -4.5),
            first: Segment {
                cp1: Point::new(1.0, 2.0),
                cp2: Point::new(-3.0, 4.0),
                end: Point::new(5.0, 6.0),
            },
            second: Segment {
                cp1: Point::new(8.0, 2.0),
                cp2: Point::new(0.25, 1e-3),
                end: Point::new(7.0, 7.0),
            },
        };
        assert_eq!(CubicPath::parse(&path.to_path_data()).unwrap(), path);
    }

    #[test]
    fn parse_accepts_implicit_second_curve() {
        let path = CubicPath::parse("M0,0 c0,0 0,10 0,10 0,0 0,10 0,10").unwrap();
        assert_eq!(path.end(), Point::new(0.0, 20.0));
    }

    #[test]
    fn parse_rejects_missing_control_point() {
        let err = CubicPath::parse("M 0,0 c 0,0 0,10 0,10 c 0,0 0,10").unwrap_err();
        assert_eq!(
            err,
            PathDataError::CoordinateCount {
                expected: 14,
                found: 12
            }
        );
        assert_eq!(
            CubicPath::parse("c 0,0 0,0 0,0").unwrap_err(),
            PathDataError::MissingMoveto
        );
        assert_eq!(
            CubicPath::parse("M 0,0 L 1,1").unwrap_err(),
            PathDataError::UnsupportedCommand('L')
        );
    }
}
