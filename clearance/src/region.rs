use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GeomError, Halfspace, Halfspaces, Pt2D, Result};

/// Anything convex that can describe itself as an intersection of halfspaces. The distance
/// queries only ever see shapes through this.
pub trait ConvexRegion: Send + Sync {
    /// Returns `(A, b)` such that the region is `{x : A x <= b}`. Must return the same thing
    /// every time.
    fn halfspace_representation(&self) -> Halfspaces;
}

/// An axis-aligned rectangle, like the obstacles of a grid world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRectangle")]
pub struct Rectangle {
    left: f64,
    right: f64,
    down: f64,
    up: f64,
}

#[derive(Deserialize)]
struct RawRectangle {
    left: f64,
    right: f64,
    down: f64,
    up: f64,
}

impl TryFrom<RawRectangle> for Rectangle {
    type Error = GeomError;

    fn try_from(raw: RawRectangle) -> Result<Rectangle> {
        Rectangle::new(raw.left, raw.right, raw.down, raw.up)
    }
}

impl Rectangle {
    pub fn new(left: f64, right: f64, down: f64, up: f64) -> Result<Rectangle> {
        if [left, right, down, up].iter().any(|x| !x.is_finite()) {
            return Err(GeomError::InvalidGeometry(format!(
                "rectangle bounds must be finite: left {}, right {}, down {}, up {}",
                left, right, down, up
            )));
        }
        if left >= right {
            return Err(GeomError::InvalidGeometry(format!(
                "rectangle has left {} >= right {}",
                left, right
            )));
        }
        if down >= up {
            return Err(GeomError::InvalidGeometry(format!(
                "rectangle has down {} >= up {}",
                down, up
            )));
        }
        Ok(Rectangle {
            left,
            right,
            down,
            up,
        })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn down(&self) -> f64 {
        self.down
    }

    pub fn up(&self) -> f64 {
        self.up
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.up - self.down
    }

    pub fn center(&self) -> Pt2D {
        Pt2D::new(
            (self.left + self.right) / 2.0,
            (self.down + self.up) / 2.0,
        )
    }

    /// Counter-clockwise, starting from the bottom-left.
    pub fn corners(&self) -> [Pt2D; 4] {
        [
            Pt2D::new(self.left, self.down),
            Pt2D::new(self.right, self.down),
            Pt2D::new(self.right, self.up),
            Pt2D::new(self.left, self.up),
        ]
    }

    pub fn to_polygon(&self) -> ConvexPolygon {
        ConvexPolygon {
            pts: self.corners().to_vec(),
        }
    }
}

impl ConvexRegion for Rectangle {
    fn halfspace_representation(&self) -> Halfspaces {
        Halfspaces::new(vec![
            Halfspace::new(-1.0, 0.0, -self.left),
            Halfspace::new(0.0, -1.0, -self.down),
            Halfspace::new(1.0, 0.0, self.right),
            Halfspace::new(0.0, 1.0, self.up),
        ])
    }
}

// Any raw system of halfspaces is convex, so it can be queried directly.
impl ConvexRegion for Halfspaces {
    fn halfspace_representation(&self) -> Halfspaces {
        self.clone()
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Rectangle(x {} to {}, y {} to {})",
            self.left, self.right, self.down, self.up
        )
    }
}

/// A strictly convex polygon, like a vehicle footprint. Vertices are stored counter-clockwise
/// and the first isn't repeated at the end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolygon")]
pub struct ConvexPolygon {
    pts: Vec<Pt2D>,
}

#[derive(Deserialize)]
struct RawPolygon {
    pts: Vec<Pt2D>,
}

impl TryFrom<RawPolygon> for ConvexPolygon {
    type Error = GeomError;

    fn try_from(raw: RawPolygon) -> Result<ConvexPolygon> {
        ConvexPolygon::new(raw.pts)
    }
}

impl ConvexPolygon {
    /// Accepts either orientation. Fails on fewer than 3 points, repeated or collinear points,
    /// or any reflex turn.
    pub fn new(mut pts: Vec<Pt2D>) -> Result<ConvexPolygon> {
        if pts.len() >= 2 && pts.first() == pts.last() {
            pts.pop();
        }
        if pts.len() < 3 {
            return Err(GeomError::InvalidGeometry(format!(
                "polygon needs at least 3 points, got {}",
                pts.len()
            )));
        }

        let n = pts.len();
        let scale = pts
            .iter()
            .map(|pt| pt.x().abs().max(pt.y().abs()))
            .fold(1.0, f64::max);
        let threshold = 1e-12 * scale * scale;
        let turns: Vec<f64> = (0..n)
            .map(|i| turn(pts[i], pts[(i + 1) % n], pts[(i + 2) % n]))
            .collect();
        if turns.iter().any(|t| t.abs() <= threshold) {
            return Err(GeomError::InvalidGeometry(format!(
                "polygon has repeated or collinear points: {:?}",
                pts
            )));
        }
        let ccw = turns[0] > 0.0;
        if turns.iter().any(|t| (*t > 0.0) != ccw) {
            return Err(GeomError::InvalidGeometry(format!(
                "polygon isn't convex: {:?}",
                pts
            )));
        }
        if !ccw {
            pts.reverse();
        }

        // Consistent turns can still wind around more than once, like a pentagram.
        let winding: f64 = (0..n)
            .map(|i| {
                let (a, b, c) = (pts[i], pts[(i + 1) % n], pts[(i + 2) % n]);
                let heading1 = (b.y() - a.y()).atan2(b.x() - a.x());
                let heading2 = (c.y() - b.y()).atan2(c.x() - b.x());
                let mut delta = heading2 - heading1;
                while delta <= -std::f64::consts::PI {
                    delta += 2.0 * std::f64::consts::PI;
                }
                while delta > std::f64::consts::PI {
                    delta -= 2.0 * std::f64::consts::PI;
                }
                delta
            })
            .sum();
        if (winding - 2.0 * std::f64::consts::PI).abs() > 1e-6 {
            return Err(GeomError::InvalidGeometry(format!(
                "polygon winds around more than once: {:?}",
                pts
            )));
        }

        Ok(ConvexPolygon { pts })
    }

    /// The footprint of a car-like robot, with the rear axle at the origin and facing +x.
    pub fn rectangle_footprint(length: f64, width: f64, rear_dist: f64) -> Result<ConvexPolygon> {
        let finite = length.is_finite() && width.is_finite();
        if !(finite && length > 0.0 && width > 0.0 && rear_dist >= 0.0 && rear_dist < length) {
            return Err(GeomError::InvalidGeometry(format!(
                "bad footprint: length {}, width {}, rear_dist {}",
                length, width, rear_dist
            )));
        }
        let front = length - rear_dist;
        let half = width / 2.0;
        ConvexPolygon::new(vec![
            Pt2D::new(front, half),
            Pt2D::new(-rear_dist, half),
            Pt2D::new(-rear_dist, -half),
            Pt2D::new(front, -half),
        ])
    }

    pub fn points(&self) -> &Vec<Pt2D> {
        &self.pts
    }

    /// The average of the vertices.
    pub fn center(&self) -> Pt2D {
        let n = self.pts.len() as f64;
        Pt2D::new(
            self.pts.iter().map(|pt| pt.x()).sum::<f64>() / n,
            self.pts.iter().map(|pt| pt.y()).sum::<f64>() / n,
        )
    }

    pub fn area(&self) -> f64 {
        let n = self.pts.len();
        (0..n)
            .map(|i| {
                let (a, b) = (self.pts[i], self.pts[(i + 1) % n]);
                a.x() * b.y() - b.x() * a.y()
            })
            .sum::<f64>()
            / 2.0
    }

    pub fn translate(&self, dx: f64, dy: f64) -> ConvexPolygon {
        ConvexPolygon {
            pts: self.pts.iter().map(|pt| pt.offset(dx, dy)).collect(),
        }
    }

    /// Rotates counter-clockwise around the origin. Orientation and convexity survive.
    pub fn rotate(&self, radians: f64) -> ConvexPolygon {
        ConvexPolygon {
            pts: self.pts.iter().map(|pt| pt.rotate(radians)).collect(),
        }
    }

    /// Places a footprint defined in the robot's frame at a pose in the world.
    pub fn placed(&self, x: f64, y: f64, heading: f64) -> ConvexPolygon {
        self.rotate(heading).translate(x, y)
    }
}

impl ConvexRegion for ConvexPolygon {
    fn halfspace_representation(&self) -> Halfspaces {
        let n = self.pts.len();
        Halfspaces::new(
            (0..n)
                .map(|i| {
                    let (p, q) = (self.pts[i], self.pts[(i + 1) % n]);
                    // Counter-clockwise, so the interior is to the left and this points out.
                    // Unit length, so feasibility tolerances mean the same thing on every edge.
                    let len = (q.x() - p.x()).hypot(q.y() - p.y());
                    let (nx, ny) = ((q.y() - p.y()) / len, (p.x() - q.x()) / len);
                    Halfspace::new(nx, ny, nx * p.x() + ny * p.y())
                })
                .collect(),
        )
    }
}

impl fmt::Display for ConvexPolygon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "ConvexPolygon::new(vec![")?;
        for pt in &self.pts {
            writeln!(f, "  Pt2D::new({}, {}),", pt.x(), pt.y())?;
        }
        write!(f, "])")
    }
}

/// The closed set of shapes that scenarios can describe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum Region {
    Rectangle(Rectangle),
    Polygon(ConvexPolygon),
}

impl ConvexRegion for Region {
    fn halfspace_representation(&self) -> Halfspaces {
        match self {
            Region::Rectangle(r) => r.halfspace_representation(),
            Region::Polygon(p) => p.halfspace_representation(),
        }
    }
}

impl From<Rectangle> for Region {
    fn from(r: Rectangle) -> Region {
        Region::Rectangle(r)
    }
}

impl From<ConvexPolygon> for Region {
    fn from(p: ConvexPolygon) -> Region {
        Region::Polygon(p)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Region::Rectangle(r) => write!(f, "{}", r),
            Region::Polygon(p) => write!(f, "{}", p),
        }
    }
}

/// Positive for a left turn a -> b -> c.
fn turn(a: Pt2D, b: Pt2D, c: Pt2D) -> f64 {
    (b.x() - a.x()) * (c.y() - b.y()) - (b.y() - a.y()) * (c.x() - b.x())
}
