use std::fmt;

use nalgebra::{DMatrix, DVector, Vector2};

use crate::{GeomError, Pt2D, Result};

/// Slack allowed when checking `a · x <= b`, relative to the size of the row.
pub const EPSILON_FEASIBLE: f64 = 1e-9;
// Two normals closer to parallel than this (relative to their lengths) don't define a vertex.
const EPSILON_PARALLEL: f64 = 1e-12;

/// One closed halfspace `a · x <= b`. The normal doesn't need to be unit length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Halfspace {
    pub a: Vector2<f64>,
    pub b: f64,
}

impl Halfspace {
    pub fn new(ax: f64, ay: f64, b: f64) -> Halfspace {
        Halfspace {
            a: Vector2::new(ax, ay),
            b,
        }
    }

    /// How much `pt` violates this halfspace; negative when strictly inside.
    pub fn violation(&self, pt: Pt2D) -> f64 {
        self.a.dot(&pt.to_vector()) - self.b
    }

    pub fn contains(&self, pt: Pt2D) -> bool {
        self.violation(pt) <= self.tolerance()
    }

    fn tolerance(&self) -> f64 {
        EPSILON_FEASIBLE * (self.a.norm() + self.b.abs()).max(1.0)
    }

    /// A zero normal turns the row into the constant constraint `0 <= b`.
    fn is_degenerate(&self) -> bool {
        self.a.norm() <= EPSILON_FEASIBLE
    }

    fn is_parallel(&self, other: &Halfspace) -> bool {
        cross(&self.a, &other.a).abs() <= EPSILON_PARALLEL * self.a.norm() * other.a.norm()
    }

    fn is_finite(&self) -> bool {
        self.a.x.is_finite() && self.a.y.is_finite() && self.b.is_finite()
    }

    /// The closest point to `pt` on the boundary line. Only meaningful for a nonzero normal.
    fn foot(&self, pt: Pt2D) -> Option<Pt2D> {
        let scale = self.violation(pt) / self.a.norm_squared();
        Pt2D::checked(pt.x() - scale * self.a.x, pt.y() - scale * self.a.y).ok()
    }

    /// Where the two boundary lines cross, if they aren't parallel.
    fn intersection(&self, other: &Halfspace) -> Option<Pt2D> {
        if self.is_parallel(other) {
            return None;
        }
        let det = cross(&self.a, &other.a);
        let x = (self.b * other.a.y - self.a.y * other.b) / det;
        let y = (self.a.x * other.b - self.b * other.a.x) / det;
        Pt2D::checked(x, y).ok()
    }
}

/// The halfspace representation `(A, b)` of a convex region `{x : A x <= b}`, one row per
/// supporting halfspace.
#[derive(Clone, Debug, PartialEq)]
pub struct Halfspaces {
    rows: Vec<Halfspace>,
}

impl Halfspaces {
    pub fn new(rows: Vec<Halfspace>) -> Halfspaces {
        Halfspaces { rows }
    }

    /// Builds from a dense `(m, 2)` matrix and a length `m` vector.
    pub fn from_matrix(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<Halfspaces> {
        if a.ncols() != 2 {
            return Err(GeomError::InvalidGeometry(format!(
                "halfspace matrix must have 2 columns, not {}",
                a.ncols()
            )));
        }
        if a.nrows() != b.len() {
            return Err(GeomError::InvalidGeometry(format!(
                "halfspace matrix has {} rows, but the offset vector has {}",
                a.nrows(),
                b.len()
            )));
        }
        let halfspaces = Halfspaces {
            rows: (0..a.nrows())
                .map(|i| Halfspace::new(a[(i, 0)], a[(i, 1)], b[i]))
                .collect(),
        };
        halfspaces.validate()?;
        Ok(halfspaces)
    }

    /// Every coefficient must be finite. `new` doesn't check this, so anything built from
    /// untrusted numbers should go through here before being used.
    pub fn validate(&self) -> Result<()> {
        if let Some(row) = self.rows.iter().find(|row| !row.is_finite()) {
            return Err(GeomError::InvalidGeometry(format!(
                "halfspace {} x + {} y <= {} isn't finite",
                row.a.x, row.a.y, row.b
            )));
        }
        Ok(())
    }

    pub fn rows(&self) -> &[Halfspace] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns `(A, b)` as dense matrices.
    pub fn matrix(&self) -> (DMatrix<f64>, DVector<f64>) {
        let a = DMatrix::from_fn(self.rows.len(), 2, |i, j| self.rows[i].a[j]);
        let b = DVector::from_iterator(self.rows.len(), self.rows.iter().map(|row| row.b));
        (a, b)
    }

    pub fn contains(&self, pt: Pt2D) -> bool {
        self.rows.iter().all(|row| row.contains(pt))
    }

    /// Finds some point satisfying every row, or `None` if the system is empty.
    ///
    /// A nonempty region whose normals span the plane has a vertex, so it's enough to try every
    /// pairwise intersection of boundary lines. The feasible vertices are averaged, which lands
    /// somewhere away from the boundary when possible. If all normals are parallel, the region is
    /// a strip or a halfplane and the problem reduces to intersecting intervals along the normal.
    pub fn feasible_point(&self) -> Option<Pt2D> {
        let mut active = Vec::new();
        for row in &self.rows {
            if row.is_degenerate() {
                if row.b < -row.tolerance() {
                    return None;
                }
            } else {
                active.push(row);
            }
        }
        if active.is_empty() {
            return Some(Pt2D::zero());
        }

        if let Some(center) = Pt2D::center(&self.vertices()) {
            return Some(center);
        }
        if spans_plane(&active) {
            return None;
        }

        // Every normal is a multiple of u. Each row bounds t = u · x from one side.
        let u = active[0].a.normalize();
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for row in &active {
            let k = row.a.dot(&u);
            if k > 0.0 {
                hi = hi.min(row.b / k);
            } else {
                lo = lo.max(row.b / k);
            }
        }
        if lo > hi + EPSILON_FEASIBLE * hi.abs().max(1.0) {
            return None;
        }
        // active[0] always bounds from above
        let t = if lo.is_finite() { (lo + hi) / 2.0 } else { hi };
        Pt2D::checked(u.x * t, u.y * t).ok()
    }

    /// Every point where two boundary lines cross and all rows hold. Bounded regions list each
    /// corner at least once; strips and halfplanes have none.
    pub fn vertices(&self) -> Vec<Pt2D> {
        let active: Vec<&Halfspace> = self.rows.iter().filter(|r| !r.is_degenerate()).collect();
        let mut vertices = Vec::new();
        for (idx, r1) in active.iter().enumerate() {
            for r2 in &active[idx + 1..] {
                if let Some(pt) = r1.intersection(r2) {
                    if self.contains(pt) {
                        vertices.push(pt);
                    }
                }
            }
        }
        vertices
    }

    /// The closest point of the region to `pt`, or `None` if the region is empty.
    ///
    /// The projection onto a polygon lies either on the relative interior of one face, where it
    /// is the foot of the perpendicular to that face's line, or on a vertex. Checking every foot
    /// that lands in the region and every vertex is exact.
    pub fn project(&self, pt: Pt2D) -> Option<Pt2D> {
        if self.contains(pt) {
            return Some(pt);
        }
        self.rows
            .iter()
            .filter(|row| !row.is_degenerate())
            .filter_map(|row| row.foot(pt))
            .filter(|foot| self.contains(*foot))
            .chain(self.vertices())
            .min_by_key(|candidate| candidate.dist_to(pt))
    }

    /// True if the normals span the plane and no direction `d` satisfies `A d <= 0`. The empty
    /// system and every halfplane or strip are unbounded.
    pub fn is_bounded(&self) -> bool {
        let active: Vec<&Halfspace> = self.rows.iter().filter(|r| !r.is_degenerate()).collect();
        if !spans_plane(&active) {
            return false;
        }

        // An extreme ray of the recession cone lies along some boundary line.
        for row in &active {
            let along = Vector2::new(-row.a.y, row.a.x);
            for dir in [along, -along] {
                if active.iter().all(|r| {
                    r.a.dot(&dir) <= EPSILON_PARALLEL * r.a.norm() * dir.norm()
                }) {
                    return false;
                }
            }
        }
        true
    }

    /// Both systems at once: the intersection of the two regions.
    pub fn intersect(&self, other: &Halfspaces) -> Halfspaces {
        Halfspaces {
            rows: self.rows.iter().chain(other.rows.iter()).cloned().collect(),
        }
    }
}

impl fmt::Display for Halfspaces {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Halfspaces(")?;
        for row in &self.rows {
            writeln!(f, "  {} x + {} y <= {}", row.a.x, row.a.y, row.b)?;
        }
        write!(f, ")")
    }
}

fn spans_plane(rows: &[&Halfspace]) -> bool {
    rows.iter()
        .enumerate()
        .any(|(idx, r1)| rows[idx + 1..].iter().any(|r2| !r1.is_parallel(r2)))
}

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}
