use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    ConvexRegion, Distance, GeomError, Halfspaces, Pt2D, QuadraticProgram, Result, SolverSettings,
};

/// The answer to a distance query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    /// Never negative. Zero iff the two sets touch or overlap.
    pub distance: Distance,
    /// The closest point in the first argument. For point queries, that's just the point.
    pub closest_a: Pt2D,
    /// The closest point in the second argument.
    pub closest_b: Pt2D,
    /// Solver iterations spent. Zero when the answer was obvious without solving anything.
    pub iterations: usize,
}

impl DistanceResult {
    fn touching(pt: Pt2D) -> DistanceResult {
        DistanceResult {
            distance: Distance::ZERO,
            closest_a: pt,
            closest_b: pt,
            iterations: 0,
        }
    }

    fn between(closest_a: Pt2D, closest_b: Pt2D, iterations: usize) -> DistanceResult {
        DistanceResult {
            distance: closest_a.dist_to(closest_b),
            closest_a,
            closest_b,
            iterations,
        }
    }
}

/// Projects `point` onto `region`, solving `min |p - x|² s.t. A x <= b`. Unbounded regions are
/// fine here, since the projection onto a nonempty closed convex set always exists.
pub fn distance_point_to_region<R: ConvexRegion + ?Sized>(
    point: Pt2D,
    region: &R,
    settings: &SolverSettings,
) -> Result<DistanceResult> {
    settings.validate()?;
    let halfspaces = region.halfspace_representation();
    let witness = feasible_point(&halfspaces, "region")?;
    if halfspaces.contains(point) {
        return Ok(DistanceResult::touching(point));
    }

    // Move the origin to the point, so the objective is just ½ |z|².
    let (a, b) = halfspaces.matrix();
    let h = b - &a * to_dvector(&[point]);
    let qp = QuadraticProgram::new(DMatrix::identity(2, 2), DVector::zeros(2), a, h)?;
    let solution = qp.solve(settings, Some(&to_dvector(&[offset_from(witness, point)])))?;

    // The solver only gets within its tolerance of the optimal face, which in squared distance
    // leaves the square root of that in the distance itself. Snap to the exact face or vertex.
    let closest = halfspaces
        .project(point)
        .unwrap_or_else(|| point.offset(solution.z[0], solution.z[1]));
    Ok(DistanceResult::between(point, closest, solution.iterations))
}

pub fn distance_point_to_region_default<R: ConvexRegion + ?Sized>(
    point: Pt2D,
    region: &R,
) -> Result<DistanceResult> {
    distance_point_to_region(point, region, &SolverSettings::default())
}

/// Solves `min |x1 - x2|² s.t. A1 x1 <= b1, A2 x2 <= b2`. Both regions must be bounded.
pub fn distance_region_to_region<A: ConvexRegion + ?Sized, B: ConvexRegion + ?Sized>(
    region_a: &A,
    region_b: &B,
    settings: &SolverSettings,
) -> Result<DistanceResult> {
    settings.validate()?;
    let hs_a = region_a.halfspace_representation();
    let hs_b = region_b.halfspace_representation();
    let witness_a = feasible_point(&hs_a, "first region")?;
    let witness_b = feasible_point(&hs_b, "second region")?;
    for (hs, which) in [(&hs_a, "first region"), (&hs_b, "second region")] {
        if !hs.is_bounded() {
            return Err(GeomError::UnboundedRegion(format!(
                "{} must be bounded for a region-to-region query: {}",
                which, hs
            )));
        }
    }
    // Touching or overlapping, including along a shared edge or corner
    if let Some(pt) = hs_a.intersect(&hs_b).feasible_point() {
        return Ok(DistanceResult::touching(pt));
    }

    // Center both regions around a common origin to keep the numbers small.
    let origin = Pt2D::new(
        (witness_a.x() + witness_b.x()) / 2.0,
        (witness_a.y() + witness_b.y()) / 2.0,
    );
    let (a1, b1) = hs_a.matrix();
    let (a2, b2) = hs_b.matrix();
    let (m1, m2) = (a1.nrows(), a2.nrows());
    let o = to_dvector(&[origin]);
    let h1 = b1 - &a1 * &o;
    let h2 = b2 - &a2 * &o;

    // z = [x1, x2]
    let mut g = DMatrix::<f64>::zeros(m1 + m2, 4);
    g.view_mut((0, 0), (m1, 2)).copy_from(&a1);
    g.view_mut((m1, 2), (m2, 2)).copy_from(&a2);
    let h = DVector::from_iterator(m1 + m2, h1.iter().chain(h2.iter()).cloned());
    let identity = DMatrix::<f64>::identity(2, 2);
    let mut q = DMatrix::<f64>::zeros(4, 4);
    q.view_mut((0, 0), (2, 2)).copy_from(&identity);
    q.view_mut((2, 2), (2, 2)).copy_from(&identity);
    q.view_mut((0, 2), (2, 2)).copy_from(&(-&identity));
    q.view_mut((2, 0), (2, 2)).copy_from(&(-&identity));

    let qp = QuadraticProgram::new(q, DVector::zeros(4), g, h)?;
    let warm_start = to_dvector(&[
        offset_from(witness_a, origin),
        offset_from(witness_b, origin),
    ]);
    let solution = qp.solve(settings, Some(&warm_start))?;

    let z = &solution.z;
    let (closest_a, closest_b) = closest_pair(&hs_a, &hs_b)
        .unwrap_or_else(|| (origin.offset(z[0], z[1]), origin.offset(z[2], z[3])));
    Ok(DistanceResult::between(
        closest_a,
        closest_b,
        solution.iterations,
    ))
}

/// Distance from one point to each obstacle, in the same order. Each query is independent, so
/// they run in parallel.
pub fn clearances_from_point<R: ConvexRegion>(
    point: Pt2D,
    obstacles: &[R],
    settings: &SolverSettings,
) -> Result<Vec<DistanceResult>> {
    obstacles
        .par_iter()
        .map(|obs| distance_point_to_region(point, obs, settings))
        .collect()
}

/// Distance from one region (usually a placed footprint) to each obstacle, in the same order.
pub fn clearances_from_region<A: ConvexRegion + ?Sized, R: ConvexRegion>(
    region: &A,
    obstacles: &[R],
    settings: &SolverSettings,
) -> Result<Vec<DistanceResult>> {
    obstacles
        .par_iter()
        .map(|obs| distance_region_to_region(region, obs, settings))
        .collect()
}

/// The index and result of the nearest obstacle.
pub fn min_clearance(results: &[DistanceResult]) -> Option<(usize, &DistanceResult)> {
    results.iter().enumerate().min_by_key(|(_, r)| r.distance)
}

/// Runs a query, and if the solver diverges, tries once more with relaxed settings. Any other
/// error, or a second divergence, is returned as is.
pub fn retry_once<T, F: Fn(&SolverSettings) -> Result<T>>(
    settings: &SolverSettings,
    query: F,
) -> Result<T> {
    match query(settings) {
        Err(err) if err.is_transient() => {
            warn!("{}; retrying once with relaxed settings", err);
            query(&settings.relaxed())
        }
        x => x,
    }
}

fn feasible_point(halfspaces: &Halfspaces, which: &str) -> Result<Pt2D> {
    halfspaces.validate()?;
    halfspaces.feasible_point().ok_or_else(|| {
        GeomError::InfeasibleRegion(format!("no point satisfies the {}: {}", which, halfspaces))
    })
}

// Two disjoint convex polygons are always closest at a vertex of one of them, so projecting
// every vertex onto the other region finds the exact pair.
fn closest_pair(hs_a: &Halfspaces, hs_b: &Halfspaces) -> Option<(Pt2D, Pt2D)> {
    let a_to_b = hs_a
        .vertices()
        .into_iter()
        .filter_map(|v| Some((v, hs_b.project(v)?)));
    let b_to_a = hs_b
        .vertices()
        .into_iter()
        .filter_map(|v| Some((hs_a.project(v)?, v)));
    a_to_b.chain(b_to_a).min_by_key(|(a, b)| a.dist_to(*b))
}

fn offset_from(pt: Pt2D, origin: Pt2D) -> Pt2D {
    Pt2D::new(pt.x() - origin.x(), pt.y() - origin.y())
}

fn to_dvector(pts: &[Pt2D]) -> DVector<f64> {
    DVector::from_iterator(2 * pts.len(), pts.iter().flat_map(|pt| [pt.x(), pt.y()]))
}
