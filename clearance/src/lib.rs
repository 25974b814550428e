//! Convex regions in the plane, described as intersections of halfspaces, and the distances
//! between them. A planner or controller builds obstacles and footprints once, then asks for
//! point-to-region or region-to-region clearance as often as it likes. Both queries are small
//! convex quadratic programs, solved from scratch on every call, so they're safe to run in
//! parallel.

#[macro_use]
extern crate log;

mod distance;
mod error;
mod halfspace;
mod pt;
mod qp;
mod query;
mod region;
mod scenario;

pub use crate::distance::Distance;
pub use crate::error::{GeomError, Result};
pub use crate::halfspace::{Halfspace, Halfspaces, EPSILON_FEASIBLE};
pub use crate::pt::Pt2D;
pub use crate::qp::{QuadraticProgram, Solution, SolverSettings};
pub use crate::query::{
    clearances_from_point, clearances_from_region, distance_point_to_region,
    distance_point_to_region_default, distance_region_to_region, min_clearance, retry_once,
    DistanceResult,
};
pub use crate::region::{ConvexPolygon, ConvexRegion, Rectangle, Region};
pub use crate::scenario::Scenario;
