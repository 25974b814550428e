use std::f64::consts::FRAC_PI_2;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    clearances_from_point, clearances_from_region, ConvexPolygon, Distance, DistanceResult,
    Pt2D, Rectangle, Region, SolverSettings,
};

/// A world full of static obstacles for a robot to move through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start: Pt2D,
    /// Radians, counter-clockwise from +x
    pub start_heading: f64,
    pub goal: Pt2D,
    /// The bottom-left and top-right corners of the planning grid
    pub bounds: (Pt2D, Pt2D),
    pub cell_size: f64,
    pub obstacles: Vec<Region>,
}

impl Scenario {
    pub fn builtin_names() -> Vec<&'static str> {
        vec!["maze", "s_path"]
    }

    pub fn builtin(name: &str) -> Option<Result<Scenario>> {
        match name {
            "maze" => Some(Scenario::maze()),
            "s_path" => Some(Scenario::s_path()),
            _ => None,
        }
    }

    /// A narrow maze, 13 cells wide and 6 tall, walled in on every side.
    pub fn maze() -> Result<Scenario> {
        let s = 0.2;
        grid_world(
            "maze",
            s,
            (0.5, 5.5, -FRAC_PI_2),
            (12.5, 0.5),
            ((0.0, 0.0), (13.0, 6.0)),
            0.25,
            &[
                [0.0, 3.0, 0.0, 3.0],
                [1.0, 2.0, 4.0, 6.0],
                [2.0, 6.0, 5.0, 6.0],
                [6.0, 7.0, 4.0, 6.0],
                [4.0, 5.0, 0.0, 4.0],
                [5.0, 7.0, 2.0, 3.0],
                [6.0, 9.0, 1.0, 2.0],
                [8.0, 9.0, 2.0, 4.0],
                [9.0, 12.0, 3.0, 4.0],
                [11.0, 12.0, 4.0, 5.0],
                [8.0, 10.0, 5.0, 6.0],
                [10.0, 11.0, 0.0, 2.0],
                [12.0, 13.0, 1.0, 2.0],
                [0.0, 13.0, 6.0, 7.0],
                [-1.0, 0.0, 0.0, 6.0],
                [0.0, 13.0, -1.0, 0.0],
                [13.0, 14.0, 0.0, 6.0],
            ],
        )
    }

    /// Three blocks forcing an S-shaped path from the bottom-left to the top-right.
    pub fn s_path() -> Result<Scenario> {
        grid_world(
            "s_path",
            1.0,
            (0.0, 0.2, 0.0),
            (1.0, 0.8),
            ((-0.2, 0.0), (1.2, 1.2)),
            0.05,
            &[
                [0.0, 1.0, 0.9, 1.0],
                [0.0, 0.4, 0.4, 1.0],
                [0.6, 1.0, 0.0, 0.7],
            ],
        )
    }

    /// Either the name of a builtin scenario, or a path to a JSON file.
    pub fn load_or_builtin(name_or_path: &str) -> Result<Scenario> {
        match Scenario::builtin(name_or_path) {
            Some(scenario) => scenario,
            None => Scenario::load(name_or_path),
        }
    }

    pub fn load(path: &str) -> Result<Scenario> {
        let raw = fs_err::read_to_string(path)?;
        let scenario: Scenario =
            serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path))?;
        info!(
            "Loaded scenario {} with {} obstacles from {}",
            scenario.name,
            scenario.obstacles.len(),
            path
        );
        Ok(scenario)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        fs_err::write(path, self.to_json()?)?;
        info!("Wrote {}", path);
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Distance from a point to every obstacle, in order.
    pub fn clearances_from_point(
        &self,
        pt: Pt2D,
        settings: &SolverSettings,
    ) -> Result<Vec<DistanceResult>> {
        Ok(clearances_from_point(pt, &self.obstacles, settings)?)
    }

    /// Distance from a footprint, placed at a pose, to every obstacle, in order.
    pub fn clearances_from_footprint(
        &self,
        footprint: &ConvexPolygon,
        pose: (f64, f64, f64),
        settings: &SolverSettings,
    ) -> Result<Vec<DistanceResult>> {
        let placed = footprint.placed(pose.0, pose.1, pose.2);
        Ok(clearances_from_region(&placed, &self.obstacles, settings)?)
    }

    /// True if the point doesn't touch any obstacle.
    pub fn is_free(&self, pt: Pt2D, settings: &SolverSettings) -> Result<bool> {
        Ok(self
            .clearances_from_point(pt, settings)?
            .into_iter()
            .all(|r| r.distance > Distance::ZERO))
    }
}

fn grid_world(
    name: &str,
    scale: f64,
    start: (f64, f64, f64),
    goal: (f64, f64),
    bounds: ((f64, f64), (f64, f64)),
    cell_size: f64,
    rectangles: &[[f64; 4]],
) -> Result<Scenario> {
    let obstacles = rectangles
        .iter()
        .map(|[left, right, down, up]| {
            Rectangle::new(left * scale, right * scale, down * scale, up * scale).map(Region::from)
        })
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(Scenario {
        name: name.to_string(),
        start: Pt2D::new(start.0 * scale, start.1 * scale),
        start_heading: start.2,
        goal: Pt2D::new(goal.0 * scale, goal.1 * scale),
        bounds: (
            Pt2D::new((bounds.0).0 * scale, (bounds.0).1 * scale),
            Pt2D::new((bounds.1).0 * scale, (bounds.1).1 * scale),
        ),
        cell_size: cell_size * scale,
        obstacles,
    })
}
