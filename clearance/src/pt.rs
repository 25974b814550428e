use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{Distance, GeomError, Result};

/// A point in the plane, in meters. Always finite.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }

        Pt2D { x, y }
    }

    /// Like `new`, but for untrusted input.
    pub fn checked(x: f64, y: f64) -> Result<Pt2D> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeomError::InvalidGeometry(format!(
                "point ({}, {}) isn't finite",
                x, y
            )));
        }
        Ok(Pt2D { x, y })
    }

    pub fn zero() -> Pt2D {
        Pt2D::new(0.0, 0.0)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    pub fn dist_to(self, to: Pt2D) -> Distance {
        Distance::meters(((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt())
    }

    /// Rotates counter-clockwise around the origin.
    pub fn rotate(self, radians: f64) -> Pt2D {
        let (sin, cos) = radians.sin_cos();
        Pt2D::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// The average of some points. `None` if there aren't any.
    pub fn center(pts: &[Pt2D]) -> Option<Pt2D> {
        if pts.is_empty() {
            return None;
        }
        let n = pts.len() as f64;
        let (x, y) = pts
            .iter()
            .fold((0.0, 0.0), |(x, y), pt| (x + pt.x, y + pt.y));
        Some(Pt2D::new(x / n, y / n))
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn from_vector(v: &Vector2<f64>) -> Pt2D {
        Pt2D::new(v.x, v.y)
    }

    pub fn approx_eq(self, other: Pt2D, threshold: f64) -> bool {
        self.dist_to(other).inner_meters() <= threshold
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({0}, {1})", self.x, self.y)
    }
}
