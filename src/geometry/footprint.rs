//! Robot footprint and clearance queries

use super::polygon;
use crate::error::{NavError, Result};
use nalgebra::{Isometry2, Point2};
use serde::{Deserialize, Serialize};

/// Collision boundary of the robot in its local frame
#[derive(Debug, Clone, PartialEq)]
pub enum FootprintShape {
    /// Closed polygon, vertices in order
    Polygon(Vec<Point2<f64>>),
    /// Disc centered on the robot origin
    Circle { radius: f64 },
}

/// A rigid robot footprint
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    shape: FootprintShape,
    bounding_radius: f64,
}

impl Footprint {
    /// Build a polygonal footprint from (x, y) pairs
    pub fn polygon(points: &[(f64, f64)]) -> Result<Self> {
        Self::from_points(points.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    /// Build a polygonal footprint, rejecting degenerate or self-intersecting shapes
    pub fn from_points(vertices: Vec<Point2<f64>>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(NavError::InfeasibleConfiguration(format!(
                "footprint polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(NavError::InfeasibleConfiguration(
                "footprint polygon has non-finite vertices".to_string(),
            ));
        }
        if polygon::signed_area(&vertices).abs() < 1e-9 {
            return Err(NavError::InfeasibleConfiguration(
                "footprint polygon has zero area".to_string(),
            ));
        }
        if !polygon::is_simple(&vertices) {
            return Err(NavError::InfeasibleConfiguration(
                "footprint polygon is self-intersecting".to_string(),
            ));
        }

        let bounding_radius = vertices
            .iter()
            .map(|p| p.coords.norm())
            .fold(0.0, f64::max);

        Ok(Footprint {
            shape: FootprintShape::Polygon(vertices),
            bounding_radius,
        })
    }

    /// Build a circular footprint
    pub fn circle(radius: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(NavError::InfeasibleConfiguration(format!(
                "footprint radius must be positive, got {}",
                radius
            )));
        }
        Ok(Footprint {
            shape: FootprintShape::Circle { radius },
            bounding_radius: radius,
        })
    }

    pub fn shape(&self) -> &FootprintShape {
        &self.shape
    }

    /// Radius of the smallest origin-centered disc enclosing the footprint
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Distance from a point in the robot frame to the footprint (0 when inside)
    pub fn distance_to_local_point(&self, p: &Point2<f64>) -> f64 {
        match &self.shape {
            FootprintShape::Circle { radius } => (p.coords.norm() - radius).max(0.0),
            FootprintShape::Polygon(vertices) => {
                if polygon::contains_point(vertices, p) {
                    return 0.0;
                }
                let n = vertices.len();
                (0..n)
                    .map(|i| polygon::point_segment_distance(p, &vertices[i], &vertices[(i + 1) % n]))
                    .fold(f64::INFINITY, f64::min)
            }
        }
    }

    /// Minimum distance from the footprint, posed at `pose`, to any obstacle point
    ///
    /// Returns `f64::INFINITY` when there are no obstacles.
    pub fn clearance(&self, pose: &Isometry2<f64>, obstacles: &[Point2<f64>]) -> f64 {
        let mut min_clearance = f64::INFINITY;
        for point in obstacles {
            let local = pose.inverse_transform_point(point);
            // Skip exact distance for points that cannot beat the current minimum
            if local.coords.norm() - self.bounding_radius >= min_clearance {
                continue;
            }
            let d = self.distance_to_local_point(&local);
            if d < min_clearance {
                min_clearance = d;
                if d == 0.0 {
                    break;
                }
            }
        }
        min_clearance
    }

    /// Whether the posed footprint is closer than `margin` to any obstacle
    pub fn collides(&self, pose: &Isometry2<f64>, obstacles: &[Point2<f64>], margin: f64) -> bool {
        self.clearance(pose, obstacles) < margin
    }
}

/// Footprint as received from a shape source, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintUpdate {
    Polygon(Vec<[f64; 2]>),
    Circle { radius: f64 },
}

impl FootprintUpdate {
    pub fn build(&self) -> Result<Footprint> {
        match self {
            FootprintUpdate::Polygon(points) => {
                Footprint::from_points(points.iter().map(|p| Point2::new(p[0], p[1])).collect())
            }
            FootprintUpdate::Circle { radius } => Footprint::circle(*radius),
        }
    }
}
