//! Expected-goals scoring.
//!
//! The pipeline only depends on [`ShotScorer`]; [`LogisticXg`] is the bundled
//! implementation, a logistic regression over shot distance and the visible
//! angle of the goal mouth.

use crate::domain::{Location, PITCH_LENGTH, PITCH_WIDTH};

/// Goal centre on the attacking goal line.
pub const GOAL_CENTER: (f64, f64) = (PITCH_LENGTH, PITCH_WIDTH / 2.0);
/// Goal mouth width (yards).
pub const GOAL_WIDTH: f64 = 8.0;

/// Distance and visible goal angle for a shot location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotGeometry {
    pub distance: f64,
    /// Angle subtended by the two posts, in radians.
    pub angle: f64,
}

impl ShotGeometry {
    pub fn from_location(x: f64, y: f64) -> Self {
        let (gx, gy) = GOAL_CENTER;
        let distance = ((gx - x).powi(2) + (gy - y).powi(2)).sqrt();

        let half = GOAL_WIDTH / 2.0;
        let d1 = ((gx - x).powi(2) + (gy - half - y).powi(2)).sqrt();
        let d2 = ((gx - x).powi(2) + (gy + half - y).powi(2)).sqrt();

        // Law of cosines over the triangle (shot, near post, far post).
        let denom = 2.0 * d1 * d2;
        let angle = if denom == 0.0 {
            0.0
        } else {
            let cos_theta = (d1 * d1 + d2 * d2 - GOAL_WIDTH * GOAL_WIDTH) / denom;
            cos_theta.clamp(-1.0, 1.0).acos()
        };

        Self { distance, angle }
    }
}

/// Pure scoring function: location in, probability in `[0, 1]` out.
pub trait ShotScorer: Send + Sync {
    fn score(&self, location: &Location) -> f64;

    fn geometry(&self, location: &Location) -> ShotGeometry {
        ShotGeometry::from_location(location.x, location.y)
    }
}

/// Logistic xG model: `p = 1 / (1 + exp(-(b0 + b1*distance + b2*angle)))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticXg {
    pub intercept: f64,
    pub distance_coef: f64,
    pub angle_coef: f64,
}

impl Default for LogisticXg {
    /// Close-range central shots score near 1, shots from the halfway line near 0.
    fn default() -> Self {
        Self {
            intercept: 1.0,
            distance_coef: -0.25,
            angle_coef: 1.5,
        }
    }
}

impl ShotScorer for LogisticXg {
    fn score(&self, location: &Location) -> f64 {
        let g = self.geometry(location);
        let z = self.intercept + self.distance_coef * g.distance + self.angle_coef * g.angle;
        let p = 1.0 / (1.0 + (-z).exp());
        if p.is_nan() {
            0.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }
}
