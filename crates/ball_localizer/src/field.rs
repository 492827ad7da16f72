//! Field geometry the localizer depends on: the playing area and the goals.
//!
//! The localizer only talks to these through the [`Boundary`] and [`GoalRegions`] traits, so game
//! logic can provide its own notion of where the walls and goals are.

use nalgebra::{Point2, Vector2, point};

use crate::{
    config::{BallLocalizerConfig, FieldConfig, GoalConfig},
    track::BallTrack,
};

/// The walls of the playing area.
pub trait Boundary: Send + Sync {
    /// Whether `position` lies outside the playing area shrunk inward by `margin`.
    fn is_outside(&self, position: Point2<f32>, margin: f32) -> bool;

    /// Resolves a ball of `radius` crossing a wall.
    ///
    /// Returns the position clamped to the inside of the wall and the velocity after bouncing off
    /// it, keeping `elasticity` of the speed perpendicular to the wall.
    fn collide_walls(
        &self,
        position: Point2<f32>,
        velocity: Vector2<f32>,
        radius: f32,
        elasticity: f32,
    ) -> (Point2<f32>, Vector2<f32>);
}

/// Predicates telling whether a ball is inside one of the goals.
pub trait GoalRegions: Send + Sync {
    fn in_yellow_goal(&self, track: &BallTrack) -> bool;

    fn in_blue_goal(&self, track: &BallTrack) -> bool;

    /// Whether the ball is inside either goal.
    fn contains(&self, track: &BallTrack) -> bool {
        self.in_yellow_goal(track) || self.in_blue_goal(track)
    }
}

/// A rectangular field centred on the origin, surrounded by walls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub width: f32,
    pub height: f32,
}

impl FieldBounds {
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    fn half_extents(&self) -> Vector2<f32> {
        Vector2::new(self.width, self.height) / 2.0
    }
}

impl From<&FieldConfig> for FieldBounds {
    fn from(config: &FieldConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

impl Boundary for FieldBounds {
    fn is_outside(&self, position: Point2<f32>, margin: f32) -> bool {
        let limit = self.half_extents().add_scalar(-margin);

        // NaN coordinates count as outside
        !((-limit.x..=limit.x).contains(&position.x) && (-limit.y..=limit.y).contains(&position.y))
    }

    fn collide_walls(
        &self,
        mut position: Point2<f32>,
        mut velocity: Vector2<f32>,
        radius: f32,
        elasticity: f32,
    ) -> (Point2<f32>, Vector2<f32>) {
        let limit = self.half_extents().add_scalar(-radius);

        for axis in 0..2 {
            if position[axis] < -limit[axis] {
                position[axis] = -limit[axis];
                if velocity[axis] < 0.0 {
                    velocity[axis] = -velocity[axis] * elasticity;
                }
            } else if position[axis] > limit[axis] {
                position[axis] = limit[axis];
                if velocity[axis] > 0.0 {
                    velocity[axis] = -velocity[axis] * elasticity;
                }
            }
        }

        (position, velocity)
    }
}

/// Axis aligned rectangle, used for the goal areas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point2<f32>,
    pub max: Point2<f32>,
}

impl Rect {
    #[must_use]
    pub fn contains(&self, position: Point2<f32>) -> bool {
        (self.min.x..=self.max.x).contains(&position.x)
            && (self.min.y..=self.max.y).contains(&position.y)
    }
}

/// The two goals behind the short ends of a [`FieldBounds`].
///
/// The yellow goal is behind the line at negative x, the blue goal behind the line at positive x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldGoals {
    pub yellow: Rect,
    pub blue: Rect,
}

impl FieldGoals {
    #[must_use]
    pub fn new(field: &FieldConfig, goal: &GoalConfig) -> Self {
        let line = field.width / 2.0;
        let half_width = goal.width / 2.0;

        Self {
            yellow: Rect {
                min: point![-line - goal.depth, -half_width],
                max: point![-line, half_width],
            },
            blue: Rect {
                min: point![line, -half_width],
                max: point![line + goal.depth, half_width],
            },
        }
    }
}

impl From<&BallLocalizerConfig> for FieldGoals {
    fn from(config: &BallLocalizerConfig) -> Self {
        Self::new(&config.field, &config.goal)
    }
}

impl GoalRegions for FieldGoals {
    fn in_yellow_goal(&self, track: &BallTrack) -> bool {
        self.yellow.contains(track.position())
    }

    fn in_blue_goal(&self, track: &BallTrack) -> bool {
        self.blue.contains(track.position())
    }
}

/// Goal predicates for a field without goals.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGoals;

impl GoalRegions for NoGoals {
    fn in_yellow_goal(&self, _track: &BallTrack) -> bool {
        false
    }

    fn in_blue_goal(&self, _track: &BallTrack) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use approx::assert_abs_diff_eq;
    use nalgebra::vector;

    use super::*;
    use crate::track::{TrackId, TrackParameters};

    fn field() -> FieldBounds {
        FieldBounds::new(4.0, 2.0)
    }

    #[test]
    fn outside_with_margin() {
        let field = field();

        assert!(!field.is_outside(point![0.0, 0.0], 0.1));
        assert!(!field.is_outside(point![1.85, 0.85], 0.1));
        assert!(field.is_outside(point![1.95, 0.0], 0.1));
        assert!(field.is_outside(point![0.0, -0.95], 0.1));
        assert!(field.is_outside(point![-2.5, 0.0], 0.0));
    }

    #[test]
    fn non_finite_position_is_outside() {
        let field = field();

        assert!(field.is_outside(point![f32::NAN, 0.0], 0.1));
        assert!(field.is_outside(point![0.0, f32::NAN], 0.0));
        assert!(field.is_outside(point![f32::INFINITY, 0.0], 0.0));
    }

    #[test]
    fn no_collision_inside() {
        let (position, velocity) =
            field().collide_walls(point![0.5, -0.5], vector![1.0, -2.0], 0.1, 0.5);

        assert_eq!(position, point![0.5, -0.5]);
        assert_eq!(velocity, vector![1.0, -2.0]);
    }

    #[test]
    fn bounce_off_right_wall() {
        let (position, velocity) =
            field().collide_walls(point![2.1, 0.0], vector![3.0, 1.0], 0.1, 0.5);

        assert_abs_diff_eq!(position, point![1.9, 0.0], epsilon = 1e-6);
        assert_abs_diff_eq!(velocity, vector![-1.5, 1.0], epsilon = 1e-6);
    }

    #[test]
    fn bounce_off_corner() {
        let (position, velocity) =
            field().collide_walls(point![-2.3, -1.2], vector![-1.0, -2.0], 0.1, 1.0);

        assert_abs_diff_eq!(position, point![-1.9, -0.9], epsilon = 1e-6);
        assert_abs_diff_eq!(velocity, vector![1.0, 2.0], epsilon = 1e-6);
    }

    #[test]
    fn moving_away_from_wall_keeps_velocity() {
        let (position, velocity) =
            field().collide_walls(point![0.0, 0.95], vector![0.0, -1.0], 0.1, 0.5);

        assert_abs_diff_eq!(position, point![0.0, 0.9], epsilon = 1e-6);
        assert_eq!(velocity, vector![0.0, -1.0]);
    }

    #[test]
    fn goal_regions() {
        let goals = FieldGoals::new(
            &FieldConfig {
                width: 4.0,
                height: 2.0,
            },
            &GoalConfig {
                width: 0.6,
                depth: 0.2,
            },
        );
        let parameters = TrackParameters {
            window: std::num::NonZeroUsize::MIN,
            radius: 0.05,
            elasticity: 0.5,
        };
        let track_at =
            |x: f32, y: f32| BallTrack::new(TrackId(0), point![x, y], Instant::now(), &parameters);

        assert!(goals.in_yellow_goal(&track_at(-2.1, 0.0)));
        assert!(!goals.in_blue_goal(&track_at(-2.1, 0.0)));
        assert!(goals.in_blue_goal(&track_at(2.15, -0.25)));
        assert!(!goals.contains(&track_at(2.1, 0.5)));
        assert!(!goals.contains(&track_at(0.0, 0.0)));
        assert!(!NoGoals.contains(&track_at(-2.1, 0.0)));
    }
}
