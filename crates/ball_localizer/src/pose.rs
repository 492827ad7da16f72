use nalgebra::{Isometry2, Point2, Vector2, point};
use serde::{Deserialize, Serialize};

/// The pose of the robot on the field, as provided by self-localization.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct RobotPose {
    pub inner: Isometry2<f32>,
}

impl RobotPose {
    #[must_use]
    pub fn from_isometry(pose: Isometry2<f32>) -> Self {
        Self { inner: pose }
    }

    #[must_use]
    pub fn from_translation_and_rotation(translation: Vector2<f32>, angle: f32) -> Self {
        Self {
            inner: Isometry2::new(translation, angle),
        }
    }

    #[must_use]
    pub fn new(x: f32, y: f32, orientation: f32) -> Self {
        Self::from_translation_and_rotation(Vector2::new(x, y), orientation)
    }

    /// The current position of the robot in the world, in absolute coordinates.
    #[must_use]
    pub fn world_position(&self) -> Point2<f32> {
        self.inner.translation.vector.into()
    }

    /// The current rotation of the robot in the world, in radians.
    #[must_use]
    pub fn world_rotation(&self) -> f32 {
        self.inner.rotation.angle()
    }

    /// Transform a point from robot coordinates to world coordinates.
    #[must_use]
    pub fn robot_to_world(&self, point: &Point2<f32>) -> Point2<f32> {
        self.inner.transform_point(point)
    }

    /// World position of a ball detection made by this robot.
    #[must_use]
    pub fn detection_to_world(&self, detection: &BallDetection) -> Point2<f32> {
        let angle = self.world_rotation() + detection.angle;

        self.world_position() + detection.distance * Vector2::new(angle.cos(), angle.sin())
    }
}

/// The (x, y, orientation) form used in recorded logs.
#[derive(Serialize, Deserialize)]
struct RawPose {
    x: f32,
    y: f32,
    orientation: f32,
}

impl Serialize for RobotPose {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let position = self.world_position();

        RawPose {
            x: position.x,
            y: position.y,
            orientation: self.world_rotation(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RobotPose {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let RawPose { x, y, orientation } = RawPose::deserialize(deserializer)?;

        Ok(Self::new(x, y, orientation))
    }
}

/// A single ball observation, relative to the robot that made it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallDetection {
    /// Angle in radians, counter-clockwise from the robot's heading.
    pub angle: f32,
    /// Distance from the robot to the ball.
    pub distance: f32,
}

impl BallDetection {
    #[must_use]
    pub fn new(angle: f32, distance: f32) -> Self {
        Self { angle, distance }
    }

    /// The detection as a point in robot coordinates.
    #[must_use]
    pub fn relative_position(&self) -> Point2<f32> {
        point![
            self.distance * self.angle.cos(),
            self.distance * self.angle.sin()
        ]
    }
}
