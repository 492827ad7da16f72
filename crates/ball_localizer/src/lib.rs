//! # ball_localizer ⚽
//!
//! ball_localizer turns noisy, robot-relative ball detections into a stable set of tracked balls.
//!
//! Every frame the [`BallLocalizer`] receives the pose of the robot and the detections it made,
//! given as an angle and a distance. Each detection is converted to field coordinates and either
//! attached to the nearest existing track or used to spawn a new one. Tracks that were not seen
//! are moved ahead by dead reckoning, slowed down by drag and bounced off the walls. Finally any
//! track that left the field, went unseen for too long, moves implausibly fast or ended up in a
//! goal is dropped.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ball_localizer::prelude::*;
//!
//! let config = BallLocalizerConfig::default();
//! let clock = Arc::new(ManualClock::new());
//! let environment = Environment::from_config(&config).with_clock(clock.clone());
//! let mut localizer = BallLocalizer::new(config, environment);
//!
//! let pose = RobotPose::new(0.0, 0.0, 0.0);
//! localizer.update(&pose, &[BallDetection::new(0.0, 1.0)], 0.02);
//!
//! clock.advance_secs(0.02);
//! localizer.update(&pose, &[BallDetection::new(0.0, 1.01)], 0.02);
//!
//! assert_eq!(localizer.len(), 1);
//! ```
//!
//! ## Time and the environment
//!
//! The localizer never reads global state. The clock, the field walls and the goal predicates are
//! passed in through an [`Environment`], which makes the whole engine deterministic when driven
//! by a [`clock::ManualClock`].
//!
//! ## Bevy
//!
//! With the `bevy` feature enabled, [`BallLocalizer`] and [`config::BallLocalizerConfig`] are
//! bevy resources, so they can be inserted into a `World` and driven from a system. Run
//! `cargo test -p ball_localizer --features bevy` to include the resource tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod field;
pub mod localizer;
pub mod pose;
pub mod track;

pub use error::{Error, Result};
pub use localizer::{BallLocalizer, Environment, PurgeReason, TrackSnapshot};

/// The ball_localizer prelude conveniently includes the types needed to set up and drive a
/// localizer.
pub mod prelude {
    pub use crate::{
        BallLocalizer, Environment, PurgeReason, TrackSnapshot,
        clock::{Clock, ManualClock, SystemClock},
        config::{BallLocalizerConfig, Config},
        field::{Boundary, FieldBounds, FieldGoals, GoalRegions, NoGoals},
        pose::{BallDetection, RobotPose},
        track::{BallTrack, TrackId, TrackState},
    };
}
