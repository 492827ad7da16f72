use std::{
    fmt,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{config::BallLocalizerConfig, field::Boundary};

/// Identifier of a tracked ball, unique for the lifetime of a localizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-capacity ring buffer of raw position measurements.
///
/// Once full, every new sample overwrites the oldest one.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<Point2<f32>>,
    capacity: NonZeroUsize,
    cursor: usize,
}

impl SampleBuffer {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.get()),
            capacity,
            cursor: 0,
        }
    }

    pub fn push(&mut self, sample: Point2<f32>) {
        if self.samples.len() < self.capacity.get() {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
        }

        self.cursor = (self.cursor + 1) % self.capacity.get();
    }

    /// Amount of populated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity.get()
    }

    /// The populated slots, in slot order rather than insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Point2<f32>> {
        self.samples.iter()
    }

    /// Mean of all populated slots, or [`None`] if nothing has been measured yet.
    #[must_use]
    pub fn mean(&self) -> Option<Point2<f32>> {
        if self.samples.is_empty() {
            return None;
        }

        let sum = self
            .samples
            .iter()
            .fold(Vector2::zeros(), |sum, sample| sum + sample.coords);

        Some((sum / self.samples.len() as f32).into())
    }
}

/// Constants every new track copies from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParameters {
    /// Size of the moving average window.
    pub window: NonZeroUsize,
    pub radius: f32,
    pub elasticity: f32,
}

impl From<&BallLocalizerConfig> for TrackParameters {
    fn from(config: &BallLocalizerConfig) -> Self {
        Self {
            window: config.ball_localizer.position_averages,
            radius: config.ball.radius,
            elasticity: config.ball_localizer.elasticity,
        }
    }
}

/// How a track was advanced during the latest frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    /// Matched with a detection.
    #[default]
    Tracked,
    /// Not seen, moved by dead reckoning.
    Extrapolated,
}

/// A single ball, followed across frames.
#[derive(Debug, Clone)]
pub struct BallTrack {
    id: TrackId,
    samples: SampleBuffer,
    position: Point2<f32>,
    velocity: Vector2<f32>,
    created_at: Instant,
    updated_at: Instant,
    radius: f32,
    elasticity: f32,
    state: TrackState,
    measurements: usize,
}

impl BallTrack {
    /// Creates a track from its first measurement.
    #[must_use]
    pub fn new(
        id: TrackId,
        position: Point2<f32>,
        now: Instant,
        parameters: &TrackParameters,
    ) -> Self {
        let mut samples = SampleBuffer::new(parameters.window);
        samples.push(position);

        Self {
            id,
            samples,
            position,
            velocity: Vector2::zeros(),
            created_at: now,
            updated_at: now,
            radius: parameters.radius,
            elasticity: parameters.elasticity,
            state: TrackState::Tracked,
            measurements: 1,
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// The smoothed position of the ball.
    #[must_use]
    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    #[must_use]
    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Time of the last real measurement, extrapolation does not count.
    #[must_use]
    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    #[must_use]
    pub fn time_since_update(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }

    #[must_use]
    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    /// Total amount of measurements, including those no longer in the window.
    #[must_use]
    pub fn measurements(&self) -> usize {
        self.measurements
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[must_use]
    pub fn elasticity(&self) -> f32 {
        self.elasticity
    }

    #[must_use]
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Adds a measured ball position, `dt` seconds after the previous frame.
    ///
    /// The velocity is the change of the smoothed position over `dt`, and is left untouched when
    /// `dt` is not a positive number.
    pub fn add_measurement(&mut self, position: Point2<f32>, dt: f32, now: Instant) {
        self.samples.push(position);
        self.measurements += 1;
        self.updated_at = now;
        self.state = TrackState::Tracked;

        let Some(smoothed) = self.samples.mean() else {
            return;
        };

        if is_valid_dt(dt) {
            self.velocity = (smoothed - self.position) / dt;
        } else {
            tracing::trace!(track = %self.id, dt, "skipping velocity update");
        }

        self.position = smoothed;
    }

    /// Moves the ball `dt` seconds ahead using its last known velocity.
    ///
    /// Each velocity component loses `drag * dt` without ever changing sign, after which the ball
    /// bounces off any wall it has crossed.
    pub fn extrapolate(&mut self, dt: f32, drag: f32, boundary: &dyn Boundary) {
        self.state = TrackState::Extrapolated;

        if !is_valid_dt(dt) {
            return;
        }

        self.position += self.velocity * dt;

        let step = drag * dt;
        for axis in 0..2 {
            let speed = self.velocity[axis];

            self.velocity[axis] = if speed.abs() > step {
                speed - step * speed.signum()
            } else {
                0.0
            };
        }

        (self.position, self.velocity) =
            boundary.collide_walls(self.position, self.velocity, self.radius, self.elasticity);
    }
}

#[inline]
fn is_valid_dt(dt: f32) -> bool {
    dt.is_finite() && dt > 0.0
}
