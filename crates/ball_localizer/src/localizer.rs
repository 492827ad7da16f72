use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    config::BallLocalizerConfig,
    field::{Boundary, FieldBounds, FieldGoals, GoalRegions},
    pose::{BallDetection, RobotPose},
    track::{BallTrack, TrackId, TrackParameters, TrackState},
};

/// Everything the localizer needs from the outside world.
pub struct Environment {
    pub clock: Arc<dyn Clock>,
    pub boundary: Box<dyn Boundary>,
    pub goals: Box<dyn GoalRegions>,
}

impl Environment {
    /// The system clock, with walls and goals taken from the config.
    #[must_use]
    pub fn from_config(config: &BallLocalizerConfig) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            boundary: Box::new(FieldBounds::from(&config.field)),
            goals: Box::new(FieldGoals::from(config)),
        }
    }

    #[must_use]
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    #[must_use]
    pub fn with_boundary(self, boundary: impl Boundary + 'static) -> Self {
        Self {
            boundary: Box::new(boundary),
            ..self
        }
    }

    #[must_use]
    pub fn with_goals(self, goals: impl GoalRegions + 'static) -> Self {
        Self {
            goals: Box::new(goals),
            ..self
        }
    }
}

/// Why a track was removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PurgeReason {
    /// The ball left the field.
    OutOfBounds,
    /// No detection arrived within the purge lifetime.
    Stale { since_update: Duration },
    /// The ball moves faster than a real ball could.
    TooFast { speed: f32 },
    /// The ball is inside one of the goals.
    InGoal,
}

/// Serializable view of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub position: Point2<f32>,
    pub velocity: Vector2<f32>,
    /// Seconds since the track was created.
    pub age: f32,
    pub state: TrackState,
}

/// Fuses robot-relative ball detections into a set of tracked balls.
///
/// Each detection is attached to the nearest track within `max_identity_distance`, greedily and
/// in detection order. Two detections in the same frame can therefore end up on the same track.
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct BallLocalizer {
    config: BallLocalizerConfig,
    parameters: TrackParameters,
    environment: Environment,
    tracks: Vec<BallTrack>,
    next_id: u64,
}

impl BallLocalizer {
    #[must_use]
    pub fn new(config: BallLocalizerConfig, environment: Environment) -> Self {
        Self {
            parameters: TrackParameters::from(&config),
            config,
            environment,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    /// A localizer using the system clock and the field described by `config`.
    #[must_use]
    pub fn from_config(config: BallLocalizerConfig) -> Self {
        let environment = Environment::from_config(&config);
        Self::new(config, environment)
    }

    #[must_use]
    pub fn config(&self) -> &BallLocalizerConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> Instant {
        self.environment.clock.now()
    }

    #[must_use]
    pub fn tracks(&self) -> &[BallTrack] {
        &self.tracks
    }

    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<&BallTrack> {
        self.tracks.iter().find(|track| track.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Removes all tracks. Ids of new tracks keep counting up.
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// Processes one frame of detections made from `pose`, `dt` seconds after the previous one.
    pub fn update(&mut self, pose: &RobotPose, detections: &[BallDetection], dt: f32) {
        let _span = tracing::debug_span!(
            "ball_localizer",
            tracks = self.tracks.len(),
            detections = detections.len()
        )
        .entered();

        let now = self.now();
        let mut handled = HashSet::with_capacity(detections.len());

        for detection in detections {
            let position = pose.detection_to_world(detection);
            if !position.coords.iter().all(|coordinate| coordinate.is_finite()) {
                tracing::debug!(?detection, "ignoring non-finite ball detection");
                continue;
            }

            let id = match self.nearest_index(position) {
                Some(index) => {
                    let track = &mut self.tracks[index];
                    track.add_measurement(position, dt, now);
                    track.id()
                }
                None => self.spawn(position, now),
            };

            handled.insert(id);
        }

        let drag = self.config.ball_localizer.drag;
        for track in &mut self.tracks {
            if !handled.contains(&track.id()) {
                track.extrapolate(dt, drag, self.environment.boundary.as_ref());
            }
        }

        self.purge(detections);
    }

    /// The track closest to `position`, if any lies within the identity distance.
    ///
    /// On equal distances the track that comes first in [`Self::tracks`] wins.
    #[must_use]
    pub fn nearest_track(&self, position: Point2<f32>) -> Option<&BallTrack> {
        self.nearest_index(position).map(|index| &self.tracks[index])
    }

    /// Id of the track closest to `position`, see [`Self::nearest_track`].
    #[must_use]
    pub fn find_nearest(&self, position: Point2<f32>) -> Option<TrackId> {
        self.nearest_track(position).map(BallTrack::id)
    }

    fn nearest_index(&self, position: Point2<f32>) -> Option<usize> {
        let max_distance = self.config.ball_localizer.max_identity_distance;
        let mut nearest: Option<(usize, f32)> = None;

        for (index, track) in self.tracks.iter().enumerate() {
            let distance = nalgebra::distance(&track.position(), &position);

            if distance <= max_distance && nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((index, distance));
            }
        }

        nearest.map(|(index, _)| index)
    }

    fn spawn(&mut self, position: Point2<f32>, now: Instant) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;

        tracing::debug!(track = %id, x = position.x, y = position.y, "spawning ball track");
        self.tracks.push(BallTrack::new(id, position, now, &self.parameters));

        id
    }

    /// Drops every track that is no longer valid.
    ///
    /// Takes the detections of the current frame, validity does not depend on them at the moment.
    pub fn purge(&mut self, _visible_detections: &[BallDetection]) {
        let now = self.now();

        let remaining: Vec<BallTrack> = std::mem::take(&mut self.tracks)
            .into_iter()
            .filter(|track| match self.purge_reason_at(track, now) {
                None => true,
                Some(PurgeReason::TooFast { speed }) => {
                    tracing::info!(
                        track = %track.id(),
                        speed,
                        max_velocity = self.config.ball_localizer.max_velocity,
                        "ball track too fast, purging"
                    );
                    false
                }
                Some(reason) => {
                    tracing::debug!(track = %track.id(), ?reason, "purging ball track");
                    false
                }
            })
            .collect();

        self.tracks = remaining;
    }

    /// Why `track` would be removed by the next purge, or [`None`] if it is valid.
    #[must_use]
    pub fn purge_reason(&self, track: &BallTrack) -> Option<PurgeReason> {
        self.purge_reason_at(track, self.now())
    }

    fn purge_reason_at(&self, track: &BallTrack, now: Instant) -> Option<PurgeReason> {
        let config = &self.config.ball_localizer;

        if self
            .environment
            .boundary
            .is_outside(track.position(), track.radius())
        {
            return Some(PurgeReason::OutOfBounds);
        }

        let since_update = track.time_since_update(now);
        if since_update.as_secs_f32() > config.purge_lifetime {
            return Some(PurgeReason::Stale { since_update });
        }

        let speed = track.speed();
        if speed > config.max_velocity {
            return Some(PurgeReason::TooFast { speed });
        }

        if self.environment.goals.contains(track) {
            return Some(PurgeReason::InGoal);
        }

        None
    }

    /// The current tracks, in a form that can be logged or sent elsewhere.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        let now = self.now();

        self.tracks
            .iter()
            .map(|track| TrackSnapshot {
                id: track.id(),
                position: track.position(),
                velocity: track.velocity(),
                age: track.age(now).as_secs_f32(),
                state: track.state(),
            })
            .collect()
    }
}
