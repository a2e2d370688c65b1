use thiserror::Error;

use crate::domain::reservation::reservation::FinishTime;
use crate::domain::utils::Time;
use crate::domain::utils::id::MapName;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("A trajectory needs at least one waypoint.")]
    EmptyTrajectory,

    #[error("Waypoint {index} does not come strictly after its predecessor.")]
    UnorderedWaypoint { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub time: Time,
    pub position: [f64; 2],
}

impl Waypoint {
    pub fn new(time: Time, x: f64, y: f64) -> Self {
        Waypoint { time, position: [x, y] }
    }
}

/// Piecewise linear motion through time-ordered waypoints.
///
/// A trajectory that holds indefinitely stays at its last waypoint forever,
/// so its finish time is unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
    holds_indefinitely: bool,
}

impl Trajectory {
    pub fn new(waypoints: Vec<Waypoint>, holds_indefinitely: bool) -> Result<Self, RouteError> {
        if waypoints.is_empty() {
            return Err(RouteError::EmptyTrajectory);
        }
        if let Some(index) = waypoints.windows(2).position(|pair| pair[1].time <= pair[0].time) {
            return Err(RouteError::UnorderedWaypoint { index: index + 1 });
        }
        Ok(Trajectory { waypoints, holds_indefinitely })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn start_time(&self) -> Time {
        self.waypoints.first().map_or(0, |waypoint| waypoint.time)
    }

    /// Time of the last waypoint, regardless of holding.
    pub fn last_time(&self) -> Time {
        self.waypoints.last().map_or(0, |waypoint| waypoint.time)
    }

    pub fn finish_time(&self) -> FinishTime {
        if self.holds_indefinitely { FinishTime::Unbounded } else { FinishTime::Bounded(self.last_time()) }
    }

    /// Interpolated position; `None` outside the trajectory's lifetime.
    pub fn position_at(&self, time: Time) -> Option<[f64; 2]> {
        let first = self.waypoints.first()?;
        let last = self.waypoints.last()?;

        if time < first.time || (time > last.time && !self.holds_indefinitely) {
            return None;
        }
        if time >= last.time {
            return Some(last.position);
        }

        let segment = self.waypoints.windows(2).find(|pair| time <= pair[1].time)?;
        let (from, to) = (segment[0], segment[1]);
        let ratio = (time - from.time) as f64 / (to.time - from.time) as f64;

        Some([from.position[0] + ratio * (to.position[0] - from.position[0]), from.position[1] + ratio * (to.position[1] - from.position[1])])
    }
}

/// Footprint of a participant, approximated by a circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub footprint_radius: f64,
}

impl Profile {
    pub fn new(footprint_radius: f64) -> Self {
        Profile { footprint_radius }
    }
}

/// One map-bound trajectory of an itinerary.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    map: MapName,
    trajectory: Trajectory,
}

impl Route {
    pub fn new(map: MapName, trajectory: Trajectory) -> Self {
        Route { map, trajectory }
    }

    pub fn map(&self) -> &MapName {
        &self.map
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }
}
