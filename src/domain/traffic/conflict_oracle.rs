use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::domain::reservation::reservation::FinishTime;
use crate::domain::traffic::route::{Profile, Trajectory};
use crate::domain::utils::Time;

/// Decides whether two participants moving along their trajectories would
/// collide. Implementations must be deterministic.
pub trait ConflictOracle: Debug + Send + Sync {
    fn conflicts(&self, profile_a: &Profile, trajectory_a: &Trajectory, profile_b: &Profile, trajectory_b: &Trajectory) -> bool;
}

/// Compares circular footprints along piecewise linear trajectories.
///
/// Between two consecutive waypoint times of either trajectory both
/// participants move linearly, so the closest approach of each such interval
/// is computed exactly. Footprints that merely touch do not conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweptFootprintOracle;

impl SweptFootprintOracle {
    fn separation(a: &Trajectory, b: &Trajectory, time: Time) -> Option<[f64; 2]> {
        let position_a = a.position_at(time)?;
        let position_b = b.position_at(time)?;
        Some([position_a[0] - position_b[0], position_a[1] - position_b[1]])
    }

    /// Smallest distance of a separation moving linearly from `from` to `to`.
    fn closest_approach(from: [f64; 2], to: [f64; 2]) -> f64 {
        let velocity = [to[0] - from[0], to[1] - from[1]];
        let speed_squared = velocity[0] * velocity[0] + velocity[1] * velocity[1];

        let ratio = if speed_squared == 0.0 { 0.0 } else { (-(from[0] * velocity[0] + from[1] * velocity[1]) / speed_squared).clamp(0.0, 1.0) };
        let closest = [from[0] + ratio * velocity[0], from[1] + ratio * velocity[1]];
        closest[0].hypot(closest[1])
    }
}

impl ConflictOracle for SweptFootprintOracle {
    fn conflicts(&self, profile_a: &Profile, trajectory_a: &Trajectory, profile_b: &Profile, trajectory_b: &Trajectory) -> bool {
        let lower = trajectory_a.start_time().max(trajectory_b.start_time());
        let upper = match trajectory_a.finish_time().min(trajectory_b.finish_time()) {
            FinishTime::Bounded(finish) => finish,
            // Both hold forever: nothing moves after the latest waypoint.
            FinishTime::Unbounded => trajectory_a.last_time().max(trajectory_b.last_time()).max(lower),
        };
        if upper < lower {
            return false;
        }

        let threshold = profile_a.footprint_radius + profile_b.footprint_radius;
        let mut times: BTreeSet<Time> = BTreeSet::from([lower, upper]);
        times.extend(
            trajectory_a.waypoints().iter().chain(trajectory_b.waypoints()).map(|waypoint| waypoint.time).filter(|time| (lower..=upper).contains(time)),
        );

        let separations: Vec<[f64; 2]> = times.into_iter().filter_map(|time| Self::separation(trajectory_a, trajectory_b, time)).collect();

        match separations.as_slice() {
            [only] => only[0].hypot(only[1]) < threshold,
            _ => separations.windows(2).any(|pair| Self::closest_approach(pair[0], pair[1]) < threshold),
        }
    }
}
