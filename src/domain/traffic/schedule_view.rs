use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::domain::reservation::reservation::FinishTime;
use crate::domain::traffic::route::{Profile, Route};
use crate::domain::utils::Time;
use crate::domain::utils::id::{MapName, ParticipantId};

/// Map set plus time window a view query is narrowed to.
///
/// An empty map set matches every map; a missing bound leaves that side of
/// the window open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpacetimeFilter {
    maps: BTreeSet<MapName>,
    lower_time_bound: Option<Time>,
    upper_time_bound: Option<Time>,
}

impl SpacetimeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrowed to the map and lifetime of `route`.
    pub fn for_route(route: &Route) -> Self {
        let mut filter = SpacetimeFilter::new();
        filter.add_map(route.map().clone());
        filter.set_lower_time_bound(Some(route.trajectory().start_time()));
        filter.set_upper_time_bound(route.trajectory().finish_time().bounded());
        filter
    }

    pub fn clear_maps(&mut self) {
        self.maps.clear();
    }

    pub fn add_map(&mut self, map: MapName) {
        self.maps.insert(map);
    }

    pub fn set_lower_time_bound(&mut self, bound: Option<Time>) {
        self.lower_time_bound = bound;
    }

    pub fn set_upper_time_bound(&mut self, bound: Option<Time>) {
        self.upper_time_bound = bound;
    }

    pub fn maps(&self) -> &BTreeSet<MapName> {
        &self.maps
    }

    pub fn lower_time_bound(&self) -> Option<Time> {
        self.lower_time_bound
    }

    pub fn upper_time_bound(&self) -> Option<Time> {
        self.upper_time_bound
    }

    pub fn matches(&self, route: &Route) -> bool {
        if !self.maps.is_empty() && !self.maps.contains(route.map()) {
            return false;
        }

        let trajectory = route.trajectory();
        let starts_in_time = self.upper_time_bound.is_none_or(|upper| trajectory.start_time() <= upper);
        let lasts_long_enough = match (self.lower_time_bound, trajectory.finish_time()) {
            (Some(lower), FinishTime::Bounded(finish)) => finish >= lower,
            _ => true,
        };
        starts_in_time && lasts_long_enough
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantDescription {
    pub name: String,
    pub profile: Profile,
}

impl ParticipantDescription {
    pub fn new(name: impl Into<String>, profile: Profile) -> Self {
        ParticipantDescription { name: name.into(), profile }
    }
}

/// One itinerary of a participant as a view reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewEntry {
    pub participant: ParticipantId,
    pub description: ParticipantDescription,
    pub route: Route,
}

/// Indexed read access to the committed itineraries of all participants.
pub trait ScheduleView: Debug + Send + Sync {
    fn query(&self, filter: &SpacetimeFilter) -> Vec<ViewEntry>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traffic::route::{Trajectory, Waypoint};

    fn route(map: &str, start: Time, finish: Time, holds: bool) -> Route {
        Route::new(MapName::new(map), Trajectory::new(vec![Waypoint::new(start, 0.0, 0.0), Waypoint::new(finish, 1.0, 0.0)], holds).unwrap())
    }

    #[test]
    fn filter_for_route_narrows_map_and_window() {
        let filter = SpacetimeFilter::for_route(&route("L1", 10, 20, false));

        assert!(filter.matches(&route("L1", 15, 30, false)));
        assert!(filter.matches(&route("L1", 0, 10, false)));
        assert!(!filter.matches(&route("L1", 21, 30, false)));
        assert!(!filter.matches(&route("L2", 10, 20, false)));
        assert!(filter.matches(&route("L1", 0, 5, true)));
    }

    #[test]
    fn cleared_filter_matches_like_a_fresh_one() {
        let mut filter = SpacetimeFilter::for_route(&route("L1", 10, 20, false));
        filter.clear_maps();
        filter.set_lower_time_bound(None);
        filter.set_upper_time_bound(None);

        assert_eq!(filter, SpacetimeFilter::new());
        assert!(filter.matches(&route("L9", 500, 600, false)));
    }
}
