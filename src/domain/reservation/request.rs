use crate::domain::utils::id::ResourceName;
use crate::domain::utils::{Duration, Time};

/// Inclusive window a reservation's start time has to fall into. Either side
/// may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub lower_bound: Option<Time>,
    pub upper_bound: Option<Time>,
}

impl TimeRange {
    pub fn new(lower_bound: Option<Time>, upper_bound: Option<Time>) -> Self {
        TimeRange { lower_bound, upper_bound }
    }

    pub fn between(lower_bound: Time, upper_bound: Time) -> Self {
        Self::new(Some(lower_bound), Some(upper_bound))
    }

    pub fn contains(&self, time: Time) -> bool {
        self.lower_bound.is_none_or(|lower| time >= lower) && self.upper_bound.is_none_or(|upper| time <= upper)
    }
}

/// The constraints a reservation has to satisfy to serve a request.
///
/// A request without duration and finish time is indefinite: only an
/// unbounded reservation can serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    resource: ResourceName,
    start: Option<TimeRange>,
    duration: Option<Duration>,
    finish: Option<Time>,
}

impl ReservationRequest {
    pub fn new(resource: ResourceName, start: Option<TimeRange>, duration: Option<Duration>, finish: Option<Time>) -> Self {
        ReservationRequest { resource, start, duration, finish }
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn start(&self) -> Option<TimeRange> {
        self.start
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn finish(&self) -> Option<Time> {
        self.finish
    }

    pub fn is_indefinite(&self) -> bool {
        self.duration.is_none() && self.finish.is_none()
    }

    pub fn earliest_start(&self) -> Option<Time> {
        self.start.and_then(|range| range.lower_bound)
    }

    pub fn latest_start(&self) -> Option<Time> {
        self.start.and_then(|range| range.upper_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_bounds_are_inclusive_and_optional() {
        let range = TimeRange::between(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(21));

        let open_ended = TimeRange::new(Some(5), None);
        assert!(open_ended.contains(i64::MAX));
        assert!(!open_ended.contains(4));
    }

    #[test]
    fn request_without_duration_or_finish_is_indefinite() {
        let indefinite = ReservationRequest::new(ResourceName::new("charger"), None, None, None);
        let bounded = ReservationRequest::new(ResourceName::new("charger"), None, Some(30), None);

        assert!(indefinite.is_indefinite());
        assert!(!bounded.is_indefinite());
    }
}
