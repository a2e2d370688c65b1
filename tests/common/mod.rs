#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fleet_reservations::domain::planner::planner_config::PlannerConfig;
use fleet_reservations::domain::planner::planning_session::PlanningSession;
use fleet_reservations::domain::reservation::constraint_tracker::ConstraintTracker;
use fleet_reservations::domain::reservation::request::{ReservationRequest, TimeRange};
use fleet_reservations::domain::reservation::reservation::Reservation;
use fleet_reservations::domain::schedule::schedule_state::{CurrentScheduleState, ScheduleWriter, SharedScheduleState};
use fleet_reservations::domain::traffic::negotiation_table::{NegotiationTable, Rollout};
use fleet_reservations::domain::traffic::route::{Profile, Route, Trajectory, Waypoint};
use fleet_reservations::domain::traffic::schedule_view::{ParticipantDescription, ScheduleView, SpacetimeFilter, ViewEntry};
use fleet_reservations::domain::utils::Time;
use fleet_reservations::domain::utils::id::{MapName, ParticipantId, ReservationId, ResourceName};

pub fn resource() -> ResourceName {
    ResourceName::new("R")
}

pub fn window(lower: Time, upper: Time, duration: Time) -> ReservationRequest {
    ReservationRequest::new(resource(), Some(TimeRange::between(lower, upper)), Some(duration), None)
}

/// A committed reservation on `R` together with the window of its request.
pub struct Booking {
    pub start: Time,
    pub duration: Option<Time>,
    pub window: (Time, Time),
}

impl Booking {
    pub fn bounded(start: Time, duration: Time, window: (Time, Time)) -> Self {
        Booking { start, duration: Some(duration), window }
    }

    pub fn unbounded(start: Time, window: (Time, Time)) -> Self {
        Booking { start, duration: None, window }
    }
}

/// Commits every booking under its own request; reservation ids follow the
/// booking order starting at 0.
pub fn committed(bookings: &[Booking]) -> (CurrentScheduleState, ConstraintTracker) {
    let tracker = ConstraintTracker::new();
    let mut state = CurrentScheduleState::new();

    for (index, booking) in bookings.iter().enumerate() {
        let request = ReservationRequest::new(resource(), Some(TimeRange::between(booking.window.0, booking.window.1)), booking.duration, None);
        let request_id = tracker.add_request(ParticipantId(index as u64), vec![request], 0);
        let reservation = Reservation::new(ReservationId(index as u64), resource(), ParticipantId(index as u64), booking.start, booking.duration, None);

        tracker.associate_request_with_reservation(request_id, &reservation).unwrap();
        state.add_reservation(reservation).unwrap();
    }
    (state, tracker)
}

pub fn shared(bookings: &[Booking]) -> (SharedScheduleState, ConstraintTracker) {
    let (state, tracker) = committed(bookings);
    (state.into_shared(), tracker)
}

pub fn session(bookings: &[Booking]) -> PlanningSession {
    let (state, tracker) = committed(bookings);
    PlanningSession::new(state, tracker, PlannerConfig::default())
}

pub fn describe(name: &str) -> ParticipantDescription {
    ParticipantDescription::new(name, Profile::new(0.5))
}

pub fn parked(map: &str, x: f64, start: Time, finish: Time) -> Route {
    Route::new(MapName::new(map), Trajectory::new(vec![Waypoint::new(start, x, 0.0), Waypoint::new(finish, x, 0.0)], false).unwrap())
}

/// Crosses x = -10..10 along the x axis between `start` and `finish`.
pub fn crossing(map: &str, start: Time, finish: Time) -> Route {
    Route::new(MapName::new(map), Trajectory::new(vec![Waypoint::new(start, -10.0, 0.0), Waypoint::new(finish, 10.0, 0.0)], false).unwrap())
}

/// Schedule view that remembers every filter it was queried with.
#[derive(Debug, Default)]
pub struct RecordingScheduleView {
    pub entries: Vec<ViewEntry>,
    pub queries: Mutex<Vec<SpacetimeFilter>>,
}

impl RecordingScheduleView {
    pub fn with_entries(entries: Vec<ViewEntry>) -> Arc<Self> {
        Arc::new(RecordingScheduleView { entries, queries: Mutex::new(Vec::new()) })
    }

    pub fn recorded(&self) -> Vec<SpacetimeFilter> {
        self.queries.lock().unwrap().clone()
    }
}

impl ScheduleView for RecordingScheduleView {
    fn query(&self, filter: &SpacetimeFilter) -> Vec<ViewEntry> {
        self.queries.lock().unwrap().push(filter.clone());
        self.entries.iter().filter(|entry| filter.matches(&entry.route)).cloned().collect()
    }
}

/// Negotiation table that remembers every rollout selection it was queried
/// with. Rival `i` parks at the x position given by its selected alternative.
#[derive(Debug)]
pub struct RecordingNegotiationTable {
    pub rivals: Vec<(ParticipantId, Vec<f64>)>,
    pub selections: Mutex<Vec<Vec<usize>>>,
}

impl RecordingNegotiationTable {
    pub fn new(rivals: Vec<(ParticipantId, Vec<f64>)>) -> Arc<Self> {
        Arc::new(RecordingNegotiationTable { rivals, selections: Mutex::new(Vec::new()) })
    }

    pub fn recorded(&self) -> Vec<Vec<usize>> {
        self.selections.lock().unwrap().clone()
    }
}

impl NegotiationTable for RecordingNegotiationTable {
    fn owner(&self) -> ParticipantId {
        ParticipantId(0)
    }

    fn rollouts(&self) -> Vec<Rollout> {
        self.rivals.iter().map(|(rival, positions)| Rollout { rival: *rival, count: positions.len() }).collect()
    }

    fn query(&self, filter: &SpacetimeFilter, selection: &[usize]) -> Vec<ViewEntry> {
        self.selections.lock().unwrap().push(selection.to_vec());

        self.rivals
            .iter()
            .zip(selection)
            .map(|((rival, positions), index)| ViewEntry { participant: *rival, description: describe("rival"), route: parked("L1", positions[*index], 0, 100) })
            .filter(|entry| filter.matches(&entry.route))
            .collect()
    }
}
