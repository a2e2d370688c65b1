mod common;

use std::collections::HashSet;

use common::{Booking, committed, resource, shared, window};
use fleet_reservations::domain::planner::min_conflict_planner::MinConflictPlanner;
use fleet_reservations::domain::planner::planner::Planner;
use fleet_reservations::domain::planner::planner_config::{CostMetric, PlannerConfig};
use fleet_reservations::domain::planner::schedule_operator::{
    BringForwardScheduleOperator, OperatorError, PushbackScheduleOperator, ScheduleOperator,
};
use fleet_reservations::domain::reservation::timeline;
use fleet_reservations::domain::schedule::schedule_patch::SchedulePatch;
use fleet_reservations::domain::schedule::schedule_state::{AbstractScheduleState, CurrentScheduleState};
use fleet_reservations::domain::utils::id::{ParticipantId, ReservationId};
use tracing_test::traced_test;

fn start_of(state: &dyn AbstractScheduleState, id: u64) -> Option<i64> {
    state.get_reservation_by_id(ReservationId(id)).map(|reservation| reservation.start_time())
}

#[test]
fn pushback_chains_into_the_next_reservation() {
    let (state, tracker) = shared(&[Booking::bounded(0, 10, (0, 50)), Booking::bounded(20, 10, (0, 50))]);
    let patch = PushbackScheduleOperator::new(resource(), 0, 15).apply(&state, &tracker).unwrap();

    assert_eq!(start_of(&patch, 0), Some(15));
    assert_eq!(start_of(&patch, 1), Some(25));
    assert!(timeline::is_consistent(patch.get_schedule(&resource())));
    assert_eq!(start_of(state.as_ref(), 1), Some(20));
}

#[test]
fn pushback_yields_no_patch_when_a_link_refuses() {
    let (state, tracker) = shared(&[Booking::bounded(0, 10, (0, 50)), Booking::bounded(20, 10, (20, 20))]);
    let result = PushbackScheduleOperator::new(resource(), 0, 15).apply(&state, &tracker);

    assert_eq!(result.unwrap_err(), OperatorError::Infeasible { reservation: ReservationId(1), request: tracker.get_associated_reservation(ReservationId(1)).unwrap() });
}

#[test]
fn pushback_of_an_unbounded_reservation_moves_only_that_reservation() {
    let (state, tracker) = shared(&[Booking::unbounded(0, (0, 50))]);
    let patch = PushbackScheduleOperator::new(resource(), 0, 30).apply(&state, &tracker).unwrap();
    assert_eq!(start_of(&patch, 0), Some(30));
    assert_eq!(patch.changes().len(), 1);

    let (state, tracker) = shared(&[Booking::unbounded(0, (0, 10))]);
    assert!(PushbackScheduleOperator::new(resource(), 0, 30).apply(&state, &tracker).is_err());
}

#[test]
fn bring_forward_closes_a_gap() {
    let (state, tracker) = shared(&[Booking::bounded(10, 10, (0, 100)), Booking::bounded(30, 10, (0, 100))]);
    let patch = BringForwardScheduleOperator::new(resource(), 31, 20).apply(&state, &tracker).unwrap();

    assert_eq!(start_of(&patch, 0), Some(10));
    assert_eq!(start_of(&patch, 1), Some(20));
}

fn layout(patch: &SchedulePatch) -> Vec<(ReservationId, i64)> {
    patch.get_schedule(&resource()).values().map(|reservation| (reservation.id(), reservation.start_time())).collect()
}

#[test]
fn plan_sets_yield_distinct_consistent_candidates_until_exhausted() {
    let (state, tracker) =
        shared(&[Booking::bounded(0, 10, (0, 100)), Booking::bounded(10, 10, (0, 100)), Booking::bounded(25, 10, (0, 100))]);
    let request = tracker.add_request(ParticipantId(9), vec![window(0, 30, 10)], 0);
    let config = PlannerConfig { max_expansions: 64, cost_metric: CostMetric::TotalDisplacement, ..PlannerConfig::default() };
    let planner = MinConflictPlanner::new(state, tracker, config);

    let mut plans = planner.plan(request).unwrap();
    let mut seen = HashSet::new();
    let mut exhausted = false;

    for _ in 0..10_000 {
        match plans.next_best().unwrap() {
            Some(patch) => {
                assert!(timeline::is_consistent(patch.get_schedule(&resource())));
                assert!(seen.insert(layout(&patch)), "candidate returned twice");
            }
            None => {
                exhausted = true;
                break;
            }
        }
    }

    assert!(exhausted);
    assert!(!seen.is_empty());
}

#[test]
fn installing_a_new_baseline_changes_the_outcome() {
    let (busy, tracker) = committed(&[Booking::bounded(0, 10, (0, 0))]);
    let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5)], 0);
    let mut planner = MinConflictPlanner::new(CurrentScheduleState::new().into_shared(), tracker, PlannerConfig::default());

    assert!(planner.plan(request).unwrap().next_best().unwrap().is_some());

    planner.set_current_schedule(busy.into_shared());
    assert!(planner.plan(request).unwrap().next_best().unwrap().is_none());
}

#[traced_test]
#[test]
fn yielded_candidates_are_reported_to_analytics() {
    let (state, tracker) = shared(&[]);
    let request = tracker.add_request(ParticipantId(1), vec![window(0, 0, 5)], 0);
    let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

    let mut plans = planner.plan(request).unwrap();
    assert!(plans.next_best().unwrap().is_some());
    assert!(plans.next_best().unwrap().is_none());

    assert!(logs_contain("Candidate patch yielded"));
    assert!(logs_contain("Plan set exhausted"));
}
