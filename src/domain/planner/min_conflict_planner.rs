use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::domain::planner::planner::{PlanSet, Planner, PlannerError};
use crate::domain::planner::planner_config::PlannerConfig;
use crate::domain::planner::schedule_operator::{BringForwardScheduleOperator, PushbackScheduleOperator, ScheduleOperator};
use crate::domain::reservation::constraint_tracker::{ConstraintTracker, RequestStatus};
use crate::domain::reservation::request::ReservationRequest;
use crate::domain::reservation::reservation::{FinishTime, Reservation};
use crate::domain::reservation::timeline::{self, ResourceSchedule};
use crate::domain::schedule::schedule_patch::SchedulePatch;
use crate::domain::schedule::schedule_state::{AbstractScheduleState, ScheduleWriter, SharedScheduleState};
use crate::domain::utils::Time;
use crate::domain::utils::id::{ParticipantId, RequestId, ReservationId, ResourceName};

pub const ANALYTICS_TARGET: &str = "planner_analytics";

new_key_type! {
    struct SearchNodeKey;
}

#[derive(Debug, Clone)]
enum SearchGoal {
    /// Place a new reservation for a pending request.
    Admit { request: RequestId, participant: ParticipantId, alternatives: Vec<ReservationRequest>, reservation: ReservationId },

    /// Remove `released` and optionally close the gap it leaves.
    Retract { request: RequestId, released: Reservation },
}

impl SearchGoal {
    fn request(&self) -> RequestId {
        match self {
            SearchGoal::Admit { request, .. } | SearchGoal::Retract { request, .. } => *request,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SearchGoal::Admit { .. } => "Admit",
            SearchGoal::Retract { .. } => "Retract",
        }
    }
}

#[derive(Debug)]
struct SearchNode {
    state: SharedScheduleState,
    cost: i64,
    /// Candidates fulfil the goal as they are; other nodes still need rewrites.
    is_candidate: bool,
}

#[derive(Debug)]
struct Successor {
    state: SharedScheduleState,
    step_cost: i64,
    is_candidate: bool,
}

/// Ordered by accumulated cost, candidates before frontier nodes of equal
/// cost, then insertion order.
type QueueEntry = Reverse<(i64, u8, u64, SearchNodeKey)>;

/// Effective timelines of the affected resources.
type StateSignature = Vec<(ReservationId, Time, FinishTime)>;

/// Best-first search over schedule states reachable from the baseline through
/// Pushback and BringForward rewrites.
#[derive(Debug)]
pub struct MinConflictPlanSet {
    goal: SearchGoal,
    baseline: SharedScheduleState,
    tracker: ConstraintTracker,
    config: PlannerConfig,
    resources: Vec<ResourceName>,

    nodes: SlotMap<SearchNodeKey, SearchNode>,
    queue: BinaryHeap<QueueEntry>,
    expanded: HashSet<StateSignature>,
    yielded: HashSet<StateSignature>,

    sequence: u64,
    expansions: usize,
    budget_spent: bool,
    exhausted: bool,
}

impl MinConflictPlanSet {
    fn new(goal: SearchGoal, baseline: SharedScheduleState, root: SharedScheduleState, tracker: ConstraintTracker, config: PlannerConfig) -> Self {
        let resources: Vec<ResourceName> = match &goal {
            SearchGoal::Admit { alternatives, .. } => {
                alternatives.iter().map(|alternative| alternative.resource().clone()).collect::<BTreeSet<_>>().into_iter().collect()
            }
            SearchGoal::Retract { released, .. } => vec![released.resource().clone()],
        };
        let root_is_candidate = matches!(goal, SearchGoal::Retract { .. });

        let mut plan_set = MinConflictPlanSet {
            goal,
            baseline,
            tracker,
            config,
            resources,
            nodes: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            expanded: HashSet::new(),
            yielded: HashSet::new(),
            sequence: 0,
            expansions: 0,
            budget_spent: false,
            exhausted: false,
        };
        plan_set.push(SearchNode { state: root, cost: 0, is_candidate: root_is_candidate });
        plan_set
    }

    /// Number of states expanded so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    fn push(&mut self, node: SearchNode) {
        let rank = if node.is_candidate { 0 } else { 1 };
        let cost = node.cost;
        let key = self.nodes.insert(node);
        self.queue.push(Reverse((cost, rank, self.sequence, key)));
        self.sequence += 1;
    }

    fn signature(&self, state: &dyn AbstractScheduleState) -> StateSignature {
        self.resources
            .iter()
            .flat_map(|resource| state.get_schedule(resource).values())
            .map(|reservation| (reservation.id(), reservation.start_time(), reservation.actual_finish_time()))
            .collect()
    }

    fn expand(&mut self, node: &SearchNode) -> Result<(), PlannerError> {
        if self.expansions >= self.config.max_expansions {
            if !self.budget_spent {
                log::warn!("Request {}: expansion budget of {} states spent, draining remaining candidates.", self.goal.request(), self.config.max_expansions);
                self.budget_spent = true;
            }
            return Ok(());
        }
        self.expansions += 1;

        let successors = match &self.goal {
            SearchGoal::Admit { participant, alternatives, reservation, .. } => {
                self.admission_successors(node, *participant, alternatives, *reservation)?
            }
            SearchGoal::Retract { released, .. } => self.retraction_successors(node, released)?,
        };

        for successor in successors {
            let cost = node.cost + successor.step_cost;
            if !self.config.within_budget(cost) {
                log::trace!("Successor at cost {} exceeds the cost ceiling.", cost);
                continue;
            }
            self.push(SearchNode { state: successor.state, cost, is_candidate: successor.is_candidate });
        }
        Ok(())
    }

    /// Places the new reservation at every candidate start time, or makes
    /// room for it with a single rewrite where it does not fit.
    fn admission_successors(
        &self,
        node: &SearchNode,
        participant: ParticipantId,
        alternatives: &[ReservationRequest],
        reservation: ReservationId,
    ) -> Result<Vec<Successor>, PlannerError> {
        let mut successors = Vec::new();

        for alternative in alternatives {
            let sched = node.state.get_schedule(alternative.resource());

            for start in candidate_start_times(sched, alternative) {
                let proposed = Reservation::new(reservation, alternative.resource().clone(), participant, start, alternative.duration(), alternative.finish());
                if !ConstraintTracker::satisfies_request(alternative, &proposed) {
                    continue;
                }

                let mut insertion = SchedulePatch::new(node.state.clone());
                match insertion.add_reservation(proposed.clone()) {
                    Ok(()) => successors.push(Successor { state: Arc::new(insertion), step_cost: 0, is_candidate: true }),
                    Err(e) => {
                        log::trace!("{} does not fit yet: {}", proposed, e);
                        for operator in clearing_operators(sched, &proposed) {
                            if let Some(successor) = self.rewrite(node, operator.as_ref())? {
                                successors.push(successor);
                            }
                        }
                    }
                }
            }
        }
        Ok(successors)
    }

    /// Pulls the first reservation behind the released slot forward into the
    /// gap, as far as its own request allows.
    fn retraction_successors(&self, node: &SearchNode, released: &Reservation) -> Result<Vec<Successor>, PlannerError> {
        let resource = released.resource();
        let sched = node.state.get_schedule(resource);
        let floor = released.start_time();

        for next in sched.range(floor..).map(|(_, reservation)| reservation) {
            let gap_start = match timeline::entry_before(sched, next.start_time()).map(Reservation::actual_finish_time) {
                Some(FinishTime::Bounded(finish)) => finish.max(floor),
                Some(FinishTime::Unbounded) => break,
                None => floor,
            };
            if gap_start >= next.start_time() {
                continue;
            }

            let desired = self.earliest_allowed_start(next).map_or(gap_start, |earliest| earliest.max(gap_start));
            if desired >= next.start_time() {
                break;
            }

            let operator = BringForwardScheduleOperator::new(resource.clone(), next.start_time() + 1, desired);
            let successors = self.rewrite(node, &operator)?.into_iter().map(|successor| Successor { is_candidate: true, ..successor });
            return Ok(successors.collect());
        }
        Ok(Vec::new())
    }

    fn earliest_allowed_start(&self, reservation: &Reservation) -> Option<Time> {
        let request = self.tracker.get_request(self.tracker.get_associated_reservation(reservation.id())?)?;
        match request.status {
            RequestStatus::Assigned { alternative, .. } => request.alternatives.get(alternative)?.earliest_start(),
            RequestStatus::Pending => None,
        }
    }

    fn rewrite(&self, node: &SearchNode, operator: &dyn ScheduleOperator) -> Result<Option<Successor>, PlannerError> {
        match operator.apply(&node.state, &self.tracker) {
            Ok(patch) if patch.is_empty() => Ok(None),
            Ok(patch) => {
                let step_cost = self.config.cost_metric.cost(&patch);
                Ok(Some(Successor { state: Arc::new(patch), step_cost, is_candidate: false }))
            }
            Err(e) if e.is_fatal() => Err(PlannerError::StaleState(e)),
            Err(e) => {
                log::trace!("{} rejected: {}", operator, e);
                Ok(None)
            }
        }
    }
}

impl PlanSet for MinConflictPlanSet {
    fn next_best(&mut self) -> Result<Option<SchedulePatch>, PlannerError> {
        while let Some(Reverse((cost, _, _, key))) = self.queue.pop() {
            let Some(node) = self.nodes.remove(key) else {
                continue;
            };
            let signature = self.signature(node.state.as_ref());

            // Retraction candidates keep growing: closing the released gap is optional.
            let expandable = !node.is_candidate || matches!(self.goal, SearchGoal::Retract { .. });
            if expandable {
                if self.expanded.insert(signature.clone()) {
                    self.expand(&node)?;
                } else if !node.is_candidate {
                    continue;
                }
            }

            if node.is_candidate && self.yielded.insert(signature) {
                let patch = SchedulePatch::rebase(node.state.as_ref(), self.baseline.clone(), &self.resources);

                tracing::info!(
                    target: ANALYTICS_TARGET,
                    LogDescription = "Candidate patch yielded",
                    Goal = self.goal.name(),
                    Request = %self.goal.request(),
                    Cost = cost,
                    Changes = patch.changes().len(),
                    Expansions = self.expansions,
                    Yielded = self.yielded.len(),
                );
                return Ok(Some(patch));
            }
        }

        if !self.exhausted {
            self.exhausted = true;
            self.nodes.clear();
            tracing::info!(
                target: ANALYTICS_TARGET,
                LogDescription = "Plan set exhausted",
                Goal = self.goal.name(),
                Request = %self.goal.request(),
                Expansions = self.expansions,
                Yielded = self.yielded.len(),
            );
        }
        Ok(None)
    }
}

/// Start times worth trying for `request` on `sched`: the window bounds, the
/// edges of every reservation and the latest start that still ends before
/// one. Sorted and restricted to the request's window.
fn candidate_start_times(sched: &ResourceSchedule, request: &ReservationRequest) -> Vec<Time> {
    let window = request.start().unwrap_or_default();
    let mut times: BTreeSet<Time> = BTreeSet::new();

    times.extend(window.lower_bound);
    times.extend(window.upper_bound);
    for reservation in sched.values() {
        times.insert(reservation.start_time());
        times.extend(reservation.actual_finish_time().bounded());
        if let Some(duration) = request.duration() {
            times.insert(reservation.start_time() - duration);
        }
    }
    if times.is_empty() {
        times.insert(0);
    }

    times.into_iter().filter(|time| window.contains(*time)).collect()
}

/// Rewrites that free the slot `proposed` needs: pull the overlapping
/// predecessor forward, move it behind `proposed`, or push back everything
/// from `proposed`'s start.
fn clearing_operators(sched: &ResourceSchedule, proposed: &Reservation) -> Vec<Box<dyn ScheduleOperator>> {
    let resource = proposed.resource();
    let start = proposed.start_time();
    let proposed_finish = proposed.actual_finish_time().bounded();
    let mut operators: Vec<Box<dyn ScheduleOperator>> = Vec::new();

    if let Some(previous) = timeline::entry_before(sched, start) {
        let finish = previous.actual_finish_time();
        if finish > FinishTime::Bounded(start) {
            if let FinishTime::Bounded(finish) = finish {
                let desired = previous.start_time() - (finish - start);
                operators.push(Box::new(BringForwardScheduleOperator::new(resource.clone(), start, desired)));
            }
            if let Some(proposed_finish) = proposed_finish {
                operators.push(Box::new(PushbackScheduleOperator::new(resource.clone(), previous.start_time(), proposed_finish)));
            }
        }
    }

    let blocked = sched.range(start..).next().is_some_and(|(next_start, _)| proposed_finish.is_none_or(|finish| *next_start < finish));
    if let (true, Some(proposed_finish)) = (blocked, proposed_finish) {
        operators.push(Box::new(PushbackScheduleOperator::new(resource.clone(), start, proposed_finish)));
    }

    operators
}

/// Plans with the min-conflict heuristic: fewest or smallest displacements
/// first, not globally optimal.
#[derive(Debug, Clone)]
pub struct MinConflictPlanner {
    baseline: SharedScheduleState,
    tracker: ConstraintTracker,
    config: PlannerConfig,
}

impl MinConflictPlanner {
    pub fn new(baseline: SharedScheduleState, tracker: ConstraintTracker, config: PlannerConfig) -> Self {
        MinConflictPlanner { baseline, tracker, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
}

impl Planner for MinConflictPlanner {
    fn set_current_schedule(&mut self, state: SharedScheduleState) {
        self.baseline = state;
    }

    fn plan(&self, request: RequestId) -> Result<Box<dyn PlanSet>, PlannerError> {
        let tracked = self.tracker.get_request(request).ok_or(PlannerError::UnknownRequest(request))?;
        if let RequestStatus::Assigned { .. } = tracked.status {
            return Err(PlannerError::AlreadyServed(request));
        }

        let goal = SearchGoal::Admit {
            request,
            participant: tracked.participant,
            alternatives: tracked.alternatives,
            reservation: self.tracker.allocate_reservation_id(),
        };
        log::debug!("Planning admission of request {} over {} resource(s).", request, self.baseline.resource_names().len());

        Ok(Box::new(MinConflictPlanSet::new(goal, self.baseline.clone(), self.baseline.clone(), self.tracker.clone(), self.config.clone())))
    }

    fn cancel(&self, request: RequestId) -> Result<Box<dyn PlanSet>, PlannerError> {
        let tracked = self.tracker.get_request(request).ok_or(PlannerError::UnknownRequest(request))?;
        let RequestStatus::Assigned { reservation, .. } = tracked.status else {
            return Err(PlannerError::NothingToCancel(request));
        };

        let released = self.baseline.get_reservation_by_id(reservation).cloned().ok_or(PlannerError::MissingReservation(reservation))?;
        let mut root = SchedulePatch::new(self.baseline.clone());
        root.cancel_reservation(reservation).map_err(|_| PlannerError::MissingReservation(reservation))?;
        log::debug!("Planning retraction of {} for request {}.", released, request);

        let goal = SearchGoal::Retract { request, released };
        Ok(Box::new(MinConflictPlanSet::new(goal, self.baseline.clone(), Arc::new(root), self.tracker.clone(), self.config.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::request::TimeRange;
    use crate::domain::schedule::schedule_patch::ReservationChange;
    use crate::domain::schedule::schedule_state::CurrentScheduleState;

    fn lane() -> ResourceName {
        ResourceName::new("lane")
    }

    fn window(lower: Time, upper: Time, duration: Time) -> ReservationRequest {
        ReservationRequest::new(lane(), Some(TimeRange::between(lower, upper)), Some(duration), None)
    }

    /// Commits `(start, duration, window)` reservations, each for its own request.
    fn setup(committed: &[(Time, Time, (Time, Time))]) -> (SharedScheduleState, ConstraintTracker) {
        let tracker = ConstraintTracker::new();
        let mut state = CurrentScheduleState::new();

        for (index, (start, duration, (lower, upper))) in committed.iter().enumerate() {
            let request = tracker.add_request(ParticipantId(index as u64), vec![window(*lower, *upper, *duration)], 0);
            let reservation = Reservation::with_duration(ReservationId(index as u64), lane(), ParticipantId(index as u64), *start, *duration);
            tracker.associate_request_with_reservation(request, &reservation).unwrap();
            state.add_reservation(reservation).unwrap();
        }
        (state.into_shared(), tracker)
    }

    fn start_of(patch: &SchedulePatch, id: u64) -> Option<Time> {
        patch.get_reservation_by_id(ReservationId(id)).map(Reservation::start_time)
    }

    #[test]
    fn free_slots_are_yielded_earliest_first_then_exhausted() {
        let (state, tracker) = setup(&[]);
        let request = tracker.add_request(ParticipantId(9), vec![window(10, 20, 5)], 0);
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        let mut plans = planner.plan(request).unwrap();
        let first = plans.next_best().unwrap().unwrap();
        let second = plans.next_best().unwrap().unwrap();

        assert!(matches!(first.changes().as_slice(), [ReservationChange::Added(r)] if r.start_time() == 10));
        assert!(matches!(second.changes().as_slice(), [ReservationChange::Added(r)] if r.start_time() == 20));
        assert!(plans.next_best().unwrap().is_none());
        assert!(plans.next_best().unwrap().is_none());
    }

    #[test]
    fn occupied_slot_is_cleared_with_a_pushback() {
        let (state, tracker) = setup(&[(0, 10, (0, 50))]);
        let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5)], 0);
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        let mut plans = planner.plan(request).unwrap();
        let patch = plans.next_best().unwrap().unwrap();

        assert_eq!(start_of(&patch, 0), Some(5));
        assert_eq!(start_of(&patch, 1), Some(0));
        assert!(timeline::is_consistent(patch.get_schedule(&lane())));
        assert_eq!(patch.changes().len(), 2);
    }

    #[test]
    fn cost_ceiling_prunes_disruptive_candidates() {
        let (state, tracker) = setup(&[(0, 10, (0, 50))]);
        let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5)], 0);
        let config = PlannerConfig { max_cost: Some(0), ..PlannerConfig::default() };
        let planner = MinConflictPlanner::new(state, tracker, config);

        assert!(planner.plan(request).unwrap().next_best().unwrap().is_none());
    }

    #[test]
    fn immovable_neighbour_exhausts_the_search() {
        let (state, tracker) = setup(&[(0, 10, (0, 0))]);
        let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5)], 0);
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        assert!(planner.plan(request).unwrap().next_best().unwrap().is_none());
    }

    #[test]
    fn later_alternative_is_used_when_the_first_is_blocked() {
        let (state, tracker) = setup(&[(0, 10, (0, 0))]);
        let other = ReservationRequest::new(ResourceName::new("bay"), Some(TimeRange::between(0, 0)), Some(5), None);
        let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5), other], 0);
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        let patch = planner.plan(request).unwrap().next_best().unwrap().unwrap();
        assert_eq!(patch.get_schedule(&ResourceName::new("bay")).len(), 1);
        assert_eq!(start_of(&patch, 0), Some(0));
    }

    #[test]
    fn untracked_reservation_in_the_baseline_is_fatal() {
        let tracker = ConstraintTracker::new();
        let mut state = CurrentScheduleState::new();
        state.add_reservation(Reservation::with_duration(ReservationId(40), lane(), ParticipantId(0), 0, 10)).unwrap();
        let request = tracker.add_request(ParticipantId(9), vec![window(0, 0, 5)], 0);
        let planner = MinConflictPlanner::new(state.into_shared(), tracker, PlannerConfig::default());

        let result = planner.plan(request).unwrap().next_best();
        assert!(matches!(result, Err(PlannerError::StaleState(_))));
    }

    #[test]
    fn cancellation_yields_plain_removal_before_gap_closing() {
        let (state, tracker) = setup(&[(0, 10, (0, 100)), (20, 10, (0, 100)), (30, 10, (30, 100))]);
        let request = tracker.get_associated_reservation(ReservationId(0)).unwrap();
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        let mut plans = planner.cancel(request).unwrap();
        let removal = plans.next_best().unwrap().unwrap();
        assert_eq!(removal.changes().len(), 1);
        assert!(start_of(&removal, 0).is_none());

        let closing = plans.next_best().unwrap().unwrap();
        assert_eq!(start_of(&closing, 1), Some(0));
        assert_eq!(start_of(&closing, 2), Some(30));

        assert!(plans.next_best().unwrap().is_none());
    }

    #[test]
    fn planning_rejects_unknown_and_served_requests() {
        let (state, tracker) = setup(&[(0, 10, (0, 100))]);
        let served = tracker.get_associated_reservation(ReservationId(0)).unwrap();
        let pending = tracker.add_request(ParticipantId(3), vec![window(0, 10, 5)], 0);
        let planner = MinConflictPlanner::new(state, tracker, PlannerConfig::default());

        assert!(matches!(planner.plan(RequestId(77)), Err(PlannerError::UnknownRequest(_))));
        assert!(matches!(planner.plan(served), Err(PlannerError::AlreadyServed(_))));
        assert!(matches!(planner.cancel(pending), Err(PlannerError::NothingToCancel(_))));
    }
}
