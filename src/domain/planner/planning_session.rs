use std::sync::Arc;

use crate::domain::planner::min_conflict_planner::MinConflictPlanner;
use crate::domain::planner::planner::Planner;
use crate::domain::planner::planner_config::PlannerConfig;
use crate::domain::reservation::constraint_tracker::ConstraintTracker;
use crate::domain::reservation::request::ReservationRequest;
use crate::domain::schedule::schedule_patch::{ReservationChange, SchedulePatch};
use crate::domain::schedule::schedule_state::{CurrentScheduleState, SharedScheduleState};
use crate::domain::utils::id::{ParticipantId, RequestId, ReservationId};
use crate::error::{Error, Result};

/// Committed schedule and tracker of one planning session.
///
/// Every committed patch becomes the baseline of the next search. Patches
/// are only accepted on top of the baseline they were planned from.
#[derive(Debug)]
pub struct PlanningSession {
    schedule: Arc<CurrentScheduleState>,
    tracker: ConstraintTracker,
    config: PlannerConfig,
}

impl PlanningSession {
    pub fn new(schedule: CurrentScheduleState, tracker: ConstraintTracker, config: PlannerConfig) -> Self {
        PlanningSession { schedule: Arc::new(schedule), tracker, config }
    }

    pub fn schedule(&self) -> &CurrentScheduleState {
        &self.schedule
    }

    pub fn tracker(&self) -> &ConstraintTracker {
        &self.tracker
    }

    pub fn set_config(&mut self, config: PlannerConfig) {
        self.config = config;
    }

    fn baseline(&self) -> SharedScheduleState {
        self.schedule.clone()
    }

    /// A planner over a snapshot of the committed schedule.
    pub fn planner(&self) -> MinConflictPlanner {
        MinConflictPlanner::new(self.baseline(), self.tracker.clone(), self.config.clone())
    }

    /// Up to `limit` ways to admit `request`, best first.
    pub fn candidates(&self, request: RequestId, limit: usize) -> Result<Vec<SchedulePatch>> {
        let mut plans = self.planner().plan(request)?;
        let mut candidates = Vec::new();

        while candidates.len() < limit {
            match plans.next_best()? {
                Some(patch) => candidates.push(patch),
                None => break,
            }
        }
        Ok(candidates)
    }

    /// Admits a new request and commits the best plan for it.
    ///
    /// # Returns
    /// The request id and, if the request could be placed, its reservation.
    /// Requests without a feasible plan stay pending.
    pub fn request(&mut self, participant: ParticipantId, alternatives: Vec<ReservationRequest>, priority: i32) -> Result<(RequestId, Option<ReservationId>)> {
        let request = self.tracker.add_request(participant, alternatives, priority);
        Ok((request, self.place(request)?))
    }

    /// Commits the best plan for a pending request, if there is one.
    pub fn place(&mut self, request: RequestId) -> Result<Option<ReservationId>> {
        let Some(patch) = self.planner().plan(request)?.next_best()? else {
            log::info!("No feasible placement for request {}, it stays pending.", request);
            return Ok(None);
        };
        self.commit_admission(request, &patch).map(Some)
    }

    /// Materialises a candidate of `plan(request)` as the new baseline.
    pub fn commit_admission(&mut self, request: RequestId, patch: &SchedulePatch) -> Result<ReservationId> {
        let added = patch
            .changes()
            .into_iter()
            .find_map(|change| match change {
                ReservationChange::Added(reservation) => Some(reservation),
                _ => None,
            })
            .ok_or_else(|| Error::InvalidPatch(format!("patch for request {} adds no reservation", request)))?;

        if !self.tracker.satisfies(request, &added) {
            return Err(Error::InvalidPatch(format!("{} does not serve request {}", added, request)));
        }

        self.apply(patch)?;
        self.tracker.associate_request_with_reservation(request, &added)?;
        log::info!("Request {} served by {}; {} other reservation(s) moved.", request, added, patch.changes().len() - 1);
        Ok(added.id())
    }

    /// Retracts the reservation of `request` with the best plan and forgets
    /// the request.
    pub fn cancel(&mut self, request: RequestId) -> Result<bool> {
        let Some(patch) = self.planner().cancel(request)?.next_best()? else {
            return Ok(false);
        };

        self.apply(&patch)?;
        self.tracker.remove_request(request);
        log::info!("Request {} cancelled; {} change(s) applied.", request, patch.changes().len());
        Ok(true)
    }

    /// Writes `patch` into the committed schedule and re-links every
    /// reservation it moved, so the tracker knows which alternative each one
    /// serves now.
    fn apply(&mut self, patch: &SchedulePatch) -> Result<()> {
        if !Arc::ptr_eq(patch.parent(), &self.baseline()) {
            return Err(Error::InvalidPatch("patch was planned against an outdated schedule".to_string()));
        }

        Arc::make_mut(&mut self.schedule).apply_patch(patch)?;

        for change in patch.changes() {
            if let ReservationChange::Moved { after, .. } = change {
                let Some(request) = self.tracker.get_associated_reservation(after.id()) else {
                    log::error!("Moved reservation {} is not linked to any request.", after.id());
                    continue;
                };
                let alternative = self.tracker.associate_request_with_reservation(request, &after)?;
                log::debug!("Request {} now served by {} under alternative {}.", request, after, alternative);
            }
        }
        Ok(())
    }
}
