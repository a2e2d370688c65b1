use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::traffic::conflict_oracle::{ConflictOracle, SweptFootprintOracle};
use crate::domain::traffic::negotiation_table::{NegotiationTable, Rollout};
use crate::domain::traffic::route::{Profile, Route};
use crate::domain::traffic::schedule_view::{ScheduleView, SpacetimeFilter, ViewEntry};
use crate::domain::utils::id::ParticipantId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("Participant {0} is not a rival at this negotiation table.")]
    UnknownRival(ParticipantId),

    #[error("Rollout {index} of rival {rival} is out of range ({count} available).")]
    RolloutOutOfRange { rival: ParticipantId, index: usize, count: usize },
}

/// Checks a candidate route against the itineraries of other participants.
pub trait RouteValidator: Debug + Send + Sync {
    /// First participant whose itinerary conflicts with `route`.
    fn find_conflict(&self, route: &Route) -> Option<ParticipantId>;

    fn clone_box(&self) -> Box<dyn RouteValidator>;
}

impl Clone for Box<dyn RouteValidator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn first_conflict(oracle: &dyn ConflictOracle, profile: &Profile, route: &Route, entries: Vec<ViewEntry>, skip: ParticipantId) -> Option<ParticipantId> {
    entries
        .into_iter()
        .filter(|entry| entry.participant != skip)
        .find(|entry| oracle.conflicts(profile, route.trajectory(), &entry.description.profile, entry.route.trajectory()))
        .map(|entry| entry.participant)
}

/// Validates against the committed schedule, ignoring the validator's own
/// participant.
#[derive(Debug, Clone)]
pub struct ScheduleRouteValidator {
    viewer: Arc<dyn ScheduleView>,
    oracle: Arc<dyn ConflictOracle>,
    participant: ParticipantId,
    profile: Profile,
}

impl ScheduleRouteValidator {
    pub fn new(viewer: Arc<dyn ScheduleView>, participant: ParticipantId, profile: Profile) -> Self {
        Self::with_oracle(viewer, Arc::new(SweptFootprintOracle), participant, profile)
    }

    pub fn with_oracle(viewer: Arc<dyn ScheduleView>, oracle: Arc<dyn ConflictOracle>, participant: ParticipantId, profile: Profile) -> Self {
        ScheduleRouteValidator { viewer, oracle, participant, profile }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

impl RouteValidator for ScheduleRouteValidator {
    fn find_conflict(&self, route: &Route) -> Option<ParticipantId> {
        let entries = self.viewer.query(&SpacetimeFilter::for_route(route));
        log::trace!("Participant {} checks a route on {} against {} itinerary(s).", self.participant, route.map(), entries.len());

        first_conflict(self.oracle.as_ref(), &self.profile, route, entries, self.participant)
    }

    fn clone_box(&self) -> Box<dyn RouteValidator> {
        Box::new(self.clone())
    }
}

/// Validates against one branch of a negotiation table: every rival uses
/// the alternative this validator currently selects for it.
///
/// Clones share the table but own their selection.
#[derive(Debug, Clone)]
pub struct NegotiatingRouteValidator {
    table: Arc<dyn NegotiationTable>,
    oracle: Arc<dyn ConflictOracle>,
    profile: Profile,
    rollouts: Vec<Rollout>,
    selection: Vec<usize>,
}

impl NegotiatingRouteValidator {
    pub fn rollouts(&self) -> &[Rollout] {
        &self.rollouts
    }

    /// Selected alternative per rival, in the table's rival order.
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    fn rival_position(&self, rival: ParticipantId) -> Result<usize, ValidatorError> {
        self.rollouts.iter().position(|rollout| rollout.rival == rival).ok_or(ValidatorError::UnknownRival(rival))
    }

    /// How many alternatives `rival` offers.
    pub fn alternatives(&self, rival: ParticipantId) -> Result<usize, ValidatorError> {
        Ok(self.rollouts[self.rival_position(rival)?].count)
    }

    pub fn selected(&self, rival: ParticipantId) -> Result<usize, ValidatorError> {
        Ok(self.selection[self.rival_position(rival)?])
    }

    /// Copy of this validator looking at alternative `index` of `rival`.
    pub fn with_rollout(&self, rival: ParticipantId, index: usize) -> Result<Self, ValidatorError> {
        let position = self.rival_position(rival)?;
        let count = self.rollouts[position].count;
        if index >= count {
            return Err(ValidatorError::RolloutOutOfRange { rival, index, count });
        }

        let mut branch = self.clone();
        branch.selection[position] = index;
        Ok(branch)
    }

    /// Copy of this validator looking at the next alternative of `rival`.
    pub fn next(&self, rival: ParticipantId) -> Result<Self, ValidatorError> {
        self.with_rollout(rival, self.selected(rival)? + 1)
    }
}

impl RouteValidator for NegotiatingRouteValidator {
    fn find_conflict(&self, route: &Route) -> Option<ParticipantId> {
        let entries = self.table.query(&SpacetimeFilter::for_route(route), &self.selection);
        log::trace!("Negotiating check on {} with selection {:?} against {} itinerary(s).", route.map(), self.selection, entries.len());

        first_conflict(self.oracle.as_ref(), &self.profile, route, entries, self.table.owner())
    }

    fn clone_box(&self) -> Box<dyn RouteValidator> {
        Box::new(self.clone())
    }
}

/// Produces negotiating validators bound to one table and profile.
#[derive(Debug, Clone)]
pub struct Generator {
    table: Arc<dyn NegotiationTable>,
    oracle: Arc<dyn ConflictOracle>,
    profile: Profile,
    rollouts: Vec<Rollout>,
}

impl Generator {
    pub fn new(table: Arc<dyn NegotiationTable>, profile: Profile) -> Self {
        Self::with_oracle(table, Arc::new(SweptFootprintOracle), profile)
    }

    pub fn with_oracle(table: Arc<dyn NegotiationTable>, oracle: Arc<dyn ConflictOracle>, profile: Profile) -> Self {
        let rollouts = table.rollouts();
        Generator { table, oracle, profile, rollouts }
    }

    /// Every rival on its most preferred alternative.
    pub fn begin(&self) -> NegotiatingRouteValidator {
        NegotiatingRouteValidator {
            table: self.table.clone(),
            oracle: self.oracle.clone(),
            profile: self.profile,
            rollouts: self.rollouts.clone(),
            selection: vec![0; self.rollouts.len()],
        }
    }

    /// One validator per combination of rival alternatives, the first rival
    /// varying fastest. Empty if some rival offers no alternative.
    pub fn all(&self) -> Vec<NegotiatingRouteValidator> {
        if self.rollouts.iter().any(|rollout| rollout.count == 0) {
            return Vec::new();
        }

        let mut validators = Vec::new();
        let mut current = self.begin();
        loop {
            validators.push(current.clone());

            let Some(position) = current.selection.iter().zip(&self.rollouts).position(|(index, rollout)| index + 1 < rollout.count) else {
                break;
            };
            current.selection[position] += 1;
            current.selection[..position].iter_mut().for_each(|index| *index = 0);
        }
        validators
    }
}
