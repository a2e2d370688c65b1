use std::fmt::{self, Debug, Display};

use thiserror::Error;

use crate::domain::reservation::constraint_tracker::ConstraintTracker;
use crate::domain::reservation::reservation::{FinishTime, Reservation};
use crate::domain::reservation::timeline::ScheduleError;
use crate::domain::schedule::schedule_patch::SchedulePatch;
use crate::domain::schedule::schedule_state::{ScheduleWriter, SharedScheduleState};
use crate::domain::utils::Time;
use crate::domain::utils::id::{RequestId, ReservationId, ResourceName};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperatorError {
    /// One link of the chain is rejected by the request it serves.
    #[error("Moving reservation {reservation} would violate request {request}.")]
    Infeasible { reservation: ReservationId, request: RequestId },

    /// The chain is valid link by link but breaks the no-overlap invariant
    /// once written.
    #[error("Proposed chain could not be committed: {0}")]
    CommitConflict(#[from] ScheduleError),

    /// The state references a reservation the tracker never recorded.
    #[error("Reservation {0} is not linked to any request.")]
    UnknownReservation(ReservationId),
}

impl OperatorError {
    /// Only stale or corrupted states are fatal; every other failure just
    /// means this rewrite is infeasible.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OperatorError::UnknownReservation(_))
    }
}

/// A unit rewrite rule over one resource timeline.
///
/// Applying an operator never mutates `state`: it either returns a patch with
/// the whole rewrite or an error, never a partial result.
pub trait ScheduleOperator: Debug + Display + Send + Sync {
    fn apply(&self, state: &SharedScheduleState, tracker: &ConstraintTracker) -> Result<SchedulePatch, OperatorError>;
}

/// Delays the reservations from `start_time` on so the first of them starts
/// at `desired_time`, pushing successors as far as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushbackScheduleOperator {
    pub resource_name: ResourceName,
    pub start_time: Time,
    pub desired_time: Time,
}

/// Moves the last reservation starting before `start_time` so it starts at
/// `desired_time`, pulling its predecessors earlier as far as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BringForwardScheduleOperator {
    pub resource_name: ResourceName,
    pub start_time: Time,
    pub desired_time: Time,
}

impl PushbackScheduleOperator {
    pub fn new(resource_name: ResourceName, start_time: Time, desired_time: Time) -> Self {
        PushbackScheduleOperator { resource_name, start_time, desired_time }
    }
}

impl BringForwardScheduleOperator {
    pub fn new(resource_name: ResourceName, start_time: Time, desired_time: Time) -> Self {
        BringForwardScheduleOperator { resource_name, start_time, desired_time }
    }
}

fn check_link(tracker: &ConstraintTracker, proposed: &Reservation) -> Result<(), OperatorError> {
    let request = tracker.get_associated_reservation(proposed.id()).ok_or_else(|| {
        log::error!("Reservation {} is not linked to any request, the schedule state is stale.", proposed.id());
        OperatorError::UnknownReservation(proposed.id())
    })?;

    if !tracker.satisfies(request, proposed) {
        log::debug!("Proposal {} violates request {}.", proposed, request);
        return Err(OperatorError::Infeasible { reservation: proposed.id(), request });
    }
    Ok(())
}

/// Writes the chain latest link first, so each slot is vacated before the
/// next write needs it.
fn commit_reversed(state: &SharedScheduleState, proposal: Vec<Reservation>) -> Result<SchedulePatch, OperatorError> {
    let mut patch = SchedulePatch::new(state.clone());
    for proposed in proposal.into_iter().rev() {
        patch.update_reservation(proposed)?;
    }
    Ok(patch)
}

/// Copy of `reservation` shifted earlier so it ends exactly at `boundary`,
/// keeping its occupied length.
fn finish_by(reservation: &Reservation, finish: Time, boundary: Time) -> Reservation {
    let moved = reservation.propose_new_start_time(reservation.start_time() - (finish - boundary));
    match moved.actual_finish_time() {
        FinishTime::Bounded(moved_finish) if moved_finish <= boundary => moved,
        _ => moved.propose_new_finish_time(boundary),
    }
}

impl ScheduleOperator for PushbackScheduleOperator {
    fn apply(&self, state: &SharedScheduleState, tracker: &ConstraintTracker) -> Result<SchedulePatch, OperatorError> {
        let sched = state.get_schedule(&self.resource_name);
        let mut proposal: Vec<Reservation> = Vec::new();
        let mut next_time = self.desired_time;

        for reservation in sched.range(self.start_time..).map(|(_, reservation)| reservation) {
            // The chain ends at the first reservation that does not have to move.
            if reservation.start_time() >= next_time {
                break;
            }

            let proposed = reservation.propose_new_start_time(next_time);
            check_link(tracker, &proposed)?;

            let finish = proposed.actual_finish_time();
            proposal.push(proposed);

            match finish {
                FinishTime::Bounded(finish) => next_time = finish,
                FinishTime::Unbounded => break,
            }
        }

        log::trace!("{} proposes {} move(s).", self, proposal.len());
        commit_reversed(state, proposal)
    }
}

impl ScheduleOperator for BringForwardScheduleOperator {
    fn apply(&self, state: &SharedScheduleState, tracker: &ConstraintTracker) -> Result<SchedulePatch, OperatorError> {
        let sched = state.get_schedule(&self.resource_name);
        let mut proposal: Vec<Reservation> = Vec::new();
        let mut candidates = sched.range(..self.start_time).rev().map(|(_, reservation)| reservation);

        if let Some(first) = candidates.next().filter(|first| first.start_time() > self.desired_time) {
            let proposed = first.propose_new_start_time(self.desired_time);
            check_link(tracker, &proposed)?;
            let mut boundary = proposed.start_time();
            proposal.push(proposed);

            for predecessor in candidates {
                // No instant to hand off to past an unbounded reservation.
                let FinishTime::Bounded(finish) = predecessor.actual_finish_time() else {
                    break;
                };
                if finish <= boundary {
                    break;
                }

                let proposed = finish_by(predecessor, finish, boundary);
                check_link(tracker, &proposed)?;
                boundary = proposed.start_time();
                proposal.push(proposed);
            }
        }

        log::trace!("{} proposes {} move(s).", self, proposal.len());
        commit_reversed(state, proposal)
    }
}

impl Display for PushbackScheduleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pushback({} from {} to {})", self.resource_name, self.start_time, self.desired_time)
    }
}

impl Display for BringForwardScheduleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BringForward({} before {} to {})", self.resource_name, self.start_time, self.desired_time)
    }
}
