use thiserror::Error;

use crate::domain::planner::schedule_operator::OperatorError;
use crate::domain::schedule::schedule_patch::SchedulePatch;
use crate::domain::schedule::schedule_state::SharedScheduleState;
use crate::domain::utils::id::{RequestId, ReservationId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("Request {0} is not tracked.")]
    UnknownRequest(RequestId),

    #[error("Request {0} is already served by a reservation.")]
    AlreadyServed(RequestId),

    #[error("Request {0} is not served by any reservation.")]
    NothingToCancel(RequestId),

    #[error("Reservation {0} of the tracker is missing from the baseline schedule.")]
    MissingReservation(ReservationId),

    /// The baseline references reservations the tracker does not know.
    #[error("Planning baseline is stale: {0}")]
    StaleState(OperatorError),
}

/// Lazily produced candidates, lowest disruption first.
///
/// A plan set belongs to the baseline it was created from. It is not
/// restartable: every call continues where the previous one stopped.
pub trait PlanSet: Send {
    /// `Ok(None)` once no further candidate exists.
    fn next_best(&mut self) -> Result<Option<SchedulePatch>, PlannerError>;
}

pub trait Planner {
    /// Installs the baseline that later `plan`/`cancel` calls start from.
    /// Plan sets created before are stale afterwards.
    fn set_current_schedule(&mut self, state: SharedScheduleState);

    /// Starts a search for ways to admit `request`.
    fn plan(&self, request: RequestId) -> Result<Box<dyn PlanSet>, PlannerError>;

    /// Starts a search for ways to retract the reservation serving `request`.
    fn cancel(&self, request: RequestId) -> Result<Box<dyn PlanSet>, PlannerError>;
}
