use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use thiserror::Error;

use crate::domain::reservation::reservation::{FinishTime, Reservation};
use crate::domain::utils::Time;
use crate::domain::utils::id::{ReservationId, ResourceName};

/// Reservations of one resource keyed by start time.
pub type ResourceSchedule = BTreeMap<Time, Reservation>;

/// Shared empty timeline for resources a state knows nothing about.
pub static EMPTY_SCHEDULE: ResourceSchedule = BTreeMap::new();

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Reservation {0} is already part of the schedule.")]
    DuplicateReservation(ReservationId),

    #[error("Reservation {0} is not part of the schedule.")]
    UnknownReservation(ReservationId),

    #[error("Reservation {reservation} overlaps reservation {conflicting} on resource {resource}.")]
    Overlap { resource: ResourceName, reservation: ReservationId, conflicting: ReservationId },

    #[error("Reservation {reservation} would follow the unbounded reservation {unbounded} on resource {resource}.")]
    TrailingUnbounded { resource: ResourceName, reservation: ReservationId, unbounded: ReservationId },
}

/// Free interval between two consecutive bounded reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub previous: ReservationId,
    pub next: ReservationId,
    pub start: Time,
    pub end: Time,
}

impl Gap {
    pub fn length(&self) -> Time {
        self.end - self.start
    }
}

/// Last reservation starting strictly before `time`.
pub fn entry_before(timeline: &ResourceSchedule, time: Time) -> Option<&Reservation> {
    timeline.range(..time).next_back().map(|(_, reservation)| reservation)
}

/// First reservation starting strictly after `time`.
pub fn entry_after(timeline: &ResourceSchedule, time: Time) -> Option<&Reservation> {
    timeline.range((Excluded(time), Unbounded)).next().map(|(_, reservation)| reservation)
}

/// Checks that `candidate` can be placed into `timeline` without breaking the
/// no-overlap invariant. `candidate` itself must not be part of `timeline`.
pub fn check_insertion(timeline: &ResourceSchedule, candidate: &Reservation) -> Result<(), ScheduleError> {
    let start = candidate.start_time();
    let resource = candidate.resource().clone();

    if let Some(occupant) = timeline.get(&start) {
        return Err(ScheduleError::Overlap { resource, reservation: candidate.id(), conflicting: occupant.id() });
    }

    if let Some(previous) = entry_before(timeline, start) {
        match previous.actual_finish_time() {
            FinishTime::Unbounded => {
                return Err(ScheduleError::TrailingUnbounded { resource, reservation: candidate.id(), unbounded: previous.id() });
            }
            FinishTime::Bounded(finish) if finish > start => {
                return Err(ScheduleError::Overlap { resource, reservation: candidate.id(), conflicting: previous.id() });
            }
            FinishTime::Bounded(_) => {}
        }
    }

    if let Some(next) = entry_after(timeline, start) {
        match candidate.actual_finish_time() {
            FinishTime::Unbounded => {
                return Err(ScheduleError::TrailingUnbounded { resource, reservation: next.id(), unbounded: candidate.id() });
            }
            FinishTime::Bounded(finish) if finish > next.start_time() => {
                return Err(ScheduleError::Overlap { resource, reservation: candidate.id(), conflicting: next.id() });
            }
            FinishTime::Bounded(_) => {}
        }
    }

    Ok(())
}

/// First pair of adjacent reservations violating the no-overlap invariant.
pub fn find_overlap(timeline: &ResourceSchedule) -> Option<(ReservationId, ReservationId)> {
    let mut entries = timeline.values();
    let mut previous = entries.next()?;

    for next in entries {
        let violates = match previous.actual_finish_time() {
            FinishTime::Unbounded => true,
            FinishTime::Bounded(finish) => finish > next.start_time(),
        };
        if violates {
            return Some((previous.id(), next.id()));
        }
        previous = next;
    }
    None
}

pub fn is_consistent(timeline: &ResourceSchedule) -> bool {
    find_overlap(timeline).is_none()
}

/// All non-empty gaps of the timeline in chronological order.
pub fn gaps(timeline: &ResourceSchedule) -> Vec<Gap> {
    timeline
        .values()
        .zip(timeline.values().skip(1))
        .filter_map(|(previous, next)| {
            let start = previous.actual_finish_time().bounded()?;
            let end = next.start_time();
            (end > start).then(|| Gap { previous: previous.id(), next: next.id(), start, end })
        })
        .collect()
}
