use std::fmt;

use crate::domain::utils::id::{ParticipantId, ReservationId, ResourceName};
use crate::domain::utils::{Duration, Time};

/// When a reservation releases its resource.
///
/// `Unbounded` reservations hold the resource indefinitely, so nothing may be
/// booked after them and chained rewrites cannot continue past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FinishTime {
    Bounded(Time),
    Unbounded,
}

impl FinishTime {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, FinishTime::Unbounded)
    }

    pub fn bounded(&self) -> Option<Time> {
        match self {
            FinishTime::Bounded(time) => Some(*time),
            FinishTime::Unbounded => None,
        }
    }
}

impl fmt::Display for FinishTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishTime::Bounded(time) => write!(f, "{}", time),
            FinishTime::Unbounded => write!(f, "inf"),
        }
    }
}

/// A time-bounded claim on exactly one named resource.
///
/// The occupied interval is `[start_time, actual_finish_time)`. A reservation
/// may carry a duration, a fixed finish, both (the later end wins) or neither
/// (indefinite).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reservation {
    id: ReservationId,
    resource: ResourceName,
    participant: ParticipantId,
    start_time: Time,
    duration: Option<Duration>,
    finish_time: Option<Time>,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        resource: ResourceName,
        participant: ParticipantId,
        start_time: Time,
        duration: Option<Duration>,
        finish_time: Option<Time>,
    ) -> Self {
        Reservation { id, resource, participant, start_time, duration, finish_time }
    }

    /// Reservation occupying `[start_time, start_time + duration)`.
    pub fn with_duration(id: ReservationId, resource: ResourceName, participant: ParticipantId, start_time: Time, duration: Duration) -> Self {
        Self::new(id, resource, participant, start_time, Some(duration), None)
    }

    /// Reservation that never releases its resource.
    pub fn indefinite(id: ReservationId, resource: ResourceName, participant: ParticipantId, start_time: Time) -> Self {
        Self::new(id, resource, participant, start_time, None, None)
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn finish_time(&self) -> Option<Time> {
        self.finish_time
    }

    pub fn is_indefinite(&self) -> bool {
        self.duration.is_none() && self.finish_time.is_none()
    }

    pub fn actual_finish_time(&self) -> FinishTime {
        match (self.duration, self.finish_time) {
            (None, None) => FinishTime::Unbounded,
            (Some(duration), Some(finish)) => FinishTime::Bounded((self.start_time + duration).max(finish)),
            (Some(duration), None) => FinishTime::Bounded(self.start_time + duration),
            (None, Some(finish)) => FinishTime::Bounded(self.start_time.max(finish)),
        }
    }

    /// Length of the occupied interval, `None` for indefinite reservations.
    pub fn occupied_length(&self) -> Option<Duration> {
        self.actual_finish_time().bounded().map(|finish| finish - self.start_time)
    }

    /// Copy of this reservation starting at `start_time`.
    ///
    /// A fixed finish time is kept as is, so a finish-only reservation that is
    /// moved later shrinks instead of shifting.
    pub fn propose_new_start_time(&self, start_time: Time) -> Reservation {
        Reservation { start_time, ..self.clone() }
    }

    /// Copy of this reservation ending exactly at `finish_time`.
    ///
    /// The start is kept unless it would lie after the new finish.
    pub fn propose_new_finish_time(&self, finish_time: Time) -> Reservation {
        let start_time = self.start_time.min(finish_time);
        Reservation { start_time, duration: Some(finish_time - start_time), finish_time: Some(finish_time), ..self.clone() }
    }

    /// Whether the two occupied intervals intersect.
    pub fn overlaps(&self, other: &Reservation) -> bool {
        let ends_after = |finish: FinishTime, start: Time| match finish {
            FinishTime::Bounded(finish) => finish > start,
            FinishTime::Unbounded => true,
        };
        ends_after(self.actual_finish_time(), other.start_time) && ends_after(other.actual_finish_time(), self.start_time)
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} on {} [{}, {})", self.id, self.resource, self.start_time, self.actual_finish_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(start: Time, duration: Option<Duration>, finish: Option<Time>) -> Reservation {
        Reservation::new(ReservationId(1), ResourceName::new("lane_a"), ParticipantId(0), start, duration, finish)
    }

    #[test]
    fn actual_finish_takes_the_later_end() {
        assert_eq!(res(0, Some(10), None).actual_finish_time(), FinishTime::Bounded(10));
        assert_eq!(res(0, Some(10), Some(25)).actual_finish_time(), FinishTime::Bounded(25));
        assert_eq!(res(20, Some(10), Some(25)).actual_finish_time(), FinishTime::Bounded(30));
        assert_eq!(res(30, None, Some(25)).actual_finish_time(), FinishTime::Bounded(30));
        assert_eq!(res(0, None, None).actual_finish_time(), FinishTime::Unbounded);
    }

    #[test]
    fn proposals_leave_the_original_untouched() {
        let original = res(0, Some(10), None);
        let moved = original.propose_new_start_time(15);

        assert_eq!(original.start_time(), 0);
        assert_eq!(moved.start_time(), 15);
        assert_eq!(moved.actual_finish_time(), FinishTime::Bounded(25));
        assert_eq!(moved.id(), original.id());

        let trimmed = original.propose_new_finish_time(6);
        assert_eq!(trimmed.start_time(), 0);
        assert_eq!(trimmed.actual_finish_time(), FinishTime::Bounded(6));
    }

    #[test]
    fn half_open_intervals_touching_do_not_overlap() {
        let a = res(0, Some(10), None);
        let b = res(10, Some(10), None);
        let unbounded = res(5, None, None);

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&unbounded));
        assert!(b.overlaps(&unbounded));
    }

    #[test]
    fn unbounded_orders_after_every_instant() {
        assert!(FinishTime::Bounded(i64::MAX) < FinishTime::Unbounded);
        assert_eq!(FinishTime::Unbounded.to_string(), "inf");
    }
}
