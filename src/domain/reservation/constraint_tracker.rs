use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::domain::reservation::request::ReservationRequest;
use crate::domain::reservation::reservation::{FinishTime, Reservation};
use crate::domain::utils::id::{ParticipantId, RequestId, ReservationId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Request {0} is not tracked.")]
    UnknownRequest(RequestId),

    #[error("Reservation {reservation} satisfies none of the alternatives of request {request}.")]
    Unsatisfied { request: RequestId, reservation: ReservationId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Admitted but not yet served by a reservation.
    Pending,

    /// Served by `reservation`, which satisfies the alternative at `alternative`.
    Assigned { alternative: usize, reservation: ReservationId },
}

/// A request as the tracker knows it: its alternatives in order of
/// preference and how it is currently served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRequest {
    pub participant: ParticipantId,
    pub alternatives: Vec<ReservationRequest>,
    pub priority: i32,
    pub status: RequestStatus,
}

#[derive(Debug, Default)]
struct TrackerInner {
    requests: HashMap<RequestId, TrackedRequest>,

    /// Index lookup of the request an active reservation serves.
    active_reservations: HashMap<ReservationId, RequestId>,

    next_request_id: u64,
    next_reservation_id: u64,
}

/// Links reservations to the requests they were made for and evaluates
/// whether a proposed reservation still honours its request.
///
/// Clones share the same state; one tracker lives as long as the planning
/// session owning it.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTracker {
    inner: Arc<RwLock<TrackerInner>>,
}

impl ConstraintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a request with its alternatives in order of preference.
    pub fn add_request(&self, participant: ParticipantId, alternatives: Vec<ReservationRequest>, priority: i32) -> RequestId {
        let mut guard = self.write();
        let request_id = RequestId(guard.next_request_id);
        guard.next_request_id += 1;
        guard.requests.insert(request_id, TrackedRequest { participant, alternatives, priority, status: RequestStatus::Pending });

        log::debug!("Tracking request {} of participant {} (priority {}).", request_id, participant, priority);
        request_id
    }

    /// Hands out a reservation id that is unused within this tracker.
    pub fn allocate_reservation_id(&self) -> ReservationId {
        let mut guard = self.write();
        let id = ReservationId(guard.next_reservation_id);
        guard.next_reservation_id += 1;
        id
    }

    /// Marks `request_id` as served by `reservation`.
    ///
    /// # Returns
    /// The index of the first alternative the reservation satisfies.
    pub fn associate_request_with_reservation(&self, request_id: RequestId, reservation: &Reservation) -> Result<usize, TrackerError> {
        let mut guard = self.write();
        let tracked = guard.requests.get(&request_id).ok_or(TrackerError::UnknownRequest(request_id))?;

        let alternative = first_satisfied(&tracked.alternatives, reservation)
            .ok_or(TrackerError::Unsatisfied { request: request_id, reservation: reservation.id() })?;

        let previous = match tracked.status {
            RequestStatus::Assigned { reservation, .. } => Some(reservation),
            RequestStatus::Pending => None,
        };
        if let Some(previous) = previous {
            guard.active_reservations.remove(&previous);
        }

        let reservation_id = reservation.id();
        if let Some(tracked) = guard.requests.get_mut(&request_id) {
            tracked.status = RequestStatus::Assigned { alternative, reservation: reservation_id };
        }
        guard.active_reservations.insert(reservation_id, request_id);
        guard.next_reservation_id = guard.next_reservation_id.max(reservation_id.0 + 1);

        Ok(alternative)
    }

    /// Forgets the request and the reservation serving it.
    pub fn remove_request(&self, request_id: RequestId) -> bool {
        let mut guard = self.write();
        let Some(tracked) = guard.requests.remove(&request_id) else {
            return false;
        };

        if let RequestStatus::Assigned { reservation, .. } = tracked.status {
            guard.active_reservations.remove(&reservation);
        }
        true
    }

    /// The request an active reservation was made for.
    ///
    /// `None` means the reservation was never recorded, which points at a
    /// stale or corrupted schedule state upstream.
    pub fn get_associated_reservation(&self, reservation_id: ReservationId) -> Option<RequestId> {
        self.read().active_reservations.get(&reservation_id).copied()
    }

    /// The reservation currently serving `request_id`, if any.
    pub fn get_reservation_for_request(&self, request_id: RequestId) -> Option<ReservationId> {
        match self.read().requests.get(&request_id)?.status {
            RequestStatus::Assigned { reservation, .. } => Some(reservation),
            RequestStatus::Pending => None,
        }
    }

    pub fn get_request(&self, request_id: RequestId) -> Option<TrackedRequest> {
        self.read().requests.get(&request_id).cloned()
    }

    pub fn request_ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self.read().requests.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Index of the first alternative of `request_id` that `reservation`
    /// satisfies.
    pub fn satisfies_any(&self, request_id: RequestId, reservation: &Reservation) -> Option<usize> {
        let guard = self.read();
        first_satisfied(&guard.requests.get(&request_id)?.alternatives, reservation)
    }

    /// Whether the proposed reservation honours at least one alternative of
    /// `request_id`. Unknown requests are never satisfied.
    pub fn satisfies(&self, request_id: RequestId, reservation: &Reservation) -> bool {
        self.satisfies_any(request_id, reservation).is_some()
    }

    /// Evaluates a single request against a proposed reservation.
    pub fn satisfies_request(request: &ReservationRequest, reservation: &Reservation) -> bool {
        if request.resource() != reservation.resource() {
            return false;
        }

        if let Some(range) = request.start() {
            if !range.contains(reservation.start_time()) {
                return false;
            }
        }

        if request.is_indefinite() != reservation.is_indefinite() {
            return false;
        }

        let finish = reservation.actual_finish_time();

        if let Some(duration) = request.duration() {
            match finish {
                FinishTime::Unbounded => return false,
                FinishTime::Bounded(finish) if finish - reservation.start_time() < duration => return false,
                FinishTime::Bounded(_) => {}
            }
        }

        if let Some(required_finish) = request.finish() {
            match finish {
                FinishTime::Unbounded => return false,
                FinishTime::Bounded(finish) if finish < required_finish => return false,
                FinishTime::Bounded(_) => {}
            }
        }

        true
    }
}

fn first_satisfied(alternatives: &[ReservationRequest], reservation: &Reservation) -> Option<usize> {
    alternatives.iter().position(|request| ConstraintTracker::satisfies_request(request, reservation))
}
