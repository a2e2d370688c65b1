use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::domain::reservation::reservation::Reservation;
use crate::domain::reservation::timeline::{self, EMPTY_SCHEDULE, ResourceSchedule, ScheduleError};
use crate::domain::schedule::schedule_patch::SchedulePatch;
use crate::domain::utils::Time;
use crate::domain::utils::id::{ReservationId, ResourceName};

/// Read access to a snapshot of reservations on all resources.
///
/// States are never mutated once shared; readers on any thread may hold the
/// same state concurrently.
pub trait AbstractScheduleState: Debug + Send + Sync {
    /// Timeline of `resource` ordered by start time. Unknown resources have an
    /// empty timeline.
    fn get_schedule(&self, resource: &ResourceName) -> &ResourceSchedule;

    fn get_reservation_by_id(&self, id: ReservationId) -> Option<&Reservation>;

    /// Every resource with a timeline in this state, sorted.
    fn resource_names(&self) -> Vec<ResourceName>;
}

pub type SharedScheduleState = Arc<dyn AbstractScheduleState>;

/// Mutations shared by the committed schedule and patches. Each call either
/// applies completely or leaves the state untouched.
pub trait ScheduleWriter {
    fn add_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError>;

    /// Replaces the reservation carrying the same id.
    fn update_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError>;

    /// Removes the reservation and returns it.
    fn cancel_reservation(&mut self, id: ReservationId) -> Result<Reservation, ScheduleError>;
}

/// The committed schedule. Every write is checked against the no-overlap
/// invariant.
#[derive(Debug, Clone, Default)]
pub struct CurrentScheduleState {
    resource_schedules: HashMap<ResourceName, ResourceSchedule>,
    reservation_mapping: HashMap<ReservationId, (ResourceName, Time)>,
}

impl CurrentScheduleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reservation_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservation_mapping.is_empty()
    }

    /// Freezes this state into a shareable baseline.
    pub fn into_shared(self) -> SharedScheduleState {
        Arc::new(self)
    }

    /// Takes over the patch's view of every resource it touched.
    ///
    /// The patch has to be derived from a snapshot of this state; otherwise
    /// changes made here since the snapshot are overwritten.
    pub fn apply_patch(&mut self, patch: &SchedulePatch) -> Result<(), ScheduleError> {
        for resource in patch.overlaid_resources() {
            let replacement = patch.get_schedule(resource);
            if let Some((previous, next)) = timeline::find_overlap(replacement) {
                return Err(ScheduleError::Overlap { resource: resource.clone(), reservation: next, conflicting: previous });
            }
        }

        for resource in patch.overlaid_resources() {
            if let Some(old) = self.resource_schedules.remove(resource) {
                for reservation in old.values() {
                    self.reservation_mapping.remove(&reservation.id());
                }
            }

            let replacement = patch.get_schedule(resource).clone();
            for (start, reservation) in replacement.iter() {
                self.reservation_mapping.insert(reservation.id(), (resource.clone(), *start));
            }
            self.resource_schedules.insert(resource.clone(), replacement);
        }

        log::debug!("Applied patch touching {} resource(s); schedule now holds {} reservation(s).", patch.overlaid_resources().len(), self.len());
        Ok(())
    }
}

impl AbstractScheduleState for CurrentScheduleState {
    fn get_schedule(&self, resource: &ResourceName) -> &ResourceSchedule {
        self.resource_schedules.get(resource).unwrap_or(&EMPTY_SCHEDULE)
    }

    fn get_reservation_by_id(&self, id: ReservationId) -> Option<&Reservation> {
        let (resource, start) = self.reservation_mapping.get(&id)?;
        self.resource_schedules.get(resource)?.get(start)
    }

    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names: Vec<ResourceName> = self.resource_schedules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ScheduleWriter for CurrentScheduleState {
    fn add_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError> {
        let id = reservation.id();
        if self.reservation_mapping.contains_key(&id) {
            return Err(ScheduleError::DuplicateReservation(id));
        }

        let resource = reservation.resource().clone();
        let schedule = self.resource_schedules.entry(resource.clone()).or_default();
        timeline::check_insertion(schedule, &reservation)?;

        let start = reservation.start_time();
        schedule.insert(start, reservation);
        self.reservation_mapping.insert(id, (resource, start));
        Ok(())
    }

    fn update_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError> {
        let original = self.cancel_reservation(reservation.id())?;

        if let Err(e) = self.add_reservation(reservation) {
            self.add_reservation(original)?;
            return Err(e);
        }
        Ok(())
    }

    fn cancel_reservation(&mut self, id: ReservationId) -> Result<Reservation, ScheduleError> {
        let (resource, start) = self.reservation_mapping.remove(&id).ok_or(ScheduleError::UnknownReservation(id))?;

        self.resource_schedules.get_mut(&resource).and_then(|schedule| schedule.remove(&start)).ok_or(ScheduleError::UnknownReservation(id))
    }
}
