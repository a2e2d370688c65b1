use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::reservation::reservation::Reservation;
use crate::domain::reservation::timeline::{self, ResourceSchedule, ScheduleError};
use crate::domain::schedule::schedule_state::{AbstractScheduleState, ScheduleWriter, SharedScheduleState};
use crate::domain::utils::Time;
use crate::domain::utils::id::{ReservationId, ResourceName};

/// How a patch differs from its parent for one reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationChange {
    Added(Reservation),
    Moved { before: Reservation, after: Reservation },
    Cancelled(Reservation),
}

impl ReservationChange {
    pub fn reservation_id(&self) -> ReservationId {
        match self {
            ReservationChange::Added(reservation) | ReservationChange::Cancelled(reservation) => reservation.id(),
            ReservationChange::Moved { after, .. } => after.id(),
        }
    }

    /// Absolute shift of the start time; zero for additions and cancellations.
    pub fn displacement(&self) -> Time {
        match self {
            ReservationChange::Moved { before, after } => (after.start_time() - before.start_time()).abs(),
            _ => 0,
        }
    }
}

/// Copy-on-write layer over exactly one parent state.
///
/// The first write to a resource copies the parent's timeline of that
/// resource into the overlay; resources that were never written fall through
/// to the parent. Every write is checked against the no-overlap invariant of
/// the patch's current view and rejected writes leave the patch unchanged.
#[derive(Debug, Clone)]
pub struct SchedulePatch {
    parent: SharedScheduleState,
    resource_schedules_overlay: HashMap<ResourceName, ResourceSchedule>,
    reservation_mapping_overlay: HashMap<ReservationId, (ResourceName, Time)>,
    cancelled: HashSet<ReservationId>,
}

impl SchedulePatch {
    pub fn new(parent: SharedScheduleState) -> Self {
        SchedulePatch {
            parent,
            resource_schedules_overlay: HashMap::new(),
            reservation_mapping_overlay: HashMap::new(),
            cancelled: HashSet::new(),
        }
    }

    pub fn parent(&self) -> &SharedScheduleState {
        &self.parent
    }

    /// Resources this patch holds its own timeline for, sorted.
    pub fn overlaid_resources(&self) -> Vec<&ResourceName> {
        let mut resources: Vec<&ResourceName> = self.resource_schedules_overlay.keys().collect();
        resources.sort();
        resources
    }

    pub fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    /// Builds a patch directly over `root` that shows `source`'s timelines for
    /// `resources`. Used to collapse a stack of patches into one layer.
    pub fn rebase(source: &dyn AbstractScheduleState, root: SharedScheduleState, resources: &[ResourceName]) -> SchedulePatch {
        let mut patch = SchedulePatch::new(root);

        for resource in resources {
            let schedule = source.get_schedule(resource).clone();
            for reservation in patch.parent.get_schedule(resource).values() {
                if source.get_reservation_by_id(reservation.id()).is_none() {
                    patch.cancelled.insert(reservation.id());
                }
            }
            for (start, reservation) in schedule.iter() {
                patch.reservation_mapping_overlay.insert(reservation.id(), (resource.clone(), *start));
            }
            patch.resource_schedules_overlay.insert(resource.clone(), schedule);
        }
        patch
    }

    /// Every difference between this patch and its parent, ordered by
    /// reservation id.
    pub fn changes(&self) -> Vec<ReservationChange> {
        let mut changes: BTreeMap<ReservationId, ReservationChange> = BTreeMap::new();

        for (resource, schedule) in self.resource_schedules_overlay.iter() {
            for reservation in schedule.values() {
                match self.parent.get_reservation_by_id(reservation.id()) {
                    None => {
                        changes.insert(reservation.id(), ReservationChange::Added(reservation.clone()));
                    }
                    Some(before) if before != reservation => {
                        changes.insert(reservation.id(), ReservationChange::Moved { before: before.clone(), after: reservation.clone() });
                    }
                    Some(_) => {}
                }
            }

            for reservation in self.parent.get_schedule(resource).values() {
                if self.get_reservation_by_id(reservation.id()).is_none() {
                    changes.insert(reservation.id(), ReservationChange::Cancelled(reservation.clone()));
                }
            }
        }

        changes.into_values().collect()
    }

    fn cache_resource(&mut self, resource: &ResourceName) {
        if self.resource_schedules_overlay.contains_key(resource) {
            return;
        }

        let schedule = self.parent.get_schedule(resource).clone();
        for (start, reservation) in schedule.iter() {
            self.reservation_mapping_overlay.insert(reservation.id(), (resource.clone(), *start));
        }
        self.resource_schedules_overlay.insert(resource.clone(), schedule);
    }

    fn insert_checked(&mut self, reservation: Reservation) -> Result<(), ScheduleError> {
        let resource = reservation.resource().clone();
        self.cache_resource(&resource);

        let schedule = self.resource_schedules_overlay.entry(resource.clone()).or_default();
        timeline::check_insertion(schedule, &reservation)?;

        let id = reservation.id();
        let start = reservation.start_time();
        schedule.insert(start, reservation);
        self.reservation_mapping_overlay.insert(id, (resource, start));
        self.cancelled.remove(&id);
        Ok(())
    }

    fn remove_cached(&mut self, id: ReservationId) -> Result<Reservation, ScheduleError> {
        let original = self.get_reservation_by_id(id).cloned().ok_or(ScheduleError::UnknownReservation(id))?;
        self.cache_resource(original.resource());

        self.reservation_mapping_overlay.remove(&id);
        self.resource_schedules_overlay
            .get_mut(original.resource())
            .and_then(|schedule| schedule.remove(&original.start_time()))
            .ok_or(ScheduleError::UnknownReservation(id))
    }
}

impl AbstractScheduleState for SchedulePatch {
    fn get_schedule(&self, resource: &ResourceName) -> &ResourceSchedule {
        match self.resource_schedules_overlay.get(resource) {
            Some(schedule) => schedule,
            None => self.parent.get_schedule(resource),
        }
    }

    fn get_reservation_by_id(&self, id: ReservationId) -> Option<&Reservation> {
        if self.cancelled.contains(&id) {
            return None;
        }

        match self.reservation_mapping_overlay.get(&id) {
            Some((resource, start)) => self.resource_schedules_overlay.get(resource)?.get(start),
            None => self.parent.get_reservation_by_id(id),
        }
    }

    fn resource_names(&self) -> Vec<ResourceName> {
        let mut names = self.parent.resource_names();
        names.extend(self.resource_schedules_overlay.keys().cloned());
        names.sort();
        names.dedup();
        names
    }
}

impl ScheduleWriter for SchedulePatch {
    fn add_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError> {
        if self.get_reservation_by_id(reservation.id()).is_some() {
            return Err(ScheduleError::DuplicateReservation(reservation.id()));
        }
        self.insert_checked(reservation)
    }

    fn update_reservation(&mut self, reservation: Reservation) -> Result<(), ScheduleError> {
        let original = self.remove_cached(reservation.id())?;

        if let Err(e) = self.insert_checked(reservation) {
            log::trace!("Patch rejected update of {}: {}", original, e);
            self.insert_checked(original)?;
            return Err(e);
        }
        Ok(())
    }

    fn cancel_reservation(&mut self, id: ReservationId) -> Result<Reservation, ScheduleError> {
        let original = self.remove_cached(id)?;
        self.cancelled.insert(id);
        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::schedule_state::CurrentScheduleState;
    use crate::domain::utils::id::ParticipantId;
    use std::sync::Arc;

    fn dock() -> ResourceName {
        ResourceName::new("dock")
    }

    fn res(id: u64, start: Time, duration: Time) -> Reservation {
        Reservation::with_duration(ReservationId(id), dock(), ParticipantId(0), start, duration)
    }

    fn base() -> SharedScheduleState {
        let mut state = CurrentScheduleState::new();
        state.add_reservation(res(1, 0, 10)).unwrap();
        state.add_reservation(res(2, 20, 10)).unwrap();
        state.add_reservation(Reservation::with_duration(ReservationId(3), ResourceName::new("lane"), ParticipantId(0), 0, 5)).unwrap();
        Arc::new(state)
    }

    #[test]
    fn untouched_resources_fall_through_to_the_parent() {
        let parent = base();
        let mut patch = SchedulePatch::new(parent.clone());
        patch.update_reservation(res(2, 40, 10)).unwrap();

        assert_eq!(patch.overlaid_resources(), vec![&dock()]);
        assert_eq!(patch.get_schedule(&ResourceName::new("lane")).len(), 1);
        assert_eq!(patch.get_reservation_by_id(ReservationId(2)).map(|r| r.start_time()), Some(40));
        assert_eq!(parent.get_reservation_by_id(ReservationId(2)).map(|r| r.start_time()), Some(20));
    }

    #[test]
    fn rejected_write_leaves_the_patch_unchanged() {
        let mut patch = SchedulePatch::new(base());
        let result = patch.update_reservation(res(1, 15, 10));

        assert!(matches!(result, Err(ScheduleError::Overlap { .. })));
        assert_eq!(patch.get_reservation_by_id(ReservationId(1)).map(|r| r.start_time()), Some(0));
        assert!(patch.is_empty());
    }

    #[test]
    fn changes_report_moves_additions_and_cancellations() {
        let mut patch = SchedulePatch::new(base());
        patch.update_reservation(res(2, 25, 10)).unwrap();
        patch.cancel_reservation(ReservationId(1)).unwrap();
        patch.add_reservation(res(7, 0, 20)).unwrap();

        let changes = patch.changes();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0], ReservationChange::Cancelled(res(1, 0, 10)));
        assert_eq!(changes[1], ReservationChange::Moved { before: res(2, 20, 10), after: res(2, 25, 10) });
        assert_eq!(changes[1].displacement(), 5);
        assert_eq!(changes[2], ReservationChange::Added(res(7, 0, 20)));
        assert!(patch.get_reservation_by_id(ReservationId(1)).is_none());
    }

    #[test]
    fn rebase_collapses_stacked_patches_onto_the_root() {
        let root = base();
        let mut first = SchedulePatch::new(root.clone());
        first.update_reservation(res(2, 30, 10)).unwrap();
        let mut second = SchedulePatch::new(Arc::new(first));
        second.update_reservation(res(1, 12, 10)).unwrap();

        let collapsed = SchedulePatch::rebase(&second, root.clone(), &[dock()]);

        assert!(Arc::ptr_eq(collapsed.parent(), &root));
        assert_eq!(collapsed.get_reservation_by_id(ReservationId(1)).map(|r| r.start_time()), Some(12));
        assert_eq!(collapsed.get_reservation_by_id(ReservationId(2)).map(|r| r.start_time()), Some(30));
        assert_eq!(collapsed.changes().len(), 2);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut patch = SchedulePatch::new(base());
        assert_eq!(patch.add_reservation(res(1, 100, 1)), Err(ScheduleError::DuplicateReservation(ReservationId(1))));
    }
}
