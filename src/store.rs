use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::service::{ReservationService, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FetchVenue,
    FetchGuest,
    Create,
    Update,
    Delete,
}

/// In-process reservation service. Applies the checks a real service would
/// (token present, ownership, no same-venue overlap, venue guest limit) and
/// publishes every committed change on its [`NotifyHub`].
pub struct InMemoryReservationService {
    reservations: DashMap<ReservationId, ReservationRef>,
    venues: DashMap<VenueId, Venue>,
    /// One-shot injected failures, consumed by the next call of that kind.
    failures: DashMap<Operation, ServiceError>,
    /// Serializes check-then-write so overlap checks see committed state.
    write_lock: Mutex<()>,
    notify: Arc<NotifyHub>,
}

impl Default for InMemoryReservationService {
    fn default() -> Self {
        Self::new(Arc::new(NotifyHub::new()))
    }
}

impl InMemoryReservationService {
    pub fn new(notify: Arc<NotifyHub>) -> Self {
        Self {
            reservations: DashMap::new(),
            venues: DashMap::new(),
            failures: DashMap::new(),
            write_lock: Mutex::new(()),
            notify,
        }
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    pub fn add_venue(&self, venue: Venue) {
        self.venues.insert(venue.id, venue);
    }

    pub fn venue(&self, id: &VenueId) -> Option<Venue> {
        self.venues.get(id).map(|e| e.value().clone())
    }

    /// Insert a reservation as-is, bypassing checks and notifications.
    pub fn seed(&self, reservation: ReservationRef) {
        self.reservations.insert(reservation.id, reservation);
    }

    pub fn get(&self, id: &ReservationId) -> Option<ReservationRef> {
        self.reservations.get(id).map(|e| e.value().clone())
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: Operation, error: ServiceError) {
        self.failures.insert(op, error);
    }

    fn injected(&self, op: Operation) -> Result<(), ServiceError> {
        match self.failures.remove(&op) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn collect(&self, keep: impl Fn(&ReservationRef) -> bool) -> Vec<ReservationRef> {
        let mut found: Vec<ReservationRef> = self
            .reservations
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|r| (r.interval.start, r.id));
        found
    }

    fn check_slot(
        &self,
        venue_id: VenueId,
        interval: &DateInterval,
        guest_count: u32,
        ignore: Option<ReservationId>,
    ) -> Result<(), ServiceError> {
        if interval.nights() < 1 {
            return Err(ServiceError::Rejected("stay must be at least one night".into()));
        }
        if let Some(venue) = self.venues.get(&venue_id)
            && (guest_count == 0 || guest_count > venue.max_guests)
        {
            return Err(ServiceError::Rejected(format!(
                "guest count {guest_count} exceeds venue limit {}",
                venue.max_guests
            )));
        }
        let clash = self.reservations.iter().any(|e| {
            let r = e.value();
            r.venue_id == venue_id && Some(r.id) != ignore && r.interval.overlaps_stay(interval)
        });
        if clash {
            return Err(ServiceError::Rejected("dates unavailable".into()));
        }
        Ok(())
    }

    fn owned(
        &self,
        credentials: &Credentials,
        id: ReservationId,
    ) -> Result<ReservationRef, ServiceError> {
        let existing = self.get(&id).ok_or(ServiceError::NotFound(id))?;
        if existing.guest != credentials.guest {
            return Err(ServiceError::Forbidden(id));
        }
        Ok(existing)
    }
}

fn authorize(credentials: &Credentials) -> Result<(), ServiceError> {
    if credentials.token.is_empty() || credentials.token.len() > MAX_TOKEN_LEN {
        return Err(ServiceError::Unauthorized);
    }
    Ok(())
}

#[async_trait]
impl ReservationService for InMemoryReservationService {
    async fn fetch_venue_reservations(
        &self,
        venue_id: VenueId,
    ) -> Result<Vec<ReservationRef>, ServiceError> {
        self.injected(Operation::FetchVenue)?;
        Ok(self.collect(|r| r.venue_id == venue_id))
    }

    async fn fetch_guest_reservations(
        &self,
        guest: &GuestIdentity,
    ) -> Result<Vec<ReservationRef>, ServiceError> {
        self.injected(Operation::FetchGuest)?;
        Ok(self.collect(|r| &r.guest == guest))
    }

    async fn create_reservation(
        &self,
        credentials: &Credentials,
        request: NewReservation,
    ) -> Result<ReservationId, ServiceError> {
        authorize(credentials)?;
        self.injected(Operation::Create)?;
        let _guard = self.write_lock.lock().await;
        self.check_slot(request.venue_id, &request.interval, request.guest_count, None)?;

        let id = ReservationId::new();
        self.reservations.insert(
            id,
            ReservationRef {
                id,
                venue_id: request.venue_id,
                guest: credentials.guest.clone(),
                guest_display_name: None,
                interval: request.interval,
                guest_count: request.guest_count,
            },
        );
        debug!(reservation = %id, venue = %request.venue_id, "created");
        self.notify.send(&ReservationChange::Created {
            id,
            venue_id: request.venue_id,
            interval: request.interval,
        });
        Ok(id)
    }

    async fn update_reservation(
        &self,
        credentials: &Credentials,
        id: ReservationId,
        interval: DateInterval,
        guest_count: u32,
    ) -> Result<ReservationId, ServiceError> {
        authorize(credentials)?;
        self.injected(Operation::Update)?;
        let _guard = self.write_lock.lock().await;
        let existing = self.owned(credentials, id)?;
        self.check_slot(existing.venue_id, &interval, guest_count, Some(id))?;

        if let Some(mut entry) = self.reservations.get_mut(&id) {
            entry.interval = interval;
            entry.guest_count = guest_count;
        }
        debug!(reservation = %id, venue = %existing.venue_id, "updated");
        self.notify.send(&ReservationChange::Updated {
            id,
            venue_id: existing.venue_id,
            interval,
        });
        Ok(id)
    }

    async fn delete_reservation(
        &self,
        credentials: &Credentials,
        id: ReservationId,
    ) -> Result<(), ServiceError> {
        authorize(credentials)?;
        self.injected(Operation::Delete)?;
        let _guard = self.write_lock.lock().await;
        let existing = self.owned(credentials, id)?;
        self.reservations.remove(&id);
        debug!(reservation = %id, venue = %existing.venue_id, "deleted");
        self.notify.send(&ReservationChange::Deleted {
            id,
            venue_id: existing.venue_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const ANA: &str = "ana@example.com";
    const BO: &str = "bo@example.com";

    fn d(s: &str) -> Day {
        s.parse().unwrap()
    }

    fn iv(start: &str, end: &str) -> DateInterval {
        DateInterval::new(d(start), d(end)).unwrap()
    }

    fn creds(who: &str) -> Credentials {
        Credentials::new(GuestIdentity::from(who), "token")
    }

    fn venue(max_guests: u32) -> Venue {
        Venue {
            id: VenueId::new(),
            name: Some("Harbour Loft".into()),
            max_guests,
            price_per_night: 10_000,
        }
    }

    fn new_reservation(venue_id: VenueId, start: &str, end: &str) -> NewReservation {
        NewReservation {
            venue_id,
            interval: iv(start, end),
            guest_count: 2,
        }
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let svc = InMemoryReservationService::default();
        let v = venue(4);
        svc.add_venue(v.clone());
        let id = svc
            .create_reservation(&creds(ANA), new_reservation(v.id, "2025-06-01", "2025-06-05"))
            .await
            .unwrap();

        let for_venue = svc.fetch_venue_reservations(v.id).await.unwrap();
        assert_eq!(for_venue.len(), 1);
        assert_eq!(for_venue[0].id, id);
        let for_guest = svc
            .fetch_guest_reservations(&GuestIdentity::from(ANA))
            .await
            .unwrap();
        assert_eq!(for_guest[0].guest_count, 2);
        assert!(
            svc.fetch_guest_reservations(&GuestIdentity::from(BO))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn overlapping_create_rejected_back_to_back_allowed() {
        let svc = InMemoryReservationService::default();
        let v = venue(4);
        svc.add_venue(v.clone());
        let first = svc
            .create_reservation(&creds(ANA), new_reservation(v.id, "2025-06-01", "2025-06-05"))
            .await;
        assert_ok!(first);
        let clash = svc
            .create_reservation(&creds(BO), new_reservation(v.id, "2025-06-04", "2025-06-06"))
            .await;
        assert_eq!(clash, Err(ServiceError::Rejected("dates unavailable".into())));
        let back_to_back = svc
            .create_reservation(&creds(BO), new_reservation(v.id, "2025-06-05", "2025-06-07"))
            .await;
        assert_ok!(back_to_back);
    }

    #[tokio::test]
    async fn guest_limit_enforced() {
        let svc = InMemoryReservationService::default();
        let v = venue(1);
        svc.add_venue(v.clone());
        let result = svc
            .create_reservation(&creds(ANA), new_reservation(v.id, "2025-06-01", "2025-06-05"))
            .await;
        assert!(matches!(result, Err(ServiceError::Rejected(_))));
    }

    #[tokio::test]
    async fn missing_token_unauthorized() {
        let svc = InMemoryReservationService::default();
        let bad = Credentials::new(GuestIdentity::from(ANA), "");
        let result = svc
            .create_reservation(&bad, new_reservation(VenueId::new(), "2025-06-01", "2025-06-05"))
            .await;
        assert_eq!(result, Err(ServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn update_and_delete_check_ownership() {
        let svc = InMemoryReservationService::default();
        let v = venue(4);
        let id = svc
            .create_reservation(&creds(ANA), new_reservation(v.id, "2025-06-01", "2025-06-05"))
            .await
            .unwrap();

        let stolen = svc.delete_reservation(&creds(BO), id).await;
        assert_eq!(stolen, Err(ServiceError::Forbidden(id)));

        // Moving onto its own days is fine.
        let moved = svc
            .update_reservation(&creds(ANA), id, iv("2025-06-03", "2025-06-08"), 3)
            .await;
        assert_ok!(moved);
        assert_eq!(svc.get(&id).unwrap().interval, iv("2025-06-03", "2025-06-08"));

        assert_ok!(svc.delete_reservation(&creds(ANA), id).await);
        assert_eq!(
            svc.delete_reservation(&creds(ANA), id).await,
            Err(ServiceError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let svc = InMemoryReservationService::default();
        svc.fail_next(Operation::FetchVenue, ServiceError::Transport("timeout".into()));
        let v = VenueId::new();
        assert_err!(svc.fetch_venue_reservations(v).await);
        assert_ok!(svc.fetch_venue_reservations(v).await);
    }

    #[tokio::test]
    async fn changes_are_broadcast() {
        let svc = InMemoryReservationService::default();
        let v = venue(4);
        let mut rx = svc.notify().subscribe(v.id);
        let id = svc
            .create_reservation(&creds(ANA), new_reservation(v.id, "2025-06-01", "2025-06-05"))
            .await
            .unwrap();
        svc.delete_reservation(&creds(ANA), id).await.unwrap();

        let created = rx.recv().await.unwrap();
        assert!(matches!(created, ReservationChange::Created { id: got, .. } if got == id));
        assert_eq!(
            rx.recv().await.unwrap(),
            ReservationChange::Deleted { id, venue_id: v.id }
        );
    }
}
