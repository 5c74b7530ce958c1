use async_trait::async_trait;

use crate::model::*;

/// Failures reported by the reservation service or its transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("reservation not found: {0}")]
    NotFound(ReservationId),
    #[error("unauthorized")]
    Unauthorized,
    #[error("reservation {0} belongs to another guest")]
    Forbidden(ReservationId),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// The remote reservation service. It is the consistency authority; this
/// crate only avoids submitting obviously invalid requests.
#[async_trait]
pub trait ReservationService: Send + Sync {
    async fn fetch_venue_reservations(
        &self,
        venue_id: VenueId,
    ) -> Result<Vec<ReservationRef>, ServiceError>;

    async fn fetch_guest_reservations(
        &self,
        guest: &GuestIdentity,
    ) -> Result<Vec<ReservationRef>, ServiceError>;

    async fn create_reservation(
        &self,
        credentials: &Credentials,
        request: NewReservation,
    ) -> Result<ReservationId, ServiceError>;

    async fn update_reservation(
        &self,
        credentials: &Credentials,
        id: ReservationId,
        interval: DateInterval,
        guest_count: u32,
    ) -> Result<ReservationId, ServiceError>;

    async fn delete_reservation(
        &self,
        credentials: &Credentials,
        id: ReservationId,
    ) -> Result<(), ServiceError>;
}
