use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::limits::*;
use crate::model::*;
use crate::observability;
use crate::service::{ReservationService, ServiceError};

use super::conflict::validate_candidate;
use super::EngineError;

#[derive(Debug, Clone, Copy)]
pub struct SubmitRequest<'a> {
    pub interval: DateInterval,
    pub guest_count: u32,
    pub venue: &'a Venue,
    /// The guest's current reservation on this venue, if any.
    pub existing_on_venue: Option<ReservationId>,
    /// The reservation being edited in place, if any.
    pub editing: Option<ReservationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReceipt {
    pub reservation_id: ReservationId,
    pub action: MutationAction,
    /// The reservation deleted to keep one reservation per guest per venue.
    pub replaced: Option<ReservationId>,
    pub invalidate: CacheInvalidation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("invalid request: {0}")]
    Invalid(#[from] EngineError),
    /// Nothing changed on the service.
    #[error("could not remove previous reservation {reservation_id}: {source}")]
    DeleteFailed {
        reservation_id: ReservationId,
        source: ServiceError,
    },
    /// Nothing changed on the service.
    #[error("could not save reservation: {source}")]
    WriteFailed { source: ServiceError },
    /// The old reservation is gone and the new one was not written: the guest
    /// now holds no reservation on this venue.
    #[error("previous reservation {deleted} removed but the new one was not saved: {source}")]
    PartialReplace {
        deleted: ReservationId,
        source: ServiceError,
    },
    /// The duplicate was deleted; the edited reservation is unchanged and
    /// still held by the guest.
    #[error("duplicate {deleted} removed but reservation {edited} was not updated: {source}")]
    UpdateAfterDeleteFailed {
        deleted: ReservationId,
        edited: ReservationId,
        source: ServiceError,
    },
}

impl MutationError {
    /// The guest was left without a reservation on the venue.
    pub fn is_partial(&self) -> bool {
        matches!(self, MutationError::PartialReplace { .. })
    }

    /// Something was committed on the service before the failure.
    pub fn changed_service(&self) -> bool {
        matches!(
            self,
            MutationError::PartialReplace { .. } | MutationError::UpdateAfterDeleteFailed { .. }
        )
    }
}

/// Replace-if-exists write sequence against the reservation service.
///
/// 1. If the guest already holds a reservation on the venue that is not the
///    one being edited, delete it. A failed delete aborts everything.
/// 2. Update the edited reservation, or create a new one.
///
/// No retries. Step 2 never starts before step 1 has succeeded.
pub struct ReservationMutator<S: ?Sized> {
    service: Arc<S>,
}

impl<S: ReservationService + ?Sized> ReservationMutator<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub async fn submit(
        &self,
        credentials: &Credentials,
        request: SubmitRequest<'_>,
    ) -> Result<MutationReceipt, MutationError> {
        validate_request(&request)?;
        let venue_id = request.venue.id;

        let replaced = match request.existing_on_venue {
            Some(old) if Some(old) != request.editing => {
                let started = Instant::now();
                let result = self.service.delete_reservation(credentials, old).await;
                observability::record_mutation("delete", result.is_ok(), started);
                if let Err(source) = result {
                    warn!(
                        venue = %venue_id,
                        reservation = %old,
                        "delete of previous reservation failed: {source}"
                    );
                    return Err(MutationError::DeleteFailed {
                        reservation_id: old,
                        source,
                    });
                }
                info!(venue = %venue_id, reservation = %old, "removed previous reservation");
                Some(old)
            }
            _ => None,
        };

        let started = Instant::now();
        let (op, action, result) = match request.editing {
            Some(id) => (
                "update",
                MutationAction::Updated,
                self.service
                    .update_reservation(credentials, id, request.interval, request.guest_count)
                    .await,
            ),
            None => (
                "create",
                MutationAction::Created,
                self.service
                    .create_reservation(
                        credentials,
                        NewReservation {
                            venue_id,
                            interval: request.interval,
                            guest_count: request.guest_count,
                        },
                    )
                    .await,
            ),
        };
        observability::record_mutation(op, result.is_ok(), started);

        let reservation_id = match result {
            Ok(id) => id,
            Err(source) => {
                return Err(match (replaced, request.editing) {
                    (Some(deleted), Some(edited)) => {
                        warn!(
                            venue = %venue_id,
                            reservation = %edited,
                            "update failed after removing duplicate {deleted}: {source}"
                        );
                        MutationError::UpdateAfterDeleteFailed {
                            deleted,
                            edited,
                            source,
                        }
                    }
                    (Some(deleted), None) => {
                        warn!(
                            venue = %venue_id,
                            reservation = %deleted,
                            "{op} failed after delete, guest left without a reservation: {source}"
                        );
                        metrics::counter!(observability::PARTIAL_REPLACE_TOTAL).increment(1);
                        MutationError::PartialReplace { deleted, source }
                    }
                    (None, _) => {
                        warn!(venue = %venue_id, "{op} failed: {source}");
                        MutationError::WriteFailed { source }
                    }
                });
            }
        };

        info!(
            venue = %venue_id,
            reservation = %reservation_id,
            interval = %request.interval,
            "{op} succeeded"
        );
        Ok(MutationReceipt {
            reservation_id,
            action,
            replaced,
            invalidate: CacheInvalidation {
                venue_id,
                guest: credentials.guest.clone(),
            },
        })
    }
}

fn validate_request(request: &SubmitRequest<'_>) -> Result<(), EngineError> {
    validate_candidate(&request.interval)?;
    let max = request.venue.max_guests.min(MAX_GUESTS_PER_RESERVATION);
    if request.guest_count == 0 || request.guest_count > max {
        return Err(EngineError::GuestCount {
            count: request.guest_count,
            max,
        });
    }
    Ok(())
}
