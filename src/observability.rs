use std::net::SocketAddr;
use std::time::Instant;

use crate::engine::SelectionOutcome;
use crate::model::ConflictVerdict;

// ── Interaction metrics ─────────────────────────────────────────

/// Counter: day clicks handled. Labels: outcome.
pub const CLICKS_TOTAL: &str = "staybook_clicks_total";

/// Counter: confirm-time verdicts. Labels: verdict.
pub const CONFLICTS_TOTAL: &str = "staybook_conflicts_total";

// ── Service calls ───────────────────────────────────────────────

/// Counter: service mutations. Labels: op, status.
pub const MUTATIONS_TOTAL: &str = "staybook_mutations_total";

/// Histogram: service mutation latency in seconds. Labels: op.
pub const MUTATION_DURATION_SECONDS: &str = "staybook_mutation_duration_seconds";

/// Counter: replaces whose delete succeeded and whose write failed.
pub const PARTIAL_REPLACE_TOTAL: &str = "staybook_partial_replace_total";

/// Gauge: reservations in the most recently built snapshot.
pub const SNAPSHOT_RESERVATIONS: &str = "staybook_snapshot_reservations";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

pub(crate) fn record_mutation(op: &'static str, ok: bool, started: Instant) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(MUTATIONS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(MUTATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}

/// Map a selection outcome to a short label for metrics.
pub fn outcome_label(outcome: &SelectionOutcome) -> &'static str {
    match outcome {
        SelectionOutcome::DateChanged { .. } => "date_changed",
        SelectionOutcome::Rejected { .. } => "rejected",
        SelectionOutcome::ValidationError { .. } => "validation_error",
        SelectionOutcome::NavigateToOwnReservation { .. } => "navigate_own",
        SelectionOutcome::MonthChanged { .. } => "month_changed",
        SelectionOutcome::NavigationBlocked { .. } => "navigation_blocked",
    }
}

pub fn verdict_label(verdict: &ConflictVerdict) -> &'static str {
    match verdict {
        ConflictVerdict::Clear => "clear",
        ConflictVerdict::OwnedByGuest(_) => "owned_by_guest",
        ConflictVerdict::OverlapsOtherVenue(_) => "overlaps_other_venue",
        ConflictVerdict::OverlapsSameVenueOtherGuest => "overlaps_same_venue_other_guest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReservationId;

    #[test]
    fn init_without_port_is_noop() {
        assert!(init(None).is_ok());
    }

    #[test]
    fn labels() {
        assert_eq!(verdict_label(&ConflictVerdict::Clear), "clear");
        assert_eq!(
            verdict_label(&ConflictVerdict::OverlapsOtherVenue(ReservationId::new())),
            "overlaps_other_venue"
        );
        let month = "2025-06-01".parse().unwrap();
        assert_eq!(
            outcome_label(&SelectionOutcome::MonthChanged { month }),
            "month_changed"
        );
    }
}
