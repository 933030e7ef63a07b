use std::net::SocketAddr;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests handled. Labels: method, route, status.
pub const REQUESTS_TOTAL: &str = "slotbook_requests_total";

/// Histogram: request latency in seconds. Labels: method, route.
pub const REQUEST_DURATION_SECONDS: &str = "slotbook_request_duration_seconds";

/// Counter: reservation attempts. Labels: outcome.
pub const RESERVATIONS_TOTAL: &str = "slotbook_reservations_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting for a slot's exclusive lock.
pub const SLOT_LOCK_WAIT_SECONDS: &str = "slotbook_slot_lock_wait_seconds";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "slotbook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "slotbook_wal_flush_batch_size";

/// Counter: sport catalog sync runs. Labels: outcome.
pub const SPORT_SYNC_TOTAL: &str = "slotbook_sport_sync_total";

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

/// Short label for an engine outcome.
pub fn outcome_label<T>(result: &Result<T, EngineError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(EngineError::NotFound(..)) => "not_found",
        Err(EngineError::InvalidArgument(_)) | Err(EngineError::LimitExceeded(_)) => "invalid",
        Err(EngineError::Overlap { .. }) => "overlap",
        Err(EngineError::AlreadyBooked(_)) => "already_booked",
        Err(EngineError::AlreadyCancelled(_)) => "already_cancelled",
        Err(EngineError::VenueHasSlots(_)) => "venue_has_slots",
        Err(EngineError::LockTimeout(_)) => "lock_timeout",
        Err(EngineError::WalError(_)) => "storage_error",
    }
}
