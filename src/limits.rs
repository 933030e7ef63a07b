use crate::model::Ms;

pub const MAX_VENUES: usize = 100_000;
pub const MAX_SLOTS_PER_VENUE: usize = 50_000;
pub const MAX_NAME_LEN: usize = 256;
pub const MAX_LOCATION_LEN: usize = 512;
pub const MAX_SPORT_ID_LEN: usize = 64;
pub const MAX_REQUESTER_LEN: usize = 256;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
/// A single slot may not be longer than one week.
pub const MAX_SPAN_DURATION_MS: Ms = 7 * 24 * 3_600_000;

/// Upper bound on one encoded WAL record. The largest event (a venue with
/// every text field at its cap) is well under this.
pub const MAX_WAL_RECORD_LEN: usize = 64 * 1024;
