use ulid::Ulid;

/// Which kind of record a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Venue,
    Slot,
    Booking,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Venue => f.write_str("venue"),
            Entity::Slot => f.write_str("slot"),
            Entity::Booking => f.write_str("booking"),
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Entity, Ulid),
    InvalidArgument(&'static str),
    LimitExceeded(&'static str),
    Overlap { venue_id: Ulid, existing: Ulid },
    AlreadyBooked(Ulid),
    AlreadyCancelled(Ulid),
    VenueHasSlots(Ulid),
    /// The slot lock could not be acquired in time. Safe to retry.
    LockTimeout(Ulid),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(entity, id) => write!(f, "{entity} not found with id: {id}"),
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Overlap { venue_id, existing } => write!(
                f,
                "slot overlaps with existing slot {existing} for venue: {venue_id}"
            ),
            EngineError::AlreadyBooked(id) => write!(f, "slot {id} is already booked"),
            EngineError::AlreadyCancelled(id) => write!(f, "booking {id} is already cancelled"),
            EngineError::VenueHasSlots(id) => {
                write!(f, "cannot delete venue {id}: it still has slots")
            }
            EngineError::LockTimeout(id) => {
                write!(f, "timed out waiting for slot {id}, try again")
            }
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
