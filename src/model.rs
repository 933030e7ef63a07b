use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Available,
    Booked,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "AVAILABLE",
            SlotStatus::Booked => "BOOKED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    /// Terminal.
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    /// Identifier assigned by the upstream sports feed.
    pub sport_id: String,
    pub name: String,
    pub synced_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Ulid,
    pub name: String,
    pub location: String,
    pub sport_id: String,
    pub created_at: Ms,
}

/// The immutable part of a slot. Status lives behind the slot's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub id: Ulid,
    pub venue_id: Ulid,
    pub span: Span,
    pub created_at: Ms,
}

/// Mutable slot state, only ever touched while holding the slot's write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCell {
    pub status: SlotStatus,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub slot_id: Ulid,
    pub requester: String,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub cancelled_at: Option<Ms>,
}

/// Per-venue interval index of its slots, sorted by `span.start`.
///
/// Slots on one venue never overlap, so the list is sorted by `span.end` too.
#[derive(Debug, Clone, Default)]
pub struct SlotIndex {
    pub entries: Vec<(Ulid, Span)>,
}

impl SlotIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert maintaining sort order by span.start.
    pub fn insert(&mut self, id: Ulid, span: Span) {
        let pos = self
            .entries
            .binary_search_by_key(&span.start, |(_, s)| s.start)
            .unwrap_or_else(|e| e);
        self.entries.insert(pos, (id, span));
    }

    /// Return only entries whose span overlaps the query window.
    /// Uses binary search to skip entries starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &(Ulid, Span)> {
        let right_bound = self.entries.partition_point(|(_, s)| s.start < query.end);
        self.entries[..right_bound]
            .iter()
            .filter(move |(_, s)| s.overlaps(query))
    }

    /// Entries lying entirely inside `window`, in index order.
    pub fn contained_in<'a>(&'a self, window: &'a Span) -> impl Iterator<Item = &'a (Ulid, Span)> {
        self.overlapping(window)
            .filter(move |(_, s)| window.contains_span(s))
    }
}

/// The event types, flat with no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SportUpserted {
        sport_id: String,
        name: String,
        at: Ms,
    },
    VenueCreated {
        id: Ulid,
        name: String,
        location: String,
        sport_id: String,
        at: Ms,
    },
    VenueDeleted {
        id: Ulid,
    },
    SlotCreated {
        id: Ulid,
        venue_id: Ulid,
        span: Span,
        at: Ms,
    },
    /// Slot flip and booking creation in one record.
    SlotReserved {
        slot_id: Ulid,
        booking_id: Ulid,
        requester: String,
        at: Ms,
    },
    /// Booking flip and slot release in one record.
    BookingCancelled {
        booking_id: Ulid,
        slot_id: Ulid,
        at: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub id: Ulid,
    pub venue_id: Ulid,
    pub venue_name: String,
    pub sport_id: String,
    pub start: Ms,
    pub end: Ms,
    pub status: SlotStatus,
    pub created_at: Ms,
    pub updated_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub id: Ulid,
    pub slot_id: Ulid,
    pub venue_id: Ulid,
    pub venue_name: String,
    pub requester: String,
    pub slot_start: Ms,
    pub slot_end: Ms,
    pub status: BookingStatus,
    pub created_at: Ms,
    pub cancelled_at: Option<Ms>,
}

/// One (venue, slot) pair reported by availability search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableSlot {
    pub venue_id: Ulid,
    pub venue_name: String,
    pub location: String,
    pub sport_id: String,
    pub slot_id: Ulid,
    pub start: Ms,
    pub end: Ms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_overlap_nested_and_exact() {
        let outer = Span::new(100, 400);
        let inner = Span::new(150, 300);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&outer));
    }

    #[test]
    fn span_contains_span() {
        let outer = Span::new(100, 400);
        let inner = Span::new(150, 300);
        let partial = Span::new(50, 200);
        assert!(outer.contains_span(&inner));
        assert!(outer.contains_span(&outer)); // self-containment
        assert!(!outer.contains_span(&partial));
    }

    #[test]
    fn index_ordering() {
        let mut idx = SlotIndex::default();
        idx.insert(Ulid::new(), Span::new(300, 400));
        idx.insert(Ulid::new(), Span::new(100, 200));
        idx.insert(Ulid::new(), Span::new(200, 300));
        let starts: Vec<Ms> = idx.entries.iter().map(|(_, s)| s.start).collect();
        assert_eq!(starts, vec![100, 200, 300]);
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut idx = SlotIndex::default();
        idx.insert(Ulid::new(), Span::new(100, 200));
        idx.insert(Ulid::new(), Span::new(450, 600));
        idx.insert(Ulid::new(), Span::new(1000, 1100));

        let hits: Vec<_> = idx.overlapping(&Span::new(500, 800)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, Span::new(450, 600));
    }

    #[test]
    fn overlapping_adjacent_not_included() {
        let mut idx = SlotIndex::default();
        idx.insert(Ulid::new(), Span::new(100, 200));
        assert_eq!(idx.overlapping(&Span::new(200, 300)).count(), 0);
        assert_eq!(idx.overlapping(&Span::new(0, 100)).count(), 0);
    }

    #[test]
    fn overlapping_single_ms_overlap() {
        let mut idx = SlotIndex::default();
        idx.insert(Ulid::new(), Span::new(100, 201));
        assert_eq!(idx.overlapping(&Span::new(200, 300)).count(), 1);
    }

    #[test]
    fn contained_in_excludes_partial() {
        let mut idx = SlotIndex::default();
        let inside = Ulid::new();
        idx.insert(Ulid::new(), Span::new(50, 150)); // starts before window
        idx.insert(inside, Span::new(200, 300));
        idx.insert(Ulid::new(), Span::new(450, 550)); // ends after window

        let window = Span::new(100, 500);
        let hits: Vec<Ulid> = idx.contained_in(&window).map(|(id, _)| *id).collect();
        assert_eq!(hits, vec![inside]);
    }

    #[test]
    fn contained_in_accepts_exact_window() {
        let mut idx = SlotIndex::default();
        idx.insert(Ulid::new(), Span::new(100, 200));
        assert_eq!(idx.contained_in(&Span::new(100, 200)).count(), 1);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::SlotReserved {
            slot_id: Ulid::new(),
            booking_id: Ulid::new(),
            requester: "alice".into(),
            at: 42,
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
