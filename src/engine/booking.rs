use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{RESERVATIONS_TOTAL, outcome_label};

use super::overlap::now_ms;
use super::{Engine, EngineError, Entity, apply_to_slot};

impl Engine {
    /// Claim a slot for `requester`.
    ///
    /// The status check, the slot flip and the booking creation all happen
    /// under the slot's write lock, and the flip plus the booking are one WAL
    /// record. Of any number of concurrent calls on one slot, exactly one sees
    /// it Available; the rest get `AlreadyBooked`.
    pub async fn reserve(&self, slot_id: Ulid, requester: String) -> Result<BookingInfo, EngineError> {
        let result = self.reserve_inner(slot_id, requester).await;
        metrics::counter!(RESERVATIONS_TOTAL, "outcome" => outcome_label(&result)).increment(1);
        result
    }

    async fn reserve_inner(&self, slot_id: Ulid, requester: String) -> Result<BookingInfo, EngineError> {
        if requester.trim().is_empty() {
            return Err(EngineError::InvalidArgument("userName is required"));
        }
        if requester.len() > MAX_REQUESTER_LEN {
            return Err(EngineError::LimitExceeded("userName too long"));
        }
        let slot = self
            .get_slot_entry(&slot_id)
            .ok_or(EngineError::NotFound(Entity::Slot, slot_id))?;

        let _gate = self.commit_gate.read().await;
        let mut cell = self.lock_slot(&slot).await?;
        if cell.status == SlotStatus::Booked {
            tracing::warn!("double booking attempt for slot {slot_id} by {requester:?}");
            return Err(EngineError::AlreadyBooked(slot_id));
        }

        let booking_id = self.next_id();
        let event = Event::SlotReserved {
            slot_id,
            booking_id,
            requester,
            at: now_ms(),
        };
        self.wal_append(&event).await?;
        apply_to_slot(&mut cell, &event, &self.bookings);
        drop(cell);

        tracing::info!("booking {booking_id} confirmed for slot {slot_id}");
        self.get_booking(booking_id)
    }

    /// Cancel a confirmed booking and reopen its slot in one atomic unit.
    ///
    /// A second cancel is rejected with `AlreadyCancelled` rather than absorbed.
    pub async fn cancel(&self, booking_id: Ulid) -> Result<(), EngineError> {
        let slot_id = self
            .bookings
            .get(&booking_id)
            .map(|b| b.slot_id)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?;
        let slot = self
            .get_slot_entry(&slot_id)
            .ok_or(EngineError::NotFound(Entity::Slot, slot_id))?;

        let _gate = self.commit_gate.read().await;
        // Booking status only changes under its slot's lock, so read it after locking.
        let mut cell = self.lock_slot(&slot).await?;
        let status = self
            .bookings
            .get(&booking_id)
            .map(|b| b.status)
            .ok_or(EngineError::NotFound(Entity::Booking, booking_id))?;
        if status == BookingStatus::Cancelled {
            return Err(EngineError::AlreadyCancelled(booking_id));
        }

        let event = Event::BookingCancelled {
            booking_id,
            slot_id,
            at: now_ms(),
        };
        self.wal_append(&event).await?;
        apply_to_slot(&mut cell, &event, &self.bookings);
        drop(cell);

        tracing::info!("booking {booking_id} cancelled, slot {slot_id} reopened");
        Ok(())
    }

    pub fn get_booking(&self, id: Ulid) -> Result<BookingInfo, EngineError> {
        let record = self
            .bookings
            .get(&id)
            .map(|b| b.value().clone())
            .ok_or(EngineError::NotFound(Entity::Booking, id))?;
        self.booking_info(record)
    }

    /// All bookings, oldest first, whatever their status.
    pub fn list_bookings(&self) -> Result<Vec<BookingInfo>, EngineError> {
        let mut records: Vec<BookingRecord> = self.bookings.iter().map(|e| e.value().clone()).collect();
        records.sort_by_key(|r| r.id);
        records.into_iter().map(|r| self.booking_info(r)).collect()
    }

    /// Join a booking with its slot and venue at read time.
    /// Slot times and venue identity are immutable, so no lock is taken.
    fn booking_info(&self, record: BookingRecord) -> Result<BookingInfo, EngineError> {
        let slot = self
            .get_slot_entry(&record.slot_id)
            .ok_or(EngineError::NotFound(Entity::Slot, record.slot_id))?;
        let venue = self
            .get_venue_entry(&slot.record.venue_id)
            .ok_or(EngineError::NotFound(Entity::Venue, slot.record.venue_id))?;
        Ok(BookingInfo {
            id: record.id,
            slot_id: record.slot_id,
            venue_id: venue.venue.id,
            venue_name: venue.venue.name.clone(),
            requester: record.requester,
            slot_start: slot.record.span.start,
            slot_end: slot.record.span.end,
            status: record.status,
            created_at: record.created_at,
            cancelled_at: record.cancelled_at,
        })
    }
}
