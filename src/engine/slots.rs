use std::sync::Arc;

use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::overlap::{check_no_overlap, now_ms, validate_span};
use super::{Engine, EngineError, Entity, SlotEntry};

impl Engine {
    /// Validate a new `[start, end)` range against the venue's existing slots
    /// and persist it as an Available slot.
    ///
    /// Not idempotent: repeating a successful call fails with `Overlap`.
    pub async fn create_slot(&self, venue_id: Ulid, start: Ms, end: Ms) -> Result<SlotInfo, EngineError> {
        let venue = self
            .get_venue_entry(&venue_id)
            .ok_or(EngineError::NotFound(Entity::Venue, venue_id))?;
        let span = validate_span(start, end)?;

        let _gate = self.commit_gate.read().await;
        let mut index = venue.index.write().await;
        if !self.venues.contains_key(&venue_id) {
            return Err(EngineError::NotFound(Entity::Venue, venue_id));
        }
        if index.len() >= MAX_SLOTS_PER_VENUE {
            return Err(EngineError::LimitExceeded("too many slots on venue"));
        }
        if let Err(e) = check_no_overlap(&index, venue_id, &span) {
            tracing::warn!("slot [{}, {}) rejected for venue {venue_id}: {e}", span.start, span.end);
            return Err(e);
        }

        let record = SlotRecord {
            id: self.next_id(),
            venue_id,
            span,
            created_at: now_ms(),
        };
        let event = Event::SlotCreated {
            id: record.id,
            venue_id,
            span,
            at: record.created_at,
        };
        self.wal_append(&event).await?;
        index.insert(record.id, span);
        let cell = SlotCell {
            status: SlotStatus::Available,
            updated_at: record.created_at,
        };
        self.slots.insert(
            record.id,
            Arc::new(SlotEntry {
                record,
                cell: RwLock::new(cell),
            }),
        );
        drop(index);

        tracing::info!("slot {} created for venue {venue_id}: [{}, {})", record.id, span.start, span.end);
        Ok(slot_info(&venue.venue, &record, &cell))
    }

    pub async fn get_slot(&self, id: Ulid) -> Result<SlotInfo, EngineError> {
        let slot = self
            .get_slot_entry(&id)
            .ok_or(EngineError::NotFound(Entity::Slot, id))?;
        let venue = self.get_venue(slot.record.venue_id)?;
        let cell = *slot.cell.read().await;
        Ok(slot_info(&venue, &slot.record, &cell))
    }

    /// All slots of a venue in start-time order, whatever their status.
    pub async fn list_slots(&self, venue_id: Ulid) -> Result<Vec<SlotInfo>, EngineError> {
        let venue = self
            .get_venue_entry(&venue_id)
            .ok_or(EngineError::NotFound(Entity::Venue, venue_id))?;
        let ids: Vec<Ulid> = venue.index.read().await.entries.iter().map(|(id, _)| *id).collect();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(slot) = self.get_slot_entry(&id) {
                let cell = *slot.cell.read().await;
                out.push(slot_info(&venue.venue, &slot.record, &cell));
            }
        }
        Ok(out)
    }
}

pub(super) fn slot_info(venue: &Venue, record: &SlotRecord, cell: &SlotCell) -> SlotInfo {
    SlotInfo {
        id: record.id,
        venue_id: venue.id,
        venue_name: venue.name.clone(),
        sport_id: venue.sport_id.clone(),
        start: record.span.start,
        end: record.span.end,
        status: cell.status,
        created_at: record.created_at,
        updated_at: cell.updated_at,
    }
}
