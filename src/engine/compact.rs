use std::collections::HashMap;

use tokio::sync::oneshot;
use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Rewrite the WAL with only the events needed to recreate the current state.
    ///
    /// Holds the commit gate exclusively, so no mutation can land between the
    /// snapshot and the file swap.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.commit_gate.write().await;
        let events = self.snapshot_events().await;
        let count = events.len();

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        tracing::info!("WAL compacted to {count} events");
        Ok(())
    }

    /// Order matters for replay: sports, venues, slots, then per slot its
    /// cancelled bookings by cancellation time and finally the live one.
    /// A slot only reopens on cancel, so this reproduces both the final status
    /// and the final `updated_at`.
    async fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();

        for sport in self.list_sports() {
            events.push(Event::SportUpserted {
                sport_id: sport.sport_id,
                name: sport.name,
                at: sport.synced_at,
            });
        }

        let mut by_slot: HashMap<Ulid, Vec<BookingRecord>> = HashMap::new();
        for entry in self.bookings.iter() {
            by_slot
                .entry(entry.value().slot_id)
                .or_default()
                .push(entry.value().clone());
        }

        for venue in self.venue_entries(None) {
            events.push(Event::VenueCreated {
                id: venue.venue.id,
                name: venue.venue.name.clone(),
                location: venue.venue.location.clone(),
                sport_id: venue.venue.sport_id.clone(),
                at: venue.venue.created_at,
            });

            let slot_ids: Vec<Ulid> = venue.index.read().await.entries.iter().map(|(id, _)| *id).collect();
            for slot_id in slot_ids {
                let Some(slot) = self.get_slot_entry(&slot_id) else {
                    continue;
                };
                events.push(Event::SlotCreated {
                    id: slot.record.id,
                    venue_id: slot.record.venue_id,
                    span: slot.record.span,
                    at: slot.record.created_at,
                });

                let mut history = by_slot.remove(&slot_id).unwrap_or_default();
                history.sort_by_key(|b| (b.status == BookingStatus::Confirmed, b.cancelled_at, b.created_at));
                for booking in history {
                    events.push(Event::SlotReserved {
                        slot_id,
                        booking_id: booking.id,
                        requester: booking.requester,
                        at: booking.created_at,
                    });
                    if let Some(at) = booking.cancelled_at {
                        events.push(Event::BookingCancelled {
                            booking_id: booking.id,
                            slot_id,
                            at,
                        });
                    }
                }
            }
        }

        events
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
