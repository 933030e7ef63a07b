mod availability;
mod booking;
mod catalog;
mod compact;
mod error;
mod overlap;
mod slots;

pub use error::{EngineError, Entity};
pub use overlap::now_ms;

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockWriteGuard, mpsc, oneshot};
use ulid::Ulid;

use crate::model::*;
use crate::wal::Wal;

/// A venue plus the interval index of its slots. Slot creation holds the
/// index write lock, which serializes overlap checks per venue.
pub struct VenueEntry {
    pub venue: Venue,
    pub index: RwLock<SlotIndex>,
}

/// A slot's immutable record plus its lock-protected status.
/// Holding `cell` for write is the exclusive access that reserve and cancel need.
pub struct SlotEntry {
    pub record: SlotRecord,
    pub cell: RwLock<SlotCell>,
}

pub type SharedVenue = Arc<VenueEntry>;
pub type SharedSlot = Arc<SlotEntry>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty
                    }
                }

                metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE)
                    .record(batch.len() as f64);
                let flush_start = Instant::now();
                let result = flush_batch(&mut wal, &batch);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                if let Err(e) = &result {
                    tracing::error!("WAL flush failed for batch of {}: {e}", batch.len());
                }
                respond_batch(batch, &result);

                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush so partially buffered bytes don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// Apply a reservation or cancellation to a slot's mutable state and the
/// booking table. Caller holds the slot's write lock (or owns the cell during replay).
fn apply_to_slot(cell: &mut SlotCell, event: &Event, bookings: &DashMap<Ulid, BookingRecord>) {
    match event {
        Event::SlotReserved {
            slot_id,
            booking_id,
            requester,
            at,
        } => {
            cell.status = SlotStatus::Booked;
            cell.updated_at = *at;
            bookings.insert(
                *booking_id,
                BookingRecord {
                    id: *booking_id,
                    slot_id: *slot_id,
                    requester: requester.clone(),
                    status: BookingStatus::Confirmed,
                    created_at: *at,
                    cancelled_at: None,
                },
            );
        }
        Event::BookingCancelled { booking_id, at, .. } => {
            cell.status = SlotStatus::Available;
            cell.updated_at = *at;
            if let Some(mut booking) = bookings.get_mut(booking_id) {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(*at);
            }
        }
        // Catalog and slot-creation events are handled at the map level
        Event::SportUpserted { .. }
        | Event::VenueCreated { .. }
        | Event::VenueDeleted { .. }
        | Event::SlotCreated { .. } => {}
    }
}

pub struct Engine {
    pub(super) venues: DashMap<Ulid, SharedVenue>,
    pub(super) slots: DashMap<Ulid, SharedSlot>,
    pub(super) bookings: DashMap<Ulid, BookingRecord>,
    pub(super) sports: DashMap<String, Sport>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Mutations hold this shared from before they take any entity lock until
    /// they are applied; compaction holds it exclusively.
    pub(super) commit_gate: RwLock<()>,
    pub(super) lock_timeout: Duration,
    /// Monotonic, so id order is creation order even within one millisecond.
    id_gen: std::sync::Mutex<ulid::Generator>,
}

impl Engine {
    pub fn new(wal_path: PathBuf, lock_timeout: Duration) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            venues: DashMap::new(),
            slots: DashMap::new(),
            bookings: DashMap::new(),
            sports: DashMap::new(),
            wal_tx,
            commit_gate: RwLock::new(()),
            lock_timeout,
            id_gen: std::sync::Mutex::new(ulid::Generator::new()),
        };
        engine.restore(&events);
        tracing::info!(
            "replayed {} events: {} venues, {} slots, {} bookings",
            events.len(),
            engine.venues.len(),
            engine.slots.len(),
            engine.bookings.len()
        );
        Ok(engine)
    }

    /// Rebuild in-memory state from replayed events. State is assembled in
    /// plain maps first so no lock is touched until it is published.
    fn restore(&self, events: &[Event]) {
        let mut venues: HashMap<Ulid, (Venue, SlotIndex)> = HashMap::new();
        let mut slots: HashMap<Ulid, (SlotRecord, SlotCell)> = HashMap::new();

        for event in events {
            match event {
                Event::SportUpserted { sport_id, name, at } => {
                    self.sports.insert(
                        sport_id.clone(),
                        Sport {
                            sport_id: sport_id.clone(),
                            name: name.clone(),
                            synced_at: *at,
                        },
                    );
                }
                Event::VenueCreated {
                    id,
                    name,
                    location,
                    sport_id,
                    at,
                } => {
                    let venue = Venue {
                        id: *id,
                        name: name.clone(),
                        location: location.clone(),
                        sport_id: sport_id.clone(),
                        created_at: *at,
                    };
                    venues.insert(*id, (venue, SlotIndex::default()));
                }
                Event::VenueDeleted { id } => {
                    venues.remove(id);
                }
                Event::SlotCreated {
                    id,
                    venue_id,
                    span,
                    at,
                } => {
                    let Some((_, index)) = venues.get_mut(venue_id) else {
                        tracing::warn!("replay: slot {id} references unknown venue {venue_id}");
                        continue;
                    };
                    index.insert(*id, *span);
                    let record = SlotRecord {
                        id: *id,
                        venue_id: *venue_id,
                        span: *span,
                        created_at: *at,
                    };
                    let cell = SlotCell {
                        status: SlotStatus::Available,
                        updated_at: *at,
                    };
                    slots.insert(*id, (record, cell));
                }
                Event::SlotReserved { slot_id, .. } | Event::BookingCancelled { slot_id, .. } => {
                    match slots.get_mut(slot_id) {
                        Some((_, cell)) => apply_to_slot(cell, event, &self.bookings),
                        None => tracing::warn!("replay: event for unknown slot {slot_id}"),
                    }
                }
            }
        }

        for (id, (venue, index)) in venues {
            self.venues.insert(
                id,
                Arc::new(VenueEntry {
                    venue,
                    index: RwLock::new(index),
                }),
            );
        }
        for (id, (record, cell)) in slots {
            self.slots.insert(
                id,
                Arc::new(SlotEntry {
                    record,
                    cell: RwLock::new(cell),
                }),
            );
        }
    }

    pub(super) fn next_id(&self) -> Ulid {
        let mut generator = self.id_gen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only fails once 2^80 ids were issued in one millisecond
        generator.generate().unwrap_or_else(|_| Ulid::new())
    }

    /// Write event to WAL via the background group-commit writer.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub fn get_venue_entry(&self, id: &Ulid) -> Option<SharedVenue> {
        self.venues.get(id).map(|e| e.value().clone())
    }

    pub fn get_slot_entry(&self, id: &Ulid) -> Option<SharedSlot> {
        self.slots.get(id).map(|e| e.value().clone())
    }

    /// Acquire exclusive access to one slot, bounded by the lock timeout.
    pub(super) async fn lock_slot<'a>(
        &self,
        slot: &'a SlotEntry,
    ) -> Result<RwLockWriteGuard<'a, SlotCell>, EngineError> {
        let wait_start = Instant::now();
        let guard = tokio::time::timeout(self.lock_timeout, slot.cell.write())
            .await
            .map_err(|_| {
                tracing::warn!("timed out waiting for lock on slot {}", slot.record.id);
                EngineError::LockTimeout(slot.record.id)
            })?;
        metrics::histogram!(crate::observability::SLOT_LOCK_WAIT_SECONDS)
            .record(wait_start.elapsed().as_secs_f64());
        Ok(guard)
    }
}
