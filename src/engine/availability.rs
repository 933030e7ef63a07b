use futures::stream::{self, Stream, StreamExt};
use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError, SharedVenue};

impl Engine {
    /// Available slots lying entirely inside `[start, end)`, optionally for one sport.
    ///
    /// Containment, not overlap: a slot that starts before the window is not
    /// reported even if it runs into it. Results come venue by venue (creation
    /// order), then slot by slot within a venue; they are not time-sorted
    /// across venues. This is a snapshot only; `reserve` decides who wins.
    ///
    /// Each slot's status is read under its cell read lock, so a search waits
    /// behind an in-flight `reserve` or `cancel` on that slot until its WAL
    /// record is durable. It never holds more than one lock at a time.
    pub fn find_available<'a>(
        &'a self,
        sport_id: Option<&'a str>,
        start: Ms,
        end: Ms,
    ) -> Result<impl Stream<Item = AvailableSlot> + 'a, EngineError> {
        if start >= end {
            return Err(EngineError::InvalidArgument("start time must be before end time"));
        }
        let window = Span::new(start, end);
        let venues = self.venue_entries(sport_id);

        Ok(stream::iter(venues)
            .then(move |venue| async move { self.available_in_venue(&venue, &window).await })
            .flat_map(stream::iter))
    }

    async fn available_in_venue(&self, venue: &SharedVenue, window: &Span) -> Vec<AvailableSlot> {
        // Release the venue index before touching any slot lock.
        let candidates: Vec<(Ulid, Span)> = venue
            .index
            .read()
            .await
            .contained_in(window)
            .copied()
            .collect();

        let mut out = Vec::new();
        for (slot_id, span) in candidates {
            let Some(slot) = self.get_slot_entry(&slot_id) else {
                continue;
            };
            if slot.cell.read().await.status != SlotStatus::Available {
                continue;
            }
            out.push(AvailableSlot {
                venue_id: venue.venue.id,
                venue_name: venue.venue.name.clone(),
                location: venue.venue.location.clone(),
                sport_id: venue.venue.sport_id.clone(),
                slot_id,
                start: span.start,
                end: span.end,
            });
        }
        out
    }
}
