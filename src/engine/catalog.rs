use std::sync::Arc;

use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::overlap::now_ms;
use super::{Engine, EngineError, Entity, SharedVenue, VenueEntry};

fn require_text(value: &str, missing: &'static str, max: usize, too_long: &'static str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidArgument(missing));
    }
    if value.len() > max {
        return Err(EngineError::LimitExceeded(too_long));
    }
    Ok(())
}

impl Engine {
    pub async fn create_venue(
        &self,
        name: String,
        location: String,
        sport_id: String,
    ) -> Result<Venue, EngineError> {
        require_text(&name, "name is required", MAX_NAME_LEN, "venue name too long")?;
        require_text(&location, "location is required", MAX_LOCATION_LEN, "location too long")?;
        require_text(&sport_id, "sportId is required", MAX_SPORT_ID_LEN, "sportId too long")?;
        if self.venues.len() >= MAX_VENUES {
            return Err(EngineError::LimitExceeded("too many venues"));
        }

        let _gate = self.commit_gate.read().await;
        let venue = Venue {
            id: self.next_id(),
            name,
            location,
            sport_id,
            created_at: now_ms(),
        };
        let event = Event::VenueCreated {
            id: venue.id,
            name: venue.name.clone(),
            location: venue.location.clone(),
            sport_id: venue.sport_id.clone(),
            at: venue.created_at,
        };
        self.wal_append(&event).await?;
        self.venues.insert(
            venue.id,
            Arc::new(VenueEntry {
                venue: venue.clone(),
                index: RwLock::new(SlotIndex::default()),
            }),
        );
        tracing::info!("venue {} created: {:?} ({})", venue.id, venue.name, venue.sport_id);
        Ok(venue)
    }

    pub fn get_venue(&self, id: Ulid) -> Result<Venue, EngineError> {
        self.get_venue_entry(&id)
            .map(|entry| entry.venue.clone())
            .ok_or(EngineError::NotFound(Entity::Venue, id))
    }

    /// Venue entries in creation order, optionally narrowed to one sport.
    /// An empty sport filter means "all venues".
    pub(super) fn venue_entries(&self, sport_id: Option<&str>) -> Vec<SharedVenue> {
        let sport_id = sport_id.filter(|s| !s.is_empty());
        let mut entries: Vec<SharedVenue> = self
            .venues
            .iter()
            .filter(|e| sport_id.is_none_or(|s| e.value().venue.sport_id == s))
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.venue.id);
        entries
    }

    pub fn list_venues(&self, sport_id: Option<&str>) -> Vec<Venue> {
        self.venue_entries(sport_id)
            .into_iter()
            .map(|e| e.venue.clone())
            .collect()
    }

    /// Deleting a venue that still owns slots would orphan them, so it is refused.
    pub async fn delete_venue(&self, id: Ulid) -> Result<(), EngineError> {
        let _gate = self.commit_gate.read().await;
        let entry = self
            .get_venue_entry(&id)
            .ok_or(EngineError::NotFound(Entity::Venue, id))?;
        let index = entry.index.write().await;
        // A concurrent delete may have won while we waited for the index lock.
        if !self.venues.contains_key(&id) {
            return Err(EngineError::NotFound(Entity::Venue, id));
        }
        if !index.is_empty() {
            return Err(EngineError::VenueHasSlots(id));
        }

        self.wal_append(&Event::VenueDeleted { id }).await?;
        self.venues.remove(&id);
        drop(index);
        tracing::info!("venue {id} deleted");
        Ok(())
    }

    /// Insert or rename a sport by its upstream identifier.
    /// Returns `false` without writing anything when nothing changed.
    pub async fn upsert_sport(&self, sport_id: String, name: String) -> Result<bool, EngineError> {
        require_text(&sport_id, "sport id is required", MAX_SPORT_ID_LEN, "sport id too long")?;
        require_text(&name, "sport name is required", MAX_NAME_LEN, "sport name too long")?;
        if self
            .sports
            .get(&sport_id)
            .is_some_and(|existing| existing.name == name)
        {
            return Ok(false);
        }

        let _gate = self.commit_gate.read().await;
        let at = now_ms();
        let event = Event::SportUpserted {
            sport_id: sport_id.clone(),
            name: name.clone(),
            at,
        };
        self.wal_append(&event).await?;
        self.sports.insert(
            sport_id.clone(),
            Sport {
                sport_id,
                name,
                synced_at: at,
            },
        );
        Ok(true)
    }

    pub fn list_sports(&self) -> Vec<Sport> {
        let mut sports: Vec<Sport> = self.sports.iter().map(|e| e.value().clone()).collect();
        sports.sort_by(|a, b| a.sport_id.cmp(&b.sport_id));
        sports
    }
}
