use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

pub const WIRE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `yyyy-MM-dd HH:mm:ss`, read as UTC.
pub fn parse_wire_time(s: &str) -> Result<Ms, chrono::ParseError> {
    chrono::NaiveDateTime::parse_from_str(s.trim(), WIRE_TIME_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub fn format_wire_time(ms: Ms) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.naive_utc().format(WIRE_TIME_FORMAT).to_string(),
        None => ms.to_string(),
    }
}

/// Serde adapter between `Ms` and the wire time format.
pub mod wire_time {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::Ms;

    pub fn serialize<S: Serializer>(ms: &Ms, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_wire_time(*ms))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Ms, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_wire_time(&raw).map_err(|e| {
            serde::de::Error::custom(format!("expected yyyy-MM-dd HH:mm:ss, got {raw:?}: {e}"))
        })
    }

    pub mod option {
        use serde::Serializer;

        use crate::model::Ms;

        pub fn serialize<S: Serializer>(ms: &Option<Ms>, s: S) -> Result<S::Ok, S::Error> {
            match ms {
                Some(ms) => super::serialize(ms, s),
                None => s.serialize_none(),
            }
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVenueRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub sport_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    #[serde(with = "wire_time")]
    pub start_time: Ms,
    #[serde(with = "wire_time")]
    pub end_time: Ms,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub slot_id: Ulid,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueFilter {
    pub sport_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub sport_id: Option<String>,
    #[serde(with = "wire_time")]
    pub start_time: Ms,
    #[serde(with = "wire_time")]
    pub end_time: Ms,
}

// ── Responses ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueDto {
    pub id: Ulid,
    pub name: String,
    pub location: String,
    pub sport_id: String,
    #[serde(with = "wire_time")]
    pub created_at: Ms,
}

impl From<Venue> for VenueDto {
    fn from(v: Venue) -> Self {
        Self {
            id: v.id,
            name: v.name,
            location: v.location,
            sport_id: v.sport_id,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub id: Ulid,
    pub venue_id: Ulid,
    pub venue_name: String,
    pub sport_id: String,
    #[serde(with = "wire_time")]
    pub start_time: Ms,
    #[serde(with = "wire_time")]
    pub end_time: Ms,
    pub status: &'static str,
    #[serde(with = "wire_time")]
    pub created_at: Ms,
    #[serde(with = "wire_time")]
    pub updated_at: Ms,
}

impl From<SlotInfo> for SlotDto {
    fn from(s: SlotInfo) -> Self {
        Self {
            id: s.id,
            venue_id: s.venue_id,
            venue_name: s.venue_name,
            sport_id: s.sport_id,
            start_time: s.start,
            end_time: s.end,
            status: s.status.as_str(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDto {
    pub id: Ulid,
    pub slot_id: Ulid,
    pub venue_id: Ulid,
    pub venue_name: String,
    pub user_name: String,
    #[serde(with = "wire_time")]
    pub slot_start_time: Ms,
    #[serde(with = "wire_time")]
    pub slot_end_time: Ms,
    pub status: &'static str,
    #[serde(with = "wire_time")]
    pub created_at: Ms,
    #[serde(serialize_with = "wire_time::option::serialize")]
    pub cancelled_at: Option<Ms>,
}

impl From<BookingInfo> for BookingDto {
    fn from(b: BookingInfo) -> Self {
        Self {
            id: b.id,
            slot_id: b.slot_id,
            venue_id: b.venue_id,
            venue_name: b.venue_name,
            user_name: b.requester,
            slot_start_time: b.slot_start,
            slot_end_time: b.slot_end,
            status: b.status.as_str(),
            created_at: b.created_at,
            cancelled_at: b.cancelled_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVenueDto {
    pub venue_id: Ulid,
    pub venue_name: String,
    pub location: String,
    pub sport_id: String,
    pub slot_id: Ulid,
    #[serde(with = "wire_time")]
    pub slot_start_time: Ms,
    #[serde(with = "wire_time")]
    pub slot_end_time: Ms,
}

impl From<AvailableSlot> for AvailableVenueDto {
    fn from(a: AvailableSlot) -> Self {
        Self {
            venue_id: a.venue_id,
            venue_name: a.venue_name,
            location: a.location,
            sport_id: a.sport_id,
            slot_id: a.slot_id,
            slot_start_time: a.start,
            slot_end_time: a.end,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SportDto {
    pub sport_id: String,
    pub sport_name: String,
}

impl From<Sport> for SportDto {
    fn from(s: Sport) -> Self {
        Self {
            sport_id: s.sport_id,
            sport_name: s.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
}
