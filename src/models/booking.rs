use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::services::overlap::overlaps;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub resource_id: String,
    pub skill_id: String,
    pub requester_id: String,
    pub provider_id: String,
    pub status: BookingStatus,
    pub requester_note: Option<String>,
    pub provider_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn overlaps_window(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        overlaps(&self.start_date, &self.end_date, start, end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "REJECTED" => Some(BookingStatus::Rejected),
            _ => None,
        }
    }

    /// Whether a booking in this status claims its slot for conflict checks.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Edges of the booking lifecycle. Staying in place is not an edge.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed) | (Pending, Rejected) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Request shapes ──

/// Body of `POST /bookings`. Fields are optional so that missing ones
/// are reported together as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub resource_id: Option<String>,
    pub skill_id: Option<String>,
    pub requester_id: Option<String>,
    pub provider_id: Option<String>,
    pub requester_note: Option<String>,
}

/// Body of `PATCH /bookings/:id`. Absent fields are left untouched; notes
/// may be sent as `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub resource_id: Option<String>,
    pub skill_id: Option<String>,
    pub requester_id: Option<String>,
    pub provider_id: Option<String>,
    pub status: Option<BookingStatus>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub requester_note: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub provider_note: Option<Option<String>>,
}

impl BookingPatch {
    pub fn touches_schedule(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some() || self.resource_id.is_some()
    }
}

/// Body of `PATCH /bookings/:id/status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: String,
    pub provider_note: Option<String>,
}

/// Optional body of accept, reject and cancel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderNote {
    pub provider_note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingSearch {
    pub status: Option<BookingStatus>,
    pub resource_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Which party or subject a relation lookup filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Requester,
    Provider,
    Resource,
    Skill,
}

impl Relation {
    pub fn column(&self) -> &'static str {
        match self {
            Relation::Requester => "requester_id",
            Relation::Provider => "provider_id",
            Relation::Resource => "resource_id",
            Relation::Skill => "skill_id",
        }
    }
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Rejected,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("pending"), None);
        assert_eq!(BookingStatus::parse("ARCHIVED"), None);
    }

    #[test]
    fn test_only_pending_and_confirmed_are_active() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(!BookingStatus::Rejected.is_active());
    }

    #[test]
    fn test_lifecycle_edges() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        assert!(!Confirmed.can_transition_to(Rejected));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: BookingPatch =
            serde_json::from_str(r#"{"requesterNote": null, "status": "CANCELLED"}"#).unwrap();
        assert_eq!(patch.requester_note, Some(None));
        assert_eq!(patch.provider_note, None);
        assert_eq!(patch.status, Some(BookingStatus::Cancelled));
        assert!(!patch.touches_schedule());

        let patch: BookingPatch = serde_json::from_str(r#"{"resourceId": "r2"}"#).unwrap();
        assert!(patch.touches_schedule());
    }

    #[test]
    fn test_booking_serializes_camel_case() {
        let now = Utc::now();
        let booking = Booking {
            id: "b1".to_string(),
            start_date: now,
            end_date: now + chrono::Duration::hours(1),
            resource_id: "r1".to_string(),
            skill_id: "s1".to_string(),
            requester_id: "u1".to_string(),
            provider_id: "u2".to_string(),
            status: BookingStatus::Pending,
            requester_note: None,
            provider_note: Some("ok".to_string()),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["resourceId"], "r1");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["providerNote"], "ok");
        assert!(json["requesterNote"].is_null());
    }
}
