use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::db::BookingRepository;
use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus, NewBooking, StatusUpdate};
use crate::services::conflicts::ConflictDetector;
use crate::services::locks::{provider_key, resource_key, SlotGuard, SlotLocks};

pub const DEFAULT_ACCEPT_NOTE: &str = "Booking confirmed by provider";
pub const DEFAULT_REJECT_NOTE: &str = "Request rejected by provider";

/// Guarded status transitions and field updates for bookings.
///
/// Every path that checks for conflicts and then writes does so while
/// holding the slot locks of the resources and providers involved.
pub struct BookingLifecycle {
    repo: Arc<dyn BookingRepository>,
    detector: ConflictDetector,
    locks: SlotLocks,
    allow_self_booking: bool,
}

impl BookingLifecycle {
    pub fn new(repo: Arc<dyn BookingRepository>, allow_self_booking: bool) -> Self {
        Self {
            detector: ConflictDetector::new(Arc::clone(&repo)),
            repo,
            locks: SlotLocks::new(),
            allow_self_booking,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Booking, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(id))
    }

    /// Records a new request. The booking always starts out PENDING.
    pub async fn create(&self, input: NewBooking) -> Result<Booking, AppError> {
        let booking = self.validate_new(input)?;

        let _guard = self
            .locks
            .acquire([
                resource_key(&booking.resource_id),
                provider_key(&booking.provider_id),
            ])
            .await;

        self.detector
            .ensure_resource_free(
                &booking.resource_id,
                &booking.start_date,
                &booking.end_date,
                None,
            )
            .await?;

        let created = self.repo.create(booking).await?;
        tracing::info!(
            booking_id = %created.id,
            resource_id = %created.resource_id,
            "booking created"
        );
        Ok(created)
    }

    /// PENDING → CONFIRMED. The only transition that checks both the
    /// resource and the provider.
    pub async fn accept(&self, id: &str, note: Option<String>) -> Result<Booking, AppError> {
        let (_guard, mut booking) = self.lock_booking(id, vec![]).await?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::InvalidState {
                status: booking.status,
            });
        }

        self.detector
            .ensure_resource_free(
                &booking.resource_id,
                &booking.start_date,
                &booking.end_date,
                Some(id),
            )
            .await?;

        if !self
            .detector
            .provider_is_available(
                &booking.provider_id,
                &booking.start_date,
                &booking.end_date,
                Some(id),
            )
            .await?
        {
            tracing::warn!(booking_id = id, provider_id = %booking.provider_id, "provider unavailable");
            return Err(AppError::Unavailable {
                provider_id: booking.provider_id,
            });
        }

        booking.status = BookingStatus::Confirmed;
        booking.provider_note = Some(note_or(note, DEFAULT_ACCEPT_NOTE));
        self.persist(booking).await
    }

    /// PENDING → REJECTED. Rejecting frees the slot, so nothing is re-checked.
    pub async fn reject(&self, id: &str, note: Option<String>) -> Result<Booking, AppError> {
        let (_guard, mut booking) = self.lock_booking(id, vec![]).await?;
        ensure_edge(booking.status, BookingStatus::Rejected)?;

        booking.status = BookingStatus::Rejected;
        booking.provider_note = Some(note_or(note, DEFAULT_REJECT_NOTE));
        self.persist(booking).await
    }

    /// PENDING or CONFIRMED → CANCELLED, by either party.
    pub async fn cancel(&self, id: &str, note: Option<String>) -> Result<Booking, AppError> {
        let (_guard, mut booking) = self.lock_booking(id, vec![]).await?;
        ensure_edge(booking.status, BookingStatus::Cancelled)?;

        booking.status = BookingStatus::Cancelled;
        if let Some(note) = note {
            booking.provider_note = Some(note);
        }
        self.persist(booking).await
    }

    /// Status-only change. Each target goes through its own guarded transition.
    pub async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<Booking, AppError> {
        match BookingStatus::parse(&update.status) {
            Some(BookingStatus::Confirmed) => self.accept(id, update.provider_note).await,
            Some(BookingStatus::Rejected) => self.reject(id, update.provider_note).await,
            Some(BookingStatus::Cancelled) => self.cancel(id, update.provider_note).await,
            Some(BookingStatus::Pending) | None => {
                let current = self.get(id).await?;
                Err(AppError::InvalidTransition {
                    from: current.status.to_string(),
                    to: update.status,
                })
            }
        }
    }

    /// Field and/or status update. Moving the slot of an active booking, or
    /// confirming it, re-runs the conflict checks against the merged record.
    pub async fn update(&self, id: &str, patch: BookingPatch) -> Result<Booking, AppError> {
        let extra_keys: Vec<String> = patch
            .resource_id
            .iter()
            .map(|r| resource_key(r))
            .chain(patch.provider_id.iter().map(|p| provider_key(p)))
            .collect();
        let (_guard, existing) = self.lock_booking(id, extra_keys).await?;

        let merged = self.merge(&existing, &patch)?;
        if merged.status != existing.status {
            ensure_edge(existing.status, merged.status)?;
        }

        let entering_confirmed =
            merged.status == BookingStatus::Confirmed && existing.status != BookingStatus::Confirmed;

        if merged.status.is_active() && (patch.touches_schedule() || entering_confirmed) {
            self.detector
                .ensure_resource_free(
                    &merged.resource_id,
                    &merged.start_date,
                    &merged.end_date,
                    Some(id),
                )
                .await?;
        }

        let provider_moved = merged.provider_id != existing.provider_id;
        if merged.status == BookingStatus::Confirmed
            && (entering_confirmed || patch.touches_schedule() || provider_moved)
            && !self
                .detector
                .provider_is_available(
                    &merged.provider_id,
                    &merged.start_date,
                    &merged.end_date,
                    Some(id),
                )
                .await?
        {
            tracing::warn!(booking_id = id, provider_id = %merged.provider_id, "provider unavailable");
            return Err(AppError::Unavailable {
                provider_id: merged.provider_id,
            });
        }

        self.persist(merged).await
    }

    /// Administrative removal, allowed in any status.
    pub async fn delete(&self, id: &str) -> Result<Booking, AppError> {
        let deleted = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found(id))?;
        tracing::info!(booking_id = id, status = %deleted.status, "booking deleted");
        Ok(deleted)
    }

    /// Loads a booking and locks its resource and provider (plus `extra`).
    /// Retries if the booking was moved while the locks were awaited.
    async fn lock_booking(
        &self,
        id: &str,
        extra: Vec<String>,
    ) -> Result<(SlotGuard, Booking), AppError> {
        loop {
            let seen = self.get(id).await?;
            let keys = [resource_key(&seen.resource_id), provider_key(&seen.provider_id)]
                .into_iter()
                .chain(extra.iter().cloned());
            let guard = self.locks.acquire(keys).await;

            let current = self.get(id).await?;
            if current.resource_id == seen.resource_id && current.provider_id == seen.provider_id {
                return Ok((guard, current));
            }
            tracing::debug!(booking_id = id, "booking moved while awaiting its locks, retrying");
        }
    }

    async fn persist(&self, mut booking: Booking) -> Result<Booking, AppError> {
        booking.updated_at = Utc::now();
        let id = booking.id.clone();
        let saved = self
            .repo
            .update(booking)
            .await?
            .ok_or_else(|| AppError::not_found(&id))?;
        tracing::info!(booking_id = %saved.id, status = %saved.status, "booking saved");
        Ok(saved)
    }

    fn validate_new(&self, mut input: NewBooking) -> Result<Booking, AppError> {
        let mut issues = vec![];
        input.start_date = input.start_date.map(stored_precision);
        input.end_date = input.end_date.map(stored_precision);

        let resource_id = required(&mut issues, "resourceId", input.resource_id);
        let skill_id = required(&mut issues, "skillId", input.skill_id);
        let requester_id = required(&mut issues, "requesterId", input.requester_id);
        let provider_id = required(&mut issues, "providerId", input.provider_id);

        if input.start_date.is_none() {
            issues.push("startDate: is required".to_string());
        }
        if input.end_date.is_none() {
            issues.push("endDate: is required".to_string());
        }
        if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
            if end <= start {
                issues.push("endDate: must be after startDate".to_string());
            }
        }
        if !self.allow_self_booking && !requester_id.is_empty() && requester_id == provider_id {
            issues.push("providerId: must differ from requesterId".to_string());
        }

        let (Some(start_date), Some(end_date)) = (input.start_date, input.end_date) else {
            return Err(AppError::Validation(issues.join("; ")));
        };
        if !issues.is_empty() {
            return Err(AppError::Validation(issues.join("; ")));
        }

        let now = Utc::now();
        Ok(Booking {
            id: Uuid::new_v4().to_string(),
            start_date,
            end_date,
            resource_id,
            skill_id,
            requester_id,
            provider_id,
            status: BookingStatus::Pending,
            requester_note: input.requester_note,
            provider_note: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn merge(&self, existing: &Booking, patch: &BookingPatch) -> Result<Booking, AppError> {
        let mut issues = vec![];
        let mut merged = existing.clone();

        for (field, value, slot) in [
            ("resourceId", &patch.resource_id, &mut merged.resource_id),
            ("skillId", &patch.skill_id, &mut merged.skill_id),
            ("requesterId", &patch.requester_id, &mut merged.requester_id),
            ("providerId", &patch.provider_id, &mut merged.provider_id),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    issues.push(format!("{field}: must not be empty"));
                } else {
                    *slot = value.clone();
                }
            }
        }

        if let Some(start) = patch.start_date {
            merged.start_date = stored_precision(start);
        }
        if let Some(end) = patch.end_date {
            merged.end_date = stored_precision(end);
        }
        if merged.end_date <= merged.start_date {
            issues.push("endDate: must be after startDate".to_string());
        }
        if let Some(status) = patch.status {
            merged.status = status;
        }
        if let Some(note) = &patch.requester_note {
            merged.requester_note = note.clone();
        }
        if let Some(note) = &patch.provider_note {
            merged.provider_note = note.clone();
        }
        if !self.allow_self_booking && merged.requester_id == merged.provider_id {
            issues.push("providerId: must differ from requesterId".to_string());
        }

        if !issues.is_empty() {
            return Err(AppError::Validation(issues.join("; ")));
        }
        Ok(merged)
    }
}

fn required(issues: &mut Vec<String>, field: &str, value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            issues.push(format!("{field}: must not be empty"));
            String::new()
        }
    }
}

fn ensure_edge(from: BookingStatus, to: BookingStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Bounds are kept at millisecond precision, the precision of the stored
/// row, so checks and storage compare the same instants.
fn stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

fn note_or(note: Option<String>, default: &str) -> String {
    note.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
