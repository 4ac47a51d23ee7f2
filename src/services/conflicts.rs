use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::BookingRepository;
use crate::errors::AppError;

/// Decides whether a candidate interval collides with active bookings on
/// the same resource or the same provider.
#[derive(Clone)]
pub struct ConflictDetector {
    repo: Arc<dyn BookingRepository>,
}

impl ConflictDetector {
    pub fn new(repo: Arc<dyn BookingRepository>) -> Self {
        Self { repo }
    }

    pub async fn resource_has_conflict(
        &self,
        resource_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let active = self
            .repo
            .find_active_by_resource(resource_id, exclude_id)
            .await?;
        Ok(active.iter().any(|b| b.overlaps_window(start, end)))
    }

    /// Create and update paths treat a resource collision as a hard failure.
    pub async fn ensure_resource_free(
        &self,
        resource_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<(), AppError> {
        if self
            .resource_has_conflict(resource_id, start, end, exclude_id)
            .await?
        {
            tracing::warn!(resource_id, %start, %end, "resource already booked");
            return Err(AppError::Conflict {
                resource_id: resource_id.to_string(),
            });
        }
        Ok(())
    }

    /// True when the provider has no active booking meeting the interval.
    pub async fn provider_is_available(
        &self,
        provider_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let active = self
            .repo
            .find_active_by_provider(provider_id, exclude_id)
            .await?;
        Ok(!active.iter().any(|b| b.overlaps_window(start, end)))
    }
}
