use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::BookingRepository;
use crate::services::lifecycle::BookingLifecycle;

pub struct AppState {
    pub repo: Arc<dyn BookingRepository>,
    pub bookings: BookingLifecycle,
}

impl AppState {
    pub fn new(config: &AppConfig, repo: Arc<dyn BookingRepository>) -> Self {
        let bookings = BookingLifecycle::new(Arc::clone(&repo), config.allow_self_booking);
        Self {
            repo,
            bookings,
        }
    }
}
