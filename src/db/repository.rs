use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, BookingSearch, Relation};

/// Durable storage of booking records. The lifecycle service and the
/// conflict detector only see this trait, so tests can swap in doubles.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// PENDING or CONFIRMED bookings on a resource.
    async fn find_active_by_resource(
        &self,
        resource_id: &str,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>>;

    /// PENDING or CONFIRMED bookings served by a provider, on any resource.
    async fn find_active_by_provider(
        &self,
        provider_id: &str,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>>;

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Booking>>;

    async fn create(&self, booking: Booking) -> anyhow::Result<Booking>;

    /// Replaces the stored record with the same id. `None` if it is gone.
    async fn update(&self, booking: Booking) -> anyhow::Result<Option<Booking>>;

    async fn delete(&self, id: &str) -> anyhow::Result<Option<Booking>>;

    async fn search(&self, search: &BookingSearch) -> anyhow::Result<Vec<Booking>>;

    async fn find_by(&self, relation: Relation, key: &str) -> anyhow::Result<Vec<Booking>>;

    async fn history(&self, user_id: &str) -> anyhow::Result<Vec<Booking>>;
}

pub struct SqliteBookingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookingRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection mutex poisoned"))?;
        f(&conn)
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn find_active_by_resource(
        &self,
        resource_id: &str,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|conn| {
            queries::get_active_bookings(conn, Relation::Resource, resource_id, exclude_id)
        })
    }

    async fn find_active_by_provider(
        &self,
        provider_id: &str,
        exclude_id: Option<&str>,
    ) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|conn| {
            queries::get_active_bookings(conn, Relation::Provider, provider_id, exclude_id)
        })
    }

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        self.with_conn(|conn| queries::get_booking_by_id(conn, id))
    }

    async fn create(&self, booking: Booking) -> anyhow::Result<Booking> {
        self.with_conn(|conn| {
            queries::insert_booking(conn, &booking)?;
            queries::get_booking_by_id(conn, &booking.id)?
                .with_context(|| format!("booking {} vanished after insert", booking.id))
        })
    }

    async fn update(&self, booking: Booking) -> anyhow::Result<Option<Booking>> {
        self.with_conn(|conn| {
            if !queries::update_booking(conn, &booking)? {
                return Ok(None);
            }
            queries::get_booking_by_id(conn, &booking.id)
        })
    }

    async fn delete(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        self.with_conn(|conn| {
            let Some(existing) = queries::get_booking_by_id(conn, id)? else {
                return Ok(None);
            };
            queries::delete_booking(conn, id)?;
            Ok(Some(existing))
        })
    }

    async fn search(&self, search: &BookingSearch) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|conn| queries::search_bookings(conn, search))
    }

    async fn find_by(&self, relation: Relation, key: &str) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|conn| queries::get_bookings_by(conn, relation, key))
    }

    async fn history(&self, user_id: &str) -> anyhow::Result<Vec<Booking>> {
        self.with_conn(|conn| queries::get_booking_history(conn, user_id))
    }
}
