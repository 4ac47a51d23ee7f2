use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingSearch, BookingStatus, Relation};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const BOOKING_COLUMNS: &str = "id, start_date, end_date, resource_id, skill_id, requester_id, provider_id, \
     status, requester_note, provider_note, created_at, updated_at";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("malformed timestamp in bookings table: {s}"))?;
    Ok(naive.and_utc())
}

// ── Writes ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, start_date, end_date, resource_id, skill_id, requester_id, provider_id, status, requester_note, provider_note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            format_timestamp(&booking.start_date),
            format_timestamp(&booking.end_date),
            booking.resource_id,
            booking.skill_id,
            booking.requester_id,
            booking.provider_id,
            booking.status.as_str(),
            booking.requester_note,
            booking.provider_note,
            format_timestamp(&booking.created_at),
            format_timestamp(&booking.updated_at),
        ],
    )
    .with_context(|| format!("failed to insert booking {}", booking.id))?;
    Ok(())
}

/// Overwrites every mutable column of an existing row. Returns false when
/// no row carries the booking's id.
pub fn update_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn
        .execute(
            "UPDATE bookings SET start_date = ?1, end_date = ?2, resource_id = ?3, skill_id = ?4,
                requester_id = ?5, provider_id = ?6, status = ?7, requester_note = ?8,
                provider_note = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                format_timestamp(&booking.start_date),
                format_timestamp(&booking.end_date),
                booking.resource_id,
                booking.skill_id,
                booking.requester_id,
                booking.provider_id,
                booking.status.as_str(),
                booking.requester_note,
                booking.provider_note,
                format_timestamp(&booking.updated_at),
                booking.id,
            ],
        )
        .with_context(|| format!("failed to update booking {}", booking.id))?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn
        .execute("DELETE FROM bookings WHERE id = ?1", params![id])
        .with_context(|| format!("failed to delete booking {id}"))?;
    Ok(count > 0)
}

// ── Reads ──

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;

    row.transpose()
}

/// Active bookings (PENDING or CONFIRMED) whose `relation` column equals `key`,
/// optionally leaving one booking out.
pub fn get_active_bookings(
    conn: &Connection,
    relation: Relation,
    key: &str,
    exclude_id: Option<&str>,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE {} = ?1 AND status IN ('PENDING', 'CONFIRMED') AND (?2 IS NULL OR id != ?2)
         ORDER BY start_date ASC",
        relation.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![key, exclude_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_by(
    conn: &Connection,
    relation: Relation,
    key: &str,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {} = ?1 ORDER BY start_date ASC",
        relation.column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![key], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Every booking a user took part in, as requester or provider, newest first.
pub fn get_booking_history(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE requester_id = ?1 OR provider_id = ?1
         ORDER BY start_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn search_bookings(conn: &Connection, search: &BookingSearch) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(start) = &search.start_date {
        clauses.push("start_date >= ?");
        params_vec.push(Box::new(format_timestamp(start)));
    }
    if let Some(end) = &search.end_date {
        clauses.push("end_date <= ?");
        params_vec.push(Box::new(format_timestamp(end)));
    }
    if let Some(status) = &search.status {
        clauses.push("status = ?");
        params_vec.push(Box::new(status.as_str()));
    }
    if let Some(resource_id) = &search.resource_id {
        clauses.push("resource_id = ?");
        params_vec.push(Box::new(resource_id.clone()));
    }

    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY start_date ASC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_date_str: String = row.get(1)?;
    let end_date_str: String = row.get(2)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("unknown booking status in bookings table: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        start_date: parse_timestamp(&start_date_str)?,
        end_date: parse_timestamp(&end_date_str)?,
        resource_id: row.get(3)?,
        skill_id: row.get(4)?,
        requester_id: row.get(5)?,
        provider_id: row.get(6)?,
        status,
        requester_note: row.get(8)?,
        provider_note: row.get(9)?,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}
