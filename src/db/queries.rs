use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::timestamp::{from_store, to_store};
use crate::models::{
    Area, Availability, Booking, BookingStatus, BookingWithClient, Client, ClientDetails, Tutor,
};

fn get_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    from_store(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Areas ──

pub fn list_areas(conn: &Connection) -> rusqlite::Result<Vec<Area>> {
    let mut stmt = conn.prepare("SELECT id, name FROM areas ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Area {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn upsert_area(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO areas (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    conn.query_row("SELECT id FROM areas WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
}

pub fn areas_for_tutor(conn: &Connection, tutor_id: i64) -> rusqlite::Result<Vec<Area>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name FROM areas a
         INNER JOIN tutor_areas ta ON ta.area_id = a.id
         WHERE ta.tutor_id = ?1 ORDER BY a.name ASC",
    )?;
    let rows = stmt.query_map(params![tutor_id], |row| {
        Ok(Area {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

// ── Tutors ──

/// Inserts or refreshes a tutor keyed by email and links the named areas.
pub fn upsert_tutor(
    conn: &Connection,
    name: &str,
    email: &str,
    phone: &str,
    areas: &[&str],
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tutors (name, email, phone) VALUES (?1, ?2, ?3)
         ON CONFLICT(email) DO UPDATE SET name = excluded.name, phone = excluded.phone",
        params![name, email, phone],
    )?;
    let tutor_id: i64 = conn.query_row(
        "SELECT id FROM tutors WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;

    for area in areas {
        let area_id = upsert_area(conn, area)?;
        conn.execute(
            "INSERT OR IGNORE INTO tutor_areas (tutor_id, area_id) VALUES (?1, ?2)",
            params![tutor_id, area_id],
        )?;
    }
    Ok(tutor_id)
}

pub fn list_tutors(conn: &Connection, area: Option<&str>) -> rusqlite::Result<Vec<Tutor>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.email, t.phone FROM tutors t
         WHERE ?1 IS NULL OR EXISTS (
             SELECT 1 FROM tutor_areas ta INNER JOIN areas a ON a.id = ta.area_id
             WHERE ta.tutor_id = t.id AND a.name = ?1
         )
         ORDER BY t.id ASC",
    )?;
    let rows = stmt.query_map(params![area], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut tutors = vec![];
    for row in rows {
        let (id, name, email, phone) = row?;
        tutors.push(Tutor {
            id,
            name,
            email,
            phone,
            areas: areas_for_tutor(conn, id)?,
        });
    }
    Ok(tutors)
}

pub fn get_tutor(conn: &Connection, id: i64) -> rusqlite::Result<Option<Tutor>> {
    let result = conn.query_row(
        "SELECT id, name, email, phone FROM tutors WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((name, email, phone)) => Ok(Some(Tutor {
            id,
            name,
            email,
            phone,
            areas: areas_for_tutor(conn, id)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

// ── Availability ──

const SLOT_COLUMNS: &str = "id, tutor_id, start_time, end_time, is_booked";

fn parse_slot_row(row: &rusqlite::Row) -> rusqlite::Result<Availability> {
    Ok(Availability {
        id: row.get(0)?,
        tutor_id: row.get(1)?,
        start_time: get_ts(row, 2)?,
        end_time: get_ts(row, 3)?,
        is_booked: row.get::<_, i32>(4)? != 0,
    })
}

pub fn insert_availability(
    conn: &Connection,
    tutor_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<Availability> {
    conn.execute(
        "INSERT INTO availabilities (tutor_id, start_time, end_time, is_booked) VALUES (?1, ?2, ?3, 0)",
        params![tutor_id, to_store(start), to_store(end)],
    )?;
    Ok(Availability {
        id: conn.last_insert_rowid(),
        tutor_id,
        start_time: *start,
        end_time: *end,
        is_booked: false,
    })
}

pub fn get_availability(conn: &Connection, id: i64) -> rusqlite::Result<Option<Availability>> {
    conn.query_row(
        &format!("SELECT {SLOT_COLUMNS} FROM availabilities WHERE id = ?1"),
        params![id],
        parse_slot_row,
    )
    .optional()
}

pub fn delete_availability(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM availabilities WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn set_availability_booked(conn: &Connection, id: i64, booked: bool) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE availabilities SET is_booked = ?1 WHERE id = ?2",
        params![booked as i32, id],
    )?;
    Ok(count > 0)
}

pub fn list_availability_for_tutor(
    conn: &Connection,
    tutor_id: i64,
) -> rusqlite::Result<Vec<Availability>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM availabilities WHERE tutor_id = ?1 ORDER BY start_time ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![tutor_id], parse_slot_row)?;
    rows.collect()
}

/// Unbooked slots, narrowed by tutor area and by a `[start, end]` window when given.
pub fn list_open_slots(
    conn: &Connection,
    area: Option<&str>,
    start: Option<&DateTime<Utc>>,
    end: Option<&DateTime<Utc>>,
) -> rusqlite::Result<Vec<Availability>> {
    let mut stmt = conn.prepare(
        "SELECT av.id, av.tutor_id, av.start_time, av.end_time, av.is_booked
         FROM availabilities av
         WHERE av.is_booked = 0
           AND (?1 IS NULL OR EXISTS (
               SELECT 1 FROM tutor_areas ta INNER JOIN areas a ON a.id = ta.area_id
               WHERE ta.tutor_id = av.tutor_id AND a.name = ?1
           ))
           AND (?2 IS NULL OR av.start_time >= ?2)
           AND (?3 IS NULL OR av.end_time <= ?3)
         ORDER BY av.start_time ASC, av.id ASC",
    )?;
    let rows = stmt.query_map(
        params![area, start.map(to_store), end.map(to_store)],
        parse_slot_row,
    )?;
    rows.collect()
}

/// Earliest unbooked slot of `tutor_id` that fully contains `[start, end)`.
pub fn find_containing_slot(
    conn: &Connection,
    tutor_id: i64,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<Option<Availability>> {
    conn.query_row(
        &format!(
            "SELECT {SLOT_COLUMNS} FROM availabilities
             WHERE tutor_id = ?1 AND is_booked = 0 AND start_time <= ?2 AND end_time >= ?3
             ORDER BY start_time ASC, id ASC LIMIT 1"
        ),
        params![tutor_id, to_store(start), to_store(end)],
        parse_slot_row,
    )
    .optional()
}

// ── Clients ──

const CLIENT_COLUMNS: &str = "id, name, email, phone, notes, created_at, updated_at";

fn parse_client_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        phone: row.get(offset + 3)?,
        notes: row.get(offset + 4)?,
        created_at: get_ts(row, offset + 5)?,
        updated_at: get_ts(row, offset + 6)?,
    })
}

/// Creates the client for `details.email`, or overwrites name, phone and notes
/// of the existing one.
pub fn upsert_client(
    conn: &Connection,
    details: &ClientDetails,
    now: &DateTime<Utc>,
) -> rusqlite::Result<Client> {
    let now = to_store(now);
    conn.execute(
        "INSERT INTO clients (name, email, phone, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(email) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone,
           notes = excluded.notes,
           updated_at = excluded.updated_at",
        params![details.name, details.email, details.phone, details.notes, now],
    )?;
    get_client_by_email(conn, &details.email)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_client(conn: &Connection, id: i64) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
        params![id],
        |row| parse_client_row(row, 0),
    )
    .optional()
}

pub fn get_client_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1"),
        params![email],
        |row| parse_client_row(row, 0),
    )
    .optional()
}

// ── Bookings ──

const BOOKING_COLUMNS: &str =
    "b.id, b.tutor_id, b.client_id, b.availability_id, b.start_time, b.end_time, b.area, b.status, b.created_at, b.updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let status_str: String = row.get(7)?;
    let status = BookingStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown booking status: {status_str}").into(),
        )
    })?;

    Ok(Booking {
        id: row.get(0)?,
        tutor_id: row.get(1)?,
        client_id: row.get(2)?,
        availability_id: row.get(3)?,
        start_time: get_ts(row, 4)?,
        end_time: get_ts(row, 5)?,
        area: row.get(6)?,
        status,
        created_at: get_ts(row, 8)?,
        updated_at: get_ts(row, 9)?,
    })
}

pub struct NewBooking<'a> {
    pub tutor_id: i64,
    pub client_id: i64,
    pub availability_id: i64,
    pub start: &'a DateTime<Utc>,
    pub end: &'a DateTime<Utc>,
    pub area: &'a str,
}

pub fn insert_booking(
    conn: &Connection,
    booking: &NewBooking<'_>,
    now: &DateTime<Utc>,
) -> rusqlite::Result<Booking> {
    conn.execute(
        "INSERT INTO bookings (tutor_id, client_id, availability_id, start_time, end_time, area, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            booking.tutor_id,
            booking.client_id,
            booking.availability_id,
            to_store(booking.start),
            to_store(booking.end),
            booking.area,
            BookingStatus::Pending.as_str(),
            to_store(now),
        ],
    )?;
    Ok(Booking {
        id: conn.last_insert_rowid(),
        tutor_id: booking.tutor_id,
        client_id: booking.client_id,
        availability_id: Some(booking.availability_id),
        start_time: *booking.start,
        end_time: *booking.end,
        area: booking.area.to_string(),
        status: BookingStatus::Pending,
        created_at: *now,
        updated_at: *now,
    })
}

pub fn get_booking_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"),
        params![id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// PENDING or APPROVED bookings of `tutor_id` that end after `after`, by start time.
pub fn active_bookings_ending_after(
    conn: &Connection,
    tutor_id: i64,
    after: &DateTime<Utc>,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings b
         WHERE b.tutor_id = ?1
           AND b.status IN ('PENDING', 'APPROVED')
           AND b.end_time > ?2
         ORDER BY b.start_time ASC, b.id ASC"
    ))?;
    let rows = stmt.query_map(params![tutor_id, to_store(after)], parse_booking_row)?;
    rows.collect()
}

pub fn update_booking_status(
    conn: &Connection,
    id: i64,
    status: BookingStatus,
    now: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), to_store(now), id],
    )?;
    Ok(count > 0)
}

pub fn list_bookings_for_tutor(
    conn: &Connection,
    tutor_id: i64,
) -> rusqlite::Result<Vec<BookingWithClient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS}, c.id, c.name, c.email, c.phone, c.notes, c.created_at, c.updated_at
         FROM bookings b INNER JOIN clients c ON c.id = b.client_id
         WHERE b.tutor_id = ?1
         ORDER BY b.start_time ASC, b.id ASC"
    ))?;
    let rows = stmt.query_map(params![tutor_id], |row| {
        Ok(BookingWithClient {
            booking: parse_booking_row(row)?,
            client: parse_client_row(row, 10)?,
        })
    })?;
    rows.collect()
}
