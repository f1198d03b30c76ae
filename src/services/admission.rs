//! Booking admission: decides whether a requested range may become a booking and
//! applies the result in one immediate transaction, so concurrent requests for the
//! same tutor cannot both consume the same time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries::{self, NewBooking};
use crate::errors::{AppError, Conflict};
use crate::events::{DomainEvent, BOOKING_CREATED, BOOKING_UPDATED};
use crate::models::timestamp::{self, parse_input};
use crate::models::{Booking, BookingStatus, ClientDetails};
use crate::services::notify;
use crate::state::AppState;

/// Half-open interval intersection: `[a_start, a_end)` meets `[b_start, b_end)`.
pub fn overlaps(
    a_start: &DateTime<Utc>,
    a_end: &DateTime<Utc>,
    b_start: &DateTime<Utc>,
    b_end: &DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub tutor_id: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub area: Option<String>,
    pub client: Option<ClientInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub tutor_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub area: String,
    pub client: ClientDetails,
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BookingInput {
    pub fn validate(self) -> Result<BookingRequest, AppError> {
        let client = self.client.unwrap_or_default();
        let (
            Some(tutor_id),
            Some(start_raw),
            Some(end_raw),
            Some(area),
            Some(name),
            Some(email),
        ) = (
            self.tutor_id,
            required(self.start_time),
            required(self.end_time),
            required(self.area),
            required(client.name),
            required(client.email),
        )
        else {
            return Err(AppError::validation("missing required fields"));
        };

        let (Some(start), Some(end)) = (parse_input(&start_raw), parse_input(&end_raw)) else {
            return Err(AppError::validation("invalid timestamp"));
        };
        if start >= end {
            return Err(AppError::validation("invalid time range"));
        }

        Ok(BookingRequest {
            tutor_id,
            start,
            end,
            area,
            client: ClientDetails {
                name,
                email,
                phone: required(client.phone),
                notes: required(client.notes),
            },
        })
    }
}

/// Checks overlap and slot availability, then upserts the client, inserts the
/// booking and marks the slot booked. Nothing is written unless every step passes.
pub fn admit(
    conn: &mut Connection,
    request: &BookingRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let active = queries::active_bookings_ending_after(&tx, request.tutor_id, &request.start)?;
    if let Some(existing) = active
        .iter()
        .find(|b| overlaps(&b.start_time, &b.end_time, &request.start, &request.end))
    {
        tracing::info!(
            tutor_id = request.tutor_id,
            existing_booking = existing.id,
            "rejected overlapping booking"
        );
        return Err(AppError::Conflict(Conflict::Overlap));
    }

    let slot = queries::find_containing_slot(&tx, request.tutor_id, &request.start, &request.end)?
        .ok_or(AppError::Unavailable)?;

    let client = queries::upsert_client(&tx, &request.client, &now)?;
    let booking = queries::insert_booking(
        &tx,
        &NewBooking {
            tutor_id: request.tutor_id,
            client_id: client.id,
            availability_id: slot.id,
            start: &request.start,
            end: &request.end,
            area: &request.area,
        },
        &now,
    )?;
    queries::set_availability_booked(&tx, slot.id, true)?;

    tx.commit()?;
    Ok(booking)
}

/// Result of a status transition. `changed` is false when the booking was already
/// canceled and a repeated cancel left it untouched.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: Booking,
    pub changed: bool,
}

/// Overwrites a booking's status. CANCELED is terminal; canceling releases the
/// consumed slot for rebooking.
pub fn transition(
    conn: &mut Connection,
    booking_id: i64,
    status: BookingStatus,
    now: DateTime<Utc>,
) -> Result<StatusChange, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = queries::get_booking_by_id(&tx, booking_id)?.ok_or(AppError::NotFound("booking"))?;
    if !current.status.is_active() {
        if status != BookingStatus::Canceled {
            return Err(AppError::Conflict(Conflict::Canceled));
        }
        return Ok(StatusChange {
            booking: current,
            changed: false,
        });
    }

    queries::update_booking_status(&tx, booking_id, status, &now)?;

    if status == BookingStatus::Canceled {
        if let Some(slot_id) = current.availability_id {
            queries::set_availability_booked(&tx, slot_id, false)?;
        }
    }

    tx.commit()?;
    Ok(StatusChange {
        booking: Booking {
            status,
            updated_at: now,
            ..current
        },
        changed: true,
    })
}

pub fn create_booking(state: &Arc<AppState>, input: BookingInput) -> Result<Booking, AppError> {
    let request = input.validate()?;

    let booking = {
        let mut db = state.db()?;
        let booking = admit(&mut db, &request, timestamp::now())?;
        // Published under the lock so subscribers see commit order.
        state.events.publish(DomainEvent::new(BOOKING_CREATED, &booking));
        booking
    };

    tracing::info!(
        booking_id = booking.id,
        tutor_id = booking.tutor_id,
        area = %booking.area,
        "booking created"
    );
    notify::spawn_booking_emails(Arc::clone(state), booking.id);

    Ok(booking)
}

pub fn set_booking_status(
    state: &AppState,
    booking_id: i64,
    status: Option<&str>,
) -> Result<Booking, AppError> {
    let status = match status.and_then(BookingStatus::parse) {
        Some(s @ (BookingStatus::Approved | BookingStatus::Canceled)) => s,
        _ => return Err(AppError::validation("invalid status")),
    };

    let change = {
        let mut db = state.db()?;
        let change = transition(&mut db, booking_id, status, timestamp::now())?;
        if change.changed {
            state.events.publish(DomainEvent::new(BOOKING_UPDATED, &change.booking));
        }
        change
    };

    if change.changed {
        tracing::info!(booking_id, status = %status, "booking status updated");
    }
    Ok(change.booking)
}
