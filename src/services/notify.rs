use std::sync::Arc;

use chrono::SecondsFormat;

use crate::db::queries;
use crate::models::{Booking, Client, Tutor};
use crate::services::mail::OutgoingMail;
use crate::state::AppState;

/// Builds the client and tutor notifications for a booking, in that order.
pub fn booking_emails(booking: &Booking, tutor: &Tutor, client: &Client) -> [OutgoingMail; 2] {
    let subject = format!(
        "Tutoring Booking {} - {}",
        booking.status,
        booking.start_time.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    let time_range = format!(
        "{} - {}",
        booking.start_time.format("%a %-d %b %Y %H:%M UTC"),
        booking.end_time.format("%a %-d %b %Y %H:%M UTC")
    );

    let client_mail = OutgoingMail {
        to: client.email.clone(),
        subject: subject.clone(),
        body: format!(
            "Your booking with {} in {} for {} is {}.",
            tutor.name, booking.area, time_range, booking.status
        ),
    };
    let tutor_mail = OutgoingMail {
        to: tutor.email.clone(),
        subject,
        body: format!(
            "New booking from {} ({}) in {} for {}. Status: {}.",
            client.name, client.email, booking.area, time_range, booking.status
        ),
    };

    [client_mail, tutor_mail]
}

/// Fire-and-forget delivery of the booking notifications.
pub fn spawn_booking_emails(state: Arc<AppState>, booking_id: i64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        send_booking_emails(&state, booking_id).await;
    })
}

/// Sends both notifications concurrently. Each failure is logged on its own and
/// never affects the other send.
pub async fn send_booking_emails(state: &AppState, booking_id: i64) {
    let loaded = {
        let db = match state.db() {
            Ok(db) => db,
            Err(e) => {
                tracing::warn!(error = %e, booking_id, "skipping booking emails");
                return;
            }
        };
        load_parties(&db, booking_id)
    };

    let (booking, tutor, client) = match loaded {
        Ok(Some(parties)) => parties,
        Ok(None) => {
            tracing::warn!(booking_id, "booking vanished before emails were sent");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, booking_id, "failed to load booking for emails");
            return;
        }
    };

    let [client_mail, tutor_mail] = booking_emails(&booking, &tutor, &client);
    let (client_result, tutor_result) = tokio::join!(
        state.mailer.send(&client_mail),
        state.mailer.send(&tutor_mail)
    );

    for (recipient, result) in [("client", client_result), ("tutor", tutor_result)] {
        match result {
            Ok(()) => tracing::info!(booking_id, recipient, "booking email sent"),
            Err(e) => tracing::warn!(error = %e, booking_id, recipient, "booking email failed"),
        }
    }
}

fn load_parties(
    conn: &rusqlite::Connection,
    booking_id: i64,
) -> rusqlite::Result<Option<(Booking, Tutor, Client)>> {
    let Some(booking) = queries::get_booking_by_id(conn, booking_id)? else {
        return Ok(None);
    };
    let Some(tutor) = queries::get_tutor(conn, booking.tutor_id)? else {
        return Ok(None);
    };
    let Some(client) = queries::get_client(conn, booking.client_id)? else {
        return Ok(None);
    };
    Ok(Some((booking, tutor, client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Area, BookingStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_booking_emails_content() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap();
        let booking = Booking {
            id: 7,
            tutor_id: 1,
            client_id: 2,
            availability_id: Some(3),
            start_time: Utc.with_ymd_and_hms(2025, 6, 16, 15, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 6, 16, 16, 0, 0).unwrap(),
            area: "Ripley".to_string(),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let tutor = Tutor {
            id: 1,
            name: "Alice Johnson".to_string(),
            email: "tutor1@example.com".to_string(),
            phone: "0400000001".to_string(),
            areas: vec![Area {
                id: 1,
                name: "Ripley".to_string(),
            }],
        };
        let client = Client {
            id: 2,
            name: "Parent Example".to_string(),
            email: "parent@example.com".to_string(),
            phone: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let [to_client, to_tutor] = booking_emails(&booking, &tutor, &client);

        assert_eq!(to_client.to, "parent@example.com");
        assert_eq!(to_client.subject, "Tutoring Booking PENDING - 2025-06-16T15:00:00Z");
        assert!(to_client.body.starts_with("Your booking with Alice Johnson in Ripley for Mon 16 Jun 2025 15:00 UTC"));
        assert!(to_client.body.ends_with("is PENDING."));

        assert_eq!(to_tutor.to, "tutor1@example.com");
        assert_eq!(to_tutor.subject, to_client.subject);
        assert!(to_tutor.body.contains("New booking from Parent Example (parent@example.com) in Ripley"));
        assert!(to_tutor.body.ends_with("Status: PENDING."));
    }
}
