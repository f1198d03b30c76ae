use anyhow::Context;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::db::queries::{self, NewBooking};
use crate::models::ClientDetails;

const AREAS: [&str; 3] = ["Augustine Heights", "Deebing Heights", "Ripley"];

/// Loads demo areas, two tutors, three days of afternoon slots and one pending
/// booking. Safe to run repeatedly: slots are only created when none exist.
pub fn seed_demo_data(conn: &mut Connection, now: DateTime<Utc>) -> anyhow::Result<()> {
    let tx = conn.transaction().context("failed to start seed transaction")?;

    for area in AREAS {
        queries::upsert_area(&tx, area)?;
    }

    let alice = queries::upsert_tutor(
        &tx,
        "Alice Johnson",
        "tutor1@example.com",
        "0400000001",
        &["Augustine Heights", "Ripley"],
    )?;
    let bob = queries::upsert_tutor(
        &tx,
        "Bob Smith",
        "tutor2@example.com",
        "0400000002",
        &["Deebing Heights"],
    )?;

    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM availabilities", [], |row| row.get(0))?;
    if existing > 0 {
        tracing::info!("demo slots already present, skipping");
        tx.commit()?;
        return Ok(());
    }

    for day in 1..=3 {
        let date = (now + Duration::days(day)).date_naive();
        for (start, end) in [((15, 0), (16, 0)), ((16, 30), (17, 30))] {
            let start = at(date, start)?;
            let end = at(date, end)?;
            queries::insert_availability(&tx, alice, &start, &end)?;
            queries::insert_availability(&tx, bob, &start, &end)?;
        }
    }

    let client = queries::upsert_client(
        &tx,
        &ClientDetails {
            name: "Parent Example".to_string(),
            email: "parent@example.com".to_string(),
            phone: Some("0400111222".to_string()),
            notes: Some("Year 8 Maths".to_string()),
        },
        &now,
    )?;

    let slot_id: i64 = tx.query_row(
        "SELECT id FROM availabilities WHERE tutor_id = ?1 AND is_booked = 0
         ORDER BY start_time ASC LIMIT 1",
        params![alice],
        |row| row.get(0),
    )?;
    if let Some(slot) = queries::get_availability(&tx, slot_id)? {
        queries::insert_booking(
            &tx,
            &NewBooking {
                tutor_id: alice,
                client_id: client.id,
                availability_id: slot.id,
                start: &slot.start_time,
                end: &slot.end_time,
                area: "Augustine Heights",
            },
            &now,
        )?;
        queries::set_availability_booked(&tx, slot.id, true)?;
    }

    tx.commit().context("failed to commit seed data")?;
    tracing::info!(tutors = 2, "seeded demo data");
    Ok(())
}

fn at(date: chrono::NaiveDate, (h, m): (u32, u32)) -> anyhow::Result<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(h, m, 0).context("invalid seed time")?;
    Ok(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_seed_is_repeatable() {
        let mut conn = db::init_db(":memory:").unwrap();
        let now = Utc::now();
        seed_demo_data(&mut conn, now).unwrap();
        seed_demo_data(&mut conn, now).unwrap();

        let slots: i64 = conn
            .query_row("SELECT COUNT(*) FROM availabilities", [], |row| row.get(0))
            .unwrap();
        assert_eq!(slots, 12);

        let booked: i64 = conn
            .query_row("SELECT COUNT(*) FROM availabilities WHERE is_booked = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(booked, 1);

        assert_eq!(queries::list_tutors(&conn, Some("Ripley")).unwrap().len(), 1);
        assert_eq!(queries::list_areas(&conn).unwrap().len(), 3);
    }
}
