use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, Conflict};
use crate::events::{DomainEvent, AVAILABILITY_CREATED, AVAILABILITY_DELETED};
use crate::models::timestamp::parse_input;
use crate::models::{Availability, OpenSlot, Tutor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInput {
    pub tutor_id: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotFilter {
    pub area: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(value: &Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => parse_input(raw)
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("invalid timestamp: {raw}"))),
    }
}

pub fn add_slot(conn: &Connection, input: &SlotInput) -> Result<Availability, AppError> {
    let (Some(tutor_id), Some(start_raw), Some(end_raw)) = (
        input.tutor_id,
        non_empty(&input.start_time),
        non_empty(&input.end_time),
    ) else {
        return Err(AppError::validation("missing fields"));
    };
    let (Some(start), Some(end)) = (parse_input(start_raw), parse_input(end_raw)) else {
        return Err(AppError::validation("invalid timestamp"));
    };
    if start >= end {
        return Err(AppError::validation("invalid time range"));
    }

    if queries::get_tutor(conn, tutor_id)?.is_none() {
        return Err(AppError::NotFound("tutor"));
    }

    Ok(queries::insert_availability(conn, tutor_id, &start, &end)?)
}

/// Deletes an unbooked slot and returns the removed record.
pub fn remove_slot(conn: &mut Connection, id: i64) -> Result<Availability, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let slot = queries::get_availability(&tx, id)?.ok_or(AppError::NotFound("availability"))?;
    if slot.is_booked {
        return Err(AppError::Conflict(Conflict::SlotBooked));
    }
    queries::delete_availability(&tx, id)?;

    tx.commit()?;
    Ok(slot)
}

pub fn open_slots(conn: &Connection, filter: &SlotFilter) -> Result<Vec<OpenSlot>, AppError> {
    let start = parse_bound(&filter.start)?;
    let end = parse_bound(&filter.end)?;

    let slots = queries::list_open_slots(conn, non_empty(&filter.area), start.as_ref(), end.as_ref())?;

    let mut tutors: HashMap<i64, Tutor> = HashMap::new();
    let mut listing = Vec::with_capacity(slots.len());
    for slot in slots {
        let tutor = match tutors.get(&slot.tutor_id) {
            Some(t) => t.clone(),
            None => {
                let Some(t) = queries::get_tutor(conn, slot.tutor_id)? else {
                    continue;
                };
                tutors.insert(t.id, t.clone());
                t
            }
        };
        listing.push(OpenSlot { slot, tutor });
    }
    Ok(listing)
}

pub fn create_slot(state: &AppState, input: SlotInput) -> Result<Availability, AppError> {
    let slot = {
        let db = state.db()?;
        let slot = add_slot(&db, &input)?;
        state.events.publish(DomainEvent::new(AVAILABILITY_CREATED, &slot));
        slot
    };

    tracing::info!(slot_id = slot.id, tutor_id = slot.tutor_id, "availability created");
    Ok(slot)
}

pub fn delete_slot(state: &AppState, id: i64) -> Result<Availability, AppError> {
    let slot = {
        let mut db = state.db()?;
        let slot = remove_slot(&mut db, id)?;
        state.events.publish(DomainEvent::new(AVAILABILITY_DELETED, &slot));
        slot
    };

    tracing::info!(slot_id = slot.id, tutor_id = slot.tutor_id, "availability deleted");
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup() -> (Connection, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let tutor = queries::upsert_tutor(&conn, "Alice", "alice@example.com", "1", &["Ripley"]).unwrap();
        (conn, tutor)
    }

    fn slot_input(tutor_id: i64, start: &str, end: &str) -> SlotInput {
        SlotInput {
            tutor_id: Some(tutor_id),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
        }
    }

    #[test]
    fn test_add_slot() {
        let (conn, tutor) = setup();
        let slot = add_slot(&conn, &slot_input(tutor, "2025-06-16T15:00:00Z", "2025-06-16T16:00:00Z")).unwrap();
        assert!(!slot.is_booked);
        assert_eq!(queries::get_availability(&conn, slot.id).unwrap(), Some(slot));
    }

    #[test]
    fn test_add_slot_rejects_bad_input() {
        let (conn, tutor) = setup();

        let inverted = add_slot(&conn, &slot_input(tutor, "2025-06-16T16:00:00Z", "2025-06-16T15:00:00Z"));
        assert!(matches!(inverted, Err(AppError::Validation(_))));

        let missing = add_slot(&conn, &SlotInput { tutor_id: Some(tutor), ..Default::default() });
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let unknown = add_slot(&conn, &slot_input(99, "2025-06-16T15:00:00Z", "2025-06-16T16:00:00Z"));
        assert!(matches!(unknown, Err(AppError::NotFound("tutor"))));
    }

    #[test]
    fn test_remove_slot() {
        let (mut conn, tutor) = setup();
        let slot = add_slot(&conn, &slot_input(tutor, "2025-06-16T15:00:00Z", "2025-06-16T16:00:00Z")).unwrap();

        let removed = remove_slot(&mut conn, slot.id).unwrap();
        assert_eq!(removed.id, slot.id);
        assert!(queries::get_availability(&conn, slot.id).unwrap().is_none());

        assert!(matches!(remove_slot(&mut conn, slot.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_remove_booked_slot_is_conflict() {
        let (mut conn, tutor) = setup();
        let slot = add_slot(&conn, &slot_input(tutor, "2025-06-16T15:00:00Z", "2025-06-16T16:00:00Z")).unwrap();
        queries::set_availability_booked(&conn, slot.id, true).unwrap();

        let err = remove_slot(&mut conn, slot.id).unwrap_err();
        assert!(matches!(err, AppError::Conflict(Conflict::SlotBooked)));
        assert!(queries::get_availability(&conn, slot.id).unwrap().is_some());
    }

    #[test]
    fn test_open_slots_attach_tutor() {
        let (conn, tutor) = setup();
        queries::upsert_tutor(&conn, "Bob", "bob@example.com", "2", &["Deebing Heights"]).unwrap();
        add_slot(&conn, &slot_input(tutor, "2025-06-17T15:00:00Z", "2025-06-17T16:00:00Z")).unwrap();
        add_slot(&conn, &slot_input(tutor, "2025-06-16T15:00:00Z", "2025-06-16T16:00:00Z")).unwrap();

        let filter = SlotFilter {
            area: Some("Ripley".to_string()),
            ..Default::default()
        };
        let listing = open_slots(&conn, &filter).unwrap();
        assert_eq!(listing.len(), 2);
        assert!(listing[0].slot.start_time < listing[1].slot.start_time);
        assert_eq!(listing[0].tutor.name, "Alice");
        assert_eq!(listing[0].tutor.areas[0].name, "Ripley");

        let other = SlotFilter {
            area: Some("Deebing Heights".to_string()),
            ..Default::default()
        };
        assert!(open_slots(&conn, &other).unwrap().is_empty());
    }

    #[test]
    fn test_sub_millisecond_range_is_rejected() {
        let (conn, tutor) = setup();
        let err = add_slot(&conn, &slot_input(tutor, "2030-03-05T15:00:00.0001Z", "2030-03-05T15:00:00.0009Z"))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "invalid time range"));
    }

    #[test]
    fn test_added_slot_matches_stored_slot() {
        let (conn, tutor) = setup();
        let slot = add_slot(&conn, &slot_input(tutor, "2030-03-05T15:00:00.0005Z", "2030-03-05T16:00:00Z")).unwrap();
        assert_eq!(queries::get_availability(&conn, slot.id).unwrap(), Some(slot.clone()));
        assert_eq!(
            serde_json::to_value(&slot).unwrap()["startTime"],
            "2030-03-05T15:00:00Z"
        );
    }

    #[test]
    fn test_open_slots_bad_bound() {
        let (conn, _) = setup();
        let filter = SlotFilter {
            start: Some("not-a-date".to_string()),
            ..Default::default()
        };
        assert!(matches!(open_slots(&conn, &filter), Err(AppError::Validation(_))));
    }
}
