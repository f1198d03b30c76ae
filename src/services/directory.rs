use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::TutorDetail;

pub fn tutor_detail(conn: &Connection, id: i64) -> Result<TutorDetail, AppError> {
    let tutor = queries::get_tutor(conn, id)?.ok_or(AppError::NotFound("tutor"))?;
    let availabilities = queries::list_availability_for_tutor(conn, id)?;
    Ok(TutorDetail {
        tutor,
        availabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_tutor_detail_includes_booked_slots() {
        let conn = db::init_db(":memory:").unwrap();
        let tutor = queries::upsert_tutor(&conn, "Alice", "alice@example.com", "1", &["Ripley"]).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 6, 16, 15, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 16, 16, 0, 0).unwrap();
        let slot = queries::insert_availability(&conn, tutor, &start, &end).unwrap();
        queries::set_availability_booked(&conn, slot.id, true).unwrap();

        let detail = tutor_detail(&conn, tutor).unwrap();
        assert_eq!(detail.tutor.name, "Alice");
        assert_eq!(detail.availabilities.len(), 1);
        assert!(detail.availabilities[0].is_booked);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["areas"][0]["name"], "Ripley");
        assert_eq!(json["availabilities"][0]["isBooked"], true);
    }

    #[test]
    fn test_unknown_tutor() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(matches!(tutor_detail(&conn, 1), Err(AppError::NotFound("tutor"))));
    }
}
