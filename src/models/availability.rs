use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tutor;

/// A tutor-declared open time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub id: i64,
    pub tutor_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
}

/// An unbooked slot as shown in the public listing, with its tutor attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSlot {
    #[serde(flatten)]
    pub slot: Availability,
    pub tutor: Tutor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, h, m, 0).unwrap()
    }

    fn slot() -> Availability {
        Availability {
            id: 1,
            tutor_id: 1,
            start_time: at(15, 0),
            end_time: at(16, 0),
            is_booked: false,
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(slot()).unwrap();
        assert_eq!(json["tutorId"], 1);
        assert_eq!(json["isBooked"], false);
        assert_eq!(json["startTime"], "2025-06-16T15:00:00Z");
    }
}
