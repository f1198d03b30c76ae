use serde::{Deserialize, Serialize};

use super::{Area, Availability};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutor {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub areas: Vec<Area>,
}

/// A tutor together with every slot they have published.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorDetail {
    #[serde(flatten)]
    pub tutor: Tutor,
    pub availabilities: Vec<Availability>,
}
