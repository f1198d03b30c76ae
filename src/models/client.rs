use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact details supplied with a booking request. Keyed by `email`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub notes: Option<String>,
}
