use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub client_origin: Option<String>,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub email_from: String,
    pub event_capacity: usize,
    pub seed_demo_data: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "tutorbook.db".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").ok().filter(|v| !v.is_empty()),
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_user: env::var("SMTP_USER").unwrap_or_default(),
            smtp_pass: env::var("SMTP_PASS").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Tutorbook <no-reply@tutorbook.local>".to_string()),
            event_capacity: env::var("EVENT_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            seed_demo_data: env::var("SEED_DEMO_DATA")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}
