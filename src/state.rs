use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::events::EventBus;
use crate::services::mail::Mailer;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub events: EventBus,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Locks the shared connection. Never hold the guard across an `.await`.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database lock poisoned".to_string()))
    }
}
