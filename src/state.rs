use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Database;
use crate::metrics::Metrics;

/// Process-wide context built once at startup and shared through
/// `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub tokens: TokenService,
    pub metrics: Metrics,
    pub bcrypt_cost: u32,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, config: &Config) -> Result<Self, prometheus::Error> {
        Ok(Self {
            db,
            tokens: TokenService::new(
                &config.jwt_secret,
                Duration::days(config.jwt_expires_in_days),
            ),
            metrics: Metrics::new()?,
            bcrypt_cost: config.bcrypt_cost,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
