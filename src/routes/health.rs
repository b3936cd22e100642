use actix_web::{get, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the process started.
    pub uptime: u64,
    pub db_connected: bool,
}

async fn report(state: &AppState) -> HealthReport {
    HealthReport {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
        db_connected: state.db.ping().await,
    }
}

/// Health check endpoint
///
/// Returns the service status, timestamp, uptime and database reachability.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(report(&state).await)
}

/// Same report under the API prefix.
#[get("/health")]
pub async fn api_health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(report(&state).await)
}
