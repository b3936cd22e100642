use actix_web::{get, web, HttpResponse};

use crate::{error::AppError, state::AppState};

/// Prometheus scrape endpoint.
#[get("/metrics")]
pub async fn metrics(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state
        .metrics
        .set_db_connections(state.db.pool_connections());
    let body = state.metrics.render().map_err(|e| {
        AppError::InternalServerError(format!("Error generating metrics: {}", e))
    })?;
    Ok(HttpResponse::Ok()
        .content_type(state.metrics.content_type())
        .body(body))
}
