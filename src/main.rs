use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;

use task_tracker::{
    config::Config,
    db::{self, Database, MemoryDatabase, PgDatabase},
    metrics::MetricsMiddleware,
    routes, AppState,
};

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    if origins.is_empty() {
        return cors.allow_any_origin();
    }
    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

async fn open_database(config: &Config) -> io::Result<Arc<dyn Database>> {
    if config.uses_memory_database() {
        log::warn!("Using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryDatabase::new()));
    }

    let pool = db::connect_with_retry(config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    log::info!("Connected to database");
    db::run_migrations(&pool)
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;
    Ok(Arc::new(PgDatabase::new(pool)))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let database = open_database(&config).await?;
    let state = AppState::new(database, &config).map_err(|e| io::Error::other(e.to_string()))?;
    state.metrics.refresh_task_gauges(state.db.as_ref()).await;

    let state = web::Data::new(state);
    let cors_origins = config.cors_origins.clone();

    log::info!("Starting task tracker at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(MetricsMiddleware::new(state.metrics.clone()))
            .wrap(Logger::default())
            .wrap(cors(&cors_origins))
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
