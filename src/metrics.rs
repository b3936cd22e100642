//! Prometheus metrics for the HTTP layer and the task store.
//!
//! Every [`Metrics`] value owns its own registry, so independent app
//! instances (and tests) never share counters. Exposed at `/metrics`:
//! - `http_requests_total{method,route,status_code}`
//! - `http_request_duration_ms{method,route,status_code}`
//! - `active_connections`
//! - `db_connections_active`
//! - `tasks_total{status}`
//! - `process_*` collector metrics (Linux only)

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

use crate::db::Database;

/// Route label for requests that matched no registered pattern.
const UNMATCHED_ROUTE: &str = "unmatched";

const DURATION_BUCKETS_MS: &[f64] = &[0.1, 5.0, 15.0, 50.0, 100.0, 500.0, 1000.0, 2000.0, 5000.0];

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_ms: HistogramVec,
    active_connections: IntGauge,
    db_connections_active: IntGauge,
    tasks_total: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let labels = &["method", "route", "status_code"];

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            labels,
        )?;
        let http_request_duration_ms = HistogramVec::new(
            HistogramOpts::new("http_request_duration_ms", "Duration of HTTP requests in ms")
                .buckets(DURATION_BUCKETS_MS.to_vec()),
            labels,
        )?;
        let active_connections =
            IntGauge::new("active_connections", "Number of active connections")?;
        let db_connections_active = IntGauge::new(
            "db_connections_active",
            "Number of connections held by the database pool",
        )?;
        let tasks_total = IntGaugeVec::new(
            Opts::new("tasks_total", "Total number of tasks in the system"),
            &["status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_ms.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;
        registry.register(Box::new(db_connections_active.clone()))?;
        registry.register(Box::new(tasks_total.clone()))?;
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_ms,
            active_connections,
            db_connections_active,
            tasks_total,
        })
    }

    pub fn observe_request(&self, method: &str, route: &str, status: u16, elapsed_ms: f64) {
        let status = status.to_string();
        let labels = [method, route, status.as_str()];
        self.http_requests_total.with_label_values(&labels).inc();
        self.http_request_duration_ms
            .with_label_values(&labels)
            .observe(elapsed_ms);
    }

    /// Recomputes `tasks_total` from the store. Failures are logged only.
    pub async fn refresh_task_gauges(&self, db: &dyn Database) {
        match db.task_counts().await {
            Ok(counts) => {
                for (status, count) in counts {
                    self.tasks_total
                        .with_label_values(&[status.as_str()])
                        .set(count);
                }
            }
            Err(e) => log::warn!("Error updating task metrics: {}", e),
        }
    }

    pub fn set_db_connections(&self, connections: u32) {
        self.db_connections_active.set(i64::from(connections));
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

/// Counts every request and its latency, labelled by the matched route
/// pattern so ids do not explode label cardinality.
pub struct MetricsMiddleware {
    metrics: Metrics,
}

impl MetricsMiddleware {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MetricsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddlewareService {
            service,
            metrics: self.metrics.clone(),
        }))
    }
}

/// Holds one unit of `active_connections` until dropped, so requests whose
/// future is cancelled mid-flight are released too.
struct InFlight(IntGauge);

impl InFlight {
    fn enter(gauge: &IntGauge) -> Self {
        gauge.inc();
        InFlight(gauge.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.dec();
    }
}

pub struct MetricsMiddlewareService<S> {
    service: S,
    metrics: Metrics,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let route = req
            .match_pattern()
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
        let metrics = self.metrics.clone();
        let in_flight = InFlight::enter(&metrics.active_connections);

        let fut = self.service.call(req);
        Box::pin(async move {
            let _in_flight = in_flight;
            let result = fut.await;
            let status = match &result {
                Ok(res) => res.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            metrics.observe_request(&method, &route, status, elapsed_ms);
            result
        })
    }
}
