/*!
 * # Health Check Module
 *
 * `GET /api/v1/health` reports liveness plus a database ping. The endpoint
 * answers 503 when the database is unreachable.
 */

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub checks: BTreeMap<String, HealthStatus>,
}

#[derive(Clone)]
pub struct HealthState {
    db_pool: Arc<DatabaseConnection>,
    started: Instant,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            started: Instant::now(),
        }
    }

    pub async fn check(&self) -> HealthInfo {
        let database = match crate::db::check_connection(&self.db_pool).await {
            Ok(()) => HealthStatus::Up,
            Err(_) => HealthStatus::Down,
        };

        let mut checks = BTreeMap::new();
        checks.insert("database".to_string(), database);

        HealthInfo {
            status: database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs(),
            checks,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthInfo),
        (status = 503, description = "Database unreachable", body = HealthInfo),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let info = state.check().await;
    let status = match info.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(info))
}

/// Health routes carrying their own state, mergeable into any router
pub fn health_routes<S>(db_pool: Arc<DatabaseConnection>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .with_state(Arc::new(HealthState::new(db_pool)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disconnected_database_reports_down() {
        let state = HealthState::new(Arc::new(DatabaseConnection::Disconnected));
        let info = state.check().await;
        assert_eq!(info.status, HealthStatus::Down);
        assert_eq!(info.checks.get("database"), Some(&HealthStatus::Down));
    }
}
