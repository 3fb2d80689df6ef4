use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use facturador_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    emission_configured: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub emission: HealthCheck,
    pub checked_at: String,
}

/// `GET /health`. Readiness depends on the database only; an unconfigured
/// emitter is reported but does not degrade the service.
pub fn router(db_pool: DbPool, emission_configured: bool) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { db_pool, emission_configured })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let emission = if state.emission_configured {
        HealthCheck { status: "ready", detail: "emission endpoint configured".to_string() }
    } else {
        HealthCheck {
            status: "not_configured",
            detail: "emission.base_url is unset; conversions will fail".to_string(),
        }
    };

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "facturador-server runtime initialized".to_string(),
        },
        database,
        emission,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
