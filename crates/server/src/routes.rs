use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use facturador_core::audit::AuditSink;
use facturador_core::config::Ambiente;
use facturador_core::dte::InvoiceEmitter;
use facturador_db::repositories::{
    ClientRepository, SqlAuditRepository, SqlClientRepository, SqlQuoteRepository,
    SqlTokenRepository, TokenRepository,
};
use facturador_db::DbPool;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{field, info_span};

use crate::auth::REQUEST_ID_HEADER;
use crate::quote_service::QuoteService;
use crate::{catalogs, clients, quotes};

#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<QuoteService>,
    pub clients: Arc<dyn ClientRepository>,
    pub tokens: Arc<dyn TokenRepository>,
}

impl AppState {
    /// Wires the SQL repositories over one pool. The audit repository serves
    /// both as the sink and as the history source.
    pub fn from_pool(pool: DbPool, emitter: Arc<dyn InvoiceEmitter>, ambiente: Ambiente) -> Self {
        let clients: Arc<dyn ClientRepository> = Arc::new(SqlClientRepository::new(pool.clone()));
        let audit = Arc::new(SqlAuditRepository::new(pool.clone()));
        let quotes = QuoteService::new(
            Arc::new(SqlQuoteRepository::new(pool.clone())),
            clients.clone(),
            audit.clone(),
            audit as Arc<dyn AuditSink>,
            emitter,
            ambiente,
        );
        Self {
            quotes: Arc::new(quotes),
            clients,
            tokens: Arc::new(SqlTokenRepository::new(pool)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        info_span!(
            "http.request",
            method = %request.method(),
            path = %request.uri().path(),
            correlation_id = %request_id,
            tenant_id = field::Empty,
        )
    });

    Router::new()
        .merge(quotes::router())
        .merge(clients::router())
        .merge(catalogs::router())
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use chrono::Utc;
    use facturador_core::config::Ambiente;
    use facturador_core::domain::tenant::{Tenant, TenantId, UserId};
    use facturador_core::dte::{EmissionError, RecordingInvoiceEmitter};
    use facturador_db::repositories::{SqlTenantRepository, SqlTokenRepository};
    use facturador_db::{connect_with_settings, migrations, seed_demo, DbPool};
    use facturador_db::{TenantRepository, TokenRepository};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, AppState};

    struct TestApp {
        router: Router,
        pool: DbPool,
        token: String,
        emitter: RecordingInvoiceEmitter,
    }

    async fn app_with(emitter: RecordingInvoiceEmitter) -> TestApp {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        let seeded = seed_demo(&pool, true).await.expect("seed");
        let token = seeded.token.expect("token").token;
        let state = AppState::from_pool(pool.clone(), Arc::new(emitter.clone()), Ambiente::Pruebas);
        TestApp { router: router(state), pool, token, emitter }
    }

    async fn app() -> TestApp {
        app_with(RecordingInvoiceEmitter::default()).await
    }

    impl TestApp {
        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder =
                Request::builder().method(method).uri(uri).header("x-request-id", "req-route");
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .expect("request");

            let response = self.router.clone().oneshot(request).await.expect("response");
            let status = response.status();
            let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).expect("json body")
            };
            (status, value)
        }

        async fn authed(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            self.call(method, uri, Some(&self.token), body).await
        }

        async fn create_quote(&self) -> Value {
            let (status, body) = self
                .authed(
                    Method::POST,
                    "/quotes",
                    Some(json!({
                        "clienteId": "client-demo-roble",
                        "validUntil": "2030-06-30",
                        "items": [
                            {"descripcion": "Cemento gris", "cantidad": 2, "precioUnitario": 10, "tipoItem": 1},
                            {"descripcion": "Flete", "cantidad": 1, "precioUnitario": 5, "descuento": 1, "tipoItem": 2}
                        ]
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }
    }

    #[tokio::test]
    async fn quote_routes_require_a_valid_bearer_token() {
        let app = app().await;

        let (status, body) = app.call(Method::GET, "/quotes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["correlationId"], "req-route");

        let (status, _) = app.call(Method::GET, "/quotes", Some("fct_unknown"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let tenantless = SqlTokenRepository::new(app.pool.clone())
            .issue(&UserId("u-floating".to_string()), None, Some("no tenant"))
            .await
            .expect("token");
        let (status, body) =
            app.call(Method::GET, "/quotes", Some(&tenantless.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn full_lifecycle_over_http() {
        let app = app().await;

        let (_, preview) = app.authed(Method::GET, "/quotes/next-number", None).await;
        let created = app.create_quote().await;
        assert_eq!(created["quoteNumber"], preview["quoteNumber"]);
        assert_eq!(created["status"], "DRAFT");
        assert_eq!(created["subtotal"], 24.0);
        assert_eq!(created["taxAmount"], 3.12);
        assert_eq!(created["total"], 27.12);
        assert_eq!(created["client"]["numDocumento"], "06142901901023");
        let id = created["id"].as_str().expect("id").to_string();

        let (status, body) = app.authed(Method::POST, &format!("/quotes/{id}/approve"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().is_some_and(|m| m.contains("requires SENT")));

        for (step, expected) in [("send", "SENT"), ("approve", "APPROVED")] {
            let (status, body) =
                app.authed(Method::POST, &format!("/quotes/{id}/{step}"), None).await;
            assert_eq!(status, StatusCode::OK, "{step}: {body}");
            assert_eq!(body["status"], expected);
        }

        let (status, converted) =
            app.authed(Method::POST, &format!("/quotes/{id}/convert"), None).await;
        assert_eq!(status, StatusCode::OK, "{converted}");
        assert_eq!(converted["quote"]["status"], "CONVERTED");
        assert_eq!(converted["quote"]["convertedToInvoiceId"], converted["invoice"]["id"]);

        let (status, _) = app.authed(Method::POST, &format!("/quotes/{id}/convert"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = app.authed(Method::POST, &format!("/quotes/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(app.emitter.emissions().len(), 1);

        let (status, history) =
            app.authed(Method::GET, &format!("/quotes/{id}/history"), None).await;
        assert_eq!(status, StatusCode::OK);
        let types: Vec<&str> = history
            .as_array()
            .map(|events| events.iter().filter_map(|e| e["eventType"].as_str()).collect())
            .unwrap_or_default();
        assert!(types.contains(&"quote.created"));
        assert!(types.contains(&"quote.converted"));
    }

    #[tokio::test]
    async fn drafts_can_be_edited_and_deleted_but_nothing_else() {
        let app = app().await;
        let id = app.create_quote().await["id"].as_str().expect("id").to_string();

        let (status, updated) = app
            .authed(
                Method::PATCH,
                &format!("/quotes/{id}"),
                Some(json!({"items": [{"descripcion": "Varilla", "cantidad": 3, "precioUnitario": 100, "tipoItem": 1}]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["total"], 339.0);

        let (status, _) = app
            .authed(Method::PATCH, &format!("/quotes/{id}"), Some(json!({"items": []})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app.authed(Method::DELETE, &format!("/quotes/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{body}");
        let (status, _) = app.authed(Method::GET, &format!("/quotes/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let sent = app.create_quote().await["id"].as_str().expect("id").to_string();
        app.authed(Method::POST, &format!("/quotes/{sent}/send"), None).await;
        let (status, _) = app.authed(Method::DELETE, &format!("/quotes/{sent}"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reject_needs_a_reason() {
        let app = app().await;
        let id = app.create_quote().await["id"].as_str().expect("id").to_string();
        app.authed(Method::POST, &format!("/quotes/{id}/send"), None).await;

        let (status, _) = app
            .authed(Method::POST, &format!("/quotes/{id}/reject"), Some(json!({"reason": ""})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = app
            .authed(Method::POST, &format!("/quotes/{id}/reject"), Some(json!({"reason": "   "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .authed(
                Method::POST,
                &format!("/quotes/{id}/reject"),
                Some(json!({"reason": "Presupuesto agotado"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "REJECTED");
        assert_eq!(body["rejectionReason"], "Presupuesto agotado");
    }

    #[tokio::test]
    async fn emission_failure_is_bad_gateway_and_leaves_quote_approved() {
        let app = app_with(RecordingInvoiceEmitter::failing(EmissionError::Transport(
            "connection reset".to_string(),
        )))
        .await;
        let id = app.create_quote().await["id"].as_str().expect("id").to_string();
        app.authed(Method::POST, &format!("/quotes/{id}/send"), None).await;
        app.authed(Method::POST, &format!("/quotes/{id}/approve"), None).await;

        let (status, body) = app.authed(Method::POST, &format!("/quotes/{id}/convert"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "bad_gateway");

        let (_, quote) = app.authed(Method::GET, &format!("/quotes/{id}"), None).await;
        assert_eq!(quote["status"], "APPROVED");
        assert!(quote["convertedToInvoiceId"].is_null());
    }

    #[tokio::test]
    async fn other_tenants_see_not_found() {
        let app = app().await;
        let id = app.create_quote().await["id"].as_str().expect("id").to_string();

        let other = Tenant {
            id: TenantId("tenant-other".to_string()),
            nombre: "Otra Empresa".to_string(),
            nit: None,
            created_at: Utc::now(),
        };
        SqlTenantRepository::new(app.pool.clone()).save(&other).await.expect("save tenant");
        let intruder = SqlTokenRepository::new(app.pool.clone())
            .issue(&UserId("u-other".to_string()), Some(&other.id), None)
            .await
            .expect("token");

        let (status, _) =
            app.call(Method::GET, &format!("/quotes/{id}"), Some(&intruder.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app
            .call(Method::POST, &format!("/quotes/{id}/send"), Some(&intruder.token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, page) = app.call(Method::GET, "/quotes", Some(&intruder.token), None).await;
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn listing_searches_before_paginating() {
        let app = app().await;
        for _ in 0..3 {
            app.create_quote().await;
        }
        let (status, body) = app
            .authed(
                Method::POST,
                "/quotes",
                Some(json!({
                    "clienteId": "client-demo-ceiba",
                    "validUntil": "2030-06-30T00:00:00Z",
                    "items": [{"descripcion": "Semilla", "cantidad": 1, "precioUnitario": 1, "tipoItem": 1}]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (status, page) =
            app.authed(Method::GET, "/quotes?search=ceiba&limit=1&page=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);
        assert_eq!(page["totalPages"], 1);
        assert_eq!(page["data"][0]["client"]["nombre"], "Agroservicio La Ceiba");

        let (_, page) = app.authed(Method::GET, "/quotes?search=roble&limit=2&page=2", None).await;
        assert_eq!(page["total"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["data"].as_array().map(Vec::len), Some(1));

        let (status, body) = app.authed(Method::GET, "/quotes?status=ARCHIVED", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }

    #[tokio::test]
    async fn client_registry_round_trip() {
        let app = app().await;

        let (status, created) = app
            .authed(
                Method::POST,
                "/clients",
                Some(json!({
                    "nombre": "Taller Los Pinos",
                    "tipoDocumento": "36",
                    "numDocumento": "06140202021015",
                    "codActividad": "45201",
                    "direccion": {"departamento": "06", "municipio": "21", "complemento": "Mejicanos"}
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["descActividad"], "Reparación mecánica de automotores");
        let id = created["id"].as_str().expect("id").to_string();

        let (status, _) = app
            .authed(
                Method::POST,
                "/clients",
                Some(json!({
                    "nombre": "Duplicado",
                    "tipoDocumento": "36",
                    "numDocumento": "06140202021015",
                    "direccion": "Centro"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, page) = app.authed(Method::GET, "/clients?search=pinos", None).await;
        assert_eq!(page["total"], 1);

        let (status, _) = app.authed(Method::DELETE, &format!("/clients/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.authed(Method::GET, &format!("/clients/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_id_is_generated_and_echoed() {
        let app = app().await;
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder().uri("/catalogs/departments").body(Body::empty()).expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let echoed = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert_eq!(echoed.len(), 36);
    }
}
