use std::sync::Arc;

use facturador_core::config::{AppConfig, ConfigError, LoadOptions};
use facturador_core::dte::{EmissionError, InvoiceEmitter, UnconfiguredInvoiceEmitter};
use facturador_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::emission::HttpInvoiceEmitter;
use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
    pub emission_configured: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("emission client setup failed: {0}")]
    Emission(#[source] EmissionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates and wires the application from an already loaded config.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let (emitter, emission_configured): (Arc<dyn InvoiceEmitter>, bool) =
        match HttpInvoiceEmitter::from_config(&config.emission).map_err(BootstrapError::Emission)? {
            Some(emitter) => {
                info!(
                    event_name = "system.bootstrap.emission_configured",
                    correlation_id = "bootstrap",
                    endpoint = %emitter.endpoint(),
                    ambiente = config.emission.ambiente.code(),
                    "invoice emission enabled"
                );
                (Arc::new(emitter), true)
            }
            None => {
                warn!(
                    event_name = "system.bootstrap.emission_unconfigured",
                    correlation_id = "bootstrap",
                    "emission.base_url is unset; quote conversions will fail"
                );
                (Arc::new(UnconfiguredInvoiceEmitter), false)
            }
        };

    let state = AppState::from_pool(db_pool.clone(), emitter, config.emission.ambiente);
    Ok(Application { config, db_pool, state, emission_configured })
}

#[cfg(test)]
mod tests {
    use facturador_core::config::{ConfigOverrides, LoadOptions};
    use facturador_core::domain::tenant::{TenantId, TenantScope, UserId};
    use facturador_core::errors::ApplicationError;

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn overrides(database_url: &str, emission_base_url: Option<&str>) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                emission_base_url: emission_base_url.map(ToString::to_string),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_configuration() {
        let result = bootstrap(overrides("postgres://elsewhere/db", None)).await;
        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }

    fn temp_database() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("facturador.db").display());
        (dir, url)
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_services() {
        let (_dir, url) = temp_database();
        let app = bootstrap(overrides(&url, None))
            .await
            .expect("bootstrap should succeed with a fresh database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('quote', 'client', 'quote_sequence', 'audit_event')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables after bootstrap");
        assert_eq!(table_count, 4);
        assert!(!app.emission_configured);

        let scope = TenantScope::new(
            TenantId("tenant-none".to_string()),
            UserId("u-1".to_string()),
            "req-boot",
        );
        let preview = app.state.quotes.next_number(&scope).await.expect("preview");
        assert!(preview.ends_with("-0001"));

        let missing = app
            .state
            .quotes
            .get(&scope, &facturador_core::domain::quote::QuoteId("nope".to_string()))
            .await;
        assert!(matches!(missing, Err(ApplicationError::NotFound { .. })));

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn configured_base_url_enables_http_emission() {
        let (_dir, url) = temp_database();
        let app = bootstrap(overrides(&url, Some("http://127.0.0.1:9/api")))
            .await
            .expect("bootstrap");
        assert!(app.emission_configured);
        app.db_pool.close().await;
    }
}
