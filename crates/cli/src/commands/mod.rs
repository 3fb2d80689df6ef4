pub mod config;
pub mod doctor;
pub mod issue_token;
pub mod migrate;
pub mod next_number;
pub mod seed;
pub mod start;

use std::future::Future;

use facturador_core::config::{AppConfig, LoadOptions};
use facturador_db::{connect_with_settings, migrations, DbPool};
use serde::Serialize;

/// `(error_class, message, exit_code)` carried out of a command's async body.
pub type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads config, opens the database, applies pending migrations and hands
/// the pool to `work`. The pool is closed before returning.
pub fn with_migrated_pool<T, F, Fut>(command: &str, work: F) -> Result<T, CommandResult>
where
    F: FnOnce(AppConfig, DbPool) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    runtime
        .block_on(async {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
            if let Err(error) = migrations::run_pending(&pool).await {
                pool.close().await;
                return Err(("migration", error.to_string(), 5u8));
            }

            let result = work(config, pool.clone()).await;
            pool.close().await;
            result
        })
        .map_err(|(error_class, message, exit_code)| {
            CommandResult::failure(command, error_class, message, exit_code)
        })
}
