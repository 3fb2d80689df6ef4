use facturador_db::migrations;

use crate::commands::{with_migrated_pool, CommandResult};

pub fn run() -> CommandResult {
    let result = with_migrated_pool("migrate", |_config, pool| async move {
        migrations::applied_versions(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))
    });

    match result {
        Ok(versions) => {
            let latest = versions.last().map(ToString::to_string).unwrap_or_else(|| "none".into());
            CommandResult::success(
                "migrate",
                format!(
                    "applied pending migrations ({} recorded, latest version {latest})",
                    versions.len()
                ),
            )
        }
        Err(failure) => failure,
    }
}
