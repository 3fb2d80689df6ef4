use crate::commands::{with_migrated_pool, CommandResult, Failure};

/// Preflight for `facturador-server`: configuration, database and schema
/// must all be usable before the HTTP listener is started.
pub fn run() -> CommandResult {
    let result = with_migrated_pool("start", |config, _pool| async move {
        let emission = match config.emission.base_url.as_deref() {
            Some(base_url) => format!("emission endpoint {base_url}"),
            None => "emission not configured; conversions will fail".to_string(),
        };
        Ok::<_, Failure>(format!(
            "preflight passed: listening on {} ({emission}, ambiente {})",
            config.listen_address(),
            config.emission.ambiente.code()
        ))
    });

    match result {
        Ok(message) => CommandResult::success("start", message),
        Err(failure) => failure,
    }
}
