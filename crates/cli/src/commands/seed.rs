use facturador_db::{seed_demo, SeedResult};

use crate::commands::{with_migrated_pool, CommandResult};

/// Loads the demo tenant and clients. Re-running keeps existing clients and
/// issues a fresh token each time unless `no_token` is set.
pub fn run(no_token: bool) -> CommandResult {
    let result = with_migrated_pool("seed", |_config, pool| async move {
        seed_demo(&pool, !no_token).await.map_err(|error| ("seed", error.to_string(), 6u8))
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err(failure) => failure,
    }
}

fn summary(seeded: &SeedResult) -> String {
    let mut message = format!(
        "demo tenant `{}` ready: {} clients created, {} already present",
        seeded.tenant_id, seeded.clients_created, seeded.clients_existing
    );
    if let Some(issued) = &seeded.token {
        message.push_str(&format!(
            "; bearer token for `{}` (shown once): {}",
            issued.user_id, issued.token
        ));
    }
    message
}
