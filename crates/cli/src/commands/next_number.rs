use chrono::{Datelike, Utc};
use facturador_core::domain::tenant::TenantId;
use facturador_core::dte::el_salvador_local;
use facturador_db::repositories::SqlQuoteRepository;
use facturador_db::QuoteRepository;

use crate::commands::{with_migrated_pool, CommandResult, Failure};

/// Previews the number the next quote of `tenant` would receive. Nothing is
/// reserved.
pub fn run(tenant: &str) -> CommandResult {
    let tenant = tenant.trim();
    if tenant.is_empty() {
        return CommandResult::failure(
            "next-number",
            "invalid_argument",
            "--tenant must not be blank",
            2,
        );
    }
    let tenant_id = TenantId(tenant.to_string());

    let result = with_migrated_pool("next-number", |_config, pool| async move {
        let repository = SqlQuoteRepository::new(pool);
        let year = el_salvador_local(Utc::now()).year();
        repository
            .preview_number(&tenant_id, year)
            .await
            .map_err(|error| -> Failure { ("database", error.to_string(), 6u8) })
    });

    match result {
        Ok(number) => CommandResult::success("next-number", number),
        Err(failure) => failure,
    }
}
