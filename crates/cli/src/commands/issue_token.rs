use facturador_core::domain::tenant::{TenantId, UserId};
use facturador_db::repositories::{SqlTenantRepository, SqlTokenRepository};
use facturador_db::{TenantRepository, TokenRepository};

use crate::commands::{with_migrated_pool, CommandResult, Failure};

/// Issues a bearer token for `user`. The raw token is printed exactly once;
/// only its digest is stored. Without a tenant the token authenticates but
/// every tenant-scoped request is refused.
pub fn run(user: &str, tenant: Option<&str>, label: Option<&str>) -> CommandResult {
    let user = user.trim();
    if user.is_empty() {
        return CommandResult::failure(
            "issue-token",
            "invalid_argument",
            "--user must not be blank",
            2,
        );
    }
    let user_id = UserId(user.to_string());
    let tenant_id =
        tenant.map(str::trim).filter(|t| !t.is_empty()).map(|t| TenantId(t.to_string()));

    let result = with_migrated_pool("issue-token", |_config, pool| async move {
        if let Some(tenant_id) = &tenant_id {
            let known = SqlTenantRepository::new(pool.clone())
                .find_by_id(tenant_id)
                .await
                .map_err(|error| ("token_issue", error.to_string(), 6u8))?;
            if known.is_none() {
                return Err::<_, Failure>((
                    "unknown_tenant",
                    format!(
                        "tenant `{tenant_id}` does not exist; run `facturador seed` or create it first"
                    ),
                    6,
                ));
            }
        }

        SqlTokenRepository::new(pool)
            .issue(&user_id, tenant_id.as_ref(), label)
            .await
            .map_err(|error| ("token_issue", error.to_string(), 6u8))
    });

    match result {
        Ok(issued) => {
            let scope = match &issued.tenant_id {
                Some(tenant_id) => format!("tenant `{tenant_id}`"),
                None => "no tenant".to_string(),
            };
            CommandResult::success(
                "issue-token",
                format!("token for `{}` with {scope}: {}", issued.user_id, issued.token),
            )
        }
        Err(failure) => failure,
    }
}
