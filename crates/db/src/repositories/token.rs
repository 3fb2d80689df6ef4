use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use facturador_core::domain::tenant::{Principal, TenantId, UserId};

use super::{column, RepositoryError, TokenRepository};
use crate::DbPool;

pub const TOKEN_PREFIX: &str = "fct_";

/// A freshly issued bearer token. The raw value is only ever available here;
/// storage keeps its SHA-256 digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub user_id: UserId,
    pub tenant_id: Option<TenantId>,
    pub label: Option<String>,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", to_hex(&bytes))
}

pub fn hash_token(raw_token: &str) -> String {
    to_hex(&Sha256::digest(raw_token.trim().as_bytes()))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub struct SqlTokenRepository {
    pool: DbPool,
}

impl SqlTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TokenRepository for SqlTokenRepository {
    async fn issue(
        &self,
        user_id: &UserId,
        tenant_id: Option<&TenantId>,
        label: Option<&str>,
    ) -> Result<IssuedToken, RepositoryError> {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO api_token (token_hash, user_id, tenant_id, label, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(hash_token(&token))
        .bind(&user_id.0)
        .bind(tenant_id.map(|id| id.0.as_str()))
        .bind(label)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(IssuedToken {
            token,
            user_id: user_id.clone(),
            tenant_id: tenant_id.cloned(),
            label: label.map(ToString::to_string),
        })
    }

    async fn resolve(&self, raw_token: &str) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, tenant_id FROM api_token
             WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(hash_token(raw_token))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tenant_id: Option<String> = column(&row, "tenant_id")?;
        Ok(Some(Principal {
            user_id: UserId(column(&row, "user_id")?),
            tenant_id: tenant_id.map(TenantId),
        }))
    }

    async fn revoke(&self, raw_token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE api_token SET revoked_at = ? WHERE token_hash = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(hash_token(raw_token))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
