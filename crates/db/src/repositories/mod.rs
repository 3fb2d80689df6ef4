use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use facturador_core::audit::AuditEvent;
use facturador_core::cpq::{format_quote_number, next_sequence, year_prefix};
use facturador_core::domain::client::{Client, ClientId, ClientSummary};
use facturador_core::domain::listing::QuoteListQuery;
use facturador_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use facturador_core::domain::tenant::{Principal, Tenant, TenantId, UserId};
use facturador_core::errors::ApplicationError;

pub mod audit;
pub mod client;
pub mod memory;
pub mod quote;
pub mod tenant;
pub mod token;

pub use audit::SqlAuditRepository;
pub use client::SqlClientRepository;
pub use memory::{InMemoryAuditRepository, InMemoryClientRepository, InMemoryQuoteRepository};
pub use quote::SqlQuoteRepository;
pub use tenant::SqlTenantRepository;
pub use token::{generate_token, hash_token, IssuedToken, SqlTokenRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::MalformedData(message),
            RepositoryError::Conflict(message) => Self::Validation(message),
        }
    }
}

/// A quote row together with its client, when the client still exists.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteWithClient {
    pub quote: Quote,
    pub client: Option<ClientSummary>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuotePage {
    pub rows: Vec<QuoteWithClient>,
    pub total: u64,
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<Quote>, RepositoryError>;

    /// Highest existing quote number with `prefix`, ordered by length then text.
    async fn last_number_with_prefix(
        &self,
        tenant_id: &TenantId,
        prefix: &str,
    ) -> Result<Option<String>, RepositoryError>;

    async fn current_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
    ) -> Result<Option<u32>, RepositoryError>;

    /// Atomically reserves the next sequence for the year; never returns a
    /// value below `floor`.
    async fn allocate_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
        floor: u32,
    ) -> Result<u32, RepositoryError>;

    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        tenant_id: &TenantId,
        query: &QuoteListQuery,
    ) -> Result<QuotePage, RepositoryError>;

    /// Persists the editable fields while the stored row is still `expected`.
    /// Returns false when the row is gone or its status moved on.
    async fn update_if_status(
        &self,
        quote: &Quote,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError>;

    async fn delete_if_status(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError>;

    /// Number the next quote of `year` would receive, from the same inputs
    /// `allocate_sequence` is fed. Reserves nothing.
    async fn preview_number(
        &self,
        tenant_id: &TenantId,
        year: i32,
    ) -> Result<String, RepositoryError> {
        let last = self.last_number_with_prefix(tenant_id, &year_prefix(year)).await?;
        let counter = self.current_sequence(tenant_id, year).await?;
        Ok(format_quote_number(year, next_sequence(last.as_deref(), counter)))
    }
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ClientId,
    ) -> Result<Option<Client>, RepositoryError>;

    async fn insert(&self, client: &Client) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        tenant_id: &TenantId,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Client>, u64), RepositoryError>;

    async fn delete(&self, tenant_id: &TenantId, id: &ClientId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AuditEventRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError>;

    async fn list_for_quote(
        &self,
        tenant_id: &TenantId,
        quote_id: &QuoteId,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
    async fn save(&self, tenant: &Tenant) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn issue(
        &self,
        user_id: &UserId,
        tenant_id: Option<&TenantId>,
        label: Option<&str>,
    ) -> Result<IssuedToken, RepositoryError>;

    async fn resolve(&self, raw_token: &str) -> Result<Option<Principal>, RepositoryError>;

    async fn revoke(&self, raw_token: &str) -> Result<bool, RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(format!("{name}: {e}")))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("timestamp `{value}`: {e}")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("date `{value}`: {e}")))
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|e| RepositoryError::Decode(format!("decimal `{value}`: {e}")))
}

/// Maps unique-constraint failures to [`RepositoryError::Conflict`].
pub(crate) fn write_error(error: sqlx::Error, what: &str) -> RepositoryError {
    let unique = error.as_database_error().map(|db| db.is_unique_violation()).unwrap_or(false);
    if unique {
        RepositoryError::Conflict(what.to_string())
    } else {
        RepositoryError::Database(error)
    }
}

/// `%term%` with LIKE wildcards escaped by `\`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Cot"), "%cot%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }
}
