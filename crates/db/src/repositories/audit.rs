use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;

use facturador_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use facturador_core::domain::quote::QuoteId;
use facturador_core::domain::tenant::TenantId;

use super::{column, parse_timestamp, AuditEventRepository, RepositoryError};
use crate::DbPool;

/// Append-only audit trail. Also usable directly as an [`AuditSink`].
#[derive(Clone)]
pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_event(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let category: String = column(row, "category")?;
    let outcome: String = column(row, "outcome")?;
    let metadata_json: String = column(row, "metadata_json")?;
    let quote_id: Option<String> = column(row, "quote_id")?;

    Ok(AuditEvent {
        event_id: column(row, "id")?,
        tenant_id: TenantId(column(row, "tenant_id")?),
        quote_id: quote_id.map(QuoteId),
        correlation_id: column(row, "correlation_id")?,
        event_type: column(row, "event_type")?,
        category: AuditCategory::parse(&category)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown audit category `{category}`")))?,
        actor: column(row, "actor")?,
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown audit outcome `{outcome}`")))?,
        metadata: serde_json::from_str::<BTreeMap<String, String>>(&metadata_json)
            .map_err(|e| RepositoryError::Decode(format!("audit metadata: {e}")))?,
        occurred_at: parse_timestamp(&column::<String>(row, "occurred_at")?)?,
    })
}

#[async_trait]
impl AuditEventRepository for SqlAuditRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        let metadata_json = serde_json::to_string(&event.metadata)
            .map_err(|e| RepositoryError::Decode(format!("audit metadata: {e}")))?;

        sqlx::query(
            "INSERT INTO audit_event (id, tenant_id, quote_id, correlation_id, event_type,
                                      category, actor, outcome, metadata_json, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(&event.tenant_id.0)
        .bind(event.quote_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(event.category.as_str())
        .bind(&event.actor)
        .bind(event.outcome.as_str())
        .bind(metadata_json)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_quote(
        &self,
        tenant_id: &TenantId,
        quote_id: &QuoteId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, quote_id, correlation_id, event_type, category, actor,
                    outcome, metadata_json, occurred_at
             FROM audit_event
             WHERE tenant_id = ? AND quote_id = ?
             ORDER BY rowid ASC",
        )
        .bind(&tenant_id.0)
        .bind(&quote_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}

#[async_trait]
impl AuditSink for SqlAuditRepository {
    async fn emit(&self, event: AuditEvent) {
        tracing::info!(
            event_name = %event.event_type,
            tenant_id = %event.tenant_id,
            correlation_id = %event.correlation_id,
            outcome = event.outcome.as_str(),
            "audit event"
        );
        if let Err(error) = self.append(&event).await {
            tracing::warn!(
                event_id = %event.event_id,
                event_name = %event.event_type,
                error = %error,
                "failed to persist audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use facturador_core::audit::{
        AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink,
    };
    use facturador_core::domain::quote::QuoteId;
    use facturador_core::domain::tenant::TenantId;

    use super::SqlAuditRepository;
    use crate::repositories::AuditEventRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn emitted_events_are_listed_per_quote_in_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlAuditRepository::new(pool);

        let tenant = TenantId("t-1".to_owned());
        let quote = QuoteId("q-1".to_owned());
        let context = AuditContext::new(tenant.clone(), Some(quote.clone()), "req-1", "u-1");

        repo.emit(
            AuditEvent::new(&context, "quote.created", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("quote_number", "COT-2025-0001"),
        )
        .await;
        repo.emit(AuditEvent::new(&context, "quote.sent", AuditCategory::Flow, AuditOutcome::Success))
            .await;
        let other = AuditContext::new(tenant.clone(), Some(QuoteId("q-2".to_owned())), "req-2", "u-1");
        repo.emit(AuditEvent::new(&other, "quote.created", AuditCategory::Ingress, AuditOutcome::Success))
            .await;

        let events = repo.list_for_quote(&tenant, &quote).await.expect("list");
        let types: Vec<_> = events.iter().map(|event| event.event_type.as_str()).collect();
        assert_eq!(types, vec!["quote.created", "quote.sent"]);
        assert_eq!(
            events[0].metadata.get("quote_number").map(String::as_str),
            Some("COT-2025-0001")
        );
        assert_eq!(events[1].category, AuditCategory::Flow);

        let foreign = repo.list_for_quote(&TenantId("t-2".to_owned()), &quote).await.expect("list");
        assert!(foreign.is_empty());
    }
}
