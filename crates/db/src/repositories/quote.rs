use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};

use facturador_core::domain::client::{ClientId, ClientSummary};
use facturador_core::domain::listing::{QuoteListQuery, QuoteSortField};
use facturador_core::domain::quote::{Quote, QuoteId, QuoteStatus, QuoteTotals, StoredItems};
use facturador_core::domain::tenant::{TenantId, UserId};

use super::{
    column, like_pattern, parse_date, parse_decimal, parse_timestamp, write_error, QuotePage,
    QuoteRepository, QuoteWithClient, RepositoryError,
};
use crate::DbPool;

const QUOTE_COLUMNS: &str = "q.id, q.tenant_id, q.quote_number, q.client_id, q.items, q.issue_date,
     q.valid_until, q.terms, q.notes, q.subtotal, q.tax_amount, q.total, q.status,
     q.rejection_reason, q.converted_to_invoice_id, q.converted_at, q.created_by,
     q.created_at, q.updated_at";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let status: String = column(row, "status")?;
    let status =
        status.parse::<QuoteStatus>().map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let converted_at: Option<String> = column(row, "converted_at")?;
    let converted_at = converted_at.as_deref().map(parse_timestamp).transpose()?;

    Ok(Quote {
        id: QuoteId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        quote_number: column(row, "quote_number")?,
        client_id: ClientId(column(row, "client_id")?),
        items: StoredItems::from_raw(column::<String>(row, "items")?),
        issue_date: parse_date(&column::<String>(row, "issue_date")?)?,
        valid_until: parse_date(&column::<String>(row, "valid_until")?)?,
        terms: column(row, "terms")?,
        notes: column(row, "notes")?,
        totals: QuoteTotals {
            subtotal: parse_decimal(&column::<String>(row, "subtotal")?)?,
            tax_amount: parse_decimal(&column::<String>(row, "tax_amount")?)?,
            total: parse_decimal(&column::<String>(row, "total")?)?,
        },
        status,
        rejection_reason: column(row, "rejection_reason")?,
        converted_to_invoice_id: column(row, "converted_to_invoice_id")?,
        converted_at,
        created_by: UserId(column(row, "created_by")?),
        created_at: parse_timestamp(&column::<String>(row, "created_at")?)?,
        updated_at: parse_timestamp(&column::<String>(row, "updated_at")?)?,
    })
}

fn row_to_listing(row: &SqliteRow) -> Result<QuoteWithClient, RepositoryError> {
    let quote = row_to_quote(row)?;
    let client_ref: Option<String> = column(row, "client_ref")?;
    let client = match client_ref {
        Some(id) => Some(ClientSummary {
            id: ClientId(id),
            nombre: column(row, "client_nombre")?,
            num_documento: column(row, "client_num_documento")?,
        }),
        None => None,
    };
    Ok(QuoteWithClient { quote, client })
}

fn sort_expression(field: QuoteSortField) -> &'static str {
    match field {
        QuoteSortField::QuoteNumber => "q.quote_number",
        QuoteSortField::IssueDate => "q.issue_date",
        QuoteSortField::ValidUntil => "q.valid_until",
        QuoteSortField::Total => "CAST(q.total AS REAL)",
        QuoteSortField::Status => "q.status",
        QuoteSortField::CreatedAt => "q.created_at",
    }
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    tenant_id: &'a TenantId,
    query: &'a QuoteListQuery,
) {
    builder.push(" WHERE q.tenant_id = ").push_bind(&tenant_id.0);
    if let Some(status) = query.status {
        builder.push(" AND q.status = ").push_bind(status.as_str());
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (LOWER(q.quote_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR c.nombre_search LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quote q WHERE q.id = ? AND q.tenant_id = ?"
        ))
        .bind(&id.0)
        .bind(&tenant_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_quote).transpose()
    }

    async fn last_number_with_prefix(
        &self,
        tenant_id: &TenantId,
        prefix: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let number: Option<String> = sqlx::query_scalar(
            "SELECT quote_number FROM quote
             WHERE tenant_id = ? AND substr(quote_number, 1, length(?)) = ?
             ORDER BY LENGTH(quote_number) DESC, quote_number DESC
             LIMIT 1",
        )
        .bind(&tenant_id.0)
        .bind(prefix)
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await?;
        Ok(number)
    }

    async fn current_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
    ) -> Result<Option<u32>, RepositoryError> {
        let value: Option<i64> = sqlx::query_scalar(
            "SELECT last_value FROM quote_sequence WHERE tenant_id = ? AND year = ?",
        )
        .bind(&tenant_id.0)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        value
            .map(|v| u32::try_from(v).map_err(|e| RepositoryError::Decode(e.to_string())))
            .transpose()
    }

    async fn allocate_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
        floor: u32,
    ) -> Result<u32, RepositoryError> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO quote_sequence (tenant_id, year, last_value) VALUES (?, ?, ?)
             ON CONFLICT(tenant_id, year) DO UPDATE SET
                 last_value = MAX(quote_sequence.last_value + 1, excluded.last_value)
             RETURNING last_value",
        )
        .bind(&tenant_id.0)
        .bind(year)
        .bind(i64::from(floor.max(1)))
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(value).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote (id, tenant_id, quote_number, client_id, items, issue_date,
                                valid_until, terms, notes, subtotal, tax_amount, total, status,
                                rejection_reason, converted_to_invoice_id, converted_at,
                                created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.tenant_id.0)
        .bind(&quote.quote_number)
        .bind(&quote.client_id.0)
        .bind(quote.items.as_raw())
        .bind(quote.issue_date.format("%Y-%m-%d").to_string())
        .bind(quote.valid_until.format("%Y-%m-%d").to_string())
        .bind(&quote.terms)
        .bind(&quote.notes)
        .bind(quote.totals.subtotal.to_string())
        .bind(quote.totals.tax_amount.to_string())
        .bind(quote.totals.total.to_string())
        .bind(quote.status.as_str())
        .bind(&quote.rejection_reason)
        .bind(&quote.converted_to_invoice_id)
        .bind(quote.converted_at.map(|at| at.to_rfc3339()))
        .bind(&quote.created_by.0)
        .bind(quote.created_at.to_rfc3339())
        .bind(quote.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &format!("quote number {} already exists", quote.quote_number)))?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        query: &QuoteListQuery,
    ) -> Result<QuotePage, RepositoryError> {
        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM quote q
             LEFT JOIN client c ON c.id = q.client_id AND c.tenant_id = q.tenant_id",
        );
        push_filters(&mut count, tenant_id, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {QUOTE_COLUMNS}, c.id AS client_ref, c.nombre AS client_nombre,
                    c.num_documento AS client_num_documento
             FROM quote q
             LEFT JOIN client c ON c.id = q.client_id AND c.tenant_id = q.tenant_id"
        ));
        push_filters(&mut select, tenant_id, query);
        let direction = query.sort_order.as_sql();
        select.push(format!(
            " ORDER BY {} {direction}, q.id {direction} LIMIT ",
            sort_expression(query.sort_by)
        ));
        select.push_bind(i64::from(query.limit));
        select.push(" OFFSET ");
        select.push_bind(query.offset() as i64);

        let rows = select.build().fetch_all(&self.pool).await?;
        let rows = rows.iter().map(row_to_listing).collect::<Result<Vec<_>, _>>()?;

        Ok(QuotePage { rows, total: u64::try_from(total).unwrap_or(0) })
    }

    async fn update_if_status(
        &self,
        quote: &Quote,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE quote SET
                 client_id = ?, items = ?, valid_until = ?, terms = ?, notes = ?,
                 subtotal = ?, tax_amount = ?, total = ?, status = ?, rejection_reason = ?,
                 converted_to_invoice_id = ?, converted_at = ?, updated_at = ?
             WHERE id = ? AND tenant_id = ? AND status = ?",
        )
        .bind(&quote.client_id.0)
        .bind(quote.items.as_raw())
        .bind(quote.valid_until.format("%Y-%m-%d").to_string())
        .bind(&quote.terms)
        .bind(&quote.notes)
        .bind(quote.totals.subtotal.to_string())
        .bind(quote.totals.tax_amount.to_string())
        .bind(quote.totals.total.to_string())
        .bind(quote.status.as_str())
        .bind(&quote.rejection_reason)
        .bind(&quote.converted_to_invoice_id)
        .bind(quote.converted_at.map(|at| at.to_rfc3339()))
        .bind(quote.updated_at.to_rfc3339())
        .bind(&quote.id.0)
        .bind(&quote.tenant_id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_if_status(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM quote WHERE id = ? AND tenant_id = ? AND status = ?")
            .bind(&id.0)
            .bind(&tenant_id.0)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
