//! Tenant-scoped quote lifecycle orchestration.
//!
//! Every operation loads the quote inside the caller's tenant, checks the
//! lifecycle guard, mutates, and persists with a conditional write keyed on
//! the status it was loaded in. Audit events are emitted for every outcome.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{info, warn};

use facturador_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use facturador_core::config::Ambiente;
use facturador_core::cpq::{compute_totals, format_quote_number, next_sequence, year_prefix};
use facturador_core::domain::client::{Client, ClientId, ClientSummary};
use facturador_core::domain::listing::{Page, QuoteListQuery};
use facturador_core::domain::quote::{Quote, QuoteId, QuoteItem, QuoteStatus, StoredItems};
use facturador_core::domain::tenant::TenantScope;
use facturador_core::dte::{
    el_salvador_local, DtePayloadBuilder, EmittedDocument, InvoiceEmitter, TIPO_DTE_FACTURA,
};
use facturador_core::errors::{ApplicationError, DomainError};
use facturador_core::flows::{QuoteLifecycle, QuoteOperation, TransitionOutcome};
use facturador_db::repositories::{
    AuditEventRepository, ClientRepository, QuoteRepository, QuoteWithClient,
};

#[derive(Clone, Debug)]
pub struct NewQuote {
    pub client_id: ClientId,
    pub valid_until: NaiveDate,
    pub items: Vec<QuoteItem>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

/// Fields a draft update may replace. `None` leaves the stored value as is.
#[derive(Clone, Debug, Default)]
pub struct QuoteChanges {
    pub client_id: Option<ClientId>,
    pub valid_until: Option<NaiveDate>,
    pub items: Option<Vec<QuoteItem>>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Conversion {
    pub quote: QuoteWithClient,
    pub document: EmittedDocument,
}

pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
    clients: Arc<dyn ClientRepository>,
    history: Arc<dyn AuditEventRepository>,
    audit: Arc<dyn AuditSink>,
    emitter: Arc<dyn InvoiceEmitter>,
    ambiente: Ambiente,
    lifecycle: QuoteLifecycle,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        clients: Arc<dyn ClientRepository>,
        history: Arc<dyn AuditEventRepository>,
        audit: Arc<dyn AuditSink>,
        emitter: Arc<dyn InvoiceEmitter>,
        ambiente: Ambiente,
    ) -> Self {
        Self { quotes, clients, history, audit, emitter, ambiente, lifecycle: QuoteLifecycle }
    }

    /// Preview of the number the next created quote would receive. Reads only.
    pub async fn next_number(&self, scope: &TenantScope) -> Result<String, ApplicationError> {
        let year = el_salvador_local(Utc::now()).year();
        Ok(self.quotes.preview_number(&scope.tenant_id, year).await?)
    }

    pub async fn create(
        &self,
        scope: &TenantScope,
        input: NewQuote,
    ) -> Result<QuoteWithClient, ApplicationError> {
        if input.items.is_empty() {
            return Err(ApplicationError::Validation("a quote needs at least one item".to_string()));
        }
        let totals = compute_totals(&input.items)?;
        let client = self.require_client(scope, &input.client_id).await?;

        let now = Utc::now();
        let local = el_salvador_local(now);
        let year = local.year();
        let last = self.quotes.last_number_with_prefix(&scope.tenant_id, &year_prefix(year)).await?;
        let sequence = self
            .quotes
            .allocate_sequence(&scope.tenant_id, year, next_sequence(last.as_deref(), None))
            .await?;

        let quote = Quote {
            id: QuoteId::generate(),
            tenant_id: scope.tenant_id.clone(),
            quote_number: format_quote_number(year, sequence),
            client_id: input.client_id,
            items: StoredItems::from_items(&input.items)?,
            issue_date: local.date(),
            valid_until: input.valid_until,
            terms: non_blank(input.terms),
            notes: non_blank(input.notes),
            totals,
            status: self.lifecycle.initial_state(),
            rejection_reason: None,
            converted_to_invoice_id: None,
            converted_at: None,
            created_by: scope.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.quotes.insert(&quote).await?;

        let context = AuditContext::for_quote(scope, &quote.id);
        self.audit
            .emit(
                AuditEvent::new(&context, "quote.created", AuditCategory::Ingress, AuditOutcome::Success)
                    .with_metadata("quote_number", quote.quote_number.clone())
                    .with_metadata("total", quote.totals.total.to_string()),
            )
            .await;
        info!(
            event_name = "quote.created",
            correlation_id = %scope.correlation_id,
            tenant_id = %scope.tenant_id,
            quote_id = %quote.id,
            quote_number = %quote.quote_number,
            "quote created"
        );

        Ok(QuoteWithClient { quote, client: Some(ClientSummary::from(&client)) })
    }

    pub async fn list(
        &self,
        scope: &TenantScope,
        query: &QuoteListQuery,
    ) -> Result<Page<QuoteWithClient>, ApplicationError> {
        let page = self.quotes.list(&scope.tenant_id, query).await?;
        Ok(Page::new(page.rows, page.total, query.page, query.limit))
    }

    pub async fn get(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<QuoteWithClient, ApplicationError> {
        let quote = self.load(scope, id).await?;
        let client = self.client_summary(scope, &quote.client_id).await?;
        Ok(QuoteWithClient { quote, client })
    }

    pub async fn update(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
        changes: QuoteChanges,
    ) -> Result<QuoteWithClient, ApplicationError> {
        let mut quote = self.load(scope, id).await?;
        let context = AuditContext::for_quote(scope, &quote.id);
        self.guard(&quote, QuoteOperation::Update, &context).await?;

        if let Some(client_id) = changes.client_id {
            if client_id != quote.client_id {
                self.require_client(scope, &client_id).await?;
                quote.client_id = client_id;
            }
        }
        if let Some(valid_until) = changes.valid_until {
            quote.valid_until = valid_until;
        }
        if let Some(items) = changes.items {
            if items.is_empty() {
                return Err(ApplicationError::Validation(
                    "a quote needs at least one item".to_string(),
                ));
            }
            quote.replace_items(&items)?;
        }
        if changes.terms.is_some() {
            quote.terms = non_blank(changes.terms);
        }
        if changes.notes.is_some() {
            quote.notes = non_blank(changes.notes);
        }
        quote.updated_at = Utc::now();

        self.persist(scope, &quote, QuoteStatus::Draft, QuoteOperation::Update).await?;
        self.audit
            .emit(
                AuditEvent::new(
                    &context,
                    QuoteOperation::Update.event_type(),
                    AuditCategory::Ingress,
                    AuditOutcome::Success,
                )
                .with_metadata("total", quote.totals.total.to_string()),
            )
            .await;

        let client = self.client_summary(scope, &quote.client_id).await?;
        Ok(QuoteWithClient { quote, client })
    }

    pub async fn remove(&self, scope: &TenantScope, id: &QuoteId) -> Result<(), ApplicationError> {
        let quote = self.load(scope, id).await?;
        let context = AuditContext::for_quote(scope, &quote.id);
        self.guard(&quote, QuoteOperation::Remove, &context).await?;

        if !self.quotes.delete_if_status(&scope.tenant_id, id, QuoteStatus::Draft).await? {
            return Err(self.stale_write(scope, id, QuoteOperation::Remove).await);
        }
        self.audit
            .emit(
                AuditEvent::new(
                    &context,
                    QuoteOperation::Remove.event_type(),
                    AuditCategory::Ingress,
                    AuditOutcome::Success,
                )
                .with_metadata("quote_number", quote.quote_number.clone()),
            )
            .await;
        info!(
            event_name = "quote.removed",
            correlation_id = %scope.correlation_id,
            tenant_id = %scope.tenant_id,
            quote_id = %quote.id,
            "draft quote removed"
        );
        Ok(())
    }

    pub async fn send(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<QuoteWithClient, ApplicationError> {
        self.transition(scope, id, QuoteOperation::Send, |quote| quote.send()).await
    }

    pub async fn approve(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<QuoteWithClient, ApplicationError> {
        self.transition(scope, id, QuoteOperation::Approve, |quote| quote.approve()).await
    }

    pub async fn reject(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
        reason: &str,
    ) -> Result<QuoteWithClient, ApplicationError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(DomainError::MissingRejectionReason.into());
        }
        self.transition(scope, id, QuoteOperation::Reject, move |quote| quote.reject(&reason)).await
    }

    pub async fn cancel(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<QuoteWithClient, ApplicationError> {
        self.transition(scope, id, QuoteOperation::Cancel, |quote| quote.cancel()).await
    }

    /// Emits a Factura for an approved quote and links it. Emission failures
    /// leave the quote APPROVED.
    pub async fn convert(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<Conversion, ApplicationError> {
        let mut quote = self.load(scope, id).await?;
        let context = AuditContext::for_quote(scope, &quote.id);
        self.guard(&quote, QuoteOperation::Convert, &context).await?;

        let client = self
            .clients
            .find_by_id(&scope.tenant_id, &quote.client_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("client", quote.client_id.0.clone()))?;
        let items = quote
            .items
            .parse()
            .map_err(|error| ApplicationError::MalformedData(error.to_string()))?;

        let now = Utc::now();
        let payload =
            DtePayloadBuilder::new(self.ambiente).issued_at(now).build(&quote, &client, &items)?;
        let document = match self.emitter.emit(&scope.tenant_id, TIPO_DTE_FACTURA, &payload).await {
            Ok(document) => document,
            Err(error) => {
                self.audit
                    .emit(
                        AuditEvent::new(
                            &context,
                            "quote.conversion_failed",
                            AuditCategory::Emission,
                            AuditOutcome::Failed,
                        )
                        .with_metadata("error", error.to_string()),
                    )
                    .await;
                return Err(ApplicationError::Integration(error.to_string()));
            }
        };

        quote.mark_converted(document.id.clone(), now)?;
        quote.updated_at = now;
        if let Err(error) =
            self.persist(scope, &quote, QuoteStatus::Approved, QuoteOperation::Convert).await
        {
            warn!(
                event_name = "quote.conversion.orphaned_document",
                correlation_id = %scope.correlation_id,
                tenant_id = %scope.tenant_id,
                quote_id = %quote.id,
                invoice_id = %document.id,
                codigo_generacion = %document.codigo_generacion,
                error = %error,
                "emitted document could not be linked to its quote"
            );
            return Err(error);
        }

        self.audit
            .emit(
                AuditEvent::new(
                    &context,
                    QuoteOperation::Convert.event_type(),
                    AuditCategory::Emission,
                    AuditOutcome::Success,
                )
                .with_metadata("invoice_id", document.id.clone())
                .with_metadata("codigo_generacion", document.codigo_generacion.clone())
                .with_metadata("numero_control", document.numero_control.clone()),
            )
            .await;
        info!(
            event_name = "quote.converted",
            correlation_id = %scope.correlation_id,
            tenant_id = %scope.tenant_id,
            quote_id = %quote.id,
            invoice_id = %document.id,
            "quote converted to invoice"
        );

        Ok(Conversion {
            quote: QuoteWithClient { quote, client: Some(ClientSummary::from(&client)) },
            document,
        })
    }

    pub async fn history(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
    ) -> Result<Vec<AuditEvent>, ApplicationError> {
        let quote = self.load(scope, id).await?;
        Ok(self.history.list_for_quote(&scope.tenant_id, &quote.id).await?)
    }

    async fn transition<F>(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
        operation: QuoteOperation,
        apply: F,
    ) -> Result<QuoteWithClient, ApplicationError>
    where
        F: FnOnce(&mut Quote) -> Result<TransitionOutcome, DomainError> + Send,
    {
        let mut quote = self.load(scope, id).await?;
        let context = AuditContext::for_quote(scope, &quote.id);
        let previous = quote.status;
        self.guard(&quote, operation, &context).await?;

        let outcome = apply(&mut quote)?;
        quote.updated_at = Utc::now();
        self.persist(scope, &quote, previous, operation).await?;

        self.audit
            .emit(
                AuditEvent::new(&context, operation.event_type(), AuditCategory::Flow, AuditOutcome::Success)
                    .with_metadata("from", outcome.from.as_str())
                    .with_metadata("to", outcome.to.to_string()),
            )
            .await;
        info!(
            event_name = operation.event_type(),
            correlation_id = %scope.correlation_id,
            tenant_id = %scope.tenant_id,
            quote_id = %quote.id,
            from = outcome.from.as_str(),
            to = %outcome.to,
            "quote status changed"
        );

        let client = self.client_summary(scope, &quote.client_id).await?;
        Ok(QuoteWithClient { quote, client })
    }

    async fn load(&self, scope: &TenantScope, id: &QuoteId) -> Result<Quote, ApplicationError> {
        self.quotes
            .find_by_id(&scope.tenant_id, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("quote", id.0.clone()))
    }

    async fn guard(
        &self,
        quote: &Quote,
        operation: QuoteOperation,
        context: &AuditContext,
    ) -> Result<TransitionOutcome, ApplicationError> {
        self.lifecycle
            .apply_with_audit(quote.status, operation, self.audit.as_ref(), context)
            .await
            .map_err(|error| ApplicationError::from(DomainError::from(error)))
    }

    async fn require_client(
        &self,
        scope: &TenantScope,
        client_id: &ClientId,
    ) -> Result<Client, ApplicationError> {
        self.clients.find_by_id(&scope.tenant_id, client_id).await?.ok_or_else(|| {
            ApplicationError::Validation(format!("client `{}` does not exist", client_id.0))
        })
    }

    async fn client_summary(
        &self,
        scope: &TenantScope,
        client_id: &ClientId,
    ) -> Result<Option<ClientSummary>, ApplicationError> {
        let client = self.clients.find_by_id(&scope.tenant_id, client_id).await?;
        Ok(client.as_ref().map(ClientSummary::from))
    }

    async fn persist(
        &self,
        scope: &TenantScope,
        quote: &Quote,
        expected: QuoteStatus,
        operation: QuoteOperation,
    ) -> Result<(), ApplicationError> {
        if self.quotes.update_if_status(quote, expected).await? {
            return Ok(());
        }
        Err(self.stale_write(scope, &quote.id, operation).await)
    }

    /// Explains a conditional write that matched no row: the quote is gone,
    /// its status moved on, or it changed underneath us.
    async fn stale_write(
        &self,
        scope: &TenantScope,
        id: &QuoteId,
        operation: QuoteOperation,
    ) -> ApplicationError {
        match self.quotes.find_by_id(&scope.tenant_id, id).await {
            Ok(None) => ApplicationError::not_found("quote", id.0.clone()),
            Ok(Some(current)) => match current.ensure_allowed(operation) {
                Err(error) => error.into(),
                Ok(()) => ApplicationError::Persistence(format!(
                    "quote {} was modified concurrently",
                    current.quote_number
                )),
            },
            Err(error) => error.into(),
        }
    }
}
