use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use facturador_core::audit::{AuditEvent, AuditSink};
use facturador_core::domain::client::{Client, ClientId, ClientSummary};
use facturador_core::domain::listing::{QuoteListQuery, QuoteSortField, SortOrder};
use facturador_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use facturador_core::domain::tenant::TenantId;

use super::{
    AuditEventRepository, ClientRepository, QuotePage, QuoteRepository, QuoteWithClient,
    RepositoryError,
};

#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientRepository {
    async fn summary(&self, tenant_id: &TenantId, id: &ClientId) -> Option<ClientSummary> {
        let clients = self.clients.read().await;
        clients
            .get(&id.0)
            .filter(|client| &client.tenant_id == tenant_id)
            .map(ClientSummary::from)
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ClientId,
    ) -> Result<Option<Client>, RepositoryError> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id.0).filter(|client| &client.tenant_id == tenant_id).cloned())
    }

    async fn insert(&self, client: &Client) -> Result<(), RepositoryError> {
        let mut clients = self.clients.write().await;
        let duplicate = clients.values().any(|existing| {
            existing.tenant_id == client.tenant_id && existing.num_documento == client.num_documento
        });
        if duplicate || clients.contains_key(&client.id.0) {
            return Err(RepositoryError::Conflict(format!(
                "client with document {} already exists",
                client.num_documento
            )));
        }
        clients.insert(client.id.0.clone(), client.clone());
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Client>, u64), RepositoryError> {
        let needle = search.map(str::to_lowercase);
        let clients = self.clients.read().await;
        let mut matching: Vec<Client> = clients
            .values()
            .filter(|client| &client.tenant_id == tenant_id)
            .filter(|client| match &needle {
                Some(needle) => {
                    client.nombre.to_lowercase().contains(needle)
                        || client.num_documento.to_lowercase().contains(needle)
                }
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.nombre.cmp(&b.nombre).then_with(|| a.id.0.cmp(&b.id.0)));

        let total = matching.len() as u64;
        let offset = page.saturating_sub(1) as usize * limit as usize;
        let rows = matching.into_iter().skip(offset).take(limit as usize).collect();
        Ok((rows, total))
    }

    async fn delete(&self, tenant_id: &TenantId, id: &ClientId) -> Result<bool, RepositoryError> {
        let mut clients = self.clients.write().await;
        let owned = clients.get(&id.0).is_some_and(|client| &client.tenant_id == tenant_id);
        if owned {
            clients.remove(&id.0);
        }
        Ok(owned)
    }
}

/// Quote storage for tests and embedded use. Listing resolves client names
/// through the shared client repository, mirroring the SQL join.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
    sequences: RwLock<HashMap<(String, i32), u32>>,
    clients: Arc<InMemoryClientRepository>,
}

impl InMemoryQuoteRepository {
    pub fn with_clients(clients: Arc<InMemoryClientRepository>) -> Self {
        Self { quotes: RwLock::default(), sequences: RwLock::default(), clients }
    }
}

fn compare_quotes(a: &Quote, b: &Quote, field: QuoteSortField) -> Ordering {
    match field {
        QuoteSortField::QuoteNumber => a.quote_number.cmp(&b.quote_number),
        QuoteSortField::IssueDate => a.issue_date.cmp(&b.issue_date),
        QuoteSortField::ValidUntil => a.valid_until.cmp(&b.valid_until),
        QuoteSortField::Total => a.totals.total.cmp(&b.totals.total),
        QuoteSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        QuoteSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).filter(|quote| &quote.tenant_id == tenant_id).cloned())
    }

    async fn last_number_with_prefix(
        &self,
        tenant_id: &TenantId,
        prefix: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .values()
            .filter(|quote| &quote.tenant_id == tenant_id && quote.quote_number.starts_with(prefix))
            .map(|quote| quote.quote_number.clone())
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b))))
    }

    async fn current_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
    ) -> Result<Option<u32>, RepositoryError> {
        let sequences = self.sequences.read().await;
        Ok(sequences.get(&(tenant_id.0.clone(), year)).copied())
    }

    async fn allocate_sequence(
        &self,
        tenant_id: &TenantId,
        year: i32,
        floor: u32,
    ) -> Result<u32, RepositoryError> {
        let mut sequences = self.sequences.write().await;
        let entry = sequences.entry((tenant_id.0.clone(), year)).or_insert(0);
        *entry = (*entry + 1).max(floor.max(1));
        Ok(*entry)
    }

    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let duplicate = quotes.values().any(|existing| {
            existing.tenant_id == quote.tenant_id && existing.quote_number == quote.quote_number
        });
        if duplicate || quotes.contains_key(&quote.id.0) {
            return Err(RepositoryError::Conflict(format!(
                "quote number {} already exists",
                quote.quote_number
            )));
        }
        quotes.insert(quote.id.0.clone(), quote.clone());
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        query: &QuoteListQuery,
    ) -> Result<QuotePage, RepositoryError> {
        let snapshot: Vec<Quote> = {
            let quotes = self.quotes.read().await;
            quotes
                .values()
                .filter(|quote| &quote.tenant_id == tenant_id)
                .filter(|quote| query.status.map_or(true, |status| quote.status == status))
                .cloned()
                .collect()
        };

        let needle = query.search.as_ref().map(|term| term.to_lowercase());
        let mut rows = Vec::with_capacity(snapshot.len());
        for quote in snapshot {
            let client = self.clients.summary(tenant_id, &quote.client_id).await;
            let matches = match &needle {
                Some(needle) => {
                    quote.quote_number.to_lowercase().contains(needle)
                        || client
                            .as_ref()
                            .is_some_and(|client| client.nombre.to_lowercase().contains(needle))
                }
                None => true,
            };
            if matches {
                rows.push(QuoteWithClient { quote, client });
            }
        }

        rows.sort_by(|a, b| {
            let ordering = compare_quotes(&a.quote, &b.quote, query.sort_by)
                .then_with(|| a.quote.id.0.cmp(&b.quote.id.0));
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();
        Ok(QuotePage { rows, total })
    }

    async fn update_if_status(
        &self,
        quote: &Quote,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        match quotes.get_mut(&quote.id.0) {
            Some(stored) if stored.tenant_id == quote.tenant_id && stored.status == expected => {
                *stored = quote.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_if_status(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let removable = quotes
            .get(&id.0)
            .is_some_and(|quote| &quote.tenant_id == tenant_id && quote.status == expected);
        if removable {
            quotes.remove(&id.0);
        }
        Ok(removable)
    }
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditEventRepository for InMemoryAuditRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn list_for_quote(
        &self,
        tenant_id: &TenantId,
        quote_id: &QuoteId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| {
                &event.tenant_id == tenant_id && event.quote_id.as_ref() == Some(quote_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditRepository {
    async fn emit(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }
}
