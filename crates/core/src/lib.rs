pub mod audit;
pub mod catalog;
pub mod config;
pub mod cpq;
pub mod domain;
pub mod dte;
pub mod errors;
pub mod flows;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use domain::client::{Client, ClientAddress, ClientId, ClientSummary};
pub use domain::listing::{Page, QuoteListQuery, QuoteSortField, SortOrder};
pub use domain::quote::{Quote, QuoteId, QuoteItem, QuoteStatus, QuoteTotals, StoredItems};
pub use domain::tenant::{Principal, Tenant, TenantId, TenantScope, UserId};
pub use dte::emission::{EmissionError, EmittedDocument, InvoiceEmitter};
pub use dte::payload::{DtePayload, DtePayloadBuilder};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    FlowTransitionError, QuoteLifecycle, QuoteOperation, TransitionOutcome, TransitionTarget,
};

pub use chrono;
pub use rust_decimal;
