use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::ClientId;
use crate::domain::tenant::{TenantId, UserId};
use crate::errors::DomainError;
use crate::flows::{QuoteLifecycle, QuoteOperation, TransitionOutcome};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    /// Declared for compatibility with stored data; no operation moves a quote here.
    Expired,
    Converted,
    Cancelled,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 7] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Approved,
        QuoteStatus::Rejected,
        QuoteStatus::Expired,
        QuoteStatus::Converted,
        QuoteStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "DRAFT",
            QuoteStatus::Sent => "SENT",
            QuoteStatus::Approved => "APPROVED",
            QuoteStatus::Rejected => "REJECTED",
            QuoteStatus::Expired => "EXPIRED",
            QuoteStatus::Converted => "CONVERTED",
            QuoteStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownStatus(value.to_string()))
    }
}

/// One commercial line of a quote, in the same shape clients send and the
/// `items` column stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub descripcion: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub cantidad: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio_unitario: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub descuento: Decimal,
    pub tipo_item: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codigo: Option<String>,
}

impl QuoteItem {
    /// `cantidad * precioUnitario - descuento`, unrounded.
    pub fn line_subtotal(&self) -> Result<Decimal, DomainError> {
        self.cantidad
            .checked_mul(self.precio_unitario)
            .and_then(|gross| gross.checked_sub(self.descuento))
            .ok_or_else(|| {
                DomainError::AmountOutOfRange(format!(
                    "line `{}` exceeds the representable amount",
                    self.descripcion
                ))
            })
    }
}

/// Serialized line items as persisted. Parsing is deferred so that a corrupted
/// row still loads and the corruption surfaces where the items are used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredItems(String);

impl StoredItems {
    pub fn from_items(items: &[QuoteItem]) -> Result<Self, DomainError> {
        serde_json::to_string(items)
            .map(Self)
            .map_err(|error| DomainError::MalformedItems(error.to_string()))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_raw(&self) -> &str {
        &self.0
    }

    pub fn parse(&self) -> Result<Vec<QuoteItem>, DomainError> {
        serde_json::from_str(&self.0).map_err(|error| DomainError::MalformedItems(error.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl QuoteTotals {
    pub const ZERO: QuoteTotals =
        QuoteTotals { subtotal: Decimal::ZERO, tax_amount: Decimal::ZERO, total: Decimal::ZERO };
}

#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub id: QuoteId,
    pub tenant_id: TenantId,
    pub quote_number: String,
    pub client_id: ClientId,
    pub items: StoredItems,
    pub issue_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub totals: QuoteTotals,
    pub status: QuoteStatus,
    pub rejection_reason: Option<String>,
    pub converted_to_invoice_id: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    fn apply(&mut self, operation: QuoteOperation) -> Result<TransitionOutcome, DomainError> {
        let outcome = QuoteLifecycle.transition(self.status, operation)?;
        if let Some(next) = outcome.to.status() {
            self.status = next;
        }
        Ok(outcome)
    }

    pub fn ensure_allowed(&self, operation: QuoteOperation) -> Result<(), DomainError> {
        QuoteLifecycle.transition(self.status, operation).map(|_| ()).map_err(Into::into)
    }

    pub fn send(&mut self) -> Result<TransitionOutcome, DomainError> {
        self.apply(QuoteOperation::Send)
    }

    pub fn approve(&mut self) -> Result<TransitionOutcome, DomainError> {
        self.apply(QuoteOperation::Approve)
    }

    pub fn reject(&mut self, reason: &str) -> Result<TransitionOutcome, DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::MissingRejectionReason);
        }
        let outcome = self.apply(QuoteOperation::Reject)?;
        self.rejection_reason = Some(reason.to_string());
        Ok(outcome)
    }

    pub fn cancel(&mut self) -> Result<TransitionOutcome, DomainError> {
        self.apply(QuoteOperation::Cancel)
    }

    /// Records the emitted invoice. Conversion fields are written exactly once.
    pub fn mark_converted(
        &mut self,
        invoice_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, DomainError> {
        if self.converted_to_invoice_id.is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "quote {} already references an invoice",
                self.quote_number
            )));
        }
        let outcome = self.apply(QuoteOperation::Convert)?;
        self.converted_to_invoice_id = Some(invoice_id.into());
        self.converted_at = Some(at);
        Ok(outcome)
    }

    /// Replaces the line items and recomputes every monetary field from them.
    pub fn replace_items(&mut self, items: &[QuoteItem]) -> Result<(), DomainError> {
        self.ensure_allowed(QuoteOperation::Update)?;
        let totals = crate::cpq::pricing::compute_totals(items)?;
        self.items = StoredItems::from_items(items)?;
        self.totals = totals;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{Quote, QuoteId, QuoteItem, QuoteStatus, QuoteTotals, StoredItems};
    use crate::domain::client::ClientId;
    use crate::domain::tenant::{TenantId, UserId};
    use crate::errors::DomainError;
    use crate::flows::{FlowTransitionError, QuoteOperation};

    fn item(cantidad: i64, precio: i64, descuento: i64) -> QuoteItem {
        QuoteItem {
            descripcion: "Servicio de consultoría".to_string(),
            cantidad: Decimal::from(cantidad),
            precio_unitario: Decimal::from(precio),
            descuento: Decimal::from(descuento),
            tipo_item: 2,
            catalog_item_id: None,
            codigo: None,
        }
    }

    fn quote(status: QuoteStatus) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId("q-1".to_string()),
            tenant_id: TenantId("t-1".to_string()),
            quote_number: "COT-2025-0001".to_string(),
            client_id: ClientId("c-1".to_string()),
            items: StoredItems::from_items(&[item(1, 10, 0)]).expect("serialize"),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 10).expect("date"),
            valid_until: NaiveDate::from_ymd_opt(2025, 2, 10).expect("date"),
            terms: None,
            notes: None,
            totals: QuoteTotals::ZERO,
            status,
            rejection_reason: None,
            converted_to_invoice_id: None,
            converted_at: None,
            created_by: UserId("u-1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("sent".parse::<QuoteStatus>().expect("parse"), QuoteStatus::Sent);
        assert_eq!(" CONVERTED ".parse::<QuoteStatus>().expect("parse"), QuoteStatus::Converted);
        assert!(matches!("archived".parse::<QuoteStatus>(), Err(DomainError::UnknownStatus(_))));
    }

    #[test]
    fn approve_from_draft_fails_without_mutating_status() {
        let mut quote = quote(QuoteStatus::Draft);
        let error = quote.approve().expect_err("draft cannot be approved");
        assert!(matches!(
            error,
            DomainError::FlowTransition(FlowTransitionError::InvalidTransition {
                state: QuoteStatus::Draft,
                operation: QuoteOperation::Approve,
            })
        ));
        assert_eq!(quote.status, QuoteStatus::Draft);
    }

    #[test]
    fn sending_twice_fails_on_second_call() {
        let mut quote = quote(QuoteStatus::Draft);
        quote.send().expect("draft -> sent");
        assert!(quote.send().is_err());
        assert_eq!(quote.status, QuoteStatus::Sent);
    }

    #[test]
    fn reject_requires_non_blank_reason_and_stores_it_trimmed() {
        let mut quote = quote(QuoteStatus::Sent);
        assert_eq!(quote.reject(""), Err(DomainError::MissingRejectionReason));
        assert_eq!(quote.reject("   "), Err(DomainError::MissingRejectionReason));
        assert_eq!(quote.status, QuoteStatus::Sent);

        quote.reject("  price too high ").expect("sent -> rejected");
        assert_eq!(quote.status, QuoteStatus::Rejected);
        assert_eq!(quote.rejection_reason.as_deref(), Some("price too high"));
    }

    #[test]
    fn conversion_fields_are_set_once() {
        let mut quote = quote(QuoteStatus::Approved);
        let at = Utc::now();
        quote.mark_converted("inv-1", at).expect("approved -> converted");
        assert_eq!(quote.status, QuoteStatus::Converted);
        assert_eq!(quote.converted_to_invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(quote.converted_at, Some(at));

        assert!(quote.mark_converted("inv-2", Utc::now()).is_err());
        assert_eq!(quote.converted_to_invoice_id.as_deref(), Some("inv-1"));
    }

    #[test]
    fn replacing_items_recomputes_totals_for_drafts_only() {
        let mut draft = quote(QuoteStatus::Draft);
        draft.replace_items(&[item(2, 10, 0), item(1, 5, 1)]).expect("draft is mutable");
        assert_eq!(draft.totals.subtotal, Decimal::new(2400, 2));
        assert_eq!(draft.totals.tax_amount, Decimal::new(312, 2));
        assert_eq!(draft.totals.total, Decimal::new(2712, 2));

        let mut sent = quote(QuoteStatus::Sent);
        assert!(sent.replace_items(&[item(1, 1, 0)]).is_err());
        assert_eq!(sent.totals, QuoteTotals::ZERO);
    }

    #[test]
    fn stored_items_round_trip_preserves_values_and_order() {
        let items = vec![
            QuoteItem {
                descripcion: "Licencia anual".to_string(),
                cantidad: Decimal::new(15, 1),
                precio_unitario: Decimal::new(1_999_99, 2),
                descuento: Decimal::new(1, 1),
                tipo_item: 1,
                catalog_item_id: Some("cat-9".to_string()),
                codigo: Some("LIC-01".to_string()),
            },
            item(3, 7, 0),
        ];

        let stored = StoredItems::from_items(&items).expect("serialize");
        let reparsed = StoredItems::from_raw(stored.as_raw()).parse().expect("parse");
        assert_eq!(reparsed, items);

        let again = StoredItems::from_items(&reparsed).expect("serialize again");
        assert_eq!(again, stored);
    }

    #[test]
    fn malformed_stored_items_surface_as_errors() {
        let stored = StoredItems::from_raw("[{\"descripcion\": ");
        assert!(matches!(stored.parse(), Err(DomainError::MalformedItems(_))));
    }
}
