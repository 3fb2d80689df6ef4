//! Tenant-scoped quote routes.
//!
//! Endpoints (all require `Authorization: Bearer <token>`):
//! - `GET    /quotes/next-number`     preview the next quote number
//! - `POST   /quotes`                 create a DRAFT quote
//! - `GET    /quotes`                 paginated list with search and sorting
//! - `GET    /quotes/{id}`            fetch one quote with its client summary
//! - `PATCH  /quotes/{id}`            update a DRAFT quote
//! - `DELETE /quotes/{id}`            delete a DRAFT quote
//! - `POST   /quotes/{id}/send`       DRAFT -> SENT
//! - `POST   /quotes/{id}/approve`    SENT -> APPROVED
//! - `POST   /quotes/{id}/reject`     SENT -> REJECTED, body `{reason}`
//! - `POST   /quotes/{id}/cancel`     any status except CONVERTED -> CANCELLED
//! - `POST   /quotes/{id}/convert`    APPROVED -> CONVERTED, emits a Factura
//! - `GET    /quotes/{id}/history`    audit events for the quote

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use facturador_core::audit::AuditEvent;
use facturador_core::cpq::MAX_LINE_AMOUNT;
use facturador_core::domain::client::{ClientId, ClientSummary};
use facturador_core::domain::listing::{Page, QuoteListQuery};
use facturador_core::domain::quote::{QuoteId, QuoteItem, QuoteStatus, QuoteTotals};
use facturador_core::dte::EmittedDocument;
use facturador_core::errors::ApplicationError;
use facturador_db::repositories::QuoteWithClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::quote_service::{NewQuote, QuoteChanges};
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/next-number", get(next_number))
        .route("/quotes/{id}", get(get_quote).patch(update_quote).delete(delete_quote))
        .route("/quotes/{id}/send", post(send_quote))
        .route("/quotes/{id}/approve", post(approve_quote))
        .route("/quotes/{id}/reject", post(reject_quote))
        .route("/quotes/{id}/cancel", post(cancel_quote))
        .route("/quotes/{id}/convert", post(convert_quote))
        .route("/quotes/{id}/history", get(quote_history))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

fn within_line_limit(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_LINE_AMOUNT {
        Err(ValidationError::new("amount_above_maximum"))
    } else {
        Ok(())
    }
}

fn at_least_one_cent(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::new(1, 2) {
        return Err(ValidationError::new("cantidad_below_minimum"));
    }
    within_line_limit(value)
}

fn not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    within_line_limit(value)
}

fn calendar_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value).map(|_| ()).ok_or_else(|| ValidationError::new("invalid_date"))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its date part is kept).
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|parsed| parsed.date_naive()))
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItemRequest {
    #[validate(length(min = 1, max = 1000))]
    pub descripcion: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "at_least_one_cent"))]
    pub cantidad: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "not_negative"))]
    pub precio_unitario: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    #[validate(custom(function = "not_negative"))]
    pub descuento: Decimal,
    #[validate(range(min = 1))]
    pub tipo_item: u8,
    pub catalog_item_id: Option<String>,
    pub codigo: Option<String>,
}

impl From<QuoteItemRequest> for QuoteItem {
    fn from(item: QuoteItemRequest) -> Self {
        QuoteItem {
            descripcion: item.descripcion.trim().to_string(),
            cantidad: item.cantidad,
            precio_unitario: item.precio_unitario,
            descuento: item.descuento,
            tipo_item: item.tipo_item,
            catalog_item_id: item.catalog_item_id,
            codigo: item.codigo,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1))]
    pub cliente_id: String,
    #[validate(custom(function = "calendar_date"))]
    pub valid_until: String,
    #[validate(length(min = 1), nested)]
    pub items: Vec<QuoteItemRequest>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuoteRequest {
    #[validate(length(min = 1))]
    pub cliente_id: Option<String>,
    #[validate(custom(function = "calendar_date"))]
    pub valid_until: Option<String>,
    #[validate(length(min = 1), nested)]
    pub items: Option<Vec<QuoteItemRequest>>,
    pub terms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RejectQuoteRequest {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuotesParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub id: QuoteId,
    pub quote_number: String,
    pub cliente_id: ClientId,
    pub client: Option<ClientSummary>,
    pub items: Vec<QuoteItem>,
    pub issue_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub terms: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub totals: QuoteTotals,
    pub status: QuoteStatus,
    pub rejection_reason: Option<String>,
    pub converted_to_invoice_id: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteWithClient> for QuoteResponse {
    type Error = ApplicationError;

    fn try_from(row: QuoteWithClient) -> Result<Self, Self::Error> {
        let QuoteWithClient { quote, client } = row;
        let items = quote.items.parse()?;
        Ok(Self {
            id: quote.id,
            quote_number: quote.quote_number,
            cliente_id: quote.client_id,
            client,
            items,
            issue_date: quote.issue_date,
            valid_until: quote.valid_until,
            terms: quote.terms,
            notes: quote.notes,
            totals: quote.totals,
            status: quote.status,
            rejection_reason: quote.rejection_reason,
            converted_to_invoice_id: quote.converted_to_invoice_id,
            converted_at: quote.converted_at,
            created_by: quote.created_by.0,
            created_at: quote.created_at,
            updated_at: quote.updated_at,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumberResponse {
    pub quote_number: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub quote: QuoteResponse,
    pub invoice: EmittedDocument,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type QuoteResult<T> = Result<T, ApiError>;

fn respond(row: QuoteWithClient, correlation_id: &str) -> QuoteResult<Json<QuoteResponse>> {
    QuoteResponse::try_from(row)
        .map(Json)
        .map_err(|error| ApiError::from_application(error, correlation_id))
}

fn fail(correlation_id: &str) -> impl Fn(ApplicationError) -> ApiError + '_ {
    move |error| ApiError::from_application(error, correlation_id)
}

pub async fn next_number(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
) -> QuoteResult<Json<NextNumberResponse>> {
    let quote_number = state.quotes.next_number(&scope).await.map_err(fail(&scope.correlation_id))?;
    Ok(Json(NextNumberResponse { quote_number }))
}

pub async fn create_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    ValidatedJson(body): ValidatedJson<CreateQuoteRequest>,
) -> QuoteResult<(StatusCode, Json<QuoteResponse>)> {
    let valid_until = parse_date(&body.valid_until)
        .ok_or_else(|| ApiError::bad_request("validUntil is not a date", &scope.correlation_id))?;
    let input = NewQuote {
        client_id: ClientId(body.cliente_id.trim().to_string()),
        valid_until,
        items: body.items.into_iter().map(QuoteItem::from).collect(),
        terms: body.terms,
        notes: body.notes,
    };

    let created = state.quotes.create(&scope, input).await.map_err(fail(&scope.correlation_id))?;
    Ok((StatusCode::CREATED, respond(created, &scope.correlation_id)?))
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Query(params): Query<ListQuotesParams>,
) -> QuoteResult<Json<Page<QuoteResponse>>> {
    let query = QuoteListQuery::from_raw(
        params.page,
        params.limit,
        params.status.as_deref(),
        params.search.as_deref(),
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
    )
    .map_err(|error| ApiError::from_application(error.into(), &scope.correlation_id))?;

    let page = state.quotes.list(&scope, &query).await.map_err(fail(&scope.correlation_id))?;
    let Page { data, total, page, limit, .. } = page;
    let data = data
        .into_iter()
        .map(QuoteResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(fail(&scope.correlation_id))?;
    Ok(Json(Page::new(data, total, page, limit)))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<QuoteResponse>> {
    let row = state.quotes.get(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn update_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateQuoteRequest>,
) -> QuoteResult<Json<QuoteResponse>> {
    let valid_until = match body.valid_until.as_deref() {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| {
            ApiError::bad_request("validUntil is not a date", &scope.correlation_id)
        })?),
        None => None,
    };
    let changes = QuoteChanges {
        client_id: body.cliente_id.map(|id| ClientId(id.trim().to_string())),
        valid_until,
        items: body.items.map(|items| items.into_iter().map(QuoteItem::from).collect()),
        terms: body.terms,
        notes: body.notes,
    };

    let row = state
        .quotes
        .update(&scope, &QuoteId(id), changes)
        .await
        .map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn delete_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<StatusCode> {
    state.quotes.remove(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<QuoteResponse>> {
    let row = state.quotes.send(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn approve_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<QuoteResponse>> {
    let row =
        state.quotes.approve(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn reject_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<RejectQuoteRequest>,
) -> QuoteResult<Json<QuoteResponse>> {
    let row = state
        .quotes
        .reject(&scope, &QuoteId(id), &body.reason)
        .await
        .map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn cancel_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<QuoteResponse>> {
    let row =
        state.quotes.cancel(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    respond(row, &scope.correlation_id)
}

pub async fn convert_quote(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<ConversionResponse>> {
    let conversion =
        state.quotes.convert(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    let Json(quote) = respond(conversion.quote, &scope.correlation_id)?;
    Ok(Json(ConversionResponse { quote, invoice: conversion.document }))
}

pub async fn quote_history(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> QuoteResult<Json<Vec<AuditEvent>>> {
    let events =
        state.quotes.history(&scope, &QuoteId(id)).await.map_err(fail(&scope.correlation_id))?;
    Ok(Json(events))
}
