use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteStatus;
use crate::errors::DomainError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteSortField {
    QuoteNumber,
    IssueDate,
    ValidUntil,
    Total,
    Status,
    #[default]
    CreatedAt,
}

impl QuoteSortField {
    /// Unrecognised names fall back to `createdAt`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("quoteNumber") => Self::QuoteNumber,
            Some("issueDate") => Self::IssueDate,
            Some("validUntil") => Self::ValidUntil,
            Some("total") => Self::Total,
            Some("status") => Self::Status,
            _ => Self::CreatedAt,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Normalised listing parameters; construct with [`QuoteListQuery::from_raw`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteListQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<QuoteStatus>,
    pub search: Option<String>,
    pub sort_by: QuoteSortField,
    pub sort_order: SortOrder,
}

impl Default for QuoteListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_PAGE_SIZE,
            status: None,
            search: None,
            sort_by: QuoteSortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl QuoteListQuery {
    pub fn from_raw(
        page: Option<i64>,
        limit: Option<i64>,
        status: Option<&str>,
        search: Option<&str>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<Self, DomainError> {
        let status = match status.map(str::trim).filter(|value| !value.is_empty()) {
            Some(raw) => Some(raw.parse::<QuoteStatus>()?),
            None => None,
        };

        Ok(Self {
            page: normalize_page(page),
            limit: clamp_limit(limit),
            status,
            search: normalize_search(search),
            sort_by: QuoteSortField::parse_or_default(sort_by),
            sort_order: SortOrder::parse_or_default(sort_order),
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

pub fn normalize_page(page: Option<i64>) -> u32 {
    match page {
        Some(value) if value >= 1 => u32::try_from(value).unwrap_or(u32::MAX),
        _ => DEFAULT_PAGE,
    }
}

pub fn clamp_limit(limit: Option<i64>) -> u32 {
    match limit {
        None => DEFAULT_PAGE_SIZE,
        Some(value) => value.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32,
    }
}

pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search.map(str::trim).filter(|value| !value.is_empty()).map(ToString::to_string)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(u64::from(limit)) as u32 };
        Self { data, total, page, limit, total_pages }
    }
}
