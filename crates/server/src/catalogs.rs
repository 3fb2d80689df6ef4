//! Read-only reference catalogs. No authentication required.
//!
//! - `GET /catalogs/{name}`                               entries of one catalog
//! - `GET /catalogs/departments/{code}/municipalities`    municipalities of a department
//! - `GET /catalogs/economic-activities?search=`          activity search by code or name

use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use facturador_core::catalog::{self, CatalogEntry, CatalogKind, Municipality};
use facturador_core::errors::ApplicationError;
use serde::Deserialize;

use crate::auth::CorrelationId;
use crate::error::ApiError;

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/catalogs/economic-activities", get(economic_activities))
        .route("/catalogs/departments/{code}/municipalities", get(department_municipalities))
        .route("/catalogs/{name}", get(catalog_entries))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActivitySearch {
    pub search: Option<String>,
}

pub async fn catalog_entries(
    correlation_id: CorrelationId,
    Path(name): Path<String>,
) -> Result<Json<&'static [CatalogEntry]>, ApiError> {
    CatalogKind::from_slug(&name)
        .map(|kind| Json(kind.entries()))
        .ok_or_else(|| {
            ApiError::from_application(ApplicationError::not_found("catalog", name), correlation_id.0)
        })
}

pub async fn department_municipalities(
    correlation_id: CorrelationId,
    Path(code): Path<String>,
) -> Result<Json<Vec<&'static Municipality>>, ApiError> {
    if CatalogKind::Departments.find(&code).is_none() {
        return Err(ApiError::from_application(
            ApplicationError::not_found("department", code),
            correlation_id.0,
        ));
    }
    Ok(Json(catalog::municipalities(code.trim())))
}

pub async fn economic_activities(
    Query(params): Query<ActivitySearch>,
) -> Json<Vec<&'static CatalogEntry>> {
    Json(catalog::search_activities(params.search.as_deref().unwrap_or_default()))
}
