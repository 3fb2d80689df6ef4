//! Tenant-scoped client registry routes.
//!
//! Endpoints (all require `Authorization: Bearer <token>`):
//! - `POST   /clients`         register a client
//! - `GET    /clients`         paginated list, `search` matches name or document
//! - `GET    /clients/{id}`    fetch one client
//! - `DELETE /clients/{id}`    delete a client; existing quotes keep their reference

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use facturador_core::catalog::{self, CatalogKind};
use facturador_core::domain::client::{Client, ClientAddress, ClientId};
use facturador_core::domain::listing::{clamp_limit, normalize_page, normalize_search, Page};
use facturador_core::errors::ApplicationError;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/{id}", get(get_client).delete(delete_client))
}

/// Free text or the structured `{departamento, municipio, complemento}` form.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AddressInput {
    Text(String),
    Structured(ClientAddress),
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 250))]
    pub nombre: String,
    #[validate(length(min = 1))]
    pub tipo_documento: String,
    #[validate(length(min = 1, max = 25))]
    pub num_documento: String,
    pub nrc: Option<String>,
    pub cod_actividad: Option<String>,
    pub desc_actividad: Option<String>,
    pub direccion: AddressInput,
    pub telefono: Option<String>,
    #[validate(email)]
    pub correo: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListClientsParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}

/// Checks catalog codes and normalises the request into a stored client.
fn build_client(
    tenant_id: facturador_core::domain::tenant::TenantId,
    body: CreateClientRequest,
) -> Result<Client, ApplicationError> {
    let tipo_documento = body.tipo_documento.trim().to_string();
    if catalog::find_identity_document(&tipo_documento).is_none() {
        return Err(ApplicationError::Validation(format!(
            "tipoDocumento `{tipo_documento}` is not a known identity document type"
        )));
    }

    let cod_actividad = optional(body.cod_actividad);
    let mut desc_actividad = optional(body.desc_actividad);
    if let Some(code) = cod_actividad.as_deref() {
        let activity = CatalogKind::EconomicActivities.find(code).ok_or_else(|| {
            ApplicationError::Validation(format!("codActividad `{code}` is not a known activity"))
        })?;
        desc_actividad.get_or_insert_with(|| activity.name.to_string());
    }

    let direccion = match body.direccion {
        AddressInput::Text(text) => text.trim().to_string(),
        AddressInput::Structured(address) => {
            if catalog::find_municipality(&address.departamento, &address.municipio).is_none() {
                return Err(ApplicationError::Validation(format!(
                    "municipio `{}` does not belong to departamento `{}`",
                    address.municipio, address.departamento
                )));
            }
            address.to_stored()
        }
    };

    Ok(Client {
        id: ClientId::generate(),
        tenant_id,
        nombre: body.nombre.trim().to_string(),
        tipo_documento,
        num_documento: body.num_documento.trim().to_string(),
        nrc: optional(body.nrc),
        cod_actividad,
        desc_actividad,
        direccion,
        telefono: optional(body.telefono),
        correo: optional(body.correo),
        created_at: Utc::now(),
    })
}

pub async fn create_client(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    ValidatedJson(body): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let fail = |error: ApplicationError| ApiError::from_application(error, &scope.correlation_id);

    let client = build_client(scope.tenant_id.clone(), body).map_err(fail)?;
    state.clients.insert(&client).await.map_err(|error| fail(error.into()))?;

    info!(
        event_name = "client.created",
        correlation_id = %scope.correlation_id,
        tenant_id = %scope.tenant_id,
        client_id = %client.id.0,
        "client registered"
    );
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Query(params): Query<ListClientsParams>,
) -> Result<Json<Page<Client>>, ApiError> {
    let page = normalize_page(params.page);
    let limit = clamp_limit(params.limit);
    let search = normalize_search(params.search.as_deref());

    let (clients, total) = state
        .clients
        .list(&scope.tenant_id, search.as_deref(), page, limit)
        .await
        .map_err(|error| ApiError::from_application(error.into(), &scope.correlation_id))?;
    Ok(Json(Page::new(clients, total, page, limit)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    let fail = |error: ApplicationError| ApiError::from_application(error, &scope.correlation_id);

    state
        .clients
        .find_by_id(&scope.tenant_id, &ClientId(id.clone()))
        .await
        .map_err(|error| fail(error.into()))?
        .map(Json)
        .ok_or_else(|| fail(ApplicationError::not_found("client", id)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Authenticated(scope): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let fail = |error: ApplicationError| ApiError::from_application(error, &scope.correlation_id);

    let deleted = state
        .clients
        .delete(&scope.tenant_id, &ClientId(id.clone()))
        .await
        .map_err(|error| fail(error.into()))?;
    if !deleted {
        return Err(fail(ApplicationError::not_found("client", id)));
    }

    info!(
        event_name = "client.deleted",
        correlation_id = %scope.correlation_id,
        tenant_id = %scope.tenant_id,
        client_id = %id,
        "client deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use facturador_core::domain::client::ClientAddress;
    use facturador_core::domain::tenant::TenantId;
    use facturador_core::errors::ApplicationError;

    use super::{build_client, CreateClientRequest};

    fn request(json: &str) -> CreateClientRequest {
        serde_json::from_str(json).expect("request body")
    }

    fn tenant() -> TenantId {
        TenantId("t-1".to_string())
    }

    #[test]
    fn structured_address_is_checked_against_catalog_and_stored_as_json() {
        let client = build_client(
            tenant(),
            request(
                r#"{"nombre":" Ferretería El Roble ","tipoDocumento":"36","numDocumento":"06140101001011",
                   "direccion":{"departamento":"06","municipio":"20","complemento":"Col. Escalón"}}"#,
            ),
        )
        .expect("client");

        assert_eq!(client.nombre, "Ferretería El Roble");
        let address = ClientAddress::parse_stored(&client.direccion);
        assert_eq!(address.departamento, "06");
        assert_eq!(address.complemento, "Col. Escalón");

        let wrong = build_client(
            tenant(),
            request(
                r#"{"nombre":"X","tipoDocumento":"36","numDocumento":"1",
                   "direccion":{"departamento":"06","municipio":"99","complemento":""}}"#,
            ),
        );
        assert!(matches!(wrong, Err(ApplicationError::Validation(_))));
    }

    #[test]
    fn unknown_document_type_is_rejected() {
        let result = build_client(
            tenant(),
            request(r#"{"nombre":"X","tipoDocumento":"99","numDocumento":"1","direccion":"Centro"}"#),
        );
        assert!(matches!(result, Err(ApplicationError::Validation(ref message)) if message.contains("99")));
    }

    #[test]
    fn plain_text_address_and_blank_optionals() {
        let client = build_client(
            tenant(),
            request(
                r#"{"nombre":"Ana","tipoDocumento":"13","numDocumento":"01234567-8","direccion":"San Miguel",
                   "nrc":"  ","telefono":"2222-0000"}"#,
            ),
        )
        .expect("client");
        assert_eq!(client.direccion, "San Miguel");
        assert_eq!(client.nrc, None);
        assert_eq!(client.telefono.as_deref(), Some("2222-0000"));
    }
}
