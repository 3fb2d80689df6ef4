//! Bearer-token authentication and correlation ids.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use facturador_core::domain::tenant::TenantScope;
use facturador_core::errors::ApplicationError;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id for the request: the `x-request-id` header when present,
/// otherwise a fresh UUID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    fn from_parts(parts: &Parts) -> Self {
        Self::from_headers(&parts.headers)
    }

    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self(id)
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Caller resolved from `Authorization: Bearer <token>` and narrowed to its
/// tenant. Tokens without a tenant are refused before any handler runs.
#[derive(Clone, Debug)]
pub struct Authenticated(pub TenantScope);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId::from_parts(parts).0;

        let Some(token) = bearer_token(parts) else {
            return Err(ApiError::from_application(
                ApplicationError::Unauthenticated("missing bearer token".to_string()),
                correlation_id,
            ));
        };

        let principal = state
            .tokens
            .resolve(token)
            .await
            .map_err(|error| ApiError::from_application(error.into(), correlation_id.clone()))?
            .ok_or_else(|| {
                ApiError::from_application(
                    ApplicationError::Unauthenticated("unknown or revoked token".to_string()),
                    correlation_id.clone(),
                )
            })?;

        let scope = principal
            .scope(correlation_id.clone())
            .map_err(|error| ApiError::from_application(error, correlation_id.clone()))?;

        tracing::Span::current().record("tenant_id", tracing::field::display(&scope.tenant_id));
        Ok(Self(scope))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::{bearer_token, CorrelationId};

    fn parts(header: Option<&str>) -> axum::http::request::Parts {
        let mut builder = Request::builder().uri("/quotes");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        builder.body(()).expect("request").into_parts().0
    }

    #[test]
    fn bearer_scheme_is_case_insensitive_and_trimmed() {
        assert_eq!(bearer_token(&parts(Some("Bearer fct_abc"))), Some("fct_abc"));
        assert_eq!(bearer_token(&parts(Some("bearer   fct_abc  "))), Some("fct_abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn correlation_id_prefers_request_header() {
        let request = Request::builder()
            .uri("/quotes")
            .header("x-request-id", "req-42")
            .body(())
            .expect("request");
        let (parts, _) = request.into_parts();
        assert_eq!(CorrelationId::from_parts(&parts).0, "req-42");

        let generated = CorrelationId::from_parts(&self::parts(None)).0;
        assert_eq!(generated.len(), 36);
    }
}
