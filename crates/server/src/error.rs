use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facturador_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::{error, warn};

/// Wire shape of every failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: impl Into<String>) -> Self {
        Self(error.into_interface(correlation_id))
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: correlation_id.into(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let interface = self.0;

        if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = %interface.correlation_id(),
                error_code = interface.error_code(),
                error = %interface.message(),
                "request failed"
            );
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = %interface.correlation_id(),
                error_code = interface.error_code(),
                error = %interface.message(),
                "request rejected"
            );
        }

        let message = if interface.exposes_detail() {
            interface.message().to_string()
        } else {
            interface.user_message().to_string()
        };
        let body = ErrorBody {
            error: interface.error_code(),
            message,
            correlation_id: interface.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use facturador_core::errors::ApplicationError;
    use serde_json::Value;

    use super::ApiError;

    async fn body_of(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn not_found_keeps_detail_and_correlation_id() {
        let (status, body) =
            body_of(ApiError::from_application(ApplicationError::not_found("quote", "q-9"), "req-7"))
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "quote `q-9` not found");
        assert_eq!(body["correlationId"], "req-7");
    }

    #[tokio::test]
    async fn persistence_failures_hide_internal_detail() {
        let (status, body) = body_of(ApiError::from_application(
            ApplicationError::Persistence("database is locked".to_string()),
            "req-8",
        ))
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body["message"].as_str().unwrap_or_default().contains("locked"));
    }
}
