use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::auth::CorrelationId;
use crate::error::ApiError;

/// JSON body that has passed its `validator` rules. Malformed JSON and rule
/// violations are both rejected as `bad_request` with the request's
/// correlation id.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId::from_headers(req.headers()).0;

        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            ApiError::bad_request(format!("invalid JSON body: {}", rejection.body_text()), &correlation_id)
        })?;

        value.validate().map_err(|errors| {
            ApiError::bad_request(format!("validation failed: {errors}"), &correlation_id)
        })?;

        Ok(Self(value))
    }
}
