use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
    #[error("stored quote items could not be parsed: {0}")]
    MalformedItems(String),
    #[error("a rejection reason is required")]
    MissingRejectionReason,
    #[error("unknown quote status `{0}`")]
    UnknownStatus(String),
    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("user has no tenant assigned")]
    NoTenantAssigned,
    #[error("authentication failed: {0}")]
    Unauthenticated(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: String, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("malformed stored data: {0}")]
    MalformedData(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into(), id: id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("bad gateway: {message}")]
    BadGateway { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Unauthorized { .. } => "A valid bearer token is required.",
            Self::Forbidden { .. } => "The user has no tenant assigned.",
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::Conflict { .. } => "The quote is not in a state that allows this operation.",
            Self::BadGateway { .. } => "The tax document service rejected or failed the request.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::BadGateway { .. } => "bad_gateway",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::BadGateway { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Unauthorized { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::BadGateway { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    /// Internal failures never echo their detail to callers.
    pub fn exposes_detail(&self) -> bool {
        !matches!(self, Self::ServiceUnavailable { .. } | Self::Internal { .. })
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::BadGateway { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        let message = value.to_string();
        match value {
            ApplicationError::Domain(DomainError::FlowTransition(_)) => {
                Self::Conflict { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(_))
            | ApplicationError::Domain(DomainError::MissingRejectionReason)
            | ApplicationError::Domain(DomainError::UnknownStatus(_))
            | ApplicationError::Domain(DomainError::AmountOutOfRange(_))
            | ApplicationError::Validation(_) => Self::BadRequest { message, correlation_id },
            ApplicationError::NoTenantAssigned => Self::Forbidden { message, correlation_id },
            ApplicationError::Unauthenticated(_) => Self::Unauthorized { message, correlation_id },
            ApplicationError::NotFound { .. } => Self::NotFound { message, correlation_id },
            ApplicationError::Integration(_) => Self::BadGateway { message, correlation_id },
            ApplicationError::Persistence(_) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::MalformedItems(_))
            | ApplicationError::MalformedData(_)
            | ApplicationError::Configuration(_) => Self::Internal { message, correlation_id },
        }
    }
}
