use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::tenant::TenantId;
use crate::dte::payload::DtePayload;

/// Identifiers assigned by the emission service to an issued document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedDocument {
    pub id: String,
    pub codigo_generacion: String,
    pub numero_control: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmissionError {
    #[error("invoice emission is not configured")]
    NotConfigured,
    #[error("emission transport failed: {0}")]
    Transport(String),
    #[error("emission service rejected the document ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("emission service returned an invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait InvoiceEmitter: Send + Sync {
    async fn emit(
        &self,
        tenant_id: &TenantId,
        tipo_dte: &str,
        payload: &DtePayload,
    ) -> Result<EmittedDocument, EmissionError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredInvoiceEmitter;

#[async_trait]
impl InvoiceEmitter for UnconfiguredInvoiceEmitter {
    async fn emit(
        &self,
        _tenant_id: &TenantId,
        _tipo_dte: &str,
        _payload: &DtePayload,
    ) -> Result<EmittedDocument, EmissionError> {
        Err(EmissionError::NotConfigured)
    }
}
