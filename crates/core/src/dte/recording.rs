//! In-process emitter for tests and local tooling. Compiled only for tests or
//! with the `test-support` feature.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::tenant::TenantId;
use crate::dte::emission::{EmissionError, EmittedDocument, InvoiceEmitter};
use crate::dte::payload::DtePayload;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEmission {
    pub tenant_id: TenantId,
    pub tipo_dte: String,
    pub payload: DtePayload,
}

/// Accepts every document and keeps it for inspection, or fails every call
/// when built with [`RecordingInvoiceEmitter::failing`].
#[derive(Clone, Default)]
pub struct RecordingInvoiceEmitter {
    emissions: Arc<Mutex<Vec<RecordedEmission>>>,
    failure: Option<EmissionError>,
}

impl RecordingInvoiceEmitter {
    pub fn failing(error: EmissionError) -> Self {
        Self { emissions: Arc::default(), failure: Some(error) }
    }

    pub fn emissions(&self) -> Vec<RecordedEmission> {
        match self.emissions.lock() {
            Ok(emissions) => emissions.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl InvoiceEmitter for RecordingInvoiceEmitter {
    async fn emit(
        &self,
        tenant_id: &TenantId,
        tipo_dte: &str,
        payload: &DtePayload,
    ) -> Result<EmittedDocument, EmissionError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let record = RecordedEmission {
            tenant_id: tenant_id.clone(),
            tipo_dte: tipo_dte.to_string(),
            payload: payload.clone(),
        };
        let sequence = match self.emissions.lock() {
            Ok(mut emissions) => {
                emissions.push(record);
                emissions.len()
            }
            Err(poisoned) => {
                let mut emissions = poisoned.into_inner();
                emissions.push(record);
                emissions.len()
            }
        };

        Ok(EmittedDocument {
            id: format!("dte-{sequence}"),
            codigo_generacion: uuid::Uuid::new_v4().to_string().to_uppercase(),
            numero_control: format!("DTE-{tipo_dte}-M001P001-{sequence:015}"),
        })
    }
}
