use std::time::Duration;

use async_trait::async_trait;
use facturador_core::config::EmissionConfig;
use facturador_core::domain::tenant::TenantId;
use facturador_core::dte::{DtePayload, EmissionError, EmittedDocument, InvoiceEmitter};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MAX_ERROR_DETAIL: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmitRequest<'a> {
    tenant_id: &'a TenantId,
    tipo_dte: &'a str,
    documento: &'a DtePayload,
}

#[derive(Deserialize)]
struct ErrorReply {
    message: Option<String>,
}

/// Sends documents to the invoicing service at `POST {base_url}/dte`.
pub struct HttpInvoiceEmitter {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpInvoiceEmitter {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, EmissionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| EmissionError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/dte", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    /// `None` when no base URL is configured.
    pub fn from_config(config: &EmissionConfig) -> Result<Option<Self>, EmissionError> {
        match config.base_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            Some(base_url) => Self::new(
                base_url,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<ErrorReply>(body)
        .ok()
        .and_then(|reply| reply.message)
        .unwrap_or_else(|| body.trim().to_string());
    detail.chars().take(MAX_ERROR_DETAIL).collect()
}

#[async_trait]
impl InvoiceEmitter for HttpInvoiceEmitter {
    async fn emit(
        &self,
        tenant_id: &TenantId,
        tipo_dte: &str,
        payload: &DtePayload,
    ) -> Result<EmittedDocument, EmissionError> {
        let mut request = self.client.post(&self.endpoint).json(&EmitRequest {
            tenant_id,
            tipo_dte,
            documento: payload,
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            warn!(
                event_name = "dte.emission.transport_failed",
                tenant_id = %tenant_id,
                endpoint = %self.endpoint,
                error = %error,
                "invoice emission request failed"
            );
            EmissionError::Transport(error.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_detail(&body);
            warn!(
                event_name = "dte.emission.rejected",
                tenant_id = %tenant_id,
                status = status.as_u16(),
                error = %message,
                "invoice emission rejected"
            );
            return Err(EmissionError::Rejected { status: status.as_u16(), message });
        }

        let document = response
            .json::<EmittedDocument>()
            .await
            .map_err(|error| EmissionError::InvalidResponse(error.to_string()))?;
        info!(
            event_name = "dte.emission.accepted",
            tenant_id = %tenant_id,
            invoice_id = %document.id,
            codigo_generacion = %document.codigo_generacion,
            "invoice emitted"
        );
        Ok(document)
    }
}
