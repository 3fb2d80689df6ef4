use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::tenant::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Customer record owned by a tenant. `direccion` keeps whatever text the
/// registry stored; structured addresses are JSON objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub tenant_id: TenantId,
    pub nombre: String,
    pub tipo_documento: String,
    pub num_documento: String,
    pub nrc: Option<String>,
    pub cod_actividad: Option<String>,
    pub desc_actividad: Option<String>,
    pub direccion: String,
    pub telefono: Option<String>,
    pub correo: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAddress {
    #[serde(default)]
    pub departamento: String,
    #[serde(default)]
    pub municipio: String,
    #[serde(default)]
    pub complemento: String,
}

impl ClientAddress {
    /// Reads a stored address, wrapping plain text as the `complemento`.
    pub fn parse_stored(raw: &str) -> Self {
        match serde_json::from_str::<ClientAddress>(raw) {
            Ok(address) => address,
            Err(_) => ClientAddress { complemento: raw.to_string(), ..ClientAddress::default() },
        }
    }

    pub fn to_stored(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.complemento.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: ClientId,
    pub nombre: String,
    pub num_documento: String,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id.clone(),
            nombre: client.nombre.clone(),
            num_documento: client.num_documento.clone(),
        }
    }
}
