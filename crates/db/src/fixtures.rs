use chrono::Utc;
use serde::Serialize;

use facturador_core::domain::client::{Client, ClientAddress, ClientId};
use facturador_core::domain::tenant::{Tenant, TenantId, UserId};

use crate::connection::DbPool;
use crate::repositories::{
    ClientRepository, IssuedToken, RepositoryError, SqlClientRepository, SqlTenantRepository,
    SqlTokenRepository, TenantRepository, TokenRepository,
};

pub const DEMO_TENANT_ID: &str = "tenant-demo";
pub const DEMO_USER_ID: &str = "user-demo";

struct DemoClient {
    id: &'static str,
    nombre: &'static str,
    tipo_documento: &'static str,
    num_documento: &'static str,
    nrc: Option<&'static str>,
    cod_actividad: Option<&'static str>,
    desc_actividad: Option<&'static str>,
    departamento: &'static str,
    municipio: &'static str,
    complemento: &'static str,
    correo: Option<&'static str>,
}

const DEMO_CLIENTS: &[DemoClient] = &[
    DemoClient {
        id: "client-demo-roble",
        nombre: "Distribuidora El Roble, S.A. de C.V.",
        tipo_documento: "36",
        num_documento: "06142901901023",
        nrc: Some("2345678"),
        cod_actividad: Some("46900"),
        desc_actividad: Some("Venta al por mayor de otros productos"),
        departamento: "06",
        municipio: "23",
        complemento: "Col. Escalón, Calle El Mirador #4520",
        correo: Some("compras@elroble.example"),
    },
    DemoClient {
        id: "client-demo-ceiba",
        nombre: "Agroservicio La Ceiba",
        tipo_documento: "13",
        num_documento: "012345678",
        nrc: None,
        cod_actividad: None,
        desc_actividad: None,
        departamento: "05",
        municipio: "28",
        complemento: "Santa Tecla, 3a Av. Norte",
        correo: None,
    },
];

/// What `seed` left behind. The token is only present when one was issued.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedResult {
    pub tenant_id: TenantId,
    pub clients_created: usize,
    pub clients_existing: usize,
    pub token: Option<IssuedToken>,
}

/// Seeds a demo tenant with a couple of clients. Safe to run repeatedly;
/// existing clients are left untouched.
pub async fn seed_demo(pool: &DbPool, issue_token: bool) -> Result<SeedResult, RepositoryError> {
    let tenant_id = TenantId(DEMO_TENANT_ID.to_string());
    SqlTenantRepository::new(pool.clone())
        .save(&Tenant {
            id: tenant_id.clone(),
            nombre: "Empresa Demo, S.A. de C.V.".to_string(),
            nit: Some("0614-290190-102-3".to_string()),
            created_at: Utc::now(),
        })
        .await?;

    let clients = SqlClientRepository::new(pool.clone());
    let mut clients_created = 0;
    let mut clients_existing = 0;
    for demo in DEMO_CLIENTS {
        let id = ClientId(demo.id.to_string());
        if clients.find_by_id(&tenant_id, &id).await?.is_some() {
            clients_existing += 1;
            continue;
        }
        let address = ClientAddress {
            departamento: demo.departamento.to_string(),
            municipio: demo.municipio.to_string(),
            complemento: demo.complemento.to_string(),
        };
        clients
            .insert(&Client {
                id,
                tenant_id: tenant_id.clone(),
                nombre: demo.nombre.to_string(),
                tipo_documento: demo.tipo_documento.to_string(),
                num_documento: demo.num_documento.to_string(),
                nrc: demo.nrc.map(ToString::to_string),
                cod_actividad: demo.cod_actividad.map(ToString::to_string),
                desc_actividad: demo.desc_actividad.map(ToString::to_string),
                direccion: address.to_stored(),
                telefono: None,
                correo: demo.correo.map(ToString::to_string),
                created_at: Utc::now(),
            })
            .await?;
        clients_created += 1;
    }

    let token = if issue_token {
        let issued = SqlTokenRepository::new(pool.clone())
            .issue(&UserId(DEMO_USER_ID.to_string()), Some(&tenant_id), Some("demo seed"))
            .await?;
        Some(issued)
    } else {
        None
    };

    tracing::info!(
        tenant_id = %tenant_id,
        clients_created,
        clients_existing,
        token_issued = token.is_some(),
        "demo data seeded"
    );

    Ok(SeedResult { tenant_id, clients_created, clients_existing, token })
}
