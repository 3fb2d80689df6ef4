use sqlx::sqlite::SqliteRow;

use facturador_core::domain::client::{Client, ClientId};
use facturador_core::domain::tenant::TenantId;

use super::{column, like_pattern, parse_timestamp, write_error, ClientRepository, RepositoryError};
use crate::DbPool;

const CLIENT_COLUMNS: &str = "id, tenant_id, nombre, tipo_documento, num_documento, nrc,
     cod_actividad, desc_actividad, direccion, telefono, correo, created_at";

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_client(row: &SqliteRow) -> Result<Client, RepositoryError> {
    Ok(Client {
        id: ClientId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        nombre: column(row, "nombre")?,
        tipo_documento: column(row, "tipo_documento")?,
        num_documento: column(row, "num_documento")?,
        nrc: column(row, "nrc")?,
        cod_actividad: column(row, "cod_actividad")?,
        desc_actividad: column(row, "desc_actividad")?,
        direccion: column(row, "direccion")?,
        telefono: column(row, "telefono")?,
        correo: column(row, "correo")?,
        created_at: parse_timestamp(&column::<String>(row, "created_at")?)?,
    })
}

#[async_trait::async_trait]
impl ClientRepository for SqlClientRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ClientId,
    ) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE id = ? AND tenant_id = ?"
        ))
        .bind(&id.0)
        .bind(&tenant_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_client).transpose()
    }

    async fn insert(&self, client: &Client) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client (id, tenant_id, nombre, nombre_search, tipo_documento,
                                 num_documento, nrc, cod_actividad, desc_actividad, direccion,
                                 telefono, correo, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&client.id.0)
        .bind(&client.tenant_id.0)
        .bind(&client.nombre)
        .bind(client.nombre.to_lowercase())
        .bind(&client.tipo_documento)
        .bind(&client.num_documento)
        .bind(&client.nrc)
        .bind(&client.cod_actividad)
        .bind(&client.desc_actividad)
        .bind(&client.direccion)
        .bind(&client.telefono)
        .bind(&client.correo)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, &format!("client with document {} already exists", client.num_documento))
        })?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Client>, u64), RepositoryError> {
        let pattern = search.map(like_pattern).unwrap_or_else(|| "%".to_string());
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM client
             WHERE tenant_id = ?
               AND (nombre_search LIKE ? ESCAPE '\\' OR LOWER(num_documento) LIKE ? ESCAPE '\\')",
        )
        .bind(&tenant_id.0)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client
             WHERE tenant_id = ?
               AND (nombre_search LIKE ? ESCAPE '\\' OR LOWER(num_documento) LIKE ? ESCAPE '\\')
             ORDER BY nombre ASC, id ASC
             LIMIT ? OFFSET ?"
        ))
        .bind(&tenant_id.0)
        .bind(&pattern)
        .bind(&pattern)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let clients = rows.iter().map(row_to_client).collect::<Result<Vec<_>, _>>()?;
        Ok((clients, u64::try_from(total).unwrap_or(0)))
    }

    async fn delete(&self, tenant_id: &TenantId, id: &ClientId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM client WHERE id = ? AND tenant_id = ?")
            .bind(&id.0)
            .bind(&tenant_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
