use facturador_core::domain::tenant::{Tenant, TenantId};

use super::{column, parse_timestamp, RepositoryError, TenantRepository};
use crate::DbPool;

pub struct SqlTenantRepository {
    pool: DbPool,
}

impl SqlTenantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TenantRepository for SqlTenantRepository {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let row = sqlx::query("SELECT id, nombre, nit, created_at FROM tenant WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Tenant {
            id: TenantId(column(&row, "id")?),
            nombre: column(&row, "nombre")?,
            nit: column(&row, "nit")?,
            created_at: parse_timestamp(&column::<String>(&row, "created_at")?)?,
        }))
    }

    async fn save(&self, tenant: &Tenant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tenant (id, nombre, nit, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET nombre = excluded.nombre, nit = excluded.nit",
        )
        .bind(&tenant.id.0)
        .bind(&tenant.nombre)
        .bind(&tenant.nit)
        .bind(tenant.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
