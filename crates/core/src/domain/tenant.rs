use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issuing company. Every quote and client belongs to exactly one tenant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub nombre: String,
    pub nit: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity resolved from a bearer token. Operators and freshly invited users
/// may exist without a tenant; such principals cannot touch tenant data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub tenant_id: Option<TenantId>,
}

/// Everything a tenant-scoped operation needs to know about its caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantScope {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub correlation_id: String,
}

impl TenantScope {
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { tenant_id, user_id, correlation_id: correlation_id.into() }
    }
}

impl Principal {
    /// Narrows the principal to a tenant scope, failing when no tenant is assigned.
    pub fn scope(
        &self,
        correlation_id: impl Into<String>,
    ) -> Result<TenantScope, crate::errors::ApplicationError> {
        let tenant_id =
            self.tenant_id.clone().ok_or(crate::errors::ApplicationError::NoTenantAssigned)?;
        Ok(TenantScope::new(tenant_id, self.user_id.clone(), correlation_id))
    }
}
