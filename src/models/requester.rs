//! Authenticated identity an export or import runs on behalf of

use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requester {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl Requester {
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            organization_id: Some(organization_id.into()),
        }
    }

    /// Resolve the tenant, failing with `Unauthorized` when either id is
    /// missing or blank.
    pub fn tenant(&self) -> ServiceResult<Tenant> {
        let user_id = non_blank(self.id.as_deref())
            .ok_or_else(|| ServiceError::Unauthorized("User not found".to_string()))?;
        let organization_id = non_blank(self.organization_id.as_deref())
            .ok_or_else(|| ServiceError::Unauthorized("Organization not found".to_string()))?;
        Ok(Tenant {
            user_id: user_id.to_string(),
            organization_id: organization_id.to_string(),
        })
    }
}

/// A requester whose identity has been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub user_id: String,
    pub organization_id: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
