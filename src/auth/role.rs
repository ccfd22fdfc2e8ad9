//! Roles, capability checks and role resolution for new accounts.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::permission::Permission;
use crate::auth::validation::normalize_email;
use crate::domain::RoleId;
use crate::errors::{Error, Result};
use crate::storage::RoleRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub permissions: Permission,
    pub is_default: bool,
}

impl Role {
    pub fn can(&self, required: Permission) -> bool {
        can(Some(self), required)
    }

    pub fn is_administrator(&self) -> bool {
        is_administrator(Some(self))
    }
}

/// Whether `role` holds every bit of `required`. No role means anonymous.
pub fn can(role: Option<&Role>, required: Permission) -> bool {
    let held = role.map_or(Permission::empty(), |r| r.permissions);
    held.contains(required)
}

pub fn is_administrator(role: Option<&Role>) -> bool {
    can(role, Permission::ADMINISTER)
}

/// A role the seeding routine guarantees to exist.
#[derive(Debug, Clone, Copy)]
pub struct RoleDefinition {
    pub name: &'static str,
    pub permissions: Permission,
    pub is_default: bool,
}

pub const DEFAULT_ROLE_NAME: &str = "User";
pub const MODERATOR_ROLE_NAME: &str = "Moderator";
pub const ADMINISTRATOR_ROLE_NAME: &str = "Administrator";

pub const STANDARD_ROLES: [RoleDefinition; 3] = [
    RoleDefinition {
        name: DEFAULT_ROLE_NAME,
        permissions: Permission::BASE_USER,
        is_default: true,
    },
    RoleDefinition {
        name: MODERATOR_ROLE_NAME,
        permissions: Permission::MODERATOR,
        is_default: false,
    },
    RoleDefinition {
        name: ADMINISTRATOR_ROLE_NAME,
        permissions: Permission::ALL,
        is_default: false,
    },
];

/// Create or update the standard roles, matching by name.
///
/// Running it again rewrites masks and default flags of existing roles instead of
/// inserting duplicates, and leaves exactly one default role.
#[instrument(skip(roles))]
pub async fn seed_roles(roles: &dyn RoleRepository) -> Result<Vec<Role>> {
    let mut seeded = Vec::with_capacity(STANDARD_ROLES.len());
    for definition in STANDARD_ROLES {
        let role = roles
            .upsert_role(definition.name, definition.permissions, definition.is_default)
            .await?;
        seeded.push(role);
    }

    let default = STANDARD_ROLES
        .iter()
        .find(|definition| definition.is_default)
        .ok_or_else(|| Error::internal("No default role defined"))?;
    roles.set_default_role(default.name).await?;

    info!(roles = seeded.len(), default_role = default.name, "Roles seeded");
    Ok(seeded)
}

/// Policy choosing the role of an account at creation time.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(&self, email: &str) -> Result<Role>;
}

/// Gives the configured administrator address a role holding `ADMINISTER` and
/// everyone else the default role.
#[derive(Clone)]
pub struct AdminEmailRoleResolver {
    roles: Arc<dyn RoleRepository>,
    admin_email: Option<String>,
}

impl AdminEmailRoleResolver {
    pub fn new(roles: Arc<dyn RoleRepository>, admin_email: Option<&str>) -> Self {
        Self { roles, admin_email: admin_email.map(normalize_email) }
    }
}

#[async_trait]
impl RoleResolver for AdminEmailRoleResolver {
    async fn resolve(&self, email: &str) -> Result<Role> {
        if self.admin_email.as_deref() == Some(normalize_email(email).as_str()) {
            if let Some(role) = self.roles.find_role_with_permissions(Permission::ADMINISTER).await?
            {
                return Ok(role);
            }
        }

        self.roles
            .get_default_role()
            .await?
            .ok_or_else(|| Error::not_found("role", "default"))
    }
}
