//! Role repository
//!
//! Roles are matched by their unique name; `upsert_role` is what makes seeding
//! idempotent.

use crate::auth::permission::Permission;
use crate::auth::role::Role;
use crate::domain::RoleId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct RoleRow {
    pub id: i64,
    pub name: String,
    pub permissions: i64,
    pub is_default: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: RoleId::new(row.id),
            name: row.name,
            permissions: Permission::from_bits(row.permissions as u32),
            is_default: row.is_default,
        }
    }
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;

    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// The role new accounts receive.
    async fn get_default_role(&self) -> Result<Option<Role>>;

    /// Lowest-id role whose mask contains every bit of `required`.
    async fn find_role_with_permissions(&self, required: Permission) -> Result<Option<Role>>;

    /// Insert a role or update the mask and default flag of the one with this name.
    async fn upsert_role(&self, name: &str, permissions: Permission, is_default: bool)
        -> Result<Role>;

    /// Make `name` the only default role.
    async fn set_default_role(&self, name: &str) -> Result<()>;

    async fn list_roles(&self) -> Result<Vec<Role>>;
}

#[derive(Debug, Clone)]
pub struct SqlxRoleRepository {
    pool: DbPool,
}

impl SqlxRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const ROLE_COLUMNS: &str = "id, name, permissions, is_default";

#[async_trait]
impl RoleRepository for SqlxRoleRepository {
    #[instrument(skip(self), fields(role_id = %id), name = "db_get_role")]
    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {} FROM roles WHERE id = $1",
            ROLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch role"))?;

        Ok(row.map(Role::from))
    }

    #[instrument(skip(self), name = "db_get_role_by_name")]
    async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {} FROM roles WHERE name = $1",
            ROLE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch role by name"))?;

        Ok(row.map(Role::from))
    }

    #[instrument(skip(self), name = "db_get_default_role")]
    async fn get_default_role(&self) -> Result<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {} FROM roles WHERE is_default = 1 ORDER BY id LIMIT 1",
            ROLE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch default role"))?;

        Ok(row.map(Role::from))
    }

    #[instrument(skip(self), fields(required = %required), name = "db_find_role_with_permissions")]
    async fn find_role_with_permissions(&self, required: Permission) -> Result<Option<Role>> {
        let bits = i64::from(required.bits());
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {} FROM roles WHERE (permissions & $1) = $1 ORDER BY id LIMIT 1",
            ROLE_COLUMNS
        ))
        .bind(bits)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to find role by permissions"))?;

        Ok(row.map(Role::from))
    }

    #[instrument(skip(self), fields(permissions = %permissions), name = "db_upsert_role")]
    async fn upsert_role(
        &self,
        name: &str,
        permissions: Permission,
        is_default: bool,
    ) -> Result<Role> {
        sqlx::query(
            r#"
            INSERT INTO roles (name, permissions, is_default)
            VALUES ($1, $2, $3)
            ON CONFLICT(name) DO UPDATE SET
                permissions = excluded.permissions,
                is_default = excluded.is_default
            "#,
        )
        .bind(name)
        .bind(i64::from(permissions.bits()))
        .bind(is_default)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, format!("Failed to upsert role '{}'", name)))?;

        self.get_role_by_name(name)
            .await?
            .ok_or_else(|| Error::internal(format!("Role '{}' not found after upsert", name)))
    }

    #[instrument(skip(self), name = "db_set_default_role")]
    async fn set_default_role(&self, name: &str) -> Result<()> {
        if self.get_role_by_name(name).await?.is_none() {
            return Err(Error::not_found("role", name));
        }

        sqlx::query("UPDATE roles SET is_default = (name = $1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to update default role"))?;

        Ok(())
    }

    #[instrument(skip(self), name = "db_list_roles")]
    async fn list_roles(&self) -> Result<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {} FROM roles ORDER BY id",
            ROLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to list roles"))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }
}
