use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        repository::UserRepository,
        schema::UserEntity,
    },
};

const USER_COLUMNS: &str = "id, username, email, hash_password, role, display_name, avatar_url, \
                            deleted_at, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Soft-deleted ids are silently absent from the result.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND deleted_at IS NULL"
        );
        let users = sqlx::query_as::<_, UserEntity>(&sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(username) = lower($1) AND deleted_at IS NULL"
        );
        let user = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (id, username, email, hash_password, display_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hash_password)
        .bind(&user.display_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError> {
        // avatar_url is tri-state: absent keeps it, null clears it
        let sql = format!(
            r#"
            UPDATE users SET
                username     = COALESCE($2, username),
                email        = COALESCE($3, email),
                display_name = COALESCE($4, display_name),
                avatar_url   = CASE WHEN $5::boolean THEN $6 ELSE avatar_url END,
                updated_at   = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.avatar_url.is_some())
            .bind(user.avatar_url.clone().flatten())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i32,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE deleted_at IS NULL
              AND (lower(username) LIKE lower($1) OR lower(display_name) LIKE lower($1))
            ORDER BY display_name, id
            LIMIT $2
            "#
        );
        let users = sqlx::query_as::<_, UserEntity>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
