use uuid::Uuid;

use crate::{
    api::error,
    modules::connection::{
        model::NewConnection,
        repository::ConnectionRepository,
        schema::{ConnectionEntity, ConnectionStatus},
    },
};

#[derive(Clone)]
pub struct ConnectionRepositoryPg {
    pool: sqlx::PgPool,
}

impl ConnectionRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for ConnectionRepositoryPg {
    async fn insert(
        &self,
        connection: &NewConnection,
    ) -> Result<ConnectionEntity, error::SystemError> {
        // the connections_pair unique index turns a lost create race into 23505
        let entity = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            INSERT INTO connections (id, user_id, friend_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(connection.user_id)
        .bind(connection.friend_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_unordered_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let connection = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            SELECT *
            FROM connections
            WHERE
                (user_id = $1 AND friend_id = $2)
            OR (user_id = $2 AND friend_id = $1)
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    async fn find_by_id(
        &self,
        connection_id: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let connection =
            sqlx::query_as::<_, ConnectionEntity>("SELECT * FROM connections WHERE id = $1")
                .bind(connection_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(connection)
    }

    async fn find_all_for_user(
        &self,
        user_id: &Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let connections = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            SELECT *
            FROM connections
            WHERE (user_id = $1 OR friend_id = $1)
              AND ($2::connection_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(connections)
    }

    async fn find_pending_received_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let connections = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            SELECT *
            FROM connections
            WHERE friend_id = $1
              AND status = 'pending'
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(connections)
    }

    async fn update_status_if_pending(
        &self,
        connection_id: &Uuid,
        status: ConnectionStatus,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let connection = sqlx::query_as::<_, ConnectionEntity>(
            r#"
            UPDATE connections
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    async fn delete_by_id(&self, connection_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM connections WHERE id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    async fn insert_user(pool: &PgPool, username: &str) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO users (id, username, email, hash_password, display_name) \
             VALUES ($1, $2, $3, '', $2)",
        )
        .bind(id)
        .bind(username)
        .bind(format!("{username}@example.com"))
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn seeded(pool: PgPool) -> (ConnectionRepositoryPg, Uuid, Uuid, Uuid) {
        let a = insert_user(&pool, "alice").await;
        let b = insert_user(&pool, "bob").await;
        let c = insert_user(&pool, "carol").await;
        (ConnectionRepositoryPg::new(pool), a, b, c)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn pair_index_rejects_the_reverse_direction(pool: PgPool) {
        let (repo, a, b, _) = seeded(pool).await;
        repo.insert(&NewConnection { user_id: a, friend_id: b }).await.unwrap();

        let err = repo.insert(&NewConnection { user_id: b, friend_id: a }).await.unwrap_err();

        assert!(matches!(err, error::SystemError::UniqueViolation(_)), "{err:?}");
        assert!(repo.find_by_unordered_pair(&b, &a).await.unwrap().is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn self_connection_violates_check(pool: PgPool) {
        let (repo, a, _, _) = seeded(pool).await;

        let err = repo.insert(&NewConnection { user_id: a, friend_id: a }).await.unwrap_err();

        assert!(matches!(err, error::SystemError::BadRequest(_)), "{err:?}");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn status_filter_is_optional(pool: PgPool) {
        let (repo, a, b, c) = seeded(pool).await;
        let ab = repo.insert(&NewConnection { user_id: a, friend_id: b }).await.unwrap();
        let ca = repo.insert(&NewConnection { user_id: c, friend_id: a }).await.unwrap();
        repo.update_status_if_pending(&ab.id, ConnectionStatus::Accepted).await.unwrap();

        let all = repo.find_all_for_user(&a, None).await.unwrap();
        let accepted = repo.find_all_for_user(&a, Some(ConnectionStatus::Accepted)).await.unwrap();
        let incoming = repo.find_pending_received_by_user(&a).await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(accepted.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ab.id]);
        assert_eq!(incoming.iter().map(|c| c.id).collect::<Vec<_>>(), vec![ca.id]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn conditional_update_applies_once(pool: PgPool) {
        let (repo, a, b, _) = seeded(pool).await;
        let created = repo.insert(&NewConnection { user_id: a, friend_id: b }).await.unwrap();

        let first = repo.update_status_if_pending(&created.id, ConnectionStatus::Blocked).await;
        let second = repo.update_status_if_pending(&created.id, ConnectionStatus::Accepted).await;

        let updated = first.unwrap().unwrap();
        assert_eq!(updated.status, ConnectionStatus::Blocked);
        assert!(updated.updated_at >= created.updated_at);
        assert!(second.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn delete_reports_whether_a_row_went(pool: PgPool) {
        let (repo, a, b, _) = seeded(pool).await;
        let created = repo.insert(&NewConnection { user_id: a, friend_id: b }).await.unwrap();

        assert!(repo.delete_by_id(&created.id).await.unwrap());
        assert!(!repo.delete_by_id(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
    }
}
