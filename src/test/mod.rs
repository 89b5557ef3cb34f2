//! In-memory repositories and env setup for unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, Once,
};

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::{
            model::NewConnection,
            repository::ConnectionRepository,
            schema::{ConnectionEntity, ConnectionStatus},
        },
        user::{
            model::{InsertUser, UpdateUser},
            repository::UserRepository,
            schema::{UserEntity, UserRole},
        },
    },
    ENV,
};

static INIT: Once = Once::new();

/// Seeds the variables `ENV` requires. Call before anything touches `ENV`.
pub fn init_env() {
    INIT.call_once(|| {
        std::env::set_var("SECRET_KEY", "test-secret");
        std::env::set_var("DATABASE_URL", "postgres://localhost/connectr_test");
        std::env::set_var("REDIS_URL", "redis://localhost:6379");
    });
    let _ = ENV.port;
}

/// Rows live in insertion order; the lock makes `insert` and
/// `update_status_if_pending` atomic like the Postgres constraints.
#[derive(Default)]
pub struct MemoryConnectionRepository {
    rows: Mutex<Vec<ConnectionEntity>>,
    hide_pairs: AtomicBool,
    stale_reads: AtomicBool,
}

impl MemoryConnectionRepository {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes `find_by_unordered_pair` miss, as a concurrent create would.
    pub fn hide_pairs(&self, on: bool) {
        self.hide_pairs.store(on, Ordering::SeqCst);
    }

    /// Makes `find_by_id` report every row as still pending.
    pub fn stale_reads(&self, on: bool) {
        self.stale_reads.store(on, Ordering::SeqCst);
    }

    pub fn force_status(&self, id: &Uuid, status: ConnectionStatus) {
        self.with_row(id, |row| row.status = status);
    }

    pub fn set_created_at(&self, id: &Uuid, at: chrono::DateTime<chrono::Utc>) {
        self.with_row(id, |row| row.created_at = at);
    }

    fn with_row(&self, id: &Uuid, f: impl FnOnce(&mut ConnectionEntity)) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == *id) {
            f(row);
        }
    }

    fn sorted(mut rows: Vec<ConnectionEntity>) -> Vec<ConnectionEntity> {
        // stable: equal timestamps keep insertion order
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

fn same_pair(row: &ConnectionEntity, a: &Uuid, b: &Uuid) -> bool {
    (row.user_id == *a && row.friend_id == *b) || (row.user_id == *b && row.friend_id == *a)
}

#[async_trait::async_trait]
impl ConnectionRepository for MemoryConnectionRepository {
    async fn insert(
        &self,
        connection: &NewConnection,
    ) -> Result<ConnectionEntity, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| same_pair(row, &connection.user_id, &connection.friend_id)) {
            return Err(error::SystemError::UniqueViolation(None));
        }

        let now = chrono::Utc::now();
        let entity = ConnectionEntity {
            id: Uuid::now_v7(),
            user_id: connection.user_id,
            friend_id: connection.friend_id,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_unordered_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        if self.hide_pairs.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|row| same_pair(row, user_id_a, user_id_b)).cloned())
    }

    async fn find_by_id(
        &self,
        connection_id: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let rows = self.rows.lock().unwrap();
        let mut found = rows.iter().find(|row| row.id == *connection_id).cloned();
        if self.stale_reads.load(Ordering::SeqCst) {
            if let Some(row) = found.as_mut() {
                row.status = ConnectionStatus::Pending;
            }
        }
        Ok(found)
    }

    async fn find_all_for_user(
        &self,
        user_id: &Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let rows = self.rows.lock().unwrap();
        let matching = rows
            .iter()
            .filter(|row| row.involves(user_id))
            .filter(|row| status.map_or(true, |s| row.status == s))
            .cloned()
            .collect();
        Ok(Self::sorted(matching))
    }

    async fn find_pending_received_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let rows = self.rows.lock().unwrap();
        let matching = rows
            .iter()
            .filter(|row| row.friend_id == *user_id && row.status == ConnectionStatus::Pending)
            .cloned()
            .collect();
        Ok(Self::sorted(matching))
    }

    async fn update_status_if_pending(
        &self,
        connection_id: &Uuid,
        status: ConnectionStatus,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.id == *connection_id && row.status == ConnectionStatus::Pending)
        else {
            return Ok(None);
        };
        row.status = status;
        row.updated_at = chrono::Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_by_id(&self, connection_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != *connection_id);
        Ok(rows.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserEntity>>,
}

impl MemoryUserRepository {
    pub fn add(&self, username: &str) -> Uuid {
        let now = chrono::Utc::now();
        let id = Uuid::now_v7();
        self.users.lock().unwrap().push(UserEntity {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            hash_password: String::new(),
            role: UserRole::default(),
            display_name: username.to_string(),
            avatar_url: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn soft_delete(&self, id: &Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == *id) {
            user.deleted_at = Some(chrono::Utc::now());
        }
    }

    fn active(&self) -> Vec<UserEntity> {
        self.users.lock().unwrap().iter().filter(|u| u.deleted_at.is_none()).cloned().collect()
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.active().into_iter().find(|u| u.id == *id))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        Ok(self.active().into_iter().filter(|u| ids.contains(&u.id)).collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.active().into_iter().find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let id = self.add(&user.username);
        let mut users = self.users.lock().unwrap();
        if let Some(stored) = users.iter_mut().find(|u| u.id == id) {
            stored.email = user.email.clone();
            stored.hash_password = user.hash_password.clone();
            stored.display_name = user.display_name.clone();
        }
        Ok(id)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let stored = users
            .iter_mut()
            .find(|u| u.id == *id && u.deleted_at.is_none())
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if let Some(username) = &user.username {
            stored.username = username.clone();
        }
        if let Some(email) = &user.email {
            stored.email = email.clone();
        }
        if let Some(display_name) = &user.display_name {
            stored.display_name = display_name.clone();
        }
        if let Some(avatar_url) = &user.avatar_url {
            stored.avatar_url = avatar_url.clone();
        }
        Ok(stored.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let existed = self.find_by_id(id).await?.is_some();
        self.soft_delete(id);
        Ok(existed)
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i32,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let query = query.to_lowercase();
        Ok(self
            .active()
            .into_iter()
            .filter(|u| {
                u.username.to_lowercase().contains(&query)
                    || u.display_name.to_lowercase().contains(&query)
            })
            .take(limit.max(0) as usize)
            .collect())
    }
}
