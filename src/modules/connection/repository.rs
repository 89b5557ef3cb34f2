use uuid::Uuid;

use crate::api::error;
use crate::modules::connection::model::NewConnection;
use crate::modules::connection::schema::{ConnectionEntity, ConnectionStatus};

/// Persistence for connections.
///
/// Implementations enforce two atomic contracts: `insert` rejects a second
/// record for the same unordered pair with `SystemError::UniqueViolation`, and
/// `update_status_if_pending` only writes while the stored status is `pending`.
/// Listing methods order by `created_at` descending, ties in insertion order.
#[async_trait::async_trait]
pub trait ConnectionRepository {
    async fn insert(
        &self,
        connection: &NewConnection,
    ) -> Result<ConnectionEntity, error::SystemError>;

    async fn find_by_unordered_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;

    async fn find_by_id(
        &self,
        connection_id: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;

    async fn find_all_for_user(
        &self,
        user_id: &Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError>;

    async fn find_pending_received_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError>;

    async fn update_status_if_pending(
        &self,
        connection_id: &Uuid,
        status: ConnectionStatus,
    ) -> Result<Option<ConnectionEntity>, error::SystemError>;

    async fn delete_by_id(&self, connection_id: &Uuid) -> Result<bool, error::SystemError>;
}
