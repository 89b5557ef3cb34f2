use std::{collections::HashMap, sync::Arc};

use log::{info, warn};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        connection::{
            model::{friend_perspective, ConnectionResponse, NewConnection},
            repository::ConnectionRepository,
            schema::{ConnectionEntity, ConnectionStatus},
        },
        user::{model::PublicProfile, repository::UserRepository},
    },
};

pub struct ConnectionService<R, U>
where
    R: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    connection_repo: Arc<R>,
    user_repo: Arc<U>,
}

// derive(Clone) would demand R: Clone and U: Clone
impl<R, U> Clone for ConnectionService<R, U>
where
    R: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        ConnectionService {
            connection_repo: Arc::clone(&self.connection_repo),
            user_repo: Arc::clone(&self.user_repo),
        }
    }
}

impl<R, U> ConnectionService<R, U>
where
    R: ConnectionRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(connection_repo: Arc<R>, user_repo: Arc<U>) -> Self {
        ConnectionService { connection_repo, user_repo }
    }

    pub async fn create(
        &self,
        requester_id: Uuid,
        target_id: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        if requester_id == target_id {
            return Err(error::SystemError::bad_request("Cannot connect with yourself"));
        }

        if self.user_repo.find_by_id(&requester_id).await?.is_none() {
            // token outlived the account
            return Err(error::SystemError::unauthorized("Account no longer exists"));
        }

        let target = self
            .user_repo
            .find_by_id(&target_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Target user not found"))?;

        if self.connection_repo.find_by_unordered_pair(&requester_id, &target_id).await?.is_some()
        {
            return Err(error::SystemError::conflict("Connection already exists"));
        }

        let new_connection = NewConnection { user_id: requester_id, friend_id: target_id };
        let connection = match self.connection_repo.insert(&new_connection).await {
            Ok(connection) => connection,
            Err(error::SystemError::UniqueViolation(_)) => {
                return Err(error::SystemError::conflict("Connection already exists"));
            }
            // target removed between the lookup and the insert
            Err(error::SystemError::NotFound(_)) => {
                return Err(error::SystemError::not_found("Target user not found"));
            }
            Err(e) => return Err(e),
        };

        info!("Connection {} requested by {} to {}", connection.id, requester_id, target_id);
        Ok(ConnectionResponse::new(connection, PublicProfile::from(target)))
    }

    pub async fn list(
        &self,
        caller_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ConnectionResponse>, error::SystemError> {
        let connections = self.connection_repo.find_all_for_user(&caller_id, status).await?;
        self.shape_many(connections, &caller_id).await
    }

    pub async fn get_friends(
        &self,
        caller_id: Uuid,
    ) -> Result<Vec<ConnectionResponse>, error::SystemError> {
        self.list(caller_id, Some(ConnectionStatus::Accepted)).await
    }

    /// Incoming requests awaiting the caller's decision. Outgoing ones are
    /// listed through `list(caller, Some(Pending))`.
    pub async fn get_pending(
        &self,
        caller_id: Uuid,
    ) -> Result<Vec<ConnectionResponse>, error::SystemError> {
        let connections = self.connection_repo.find_pending_received_by_user(&caller_id).await?;
        self.shape_many(connections, &caller_id).await
    }

    pub async fn get_by_id(
        &self,
        connection_id: Uuid,
        caller_id: Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        let connection = self.find_for_party(&connection_id, &caller_id).await?;
        self.shape_one(connection, &caller_id).await
    }

    pub async fn update_status(
        &self,
        connection_id: Uuid,
        caller_id: Uuid,
        status: ConnectionStatus,
    ) -> Result<ConnectionResponse, error::SystemError> {
        if !status.is_terminal() {
            return Err(error::SystemError::bad_request(
                "Status must be either accepted or blocked",
            ));
        }

        let connection = self
            .connection_repo
            .find_by_id(&connection_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Connection not found"))?;

        if !connection.is_receiver(&caller_id) {
            return Err(error::SystemError::forbidden(
                "Only the receiver can update connection status",
            ));
        }

        if connection.status.is_terminal() {
            return Err(error::SystemError::conflict("Connection status cannot be changed"));
        }

        // resolved before the write so a missing requester leaves the row untouched
        let requester = self
            .user_repo
            .find_by_id(&connection.user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        // None here means another request moved it out of pending first
        let updated = self
            .connection_repo
            .update_status_if_pending(&connection_id, status)
            .await?
            .ok_or_else(|| error::SystemError::conflict("Connection status cannot be changed"))?;

        info!("Connection {} {} by {}", connection_id, status, caller_id);
        Ok(ConnectionResponse::new(updated, PublicProfile::from(requester)))
    }

    pub async fn remove(
        &self,
        connection_id: Uuid,
        caller_id: Uuid,
    ) -> Result<(), error::SystemError> {
        self.find_for_party(&connection_id, &caller_id).await?;

        if !self.connection_repo.delete_by_id(&connection_id).await? {
            return Err(error::SystemError::not_found("Connection not found"));
        }

        info!("Connection {} removed by {}", connection_id, caller_id);
        Ok(())
    }

    async fn find_for_party(
        &self,
        connection_id: &Uuid,
        caller_id: &Uuid,
    ) -> Result<ConnectionEntity, error::SystemError> {
        let connection = self
            .connection_repo
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Connection not found"))?;

        if !connection.involves(caller_id) {
            return Err(error::SystemError::forbidden(
                "You are not a party to this connection",
            ));
        }

        Ok(connection)
    }

    async fn shape_one(
        &self,
        connection: ConnectionEntity,
        viewer: &Uuid,
    ) -> Result<ConnectionResponse, error::SystemError> {
        let friend = self
            .user_repo
            .find_by_id(&connection.other_party(viewer))
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(ConnectionResponse::new(connection, PublicProfile::from(friend)))
    }

    async fn shape_many(
        &self,
        connections: Vec<ConnectionEntity>,
        viewer: &Uuid,
    ) -> Result<Vec<ConnectionResponse>, error::SystemError> {
        if connections.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<Uuid> = connections.iter().map(|c| c.other_party(viewer)).collect();
        ids.sort_unstable();
        ids.dedup();

        let profiles: HashMap<Uuid, PublicProfile> = self
            .user_repo
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, PublicProfile::from(user)))
            .collect();

        let (shaped, orphaned) = friend_perspective(connections, viewer, &profiles);
        if !orphaned.is_empty() {
            warn!("Skipping connections without a resolvable friend: {:?}", orphaned);
        }

        Ok(shaped)
    }
}
