use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    connection::schema::{ConnectionEntity, ConnectionStatus},
    user::model::PublicProfile,
};

pub struct NewConnection {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionBody {
    pub friend_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateConnectionStatusBody {
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ConnectionQuery {
    pub status: Option<ConnectionStatus>,
}

/// A connection as seen by one of its parties: `friend` is always the other one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub status: ConnectionStatus,
    pub friend: PublicProfile,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConnectionResponse {
    pub fn new(entity: ConnectionEntity, friend: PublicProfile) -> Self {
        ConnectionResponse {
            id: entity.id,
            user_id: entity.user_id,
            friend_id: entity.friend_id,
            status: entity.status,
            friend,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Pairs every record with the profile of the party other than `viewer`.
///
/// Records whose other party has no profile (deleted account) are dropped and
/// their ids returned in the second slot so the caller can report them.
pub fn friend_perspective(
    entities: Vec<ConnectionEntity>,
    viewer: &Uuid,
    profiles: &HashMap<Uuid, PublicProfile>,
) -> (Vec<ConnectionResponse>, Vec<Uuid>) {
    let mut shaped = Vec::with_capacity(entities.len());
    let mut orphaned = Vec::new();

    for entity in entities {
        match profiles.get(&entity.other_party(viewer)) {
            Some(profile) => shaped.push(ConnectionResponse::new(entity, profile.clone())),
            None => orphaned.push(entity.id),
        }
    }

    (shaped, orphaned)
}
