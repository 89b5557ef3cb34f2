use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Blocked,
}

impl ConnectionStatus {
    /// `accepted` and `blocked` are final; only `pending` may move.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConnectionStatus::Pending)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Pending => write!(f, "pending"),
            ConnectionStatus::Accepted => write!(f, "accepted"),
            ConnectionStatus::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConnectionEntity {
    pub id: Uuid,
    /// requester
    pub user_id: Uuid,
    /// receiver
    pub friend_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ConnectionEntity {
    pub fn involves(&self, user_id: &Uuid) -> bool {
        self.user_id == *user_id || self.friend_id == *user_id
    }

    pub fn is_receiver(&self, user_id: &Uuid) -> bool {
        self.friend_id == *user_id
    }

    /// The party that is not `viewer`. Callers check `involves` first.
    pub fn other_party(&self, viewer: &Uuid) -> Uuid {
        if self.user_id == *viewer {
            self.friend_id
        } else {
            self.user_id
        }
    }
}
