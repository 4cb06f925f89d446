use chrono::{DateTime, Utc};
use keystone_schema::{ItemModel, UserModel};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub email: String,
    /// `None` for accounts created through an OAuth login.
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    /// First successful OAuth login into this account.
    pub oauth_linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbItem {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRole {
    pub id: i64,
    pub name: String,
}

/// A user row together with its role names and owned items.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user: DbUser,
    pub roles: Vec<String>,
    pub items: Vec<DbItem>,
}

impl UserRecord {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<DbItem> for ItemModel {
    fn from(item: DbItem) -> Self {
        ItemModel {
            id: item.id,
            name: item.name,
            owner_id: item.owner_id,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl From<UserRecord> for UserModel {
    fn from(record: UserRecord) -> Self {
        UserModel {
            id: record.user.id,
            email: record.user.email,
            roles: record.roles,
            items: record.items.into_iter().map(ItemModel::from).collect(),
            created_at: record.user.created_at,
            updated_at: record.user.updated_at,
        }
    }
}
