use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: Option<String>,
    /// Role names to link. Names without a `roles` row are skipped.
    pub roles: Vec<String>,
}

/// Partial update of a user; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub id: i64,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.hashed_password.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub owner_id: i64,
    pub name: String,
}
