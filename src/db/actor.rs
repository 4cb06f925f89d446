use crate::db::models::{DbItem, DbRole, DbUser, UserRecord};
use crate::db::patch::{NewItem, NewUser, UserPatch};
use crate::db::schema::DEFAULT_ROLE;
use crate::db::{apply_schema, connect};
use crate::error::ApiError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum DbActorMessage {
    /// Insert a user and link its roles; returns the full record.
    CreateUser(NewUser, RpcReplyPort<Result<UserRecord, ApiError>>),

    GetUser(i64, RpcReplyPort<Result<UserRecord, ApiError>>),

    GetUserByEmail(String, RpcReplyPort<Result<UserRecord, ApiError>>),

    ListUsers(RpcReplyPort<Result<Vec<UserRecord>, ApiError>>),

    UpdateUser(UserPatch, RpcReplyPort<Result<UserRecord, ApiError>>),

    DeleteUser(i64, RpcReplyPort<Result<(), ApiError>>),

    /// Find the user by email, or create a password-less one with the default role.
    /// Fails with `AccountExists` when an unlinked account already holds a password.
    UpsertOauthUser(String, RpcReplyPort<Result<UserRecord, ApiError>>),

    CreateItem(NewItem, RpcReplyPort<Result<DbItem, ApiError>>),

    GetItem(i64, RpcReplyPort<Result<DbItem, ApiError>>),

    /// List items, optionally restricted to one owner.
    ListItems(Option<i64>, RpcReplyPort<Result<Vec<DbItem>, ApiError>>),

    UpdateItem(i64, String, RpcReplyPort<Result<DbItem, ApiError>>),

    DeleteItem(i64, RpcReplyPort<Result<(), ApiError>>),

    CreateRole(String, RpcReplyPort<Result<DbRole, ApiError>>),

    ListRoles(RpcReplyPort<Result<Vec<DbRole>, ApiError>>),

    /// Link a role to a user (idempotent).
    AssignRole(i64, String, RpcReplyPort<Result<UserRecord, ApiError>>),

    RevokeRole(i64, String, RpcReplyPort<Result<UserRecord, ApiError>>),
}

#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

macro_rules! rpc {
    ($self:ident, $variant:ident $(, $arg:expr)*) => {
        ractor::call!($self.actor, DbActorMessage::$variant $(, $arg)*).map_err(|e| {
            ApiError::RactorError(format!(
                concat!("DbActor ", stringify!($variant), " RPC failed: {}"),
                e
            ))
        })?
    };
}

impl DbActorHandle {
    pub async fn create_user(&self, user: NewUser) -> Result<UserRecord, ApiError> {
        rpc!(self, CreateUser, user)
    }

    pub async fn get_user(&self, id: i64) -> Result<UserRecord, ApiError> {
        rpc!(self, GetUser, id)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, ApiError> {
        rpc!(self, GetUserByEmail, email.to_string())
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
        rpc!(self, ListUsers)
    }

    pub async fn update_user(&self, patch: UserPatch) -> Result<UserRecord, ApiError> {
        rpc!(self, UpdateUser, patch)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        rpc!(self, DeleteUser, id)
    }

    pub async fn upsert_oauth_user(&self, email: &str) -> Result<UserRecord, ApiError> {
        rpc!(self, UpsertOauthUser, email.to_string())
    }

    pub async fn create_item(&self, item: NewItem) -> Result<DbItem, ApiError> {
        rpc!(self, CreateItem, item)
    }

    pub async fn get_item(&self, id: i64) -> Result<DbItem, ApiError> {
        rpc!(self, GetItem, id)
    }

    pub async fn list_items(&self, owner_id: Option<i64>) -> Result<Vec<DbItem>, ApiError> {
        rpc!(self, ListItems, owner_id)
    }

    pub async fn update_item(&self, id: i64, name: &str) -> Result<DbItem, ApiError> {
        rpc!(self, UpdateItem, id, name.to_string())
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
        rpc!(self, DeleteItem, id)
    }

    pub async fn create_role(&self, name: &str) -> Result<DbRole, ApiError> {
        rpc!(self, CreateRole, name.to_string())
    }

    pub async fn list_roles(&self) -> Result<Vec<DbRole>, ApiError> {
        rpc!(self, ListRoles)
    }

    pub async fn assign_role(&self, user_id: i64, role: &str) -> Result<UserRecord, ApiError> {
        rpc!(self, AssignRole, user_id, role.to_string())
    }

    pub async fn revoke_role(&self, user_id: i64, role: &str) -> Result<UserRecord, ApiError> {
        rpc!(self, RevokeRole, user_id, role.to_string())
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let pool = connect(database_url.as_str())
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let pool = &state.pool;
        match message {
            DbActorMessage::CreateUser(user, reply) => {
                let _ = reply.send(self.create_user(pool, user).await);
            }
            DbActorMessage::GetUser(id, reply) => {
                let _ = reply.send(self.get_user(pool, id).await);
            }
            DbActorMessage::GetUserByEmail(email, reply) => {
                let _ = reply.send(self.get_user_by_email(pool, &email).await);
            }
            DbActorMessage::ListUsers(reply) => {
                let _ = reply.send(self.list_users(pool).await);
            }
            DbActorMessage::UpdateUser(patch, reply) => {
                let _ = reply.send(self.update_user(pool, patch).await);
            }
            DbActorMessage::DeleteUser(id, reply) => {
                let _ = reply.send(self.delete_user(pool, id).await);
            }
            DbActorMessage::UpsertOauthUser(email, reply) => {
                let _ = reply.send(self.upsert_oauth_user(pool, email).await);
            }
            DbActorMessage::CreateItem(item, reply) => {
                let _ = reply.send(self.create_item(pool, item).await);
            }
            DbActorMessage::GetItem(id, reply) => {
                let _ = reply.send(self.get_item(pool, id).await);
            }
            DbActorMessage::ListItems(owner_id, reply) => {
                let _ = reply.send(self.list_items(pool, owner_id).await);
            }
            DbActorMessage::UpdateItem(id, name, reply) => {
                let _ = reply.send(self.update_item(pool, id, name).await);
            }
            DbActorMessage::DeleteItem(id, reply) => {
                let _ = reply.send(self.delete_item(pool, id).await);
            }
            DbActorMessage::CreateRole(name, reply) => {
                let _ = reply.send(self.create_role(pool, name).await);
            }
            DbActorMessage::ListRoles(reply) => {
                let _ = reply.send(self.list_roles(pool).await);
            }
            DbActorMessage::AssignRole(user_id, role, reply) => {
                let _ = reply.send(self.assign_role(pool, user_id, &role).await);
            }
            DbActorMessage::RevokeRole(user_id, role, reply) => {
                let _ = reply.send(self.revoke_role(pool, user_id, &role).await);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn create_user(&self, pool: &SqlitePool, user: NewUser) -> Result<UserRecord, ApiError> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO users (email, hashed_password, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
        )
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for role in &user.roles {
            link_role(&mut tx, id, role).await?;
        }

        tx.commit().await?;
        debug!(user_id = id, "user created");
        self.get_user(pool, id).await
    }

    async fn get_user(&self, pool: &SqlitePool, id: i64) -> Result<UserRecord, ApiError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, email, hashed_password, oauth_linked_at, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        load_record(pool, user).await
    }

    async fn get_user_by_email(
        &self,
        pool: &SqlitePool,
        email: &str,
    ) -> Result<UserRecord, ApiError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, email, hashed_password, oauth_linked_at, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
        )
        .bind(email)
        .fetch_one(pool)
        .await?;

        load_record(pool, user).await
    }

    async fn list_users(&self, pool: &SqlitePool) -> Result<Vec<UserRecord>, ApiError> {
        let users = sqlx::query_as::<_, DbUser>(
            r#"
        SELECT id, email, hashed_password, oauth_linked_at, created_at, updated_at
        FROM users
        ORDER BY id
        "#,
        )
        .fetch_all(pool)
        .await?;

        let mut records = Vec::with_capacity(users.len());
        for user in users {
            records.push(load_record(pool, user).await?);
        }
        Ok(records)
    }

    async fn update_user(&self, pool: &SqlitePool, patch: UserPatch) -> Result<UserRecord, ApiError> {
        if patch.is_empty() {
            return self.get_user(pool, patch.id).await;
        }

        let result = sqlx::query(
            r#"
        UPDATE users SET
            email = COALESCE(?, email),
            hashed_password = COALESCE(?, hashed_password),
            updated_at = ?
        WHERE id = ?
        "#,
        )
        .bind(patch.email)
        .bind(patch.hashed_password)
        .bind(Utc::now())
        .bind(patch.id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        self.get_user(pool, patch.id).await
    }

    async fn delete_user(&self, pool: &SqlitePool, id: i64) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        debug!(user_id = id, "user deleted");
        Ok(())
    }

    async fn upsert_oauth_user(&self, pool: &SqlitePool, email: String) -> Result<UserRecord, ApiError> {
        let record = match self.get_user_by_email(pool, &email).await {
            Ok(record) if record.user.oauth_linked_at.is_some() => return Ok(record),
            // Whoever registered the password never proved they own the address.
            Ok(record) if record.user.hashed_password.is_some() => {
                warn!(user_id = record.user.id, "refusing OAuth link to a password account");
                return Err(ApiError::AccountExists);
            }
            Ok(record) => record,
            Err(ApiError::DatabaseError(sqlx::Error::RowNotFound)) => {
                info!(email = %email, "creating account for first OAuth login");
                self.create_user(
                    pool,
                    NewUser {
                        email,
                        hashed_password: None,
                        roles: vec![DEFAULT_ROLE.to_string()],
                    },
                )
                .await?
            }
            Err(e) => return Err(e),
        };

        sqlx::query("UPDATE users SET oauth_linked_at = ? WHERE id = ? AND oauth_linked_at IS NULL")
            .bind(Utc::now())
            .bind(record.user.id)
            .execute(pool)
            .await?;
        self.get_user(pool, record.user.id).await
    }

    async fn create_item(&self, pool: &SqlitePool, item: NewItem) -> Result<DbItem, ApiError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DbItem>(
            r#"
        INSERT INTO items (name, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, owner_id, created_at, updated_at
        "#,
        )
        .bind(item.name)
        .bind(item.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn get_item(&self, pool: &SqlitePool, id: i64) -> Result<DbItem, ApiError> {
        let row = sqlx::query_as::<_, DbItem>(
            r#"
        SELECT id, name, owner_id, created_at, updated_at
        FROM items
        WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn list_items(
        &self,
        pool: &SqlitePool,
        owner_id: Option<i64>,
    ) -> Result<Vec<DbItem>, ApiError> {
        let rows = sqlx::query_as::<_, DbItem>(
            r#"
        SELECT id, name, owner_id, created_at, updated_at
        FROM items
        WHERE ? IS NULL OR owner_id = ?
        ORDER BY id
        "#,
        )
        .bind(owner_id)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn update_item(&self, pool: &SqlitePool, id: i64, name: String) -> Result<DbItem, ApiError> {
        let row = sqlx::query_as::<_, DbItem>(
            r#"
        UPDATE items SET name = ?, updated_at = ?
        WHERE id = ?
        RETURNING id, name, owner_id, created_at, updated_at
        "#,
        )
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn delete_item(&self, pool: &SqlitePool, id: i64) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }
        Ok(())
    }

    async fn create_role(&self, pool: &SqlitePool, name: String) -> Result<DbRole, ApiError> {
        let row = sqlx::query_as::<_, DbRole>(
            r#"
        INSERT INTO roles (name) VALUES (?)
        RETURNING id, name
        "#,
        )
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(row)
    }

    async fn list_roles(&self, pool: &SqlitePool) -> Result<Vec<DbRole>, ApiError> {
        let rows = sqlx::query_as::<_, DbRole>("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(pool)
            .await?;

        Ok(rows)
    }

    async fn assign_role(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        role: &str,
    ) -> Result<UserRecord, ApiError> {
        let user = self.get_user(pool, user_id).await?;
        let role_id = role_id(pool, role)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Unknown role: {role}")))?;

        sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user.user.id)
            .bind(role_id)
            .execute(pool)
            .await?;

        self.get_user(pool, user_id).await
    }

    async fn revoke_role(
        &self,
        pool: &SqlitePool,
        user_id: i64,
        role: &str,
    ) -> Result<UserRecord, ApiError> {
        let user = self.get_user(pool, user_id).await?;
        let role_id = role_id(pool, role)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Unknown role: {role}")))?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
            .bind(user.user.id)
            .bind(role_id)
            .execute(pool)
            .await?;

        self.get_user(pool, user_id).await
    }
}

async fn role_id(pool: &SqlitePool, name: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
}

async fn link_role(conn: &mut SqliteConnection, user_id: i64, role: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
    INSERT OR IGNORE INTO user_roles (user_id, role_id)
    SELECT ?, id FROM roles WHERE name = ?
    "#,
    )
    .bind(user_id)
    .bind(role)
    .execute(conn)
    .await?;
    Ok(())
}

async fn load_record(pool: &SqlitePool, user: DbUser) -> Result<UserRecord, ApiError> {
    let roles: Vec<String> = sqlx::query_scalar(
        r#"
    SELECT r.name
    FROM roles r
    JOIN user_roles ur ON ur.role_id = r.id
    WHERE ur.user_id = ?
    ORDER BY r.name
    "#,
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    let items = sqlx::query_as::<_, DbItem>(
        r#"
    SELECT id, name, owner_id, created_at, updated_at
    FROM items
    WHERE owner_id = ?
    ORDER BY id
    "#,
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?;

    Ok(UserRecord { user, roles, items })
}

/// Spawn the database actor and return a cloneable handle.
///
/// The actor is unnamed, so several databases may be open in one process.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, ApiError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| ApiError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}
