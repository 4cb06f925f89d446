//! Wire types shared by the keystone HTTP API and its clients.

pub mod auth;
pub mod item;
pub mod message;
pub mod user;

pub use auth::{LoginRequest, OauthLoginResponse, SessionInfo, TokenResponse};
pub use item::{ItemCreate, ItemModel, ItemUpdate};
pub use message::MessageResponse;
pub use user::{RoleAssign, UserCreate, UserModel, UserUpdate};
