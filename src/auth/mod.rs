//! Token-based authentication: password hashing and access-token issuance.
//!
//! Request guards built on top of these live in `server::guards`.

mod jwt;
mod password;

pub use jwt::{Claims, JwtCodec};
pub use password::{hash_password, verify_password};
