//! Third-party login through the OAuth2 authorization-code flow.
//!
//! - `client.rs`: oauth2 client type aliases and construction
//! - `provider.rs`: supported providers and the two halves of the flow
//! - `id_token.rs`: OpenID Connect ID-token claim checks
//! - `userinfo.rs`: identity lookup for providers without ID tokens

mod client;
mod id_token;
mod provider;
mod userinfo;

pub use client::{CustomTokenFields, OauthTokenResponse, StandardOauth2Client, build_oauth2_client};
pub use id_token::{IdTokenExpectations, decode_jwt_claims, validate_id_token};
pub use provider::{AuthorizationRequest, Provider, UnknownProvider};
pub use userinfo::{extract_email, fetch_userinfo};
