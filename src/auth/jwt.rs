use crate::config::AuthConfig;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access-token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub uid: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HMAC-signed access tokens.
#[derive(Clone)]
pub struct JwtCodec {
    keys: Arc<Keys>,
    algorithm: Algorithm,
    ttl_secs: i64,
}

impl JwtCodec {
    pub fn new(cfg: &AuthConfig) -> Self {
        let secret = cfg.secret_key.as_bytes();
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            algorithm: cfg.algorithm.into(),
            ttl_secs: i64::try_from(cfg.access_token_expire_minutes.saturating_mul(60))
                .unwrap_or(i64::MAX),
        }
    }

    /// Claims for a fresh token issued now.
    pub fn claims_for(&self, uid: i64, email: &str, roles: &[String]) -> Claims {
        let iat = Utc::now().timestamp();
        Claims {
            sub: email.to_string(),
            uid,
            roles: roles.to_vec(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
        }
    }

    pub fn issue(
        &self,
        uid: i64,
        email: &str,
        roles: &[String],
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.encode(&self.claims_for(uid, email, roles))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(
            &Header::new(self.algorithm),
            claims,
            &self.keys.encoding,
        )
    }

    /// Verify signature, algorithm and expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        jsonwebtoken::decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtAlgorithm;

    fn codec(secret: &str, algorithm: JwtAlgorithm) -> JwtCodec {
        JwtCodec::new(&AuthConfig {
            secret_key: secret.to_string(),
            algorithm,
            access_token_expire_minutes: 30,
        })
    }

    #[test]
    fn issued_token_decodes_to_same_claims() {
        let codec = codec("s3cret", JwtAlgorithm::HS256);
        let roles = vec!["admin".to_string(), "user".to_string()];
        let claims = codec.claims_for(7, "a@example.com", &roles);
        let token = codec.encode(&claims).expect("encode");

        let decoded = codec.decode(&token).expect("decode");
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 30 * 60);
        assert!(decoded.has_role("admin"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec("s3cret", JwtAlgorithm::HS384);
        let mut claims = codec.claims_for(1, "a@example.com", &[]);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = codec.encode(&claims).expect("encode");

        assert!(codec.decode(&token).is_err());
    }

    #[test]
    fn wrong_secret_or_algorithm_is_rejected() {
        let issuer = codec("one", JwtAlgorithm::HS256);
        let token = issuer.issue(1, "a@example.com", &[]).expect("issue");

        assert!(codec("two", JwtAlgorithm::HS256).decode(&token).is_err());
        assert!(codec("one", JwtAlgorithm::HS512).decode(&token).is_err());
        assert!(issuer.decode("garbage").is_err());
    }
}
