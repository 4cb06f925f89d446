use crate::error::OauthError;
use base64::Engine as _;
use serde_json::Value;
use subtle::ConstantTimeEq;

/// Decode a JWT payload into JSON claims without checking the signature.
pub fn decode_jwt_claims(jwt: &str) -> Option<Value> {
    let payload_b64 = jwt.split('.').nth(1)?;

    // Most JWTs are base64url without padding, but some toolchains may include padding.
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(payload_b64))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

/// What a valid ID token must carry for the login being completed.
#[derive(Debug, Clone, Copy)]
pub struct IdTokenExpectations<'a> {
    pub nonce: &'a str,
    pub client_id: &'a str,
    /// Accepted `iss` values. Empty accepts any issuer.
    pub issuers: &'a [String],
    /// Current unix time in seconds.
    pub now: i64,
}

/// Decode an ID token and check `nonce`, `aud`, `iss` and `exp`.
///
/// The token is taken straight from the token endpoint over TLS, so its
/// signature is not re-verified here.
pub fn validate_id_token(id_token: &str, expect: &IdTokenExpectations<'_>) -> Result<Value, OauthError> {
    let claims = decode_jwt_claims(id_token)
        .filter(Value::is_object)
        .ok_or_else(|| invalid("ID token could not be decoded"))?;

    let nonce = claims.get("nonce").and_then(Value::as_str).unwrap_or_default();
    if nonce.is_empty() || !bool::from(nonce.as_bytes().ct_eq(expect.nonce.as_bytes())) {
        return Err(OauthError::flow("NONCE_MISMATCH", "Nonce mismatch"));
    }

    let audience_ok = match claims.get("aud") {
        Some(Value::String(aud)) => aud == expect.client_id,
        Some(Value::Array(auds)) => auds
            .iter()
            .any(|a| a.as_str() == Some(expect.client_id)),
        _ => false,
    };
    if !audience_ok {
        return Err(invalid("ID token audience does not match the client"));
    }

    if !expect.issuers.is_empty() {
        let iss = claims.get("iss").and_then(Value::as_str).unwrap_or_default();
        if !expect.issuers.iter().any(|accepted| accepted == iss) {
            return Err(invalid("ID token issuer is not accepted"));
        }
    }

    match claims.get("exp").and_then(Value::as_i64) {
        Some(exp) if exp > expect.now => {}
        Some(_) => return Err(invalid("ID token has expired")),
        None => return Err(invalid("ID token has no expiry")),
    }

    Ok(claims)
}

fn invalid(message: &str) -> OauthError {
    OauthError::flow("ID_TOKEN_INVALID", message)
}
