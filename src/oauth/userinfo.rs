use crate::error::OauthError;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, warn};

/// Fetch the provider's userinfo document with the user's access token.
pub async fn fetch_userinfo(
    http: &reqwest::Client,
    userinfo_url: &url::Url,
    access_token: &str,
) -> Result<Value, OauthError> {
    let resp = http
        .get(userinfo_url.clone())
        .bearer_auth(access_token)
        .header(ACCEPT, "application/json")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), url = %userinfo_url, "userinfo request rejected");
        return Err(OauthError::UpstreamStatus(status));
    }

    let claims = resp.json::<Value>().await?;
    debug!(url = %userinfo_url, "userinfo fetched");
    Ok(claims)
}

/// GitHub keeps private addresses out of `/user`; `/user/emails` lists them.
pub(crate) async fn fetch_github_primary_email(
    http: &reqwest::Client,
    userinfo_url: &url::Url,
    access_token: &str,
) -> Result<Option<String>, OauthError> {
    let mut emails_url = userinfo_url.clone();
    emails_url
        .path_segments_mut()
        .map_err(|()| OauthError::ProviderUrl(userinfo_url.clone()))?
        .pop_if_empty()
        .push("emails");

    let entries = fetch_userinfo(http, &emails_url, access_token).await?;
    let primary = entries
        .as_array()
        .into_iter()
        .flatten()
        .filter(|e| e.get("verified").and_then(Value::as_bool) == Some(true))
        .find(|e| e.get("primary").and_then(Value::as_bool) == Some(true))
        .and_then(|e| e.get("email"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(primary)
}

/// Normalized email from identity claims.
///
/// Returns `None` when the claim is absent, blank, or explicitly unverified.
pub fn extract_email(claims: &Value) -> Option<String> {
    if claims.get("email_verified").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    claims
        .get("email")
        .and_then(Value::as_str)
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let claims = json!({"email": "  Jane.Doe@Example.COM "});
        assert_eq!(extract_email(&claims).as_deref(), Some("jane.doe@example.com"));
    }

    #[test]
    fn missing_blank_or_unverified_email_is_none() {
        assert_eq!(extract_email(&json!({"id": 1})), None);
        assert_eq!(extract_email(&json!({"email": null})), None);
        assert_eq!(extract_email(&json!({"email": "  "})), None);
        assert_eq!(
            extract_email(&json!({"email": "a@b.c", "email_verified": false})),
            None
        );
        assert_eq!(
            extract_email(&json!({"email": "a@b.c", "email_verified": true})).as_deref(),
            Some("a@b.c")
        );
    }
}
