//! ent-lms-client
//!
//! OAuth2 client-credentials client for the LMS REST API.
//!
//! Architectural decisions:
//! - Tokens are JWTs fetched from `<oauth_host>/oauth2/access_token`
//! - Every request checks expiry first and reconnects when the token is stale
//! - Paginated DRF responses are flattened by following `next` until it is null
//! - No retries: a failed request is returned to the caller

use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Endpoint + client credentials. **Credentials redacted in `Debug`.**
#[derive(Clone)]
pub struct LmsApiConfig {
    pub root_url: String,
    pub oauth_host: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for LmsApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmsApiConfig")
            .field("root_url", &self.root_url)
            .field("oauth_host", &self.oauth_host)
            .field("client_id", &"<REDACTED>")
            .field("client_secret", &"<REDACTED>")
            .finish()
    }
}

#[derive(Clone)]
struct AccessToken {
    jwt: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct LmsApiClient {
    config: LmsApiConfig,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl LmsApiClient {
    pub fn new(config: LmsApiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// `<root_url>/api/`
    pub fn api_base_url(&self) -> String {
        format!("{}/api/", self.config.root_url.trim_end_matches('/'))
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url(), path.trim_start_matches('/'))
    }

    fn current_token(&self) -> Option<AccessToken> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Fetch a fresh JWT with the client credentials.
    pub async fn connect(&self) -> Result<()> {
        let url = format!(
            "{}/oauth2/access_token",
            self.config.oauth_host.trim_end_matches('/')
        );
        let resp = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("token_type", "jwt"),
            ])
            .send()
            .await
            .context("lms oauth token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!(
                "lms oauth http error status={}",
                status.as_u16()
            ));
        }
        let body: AccessTokenResponse = resp
            .json()
            .await
            .context("lms oauth token response json decode failed")?;

        let token = AccessToken {
            jwt: body.access_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in),
        };
        debug!(expires_at = %token.expires_at, "lms oauth token acquired");
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(())
    }

    /// `None` until the first successful [`LmsApiClient::connect`].
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.current_token().map(|t| t.expires_at)
    }

    /// A client that never connected counts as expired.
    pub fn token_expired(&self) -> bool {
        self.token_expired_at(Utc::now())
    }

    pub fn token_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.current_token() {
            Some(t) => now > t.expires_at,
            None => true,
        }
    }

    async fn valid_token(&self) -> Result<String> {
        if self.token_expired() {
            self.connect().await?;
        }
        self.current_token()
            .map(|t| t.jwt)
            .ok_or_else(|| anyhow!("lms oauth token missing after connect"))
    }

    /// GET `<api base>/<path>` with `query`; non-2xx is an error.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let jwt = self.valid_token().await?;
        let url = self.endpoint_url(path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, format!("JWT {jwt}"))
            .send()
            .await
            .with_context(|| format!("lms api request failed: {path}"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "lms api http error path={} status={} body={}",
                path,
                status.as_u16(),
                text
            ));
        }
        resp.json()
            .await
            .with_context(|| format!("lms api response json decode failed: {path}"))
    }

    /// Concatenate `results` across pages, re-requesting `path` with each
    /// `next` URL's query string.
    pub async fn traverse_pagination(&self, first_page: Value, path: &str) -> Result<Vec<Value>> {
        let mut results = page_results(&first_page);
        let mut next = next_page(&first_page);
        while let Some(next_url) = next {
            let query = next_query(&next_url)?;
            debug!(path, next = %next_url, "following pagination");
            let page = self.get(path, &query).await?;
            results.extend(page_results(&page));
            next = next_page(&page);
        }
        Ok(results)
    }

    pub async fn get_all(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>> {
        let first = self.get(path, query).await?;
        self.traverse_pagination(first, path).await
    }
}

fn page_results(page: &Value) -> Vec<Value> {
    page.get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn next_page(page: &Value) -> Option<String> {
    page.get("next")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Query pairs of `url`, blank values kept.
fn next_query(url: &str) -> Result<Vec<(String, String)>> {
    let parsed =
        reqwest::Url::parse(url).with_context(|| format!("invalid pagination url: {url}"))?;
    Ok(parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> LmsApiClient {
        LmsApiClient::new(LmsApiConfig {
            root_url: "https://lms.example.com/".to_string(),
            oauth_host: "https://lms.example.com".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        })
    }

    #[test]
    fn api_base_has_single_slash() {
        let c = client();
        assert_eq!(c.api_base_url(), "https://lms.example.com/api/");
        assert_eq!(
            c.endpoint_url("/enterprise/v1/enterprise-customer/"),
            "https://lms.example.com/api/enterprise/v1/enterprise-customer/"
        );
    }

    #[test]
    fn never_connected_client_is_expired() {
        assert!(client().token_expired());
        assert!(client().token_expires_at().is_none());
    }

    #[test]
    fn next_query_keeps_blank_values() {
        let q = next_query("https://lms.example.com/api/x/?page=2&search=&page_size=50").unwrap();
        assert_eq!(
            q,
            vec![
                ("page".to_string(), "2".to_string()),
                ("search".to_string(), String::new()),
                ("page_size".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn null_next_ends_pagination() {
        assert_eq!(next_page(&json!({"next": null, "results": []})), None);
        assert_eq!(page_results(&json!({"next": null})), Vec::<Value>::new());
    }

    #[test]
    fn debug_redacts_credentials() {
        let s = format!("{:?}", client().config);
        assert!(!s.contains("secret\""));
        assert!(s.contains("<REDACTED>"));
    }
}
