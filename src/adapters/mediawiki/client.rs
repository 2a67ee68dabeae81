//! MediaWiki Action API adapter.
//!
//! Uses the legacy bot login flow (login token, then name and password) and
//! a CSRF token per edit. The reqwest cookie store carries the session, so
//! login runs once per client and only when a call actually needs it.

use crate::domain::DomainError;
use crate::ports::WikiTarget;
use crate::shared::{RetryPolicy, retry};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct MediaWikiClient {
    client: reqwest::Client,
    api_url: String,
    username: String,
    password: String,
    logged_in: Mutex<bool>,
    retry_policy: RetryPolicy,
}

impl MediaWikiClient {
    pub fn new(base_url: &str, username: String, password: String) -> Result<Self, DomainError> {
        // Without the cookie store every request after login would be
        // anonymous again.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .cookie_store(true)
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: format!("{}/api.php", base_url.trim_end_matches('/')),
            username,
            password,
            logged_in: Mutex::new(false),
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Logs in on first use. The lock is held across the whole flow so
    /// concurrent callers cannot race a second login.
    async fn ensure_logged_in(&self) -> Result<(), DomainError> {
        let mut logged_in = self.logged_in.lock().await;
        if *logged_in {
            return Ok(());
        }

        info!(username = %self.username, "logging into MediaWiki");
        let token = retry(&self.retry_policy, "fetch login token", || {
            self.fetch_login_token()
        })
        .await?;

        let response = self
            .client
            .post(&self.api_url)
            .form(&[
                ("action", "login"),
                ("lgname", self.username.as_str()),
                ("lgpassword", self.password.as_str()),
                ("lgtoken", token.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::Target(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Target(format!("Failed to parse login response: {}", e)))?;

        match body.login.result.as_str() {
            "Success" => {
                *logged_in = true;
                info!("MediaWiki login succeeded");
                Ok(())
            }
            "Failed" => {
                let reason = body
                    .login
                    .reason
                    .unwrap_or_else(|| "Unknown login failure".to_string());
                Err(DomainError::Auth(format!("MediaWiki login failed: {}", reason)))
            }
            other => Err(DomainError::Auth(format!(
                "Unexpected MediaWiki login result: {}",
                other
            ))),
        }
    }

    async fn fetch_login_token(&self) -> Result<String, DomainError> {
        let body: TokenResponse = self
            .get_json(&[
                ("action", "query"),
                ("meta", "tokens"),
                ("type", "login"),
                ("format", "json"),
            ])
            .await?;
        body.query
            .tokens
            .login_token
            .ok_or_else(|| DomainError::Auth("MediaWiki did not return a login token".to_string()))
    }

    async fn fetch_csrf_token(&self) -> Result<String, DomainError> {
        let body: TokenResponse = self
            .get_json(&[("action", "query"), ("meta", "tokens"), ("format", "json")])
            .await?;
        body.query
            .tokens
            .csrf_token
            .ok_or_else(|| DomainError::Target("MediaWiki did not return an edit token".to_string()))
    }

    async fn edit_once(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        token: &str,
    ) -> Result<(), DomainError> {
        let response = self
            .client
            .post(&self.api_url)
            .form(&[
                ("action", "edit"),
                ("title", title),
                ("text", text),
                ("token", token),
                ("summary", summary),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::Target(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;
        let body: EditResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Target(format!("Failed to parse edit response: {}", e)))?;

        if body.edit.map(|e| e.result == "Success").unwrap_or(false) {
            return Ok(());
        }
        let info = body
            .error
            .map(|e| e.info)
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(title, error = %info, "MediaWiki edit rejected");
        Err(DomainError::Target(format!(
            "Failed to edit page '{}': {}",
            title, info
        )))
    }

    async fn fetch_allpages(
        &self,
        continue_from: Option<&str>,
    ) -> Result<AllPagesResponse, DomainError> {
        let mut request = self.client.get(&self.api_url).query(&[
            ("action", "query"),
            ("list", "allpages"),
            ("aplimit", "500"),
            ("format", "json"),
        ]);
        if let Some(from) = continue_from {
            request = request.query(&[("apcontinue", from)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::Target(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::Target(format!("Failed to parse page list: {}", e)))
    }

    /// Revision text lives behind a dynamic page-id key, so this walks the
    /// JSON rather than deserializing a struct. A missing page reads as
    /// empty text.
    async fn fetch_page_text(&self, title: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| DomainError::Target(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DomainError::Target(format!("Failed to parse page content: {}", e)))?;

        let text = body["query"]["pages"]
            .as_object()
            .and_then(|pages| pages.values().next())
            .and_then(|page| page["revisions"].as_array())
            .and_then(|revisions| revisions.first())
            .and_then(|revision| revision["*"].as_str())
            .unwrap_or("")
            .to_string();
        Ok(text)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, DomainError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| DomainError::Target(format!("HTTP request failed: {}", e)))?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| DomainError::Target(format!("Failed to parse API response: {}", e)))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DomainError::Auth(format!(
                "MediaWiki rejected the credentials ({})",
                status
            )));
        }
        let text = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %text, "MediaWiki API returned error");
        Err(DomainError::Target(format!(
            "API error {}: {}",
            status,
            text.chars().take(200).collect::<String>()
        )))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    query: TokenQuery,
}

#[derive(Deserialize)]
struct TokenQuery {
    tokens: Tokens,
}

#[derive(Deserialize)]
struct Tokens {
    #[serde(rename = "logintoken", default)]
    login_token: Option<String>,
    #[serde(rename = "csrftoken", default)]
    csrf_token: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    login: LoginResult,
}

#[derive(Deserialize)]
struct LoginResult {
    result: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct EditResponse {
    #[serde(default)]
    edit: Option<EditResult>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct EditResult {
    result: String,
}

#[derive(Deserialize)]
struct ApiError {
    info: String,
}

#[derive(Deserialize)]
struct AllPagesResponse {
    #[serde(rename = "continue", default)]
    continuation: Option<Continuation>,
    query: AllPagesQuery,
}

#[derive(Deserialize)]
struct Continuation {
    apcontinue: String,
}

#[derive(Deserialize)]
struct AllPagesQuery {
    allpages: Vec<AllPage>,
}

#[derive(Deserialize)]
struct AllPage {
    title: String,
}

#[async_trait::async_trait]
impl WikiTarget for MediaWikiClient {
    async fn upsert_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
    ) -> Result<(), DomainError> {
        self.ensure_logged_in().await?;
        let token = retry(&self.retry_policy, "fetch edit token", || {
            self.fetch_csrf_token()
        })
        .await?;
        retry(&self.retry_policy, "edit page", || {
            self.edit_once(title, text, summary, &token)
        })
        .await?;
        debug!(title, "page upserted");
        Ok(())
    }

    async fn list_titles(&self) -> Result<Vec<String>, DomainError> {
        self.ensure_logged_in().await?;
        let mut titles = Vec::new();
        let mut continue_from: Option<String> = None;
        loop {
            let batch = retry(&self.retry_policy, "list target pages", || {
                self.fetch_allpages(continue_from.as_deref())
            })
            .await?;
            titles.extend(batch.query.allpages.into_iter().map(|p| p.title));
            match batch.continuation {
                Some(c) => continue_from = Some(c.apcontinue),
                None => break,
            }
        }
        debug!(count = titles.len(), "listed target wiki pages");
        Ok(titles)
    }

    async fn page_text(&self, title: &str) -> Result<String, DomainError> {
        self.ensure_logged_in().await?;
        retry(&self.retry_policy, "fetch target page", || {
            self.fetch_page_text(title)
        })
        .await
    }
}
