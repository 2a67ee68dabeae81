//! Azure DevOps Wiki REST adapter.
//!
//! Speaks the `_apis/wiki` surface: list wikis, list pages recursively,
//! fetch page content. Auth is a personal access token sent as HTTP basic
//! with an empty username.

use crate::domain::{DomainError, Wiki, WikiPage};
use crate::ports::WikiSource;
use crate::shared::{RetryPolicy, retry};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const API_VERSION: &str = "7.0";
const USER_AGENT: &str = "MediaWiki-Migration-Tool/1.0";

pub struct AzureDevOpsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    retry_policy: RetryPolicy,
}

impl AzureDevOpsClient {
    pub fn new(organization: &str, project: &str, token: String) -> Self {
        Self::with_base_url(
            format!("https://dev.azure.com/{organization}/{project}/_apis"),
            token,
        )
    }

    /// Same client against a custom API root, for on-prem servers and tests.
    pub fn with_base_url(base_url: String, token: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            token,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, DomainError> {
        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.token))
            .send()
            .await
            .map_err(|e| DomainError::Source(format!("HTTP request failed: {}", e)))?;

        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| DomainError::Source(format!("Failed to parse {}: {}", what, e)))
    }

    /// Maps non-success statuses onto domain errors. 429 carries the
    /// server's Retry-After so the retry loop can honor it.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DomainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let seconds = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            warn!(seconds, "Azure DevOps rate limit hit");
            return Err(DomainError::RateLimited { seconds });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DomainError::Auth(format!(
                "Azure DevOps rejected the personal access token ({})",
                status
            )));
        }

        let text = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %text, "Azure DevOps API returned error");
        Err(DomainError::Source(format!(
            "API error {}: {}",
            status,
            text.chars().take(200).collect::<String>()
        )))
    }
}

#[derive(Deserialize)]
struct WikiListResponse {
    value: Vec<WikiDto>,
}

#[derive(Deserialize)]
struct WikiDto {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct PageListResponse {
    value: Vec<PageDto>,
}

#[derive(Deserialize)]
struct PageDto {
    id: i64,
    path: String,
    #[serde(rename = "remoteUrl", default)]
    remote_url: Option<String>,
    /// Not every listing carries this; undated pages pass date filters.
    #[serde(rename = "lastModifiedDate", default)]
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PageContentResponse {
    #[serde(default)]
    content: String,
}

#[async_trait::async_trait]
impl WikiSource for AzureDevOpsClient {
    async fn list_wikis(&self) -> Result<Vec<Wiki>, DomainError> {
        let url = format!("{}/wiki/wikis?api-version={}", self.base_url, API_VERSION);
        let body: WikiListResponse =
            retry(&self.retry_policy, "list wikis", || {
                self.get_json(&url, "wiki list")
            })
            .await?;

        debug!(count = body.value.len(), "retrieved wikis");
        Ok(body
            .value
            .into_iter()
            .map(|w| Wiki {
                id: w.id,
                name: w.name,
            })
            .collect())
    }

    async fn list_pages(&self, wiki_id: &str) -> Result<Vec<WikiPage>, DomainError> {
        let url = format!(
            "{}/wiki/wikis/{}/pages?api-version={}&recursionLevel=full",
            self.base_url, wiki_id, API_VERSION
        );
        let body: PageListResponse =
            retry(&self.retry_policy, "list pages", || {
                self.get_json(&url, "page list")
            })
            .await?;

        debug!(wiki_id, count = body.value.len(), "retrieved page listing");
        Ok(body
            .value
            .into_iter()
            .map(|p| WikiPage {
                id: p.id,
                path: p.path,
                remote_url: p.remote_url,
                last_modified: p.last_modified,
            })
            .collect())
    }

    async fn page_content(&self, wiki_id: &str, page_id: i64) -> Result<String, DomainError> {
        let url = format!(
            "{}/wiki/wikis/{}/pages/{}?api-version={}&includeContent=true",
            self.base_url, wiki_id, page_id, API_VERSION
        );
        let body: PageContentResponse =
            retry(&self.retry_policy, "fetch page content", || {
                self.get_json(&url, "page content")
            })
            .await?;

        Ok(body.content)
    }
}
