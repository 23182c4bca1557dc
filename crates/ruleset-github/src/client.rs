//! REST client for one GitHub organization

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use ruleset_core::{LookupSettings, LookupUnavailable, RepositoryLookup};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, RequestError, Result};
use crate::link::next_link;
use crate::retry::RetryPolicy;

/// User agent sent with every request.
pub const USER_AGENT: &str = "CursorCult-Rulesets-Sync";

const MEDIA_TYPE: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

const TAGS_PER_PAGE: &str = "100";
/// Default bound on tag pages fetched per repository.
pub const MAX_TAG_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
}

#[derive(Debug, Deserialize)]
struct TagInfo {
    #[serde(default)]
    name: Option<String>,
}

struct Page<T> {
    body: T,
    next: Option<Url>,
}

/// Looks up repositories of a single organization.
///
/// Archived repositories and forks count as missing: neither is a
/// maintained rule.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: Url,
    organization: String,
    retry: RetryPolicy,
    max_tag_pages: usize,
}

impl GitHubClient {
    /// Client for `organization`, authenticated when `token` is given.
    pub fn new(
        organization: impl Into<String>,
        settings: &LookupSettings,
        token: Option<&str>,
    ) -> Result<Self> {
        let api_base = parse_api_base(&settings.api_base)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            http,
            api_base,
            organization: organization.into(),
            retry: RetryPolicy::from_settings(settings),
            max_tag_pages: MAX_TAG_PAGES,
        })
    }

    /// Bound the tag pages fetched per repository.
    ///
    /// A listing that needs more pages is reported unavailable, never as a
    /// partial answer.
    pub fn with_max_tag_pages(mut self, pages: usize) -> Self {
        self.max_tag_pages = pages.max(1);
        self
    }

    fn repo_url(&self, name: &str, suffix: &[&str]) -> std::result::Result<Url, RequestError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| RequestError::permanent("API base cannot carry a path"))?
            .pop_if_empty()
            .extend(["repos", self.organization.as_str(), name])
            .extend(suffix);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> std::result::Result<Page<T>, RequestError> {
        tracing::trace!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error = classify_status(status, response.headers());
            tracing::debug!(%status, %error, "request failed");
            return Err(error);
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link)
            .and_then(|href| Url::parse(&href).ok());
        let body = response.json::<T>().await.map_err(classify_transport)?;
        Ok(Page { body, next })
    }

    fn unavailable(&self, name: &str, error: RequestError) -> LookupUnavailable {
        LookupUnavailable::new(name, error.to_string())
    }
}

#[async_trait]
impl RepositoryLookup for GitHubClient {
    async fn exists(&self, name: &str) -> std::result::Result<bool, LookupUnavailable> {
        let url = self
            .repo_url(name, &[])
            .map_err(|e| self.unavailable(name, e))?;

        match self
            .retry
            .run("repository", || self.get_json::<RepoInfo>(url.clone()))
            .await
        {
            Ok(Page { body: repo, .. }) if repo.archived || repo.fork => {
                tracing::debug!(
                    repo = name,
                    archived = repo.archived,
                    fork = repo.fork,
                    "repository is not a maintained rule"
                );
                Ok(false)
            }
            Ok(_) => Ok(true),
            Err(RequestError::NotFound) => Ok(false),
            Err(error) => Err(self.unavailable(name, error)),
        }
    }

    async fn list_tags(&self, name: &str) -> std::result::Result<Vec<String>, LookupUnavailable> {
        let mut url = self
            .repo_url(name, &["tags"])
            .map_err(|e| self.unavailable(name, e))?;
        url.query_pairs_mut().append_pair("per_page", TAGS_PER_PAGE);

        let mut tags = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(current) = next.take() {
            pages += 1;
            if pages > self.max_tag_pages {
                tracing::warn!(repo = name, pages = self.max_tag_pages, "tag listing exceeds page limit");
                return Err(self.unavailable(
                    name,
                    RequestError::transient(format!(
                        "tag listing truncated after {} pages",
                        self.max_tag_pages
                    )),
                ));
            }
            match self
                .retry
                .run("tags", || self.get_json::<Vec<TagInfo>>(current.clone()))
                .await
            {
                Ok(page) => {
                    tags.extend(page.body.into_iter().filter_map(|t| t.name));
                    next = page.next;
                }
                // Deleted between the existence check and the tag listing
                Err(RequestError::NotFound) => return Ok(Vec::new()),
                Err(error) => return Err(self.unavailable(name, error)),
            }
        }

        tracing::debug!(repo = name, count = tags.len(), "listed tags");
        Ok(tags)
    }
}

fn parse_api_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidApiBase {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidApiBase {
            url: raw.to_string(),
            message: "expected an http(s) URL".to_string(),
        });
    }
    Ok(url)
}

fn classify_transport(error: reqwest::Error) -> RequestError {
    if error.is_builder() || error.is_decode() {
        return RequestError::permanent(error.to_string());
    }
    if error.is_timeout() {
        return RequestError::transient("request timed out");
    }
    RequestError::transient(error.to_string())
}

fn classify_status(status: StatusCode, headers: &HeaderMap) -> RequestError {
    let retry_after = retry_after(headers);
    let exhausted = header_str(headers, RATE_LIMIT_REMAINING) == Some("0");

    match status {
        StatusCode::NOT_FOUND => RequestError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => RequestError::Transient {
            reason: "rate limited (HTTP 429)".to_string(),
            retry_after,
        },
        StatusCode::FORBIDDEN if exhausted || retry_after.is_some() => RequestError::Transient {
            reason: "rate limited (HTTP 403)".to_string(),
            retry_after,
        },
        StatusCode::UNAUTHORIZED => RequestError::permanent("authentication failed (HTTP 401)"),
        StatusCode::FORBIDDEN => RequestError::permanent("access forbidden (HTTP 403)"),
        StatusCode::REQUEST_TIMEOUT => RequestError::transient("request timed out (HTTP 408)"),
        s if s.is_server_error() => RequestError::transient(format!("server error (HTTP {})", s.as_u16())),
        s => RequestError::permanent(format!("unexpected response (HTTP {})", s.as_u16())),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Wait requested by the server, from `Retry-After` or the rate-limit reset.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(secs) = header_str(headers, RETRY_AFTER.as_str()).and_then(|v| v.parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }
    if header_str(headers, RATE_LIMIT_REMAINING) != Some("0") {
        return None;
    }
    let reset = header_str(headers, RATE_LIMIT_RESET)?.parse::<u64>().ok()?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(reset.saturating_sub(now)))
}
