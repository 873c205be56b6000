use crate::error::AppError;
use crate::models::RecentSubmission;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, ORIGIN, REFERER};
use serde::Serialize;
use serde_json::{Value, json};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

// --- Data Structures for API Communication ---

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

const CHINA_BASE_URL: &str = "https://leetcode.cn";
const GLOBAL_BASE_URL: &str = "https://leetcode.com";
const GRAPHQL_ENDPOINT: &str = "/graphql/";
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; ",
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    ")"
);
const CSRF_HEADER: &str = "x-csrftoken";
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Nodes that identify an existing user in a profile response.
pub(crate) const USER_NODES: [&str; 2] = ["userProfilePublicProfile", "matchedUser"];

const CHINA_PROFILE_QUERY: &str = r#"
query userProfile($username: String!) {
  userProfilePublicProfile(userSlug: $username) {
    siteRanking
    profile { userSlug realName userAvatar }
  }
  userProfileUserQuestionProgress(userSlug: $username) {
    numAcceptedQuestions { difficulty count }
    numFailedQuestions { difficulty count }
    numUntouchedQuestions { difficulty count }
  }
}"#;

const GLOBAL_PROFILE_QUERY: &str = r#"
query userProfile($username: String!) {
  allQuestionsCount { difficulty count }
  matchedUser(username: $username) {
    username
    profile { realName ranking }
    submitStatsGlobal { acSubmissionNum { difficulty count } }
  }
}"#;

const CHINA_RECENT_QUERY: &str = r#"
query recentAcSubmissions($username: String!) {
  recentACSubmissions(userSlug: $username) {
    submitTime
    question { title translatedTitle titleSlug }
  }
}"#;

const GLOBAL_RECENT_QUERY: &str = r#"
query recentAcSubmissions($username: String!, $limit: Int!) {
  recentAcSubmissionList(username: $username, limit: $limit) {
    title
    titleSlug
    timestamp
  }
}"#;

/// Which LeetCode deployment to query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Site {
    #[default]
    China,
    Global,
}

impl Site {
    pub fn base_url(&self) -> &'static str {
        match self {
            Site::China => CHINA_BASE_URL,
            Site::Global => GLOBAL_BASE_URL,
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("{}{}", self.base_url(), GRAPHQL_ENDPOINT)
    }

    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/u/{}/", self.base_url(), username)
    }

    fn profile_query(&self) -> &'static str {
        match self {
            Site::China => CHINA_PROFILE_QUERY,
            Site::Global => GLOBAL_PROFILE_QUERY,
        }
    }

    fn recent_query(&self) -> &'static str {
        match self {
            Site::China => CHINA_RECENT_QUERY,
            Site::Global => GLOBAL_RECENT_QUERY,
        }
    }
}

impl FromStr for Site {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cn" | "china" | "leetcode.cn" => Ok(Site::China),
            "com" | "global" | "us" | "leetcode.com" => Ok(Site::Global),
            other => Err(AppError::Config(format!(
                "unknown site '{}', expected 'cn' or 'com'",
                other
            ))),
        }
    }
}

/// Session credentials copied from a logged-in browser.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub session: String,
    pub csrf_token: Option<String>,
}

impl Credentials {
    fn cookie_header(&self) -> String {
        match &self.csrf_token {
            Some(token) => format!("LEETCODE_SESSION={}; csrftoken={}", self.session, token),
            None => format!("LEETCODE_SESSION={}", self.session),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(700),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): linear in the attempt index.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Validated `data` node of a profile query.
#[derive(Clone, Debug)]
pub struct RawResponse {
    username: String,
    data: Value,
}

impl RawResponse {
    /// Validates the GraphQL envelope: a matched-user node must be present and non-null.
    pub fn from_body(username: &str, body: Value) -> Result<Self, AppError> {
        let data = match body.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => {
                let errors = body.get("errors").cloned().unwrap_or_default();
                debug!(%errors, "response has no data");
                return Err(AppError::NoSuchUser {
                    username: username.to_string(),
                });
            }
        };

        let has_user = USER_NODES
            .iter()
            .any(|node| data.get(*node).is_some_and(Value::is_object));
        if !has_user {
            return Err(AppError::NoSuchUser {
                username: username.to_string(),
            });
        }

        Ok(Self {
            username: username.to_string(),
            data,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

enum AttemptError {
    NotFound,
    Retryable(String),
}

// --- API Client ---

pub struct ApiClient {
    client: reqwest::Client,
    site: Site,
    endpoint: String,
    credentials: Option<Credentials>,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(
        site: Site,
        endpoint: Option<String>,
        credentials: Option<Credentials>,
        retry: RetryPolicy,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            site,
            endpoint: endpoint.unwrap_or_else(|| site.graphql_url()),
            credentials,
            retry,
        })
    }

    /// Fetches the profile and per-difficulty progress for `username`.
    pub async fn fetch(&self, username: &str) -> Result<RawResponse, AppError> {
        info!(username, site = ?self.site, "fetching profile");
        let body = self
            .post_graphql(username, self.site.profile_query(), json!({ "username": username }))
            .await?;
        RawResponse::from_body(username, body)
    }

    /// Auxiliary activity query. Callers treat failure as "no activity".
    pub async fn fetch_recent_submissions(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<RecentSubmission>, AppError> {
        let body = self
            .post_graphql(
                username,
                self.site.recent_query(),
                json!({ "username": username, "limit": limit }),
            )
            .await?;
        let mut submissions = parse_recent_submissions(&body)?;
        submissions.truncate(limit);
        Ok(submissions)
    }

    async fn post_graphql(
        &self,
        username: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, AppError> {
        let request_body = GraphQlRequest { query, variables };
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.post_once(&request_body).await {
                Ok(text) => return Ok(serde_json::from_str(&text)?),
                Err(AttemptError::NotFound) => {
                    return Err(AppError::NotFound {
                        username: username.to_string(),
                    });
                }
                Err(AttemptError::Retryable(message)) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(AppError::Network {
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        error = %message,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn post_once(&self, request_body: &GraphQlRequest<'_>) -> Result<String, AttemptError> {
        let base_url = self.site.base_url();
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ORIGIN, base_url)
            .header(REFERER, format!("{}/", base_url))
            .json(request_body);

        if let Some(credentials) = &self.credentials {
            request = request.header(COOKIE, credentials.cookie_header());
            if let Some(token) = &credentials.csrf_token {
                request = request.header(CSRF_HEADER, token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AttemptError::NotFound);
        }
        if !status.is_success() {
            return Err(AttemptError::Retryable(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Retryable(format!("failed to read response body: {}", e)))
    }
}

/// Accepts either site's activity shape.
fn parse_recent_submissions(body: &Value) -> Result<Vec<RecentSubmission>, AppError> {
    let data = body
        .get("data")
        .ok_or_else(|| AppError::MalformedResponse("activity response has no data".to_string()))?;

    if let Some(items) = data.get("recentAcSubmissionList").and_then(Value::as_array) {
        return Ok(items
            .iter()
            .filter_map(|item| {
                Some(RecentSubmission {
                    title: item.get("title")?.as_str()?.to_string(),
                    title_slug: item.get("titleSlug")?.as_str()?.to_string(),
                    status: Some("Accepted".to_string()),
                    timestamp: item.get("timestamp").and_then(as_timestamp),
                })
            })
            .collect());
    }

    if let Some(items) = data.get("recentACSubmissions").and_then(Value::as_array) {
        return Ok(items
            .iter()
            .filter_map(|item| {
                let question = item.get("question")?;
                let title = question
                    .get("translatedTitle")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .or_else(|| question.get("title").and_then(Value::as_str))?;
                Some(RecentSubmission {
                    title: title.to_string(),
                    title_slug: question.get("titleSlug")?.as_str()?.to_string(),
                    status: Some("Accepted".to_string()),
                    timestamp: item.get("submitTime").and_then(as_timestamp),
                })
            })
            .collect());
    }

    Err(AppError::MalformedResponse(
        "activity response has no submission list".to_string(),
    ))
}

/// Timestamps arrive as numbers on one site and numeric strings on the other.
fn as_timestamp(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
