use crate::api_client::ApiClient;
use crate::config::Config;
use crate::error::AppError;
use crate::models::StatsRecord;
use crate::normalize::normalize;
use crate::output::{self, WriteOutcome};
use crate::render;
use chrono::Utc;
use tracing::{info, warn};

/// Number of recent accepted submissions kept in the metadata file.
const RECENT_SUBMISSION_LIMIT: usize = 5;

#[derive(Debug)]
pub struct RunSummary {
    pub record: StatsRecord,
    pub svg: WriteOutcome,
    pub metadata: WriteOutcome,
}

/// One fetch, one normalize, one render, then the conditional writes.
pub async fn run(config: &Config) -> Result<RunSummary, AppError> {
    let client = ApiClient::new(
        config.site,
        config.endpoint.clone(),
        config.credentials.clone(),
        config.retry,
    )?;

    let raw = client.fetch(&config.username).await?;
    let record = normalize(&raw)?;
    info!(
        username = record.username(),
        display_name = record.display_name(),
        ranking = %record.ranking(),
        total_solved = record.total_solved(),
        total_questions = record.total_questions(),
        "profile normalized"
    );

    let recent = match client
        .fetch_recent_submissions(&config.username, RECENT_SUBMISSION_LIMIT)
        .await
    {
        Ok(recent) => recent,
        Err(e) => {
            warn!(error = %e, "could not fetch recent submissions, continuing without them");
            Vec::new()
        }
    };

    let svg = render::render(&record, render::theme(&config.theme), config.site);
    let metadata = render::render_metadata(&record, Utc::now(), &recent)?;

    output::ensure_dir(&config.out_dir)?;
    let svg_outcome = output::write_if_changed(&config.svg_path(), svg.as_bytes())?;
    let metadata_outcome = output::write_metadata_if_changed(&config.json_path(), &metadata)?;

    Ok(RunSummary {
        record,
        svg: svg_outcome,
        metadata: metadata_outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{RetryPolicy, Site};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer, out_dir: &Path) -> Config {
        Config {
            username: "alice".to_string(),
            theme: "dark".to_string(),
            site: Site::China,
            endpoint: Some(format!("{}/graphql/", server.uri())),
            credentials: None,
            out_dir: out_dir.to_path_buf(),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff: Duration::from_millis(1),
            },
        }
    }

    async fn mount_profile(server: &MockServer) {
        Mock::given(method("POST"))
            .and(body_string_contains("userProfileUserQuestionProgress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "userProfilePublicProfile": {
                        "siteRanking": 4321,
                        "profile": { "userSlug": "alice", "realName": "Alice" }
                    },
                    "userProfileUserQuestionProgress": {
                        "numAcceptedQuestions": [
                            { "difficulty": "EASY", "count": 30 },
                            { "difficulty": "MEDIUM", "count": 20 },
                            { "difficulty": "HARD", "count": 5 }
                        ],
                        "numFailedQuestions": [],
                        "numUntouchedQuestions": [
                            { "difficulty": "EASY", "count": 20 },
                            { "difficulty": "MEDIUM", "count": 80 },
                            { "difficulty": "HARD", "count": 35 }
                        ]
                    }
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_run_writes_card_and_metadata_once() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("POST"))
            .and(body_string_contains("recentACSubmissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "recentACSubmissions": [{
                        "submitTime": 1700000000,
                        "question": { "title": "Two Sum", "translatedTitle": "", "titleSlug": "two-sum" }
                    }]
                }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("stats");
        let config = test_config(&server, &out_dir);

        let first = run(&config).await.unwrap();
        assert_eq!(first.svg, WriteOutcome::Written);
        assert_eq!(first.metadata, WriteOutcome::Written);
        assert_eq!(first.record.total_solved(), 55);
        assert_eq!(first.record.total_questions(), 190);

        let svg = fs::read_to_string(out_dir.join("alice.svg")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("#0d1117"));
        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("alice.json")).unwrap()).unwrap();
        assert_eq!(metadata["totalSolved"], 55);
        assert_eq!(metadata["recentSubmissions"][0]["title"], "Two Sum");

        let second = run(&config).await.unwrap();
        assert_eq!(second.svg, WriteOutcome::Unchanged);
        assert_eq!(second.metadata, WriteOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_failed_activity_query_does_not_abort() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("POST"))
            .and(body_string_contains("recentACSubmissions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server, dir.path());

        let summary = run(&config).await.unwrap();
        assert_eq!(summary.svg, WriteOutcome::Written);
        let metadata: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("alice.json")).unwrap())
                .unwrap();
        assert!(metadata["recentSubmissions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "userProfilePublicProfile": null, "userProfileUserQuestionProgress": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("stats");
        let config = test_config(&server, &out_dir);

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, AppError::NoSuchUser { .. }));
        assert_eq!(err.exit_code(), 3);
        assert!(!out_dir.exists());
    }
}
