//! Turns a validated profile response into a [`StatsRecord`].
//!
//! The two LeetCode deployments report progress in different shapes, so
//! extraction is an ordered list of strategies. The first strategy whose
//! source node is present wins; later ones are never consulted.

use crate::api_client::RawResponse;
use crate::error::AppError;
use crate::models::{Difficulty, DifficultyCount, Ranking, StatsRecord};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

#[derive(Deserialize, Debug)]
struct CountEntry {
    difficulty: String,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuestionProgress {
    num_accepted_questions: Option<Vec<CountEntry>>,
    num_failed_questions: Option<Vec<CountEntry>>,
    num_untouched_questions: Option<Vec<CountEntry>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    ac_submission_num: Option<Vec<CountEntry>>,
}

trait Extraction {
    fn name(&self) -> &'static str;
    fn applies(&self, data: &Value) -> bool;
    fn extract(&self, raw: &RawResponse) -> Result<StatsRecord, AppError>;
}

/// `userProfileUserQuestionProgress`: accepted, failed and untouched counts per difficulty.
struct ProfileProgress;

/// `matchedUser.submitStatsGlobal` plus the site-wide `allQuestionsCount`.
struct SubmissionStats;

const STRATEGIES: [&dyn Extraction; 2] = [&ProfileProgress, &SubmissionStats];

pub fn normalize(raw: &RawResponse) -> Result<StatsRecord, AppError> {
    let data = raw.data();
    let strategy = STRATEGIES
        .iter()
        .find(|strategy| strategy.applies(data))
        .ok_or_else(|| {
            AppError::MalformedResponse("response has no per-difficulty counts".to_string())
        })?;

    debug!(strategy = strategy.name(), "normalizing response");
    strategy.extract(raw)
}

impl Extraction for ProfileProgress {
    fn name(&self) -> &'static str {
        "profile-progress"
    }

    fn applies(&self, data: &Value) -> bool {
        non_null(data.get("userProfileUserQuestionProgress")).is_some()
    }

    fn extract(&self, raw: &RawResponse) -> Result<StatsRecord, AppError> {
        let data = raw.data();
        let progress: QuestionProgress =
            parse_node(&data["userProfileUserQuestionProgress"], "question progress")?;
        let accepted = progress.num_accepted_questions.ok_or_else(|| {
            AppError::MalformedResponse("question progress has no accepted counts".to_string())
        })?;
        let failed = progress.num_failed_questions.unwrap_or_default();
        let untouched = progress.num_untouched_questions.unwrap_or_default();

        let bucket = |difficulty: Difficulty| {
            let label = upper_label(difficulty);
            let solved = count_for(&accepted, label);
            let total = solved
                .saturating_add(count_for(&failed, label))
                .saturating_add(count_for(&untouched, label));
            DifficultyCount::new(difficulty, solved, total)
        };

        let public = non_null(data.get("userProfilePublicProfile"));
        let profile = public.and_then(|p| non_null(p.get("profile")));
        let username = profile
            .and_then(|p| p.get("userSlug"))
            .and_then(Value::as_str)
            .unwrap_or(raw.username());
        let display_name = profile
            .and_then(|p| p.get("realName"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let ranking = parse_ranking(public.and_then(|p| p.get("siteRanking")));

        Ok(StatsRecord::new(
            username,
            display_name,
            ranking,
            bucket(Difficulty::Easy),
            bucket(Difficulty::Medium),
            bucket(Difficulty::Hard),
        ))
    }
}

impl Extraction for SubmissionStats {
    fn name(&self) -> &'static str {
        "submission-stats"
    }

    fn applies(&self, data: &Value) -> bool {
        submit_stats_node(data).is_some()
    }

    fn extract(&self, raw: &RawResponse) -> Result<StatsRecord, AppError> {
        let data = raw.data();
        let stats_node = submit_stats_node(data).ok_or_else(|| {
            AppError::MalformedResponse("matched user has no submission stats".to_string())
        })?;
        let stats: SubmitStats = parse_node(stats_node, "submission stats")?;
        let accepted = stats.ac_submission_num.ok_or_else(|| {
            AppError::MalformedResponse("submission stats have no accepted counts".to_string())
        })?;
        let all_questions: Vec<CountEntry> = match non_null(data.get("allQuestionsCount")) {
            Some(node) => parse_node(node, "question totals")?,
            None => Vec::new(),
        };

        let bucket = |difficulty: Difficulty| {
            let label = difficulty.display_name();
            DifficultyCount::new(
                difficulty,
                count_for(&accepted, label),
                count_for(&all_questions, label),
            )
        };

        let user = non_null(data.get("matchedUser"));
        let profile = user.and_then(|u| non_null(u.get("profile")));
        let username = user
            .and_then(|u| u.get("username"))
            .and_then(Value::as_str)
            .unwrap_or(raw.username());
        let display_name = profile
            .and_then(|p| p.get("realName"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let ranking = parse_ranking(profile.and_then(|p| p.get("ranking")));

        Ok(StatsRecord::new(
            username,
            display_name,
            ranking,
            bucket(Difficulty::Easy),
            bucket(Difficulty::Medium),
            bucket(Difficulty::Hard),
        ))
    }
}

fn upper_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "EASY",
        Difficulty::Medium => "MEDIUM",
        Difficulty::Hard => "HARD",
    }
}

/// First entry with the exact label wins; a missing entry counts as zero.
fn count_for(entries: &[CountEntry], label: &str) -> u32 {
    entries
        .iter()
        .find(|entry| entry.difficulty == label)
        .and_then(|entry| entry.count)
        .unwrap_or(0)
}

fn submit_stats_node(data: &Value) -> Option<&Value> {
    let user = non_null(data.get("matchedUser"))?;
    non_null(user.get("submitStatsGlobal")).or_else(|| non_null(user.get("submitStats")))
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn parse_node<T: DeserializeOwned>(node: &Value, what: &str) -> Result<T, AppError> {
    T::deserialize(node)
        .map_err(|e| AppError::MalformedResponse(format!("unrecognized {}: {}", what, e)))
}

fn parse_ranking(value: Option<&Value>) -> Ranking {
    let rank = value.and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    });
    match rank {
        Some(rank) => Ranking::Known(rank),
        None => Ranking::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN;
    use serde_json::json;

    fn raw(data: Value) -> RawResponse {
        RawResponse::from_body("alice", json!({ "data": data })).unwrap()
    }

    fn china(progress: Value) -> RawResponse {
        raw(json!({
            "userProfilePublicProfile": {
                "siteRanking": 4321,
                "profile": { "userSlug": "alice-cn", "realName": "Alice" }
            },
            "userProfileUserQuestionProgress": progress
        }))
    }

    #[test]
    fn test_profile_progress_example() {
        let record = normalize(&china(json!({
            "numAcceptedQuestions": [
                { "difficulty": "EASY", "count": 30 },
                { "difficulty": "MEDIUM", "count": 20 },
                { "difficulty": "HARD", "count": 5 }
            ],
            "numFailedQuestions": [
                { "difficulty": "EASY", "count": 5 },
                { "difficulty": "MEDIUM", "count": 10 }
            ],
            "numUntouchedQuestions": [
                { "difficulty": "EASY", "count": 15 },
                { "difficulty": "MEDIUM", "count": 70 },
                { "difficulty": "HARD", "count": 35 }
            ]
        })))
        .unwrap();

        assert_eq!(record.username(), "alice-cn");
        assert_eq!(record.display_name(), "Alice");
        assert_eq!(record.ranking(), Ranking::Known(4321));
        assert_eq!((record.easy().solved(), record.easy().total()), (30, 50));
        assert_eq!((record.medium().solved(), record.medium().total()), (20, 100));
        assert_eq!((record.hard().solved(), record.hard().total()), (5, 40));
        assert_eq!(record.total_solved(), 55);
        assert_eq!(record.total_questions(), 190);
    }

    #[test]
    fn test_partial_progress_defaults_to_zero() {
        let record = normalize(&china(json!({
            "numAcceptedQuestions": [{ "difficulty": "MEDIUM", "count": 7 }],
            "numFailedQuestions": null
        })))
        .unwrap();

        assert_eq!(record.easy().solved(), 0);
        assert_eq!(record.easy().total(), 0);
        assert_eq!(record.medium().solved(), 7);
        assert_eq!(record.medium().total(), 7);
        assert_eq!(record.total_solved(), 7);
    }

    #[test]
    fn test_duplicate_label_takes_first_match() {
        let record = normalize(&china(json!({
            "numAcceptedQuestions": [
                { "difficulty": "EASY", "count": 3 },
                { "difficulty": "EASY", "count": 99 }
            ]
        })))
        .unwrap();
        assert_eq!(record.easy().solved(), 3);
    }

    #[test]
    fn test_submission_stats_ignores_upstream_all_row() {
        let record = normalize(&raw(json!({
            "allQuestionsCount": [
                { "difficulty": "All", "count": 9999 },
                { "difficulty": "Easy", "count": 50 },
                { "difficulty": "Medium", "count": 100 },
                { "difficulty": "Hard", "count": 40 }
            ],
            "matchedUser": {
                "username": "alice",
                "profile": { "realName": "", "ranking": "777" },
                "submitStatsGlobal": {
                    "acSubmissionNum": [
                        { "difficulty": "All", "count": 1000 },
                        { "difficulty": "Easy", "count": 30 },
                        { "difficulty": "Medium", "count": 20 },
                        { "difficulty": "Hard", "count": 5 }
                    ]
                }
            }
        })))
        .unwrap();

        assert_eq!(record.total_solved(), 55);
        assert_eq!(record.total_questions(), 190);
        assert_eq!(record.ranking(), Ranking::Known(777));
        assert_eq!(record.display_name(), UNKNOWN);
    }

    #[test]
    fn test_legacy_submit_stats_field_is_accepted() {
        let record = normalize(&raw(json!({
            "matchedUser": {
                "submitStats": { "acSubmissionNum": [{ "difficulty": "Hard", "count": 2 }] }
            }
        })))
        .unwrap();

        assert_eq!(record.username(), "alice");
        assert_eq!(record.hard().solved(), 2);
        assert_eq!(record.hard().total(), 2);
        assert_eq!(record.ranking(), Ranking::Unknown);
    }

    #[test]
    fn test_profile_progress_has_priority() {
        let record = normalize(&raw(json!({
            "userProfileUserQuestionProgress": {
                "numAcceptedQuestions": [{ "difficulty": "EASY", "count": 1 }]
            },
            "matchedUser": {
                "submitStatsGlobal": { "acSubmissionNum": [{ "difficulty": "Easy", "count": 50 }] }
            }
        })))
        .unwrap();
        assert_eq!(record.easy().solved(), 1);
    }

    #[test]
    fn test_missing_counts_is_malformed() {
        let no_counts = raw(json!({ "matchedUser": { "username": "alice" } }));
        assert!(matches!(
            normalize(&no_counts),
            Err(AppError::MalformedResponse(_))
        ));

        let wrong_shape = china(json!({ "numAcceptedQuestions": "lots" }));
        assert!(matches!(
            normalize(&wrong_shape),
            Err(AppError::MalformedResponse(_))
        ));

        let no_accepted = china(json!({ "numFailedQuestions": [] }));
        assert!(matches!(
            normalize(&no_accepted),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_profile_uses_queried_name_and_unknowns() {
        let record = normalize(&raw(json!({
            "userProfilePublicProfile": {},
            "userProfileUserQuestionProgress": { "numAcceptedQuestions": [] }
        })))
        .unwrap();

        assert_eq!(record.username(), "alice");
        assert_eq!(record.display_name(), UNKNOWN);
        assert_eq!(record.ranking(), Ranking::Unknown);
        assert_eq!(record.ring_fraction(), 0.0);
    }

    #[test]
    fn test_counts_at_u32_max_do_not_overflow() {
        let record = normalize(&china(json!({
            "numAcceptedQuestions": [
                { "difficulty": "EASY", "count": 4294967295u64 },
                { "difficulty": "MEDIUM", "count": 1 }
            ],
            "numUntouchedQuestions": [{ "difficulty": "EASY", "count": 10 }]
        })))
        .unwrap();

        assert_eq!(record.easy().total(), u32::MAX);
        assert_eq!(record.total_solved(), u32::MAX);
        assert_eq!(record.total_questions(), u32::MAX);
    }

    #[test]
    fn test_solved_never_exceeds_total() {
        let record = normalize(&raw(json!({
            "allQuestionsCount": [{ "difficulty": "Easy", "count": 10 }],
            "matchedUser": {
                "submitStatsGlobal": { "acSubmissionNum": [{ "difficulty": "Easy", "count": 12 }] }
            }
        })))
        .unwrap();
        for bucket in record.buckets() {
            assert!(bucket.total() >= bucket.solved());
        }
    }
}
