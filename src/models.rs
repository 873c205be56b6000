use serde::{Serialize, Serializer};
use std::fmt;

/// Marker substituted for profile fields the API did not report.
pub const UNKNOWN: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Label used on the card.
    pub fn display_name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyCount {
    #[serde(skip)]
    difficulty: Difficulty,
    solved: u32,
    total: u32,
}

impl DifficultyCount {
    /// A total below `solved` means the upstream data is partial; it is raised to `solved`.
    pub fn new(difficulty: Difficulty, solved: u32, total: u32) -> Self {
        Self {
            difficulty,
            solved,
            total: total.max(solved),
        }
    }

    #[cfg(test)]
    pub fn empty(difficulty: Difficulty) -> Self {
        Self::new(difficulty, 0, 0)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn solved(&self) -> u32 {
        self.solved
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Solved share in `[0, 1]`; zero when the bucket has no questions.
    pub fn fraction(&self) -> f64 {
        ratio(self.solved, self.total)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ranking {
    Known(u64),
    Unknown,
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ranking::Known(rank) => write!(f, "{}", rank),
            Ranking::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl Serialize for Ranking {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ranking::Known(rank) => serializer.serialize_u64(*rank),
            Ranking::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

/// Canonical, judge-agnostic solve counts for one user.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsRecord {
    username: String,
    display_name: Option<String>,
    ranking: Ranking,
    easy: DifficultyCount,
    medium: DifficultyCount,
    hard: DifficultyCount,
    total_solved: u32,
    total_questions: u32,
}

impl StatsRecord {
    pub fn new(
        username: impl Into<String>,
        display_name: Option<String>,
        ranking: Ranking,
        easy: DifficultyCount,
        medium: DifficultyCount,
        hard: DifficultyCount,
    ) -> Self {
        let buckets = [easy, medium, hard];

        Self {
            username: username.into(),
            display_name: display_name.filter(|name| !name.is_empty()),
            ranking,
            easy,
            medium,
            hard,
            total_solved: buckets
                .iter()
                .map(DifficultyCount::solved)
                .fold(0, u32::saturating_add),
            total_questions: buckets
                .iter()
                .map(DifficultyCount::total)
                .fold(0, u32::saturating_add),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The reported display name, or [`UNKNOWN`] when the API had none.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(UNKNOWN)
    }

    /// Name shown in the card heading: the display name, or the username when there is none.
    pub fn heading(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    pub fn ranking(&self) -> Ranking {
        self.ranking
    }

    pub fn easy(&self) -> &DifficultyCount {
        &self.easy
    }

    pub fn medium(&self) -> &DifficultyCount {
        &self.medium
    }

    pub fn hard(&self) -> &DifficultyCount {
        &self.hard
    }

    pub fn buckets(&self) -> [&DifficultyCount; 3] {
        [&self.easy, &self.medium, &self.hard]
    }

    pub fn total_solved(&self) -> u32 {
        self.total_solved
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Share of all questions solved; drives the completion ring.
    pub fn ring_fraction(&self) -> f64 {
        ratio(self.total_solved, self.total_questions)
    }
}

/// Entry from the optional recent-activity query.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub title: String,
    pub title_slug: String,
    pub status: Option<String>,
    pub timestamp: Option<i64>,
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) / f64::from(whole)).clamp(0.0, 1.0)
}
