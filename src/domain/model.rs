use crate::utils::error::{CardError, Result};
use crate::utils::validation::{validate_char_length, validate_range, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MIN_SOURCE_CHARS: usize = 10;
pub const MAX_SOURCE_CHARS: usize = 50_000;
pub const MIN_REQUESTED_COUNT: u32 = 1;
pub const MAX_REQUESTED_COUNT: u32 = 50;
pub const MAX_FRONT_CHARS: usize = 200;
pub const MAX_BACK_CHARS: usize = 500;
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

/// Spaced-repetition bookkeeping attached to every card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub repetitions: u32,
    pub interval_days: u32,
    pub easiness_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self {
            repetitions: 0,
            interval_days: 0,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            due_at: None,
        }
    }
}

/// Self-reported recall quality, 0 (blackout) to 5 (perfect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(CardError::validation(format!(
                "grade must be between 0 and {} (got {})",
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Grades below 3 count as forgotten.
    pub fn is_pass(self) -> bool {
        self.0 >= 3
    }

    pub fn all() -> impl Iterator<Item = Grade> {
        (0..=Self::MAX).map(Grade)
    }
}

impl TryFrom<u8> for Grade {
    type Error = CardError;

    fn try_from(value: u8) -> Result<Self> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> u8 {
        grade.0
    }
}

/// Editorial lifecycle of a card, independent of its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    New,
    ToCorrect,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::New => "new",
            ReviewStatus::ToCorrect => "to_correct",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(ReviewStatus::New),
            "to_correct" => Ok(ReviewStatus::ToCorrect),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            other => Err(CardError::validation(format!(
                "unknown review status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArchiveState {
    Active,
    Archived { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    pub status: ReviewStatus,
    pub archive: ArchiveState,
}

impl ReviewState {
    pub fn new(status: ReviewStatus) -> Self {
        Self {
            status,
            archive: ArchiveState::Active,
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self.archive, ArchiveState::Archived { .. })
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        match self.archive {
            ArchiveState::Archived { at } => Some(at),
            ArchiveState::Active => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationSource {
    Manual,
    Ai,
}

/// Question and answer text, trimmed and length-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    pub front: String,
    pub back: String,
}

impl CardContent {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Result<Self> {
        let content = Self {
            front: front.into().trim().to_string(),
            back: back.into().trim().to_string(),
        };
        content.validate()?;
        Ok(content)
    }
}

impl Validate for CardContent {
    fn validate(&self) -> Result<()> {
        validate_char_length("front", &self.front, 1, MAX_FRONT_CHARS)?;
        validate_char_length("back", &self.back, 1, MAX_BACK_CHARS)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub content: CardContent,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub creation_source: CreationSource,
    #[serde(default)]
    pub schedule: ScheduleState,
    pub review: ReviewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// A hand-written card. The caller picks the initial status, usually `Approved`.
    pub fn manual(owner_id: Uuid, content: CardContent, initial_status: ReviewStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            content,
            tags: BTreeSet::new(),
            categories: BTreeSet::new(),
            creation_source: CreationSource::Manual,
            schedule: ScheduleState::default(),
            review: ReviewState::new(initial_status),
            created_at: now,
            updated_at: now,
        }
    }

    /// Accepts a generated candidate; AI cards always start as `New`.
    pub fn from_candidate(owner_id: Uuid, candidate: GeneratedCandidate) -> Result<Self> {
        let content = CardContent::new(candidate.front, candidate.back)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            content,
            tags: candidate.tags,
            categories: candidate.categories,
            creation_source: CreationSource::Ai,
            schedule: ScheduleState::default(),
            review: ReviewState::new(ReviewStatus::New),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

/// An AI-proposed card that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCandidate {
    pub front: String,
    pub back: String,
    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub creation_source: CreationSource,
    pub review_status: ReviewStatus,
}

impl GeneratedCandidate {
    pub fn new(
        front: String,
        back: String,
        tags: BTreeSet<String>,
        categories: BTreeSet<String>,
    ) -> Self {
        Self {
            front,
            back,
            tags,
            categories,
            creation_source: CreationSource::Ai,
            review_status: ReviewStatus::New,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source_text: String,
    pub requested_count: u32,
    /// Learner-supplied API key that replaces the configured credential for this call.
    pub model_key: Option<String>,
}

impl GenerationRequest {
    pub fn new(source_text: impl Into<String>, requested_count: u32) -> Self {
        Self {
            source_text: source_text.into(),
            requested_count,
            model_key: None,
        }
    }

    pub fn with_model_key(mut self, model_key: Option<String>) -> Self {
        self.model_key = model_key;
        self
    }
}

impl Validate for GenerationRequest {
    fn validate(&self) -> Result<()> {
        validate_range(
            "requested_count",
            self.requested_count,
            MIN_REQUESTED_COUNT,
            MAX_REQUESTED_COUNT,
        )
        .map_err(|e| CardError::validation(e.to_string()))?;
        validate_char_length(
            "source_text",
            &self.source_text,
            MIN_SOURCE_CHARS,
            MAX_SOURCE_CHARS,
        )?;
        Ok(())
    }
}

/// What a single generation call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationBatch {
    pub candidates: Vec<GeneratedCandidate>,
    pub dropped_count: usize,
}

/// What the orchestrator hands back to the caller. Fewer candidates than
/// requested is a valid outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub candidates: Vec<GeneratedCandidate>,
    pub dropped_count: usize,
    pub requested_count: u32,
    pub attempts: u32,
}
