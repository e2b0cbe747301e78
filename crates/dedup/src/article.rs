use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Article lifecycle states.
///
/// Only `Approved` and `Uploaded` articles participate in the similarity
/// index; drafts and rejected articles must never be duplicate-match targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Reviewed,
    Approved,
    Uploaded,
    Rejected,
}

impl ArticleStatus {
    /// Whether this status makes the article eligible as a match target.
    pub fn is_published(self) -> bool {
        matches!(self, ArticleStatus::Approved | ArticleStatus::Uploaded)
    }
}

/// The article fields the duplicate-detection core reads.
///
/// The surrounding workflow owns the full article document and its status
/// transitions; this is the explicit, validated slice of it, with no
/// duck-typed fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleRecord {
    /// Unique identifier, immutable once assigned.
    pub id: String,
    pub title: String,
    /// Text the embedding is computed from.
    pub content_text: String,
    #[serde(default)]
    pub condition_tags: Vec<String>,
    /// Set exactly once per content version; `None` until computed.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content_text: content_text.into(),
            condition_tags: Vec::new(),
            embedding: None,
            status: ArticleStatus::Draft,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.condition_tags = tags;
        self
    }

    /// Boundary validation of the fields the core depends on.
    pub fn validate(&self) -> Result<(), ArticleError> {
        if self.id.trim().is_empty() {
            return Err(ArticleError::MissingId);
        }
        if self.content_text.trim().is_empty() {
            return Err(ArticleError::EmptyContent(self.id.clone()));
        }
        Ok(())
    }

    /// Validate and additionally require a published status.
    pub fn require_published(&self) -> Result<(), ArticleError> {
        self.validate()?;
        if !self.status.is_published() {
            return Err(ArticleError::NotPublished(self.id.clone()));
        }
        Ok(())
    }
}

/// Boundary validation failures for article records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArticleError {
    #[error("article id must not be empty")]
    MissingId,
    #[error("article {0} has no content text")]
    EmptyContent(String),
    #[error("candidate text must not be empty")]
    EmptyCandidate,
    #[error("article {0} is not in a published status")]
    NotPublished(String),
}

/// Build the text an article is embedded and compared by.
///
/// The title is doubled so it weighs more than body prose, condition tags
/// are appended, and the whole thing is cleaned: lowercased, common
/// hypertension abbreviations expanded, special characters stripped,
/// whitespace collapsed.
pub fn comparison_text(title: &str, body: &str, tags: &[String]) -> String {
    let mut combined = String::with_capacity(title.len() * 2 + body.len() + 32);
    combined.push_str(title);
    combined.push(' ');
    combined.push_str(title);
    combined.push(' ');
    combined.push_str(body);
    for tag in tags {
        combined.push(' ');
        combined.push_str(tag);
    }
    clean_text(&combined)
}

fn clean_text(text: &str) -> String {
    let filtered: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '!' | '?') {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut tokens: Vec<String> = Vec::new();
    for token in filtered.split_whitespace() {
        match token {
            "dash" => tokens.push("dietary approaches to stop hypertension".to_string()),
            "hbp" => tokens.push("high blood pressure".to_string()),
            "bp" => tokens.push("blood pressure".to_string()),
            other => tokens.push(other.to_string()),
        }
    }
    tokens.join(" ")
}
