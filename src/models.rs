//! Domain records shared by the store, the orchestrators and the HTTP layer.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identity recorded in `translated_by` for rows edited directly by humans
/// in the source language.
pub const SOURCE_TRANSLATOR: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub category: String,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub badge: Option<String>,
    pub sort_order: i32,
    pub is_published: bool,
    pub source_language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    Draft,
    Pending,
    Translated,
    AutoTranslated,
    Reviewed,
    Published,
    Outdated,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationStatus::Draft => "draft",
            TranslationStatus::Pending => "pending",
            TranslationStatus::Translated => "translated",
            TranslationStatus::AutoTranslated => "auto_translated",
            TranslationStatus::Reviewed => "reviewed",
            TranslationStatus::Published => "published",
            TranslationStatus::Outdated => "outdated",
        }
    }

    /// Statuses counted as live content in the coverage overview.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            TranslationStatus::Published
                | TranslationStatus::Translated
                | TranslationStatus::AutoTranslated
        )
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(TranslationStatus::Draft),
            "pending" => Ok(TranslationStatus::Pending),
            "translated" => Ok(TranslationStatus::Translated),
            "auto_translated" => Ok(TranslationStatus::AutoTranslated),
            "reviewed" => Ok(TranslationStatus::Reviewed),
            "published" => Ok(TranslationStatus::Published),
            "outdated" => Ok(TranslationStatus::Outdated),
            other => Err(Error::Validation(format!(
                "unknown translation status '{}'",
                other
            ))),
        }
    }
}

/// Body of a translation row.
///
/// Interactive workflow articles store a flat map from source string to
/// translated string; everything else is prose (HTML or markdown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Prose(String),
    KeyValueMap(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Prose,
    KeyValue,
}

impl ContentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentFormat::Prose => "prose",
            ContentFormat::KeyValue => "key_value",
        }
    }
}

impl FromStr for ContentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prose" => Ok(ContentFormat::Prose),
            "key_value" => Ok(ContentFormat::KeyValue),
            other => Err(Error::Validation(format!(
                "unknown content format '{}'",
                other
            ))),
        }
    }
}

impl Content {
    pub fn format(&self) -> ContentFormat {
        match self {
            Content::Prose(_) => ContentFormat::Prose,
            Content::KeyValueMap(_) => ContentFormat::KeyValue,
        }
    }

    /// Text persisted in the `content` column and fed to the hash engine.
    ///
    /// Maps serialize as compact JSON; `BTreeMap` keeps the key order stable.
    pub fn canonical_text(&self) -> String {
        match self {
            Content::Prose(text) => text.clone(),
            Content::KeyValueMap(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| String::from("{}"))
            }
        }
    }

    pub fn from_stored(format: ContentFormat, text: &str) -> Result<Self> {
        match format {
            ContentFormat::Prose => Ok(Content::Prose(text.to_string())),
            ContentFormat::KeyValue => Ok(Content::KeyValueMap(serde_json::from_str(text)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub article_id: i64,
    pub language_code: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<Content>,
    pub status: TranslationStatus,
    pub translated_by: Option<String>,
    pub translated_at: Option<DateTime<Utc>>,
    pub source_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write model for the `(article_id, language_code)` upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUpsert {
    pub article_id: i64,
    pub language_code: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<Content>,
    pub status: TranslationStatus,
    pub translated_by: Option<String>,
    pub translated_at: Option<DateTime<Utc>>,
    pub source_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub language_code: String,
    pub translation: String,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Validation(format!("unknown job status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: i64,
    pub article_id: i64,
    pub source_language: String,
    pub target_language: String,
    pub status: JobStatus,
    pub model: String,
    pub tokens_used: i64,
    pub cost: f64,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert model for a job that starts immediately.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub article_id: i64,
    pub source_language: String,
    pub target_language: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
}
