//! Outdated Detector and source-row editing.
//!
//! Staleness is only evaluated when a caller asks for it after editing the
//! source row; reads never trigger it.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::hash::{hash_fields, hash_translation};
use crate::models::{Content, Translation, TranslationStatus, TranslationUpsert, SOURCE_TRANSLATOR};
use crate::store::ContentStore;
use serde::Deserialize;
use tracing::info;

/// Flip every derived translation whose recorded source hash no longer
/// matches the current source row. Returns the newly flagged language codes.
///
/// Rows without a source hash and rows already outdated are left alone, so a
/// second call without an intervening edit returns nothing.
pub async fn mark_outdated_translations(
    store: &dyn ContentStore,
    article_id: i64,
) -> Result<Vec<String>> {
    let article = store
        .get_article(article_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("article {}", article_id)))?;

    let source = store
        .get_translation(article_id, &article.source_language)
        .await?
        .ok_or_else(|| {
            Error::not_found(format!(
                "source translation ({}) for article {}",
                article.source_language, article_id
            ))
        })?;
    let current_hash = hash_translation(&source);

    let mut flagged = Vec::new();
    for row in store.list_translations(article_id).await? {
        if row.language_code == article.source_language || !is_stale(&row, &current_hash) {
            continue;
        }
        store
            .update_translation_status(article_id, &row.language_code, TranslationStatus::Outdated)
            .await?;
        flagged.push(row.language_code);
    }

    if !flagged.is_empty() {
        info!(
            article_id,
            languages = ?flagged,
            "Marked {} translations outdated",
            flagged.len()
        );
    }

    Ok(flagged)
}

fn is_stale(row: &Translation, current_hash: &str) -> bool {
    match row.source_hash.as_deref() {
        Some(hash) => hash != current_hash && row.status != TranslationStatus::Outdated,
        None => false,
    }
}

/// Partial edit of the source-language row. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<Content>,
}

impl SourceEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.content.is_none()
    }
}

/// Merge `edit` into the source row and restamp its hash.
///
/// Creating the row requires a title.
pub async fn apply_source_edit(
    store: &dyn ContentStore,
    clock: &dyn Clock,
    article_id: i64,
    edit: SourceEdit,
) -> Result<Translation> {
    let article = store
        .get_article(article_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("article {}", article_id)))?;

    let existing = store
        .get_translation(article_id, &article.source_language)
        .await?;

    let (title, description, content) = match existing {
        Some(row) => (
            edit.title.unwrap_or(row.title),
            edit.description.or(row.description),
            edit.content.or(row.content),
        ),
        None => (
            edit.title.ok_or_else(|| {
                Error::Validation("title is required to create the source translation".into())
            })?,
            edit.description,
            edit.content,
        ),
    };

    let source_hash = hash_fields(&title, description.as_deref(), content.as_ref());

    store
        .upsert_translation(TranslationUpsert {
            article_id,
            language_code: article.source_language,
            title,
            description,
            content,
            status: TranslationStatus::Published,
            translated_by: Some(SOURCE_TRANSLATOR.to_string()),
            translated_at: Some(clock.now()),
            source_hash: Some(source_hash),
        })
        .await
}
