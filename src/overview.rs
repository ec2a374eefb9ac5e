//! Coverage matrix and job views for the admin overview.

use crate::models::{Article, JobStatus, Language, Translation, TranslationJob, TranslationStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// slug -> language code -> status. An absent language key means "missing".
pub type CoverageMatrix = BTreeMap<String, BTreeMap<String, TranslationStatus>>;

pub fn build_matrix(articles: &[Article], translations: &[Translation]) -> CoverageMatrix {
    let slugs: HashMap<i64, &str> = articles.iter().map(|a| (a.id, a.slug.as_str())).collect();

    let mut matrix: CoverageMatrix = articles
        .iter()
        .map(|a| (a.slug.clone(), BTreeMap::new()))
        .collect();

    for row in translations {
        if let Some(slug) = slugs.get(&row.article_id) {
            if let Some(languages) = matrix.get_mut(*slug) {
                languages.insert(row.language_code.clone(), row.status);
            }
        }
    }

    matrix
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CoverageCounts {
    pub total_expected: usize,
    pub total_rows: usize,
    pub published: usize,
    pub outdated: usize,
    pub missing: usize,
}

/// Counts over rows belonging to `articles` in an active language.
pub fn coverage_counts(
    articles: &[Article],
    languages: &[Language],
    translations: &[Translation],
) -> CoverageCounts {
    let article_ids: HashSet<i64> = articles.iter().map(|a| a.id).collect();
    let active: HashSet<&str> = languages.iter().map(|l| l.code.as_str()).collect();

    let rows: Vec<&Translation> = translations
        .iter()
        .filter(|t| article_ids.contains(&t.article_id) && active.contains(t.language_code.as_str()))
        .collect();

    let total_expected = articles.len() * languages.len();
    CoverageCounts {
        total_expected,
        total_rows: rows.len(),
        published: rows.iter().filter(|t| t.status.is_live()).count(),
        outdated: rows
            .iter()
            .filter(|t| t.status == TranslationStatus::Outdated)
            .count(),
        missing: total_expected.saturating_sub(rows.len()),
    }
}

/// A job as reported to monitoring, with orphaned runs shown as failed.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: TranslationJob,
    pub effective_status: JobStatus,
    pub stale: bool,
}

/// An `in_progress` job with no update for longer than `stale_after` is
/// reported as failed. The stored record is not touched.
pub fn classify_job(job: TranslationJob, now: DateTime<Utc>, stale_after: chrono::Duration) -> JobView {
    let last_update = job.started_at.unwrap_or(job.created_at);
    let stale = job.status == JobStatus::InProgress && now - last_update > stale_after;
    JobView {
        effective_status: if stale { JobStatus::Failed } else { job.status },
        stale,
        job,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub languages: Vec<String>,
    pub matrix: CoverageMatrix,
    pub counts: CoverageCounts,
    pub jobs: Vec<JobView>,
}
