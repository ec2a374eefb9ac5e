//! Content Store: durable persistence of articles, translations, glossary
//! terms and translation jobs.
//!
//! Every write is scoped to a single row by its primary or composite key, so
//! no cross-row transaction is needed by the callers.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::Result;
use crate::models::{
    Article, GlossaryTerm, Language, NewJob, Translation, TranslationJob, TranslationStatus,
    TranslationUpsert,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Active languages ordered by `sort_order`.
    async fn list_active_languages(&self) -> Result<Vec<Language>>;

    async fn get_article(&self, id: i64) -> Result<Option<Article>>;

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    async fn list_published_articles(&self) -> Result<Vec<Article>>;

    async fn get_translation(&self, article_id: i64, language: &str)
        -> Result<Option<Translation>>;

    async fn list_translations(&self, article_id: i64) -> Result<Vec<Translation>>;

    async fn list_all_translations(&self) -> Result<Vec<Translation>>;

    /// Insert or overwrite the row keyed by `(article_id, language_code)`.
    async fn upsert_translation(&self, row: TranslationUpsert) -> Result<Translation>;

    /// Change only the status of one row. Returns false if no row matched.
    async fn update_translation_status(
        &self,
        article_id: i64,
        language: &str,
        status: TranslationStatus,
    ) -> Result<bool>;

    async fn glossary_terms(&self, language: &str) -> Result<Vec<GlossaryTerm>>;

    /// Insert or overwrite the term keyed by `(term, language_code)`.
    async fn upsert_glossary_term(&self, term: GlossaryTerm) -> Result<GlossaryTerm>;

    async fn delete_glossary_term(&self, term: &str, language: &str) -> Result<bool>;

    /// Record a job in `in_progress` state.
    async fn create_job(&self, job: NewJob) -> Result<TranslationJob>;

    async fn complete_job(
        &self,
        id: i64,
        tokens_used: i64,
        cost: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn fail_job(&self, id: i64, error: &str, completed_at: DateTime<Utc>) -> Result<()>;

    /// Most recent jobs first.
    async fn recent_jobs(&self, limit: i64) -> Result<Vec<TranslationJob>>;
}
