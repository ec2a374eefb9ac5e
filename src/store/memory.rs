use super::ContentStore;
use crate::error::Result;
use crate::models::{
    Article, GlossaryTerm, JobStatus, Language, NewJob, Translation, TranslationJob,
    TranslationStatus, TranslationUpsert,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    languages: Vec<Language>,
    articles: BTreeMap<i64, Article>,
    translations: BTreeMap<(i64, String), Translation>,
    glossary: BTreeMap<(String, String), GlossaryTerm>,
    jobs: BTreeMap<i64, TranslationJob>,
    next_article_id: i64,
    next_job_id: i64,
}

/// In-process store with the same keying and upsert rules as [`super::PgStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_language(&self, code: &str, name: &str, native_name: &str, sort_order: i32) {
        let mut state = self.lock();
        state.languages.retain(|l| l.code != code);
        state.languages.push(Language {
            code: code.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
            is_active: true,
            sort_order,
        });
    }

    pub fn set_language_active(&self, code: &str, is_active: bool) {
        let mut state = self.lock();
        if let Some(language) = state.languages.iter_mut().find(|l| l.code == code) {
            language.is_active = is_active;
        }
    }

    /// Create a published article and return its id.
    pub fn add_article(&self, slug: &str, category: &str, source_language: &str) -> i64 {
        let mut state = self.lock();
        state.next_article_id += 1;
        let id = state.next_article_id;
        let now = Utc::now();
        let sort_order = state.articles.len() as i32;
        state.articles.insert(
            id,
            Article {
                id,
                slug: slug.to_string(),
                category: category.to_string(),
                icon: None,
                image: None,
                badge: None,
                sort_order,
                is_published: true,
                source_language: source_language.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn set_article_published(&self, id: i64, is_published: bool) {
        if let Some(article) = self.lock().articles.get_mut(&id) {
            article.is_published = is_published;
        }
    }

    /// Number of rows stored for one composite key; at most one by construction.
    pub fn translation_row_count(&self, article_id: i64, language: &str) -> usize {
        self.lock()
            .translations
            .keys()
            .filter(|(id, lang)| *id == article_id && lang == language)
            .count()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_active_languages(&self) -> Result<Vec<Language>> {
        let mut languages: Vec<Language> = self
            .lock()
            .languages
            .iter()
            .filter(|l| l.is_active)
            .cloned()
            .collect();
        languages.sort_by_key(|l| l.sort_order);
        Ok(languages)
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.lock().articles.get(&id).cloned())
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        Ok(self
            .lock()
            .articles
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn list_published_articles(&self) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .lock()
            .articles
            .values()
            .filter(|a| a.is_published)
            .cloned()
            .collect();
        articles.sort_by_key(|a| a.sort_order);
        Ok(articles)
    }

    async fn get_translation(
        &self,
        article_id: i64,
        language: &str,
    ) -> Result<Option<Translation>> {
        Ok(self
            .lock()
            .translations
            .get(&(article_id, language.to_string()))
            .cloned())
    }

    async fn list_translations(&self, article_id: i64) -> Result<Vec<Translation>> {
        Ok(self
            .lock()
            .translations
            .values()
            .filter(|t| t.article_id == article_id)
            .cloned()
            .collect())
    }

    async fn list_all_translations(&self) -> Result<Vec<Translation>> {
        Ok(self.lock().translations.values().cloned().collect())
    }

    async fn upsert_translation(&self, row: TranslationUpsert) -> Result<Translation> {
        let mut state = self.lock();
        let now = Utc::now();
        let key = (row.article_id, row.language_code.clone());
        let created_at = state
            .translations
            .get(&key)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let translation = Translation {
            article_id: row.article_id,
            language_code: row.language_code,
            title: row.title,
            description: row.description,
            content: row.content,
            status: row.status,
            translated_by: row.translated_by,
            translated_at: row.translated_at,
            source_hash: row.source_hash,
            created_at,
            updated_at: now,
        };
        state.translations.insert(key, translation.clone());
        Ok(translation)
    }

    async fn update_translation_status(
        &self,
        article_id: i64,
        language: &str,
        status: TranslationStatus,
    ) -> Result<bool> {
        let mut state = self.lock();
        match state.translations.get_mut(&(article_id, language.to_string())) {
            Some(row) => {
                row.status = status;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn glossary_terms(&self, language: &str) -> Result<Vec<GlossaryTerm>> {
        Ok(self
            .lock()
            .glossary
            .values()
            .filter(|t| t.language_code == language)
            .cloned()
            .collect())
    }

    async fn upsert_glossary_term(&self, term: GlossaryTerm) -> Result<GlossaryTerm> {
        self.lock().glossary.insert(
            (term.term.clone(), term.language_code.clone()),
            term.clone(),
        );
        Ok(term)
    }

    async fn delete_glossary_term(&self, term: &str, language: &str) -> Result<bool> {
        Ok(self
            .lock()
            .glossary
            .remove(&(term.to_string(), language.to_string()))
            .is_some())
    }

    async fn create_job(&self, job: NewJob) -> Result<TranslationJob> {
        let mut state = self.lock();
        state.next_job_id += 1;
        let record = TranslationJob {
            id: state.next_job_id,
            article_id: job.article_id,
            source_language: job.source_language,
            target_language: job.target_language,
            status: JobStatus::InProgress,
            model: job.model,
            tokens_used: 0,
            cost: 0.0,
            error_message: None,
            started_at: Some(job.started_at),
            completed_at: None,
            created_at: job.started_at,
        };
        state.jobs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn complete_job(
        &self,
        id: i64,
        tokens_used: i64,
        cost: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            job.status = JobStatus::Completed;
            job.tokens_used = tokens_used;
            job.cost = cost;
            job.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn fail_job(&self, id: i64, error: &str, completed_at: DateTime<Utc>) -> Result<()> {
        if let Some(job) = self.lock().jobs.get_mut(&id) {
            job.status = JobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn recent_jobs(&self, limit: i64) -> Result<Vec<TranslationJob>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .lock()
            .jobs
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}
