//! Article translation, per-language fan-out and the batch run over all
//! published articles.

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::glossary::{format_for_prompt, get_glossary_terms};
use crate::hash::hash_translation;
use crate::models::{
    Article, Content, Language, NewJob, Translation, TranslationStatus, TranslationUpsert,
};
use crate::outdated::{self, SourceEdit};
use crate::overview::{self, Overview};
use crate::store::ContentStore;
use crate::translator::Translator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Cache key: (article slug, language code).
pub type TranslationCache = TtlCache<(String, String), Translation>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleTranslation {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<Content>,
    pub tokens_used: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failure,
}

/// Outcome of one target language inside a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageResult {
    pub lang: String,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LanguageResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanOutReport {
    pub article_id: i64,
    pub results: Vec<LanguageResult>,
}

impl FanOutReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// One article of a batch run. `error` is set when the article could not be
/// fanned out at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub article_id: i64,
    pub slug: String,
    pub results: Vec<LanguageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which target languages a fan-out should cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LanguageSelection {
    /// Every active language except the source.
    #[default]
    All,
    /// The listed codes, which must be active and differ from the source.
    Only(Vec<String>),
    /// Languages whose row is missing or outdated.
    MissingOrOutdated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUpdate {
    pub translation: Translation,
    pub outdated_languages: Vec<String>,
}

/// Entry point for every write and read the HTTP layer performs.
#[derive(Clone)]
pub struct TranslationService {
    store: Arc<dyn ContentStore>,
    translator: Translator,
    clock: Arc<dyn Clock>,
    cache: Arc<TranslationCache>,
    cost_per_1k_tokens: f64,
    job_stale_after: chrono::Duration,
    recent_jobs_limit: i64,
}

impl TranslationService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        translator: Translator,
        clock: Arc<dyn Clock>,
        cache_ttl: std::time::Duration,
    ) -> Self {
        let cache = Arc::new(TtlCache::new(cache_ttl, clock.clone()));
        Self {
            store,
            translator,
            clock,
            cache,
            cost_per_1k_tokens: 0.0,
            job_stale_after: chrono::Duration::minutes(10),
            recent_jobs_limit: 50,
        }
    }

    pub fn with_cost_per_1k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_1k_tokens = cost;
        self
    }

    pub fn with_job_stale_after(mut self, stale_after: chrono::Duration) -> Self {
        self.job_stale_after = stale_after;
        self
    }

    pub fn with_recent_jobs_limit(mut self, limit: i64) -> Self {
        self.recent_jobs_limit = limit;
        self
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    async fn require_article(&self, article_id: i64) -> Result<Article> {
        self.store
            .get_article(article_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("article {}", article_id)))
    }

    pub async fn resolve_article(&self, article_id: Option<i64>, slug: Option<&str>) -> Result<Article> {
        match (article_id, slug) {
            (Some(id), _) => self.require_article(id).await,
            (None, Some(slug)) => self
                .store
                .get_article_by_slug(slug)
                .await?
                .ok_or_else(|| Error::not_found(format!("article '{}'", slug))),
            (None, None) => Err(Error::Validation(
                "either article_id or slug is required".to_string(),
            )),
        }
    }

    fn invalidate_article(&self, slug: &str) {
        self.cache.invalidate_where(|(cached_slug, _)| cached_slug == slug);
    }

    /// Translate one article into one target language and upsert the result.
    ///
    /// The stored row is stamped with the hash of the source row read here,
    /// recording which source version it reflects.
    pub async fn translate_article(
        &self,
        article_id: i64,
        source_language: &str,
        target_code: &str,
        target_name: &str,
    ) -> Result<ArticleTranslation> {
        let article = self.require_article(article_id).await?;
        let source = self
            .store
            .get_translation(article_id, source_language)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "source translation ({}) for article {}",
                    source_language, article_id
                ))
            })?;

        let terms = get_glossary_terms(self.store.as_ref(), target_code).await?;
        let glossary = format_for_prompt(&terms);

        let title = self
            .translator
            .translate_text(&source.title, target_name, &glossary)
            .await?;
        let mut tokens_used = title.tokens_used;

        let description = match source.description.as_deref() {
            Some(text) => {
                let translated = self
                    .translator
                    .translate_text(text, target_name, &glossary)
                    .await?;
                tokens_used += translated.tokens_used;
                Some(translated.text)
            }
            None => None,
        };

        let content = match source.content.as_ref() {
            Some(body) => {
                let translated = self
                    .translator
                    .translate_content(body, target_name, &glossary)
                    .await?;
                tokens_used += translated.tokens_used;
                Some(translated.content)
            }
            None => None,
        };

        let source_hash = hash_translation(&source);

        self.store
            .upsert_translation(TranslationUpsert {
                article_id,
                language_code: target_code.to_string(),
                title: title.text.clone(),
                description: description.clone(),
                content: content.clone(),
                status: TranslationStatus::AutoTranslated,
                translated_by: Some(self.translator.model().to_string()),
                translated_at: Some(self.clock.now()),
                source_hash: Some(source_hash),
            })
            .await?;
        self.cache.invalidate(&(article.slug, target_code.to_string()));

        Ok(ArticleTranslation {
            title: title.text,
            description,
            content,
            tokens_used,
        })
    }

    /// Translate into every active language except the source.
    pub async fn translate_all_languages(
        &self,
        article_id: i64,
        source_language: &str,
    ) -> Result<FanOutReport> {
        self.translate_languages(article_id, source_language, &LanguageSelection::All)
            .await
    }

    /// Fan out over the selected languages, one job record per language.
    ///
    /// A failing language becomes a failure entry and the loop moves on;
    /// only job bookkeeping errors abort the run.
    pub async fn translate_languages(
        &self,
        article_id: i64,
        source_language: &str,
        selection: &LanguageSelection,
    ) -> Result<FanOutReport> {
        let targets = self
            .target_languages(article_id, source_language, selection)
            .await?;

        info!(
            article_id,
            source_language,
            targets = targets.len(),
            "Starting translation fan-out"
        );

        let mut results = Vec::with_capacity(targets.len());
        for language in targets {
            let job = self
                .store
                .create_job(NewJob {
                    article_id,
                    source_language: source_language.to_string(),
                    target_language: language.code.clone(),
                    model: self.translator.model().to_string(),
                    started_at: self.clock.now(),
                })
                .await?;

            match self
                .translate_article(article_id, source_language, &language.code, &language.name)
                .await
            {
                Ok(translated) => {
                    let cost = translated.tokens_used as f64 / 1000.0 * self.cost_per_1k_tokens;
                    self.store
                        .complete_job(job.id, translated.tokens_used, cost, self.clock.now())
                        .await?;
                    info!(
                        article_id,
                        lang = %language.code,
                        job_id = job.id,
                        tokens = translated.tokens_used,
                        "Translation completed"
                    );
                    results.push(LanguageResult {
                        lang: language.code,
                        status: ResultStatus::Success,
                        tokens_used: Some(translated.tokens_used),
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    self.store
                        .fail_job(job.id, &message, self.clock.now())
                        .await?;
                    warn!(
                        article_id,
                        lang = %language.code,
                        job_id = job.id,
                        "Translation failed: {}",
                        message
                    );
                    results.push(LanguageResult {
                        lang: language.code,
                        status: ResultStatus::Failure,
                        tokens_used: None,
                        error: Some(message),
                    });
                }
            }
        }

        Ok(FanOutReport {
            article_id,
            results,
        })
    }

    async fn target_languages(
        &self,
        article_id: i64,
        source_language: &str,
        selection: &LanguageSelection,
    ) -> Result<Vec<Language>> {
        let candidates: Vec<Language> = self
            .store
            .list_active_languages()
            .await?
            .into_iter()
            .filter(|l| l.code != source_language)
            .collect();

        match selection {
            LanguageSelection::All => Ok(candidates),
            LanguageSelection::Only(codes) => {
                if let Some(unknown) = codes
                    .iter()
                    .find(|code| !candidates.iter().any(|l| &l.code == *code))
                {
                    return Err(Error::Validation(format!(
                        "'{}' is not an active target language",
                        unknown
                    )));
                }
                Ok(candidates
                    .into_iter()
                    .filter(|l| codes.contains(&l.code))
                    .collect())
            }
            LanguageSelection::MissingOrOutdated => {
                let rows = self.store.list_translations(article_id).await?;
                Ok(candidates
                    .into_iter()
                    .filter(|l| {
                        rows.iter()
                            .find(|r| r.language_code == l.code)
                            .map_or(true, |r| r.status == TranslationStatus::Outdated)
                    })
                    .collect())
            }
        }
    }

    /// Run the fan-out over every published article.
    pub async fn translate_all_articles(&self, selection: &LanguageSelection) -> Result<Vec<BatchEntry>> {
        let articles = self.store.list_published_articles().await?;
        info!("Starting batch translation of {} articles", articles.len());

        let mut entries = Vec::with_capacity(articles.len());
        for article in articles {
            let entry = match self
                .translate_languages(article.id, &article.source_language, selection)
                .await
            {
                Ok(report) => BatchEntry {
                    article_id: article.id,
                    slug: article.slug,
                    results: report.results,
                    error: None,
                },
                Err(e) => {
                    error!(article_id = article.id, "Batch translation failed: {}", e);
                    BatchEntry {
                        article_id: article.id,
                        slug: article.slug,
                        results: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Write the source-language row, then flag derived rows that are now stale.
    pub async fn update_source(&self, article_id: i64, edit: SourceEdit) -> Result<SourceUpdate> {
        if edit.is_empty() {
            return Err(Error::Validation(
                "at least one of title, description or content is required".to_string(),
            ));
        }
        let article = self.require_article(article_id).await?;

        let translation =
            outdated::apply_source_edit(self.store.as_ref(), self.clock.as_ref(), article_id, edit)
                .await?;
        self.invalidate_article(&article.slug);
        let outdated_languages = self.mark_outdated_translations(article_id).await?;

        Ok(SourceUpdate {
            translation,
            outdated_languages,
        })
    }

    pub async fn mark_outdated_translations(&self, article_id: i64) -> Result<Vec<String>> {
        outdated::mark_outdated_translations(self.store.as_ref(), article_id).await
    }

    /// Public read of one translation, served from the cache when fresh.
    pub async fn public_translation(&self, slug: &str, locale: &str) -> Result<Option<Translation>> {
        let key = (slug.to_string(), locale.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Some(hit));
        }

        let Some(article) = self.store.get_article_by_slug(slug).await? else {
            return Ok(None);
        };
        if !article.is_published {
            return Ok(None);
        }

        let translation = self.store.get_translation(article.id, locale).await?;
        if let Some(row) = &translation {
            self.cache.insert(key, row.clone());
        }
        Ok(translation)
    }

    pub async fn overview(&self) -> Result<Overview> {
        let articles = self.store.list_published_articles().await?;
        let languages = self.store.list_active_languages().await?;
        let translations = self.store.list_all_translations().await?;
        let now = self.clock.now();
        let jobs = self
            .store
            .recent_jobs(self.recent_jobs_limit)
            .await?
            .into_iter()
            .map(|job| overview::classify_job(job, now, self.job_stale_after))
            .collect();

        Ok(Overview {
            languages: languages.iter().map(|l| l.code.clone()).collect(),
            matrix: overview::build_matrix(&articles, &translations),
            counts: overview::coverage_counts(&articles, &languages, &translations),
            jobs,
        })
    }
}
