use super::ContentStore;
use crate::error::Result;
use crate::models::{
    Article, Content, ContentFormat, GlossaryTerm, Language, NewJob, Translation, TranslationJob,
    TranslationStatus, TranslationUpsert,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// PostgreSQL-backed content store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TranslationRow {
    article_id: i64,
    language_code: String,
    title: String,
    description: Option<String>,
    content: Option<String>,
    content_format: String,
    status: String,
    translated_by: Option<String>,
    translated_at: Option<DateTime<Utc>>,
    source_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TranslationRow> for Translation {
    type Error = crate::error::Error;

    fn try_from(row: TranslationRow) -> Result<Self> {
        let format: ContentFormat = row.content_format.parse()?;
        let content = row
            .content
            .map(|text| Content::from_stored(format, &text))
            .transpose()?;
        Ok(Translation {
            article_id: row.article_id,
            language_code: row.language_code,
            title: row.title,
            description: row.description,
            content,
            status: row.status.parse()?,
            translated_by: row.translated_by,
            translated_at: row.translated_at,
            source_hash: row.source_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: i64,
    article_id: i64,
    source_language: String,
    target_language: String,
    status: String,
    model: String,
    tokens_used: i64,
    cost: f64,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for TranslationJob {
    type Error = crate::error::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(TranslationJob {
            id: row.id,
            article_id: row.article_id,
            source_language: row.source_language,
            target_language: row.target_language,
            status: row.status.parse()?,
            model: row.model,
            tokens_used: row.tokens_used,
            cost: row.cost,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LanguageRow {
    code: String,
    name: String,
    native_name: String,
    is_active: bool,
    sort_order: i32,
}

impl From<LanguageRow> for Language {
    fn from(row: LanguageRow) -> Self {
        Language {
            code: row.code,
            name: row.name,
            native_name: row.native_name,
            is_active: row.is_active,
            sort_order: row.sort_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    slug: String,
    category: String,
    icon: Option<String>,
    image: Option<String>,
    badge: Option<String>,
    sort_order: i32,
    is_published: bool,
    source_language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            slug: row.slug,
            category: row.category,
            icon: row.icon,
            image: row.image,
            badge: row.badge,
            sort_order: row.sort_order,
            is_published: row.is_published,
            source_language: row.source_language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GlossaryRow {
    term: String,
    language_code: String,
    translation: String,
    context: Option<String>,
}

impl From<GlossaryRow> for GlossaryTerm {
    fn from(row: GlossaryRow) -> Self {
        GlossaryTerm {
            term: row.term,
            language_code: row.language_code,
            translation: row.translation,
            context: row.context,
        }
    }
}

const TRANSLATION_COLUMNS: &str = "article_id, language_code, title, description, content, \
     content_format, status, translated_by, translated_at, source_hash, created_at, updated_at";

const JOB_COLUMNS: &str = "id, article_id, source_language, target_language, status, model, \
     tokens_used, cost, error_message, started_at, completed_at, created_at";

const ARTICLE_COLUMNS: &str = "id, slug, category, icon, image, badge, sort_order, is_published, \
     source_language, created_at, updated_at";

impl PgStore {
    /// Connect to PostgreSQL and apply pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database connected and migrations applied");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn collect_translations(rows: Vec<TranslationRow>) -> Result<Vec<Translation>> {
    rows.into_iter().map(Translation::try_from).collect()
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_active_languages(&self) -> Result<Vec<Language>> {
        let rows = sqlx::query_as::<_, LanguageRow>(
            "SELECT code, name, native_name, is_active, sort_order
             FROM languages
             WHERE is_active = TRUE
             ORDER BY sort_order, code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Language::from).collect())
    }

    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE id = $1",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Article::from))
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE slug = $1",
            ARTICLE_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Article::from))
    }

    async fn list_published_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE is_published = TRUE ORDER BY sort_order, id",
            ARTICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn get_translation(
        &self,
        article_id: i64,
        language: &str,
    ) -> Result<Option<Translation>> {
        let row = sqlx::query_as::<_, TranslationRow>(&format!(
            "SELECT {} FROM translations WHERE article_id = $1 AND language_code = $2",
            TRANSLATION_COLUMNS
        ))
        .bind(article_id)
        .bind(language)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Translation::try_from).transpose()
    }

    async fn list_translations(&self, article_id: i64) -> Result<Vec<Translation>> {
        let rows = sqlx::query_as::<_, TranslationRow>(&format!(
            "SELECT {} FROM translations WHERE article_id = $1 ORDER BY language_code",
            TRANSLATION_COLUMNS
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;

        collect_translations(rows)
    }

    async fn list_all_translations(&self) -> Result<Vec<Translation>> {
        let rows = sqlx::query_as::<_, TranslationRow>(&format!(
            "SELECT {} FROM translations ORDER BY article_id, language_code",
            TRANSLATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        collect_translations(rows)
    }

    async fn upsert_translation(&self, row: TranslationUpsert) -> Result<Translation> {
        let format = row
            .content
            .as_ref()
            .map(Content::format)
            .unwrap_or(ContentFormat::Prose);
        let content = row.content.as_ref().map(Content::canonical_text);

        let stored = sqlx::query_as::<_, TranslationRow>(&format!(
            "INSERT INTO translations
                (article_id, language_code, title, description, content, content_format,
                 status, translated_by, translated_at, source_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
             ON CONFLICT (article_id, language_code) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content = EXCLUDED.content,
                content_format = EXCLUDED.content_format,
                status = EXCLUDED.status,
                translated_by = EXCLUDED.translated_by,
                translated_at = EXCLUDED.translated_at,
                source_hash = EXCLUDED.source_hash,
                updated_at = NOW()
             RETURNING {}",
            TRANSLATION_COLUMNS
        ))
        .bind(row.article_id)
        .bind(&row.language_code)
        .bind(&row.title)
        .bind(&row.description)
        .bind(content)
        .bind(format.as_str())
        .bind(row.status.as_str())
        .bind(&row.translated_by)
        .bind(row.translated_at)
        .bind(&row.source_hash)
        .fetch_one(&self.pool)
        .await?;

        Translation::try_from(stored)
    }

    async fn update_translation_status(
        &self,
        article_id: i64,
        language: &str,
        status: TranslationStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE translations SET status = $1, updated_at = NOW()
             WHERE article_id = $2 AND language_code = $3",
        )
        .bind(status.as_str())
        .bind(article_id)
        .bind(language)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn glossary_terms(&self, language: &str) -> Result<Vec<GlossaryTerm>> {
        let rows = sqlx::query_as::<_, GlossaryRow>(
            "SELECT term, language_code, translation, context
             FROM glossary
             WHERE language_code = $1
             ORDER BY term",
        )
        .bind(language)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GlossaryTerm::from).collect())
    }

    async fn upsert_glossary_term(&self, term: GlossaryTerm) -> Result<GlossaryTerm> {
        let row = sqlx::query_as::<_, GlossaryRow>(
            "INSERT INTO glossary (term, language_code, translation, context)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (term, language_code) DO UPDATE SET
                translation = EXCLUDED.translation,
                context = EXCLUDED.context
             RETURNING term, language_code, translation, context",
        )
        .bind(&term.term)
        .bind(&term.language_code)
        .bind(&term.translation)
        .bind(&term.context)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete_glossary_term(&self, term: &str, language: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM glossary WHERE term = $1 AND language_code = $2")
            .bind(term)
            .bind(language)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_job(&self, job: NewJob) -> Result<TranslationJob> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "INSERT INTO translation_jobs
                (article_id, source_language, target_language, status, model, started_at, created_at)
             VALUES ($1, $2, $3, 'in_progress', $4, $5, NOW())
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(job.article_id)
        .bind(&job.source_language)
        .bind(&job.target_language)
        .bind(&job.model)
        .bind(job.started_at)
        .fetch_one(&self.pool)
        .await?;

        TranslationJob::try_from(row)
    }

    async fn complete_job(
        &self,
        id: i64,
        tokens_used: i64,
        cost: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE translation_jobs
             SET status = 'completed', tokens_used = $1, cost = $2, completed_at = $3
             WHERE id = $4",
        )
        .bind(tokens_used)
        .bind(cost)
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fail_job(&self, id: i64, error: &str, completed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE translation_jobs
             SET status = 'failed', error_message = $1, completed_at = $2
             WHERE id = $3",
        )
        .bind(error)
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_jobs(&self, limit: i64) -> Result<Vec<TranslationJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM translation_jobs ORDER BY created_at DESC, id DESC LIMIT $1",
            JOB_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TranslationJob::try_from).collect()
    }
}
