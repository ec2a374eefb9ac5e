//! Scenario tests for the freshness and auto-translation pipeline, run
//! against the in-memory store and a stub language model.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{fixture, fixture_with_store, MODEL};
use spy_kb_translations::clock::Clock;
use spy_kb_translations::error::{Error, Result};
use spy_kb_translations::hash::hash_fields;
use spy_kb_translations::models::{
    Article, Content, GlossaryTerm, JobStatus, Language, NewJob, Translation, TranslationJob,
    TranslationStatus, TranslationUpsert,
};
use spy_kb_translations::orchestrator::{LanguageSelection, ResultStatus};
use spy_kb_translations::outdated::SourceEdit;
use spy_kb_translations::store::{ContentStore, MemoryStore};
use std::collections::BTreeMap;
use std::sync::Arc;

fn source_edit(title: &str, description: Option<&str>, content: Option<Content>) -> SourceEdit {
    SourceEdit {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        content,
    }
}

// ==================== End-to-end Scenario ====================

#[tokio::test]
async fn test_translate_then_edit_marks_outdated() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", Some("desc"), None))
        .await
        .unwrap();
    let h0 = hash_fields("Ongoing WMS", Some("desc"), None);

    f.provider.translate("Ongoing WMS", "Ongoing WMS");
    f.provider.translate("desc", "description");

    let result = f
        .service
        .translate_article(id, "da", "en", "English")
        .await
        .unwrap();
    assert_eq!(result.title, "Ongoing WMS");
    assert_eq!(result.description.as_deref(), Some("description"));
    assert_eq!(result.content, None);
    assert_eq!(result.tokens_used, 20);

    let en = f.store.get_translation(id, "en").await.unwrap().unwrap();
    assert_eq!(en.source_hash.as_deref(), Some(h0.as_str()));
    assert_eq!(en.status, TranslationStatus::AutoTranslated);
    assert_eq!(en.translated_by.as_deref(), Some(MODEL));
    assert_eq!(en.translated_at, Some(f.clock.now()));

    let update = f
        .service
        .update_source(id, SourceEdit {
            description: Some("desc2".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let h1 = hash_fields("Ongoing WMS", Some("desc2"), None);
    assert_ne!(h0, h1);
    assert_eq!(update.translation.source_hash.as_deref(), Some(h1.as_str()));
    assert_eq!(update.outdated_languages, vec!["en"]);

    let en = f.store.get_translation(id, "en").await.unwrap().unwrap();
    assert_eq!(en.status, TranslationStatus::Outdated);
    assert_eq!(en.description.as_deref(), Some("description"));
}

#[tokio::test]
async fn test_retranslation_clears_outdated() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", Some("desc"), None))
        .await
        .unwrap();
    f.service.translate_article(id, "da", "en", "English").await.unwrap();
    f.service
        .update_source(id, source_edit("Ongoing WMS", Some("desc2"), None))
        .await
        .unwrap();

    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    let en = f.store.get_translation(id, "en").await.unwrap().unwrap();
    assert_eq!(en.status, TranslationStatus::AutoTranslated);
    assert_eq!(
        en.source_hash,
        Some(hash_fields("Ongoing WMS", Some("desc2"), None))
    );
    assert!(f.service.mark_outdated_translations(id).await.unwrap().is_empty());
}

// ==================== Article Translation ====================

#[tokio::test]
async fn test_translate_article_is_upsert() {
    let f = fixture();
    let id = f.store.add_article("shipmondo", "integrations", "da");
    f.service
        .update_source(id, source_edit("Fragt", None, None))
        .await
        .unwrap();

    f.provider.translate("Fragt", "Shipping");
    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    f.provider.translate("Fragt", "Freight");
    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    assert_eq!(f.store.translation_row_count(id, "en"), 1);
    let en = f.store.get_translation(id, "en").await.unwrap().unwrap();
    assert_eq!(en.title, "Freight");
}

#[tokio::test]
async fn test_translate_article_without_source_row_is_not_found() {
    let f = fixture();
    let id = f.store.add_article("empty", "guides", "da");

    let err = f
        .service
        .translate_article(id, "da", "en", "English")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(f.provider.requests().is_empty());
}

#[tokio::test]
async fn test_key_value_content_translated_in_json_mode() {
    let f = fixture();
    let id = f.store.add_article("order-flow", "workflows", "da");
    let mut map = BTreeMap::new();
    map.insert("Ordre modtaget".to_string(), "Ordre modtaget".to_string());
    map.insert("Pakket".to_string(), "Pakket".to_string());
    f.service
        .update_source(id, source_edit("Ordreflow", None, Some(Content::KeyValueMap(map))))
        .await
        .unwrap();

    f.provider.translate("Ordre modtaget", "Order received");
    f.provider.translate("Pakket", "Packed");

    let result = f
        .service
        .translate_article(id, "da", "en", "English")
        .await
        .unwrap();

    match result.content {
        Some(Content::KeyValueMap(translated)) => {
            assert_eq!(translated["Ordre modtaget"], "Order received");
            assert_eq!(translated["Pakket"], "Packed");
        }
        other => panic!("expected key-value content, got {:?}", other),
    }
    assert!(f.provider.requests().iter().any(|r| r.json_mode));
}

#[tokio::test]
async fn test_glossary_terms_reach_prompt_per_language() {
    let f = fixture();
    let id = f.store.add_article("faktura", "guides", "da");
    f.service
        .update_source(id, source_edit("Faktura", None, None))
        .await
        .unwrap();
    for (lang, translation) in [("en", "Invoice"), ("nl", "Factuur")] {
        f.store
            .upsert_glossary_term(GlossaryTerm {
                term: "Faktura".to_string(),
                language_code: lang.to_string(),
                translation: translation.to_string(),
                context: None,
            })
            .await
            .unwrap();
    }

    f.service.translate_article(id, "da", "en", "English").await.unwrap();
    f.service.translate_article(id, "da", "nl", "Dutch").await.unwrap();
    f.service.translate_article(id, "da", "de", "German").await.unwrap();

    let requests = f.provider.requests();
    assert!(requests[0].system.contains("\"Invoice\""));
    assert!(requests[1].system.contains("\"Factuur\""));
    assert!(!requests[2].system.contains("## Glossary"));
}

// ==================== Fan-out ====================

#[tokio::test]
async fn test_fan_out_isolates_failing_language() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", Some("desc"), None))
        .await
        .unwrap();
    f.provider.fail_for("Dutch");

    let report = f.service.translate_all_languages(id, "da").await.unwrap();

    let statuses: Vec<(&str, ResultStatus)> = report
        .results
        .iter()
        .map(|r| (r.lang.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("en", ResultStatus::Success),
            ("nl", ResultStatus::Failure),
            ("de", ResultStatus::Success),
        ]
    );
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert!(report.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("simulated outage"));
    assert_eq!(report.results[0].tokens_used, Some(20));

    assert!(f.store.get_translation(id, "en").await.unwrap().is_some());
    assert!(f.store.get_translation(id, "de").await.unwrap().is_some());
    assert!(f.store.get_translation(id, "nl").await.unwrap().is_none());
}

#[tokio::test]
async fn test_fan_out_records_job_lifecycle() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();
    f.provider.fail_for("German");

    f.service.translate_all_languages(id, "da").await.unwrap();

    let jobs = f.store.recent_jobs(10).await.unwrap();
    assert_eq!(jobs.len(), 3);
    for job in &jobs {
        assert_eq!(job.source_language, "da");
        assert_eq!(job.model, MODEL);
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());
    }
    let german = jobs.iter().find(|j| j.target_language == "de").unwrap();
    assert_eq!(german.status, JobStatus::Failed);
    assert!(german.error_message.as_deref().unwrap().contains("German"));

    let english = jobs.iter().find(|j| j.target_language == "en").unwrap();
    assert_eq!(english.status, JobStatus::Completed);
    assert_eq!(english.tokens_used, 10);
    assert!((english.cost - 0.005).abs() < 1e-9);
}

#[tokio::test]
async fn test_fan_out_skips_source_and_inactive_languages() {
    let f = fixture();
    f.store.set_language_active("de", false);
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();

    let report = f.service.translate_all_languages(id, "da").await.unwrap();
    let langs: Vec<&str> = report.results.iter().map(|r| r.lang.as_str()).collect();
    assert_eq!(langs, vec!["en", "nl"]);
}

#[tokio::test]
async fn test_fan_out_without_source_fails_every_language() {
    let f = fixture();
    let id = f.store.add_article("empty", "guides", "da");

    let report = f.service.translate_all_languages(id, "da").await.unwrap();
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failed(), 3);
}

#[tokio::test]
async fn test_selected_languages_only() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();

    let report = f
        .service
        .translate_languages(id, "da", &LanguageSelection::Only(vec!["nl".to_string()]))
        .await
        .unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].lang, "nl");

    let err = f
        .service
        .translate_languages(id, "da", &LanguageSelection::Only(vec!["da".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_missing_or_outdated_selection() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", Some("desc"), None))
        .await
        .unwrap();
    f.service.translate_article(id, "da", "en", "English").await.unwrap();
    f.service.translate_article(id, "da", "nl", "Dutch").await.unwrap();
    f.store
        .update_translation_status(id, "nl", TranslationStatus::Outdated)
        .await
        .unwrap();

    let report = f
        .service
        .translate_languages(id, "da", &LanguageSelection::MissingOrOutdated)
        .await
        .unwrap();
    let langs: Vec<&str> = report.results.iter().map(|r| r.lang.as_str()).collect();
    assert_eq!(langs, vec!["nl", "de"]);
}

#[tokio::test]
async fn test_batch_isolates_articles() {
    let f = fixture();
    let good = f.store.add_article("good", "guides", "da");
    let empty = f.store.add_article("empty", "guides", "da");
    let hidden = f.store.add_article("hidden", "guides", "da");
    f.store.set_article_published(hidden, false);
    f.service
        .update_source(good, source_edit("God", None, None))
        .await
        .unwrap();

    let entries = f
        .service
        .translate_all_articles(&LanguageSelection::All)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    let good_entry = entries.iter().find(|e| e.article_id == good).unwrap();
    assert!(good_entry.results.iter().all(|r| r.is_success()));
    let empty_entry = entries.iter().find(|e| e.article_id == empty).unwrap();
    assert!(empty_entry.results.iter().all(|r| !r.is_success()));
    assert_eq!(empty_entry.results.len(), 3);
}

// ==================== Storage Failures ====================

/// Delegates to a memory store but refuses some writes.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_language: Option<&'static str>,
    fail_status_updates: bool,
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn list_active_languages(&self) -> Result<Vec<Language>> {
        self.inner.list_active_languages().await
    }
    async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        self.inner.get_article(id).await
    }
    async fn get_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        self.inner.get_article_by_slug(slug).await
    }
    async fn list_published_articles(&self) -> Result<Vec<Article>> {
        self.inner.list_published_articles().await
    }
    async fn get_translation(&self, article_id: i64, language: &str) -> Result<Option<Translation>> {
        self.inner.get_translation(article_id, language).await
    }
    async fn list_translations(&self, article_id: i64) -> Result<Vec<Translation>> {
        self.inner.list_translations(article_id).await
    }
    async fn list_all_translations(&self) -> Result<Vec<Translation>> {
        self.inner.list_all_translations().await
    }
    async fn upsert_translation(&self, row: TranslationUpsert) -> Result<Translation> {
        if Some(row.language_code.as_str()) == self.failing_language {
            return Err(Error::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner.upsert_translation(row).await
    }
    async fn update_translation_status(
        &self,
        article_id: i64,
        language: &str,
        status: TranslationStatus,
    ) -> Result<bool> {
        if self.fail_status_updates {
            return Err(Error::Storage(sqlx::Error::PoolTimedOut));
        }
        self.inner
            .update_translation_status(article_id, language, status)
            .await
    }
    async fn glossary_terms(&self, language: &str) -> Result<Vec<GlossaryTerm>> {
        self.inner.glossary_terms(language).await
    }
    async fn upsert_glossary_term(&self, term: GlossaryTerm) -> Result<GlossaryTerm> {
        self.inner.upsert_glossary_term(term).await
    }
    async fn delete_glossary_term(&self, term: &str, language: &str) -> Result<bool> {
        self.inner.delete_glossary_term(term, language).await
    }
    async fn create_job(&self, job: NewJob) -> Result<TranslationJob> {
        self.inner.create_job(job).await
    }
    async fn complete_job(
        &self,
        id: i64,
        tokens_used: i64,
        cost: f64,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.complete_job(id, tokens_used, cost, completed_at).await
    }
    async fn fail_job(&self, id: i64, error: &str, completed_at: DateTime<Utc>) -> Result<()> {
        self.inner.fail_job(id, error, completed_at).await
    }
    async fn recent_jobs(&self, limit: i64) -> Result<Vec<TranslationJob>> {
        self.inner.recent_jobs(limit).await
    }
}

#[tokio::test]
async fn test_failed_upsert_is_reported_as_failure() {
    let store = Arc::new(MemoryStore::new());
    store.add_language("da", "Danish", "Dansk", 1);
    store.add_language("en", "English", "English", 2);
    store.add_language("nl", "Dutch", "Nederlands", 3);
    let backend = Arc::new(FlakyStore {
        inner: store.clone(),
        failing_language: Some("nl"),
        fail_status_updates: false,
    });
    let f = fixture_with_store(store, backend);
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();

    let report = f.service.translate_all_languages(id, "da").await.unwrap();

    let nl = report.results.iter().find(|r| r.lang == "nl").unwrap();
    assert_eq!(nl.status, ResultStatus::Failure);
    assert!(nl.error.as_deref().unwrap().contains("storage error"));
    let jobs = f.store.recent_jobs(10).await.unwrap();
    let nl_job = jobs.iter().find(|j| j.target_language == "nl").unwrap();
    assert_eq!(nl_job.status, JobStatus::Failed);
}

#[tokio::test]
async fn test_source_edit_invalidates_cache_even_when_detector_fails() {
    let store = Arc::new(MemoryStore::new());
    store.add_language("da", "Danish", "Dansk", 1);
    store.add_language("en", "English", "English", 2);
    let backend = Arc::new(FlakyStore {
        inner: store.clone(),
        failing_language: None,
        fail_status_updates: true,
    });
    let f = fixture_with_store(store, backend);
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();
    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    let cached = f.service.public_translation("ongoing-wms", "da").await.unwrap().unwrap();
    assert_eq!(cached.title, "Ongoing WMS");

    let err = f
        .service
        .update_source(id, source_edit("Ongoing WMS 2", None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    let fresh = f.service.public_translation("ongoing-wms", "da").await.unwrap().unwrap();
    assert_eq!(fresh.title, "Ongoing WMS 2");
}

// ==================== Public Reads & Overview ====================

#[tokio::test]
async fn test_public_read_is_cached_and_invalidated_on_write() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();
    f.provider.translate("Ongoing WMS", "Ongoing WMS EN");
    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    let first = f.service.public_translation("ongoing-wms", "en").await.unwrap().unwrap();
    assert_eq!(first.title, "Ongoing WMS EN");

    // A write that bypasses the service is only visible after the TTL lapses.
    f.store
        .upsert_translation(TranslationUpsert {
            article_id: id,
            language_code: "en".to_string(),
            title: "Edited by hand".to_string(),
            description: None,
            content: None,
            status: TranslationStatus::Reviewed,
            translated_by: Some("editor".to_string()),
            translated_at: None,
            source_hash: first.source_hash.clone(),
        })
        .await
        .unwrap();
    let cached = f.service.public_translation("ongoing-wms", "en").await.unwrap().unwrap();
    assert_eq!(cached.title, "Ongoing WMS EN");

    f.clock.advance(chrono::Duration::minutes(6));
    let fresh = f.service.public_translation("ongoing-wms", "en").await.unwrap().unwrap();
    assert_eq!(fresh.title, "Edited by hand");

    // Writes through the service invalidate immediately.
    f.provider.translate("Ongoing WMS", "Ongoing WMS v2");
    f.service.translate_article(id, "da", "en", "English").await.unwrap();
    let after = f.service.public_translation("ongoing-wms", "en").await.unwrap().unwrap();
    assert_eq!(after.title, "Ongoing WMS v2");
}

#[tokio::test]
async fn test_public_read_miss() {
    let f = fixture();
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    assert!(f.service.public_translation("ongoing-wms", "en").await.unwrap().is_none());
    assert!(f.service.public_translation("unknown", "en").await.unwrap().is_none());

    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();
    f.store.set_article_published(id, false);
    assert!(f.service.public_translation("ongoing-wms", "da").await.unwrap().is_none());
}

#[tokio::test]
async fn test_overview_reports_matrix_counts_and_stale_jobs() {
    let f = fixture();
    f.store.set_language_active("de", false);
    let id = f.store.add_article("ongoing-wms", "integrations", "da");
    f.store.add_article("shipmondo", "integrations", "da");
    f.service
        .update_source(id, source_edit("Ongoing WMS", None, None))
        .await
        .unwrap();
    f.service.translate_article(id, "da", "en", "English").await.unwrap();

    // An orphaned job from a crashed run.
    f.store
        .create_job(NewJob {
            article_id: id,
            source_language: "da".to_string(),
            target_language: "nl".to_string(),
            model: MODEL.to_string(),
            started_at: f.clock.now(),
        })
        .await
        .unwrap();
    f.clock.advance(chrono::Duration::minutes(15));

    let overview = f.service.overview().await.unwrap();

    assert_eq!(overview.languages, vec!["da", "en", "nl"]);
    let row = &overview.matrix["ongoing-wms"];
    assert_eq!(row.get("da"), Some(&TranslationStatus::Published));
    assert_eq!(row.get("en"), Some(&TranslationStatus::AutoTranslated));
    assert!(!row.contains_key("nl"));
    assert!(overview.matrix["shipmondo"].is_empty());

    assert_eq!(overview.counts.total_expected, 6);
    assert_eq!(overview.counts.total_rows, 2);
    assert_eq!(overview.counts.published, 2);
    assert_eq!(overview.counts.missing, 4);

    assert_eq!(overview.jobs.len(), 1);
    assert!(overview.jobs[0].stale);
    assert_eq!(overview.jobs[0].effective_status, JobStatus::Failed);
}
