//! HTTP wrappers around the translation service.

use crate::error::{Error, Result};
use crate::models::{Content, GlossaryTerm, Language};
use crate::orchestrator::{
    BatchEntry, FanOutReport, LanguageSelection, TranslationService,
};
use crate::outdated::SourceEdit;
use crate::overview::Overview;
use crate::security::is_authorized_bearer;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: TranslationService,
    pub api_secret: Arc<str>,
}

impl AppState {
    pub fn new(service: TranslationService, api_secret: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            api_secret: api_secret.into(),
        }
    }
}

fn authorize(headers: &HeaderMap, state: &AppState) -> Result<()> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if is_authorized_bearer(header, &state.api_secret) {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/languages", get(list_languages))
        .route(
            "/translate",
            post(trigger_translation)
                .put(update_source)
                .get(translation_overview),
        )
        .route("/translate/all", post(trigger_batch))
        .route("/translations/:slug/:locale", get(public_translation))
        .route("/admin/glossary", get(list_glossary).post(upsert_glossary))
        .route("/admin/glossary/:language/:term", delete(delete_glossary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn list_languages(State(state): State<AppState>) -> Result<Json<Vec<Language>>> {
    Ok(Json(state.service.store().list_active_languages().await?))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub article_id: Option<i64>,
    pub slug: Option<String>,
    pub target_languages: Option<Vec<String>>,
    #[serde(default)]
    pub only_outdated: bool,
}

impl TranslateRequest {
    fn selection(&self) -> Result<LanguageSelection> {
        match (&self.target_languages, self.only_outdated) {
            (Some(_), true) => Err(Error::Validation(
                "target_languages and only_outdated cannot be combined".to_string(),
            )),
            (Some(codes), false) if codes.is_empty() => Err(Error::Validation(
                "target_languages must not be empty".to_string(),
            )),
            (Some(codes), false) => Ok(LanguageSelection::Only(codes.clone())),
            (None, true) => Ok(LanguageSelection::MissingOrOutdated),
            (None, false) => Ok(LanguageSelection::All),
        }
    }
}

async fn trigger_translation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<FanOutReport>> {
    authorize(&headers, &state)?;
    let selection = request.selection()?;
    let article = state
        .service
        .resolve_article(request.article_id, request.slug.as_deref())
        .await?;

    let report = state
        .service
        .translate_languages(article.id, &article.source_language, &selection)
        .await?;
    info!(
        article_id = article.id,
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Translation request finished"
    );
    Ok(Json(report))
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRequest {
    #[serde(default)]
    pub only_outdated: bool,
}

impl BatchRequest {
    /// An empty body means the defaults; anything else must be valid JSON.
    fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }
}

async fn trigger_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<BatchEntry>>> {
    authorize(&headers, &state)?;
    let request = BatchRequest::from_body(&body)?;
    let selection = if request.only_outdated {
        LanguageSelection::MissingOrOutdated
    } else {
        LanguageSelection::All
    };
    Ok(Json(state.service.translate_all_articles(&selection).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSourceRequest {
    pub article_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<Content>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSourceResponse {
    pub article_id: i64,
    pub source_hash: Option<String>,
    pub outdated_languages: Vec<String>,
    pub outdated_count: usize,
}

async fn update_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateSourceRequest>,
) -> Result<Json<UpdateSourceResponse>> {
    authorize(&headers, &state)?;
    let update = state
        .service
        .update_source(
            request.article_id,
            SourceEdit {
                title: request.title,
                description: request.description,
                content: request.content,
            },
        )
        .await?;

    Ok(Json(UpdateSourceResponse {
        article_id: request.article_id,
        source_hash: update.translation.source_hash,
        outdated_count: update.outdated_languages.len(),
        outdated_languages: update.outdated_languages,
    }))
}

async fn translation_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Overview>> {
    authorize(&headers, &state)?;
    Ok(Json(state.service.overview().await?))
}

/// Public rendering payload. `found: false` with empty `translations` tells
/// the page to fall back to its built-in strings.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicTranslation {
    pub slug: String,
    pub locale: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub translations: BTreeMap<String, String>,
}

async fn public_translation(
    State(state): State<AppState>,
    Path((slug, locale)): Path<(String, String)>,
) -> Result<Json<PublicTranslation>> {
    let mut response = PublicTranslation {
        slug,
        locale,
        found: false,
        title: None,
        description: None,
        content: None,
        translations: BTreeMap::new(),
    };

    if let Some(row) = state
        .service
        .public_translation(&response.slug, &response.locale)
        .await?
    {
        response.found = true;
        response.title = Some(row.title);
        response.description = row.description;
        match row.content {
            Some(Content::KeyValueMap(map)) => response.translations = map,
            Some(Content::Prose(text)) => response.content = Some(text),
            None => {}
        }
    }

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct GlossaryQuery {
    pub language: String,
}

async fn list_glossary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GlossaryQuery>,
) -> Result<Json<Vec<GlossaryTerm>>> {
    authorize(&headers, &state)?;
    Ok(Json(
        crate::glossary::get_glossary_terms(state.service.store(), &query.language).await?,
    ))
}

async fn upsert_glossary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(term): Json<GlossaryTerm>,
) -> Result<(StatusCode, Json<GlossaryTerm>)> {
    authorize(&headers, &state)?;
    if term.term.trim().is_empty() || term.translation.trim().is_empty() {
        return Err(Error::Validation(
            "term and translation must not be empty".to_string(),
        ));
    }
    let is_active = state
        .service
        .store()
        .list_active_languages()
        .await?
        .iter()
        .any(|l| l.code == term.language_code);
    if !is_active {
        return Err(Error::Validation(format!(
            "'{}' is not an active language",
            term.language_code
        )));
    }

    let stored = state.service.store().upsert_glossary_term(term).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_glossary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((language, term)): Path<(String, String)>,
) -> Result<StatusCode> {
    authorize(&headers, &state)?;
    if state
        .service
        .store()
        .delete_glossary_term(&term, &language)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(format!("glossary term '{}' ({})", term, language)))
    }
}
