//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use spy_kb_translations::clock::ManualClock;
use spy_kb_translations::error::{Error, Result};
use spy_kb_translations::orchestrator::TranslationService;
use spy_kb_translations::provider::{Completion, CompletionProvider, CompletionRequest};
use spy_kb_translations::retry::RetryConfig;
use spy_kb_translations::store::{ContentStore, MemoryStore};
use spy_kb_translations::translator::Translator;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MODEL: &str = "stub-model";

/// Provider stub: looks the user text up in a dictionary and echoes unknown
/// text. Requests whose prompt targets a failing language are rejected.
#[derive(Default)]
pub struct StubProvider {
    dictionary: Mutex<HashMap<String, String>>,
    failing_languages: Mutex<Vec<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn translate(&self, from: &str, to: &str) {
        self.dictionary
            .lock()
            .unwrap()
            .insert(from.to_string(), to.to_string());
    }

    pub fn fail_for(&self, language_name: &str) {
        self.failing_languages
            .lock()
            .unwrap()
            .push(language_name.to_string());
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn lookup(&self, text: &str) -> String {
        self.dictionary
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| text.to_string())
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    fn model(&self) -> &str {
        MODEL
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests.lock().unwrap().push(request.clone());

        let failing = self.failing_languages.lock().unwrap().clone();
        if let Some(name) = failing
            .iter()
            .find(|name| request.system.contains(&format!("to {}.", name)))
        {
            return Err(Error::Provider(format!("simulated outage for {}", name)));
        }

        let text = if request.json_mode {
            let map: BTreeMap<String, String> =
                serde_json::from_str(&request.user).expect("stub expects a JSON map");
            let translated: BTreeMap<String, String> = map
                .into_iter()
                .map(|(k, v)| (k, self.lookup(&v)))
                .collect();
            serde_json::to_string(&translated).expect("serializable map")
        } else {
            self.lookup(&request.user)
        };

        Ok(Completion {
            text,
            tokens_used: 10,
        })
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<StubProvider>,
    pub clock: Arc<ManualClock>,
    pub service: TranslationService,
}

/// Danish source with English, Dutch and German targets.
pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.add_language("da", "Danish", "Dansk", 1);
    store.add_language("en", "English", "English", 2);
    store.add_language("nl", "Dutch", "Nederlands", 3);
    store.add_language("de", "German", "Deutsch", 4);

    fixture_with_store(store.clone(), store)
}

pub fn fixture_with_store(store: Arc<MemoryStore>, backend: Arc<dyn ContentStore>) -> Fixture {
    let provider = StubProvider::new();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
    ));
    let translator = Translator::new(provider.clone()).with_retry(RetryConfig::no_delay(3));
    let service = TranslationService::new(
        backend,
        translator,
        clock.clone(),
        Duration::from_secs(300),
    )
    .with_cost_per_1k_tokens(0.5);

    Fixture {
        store,
        provider,
        clock,
        service,
    }
}
