use crate::error::{Error, Result};
use crate::markup;
use crate::models::Content;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::retry::{with_retry_if, RetryConfig};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedText {
    pub text: String,
    pub tokens_used: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedContent {
    pub content: Content,
    pub tokens_used: i64,
}

/// Build the system prompt for translation
pub fn build_translation_system_prompt(target_language: &str, glossary_fragment: &str) -> String {
    let mut prompt = format!(
        r#"You are a professional translator of ERP, webshop and logistics integration documentation. Translate the user's text to {}.

## Translation Rules

### DO NOT translate:
- Product, company and brand names
- Protocol and file format identifiers (e.g. EDI, API, SFTP, CSV)
- URLs, e-mail addresses and code snippets
- Placeholder tokens such as {{name}} or {{{{count}}}}

### Formatting:
- Preserve all HTML tags and attributes exactly, translating only the text between them
- Preserve markdown formatting, line breaks and list structure

### Output:
- Output the translation only, with no commentary, quotes or explanations"#,
        target_language
    );

    if !glossary_fragment.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(glossary_fragment);
    }

    prompt
}

fn build_key_value_instructions() -> &'static str {
    "\n\n## JSON mode\n\
     The user message is a JSON object. Return a JSON object with exactly the same keys. \
     Translate the values only and never change, add or drop keys."
}

/// Translates single fields through a [`CompletionProvider`] with bounded retries.
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryConfig,
}

impl Translator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            retry: RetryConfig::translation(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Model identifier stamped as `translated_by`.
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Translate one text field.
    ///
    /// Blank input is returned unchanged without calling the provider. Output
    /// that drops tags or placeholders counts as a failed attempt.
    pub async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        glossary_fragment: &str,
    ) -> Result<TranslatedText> {
        if text.trim().is_empty() {
            return Ok(TranslatedText {
                text: text.to_string(),
                tokens_used: 0,
            });
        }

        let request = CompletionRequest {
            system: build_translation_system_prompt(target_language, glossary_fragment),
            user: text.to_string(),
            json_mode: false,
        };

        // Rejected attempts were still billed.
        let spent = AtomicI64::new(0);
        let output = with_retry_if(
            &self.retry,
            &format!("Translation to {}", target_language),
            || async {
                let completion = self.provider.complete(&request).await?;
                spent.fetch_add(completion.tokens_used, Ordering::Relaxed);
                let translated = completion.text.trim().to_string();
                if let Some(mismatch) = markup::find_mismatch(text, &translated) {
                    return Err(Error::MarkupMismatch(mismatch));
                }
                Ok(translated)
            },
            Error::is_transient,
        )
        .await?;

        Ok(TranslatedText {
            text: output,
            tokens_used: spent.load(Ordering::Relaxed),
        })
    }

    /// Translate the values of a key-value map in one JSON-mode call.
    pub async fn translate_map(
        &self,
        map: &BTreeMap<String, String>,
        target_language: &str,
        glossary_fragment: &str,
    ) -> Result<(BTreeMap<String, String>, i64)> {
        if map.is_empty() {
            return Ok((BTreeMap::new(), 0));
        }

        let mut system = build_translation_system_prompt(target_language, glossary_fragment);
        system.push_str(build_key_value_instructions());
        let request = CompletionRequest {
            system,
            user: serde_json::to_string(map)?,
            json_mode: true,
        };

        let spent = AtomicI64::new(0);
        let translated = with_retry_if(
            &self.retry,
            &format!("Key-value translation to {}", target_language),
            || async {
                let completion = self.provider.complete(&request).await?;
                spent.fetch_add(completion.tokens_used, Ordering::Relaxed);
                let translated: BTreeMap<String, String> =
                    serde_json::from_str(completion.text.trim()).map_err(|e| {
                        Error::Provider(format!("response was not a flat JSON object: {}", e))
                    })?;

                if translated.len() != map.len() || !map.keys().all(|k| translated.contains_key(k)) {
                    return Err(Error::Provider(format!(
                        "response keys differ: expected {}, got {}",
                        map.len(),
                        translated.len()
                    )));
                }
                for (key, source) in map {
                    if let Some(mismatch) = markup::find_mismatch(source, &translated[key]) {
                        return Err(Error::MarkupMismatch(format!("key '{}': {}", key, mismatch)));
                    }
                }

                debug!("Translated {} keys to {}", translated.len(), target_language);
                Ok(translated)
            },
            Error::is_transient,
        )
        .await?;

        Ok((translated, spent.load(Ordering::Relaxed)))
    }

    /// Translate an article body, branching on its representation.
    pub async fn translate_content(
        &self,
        content: &Content,
        target_language: &str,
        glossary_fragment: &str,
    ) -> Result<TranslatedContent> {
        match content {
            Content::Prose(text) => {
                let translated = self
                    .translate_text(text, target_language, glossary_fragment)
                    .await?;
                Ok(TranslatedContent {
                    content: Content::Prose(translated.text),
                    tokens_used: translated.tokens_used,
                })
            }
            Content::KeyValueMap(map) => {
                let (translated, tokens_used) = self
                    .translate_map(map, target_language, glossary_fragment)
                    .await?;
                Ok(TranslatedContent {
                    content: Content::KeyValueMap(translated),
                    tokens_used,
                })
            }
        }
    }
}
