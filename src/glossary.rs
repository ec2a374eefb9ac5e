//! Glossary Resolver: fixed domain vocabulary per target language, rendered
//! as a prompt fragment for the translator.

use crate::error::Result;
use crate::models::GlossaryTerm;
use crate::store::ContentStore;

pub async fn get_glossary_terms(
    store: &dyn ContentStore,
    target_language: &str,
) -> Result<Vec<GlossaryTerm>> {
    let mut terms = store.glossary_terms(target_language).await?;
    terms.sort_by(|a, b| a.term.cmp(&b.term));
    Ok(terms)
}

/// Render terms as a prompt section. No terms means no section at all.
pub fn format_for_prompt(terms: &[GlossaryTerm]) -> String {
    if terms.is_empty() {
        return String::new();
    }

    let lines = terms
        .iter()
        .map(|t| match t.context.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(context) => format!("- \"{}\" → \"{}\" ({})", t.term, t.translation, context),
            None => format!("- \"{}\" → \"{}\"", t.term, t.translation),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Glossary\nAlways render these terms exactly as given. \
         Where source and target are identical, leave the term untranslated:\n{}",
        lines
    )
}
