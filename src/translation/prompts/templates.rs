/*!
 * Prompt templates for title and body translation.
 */

use crate::language_utils::display_name_or_code;

/// System prompt template with `{source_language}` / `{target_language}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Rule appended for body translations
    pub const BODY_RULES: &'static str = "The text is HTML. Keep every tag, attribute and URL unchanged and \
translate only the human-readable text. Respond with the translated HTML only, without explanations or code fences.";

    /// Rule appended for title translations
    pub const TITLE_RULES: &'static str =
        "The text is a title. Respond with the translated title only, on a single line, without quotes or explanations.";

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template with the given language names.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

/// What is being translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Title,
    Body,
}

/// Builds the system prompt for one translation call.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
    source_language: String,
    target_language: String,
}

impl TranslationPromptBuilder {
    /// Language codes are expanded to their English names when known.
    pub fn new(template: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            template: PromptTemplate::new(template),
            source_language: display_name_or_code(source_language),
            target_language: display_name_or_code(target_language),
        }
    }

    pub fn system_prompt(&self, kind: TextKind, instructions: Option<&str>) -> String {
        let mut prompt = self.template.render(&self.source_language, &self.target_language);

        match kind {
            TextKind::Title => {
                prompt.push_str("\n\n");
                prompt.push_str(PromptTemplate::TITLE_RULES);
            }
            TextKind::Body => {
                prompt.push_str("\n\n");
                prompt.push_str(PromptTemplate::BODY_RULES);

                if let Some(extra) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
                    prompt.push_str("\n\nAdditional instructions:\n");
                    prompt.push_str(extra);
                }
            }
        }

        prompt
    }
}

/// Strip the decoration models like to add around a translated title.
pub fn clean_title(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default().trim();

    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('«', '»')] {
        if line.len() > 1 && line.starts_with(open) && line.ends_with(close) {
            let inner = &line[open.len_utf8()..line.len() - close.len_utf8()];
            return inner.trim().to_string();
        }
    }

    line.to_string()
}
