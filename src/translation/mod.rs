/*!
 * Content translation on top of the provider clients.
 *
 * - `core`: `ProviderTranslator`, dispatching to the configured provider
 * - `prompts`: system prompt construction for titles and bodies
 *
 * The scheduler only sees the `Translator` trait, so tests can swap in a
 * scripted implementation.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;

pub mod core;
pub mod prompts;

pub use self::core::ProviderTranslator;
pub use self::prompts::{PromptTemplate, TextKind, TranslationPromptBuilder};

/// Result of one translation call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    /// Translated text
    pub text: String,
    /// Tokens billed for the call (prompt + completion)
    pub tokens_used: u64,
}

impl Translation {
    pub fn new(text: impl Into<String>, tokens_used: u64) -> Self {
        Self {
            text: text.into(),
            tokens_used,
        }
    }
}

/// Translates titles and bodies between two languages
#[async_trait]
pub trait Translator: Send + Sync {
    /// Human-readable provider/model name for logs
    fn name(&self) -> String;

    /// Fail fast when credentials or endpoint are missing
    fn ensure_configured(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Translate a plain-text title
    async fn translate_title(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, ProviderError>;

    /// Translate an HTML body, with optional extra instructions
    async fn translate_body(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        instructions: Option<&str>,
    ) -> Result<Translation, ProviderError>;
}
