/*!
 * Prompt construction for content translation.
 *
 * The configured system prompt is expanded with language names; body
 * prompts add an HTML preservation rule and optional extra instructions,
 * title prompts ask for the bare title.
 */

pub mod templates;

pub use templates::{clean_title, PromptTemplate, TextKind, TranslationPromptBuilder};
