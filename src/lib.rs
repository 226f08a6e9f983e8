/*!
 * # lingopost - Scheduled AI translation of published content
 *
 * A Rust library that translates content items (WordPress posts) through
 * a pluggable LLM provider, tracking each unit of work as a persisted job.
 *
 * ## Features
 *
 * - Bounded-parallel job scheduler with FIFO admission
 * - Sliding-window rate limiting of provider calls
 * - Retry with exponential backoff for transient failures, fast failure otherwise
 * - Translate content using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API (and LM Studio)
 *   - Anthropic API
 * - SQLite job records with progress, token usage and per-job logs
 * - Optional auto-publish of finished translations
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `scheduler`: Worker pool, rate limiter, retry policy and job pipeline
 * - `translation`: `Translator` trait and the provider-backed implementation
 * - `content`: Content source trait and the WordPress REST client
 * - `database`: Job records and logs in SQLite
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::anthropic`: Anthropic API client
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod content;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod scheduler;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use database::{JobRecord, JobStatus, Repository};
pub use errors::{AppError, ContentSourceError, JobError, ProviderError, StoreError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use scheduler::{JobDescriptor, Scheduler, SchedulerStatus};
pub use translation::{Translation, Translator};
