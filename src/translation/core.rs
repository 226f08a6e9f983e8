/*!
 * Provider-backed translator.
 *
 * `ProviderTranslator` owns one client for the configured provider and
 * turns title/body translation calls into provider requests.
 */

use async_trait::async_trait;
use log::debug;
use std::time::Instant;
use url::Url;

use super::prompts::{clean_title, TextKind, TranslationPromptBuilder};
use super::{Translation, Translator};
use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

/// Normalize an endpoint to `scheme://host[:port][/path]` without a trailing slash
fn parse_endpoint(endpoint: &str) -> Result<String, ProviderError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ProviderError::NotConfigured("Endpoint cannot be empty".to_string()));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)
    } else {
        Url::parse(&format!("http://{}", endpoint))
    }
    .map_err(|e| ProviderError::NotConfigured(format!("Invalid endpoint {}: {}", endpoint, e)))?;

    if url.host_str().is_none() {
        return Err(ProviderError::NotConfigured(format!(
            "Invalid host in endpoint: {}",
            endpoint
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    /// Ollama LLM service
    Ollama { client: Ollama },

    /// OpenAI API service
    OpenAI { client: OpenAI },

    /// LM Studio local server (OpenAI-compatible)
    LMStudio { client: OpenAI },

    /// Anthropic API service
    Anthropic { client: Anthropic },

    /// Scripted provider
    Mock { client: MockProvider },
}

/// Translator backed by one of the configured LLM providers
#[derive(Debug)]
pub struct ProviderTranslator {
    provider: TranslationProviderImpl,
    config: TranslationConfig,
}

impl ProviderTranslator {
    /// Build the client for the active provider
    pub fn from_config(config: &TranslationConfig) -> Result<Self, ProviderError> {
        let timeout = config.get_timeout();

        let provider = match config.provider {
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::new(parse_endpoint(&config.get_endpoint())?, timeout),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new(config.get_api_key(), config.get_endpoint(), config.get_model(), timeout),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };

                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new(
                        api_key,
                        parse_endpoint(&config.get_endpoint())?,
                        config.get_model(),
                        timeout,
                    ),
                }
            }
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(config.get_api_key(), config.get_endpoint(), config.get_model(), timeout),
            },
        };

        Ok(Self {
            provider,
            config: config.clone(),
        })
    }

    /// Translator backed by the mock provider, using `config` for prompts
    pub fn with_mock(client: MockProvider, config: &TranslationConfig) -> Self {
        Self {
            provider: TranslationProviderImpl::Mock { client },
            config: config.clone(),
        }
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                client.test_connection().await
            }
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Mock { client } => client.test_connection().await,
        }
    }

    async fn complete(
        &self,
        kind: TextKind,
        text: &str,
        source_language: &str,
        target_language: &str,
        instructions: Option<&str>,
    ) -> Result<Translation, ProviderError> {
        let system_prompt = TranslationPromptBuilder::new(
            &self.config.common.system_prompt,
            source_language,
            target_language,
        )
        .system_prompt(kind, instructions);

        let model = self.config.get_model();
        let max_tokens = self.config.get_max_tokens();
        let temperature = self.config.common.temperature;
        let start_time = Instant::now();

        let translation = match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let request = GenerationRequest::new(model, text)
                    .system(system_prompt)
                    .temperature(temperature)
                    .num_predict(max_tokens);
                run(client, request).await?
            }
            TranslationProviderImpl::OpenAI { client } | TranslationProviderImpl::LMStudio { client } => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(temperature)
                    .max_tokens(max_tokens);
                run(client, request).await?
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model, max_tokens)
                    .system(system_prompt)
                    .add_message("user", text)
                    .temperature(temperature);
                run(client, request).await?
            }
            TranslationProviderImpl::Mock { client } => {
                let request = MockRequest {
                    text: text.to_string(),
                    target_language: target_language.to_string(),
                };
                run(client, request).await?
            }
        };

        debug!(
            "{} {:?} translation ({} -> {}) took {:?}, {} tokens",
            self.name(),
            kind,
            source_language,
            target_language,
            start_time.elapsed(),
            translation.tokens_used
        );

        if translation.text.trim().is_empty() {
            return Err(ProviderError::ParseError(format!(
                "{} returned an empty translation",
                self.config.provider.display_name()
            )));
        }

        Ok(translation)
    }
}

async fn run<P: Provider>(client: &P, request: P::Request) -> Result<Translation, ProviderError> {
    let response = client.complete(request).await?;
    Ok(Translation {
        text: P::extract_text(&response).trim().to_string(),
        tokens_used: P::token_usage(&response),
    })
}

#[async_trait]
impl Translator for ProviderTranslator {
    fn name(&self) -> String {
        match &self.provider {
            TranslationProviderImpl::Mock { .. } => "Mock".to_string(),
            _ => format!("{} ({})", self.config.provider.display_name(), self.config.get_model()),
        }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if let TranslationProviderImpl::Mock { .. } = self.provider {
            return Ok(());
        }

        let provider = self.config.provider;
        if provider.requires_api_key() && self.config.get_api_key().trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "API key is required for {} provider",
                provider.display_name()
            )));
        }
        if self.config.get_model().trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "No model configured for {} provider",
                provider.display_name()
            )));
        }
        Ok(())
    }

    async fn translate_title(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, ProviderError> {
        let mut translation = self
            .complete(TextKind::Title, text, source_language, target_language, None)
            .await?;
        translation.text = clean_title(&translation.text);
        Ok(translation)
    }

    async fn translate_body(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        instructions: Option<&str>,
    ) -> Result<Translation, ProviderError> {
        self.complete(TextKind::Body, text, source_language, target_language, instructions)
            .await
    }
}
