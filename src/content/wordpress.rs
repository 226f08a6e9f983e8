use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{prepare_item, ContentItem, ContentSource};
use crate::app_config::ContentSourceConfig;
use crate::errors::ContentSourceError;

/// WordPress REST API client
pub struct WordPressClient {
    /// HTTP client for API requests
    client: Client,
    /// Site root without trailing slash
    base_url: String,
    /// REST user
    username: String,
    /// Application password for the REST user
    application_password: String,
    /// REST collection ("posts", "pages")
    post_type: String,
    /// Status for newly published translations
    publish_status: String,
}

/// Field that WordPress returns in raw and rendered form
#[derive(Debug, Deserialize, Default)]
pub struct RenderedField {
    /// Source as stored (only with `context=edit`)
    #[serde(default)]
    pub raw: Option<String>,
    /// HTML as displayed
    #[serde(default)]
    pub rendered: String,
}

impl RenderedField {
    fn source(&self) -> &str {
        self.raw.as_deref().unwrap_or(&self.rendered)
    }
}

/// Subset of a post object we care about
#[derive(Debug, Deserialize)]
pub struct WordPressPost {
    pub id: u64,
    #[serde(default)]
    pub title: RenderedField,
    #[serde(default)]
    pub content: RenderedField,
}

/// Body of a create-post request
#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
    meta: PostMeta<'a>,
}

#[derive(Debug, Serialize)]
struct PostMeta<'a> {
    /// Language of the translation
    lang: &'a str,
    /// Item the translation was made from
    translation_of: &'a str,
}

impl WordPressClient {
    /// Create a new WordPress client
    pub fn new(config: &ContentSourceConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            application_password: config.application_password.clone(),
            post_type: config.post_type.clone(),
            publish_status: config.publish_status.clone(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/wp-json/wp/v2/{}", self.base_url, self.post_type)
    }

    async fn error_from_response(content_id: &str, response: reqwest::Response) -> ContentSourceError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());

        if status == StatusCode::NOT_FOUND {
            return ContentSourceError::NotFound(content_id.to_string());
        }

        error!("WordPress API error ({}): {}", status, error_text);
        ContentSourceError::Http {
            status_code: status.as_u16(),
            message: error_text,
        }
    }
}

#[async_trait]
impl ContentSource for WordPressClient {
    fn ensure_configured(&self) -> Result<(), ContentSourceError> {
        if self.base_url.is_empty() {
            return Err(ContentSourceError::NotConfigured(
                "content_source.base_url is empty".to_string(),
            ));
        }
        if self.username.is_empty() || self.application_password.is_empty() {
            return Err(ContentSourceError::NotConfigured(
                "content_source.username and application_password are required".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch(&self, content_id: &str) -> Result<ContentItem, ContentSourceError> {
        let url = format!("{}/{}", self.collection_url(), content_id);
        debug!("Fetching content item {} from {}", content_id, url);

        let response = self
            .client
            .get(&url)
            .query(&[("context", "edit")])
            .basic_auth(&self.username, Some(&self.application_password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(content_id, response).await);
        }

        let post = response
            .json::<WordPressPost>()
            .await
            .map_err(|e| ContentSourceError::ParseError(e.to_string()))?;

        Ok(prepare_item(post.title.source(), post.content.source()))
    }

    async fn publish(
        &self,
        content_id: &str,
        target_language: &str,
        title: &str,
        body: &str,
    ) -> Result<String, ContentSourceError> {
        let request = CreatePostRequest {
            title,
            content: body,
            status: &self.publish_status,
            meta: PostMeta {
                lang: target_language,
                translation_of: content_id,
            },
        };

        let response = self
            .client
            .post(self.collection_url())
            .basic_auth(&self.username, Some(&self.application_password))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(content_id, response).await);
        }

        let post = response
            .json::<WordPressPost>()
            .await
            .map_err(|e| ContentSourceError::ParseError(e.to_string()))?;

        debug!(
            "Published {} translation of {} as post {}",
            target_language, content_id, post.id
        );
        Ok(post.id.to_string())
    }
}
