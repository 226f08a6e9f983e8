/*!
 * Content source abstraction.
 *
 * The scheduler reads the item to translate from a content source and,
 * optionally, pushes the translation back. The source is responsible for
 * handing over *prepared* text: entities decoded and editor scaffolding
 * removed, so the pipeline never has to know about the site's markup.
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ContentSourceError;

pub mod wordpress;

pub use wordpress::WordPressClient;

/// Item fetched from the content source, ready for translation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentItem {
    /// Title (plain text)
    pub title: String,
    /// Prepared body (HTML without editor block comments)
    pub body: String,
}

impl ContentItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// True when there is no body text worth translating
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Source of content items and target of published translations
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fail fast when base URL or credentials are missing
    fn ensure_configured(&self) -> Result<(), ContentSourceError> {
        Ok(())
    }

    /// Fetch an item by id
    async fn fetch(&self, content_id: &str) -> Result<ContentItem, ContentSourceError>;

    /// Publish a translation; returns the id the source assigned to it
    async fn publish(
        &self,
        content_id: &str,
        target_language: &str,
        title: &str,
        body: &str,
    ) -> Result<String, ContentSourceError>;
}

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("valid regex"));

static NAMED_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]{1,7});").expect("valid regex"));

static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--\s*/?wp:[^>]*?-->\n?").expect("valid regex"));

/// Characters that must stay escaped inside HTML
fn is_markup_sensitive(c: char) -> bool {
    matches!(c, '<' | '>' | '&')
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "hellip" => '\u{2026}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "euro" => '\u{20ac}',
        _ => return None,
    };
    Some(c)
}

/// Decode HTML entities
///
/// With `keep_markup` set, entities for `<`, `>` and `&` are left alone so
/// the result is still valid HTML.
pub fn decode_entities(text: &str, keep_markup: bool) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(c) if !(keep_markup && is_markup_sensitive(c)) => c.to_string(),
            _ => caps[0].to_string(),
        }
    });

    NAMED_ENTITY
        .replace_all(&numeric, |caps: &regex::Captures| match named_entity(&caps[1]) {
            Some(c) if !(keep_markup && is_markup_sensitive(c)) => c.to_string(),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

/// Remove block editor delimiters (`<!-- wp:paragraph -->`) from a body
pub fn strip_block_comments(body: &str) -> String {
    BLOCK_COMMENT.replace_all(body, "").into_owned()
}

/// Turn raw site content into the prepared form handed to the pipeline
pub fn prepare_item(raw_title: &str, raw_body: &str) -> ContentItem {
    ContentItem {
        title: decode_entities(raw_title, false).trim().to_string(),
        body: decode_entities(&strip_block_comments(raw_body), true)
            .trim()
            .to_string(),
    }
}
