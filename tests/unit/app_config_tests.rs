/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;
use tempfile::TempDir;

use lingopost::app_config::{Config, LogLevel, TranslationProvider};

/// Test default configuration values
#[test]
fn test_defaultConfig_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.scheduler.max_parallel_jobs, 2);
    assert_eq!(config.scheduler.rate_limit_buffer_ms, 100);
    assert!(config.scheduler.auto_publish);
    assert_eq!(config.max_retries(), 3);
    assert_eq!(config.base_retry_delay(), Duration::from_millis(2000));
    assert_eq!(config.log_level, LogLevel::Info);

    let ollama = config
        .translation
        .get_provider_config(&TranslationProvider::Ollama)
        .expect("Ollama provider config should exist");
    assert_eq!(ollama.model, "llama3.2:3b");
    assert!(ollama.rate_limit.is_none());
}

#[test]
fn test_validate_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "zz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    config.target_language = String::new();
    assert!(config.validate().is_err());
    config.target_language = "de".to_string();

    config.scheduler.max_parallel_jobs = 0;
    assert!(config.validate().is_err());
    config.scheduler.max_parallel_jobs = 4;

    // Hosted providers need a key
    config.translation.provider = TranslationProvider::OpenAI;
    assert!(config.validate().is_err());
    config
        .translation
        .get_active_provider_config_mut()
        .expect("OpenAI provider config should exist")
        .api_key = "sk-test".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_getRateLimit_shouldFollowActiveProvider() {
    let mut config = Config::default();
    assert_eq!(config.translation.get_rate_limit(), None);

    config.translation.provider = TranslationProvider::OpenAI;
    assert_eq!(config.translation.get_rate_limit(), Some(60));

    config.translation.provider = TranslationProvider::Anthropic;
    assert_eq!(config.translation.get_rate_limit(), Some(45));

    config.translation.provider = TranslationProvider::LMStudio;
    assert_eq!(config.translation.get_rate_limit(), None);
}

#[test]
fn test_saveAndLoad_shouldPreserveSettings() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "es".to_string();
    config.scheduler.max_parallel_jobs = 5;
    config.translation.common.instructions = Some("Keep product names in English".to_string());
    config.content_source.base_url = "https://blog.example.com".to_string();
    config.save(&path).expect("save config");

    let loaded = Config::from_file(&path).expect("load config");
    assert_eq!(loaded.target_language, "es");
    assert_eq!(loaded.scheduler.max_parallel_jobs, 5);
    assert_eq!(
        loaded.translation.common.instructions.as_deref(),
        Some("Keep product names in English")
    );
    assert_eq!(loaded.content_source.base_url, "https://blog.example.com");
}

#[test]
fn test_fromFile_withMinimalJson_shouldFillDefaults() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "source_language": "en",
            "target_language": "it",
            "translation": { "provider": "anthropic" }
        }"#,
    )
    .expect("write config");

    let config = Config::from_file(&path).expect("load config");
    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.scheduler.max_parallel_jobs, 2);
    assert_eq!(config.content_source.post_type, "posts");
    assert_eq!(config.content_source.publish_status, "draft");
    assert!(config.database_path.is_none());
    assert_eq!(config.translation.get_model(), "claude-3-haiku-20240307");
}

#[test]
fn test_fromFile_withMissingFile_shouldFail() {
    let dir = TempDir::new().expect("temp dir");
    assert!(Config::from_file(dir.path().join("nope.json")).is_err());
}

#[test]
fn test_providerFromStr_shouldAcceptAnyCase() {
    assert_eq!("OpenAI".parse::<TranslationProvider>().unwrap(), TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>().unwrap(), TranslationProvider::LMStudio);
    assert!("deepl".parse::<TranslationProvider>().is_err());
}
