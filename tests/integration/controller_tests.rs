/*!
 * Controller workflows: enqueue, publish, stats and provider-backed runs.
 */

use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

use crate::common::{ids, test_config, Harness, ScriptedSource, ScriptedTranslator, BODY_TOKENS, TITLE_TOKENS};
use lingopost::content::ContentSource;
use lingopost::database::{JobStatus, JobStore, Repository};
use lingopost::errors::{ContentSourceError, ProviderError};
use lingopost::providers::mock::MockProvider;
use lingopost::translation::{ProviderTranslator, Translator};
use lingopost::Controller;

#[tokio::test]
async fn test_controller_enqueueTwice_shouldReuseActiveJob() {
    let translator = ScriptedTranslator::new();
    translator.set_delay(Duration::from_millis(50));
    let harness = Harness::with_translator(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]), translator);

    let first = assert_ok!(harness.controller.enqueue(&ids(&["a"])).await);
    let second = assert_ok!(harness.controller.enqueue(&ids(&["a"])).await);
    assert_eq!(first[0].id, second[0].id);

    harness.wait_idle().await;
    assert_eq!(harness.translator.body_calls().len(), 1);
    assert_eq!(assert_ok!(harness.controller.list_jobs(None, 10).await).len(), 1);
}

#[tokio::test]
async fn test_controller_enqueue_shouldSkipBlankIds() {
    let harness = Harness::new(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]));

    let jobs = assert_ok!(harness.controller.enqueue(&ids(&["", "  ", "a"])).await);
    harness.wait_idle().await;

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].content_id, "a");
}

#[tokio::test]
async fn test_controller_enqueueFor_shouldUseGivenLanguage() {
    let harness = Harness::new(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]));

    let jobs = assert_ok!(harness.controller.enqueue_for(&ids(&["a"]), "de").await);
    harness.wait_idle().await;

    let job = assert_ok!(harness.controller.get_job(&jobs[0].id).await).expect("job exists");
    assert_eq!(job.target_language, "de");
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_controller_withAutoPublish_shouldPublishCompletedJobs() {
    let mut config = test_config(1, 0, 5);
    config.scheduler.auto_publish = true;
    let harness = Harness::new(config, ScriptedSource::with_ids(&["a"]));

    let jobs = harness.run(&["a"]).await;

    assert_eq!(jobs[0].status, JobStatus::Published);
    assert_eq!(jobs[0].external_id.as_deref(), Some("wp-1"));
    assert_eq!(harness.source.published(), vec![("a".to_string(), "fr".to_string())]);
}

#[tokio::test]
async fn test_controller_whenAutoPublishFails_shouldKeepJobCompleted() {
    let mut config = test_config(1, 3, 5);
    config.scheduler.auto_publish = true;
    let source = ScriptedSource::with_ids(&["a"]);
    source.fail_publish(ContentSourceError::Http {
        status_code: 503,
        message: "maintenance".to_string(),
    });
    let harness = Harness::new(config, source);

    let jobs = harness.run(&["a"]).await;
    let job = &jobs[0];

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
    assert_eq!(harness.translator.body_calls().len(), 1);
    let logs = harness.log_messages(&job.id).await;
    assert!(logs.iter().any(|m| m.contains("Auto-publish failed")));
}

#[tokio::test]
async fn test_controller_publishJob_shouldPublishOnceAndRejectUnfinishedJobs() {
    let harness = Harness::new(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]));

    let jobs = harness.run(&["a"]).await;
    assert_eq!(jobs[0].status, JobStatus::Completed);

    let published = assert_ok!(harness.controller.publish_job(&jobs[0].id).await);
    assert_eq!(published.status, JobStatus::Published);
    assert_eq!(published.external_id.as_deref(), Some("wp-1"));

    // Publishing again is a no-op
    let again = assert_ok!(harness.controller.publish_job(&jobs[0].id).await);
    assert_eq!(again.external_id.as_deref(), Some("wp-1"));
    assert_eq!(harness.source.published().len(), 1);

    assert!(harness.controller.publish_job("no-such-job").await.is_err());
}

#[tokio::test]
async fn test_controller_publishJob_withFailedJob_shouldBeRejected() {
    let translator = ScriptedTranslator::new();
    translator.fail_always(ProviderError::from_status(400, "bad request"));
    let harness = Harness::with_translator(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]), translator);

    let jobs = harness.run(&["a"]).await;
    assert_eq!(jobs[0].status, JobStatus::Failed);

    assert!(harness.controller.publish_job(&jobs[0].id).await.is_err());
    assert!(harness.source.published().is_empty());
}

#[tokio::test]
async fn test_controller_stats_shouldCountStatusesAndTokens() {
    let source = ScriptedSource::with_ids(&["a", "b"]);
    let harness = Harness::new(test_config(2, 0, 5), source);

    harness.run(&["a", "b", "missing"]).await;
    let stats = assert_ok!(harness.controller.stats().await);

    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total(), 3);
    assert_eq!(stats.tokens_used as u64, 2 * (TITLE_TOKENS + BODY_TOKENS));

    let failed = assert_ok!(harness.controller.list_jobs(Some(JobStatus::Failed), 10).await);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].content_id, "missing");
}

#[tokio::test]
async fn test_controller_jobLogs_shouldTraceTheRun() {
    let harness = Harness::new(test_config(1, 0, 5), ScriptedSource::with_ids(&["a"]));

    let jobs = harness.run(&["a"]).await;
    let logs = harness.log_messages(&jobs[0].id).await;

    assert!(logs.first().is_some_and(|m| m.starts_with("Started translating a")));
    assert!(logs.iter().any(|m| m == "Translation completed"));
}

#[tokio::test]
async fn test_controller_withMockProvider_shouldTranslateThroughPrompts() {
    crate::common::init_logging();

    let config = test_config(2, 5, 5);
    let repository = assert_ok!(Repository::new_in_memory());
    let store: Arc<dyn JobStore> = Arc::new(repository.clone());
    let source: Arc<dyn ContentSource> = Arc::new(ScriptedSource::with_ids(&["a", "b", "c"]));
    let mock = MockProvider::intermittent(3);
    let translator: Arc<dyn Translator> =
        Arc::new(ProviderTranslator::with_mock(mock.clone(), &config.translation));

    let controller = Controller::with_components(config, repository, store, source, translator);
    let jobs = assert_ok!(controller.enqueue(&ids(&["a", "b", "c"])).await);
    tokio::time::timeout(Duration::from_secs(10), controller.wait_until_idle())
        .await
        .expect("scheduler did not become idle");

    for job in &jobs {
        let record = assert_ok!(controller.get_job(&job.id).await).expect("job exists");
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.translated_content.as_deref().unwrap_or_default().contains("[fr]"));
        assert!(record.tokens_used > 0);
    }
    // Every third request fails, so at least one retry happened
    assert!(mock.request_count() > 6);
}
