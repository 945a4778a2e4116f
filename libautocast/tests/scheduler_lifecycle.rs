//! Integration tests for the scheduler and the service facade

use libautocast::config::SchedulerConfig;
use libautocast::generator::mock::MockProvider;
use libautocast::platforms::mock::MockPublisher;
use libautocast::service::{CycleKind, Event, EventReceiver};
use libautocast::{
    AutocastError, AutocastService, ContentGenerator, Database, NewTopic, Platform, PostFilter,
    PostStatus, PublishGateway, TopicStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

async fn setup_service(settings: SchedulerConfig) -> (AutocastService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path.to_str().unwrap()).await.unwrap();

    let generator = ContentGenerator::new(Arc::new(MockProvider::new("Scheduled content\n#rust")));
    let gateway = PublishGateway::new()
        .with_publisher(Arc::new(MockPublisher::success(Platform::LinkedIn)))
        .with_publisher(Arc::new(MockPublisher::success(Platform::X)));

    let service = AutocastService::with_components(db, generator, gateway, &settings).unwrap();
    (service, temp_dir)
}

fn fast_settings() -> SchedulerConfig {
    SchedulerConfig {
        generation_interval: "100ms".to_string(),
        ..SchedulerConfig::default()
    }
}

/// Wait for the next completed generation run
async fn next_generation_completed(receiver: &mut EventReceiver) {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Event::CycleCompleted {
                cycle: CycleKind::Generation,
                ..
            }) = receiver.recv().await
            {
                return;
            }
        }
    })
    .await
    .expect("generation cycle did not complete in time");
}

#[tokio::test]
async fn test_start_runs_generation_immediately() {
    let settings = SchedulerConfig {
        generation_interval: "1h".to_string(),
        ..SchedulerConfig::default()
    };
    let (service, _temp_dir) = setup_service(settings).await;
    let topic = service
        .database()
        .create_topic(&NewTopic::new("Backlog", vec![Platform::LinkedIn, Platform::X]))
        .await
        .unwrap();
    let mut receiver = service.subscribe();

    service.scheduler().start().unwrap();
    next_generation_completed(&mut receiver).await;
    service.scheduler().stop().await;

    let topic = service.database().get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Generated);
    let posts = service
        .database()
        .list_posts(&PostFilter::default().topic(topic.id))
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
}

#[tokio::test]
async fn test_double_start_is_an_error() {
    let (service, _temp_dir) = setup_service(fast_settings()).await;

    service.scheduler().start().unwrap();
    assert!(service.scheduler().is_running());

    let second = service.scheduler().start();
    assert!(matches!(second, Err(AutocastError::Scheduler(_))));

    service.scheduler().stop().await;
    assert!(!service.scheduler().is_running());
}

#[tokio::test]
async fn test_interval_keeps_firing_until_stopped() {
    let (service, _temp_dir) = setup_service(fast_settings()).await;
    let mut receiver = service.subscribe();

    service.scheduler().start().unwrap();
    // Immediate run plus at least two interval firings
    for _ in 0..3 {
        next_generation_completed(&mut receiver).await;
    }
    service.scheduler().stop().await;

    // Nothing fires after stop
    while receiver.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_restart_registers_fresh_timers() {
    let (service, _temp_dir) = setup_service(fast_settings()).await;
    let mut receiver = service.subscribe();

    service.scheduler().start().unwrap();
    next_generation_completed(&mut receiver).await;
    service.scheduler().stop().await;

    // Stopping twice is fine
    service.scheduler().stop().await;

    service.scheduler().start().unwrap();
    let topic = service
        .database()
        .create_topic(&NewTopic::new("After restart", vec![Platform::X]))
        .await
        .unwrap();

    timeout(Duration::from_secs(5), async {
        loop {
            let topic = service.database().get_topic(topic.id).await.unwrap().unwrap();
            if topic.status == TopicStatus::Generated {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("topic was not generated after restart");

    service.scheduler().stop().await;
}

#[tokio::test]
async fn test_manual_cycles_through_facade() {
    let (service, _temp_dir) = setup_service(SchedulerConfig::default()).await;
    let topic = service
        .database()
        .create_topic(&NewTopic::new("Manual", vec![Platform::LinkedIn]))
        .await
        .unwrap();

    service.generation().run_cycle().await;
    let report = service.publishing().run_cycle().await.completed().unwrap();
    assert_eq!(report.published, 1);

    let posts = service
        .database()
        .list_posts(&PostFilter::default().topic(topic.id))
        .await
        .unwrap();
    assert_eq!(posts[0].status, PostStatus::Posted);
    assert!(posts[0].remote_id().unwrap().starts_with("mock-linkedin-"));

    let topic = service.database().get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Posted);
}
