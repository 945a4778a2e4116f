//! Integration tests for the publish cycle and per-post operations

use chrono::Utc;
use libautocast::error::PlatformError;
use libautocast::platforms::mock::{MockBehavior, MockPublisher};
use libautocast::service::{Event, EventBus, PublishingService};
use libautocast::{
    AutocastError, Database, NewPost, NewTopic, Platform, Post, PostFilter, PostStatus,
    PublishGateway, Topic, TopicStatus,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    service: PublishingService,
    db: Arc<Database>,
    events: EventBus,
    _temp_dir: TempDir,
}

async fn setup(gateway: PublishGateway, require_approval: bool, posts_per_day: u32) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());

    let events = EventBus::default();
    let service = PublishingService::new(
        Arc::clone(&db),
        Arc::new(gateway),
        events.clone(),
        require_approval,
        posts_per_day,
    );

    Harness {
        service,
        db,
        events,
        _temp_dir: temp_dir,
    }
}

/// Gateway where every platform succeeds
fn all_succeed() -> PublishGateway {
    Platform::ALL.into_iter().fold(PublishGateway::new(), |gateway, platform| {
        gateway.with_publisher(Arc::new(MockPublisher::success(platform)))
    })
}

async fn generated_topic(db: &Database, platforms: Vec<Platform>) -> Topic {
    let topic = db
        .create_topic(&NewTopic::new("Release notes", platforms))
        .await
        .unwrap();
    db.update_topic_status(topic.id, TopicStatus::Generated)
        .await
        .unwrap();
    db.get_topic(topic.id).await.unwrap().unwrap()
}

async fn add_post(db: &Database, topic_id: i64, platform: Platform, status: PostStatus) -> Post {
    db.create_post(
        &NewPost::new(topic_id, platform, format!("Post for {}", platform)).with_status(status),
    )
    .await
    .unwrap()
}

/// One topic per post so the active-pair index never gets in the way
async fn add_posts(db: &Database, platform: Platform, status: PostStatus, count: usize) -> Vec<Post> {
    let mut posts = Vec::new();
    for _ in 0..count {
        let topic = generated_topic(db, vec![platform]).await;
        posts.push(add_post(db, topic.id, platform, status).await);
    }
    posts
}

#[tokio::test]
async fn test_failed_publish_leaves_post_untouched() {
    let gateway = PublishGateway::new().with_publisher(Arc::new(MockPublisher::failure(
        Platform::LinkedIn,
        PlatformError::Posting("upstream 500".to_string()),
    )));
    let h = setup(gateway, false, 2).await;
    let topic = generated_topic(&h.db, vec![Platform::LinkedIn]).await;
    let post = add_post(&h.db, topic.id, Platform::LinkedIn, PostStatus::Approved).await;
    let mut receiver = h.events.subscribe();

    let report = h.service.run_cycle().await.completed().unwrap();
    assert_eq!(report.selected, vec![post.id]);
    assert_eq!(report.failed, 1);

    let post = h.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Approved);
    assert!(post.posted_at.is_none());
    assert!(post.remote_ids.populated().is_empty());

    let topic = h.db.get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Generated);

    let mut saw_failure = false;
    while let Ok(event) = receiver.try_recv() {
        if let Event::PostPublishFailed { post_id, error, .. } = event {
            assert_eq!(post_id, post.id);
            assert!(error.contains("upstream 500"));
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn test_successful_publish_records_remote_id_and_completes_topic() {
    let gateway = PublishGateway::new()
        .with_publisher(Arc::new(MockPublisher::with_remote_id(Platform::LinkedIn, "R1")));
    let h = setup(gateway, false, 2).await;
    let topic = generated_topic(&h.db, vec![Platform::LinkedIn]).await;
    let post = add_post(&h.db, topic.id, Platform::LinkedIn, PostStatus::Approved).await;
    let mut receiver = h.events.subscribe();

    let report = h.service.run_cycle().await.completed().unwrap();
    assert_eq!(report.published, 1);

    let post = h.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Posted);
    assert!(post.posted_at.is_some());
    assert_eq!(post.remote_ids.linkedin.as_deref(), Some("R1"));
    assert_eq!(post.remote_ids.populated(), vec![Platform::LinkedIn]);

    let topic = h.db.get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Posted);

    let mut saw_completed = false;
    while let Ok(event) = receiver.try_recv() {
        if event == (Event::TopicCompleted { topic_id: topic.id }) {
            saw_completed = true;
        }
    }
    assert!(saw_completed);
}

#[tokio::test]
async fn test_topic_completes_only_after_last_post() {
    let h = setup(all_succeed(), false, 1).await;
    let topic = generated_topic(&h.db, vec![Platform::LinkedIn, Platform::X]).await;
    add_post(&h.db, topic.id, Platform::LinkedIn, PostStatus::Approved).await;
    add_post(&h.db, topic.id, Platform::X, PostStatus::Approved).await;

    // Budget of one publishes a single post per run
    h.service.run_cycle().await;
    let after_first = h.db.get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(after_first.status, TopicStatus::Generated);

    h.service.run_cycle().await;
    let after_second = h.db.get_topic(topic.id).await.unwrap().unwrap();
    assert_eq!(after_second.status, TopicStatus::Posted);
}

#[tokio::test]
async fn test_budget_and_per_platform_share() {
    // ceil(2 / 5) = 1 post per platform, 2 overall
    let h = setup(all_succeed(), false, 2).await;
    let linkedin = add_posts(&h.db, Platform::LinkedIn, PostStatus::Approved, 3).await;
    let x = add_posts(&h.db, Platform::X, PostStatus::Approved, 2).await;
    let facebook = add_posts(&h.db, Platform::Facebook, PostStatus::Approved, 1).await;

    assert_eq!(h.service.platform_share(), 1);
    let selected = h
        .service
        .select_due_posts(Utc::now().timestamp())
        .await
        .unwrap();
    let ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![linkedin[0].id, facebook[0].id]);

    let report = h.service.run_cycle().await.completed().unwrap();
    assert_eq!(report.published, 2);
    let still_approved = h
        .db
        .list_posts(&PostFilter::default().status(PostStatus::Approved))
        .await
        .unwrap();
    assert_eq!(still_approved.len(), 4);
    assert!(still_approved.iter().any(|p| p.id == x[0].id));
}

#[tokio::test]
async fn test_share_rounds_up() {
    // ceil(7 / 5) = 2
    let h = setup(all_succeed(), false, 7).await;
    add_posts(&h.db, Platform::LinkedIn, PostStatus::Approved, 4).await;
    add_posts(&h.db, Platform::X, PostStatus::Approved, 4).await;
    add_posts(&h.db, Platform::Facebook, PostStatus::Approved, 4).await;
    add_posts(&h.db, Platform::Instagram, PostStatus::Approved, 4).await;

    let selected = h
        .service
        .select_due_posts(Utc::now().timestamp())
        .await
        .unwrap();

    assert_eq!(h.service.platform_share(), 2);
    assert_eq!(selected.len(), 7);
    for platform in Platform::ALL {
        assert!(selected.iter().filter(|p| p.platform == platform).count() <= 2);
    }
}

#[tokio::test]
async fn test_future_posts_are_not_due() {
    let h = setup(all_succeed(), false, 10).await;
    let topic = generated_topic(&h.db, vec![Platform::X, Platform::Facebook]).await;
    let now = Utc::now().timestamp();

    let future = h
        .db
        .create_post(
            &NewPost::new(topic.id, Platform::X, "Later")
                .with_status(PostStatus::Approved)
                .with_scheduled_time(now + 3600),
        )
        .await
        .unwrap();
    let past = h
        .db
        .create_post(
            &NewPost::new(topic.id, Platform::Facebook, "Earlier")
                .with_status(PostStatus::Approved)
                .with_scheduled_time(now - 60),
        )
        .await
        .unwrap();

    let selected = h.service.select_due_posts(now).await.unwrap();
    let ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![past.id]);

    let later = h.service.select_due_posts(now + 7200).await.unwrap();
    assert_eq!(later.len(), 2);
    assert!(later.iter().any(|p| p.id == future.id));
}

#[tokio::test]
async fn test_drafts_used_only_when_nothing_approved_and_approval_not_required() {
    let h = setup(all_succeed(), false, 10).await;
    let drafts = add_posts(&h.db, Platform::Facebook, PostStatus::Draft, 2).await;
    let now = Utc::now().timestamp();

    let selected = h.service.select_due_posts(now).await.unwrap();
    let ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![drafts[0].id, drafts[1].id]);

    let approved = add_posts(&h.db, Platform::X, PostStatus::Approved, 1).await;
    let selected = h.service.select_due_posts(now).await.unwrap();
    let ids: Vec<i64> = selected.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![approved[0].id]);
}

#[tokio::test]
async fn test_drafts_never_published_when_approval_required() {
    let h = setup(all_succeed(), true, 10).await;
    add_posts(&h.db, Platform::Facebook, PostStatus::Draft, 2).await;

    let report = h.service.run_cycle().await.completed().unwrap();
    assert!(report.selected.is_empty());
    assert_eq!(report.published, 0);
}

#[tokio::test]
async fn test_cycle_continues_past_failures() {
    let gateway = PublishGateway::new()
        .with_publisher(Arc::new(MockPublisher::panicking(Platform::LinkedIn)))
        .with_publisher(Arc::new(MockPublisher::success(Platform::Facebook)));
    let h = setup(gateway, false, 10).await;
    let failed = add_posts(&h.db, Platform::LinkedIn, PostStatus::Approved, 1).await;
    let unconfigured = add_posts(&h.db, Platform::X, PostStatus::Approved, 1).await;
    let published = add_posts(&h.db, Platform::Facebook, PostStatus::Approved, 1).await;

    let report = h.service.run_cycle().await.completed().unwrap();
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 2);

    for post in failed.iter().chain(unconfigured.iter()) {
        let post = h.db.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Approved);
    }
    let post = h.db.get_post(published[0].id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Posted);
    assert!(!h.service.is_running());
}

#[tokio::test]
async fn test_failed_post_is_retried_next_run() {
    let mock = Arc::new(MockPublisher::failure(
        Platform::X,
        PlatformError::RateLimit("too many requests".to_string()),
    ));
    let gateway = PublishGateway::new().with_publisher(mock.clone());
    let h = setup(gateway, false, 2).await;
    let post = add_posts(&h.db, Platform::X, PostStatus::Approved, 1).await.remove(0);

    h.service.run_cycle().await;
    mock.set_behavior(MockBehavior::Succeed(Some("1790".to_string())));
    h.service.run_cycle().await;

    assert_eq!(mock.call_count(), 2);
    let post = h.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Posted);
    assert_eq!(post.remote_id(), Some("1790"));
}

#[tokio::test]
async fn test_missing_remote_id_is_stored_as_unknown() {
    let gateway = PublishGateway::new()
        .with_publisher(Arc::new(MockPublisher::with_remote_id(Platform::Facebook, "")));
    let h = setup(gateway, false, 2).await;
    let post = add_posts(&h.db, Platform::Facebook, PostStatus::Approved, 1).await.remove(0);

    h.service.run_cycle().await;

    let post = h.db.get_post(post.id).await.unwrap().unwrap();
    assert_eq!(post.remote_ids.facebook.as_deref(), Some("unknown"));
}

#[tokio::test]
async fn test_posted_state_invariants_hold_after_runs() {
    let gateway = all_succeed().with_publisher(Arc::new(MockPublisher::failure(
        Platform::X,
        PlatformError::Network("timeout".to_string()),
    )));
    let h = setup(gateway, false, 10).await;
    for platforms in [
        vec![Platform::LinkedIn, Platform::Facebook],
        vec![Platform::LinkedIn, Platform::X],
        vec![Platform::TikTok],
    ] {
        let topic = generated_topic(&h.db, platforms.clone()).await;
        for platform in platforms {
            h.db.create_post(
                &NewPost::new(topic.id, platform, "Invariant check")
                    .with_status(PostStatus::Approved)
                    .with_video_script(Some("Hook: a\n\nMiddle: b\n\nCTA: c".to_string())),
            )
            .await
            .unwrap();
        }
    }

    h.service.run_cycle().await;

    let topics = h.db.list_topics(None, None).await.unwrap();
    for topic in topics {
        let posts = h
            .db
            .list_posts(&PostFilter::default().topic(topic.id))
            .await
            .unwrap();
        if topic.status == TopicStatus::Posted {
            assert!(posts.iter().all(|p| p.status == PostStatus::Posted));
        }
        for post in posts.iter().filter(|p| p.status == PostStatus::Posted) {
            assert_eq!(post.remote_ids.populated(), vec![post.platform]);
            assert!(!post.remote_id().unwrap().is_empty());
        }
    }

    let completed = h
        .db
        .list_topics(Some(TopicStatus::Posted), None)
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
}

#[tokio::test]
async fn test_publish_post_by_id() {
    let h = setup(all_succeed(), true, 1).await;
    let post = add_posts(&h.db, Platform::LinkedIn, PostStatus::Draft, 1).await.remove(0);

    let outcome = h.service.publish_post_by_id(post.id).await.unwrap();
    assert!(outcome.is_success());

    let again = h.service.publish_post_by_id(post.id).await;
    assert!(matches!(again, Err(AutocastError::InvalidInput(_))));

    let missing = h.service.publish_post_by_id(4242).await;
    assert!(matches!(missing, Err(AutocastError::InvalidInput(_))));
}

#[tokio::test]
async fn test_approve_post() {
    let h = setup(all_succeed(), true, 1).await;
    let post = add_posts(&h.db, Platform::Facebook, PostStatus::Draft, 1).await.remove(0);

    let approved = h.service.approve_post(post.id).await.unwrap();
    assert_eq!(approved.status, PostStatus::Approved);

    // Approving twice is harmless
    let again = h.service.approve_post(post.id).await.unwrap();
    assert_eq!(again.status, PostStatus::Approved);

    h.service.publish_post_by_id(post.id).await.unwrap();
    let result = h.service.approve_post(post.id).await;
    assert!(matches!(result, Err(AutocastError::InvalidInput(_))));
}

#[tokio::test]
async fn test_schedule_post() {
    let h = setup(all_succeed(), false, 5).await;
    let post = add_posts(&h.db, Platform::X, PostStatus::Approved, 1).await.remove(0);

    let before = Utc::now().timestamp();
    let scheduled = h.service.schedule_post(post.id, Some("in 2h")).await.unwrap();
    let at = scheduled.scheduled_time.unwrap();
    assert!(at >= before + 7200 && at <= before + 7200 + 5);

    let selected = h.service.select_due_posts(Utc::now().timestamp()).await.unwrap();
    assert!(selected.is_empty());

    let cleared = h.service.schedule_post(post.id, None).await.unwrap();
    assert!(cleared.scheduled_time.is_none());

    let invalid = h.service.schedule_post(post.id, Some("whenever you like")).await;
    assert!(invalid.is_err());
}

/// Make every update of one post fail inside SQLite
async fn reject_updates_for(db: &Database, post_id: i64) {
    let sql = format!(
        "CREATE TRIGGER reject_post_{0} BEFORE UPDATE ON posts WHEN OLD.id = {0} \
         BEGIN SELECT RAISE(ABORT, 'update rejected'); END",
        post_id
    );
    sqlx::query(&sql).execute(db.pool()).await.unwrap();
}

#[tokio::test]
async fn test_store_failure_skips_to_next_post() {
    let publisher = Arc::new(MockPublisher::success(Platform::LinkedIn));
    let gateway = PublishGateway::new().with_publisher(publisher.clone());
    let h = setup(gateway, false, 10).await;

    let posts = add_posts(&h.db, Platform::LinkedIn, PostStatus::Approved, 2).await;
    reject_updates_for(&h.db, posts[0].id).await;

    let report = h.service.run_cycle().await.completed().unwrap();

    assert_eq!(report.selected, vec![posts[0].id, posts[1].id]);
    assert_eq!(report.published, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(publisher.call_count(), 2);
    assert!(!h.service.is_running());

    let stuck = h.db.get_post(posts[0].id).await.unwrap().unwrap();
    assert_eq!(stuck.status, PostStatus::Approved);
    let topic = h.db.get_topic(stuck.topic_id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Generated);

    let published = h.db.get_post(posts[1].id).await.unwrap().unwrap();
    assert_eq!(published.status, PostStatus::Posted);
    let topic = h.db.get_topic(published.topic_id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Posted);
}
