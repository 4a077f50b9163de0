mod support;

use chrono::Utc;
use groupwarden::retry::RetryPolicy;
use groupwarden::safety::{SafetyPolicy, SafetyStateStore};
use groupwarden::session::{SessionOrchestrator, SessionReport};
use support::{Attempt, ScriptedClient, post, test_config};
use tempfile::TempDir;

fn orchestrator_for(config: &groupwarden::Config) -> SessionOrchestrator {
    let store = SafetyStateStore::new(config.state_file());
    let policy = SafetyPolicy::load(config.limits, store, Utc::now());
    SessionOrchestrator::new(config.clone(), policy, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn all_posts_succeed() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![post("p1"), post("p2"), post("p3")]);

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    assert_eq!(
        report,
        SessionReport {
            total_posts: 3,
            successful: 3,
            ..SessionReport::default()
        }
    );
    for id in ["p1", "p2", "p3"] {
        assert_eq!(client.attempts_for(id), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn transient_error_is_retried_until_success() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![post("p1")]).script(
        "p1",
        vec![
            Attempt::Transport("connection timeout".to_string()),
            Attempt::Submit(true),
        ],
    );

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(client.attempts_for("p1"), 2);
}

#[tokio::test(start_paused = true)]
async fn fatal_error_fails_the_post_but_not_the_session() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let client = ScriptedClient::new(vec![post("p1"), post("p2")]).script(
        "p1",
        vec![Attempt::Transport("account suspended".to_string())],
    );

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    // No retry after a fatal classification, and the loop moves on.
    assert_eq!(client.attempts_for("p1"), 1);
    assert_eq!(client.attempts_for("p2"), 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.successful, 1);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_stop_at_the_attempt_cap() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let timeout = || Attempt::Transport("connection timeout".to_string());
    let client = ScriptedClient::new(vec![post("p1")])
        .script("p1", vec![timeout(), timeout(), timeout(), timeout()]);

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    // The orchestrator cap (3) is shorter than the backoff table (5).
    assert_eq!(client.attempts_for("p1"), 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.successful, 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_submission_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let client =
        ScriptedClient::new(vec![post("p1")]).script("p1", vec![Attempt::Submit(false)]);

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    assert_eq!(client.attempts_for("p1"), 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_scrape_is_a_successful_noop() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let client = ScriptedClient::new(Vec::new());

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    assert_eq!(report, SessionReport::default());
}

#[tokio::test(start_paused = true)]
async fn second_run_skips_already_commented_posts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let first = ScriptedClient::new(vec![post("p1")]);
    let report = orchestrator_for(&config).run(&first).await.unwrap();
    assert_eq!(report.successful, 1);

    // A fresh orchestrator reloads the dedup set from disk; the same post
    // no longer survives the pre-filter.
    let second = ScriptedClient::new(vec![post("p1")]);
    let report = orchestrator_for(&config).run(&second).await.unwrap();
    assert_eq!(report, SessionReport::default());
    assert_eq!(second.attempts_for("p1"), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_trigger_a_safety_stop() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let reject = || vec![Attempt::Submit(false)];
    let client = ScriptedClient::new(vec![
        post("p1"),
        post("p2"),
        post("p3"),
        post("p4"),
        post("p5"),
    ])
    .script("p1", reject())
    .script("p2", reject())
    .script("p3", reject())
    .script("p4", reject())
    .script("p5", reject());

    let report = orchestrator_for(&config).run(&client).await.unwrap();

    // Three consecutive errors trip the break check; p4/p5 never run.
    assert_eq!(report.failed, 3);
    assert_eq!(report.safety_stops, 1);
    assert_eq!(report.total_posts, 5);
    assert_eq!(client.attempts_for("p4"), 0);
    assert_eq!(client.attempts_for("p5"), 0);
}

#[tokio::test(start_paused = true)]
async fn session_does_not_start_when_a_break_is_due() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    // Preload a state record close to the daily cap (40 of 50).
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(
        config.state_file(),
        serde_json::json!({
            "comments_today": 40,
            "last_reset_date": Utc::now().date_naive(),
            "commented_posts": [],
        })
        .to_string(),
    )
    .unwrap();

    let client = ScriptedClient::new(vec![post("p1")]);
    let report = orchestrator_for(&config).run(&client).await.unwrap();

    assert_eq!(report, SessionReport::default());
    assert!(client.calls().is_empty(), "browser must not be touched");
}
