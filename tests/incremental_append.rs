//! Scenario 2 (§8): second run, one new line appended. Bypasses the real
//! 30-second throttle by backdating the committed `lastRunTimestamp` rather
//! than sleeping in the test — the throttle gate itself is unit-tested in
//! `src/lock.rs`, so this test is free to focus on the incremental-read
//! behavior it's named for.

mod common;

use claude_stats_agent::{orchestrator, state};

#[tokio::test]
async fn only_the_newly_appended_line_is_collected_and_sent() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = common::write_log(
        dir.path(),
        "session.jsonl",
        &[common::record_line("2026-07-28T00:00:00.000Z", "a")],
    );

    let (url, requests) = common::spawn_stub("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n", std::time::Duration::ZERO);
    let paths = common::test_paths(dir.path());

    orchestrator::run(paths, common::settings_for(&url)).await;
    assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Simulate the throttle window having elapsed.
    let mut backdated = state::load(&dir.path().join("stats-state.json"));
    backdated.last_run_timestamp -= 31_000;
    state::commit(&dir.path().join("stats-state.json"), &backdated).unwrap();

    common::append_log(&log_path, &[common::record_line("2026-07-28T00:00:03.000Z", "d")]);

    let paths = common::test_paths(dir.path());
    orchestrator::run(paths, common::settings_for(&url)).await;

    assert_eq!(requests.load(std::sync::atomic::Ordering::SeqCst), 2, "second run should have sent one more batch");

    let committed = state::load(&dir.path().join("stats-state.json"));
    assert_eq!(committed.recent_hashes.0.get("2026-07-28").map(|v| v.len()), Some(2));
}
